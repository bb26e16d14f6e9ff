//! Generate command implementation

use anyhow::{Context, Result};

use crate::cli::{GenerateArgs, GlobalArgs, OutputFormat};
use crate::commands::common::{self, Session};

/// Execute the generate command
///
/// Reconciles the model against the log and appends the batch. Nothing is
/// executed; `tm apply` runs what this records.
pub(crate) async fn execute(args: &GenerateArgs, global: &GlobalArgs) -> Result<()> {
    let session = Session::load(global)?;
    let model = common::load_model(&args.model)?;
    let log = session.open_log()?;

    let history = log
        .history(model.tenant_id)
        .context("Failed to read migration history")?;
    let batch = session
        .reconciler()
        .reconcile(&model.classifications, &model.relationships, &history)
        .context("Reconciliation failed")?;
    let records = log
        .append_batch(&batch)
        .context("Failed to record migrations")?;

    if args.output == OutputFormat::Json {
        return common::print_json(&records);
    }
    if records.is_empty() {
        println!("Tenant {} is up to date", model.tenant_id);
    } else {
        common::print_records(&records, OutputFormat::Text)?;
        println!();
        println!(
            "Recorded {} migration(s) in {}",
            records.len(),
            session.log_path().display()
        );
    }
    Ok(())
}
