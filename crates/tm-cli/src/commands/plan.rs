//! Plan command implementation

use anyhow::{Context, Result};

use crate::cli::{GlobalArgs, OutputFormat, PlanArgs};
use crate::commands::common::{self, Session};

/// Execute the plan command
pub(crate) async fn execute(args: &PlanArgs, global: &GlobalArgs) -> Result<()> {
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

    if global.verbose {
        eprintln!(
            "[verbose] Tenant {} has {} recorded migration(s)",
            model.tenant_id,
            history.len()
        );
    }

    if batch.is_empty() && args.output == OutputFormat::Text {
        println!("Tenant {} is up to date", model.tenant_id);
        return Ok(());
    }
    common::print_planned(&batch, args.output, args.sql)
}
