//! History command implementation

use anyhow::{Context, Result};

use crate::cli::{GlobalArgs, HistoryArgs, OutputFormat};
use crate::commands::common::{self, Session};

/// Execute the history command
pub(crate) async fn execute(args: &HistoryArgs, global: &GlobalArgs) -> Result<()> {
    let session = Session::load(global)?;
    let log = session.open_log()?;

    let Some(raw) = &args.tenant else {
        let tenants = log.tenants().context("Failed to list tenants")?;
        if args.output == OutputFormat::Json {
            return common::print_json(&tenants);
        }
        if tenants.is_empty() {
            println!("No migrations recorded");
        }
        for tenant in tenants {
            println!("{tenant}");
        }
        return Ok(());
    };

    let tenant = common::parse_tenant(raw)?;
    let records = if args.pending {
        log.pending(tenant)
    } else {
        log.history(tenant)
    }
    .context("Failed to read migration history")?;

    if records.is_empty() && args.output == OutputFormat::Text {
        let what = if args.pending { "pending migrations" } else { "migrations" };
        println!("No {what} for tenant {tenant}");
        return Ok(());
    }
    common::print_records(&records, args.output)
}
