//! Apply command implementation

use anyhow::{Context, Result};
use std::sync::Arc;
use tm_db::{ApplyReport, MigrationService};

use crate::cli::{ApplyArgs, GlobalArgs, OutputFormat};
use crate::commands::common::{self, ExitCode, Session};

/// Execute the apply command
///
/// With `--model`, the next batch is recorded first and then executed under
/// the same tenant lock. Execution stops at the first failing migration,
/// which stays pending together with everything after it.
pub(crate) async fn execute(args: &ApplyArgs, global: &GlobalArgs) -> Result<()> {
    let session = Session::load(global)?;
    let model = args.model.as_deref().map(common::load_model).transpose()?;
    let tenant = match (&args.tenant, &model) {
        (Some(raw), Some(model)) => {
            let tenant = common::parse_tenant(raw)?;
            if tenant != model.tenant_id {
                anyhow::bail!(
                    "--tenant {} does not match the model's tenant {}",
                    tenant,
                    model.tenant_id
                );
            }
            tenant
        }
        (Some(raw), None) => common::parse_tenant(raw)?,
        (None, Some(model)) => model.tenant_id,
        (None, None) => anyhow::bail!("Either --tenant or --model is required"),
    };

    let log = Arc::new(session.open_log()?);

    if args.dry_run {
        return dry_run(&session, &log, tenant, model.as_ref());
    }

    let url = session.database_url()?;
    let executor = tm_db::connect(&url)
        .await
        .context("Failed to connect to the target database")?;
    let service = MigrationService::new(log, executor, session.reconciler());

    let report = match &model {
        Some(model) => {
            service
                .sync(tenant, &model.classifications, &model.relationships)
                .await
        }
        None => service.execute_pending(tenant).await,
    }
    .context("Failed to apply migrations")?;

    print_report(&report);
    if !report.is_success() {
        return Err(ExitCode(1).into());
    }
    Ok(())
}

fn dry_run(
    session: &Session,
    log: &tm_meta::MigrationLog,
    tenant: uuid::Uuid,
    model: Option<&common::LoadedModel>,
) -> Result<()> {
    let pending = log
        .pending(tenant)
        .context("Failed to read pending migrations")?;
    let planned = match model {
        Some(model) => {
            let history = log.history(tenant)?;
            session
                .reconciler()
                .reconcile(&model.classifications, &model.relationships, &history)
                .context("Reconciliation failed")?
        }
        None => Vec::new(),
    };

    if pending.is_empty() && planned.is_empty() {
        println!("Nothing to apply for tenant {tenant}");
        return Ok(());
    }
    if !pending.is_empty() {
        println!("Pending:");
        common::print_records(&pending, OutputFormat::Text)?;
    }
    if !planned.is_empty() {
        println!("Would record:");
        common::print_planned(&planned, OutputFormat::Text, false)?;
    }
    Ok(())
}

fn print_report(report: &ApplyReport) {
    for record in &report.applied {
        println!("  OK    {:>5}  {}", record.sequence, record.name);
    }
    if let Some(failure) = &report.failure {
        println!(
            "  FAIL  {:>5}  {}",
            failure.record.sequence, failure.record.name
        );
        eprintln!("Error: {}", failure.error);
        if report.skipped > 0 {
            println!("  {} later migration(s) not attempted", report.skipped);
        }
    }
    println!();
    if report.applied.is_empty() && report.is_success() {
        println!("Nothing to apply");
    } else {
        println!("Applied {} migration(s)", report.applied.len());
    }
}
