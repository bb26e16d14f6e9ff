//! Connection-url command implementation

use anyhow::Result;
use tm_core::tenant_connection_url;

use crate::cli::{ConnectionUrlArgs, GlobalArgs};
use crate::commands::common::{self, Session};

/// Execute the connection-url command
pub(crate) async fn execute(args: &ConnectionUrlArgs, global: &GlobalArgs) -> Result<()> {
    let session = Session::load(global)?;
    let tenant = common::parse_tenant(&args.tenant)?;
    let base = session.database_url()?;

    let schema = session.reconciler().normalizer().schema_name(tenant);
    println!(
        "{}",
        tenant_connection_url(&base, &schema, args.include_public)
    );
    Ok(())
}
