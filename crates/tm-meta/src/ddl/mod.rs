//! DDL for each layout version of the migration log, embedded at build time.

/// One step of the log's table layout.
pub struct LayoutVersion {
    pub version: i32,
    pub sql: &'static str,
}

/// Every layout step, oldest first. Versions start at 1 and never skip.
pub static LAYOUTS: &[LayoutVersion] = &[LayoutVersion {
    version: 1,
    sql: include_str!("v001_initial.sql"),
}];
