//! CLI command implementations

pub(crate) mod apply;
pub(crate) mod common;
pub(crate) mod connection_url;
pub(crate) mod generate;
pub(crate) mod history;
pub(crate) mod plan;
