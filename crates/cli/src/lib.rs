//! Command-line front end for the HRMS import workflow.
//!
//! The binary uploads one spreadsheet, applies column overrides, prints the
//! dry-run preview and, when asked to, runs the import and follows its job
//! until it finishes.

pub mod args;
pub mod config;
pub mod report;

/// `EnvFilter` directives used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "hrms_import=info,hrms_workflow=info,hrms_client=info";
