//! Domain types and pure logic for the HRMS data-import workflow.
//!
//! This crate has no I/O and no async code. It holds the state machine that
//! sequences an import (upload, analysis, mapping, preview, confirmation,
//! progress), the mapping editor, the dataset join graph, and the preview
//! pagination rules. The HTTP client and the polling task live in
//! `hrms-client` and `hrms-workflow`.

pub mod analysis;
pub mod error;
pub mod fields;
pub mod job;
pub mod join;
pub mod mapping;
pub mod preview;
pub mod types;
pub mod upload;
pub mod workflow;
