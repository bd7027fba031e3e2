//! Async orchestration for the HRMS import workflow.
//!
//! [`ImportController`] drives one import session against an
//! [`ImportBackend`](hrms_client::ImportBackend), applying each server
//! response to the pure [`ImportWorkflow`](hrms_core::workflow::ImportWorkflow)
//! state machine. [`poller`] owns the only background task: the job progress
//! poll loop.

pub mod controller;
pub mod error;
pub mod poller;

pub use controller::ImportController;
pub use error::WorkflowError;
pub use poller::{spawn_poller, PollHandle, PollStatus, PollerConfig};
