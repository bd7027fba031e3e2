//! HTTP client for the HRMS import API.
//!
//! Provides the [`ImportBackend`] / [`ProgressSource`] traits the workflow
//! is written against, and [`ImportApi`], their `reqwest` implementation.

pub mod api;
pub mod backend;

pub use api::{ApiContext, ApiError, ImportApi};
pub use backend::{ImportBackend, ProgressSource};
