//! The seam between the workflow and the import API.
//!
//! [`ImportApi`](crate::api::ImportApi) is the production implementation;
//! tests substitute in-memory backends.

use async_trait::async_trait;
use hrms_core::analysis::{AnalysisResult, AnalyzeRequest};
use hrms_core::job::{ConfirmResponse, JobProgress};
use hrms_core::preview::{PreviewRequest, PreviewResult};
use hrms_core::upload::{FileUpload, UploadedFile};

use crate::api::ApiError;

/// Anything that can report the status of a server-side job.
#[async_trait]
pub trait ProgressSource: Send + Sync {
    async fn job_progress(&self, job_id: &str) -> Result<JobProgress, ApiError>;
}

/// The server operations an import workflow depends on.
#[async_trait]
pub trait ImportBackend: ProgressSource {
    /// Upload one file. Called only after client-side validation passed.
    async fn upload(&self, file: FileUpload) -> Result<UploadedFile, ApiError>;

    /// Detect the entity type and propose a column mapping.
    async fn analyze(&self, request: &AnalyzeRequest) -> Result<AnalysisResult, ApiError>;

    /// Dry-run the import with the given mapping. Nothing is persisted.
    async fn preview(&self, request: &PreviewRequest) -> Result<PreviewResult, ApiError>;

    /// Start the real import and return the job to poll.
    async fn confirm(&self, request: &PreviewRequest) -> Result<ConfirmResponse, ApiError>;
}
