//! REST client for the HRMS import endpoints.
//!
//! Wraps upload, analysis, dry-run preview, confirmation, and job progress
//! using [`reqwest`]. Authentication and tenant selection come from an
//! explicit [`ApiContext`] rather than any global session.

use async_trait::async_trait;
use hrms_core::analysis::{AnalysisResult, AnalyzeRequest};
use hrms_core::job::{ConfirmResponse, JobProgress};
use hrms_core::preview::{PreviewRequest, PreviewResult};
use hrms_core::types::id_from_json;
use hrms_core::upload::{FileUpload, UploadedFile};
use reqwest::multipart::{Form, Part};
use reqwest::{Method, RequestBuilder};
use serde::Deserialize;

use crate::backend::{ImportBackend, ProgressSource};

/// Header carrying the tenant id on every request.
pub const TENANT_HEADER: &str = "X-Tenant-ID";

/// Message shown when the server gave no usable error text.
pub const GENERIC_FAILURE_MESSAGE: &str = "Request failed. Please try again.";

/// Per-session connection context passed to [`ImportApi::new`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiContext {
    /// Base URL of the import API, e.g. `https://hr.example.com/api/v1/import`.
    pub base_url: String,
    pub bearer_token: Option<String>,
    pub tenant_id: Option<String>,
}

impl ApiContext {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            bearer_token: None,
            tenant_id: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    pub fn with_tenant(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    /// Absolute URL for an API path such as `/upload`.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

/// Path to a job's progress endpoint, with the id percent-encoded as a
/// single segment.
pub fn job_progress_path(job_id: &str) -> String {
    format!("/jobs/{}/progress", urlencoding::encode(job_id))
}

/// Errors from the import REST layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The server returned a non-2xx status code.
    #[error("Import API error ({status}): {}", .message.as_deref().unwrap_or(GENERIC_FAILURE_MESSAGE))]
    Server {
        /// HTTP status code.
        status: u16,
        /// Error text from the response body, if the server provided one.
        message: Option<String>,
    },

    /// The response body did not have the expected shape.
    #[error("Unexpected response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Text to show the user: the server's own message verbatim when it sent
    /// one, otherwise a generic failure message.
    pub fn user_message(&self) -> String {
        match self {
            Self::Server {
                message: Some(message),
                ..
            } => message.clone(),
            _ => GENERIC_FAILURE_MESSAGE.to_string(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Server { status, .. } => Some(*status),
            Self::Request(e) => e.status().map(|s| s.as_u16()),
            Self::Decode(_) => None,
        }
    }
}

/// Pull a human-readable message out of an error body.
///
/// Looks for a string `error`, `message`, or `detail` field (in that order);
/// falls back to a short plain-text body.
pub fn extract_server_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(json) = serde_json::from_str::<serde_json::Value>(trimmed) {
        return ["error", "message", "detail"].iter().find_map(|key| {
            json.get(key)
                .and_then(|v| v.as_str())
                .filter(|s| !s.trim().is_empty())
                .map(str::to_string)
        });
    }

    // Plain text bodies are used as-is unless they look like an HTML page.
    if trimmed.starts_with('<') || trimmed.len() > 500 {
        return None;
    }
    Some(trimmed.to_string())
}

/// Raw `POST /upload` response.
#[derive(Debug, Deserialize)]
struct UploadResponse {
    id: serde_json::Value,
    #[serde(default)]
    filename: Option<String>,
    #[serde(default)]
    size: Option<u64>,
    #[serde(default)]
    content_type: Option<String>,
}

/// HTTP client for the HRMS import API.
#[derive(Debug, Clone)]
pub struct ImportApi {
    client: reqwest::Client,
    context: ApiContext,
}

impl ImportApi {
    /// Create a new API client for one session context.
    pub fn new(context: ApiContext) -> Self {
        Self {
            client: reqwest::Client::new(),
            context,
        }
    }

    /// Create an API client reusing an existing [`reqwest::Client`]
    /// (useful for connection pooling across sessions).
    pub fn with_client(client: reqwest::Client, context: ApiContext) -> Self {
        Self { client, context }
    }

    pub fn context(&self) -> &ApiContext {
        &self.context
    }

    // ---- private helpers ----

    /// Start a request with auth and tenant headers attached.
    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut builder = self.client.request(method, self.context.url(path));
        if let Some(token) = &self.context.bearer_token {
            builder = builder.bearer_auth(token);
        }
        if let Some(tenant) = &self.context.tenant_id {
            builder = builder.header(TENANT_HEADER, tenant);
        }
        builder
    }

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or an [`ApiError::Server`] carrying
    /// the server's message on failure.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Server {
                status: status.as_u16(),
                message: extract_server_message(&body),
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let response = Self::ensure_success(response).await?;
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

#[async_trait]
impl ProgressSource for ImportApi {
    /// `GET /jobs/{id}/progress`.
    async fn job_progress(&self, job_id: &str) -> Result<JobProgress, ApiError> {
        let response = self
            .request(Method::GET, &job_progress_path(job_id))
            .send()
            .await?;
        Self::parse_response(response).await
    }
}

#[async_trait]
impl ImportBackend for ImportApi {
    /// `POST /upload` as a single multipart request with a `file` part.
    async fn upload(&self, file: FileUpload) -> Result<UploadedFile, ApiError> {
        let size_bytes = file.bytes.len() as u64;
        let mut part = Part::bytes(file.bytes).file_name(file.filename.clone());
        if let Some(content_type) = &file.content_type {
            part = part.mime_str(content_type)?;
        }
        let form = Form::new().part("file", part);

        let response = self
            .request(Method::POST, "/upload")
            .multipart(form)
            .send()
            .await?;
        let raw: UploadResponse = Self::parse_response(response).await?;

        let id = id_from_json(&raw.id)
            .ok_or_else(|| ApiError::Decode("upload response has no usable id".to_string()))?;

        tracing::info!(attachment_id = %id, filename = %file.filename, size_bytes, "File uploaded");

        Ok(UploadedFile {
            id,
            filename: raw.filename.unwrap_or(file.filename),
            size_bytes: raw.size.unwrap_or(size_bytes),
            content_type: raw.content_type.or(file.content_type),
        })
    }

    /// `POST /analyze`.
    async fn analyze(&self, request: &AnalyzeRequest) -> Result<AnalysisResult, ApiError> {
        let response = self
            .request(Method::POST, "/analyze")
            .json(request)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// `POST /preview` (dry run).
    async fn preview(&self, request: &PreviewRequest) -> Result<PreviewResult, ApiError> {
        let response = self
            .request(Method::POST, "/preview")
            .json(request)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// `POST /confirm`.
    async fn confirm(&self, request: &PreviewRequest) -> Result<ConfirmResponse, ApiError> {
        let response = self
            .request(Method::POST, "/confirm")
            .json(request)
            .send()
            .await?;
        let raw: serde_json::Value = Self::parse_response(response).await?;
        let job_id = raw
            .get("job_id")
            .and_then(id_from_json)
            .ok_or_else(|| ApiError::Decode("confirm response has no job_id".to_string()))?;
        Ok(ConfirmResponse { job_id })
    }
}
