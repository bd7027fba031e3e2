//! Upload constraints and file references.
//!
//! Files are validated against an [`UploadPolicy`] before any request is
//! issued, so a rejected file never reaches the network.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::EntityId;

// ── Constants ────────────────────────────────────────────────────────

/// Bytes per megabyte used for size limits and messages.
pub const BYTES_PER_MB: u64 = 1024 * 1024;

/// Extensions accepted by the spreadsheet import flows.
pub const SPREADSHEET_EXTENSIONS: &[&str] = &["csv", "xlsx", "xls"];

/// Extensions accepted by the document attachment flows.
pub const DOCUMENT_EXTENSIONS: &[&str] = &[
    "pdf", "doc", "docx", // documents
    "csv", "xlsx", "xls", // spreadsheets
    "png", "jpg", "jpeg", // scans
];

/// Size limit for spreadsheet imports.
pub const SPREADSHEET_MAX_MB: u64 = 20;

/// Size limit for document attachments.
pub const DOCUMENT_MAX_MB: u64 = 50;

// ── Types ────────────────────────────────────────────────────────────

/// A file reference returned by the server after a successful upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    /// Server-assigned attachment id.
    pub id: EntityId,
    pub filename: String,
    pub size_bytes: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

/// Metadata of a local file, used for pre-flight validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCandidate {
    pub filename: String,
    pub size_bytes: u64,
}

impl FileCandidate {
    pub fn new(filename: impl Into<String>, size_bytes: u64) -> Self {
        Self {
            filename: filename.into(),
            size_bytes,
        }
    }

    /// Lowercase extension without the dot, if the name has one.
    pub fn extension(&self) -> Option<String> {
        let (stem, ext) = self.filename.rsplit_once('.')?;
        if stem.is_empty() || ext.is_empty() {
            return None;
        }
        Some(ext.to_lowercase())
    }
}

/// A local file about to be uploaded.
#[derive(Clone)]
pub struct FileUpload {
    pub filename: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl FileUpload {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            content_type: None,
            bytes,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn candidate(&self) -> FileCandidate {
        FileCandidate::new(self.filename.clone(), self.bytes.len() as u64)
    }
}

impl std::fmt::Debug for FileUpload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileUpload")
            .field("filename", &self.filename)
            .field("content_type", &self.content_type)
            .field("size_bytes", &self.bytes.len())
            .finish()
    }
}

/// Extension allow-list and size limit for one upload flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPolicy {
    allowed_extensions: Vec<String>,
    max_size_bytes: u64,
}

impl UploadPolicy {
    /// Build a policy. Extensions are normalised to lowercase without dots.
    pub fn new<I, S>(allowed_extensions: I, max_size_mb: u64) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            allowed_extensions: allowed_extensions
                .into_iter()
                .map(|e| e.as_ref().trim_start_matches('.').to_lowercase())
                .filter(|e| !e.is_empty())
                .collect(),
            max_size_bytes: max_size_mb.saturating_mul(BYTES_PER_MB),
        }
    }

    /// Policy for CSV / Excel imports (20 MB).
    pub fn spreadsheet() -> Self {
        Self::new(SPREADSHEET_EXTENSIONS.iter(), SPREADSHEET_MAX_MB)
    }

    /// Policy for document attachments (50 MB).
    pub fn document() -> Self {
        Self::new(DOCUMENT_EXTENSIONS.iter(), DOCUMENT_MAX_MB)
    }

    /// Replace the size limit, keeping the allow-list. Limits too large to
    /// express in bytes saturate at `u64::MAX`.
    pub fn with_max_size_mb(mut self, max_size_mb: u64) -> Self {
        self.max_size_bytes = max_size_mb.saturating_mul(BYTES_PER_MB);
        self
    }

    pub fn allowed_extensions(&self) -> &[String] {
        &self.allowed_extensions
    }

    pub fn max_size_bytes(&self) -> u64 {
        self.max_size_bytes
    }

    /// Check a file against the allow-list, then the size limit.
    ///
    /// The size limit is exclusive: a file must be strictly under the
    /// maximum, so one of exactly the maximum size is rejected.
    pub fn validate(&self, file: &FileCandidate) -> Result<(), CoreError> {
        let allowed = file
            .extension()
            .is_some_and(|ext| self.allowed_extensions.iter().any(|a| *a == ext));
        if !allowed {
            let shown = file
                .extension()
                .map(|e| format!(".{e}"))
                .unwrap_or_else(|| file.filename.clone());
            return Err(CoreError::Validation(format!(
                "File type '{shown}' is not allowed. Allowed types: {}",
                self.allowed_extensions.join(", ")
            )));
        }

        if file.size_bytes >= self.max_size_bytes {
            return Err(CoreError::Validation(format!(
                "File must be under {} MB",
                self.max_size_bytes / BYTES_PER_MB
            )));
        }

        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn mb(n: f64) -> u64 {
        (n * BYTES_PER_MB as f64) as u64
    }

    #[test]
    fn extension_is_lowercased() {
        assert_eq!(
            FileCandidate::new("Payroll.CSV", 1).extension().as_deref(),
            Some("csv")
        );
        assert_eq!(
            FileCandidate::new("archive.tar.gz", 1).extension().as_deref(),
            Some("gz")
        );
    }

    #[test]
    fn extension_missing_or_dotfile() {
        assert!(FileCandidate::new("README", 1).extension().is_none());
        assert!(FileCandidate::new(".env", 1).extension().is_none());
        assert!(FileCandidate::new("trailing.", 1).extension().is_none());
    }

    #[test]
    fn spreadsheet_accepts_small_csv() {
        let policy = UploadPolicy::spreadsheet();
        assert!(policy.validate(&FileCandidate::new("payroll.csv", mb(2.0))).is_ok());
    }

    #[test]
    fn rejects_disallowed_extension() {
        let policy = UploadPolicy::spreadsheet();
        let err = policy
            .validate(&FileCandidate::new("tool.exe", 10))
            .unwrap_err();
        assert_eq!(
            err.user_message(),
            "File type '.exe' is not allowed. Allowed types: csv, xlsx, xls"
        );
    }

    #[test]
    fn extension_checked_before_size() {
        let policy = UploadPolicy::spreadsheet();
        let err = policy
            .validate(&FileCandidate::new("huge.exe", mb(500.0)))
            .unwrap_err();
        assert!(err.user_message().contains("not allowed"));
    }

    #[test]
    fn pdf_within_document_limit_passes() {
        let policy = UploadPolicy::document();
        assert!(policy
            .validate(&FileCandidate::new("contract.pdf", mb(20.3)))
            .is_ok());
    }

    #[test]
    fn same_pdf_rejected_under_twenty_mb_limit() {
        let policy = UploadPolicy::document().with_max_size_mb(20);
        let err = policy
            .validate(&FileCandidate::new("contract.pdf", mb(20.3)))
            .unwrap_err();
        assert_eq!(err.user_message(), "File must be under 20 MB");
    }

    #[test]
    fn file_at_limit_is_rejected() {
        let policy = UploadPolicy::spreadsheet();
        let under = FileCandidate::new("a.csv", SPREADSHEET_MAX_MB * BYTES_PER_MB - 1);
        assert!(policy.validate(&under).is_ok());
        let exact = FileCandidate::new("a.csv", SPREADSHEET_MAX_MB * BYTES_PER_MB);
        assert_eq!(
            policy.validate(&exact).unwrap_err().user_message(),
            "File must be under 20 MB"
        );
    }

    #[test]
    fn twenty_mb_pdf_rejected_under_twenty_mb_limit() {
        let policy = UploadPolicy::document().with_max_size_mb(20);
        let err = policy
            .validate(&FileCandidate::new("contract.pdf", 20 * BYTES_PER_MB))
            .unwrap_err();
        assert_eq!(err.user_message(), "File must be under 20 MB");
    }

    #[test]
    fn huge_limit_saturates() {
        let policy = UploadPolicy::spreadsheet().with_max_size_mb(u64::MAX);
        assert_eq!(policy.max_size_bytes(), u64::MAX);
        assert!(policy.validate(&FileCandidate::new("a.csv", mb(900.0))).is_ok());
        assert_eq!(UploadPolicy::new(["csv"], u64::MAX).max_size_bytes(), u64::MAX);
    }

    #[test]
    fn policy_normalises_extensions() {
        let policy = UploadPolicy::new([".CSV", "Xlsx", ""], 1);
        assert_eq!(policy.allowed_extensions(), ["csv", "xlsx"]);
    }

    #[test]
    fn upload_candidate_uses_byte_length() {
        let upload = FileUpload::new("a.csv", vec![0; 128]).with_content_type("text/csv");
        assert_eq!(upload.candidate(), FileCandidate::new("a.csv", 128));
        assert_eq!(upload.content_type.as_deref(), Some("text/csv"));
    }
}
