//! Import / batch / restore job status as reported by the server.
//!
//! Jobs are polled, so a client only ever sees snapshots: intermediate
//! statuses may be skipped and nothing here assumes every state is observed.

use serde::{Deserialize, Serialize};

use crate::types::{EntityId, Timestamp};

/// Server job status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    Parsing,
    Mapping,
    Validating,
    Preview,
    Importing,
    PreBackup,
    InProgress,
    Completed,
    Failed,
    Cancelled,
    RolledBack,
    /// Any status this client does not know about. Never terminal.
    #[serde(other)]
    Unknown,
}

impl JobStatus {
    /// Statuses after which the job never changes again.
    pub const TERMINAL: [JobStatus; 4] = [
        JobStatus::Completed,
        JobStatus::Failed,
        JobStatus::Cancelled,
        JobStatus::RolledBack,
    ];

    pub fn is_terminal(&self) -> bool {
        Self::TERMINAL.contains(self)
    }

    pub fn is_success(&self) -> bool {
        *self == Self::Completed
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Parsing => "PARSING",
            Self::Mapping => "MAPPING",
            Self::Validating => "VALIDATING",
            Self::Preview => "PREVIEW",
            Self::Importing => "IMPORTING",
            Self::PreBackup => "PRE_BACKUP",
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
            Self::Cancelled => "CANCELLED",
            Self::RolledBack => "ROLLED_BACK",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Parsing => "Parsing file",
            Self::Mapping => "Mapping columns",
            Self::Validating => "Validating rows",
            Self::Preview => "Preparing preview",
            Self::Importing => "Importing",
            Self::PreBackup => "Creating backup",
            Self::InProgress => "In progress",
            Self::Completed => "Completed",
            Self::Failed => "Failed",
            Self::Cancelled => "Cancelled",
            Self::RolledBack => "Rolled back",
            Self::Unknown => "Unknown",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A row-level failure reported by the job. Ordinary data, not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowError {
    #[serde(default)]
    pub row: Option<u64>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// Response of `GET /jobs/{id}/progress`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobProgress {
    pub status: JobStatus,
    #[serde(default)]
    pub processed: u64,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub success_count: u64,
    #[serde(default)]
    pub error_count: u64,
    #[serde(default)]
    pub errors: Vec<RowError>,
    #[serde(default)]
    pub started_at: Option<Timestamp>,
    #[serde(default)]
    pub completed_at: Option<Timestamp>,
}

impl JobProgress {
    /// Processed share in whole percent, 0 when the total is unknown.
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        ((self.processed.min(self.total) * 100) / self.total) as u8
    }
}

/// Response of `POST /confirm`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmResponse {
    pub job_id: EntityId,
}

/// Final result of a job, delivered once when a terminal status is seen.
#[derive(Debug, Clone, PartialEq)]
pub struct JobOutcome {
    pub success: bool,
    pub final_state: JobProgress,
}

impl JobOutcome {
    /// Build an outcome from a terminal snapshot. Returns `None` while the
    /// job is still running.
    pub fn from_terminal(snapshot: JobProgress) -> Option<Self> {
        if !snapshot.status.is_terminal() {
            return None;
        }
        Some(Self {
            success: snapshot.status.is_success(),
            final_state: snapshot,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot(status: JobStatus) -> JobProgress {
        JobProgress {
            status,
            processed: 5,
            total: 10,
            success_count: 4,
            error_count: 1,
            errors: vec![],
            started_at: None,
            completed_at: None,
        }
    }

    #[test]
    fn terminal_statuses() {
        for status in [
            JobStatus::Completed,
            JobStatus::Failed,
            JobStatus::Cancelled,
            JobStatus::RolledBack,
        ] {
            assert!(status.is_terminal(), "{status} should be terminal");
        }
    }

    #[test]
    fn running_statuses_are_not_terminal() {
        for status in [
            JobStatus::Pending,
            JobStatus::Parsing,
            JobStatus::Mapping,
            JobStatus::Validating,
            JobStatus::Preview,
            JobStatus::Importing,
            JobStatus::PreBackup,
            JobStatus::InProgress,
            JobStatus::Unknown,
        ] {
            assert!(!status.is_terminal(), "{status} should not be terminal");
        }
    }

    #[test]
    fn status_wire_names() {
        let s: JobStatus = serde_json::from_value(json!("PRE_BACKUP")).unwrap();
        assert_eq!(s, JobStatus::PreBackup);
        let s: JobStatus = serde_json::from_value(json!("ROLLED_BACK")).unwrap();
        assert_eq!(s, JobStatus::RolledBack);
        assert_eq!(serde_json::to_value(JobStatus::InProgress).unwrap(), "IN_PROGRESS");
    }

    #[test]
    fn unknown_status_is_tolerated() {
        let s: JobStatus = serde_json::from_value(json!("ARCHIVING")).unwrap();
        assert_eq!(s, JobStatus::Unknown);
    }

    #[test]
    fn progress_payload_with_errors() {
        let p: JobProgress = serde_json::from_value(json!({
            "status": "IMPORTING",
            "processed": 40,
            "total": 100,
            "success_count": 38,
            "error_count": 2,
            "errors": [
                {"row": 7, "message": "Duplicate employee number"},
                {"message": "Unknown department", "data": {"Dept": "Ops"}}
            ]
        }))
        .unwrap();

        assert_eq!(p.percent(), 40);
        assert_eq!(p.errors[0].row, Some(7));
        assert_eq!(p.errors[1].row, None);
        assert!(p.errors[1].data.is_some());
    }

    #[test]
    fn percent_handles_zero_and_overshoot() {
        let mut p = snapshot(JobStatus::Pending);
        p.total = 0;
        assert_eq!(p.percent(), 0);
        p.total = 10;
        p.processed = 12;
        assert_eq!(p.percent(), 100);
    }

    #[test]
    fn outcome_only_for_terminal() {
        assert!(JobOutcome::from_terminal(snapshot(JobStatus::Importing)).is_none());

        let done = JobOutcome::from_terminal(snapshot(JobStatus::Completed)).unwrap();
        assert!(done.success);
        let failed = JobOutcome::from_terminal(snapshot(JobStatus::Failed)).unwrap();
        assert!(!failed.success);
        assert_eq!(failed.final_state.status, JobStatus::Failed);
    }
}
