//! In-memory [`ImportBackend`] with scripted job progress.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use hrms_client::{ApiError, ImportBackend, ProgressSource};
use hrms_core::analysis::{AnalysisResult, AnalyzeRequest};
use hrms_core::job::{ConfirmResponse, JobProgress, JobStatus};
use hrms_core::preview::{PreviewRequest, PreviewResult};
use hrms_core::upload::{FileUpload, UploadedFile};
use serde_json::json;

/// One scripted answer to `job_progress`.
#[derive(Debug, Clone, Copy)]
pub enum Poll {
    Status(JobStatus),
    Fail,
}

pub fn snapshot(status: JobStatus) -> JobProgress {
    serde_json::from_value(json!({
        "status": status,
        "processed": 3,
        "total": 10,
        "success_count": 3,
        "error_count": 0
    }))
    .unwrap()
}

/// The `payroll.csv` analysis: three headers, only `Name` suggested.
pub fn employees_analysis() -> AnalysisResult {
    serde_json::from_value(json!({
        "entity_type": "employees",
        "total_rows": 3,
        "headers": ["Name", "DOB", "Dept"],
        "column_mapping": {"Name": "full_name"},
        "mapping_confidence": {"Name": 0.93}
    }))
    .unwrap()
}

/// A preview of `rows` rows where every third row has a cell error.
pub fn preview_result(to_create: u64, to_update: u64, rows: u64) -> PreviewResult {
    let rows: Vec<_> = (1..=rows)
        .map(|n| {
            let error = if n % 3 == 0 {
                json!("Invalid date")
            } else {
                json!(null)
            };
            json!({
                "row_number": n,
                "action": if n % 3 == 0 { "error" } else { "create" },
                "cells": {
                    "full_name": {"original": format!("row {n}"), "transformed": format!("Row {n}")},
                    "date_of_birth": {"original": "1990-01-01", "transformed": "1990-01-01", "error": error}
                }
            })
        })
        .collect();

    serde_json::from_value(json!({
        "summary": {
            "total": rows.len(),
            "to_create": to_create,
            "to_update": to_update,
            "errors": rows.len() / 3
        },
        "rows": rows
    }))
    .unwrap()
}

pub struct FakeBackend {
    analysis: AnalysisResult,
    preview: PreviewResult,
    preview_error: Option<(u16, String)>,
    polls: Mutex<VecDeque<Poll>>,
    last_poll: Mutex<Poll>,
    pub last_analyze: Mutex<Option<AnalyzeRequest>>,
    pub last_preview: Mutex<Option<PreviewRequest>>,
    pub uploads: AtomicUsize,
    pub analyze_calls: AtomicUsize,
    pub preview_calls: AtomicUsize,
    pub confirm_calls: AtomicUsize,
    pub progress_calls: AtomicUsize,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            analysis: employees_analysis(),
            preview: preview_result(3, 0, 10),
            preview_error: None,
            polls: Mutex::new(VecDeque::new()),
            last_poll: Mutex::new(Poll::Status(JobStatus::Completed)),
            last_analyze: Mutex::new(None),
            last_preview: Mutex::new(None),
            uploads: AtomicUsize::new(0),
            analyze_calls: AtomicUsize::new(0),
            preview_calls: AtomicUsize::new(0),
            confirm_calls: AtomicUsize::new(0),
            progress_calls: AtomicUsize::new(0),
        }
    }

    /// Answer polls in order; the last answer repeats once the script runs out.
    pub fn with_polls(self, polls: impl IntoIterator<Item = Poll>) -> Self {
        let polls: VecDeque<Poll> = polls.into_iter().collect();
        if let Some(last) = polls.back() {
            *self.last_poll.lock().unwrap() = *last;
        }
        *self.polls.lock().unwrap() = polls;
        self
    }

    pub fn with_preview(mut self, preview: PreviewResult) -> Self {
        self.preview = preview;
        self
    }

    pub fn with_preview_error(mut self, status: u16, message: &str) -> Self {
        self.preview_error = Some((status, message.to_string()));
        self
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProgressSource for FakeBackend {
    async fn job_progress(&self, _job_id: &str) -> Result<JobProgress, ApiError> {
        self.progress_calls.fetch_add(1, Ordering::SeqCst);
        let next = self
            .polls
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(*self.last_poll.lock().unwrap());
        match next {
            Poll::Status(status) => Ok(snapshot(status)),
            Poll::Fail => Err(ApiError::Server {
                status: 503,
                message: Some("Service unavailable".into()),
            }),
        }
    }
}

#[async_trait]
impl ImportBackend for FakeBackend {
    async fn upload(&self, file: FileUpload) -> Result<UploadedFile, ApiError> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        Ok(UploadedFile {
            id: "att-1".into(),
            size_bytes: file.bytes.len() as u64,
            filename: file.filename,
            content_type: file.content_type,
        })
    }

    async fn analyze(&self, request: &AnalyzeRequest) -> Result<AnalysisResult, ApiError> {
        self.analyze_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_analyze.lock().unwrap() = Some(request.clone());
        let mut analysis = self.analysis.clone();
        if let Some(entity_type) = &request.entity_type {
            analysis.entity_type = entity_type.clone();
            analysis.column_mapping.clear();
        }
        Ok(analysis)
    }

    async fn preview(&self, request: &PreviewRequest) -> Result<PreviewResult, ApiError> {
        self.preview_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_preview.lock().unwrap() = Some(request.clone());
        if let Some((status, message)) = &self.preview_error {
            return Err(ApiError::Server {
                status: *status,
                message: Some(message.clone()),
            });
        }
        Ok(self.preview.clone())
    }

    async fn confirm(&self, _request: &PreviewRequest) -> Result<ConfirmResponse, ApiError> {
        self.confirm_calls.fetch_add(1, Ordering::SeqCst);
        Ok(ConfirmResponse {
            job_id: "job-9".into(),
        })
    }
}
