//! One import session driven end to end.
//!
//! Every advancing method takes `&mut self`, so a session never has more
//! than one such request outstanding. A forward transition is applied only
//! after the response arrives; a failed request leaves the step unchanged.

use std::sync::Arc;

use hrms_client::ImportBackend;
use hrms_core::analysis::AnalyzeRequest;
use hrms_core::error::CoreError;
use hrms_core::fields::{FieldCatalog, FieldDefinition};
use hrms_core::job::JobOutcome;
use hrms_core::preview::{PreviewRequest, PreviewRow, PreviewView, DEFAULT_PAGE_SIZE};
use hrms_core::upload::{FileUpload, UploadPolicy, UploadedFile};
use hrms_core::workflow::{ImportWorkflow, WorkflowStep};
use tokio::sync::{oneshot, watch};

use crate::error::WorkflowError;
use crate::poller::{spawn_poller, PollHandle, PollStatus, PollerConfig};

/// Drives an [`ImportWorkflow`] against an [`ImportBackend`].
pub struct ImportController<B: ImportBackend + 'static> {
    backend: Arc<B>,
    policy: UploadPolicy,
    catalog: FieldCatalog,
    poller_config: PollerConfig,
    workflow: ImportWorkflow,
    view: PreviewView,
    poll: Option<PollHandle>,
    outcome_rx: Option<oneshot::Receiver<JobOutcome>>,
}

impl<B: ImportBackend + 'static> ImportController<B> {
    /// A session using the spreadsheet upload policy, the built-in field
    /// catalog and default polling.
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            policy: UploadPolicy::spreadsheet(),
            catalog: FieldCatalog::builtin(),
            poller_config: PollerConfig::default(),
            workflow: ImportWorkflow::new(),
            view: PreviewView::new(DEFAULT_PAGE_SIZE),
            poll: None,
            outcome_rx: None,
        }
    }

    pub fn with_policy(mut self, policy: UploadPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_catalog(mut self, catalog: FieldCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn with_poller_config(mut self, config: PollerConfig) -> Self {
        self.poller_config = config;
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.view = PreviewView::new(page_size);
        self
    }

    pub fn workflow(&self) -> &ImportWorkflow {
        &self.workflow
    }

    pub fn step(&self) -> WorkflowStep {
        self.workflow.step()
    }

    pub fn catalog(&self) -> &FieldCatalog {
        &self.catalog
    }

    pub fn policy(&self) -> &UploadPolicy {
        &self.policy
    }

    pub fn view(&self) -> &PreviewView {
        &self.view
    }

    // ---- upload / analyze ----

    /// Validate and upload a file. Validation failures never reach the
    /// backend.
    pub async fn upload(&mut self, file: FileUpload) -> Result<UploadedFile, WorkflowError> {
        self.workflow
            .ensure_step(&[WorkflowStep::Upload], "upload a file")?;
        self.policy.validate(&file.candidate())?;

        let uploaded = self.backend.upload(file).await?;
        self.workflow.file_uploaded(uploaded.clone())?;

        tracing::info!(
            attachment_id = %uploaded.id,
            filename = %uploaded.filename,
            step = %self.workflow.step(),
            "Upload accepted",
        );
        Ok(uploaded)
    }

    /// Request (or repeat) the analysis of the uploaded file. An entity type
    /// override re-runs detection against that entity and replaces the
    /// current mapping.
    pub async fn analyze(&mut self, entity_type: Option<&str>) -> Result<(), WorkflowError> {
        self.workflow.ensure_step(
            &[WorkflowStep::Analyze, WorkflowStep::Map],
            "analyze the file",
        )?;
        let attachment_id = self.attachment_id("analyze the file")?;

        let request = AnalyzeRequest {
            attachment_id,
            entity_type: entity_type.map(str::to_string),
        };
        let analysis = self.backend.analyze(&request).await?;

        tracing::info!(
            attachment_id = %request.attachment_id,
            entity_type = %analysis.entity_type,
            total_rows = analysis.total_rows,
            headers = analysis.headers.len(),
            suggested = analysis.column_mapping.len(),
            "Analysis received",
        );
        self.workflow.analysis_received(analysis)?;
        Ok(())
    }

    // ---- mapping ----

    /// Map `header` to `field`, or clear it with `None`.
    pub fn set_mapping(&mut self, header: &str, field: Option<&str>) -> Result<(), WorkflowError> {
        self.workflow.editor_mut()?.set_mapping(header, field);
        Ok(())
    }

    /// Required fields of the current entity type that no header maps to.
    /// Advisory only; previewing is still allowed.
    pub fn unmapped_required_fields(&self) -> Vec<&FieldDefinition> {
        self.workflow
            .editor()
            .map(|editor| {
                editor.unmapped_required_fields(self.catalog.fields_for(editor.entity_type()))
            })
            .unwrap_or_default()
    }

    // ---- preview ----

    /// Run a dry-run preview of the current mapping. The new result
    /// replaces any previous one and the view returns to page 1.
    pub async fn preview(&mut self) -> Result<(), WorkflowError> {
        self.workflow.ensure_step(
            &[WorkflowStep::Map, WorkflowStep::Preview],
            "preview the import",
        )?;
        let request = self.request_body("preview the import")?;

        let preview = self.backend.preview(&request).await?;

        tracing::info!(
            attachment_id = %request.attachment_id,
            entity_type = %request.entity_type,
            total = preview.summary.total,
            to_create = preview.summary.to_create,
            to_update = preview.summary.to_update,
            errors = preview.summary.errors,
            "Preview received",
        );
        self.workflow.preview_received(preview)?;
        self.view.reset();
        Ok(())
    }

    /// Rows on the current preview page.
    pub fn page_rows(&self) -> Vec<&PreviewRow> {
        self.workflow
            .preview()
            .map(|preview| self.view.page_rows(preview))
            .unwrap_or_default()
    }

    pub fn page_count(&self) -> usize {
        self.workflow
            .preview()
            .map_or(1, |preview| self.view.page_count(preview))
    }

    pub fn set_errors_only(&mut self, errors_only: bool) {
        self.view.set_errors_only(errors_only);
    }

    pub fn set_page(&mut self, page: usize) {
        if let Some(preview) = self.workflow.preview() {
            self.view.set_page(page, preview);
        }
    }

    // ---- confirm / progress ----

    /// Preview -> Confirm.
    pub fn open_confirm(&mut self) -> Result<(), WorkflowError> {
        self.workflow.open_confirm()?;
        tracing::info!(step = %self.workflow.step(), "Confirmation opened");
        Ok(())
    }

    /// Submit the import and start polling its job. Returns the job id.
    pub async fn confirm(&mut self) -> Result<String, WorkflowError> {
        self.workflow
            .ensure_step(&[WorkflowStep::Confirm], "confirm the import")?;
        let request = self.request_body("confirm the import")?;

        let response = self.backend.confirm(&request).await?;
        self.workflow.job_started(response.job_id.clone())?;

        tracing::info!(
            job_id = %response.job_id,
            attachment_id = %request.attachment_id,
            entity_type = %request.entity_type,
            "Import job started",
        );

        let (tx, rx) = oneshot::channel();
        let handle = spawn_poller(
            Arc::clone(&self.backend),
            response.job_id.clone(),
            self.poller_config.clone(),
            move |outcome| {
                // The receiver is gone only if the session was reset.
                let _ = tx.send(outcome);
            },
        );
        self.poll = Some(handle);
        self.outcome_rx = Some(rx);

        Ok(response.job_id)
    }

    /// The latest poll status, if a job is being polled.
    pub fn progress(&self) -> Option<PollStatus> {
        self.poll.as_ref().map(PollHandle::status)
    }

    /// Subscribe to poll status updates for the running job.
    pub fn subscribe_progress(&self) -> Option<watch::Receiver<PollStatus>> {
        self.poll.as_ref().map(PollHandle::subscribe)
    }

    /// Copy the poller's latest snapshot into the workflow state.
    pub fn sync_progress(&mut self) -> Result<Option<PollStatus>, WorkflowError> {
        let Some(status) = self.progress() else {
            return Ok(None);
        };
        if let Some(latest) = &status.latest {
            if self.workflow.step() == WorkflowStep::Progress {
                self.workflow.progress_observed(latest.clone())?;
            }
        }
        Ok(Some(status))
    }

    /// Wait until the job reaches a terminal status, then move to Finished.
    ///
    /// Cancel-safe: dropping the future (e.g. under a timeout) keeps the
    /// outcome channel, so a later call picks up where this one stopped.
    pub async fn wait_for_completion(&mut self) -> Result<JobOutcome, WorkflowError> {
        self.workflow
            .ensure_step(&[WorkflowStep::Progress], "wait for the import job")?;
        let rx = self.outcome_rx.as_mut().ok_or(WorkflowError::PollerStopped)?;

        let received = rx.await;
        self.outcome_rx = None;
        let outcome = received.map_err(|_| WorkflowError::PollerStopped)?;
        self.poll = None;
        self.workflow.job_finished(outcome.clone())?;

        tracing::info!(
            job_id = self.workflow.job_id().unwrap_or_default(),
            success = outcome.success,
            status = %outcome.final_state.status,
            "Import finished",
        );
        Ok(outcome)
    }

    // ---- navigation ----

    /// Go back one step; see [`ImportWorkflow::back`].
    pub fn back(&mut self) -> Result<WorkflowStep, WorkflowError> {
        let from = self.workflow.step();
        let to = self.workflow.back()?;
        if to != WorkflowStep::Preview {
            self.view.reset();
        }
        tracing::info!(from = %from, to = %to, "Stepped back");
        Ok(to)
    }

    /// Abandon the session: stop polling and return to Upload.
    pub fn reset(&mut self) {
        if let Some(handle) = self.poll.take() {
            handle.cancel();
        }
        self.outcome_rx = None;
        self.workflow.reset();
        self.view.reset();
        tracing::info!("Import session reset");
    }

    // ---- private helpers ----

    fn attachment_id(&self, action: &'static str) -> Result<String, CoreError> {
        self.workflow
            .file()
            .map(|file| file.id.clone())
            .ok_or(CoreError::InvalidTransition {
                from: self.workflow.step().as_str(),
                action,
            })
    }

    fn request_body(&self, action: &'static str) -> Result<PreviewRequest, CoreError> {
        self.workflow
            .preview_request()
            .ok_or(CoreError::InvalidTransition {
                from: self.workflow.step().as_str(),
                action,
            })
    }
}
