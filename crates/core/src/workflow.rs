//! Import workflow step sequencer.
//!
//! [`ImportWorkflow`] is a pure state machine: each state carries exactly the
//! data that step needs, and every forward transition is applied only once
//! the corresponding server response is in hand. Async request handling lives
//! in `hrms-workflow`; this module decides which transitions are legal.
//!
//! ```text
//! Upload -> Analyze -> Map -> Preview -> Confirm -> Progress -> Finished
//!             ^  |      ^  |     ^  |       |
//!             +--+      +--+     +--+       |   (back edges)
//!                                 +---------+
//! ```

use serde::{Deserialize, Serialize};

use crate::analysis::AnalysisResult;
use crate::error::CoreError;
use crate::job::{JobOutcome, JobProgress};
use crate::mapping::MappingEditor;
use crate::preview::{PreviewRequest, PreviewResult};
use crate::types::EntityId;
use crate::upload::UploadedFile;

// ---------------------------------------------------------------------------
// Steps
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStep {
    Upload,
    Analyze,
    Map,
    Preview,
    Confirm,
    Progress,
    Finished,
}

impl WorkflowStep {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Upload => "upload",
            Self::Analyze => "analyze",
            Self::Map => "map",
            Self::Preview => "preview",
            Self::Confirm => "confirm",
            Self::Progress => "progress",
            Self::Finished => "finished",
        }
    }

    /// Human-readable label for the step.
    pub fn label(self) -> &'static str {
        match self {
            Self::Upload => "Upload File",
            Self::Analyze => "Analyze",
            Self::Map => "Map Columns",
            Self::Preview => "Preview",
            Self::Confirm => "Confirm",
            Self::Progress => "Importing",
            Self::Finished => "Done",
        }
    }
}

impl std::fmt::Display for WorkflowStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// The workflow state with its step payload.
#[derive(Debug, Clone)]
pub enum WorkflowState {
    Upload,
    Analyze {
        file: UploadedFile,
    },
    Map {
        file: UploadedFile,
        editor: MappingEditor,
    },
    Preview {
        file: UploadedFile,
        editor: MappingEditor,
        preview: PreviewResult,
    },
    Confirm {
        file: UploadedFile,
        editor: MappingEditor,
        preview: PreviewResult,
    },
    Progress {
        file: UploadedFile,
        job_id: EntityId,
        latest: Option<JobProgress>,
    },
    Finished {
        file: UploadedFile,
        job_id: EntityId,
        outcome: JobOutcome,
    },
}

impl WorkflowState {
    pub fn step(&self) -> WorkflowStep {
        match self {
            Self::Upload => WorkflowStep::Upload,
            Self::Analyze { .. } => WorkflowStep::Analyze,
            Self::Map { .. } => WorkflowStep::Map,
            Self::Preview { .. } => WorkflowStep::Preview,
            Self::Confirm { .. } => WorkflowStep::Confirm,
            Self::Progress { .. } => WorkflowStep::Progress,
            Self::Finished { .. } => WorkflowStep::Finished,
        }
    }
}

/// Step sequencer for one import session.
#[derive(Debug, Clone)]
pub struct ImportWorkflow {
    state: WorkflowState,
}

impl Default for ImportWorkflow {
    fn default() -> Self {
        Self::new()
    }
}

impl ImportWorkflow {
    pub fn new() -> Self {
        Self {
            state: WorkflowState::Upload,
        }
    }

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    pub fn step(&self) -> WorkflowStep {
        self.state.step()
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.state, WorkflowState::Finished { .. })
    }

    // -- accessors --

    pub fn file(&self) -> Option<&UploadedFile> {
        match &self.state {
            WorkflowState::Upload => None,
            WorkflowState::Analyze { file }
            | WorkflowState::Map { file, .. }
            | WorkflowState::Preview { file, .. }
            | WorkflowState::Confirm { file, .. }
            | WorkflowState::Progress { file, .. }
            | WorkflowState::Finished { file, .. } => Some(file),
        }
    }

    pub fn editor(&self) -> Option<&MappingEditor> {
        match &self.state {
            WorkflowState::Map { editor, .. }
            | WorkflowState::Preview { editor, .. }
            | WorkflowState::Confirm { editor, .. } => Some(editor),
            _ => None,
        }
    }

    /// Mutable access to the mapping. Only available while mapping; changing
    /// the mapping from a later step requires going back first.
    pub fn editor_mut(&mut self) -> Result<&mut MappingEditor, CoreError> {
        let step = self.step();
        match &mut self.state {
            WorkflowState::Map { editor, .. } => Ok(editor),
            _ => Err(CoreError::InvalidTransition {
                from: step.as_str(),
                action: "edit the mapping",
            }),
        }
    }

    pub fn preview(&self) -> Option<&PreviewResult> {
        match &self.state {
            WorkflowState::Preview { preview, .. } | WorkflowState::Confirm { preview, .. } => {
                Some(preview)
            }
            _ => None,
        }
    }

    pub fn job_id(&self) -> Option<&str> {
        match &self.state {
            WorkflowState::Progress { job_id, .. } | WorkflowState::Finished { job_id, .. } => {
                Some(job_id)
            }
            _ => None,
        }
    }

    pub fn latest_progress(&self) -> Option<&JobProgress> {
        match &self.state {
            WorkflowState::Progress { latest, .. } => latest.as_ref(),
            WorkflowState::Finished { outcome, .. } => Some(&outcome.final_state),
            _ => None,
        }
    }

    pub fn outcome(&self) -> Option<&JobOutcome> {
        match &self.state {
            WorkflowState::Finished { outcome, .. } => Some(outcome),
            _ => None,
        }
    }

    /// The dry-run / confirm request body for the current mapping.
    pub fn preview_request(&self) -> Option<PreviewRequest> {
        let file = self.file()?;
        let editor = self.editor()?;
        Some(PreviewRequest {
            attachment_id: file.id.clone(),
            entity_type: editor.entity_type().to_string(),
            mapping: editor.mapping().clone(),
        })
    }

    // -- guards --

    /// Fail unless the workflow is in one of `allowed`. Used to reject a
    /// request before it is sent.
    pub fn ensure_step(
        &self,
        allowed: &[WorkflowStep],
        action: &'static str,
    ) -> Result<(), CoreError> {
        let step = self.step();
        if allowed.contains(&step) {
            Ok(())
        } else {
            Err(CoreError::InvalidTransition {
                from: step.as_str(),
                action,
            })
        }
    }

    /// Whether the confirm step can be opened from the current state.
    pub fn can_open_confirm(&self) -> bool {
        matches!(&self.state, WorkflowState::Preview { preview, .. } if preview.can_confirm())
    }

    // -- forward transitions --

    /// Upload -> Analyze, once the upload request returned a file reference.
    pub fn file_uploaded(&mut self, file: UploadedFile) -> Result<(), CoreError> {
        self.ensure_step(&[WorkflowStep::Upload], "record an uploaded file")?;
        self.state = WorkflowState::Analyze { file };
        Ok(())
    }

    /// Analyze -> Map, or Map -> Map when re-analysing with an entity-type
    /// override. A re-analysis replaces the previous mapping.
    pub fn analysis_received(&mut self, analysis: AnalysisResult) -> Result<(), CoreError> {
        match self.take() {
            WorkflowState::Analyze { file } | WorkflowState::Map { file, .. } => {
                self.state = WorkflowState::Map {
                    file,
                    editor: MappingEditor::new(analysis),
                };
                Ok(())
            }
            other => self.restore(other, "apply an analysis result"),
        }
    }

    /// Map -> Preview, or Preview -> Preview when a new dry run supersedes
    /// the previous one. Old and new previews are never merged.
    pub fn preview_received(&mut self, preview: PreviewResult) -> Result<(), CoreError> {
        match self.take() {
            WorkflowState::Map { file, editor } | WorkflowState::Preview { file, editor, .. } => {
                self.state = WorkflowState::Preview {
                    file,
                    editor,
                    preview,
                };
                Ok(())
            }
            other => self.restore(other, "apply a preview"),
        }
    }

    /// Preview -> Confirm. Rejected when the preview would neither create
    /// nor update any row.
    pub fn open_confirm(&mut self) -> Result<(), CoreError> {
        match self.take() {
            WorkflowState::Preview {
                file,
                editor,
                preview,
            } => {
                if !preview.can_confirm() {
                    self.state = WorkflowState::Preview {
                        file,
                        editor,
                        preview,
                    };
                    return Err(CoreError::Validation(
                        "Nothing to import: no rows would be created or updated".to_string(),
                    ));
                }
                self.state = WorkflowState::Confirm {
                    file,
                    editor,
                    preview,
                };
                Ok(())
            }
            other => self.restore(other, "open confirmation"),
        }
    }

    /// Confirm -> Progress, once the server accepted the import job.
    pub fn job_started(&mut self, job_id: EntityId) -> Result<(), CoreError> {
        match self.take() {
            WorkflowState::Confirm { file, .. } => {
                self.state = WorkflowState::Progress {
                    file,
                    job_id,
                    latest: None,
                };
                Ok(())
            }
            other => self.restore(other, "start an import job"),
        }
    }

    /// Record a polled snapshot while the job runs.
    pub fn progress_observed(&mut self, snapshot: JobProgress) -> Result<(), CoreError> {
        let step = self.step();
        match &mut self.state {
            WorkflowState::Progress { latest, .. } => {
                *latest = Some(snapshot);
                Ok(())
            }
            _ => Err(CoreError::InvalidTransition {
                from: step.as_str(),
                action: "record job progress",
            }),
        }
    }

    /// Progress -> Finished. The outcome must carry a terminal status.
    pub fn job_finished(&mut self, outcome: JobOutcome) -> Result<(), CoreError> {
        if !outcome.final_state.status.is_terminal() {
            return Err(CoreError::Validation(format!(
                "Job status {} is not terminal",
                outcome.final_state.status
            )));
        }
        match self.take() {
            WorkflowState::Progress { file, job_id, .. } => {
                self.state = WorkflowState::Finished {
                    file,
                    job_id,
                    outcome,
                };
                Ok(())
            }
            other => self.restore(other, "finish the import job"),
        }
    }

    // -- back / reset --

    /// Go back one step. Leaving a step discards the data it produced, except
    /// that Confirm -> Preview keeps the preview it was opened from.
    pub fn back(&mut self) -> Result<WorkflowStep, CoreError> {
        self.state = match self.take() {
            WorkflowState::Analyze { .. } => WorkflowState::Upload,
            WorkflowState::Map { file, .. } => WorkflowState::Analyze { file },
            WorkflowState::Preview { file, editor, .. } => WorkflowState::Map { file, editor },
            WorkflowState::Confirm {
                file,
                editor,
                preview,
            } => WorkflowState::Preview {
                file,
                editor,
                preview,
            },
            other => return self.restore(other, "go back"),
        };
        Ok(self.step())
    }

    /// Discard everything and return to Upload.
    pub fn reset(&mut self) {
        self.state = WorkflowState::Upload;
    }

    // ---- private helpers ----

    fn take(&mut self) -> WorkflowState {
        std::mem::replace(&mut self.state, WorkflowState::Upload)
    }

    fn restore<T>(&mut self, state: WorkflowState, action: &'static str) -> Result<T, CoreError> {
        let from = state.step().as_str();
        self.state = state;
        Err(CoreError::InvalidTransition { from, action })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
