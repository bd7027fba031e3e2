//! Plain-text rendering of analysis, preview and job progress.

use std::fmt::Write;

use hrms_core::fields::FieldDefinition;
use hrms_core::job::{JobOutcome, JobProgress};
use hrms_core::mapping::MappingEditor;
use hrms_core::preview::{PreviewRow, PreviewSummary, PreviewView, RowStatus};
use hrms_workflow::PollStatus;

/// Column mapping with confidence, followed by advisory warnings.
pub fn format_mapping(editor: &MappingEditor, missing: &[&FieldDefinition]) -> String {
    let analysis = editor.analysis();
    let mut out = format!(
        "Detected {} ({} rows)\n",
        analysis.entity_type, analysis.total_rows
    );

    for header in &analysis.headers {
        match editor.mapping().get(header) {
            Some(field) => {
                let _ = write!(out, "  {header} -> {field}");
                if let Some(level) = editor.confidence_level(header) {
                    let _ = write!(out, " ({})", level.as_str());
                }
                out.push('\n');
            }
            None => {
                let _ = writeln!(out, "  {header} -> (not imported)");
            }
        }
    }

    for (field, headers) in editor.duplicate_targets() {
        let _ = writeln!(
            out,
            "Warning: {field} is mapped from more than one column: {}",
            headers.join(", ")
        );
    }

    if !missing.is_empty() {
        let names: Vec<&str> = missing.iter().map(|f| f.display_name.as_str()).collect();
        let _ = writeln!(out, "Warning: required fields not mapped: {}", names.join(", "));
    }

    out.trim_end().to_string()
}

pub fn format_summary(summary: &PreviewSummary) -> String {
    format!(
        "{} rows: {} to create, {} to update, {} to skip, {} errors, {} warnings",
        summary.total,
        summary.to_create,
        summary.to_update,
        summary.to_skip,
        summary.errors,
        summary.warnings
    )
}

/// One line per row, with cell errors and transformed values indented
/// beneath.
pub fn format_rows(rows: &[&PreviewRow], view: &PreviewView, page_count: usize) -> String {
    let mut out = format!("Page {} of {}", view.page(), page_count);
    if view.errors_only() {
        out.push_str(" (errors only)");
    }
    out.push('\n');

    if rows.is_empty() {
        out.push_str("  (no rows)");
        return out;
    }

    for row in rows {
        let status = match row.status() {
            RowStatus::Error => "error",
            RowStatus::Changed => "changed",
            RowStatus::Unchanged => "unchanged",
        };
        let _ = writeln!(out, "  Row {} [{status}]", row.row_number);
        for (field, cell) in &row.cells {
            if let Some(error) = cell.error.as_deref().filter(|_| cell.has_error()) {
                let _ = writeln!(out, "    {field}: {error}");
            } else if cell.is_changed() {
                let _ = writeln!(
                    out,
                    "    {field}: {} -> {}",
                    display_value(&cell.original),
                    display_value(&cell.transformed)
                );
            }
        }
    }

    out.trim_end().to_string()
}

pub fn format_progress(progress: &JobProgress) -> String {
    format!(
        "{} {}% ({}/{}, {} errors)",
        progress.status.label(),
        progress.percent(),
        progress.processed,
        progress.total,
        progress.error_count
    )
}

/// A progress line for the latest poll, or `None` before the first answer.
pub fn format_poll_status(status: &PollStatus) -> Option<String> {
    let mut line = match &status.latest {
        Some(progress) => format_progress(progress),
        None if status.consecutive_failures > 0 => "Waiting for job status".to_string(),
        None => return None,
    };
    if status.stalled {
        let _ = write!(
            line,
            " [no response for {} polls]",
            status.consecutive_failures
        );
    }
    Some(line)
}

pub fn format_outcome(outcome: &JobOutcome) -> String {
    let state = &outcome.final_state;
    let mut out = if outcome.success {
        format!(
            "Import completed: {} imported, {} failed",
            state.success_count, state.error_count
        )
    } else {
        format!(
            "Import {}: {} imported, {} failed",
            state.status.label().to_lowercase(),
            state.success_count,
            state.error_count
        )
    };

    for error in &state.errors {
        match error.row {
            Some(row) => {
                let _ = write!(out, "\n  Row {row}: {}", error.message);
            }
            None => {
                let _ = write!(out, "\n  {}", error.message);
            }
        }
    }
    out
}

fn display_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => "(empty)".to_string(),
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hrms_core::analysis::AnalysisResult;
    use hrms_core::fields::{FieldCatalog, ENTITY_EMPLOYEES};
    use hrms_core::job::JobStatus;
    use hrms_core::preview::PreviewResult;
    use serde_json::json;

    fn editor() -> MappingEditor {
        // Parsed from text so the mapping keeps its column order.
        let analysis: AnalysisResult = serde_json::from_str(
            r#"{
                "entity_type": "employees",
                "total_rows": 3,
                "headers": ["Name", "DOB", "Dept"],
                "column_mapping": {"Name": "full_name", "Dept": "full_name"},
                "mapping_confidence": {"Name": 0.93, "Dept": 0.4}
            }"#,
        )
        .unwrap();
        MappingEditor::new(analysis)
    }

    fn progress(status: JobStatus) -> JobProgress {
        serde_json::from_value(json!({
            "status": status,
            "processed": 4,
            "total": 10,
            "success_count": 3,
            "error_count": 1,
            "errors": [{"row": 2, "message": "Duplicate employee number"}]
        }))
        .unwrap()
    }

    #[test]
    fn mapping_lists_headers_and_warnings() {
        let editor = editor();
        let catalog = FieldCatalog::builtin();
        let missing = editor.unmapped_required_fields(catalog.fields_for(ENTITY_EMPLOYEES));
        let text = format_mapping(&editor, &missing);

        assert!(text.starts_with("Detected employees (3 rows)"));
        assert!(text.contains("  Name -> full_name (high)"));
        assert!(text.contains("  DOB -> (not imported)"));
        assert!(text.contains("  Dept -> full_name (low)"));
        assert!(text.contains("full_name is mapped from more than one column: Name, Dept"));
        assert!(text.contains("required fields not mapped: Date of Birth"));
    }

    #[test]
    fn rows_show_errors_and_changes() {
        let preview: PreviewResult = serde_json::from_value(json!({
            "summary": {"total": 2, "to_create": 1, "errors": 1},
            "rows": [
                {"row_number": 1, "cells": {
                    "full_name": {"original": "ada", "transformed": "Ada"}}},
                {"row_number": 2, "cells": {
                    "date_of_birth": {"original": "31/02", "transformed": null, "error": "Invalid date"}}}
            ]
        }))
        .unwrap();
        let view = PreviewView::default();
        let rows = view.page_rows(&preview);

        let text = format_rows(&rows, &view, view.page_count(&preview));
        assert_eq!(
            text,
            "Page 1 of 1\n  Row 1 [changed]\n    full_name: ada -> Ada\n  Row 2 [error]\n    date_of_birth: Invalid date"
        );
        assert_eq!(
            format_summary(&preview.summary),
            "2 rows: 1 to create, 0 to update, 0 to skip, 1 errors, 0 warnings"
        );
    }

    #[test]
    fn empty_page() {
        let mut view = PreviewView::default();
        view.set_errors_only(true);
        assert_eq!(format_rows(&[], &view, 1), "Page 1 of 1 (errors only)\n  (no rows)");
    }

    #[test]
    fn poll_status_lines() {
        assert_eq!(format_poll_status(&PollStatus::default()), None);

        let status = PollStatus {
            latest: Some(progress(JobStatus::Importing)),
            consecutive_failures: 6,
            stalled: true,
        };
        assert_eq!(
            format_poll_status(&status).unwrap(),
            "Importing 40% (4/10, 1 errors) [no response for 6 polls]"
        );
    }

    #[test]
    fn outcome_lines() {
        let done = JobOutcome::from_terminal(progress(JobStatus::Completed)).unwrap();
        assert_eq!(
            format_outcome(&done),
            "Import completed: 3 imported, 1 failed\n  Row 2: Duplicate employee number"
        );

        let rolled_back = JobOutcome::from_terminal(progress(JobStatus::RolledBack)).unwrap();
        assert!(format_outcome(&rolled_back).starts_with("Import rolled back:"));
    }
}
