//! Dry-run preview results and their client-side pagination.
//!
//! A [`PreviewResult`] is fetched once per mapping configuration and replaced
//! wholesale by the next dry run. [`PreviewView`] slices the cached rows
//! without any further server round-trip.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::types::EntityId;

/// Default number of rows per preview page.
pub const DEFAULT_PAGE_SIZE: usize = 25;

/// Body of `POST /preview` and `POST /confirm`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreviewRequest {
    pub attachment_id: EntityId,
    pub entity_type: String,
    pub mapping: IndexMap<String, String>,
}

/// Aggregate counts reported by the dry run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewSummary {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub to_create: u64,
    #[serde(default)]
    pub to_update: u64,
    #[serde(default)]
    pub to_skip: u64,
    #[serde(default)]
    pub errors: u64,
    #[serde(default)]
    pub warnings: u64,
}

impl PreviewSummary {
    /// Number of rows that would change something.
    pub fn actionable(&self) -> u64 {
        self.to_create + self.to_update
    }
}

/// Server-side action planned for a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowAction {
    Create,
    Update,
    Skip,
    Error,
}

/// One cell before and after transformation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewCell {
    #[serde(default)]
    pub original: serde_json::Value,
    #[serde(default)]
    pub transformed: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PreviewCell {
    pub fn has_error(&self) -> bool {
        self.error.as_deref().is_some_and(|e| !e.is_empty())
    }

    pub fn is_changed(&self) -> bool {
        self.transformed != self.original
    }
}

/// Display classification of a preview row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowStatus {
    Error,
    Changed,
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewRow {
    pub row_number: u64,
    #[serde(default)]
    pub action: Option<RowAction>,
    /// Cells keyed by target field, in server order.
    #[serde(default)]
    pub cells: IndexMap<String, PreviewCell>,
}

impl PreviewRow {
    /// `Error` if any cell carries an error; `Changed` if any other cell's
    /// value was transformed; otherwise `Unchanged`.
    pub fn status(&self) -> RowStatus {
        if self.cells.values().any(PreviewCell::has_error) {
            RowStatus::Error
        } else if self.cells.values().any(PreviewCell::is_changed) {
            RowStatus::Changed
        } else {
            RowStatus::Unchanged
        }
    }

    pub fn is_error(&self) -> bool {
        self.status() == RowStatus::Error
    }
}

/// Result of `POST /preview`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PreviewResult {
    #[serde(default)]
    pub summary: PreviewSummary,
    #[serde(default)]
    pub rows: Vec<PreviewRow>,
}

impl PreviewResult {
    /// Confirmation is only offered when the import would create or update
    /// at least one row. Rows with errors do not block it.
    pub fn can_confirm(&self) -> bool {
        self.summary.actionable() > 0
    }

    pub fn error_rows(&self) -> impl Iterator<Item = &PreviewRow> {
        self.rows.iter().filter(|r| r.is_error())
    }
}

// ---------------------------------------------------------------------------
// Pagination
// ---------------------------------------------------------------------------

/// Page position and filter over a cached [`PreviewResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreviewView {
    page: usize,
    page_size: usize,
    errors_only: bool,
}

impl Default for PreviewView {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl PreviewView {
    /// A view on page 1 with all rows visible. A page size of 0 is treated
    /// as 1.
    pub fn new(page_size: usize) -> Self {
        Self {
            page: 1,
            page_size: page_size.max(1),
            errors_only: false,
        }
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn errors_only(&self) -> bool {
        self.errors_only
    }

    /// Toggle the error filter. Always returns to page 1, since the filtered
    /// set may have fewer pages than the current position.
    pub fn set_errors_only(&mut self, errors_only: bool) {
        self.errors_only = errors_only;
        self.page = 1;
    }

    /// Move to `page`, clamped to `[1, page_count]`.
    pub fn set_page(&mut self, page: usize, result: &PreviewResult) {
        self.page = page.clamp(1, self.page_count(result));
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.page_size);
    }

    /// Rows after filtering, before pagination.
    pub fn filtered<'a>(&self, result: &'a PreviewResult) -> Vec<&'a PreviewRow> {
        result
            .rows
            .iter()
            .filter(|r| !self.errors_only || r.is_error())
            .collect()
    }

    /// Number of pages for the filtered rows; at least 1.
    pub fn page_count(&self, result: &PreviewResult) -> usize {
        self.filtered(result).len().div_ceil(self.page_size).max(1)
    }

    /// The rows on the current page. Empty when the page is past the end.
    pub fn page_rows<'a>(&self, result: &'a PreviewResult) -> Vec<&'a PreviewRow> {
        let start = (self.page - 1) * self.page_size;
        self.filtered(result)
            .into_iter()
            .skip(start)
            .take(self.page_size)
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cell(original: serde_json::Value, transformed: serde_json::Value) -> PreviewCell {
        PreviewCell {
            original,
            transformed,
            error: None,
        }
    }

    fn row(n: u64, error: bool) -> PreviewRow {
        let mut cells = IndexMap::new();
        cells.insert("full_name".to_string(), cell(json!("ada"), json!("Ada")));
        if error {
            cells.insert(
                "date_of_birth".to_string(),
                PreviewCell {
                    original: json!("31/02/1990"),
                    transformed: json!(null),
                    error: Some("Invalid date".to_string()),
                },
            );
        }
        PreviewRow {
            row_number: n,
            action: None,
            cells,
        }
    }

    /// 10 rows; rows 3, 6 and 9 have errors.
    fn result() -> PreviewResult {
        PreviewResult {
            summary: PreviewSummary {
                total: 10,
                to_create: 7,
                errors: 3,
                ..Default::default()
            },
            rows: (1..=10).map(|n| row(n, n % 3 == 0)).collect(),
        }
    }

    fn numbers(rows: &[&PreviewRow]) -> Vec<u64> {
        rows.iter().map(|r| r.row_number).collect()
    }

    // -- classification --

    #[test]
    fn row_with_any_cell_error_is_error() {
        assert_eq!(row(1, true).status(), RowStatus::Error);
    }

    #[test]
    fn changed_and_unchanged_rows() {
        assert_eq!(row(1, false).status(), RowStatus::Changed);

        let mut cells = IndexMap::new();
        cells.insert("a".to_string(), cell(json!(1), json!(1)));
        let same = PreviewRow {
            row_number: 1,
            action: Some(RowAction::Skip),
            cells,
        };
        assert_eq!(same.status(), RowStatus::Unchanged);
    }

    #[test]
    fn empty_error_string_is_not_an_error() {
        let mut c = cell(json!(1), json!(1));
        c.error = Some(String::new());
        assert!(!c.has_error());
    }

    // -- confirmation --

    #[test]
    fn nothing_to_create_or_update_cannot_confirm() {
        let mut r = result();
        r.summary.to_create = 0;
        r.summary.to_update = 0;
        assert!(!r.can_confirm());
    }

    #[test]
    fn errors_do_not_block_confirm() {
        let r = result();
        assert!(r.summary.errors > 0);
        assert!(r.can_confirm());
    }

    // -- pagination --

    #[test]
    fn pages_slice_rows() {
        let r = result();
        let mut view = PreviewView::new(4);
        assert_eq!(view.page_count(&r), 3);
        assert_eq!(numbers(&view.page_rows(&r)), [1, 2, 3, 4]);

        view.set_page(3, &r);
        assert_eq!(numbers(&view.page_rows(&r)), [9, 10]);
    }

    #[test]
    fn slicing_is_idempotent() {
        let r = result();
        let mut view = PreviewView::new(3);
        view.set_page(2, &r);
        assert_eq!(view.page_rows(&r), view.page_rows(&r));
    }

    #[test]
    fn error_filter_applies_before_pagination() {
        let r = result();
        let mut view = PreviewView::new(2);
        view.set_errors_only(true);
        assert_eq!(view.page_count(&r), 2);
        assert_eq!(numbers(&view.page_rows(&r)), [3, 6]);
    }

    #[test]
    fn toggling_filter_resets_page() {
        let r = result();
        let mut view = PreviewView::new(2);
        view.set_page(5, &r);
        assert_eq!(view.page(), 5);

        view.set_errors_only(true);
        assert_eq!(view.page(), 1);
        view.set_errors_only(false);
        assert_eq!(view.page(), 1);
    }

    #[test]
    fn set_page_clamps() {
        let r = result();
        let mut view = PreviewView::new(4);
        view.set_page(99, &r);
        assert_eq!(view.page(), 3);
        view.set_page(0, &r);
        assert_eq!(view.page(), 1);
    }

    #[test]
    fn empty_result_has_one_empty_page() {
        let r = PreviewResult::default();
        let view = PreviewView::default();
        assert_eq!(view.page_count(&r), 1);
        assert!(view.page_rows(&r).is_empty());
    }

    #[test]
    fn zero_page_size_is_coerced() {
        assert_eq!(PreviewView::new(0).page_size(), 1);
    }

    #[test]
    fn deserializes_server_payload() {
        let r: PreviewResult = serde_json::from_value(json!({
            "summary": {"total": 2, "to_create": 1, "to_update": 1},
            "rows": [
                {"row_number": 1, "action": "create",
                 "cells": {"full_name": {"original": "ada", "transformed": "Ada"}}},
                {"row_number": 2, "action": "error",
                 "cells": {"email": {"original": "x", "transformed": null, "error": "Invalid email"}}}
            ]
        }))
        .unwrap();

        assert_eq!(r.summary.actionable(), 2);
        assert_eq!(r.rows[0].action, Some(RowAction::Create));
        assert_eq!(r.error_rows().count(), 1);
    }
}
