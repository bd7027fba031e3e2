//! Join configuration for multi-file dataset merges.
//!
//! [`JoinGraph`] holds the files participating in a merge and the ordered
//! join configurations between them. The merge itself runs server-side; this
//! module only validates selections, keeps ordering consistent, and computes
//! the relationship-diagram layout.

use std::f64::consts::PI;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::EntityId;

// ---------------------------------------------------------------------------
// Join type
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinType {
    #[default]
    Inner,
    Left,
    Right,
    Outer,
}

impl JoinType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inner => "inner",
            Self::Left => "left",
            Self::Right => "right",
            Self::Outer => "outer",
        }
    }

}

impl FromStr for JoinType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inner" => Ok(Self::Inner),
            "left" => Ok(Self::Left),
            "right" => Ok(Self::Right),
            "outer" => Ok(Self::Outer),
            other => Err(CoreError::Validation(format!(
                "Unknown join type '{other}'. Expected inner, left, right or outer"
            ))),
        }
    }
}

/// Diagram edge style for a join.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeStyle {
    Solid,
    Dashed,
}

impl EdgeStyle {
    pub fn for_join_type(join_type: JoinType) -> Self {
        match join_type {
            JoinType::Inner => Self::Solid,
            _ => Self::Dashed,
        }
    }
}

// ---------------------------------------------------------------------------
// Configurations
// ---------------------------------------------------------------------------

/// Metadata attached to a join proposed by the server's relationship
/// detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinSuggestion {
    pub confidence: f64,
    #[serde(default)]
    pub reasoning: Option<String>,
    /// e.g. `one_to_many`.
    #[serde(default)]
    pub relationship_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinConfiguration {
    /// Empty until the configuration is saved into a [`JoinGraph`].
    #[serde(default)]
    pub id: String,
    pub left_file: EntityId,
    pub left_column: String,
    pub right_file: EntityId,
    pub right_column: String,
    #[serde(default)]
    pub join_type: JoinType,
    #[serde(default)]
    pub order: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<JoinSuggestion>,
}

impl JoinConfiguration {
    /// A new, unsaved configuration.
    pub fn new(
        left_file: impl Into<EntityId>,
        left_column: impl Into<String>,
        right_file: impl Into<EntityId>,
        right_column: impl Into<String>,
        join_type: JoinType,
    ) -> Self {
        Self {
            id: String::new(),
            left_file: left_file.into(),
            left_column: left_column.into(),
            right_file: right_file.into(),
            right_column: right_column.into(),
            join_type,
            order: 0,
            suggestion: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: JoinSuggestion) -> Self {
        self.suggestion = Some(suggestion);
        self
    }

    pub fn references(&self, file_id: &str) -> bool {
        self.left_file == file_id || self.right_file == file_id
    }

    pub fn edge_style(&self) -> EdgeStyle {
        EdgeStyle::for_join_type(self.join_type)
    }
}

/// Whether a configuration may be saved: all four selections are non-empty
/// and the two sides are different files.
pub fn can_save(config: &JoinConfiguration) -> bool {
    let filled = [
        &config.left_file,
        &config.left_column,
        &config.right_file,
        &config.right_column,
    ]
    .iter()
    .all(|s| !s.trim().is_empty());
    filled && config.left_file != config.right_file
}

/// A file participating in a dataset merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetFile {
    pub id: EntityId,
    pub filename: String,
    #[serde(default)]
    pub row_count: u64,
    /// Known column names; empty when the file has not been profiled yet.
    #[serde(default)]
    pub columns: Vec<String>,
}

// ---------------------------------------------------------------------------
// Graph
// ---------------------------------------------------------------------------

/// A node position in the relationship diagram.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodePosition {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Default)]
pub struct JoinGraph {
    files: Vec<DatasetFile>,
    joins: IndexMap<String, JoinConfiguration>,
}

impl JoinGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn files(&self) -> &[DatasetFile] {
        &self.files
    }

    pub fn file(&self, id: &str) -> Option<&DatasetFile> {
        self.files.iter().find(|f| f.id == id)
    }

    /// Joins in chain order.
    pub fn joins(&self) -> impl Iterator<Item = &JoinConfiguration> {
        self.joins.values()
    }

    pub fn join(&self, id: &str) -> Option<&JoinConfiguration> {
        self.joins.get(id)
    }

    /// Add a file, replacing any existing file with the same id.
    pub fn add_file(&mut self, file: DatasetFile) {
        match self.files.iter_mut().find(|f| f.id == file.id) {
            Some(existing) => *existing = file,
            None => self.files.push(file),
        }
    }

    /// Remove a file and every join that references it.
    ///
    /// Remaining joins are renumbered densely from 0 in their existing order.
    /// Returns the removed joins.
    pub fn remove_file(&mut self, file_id: &str) -> Result<Vec<JoinConfiguration>, CoreError> {
        let index = self
            .files
            .iter()
            .position(|f| f.id == file_id)
            .ok_or_else(|| CoreError::NotFound {
                entity: "DatasetFile",
                id: file_id.to_string(),
            })?;
        self.files.remove(index);

        let mut removed = Vec::new();
        self.joins.retain(|_, join| {
            if join.references(file_id) {
                removed.push(join.clone());
                false
            } else {
                true
            }
        });
        self.renumber();
        Ok(removed)
    }

    /// Validate and store a join.
    ///
    /// A configuration with an empty or unknown id is appended with a fresh
    /// id and the next order; an existing id is replaced in place, keeping
    /// its order. Returns the stored id.
    pub fn save_join(&mut self, mut config: JoinConfiguration) -> Result<String, CoreError> {
        if !can_save(&config) {
            return Err(CoreError::Validation(
                "Select a file and a column on both sides, using two different files".to_string(),
            ));
        }
        self.check_column(&config.left_file, &config.left_column)?;
        self.check_column(&config.right_file, &config.right_column)?;

        if let Some(existing) = self.joins.get_mut(&config.id) {
            config.order = existing.order;
            *existing = config;
            return Ok(existing.id.clone());
        }

        config.id = uuid::Uuid::new_v4().to_string();
        config.order = self.joins.len();
        let id = config.id.clone();
        self.joins.insert(id.clone(), config);
        Ok(id)
    }

    /// Save a join proposed by relationship detection, keeping its metadata.
    pub fn apply_suggestion(
        &mut self,
        config: JoinConfiguration,
        suggestion: JoinSuggestion,
    ) -> Result<String, CoreError> {
        self.save_join(config.with_suggestion(suggestion))
    }

    pub fn delete_join(&mut self, id: &str) -> Result<JoinConfiguration, CoreError> {
        let removed = self
            .joins
            .shift_remove(id)
            .ok_or_else(|| CoreError::NotFound {
                entity: "JoinConfiguration",
                id: id.to_string(),
            })?;
        self.renumber();
        Ok(removed)
    }

    /// Place files on a circle, starting at the top and going clockwise in
    /// screen coordinates (y grows downwards).
    pub fn layout(&self, radius: f64, center: NodePosition) -> Vec<(EntityId, NodePosition)> {
        circle_layout(self.files.len(), radius, center)
            .into_iter()
            .zip(&self.files)
            .map(|(pos, file)| (file.id.clone(), pos))
            .collect()
    }

    fn check_column(&self, file_id: &str, column: &str) -> Result<(), CoreError> {
        let file = self.file(file_id).ok_or_else(|| CoreError::NotFound {
            entity: "DatasetFile",
            id: file_id.to_string(),
        })?;
        if !file.columns.is_empty() && !file.columns.iter().any(|c| c == column) {
            return Err(CoreError::Validation(format!(
                "Column '{column}' does not exist in {}",
                file.filename
            )));
        }
        Ok(())
    }

    fn renumber(&mut self) {
        for (order, join) in self.joins.values_mut().enumerate() {
            join.order = order;
        }
    }
}

/// Positions for `n` nodes on a circle: angle `2π·i/n − π/2`.
pub fn circle_layout(n: usize, radius: f64, center: NodePosition) -> Vec<NodePosition> {
    (0..n)
        .map(|i| {
            let angle = 2.0 * PI * i as f64 / n as f64 - PI / 2.0;
            NodePosition {
                x: center.x + radius * angle.cos(),
                y: center.y + radius * angle.sin(),
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
