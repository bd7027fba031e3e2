//! Editable column mapping for an analysed file.
//!
//! [`MappingEditor`] owns the [`AnalysisResult`] and is the only place its
//! `column_mapping` and `entity_type` change. All diagnostics are computed on
//! demand from the current mapping; nothing is cached.

use std::collections::{BTreeMap, HashSet};

use indexmap::IndexMap;

use crate::analysis::{AnalysisResult, ConfidenceLevel};
use crate::fields::FieldDefinition;

#[derive(Debug, Clone, PartialEq)]
pub struct MappingEditor {
    analysis: AnalysisResult,
}

impl MappingEditor {
    pub fn new(analysis: AnalysisResult) -> Self {
        Self { analysis }
    }

    pub fn analysis(&self) -> &AnalysisResult {
        &self.analysis
    }

    pub fn into_analysis(self) -> AnalysisResult {
        self.analysis
    }

    pub fn entity_type(&self) -> &str {
        &self.analysis.entity_type
    }

    pub fn mapping(&self) -> &IndexMap<String, String> {
        &self.analysis.column_mapping
    }

    /// Map `header` to `field`, or skip the header when `field` is `None`,
    /// empty, or whitespace. Skipping removes the entry entirely.
    pub fn set_mapping(&mut self, header: &str, field: Option<&str>) {
        match field.map(str::trim).filter(|f| !f.is_empty()) {
            Some(field) => {
                self.analysis
                    .column_mapping
                    .insert(header.to_string(), field.to_string());
            }
            None => {
                self.analysis.column_mapping.shift_remove(header);
            }
        }
    }

    /// Record a user override of the detected entity type. The mapping is
    /// kept as-is; re-analysing with the override is how new suggestions
    /// are obtained.
    pub fn set_entity_type(&mut self, entity_type: impl Into<String>) {
        self.analysis.entity_type = entity_type.into();
    }

    /// Required fields whose key is not a target of any header.
    pub fn unmapped_required_fields<'a>(
        &self,
        fields: &'a [FieldDefinition],
    ) -> Vec<&'a FieldDefinition> {
        let targets: HashSet<&str> = self
            .analysis
            .column_mapping
            .values()
            .map(String::as_str)
            .collect();
        fields
            .iter()
            .filter(|f| f.required && !targets.contains(f.key.as_str()))
            .collect()
    }

    /// Headers in file order that have no mapping entry.
    pub fn unmapped_headers(&self) -> Vec<&str> {
        self.analysis
            .headers
            .iter()
            .filter(|h| !self.analysis.column_mapping.contains_key(h.as_str()))
            .map(String::as_str)
            .collect()
    }

    /// Targets assigned to more than one header, with those headers in
    /// mapping order. The server decides whether this is acceptable.
    pub fn duplicate_targets(&self) -> BTreeMap<&str, Vec<&str>> {
        let mut by_target: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for (header, target) in &self.analysis.column_mapping {
            by_target
                .entry(target.as_str())
                .or_default()
                .push(header.as_str());
        }
        by_target.retain(|_, headers| headers.len() > 1);
        by_target
    }

    pub fn confidence_level(&self, header: &str) -> Option<ConfidenceLevel> {
        self.analysis.confidence_level(header)
    }
}
