//! Server analysis of an uploaded file.
//!
//! The server detects the entity type, reads the headers, and proposes a
//! column mapping with a confidence score per column. The client only holds
//! the result; mutation goes through [`MappingEditor`](crate::mapping::MappingEditor).

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};

use crate::types::EntityId;

/// Score at or above which a suggested mapping is shown as high confidence.
pub const HIGH_CONFIDENCE: f64 = 0.8;

/// Score at or above which a suggested mapping is shown as medium confidence.
pub const MEDIUM_CONFIDENCE: f64 = 0.5;

/// Body of `POST /analyze`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyzeRequest {
    pub attachment_id: EntityId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<String>,
}

/// Result of `POST /analyze`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub entity_type: String,
    #[serde(default)]
    pub total_rows: u64,
    #[serde(default)]
    pub headers: Vec<String>,
    /// Source header to target field key. Headers without an entry are not
    /// imported.
    #[serde(default, deserialize_with = "deserialize_mapping")]
    pub column_mapping: IndexMap<String, String>,
    #[serde(default)]
    pub mapping_confidence: IndexMap<String, f64>,
    #[serde(default)]
    pub sample_data: Vec<IndexMap<String, serde_json::Value>>,
}

impl AnalysisResult {
    /// Confidence for a header's suggested mapping, clamped to `[0, 1]`.
    pub fn confidence(&self, header: &str) -> Option<f64> {
        self.mapping_confidence
            .get(header)
            .filter(|score| score.is_finite())
            .map(|score| score.clamp(0.0, 1.0))
    }

    pub fn confidence_level(&self, header: &str) -> Option<ConfidenceLevel> {
        self.confidence(header).map(ConfidenceLevel::from_score)
    }
}

/// Display bucket for a mapping confidence score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
}

impl ConfidenceLevel {
    pub fn from_score(score: f64) -> Self {
        if score >= HIGH_CONFIDENCE {
            Self::High
        } else if score >= MEDIUM_CONFIDENCE {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

/// Accept `null` or empty targets from the server and drop them, so an
/// absent entry is the only way to express "not imported".
fn deserialize_mapping<'de, D>(deserializer: D) -> Result<IndexMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: IndexMap<String, Option<String>> = IndexMap::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .filter_map(|(header, target)| match target {
            Some(t) if !t.trim().is_empty() => Some((header, t)),
            _ => None,
        })
        .collect())
}
