// Shared types for name extraction
use serde::{Deserialize, Serialize};

use crate::patterns::{PatternSet, Tier};

/// Identifier extracted from one name by one tier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// Identifier rendered through the pattern's format
    pub identifier: String,
    pub tier: Tier,
    /// Base confidence of the matching pattern
    pub confidence: f32,
    /// Name of the pattern that matched
    pub pattern: String,
    /// Source implied by the pattern, if declared
    pub source: Option<String>,
}

/// Evidence that a name belongs to a metadata source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceHint {
    pub source: String,
    pub confidence_boost: f32,
    pub pattern_set: PatternSet,
}

impl SourceHint {
    /// Two hints are the same evidence when source and pattern set agree
    pub fn same_evidence(&self, other: &SourceHint) -> bool {
        self.source == other.source && self.pattern_set == other.pattern_set
    }
}

/// Append hints that are not already present, keeping first-seen order
pub fn merge_hints(into: &mut Vec<SourceHint>, hints: &[SourceHint]) {
    for hint in hints {
        if !into.iter().any(|h| h.same_evidence(hint)) {
            into.push(hint.clone());
        }
    }
}

/// Everything extracted from a single name
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NameAnalysis {
    pub name: String,
    /// At most one result per tier, strongest first
    pub extractions: Vec<ExtractionResult>,
    pub year: Option<i32>,
    pub source_hints: Vec<SourceHint>,
}

impl NameAnalysis {
    /// Highest-tier extraction, if any
    pub fn best(&self) -> Option<&ExtractionResult> {
        self.extractions.first()
    }
}
