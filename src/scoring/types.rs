// Shared types for confidence scoring
use serde::ser::{Serialize, SerializeStruct, Serializer};

use crate::config::ScoringConfig;
use crate::grouping::VideoGroup;
use crate::patterns::Tier;

/// Weights used to combine breakdown components
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ScoringWeights {
    pub folder_weight: f32,
    pub file_weight: f32,
    pub source_weight: f32,
    pub context_boost: f32,
}

impl ScoringWeights {
    pub fn from_config(config: &ScoringConfig) -> Self {
        Self {
            folder_weight: config.folder_weight,
            file_weight: config.file_weight,
            source_weight: config.source_weight,
            context_boost: config.context_boost,
        }
    }
}

/// Breakdown of confidence components for transparency
///
/// The overall confidence is never stored; it is recomputed from the
/// components and the weights captured when the breakdown was built.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfidenceBreakdown {
    /// Folder extraction confidence for the identifier, 0 when absent
    pub folder_name_match: f32,
    /// Best member file extraction confidence for the identifier
    pub file_name_match: f32,
    /// Summed boosts of consistent source hints, capped at 1.0
    pub source_match: f32,
    /// Whether the single-candidate context boost applies
    pub context_boosted: bool,
    pub weights: ScoringWeights,
}

impl ConfidenceBreakdown {
    /// Weighted combination clamped to [0, 1]
    pub fn overall(&self) -> f32 {
        let w = &self.weights;
        let mut total = w.folder_weight * self.folder_name_match
            + w.file_weight * self.file_name_match
            + w.source_weight * self.source_match;
        if self.context_boosted {
            total += w.context_boost;
        }
        total.clamp(0.0, 1.0)
    }

    /// Overall confidence on the 0..=100 scale used by decision thresholds
    pub fn percent(&self) -> f32 {
        self.overall() * 100.0
    }
}

impl Serialize for ConfidenceBreakdown {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ConfidenceBreakdown", 6)?;
        state.serialize_field("folder_name_match", &self.folder_name_match)?;
        state.serialize_field("file_name_match", &self.file_name_match)?;
        state.serialize_field("source_match", &self.source_match)?;
        state.serialize_field("context_boosted", &self.context_boosted)?;
        state.serialize_field("overall_confidence", &self.overall())?;
        state.serialize_field("weights", &self.weights)?;
        state.end()
    }
}

/// One ranked identifier for a group
#[derive(Debug, Clone, serde::Serialize)]
pub struct MatchCandidate<'a> {
    #[serde(skip)]
    pub group: &'a VideoGroup,
    pub identifier: String,
    /// Strongest tier the identifier was extracted with
    pub tier: Tier,
    pub breakdown: ConfidenceBreakdown,
    /// Source the candidate resolved to, if any
    pub chosen_source: Option<String>,
}

impl MatchCandidate<'_> {
    pub fn overall(&self) -> f32 {
        self.breakdown.overall()
    }
}
