// Confidence scoring of candidate identifiers per group
// Reconciles folder-derived and file-derived evidence with source hint boosts

mod types;

pub use types::{ConfidenceBreakdown, MatchCandidate, ScoringWeights};

use crate::config::ScoringConfig;
use crate::extraction::{ExtractionResult, SourceHint};
use crate::grouping::VideoGroup;
use crate::patterns::Tier;

/// Source name that patterns use when they imply no particular source
pub const GENERIC_SOURCE: &str = "generic";

/// Ranks candidate identifiers for a group
#[derive(Debug, Clone)]
pub struct ConfidenceScorer {
    weights: ScoringWeights,
    low_signal_threshold: f32,
    preferred_source: Option<String>,
}

/// Evidence gathered for one identifier before scoring
struct Evidence {
    identifier: String,
    key: String,
    tier: Tier,
    folder: f32,
    file: f32,
    declared_source: Option<String>,
}

impl ConfidenceScorer {
    /// Create scorer from scoring configuration
    pub fn new(config: &ScoringConfig) -> Self {
        Self {
            weights: ScoringWeights::from_config(config),
            low_signal_threshold: config.low_signal_threshold,
            preferred_source: config.preferred_source.as_ref().map(|s| s.to_lowercase()),
        }
    }

    pub fn weights(&self) -> ScoringWeights {
        self.weights
    }

    /// Score every distinct identifier of a group, best candidate first
    ///
    /// # Arguments
    /// * `group` - Group carrying folder extractions and aggregated hints
    /// * `per_file` - Extractions for each member, in member order
    ///
    /// # Returns
    /// One candidate per distinct identifier (compared case-insensitively),
    /// sorted by overall confidence, then tier, then identifier
    pub fn score<'a>(
        &self,
        group: &'a VideoGroup,
        per_file: &[Vec<ExtractionResult>],
    ) -> Vec<MatchCandidate<'a>> {
        let evidence = collect_evidence(&group.folder_extractions, per_file);
        if evidence.is_empty() {
            return Vec::new();
        }

        let hints = &group.aggregated_source_hints;

        let mut candidates: Vec<(MatchCandidate<'a>, bool)> = evidence
            .into_iter()
            .map(|ev| {
                let (chosen_source, mut source_match) =
                    resolve_source(ev.declared_source.as_deref(), hints);

                let penalized = match &self.preferred_source {
                    Some(preferred) => chosen_source.as_deref() != Some(preferred.as_str()),
                    None => false,
                };
                if penalized {
                    source_match = 0.0;
                }

                let low_signal = ev.folder < self.low_signal_threshold
                    && ev.file < self.low_signal_threshold;

                let candidate = MatchCandidate {
                    group,
                    identifier: ev.identifier,
                    tier: ev.tier,
                    breakdown: ConfidenceBreakdown {
                        folder_name_match: ev.folder,
                        file_name_match: ev.file,
                        source_match,
                        context_boosted: false,
                        weights: self.weights,
                    },
                    chosen_source,
                };
                (candidate, low_signal && !penalized)
            })
            .collect();

        // Context boost: only when source evidence singles out one of several
        if candidates.len() >= 2 {
            let mut supported = candidates
                .iter_mut()
                .filter(|(c, _)| c.breakdown.source_match > 0.0);
            if let (Some((only, eligible)), None) = (supported.next(), supported.next()) {
                if *eligible {
                    only.breakdown.context_boosted = true;
                }
            }
        }

        let mut candidates: Vec<MatchCandidate<'a>> =
            candidates.into_iter().map(|(c, _)| c).collect();

        candidates.sort_by(|a, b| {
            b.overall()
                .total_cmp(&a.overall())
                .then_with(|| a.tier.rank().cmp(&b.tier.rank()))
                .then_with(|| a.identifier.cmp(&b.identifier))
        });

        if let Some(best) = candidates.first() {
            tracing::debug!(
                group = %group.representative_name,
                candidates = candidates.len(),
                best = %best.identifier,
                overall = best.overall(),
                "scored group"
            );
        }

        candidates
    }
}

/// Merge folder and member extractions per identifier
fn collect_evidence(
    folder: &[ExtractionResult],
    per_file: &[Vec<ExtractionResult>],
) -> Vec<Evidence> {
    let mut evidence: Vec<Evidence> = Vec::new();

    let folder_iter = folder.iter().map(|r| (r, true));
    let file_iter = per_file.iter().flatten().map(|r| (r, false));

    for (result, from_folder) in folder_iter.chain(file_iter) {
        let key = result.identifier.to_uppercase();
        let idx = match evidence.iter().position(|e| e.key == key) {
            Some(idx) => idx,
            None => {
                evidence.push(Evidence {
                    identifier: result.identifier.clone(),
                    key,
                    tier: result.tier,
                    folder: 0.0,
                    file: 0.0,
                    declared_source: None,
                });
                evidence.len() - 1
            }
        };

        let entry = &mut evidence[idx];
        if from_folder {
            entry.folder = entry.folder.max(result.confidence);
        } else {
            entry.file = entry.file.max(result.confidence);
        }
        if result.tier.rank() < entry.tier.rank() {
            entry.tier = result.tier;
        }
        if entry.declared_source.is_none() {
            entry.declared_source = result
                .source
                .as_ref()
                .filter(|s| s.as_str() != GENERIC_SOURCE)
                .cloned();
        }
    }

    evidence
}

/// Pick the source a candidate is consistent with and its capped boost sum
///
/// A declared non-generic source only counts its own hints. Otherwise the
/// source with the largest summed boost wins, ties broken by name.
fn resolve_source(declared: Option<&str>, hints: &[SourceHint]) -> (Option<String>, f32) {
    let sum_for = |source: &str| -> f32 {
        hints
            .iter()
            .filter(|h| h.source == source)
            .map(|h| h.confidence_boost)
            .sum()
    };

    if let Some(source) = declared {
        return (Some(source.to_string()), sum_for(source).min(1.0));
    }

    let mut best: Option<(&str, f32)> = None;
    for hint in hints {
        let total = sum_for(&hint.source);
        best = match best {
            Some((name, score))
                if score > total || (score == total && name <= hint.source.as_str()) =>
            {
                Some((name, score))
            }
            _ => Some((hint.source.as_str(), total)),
        };
    }

    match best {
        Some((name, total)) => (Some(name.to_string()), total.min(1.0)),
        None => (None, 0.0),
    }
}
