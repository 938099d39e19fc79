//! Identifier, year and source-hint extraction using PatternRegistry
//!
//! All functions are pure: the same name and registry always yield the same
//! result. A name matching no pattern yields an empty list, never an error.

mod types;

pub use types::{merge_hints, ExtractionResult, NameAnalysis, SourceHint};

use crate::grouping::VideoGroup;
use crate::patterns::{PartMatch, PatternRegistry, Tier};
use std::sync::Arc;

/// Tiered extractor backed by pre-compiled patterns
#[derive(Debug, Clone)]
pub struct PatternExtractor {
    registry: Arc<PatternRegistry>,
}

impl PatternExtractor {
    /// Create new extractor with pattern registry
    pub fn new(registry: Arc<PatternRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &PatternRegistry {
        &self.registry
    }

    /// Extract identifiers, one per tier at most, strongest tier first
    ///
    /// Within a tier the first pattern in declaration order that matches wins.
    pub fn extract(&self, name: &str) -> Vec<ExtractionResult> {
        Tier::ALL
            .iter()
            .filter_map(|&tier| {
                self.registry.tier(tier).iter().find_map(|pattern| {
                    pattern.identify(name).map(|identifier| ExtractionResult {
                        identifier,
                        tier,
                        confidence: pattern.confidence,
                        pattern: pattern.name.clone(),
                        source: pattern.source.clone(),
                    })
                })
            })
            .collect()
    }

    /// First plausible year; out-of-range years are dropped
    pub fn extract_year(&self, name: &str) -> Option<i32> {
        self.registry.find_year(name)
    }

    /// Every source pattern set that matches the name contributes one hint
    pub fn detect_source_hints(&self, name: &str) -> Vec<SourceHint> {
        self.registry
            .sources
            .iter()
            .flat_map(|source| {
                source
                    .matching_sets(name)
                    .into_iter()
                    .map(move |pattern_set| SourceHint {
                        source: source.name.clone(),
                        confidence_boost: source.confidence_boost,
                        pattern_set,
                    })
            })
            .collect()
    }

    /// Part marker in an extension-stripped name
    pub fn detect_part(&self, base_name: &str) -> Option<PartMatch> {
        self.registry.detect_part(base_name)
    }

    /// Identifier extraction for every member of a group, in member order
    ///
    /// Members are analyzed by their stripped name so part markers never leak
    /// into identifiers.
    pub fn extract_members(&self, group: &VideoGroup) -> Vec<Vec<ExtractionResult>> {
        group
            .members
            .iter()
            .map(|member| self.extract(&member.stripped_name))
            .collect()
    }

    /// Run identifier, year and source extraction over one name
    pub fn analyze(&self, name: &str) -> NameAnalysis {
        let analysis = NameAnalysis {
            name: name.to_string(),
            extractions: self.extract(name),
            year: self.extract_year(name),
            source_hints: self.detect_source_hints(name),
        };

        tracing::debug!(
            name,
            identifiers = analysis.extractions.len(),
            hints = analysis.source_hints.len(),
            "analyzed name"
        );

        analysis
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, IdPatternConfig};
    use crate::patterns::PatternSet;

    fn create_test_extractor() -> PatternExtractor {
        let registry = PatternRegistry::from_config_with_year(&Config::default(), 2025).unwrap();
        PatternExtractor::new(Arc::new(registry))
    }

    #[test]
    fn test_no_match_is_empty() {
        let extractor = create_test_extractor();
        assert!(extractor.extract("[DMM] Random Folder Name").is_empty());
        assert!(extractor.extract("").is_empty());
    }

    #[test]
    fn test_strong_match_uses_base_confidence() {
        let extractor = create_test_extractor();
        let results = extractor.extract("FC2-PPV-4734151 Premium HD");

        let strong: Vec<_> = results.iter().filter(|r| r.tier == Tier::Strong).collect();
        assert_eq!(strong.len(), 1);
        assert_eq!(strong[0].identifier, "FC2-PPV-4734151");
        assert_eq!(strong[0].confidence, 0.95);
        assert_eq!(strong[0].source.as_deref(), Some("fc2"));
    }

    #[test]
    fn test_one_result_per_tier() {
        let extractor = create_test_extractor();
        let results = extractor.extract("FC2-PPV-4734151 Premium HD");

        // strong FC2 id plus the bare number in the weak tier
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].tier, Tier::Strong);
        assert_eq!(results[1].tier, Tier::Weak);
        assert_eq!(results[1].identifier, "4734151");
    }

    #[test]
    fn test_declaration_order_breaks_ties() {
        let mut config = Config::default();
        config.extraction.medium = vec![
            IdPatternConfig {
                name: "first".to_string(),
                pattern: r"([A-Z]{3}-\d{3})".to_string(),
                format: "{}".to_string(),
                confidence: 0.6,
                source: None,
            },
            IdPatternConfig {
                name: "second".to_string(),
                pattern: r"([A-Z]{3}-\d{3})".to_string(),
                format: "X-{}".to_string(),
                confidence: 0.9,
                source: None,
            },
        ];
        let registry = PatternRegistry::from_config_with_year(&config, 2025).unwrap();
        let extractor = PatternExtractor::new(Arc::new(registry));

        let medium: Vec<_> = extractor
            .extract("ABC-123")
            .into_iter()
            .filter(|r| r.tier == Tier::Medium)
            .collect();
        assert_eq!(medium.len(), 1);
        assert_eq!(medium[0].pattern, "first");
        assert_eq!(medium[0].confidence, 0.6);
    }

    #[test]
    fn test_medium_dmm_code() {
        let extractor = create_test_extractor();
        let results = extractor.extract("SSNI-456 uncensored");
        assert_eq!(results[0].tier, Tier::Medium);
        assert_eq!(results[0].identifier, "SSNI-456");
    }

    #[test]
    fn test_year_out_of_range_is_discarded() {
        let extractor = create_test_extractor();
        assert_eq!(extractor.extract_year("Example (2020)"), Some(2020));
        assert_eq!(extractor.extract_year("Example (2099)"), None);
    }

    #[test]
    fn test_multiple_sources_are_preserved() {
        let extractor = create_test_extractor();
        let hints = extractor.detect_source_hints("FC2 DMM mixed");

        let sources: Vec<_> = hints.iter().map(|h| h.source.as_str()).collect();
        assert!(sources.contains(&"fc2"));
        assert!(sources.contains(&"dmm"));
    }

    #[test]
    fn test_folder_bracket_hint() {
        let extractor = create_test_extractor();
        let hints = extractor.detect_source_hints("[DMM] Random Folder Name");

        assert!(hints
            .iter()
            .any(|h| h.source == "dmm" && h.pattern_set == PatternSet::Folder));
        assert!(hints.iter().all(|h| h.confidence_boost == 0.15));
    }

    #[test]
    fn test_merge_hints_deduplicates() {
        let hint = SourceHint {
            source: "fc2".to_string(),
            confidence_boost: 0.2,
            pattern_set: PatternSet::Folder,
        };
        let mut all = vec![hint.clone()];
        merge_hints(&mut all, &[hint.clone(), hint]);
        assert_eq!(all.len(), 1);
    }
}
