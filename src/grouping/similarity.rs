// Name similarity measures used for part clustering
use ahash::AHashSet;

use crate::config::SimilarityMetric;

/// Similarity in [0, 1] between two stripped names, 1.0 meaning identical
///
/// Names are compared case-insensitively with separators folded to spaces.
pub fn name_similarity(a: &str, b: &str, metric: SimilarityMetric) -> f32 {
    let a = normalize(a);
    let b = normalize(b);

    match metric {
        SimilarityMetric::Levenshtein => strsim::normalized_levenshtein(&a, &b) as f32,
        SimilarityMetric::TokenOverlap => token_overlap(&a, &b),
    }
}

fn normalize(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c == '_' || c == '.' || c == '-' {
                ' '
            } else {
                c
            }
        })
        .collect::<String>()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Jaccard ratio of alphanumeric token sets
fn token_overlap(a: &str, b: &str) -> f32 {
    let tokens_a: AHashSet<&str> = tokens(a).collect();
    let tokens_b: AHashSet<&str> = tokens(b).collect();

    if tokens_a.is_empty() && tokens_b.is_empty() {
        return 1.0;
    }

    let intersection = tokens_a.intersection(&tokens_b).count();
    let union = tokens_a.union(&tokens_b).count();

    intersection as f32 / union as f32
}

fn tokens(s: &str) -> impl Iterator<Item = &str> {
    s.split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_names() {
        for metric in [SimilarityMetric::Levenshtein, SimilarityMetric::TokenOverlap] {
            assert_eq!(name_similarity("Movie_Title", "movie title", metric), 1.0);
        }
    }

    #[test]
    fn test_levenshtein_close_names() {
        let score = name_similarity(
            "my movie title",
            "my movie titel",
            SimilarityMetric::Levenshtein,
        );
        assert!(score > 0.8);
        assert!(score < 1.0);
    }

    #[test]
    fn test_token_overlap_ratio() {
        let score = name_similarity(
            "alpha beta gamma",
            "alpha beta delta",
            SimilarityMetric::TokenOverlap,
        );
        // 2 shared of 4 distinct tokens
        assert!((score - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_completely_different() {
        let score = name_similarity("abc", "xyz", SimilarityMetric::Levenshtein);
        assert!(score < 0.1);
        assert_eq!(name_similarity("abc", "xyz", SimilarityMetric::TokenOverlap), 0.0);
    }

    #[test]
    fn test_empty_names() {
        assert_eq!(name_similarity("", "", SimilarityMetric::TokenOverlap), 1.0);
        assert_eq!(name_similarity("", "", SimilarityMetric::Levenshtein), 1.0);
    }
}
