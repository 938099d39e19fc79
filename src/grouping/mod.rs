// Similarity-based grouping of discovered files into logical video items
//
// Step 1: part detection on each extension-stripped name
// Step 2: per-folder clustering of part-bearing files by stripped-name similarity

mod similarity;
mod types;

pub use similarity::name_similarity;
pub use types::{
    split_extension, GroupAnomaly, GroupingReport, PartInfo, ScannedFile, VideoFile, VideoGroup,
};

use crate::config::{PartsConfig, SimilarityMetric};
use crate::extraction::{merge_hints, PatternExtractor};
use crate::patterns::Tier;
use std::collections::HashMap;
use std::path::PathBuf;

/// Clusters files into single and multi-part groups
pub struct SimilarityGrouper {
    extractor: PatternExtractor,
    max_parts: usize,
    similarity_threshold: f32,
    metric: SimilarityMetric,
}

/// Group under construction
struct Draft {
    /// Stripped name of the opening member
    key: String,
    /// Strong or medium identifier of the opening member
    identifier: Option<String>,
    members: Vec<VideoFile>,
    /// Singletons never accept further members
    open: bool,
}

impl SimilarityGrouper {
    /// Create grouper from an extractor and grouping parameters
    pub fn new(extractor: PatternExtractor, parts: &PartsConfig) -> Self {
        Self {
            extractor,
            max_parts: parts.max_parts.max(1),
            similarity_threshold: parts.similarity_threshold,
            metric: parts.similarity,
        }
    }

    /// Group files, discarding diagnostics
    pub fn group(&self, files: Vec<ScannedFile>) -> Vec<VideoGroup> {
        self.group_with_report(files).groups
    }

    /// Group files and report anomalies
    ///
    /// # Algorithm
    /// 1. Detect parts and source hints per file
    /// 2. Order folders by first appearance and files within a folder by name,
    ///    so the result does not depend on within-folder discovery order
    /// 3. Cluster part-bearing files per folder; everything else is a singleton
    /// 4. Attach folder extractions, aggregated hints and year to each group
    pub fn group_with_report(&self, files: Vec<ScannedFile>) -> GroupingReport {
        let mut anomalies = Vec::new();
        let mut groups = Vec::new();

        for (_, mut folder_files) in self.partition_by_folder(files) {
            folder_files.sort_by(|a, b| {
                a.file_name
                    .cmp(&b.file_name)
                    .then_with(|| a.path.cmp(&b.path))
            });

            let drafts = self.cluster_folder(folder_files, &mut anomalies);
            groups.extend(drafts.into_iter().map(|draft| self.finish(draft)));
        }

        tracing::info!(
            groups = groups.len(),
            anomalies = anomalies.len(),
            "grouping complete"
        );

        GroupingReport { groups, anomalies }
    }

    /// Turn scan records into VideoFiles bucketed by folder, folders in first-seen order
    fn partition_by_folder(&self, files: Vec<ScannedFile>) -> Vec<(PathBuf, Vec<VideoFile>)> {
        let mut folders: Vec<(PathBuf, Vec<VideoFile>)> = Vec::new();
        let mut index: HashMap<PathBuf, usize> = HashMap::new();

        for scanned in files {
            let file = self.prepare(scanned);
            let key = file.folder_key();
            match index.get(&key) {
                Some(&idx) => folders[idx].1.push(file),
                None => {
                    index.insert(key.clone(), folders.len());
                    folders.push((key, vec![file]));
                }
            }
        }

        folders
    }

    fn prepare(&self, scanned: ScannedFile) -> VideoFile {
        let stem = split_extension(&scanned.file_name).0.to_string();
        let part = self.extractor.detect_part(&stem);
        let source_hints = self.extractor.detect_source_hints(&scanned.file_name);

        let (part_info, stripped_name) = match part {
            Some(m) => (
                Some(PartInfo {
                    part_number: m.part_number,
                    pattern_label: m.label,
                    confidence: m.confidence,
                }),
                m.stripped,
            ),
            None => (None, stem),
        };

        VideoFile {
            path: scanned.path,
            folder_name: scanned.folder_name,
            file_name: scanned.file_name,
            part_info,
            source_hints,
            stripped_name,
        }
    }

    fn cluster_folder(
        &self,
        files: Vec<VideoFile>,
        anomalies: &mut Vec<GroupAnomaly>,
    ) -> Vec<Draft> {
        let mut drafts: Vec<Draft> = Vec::new();

        for file in files {
            let Some(part_number) = file.part_number() else {
                drafts.push(Draft::singleton(file));
                continue;
            };

            let identifier = self.key_identifier(&file.stripped_name);

            // Best open group; on equal similarity the most recently opened wins
            let mut best: Option<(usize, f32)> = None;
            let mut ties = 0;
            for (idx, draft) in drafts.iter().enumerate().filter(|(_, d)| d.open) {
                let score = if identifiers_conflict(&draft.identifier, &identifier) {
                    0.0
                } else {
                    name_similarity(&draft.key, &file.stripped_name, self.metric)
                };

                match best {
                    Some((_, best_score)) if score < best_score => {}
                    Some((_, best_score)) if score == best_score => {
                        ties += 1;
                        best = Some((idx, score));
                    }
                    _ => {
                        ties = 1;
                        best = Some((idx, score));
                    }
                }
            }

            let Some((idx, score)) = best.filter(|(_, s)| *s >= self.similarity_threshold) else {
                drafts.push(Draft::multi(file, identifier));
                continue;
            };

            if ties > 1 {
                tracing::debug!(file = ?file.path, ties, "ambiguous group match");
                anomalies.push(GroupAnomaly::AmbiguousGroup {
                    file: file.path.clone(),
                    similarity: score,
                    candidates: ties,
                });
            }

            let target = &mut drafts[idx];
            if target.members.len() >= self.max_parts {
                tracing::warn!(
                    file = ?file.path,
                    max_parts = self.max_parts,
                    "part overflow, keeping file as singleton"
                );
                anomalies.push(GroupAnomaly::PartOverflow {
                    file: file.path.clone(),
                    max_parts: self.max_parts,
                });
                drafts.push(Draft::singleton(file));
            } else if target
                .members
                .iter()
                .any(|m| m.part_number() == Some(part_number))
            {
                tracing::warn!(
                    file = ?file.path,
                    part_number,
                    "duplicate part number, keeping file as singleton"
                );
                anomalies.push(GroupAnomaly::DuplicatePart {
                    file: file.path.clone(),
                    part_number,
                });
                drafts.push(Draft::singleton(file));
            } else {
                let pos = target
                    .members
                    .partition_point(|m| m.part_number().unwrap_or(0) < part_number);
                target.members.insert(pos, file);
            }
        }

        drafts
    }

    /// Strong or medium identifier used to keep different titles apart
    fn key_identifier(&self, name: &str) -> Option<String> {
        self.extractor
            .extract(name)
            .into_iter()
            .find(|r| r.tier != Tier::Weak)
            .map(|r| r.identifier.to_uppercase())
    }

    fn finish(&self, draft: Draft) -> VideoGroup {
        let first = &draft.members[0];
        let folder_name = first.folder_name.clone();
        let folder_path = first.folder_key();

        let folder = self.extractor.analyze(&folder_name);

        let mut aggregated_source_hints = folder.source_hints.clone();
        for member in &draft.members {
            merge_hints(&mut aggregated_source_hints, &member.source_hints);
        }

        let year = draft
            .members
            .iter()
            .find_map(|m| self.extractor.extract_year(m.stem()))
            .or(folder.year);

        VideoGroup {
            representative_name: draft.key,
            folder_name,
            folder_path,
            members: draft.members,
            folder_extractions: folder.extractions,
            aggregated_source_hints,
            year,
        }
    }
}

impl Draft {
    fn singleton(file: VideoFile) -> Self {
        Self {
            key: file.stripped_name.clone(),
            identifier: None,
            members: vec![file],
            open: false,
        }
    }

    fn multi(file: VideoFile, identifier: Option<String>) -> Self {
        Self {
            key: file.stripped_name.clone(),
            identifier,
            members: vec![file],
            open: true,
        }
    }
}

fn identifiers_conflict(a: &Option<String>, b: &Option<String>) -> bool {
    matches!((a, b), (Some(a), Some(b)) if a != b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::patterns::PatternRegistry;
    use std::sync::Arc;

    fn create_test_grouper(config: &Config) -> SimilarityGrouper {
        let registry = PatternRegistry::from_config_with_year(config, 2025).unwrap();
        SimilarityGrouper::new(PatternExtractor::new(Arc::new(registry)), &config.parts)
    }

    fn scanned(folder: &str, file: &str) -> ScannedFile {
        ScannedFile::from_path(format!("/library/{}/{}", folder, file))
    }

    #[test]
    fn test_two_part_group() {
        let grouper = create_test_grouper(&Config::default());
        let folder = "FC2-PPV-4734151 Premium HD";
        let groups = grouper.group(vec![
            scanned(folder, "FC2-PPV-4734151_part2.mp4"),
            scanned(folder, "FC2-PPV-4734151_part1.mp4"),
        ]);

        assert_eq!(groups.len(), 1);
        let group = &groups[0];
        assert_eq!(group.members.len(), 2);
        assert_eq!(group.members[0].part_number(), Some(1));
        assert_eq!(group.members[1].part_number(), Some(2));
        assert_eq!(group.representative_name, "FC2-PPV-4734151");
        assert_eq!(group.folder_extractions[0].identifier, "FC2-PPV-4734151");
    }

    #[test]
    fn test_files_without_parts_are_singletons() {
        let grouper = create_test_grouper(&Config::default());
        let groups = grouper.group(vec![
            scanned("Movies", "Example.mp4"),
            scanned("Movies", "Example.mkv"),
        ]);

        assert_eq!(groups.len(), 2);
        assert!(groups.iter().all(|g| g.members.len() == 1));
    }

    #[test]
    fn test_different_folders_never_merge() {
        let grouper = create_test_grouper(&Config::default());
        let groups = grouper.group(vec![
            scanned("A", "movie_cd1.mkv"),
            scanned("B", "movie_cd2.mkv"),
        ]);
        assert_eq!(groups.len(), 2);
    }

    #[test]
    fn test_duplicate_part_number_becomes_singleton() {
        let grouper = create_test_grouper(&Config::default());
        let report = grouper.group_with_report(vec![
            scanned("M", "movie part1.mp4"),
            scanned("M", "movie part1.mkv"),
            scanned("M", "movie part2.mp4"),
        ]);

        assert_eq!(report.groups.len(), 2);
        assert!(matches!(
            report.anomalies.as_slice(),
            [GroupAnomaly::DuplicatePart { part_number: 1, .. }]
        ));
        // sorted by name: "movie part1.mkv" opens the group and keeps part 1
        let multi = report.groups.iter().find(|g| g.is_multi_part()).unwrap();
        assert_eq!(multi.members[0].file_name, "movie part1.mkv");
    }

    #[test]
    fn test_overflow_becomes_singleton() {
        let mut config = Config::default();
        config.parts.max_parts = 2;
        let grouper = create_test_grouper(&config);

        let report = grouper.group_with_report(vec![
            scanned("M", "movie_cd1.mkv"),
            scanned("M", "movie_cd2.mkv"),
            scanned("M", "movie_cd3.mkv"),
        ]);

        assert_eq!(report.groups.len(), 2);
        assert!(report.groups.iter().all(|g| g.members.len() <= 2));
        assert!(matches!(
            report.anomalies.as_slice(),
            [GroupAnomaly::PartOverflow { max_parts: 2, .. }]
        ));
    }

    #[test]
    fn test_conflicting_identifiers_stay_apart() {
        let grouper = create_test_grouper(&Config::default());
        let groups = grouper.group(vec![
            scanned("M", "ABC-123_part1.mp4"),
            scanned("M", "ABC-124_part2.mp4"),
        ]);
        assert_eq!(groups.len(), 2);
    }

    #[test]
    fn test_ambiguous_match_prefers_newest_group() {
        let mut config = Config::default();
        config.parts.similarity = SimilarityMetric::TokenOverlap;
        config.parts.similarity_threshold = 0.5;
        let grouper = create_test_grouper(&config);

        // "alpha beta" and "alpha gamma" stay apart at 1/3, while "alpha"
        // scores 0.5 against both
        let report = grouper.group_with_report(vec![
            scanned("M", "alpha beta part1.mp4"),
            scanned("M", "alpha gamma part1.mp4"),
            scanned("M", "alpha part2.mp4"),
        ]);

        let with_part2 = report
            .groups
            .iter()
            .find(|g| g.members.iter().any(|m| m.file_name == "alpha part2.mp4"))
            .unwrap();
        assert_eq!(with_part2.representative_name, "alpha gamma");
        assert!(report
            .anomalies
            .iter()
            .any(|a| matches!(a, GroupAnomaly::AmbiguousGroup { candidates: 2, .. })));
    }

    #[test]
    fn test_year_prefers_file_over_folder() {
        let grouper = create_test_grouper(&Config::default());
        let groups = grouper.group(vec![scanned("Example 2019", "Example 2020.mp4")]);
        assert_eq!(groups[0].year, Some(2020));
    }
}
