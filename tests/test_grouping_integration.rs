// Integration tests for multi-part grouping
use std::sync::Arc;
use taggrr::config::Config;
use taggrr::extraction::PatternExtractor;
use taggrr::grouping::{ScannedFile, SimilarityGrouper, VideoGroup};
use taggrr::patterns::{PatternRegistry, PatternSet};

fn create_grouper(config: &Config) -> SimilarityGrouper {
    let registry = PatternRegistry::from_config_with_year(config, 2025).unwrap();
    SimilarityGrouper::new(PatternExtractor::new(Arc::new(registry)), &config.parts)
}

fn files(folder: &str, names: &[&str]) -> Vec<ScannedFile> {
    names
        .iter()
        .map(|name| ScannedFile::from_path(format!("/library/{}/{}", folder, name)))
        .collect()
}

/// Membership as sorted lists of file names, independent of group order
fn membership(groups: &[VideoGroup]) -> Vec<Vec<String>> {
    let mut sets: Vec<Vec<String>> = groups
        .iter()
        .map(|g| g.members.iter().map(|m| m.file_name.clone()).collect())
        .collect();
    for set in &mut sets {
        set.sort();
    }
    sets.sort();
    sets
}

#[test]
fn test_dmm_cd_scenario() {
    let grouper = create_grouper(&Config::default());
    let groups = grouper.group(files(
        "[DMM] Random Folder Name",
        &["actual_movie_title_cd1.mkv", "actual_movie_title_cd2.mkv"],
    ));

    assert_eq!(groups.len(), 1);
    let group = &groups[0];
    assert_eq!(group.members.len(), 2);
    assert!(group.members.iter().all(|m| {
        m.part_info
            .as_ref()
            .map(|p| p.pattern_label.starts_with("CD"))
            .unwrap_or(false)
    }));
    assert_eq!(group.representative_name, "actual_movie_title");
    assert!(group.folder_extractions.is_empty());
    assert!(group
        .aggregated_source_hints
        .iter()
        .any(|h| h.source == "dmm" && h.pattern_set == PatternSet::Folder));
}

#[test]
fn test_membership_invariant_under_permutation() {
    let grouper = create_grouper(&Config::default());
    let names = [
        "movie_cd1.mkv",
        "movie_cd2.mkv",
        "movie_cd3.mkv",
        "other film part1.mp4",
        "other film part2.mp4",
        "extra.mp4",
        "movie_cd2.avi",
    ];

    let baseline = membership(&grouper.group(files("Mixed", &names)));

    let permutations: [[usize; 7]; 4] = [
        [6, 5, 4, 3, 2, 1, 0],
        [3, 0, 6, 1, 5, 2, 4],
        [2, 4, 1, 6, 0, 3, 5],
        [5, 6, 0, 4, 3, 1, 2],
    ];
    for order in permutations {
        let shuffled: Vec<&str> = order.iter().map(|&i| names[i]).collect();
        assert_eq!(membership(&grouper.group(files("Mixed", &shuffled))), baseline);
    }
}

#[test]
fn test_groups_never_exceed_max_parts() {
    for max_parts in 1..=4 {
        let mut config = Config::default();
        config.parts.max_parts = max_parts;
        let grouper = create_grouper(&config);

        let names: Vec<String> = (1..=6).map(|n| format!("title part{}.mp4", n)).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let report = grouper.group_with_report(files("Big", &refs));

        let total: usize = report.groups.iter().map(|g| g.len()).sum();
        assert_eq!(total, 6, "files are never dropped");
        assert!(report.groups.iter().all(|g| g.len() <= max_parts));
    }
}

#[test]
fn test_members_ordered_by_part_number() {
    let grouper = create_grouper(&Config::default());
    let groups = grouper.group(files(
        "Film",
        &["film part10.mp4", "film part2.mp4", "film part1.mp4"],
    ));

    assert_eq!(groups.len(), 1);
    let parts: Vec<_> = groups[0].members.iter().filter_map(|m| m.part_number()).collect();
    assert_eq!(parts, vec![1, 2, 10]);
}
