//! Deterministic output planning
//!
//! Turns a scored group plus metadata into a target layout: a folder name,
//! one file name per member and the shared folder-level assets. Planning is a
//! pure function of its inputs; the caller owns the set of claimed targets and
//! records each finalized plan in it before the next collision check.

mod sanitize;
mod template;
mod types;

pub use sanitize::{sanitize_component, FALLBACK_NAME, RESERVED_CHARS};
pub use template::Template;
pub use types::{
    AssetKind, Decision, DecisionGate, FileMapping, MetadataResult, OutputPlan, PlanOutcome,
    ReviewOverride, SkipReason, TargetSet,
};

use crate::config::{Config, OutputConfig};
use crate::error::Result;
use crate::grouping::{VideoFile, VideoGroup};
use crate::scoring::ConfidenceBreakdown;
use sanitize::{replace_reserved, tidy, truncate_chars};
use std::path::PathBuf;

/// Builds output plans from groups and metadata
#[derive(Debug, Clone)]
pub struct OutputPlanner {
    folder_template: Template,
    file_template: Template,
    output: OutputConfig,
    gate: DecisionGate,
}

/// Values available to the naming templates
struct NameValues<'a> {
    title: &'a str,
    year: &'a str,
    id: &'a str,
    part: &'a str,
}

impl OutputPlanner {
    /// Create planner, parsing the configured templates once
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            folder_template: Template::parse(&config.output.folder_format)?,
            file_template: Template::parse(&config.output.file_format)?,
            output: config.output.clone(),
            gate: DecisionGate::from_config(&config.thresholds),
        })
    }

    pub fn gate(&self) -> DecisionGate {
        self.gate
    }

    /// Plan one group
    ///
    /// # Arguments
    /// * `group` - Group whose members are mapped
    /// * `metadata` - Metadata resolved for the chosen candidate
    /// * `breakdown` - Confidence of the chosen candidate
    /// * `existing` - Target folders already claimed
    /// * `review` - Verdict for groups that land in manual review
    ///
    /// # Returns
    /// A plan, or the reason no plan was produced
    pub fn plan(
        &self,
        group: &VideoGroup,
        metadata: &MetadataResult,
        breakdown: &ConfidenceBreakdown,
        existing: &TargetSet,
        review: Option<ReviewOverride>,
    ) -> PlanOutcome {
        let percent = breakdown.percent();

        match (self.gate.decide(breakdown), review) {
            (Decision::Skip, _) => {
                tracing::info!(
                    group = %group.representative_name,
                    percent,
                    "skipping low confidence group"
                );
                return PlanOutcome::Skipped(SkipReason::LowConfidence { percent });
            }
            (Decision::ManualReview, None) => {
                tracing::info!(
                    group = %group.representative_name,
                    percent,
                    "deferring group for manual review"
                );
                return PlanOutcome::Deferred { percent };
            }
            (Decision::ManualReview, Some(ReviewOverride::Reject)) => {
                return PlanOutcome::Skipped(SkipReason::Rejected);
            }
            (Decision::ManualReview, Some(ReviewOverride::Approve))
            | (Decision::AutoProcess, _) => {}
        }

        let plan = self.build_plan(group, metadata, breakdown.overall(), existing);
        tracing::info!(plan = %plan.summary(), "planned group");
        PlanOutcome::Planned(plan)
    }

    fn build_plan(
        &self,
        group: &VideoGroup,
        metadata: &MetadataResult,
        overall: f32,
        existing: &TargetSet,
    ) -> OutputPlan {
        let replacement = self.output.replacement.as_str();
        let title = replace_reserved(metadata.title.trim(), replacement);
        let year = metadata
            .year
            .or(group.year)
            .map(|y| y.to_string())
            .unwrap_or_default();
        let id = replace_reserved(metadata.identifier.trim(), replacement);

        let target_folder = self.resolve_folder(group, &title, &year, &id, existing);

        let multi_part = group.is_multi_part();
        let file_mappings = group
            .members
            .iter()
            .map(|file| {
                let part = match (multi_part, file.part_number()) {
                    (true, Some(n)) => self.output.part_format.replace("{n}", &n.to_string()),
                    _ => String::new(),
                };
                FileMapping {
                    file: file.clone(),
                    target_name: self.file_name(file, &title, &year, &id, &part),
                }
            })
            .collect();

        let folder = PathBuf::from(&target_folder);
        let assets = &self.output.assets;
        let mut shared_assets = Vec::new();
        if metadata.poster_url.is_some() {
            shared_assets.push((AssetKind::Poster, folder.join(&assets.poster)));
        }
        if metadata.fanart_url.is_some() {
            shared_assets.push((AssetKind::Fanart, folder.join(&assets.fanart)));
        }
        if self.output.create_nfo {
            shared_assets.push((AssetKind::Nfo, folder.join(&assets.nfo)));
        }

        OutputPlan {
            target_folder: folder,
            file_mappings,
            shared_assets,
            identifier: metadata.identifier.clone(),
            overall_confidence: overall,
        }
    }

    /// Folder name with a deterministic identifier suffix on collision
    ///
    /// A group that already lives in a carried-over target folder keeps it, so
    /// re-running over organized output reproduces the same plan. Folders
    /// claimed in the current run are always taken.
    fn resolve_folder(
        &self,
        group: &VideoGroup,
        title: &str,
        year: &str,
        id: &str,
        existing: &TargetSet,
    ) -> String {
        let values = NameValues {
            title,
            year,
            id,
            part: "",
        };
        let max = self.output.max_component_length;

        let base = self.render_fitted(&self.folder_template, &values, max);
        if !self.is_taken(group, &base, existing) {
            return base;
        }

        let short_id = if id.is_empty() { FALLBACK_NAME } else { id };
        let mut attempt = 1;
        loop {
            let suffix = if attempt == 1 {
                format!(" [{}]", short_id)
            } else {
                format!(" [{}-{}]", short_id, attempt)
            };
            let budget = max.saturating_sub(suffix.chars().count()).max(1);
            let candidate = format!(
                "{}{}",
                self.render_fitted(&self.folder_template, &values, budget),
                suffix
            );
            if !self.is_taken(group, &candidate, existing) {
                tracing::debug!(folder = %candidate, "resolved folder collision");
                return candidate;
            }
            attempt += 1;
        }
    }

    fn is_taken(&self, group: &VideoGroup, folder: &str, existing: &TargetSet) -> bool {
        if existing.is_claimed(folder) {
            return true;
        }
        existing.contains(folder) && group.folder_name.to_lowercase() != folder.to_lowercase()
    }

    fn file_name(
        &self,
        file: &VideoFile,
        title: &str,
        year: &str,
        id: &str,
        part: &str,
    ) -> String {
        let values = NameValues {
            title,
            year,
            id,
            part,
        };
        match file.extension() {
            Some(ext) => {
                let budget = self
                    .output
                    .max_component_length
                    .saturating_sub(ext.chars().count() + 1)
                    .max(1);
                format!("{}.{}", self.render_fitted(&self.file_template, &values, budget), ext)
            }
            None => {
                self.render_fitted(&self.file_template, &values, self.output.max_component_length)
            }
        }
    }

    /// Render and sanitize, shortening only the title until the result fits
    fn render_fitted(
        &self,
        template: &Template,
        values: &NameValues<'_>,
        max_chars: usize,
    ) -> String {
        let rendered = self.render(template, values, values.title);
        let length = rendered.chars().count();
        if length <= max_chars {
            return rendered;
        }

        let title_len = values.title.chars().count();
        let keep = title_len.saturating_sub(length - max_chars);
        let short_title = tidy(truncate_chars(values.title, keep));
        let shortened = self.render(template, values, &short_title);

        // Nothing left to cut from the title; hard limit on the whole component
        if shortened.chars().count() > max_chars {
            return sanitize_component(
                truncate_chars(&shortened, max_chars),
                &self.output.replacement,
            );
        }
        shortened
    }

    fn render(&self, template: &Template, values: &NameValues<'_>, title: &str) -> String {
        let rendered = template.render(|name| match name {
            "title" => Some(title),
            "year" => Some(values.year),
            "id" => Some(values.id),
            "part" => Some(values.part),
            _ => None,
        });
        sanitize_component(&rendered, &self.output.replacement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grouping::{PartInfo, ScannedFile};
    use crate::scoring::{ConfidenceBreakdown, ScoringWeights};

    fn create_test_planner() -> OutputPlanner {
        OutputPlanner::new(&Config::default()).unwrap()
    }

    fn video(folder: &str, file: &str, part: Option<u32>) -> VideoFile {
        let scanned = ScannedFile::from_path(format!("/library/{}/{}", folder, file));
        VideoFile {
            path: scanned.path,
            folder_name: scanned.folder_name,
            file_name: scanned.file_name,
            part_info: part.map(|n| PartInfo {
                part_number: n,
                pattern_label: format!("CD{}", n),
                confidence: 0.9,
            }),
            source_hints: Vec::new(),
            stripped_name: "stripped".to_string(),
        }
    }

    fn group(folder: &str, members: Vec<VideoFile>) -> VideoGroup {
        VideoGroup {
            representative_name: "stripped".to_string(),
            folder_name: folder.to_string(),
            folder_path: PathBuf::from(format!("/library/{}", folder)),
            members,
            folder_extractions: Vec::new(),
            aggregated_source_hints: Vec::new(),
            year: None,
        }
    }

    fn breakdown(overall: f32) -> ConfidenceBreakdown {
        ConfidenceBreakdown {
            folder_name_match: overall,
            file_name_match: overall,
            source_match: 0.0,
            context_boosted: false,
            weights: ScoringWeights {
                folder_weight: 0.6,
                file_weight: 0.4,
                source_weight: 1.0,
                context_boost: 0.1,
            },
        }
    }

    fn metadata(identifier: &str, title: &str, year: Option<i32>) -> MetadataResult {
        MetadataResult {
            identifier: identifier.to_string(),
            title: title.to_string(),
            year,
            ..Default::default()
        }
    }

    fn planned(outcome: PlanOutcome) -> OutputPlan {
        match outcome {
            PlanOutcome::Planned(plan) => plan,
            other => panic!("expected plan, got {:?}", other),
        }
    }

    #[test]
    fn test_multi_part_plan() {
        let planner = create_test_planner();
        let group = group(
            "FC2-PPV-4734151 Premium HD",
            vec![
                video("FC2-PPV-4734151 Premium HD", "FC2-PPV-4734151_part1.mp4", Some(1)),
                video("FC2-PPV-4734151 Premium HD", "FC2-PPV-4734151_part2.mp4", Some(2)),
            ],
        );
        let meta = MetadataResult {
            poster_url: Some("http://img/poster.jpg".to_string()),
            ..metadata("FC2-PPV-4734151", "Premium Title", Some(2021))
        };

        let plan = planned(planner.plan(&group, &meta, &breakdown(0.95), &TargetSet::new(), None));

        assert_eq!(plan.target_folder, PathBuf::from("Premium Title (2021)"));
        let names: Vec<_> = plan.file_mappings.iter().map(|m| m.target_name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "Premium Title (2021) - Part 1.mp4",
                "Premium Title (2021) - Part 2.mp4"
            ]
        );
        assert!(plan.has_unique_targets());
        assert_eq!(
            plan.asset(AssetKind::Poster),
            Some(&PathBuf::from("Premium Title (2021)/poster.jpg"))
        );
        assert!(plan.asset(AssetKind::Fanart).is_none());
        assert!(plan.asset(AssetKind::Nfo).is_some());
    }

    #[test]
    fn test_singleton_has_no_part_label() {
        let planner = create_test_planner();
        let group = group("Movies", vec![video("Movies", "Example.MKV", None)]);
        let plan = planned(planner.plan(
            &group,
            &metadata("EX-1", "Example", Some(2020)),
            &breakdown(0.9),
            &TargetSet::new(),
            None,
        ));
        assert_eq!(plan.file_mappings[0].target_name, "Example (2020).mkv");
    }

    #[test]
    fn test_missing_year_drops_brackets() {
        let planner = create_test_planner();
        let group = group("Movies", vec![video("Movies", "Example.mp4", None)]);
        let plan = planned(planner.plan(
            &group,
            &metadata("EX-1", "Example", None),
            &breakdown(0.9),
            &TargetSet::new(),
            None,
        ));
        assert_eq!(plan.target_folder, PathBuf::from("Example"));
        assert_eq!(plan.file_mappings[0].target_name, "Example.mp4");
    }

    fn example(identifier: &str) -> MetadataResult {
        metadata(identifier, "Example", Some(2020))
    }

    /// Plan at a confident score and unwrap the result
    fn plan_confident(
        planner: &OutputPlanner,
        group: &VideoGroup,
        meta: &MetadataResult,
        targets: &TargetSet,
    ) -> OutputPlan {
        planned(planner.plan(group, meta, &breakdown(0.9), targets, None))
    }

    #[test]
    fn test_collision_suffix_is_deterministic() {
        let planner = create_test_planner();
        let first = group("A", vec![video("A", "a.mp4", None)]);
        let second = group("B", vec![video("B", "b.mp4", None)]);
        let third = group("C", vec![video("C", "c.mp4", None)]);

        let mut targets = TargetSet::new();
        let plan_a = plan_confident(&planner, &first, &example("ABC-1"), &targets);
        assert!(targets.claim(&plan_a));
        let plan_b = plan_confident(&planner, &second, &example("ABC-2"), &targets);
        assert!(targets.claim(&plan_b));
        let plan_c = plan_confident(&planner, &third, &example("ABC-2"), &targets);

        assert_eq!(plan_a.target_folder, PathBuf::from("Example (2020)"));
        assert_eq!(plan_b.target_folder, PathBuf::from("Example (2020) [ABC-2]"));
        assert_eq!(plan_c.target_folder, PathBuf::from("Example (2020) [ABC-2-2]"));
    }

    #[test]
    fn test_group_already_in_target_keeps_folder() {
        let planner = create_test_planner();
        let folder = "Example (2020)";
        let organized = group(folder, vec![video(folder, "Example (2020).mp4", None)]);
        let targets: TargetSet = [folder].into_iter().collect();

        let meta = metadata("ABC-1", "Example", Some(2020));
        let plan = plan_confident(&planner, &organized, &meta, &targets);
        assert_eq!(plan.target_folder, PathBuf::from(folder));
        assert_eq!(plan.file_mappings[0].target_name, "Example (2020).mp4");
    }

    #[test]
    fn test_folder_claimed_this_run_is_never_reused() {
        let planner = create_test_planner();
        let folder = "Example (2020)";
        let first = group(folder, vec![video(folder, "ABC-123.mp4", None)]);
        let second = group(folder, vec![video(folder, "XYZ-999.mp4", None)]);

        // carried over from an earlier run, so the first group may stay put
        let mut targets: TargetSet = [folder].into_iter().collect();
        let plan_a = plan_confident(&planner, &first, &example("ABC-123"), &targets);
        assert!(targets.claim(&plan_a));
        let plan_b = plan_confident(&planner, &second, &example("XYZ-999"), &targets);

        assert_eq!(plan_a.target_folder, PathBuf::from(folder));
        assert_eq!(plan_b.target_folder, PathBuf::from("Example (2020) [XYZ-999]"));
        assert_ne!(
            plan_a.target_folder.join(&plan_a.file_mappings[0].target_name),
            plan_b.target_folder.join(&plan_b.file_mappings[0].target_name)
        );
        assert!(targets.claim(&plan_b));
        assert!(!targets.claim(&plan_a));
    }

    #[test]
    fn test_target_set_carries_claims_over() {
        let planner = create_test_planner();
        let mut targets = TargetSet::new();
        let first = group("A", vec![video("A", "a.mp4", None)]);
        let plan = plan_confident(&planner, &first, &example("ABC-1"), &targets);
        assert!(targets.claim(&plan));
        assert!(targets.is_claimed("example (2020)"));

        let next = targets.carried_over();
        assert!(next.contains("Example (2020)"));
        assert!(!next.is_claimed("Example (2020)"));
        assert_eq!(next.len(), 1);
    }

    #[test]
    fn test_decision_gate() {
        let gate = DecisionGate::from_config(&Config::default().thresholds);
        assert_eq!(gate.decide_percent(85.0), Decision::AutoProcess);
        assert_eq!(gate.decide_percent(84.9), Decision::ManualReview);
        assert_eq!(gate.decide_percent(20.0), Decision::ManualReview);
        assert_eq!(gate.decide_percent(15.0), Decision::Skip);
    }

    #[test]
    fn test_low_confidence_is_skipped() {
        let planner = create_test_planner();
        let group = group("M", vec![video("M", "x.mp4", None)]);
        let outcome = planner.plan(
            &group,
            &metadata("X", "X", None),
            &breakdown(0.15),
            &TargetSet::new(),
            Some(ReviewOverride::Approve),
        );
        assert!(matches!(
            outcome,
            PlanOutcome::Skipped(SkipReason::LowConfidence { .. })
        ));
    }

    #[test]
    fn test_manual_review_needs_override() {
        let planner = create_test_planner();
        let group = group("M", vec![video("M", "x.mp4", None)]);
        let meta = metadata("X", "Title", None);

        let targets = TargetSet::new();
        let review = |verdict| planner.plan(&group, &meta, &breakdown(0.5), &targets, verdict);

        assert!(matches!(review(None), PlanOutcome::Deferred { .. }));
        assert_eq!(
            review(Some(ReviewOverride::Reject)),
            PlanOutcome::Skipped(SkipReason::Rejected)
        );
        assert!(matches!(
            review(Some(ReviewOverride::Approve)),
            PlanOutcome::Planned(_)
        ));
    }

    #[test]
    fn test_long_title_truncated_keeping_year() {
        let mut config = Config::default();
        config.output.max_component_length = 30;
        let planner = OutputPlanner::new(&config).unwrap();

        let group = group("M", vec![video("M", "x.mp4", None)]);
        let title = "An Extremely Long Title That Keeps Going";
        let meta = metadata("X", title, Some(2020));
        let plan = plan_confident(&planner, &group, &meta, &TargetSet::new());

        let folder = plan.target_folder.to_string_lossy().to_string();
        assert!(folder.chars().count() <= 30, "{}", folder);
        assert!(folder.ends_with("(2020)"));
        assert!(plan.file_mappings[0].target_name.chars().count() <= 30);
        assert!(plan.file_mappings[0].target_name.ends_with("(2020).mp4"));
    }

    #[test]
    fn test_reserved_characters_in_title() {
        let planner = create_test_planner();
        let group = group("M", vec![video("M", "x.mp4", None)]);
        let meta = metadata("X", "What: The/Movie?", Some(2020));
        let plan = plan_confident(&planner, &group, &meta, &TargetSet::new());
        assert_eq!(plan.target_folder, PathBuf::from("What_ The_Movie_ (2020)"));
    }

    #[test]
    fn test_empty_title_becomes_unknown() {
        let planner = create_test_planner();
        let group = group("M", vec![video("M", "x.mp4", None)]);
        let plan = plan_confident(&planner, &group, &metadata("X", "  ", None), &TargetSet::new());
        assert_eq!(plan.target_folder, PathBuf::from(FALLBACK_NAME));
    }

    #[test]
    fn test_planning_is_repeatable() {
        let planner = create_test_planner();
        let group = group(
            "M",
            vec![video("M", "a_cd1.mp4", Some(1)), video("M", "a_cd2.mp4", Some(2))],
        );
        let targets: TargetSet = ["Other"].into_iter().collect();
        let meta = metadata("ABC-1", "Example", Some(2020));

        let first = planner.plan(&group, &meta, &breakdown(0.9), &targets, None);
        let second = planner.plan(&group, &meta, &breakdown(0.9), &targets, None);
        assert_eq!(first, second);
    }
}
