// Shared types for output planning
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;

use crate::config::ThresholdsConfig;
use crate::grouping::VideoFile;
use crate::scoring::ConfidenceBreakdown;

/// Outcome of the confidence gate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    AutoProcess,
    ManualReview,
    Skip,
}

/// Maps overall confidence (as a percentage) onto a decision
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecisionGate {
    pub auto_process: f32,
    pub skip: f32,
}

impl DecisionGate {
    pub fn from_config(config: &ThresholdsConfig) -> Self {
        Self {
            auto_process: config.auto_process,
            skip: config.skip,
        }
    }

    pub fn decide(&self, breakdown: &ConfidenceBreakdown) -> Decision {
        self.decide_percent(breakdown.percent())
    }

    pub fn decide_percent(&self, percent: f32) -> Decision {
        if percent >= self.auto_process {
            Decision::AutoProcess
        } else if percent < self.skip {
            Decision::Skip
        } else {
            Decision::ManualReview
        }
    }
}

/// Caller's verdict on a group waiting for manual review
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewOverride {
    Approve,
    Reject,
}

/// Metadata supplied by the lookup collaborator
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MetadataResult {
    pub identifier: String,
    pub title: String,
    pub year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poster_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fanart_url: Option<String>,
}

/// Folder-level asset placed once per group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Poster,
    Fanart,
    Nfo,
}

/// Source file and the file name it receives inside the target folder
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileMapping {
    pub file: VideoFile,
    pub target_name: String,
}

/// Immutable target layout for one group
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputPlan {
    /// Folder name, relative to the output root
    pub target_folder: PathBuf,
    /// Ordered as the group's members
    pub file_mappings: Vec<FileMapping>,
    pub shared_assets: Vec<(AssetKind, PathBuf)>,
    pub identifier: String,
    pub overall_confidence: f32,
}

impl OutputPlan {
    /// Path of a mapped file relative to the output root
    pub fn target_path(&self, mapping: &FileMapping) -> PathBuf {
        self.target_folder.join(&mapping.target_name)
    }

    pub fn asset(&self, kind: AssetKind) -> Option<&PathBuf> {
        self.shared_assets
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, path)| path)
    }

    /// Every mapped file name is distinct (case-insensitively)
    pub fn has_unique_targets(&self) -> bool {
        let mut seen = HashSet::new();
        self.file_mappings
            .iter()
            .all(|m| seen.insert(m.target_name.to_lowercase()))
    }

    /// One line description for display
    pub fn summary(&self) -> String {
        format!(
            "{} -> {} ({} file(s), {} asset(s), {:.0}%)",
            self.identifier,
            self.target_folder.display(),
            self.file_mappings.len(),
            self.shared_assets.len(),
            self.overall_confidence * 100.0
        )
    }
}

/// Why a group produced no plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    LowConfidence { percent: f32 },
    Rejected,
}

/// Result of planning one group
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PlanOutcome {
    Planned(OutputPlan),
    Skipped(SkipReason),
    /// Manual review without a caller verdict
    Deferred { percent: f32 },
}

/// Target folder names in use, compared case-insensitively
///
/// Folders carried over from earlier runs (or already on disk) are kept apart
/// from folders claimed during the current run. A group that already lives in
/// a carried-over folder may plan into it again; a folder claimed in this run
/// is never handed out twice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSet {
    existing: HashSet<String>,
    claimed: HashSet<String>,
}

impl TargetSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the folder is in use, either carried over or claimed
    pub fn contains(&self, folder: &str) -> bool {
        let key = folder.to_lowercase();
        self.existing.contains(&key) || self.claimed.contains(&key)
    }

    /// Whether the folder was claimed by a plan of the current run
    pub fn is_claimed(&self, folder: &str) -> bool {
        self.claimed.contains(&folder.to_lowercase())
    }

    /// Record a folder that exists from before this run
    pub fn insert(&mut self, folder: &str) -> bool {
        self.existing.insert(folder.to_lowercase())
    }

    /// Claim the target folder of a finalized plan; returns false when the
    /// folder was already claimed in this run
    pub fn claim(&mut self, plan: &OutputPlan) -> bool {
        self.claimed
            .insert(plan.target_folder.to_string_lossy().to_lowercase())
    }

    /// Turn this run's claims into carried-over folders for the next run
    pub fn carried_over(mut self) -> Self {
        self.existing.extend(self.claimed.drain());
        self
    }

    pub fn len(&self) -> usize {
        self.existing.union(&self.claimed).count()
    }

    pub fn is_empty(&self) -> bool {
        self.existing.is_empty() && self.claimed.is_empty()
    }
}

impl<S: AsRef<str>> FromIterator<S> for TargetSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = Self::new();
        for folder in iter {
            set.insert(folder.as_ref());
        }
        set
    }
}
