// Per-run outcome reporting
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use uuid::Uuid;

use crate::error::{Result, TaggrrError};
use crate::grouping::{GroupAnomaly, VideoGroup};
use crate::planning::OutputPlan;
use crate::scoring::MatchCandidate;

/// Why a group ended without a plan
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "cause", rename_all = "snake_case")]
pub enum SkipCause {
    /// No identifier could be extracted
    NoCandidates,
    LowConfidence { percent: f32 },
    /// Every queried candidate came back empty
    NotFound { queried: usize },
    TransientError { error: String },
    /// Manual review rejected the match
    Rejected,
    /// Planned folder was claimed by another group of the same run
    TargetTaken { folder: String },
}

/// Terminal status of one group
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GroupStatus {
    Planned {
        plan: OutputPlan,
        /// Approved through manual review rather than automatically
        reviewed: bool,
    },
    Deferred {
        percent: f32,
    },
    Skipped {
        reason: SkipCause,
    },
}

impl GroupStatus {
    pub fn label(&self) -> &'static str {
        match self {
            GroupStatus::Planned { reviewed: false, .. } => "planned",
            GroupStatus::Planned { reviewed: true, .. } => "reviewed",
            GroupStatus::Deferred { .. } => "deferred",
            GroupStatus::Skipped { .. } => "skipped",
        }
    }

    pub fn plan(&self) -> Option<&OutputPlan> {
        match self {
            GroupStatus::Planned { plan, .. } => Some(plan),
            _ => None,
        }
    }
}

/// Outcome of one group within a run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupOutcome {
    /// Representative name of the group
    pub name: String,
    pub folder: PathBuf,
    pub files: usize,
    /// Best ranked identifier, if any
    pub identifier: Option<String>,
    pub overall_confidence: Option<f32>,
    #[serde(flatten)]
    pub status: GroupStatus,
}

impl GroupOutcome {
    pub fn new(group: &VideoGroup, best: Option<&MatchCandidate<'_>>, status: GroupStatus) -> Self {
        Self {
            name: group.representative_name.clone(),
            folder: group.folder_path.clone(),
            files: group.members.len(),
            identifier: best.map(|c| c.identifier.clone()),
            overall_confidence: best.map(|c| c.overall()),
            status,
        }
    }
}

/// Totals over a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunCounts {
    pub groups: usize,
    pub files: usize,
    pub planned: usize,
    pub reviewed: usize,
    pub deferred: usize,
    pub skipped: usize,
}

/// Everything a run produced, serialisable for reporting
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub outcomes: Vec<GroupOutcome>,
    pub anomalies: Vec<GroupAnomaly>,
    pub counts: RunCounts,
}

impl RunSummary {
    pub fn start() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            finished_at: None,
            outcomes: Vec::new(),
            anomalies: Vec::new(),
            counts: RunCounts::default(),
        }
    }

    pub fn record(&mut self, outcome: GroupOutcome) {
        self.counts.groups += 1;
        self.counts.files += outcome.files;
        match &outcome.status {
            GroupStatus::Planned { reviewed: false, .. } => self.counts.planned += 1,
            GroupStatus::Planned { reviewed: true, .. } => self.counts.reviewed += 1,
            GroupStatus::Deferred { .. } => self.counts.deferred += 1,
            GroupStatus::Skipped { .. } => self.counts.skipped += 1,
        }
        self.outcomes.push(outcome);
    }

    pub fn finish(mut self, anomalies: Vec<GroupAnomaly>) -> Self {
        self.anomalies = anomalies;
        self.finished_at = Some(Utc::now());

        tracing::info!(
            run_id = %self.run_id,
            groups = self.counts.groups,
            planned = self.counts.planned + self.counts.reviewed,
            deferred = self.counts.deferred,
            skipped = self.counts.skipped,
            "run complete"
        );
        self
    }

    /// Plans in discovery order
    pub fn plans(&self) -> impl Iterator<Item = &OutputPlan> {
        self.outcomes.iter().filter_map(|o| o.status.plan())
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| TaggrrError::Json {
            source: e,
            context: "Failed to serialize run summary".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(status: GroupStatus) -> GroupOutcome {
        GroupOutcome {
            name: "x".to_string(),
            folder: PathBuf::from("/library/x"),
            files: 2,
            identifier: None,
            overall_confidence: None,
            status,
        }
    }

    #[test]
    fn test_counts() {
        let mut summary = RunSummary::start();
        summary.record(outcome(GroupStatus::Deferred { percent: 50.0 }));
        summary.record(outcome(GroupStatus::Skipped {
            reason: SkipCause::NoCandidates,
        }));
        let summary = summary.finish(Vec::new());

        assert_eq!(summary.counts.groups, 2);
        assert_eq!(summary.counts.files, 4);
        assert_eq!(summary.counts.deferred, 1);
        assert_eq!(summary.counts.skipped, 1);
        assert!(summary.finished_at.is_some());
    }

    #[test]
    fn test_summary_json() {
        let mut summary = RunSummary::start();
        summary.record(outcome(GroupStatus::Skipped {
            reason: SkipCause::TransientError {
                error: "timeout".to_string(),
            },
        }));

        let json: serde_json::Value = serde_json::from_str(&summary.to_json().unwrap()).unwrap();
        let first = &json["outcomes"][0];
        assert_eq!(first["status"], "skipped");
        assert_eq!(first["reason"]["cause"], "transient_error");
        assert_eq!(first["reason"]["error"], "timeout");
    }
}
