//! End-to-end organisation run
//!
//! Groups scanned files, ranks candidates per group, queries the metadata
//! collaborator for the top candidates and plans every group. The set of
//! claimed target folders is the only shared state; it sits behind a mutex
//! and is updated right after each plan is finalized.

mod lookup;
mod summary;

pub use lookup::{IdentifierLookup, LookupOutcome, MetadataLookup};
pub use summary::{GroupOutcome, GroupStatus, RunCounts, RunSummary, SkipCause};

use crate::config::{Config, ConfigValidator};
use crate::error::Result;
use crate::extraction::PatternExtractor;
use crate::grouping::{ScannedFile, SimilarityGrouper, VideoGroup};
use crate::patterns::PatternRegistry;
use crate::planning::{
    Decision, MetadataResult, OutputPlanner, PlanOutcome, ReviewOverride, SkipReason, TargetSet,
};
use crate::scoring::{ConfidenceScorer, MatchCandidate};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Drives grouping, scoring, lookup and planning over a file list
pub struct Organizer<L: MetadataLookup> {
    extractor: PatternExtractor,
    grouper: SimilarityGrouper,
    scorer: ConfidenceScorer,
    planner: OutputPlanner,
    lookup: L,
    fallback: Option<IdentifierLookup>,
    max_candidates: usize,
    review: Option<ReviewOverride>,
    targets: Arc<Mutex<TargetSet>>,
}

impl<L: MetadataLookup> Organizer<L> {
    /// Build every stage from one configuration
    ///
    /// The configuration is validated first; any problem is fatal before a
    /// single group is processed.
    pub fn new(config: &Config, lookup: L) -> Result<Self> {
        ConfigValidator::validate(config)?;
        let registry = Arc::new(PatternRegistry::from_config(config)?);
        Self::build(config, registry, lookup)
    }

    /// Build with an already compiled registry
    pub fn with_registry(
        config: &Config,
        registry: Arc<PatternRegistry>,
        lookup: L,
    ) -> Result<Self> {
        ConfigValidator::validate(config)?;
        Self::build(config, registry, lookup)
    }

    fn build(config: &Config, registry: Arc<PatternRegistry>, lookup: L) -> Result<Self> {
        let extractor = PatternExtractor::new(registry);
        Ok(Self {
            grouper: SimilarityGrouper::new(extractor.clone(), &config.parts),
            extractor,
            scorer: ConfidenceScorer::new(&config.scoring),
            planner: OutputPlanner::new(config)?,
            lookup,
            fallback: config.lookup.fallback_to_identifier.then_some(IdentifierLookup),
            max_candidates: config.lookup.max_candidates.max(1),
            review: None,
            targets: Arc::new(Mutex::new(TargetSet::new())),
        })
    }

    /// Start from target folders claimed by an earlier run
    pub fn with_targets(mut self, targets: TargetSet) -> Self {
        self.targets = Arc::new(Mutex::new(targets.carried_over()));
        self
    }

    /// Verdict applied to every group that lands in manual review
    pub fn with_review(mut self, review: ReviewOverride) -> Self {
        self.review = Some(review);
        self
    }

    /// Snapshot of the claimed target folders
    pub fn targets(&self) -> TargetSet {
        self.targets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Process groups one after another in discovery order
    pub fn run(&self, files: Vec<ScannedFile>) -> RunSummary {
        let mut summary = RunSummary::start();
        let report = self.grouper.group_with_report(files);

        for group in &report.groups {
            summary.record(self.process_group(group, self.review));
        }

        summary.finish(report.anomalies)
    }

    /// Process groups on `workers` threads sharing the target registry
    ///
    /// Outcomes are reported in discovery order. Which of two colliding groups
    /// receives the suffixed folder depends on scheduling, but target folders
    /// are always unique.
    pub fn run_parallel(&self, files: Vec<ScannedFile>, workers: usize) -> RunSummary {
        let mut summary = RunSummary::start();
        let report = self.grouper.group_with_report(files);
        let groups = &report.groups;

        let next = AtomicUsize::new(0);
        let results: Mutex<Vec<(usize, GroupOutcome)>> =
            Mutex::new(Vec::with_capacity(groups.len()));

        std::thread::scope(|scope| {
            for _ in 0..workers.clamp(1, groups.len().max(1)) {
                scope.spawn(|| loop {
                    let idx = next.fetch_add(1, Ordering::Relaxed);
                    let Some(group) = groups.get(idx) else {
                        break;
                    };
                    let outcome = self.process_group(group, self.review);
                    results
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .push((idx, outcome));
                });
            }
        });

        let mut results = results.into_inner().unwrap_or_else(PoisonError::into_inner);
        results.sort_by_key(|(idx, _)| *idx);
        for (_, outcome) in results {
            summary.record(outcome);
        }

        summary.finish(report.anomalies)
    }

    /// Score, look up and plan a single group
    pub fn process_group(
        &self,
        group: &VideoGroup,
        review: Option<ReviewOverride>,
    ) -> GroupOutcome {
        let per_file = self.extractor.extract_members(group);
        let candidates = self.scorer.score(group, &per_file);

        let status = match candidates.first() {
            None => GroupStatus::Skipped {
                reason: SkipCause::NoCandidates,
            },
            Some(_) => self.resolve(group, &candidates, review),
        };

        let outcome = GroupOutcome::new(group, candidates.first(), status);
        tracing::info!(
            group = %outcome.name,
            status = outcome.status.label(),
            "processed group"
        );
        outcome
    }

    fn resolve(
        &self,
        group: &VideoGroup,
        candidates: &[MatchCandidate<'_>],
        review: Option<ReviewOverride>,
    ) -> GroupStatus {
        let gate = self.planner.gate();
        let mut queried = 0;

        for candidate in candidates.iter().take(self.max_candidates) {
            if gate.decide(&candidate.breakdown) == Decision::Skip {
                break;
            }
            queried += 1;

            match self
                .lookup
                .lookup(&candidate.identifier, candidate.chosen_source.as_deref())
            {
                LookupOutcome::Found(metadata) => {
                    return self.finalize(group, candidate, &metadata, review);
                }
                LookupOutcome::NotFound => {
                    tracing::debug!(identifier = %candidate.identifier, "metadata not found");
                }
                LookupOutcome::TransientError(error) => {
                    tracing::warn!(
                        identifier = %candidate.identifier,
                        %error,
                        "metadata lookup failed"
                    );
                    return GroupStatus::Skipped {
                        reason: SkipCause::TransientError { error },
                    };
                }
            }
        }

        if queried == 0 {
            let percent = candidates[0].breakdown.percent();
            return GroupStatus::Skipped {
                reason: SkipCause::LowConfidence { percent },
            };
        }

        if let Some(fallback) = &self.fallback {
            let best = &candidates[0];
            if let LookupOutcome::Found(metadata) =
                fallback.lookup(&best.identifier, best.chosen_source.as_deref())
            {
                return self.finalize(group, best, &metadata, review);
            }
        }

        GroupStatus::Skipped {
            reason: SkipCause::NotFound { queried },
        }
    }

    /// Plan under the target lock and claim the folder before releasing it
    fn finalize(
        &self,
        group: &VideoGroup,
        candidate: &MatchCandidate<'_>,
        metadata: &MetadataResult,
        review: Option<ReviewOverride>,
    ) -> GroupStatus {
        let mut targets = self.targets.lock().unwrap_or_else(PoisonError::into_inner);

        match self
            .planner
            .plan(group, metadata, &candidate.breakdown, &targets, review)
        {
            PlanOutcome::Planned(plan) => {
                if !targets.claim(&plan) {
                    let folder = plan.target_folder.to_string_lossy().to_string();
                    tracing::warn!(
                        group = %group.representative_name,
                        %folder,
                        "target folder already claimed"
                    );
                    return GroupStatus::Skipped {
                        reason: SkipCause::TargetTaken { folder },
                    };
                }
                let gated = self.planner.gate().decide(&candidate.breakdown);
                GroupStatus::Planned {
                    reviewed: review == Some(ReviewOverride::Approve)
                        && gated == Decision::ManualReview,
                    plan,
                }
            }
            PlanOutcome::Deferred { percent } => GroupStatus::Deferred { percent },
            PlanOutcome::Skipped(SkipReason::LowConfidence { percent }) => GroupStatus::Skipped {
                reason: SkipCause::LowConfidence { percent },
            },
            PlanOutcome::Skipped(SkipReason::Rejected) => GroupStatus::Skipped {
                reason: SkipCause::Rejected,
            },
        }
    }
}
