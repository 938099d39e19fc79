//! Pattern registry for configuration-driven name analysis
//!
//! This module provides:
//! - Pre-compiled identifier patterns grouped into strong, medium and weak tiers
//! - Part marker patterns for multi-part detection
//! - Source detection pattern sets (globs or raw regexes)
//! - The year pattern with its resolved plausibility range

use crate::config::Config;
use crate::error::{Result, TaggrrError};
use chrono::Datelike;
use globset::{GlobBuilder, GlobMatcher};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

/// Priority class of an identifier pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Strong,
    Medium,
    Weak,
}

impl Tier {
    /// All tiers, strongest first
    pub const ALL: [Tier; 3] = [Tier::Strong, Tier::Medium, Tier::Weak];

    /// Rank used for tie-breaks, lower is stronger
    pub fn rank(self) -> u8 {
        match self {
            Tier::Strong => 0,
            Tier::Medium => 1,
            Tier::Weak => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Strong => "strong",
            Tier::Medium => "medium",
            Tier::Weak => "weak",
        }
    }
}

/// Which pattern set of a source produced a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternSet {
    Folder,
    File,
}

/// Compiled identifier pattern
#[derive(Debug, Clone)]
pub struct CompiledIdPattern {
    pub name: String,
    pub tier: Tier,
    pub regex: Regex,
    pub format: String,
    pub confidence: f32,
    pub source: Option<String>,
}

impl CompiledIdPattern {
    /// Match the name and render the identifier from the first capture group
    pub fn identify(&self, name: &str) -> Option<String> {
        let captures = self.regex.captures(name)?;
        let captured = captures.get(1)?.as_str().trim();
        if captured.is_empty() {
            return None;
        }
        Some(self.format.replacen("{}", captured, 1))
    }
}

/// Compiled part marker pattern
#[derive(Debug, Clone)]
pub struct CompiledPartPattern {
    pub name: String,
    pub regex: Regex,
    pub label: String,
    pub confidence: f32,
}

/// Part marker found in a base name
#[derive(Debug, Clone, PartialEq)]
pub struct PartMatch {
    pub part_number: u32,
    /// Pattern label rendered with the part number ("CD2")
    pub label: String,
    pub confidence: f32,
    /// Base name with the matched marker removed
    pub stripped: String,
}

/// One compiled source pattern
#[derive(Debug, Clone)]
pub enum SourcePattern {
    Glob(GlobMatcher),
    Regex(Regex),
}

impl SourcePattern {
    pub fn is_match(&self, name: &str) -> bool {
        match self {
            SourcePattern::Glob(matcher) => matcher.is_match(name),
            SourcePattern::Regex(regex) => regex.is_match(name),
        }
    }
}

/// Compiled source matcher with both pattern sets
#[derive(Debug, Clone)]
pub struct CompiledSourceMatcher {
    pub name: String,
    pub folder_patterns: Vec<SourcePattern>,
    pub file_patterns: Vec<SourcePattern>,
    pub confidence_boost: f32,
}

impl CompiledSourceMatcher {
    /// Pattern sets of this source that match the name, folder set first
    pub fn matching_sets(&self, name: &str) -> Vec<PatternSet> {
        let mut sets = Vec::new();
        if self.folder_patterns.iter().any(|p| p.is_match(name)) {
            sets.push(PatternSet::Folder);
        }
        if self.file_patterns.iter().any(|p| p.is_match(name)) {
            sets.push(PatternSet::File);
        }
        sets
    }
}

/// Inclusive range of plausible release years
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearRange {
    pub min: i32,
    pub max: i32,
}

impl YearRange {
    pub fn contains(&self, year: i32) -> bool {
        (self.min..=self.max).contains(&year)
    }
}

/// Pattern registry with all pre-compiled patterns
#[derive(Debug, Clone)]
pub struct PatternRegistry {
    /// Identifier patterns per tier, in declaration order
    pub strong: Vec<CompiledIdPattern>,
    pub medium: Vec<CompiledIdPattern>,
    pub weak: Vec<CompiledIdPattern>,
    /// Part marker patterns in declaration order
    pub parts: Vec<CompiledPartPattern>,
    /// Source matchers in declaration order
    pub sources: Vec<CompiledSourceMatcher>,
    pub year_pattern: Regex,
    pub year_range: YearRange,
}

impl PatternRegistry {
    /// Build the registry, resolving the year range against today's date
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::from_config_with_year(config, chrono::Utc::now().year())
    }

    /// Build the registry for a fixed current year
    pub fn from_config_with_year(config: &Config, current_year: i32) -> Result<Self> {
        let extraction = &config.extraction;

        let strong = compile_tier(Tier::Strong, &extraction.strong)?;
        let medium = compile_tier(Tier::Medium, &extraction.medium)?;
        let weak = compile_tier(Tier::Weak, &extraction.weak)?;

        let parts = config
            .parts
            .patterns
            .iter()
            .map(|pp| {
                Regex::new(&pp.pattern)
                    .map(|regex| CompiledPartPattern {
                        name: pp.name.clone(),
                        regex,
                        label: pp.label.clone(),
                        confidence: pp.confidence,
                    })
                    .map_err(|e| invalid_pattern("parts.patterns", &pp.name, e))
            })
            .collect::<Result<Vec<_>>>()?;

        let sources = config
            .sources
            .iter()
            .map(|source| {
                let compile_set = |set: &[String], section: &str| {
                    set.iter()
                        .map(|p| {
                            compile_source_pattern(p).map_err(|e| {
                                invalid_pattern(&format!("source.{}", section), &source.name, e)
                            })
                        })
                        .collect::<Result<Vec<_>>>()
                };

                Ok(CompiledSourceMatcher {
                    name: source.name.to_lowercase(),
                    folder_patterns: compile_set(&source.folder, "folder")?,
                    file_patterns: compile_set(&source.file, "file")?,
                    confidence_boost: source.confidence_boost,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let year_pattern = Regex::new(&extraction.year.pattern)
            .map_err(|e| invalid_pattern("extraction.year", "year", e))?;

        let year_range = YearRange {
            min: extraction.year.min_year,
            max: current_year + extraction.year.max_year_offset,
        };

        Ok(Self {
            strong,
            medium,
            weak,
            parts,
            sources,
            year_pattern,
            year_range,
        })
    }

    /// Patterns of one tier in declaration order
    pub fn tier(&self, tier: Tier) -> &[CompiledIdPattern] {
        match tier {
            Tier::Strong => &self.strong,
            Tier::Medium => &self.medium,
            Tier::Weak => &self.weak,
        }
    }

    /// First part pattern (in configured order) matching the base name
    pub fn detect_part(&self, base_name: &str) -> Option<PartMatch> {
        self.parts.iter().find_map(|pattern| {
            let captures = pattern.regex.captures(base_name)?;
            let whole = captures.get(0)?;
            let part_number: u32 = captures.get(1)?.as_str().parse().ok()?;

            let mut stripped = String::with_capacity(base_name.len());
            stripped.push_str(&base_name[..whole.start()]);
            stripped.push(' ');
            stripped.push_str(&base_name[whole.end()..]);

            Some(PartMatch {
                part_number,
                label: pattern.label.replace("{n}", &part_number.to_string()),
                confidence: pattern.confidence,
                stripped: trim_separators(&stripped),
            })
        })
    }

    /// First plausible year in the name
    pub fn find_year(&self, name: &str) -> Option<i32> {
        self.year_pattern
            .captures_iter(name)
            .filter_map(|c| c.get(1)?.as_str().parse::<i32>().ok())
            .find(|year| self.year_range.contains(*year))
    }
}

fn compile_tier(
    tier: Tier,
    patterns: &[crate::config::IdPatternConfig],
) -> Result<Vec<CompiledIdPattern>> {
    patterns
        .iter()
        .map(|pc| {
            Regex::new(&pc.pattern)
                .map(|regex| CompiledIdPattern {
                    name: pc.name.clone(),
                    tier,
                    regex,
                    format: pc.format.clone(),
                    confidence: pc.confidence,
                    source: pc.source.as_ref().map(|s| s.to_lowercase()),
                })
                .map_err(|e| invalid_pattern(&format!("extraction.{}", tier.as_str()), &pc.name, e))
        })
        .collect()
}

fn invalid_pattern(section: &str, name: &str, e: impl std::fmt::Display) -> TaggrrError {
    TaggrrError::InvalidPattern {
        section: section.to_string(),
        name: name.to_string(),
        message: e.to_string(),
    }
}

/// Compile a source pattern: `re:`-prefixed entries are raw regexes, anything
/// else is a glob matched against the whole name. Both are case-insensitive.
/// Globs accept backslash escapes, so `*\[DMM\]*` matches a literal bracket.
pub fn compile_source_pattern(pattern: &str) -> std::result::Result<SourcePattern, String> {
    match pattern.strip_prefix("re:") {
        Some(raw) => RegexBuilder::new(raw)
            .case_insensitive(true)
            .build()
            .map(SourcePattern::Regex)
            .map_err(|e| e.to_string()),
        None => GlobBuilder::new(pattern)
            .case_insensitive(true)
            .backslash_escape(true)
            .build()
            .map(|glob| SourcePattern::Glob(glob.compile_matcher()))
            .map_err(|e| e.to_string()),
    }
}

/// Trim whitespace and separator characters from both ends and collapse
/// internal whitespace runs
pub fn trim_separators(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_matches(|c: char| c == '.' || c == '_' || c == '-' || c.is_whitespace())
        .to_string()
}
