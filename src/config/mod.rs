//! Configuration management for Taggrr
//!
//! Every pattern, weight, threshold and template the matching core uses lives
//! here. The loaded value is immutable and threaded explicitly through the
//! extractor, grouper, scorer and planner.

use crate::error::{Result, TaggrrError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

mod validator;

pub use validator::ConfigValidator;

/// Schema version understood by this build
pub const SCHEMA_VERSION: &str = "1.0.0";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "_meta")]
    pub meta: MetaConfig,
    pub extraction: ExtractionConfig,
    pub parts: PartsConfig,
    pub scoring: ScoringConfig,
    pub thresholds: ThresholdsConfig,
    pub output: OutputConfig,
    pub lookup: LookupConfig,
    pub scan: ScanConfig,
    #[serde(default)]
    pub duplicates: DuplicatesConfig,
    /// Source detection pattern sets, evaluated in declaration order
    #[serde(default, rename = "source")]
    pub sources: Vec<SourceConfig>,
}

/// Metadata about the configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaConfig {
    pub schema_version: String,
    #[serde(default = "current_timestamp")]
    pub created_at: String,
    #[serde(default = "current_timestamp")]
    pub last_modified: String,
}

fn current_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Identifier extraction tiers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    pub strong: Vec<IdPatternConfig>,
    pub medium: Vec<IdPatternConfig>,
    pub weak: Vec<IdPatternConfig>,
    pub year: YearConfig,
}

/// One identifier pattern inside a tier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdPatternConfig {
    pub name: String,
    /// Regex with one capture group holding the identifier
    pub pattern: String,
    /// Output format, `{}` is replaced by the captured text
    #[serde(default = "default_id_format")]
    pub format: String,
    pub confidence: f32,
    /// Metadata source this pattern implies (fc2, dmm, generic, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

fn default_id_format() -> String {
    "{}".to_string()
}

/// Year extraction settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YearConfig {
    pub pattern: String,
    pub min_year: i32,
    /// Upper bound is the current year plus this offset
    pub max_year_offset: i32,
}

/// Multi-part detection and grouping settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartsConfig {
    pub patterns: Vec<PartPatternConfig>,
    pub max_parts: usize,
    pub similarity_threshold: f32,
    #[serde(default)]
    pub similarity: SimilarityMetric,
}

/// Part marker pattern
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartPatternConfig {
    pub name: String,
    /// Regex with one capture group holding the part number
    pub pattern: String,
    /// Label describing the matched marker, `{n}` is the part number
    pub label: String,
    pub confidence: f32,
}

/// Name similarity measure used while clustering parts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityMetric {
    /// Normalized Levenshtein similarity
    #[default]
    Levenshtein,
    /// Jaccard ratio over alphanumeric tokens
    TokenOverlap,
}

/// Source detection pattern set for one metadata source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    /// Globs (or `re:` prefixed regexes) tested as the folder pattern set
    #[serde(default)]
    pub folder: Vec<String>,
    /// Globs (or `re:` prefixed regexes) tested as the file pattern set
    #[serde(default)]
    pub file: Vec<String>,
    pub confidence_boost: f32,
}

/// Confidence combination settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    pub folder_weight: f32,
    pub file_weight: f32,
    /// Multiplier applied to the capped source term
    #[serde(default = "default_source_weight")]
    pub source_weight: f32,
    pub context_boost: f32,
    /// Folder and file matches below this count as weak evidence
    pub low_signal_threshold: f32,
    /// Global source preference override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_source: Option<String>,
}

fn default_source_weight() -> f32 {
    1.0
}

/// Decision thresholds, in percent of overall confidence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdsConfig {
    pub auto_process: f32,
    pub skip: f32,
}

/// Output naming settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Placeholders: {title}, {year}, {id}
    pub folder_format: String,
    /// Placeholders: {title}, {year}, {id}, {part}
    pub file_format: String,
    /// Normalized part label, `{n}` is the part number
    pub part_format: String,
    /// Substitute for filesystem reserved characters
    pub replacement: String,
    pub max_component_length: usize,
    pub create_nfo: bool,
    pub assets: AssetNamesConfig,
}

/// File names for shared folder-level assets
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetNamesConfig {
    pub poster: String,
    pub fanart: String,
    pub nfo: String,
}

/// Metadata lookup orchestration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupConfig {
    /// Only this many top-ranked candidates are queried per group
    pub max_candidates: usize,
    /// Synthesize metadata from the identifier when every lookup misses
    pub fallback_to_identifier: bool,
}

/// Directory scan settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    pub video_extensions: Vec<String>,
    pub recursive: bool,
}

/// Identifier-based duplicate reporting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicatesConfig {
    /// Best extraction must reach this confidence for a file to be indexed
    pub min_confidence: f32,
}

impl Default for DuplicatesConfig {
    fn default() -> Self {
        Self {
            min_confidence: 0.5,
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(TaggrrError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| TaggrrError::Io {
            source: e,
            context: format!("Failed to read config file: {:?}", path),
        })?;
        let mut config: Config = toml::from_str(&content)?;

        // Apply environment variable overrides
        config.apply_env_overrides();

        ConfigValidator::validate(&config)?;

        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| TaggrrError::Io {
            source: e,
            context: format!("Failed to write config file: {:?}", path),
        })?;
        Ok(())
    }

    /// Apply environment variable overrides
    /// Environment variables in format: TAGGRR_SECTION__KEY=value
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(std::env::vars());
    }

    /// Apply `TAGGRR_`-prefixed key/value overrides, ignoring other keys
    pub fn apply_overrides<I>(&mut self, vars: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            if let Some(config_key) = key.strip_prefix("TAGGRR_") {
                if let Err(e) = self.set_value_from_env(config_key, &value) {
                    tracing::warn!("Failed to apply env override {}: {}", key, e);
                }
            }
        }
    }

    fn set_value_from_env(&mut self, path: &str, value: &str) -> Result<()> {
        match path {
            "SCORING__PREFERRED_SOURCE" => {
                self.scoring.preferred_source = if value.is_empty() {
                    None
                } else {
                    Some(value.to_lowercase())
                };
            }
            "SCORING__FOLDER_WEIGHT" => self.scoring.folder_weight = parse_env(path, value)?,
            "SCORING__FILE_WEIGHT" => self.scoring.file_weight = parse_env(path, value)?,
            "SCORING__CONTEXT_BOOST" => self.scoring.context_boost = parse_env(path, value)?,
            "THRESHOLDS__AUTO_PROCESS" => self.thresholds.auto_process = parse_env(path, value)?,
            "THRESHOLDS__SKIP" => self.thresholds.skip = parse_env(path, value)?,
            "PARTS__MAX_PARTS" => self.parts.max_parts = parse_env(path, value)?,
            "PARTS__SIMILARITY_THRESHOLD" => {
                self.parts.similarity_threshold = parse_env(path, value)?
            }
            "OUTPUT__FOLDER_FORMAT" => self.output.folder_format = value.to_string(),
            "OUTPUT__FILE_FORMAT" => self.output.file_format = value.to_string(),
            "LOOKUP__MAX_CANDIDATES" => self.lookup.max_candidates = parse_env(path, value)?,
            "DUPLICATES__MIN_CONFIDENCE" => {
                self.duplicates.min_confidence = parse_env(path, value)?
            }
            _ => {
                tracing::debug!("Unknown env config key: {}", path);
            }
        }
        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| TaggrrError::Config("Cannot determine config directory".to_string()))?;

        Ok(config_dir.join("taggrr").join("config.toml"))
    }

    /// Find a source pattern set by name (case-insensitive)
    pub fn source(&self, name: &str) -> Option<&SourceConfig> {
        self.sources
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name))
    }
}

fn parse_env<T: std::str::FromStr>(path: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| TaggrrError::InvalidConfigValue {
            path: path.to_string(),
            message: format!("Cannot parse '{}'", value),
        })
}

fn id_pattern(
    name: &str,
    pattern: &str,
    format: &str,
    confidence: f32,
    source: &str,
) -> IdPatternConfig {
    IdPatternConfig {
        name: name.to_string(),
        pattern: pattern.to_string(),
        format: format.to_string(),
        confidence,
        source: Some(source.to_string()),
    }
}

fn part_pattern(name: &str, pattern: &str, label: &str, confidence: f32) -> PartPatternConfig {
    PartPatternConfig {
        name: name.to_string(),
        pattern: pattern.to_string(),
        label: label.to_string(),
        confidence,
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            meta: MetaConfig {
                schema_version: SCHEMA_VERSION.to_string(),
                created_at: current_timestamp(),
                last_modified: current_timestamp(),
            },
            extraction: ExtractionConfig {
                strong: vec![
                    id_pattern(
                        "fc2_ppv",
                        r"(?i)FC2[-_ ]?PPV[-_ ]?(\d{6,8})",
                        "FC2-PPV-{}",
                        0.95,
                        "fc2",
                    ),
                    id_pattern(
                        "ppv_only",
                        r"(?i)(?:^|[^a-z0-9])PPV[-_ ](\d{6,8})",
                        "FC2-PPV-{}",
                        0.80,
                        "fc2",
                    ),
                    id_pattern(
                        "1pondo",
                        r"(?i)(?:1pondo|1pon)[-_ ]*(\d{6}_\d{3,4})",
                        "{}",
                        0.92,
                        "generic",
                    ),
                    id_pattern(
                        "1pondo_suffix",
                        r"(?i)(\d{6}_\d{3,4})[-_ ]*(?:1pondo|1pon)",
                        "{}",
                        0.92,
                        "generic",
                    ),
                    id_pattern(
                        "caribbean",
                        r"(?i)(?:carib(?:bean)?(?:pr)?|carrib(?:ean)?(?:pr)?)[-_ ]*(\d{5,6}_\d{3,4})",
                        "{}",
                        0.90,
                        "generic",
                    ),
                ],
                medium: vec![
                    id_pattern("dmm_dash", r"\b([A-Z]{2,5}-\d{3,4})\b", "{}", 0.75, "dmm"),
                    id_pattern("dmm_compact", r"\b([A-Z]{3,5}\d{3,4})\b", "{}", 0.65, "dmm"),
                    id_pattern(
                        "dmm_date",
                        r"(?:^|[^0-9])(\d{6}_\d{3,4})(?:[^0-9]|$)",
                        "{}",
                        0.70,
                        "dmm",
                    ),
                ],
                weak: vec![
                    id_pattern(
                        "digits",
                        r"(?:^|[^0-9])(\d{6,8})(?:[^0-9]|$)",
                        "{}",
                        0.40,
                        "generic",
                    ),
                    id_pattern(
                        "alnum_code",
                        r"\b([A-Za-z]{2,6}\d{2,6})\b",
                        "{}",
                        0.50,
                        "generic",
                    ),
                    id_pattern(
                        "title_words",
                        r"^([A-Za-z][A-Za-z0-9']*(?:[ ._-]+[A-Za-z0-9']+)+)$",
                        "{}",
                        0.35,
                        "generic",
                    ),
                ],
                year: YearConfig {
                    pattern: r"(?:^|[^0-9])((?:19|20)\d{2})(?:[^0-9]|$)".to_string(),
                    min_year: 1970,
                    max_year_offset: 1,
                },
            },
            parts: PartsConfig {
                patterns: vec![
                    part_pattern("part", r"(?i)(?:^|[^a-z])part[ ._-]*(\d{1,3})", "Part {n}", 0.9),
                    part_pattern("cd", r"(?i)(?:^|[^a-z])cd[ ._-]*(\d{1,3})", "CD{n}", 0.9),
                    part_pattern(
                        "disc",
                        r"(?i)(?:^|[^a-z])dis[ck][ ._-]*(\d{1,3})",
                        "Disc {n}",
                        0.9,
                    ),
                    part_pattern("dash_suffix", r"-(\d{1,2})$", "Part {n}", 0.8),
                    part_pattern("underscore_suffix", r"_(\d{1,2})$", "Part {n}", 0.8),
                    part_pattern("bracketed", r"\[(\d{1,2})\]", "Part {n}", 0.7),
                    part_pattern("parenthesized", r"\((\d{1,2})\)", "Part {n}", 0.7),
                ],
                max_parts: 10,
                similarity_threshold: 0.8,
                similarity: SimilarityMetric::Levenshtein,
            },
            scoring: ScoringConfig {
                folder_weight: 0.6,
                file_weight: 0.4,
                source_weight: 1.0,
                context_boost: 0.1,
                low_signal_threshold: 0.3,
                preferred_source: None,
            },
            thresholds: ThresholdsConfig {
                auto_process: 85.0,
                skip: 20.0,
            },
            output: OutputConfig {
                folder_format: "{title} ({year})".to_string(),
                file_format: "{title} ({year}) - {part}".to_string(),
                part_format: "Part {n}".to_string(),
                replacement: "_".to_string(),
                max_component_length: 200,
                create_nfo: true,
                assets: AssetNamesConfig {
                    poster: "poster.jpg".to_string(),
                    fanart: "fanart.jpg".to_string(),
                    nfo: "movie.nfo".to_string(),
                },
            },
            lookup: LookupConfig {
                max_candidates: 3,
                fallback_to_identifier: false,
            },
            scan: ScanConfig {
                video_extensions: strings(&[
                    "mp4", "mkv", "avi", "mov", "wmv", "flv", "webm", "m4v", "mpg", "mpeg",
                ]),
                recursive: true,
            },
            duplicates: DuplicatesConfig::default(),
            sources: vec![
                SourceConfig {
                    name: "fc2".to_string(),
                    folder: strings(&["*FC2*", "*PPV*"]),
                    file: strings(&["FC2-*", "FC2_*", "*PPV*"]),
                    confidence_boost: 0.2,
                },
                SourceConfig {
                    name: "dmm".to_string(),
                    folder: strings(&[r"*\[DMM\]*", "*DMM*", "*R18*"]),
                    file: strings(&["*-h.mp4", "*uncensored*", "*DMM*"]),
                    confidence_boost: 0.15,
                },
            ],
        }
    }
}
