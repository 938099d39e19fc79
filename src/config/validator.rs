use crate::config::{Config, IdPatternConfig, SCHEMA_VERSION};
use crate::error::{Result, TaggrrError, ValidationError};
use crate::patterns::compile_source_pattern;
use crate::planning::{Template, RESERVED_CHARS};
use regex::Regex;

/// Combined folder and file weight may exceed 1.0 by this much (float noise)
const WEIGHT_EPSILON: f32 = 1e-4;

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration
    pub fn validate(config: &Config) -> Result<()> {
        let mut errors = Vec::new();

        Self::validate_schema_version(config, &mut errors);
        Self::validate_extraction(config, &mut errors);
        Self::validate_parts(config, &mut errors);
        Self::validate_sources(config, &mut errors);
        Self::validate_scoring(config, &mut errors);
        Self::validate_thresholds(config, &mut errors);
        Self::validate_output(config, &mut errors);
        Self::validate_lookup(config, &mut errors);
        Self::validate_confidence(
            "duplicates.min_confidence",
            config.duplicates.min_confidence,
            &mut errors,
        );

        if errors.is_empty() {
            Ok(())
        } else {
            Err(TaggrrError::ConfigValidation { errors })
        }
    }

    fn validate_schema_version(config: &Config, errors: &mut Vec<ValidationError>) {
        let version = &config.meta.schema_version;
        if version != SCHEMA_VERSION {
            errors.push(ValidationError::new(
                "_meta.schema_version",
                format!("Unsupported schema version: {}", version),
            ));
        }
    }

    fn validate_extraction(config: &Config, errors: &mut Vec<ValidationError>) {
        let tiers = [
            ("extraction.strong", &config.extraction.strong),
            ("extraction.medium", &config.extraction.medium),
            ("extraction.weak", &config.extraction.weak),
        ];

        for (path, patterns) in tiers {
            if patterns.is_empty() {
                errors.push(ValidationError::new(path, "Pattern tier cannot be empty"));
            }
            for (idx, pattern) in patterns.iter().enumerate() {
                Self::validate_id_pattern(&format!("{}[{}]", path, idx), pattern, errors);
            }
        }

        let year = &config.extraction.year;
        Self::validate_regex("extraction.year.pattern", &year.pattern, errors);
        if year.min_year < 1800 {
            errors.push(ValidationError::new(
                "extraction.year.min_year",
                format!("Implausible minimum year: {}", year.min_year),
            ));
        }
        if year.max_year_offset < 0 {
            errors.push(ValidationError::new(
                "extraction.year.max_year_offset",
                "Year offset cannot be negative",
            ));
        }
    }

    fn validate_id_pattern(
        path: &str,
        pattern: &IdPatternConfig,
        errors: &mut Vec<ValidationError>,
    ) {
        if pattern.name.is_empty() {
            errors.push(ValidationError::new(
                format!("{}.name", path),
                "Pattern name cannot be empty",
            ));
        }
        Self::validate_regex(&format!("{}.pattern", path), &pattern.pattern, errors);
        Self::validate_confidence(&format!("{}.confidence", path), pattern.confidence, errors);

        if pattern.format.matches("{}").count() != 1 {
            errors.push(ValidationError::new(
                format!("{}.format", path),
                format!(
                    "Format must contain exactly one '{{}}', got '{}'",
                    pattern.format
                ),
            ));
        }
    }

    fn validate_parts(config: &Config, errors: &mut Vec<ValidationError>) {
        let parts = &config.parts;

        if parts.patterns.is_empty() {
            errors.push(ValidationError::new(
                "parts.patterns",
                "At least one part pattern is required",
            ));
        }
        for (idx, pattern) in parts.patterns.iter().enumerate() {
            let path = format!("parts.patterns[{}]", idx);
            Self::validate_regex(&format!("{}.pattern", path), &pattern.pattern, errors);
            Self::validate_confidence(&format!("{}.confidence", path), pattern.confidence, errors);
            if !pattern.label.contains("{n}") {
                errors.push(ValidationError::new(
                    format!("{}.label", path),
                    "Part label must contain '{n}'",
                ));
            }
        }

        if !(1..=50).contains(&parts.max_parts) {
            errors.push(ValidationError::new(
                "parts.max_parts",
                format!("max_parts must be between 1 and 50, got {}", parts.max_parts),
            ));
        }
        if !(0.0..=1.0).contains(&parts.similarity_threshold) {
            errors.push(ValidationError::new(
                "parts.similarity_threshold",
                format!(
                    "Similarity threshold must be between 0.0 and 1.0, got {}",
                    parts.similarity_threshold
                ),
            ));
        }
    }

    fn validate_sources(config: &Config, errors: &mut Vec<ValidationError>) {
        for (idx, source) in config.sources.iter().enumerate() {
            let path = format!("source[{}]", idx);
            if source.name.is_empty() {
                errors.push(ValidationError::new(
                    format!("{}.name", path),
                    "Source name cannot be empty",
                ));
            }
            if config.sources[..idx]
                .iter()
                .any(|other| other.name.eq_ignore_ascii_case(&source.name))
            {
                errors.push(ValidationError::new(
                    format!("{}.name", path),
                    format!("Duplicate source name '{}'", source.name),
                ));
            }
            Self::validate_confidence(
                &format!("{}.confidence_boost", path),
                source.confidence_boost,
                errors,
            );
            for (set, patterns) in [("folder", &source.folder), ("file", &source.file)] {
                for pattern in patterns {
                    if let Err(e) = compile_source_pattern(pattern) {
                        errors.push(ValidationError::new(
                            format!("{}.{}", path, set),
                            format!("Invalid pattern '{}': {}", pattern, e),
                        ));
                    }
                }
            }
        }
    }

    fn validate_scoring(config: &Config, errors: &mut Vec<ValidationError>) {
        let scoring = &config.scoring;

        for (path, value) in [
            ("scoring.folder_weight", scoring.folder_weight),
            ("scoring.file_weight", scoring.file_weight),
            ("scoring.source_weight", scoring.source_weight),
            ("scoring.context_boost", scoring.context_boost),
            ("scoring.low_signal_threshold", scoring.low_signal_threshold),
        ] {
            Self::validate_confidence(path, value, errors);
        }

        let total = scoring.folder_weight + scoring.file_weight;
        if total > 1.0 + WEIGHT_EPSILON {
            errors.push(ValidationError::new(
                "scoring",
                format!("folder_weight + file_weight must not exceed 1.0, got {}", total),
            ));
        }
        if total <= 0.0 {
            errors.push(ValidationError::new(
                "scoring",
                "folder_weight + file_weight must be greater than 0",
            ));
        }

        if let Some(preferred) = &scoring.preferred_source {
            if config.source(preferred).is_none() {
                errors.push(ValidationError::new(
                    "scoring.preferred_source",
                    format!("Preferred source '{}' has no [[source]] entry", preferred),
                ));
            }
        }
    }

    fn validate_thresholds(config: &Config, errors: &mut Vec<ValidationError>) {
        let thresholds = &config.thresholds;

        for (path, value) in [
            ("thresholds.auto_process", thresholds.auto_process),
            ("thresholds.skip", thresholds.skip),
        ] {
            if !(0.0..=100.0).contains(&value) {
                errors.push(ValidationError::new(
                    path,
                    format!("Threshold must be between 0 and 100, got {}", value),
                ));
            }
        }

        if thresholds.skip > thresholds.auto_process {
            errors.push(ValidationError::new(
                "thresholds",
                format!(
                    "skip ({}) must not exceed auto_process ({})",
                    thresholds.skip, thresholds.auto_process
                ),
            ));
        }
    }

    fn validate_output(config: &Config, errors: &mut Vec<ValidationError>) {
        let output = &config.output;

        Self::validate_template(
            "output.folder_format",
            &output.folder_format,
            &["title", "year", "id"],
            errors,
        );
        Self::validate_template(
            "output.file_format",
            &output.file_format,
            &["title", "year", "id", "part"],
            errors,
        );

        if let Ok(template) = Template::parse(&output.file_format) {
            if !template.uses("part") {
                errors.push(ValidationError::new(
                    "output.file_format",
                    "File format must contain {part} so multi-part files stay distinct",
                ));
            }
        }

        if !output.part_format.contains("{n}") {
            errors.push(ValidationError::new(
                "output.part_format",
                "Part format must contain '{n}'",
            ));
        }

        if output.replacement.chars().any(|c| RESERVED_CHARS.contains(&c) || c.is_control()) {
            errors.push(ValidationError::new(
                "output.replacement",
                format!("Replacement '{}' contains a reserved character", output.replacement),
            ));
        }

        if output.max_component_length < 16 {
            errors.push(ValidationError::new(
                "output.max_component_length",
                format!(
                    "Maximum component length must be at least 16, got {}",
                    output.max_component_length
                ),
            ));
        }

        for (path, name) in [
            ("output.assets.poster", &output.assets.poster),
            ("output.assets.fanart", &output.assets.fanart),
            ("output.assets.nfo", &output.assets.nfo),
        ] {
            if name.is_empty() || name.chars().any(|c| RESERVED_CHARS.contains(&c)) {
                errors.push(ValidationError::new(
                    path,
                    format!("Invalid asset file name '{}'", name),
                ));
            }
        }
    }

    fn validate_lookup(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.lookup.max_candidates == 0 {
            errors.push(ValidationError::new(
                "lookup.max_candidates",
                "At least one candidate must be queried",
            ));
        }
    }

    fn validate_template(
        path: &str,
        source: &str,
        allowed: &[&str],
        errors: &mut Vec<ValidationError>,
    ) {
        match Template::parse(source) {
            Ok(template) => {
                if !template.uses("title") {
                    errors.push(ValidationError::new(path, "Template must contain {title}"));
                }
                for name in template.placeholders() {
                    if !allowed.contains(&name) {
                        errors.push(ValidationError::new(
                            path,
                            format!("Unknown placeholder {{{}}}", name),
                        ));
                    }
                }
            }
            Err(e) => errors.push(ValidationError::new(path, e.to_string())),
        }
    }

    fn validate_regex(path: &str, pattern: &str, errors: &mut Vec<ValidationError>) {
        match Regex::new(pattern) {
            Ok(regex) => {
                if regex.captures_len() < 2 {
                    errors.push(ValidationError::new(
                        path,
                        format!("Pattern '{}' needs a capture group", pattern),
                    ));
                }
            }
            Err(e) => errors.push(ValidationError::new(
                path,
                format!("Invalid regex '{}': {}", pattern, e),
            )),
        }
    }

    fn validate_confidence(path: &str, value: f32, errors: &mut Vec<ValidationError>) {
        if !(0.0..=1.0).contains(&value) {
            errors.push(ValidationError::new(
                path,
                format!("Value must be between 0.0 and 1.0, got {}", value),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validation_paths(config: &Config) -> Vec<String> {
        match ConfigValidator::validate(config) {
            Err(TaggrrError::ConfigValidation { errors }) => {
                errors.into_iter().map(|e| e.path).collect()
            }
            _ => Vec::new(),
        }
    }

    #[test]
    fn test_valid_config() {
        let config = Config::default();
        assert!(ConfigValidator::validate(&config).is_ok());
    }

    #[test]
    fn test_empty_tier() {
        let mut config = Config::default();
        config.extraction.medium.clear();
        assert!(validation_paths(&config).contains(&"extraction.medium".to_string()));
    }

    #[test]
    fn test_weights_exceeding_one() {
        let mut config = Config::default();
        config.scoring.folder_weight = 0.7;
        config.scoring.file_weight = 0.5;
        assert!(validation_paths(&config).contains(&"scoring".to_string()));
    }

    #[test]
    fn test_regex_without_capture_group() {
        let mut config = Config::default();
        config.extraction.strong[0].pattern = r"FC2-PPV-\d+".to_string();
        assert!(validation_paths(&config).contains(&"extraction.strong[0].pattern".to_string()));
    }

    #[test]
    fn test_malformed_template() {
        let mut config = Config::default();
        config.output.folder_format = "{title ({year})".to_string();
        assert!(validation_paths(&config).contains(&"output.folder_format".to_string()));
    }

    #[test]
    fn test_unknown_placeholder() {
        let mut config = Config::default();
        config.output.folder_format = "{title} - {studio}".to_string();
        assert!(validation_paths(&config).contains(&"output.folder_format".to_string()));
    }

    #[test]
    fn test_file_format_without_part() {
        let mut config = Config::default();
        config.output.file_format = "{title} ({year})".to_string();
        assert!(validation_paths(&config).contains(&"output.file_format".to_string()));
    }

    #[test]
    fn test_inverted_thresholds() {
        let mut config = Config::default();
        config.thresholds.skip = 90.0;
        assert!(validation_paths(&config).contains(&"thresholds".to_string()));
    }

    #[test]
    fn test_unknown_preferred_source() {
        let mut config = Config::default();
        config.scoring.preferred_source = Some("mgs".to_string());
        assert!(validation_paths(&config).contains(&"scoring.preferred_source".to_string()));
    }

    #[test]
    fn test_all_errors_reported_together() {
        let mut config = Config::default();
        config.meta.schema_version = "0.1".to_string();
        config.parts.max_parts = 0;
        config.output.replacement = "/".to_string();
        assert_eq!(validation_paths(&config).len(), 3);
    }
}
