use std::path::PathBuf;
use std::sync::Arc;

use taggrr::cli::{Cli, Commands, ConfigAction};
use taggrr::config::{Config, ConfigValidator};
use taggrr::duplicates::DuplicateDetector;
use taggrr::error::{Result, TaggrrError};
use taggrr::extraction::PatternExtractor;
use taggrr::grouping::split_extension;
use taggrr::patterns::PatternRegistry;
use taggrr::pipeline::{GroupStatus, IdentifierLookup, Organizer, RunSummary};
use taggrr::planning::ReviewOverride;
use taggrr::scanner::Scanner;

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse_args();

    // Initialize logging
    init_logging(cli.verbose);

    // Handle commands
    match cli.command {
        Commands::Plan {
            dirs,
            json,
            limit,
            approve,
            jobs,
        } => {
            cmd_plan(cli.config, &dirs, json, limit, approve, jobs)?;
        }
        Commands::Analyze { name, json } => {
            cmd_analyze(cli.config, &name, json)?;
        }
        Commands::Duplicates { left, right, json } => {
            cmd_duplicates(cli.config, &left, &right, json)?;
        }
        Commands::Config { action } => {
            cmd_config(cli.config, action)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_filter = if verbose { "taggrr=debug" } else { "taggrr=info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_plan(
    config_path: Option<PathBuf>,
    dirs: &[PathBuf],
    json: bool,
    limit: Option<usize>,
    approve: bool,
    jobs: usize,
) -> Result<()> {
    let config = load_config(config_path)?;

    let scanner = Scanner::new(&config.scan);
    let files = scanner.scan_all(dirs)?;
    tracing::info!("Discovered {} video files", files.len());

    // Metadata comes from the identifiers themselves; network lookups are external
    let mut organizer = Organizer::new(&config, IdentifierLookup)?;
    if approve {
        organizer = organizer.with_review(ReviewOverride::Approve);
    }

    let summary = if jobs > 1 {
        organizer.run_parallel(files, jobs)
    } else {
        organizer.run(files)
    };

    if json {
        println!("{}", summary.to_json()?);
    } else {
        print_summary(&summary, limit);
    }

    Ok(())
}

fn print_summary(summary: &RunSummary, limit: Option<usize>) {
    let shown = limit.unwrap_or(summary.outcomes.len());

    for outcome in summary.outcomes.iter().take(shown) {
        let confidence = outcome
            .overall_confidence
            .map(|c| format!("{:.0}%", c * 100.0))
            .unwrap_or_else(|| "-".to_string());

        match &outcome.status {
            GroupStatus::Planned { plan, reviewed } => {
                let marker = if *reviewed { "✓ (reviewed)" } else { "✓" };
                println!("{} {}", marker, plan.summary());
                for mapping in &plan.file_mappings {
                    println!(
                        "    {} -> {}",
                        mapping.file.file_name,
                        plan.target_path(mapping).display()
                    );
                }
                for (kind, path) in &plan.shared_assets {
                    println!("    [{:?}] {}", kind, path.display());
                }
            }
            GroupStatus::Deferred { percent } => {
                println!(
                    "? {} ({:.0}%) needs manual review, rerun with --approve to accept",
                    outcome.name, percent
                );
            }
            GroupStatus::Skipped { reason } => {
                println!("✗ {} ({}) skipped: {:?}", outcome.name, confidence, reason);
            }
        }
    }

    if shown < summary.outcomes.len() {
        println!("... {} more group(s)", summary.outcomes.len() - shown);
    }

    for anomaly in &summary.anomalies {
        println!("! {:?}", anomaly);
    }

    let counts = &summary.counts;
    println!();
    println!("Run {}", summary.run_id);
    println!("  Groups: {} ({} files)", counts.groups, counts.files);
    println!(
        "  Planned: {}  Reviewed: {}  Deferred: {}  Skipped: {}",
        counts.planned, counts.reviewed, counts.deferred, counts.skipped
    );
}

fn cmd_duplicates(
    config_path: Option<PathBuf>,
    left: &std::path::Path,
    right: &std::path::Path,
    json: bool,
) -> Result<()> {
    let config = load_config(config_path)?;
    let scanner = Scanner::new(&config.scan);
    let left_files = scanner.scan(left)?;
    let right_files = scanner.scan(right)?;

    let extractor = PatternExtractor::new(Arc::new(PatternRegistry::from_config(&config)?));
    let report = DuplicateDetector::new(extractor, &config.duplicates)
        .compare(&left_files, &right_files);

    if json {
        let text = serde_json::to_string_pretty(&report).map_err(|e| TaggrrError::Json {
            source: e,
            context: "Failed to serialize duplicate report".to_string(),
        })?;
        println!("{}", text);
        return Ok(());
    }

    for group in &report.groups {
        println!(
            "{} ({:.0}%, {})",
            group.identifier,
            group.confidence * 100.0,
            group.source.as_deref().unwrap_or("generic")
        );
        for path in &group.left {
            println!("  < {}", path.display());
        }
        for path in &group.right {
            println!("  > {}", path.display());
        }
    }

    println!();
    println!(
        "Duplicates: {} group(s), {} file(s)",
        report.groups.len(),
        report.matched_files()
    );
    println!(
        "Unmatched: {} left, {} right",
        report.unmatched_left.len(),
        report.unmatched_right.len()
    );
    Ok(())
}

fn cmd_analyze(config_path: Option<PathBuf>, name: &str, json: bool) -> Result<()> {
    let config = load_config(config_path)?;
    let extractor = PatternExtractor::new(Arc::new(PatternRegistry::from_config(&config)?));

    let analysis = extractor.analyze(name);
    let part = extractor.detect_part(split_extension(name).0);

    if json {
        let value = serde_json::json!({
            "analysis": analysis,
            "part": part.as_ref().map(|p| serde_json::json!({
                "part_number": p.part_number,
                "label": p.label,
                "stripped": p.stripped,
            })),
        });
        let text = serde_json::to_string_pretty(&value).map_err(|e| TaggrrError::Json {
            source: e,
            context: "Failed to serialize analysis".to_string(),
        })?;
        println!("{}", text);
        return Ok(());
    }

    println!("Name: {}", analysis.name);
    if analysis.extractions.is_empty() {
        println!("  Identifiers: none");
    }
    for result in &analysis.extractions {
        println!(
            "  [{}] {} (confidence {:.2}, pattern {}, source {})",
            result.tier.as_str(),
            result.identifier,
            result.confidence,
            result.pattern,
            result.source.as_deref().unwrap_or("-")
        );
    }
    match analysis.year {
        Some(year) => println!("  Year: {}", year),
        None => println!("  Year: -"),
    }
    for hint in &analysis.source_hints {
        println!(
            "  Source hint: {} (+{:.2}, {:?} patterns)",
            hint.source, hint.confidence_boost, hint.pattern_set
        );
    }
    if let Some(part) = part {
        println!("  Part: {} -> \"{}\"", part.label, part.stripped);
    }

    Ok(())
}

fn cmd_config(config_path: Option<PathBuf>, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = load_config(config_path)?;
            let json = serde_json::to_string_pretty(&config).map_err(|e| TaggrrError::Json {
                source: e,
                context: "Failed to serialize config".to_string(),
            })?;
            println!("{}", json);
        }
        ConfigAction::Validate { file } => {
            let path = match file.or(config_path) {
                Some(path) => path,
                None => Config::default_path()?,
            };
            match Config::load(&path) {
                Ok(config) => {
                    println!("✓ Configuration is valid");
                    println!("  Schema version: {}", config.meta.schema_version);
                }
                Err(TaggrrError::ConfigValidation { errors }) => {
                    println!("✗ Configuration has {} problem(s):", errors.len());
                    for error in &errors {
                        println!("  - {}", error);
                    }
                    return Err(TaggrrError::ConfigValidation { errors });
                }
                Err(e) => return Err(e),
            }
        }
        ConfigAction::Init { force } => {
            let path = match config_path {
                Some(path) => path,
                None => Config::default_path()?,
            };

            if path.exists() && !force {
                println!("Configuration file already exists at: {}", path.display());
                println!("Use --force to overwrite");
                return Ok(());
            }

            // Create parent directory
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| TaggrrError::Io {
                    source: e,
                    context: format!("Failed to create config directory: {:?}", parent),
                })?;
            }

            Config::default().save(&path)?;
            println!("✓ Configuration initialized at: {}", path.display());
        }
    }

    Ok(())
}

fn load_config(config_path: Option<PathBuf>) -> Result<Config> {
    let path = match config_path {
        Some(path) => path,
        None => Config::default_path()?,
    };

    if !path.exists() {
        tracing::warn!(
            "Config file not found, using defaults. Run 'taggrr config init' to create one."
        );
        let mut config = Config::default();
        config.apply_env_overrides();
        ConfigValidator::validate(&config)?;
        return Ok(config);
    }

    Config::load(&path)
}
