//! Command-line interface for skin_scan
//!
//! Analyzes one or more portrait images and prints the JSON reports.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use clap_verbosity_flag::{Verbosity, WarnLevel};
use env_logger::{Builder, Env};
use log::{error, info, warn};

use skin_scan::image_loader::is_supported_extension;
use skin_scan::{load_image, AnalysisError, AnalysisResult, Analyzer, PipelineConfig, Region};

/// Share of each image dimension covered by the center fallback region
const FALLBACK_FRACTION: f64 = 0.6;

#[derive(Parser)]
#[command(name = "skin_scan_cli")]
#[command(about = "Detect faces and grade visible skin blemishes")]
struct Cli {
    /// Image files or directories of images
    #[arg(required_unless_present = "write_default_config")]
    inputs: Vec<PathBuf>,

    /// Pipeline configuration JSON file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Cascade model file, overriding the configuration
    #[arg(long, value_name = "FILE")]
    cascade: Option<PathBuf>,

    /// Write results to this file instead of stdout
    #[arg(long, short, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Analyze the image center when no face is found
    #[arg(long)]
    fallback_center: bool,

    /// Write the default configuration to FILE and exit
    #[arg(long, value_name = "FILE")]
    write_default_config: Option<PathBuf>,

    #[command(flatten)]
    verbosity: Verbosity<WarnLevel>,
}

fn main() {
    let cli = Cli::parse();

    let use_env = !cli.verbosity.is_present() && std::env::var_os("RUST_LOG").is_some();
    let mut logger = if use_env {
        Builder::from_env(Env::default())
    } else {
        let mut b = Builder::new();
        b.filter_level(cli.verbosity.log_level_filter());
        b
    };
    logger
        .format(|buf, record| writeln!(buf, "[{}] {}", record.level(), record.args()))
        .init();

    if let Err(e) = run(&cli) {
        error!("{}", e.user_message());
        process::exit(1);
    }
}

fn run(cli: &Cli) -> skin_scan::Result<()> {
    if let Some(path) = &cli.write_default_config {
        PipelineConfig::default().to_json_file(path)?;
        info!("Wrote default configuration to {}", path.display());
        return Ok(());
    }

    let mut config = match &cli.config {
        Some(path) => PipelineConfig::from_json_file(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(cascade) = &cli.cascade {
        config.localization.cascade_path = Some(cascade.clone());
    }

    let analyzer = Analyzer::with_cascade(config)?;
    let paths = expand_inputs(&cli.inputs);
    if paths.is_empty() {
        return Err(AnalysisError::invalid_parameter("inputs", "no supported images found"));
    }

    let mut results = Vec::with_capacity(paths.len());
    let mut failures = 0usize;
    for path in &paths {
        match analyze_one(&analyzer, path, cli.fallback_center) {
            Ok(result) => results.push(result),
            Err(e) => {
                failures += 1;
                warn!("{}: {}", path.display(), e.user_message());
            }
        }
    }

    let json = if results.len() == 1 && paths.len() == 1 {
        results[0].to_json_pretty()?
    } else {
        serde_json::to_string_pretty(&results)
            .map_err(|e| AnalysisError::config("Failed to serialize results", e))?
    };

    match &cli.output {
        Some(path) => {
            fs::write(path, json).map_err(|e| AnalysisError::Io {
                message: format!("Failed to write {}", path.display()),
                source: e,
            })?;
            info!("Results written to {}", path.display());
        }
        None => println!("{}", json),
    }

    info!("Analyzed {} of {} image(s)", results.len(), paths.len());
    if failures > 0 && results.is_empty() {
        return Err(AnalysisError::invalid_parameter(
            "inputs",
            format!("all {} image(s) failed", failures),
        ));
    }
    Ok(())
}

fn analyze_one(analyzer: &Analyzer, path: &Path, fallback_center: bool) -> skin_scan::Result<AnalysisResult> {
    let config = analyzer.config();
    let image = load_image(path, config.preprocessing.exif_correction)?;
    let prepared = analyzer.prepare(&image)?;
    let source_id = path.display().to_string();

    match analyzer.analyze(&prepared, &source_id) {
        Err(AnalysisError::NoFaceDetected { width, height }) if fallback_center => {
            info!("{}: no face detected, analyzing image center", source_id);
            let region = Region::centered(width, height, FALLBACK_FRACTION)?;
            analyzer
                .analyze_regions(&prepared, &[region], &source_id)
                .map(|detailed| detailed.result)
        }
        other => other,
    }
}

/// Expand directories to the supported image files they contain
fn expand_inputs(inputs: &[PathBuf]) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let entries = match fs::read_dir(input) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!("Cannot read directory {}: {}", input.display(), e);
                    continue;
                }
            };
            let mut found: Vec<PathBuf> = entries
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| {
                    p.is_file()
                        && p.extension()
                            .and_then(|ext| ext.to_str())
                            .is_some_and(is_supported_extension)
                })
                .collect();
            found.sort();
            paths.extend(found);
        } else {
            paths.push(input.clone());
        }
    }
    paths
}
