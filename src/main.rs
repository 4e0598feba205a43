use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use lapcoach::{
    AnalyzerConfig, LapCoachError, RaceAnalysisResult, analyze_with_config, telemetry,
};
use log::{error, info};
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(ValueEnum, Clone, Copy, Debug, Default)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Analyze a telemetry file (.jsonl, or a .json array of samples)
    Analyze {
        #[arg(short, long)]
        input: PathBuf,

        /// Calibration file, defaults to the one in the user's config directory
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Analyze every lap in the file separately
        #[arg(short, long, default_value_t = false)]
        split_laps: bool,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Print the effective calibration as JSON
    Config {
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Write to this file instead of printing
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Store it as the user's default calibration
        #[arg(long, default_value_t = false)]
        save: bool,
    },
}

#[derive(Serialize, Debug)]
struct LapReport {
    lap: usize,
    samples: usize,
    analysis: RaceAnalysisResult,
}

fn load_config(path: Option<&PathBuf>) -> Result<AnalyzerConfig, LapCoachError> {
    match path {
        Some(path) => AnalyzerConfig::from_file(path),
        None => Ok(AnalyzerConfig::from_local_file()?.unwrap_or_default()),
    }
}

fn print_text(report: &LapReport) {
    let analysis = &report.analysis;
    println!(
        "Lap {} ({} samples): {} ({:.0}% confidence)",
        report.lap,
        report.samples,
        analysis.car_class,
        analysis.confidence * 100.
    );
    println!("  Score: {}/100, style: {}", analysis.score, analysis.style);
    println!(
        "  Reaction {:.2} s | Brake consistency {:.2} s | Micro-corrections {:.1}/s | Throttle jerk {:.1}",
        analysis.metrics.reaction_time,
        analysis.metrics.brake_consistency,
        analysis.metrics.micro_corrections,
        analysis.metrics.throttle_jerk
    );
    for highlight in &analysis.highlights {
        println!("  + {}", highlight);
    }
    for warning in &analysis.warnings {
        println!("  ! {}", warning);
    }
    for tip in &analysis.tips {
        println!("  > {}", tip);
    }
}

fn analyze(
    input: &PathBuf,
    config: Option<&PathBuf>,
    split_laps: bool,
    format: OutputFormat,
) -> Result<(), LapCoachError> {
    let config = load_config(config)?;
    let samples = telemetry::load_samples(input)?;

    let laps = if split_laps {
        telemetry::split_laps(&samples)
    } else {
        vec![samples]
    };
    info!("Analyzing {} lap(s) from {:?}", laps.len(), input);

    let reports: Vec<LapReport> = laps
        .iter()
        .enumerate()
        .map(|(i, lap)| LapReport {
            lap: i + 1,
            samples: lap.len(),
            analysis: analyze_with_config(lap, &config),
        })
        .collect();

    match format {
        OutputFormat::Text => reports.iter().for_each(print_text),
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&reports)
                .map_err(|e| LapCoachError::ReportSerializeError { source: e })?;
            println!("{}", json);
        }
    }
    Ok(())
}

fn config(
    config: Option<&PathBuf>,
    output: Option<&PathBuf>,
    save: bool,
) -> Result<(), LapCoachError> {
    let config = load_config(config)?;
    if save {
        config.save_local()?;
        info!("Saved calibration to {:?}", AnalyzerConfig::local_file_path());
    }
    match output {
        Some(path) => config.save(path),
        None => {
            let json = serde_json::to_string_pretty(&config)
                .map_err(|e| LapCoachError::ConfigSerializeError { source: e })?;
            println!("{}", json);
            Ok(())
        }
    }
}

fn main() {
    colog::init();

    let cli = Args::parse();
    let result = match &cli.command {
        Commands::Analyze {
            input,
            config,
            split_laps,
            format,
        } => analyze(input, config.as_ref(), *split_laps, *format),
        Commands::Config {
            config: config_file,
            output,
            save,
        } => config(config_file.as_ref(), output.as_ref(), *save),
    };

    if let Err(e) = result {
        error!("{}", e);
        std::process::exit(1);
    }
}
