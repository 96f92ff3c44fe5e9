use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::PathBuf;

use edna_biodiversity::export::{JsonRenderer, ReportRenderer, TextRenderer, TsvRenderer};
use edna_biodiversity::ingest::read_abundance_table;
use edna_biodiversity::taxdb::{parse_reference_db, EmptyReference, ReferenceDb};
use edna_biodiversity::{analyze_with, AnalysisConfig, AnalysisError, SampleMetadata};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute diversity metrics and classify taxa for one sample
    Analyze {
        /// Abundance table (TSV, optionally .gz)
        table: PathBuf,

        /// Reference database (TSV). Without it every taxon is reported as novel.
        #[arg(short, long)]
        reference: Option<PathBuf>,

        /// Sample identifier (defaults to the table's file stem)
        #[arg(long)]
        sample_id: Option<String>,

        #[arg(long)]
        location: Option<String>,

        /// Sampling depth in metres
        #[arg(long)]
        depth: Option<f64>,

        /// Water temperature in °C
        #[arg(long)]
        temperature: Option<f64>,

        #[arg(long)]
        notes: Option<String>,

        /// TOML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        #[arg(short, long, value_enum, default_value_t = Format::Text)]
        format: Format,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the default configuration as TOML
    DefaultConfig,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Tsv,
    Json,
}

fn spinner(colour: &str, msg: &'static str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner()
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
        .template(&format!("{{spinner:.{colour}}} {{msg}}"))
    {
        spinner.set_style(style);
    }
    spinner.set_message(msg);
    spinner
}

#[allow(clippy::too_many_arguments)]
fn run_analyze(
    table_path: PathBuf,
    reference: Option<PathBuf>,
    sample_id: Option<String>,
    metadata: SampleMetadata,
    config_path: Option<PathBuf>,
    format: Format,
    output: Option<PathBuf>,
) -> Result<(), AnalysisError> {
    let config = match config_path {
        Some(path) => AnalysisConfig::load(path)?,
        None => AnalysisConfig::default(),
    };

    let sample_id = sample_id.unwrap_or_else(|| {
        table_path
            .file_name()
            .map(|n| n.to_string_lossy())
            .and_then(|n| n.split('.').next().map(str::to_string))
            .unwrap_or_else(|| "sample".to_string())
    });

    // 1. Load inputs
    let pb = spinner("blue", "Loading abundance table and reference...");
    let table = read_abundance_table(&table_path, &sample_id)?;
    let reference: Option<ReferenceDb> = reference.map(parse_reference_db).transpose()?;
    pb.finish_with_message(format!("Loaded {} taxa.", table.len()));

    // 2. Analyse
    let pb = spinner("green", "Computing diversity and classifying taxa...");
    let report = match &reference {
        Some(db) => analyze_with(&table, metadata, db, &config)?,
        None => {
            log::warn!("No reference database given; all taxa will be reported as novel");
            analyze_with(&table, metadata, &EmptyReference, &config)?
        }
    };
    pb.finish_with_message("Analysis finished.");

    // 3. Render
    let renderer: Box<dyn ReportRenderer> = match format {
        Format::Text => Box::new(TextRenderer::new(config.report.clone())),
        Format::Tsv => Box::new(TsvRenderer),
        Format::Json => Box::new(JsonRenderer { pretty: true }),
    };
    let rendered = renderer.render(&report)?;

    match output {
        Some(path) => {
            let pb = spinner("yellow", "Writing report...");
            fs::write(&path, rendered).map_err(|e| AnalysisError::Io { path: path.clone(), source: e })?;
            pb.finish_with_message(format!("Report written to {}", path.display()));
        }
        None => print!("{rendered}"),
    }
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();

    let result = match args.command {
        Commands::Analyze {
            table,
            reference,
            sample_id,
            location,
            depth,
            temperature,
            notes,
            config,
            format,
            output,
        } => run_analyze(
            table,
            reference,
            sample_id,
            SampleMetadata {
                location,
                depth,
                temperature,
                notes,
            },
            config,
            format,
            output,
        ),
        Commands::DefaultConfig => AnalysisConfig::default()
            .to_toml_string()
            .map(|text| print!("{text}")),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
