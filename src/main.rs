use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};

use superstore_dashboard::data::loader;
use superstore_dashboard::{report, FilterSpec, PipelineController, PipelineOptions};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "superstore-dashboard")]
#[command(about = "Sales, profit and performance metrics for a Superstore-style dataset")]
struct Args {
    /// Sales data (.csv, .json or .parquet)
    input: PathBuf,

    /// State to include (repeatable). All states when omitted.
    #[arg(long = "state", value_name = "STATE")]
    states: Vec<String>,

    /// Category to include (repeatable). All categories when omitted.
    #[arg(long = "category", value_name = "CATEGORY")]
    categories: Vec<String>,

    /// Region to show. Defaults to the first region in the data.
    #[arg(long)]
    region: Option<String>,

    /// Read the whole selection from a JSON file instead.
    #[arg(long, conflicts_with_all = ["states", "categories", "region"])]
    filter: Option<PathBuf>,

    /// JSON file with pipeline options (e.g. {"top_n": 10}).
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let options = match &args.config {
        Some(path) => PipelineOptions::from_json_file(path)?,
        None => PipelineOptions::default(),
    };

    let dataset = loader::load_file(&args.input)
        .with_context(|| format!("loading {}", args.input.display()))?;
    log::info!("{} rows loaded from {}", dataset.len(), args.input.display());

    let spec = match &args.filter {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading filter {}", path.display()))?;
            serde_json::from_str::<FilterSpec>(&text)
                .with_context(|| format!("parsing filter {}", path.display()))?
        }
        None => {
            let region = match args.region {
                Some(r) => r,
                None => match FilterSpec::select_all(&dataset) {
                    Some(default) => default.region,
                    None => {
                        log::warn!("dataset is empty; nothing to report");
                        String::new()
                    }
                },
            };
            let mut spec = FilterSpec::for_region(region);
            if !args.states.is_empty() {
                spec = spec.with_states(args.states);
            }
            if !args.categories.is_empty() {
                spec = spec.with_categories(args.categories);
            }
            spec
        }
    };

    let bundle = PipelineController::new(options)
        .run(&dataset, &spec)
        .context("computing dashboard")?;

    match args.format {
        OutputFormat::Text => print!("{}", report::render_text(&bundle)?),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&bundle)?),
    }
    Ok(())
}
