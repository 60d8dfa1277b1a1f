//! Command-line interface for training and scoring

use clap::{Parser, Subcommand};
use colored::*;
use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use crate::data;
use crate::pipeline::{DirectorySink, Pipeline};
use crate::serving::ScoringService;
use crate::training::{Objective, TrainerConfig};

fn muted(s: &str) -> ColoredString {
    s.truecolor(140, 140, 140)
}

fn ok(s: &str) -> ColoredString {
    s.truecolor(100, 210, 120)
}

#[derive(Parser)]
#[command(name = "boostflow")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Gradient-boosted tabular classification pipeline")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Train a classifier and persist run artifacts
    Train {
        /// Input data file (CSV, JSON, or Parquet)
        #[arg(short, long)]
        data: PathBuf,

        /// Label column name
        #[arg(short, long)]
        target: String,

        /// Objective: binary or multiclass (overrides the params file)
        #[arg(long)]
        objective: Option<String>,

        /// JSON file with hyperparameter overrides
        #[arg(long)]
        params: Option<PathBuf>,

        /// Directory for run artifacts
        #[arg(short, long, default_value = "outputs")]
        output: PathBuf,
    },

    /// Score rows from a JSON request file against persisted artifacts
    Score {
        /// Artifact directory written by `train`
        #[arg(short, long)]
        model_dir: PathBuf,

        /// JSON request file: {"data": [{feature: value, ...}, ...]}
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Show dataset information
    Info {
        /// Input data file
        #[arg(short, long)]
        data: PathBuf,
    },
}

pub fn cmd_train(
    data_path: &PathBuf,
    target: &str,
    objective: Option<&str>,
    params: Option<&PathBuf>,
    output: &PathBuf,
) -> anyhow::Result<()> {
    let mut config = match params {
        Some(path) => serde_json::from_str::<TrainerConfig>(&fs::read_to_string(path)?)?,
        None => TrainerConfig::default(),
    };
    if let Some(objective) = objective {
        config.objective = match objective {
            "binary" => Objective::Binary,
            "multiclass" => Objective::Multiclass,
            other => anyhow::bail!("invalid objective: {}", other),
        };
    }

    let start = Instant::now();
    let pipeline = Pipeline::new(config);
    let mut sink = DirectorySink::new(output.clone());
    let run = pipeline.run(data_path, target, &mut sink)?;

    println!();
    for (name, value) in run.metrics.iter() {
        println!("  {:<24} {:.4}", muted(name), value);
    }
    println!();
    println!(
        "  {} best iteration {} · {} classes · {:.2?}",
        ok("done"),
        run.model.best_iteration,
        run.encoding.num_classes(),
        start.elapsed()
    );
    println!("  {} {}", muted("artifacts"), output.display());
    println!();

    Ok(())
}

pub fn cmd_score(model_dir: &PathBuf, input: &PathBuf) -> anyhow::Result<()> {
    let service = ScoringService::load(model_dir)?;
    let raw = fs::read_to_string(input)?;
    println!("{}", service.score_json(&raw));
    Ok(())
}

pub fn cmd_info(data_path: &PathBuf) -> anyhow::Result<()> {
    let df = data::load_dataframe(data_path)?;

    println!();
    println!("  {:<12} {}", muted("File"), data_path.display());
    println!("  {:<12} {}", muted("Rows"), df.height());
    println!("  {:<12} {}", muted("Columns"), df.width());
    println!();

    println!(
        "  {:<20} {:<12} {:>6} {:>8}",
        muted("Column"),
        muted("Type"),
        muted("Nulls"),
        muted("Unique")
    );
    for col in df.get_columns() {
        println!(
            "  {:<20} {:<12} {:>6} {:>8}",
            col.name(),
            format!("{:?}", col.dtype()),
            col.null_count(),
            col.n_unique().unwrap_or(0)
        );
    }
    println!();

    Ok(())
}
