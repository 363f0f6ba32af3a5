use anyhow::{Context, Result};
use clap::Parser;
use cst_mutator::{MutatorConfig, RandomSource};
use rayon::prelude::*;
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod run;
use crate::run::{discover, process_file, render_diff, Report};

#[derive(Parser, Debug)]
#[command(about = "Apply single-site mutations to Python source files")]
struct Args {
    /// Python files or directories to mutate
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
    /// Directory receiving the mutated files
    #[arg(short, long)]
    out: PathBuf,

    /// Path to .toml configuration for the mutator
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Base seed; file `i` is mutated with `seed + i`
    #[arg(short, long, value_parser = clap::value_parser!(u64).range(..=i64::MAX as u64))]
    seed: Option<u64>,
    /// Transformations per file, overriding the configuration
    #[arg(short, long)]
    transformations: Option<usize>,
    /// Print a colored diff for each file
    #[arg(short, long)]
    diff: bool,
    /// Write a TOML report of every transformation
    #[arg(short, long, value_name = "FILE")]
    report: Option<PathBuf>,
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Args::parse();

    // parse config or take default
    let mut config = match cli.config {
        Some(ref path) => MutatorConfig::load(path)
            .with_context(|| format!("loading configuration {}", path.display()))?,
        None => MutatorConfig::default(),
    };
    if let Some(seed) = cli.seed {
        config.seed = Some(seed);
    }
    if let Some(n) = cli.transformations {
        config.engine.transformations = n;
    }
    config.validate()?;

    // Kept within TOML's integer range so the logged seed can go in a config.
    let base_seed = config
        .seed
        .unwrap_or_else(|| RandomSource::from_entropy().next_seed() >> 1);
    info!(base_seed, "starting");

    let jobs = discover(&cli.inputs)?;
    fs::create_dir_all(&cli.out)
        .with_context(|| format!("creating output directory {}", cli.out.display()))?;

    let outcomes: Vec<_> = jobs
        .par_iter()
        .enumerate()
        .map(|(i, job)| {
            let seed = base_seed.wrapping_add(i as u64);
            process_file(job, &config, seed, &cli.out)
        })
        .collect();

    let mut results = Vec::new();
    let mut failures = 0;
    for outcome in outcomes {
        match outcome {
            Ok(file) => {
                if cli.diff {
                    print!("{}", render_diff(&file.input, &file.original, &file.mutated));
                }
                info!(
                    input = %file.input.display(),
                    output = %file.output.display(),
                    applied = file.results.iter().filter(|r| r.applied).count(),
                    "mutated file"
                );
                results.extend(file.results);
            }
            Err(err) => {
                failures += 1;
                warn!("skipping file: {err:#}");
            }
        }
    }
    info!(files = jobs.len(), failures, "done");

    if let Some(ref path) = cli.report {
        let report = Report {
            base_seed,
            files: jobs.len(),
            failures,
            results,
        };
        fs::write(path, report.to_toml()?)
            .with_context(|| format!("writing report {}", path.display()))?;
    }

    if !jobs.is_empty() && failures == jobs.len() {
        anyhow::bail!("no file could be mutated");
    }
    Ok(())
}
