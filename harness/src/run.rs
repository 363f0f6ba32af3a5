use anyhow::{Context, Result};
use colored::Colorize;
use cst_mutator::{
    default_engine, parse_module, MutatorConfig, RandomSource, TransformationResult,
};
use serde::{Serialize, Serializer};
use similar::{ChangeTag, TextDiff};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A source file to mutate and where its output goes, relative to `--out`.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub input: PathBuf,
    pub relative: PathBuf,
}

/// Result of mutating one file.
pub struct FileResult {
    pub input: PathBuf,
    pub output: PathBuf,
    pub original: String,
    pub mutated: String,
    pub results: Vec<TransformationResult>,
}

/// Written by `--report`.
#[derive(Serialize)]
pub struct Report {
    /// A string, since TOML integers stop at `i64::MAX`.
    #[serde(serialize_with = "as_string")]
    pub base_seed: u64,
    pub files: usize,
    pub failures: usize,
    pub results: Vec<TransformationResult>,
}

impl Report {
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string(self).context("serializing report")
    }
}

fn as_string<S: Serializer>(seed: &u64, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_str(seed)
}

/// Expand the command line inputs into `.py` jobs, in a stable order.
///
/// Files are taken as given; directories are searched recursively. Two jobs
/// that would write the same output file are an error.
pub fn discover(inputs: &[PathBuf]) -> Result<Vec<Job>> {
    let mut jobs = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let mut found = Vec::new();
            walk(input, &mut found)?;
            found.sort();
            for path in found {
                let relative = path.strip_prefix(input).unwrap_or(&path).to_path_buf();
                jobs.push(Job {
                    input: path,
                    relative,
                });
            }
        } else if input.is_file() {
            let relative = input
                .file_name()
                .map(PathBuf::from)
                .with_context(|| format!("{} has no file name", input.display()))?;
            jobs.push(Job {
                input: input.clone(),
                relative,
            });
        } else {
            anyhow::bail!("input {} does not exist", input.display());
        }
    }

    let mut outputs: BTreeMap<&Path, &Path> = BTreeMap::new();
    for job in &jobs {
        if let Some(previous) = outputs.insert(&job.relative, &job.input) {
            anyhow::bail!(
                "{} and {} would both be written to {}",
                previous.display(),
                job.input.display(),
                job.relative.display()
            );
        }
    }
    Ok(jobs)
}

fn walk(dir: &Path, found: &mut Vec<PathBuf>) -> Result<()> {
    let entries =
        fs::read_dir(dir).with_context(|| format!("reading directory {}", dir.display()))?;
    for entry in entries {
        let path = entry?.path();
        if path.is_dir() {
            walk(&path, found)?;
        } else if path.extension().is_some_and(|ext| ext == "py") {
            found.push(path);
        }
    }
    Ok(())
}

/// Mutate one file with a private engine seeded with `seed` and write the
/// result under `out_dir`.
pub fn process_file(
    job: &Job,
    config: &MutatorConfig,
    seed: u64,
    out_dir: &Path,
) -> Result<FileResult> {
    let original = fs::read_to_string(&job.input)
        .with_context(|| format!("reading {}", job.input.display()))?;
    let module =
        parse_module(&original).with_context(|| format!("parsing {}", job.input.display()))?;

    let label = job.input.display().to_string();
    let mut engine = default_engine(config, RandomSource::seeded(seed))?;
    let mutated = engine
        .transform(Some(&label), module)
        .with_context(|| format!("mutating {label}"))?
        .code();
    debug!(file = %label, seed, "mutated");

    let output = out_dir.join(&job.relative);
    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating directory {}", parent.display()))?;
    }
    fs::write(&output, &mutated).with_context(|| format!("writing {}", output.display()))?;

    Ok(FileResult {
        input: job.input.clone(),
        output,
        original,
        mutated,
        results: engine.finished_results().to_vec(),
    })
}

/// Unified-style line diff, inserted lines green and deleted ones red.
pub fn render_diff(path: &Path, original: &str, mutated: &str) -> String {
    let diff = TextDiff::from_lines(original, mutated);
    let mut out = format!("{}\n", format!("--- {}", path.display()).bold());
    for change in diff.iter_all_changes() {
        let line = match change.tag() {
            ChangeTag::Delete => format!("-{change}").red().to_string(),
            ChangeTag::Insert => format!("+{change}").green().to_string(),
            ChangeTag::Equal => format!(" {change}"),
        };
        out.push_str(&line);
    }
    out
}
