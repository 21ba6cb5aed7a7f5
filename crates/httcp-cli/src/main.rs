//! httcp CLI

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use httcp_config::{Analysis, Config, presets};
use httcp_selection::{ChannelSelector, Cutflow, EventChunk, SelectionResult};
use rayon::prelude::*;

#[derive(Parser)]
#[command(name = "httcp")]
#[command(about = "httcp - H→ττ CP analysis configuration and selection helpers")]
#[command(version)]
struct Cli {
    /// Log verbosity level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: tracing::Level,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect analysis configurations
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Run a channel selection over event chunks
    Select {
        /// Event chunk files (JSON)
        #[arg(long, required = true, num_args = 1..)]
        chunk: Vec<PathBuf>,

        /// Channel to select (etau, mutau, tautau)
        #[arg(long)]
        channel: String,

        /// Analysis file (YAML or JSON). Defaults to the built-in preset.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Config name. Defaults to the first config of the analysis.
        #[arg(long)]
        name: Option<String>,

        /// Output file for results (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Threads (0 = auto).
        #[arg(long, default_value = "0")]
        threads: usize,
    },

    /// Cutflow artifact (plot-friendly JSON)
    Cutflow {
        /// Event chunk files (JSON), counted as one series
        #[arg(long, required = true, num_args = 1..)]
        chunk: Vec<PathBuf>,

        /// Channel to select (etau, mutau, tautau)
        #[arg(long)]
        channel: String,

        /// Analysis file (YAML or JSON). Defaults to the built-in preset.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Config name. Defaults to the first config of the analysis.
        #[arg(long)]
        name: Option<String>,

        /// Series label. Defaults to the config name.
        #[arg(long)]
        series: Option<String>,

        /// Output file for results (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Threads (0 = auto).
        #[arg(long, default_value = "0")]
        threads: usize,
    },

    /// Print version information
    Version,
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the resolved analysis, or one config with `--name`
    Show {
        /// Analysis file (YAML or JSON). Defaults to the built-in preset.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Config name
        #[arg(long)]
        name: Option<String>,

        /// Output file (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Columns kept by a task family, resolved for the campaign's NanoAOD version
    Columns {
        /// Analysis file (YAML or JSON). Defaults to the built-in preset.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Config name
        #[arg(long)]
        name: String,

        /// Task family
        #[arg(long, default_value = "cf.ReduceEvents")]
        task: String,

        /// Output file (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Local files of a dataset (privately produced campaigns only)
    Lfns {
        /// Analysis file (YAML or JSON). Defaults to the built-in preset.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Config name
        #[arg(long)]
        name: String,

        /// Dataset name
        #[arg(long)]
        dataset: String,

        /// Output file (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Config { command } => match command {
            ConfigCommands::Show { config, name, output } => {
                cmd_config_show(config.as_deref(), name.as_deref(), output.as_deref())
            }
            ConfigCommands::Columns { config, name, task, output } => {
                cmd_config_columns(config.as_deref(), &name, &task, output.as_deref())
            }
            ConfigCommands::Lfns { config, name, dataset, output } => {
                cmd_config_lfns(config.as_deref(), &name, &dataset, output.as_deref())
            }
        },
        Commands::Select { chunk, channel, config, name, output, threads } => cmd_select(
            &chunk,
            &channel,
            config.as_deref(),
            name.as_deref(),
            output.as_deref(),
            threads,
        ),
        Commands::Cutflow { chunk, channel, config, name, series, output, threads } => {
            cmd_cutflow(
                &chunk,
                &channel,
                config.as_deref(),
                name.as_deref(),
                series.as_deref(),
                output.as_deref(),
                threads,
            )
        }
        Commands::Version => {
            println!("httcp {}", httcp_core::VERSION);
            Ok(())
        }
    }
}

fn load_analysis(path: Option<&Path>) -> Result<Analysis> {
    match path {
        Some(p) => Analysis::from_path(p)
            .with_context(|| format!("failed to load analysis from {}", p.display())),
        None => {
            tracing::info!("using built-in analysis preset");
            presets::analysis_httcp().context("built-in analysis preset is invalid")
        }
    }
}

fn select_config<'a>(analysis: &'a Analysis, name: Option<&str>) -> Result<&'a Config> {
    match name {
        Some(n) => Ok(analysis.config(n)?),
        None => analysis
            .configs
            .first()
            .with_context(|| format!("analysis '{}' has no configs", analysis.name)),
    }
}

fn cmd_config_show(path: Option<&Path>, name: Option<&str>, output: Option<&Path>) -> Result<()> {
    let analysis = load_analysis(path)?;
    let value = match name {
        Some(n) => serde_json::to_value(analysis.config(n)?)?,
        None => serde_json::to_value(&analysis)?,
    };
    write_json(output, value)
}

fn cmd_config_columns(
    path: Option<&Path>,
    name: &str,
    task: &str,
    output: Option<&Path>,
) -> Result<()> {
    let analysis = load_analysis(path)?;
    let config = analysis.config(name)?;
    let columns = config.keep_columns_for(task);
    tracing::info!(config = %config.name, task, n_columns = columns.len(), "columns resolved");
    write_json(
        output,
        serde_json::json!({
            "config": config.name,
            "task": task,
            "nano_version": config.campaign.nano_version,
            "columns": columns,
        }),
    )
}

fn cmd_config_lfns(
    path: Option<&Path>,
    name: &str,
    dataset: &str,
    output: Option<&Path>,
) -> Result<()> {
    let analysis = load_analysis(path)?;
    let config = analysis.config(name)?;
    let ds = config
        .dataset(dataset)
        .with_context(|| format!("config '{}' has no dataset '{dataset}'", config.name))?;
    let files = config.dataset_lfns(ds)?;
    write_json(
        output,
        serde_json::json!({
            "config": config.name,
            "dataset": ds.name,
            "files": files,
        }),
    )
}

fn setup_threads(threads: usize) {
    if threads > 0 {
        // Best-effort; if a global pool already exists, keep going.
        let _ = rayon::ThreadPoolBuilder::new().num_threads(threads).build_global();
    }
}

/// Select every chunk in parallel; results keep the order of `paths`.
fn run_selection(
    selector: &ChannelSelector,
    paths: &[PathBuf],
    threads: usize,
) -> Result<Vec<SelectionResult>> {
    setup_threads(threads);
    tracing::info!(
        channel = selector.channel(),
        chunks = paths.len(),
        threads = rayon::current_num_threads(),
        "running selection"
    );
    paths
        .par_iter()
        .map(|p| {
            let chunk = EventChunk::from_path(p)
                .with_context(|| format!("failed to read chunk {}", p.display()))?;
            selector
                .select(&chunk)
                .with_context(|| format!("selection failed on chunk {}", p.display()))
        })
        .collect()
}

fn merge_cutflows(results: &[SelectionResult]) -> Result<Option<Cutflow>> {
    let mut iter = results.iter();
    let Some(first) = iter.next() else { return Ok(None) };
    let mut total = first.cutflow.clone();
    for r in iter {
        total.merge(&r.cutflow)?;
    }
    Ok(Some(total))
}

fn cmd_select(
    chunks: &[PathBuf],
    channel: &str,
    path: Option<&Path>,
    name: Option<&str>,
    output: Option<&Path>,
    threads: usize,
) -> Result<()> {
    let analysis = load_analysis(path)?;
    let config = select_config(&analysis, name)?;
    let selector = ChannelSelector::from_config(config, channel)?;
    let results = run_selection(&selector, chunks, threads)?;
    let cutflow = merge_cutflows(&results)?;

    let per_chunk: Vec<serde_json::Value> = chunks
        .iter()
        .zip(&results)
        .map(|(p, r)| {
            serde_json::json!({
                "path": p.display().to_string(),
                "n_events": r.n_events,
                "steps": r.steps,
                "columns": r.columns,
                "cutflow": r.cutflow,
            })
        })
        .collect();

    write_json(
        output,
        serde_json::json!({
            "config": config.name,
            "channel": selector.channel(),
            "channel_id": selector.channel_id(),
            "chunks": per_chunk,
            "cutflow": cutflow,
        }),
    )
}

fn cmd_cutflow(
    chunks: &[PathBuf],
    channel: &str,
    path: Option<&Path>,
    name: Option<&str>,
    series: Option<&str>,
    output: Option<&Path>,
    threads: usize,
) -> Result<()> {
    let analysis = load_analysis(path)?;
    let config = select_config(&analysis, name)?;
    let selector = ChannelSelector::from_config(config, channel)?;
    let results = run_selection(&selector, chunks, threads)?;
    let cutflow = merge_cutflows(&results)?.context("no chunks given")?;

    let label = series.unwrap_or(config.name.as_str()).to_string();
    let artifact = httcp_viz::cutflow_artifact(Some(selector.channel()), &[(label, cutflow)])?;
    write_json(output, serde_json::to_value(artifact)?)
}

fn write_json(output: Option<&Path>, value: serde_json::Value) -> Result<()> {
    if let Some(path) = output {
        std::fs::write(path, serde_json::to_string_pretty(&value)?)?;
    } else {
        println!("{}", serde_json::to_string_pretty(&value)?);
    }
    Ok(())
}
