//! MarketGraph CLI: run the pipeline and manage the cached model.
//!
//! Commands:
//! - `run`: fetch quotes, fit or load the model, write scene artifacts
//! - `universe`: list the symbols in canonical order
//! - `model status`: report the cached model at the configured path
//! - `model clear`: delete the cached model

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::info;

use marketgraph_core::analysis::ModelStore;
use marketgraph_core::data::{AlphaVantageProvider, DataProvider, SyntheticProvider};
use marketgraph_runner::{
    cluster_report, run_pipeline, save_artifacts, FileModelStore, PipelineConfig, PipelineResult,
};

#[derive(Parser)]
#[command(
    name = "marketgraph",
    about = "MarketGraph CLI: visualize the correlation structure of a stock basket"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline and write scene.json, edges.csv, clusters.txt and result.svg.
    Run {
        /// Path to a TOML config file. Defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Model snapshot path (overrides [model].path).
        #[arg(long)]
        model_path: Option<PathBuf>,

        /// Output directory for artifacts.
        #[arg(long, default_value = "output")]
        output_dir: PathBuf,

        /// Use deterministic synthetic quotes instead of AlphaVantage.
        #[arg(long, default_value_t = false)]
        synthetic: bool,

        /// Delete the cached model before running so it is refitted.
        #[arg(long, default_value_t = false)]
        refit: bool,
    },
    /// List the universe in canonical order.
    Universe {
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Cached model commands.
    Model {
        #[command(subcommand)]
        action: ModelAction,
    },
}

#[derive(Subcommand)]
enum ModelAction {
    /// Report whether a model is cached and what it covers.
    Status {
        #[arg(long)]
        config: Option<PathBuf>,

        #[arg(long)]
        model_path: Option<PathBuf>,
    },
    /// Delete the cached model.
    Clear {
        #[arg(long)]
        config: Option<PathBuf>,

        #[arg(long)]
        model_path: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            model_path,
            output_dir,
            synthetic,
            refit,
        } => run_cmd(config, model_path, output_dir, synthetic, refit),
        Commands::Universe { config } => run_universe(config.as_deref()),
        Commands::Model { action } => match action {
            ModelAction::Status { config, model_path } => {
                run_model_status(&model_store(config.as_deref(), model_path)?)
            }
            ModelAction::Clear { config, model_path } => {
                run_model_clear(&model_store(config.as_deref(), model_path)?)
            }
        },
    }
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    match path {
        Some(path) => PipelineConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(PipelineConfig::default()),
    }
}

fn model_store(config: Option<&Path>, model_path: Option<PathBuf>) -> Result<FileModelStore> {
    let config = load_config(config)?;
    Ok(FileModelStore::new(model_path.unwrap_or(config.model.path)))
}

fn run_cmd(
    config_path: Option<PathBuf>,
    model_path: Option<PathBuf>,
    output_dir: PathBuf,
    synthetic: bool,
    refit: bool,
) -> Result<()> {
    let mut config = load_config(config_path.as_deref())?;
    if let Some(path) = model_path {
        config.model.path = path;
    }
    if output_dir.as_os_str().is_empty() {
        bail!("--output-dir must not be empty");
    }

    let store = FileModelStore::new(&config.model.path);
    if refit && store.clear()? {
        info!("removed cached model {}", store.path().display());
    }

    let provider: Box<dyn DataProvider> = if synthetic {
        Box::new(SyntheticProvider::default())
    } else {
        Box::new(AlphaVantageProvider::from_env(
            &config.fetch.api_key_env,
            &config.fetch.interval,
            config.timeout(),
        )?)
    };

    let result = run_pipeline(&config, provider.as_ref(), &store)?;
    print_summary(&result);

    let paths = save_artifacts(&result, &output_dir)?;
    println!("Artifacts saved to: {}", output_dir.display());
    println!("  {}", paths.svg.display());
    Ok(())
}

fn print_summary(result: &PipelineResult) {
    if result.has_synthetic {
        println!("*** SYNTHETIC DATA: not market quotes ***");
    }
    println!(
        "{} symbols, {} samples, alpha = {:.5} ({:?} model)",
        result.symbols.len(),
        result.n_samples,
        result.model.alpha,
        result.origin
    );
    println!(
        "{} clusters, {} edges",
        result.clusters.n_clusters(),
        result.scene.edges.len()
    );
    print!("{}", cluster_report(result));
}

fn run_universe(config: Option<&Path>) -> Result<()> {
    let table = load_config(config)?.universe().table();
    for (i, symbol) in table.iter().enumerate() {
        println!("{i:>3}  {:<14} {}", symbol.id, symbol.name);
    }
    Ok(())
}

fn run_model_status(store: &FileModelStore) -> Result<()> {
    match store.load()? {
        None => println!("No cached model at {}", store.path().display()),
        Some(model) => {
            println!("Cached model: {}", store.path().display());
            println!("  schema version: {}", model.schema_version);
            println!("  fitted at:      {}", model.fitted_at.to_rfc3339());
            println!("  symbols:        {}", model.n_symbols());
            println!("  alpha:          {:.5}", model.alpha);
            println!("  CV points:      {}", model.cv_path.len());
            if !model.dataset_hash.is_empty() {
                println!("  dataset hash:   {}", model.dataset_hash);
            }
        }
    }
    Ok(())
}

fn run_model_clear(store: &FileModelStore) -> Result<()> {
    if store.clear()? {
        println!("Removed {}", store.path().display());
    } else {
        println!("No cached model at {}", store.path().display());
    }
    Ok(())
}
