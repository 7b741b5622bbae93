use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use nutropt::config::{load_run_config, load_targets};
use nutropt::evolution::diet_evolution::single_food;
use nutropt::{
    load_catalog, render_diet, render_first_seen, Driver, DriverEvent, GenerationEngine, NutrientTargets, RunConfig,
};

#[derive(Parser)]
#[command(name = "nutropt")]
#[command(author, version, about = "Searches a food catalog for sparse diets meeting micronutrient targets")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Clone)]
struct Inputs {
    /// Food catalog, JSON lines (optionally gzipped)
    #[arg(long, value_name = "FILE")]
    catalog: PathBuf,

    /// Run configuration (JSON); defaults apply to anything left out
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Nutrient targets (JSON array); defaults to the built-in micronutrient table
    #[arg(long, value_name = "FILE")]
    targets: Option<PathBuf>,
}

#[derive(Subcommand, Clone)]
enum Command {
    /// Evolves diets and reports the best one every generation
    Run {
        #[command(flatten)]
        inputs: Inputs,

        /// Overrides the configured number of generations
        #[arg(long)]
        generations: Option<usize>,

        /// Where diets are written the first time they reach the top ranks
        #[arg(long, value_name = "FILE", default_value = "results.txt")]
        results: PathBuf,
    },
    /// Scores every food on its own
    FoodScores {
        #[command(flatten)]
        inputs: Inputs,
    },
}

fn load_inputs(inputs: &Inputs) -> Result<(RunConfig, nutropt::FoodCatalog, NutrientTargets)> {
    let config = match &inputs.config {
        Some(path) => load_run_config(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => RunConfig::default(),
    };
    let targets = match &inputs.targets {
        Some(path) => load_targets(path)
            .with_context(|| format!("Failed to load targets from {}", path.display()))?,
        None => NutrientTargets::micronutrients(),
    };
    let catalog = load_catalog(&inputs.catalog, config.catalog.active_filter())
        .with_context(|| format!("Failed to load catalog from {}", inputs.catalog.display()))?;
    info!("Loaded {} foods", catalog.len());
    Ok((config, catalog, targets))
}

fn run(inputs: &Inputs, generations: Option<usize>, results: &Path) -> Result<()> {
    let (mut config, catalog, targets) = load_inputs(inputs)?;
    if let Some(generations) = generations {
        config.evolution.generations = generations;
    }

    let engine = GenerationEngine::start(catalog, targets, config.evolution)
        .context("Failed to start the evolution")?;
    let mut driver = Driver::new(engine).context("Failed to build the worker pool")?;

    let file = File::create(results)
        .with_context(|| format!("Failed to create results file {}", results.display()))?;
    let mut writer = BufWriter::new(file);

    // the observer needs the catalog while the driver is borrowed mutably
    let catalog = driver.engine().catalog().clone();
    let targets = driver.engine().targets().clone();
    let result = driver.run_with(|event| match event {
        DriverEvent::Generation { best, .. } => {
            for line in render_diet(best, &catalog, &targets) {
                info!("{}", line);
            }
        }
        DriverEvent::FirstSeen(first_seen) => {
            let written = render_first_seen(first_seen, &catalog, &targets)
                .iter()
                .try_for_each(|line| writeln!(writer, "{}", line))
                .and_then(|_| writer.flush());
            if let Err(e) = written {
                warn!("Failed to write to {}: {}", results.display(), e);
            }
        }
    })?;

    if let Some(best) = result.final_best() {
        info!("Final best score {:.4} with {} foods", best.score, best.food_count());
    }
    Ok(())
}

fn food_scores(inputs: &Inputs) -> Result<()> {
    let (config, catalog, targets) = load_inputs(inputs)?;
    let diets = (0..catalog.len())
        .map(|food| single_food(catalog.len(), food))
        .collect();
    let mut engine = GenerationEngine::with_population(catalog, targets, config.evolution, diets)
        .context("Failed to score the catalog")?;
    engine.step()?;

    for diet in engine.last_generation() {
        for line in render_diet(diet, engine.catalog(), engine.targets()) {
            println!("{}", line);
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    match &cli.command {
        Command::Run {
            inputs,
            generations,
            results,
        } => run(inputs, *generations, results),
        Command::FoodScores { inputs } => food_scores(inputs),
    }
}
