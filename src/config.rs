use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::catalog::FoodFilter;
use crate::consts::*;
use crate::evolution::EvolutionError;
use crate::nutrients::NutrientTargets;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not read `{path}`: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Could not parse `{path}`: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

fn default_max_concurrency() -> usize {
    num_cpus::get()
}

/// Sizes and budgets of a run. Operator probabilities and score weights are
/// constants (see [`crate::consts`]).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct EvolutionConfig {
    /// Recorded generations, not counting warm-up.
    pub generations: usize,
    pub warmup_generations: usize,
    /// Number of fill rounds per generation; each round adds up to three candidates.
    pub population_size: usize,
    /// Random diets added to the initial population.
    pub initial_randoms: usize,
    /// Whether the initial population also holds every single-food diet.
    pub seed_single_foods: bool,
    /// Top-ranked diets carried over (with variants) into the next generation.
    pub immortals: usize,
    /// Number of tournament winners summed by the merge operator.
    pub merge_size: usize,
    /// How many of the best diets per generation are watched for first appearances.
    pub tracked_top: usize,
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        EvolutionConfig {
            generations: DEFAULT_GENERATIONS,
            warmup_generations: DEFAULT_WARMUP_GENERATIONS,
            population_size: DEFAULT_POPULATION_SIZE,
            initial_randoms: DEFAULT_INITIAL_RANDOMS,
            seed_single_foods: true,
            immortals: DEFAULT_IMMORTALS,
            merge_size: DEFAULT_MERGE_SIZE,
            tracked_top: DEFAULT_TRACKED_TOP,
            max_concurrency: default_max_concurrency(),
        }
    }
}

impl EvolutionConfig {
    pub fn validate(&self) -> Result<(), EvolutionError> {
        if self.population_size == 0 {
            return Err(EvolutionError::BadPopulationParameter(
                "Population size cannot be zero".into(),
            ));
        }
        if self.merge_size == 0 {
            return Err(EvolutionError::BadPopulationParameter(
                "Merge size cannot be zero".into(),
            ));
        }
        if self.initial_randoms == 0 && !self.seed_single_foods {
            return Err(EvolutionError::BadPopulationParameter(
                "The initial population would be empty: no random diets and no single foods"
                    .into(),
            ));
        }
        if self.max_concurrency == 0 {
            return Err(EvolutionError::BadPopulationParameter(
                "At least one worker thread is needed".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct CatalogConfig {
    pub apply_filter: bool,
    pub filter: FoodFilter,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        CatalogConfig {
            apply_filter: true,
            filter: FoodFilter::default(),
        }
    }
}

impl CatalogConfig {
    pub fn active_filter(&self) -> Option<&FoodFilter> {
        self.apply_filter.then_some(&self.filter)
    }
}

/// Everything a config file can set.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct RunConfig {
    #[serde(flatten)]
    pub evolution: EvolutionConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })
}

pub fn load_run_config(path: &Path) -> Result<RunConfig, ConfigError> {
    read_json(path)
}

/// Reads a JSON array of nutrient specs. Values are validated when the engine starts.
pub fn load_targets(path: &Path) -> Result<NutrientTargets, ConfigError> {
    read_json(path)
}
