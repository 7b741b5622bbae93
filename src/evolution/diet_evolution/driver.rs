use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::collections::HashSet;
use tracing::{debug, info};

use super::GenerationEngine;
use crate::diet::{Diet, DietKey};
use crate::evolution::EvolutionError;

/// Population-wide numbers for one recorded generation.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GenerationSummary {
    pub generation: usize,
    pub population_size: usize,
    pub best_score: f64,
    pub average_score: f64,
    pub score_std_dev: f64,
}

impl GenerationSummary {
    fn of(generation: usize, ranked: &[Diet]) -> Self {
        let scores: Vec<f64> = ranked.iter().map(|diet| diet.score).collect();
        let score_std_dev = if scores.len() > 1 {
            scores.iter().std_dev()
        } else {
            0.0
        };
        GenerationSummary {
            generation,
            population_size: ranked.len(),
            best_score: scores.first().copied().unwrap_or(f64::INFINITY),
            average_score: scores.iter().mean(),
            score_std_dev,
        }
    }
}

/// A diet that made it into the tracked top ranks for the first time.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FirstSeen {
    pub generation: usize,
    pub rank: usize,
    pub diet: Diet,
}

#[derive(Debug, Clone)]
pub enum DriverEvent<'a> {
    /// Emitted once per recorded generation.
    Generation {
        summary: &'a GenerationSummary,
        best: &'a Diet,
    },
    /// Emitted exactly once per distinct diet, the first time it ranks in the top.
    FirstSeen(&'a FirstSeen),
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct EvolutionResult {
    pub best_per_generation: Vec<Diet>,
    pub summaries: Vec<GenerationSummary>,
    pub first_seen: Vec<FirstSeen>,
}

impl EvolutionResult {
    pub fn final_best(&self) -> Option<&Diet> {
        self.best_per_generation.last()
    }
}

/// Runs the engine for a fixed number of generations, after an unrecorded
/// warm-up, on a dedicated worker pool.
pub struct Driver {
    engine: GenerationEngine,
    pool: ThreadPool,
    seen: HashSet<DietKey>,
}

impl Driver {
    pub fn new(engine: GenerationEngine) -> Result<Self, EvolutionError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(engine.config().max_concurrency)
            .build()
            .map_err(|e| EvolutionError::ThreadPool(e.to_string()))?;
        Ok(Driver {
            engine,
            pool,
            seen: HashSet::new(),
        })
    }

    pub fn engine(&self) -> &GenerationEngine {
        &self.engine
    }

    pub fn into_engine(self) -> GenerationEngine {
        self.engine
    }

    /// Runs the whole budget and collects every event.
    pub fn run(&mut self) -> Result<EvolutionResult, EvolutionError> {
        self.run_with(|_| {})
    }

    /// Runs the whole budget, handing every event to `observer` as it happens.
    pub fn run_with<F>(&mut self, mut observer: F) -> Result<EvolutionResult, EvolutionError>
    where
        F: FnMut(&DriverEvent<'_>),
    {
        let warmup = self.engine.config().warmup_generations;
        let generations = self.engine.config().generations;
        let tracked_top = self.engine.config().tracked_top;

        info!("Pre-running {} generations", warmup);
        for _ in 0..warmup {
            self.step()?;
        }

        let mut result = EvolutionResult::default();
        for generation in 1..=generations {
            let ranked = self.step()?;

            let summary = GenerationSummary::of(generation, &ranked);
            let best = ranked[0].clone();
            info!(
                "Generation {} (pop size {}): best score {:.4}, average {:.4}",
                generation, summary.population_size, summary.best_score, summary.average_score
            );
            observer(&DriverEvent::Generation {
                summary: &summary,
                best: &best,
            });

            for (rank, diet) in ranked.iter().take(tracked_top).enumerate() {
                if !self.seen.insert(diet.key()) {
                    continue;
                }
                let first_seen = FirstSeen {
                    generation,
                    rank,
                    diet: diet.clone(),
                };
                debug!(
                    "First seen at generation {}: rank {}, score {:.4}",
                    generation, rank, diet.score
                );
                observer(&DriverEvent::FirstSeen(&first_seen));
                result.first_seen.push(first_seen);
            }

            result.summaries.push(summary);
            result.best_per_generation.push(best);
        }
        Ok(result)
    }

    fn step(&mut self) -> Result<Vec<Diet>, EvolutionError> {
        let engine = &mut self.engine;
        let ranked = self.pool.install(|| engine.step().map(|ranked| ranked.to_vec()))?;
        if ranked.is_empty() {
            return Err(EvolutionError::EmptyPopulation);
        }
        Ok(ranked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{FoodCatalog, FoodRecord};
    use crate::config::EvolutionConfig;
    use crate::nutrients::{NutrientSpec, NutrientTargets};

    fn engine(generations: usize) -> GenerationEngine {
        let foods = (0..8)
            .map(|i| {
                FoodRecord::new(&i.to_string(), &format!("Food {}", i), "Test")
                    .with_nutrient("320", 150.0 * i as f64)
                    .with_nutrient("401", 20.0 * (8 - i) as f64)
                    .with_nutrient("208", 40.0 + 5.0 * i as f64)
            })
            .collect();
        let targets = NutrientTargets::new(vec![
            NutrientSpec::new("Vitamin A", "320", "mcg", 900.0, 3000.0),
            NutrientSpec::new("Vitamin C", "401", "mg", 90.0, 2000.0),
        ]);
        let config = EvolutionConfig {
            generations,
            population_size: 15,
            initial_randoms: 20,
            max_concurrency: 2,
            ..EvolutionConfig::default()
        };
        GenerationEngine::start(FoodCatalog::new(foods), targets, config).unwrap()
    }

    #[test]
    fn test_run_records_only_after_warmup() {
        let mut driver = Driver::new(engine(4)).unwrap();
        let result = driver.run().unwrap();

        assert_eq!(result.best_per_generation.len(), 4);
        assert_eq!(result.summaries.len(), 4);
        assert_eq!(
            result.summaries.iter().map(|s| s.generation).collect::<Vec<_>>(),
            vec![1, 2, 3, 4]
        );
        // two warm-up generations plus four recorded ones
        assert_eq!(driver.engine().generation(), 6);
        assert_eq!(result.final_best(), driver.engine().best());
    }

    #[test]
    fn test_first_seen_is_emitted_once_per_diet() {
        let mut driver = Driver::new(engine(6)).unwrap();
        let mut events = Vec::new();
        let result = driver
            .run_with(|event| {
                if let DriverEvent::FirstSeen(first_seen) = event {
                    events.push((*first_seen).clone());
                }
            })
            .unwrap();

        assert_eq!(events, result.first_seen);
        // generation 1 always reports its whole tracked top
        assert_eq!(events.iter().filter(|e| e.generation == 1).count(), 3);
        let keys: HashSet<DietKey> = events.iter().map(|e| e.diet.key()).collect();
        assert_eq!(keys.len(), events.len(), "A diet was reported twice");
        assert!(events.iter().all(|e| e.rank < 3));
    }

    #[test]
    fn test_best_score_never_gets_worse() {
        // elitism carries the best diet forward unchanged
        let mut driver = Driver::new(engine(5)).unwrap();
        let result = driver.run().unwrap();
        let scores: Vec<f64> = result.summaries.iter().map(|s| s.best_score).collect();
        assert!(scores.windows(2).all(|pair| pair[1] <= pair[0]));
    }

    #[test]
    fn test_summary_statistics() {
        let mut driver = Driver::new(engine(1)).unwrap();
        let result = driver.run().unwrap();
        let summary = &result.summaries[0];
        assert!(summary.best_score <= summary.average_score);
        assert!(summary.score_std_dev >= 0.0);
        assert_eq!(summary.best_score, result.best_per_generation[0].score);
    }
}
