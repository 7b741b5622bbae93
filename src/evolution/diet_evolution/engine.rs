use rand::prelude::*;
use rayon::prelude::*;
use tracing::{debug, info};

use super::{
    crossover, dedup_diets, initialize_population, merge, mutate, tournament_selection,
    InstanceSampler, Population,
};
use crate::catalog::{FoodCatalog, FoodRecord};
use crate::config::EvolutionConfig;
use crate::diet::Diet;
use crate::evolution::matrix::NutritionMatrix;
use crate::evolution::objective::FitnessEvaluator;
use crate::evolution::EvolutionError;
use crate::nutrients::{NutrientSpec, NutrientTargets};

/// Holds the current population and produces the next one, one generation
/// per [`GenerationEngine::step`].
///
/// A step never mutates the population in place: the new diets and their
/// nutrient totals are built aside and swapped in together at the end.
#[derive(Debug)]
pub struct GenerationEngine {
    catalog: FoodCatalog,
    targets: NutrientTargets,
    config: EvolutionConfig,
    matrix: NutritionMatrix,
    evaluator: FitnessEvaluator,
    sampler: InstanceSampler,
    population: Population,
    last_generation: Vec<Diet>,
    generation: usize,
}

impl GenerationEngine {
    /// Validates the inputs and seeds the first population.
    pub fn start(
        catalog: FoodCatalog,
        targets: NutrientTargets,
        config: EvolutionConfig,
    ) -> Result<Self, EvolutionError> {
        let mut engine = Self::without_population(catalog, targets, config)?;
        let seed = initialize_population(
            &engine.sampler,
            engine.config.initial_randoms,
            engine.config.seed_single_foods,
            &mut thread_rng(),
        )?;
        engine.replace_population(seed)?;
        info!(
            "Initial population of {} diets over {} foods and {} nutrients",
            engine.population.len(),
            engine.matrix.food_count(),
            engine.matrix.nutrient_count()
        );
        Ok(engine)
    }

    /// Like [`GenerationEngine::start`] but with a caller-chosen first population.
    pub fn with_population(
        catalog: FoodCatalog,
        targets: NutrientTargets,
        config: EvolutionConfig,
        diets: Vec<Vec<f64>>,
    ) -> Result<Self, EvolutionError> {
        let mut engine = Self::without_population(catalog, targets, config)?;
        engine.replace_population(diets)?;
        Ok(engine)
    }

    fn without_population(
        catalog: FoodCatalog,
        targets: NutrientTargets,
        config: EvolutionConfig,
    ) -> Result<Self, EvolutionError> {
        config.validate()?;
        // the evaluator checks the targets, the matrix checks both inputs are non-empty
        let evaluator = FitnessEvaluator::new(&catalog, &targets)?;
        let matrix = NutritionMatrix::build(&catalog, &targets)?;
        let sampler = InstanceSampler::new(catalog.len())?;

        Ok(GenerationEngine {
            catalog,
            targets,
            config,
            matrix,
            evaluator,
            sampler,
            population: Population::default(),
            last_generation: Vec::new(),
            generation: 0,
        })
    }

    /// Sets the population directly and recomputes its nutrient totals.
    pub fn replace_population(&mut self, diets: Vec<Vec<f64>>) -> Result<(), EvolutionError> {
        self.population = Population::new(diets, &self.matrix)?;
        Ok(())
    }

    /// Runs one generation and returns the previous population, scored and
    /// sorted best-first.
    pub fn step(&mut self) -> Result<&[Diet], EvolutionError> {
        let ranked = self.rank_population()?;
        let candidates = self.build_candidates(&ranked)?;
        let candidate_count = candidates.len();
        let next_generation = dedup_diets(candidates);
        debug!(
            "Generation {}: {} candidates, {} unique",
            self.generation + 1,
            candidate_count,
            next_generation.len()
        );

        // everything fallible is done before any state changes
        let population = Population::new(next_generation, &self.matrix)?;
        self.population = population;
        self.last_generation = ranked;
        self.generation += 1;
        Ok(&self.last_generation)
    }

    /// Scores the current population and sorts it by score (stable, ascending).
    fn rank_population(&self) -> Result<Vec<Diet>, EvolutionError> {
        let mut ranked = self
            .population
            .diets()
            .par_iter()
            .zip(self.population.nutrition().par_iter())
            .map(|(amounts, nutrition)| {
                let score = self.evaluator.score(amounts, nutrition)?;
                Ok(Diet::new(amounts.clone(), nutrition.clone(), score))
            })
            .collect::<Result<Vec<Diet>, EvolutionError>>()?;
        ranked.sort_by(|a, b| a.score.total_cmp(&b.score));
        Ok(ranked)
    }

    /// Candidate pool for the next generation, before dedup: elites with their
    /// variants first, then the fill rounds.
    pub(crate) fn build_candidates(&self, ranked: &[Diet]) -> Result<Vec<Vec<f64>>, EvolutionError> {
        let mut candidates = self.elite_candidates(ranked);

        let fill = (0..self.config.population_size)
            .into_par_iter()
            .map_init(thread_rng, |rng, _| self.fill_round(ranked, rng))
            .collect::<Result<Vec<_>, EvolutionError>>()?;
        candidates.extend(fill.into_iter().flatten());
        Ok(candidates)
    }

    // For each of the top diets: the diet itself, a mutated copy, and for every
    // food in it a copy with that food removed plus a mutated version of that.
    fn elite_candidates(&self, ranked: &[Diet]) -> Vec<Vec<f64>> {
        let mut rng = thread_rng();
        let mut candidates = Vec::new();
        for elite in ranked.iter().take(self.config.immortals) {
            candidates.push(elite.amounts.clone());
            candidates.push(mutate(&elite.amounts, &mut rng));
            for (food, _) in elite.foods() {
                let mut one_off = elite.amounts.clone();
                one_off[food] = 0.0;
                let mutated = mutate(&one_off, &mut rng);
                candidates.push(one_off);
                candidates.push(mutated);
            }
        }
        candidates
    }

    fn fill_round(&self, ranked: &[Diet], rng: &mut ThreadRng) -> Result<[Vec<f64>; 3], EvolutionError> {
        let fresh = self.sampler.sample(rng);
        let merged = merge(ranked, self.config.merge_size, rng)?;
        let parent_1 = &ranked[tournament_selection(ranked.len(), rng)].amounts;
        let parent_2 = &ranked[tournament_selection(ranked.len(), rng)].amounts;
        let child = mutate(&crossover(parent_1, parent_2, rng)?, rng);
        Ok([fresh, merged, child])
    }

    /// Best diet of the last completed generation.
    pub fn best(&self) -> Option<&Diet> {
        self.last_generation.first()
    }

    /// The last completed generation, sorted best-first.
    pub fn last_generation(&self) -> &[Diet] {
        &self.last_generation
    }

    pub fn population(&self) -> &Population {
        &self.population
    }

    /// Number of completed steps.
    pub fn generation(&self) -> usize {
        self.generation
    }

    pub fn config(&self) -> &EvolutionConfig {
        &self.config
    }

    pub fn catalog(&self) -> &FoodCatalog {
        &self.catalog
    }

    pub fn targets(&self) -> &NutrientTargets {
        &self.targets
    }

    pub fn food(&self, index: usize) -> Option<&FoodRecord> {
        self.catalog.get(index)
    }

    pub fn nutrient(&self, index: usize) -> Option<&NutrientSpec> {
        self.targets.specs().get(index)
    }

    pub fn evaluator(&self) -> &FitnessEvaluator {
        &self.evaluator
    }

    pub fn matrix(&self) -> &NutritionMatrix {
        &self.matrix
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diet::DietKey;
    use crate::nutrients::NutrientSpec;
    use std::collections::HashSet;

    fn catalog() -> FoodCatalog {
        let mut foods = Vec::new();
        for i in 0..12 {
            let food = FoodRecord::new(&i.to_string(), &format!("Food {}", i), "Test")
                .with_nutrient("320", 100.0 * (i % 4) as f64)
                .with_nutrient("401", 15.0 * (i % 3) as f64)
                .with_nutrient("303", 0.75 * (i % 5) as f64)
                .with_nutrient("208", 20.0 + 10.0 * i as f64)
                .with_nutrient("269", (i % 2) as f64);
            foods.push(food);
        }
        FoodCatalog::new(foods)
    }

    fn targets() -> NutrientTargets {
        NutrientTargets::new(vec![
            NutrientSpec::new("Vitamin A", "320", "mcg", 900.0, 3000.0),
            NutrientSpec::new("Vitamin C", "401", "mg", 90.0, 2000.0),
            NutrientSpec::new("Iron", "303", "mg", 8.0, 45.0),
        ])
    }

    fn small_config() -> EvolutionConfig {
        EvolutionConfig {
            generations: 3,
            population_size: 20,
            initial_randoms: 30,
            max_concurrency: 2,
            ..EvolutionConfig::default()
        }
    }

    #[test]
    fn test_start_rejects_bad_inputs() {
        assert!(matches!(
            GenerationEngine::start(FoodCatalog::default(), targets(), small_config()),
            Err(EvolutionError::EmptyCatalog)
        ));
        assert!(matches!(
            GenerationEngine::start(catalog(), NutrientTargets::new(vec![]), small_config()),
            Err(EvolutionError::EmptyTargets)
        ));
        let bad = NutrientTargets::new(vec![NutrientSpec::new("X", "320", "mg", 1.0, 0.0)]);
        assert!(matches!(
            GenerationEngine::start(catalog(), bad, small_config()),
            Err(EvolutionError::InvalidTarget { .. })
        ));
    }

    #[test]
    fn test_start_seeds_single_foods_and_randoms() {
        let engine = GenerationEngine::start(catalog(), targets(), small_config()).unwrap();
        let population = engine.population();
        assert!(population.len() >= 12);
        for (diet, nutrition) in population.iter() {
            assert_eq!(diet.len(), 12);
            assert_eq!(nutrition.len(), 3);
            assert_eq!(nutrition, &engine.matrix().nutrition_of(diet).unwrap());
        }
        assert!(engine.best().is_none());
    }

    #[test]
    fn test_with_population_rejects_wrong_lengths() {
        let result =
            GenerationEngine::with_population(catalog(), targets(), small_config(), vec![vec![1.0; 3]]);
        assert!(matches!(result, Err(EvolutionError::DimensionMismatch(_))));
    }

    #[test]
    fn test_step_returns_sorted_snapshot() {
        let mut engine = GenerationEngine::start(catalog(), targets(), small_config()).unwrap();
        let population_size = engine.population().len();
        let ranked = engine.step().unwrap().to_vec();

        assert_eq!(ranked.len(), population_size);
        assert!(ranked.windows(2).all(|pair| pair[0].score <= pair[1].score));
        assert_eq!(engine.best(), ranked.first());
        assert_eq!(engine.generation(), 1);
    }

    #[test]
    fn test_step_produces_unique_consistent_population() {
        let mut engine = GenerationEngine::start(catalog(), targets(), small_config()).unwrap();
        for _ in 0..3 {
            engine.step().unwrap();
            let population = engine.population();
            let keys: HashSet<DietKey> = population.diets().iter().map(|d| DietKey::of(d)).collect();
            assert_eq!(keys.len(), population.len(), "Duplicate diets after step");
            for (diet, nutrition) in population.iter() {
                assert!(diet.iter().all(|&a| (0.0..=crate::consts::MAX_AMT).contains(&a)));
                assert_eq!(nutrition, &engine.matrix().nutrition_of(diet).unwrap());
            }
        }
    }

    #[test]
    fn test_elites_carry_over_verbatim() {
        let mut engine = GenerationEngine::start(catalog(), targets(), small_config()).unwrap();
        engine.step().unwrap();
        let ranked = engine.last_generation().to_vec();
        let candidates = engine.build_candidates(&ranked).unwrap();

        for elite in ranked.iter().take(engine.config().immortals) {
            assert!(
                candidates.contains(&elite.amounts),
                "Elite {:?} missing from the candidate pool",
                elite.amounts
            );
        }
        // the unmutated elites lead the pool
        assert_eq!(candidates[0], ranked[0].amounts);

        // and survive dedup into the next population
        engine.step().unwrap();
        let next: HashSet<DietKey> = engine.population().diets().iter().map(|d| DietKey::of(d)).collect();
        for elite in engine.last_generation().iter().take(engine.config().immortals) {
            assert!(next.contains(&elite.key()));
        }
    }

    #[test]
    fn test_elite_one_off_variants_join_the_pool() {
        let mut engine = GenerationEngine::start(catalog(), targets(), small_config()).unwrap();
        engine.step().unwrap();
        let ranked = engine.last_generation().to_vec();
        let candidates = engine.build_candidates(&ranked).unwrap();
        let pool: HashSet<DietKey> = candidates.iter().map(|d| DietKey::of(d)).collect();

        let immortals = engine.config().immortals;
        for elite in ranked.iter().take(immortals) {
            for (food, _) in elite.foods() {
                let mut one_off = elite.amounts.clone();
                one_off[food] = 0.0;
                assert!(
                    pool.contains(&DietKey::of(&one_off)),
                    "Elite {:?} without food {} missing from the candidate pool",
                    elite.amounts,
                    food
                );
            }
        }

        // per elite: itself, a mutated copy, and a plain plus mutated copy per food removed
        let elite_count: usize = ranked
            .iter()
            .take(immortals)
            .map(|elite| 2 + 2 * elite.food_count())
            .sum();
        assert_eq!(
            candidates.len(),
            elite_count + 3 * engine.config().population_size
        );
    }

    #[test]
    fn test_single_food_scores() {
        let mut config = small_config();
        config.initial_randoms = 0;
        let singles: Vec<Vec<f64>> = (0..12).map(|i| super::super::single_food(12, i)).collect();
        let mut engine = GenerationEngine::with_population(catalog(), targets(), config, singles).unwrap();
        let ranked = engine.step().unwrap();
        assert_eq!(ranked.len(), 12);
        assert!(ranked.iter().all(|diet| diet.food_count() == 1));
    }
}
