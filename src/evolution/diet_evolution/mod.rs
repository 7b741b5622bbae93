use rand::prelude::*;
use rand_distr::Binomial;
use std::collections::HashSet;
use tracing::trace;

use crate::consts::{
    BIG_JUMPS, MAX_AMT, MUTATE_BIG, MUTATE_RATE, RANDOM_AMOUNTS, REGULAR_JUMPS, RND_EXP_ENTRIES,
    SPARSITY_DROP_THRESHOLD, SPARSITY_HALVE_PROBABILITY, SPARSITY_MAX,
};
use crate::diet::{Diet, DietKey};
use crate::evolution::vector_ops::{add_assign, clip, ensure_len};
use crate::evolution::EvolutionError;

pub mod driver;
pub mod engine;
pub mod population;

pub use driver::{Driver, DriverEvent, EvolutionResult, FirstSeen, GenerationSummary};
pub use engine::GenerationEngine;
pub use population::Population;

/// Draws fresh random diets: a Binomial number of distinct foods, each with a
/// small random amount.
#[derive(Debug, Clone)]
pub struct InstanceSampler {
    food_count: usize,
    entries: Binomial,
}

impl InstanceSampler {
    pub fn new(food_count: usize) -> Result<Self, EvolutionError> {
        if food_count == 0 {
            return Err(EvolutionError::EmptyCatalog);
        }
        // E[Binomial(n, p)] = np, so p = RND_EXP_ENTRIES / n
        let p = (RND_EXP_ENTRIES as f64 / food_count as f64).min(1.0);
        let entries = Binomial::new(food_count as u64, p)
            .map_err(|e| EvolutionError::Sampling(e.to_string()))?;
        Ok(InstanceSampler {
            food_count,
            entries,
        })
    }

    pub fn food_count(&self) -> usize {
        self.food_count
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<f64> {
        let mut entries = self.entries.sample(rng) as usize;
        if entries < 1 {
            // extra boost towards the expected size
            entries = RND_EXP_ENTRIES;
        }
        let entries = entries.min(self.food_count);

        let mut diet = vec![0.0; self.food_count];
        for idx in rand::seq::index::sample(rng, self.food_count, entries) {
            diet[idx] = RANDOM_AMOUNTS[rng.gen_range(0..RANDOM_AMOUNTS.len())];
        }
        diet
    }
}

/// A diet of exactly one 100g unit of a single food.
pub fn single_food(food_count: usize, food: usize) -> Vec<f64> {
    let mut diet = vec![0.0; food_count];
    diet[food] = 1.0;
    diet
}

/// First generation: optionally every single-food diet, followed by
/// `initial_randoms` random diets.
pub fn initialize_population<R: Rng + ?Sized>(
    sampler: &InstanceSampler,
    initial_randoms: usize,
    seed_single_foods: bool,
    rng: &mut R,
) -> Result<Vec<Vec<f64>>, EvolutionError> {
    let food_count = sampler.food_count();
    let mut population = Vec::with_capacity(initial_randoms + food_count);
    if seed_single_foods {
        population.extend((0..food_count).map(|food| single_food(food_count, food)));
    }
    population.extend((0..initial_randoms).map(|_| sampler.sample(rng)));

    if population.is_empty() {
        return Err(EvolutionError::BadPopulationParameter(
            "The initial population would be empty".into(),
        ));
    }
    Ok(dedup_diets(population))
}

/// Returns a mutated copy of `diet`.
///
/// Every index is rolled independently. Rolls above `MUTATE_RATE` leave the
/// entry alone; "big" rolls on a non-zero entry move it to an empty slot; all
/// other rolls jump the amount up or down (or set it, for an empty entry).
/// Afterwards the diet is thinned until its total is at most `SPARSITY_MAX`.
pub fn mutate<R: Rng + ?Sized>(diet: &[f64], rng: &mut R) -> Vec<f64> {
    let mut mutated = diet.to_vec();
    let blanks: Vec<usize> = diet
        .iter()
        .enumerate()
        .filter(|&(_, &amount)| amount <= 0.0)
        .map(|(idx, _)| idx)
        .collect();

    for (idx, &amount) in diet.iter().enumerate() {
        let roll: f64 = rng.gen();
        if roll > MUTATE_RATE {
            continue;
        }

        // The swap only applies to non-zero entries; a zero entry with the same
        // roll gets a big jump instead.
        if roll < MUTATE_BIG && amount > 0.0 {
            if let Some(&blank) = blanks.choose(rng) {
                mutated.swap(idx, blank);
            }
            continue;
        }

        let modifier = if roll < MUTATE_BIG {
            BIG_JUMPS[rng.gen_range(0..BIG_JUMPS.len())]
        } else {
            REGULAR_JUMPS[rng.gen_range(0..REGULAR_JUMPS.len())]
        };

        mutated[idx] = if amount <= 0.0 {
            modifier
        } else {
            let sign = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
            clip(amount + sign * modifier, 0.0, MAX_AMT)
        };
    }

    enforce_sparsity(&mut mutated, rng);
    mutated
}

// Mutation (and merging) tends to grow diets; keep thinning until the total is
// small again. Each pass over a non-empty diet strictly shrinks the sum, and the
// empty diet always satisfies the bound.
fn enforce_sparsity<R: Rng + ?Sized>(diet: &mut [f64], rng: &mut R) {
    while diet.iter().sum::<f64>() > SPARSITY_MAX {
        for amount in diet.iter_mut() {
            if *amount <= SPARSITY_DROP_THRESHOLD {
                *amount = 0.0;
            } else if rng.gen::<f64>() < SPARSITY_HALVE_PROBABILITY {
                *amount *= 0.5;
            } else {
                *amount = 0.0;
            }
        }
    }
}

/// Uniform crossover: each entry comes from either parent with equal chance.
pub fn crossover<R: Rng + ?Sized>(
    parent_1: &[f64],
    parent_2: &[f64],
    rng: &mut R,
) -> Result<Vec<f64>, EvolutionError> {
    ensure_len("second parent", parent_2, parent_1.len())?;
    Ok(parent_1
        .iter()
        .zip(parent_2)
        .map(|(&amount_1, &amount_2)| if rng.gen_bool(0.5) { amount_1 } else { amount_2 })
        .collect())
}

/// Binary tournament over a population sorted best-first: the winner is
/// simply the better ranked of two uniform draws.
pub fn tournament_selection<R: Rng + ?Sized>(population_size: usize, rng: &mut R) -> usize {
    let contestant_1 = rng.gen_range(0..population_size);
    let contestant_2 = rng.gen_range(0..population_size);
    contestant_1.min(contestant_2)
}

/// Sums `merge_size` tournament winners from `ranked` and mutates the result.
///
/// The sum is not renormalized; entries are only capped at `MAX_AMT` before the
/// mutation's own thinning step brings the total back down.
pub fn merge<R: Rng + ?Sized>(
    ranked: &[Diet],
    merge_size: usize,
    rng: &mut R,
) -> Result<Vec<f64>, EvolutionError> {
    if ranked.is_empty() {
        return Err(EvolutionError::EmptyPopulation);
    }
    let mut merged = ranked[tournament_selection(ranked.len(), rng)].amounts.clone();
    for _ in 1..merge_size {
        let winner = tournament_selection(ranked.len(), rng);
        add_assign(&mut merged, &ranked[winner].amounts)?;
    }
    // Capped per entry so merged diets stay within [0, MAX_AMT]; the total is
    // left to the thinning step.
    merged.iter_mut().for_each(|amount| *amount = clip(*amount, 0.0, MAX_AMT));
    Ok(mutate(&merged, rng))
}

/// Drops every diet that is element-wise equal to an earlier one.
pub fn dedup_diets(candidates: Vec<Vec<f64>>) -> Vec<Vec<f64>> {
    let before = candidates.len();
    let mut seen = HashSet::with_capacity(before);
    let unique: Vec<Vec<f64>> = candidates
        .into_iter()
        .filter(|diet| seen.insert(DietKey::of(diet)))
        .collect();
    trace!("Dedup kept {} of {} diets", unique.len(), before);
    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evolution::objective::Score;
    use proptest::prelude::*;
    use rand::rngs::StdRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    fn ranked(diets: Vec<Vec<f64>>) -> Vec<Diet> {
        diets
            .into_iter()
            .enumerate()
            .map(|(i, amounts)| {
                Diet::new(
                    amounts,
                    vec![0.0],
                    Score {
                        value: i as f64,
                        components: [0.0; 6],
                    },
                )
            })
            .collect()
    }

    #[test]
    fn test_random_instances_are_sparse_and_discrete() {
        let sampler = InstanceSampler::new(50).unwrap();
        let mut rng = rng();
        for _ in 0..500 {
            let diet = sampler.sample(&mut rng);
            assert_eq!(diet.len(), 50);
            let nonzero: Vec<f64> = diet.iter().copied().filter(|&a| a > 0.0).collect();
            assert!(!nonzero.is_empty(), "Random diet must have at least one food");
            for amount in nonzero {
                assert!(
                    RANDOM_AMOUNTS.contains(&amount),
                    "Unexpected amount {}",
                    amount
                );
            }
        }
    }

    #[test]
    fn test_random_instances_on_tiny_catalogs() {
        // fewer foods than the expected entry count
        let sampler = InstanceSampler::new(2).unwrap();
        let mut rng = rng();
        for _ in 0..100 {
            let diet = sampler.sample(&mut rng);
            assert_eq!(diet.len(), 2);
            assert!(diet.iter().any(|&a| a > 0.0));
        }
        assert!(InstanceSampler::new(0).is_err());
    }

    #[test]
    fn test_initialize_population_seeds_single_foods() {
        let sampler = InstanceSampler::new(6).unwrap();
        let population = initialize_population(&sampler, 20, true, &mut rng()).unwrap();
        for food in 0..6 {
            assert_eq!(population[food], single_food(6, food));
        }
        let keys: HashSet<DietKey> = population.iter().map(|d| DietKey::of(d)).collect();
        assert_eq!(keys.len(), population.len(), "Seeded population has duplicates");

        assert!(initialize_population(&sampler, 0, false, &mut rng()).is_err());
    }

    #[test]
    fn test_mutate_of_empty_diet_only_sets_modifiers() {
        let mut rng = rng();
        for _ in 0..200 {
            let mutated = mutate(&[0.0; 30], &mut rng);
            // a zero entry can only become a jump modifier (possibly halved by thinning)
            assert!(mutated.iter().all(|&a| (0.0..=2.25).contains(&a)));
            assert!(mutated.iter().sum::<f64>() <= SPARSITY_MAX);
        }
    }

    #[test]
    fn test_mutate_never_touches_diet_in_place() {
        let diet = vec![1.0, 0.0, 2.0, 0.0, 0.5];
        let snapshot = diet.clone();
        let mut rng = rng();
        for _ in 0..50 {
            let _ = mutate(&diet, &mut rng);
        }
        assert_eq!(diet, snapshot);
    }

    #[test]
    fn test_mutate_thins_large_diets() {
        let mut rng = rng();
        let heavy = vec![MAX_AMT; 10];
        for _ in 0..100 {
            let mutated = mutate(&heavy, &mut rng);
            assert!(mutated.iter().sum::<f64>() <= SPARSITY_MAX);
        }
    }

    #[test]
    fn test_mutate_moves_amounts_into_empty_slots() {
        let diet = [3.0, 0.0, 0.0, 0.0];
        let mut rng = rng();
        let trials = 20_000;
        let mut relocated = 0;
        let mut big_jumps = 0;
        for _ in 0..trials {
            let mutated = mutate(&diet, &mut rng);
            assert!(mutated.iter().all(|&a| (0.0..=MAX_AMT).contains(&a)));
            // jumps never bring 3.0 down to zero, so this is the swap
            if mutated[0] == 0.0 && mutated[1..].contains(&3.0) {
                relocated += 1;
            }
            // regular jumps top out at 1.25; zero entries with a low roll get these instead
            big_jumps += mutated[1..].iter().filter(|&&a| BIG_JUMPS.contains(&a)).count();
        }
        // a swap needs a roll below MUTATE_BIG on the single non-zero entry
        assert!(
            (300..1200).contains(&relocated),
            "Unexpected swap count {}",
            relocated
        );
        // three empty slots, each with a MUTATE_BIG chance
        assert!(big_jumps > 1500, "Unexpected big jump count {}", big_jumps);
    }

    #[test]
    fn test_mutate_without_empty_slots_keeps_length() {
        let mut rng = rng();
        for _ in 0..2_000 {
            let mutated = mutate(&[2.0; 4], &mut rng);
            assert_eq!(mutated.len(), 4);
            assert!(mutated.iter().all(|&a| (0.0..=MAX_AMT).contains(&a)));
        }
    }

    #[test]
    fn test_crossover_rejects_mismatched_parents() {
        assert!(crossover(&[1.0, 0.0], &[1.0], &mut rng()).is_err());
    }

    #[test]
    fn test_tournament_prefers_better_rank() {
        let mut rng = rng();
        let draws = 10_000;
        let top_half = (0..draws)
            .filter(|_| tournament_selection(10, &mut rng) < 5)
            .count();
        // P(min of two draws < 5) = 0.75
        assert!(top_half as f64 / draws as f64 > 0.70);
        assert_eq!(tournament_selection(1, &mut rng), 0);
    }

    #[test]
    fn test_merge_respects_bounds() {
        let population = ranked(vec![
            vec![2.0, 0.0, 0.0, 1.0],
            vec![2.0, 0.5, 0.0, 0.0],
            vec![0.0, 0.0, 1.5, 0.0],
        ]);
        let mut rng = rng();
        for _ in 0..200 {
            let merged = merge(&population, 4, &mut rng).unwrap();
            assert_eq!(merged.len(), 4);
            assert!(merged.iter().all(|&a| (0.0..=MAX_AMT).contains(&a)));
            assert!(merged.iter().sum::<f64>() <= SPARSITY_MAX);
        }
        assert!(matches!(
            merge(&[], 4, &mut rng),
            Err(EvolutionError::EmptyPopulation)
        ));
    }

    #[test]
    fn test_dedup_keeps_first_occurrence() {
        let diets = vec![
            vec![1.0, 0.0],
            vec![0.0, 1.0],
            vec![1.0, 0.0],
            vec![1.0, -0.0],
        ];
        assert_eq!(dedup_diets(diets), vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    fn diet_strategy() -> impl Strategy<Value = Vec<f64>> {
        prop::collection::vec(
            prop_oneof![
                3 => Just(0.0),
                1 => (0u32..=20).prop_map(|quarter| quarter as f64 * 0.25),
            ],
            1..40,
        )
    }

    proptest! {
        #[test]
        fn prop_mutate_keeps_length_and_sparsity(diet in diet_strategy(), seed in any::<u64>()) {
            let mut rng = StdRng::seed_from_u64(seed);
            let mutated = mutate(&diet, &mut rng);
            prop_assert_eq!(mutated.len(), diet.len());
            let total: f64 = mutated.iter().sum();
            prop_assert!(total <= SPARSITY_MAX || mutated.iter().all(|&a| a == 0.0));
            prop_assert!(mutated.iter().all(|&a| (0.0..=MAX_AMT).contains(&a)));
        }

        #[test]
        fn prop_crossover_takes_entries_from_parents(
            pair in (1usize..40).prop_flat_map(|n| (
                prop::collection::vec(0.0f64..=MAX_AMT, n),
                prop::collection::vec(0.0f64..=MAX_AMT, n),
            )),
            seed in any::<u64>(),
        ) {
            let (parent_1, parent_2) = pair;
            let mut rng = StdRng::seed_from_u64(seed);
            let child = crossover(&parent_1, &parent_2, &mut rng).unwrap();
            prop_assert_eq!(child.len(), parent_1.len());
            for (i, &amount) in child.iter().enumerate() {
                prop_assert!(amount == parent_1[i] || amount == parent_2[i]);
            }
        }
    }
}
