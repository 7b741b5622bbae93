// Tuning constants for the diet search. These are fixed for a run; changing the
// objective weighting means changing this file.

/// Expected number of non-zero entries in a freshly generated diet.
pub const RND_EXP_ENTRIES: usize = 4;
/// Upper bound for any single food amount (in 100g units).
pub const MAX_AMT: f64 = 5.0;
/// Per-index probability that mutation touches an entry at all.
pub const MUTATE_RATE: f64 = 0.20;
/// Part of `MUTATE_RATE` reserved for "big" mutations (swap or big jump).
pub const MUTATE_BIG: f64 = MUTATE_RATE * 0.20;
/// Once a mutated diet sums above this, it gets thinned out.
pub const SPARSITY_MAX: f64 = (RND_EXP_ENTRIES as f64 - 1.) * (MAX_AMT * 0.75);
/// Chance that an entry is halved (rather than dropped) while thinning.
pub const SPARSITY_HALVE_PROBABILITY: f64 = 0.70;
/// Entries at or below this are always dropped while thinning.
pub const SPARSITY_DROP_THRESHOLD: f64 = 0.1;

pub const RANDOM_AMOUNTS: [f64; 4] = [0.5, 1.0, 1.5, 2.0];
pub const BIG_JUMPS: [f64; 4] = [1.5, 1.75, 2.0, 2.25];
pub const REGULAR_JUMPS: [f64; 5] = [0.25, 0.5, 0.75, 1.0, 1.25];

pub const NUMBER_OF_SCORE_COMPONENTS: usize = 6;
/// Order: RDA coverage, nutrients per gram, UL excess, calories per gram, sparsity, sugar.
pub const SCORE_WEIGHTS: [f64; NUMBER_OF_SCORE_COMPONENTS] = [2.0, 1.0, 1.8, 1.5, 1.2, 1.0];
/// Credit for a nutrient saturates slightly above its RDA.
pub const RDA_SATURATION: f64 = 1.01;
/// Nutrients within 1% under their UL already count towards the excess penalty.
pub const UL_BUFFER: f64 = -0.01;

/// Nutrient ids (from the nutrient database) that feed the calorie and sugar terms.
pub const CALORIES_NUTRIENT_ID: &str = "208";
pub const SUGAR_NUTRIENT_ID: &str = "269";

/// The database measures everything per 100g.
pub const GRAMS_PER_UNIT: f64 = 100.0;
/// Amounts closer to zero than this are skipped when summing calories and sugar.
pub const ZERO_AMOUNT_TOLERANCE: f64 = 0.00001;

// Defaults for the configurable parts of a run.
pub const DEFAULT_GENERATIONS: usize = 5000;
pub const DEFAULT_WARMUP_GENERATIONS: usize = 2;
pub const DEFAULT_POPULATION_SIZE: usize = 200;
pub const DEFAULT_INITIAL_RANDOMS: usize = 10000;
pub const DEFAULT_IMMORTALS: usize = 5;
pub const DEFAULT_MERGE_SIZE: usize = 4;
pub const DEFAULT_TRACKED_TOP: usize = 3;
