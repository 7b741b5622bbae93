use itertools::izip;
use serde::{Deserialize, Serialize};

use crate::catalog::FoodCatalog;
use crate::consts::{
    CALORIES_NUTRIENT_ID, GRAMS_PER_UNIT, NUMBER_OF_SCORE_COMPONENTS, RDA_SATURATION,
    RND_EXP_ENTRIES, SCORE_WEIGHTS, SUGAR_NUTRIENT_ID, UL_BUFFER, ZERO_AMOUNT_TOLERANCE,
};
use crate::evolution::vector_ops::{self, clip_all, ensure_len, logistic, mean};
use crate::evolution::EvolutionError;
use crate::nutrients::NutrientTargets;

/// The six terms that make up a diet's score, in weight order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoreComponent {
    RdaCoverage,
    NutrientsPerGram,
    UpperLimitExcess,
    CaloriesPerGram,
    Sparsity,
    Sugar,
}

impl ScoreComponent {
    pub const ALL: [ScoreComponent; NUMBER_OF_SCORE_COMPONENTS] = [
        ScoreComponent::RdaCoverage,
        ScoreComponent::NutrientsPerGram,
        ScoreComponent::UpperLimitExcess,
        ScoreComponent::CaloriesPerGram,
        ScoreComponent::Sparsity,
        ScoreComponent::Sugar,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ScoreComponent::RdaCoverage => "rda",
            ScoreComponent::NutrientsPerGram => "nutr/g",
            ScoreComponent::UpperLimitExcess => "ul",
            ScoreComponent::CaloriesPerGram => "cal/g",
            ScoreComponent::Sparsity => "sparsity",
            ScoreComponent::Sugar => "sugar",
        }
    }
}

/// Scalar fitness (lower is better) together with the weighted components it
/// was averaged from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Score {
    pub value: f64,
    pub components: [f64; NUMBER_OF_SCORE_COMPONENTS],
}

/// Scores diets against a fixed set of nutrient targets.
///
/// Everything the score needs from the catalog (calories and sugar per food)
/// is captured at construction, so [`FitnessEvaluator::score`] is a pure
/// function of its arguments.
#[derive(Debug, Clone)]
pub struct FitnessEvaluator {
    rda: Vec<f64>,
    ul: Vec<f64>,
    calories: Vec<f64>,
    sugar: Vec<f64>,
}

impl FitnessEvaluator {
    pub fn new(catalog: &FoodCatalog, targets: &NutrientTargets) -> Result<Self, EvolutionError> {
        if catalog.is_empty() {
            return Err(EvolutionError::EmptyCatalog);
        }
        if targets.is_empty() {
            return Err(EvolutionError::EmptyTargets);
        }
        for spec in targets {
            // written so that NaN is rejected too
            if !(spec.rda > 0.0 && spec.ul > 0.0) {
                return Err(EvolutionError::InvalidTarget {
                    name: spec.name.clone(),
                    rda: spec.rda,
                    ul: spec.ul,
                });
            }
        }

        Ok(FitnessEvaluator {
            rda: targets.rda(),
            ul: targets.ul(),
            calories: catalog.nutrient_column(CALORIES_NUTRIENT_ID),
            sugar: catalog.nutrient_column(SUGAR_NUTRIENT_ID),
        })
    }

    pub fn food_count(&self) -> usize {
        self.calories.len()
    }

    pub fn nutrient_count(&self) -> usize {
        self.rda.len()
    }

    /// Total calories and grams of sugar in a diet.
    pub fn calories_and_sugar(&self, amounts: &[f64]) -> (f64, f64) {
        izip!(amounts, &self.calories, &self.sugar)
            .filter(|(amount, _, _)| amount.abs() >= ZERO_AMOUNT_TOLERANCE)
            .fold((0.0, 0.0), |(cals, sugar), (amount, food_cals, food_sugar)| {
                (cals + amount * food_cals, sugar + amount * food_sugar)
            })
    }

    pub fn score(&self, amounts: &[f64], nutrition: &[f64]) -> Result<Score, EvolutionError> {
        ensure_len("diet", amounts, self.food_count())?;
        ensure_len("nutrition vector", nutrition, self.nutrient_count())?;

        // share of each RDA, with no credit past saturation
        let nutrient_scores = clip_all(&vector_ops::divide(nutrition, &self.rda)?, 0.0, RDA_SATURATION);
        // excess over the UL as a fraction of it; only counted once close to the limit
        let upper_limit_excess: f64 = izip!(nutrition, &self.ul)
            .map(|(amount, ul)| (amount - ul) / ul)
            .filter(|&excess| excess > UL_BUFFER)
            .sum();

        let grams = GRAMS_PER_UNIT * amounts.iter().sum::<f64>();
        let (calories, sugar) = self.calories_and_sugar(amounts);
        let nonzero_count = amounts.iter().filter(|&&amount| amount > 0.0).count();

        // an empty diet has no per-gram density
        let per_gram = |total: f64| if grams > 0.0 { total / grams } else { 0.0 };

        let raw = [
            -mean(&nutrient_scores),
            -per_gram(nutrient_scores.iter().sum()),
            upper_limit_excess,
            logistic(per_gram(calories)),
            logistic(nonzero_count as f64 / RND_EXP_ENTRIES as f64),
            logistic(sugar),
        ];

        let weighted = vector_ops::multiply(&SCORE_WEIGHTS, &raw)?;
        let mut components = [0.0; NUMBER_OF_SCORE_COMPONENTS];
        components.copy_from_slice(&weighted);

        Ok(Score {
            value: mean(&components),
            components,
        })
    }
}
