use serde::{Deserialize, Serialize};

use crate::consts::NUMBER_OF_SCORE_COMPONENTS;
use crate::evolution::objective::Score;

/// A scored member of a population: food amounts (100g units, one entry per
/// catalog food), the nutrient totals they produce and the resulting score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diet {
    pub amounts: Vec<f64>,
    pub nutrition: Vec<f64>,
    pub score: f64,
    pub components: [f64; NUMBER_OF_SCORE_COMPONENTS],
}

impl Diet {
    pub fn new(amounts: Vec<f64>, nutrition: Vec<f64>, score: Score) -> Self {
        Diet {
            amounts,
            nutrition,
            score: score.value,
            components: score.components,
        }
    }

    /// `(food index, amount)` for every food actually in the diet.
    pub fn foods(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.amounts
            .iter()
            .copied()
            .enumerate()
            .filter(|&(_, amount)| amount > 0.0)
    }

    pub fn food_count(&self) -> usize {
        self.foods().count()
    }

    pub fn total_amount(&self) -> f64 {
        self.amounts.iter().sum()
    }

    pub fn key(&self) -> DietKey {
        DietKey::of(&self.amounts)
    }
}

/// Exact, hashable identity of a diet vector. Two diets share a key iff they
/// are element-wise equal (`0.0` and `-0.0` compare equal).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DietKey(Vec<u64>);

impl DietKey {
    pub fn of(amounts: &[f64]) -> Self {
        DietKey(
            amounts
                .iter()
                .map(|&amount| if amount == 0.0 { 0 } else { amount.to_bits() })
                .collect(),
        )
    }
}
