use ndarray::{Array2, ArrayView1};
use tracing::debug;

use crate::catalog::FoodCatalog;
use crate::evolution::vector_ops::{ensure_len, DimensionMismatch};
use crate::evolution::EvolutionError;
use crate::nutrients::NutrientTargets;

/// Foods × nutrients table; row `i` holds the tracked nutrients of food `i`
/// per 100g, with 0.0 where the database has no value.
#[derive(Debug, Clone, PartialEq)]
pub struct NutritionMatrix {
    matrix: Array2<f64>,
}

impl NutritionMatrix {
    pub fn build(catalog: &FoodCatalog, targets: &NutrientTargets) -> Result<Self, EvolutionError> {
        if catalog.is_empty() {
            return Err(EvolutionError::EmptyCatalog);
        }
        if targets.is_empty() {
            return Err(EvolutionError::EmptyTargets);
        }

        let matrix = Array2::from_shape_fn((catalog.len(), targets.len()), |(food, nutrient)| {
            catalog.foods()[food]
                .nutrient(&targets.specs()[nutrient].id)
                .unwrap_or(0.0)
        });
        debug!("Built nutrition matrix of shape {:?}", matrix.dim());
        Ok(NutritionMatrix { matrix })
    }

    pub fn food_count(&self) -> usize {
        self.matrix.nrows()
    }

    pub fn nutrient_count(&self) -> usize {
        self.matrix.ncols()
    }

    pub fn row(&self, food: usize) -> ArrayView1<'_, f64> {
        self.matrix.row(food)
    }

    /// Nutrient totals of a single diet.
    pub fn nutrition_of(&self, amounts: &[f64]) -> Result<Vec<f64>, DimensionMismatch> {
        ensure_len("diet", amounts, self.food_count())?;
        Ok(ArrayView1::from(amounts).dot(&self.matrix).to_vec())
    }

    /// Nutrient totals of a whole population in one matrix multiply.
    pub fn population_nutrition(
        &self,
        population: &[Vec<f64>],
    ) -> Result<Vec<Vec<f64>>, DimensionMismatch> {
        let food_count = self.food_count();
        let mut flat = Vec::with_capacity(population.len() * food_count);
        for amounts in population {
            ensure_len("diet", amounts, food_count)?;
            flat.extend_from_slice(amounts);
        }
        let stacked = Array2::from_shape_vec((population.len(), food_count), flat).map_err(|_| {
            DimensionMismatch {
                what: "population",
                expected: population.len() * food_count,
                found: population.iter().map(Vec::len).sum(),
            }
        })?;

        Ok(stacked
            .dot(&self.matrix)
            .outer_iter()
            .map(|row| row.to_vec())
            .collect())
    }
}
