use crate::evolution::matrix::NutritionMatrix;
use crate::evolution::EvolutionError;

/// Diets of one generation together with their nutrient totals.
///
/// The only way to build one is from the diets alone, so the cached totals
/// always match (one matrix multiply per generation).
#[derive(Debug, Clone, Default)]
pub struct Population {
    diets: Vec<Vec<f64>>,
    nutrition: Vec<Vec<f64>>,
}

impl Population {
    pub fn new(diets: Vec<Vec<f64>>, matrix: &NutritionMatrix) -> Result<Self, EvolutionError> {
        if diets.is_empty() {
            return Err(EvolutionError::EmptyPopulation);
        }
        let nutrition = matrix.population_nutrition(&diets)?;
        Ok(Population { diets, nutrition })
    }

    pub fn len(&self) -> usize {
        self.diets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diets.is_empty()
    }

    pub fn diets(&self) -> &[Vec<f64>] {
        &self.diets
    }

    pub fn nutrition(&self) -> &[Vec<f64>] {
        &self.nutrition
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Vec<f64>, &Vec<f64>)> + '_ {
        self.diets.iter().zip(self.nutrition.iter())
    }
}
