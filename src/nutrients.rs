use serde::{Deserialize, Serialize};

/// One tracked micronutrient. The position of a spec inside [`NutrientTargets`]
/// fixes its axis in every nutrition vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutrientSpec {
    pub name: String,
    /// Nutrient number as used by the nutrient database (e.g. "320" for vitamin A).
    pub id: String,
    pub unit: String,
    /// Recommended daily allowance.
    pub rda: f64,
    /// Upper intake level.
    pub ul: f64,
}

impl NutrientSpec {
    pub fn new(name: &str, id: &str, unit: &str, rda: f64, ul: f64) -> Self {
        NutrientSpec {
            name: name.to_string(),
            id: id.to_string(),
            unit: unit.to_string(),
            rda,
            ul,
        }
    }
}

/// Ordered list of nutrient targets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NutrientTargets {
    specs: Vec<NutrientSpec>,
}

impl NutrientTargets {
    pub fn new(specs: Vec<NutrientSpec>) -> Self {
        NutrientTargets { specs }
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, NutrientSpec> {
        self.specs.iter()
    }

    pub fn specs(&self) -> &[NutrientSpec] {
        &self.specs
    }

    pub fn rda(&self) -> Vec<f64> {
        self.specs.iter().map(|spec| spec.rda).collect()
    }

    pub fn ul(&self) -> Vec<f64> {
        self.specs.iter().map(|spec| spec.ul).collect()
    }

    /// Micronutrient table used when no targets file is given.
    ///
    /// Where a nutrient has no recorded UL a deliberately generous one is used;
    /// where only an AI exists it stands in for the RDA. Iron uses the value for
    /// adult males (the RDA for females 19-50 is 18.0).
    pub fn micronutrients() -> Self {
        NutrientTargets::new(vec![
            NutrientSpec::new("Vitamin A", "320", "mcg", 900.0, 3000.0),
            NutrientSpec::new("Vitamin B6", "415", "mg", 1.7, 100.0),
            NutrientSpec::new("Vitamin B12", "418", "mcg", 2.4, 500.0),
            NutrientSpec::new("Vitamin C", "401", "mg", 90.0, 2000.0),
            NutrientSpec::new("Vitamin E", "323", "mg", 15.0, 1000.0),
            NutrientSpec::new("Folate", "435", "mcg", 400.0, 1000.0),
            NutrientSpec::new("Niacin", "406", "mg", 16.0, 35.0),
            NutrientSpec::new("Riboflavin", "405", "mg", 1.3, 1000.0),
            NutrientSpec::new("Thiamin", "404", "mg", 1.2, 1000.0),
            NutrientSpec::new("Calcium", "301", "mg", 1200.0, 2500.0),
            NutrientSpec::new("Copper", "312", "mcg", 900.0, 10000.0),
            NutrientSpec::new("Iron", "303", "mg", 8.0, 45.0),
            NutrientSpec::new("Magnesium", "304", "mg", 420.0, 10000.0),
            NutrientSpec::new("Manganese", "315", "mg", 2.3, 11.0),
            NutrientSpec::new("Phosphorus", "305", "mg", 700.0, 4000.0),
            NutrientSpec::new("Selenium", "317", "mcg", 55.0, 400.0),
            NutrientSpec::new("Zinc", "309", "mg", 11.0, 40.0),
        ])
    }
}

impl<'a> IntoIterator for &'a NutrientTargets {
    type Item = &'a NutrientSpec;
    type IntoIter = std::slice::Iter<'a, NutrientSpec>;

    fn into_iter(self) -> Self::IntoIter {
        self.specs.iter()
    }
}
