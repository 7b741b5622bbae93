use flate2::read::GzDecoder;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Could not read food catalog `{path}`: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("Malformed food record on line {line}: {source}")]
    Json {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// A single food with its nutrient content per 100g.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FoodRecord {
    pub id: String,
    /// Short display name.
    pub name: String,
    /// Food group label.
    pub group: String,
    /// Long description, only used for filtering.
    pub description: String,
    pub nutrients: HashMap<String, f64>,
}

impl FoodRecord {
    pub fn new(id: &str, name: &str, group: &str) -> Self {
        FoodRecord {
            id: id.to_string(),
            name: name.to_string(),
            group: group.to_string(),
            description: name.to_string(),
            nutrients: HashMap::new(),
        }
    }

    pub fn with_nutrient(mut self, nutrient_id: &str, amount: f64) -> Self {
        self.nutrients.insert(nutrient_id.to_string(), amount);
        self
    }

    /// Amount of a nutrient per 100g, if the database records it.
    pub fn nutrient(&self, nutrient_id: &str) -> Option<f64> {
        self.nutrients.get(nutrient_id).copied()
    }
}

// On-disk shape of a record, one JSON object per line.
#[derive(Deserialize)]
struct RawFoodRecord {
    #[serde(rename = "_id", default)]
    id: String,
    #[serde(default)]
    descrip: String,
    #[serde(default)]
    short_descrip: String,
    #[serde(default)]
    food_group_descrip: String,
    #[serde(default)]
    nutrients: Vec<RawNutrient>,
}

#[derive(Deserialize)]
struct RawNutrient {
    nutrient_id: String,
    #[serde(deserialize_with = "number_or_string")]
    nutrient_val: f64,
}

fn number_or_string<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(f64),
        Text(String),
    }

    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(value) => Ok(value),
        NumberOrString::Text(text) => text.trim().parse().map_err(serde::de::Error::custom),
    }
}

impl From<RawFoodRecord> for FoodRecord {
    fn from(raw: RawFoodRecord) -> Self {
        FoodRecord {
            id: raw.id,
            name: raw.short_descrip,
            group: raw.food_group_descrip,
            description: raw.descrip,
            nutrients: raw
                .nutrients
                .into_iter()
                .map(|n| (n.nutrient_id, n.nutrient_val))
                .collect(),
        }
    }
}

/// Ordered, fully materialized list of foods. The position of a food is its
/// axis in every diet vector.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FoodCatalog {
    foods: Vec<FoodRecord>,
}

impl FoodCatalog {
    pub fn new(foods: Vec<FoodRecord>) -> Self {
        FoodCatalog { foods }
    }

    pub fn len(&self) -> usize {
        self.foods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.foods.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&FoodRecord> {
        self.foods.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FoodRecord> {
        self.foods.iter()
    }

    pub fn foods(&self) -> &[FoodRecord] {
        &self.foods
    }

    /// Per-food amount of one nutrient, missing values read as 0.0.
    pub fn nutrient_column(&self, nutrient_id: &str) -> Vec<f64> {
        self.foods
            .iter()
            .map(|food| food.nutrient(nutrient_id).unwrap_or(0.0))
            .collect()
    }
}

/// Drops foods whose description marks them as processed or otherwise unwanted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FoodFilter {
    /// A food is dropped if its description contains any of these.
    pub words: Vec<String>,
    /// A food is dropped if any comma-separated part of its description is exactly one of these.
    /// The default has `sweetened` and `wheat` as separate entries, so a part reading just
    /// `wheat` is dropped; there is no combined `sweetenedwheat` entry.
    pub splits: Vec<String>,
}

const FILTER_WORDS: [&str; 53] = [
    "applesauce", "mashed", "bacon", "meatless", "beverage", "millet", "breaded", "nectar",
    "bulgur", "noodles", "candied", "oil-roasted", "catsup", "pork", "celery flakes", "chili",
    "products", "chowchow", "puffs", "cocktail", "ranch", "cilantro", "cornmeal", "relish",
    "cornstarch", "rice", "couscous", "soymilk", "dehydrated", "spaghetti", "flour", "spread",
    "franks", "succotash", "fried", "syrup", "groats", "tapioca", "hash", "brown", "taro",
    "hominy", "tomato products", "hummus", "vegetables", "juice", "vegetarian", "lambsquarters",
    "veggie", "liquid from", "vermicelli", "macaroni", "wheat",
];

const FILTER_SPLITS: [&str; 3] = ["sweet", "sweetened", "wheat"];

impl Default for FoodFilter {
    fn default() -> Self {
        FoodFilter {
            words: FILTER_WORDS.iter().map(|w| w.to_string()).collect(),
            splits: FILTER_SPLITS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl FoodFilter {
    pub fn accepts(&self, description: &str) -> bool {
        let description = description.to_lowercase();
        if description.is_empty() {
            return false;
        }
        if self.words.iter().any(|word| description.contains(word.as_str())) {
            return false;
        }
        !description
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .any(|part| self.splits.iter().any(|check| check == part))
    }
}

/// Reads a catalog from JSON lines; anything ending in `.gz` is decompressed first.
pub fn load_catalog(path: &Path, filter: Option<&FoodFilter>) -> Result<FoodCatalog, CatalogError> {
    let io_error = |source| CatalogError::Io {
        path: path.display().to_string(),
        source,
    };
    let file = File::open(path).map_err(io_error)?;
    let gzipped = path.extension().map_or(false, |ext| ext == "gz");
    let reader: Box<dyn Read> = if gzipped {
        Box::new(GzDecoder::new(file))
    } else {
        Box::new(file)
    };

    let catalog = read_catalog(BufReader::new(reader), filter).map_err(|e| match e {
        CatalogError::Io { source, .. } => io_error(source),
        other => other,
    })?;
    info!(
        "Loaded {} foods from {}",
        catalog.len(),
        path.display()
    );
    Ok(catalog)
}

pub fn read_catalog<R: BufRead>(
    reader: R,
    filter: Option<&FoodFilter>,
) -> Result<FoodCatalog, CatalogError> {
    let mut foods = Vec::new();
    let mut dropped = 0usize;

    for (line_number, line) in reader.lines().enumerate() {
        let line = line.map_err(|source| CatalogError::Io {
            path: String::new(),
            source,
        })?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let raw: RawFoodRecord = serde_json::from_str(line).map_err(|source| CatalogError::Json {
            line: line_number + 1,
            source,
        })?;
        if let Some(filter) = filter {
            if !filter.accepts(&raw.descrip) {
                dropped += 1;
                continue;
            }
        }
        foods.push(FoodRecord::from(raw));
    }

    debug!("Kept {} foods, filtered out {}", foods.len(), dropped);
    Ok(FoodCatalog::new(foods))
}
