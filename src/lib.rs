pub mod catalog;
pub mod config;
pub mod consts;
pub mod diet;
pub mod evolution;
pub mod nutrients;
pub mod report;

pub use catalog::{load_catalog, FoodCatalog, FoodFilter, FoodRecord};
pub use config::{EvolutionConfig, RunConfig};
pub use diet::Diet;
pub use evolution::diet_evolution::{Driver, DriverEvent, EvolutionResult, GenerationEngine};
pub use evolution::EvolutionError;
pub use nutrients::{NutrientSpec, NutrientTargets};
pub use report::{render_diet, render_first_seen};
