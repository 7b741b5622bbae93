use thiserror::Error;

pub mod diet_evolution;
pub mod matrix;
pub mod objective;
pub mod vector_ops;

pub use vector_ops::DimensionMismatch;

#[derive(Error, Debug)]
pub enum EvolutionError {
    #[error("The food catalog is empty.")]
    EmptyCatalog,
    #[error("No nutrient targets were given.")]
    EmptyTargets,
    #[error("Nutrient `{name}` needs a positive RDA and UL (got RDA {rda}, UL {ul}).")]
    InvalidTarget { name: String, rda: f64, ul: f64 },
    #[error(transparent)]
    DimensionMismatch(#[from] DimensionMismatch),
    #[error("Invalid population parameters were passed: {0}")]
    BadPopulationParameter(String),
    #[error("The population is empty.")]
    EmptyPopulation,
    #[error("Could not build the diet size distribution: {0}")]
    Sampling(String),
    #[error("Could not build the worker pool: {0}")]
    ThreadPool(String),
}
