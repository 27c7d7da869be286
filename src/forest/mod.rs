// public modules
pub mod config;
pub mod core;
pub mod predict;

// private modules
mod setters;

pub use config::ForestConfig;
pub use core::QuantileForest;
pub use predict::QuantilePredictions;
