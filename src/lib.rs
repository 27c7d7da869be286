// Modules
pub mod aggregate;
pub mod constants;
pub mod data;
pub mod errors;
pub mod forest;
pub mod interpolation;
pub mod membership;
pub mod quantile;
pub mod sampler;
pub mod tree;
pub mod utils;

// Individual classes, and functions
pub use aggregate::WeightNormalization;
pub use data::Matrix;
pub use errors::QuantileForestError;
pub use forest::{ForestConfig, QuantileForest, QuantilePredictions};
pub use interpolation::Interpolation;
pub use membership::LeafMembershipTable;
pub use quantile::{unweighted_quantiles, weighted_quantiles, QuantileSpec};
pub use tree::{Forest, LeafRouter, Node, Tree};
