//! Errors
//!
//! Custom error types used throughout the `quantile_forest` crate.
use thiserror::Error;

/// Errors that can occur while building or querying a quantile forest.
#[derive(Debug, Error, PartialEq)]
pub enum QuantileForestError {
    /// A requested quantile level is outside of [0, 1].
    #[error("Quantile level {0} is invalid, quantiles must be in the range [0, 1].")]
    InvalidQuantile(f64),
    /// Invalid value parsing.
    #[error("Invalid value {0} passed for {1}, expected one of {2}.")]
    ParseString(String, String, String),
    /// First value is the name of the parameter, second is expected, third is what was passed.
    #[error("Invalid parameter value passed for {0}, expected {1} but {2} provided.")]
    InvalidParameter(String, String, String),
    /// A leaf id that the tree does not have.
    #[error("Leaf {leaf} is out of range for tree {tree}, which has {n_leaves} leaves.")]
    LeafOutOfRange { tree: usize, leaf: usize, n_leaves: usize },
    /// The router and the membership table disagree on the ensemble size.
    #[error("Expected leaf ids for {expected} trees, but {found} were provided.")]
    TreeCountMismatch { expected: usize, found: usize },
    /// No leaf of the ensemble contributed any weight.
    #[error("The weighted sample set is empty or has zero total weight.")]
    EmptySampleSet,
    /// Training targets must be finite.
    #[error("Training target at sample {0} is not finite.")]
    NonFiniteTarget(usize),
    /// Unable to write model to file.
    #[error("Unable to write model to file: {0}")]
    UnableToWrite(String),
    /// Unable to read model from file.
    #[error("Unable to read model from a file {0}")]
    UnableToRead(String),
}
