//! Forest Configuration
//!
//! Settings used while building the membership table and while predicting.
use crate::aggregate::WeightNormalization;
use serde::{Deserialize, Serialize};

fn default_aggregate_leaves_first() -> bool {
    true
}
fn default_max_samples_leaf() -> Option<usize> {
    None
}
fn default_seed() -> u64 {
    0
}
fn default_parallel() -> bool {
    true
}
fn default_num_threads() -> Option<usize> {
    None
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ForestConfig {
    /// How leaf memberships become sample weights.
    #[serde(default)]
    pub normalization: WeightNormalization,
    /// Pool the weights of every tree before estimating. When `false`, every
    /// tree's leaf is estimated on its own and the estimates are averaged.
    #[serde(default = "default_aggregate_leaves_first")]
    pub aggregate_leaves_first: bool,
    /// Cap on the members stored per leaf.
    #[serde(default = "default_max_samples_leaf")]
    pub max_samples_leaf: Option<usize>,
    /// Seed of the generator used for leaf subsampling.
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Process query points in parallel.
    #[serde(default = "default_parallel")]
    pub parallel: bool,
    /// Size of a dedicated thread pool, the global rayon pool when `None`.
    #[serde(default = "default_num_threads")]
    pub num_threads: Option<usize>,
}

impl Default for ForestConfig {
    fn default() -> Self {
        ForestConfig {
            normalization: WeightNormalization::default(),
            aggregate_leaves_first: default_aggregate_leaves_first(),
            max_samples_leaf: default_max_samples_leaf(),
            seed: default_seed(),
            parallel: default_parallel(),
            num_threads: default_num_threads(),
        }
    }
}
