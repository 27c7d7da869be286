use crate::aggregate::WeightNormalization;
use crate::forest::config::ForestConfig;
use crate::forest::core::QuantileForest;

impl ForestConfig {
    // Set methods for parameters

    /// Set the weight normalization.
    /// * `normalization` - How leaf memberships become sample weights.
    pub fn set_normalization(mut self, normalization: WeightNormalization) -> Self {
        self.normalization = normalization;
        self
    }

    /// Set aggregate_leaves_first.
    /// * `aggregate_leaves_first` - Pool weights across trees before estimating,
    ///   instead of averaging per tree estimates.
    pub fn set_aggregate_leaves_first(mut self, aggregate_leaves_first: bool) -> Self {
        self.aggregate_leaves_first = aggregate_leaves_first;
        self
    }

    /// Set max_samples_leaf.
    /// * `max_samples_leaf` - Cap on the members stored per leaf, `None` keeps all.
    pub fn set_max_samples_leaf(mut self, max_samples_leaf: Option<usize>) -> Self {
        self.max_samples_leaf = max_samples_leaf;
        self
    }

    /// Set the seed of the leaf subsampling generator.
    pub fn set_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set if points are processed in parallel.
    pub fn set_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Set the number of threads.
    /// * `num_threads` - Size of a dedicated pool, `None` uses the global rayon pool.
    pub fn set_num_threads(mut self, num_threads: Option<usize>) -> Self {
        self.num_threads = num_threads;
        self
    }
}

impl<R> QuantileForest<R> {
    /// Set the weight normalization used at prediction time.
    pub fn set_normalization(mut self, normalization: WeightNormalization) -> Self {
        self.cfg.normalization = normalization;
        self
    }

    /// Set aggregate_leaves_first on the forest.
    pub fn set_aggregate_leaves_first(mut self, aggregate_leaves_first: bool) -> Self {
        self.cfg.aggregate_leaves_first = aggregate_leaves_first;
        self
    }

    /// Set if points are processed in parallel.
    pub fn set_parallel(mut self, parallel: bool) -> Self {
        self.cfg.parallel = parallel;
        self
    }

    /// Set the number of threads used for prediction.
    pub fn set_num_threads(mut self, num_threads: Option<usize>) -> Self {
        self.cfg.num_threads = num_threads;
        self
    }
}
