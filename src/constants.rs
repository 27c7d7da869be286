/// Relative tolerance applied to cumulative weights when locating a bracket.
pub const QUANTILE_EPS: f64 = 1e-9;
/// Leaf id marking a sample that did not take part in a tree.
pub const LEAF_NOT_SAMPLED: usize = usize::MAX;
/// Initial capacity of the per point weight accumulator.
pub const ACCUMULATOR_CAPACITY: usize = 64;
/// Largest replica list the unweighted path will materialize for one point.
pub const MAX_REPLICAS: u64 = 1 << 24;
