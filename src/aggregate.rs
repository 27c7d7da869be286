//! Aggregate
//!
//! Turn the leaves a query point reached in every tree into one set of
//! weighted training samples.
use crate::constants::{ACCUMULATOR_CAPACITY, MAX_REPLICAS};
use crate::errors::QuantileForestError;
use crate::membership::LeafMembershipTable;
use crate::utils::{checked_lcm, items_to_strings};
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// How the trees' leaf memberships are turned into sample weights.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum WeightNormalization {
    /// Every tree contributes a total weight of one, split evenly among the
    /// members of its leaf.
    #[default]
    PerTree,
    /// Every member occurrence contributes a weight of one.
    PerOccurrence,
}

impl FromStr for WeightNormalization {
    type Err = QuantileForestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "per_tree" => Ok(WeightNormalization::PerTree),
            "per_occurrence" => Ok(WeightNormalization::PerOccurrence),
            _ => Err(QuantileForestError::ParseString(
                s.to_string(),
                "WeightNormalization".to_string(),
                items_to_strings(vec!["per_tree", "per_occurrence"]),
            )),
        }
    }
}

/// Training samples sharing a leaf with one query point.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WeightedSampleSet {
    /// Distinct training sample indices, ascending.
    pub indices: Vec<usize>,
    /// Accumulated weight of every sample.
    pub weights: Vec<f64>,
    /// Integer replica counts equal to `weights` times one common scale,
    /// when that scale keeps the replica total representable.
    pub replicas: Option<Vec<u64>>,
}

impl WeightedSampleSet {
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Weights to feed the weighted path.
    ///
    /// The replica counts when available, so the cumulative weights are exact
    /// integers and match the ranks of the unweighted path bit for bit.
    pub fn exact_weights(&self) -> Vec<f64> {
        match &self.replicas {
            Some(r) => r.iter().map(|r| *r as f64).collect(),
            None => self.weights.clone(),
        }
    }

    /// Target values of the samples for one output.
    ///
    /// * `targets` - Row major training targets.
    /// * `n_outputs` - Number of columns in `targets`.
    /// * `output` - Column to read.
    pub fn values(&self, targets: &[f64], n_outputs: usize, output: usize) -> Vec<f64> {
        self.indices.iter().map(|i| targets[i * n_outputs + output]).collect()
    }
}

/// Members of every non-empty leaf reached by a point.
///
/// * `table` - Leaf membership table of the ensemble.
/// * `leaves` - Leaf id reached in every tree.
pub fn collect_leaves<'a>(
    table: &'a LeafMembershipTable,
    leaves: &[usize],
) -> Result<Vec<&'a [usize]>, QuantileForestError> {
    if leaves.len() != table.n_trees() {
        return Err(QuantileForestError::TreeCountMismatch {
            expected: table.n_trees(),
            found: leaves.len(),
        });
    }
    let mut members = Vec::with_capacity(leaves.len());
    for (tree, leaf) in leaves.iter().enumerate() {
        let m = table.members(tree, *leaf)?;
        if !m.is_empty() {
            members.push(m);
        }
    }
    Ok(members)
}

/// Weighted sample set of one query point.
///
/// Weights are accumulated as integer replicas on the lcm of the leaf sizes
/// and divided once, unless the replica total would exceed `MAX_REPLICAS`.
///
/// * `table` - Leaf membership table of the ensemble.
/// * `leaves` - Leaf id reached in every tree.
/// * `normalization` - How leaf memberships become weights.
pub fn aggregate_weights(
    table: &LeafMembershipTable,
    leaves: &[usize],
    normalization: WeightNormalization,
) -> Result<WeightedSampleSet, QuantileForestError> {
    let members = collect_leaves(table, leaves)?;
    let scale = replica_scale(&members, normalization);

    let mut acc: HashMap<usize, (f64, u64)> = HashMap::with_capacity(ACCUMULATOR_CAPACITY);
    for m in &members {
        let (w, r) = match normalization {
            WeightNormalization::PerTree => (1.0 / m.len() as f64, scale.map_or(0, |s| s / m.len() as u64)),
            WeightNormalization::PerOccurrence => (1.0, 1),
        };
        for i in m.iter() {
            let e = acc.entry(*i).or_insert((0.0, 0));
            e.0 += w;
            e.1 += r;
        }
    }

    let mut entries: Vec<(usize, (f64, u64))> = acc.into_iter().collect();
    entries.sort_unstable_by_key(|(i, _)| *i);
    let indices = entries.iter().map(|(i, _)| *i).collect();
    let weights = match scale {
        Some(s) => entries.iter().map(|(_, (_, r))| *r as f64 / s as f64).collect(),
        None => entries.iter().map(|(_, (w, _))| *w).collect(),
    };
    let replicas = scale.map(|_| entries.iter().map(|(_, (_, r))| *r).collect());
    Ok(WeightedSampleSet {
        indices,
        weights,
        replicas,
    })
}

/// Common multiplier turning every weight into an integer replica count.
fn replica_scale(members: &[&[usize]], normalization: WeightNormalization) -> Option<u64> {
    let (scale, per_tree) = match normalization {
        WeightNormalization::PerOccurrence => (1, None),
        WeightNormalization::PerTree => {
            let scale = members.iter().try_fold(1u64, |acc, m| checked_lcm(acc, m.len() as u64))?;
            (scale, Some(scale))
        }
    };
    let total = match per_tree {
        Some(s) => s.checked_mul(members.len() as u64)?,
        None => members.iter().map(|m| m.len() as u64).sum(),
    };
    (total <= MAX_REPLICAS).then_some(scale)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> LeafMembershipTable {
        // Tree 0: {0, 1} | {2, 3}, tree 1: {1, 2, 3} | {0} | {}.
        LeafMembershipTable::from_leaf_members(
            vec![vec![vec![0, 1], vec![2, 3]], vec![vec![1, 2, 3], vec![0], vec![]]],
            4,
        )
        .unwrap()
    }

    #[test]
    fn test_single_tree_uniform() {
        let t = LeafMembershipTable::from_leaf_members(vec![vec![vec![0, 1, 2], vec![3, 4]]], 5).unwrap();
        let set = aggregate_weights(&t, &[0], WeightNormalization::PerTree).unwrap();
        assert_eq!(set.indices, vec![0, 1, 2]);
        assert!(set.weights.iter().all(|w| (w - 1.0 / 3.0).abs() < 1e-12));
        assert_eq!(set.replicas, Some(vec![1, 1, 1]));
        assert_eq!(set.exact_weights(), vec![1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_per_tree_weights() {
        let set = aggregate_weights(&table(), &[0, 0], WeightNormalization::PerTree).unwrap();
        assert_eq!(set.indices, vec![0, 1, 2, 3]);
        let expected = [0.5, 0.5 + 1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0];
        for (w, e) in set.weights.iter().zip(expected) {
            assert!((w - e).abs() < 1e-12);
        }
        // Scale is lcm(2, 3) = 6.
        assert_eq!(set.replicas, Some(vec![3, 5, 2, 2]));
        assert_eq!(set.weights[1], 5.0 / 6.0);
        assert_eq!(set.exact_weights(), vec![3.0, 5.0, 2.0, 2.0]);
    }

    #[test]
    fn test_per_occurrence_weights() {
        let set = aggregate_weights(&table(), &[0, 0], WeightNormalization::PerOccurrence).unwrap();
        assert_eq!(set.indices, vec![0, 1, 2, 3]);
        assert_eq!(set.weights, vec![1.0, 2.0, 1.0, 1.0]);
        assert_eq!(set.replicas, Some(vec![1, 2, 1, 1]));
    }

    #[test]
    fn test_replica_fallback() {
        // lcm(101, 103, 107, 109) * 4 trees is far above the replica cap.
        let sizes = [101, 103, 107, 109];
        let n = sizes.iter().sum::<usize>();
        let mut start = 0;
        let leaves_per_tree = sizes
            .iter()
            .map(|s| {
                let leaf = (start..start + s).collect::<Vec<_>>();
                start += s;
                vec![leaf]
            })
            .collect();
        let t = LeafMembershipTable::from_leaf_members(leaves_per_tree, n).unwrap();
        let set = aggregate_weights(&t, &[0, 0, 0, 0], WeightNormalization::PerTree).unwrap();
        assert_eq!(set.replicas, None);
        assert_eq!(set.indices.len(), n);
        assert_eq!(set.weights[0], 1.0 / 101.0);
        assert_eq!(set.exact_weights(), set.weights);

        let set = aggregate_weights(&t, &[0, 0, 0, 0], WeightNormalization::PerOccurrence).unwrap();
        assert_eq!(set.replicas, Some(vec![1; n]));
    }

    #[test]
    fn test_empty_leaves() {
        // Tree 1 contributes nothing from its empty leaf.
        let set = aggregate_weights(&table(), &[1, 2], WeightNormalization::PerTree).unwrap();
        assert_eq!(set.indices, vec![2, 3]);
        assert_eq!(set.weights, vec![0.5, 0.5]);
        assert_eq!(set.replicas, Some(vec![1, 1]));
        assert_eq!(set.exact_weights(), vec![1.0, 1.0]);

        let t = LeafMembershipTable::from_leaf_members(vec![vec![vec![0], vec![]]], 1).unwrap();
        let set = aggregate_weights(&t, &[1], WeightNormalization::PerTree).unwrap();
        assert!(set.is_empty());
        assert_eq!(set.replicas, Some(vec![]));
    }

    #[test]
    fn test_leaf_errors() {
        assert_eq!(
            aggregate_weights(&table(), &[0], WeightNormalization::PerTree),
            Err(QuantileForestError::TreeCountMismatch { expected: 2, found: 1 })
        );
        assert_eq!(
            aggregate_weights(&table(), &[0, 3], WeightNormalization::PerTree),
            Err(QuantileForestError::LeafOutOfRange {
                tree: 1,
                leaf: 3,
                n_leaves: 3
            })
        );
    }

    #[test]
    fn test_values() {
        let set = aggregate_weights(&table(), &[1, 1], WeightNormalization::PerTree).unwrap();
        assert_eq!(set.weights, vec![1.0, 0.5, 0.5]);
        assert_eq!(set.replicas, Some(vec![2, 1, 1]));
        let targets = [0.0, 10.0, 1.0, 11.0, 2.0, 12.0, 3.0, 13.0];
        assert_eq!(set.values(&targets, 2, 0), vec![0.0, 2.0, 3.0]);
        assert_eq!(set.values(&targets, 2, 1), vec![10.0, 12.0, 13.0]);
    }

    #[test]
    fn test_parse_normalization() {
        assert_eq!("per_tree".parse::<WeightNormalization>().unwrap(), WeightNormalization::PerTree);
        assert_eq!(
            "per_occurrence".parse::<WeightNormalization>().unwrap(),
            WeightNormalization::PerOccurrence
        );
        assert!("per_leaf".parse::<WeightNormalization>().is_err());
    }
}
