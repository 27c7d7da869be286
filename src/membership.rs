//! Leaf Membership
//!
//! The training samples that fell into every leaf of every tree, stored as
//! one immutable arena indexed by (tree, leaf).
use crate::constants::LEAF_NOT_SAMPLED;
use crate::data::JaggedMatrix;
use crate::errors::QuantileForestError;
use crate::sampler::{LeafSampler, MaxSamplesLeafSampler};
use log::info;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeafMembershipTable {
    /// One column per (tree, leaf), holding ascending training sample indices.
    members: JaggedMatrix<usize>,
    /// Column of the first leaf of every tree, plus the total column count.
    tree_offsets: Vec<usize>,
    n_samples: usize,
}

impl LeafMembershipTable {
    /// Build the table from the leaf each training sample landed in.
    ///
    /// * `leaf_indices` - For every tree, the leaf id of every training sample.
    ///   `LEAF_NOT_SAMPLED` excludes a sample from that tree.
    /// * `n_leaves` - Number of leaves of every tree.
    /// * `sample_counts` - Optional bootstrap multiplicity of every sample in
    ///   every tree; a sample is stored that many times, `0` leaves it out.
    /// * `max_samples_leaf` - Optional cap on the members kept per leaf.
    /// * `rng` - Source of randomness for the leaf subsampling.
    pub fn from_leaf_indices(
        leaf_indices: &[Vec<usize>],
        n_leaves: &[usize],
        sample_counts: Option<&[Vec<usize>]>,
        max_samples_leaf: Option<usize>,
        rng: &mut StdRng,
    ) -> Result<Self, QuantileForestError> {
        if n_leaves.len() != leaf_indices.len() {
            return Err(QuantileForestError::TreeCountMismatch {
                expected: leaf_indices.len(),
                found: n_leaves.len(),
            });
        }
        if let Some(counts) = sample_counts {
            if counts.len() != leaf_indices.len() {
                return Err(QuantileForestError::TreeCountMismatch {
                    expected: leaf_indices.len(),
                    found: counts.len(),
                });
            }
        }
        let mut sampler = match max_samples_leaf {
            Some(0) => {
                return Err(QuantileForestError::InvalidParameter(
                    "max_samples_leaf".to_string(),
                    "a positive integer".to_string(),
                    "0".to_string(),
                ))
            }
            Some(m) => Some(MaxSamplesLeafSampler::new(m)),
            None => None,
        };
        let n_samples = leaf_indices.first().map_or(0, |l| l.len());

        let mut leaves = Vec::with_capacity(leaf_indices.len());
        for (tree, tree_leaves) in leaf_indices.iter().enumerate() {
            check_sample_count(tree_leaves.len(), n_samples)?;
            let counts = sample_counts.map(|c| &c[tree]);
            if let Some(c) = counts {
                check_sample_count(c.len(), n_samples)?;
            }
            let mut members = vec![Vec::new(); n_leaves[tree]];
            for (i, leaf) in tree_leaves.iter().enumerate() {
                if *leaf == LEAF_NOT_SAMPLED {
                    continue;
                }
                let Some(m) = members.get_mut(*leaf) else {
                    return Err(QuantileForestError::LeafOutOfRange {
                        tree,
                        leaf: *leaf,
                        n_leaves: n_leaves[tree],
                    });
                };
                let count = counts.map_or(1, |c| c[i]);
                m.extend(std::iter::repeat(i).take(count));
            }
            if let Some(s) = sampler.as_mut() {
                members.iter_mut().for_each(|m| s.sample(rng, m));
            }
            leaves.push(members);
        }
        let table = Self::assemble(leaves, n_samples);
        info!(
            "Built leaf membership table with {} trees, {} leaves and {} stored members.",
            table.n_trees(),
            table.members.cols,
            table.members.n_records
        );
        Ok(table)
    }

    /// Build the table from explicit leaf members.
    ///
    /// * `leaves` - For every tree, the training sample indices of every leaf.
    /// * `n_samples` - Number of training samples.
    pub fn from_leaf_members(leaves: Vec<Vec<Vec<usize>>>, n_samples: usize) -> Result<Self, QuantileForestError> {
        let mut leaves = leaves;
        for members in leaves.iter_mut().flatten() {
            if let Some(i) = members.iter().find(|i| **i >= n_samples) {
                return Err(QuantileForestError::InvalidParameter(
                    "leaf members".to_string(),
                    format!("sample indices below {}", n_samples),
                    i.to_string(),
                ));
            }
            members.sort_unstable();
        }
        Ok(Self::assemble(leaves, n_samples))
    }

    fn assemble(leaves: Vec<Vec<Vec<usize>>>, n_samples: usize) -> Self {
        let mut tree_offsets = Vec::with_capacity(leaves.len() + 1);
        tree_offsets.push(0);
        for tree in &leaves {
            tree_offsets.push(tree_offsets[tree_offsets.len() - 1] + tree.len());
        }
        let columns: Vec<Vec<usize>> = leaves.into_iter().flatten().collect();
        LeafMembershipTable {
            members: JaggedMatrix::from_vecs(&columns),
            tree_offsets,
            n_samples,
        }
    }

    /// Number of trees in the ensemble.
    pub fn n_trees(&self) -> usize {
        self.tree_offsets.len() - 1
    }

    /// Number of leaves of a tree.
    pub fn n_leaves(&self, tree: usize) -> usize {
        self.tree_offsets[tree + 1] - self.tree_offsets[tree]
    }

    /// Number of training samples the table indexes into.
    pub fn n_samples(&self) -> usize {
        self.n_samples
    }

    /// Training samples that fell into `leaf` of `tree`.
    #[inline]
    pub fn members(&self, tree: usize, leaf: usize) -> Result<&[usize], QuantileForestError> {
        if tree >= self.n_trees() {
            return Err(QuantileForestError::TreeCountMismatch {
                expected: self.n_trees(),
                found: tree + 1,
            });
        }
        let n_leaves = self.n_leaves(tree);
        if leaf >= n_leaves {
            return Err(QuantileForestError::LeafOutOfRange { tree, leaf, n_leaves });
        }
        Ok(self.members.get_col(self.tree_offsets[tree] + leaf))
    }
}

fn check_sample_count(found: usize, n_samples: usize) -> Result<(), QuantileForestError> {
    if found == n_samples {
        Ok(())
    } else {
        Err(QuantileForestError::InvalidParameter(
            "leaf_indices".to_string(),
            format!("{} samples per tree", n_samples),
            found.to_string(),
        ))
    }
}
