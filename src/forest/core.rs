//! Quantile Forest
//!
//! The fitted ensemble: a leaf router, the shared membership table and the
//! training targets.
use crate::data::Matrix;
use crate::errors::QuantileForestError;
use crate::forest::config::ForestConfig;
use crate::membership::LeafMembershipTable;
use crate::tree::LeafRouter;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::sync::Arc;

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct QuantileForest<R> {
    pub cfg: ForestConfig,
    pub(crate) router: R,
    pub(crate) table: Arc<LeafMembershipTable>,
    /// Row major training targets, `n_samples x n_outputs`.
    pub(crate) targets: Vec<f64>,
    pub(crate) n_outputs: usize,
}

impl<R: LeafRouter> QuantileForest<R> {
    /// Assemble a forest from a router and an already built table.
    ///
    /// * `router` - Maps query rows to leaves.
    /// * `table` - Training members of every leaf of `router`.
    /// * `targets` - Row major training targets, `n_samples x n_outputs`.
    /// * `n_outputs` - Number of targets per sample.
    /// * `cfg` - Forest configuration.
    pub fn new(
        router: R,
        table: impl Into<Arc<LeafMembershipTable>>,
        targets: Vec<f64>,
        n_outputs: usize,
        cfg: ForestConfig,
    ) -> Result<Self, QuantileForestError> {
        let table = table.into();
        if router.n_trees() != table.n_trees() {
            return Err(QuantileForestError::TreeCountMismatch {
                expected: table.n_trees(),
                found: router.n_trees(),
            });
        }
        if let Some(t) = (0..table.n_trees()).find(|t| router.n_leaves(*t) > table.n_leaves(*t)) {
            return Err(QuantileForestError::LeafOutOfRange {
                tree: t,
                leaf: router.n_leaves(t) - 1,
                n_leaves: table.n_leaves(t),
            });
        }
        check_targets(&targets, table.n_samples(), n_outputs)?;
        Ok(QuantileForest {
            cfg,
            router,
            table,
            targets,
            n_outputs,
        })
    }

    /// Route the training rows through `router` and build the membership table.
    ///
    /// * `router` - Maps rows to leaves.
    /// * `data` - Training features.
    /// * `targets` - Row major training targets, `data.rows x n_outputs`.
    /// * `n_outputs` - Number of targets per sample.
    /// * `sample_counts` - Optional per tree bootstrap multiplicity of every sample.
    /// * `cfg` - Forest configuration, `max_samples_leaf` and `seed` drive the
    ///   leaf subsampling.
    pub fn from_training(
        router: R,
        data: &Matrix<f64>,
        targets: Vec<f64>,
        n_outputs: usize,
        sample_counts: Option<&[Vec<usize>]>,
        cfg: ForestConfig,
    ) -> Result<Self, QuantileForestError> {
        check_targets(&targets, data.rows, n_outputs)?;
        check_features(&router, data)?;
        let n_trees = router.n_trees();
        let route = |i: &usize| {
            let mut leaves = vec![0; n_trees];
            router.apply_row(&data.get_row(*i), &mut leaves);
            leaves
        };
        let rows: Vec<Vec<usize>> = if cfg.parallel {
            data.index.par_iter().map(route).collect()
        } else {
            data.index.iter().map(route).collect()
        };
        let leaf_indices: Vec<Vec<usize>> = (0..n_trees).map(|t| rows.iter().map(|r| r[t]).collect()).collect();
        let n_leaves: Vec<usize> = (0..n_trees).map(|t| router.n_leaves(t)).collect();

        let mut rng = StdRng::seed_from_u64(cfg.seed);
        let table =
            LeafMembershipTable::from_leaf_indices(&leaf_indices, &n_leaves, sample_counts, cfg.max_samples_leaf, &mut rng)?;
        Self::new(router, table, targets, n_outputs, cfg)
    }
}

impl<R> QuantileForest<R> {
    pub fn router(&self) -> &R {
        &self.router
    }

    /// Shared handle to the membership table.
    pub fn table(&self) -> Arc<LeafMembershipTable> {
        Arc::clone(&self.table)
    }

    pub fn targets(&self) -> &[f64] {
        &self.targets
    }

    pub fn n_outputs(&self) -> usize {
        self.n_outputs
    }
}

impl<R: Serialize> QuantileForest<R> {
    /// Save a forest as a json object to a file.
    ///
    /// * `path` - Path to save forest.
    pub fn save_forest(&self, path: &str) -> Result<(), QuantileForestError> {
        let model = self.json_dump()?;
        match fs::write(path, model) {
            Err(e) => Err(QuantileForestError::UnableToWrite(e.to_string())),
            Ok(_) => Ok(()),
        }
    }

    /// Dump a forest as a json object
    pub fn json_dump(&self) -> Result<String, QuantileForestError> {
        match serde_json::to_string(self) {
            Ok(s) => Ok(s),
            Err(e) => Err(QuantileForestError::UnableToWrite(e.to_string())),
        }
    }
}

impl<R: DeserializeOwned> QuantileForest<R> {
    /// Load a forest from Json string
    ///
    /// * `json_str` - String object, which can be serialized to json.
    pub fn from_json(json_str: &str) -> Result<Self, QuantileForestError> {
        match serde_json::from_str::<QuantileForest<R>>(json_str) {
            Ok(m) => Ok(m),
            Err(e) => Err(QuantileForestError::UnableToRead(e.to_string())),
        }
    }

    /// Load a forest from a path to a json forest object.
    ///
    /// * `path` - Path to load forest from.
    pub fn load_forest(path: &str) -> Result<Self, QuantileForestError> {
        let json_str = match fs::read_to_string(path) {
            Ok(s) => Ok(s),
            Err(e) => Err(QuantileForestError::UnableToRead(e.to_string())),
        }?;
        Self::from_json(&json_str)
    }
}

fn check_targets(targets: &[f64], n_samples: usize, n_outputs: usize) -> Result<(), QuantileForestError> {
    if n_outputs == 0 || targets.len() != n_samples * n_outputs {
        return Err(QuantileForestError::InvalidParameter(
            "targets".to_string(),
            format!("{} samples with at least one output", n_samples),
            format!("{} values for {} outputs", targets.len(), n_outputs),
        ));
    }
    match targets.iter().position(|v| !v.is_finite()) {
        Some(i) => Err(QuantileForestError::NonFiniteTarget(i / n_outputs)),
        None => Ok(()),
    }
}

/// Reject query rows too short for the features the router splits on.
pub(crate) fn check_features<R: LeafRouter>(router: &R, data: &Matrix<f64>) -> Result<(), QuantileForestError> {
    let n_features = router.n_features();
    if data.cols < n_features {
        return Err(QuantileForestError::InvalidParameter(
            "data".to_string(),
            format!("at least {} columns", n_features),
            data.cols.to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::tree::{Forest, Node, Tree};

    /// Single split on feature 0: samples 0..3 in leaf 0, samples 3..5 in leaf 1.
    pub(crate) fn toy_forest(cfg: ForestConfig) -> QuantileForest<Forest> {
        let data_vec = toy_data();
        let data = Matrix::new(&data_vec, 5, 2);
        QuantileForest::from_training(toy_router(), &data, vec![-2.0, -1.0, 0.0, 1.0, 2.0], 1, None, cfg).unwrap()
    }

    pub(crate) fn toy_router() -> Forest {
        Forest::new(vec![Tree::new(vec![
            Node::split(0, 0, 0.0, 1, 2, 2),
            Node::leaf(1, 0),
            Node::leaf(2, 1),
        ])
        .unwrap()])
    }

    /// Column major rows [-1, -1] x 3 and [1, 1] x 2.
    pub(crate) fn toy_data() -> Vec<f64> {
        vec![-1.0, -1.0, -1.0, 1.0, 1.0, -1.0, -1.0, -1.0, 1.0, 1.0]
    }

    #[test]
    fn test_from_training() {
        let forest = toy_forest(ForestConfig::default());
        let table = forest.table();
        assert_eq!(table.n_trees(), 1);
        assert_eq!(table.members(0, 0).unwrap(), &[0, 1, 2]);
        assert_eq!(table.members(0, 1).unwrap(), &[3, 4]);
        assert_eq!(forest.n_outputs(), 1);
        assert_eq!(forest.targets().len(), 5);
    }

    #[test]
    fn test_from_training_max_samples_leaf() {
        let forest = toy_forest(ForestConfig::default().set_max_samples_leaf(Some(1)).set_seed(5));
        let table = forest.table();
        assert_eq!(table.members(0, 0).unwrap().len(), 1);
        assert_eq!(table.members(0, 1).unwrap().len(), 1);
        let again = toy_forest(ForestConfig::default().set_max_samples_leaf(Some(1)).set_seed(5));
        assert_eq!(*again.table(), *table);
    }

    #[test]
    fn test_new_validation() {
        let table = LeafMembershipTable::from_leaf_members(vec![vec![vec![0, 1, 2], vec![3, 4]]], 5).unwrap();
        let cfg = ForestConfig::default();
        assert!(matches!(
            QuantileForest::new(toy_router(), table.clone(), vec![0.0; 4], 1, cfg.clone()),
            Err(QuantileForestError::InvalidParameter(..))
        ));
        assert!(matches!(
            QuantileForest::new(toy_router(), table.clone(), vec![0.0, 1.0, f64::NAN, 0.0, 0.0], 1, cfg.clone()),
            Err(QuantileForestError::NonFiniteTarget(2))
        ));
        let two_trees = LeafMembershipTable::from_leaf_members(vec![vec![vec![0]], vec![vec![0]]], 5).unwrap();
        assert!(matches!(
            QuantileForest::new(toy_router(), two_trees, vec![0.0; 5], 1, cfg.clone()),
            Err(QuantileForestError::TreeCountMismatch { expected: 2, found: 1 })
        ));
        let one_leaf = LeafMembershipTable::from_leaf_members(vec![vec![vec![0, 1, 2, 3, 4]]], 5).unwrap();
        assert!(matches!(
            QuantileForest::new(toy_router(), one_leaf, vec![0.0; 5], 1, cfg.clone()),
            Err(QuantileForestError::LeafOutOfRange { .. })
        ));
        assert!(QuantileForest::new(toy_router(), table, vec![0.0; 5], 1, cfg).is_ok());
    }

    #[test]
    fn test_json_round_trip() {
        let forest = toy_forest(ForestConfig::default().set_seed(9));
        let json = forest.json_dump().unwrap();
        let loaded = QuantileForest::<Forest>::from_json(&json).unwrap();
        assert_eq!(loaded.cfg, forest.cfg);
        assert_eq!(*loaded.table(), *forest.table());
        assert_eq!(loaded.targets(), forest.targets());
        assert_eq!(loaded.router().trees[0].nodes[0], forest.router().trees[0].nodes[0]);
        assert_eq!(loaded.json_dump().unwrap(), json);
        assert!(matches!(
            QuantileForest::<Forest>::from_json("{"),
            Err(QuantileForestError::UnableToRead(_))
        ));
    }
}
