//! Tree
//!
//! Routing of query rows to the leaves of a fitted ensemble.
use crate::errors::QuantileForestError;
use crate::utils::is_missing;
use serde::{Deserialize, Deserializer, Serialize};

/// Maps a query row to the leaf it reaches in every tree of an ensemble.
pub trait LeafRouter: Send + Sync {
    /// Number of trees in the ensemble.
    fn n_trees(&self) -> usize;
    /// Number of leaves of `tree`.
    fn n_leaves(&self, tree: usize) -> usize;
    /// Number of columns a query row needs.
    fn n_features(&self) -> usize;
    /// Write the leaf reached in every tree into `leaves`.
    ///
    /// * `row` - Feature values of a single query point.
    /// * `leaves` - Output buffer of length `n_trees`.
    fn apply_row(&self, row: &[f64], leaves: &mut [usize]);
}

// serde_json writes NaN as null.
fn parse_nan<'de, D>(d: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Deserialize::deserialize(d).map(|x: Option<_>| x.unwrap_or(f64::NAN))
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct Node {
    pub num: usize,
    #[serde(deserialize_with = "parse_nan")]
    pub split_value: f64,
    pub split_feature: usize,
    pub missing_node: usize,
    pub left_child: usize,
    pub right_child: usize,
    pub is_leaf: bool,
    /// Leaf id, only meaningful when `is_leaf`.
    pub leaf_id: usize,
}

impl Node {
    /// A split node, rows with `value < split_value` go left.
    pub fn split(
        num: usize,
        split_feature: usize,
        split_value: f64,
        left_child: usize,
        right_child: usize,
        missing_node: usize,
    ) -> Self {
        Node {
            num,
            split_value,
            split_feature,
            missing_node,
            left_child,
            right_child,
            is_leaf: false,
            leaf_id: 0,
        }
    }

    pub fn leaf(num: usize, leaf_id: usize) -> Self {
        Node {
            num,
            split_value: f64::NAN,
            split_feature: 0,
            missing_node: num,
            left_child: num,
            right_child: num,
            is_leaf: true,
            leaf_id,
        }
    }

    /// Get the path that should be traveled down, given a value.
    pub fn get_child_idx(&self, v: &f64, missing: &f64) -> usize {
        if is_missing(v, missing) {
            self.missing_node
        } else if v < &self.split_value {
            self.left_child
        } else {
            self.right_child
        }
    }
}

/// A fitted axis aligned tree. Node 0 is the root.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct Tree {
    pub nodes: Vec<Node>,
    pub n_leaves: usize,
}

impl Tree {
    /// Create a tree, checking that the nodes form a valid structure.
    pub fn new(nodes: Vec<Node>) -> Result<Self, QuantileForestError> {
        let n_nodes = nodes.len();
        if n_nodes == 0 {
            return Err(QuantileForestError::InvalidParameter(
                "nodes".to_string(),
                "at least one node".to_string(),
                "0".to_string(),
            ));
        }
        for (i, node) in nodes.iter().enumerate() {
            let children = [node.left_child, node.right_child, node.missing_node];
            let bad_child = !node.is_leaf && children.iter().any(|c| *c >= n_nodes || *c <= i);
            if node.num != i || bad_child {
                return Err(QuantileForestError::InvalidParameter(
                    "nodes".to_string(),
                    "nodes numbered by position with children after their parent".to_string(),
                    format!("node {}", i),
                ));
            }
        }
        let n_leaves = nodes.iter().filter(|n| n.is_leaf).map(|n| n.leaf_id + 1).max().unwrap_or(0);
        Ok(Tree { nodes, n_leaves })
    }

    /// Leaf id reached by a row.
    pub fn predict_leaf_row(&self, row: &[f64], missing: &f64) -> usize {
        let mut node_idx = 0;
        loop {
            let node = &self.nodes[node_idx];
            if node.is_leaf {
                return node.leaf_id;
            }
            node_idx = node.get_child_idx(&row[node.split_feature], missing);
        }
    }

    /// One more than the highest feature any split reads.
    pub fn n_features(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| !n.is_leaf)
            .map(|n| n.split_feature + 1)
            .max()
            .unwrap_or(0)
    }
}

/// An ensemble of trees sharing one missing value.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct Forest {
    pub trees: Vec<Tree>,
    #[serde(deserialize_with = "parse_nan")]
    pub missing: f64,
}

impl Forest {
    pub fn new(trees: Vec<Tree>) -> Self {
        Forest {
            trees,
            missing: f64::NAN,
        }
    }

    /// Set the value treated as missing while routing.
    pub fn set_missing(mut self, missing: f64) -> Self {
        self.missing = missing;
        self
    }
}

impl LeafRouter for Forest {
    fn n_trees(&self) -> usize {
        self.trees.len()
    }

    fn n_leaves(&self, tree: usize) -> usize {
        self.trees[tree].n_leaves
    }

    fn n_features(&self) -> usize {
        self.trees.iter().map(|t| t.n_features()).max().unwrap_or(0)
    }

    fn apply_row(&self, row: &[f64], leaves: &mut [usize]) {
        for (leaf, tree) in leaves.iter_mut().zip(&self.trees) {
            *leaf = tree.predict_leaf_row(row, &self.missing);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // x0 < 0 -> leaf 0, otherwise x1 < 5 -> leaf 1, else leaf 2. Missing x0 goes right.
    fn stump() -> Tree {
        Tree::new(vec![
            Node::split(0, 0, 0.0, 1, 2, 2),
            Node::leaf(1, 0),
            Node::split(2, 1, 5.0, 3, 4, 3),
            Node::leaf(3, 1),
            Node::leaf(4, 2),
        ])
        .unwrap()
    }

    #[test]
    fn test_predict_leaf_row() {
        let tree = stump();
        assert_eq!(tree.n_leaves, 3);
        assert_eq!(tree.predict_leaf_row(&[-1.0, 9.0], &f64::NAN), 0);
        assert_eq!(tree.predict_leaf_row(&[0.0, 1.0], &f64::NAN), 1);
        assert_eq!(tree.predict_leaf_row(&[3.0, 5.0], &f64::NAN), 2);
        assert_eq!(tree.predict_leaf_row(&[f64::NAN, f64::NAN], &f64::NAN), 1);
        assert_eq!(tree.predict_leaf_row(&[-99.0, 7.0], &-99.0), 2);
    }

    #[test]
    fn test_n_features() {
        assert_eq!(stump().n_features(), 2);
        let leaf_only = Tree::new(vec![Node::leaf(0, 0)]).unwrap();
        assert_eq!(leaf_only.n_features(), 0);
        let forest = Forest::new(vec![leaf_only, stump()]);
        assert_eq!(forest.n_features(), 2);
        assert_eq!(Forest::new(vec![]).n_features(), 0);
    }

    #[test]
    fn test_forest_apply_row() {
        let forest = Forest::new(vec![stump(), Tree::new(vec![Node::leaf(0, 0)]).unwrap()]);
        assert_eq!(forest.n_trees(), 2);
        assert_eq!(forest.n_leaves(1), 1);
        let mut leaves = vec![0; 2];
        forest.apply_row(&[1.0, 6.0], &mut leaves);
        assert_eq!(leaves, vec![2, 0]);
    }

    #[test]
    fn test_forest_json_keeps_nan() {
        let forest = Forest::new(vec![stump()]);
        let json = serde_json::to_string(&forest).unwrap();
        let loaded: Forest = serde_json::from_str(&json).unwrap();
        assert!(loaded.missing.is_nan());
        assert!(loaded.trees[0].nodes[1].split_value.is_nan());
        assert_eq!(loaded.trees[0].nodes[0], forest.trees[0].nodes[0]);
        assert_eq!(serde_json::to_string(&loaded).unwrap(), json);
    }

    #[test]
    fn test_invalid_tree() {
        assert!(Tree::new(vec![]).is_err());
        // Child pointing back to the root.
        assert!(Tree::new(vec![Node::split(0, 0, 0.0, 0, 1, 1), Node::leaf(1, 0)]).is_err());
        // Child out of range.
        assert!(Tree::new(vec![Node::split(0, 0, 0.0, 1, 5, 1), Node::leaf(1, 0)]).is_err());
    }
}
