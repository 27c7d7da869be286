use crate::aggregate::{aggregate_weights, collect_leaves};
use crate::constants::MAX_REPLICAS;
use crate::data::{Matrix, RowMajorMatrix};
use crate::errors::QuantileForestError;
use crate::forest::core::{check_features, QuantileForest};
use crate::interpolation::Interpolation;
use crate::quantile::{unweighted_mean, unweighted_quantiles, weighted_mean, weighted_quantiles, QuantileSpec};
use crate::tree::LeafRouter;
use crate::utils::fmt_vec_output;
use log::{debug, info, warn};
use rayon::prelude::*;
use std::str::FromStr;

/// Estimates for a batch of query points.
///
/// Every row holds the columns of output 0, then those of output 1, and so on.
#[derive(Debug, Clone, PartialEq)]
pub struct QuantilePredictions {
    pub values: RowMajorMatrix<f64>,
    pub n_outputs: usize,
    /// Columns per output, one per requested level, or one for the mean.
    pub n_columns: usize,
}

impl QuantilePredictions {
    pub fn n_points(&self) -> usize {
        self.values.rows
    }

    /// Estimate of one level (or the mean) for one output of one point.
    pub fn get(&self, point: usize, output: usize, column: usize) -> f64 {
        *self.values.get(point, output * self.n_columns + column)
    }

    /// Every estimate of a point. `NaN` when no leaf held any training sample.
    pub fn point(&self, point: usize) -> &[f64] {
        self.values.get_row(point)
    }
}

impl<R: LeafRouter> QuantileForest<R> {
    /// Leaf reached in every tree, one row per point.
    ///
    /// * `data` - Query points.
    pub fn apply(&self, data: &Matrix<f64>) -> Result<RowMajorMatrix<usize>, QuantileForestError> {
        check_features(&self.router, data)?;
        let n_trees = self.router.n_trees();
        let mut leaves = vec![0; data.rows * n_trees];
        if n_trees == 0 {
            return Ok(RowMajorMatrix::new(leaves, data.rows, 0));
        }
        if self.cfg.parallel {
            data.index
                .par_iter()
                .zip(leaves.par_chunks_mut(n_trees))
                .for_each(|(i, row)| self.router.apply_row(&data.get_row(*i), row));
        } else {
            data.index
                .iter()
                .zip(leaves.chunks_mut(n_trees))
                .for_each(|(i, row)| self.router.apply_row(&data.get_row(*i), row));
        }
        Ok(RowMajorMatrix::new(leaves, data.rows, n_trees))
    }

    /// Predict quantiles for a batch of points.
    ///
    /// The request is validated before any point is processed. A point whose
    /// leaves hold no training sample gets a row of `NaN` and does not fail
    /// the batch.
    ///
    /// * `data` - Query points.
    /// * `quantiles` - Levels to estimate, or the mean.
    /// * `interpolation` - Policy used between two brackets.
    /// * `weighted_quantile` - Use the weighted path. When `false`, the sample
    ///   set is expanded into integer replicas and ranked.
    pub fn predict(
        &self,
        data: &Matrix<f64>,
        quantiles: &QuantileSpec,
        interpolation: Interpolation,
        weighted_quantile: bool,
    ) -> Result<QuantilePredictions, QuantileForestError> {
        quantiles.validate()?;
        check_features(&self.router, data)?;
        let n_columns = quantiles.n_columns();
        let width = self.n_outputs * n_columns;
        debug!(
            "Predicting {} points at levels [{}], interpolation {}, weighted {}, normalization {:?}, aggregate_leaves_first {}.",
            data.rows,
            fmt_vec_output(quantiles.levels()),
            interpolation,
            weighted_quantile,
            self.cfg.normalization,
            self.cfg.aggregate_leaves_first
        );

        let mut values = vec![f64::NAN; data.rows * width];
        let empty = match self.cfg.num_threads {
            Some(n) => {
                let pool = rayon::ThreadPoolBuilder::new().num_threads(n).build().map_err(|e| {
                    QuantileForestError::InvalidParameter("num_threads".to_string(), "a usable pool size".to_string(), e.to_string())
                })?;
                pool.install(|| self.predict_rows(data, quantiles, interpolation, weighted_quantile, &mut values, width))?
            }
            None => self.predict_rows(data, quantiles, interpolation, weighted_quantile, &mut values, width)?,
        };

        info!("Predicted {} points, {} without training samples.", data.rows, empty);
        Ok(QuantilePredictions {
            values: RowMajorMatrix::new(values, data.rows, width),
            n_outputs: self.n_outputs,
            n_columns,
        })
    }

    /// Same as [`QuantileForest::predict`], with the interpolation given by name.
    ///
    /// * `interpolation` - One of "linear", "lower", "higher", "midpoint" or "nearest".
    pub fn predict_with_str(
        &self,
        data: &Matrix<f64>,
        quantiles: &QuantileSpec,
        interpolation: &str,
        weighted_quantile: bool,
    ) -> Result<QuantilePredictions, QuantileForestError> {
        let interpolation = Interpolation::from_str(interpolation)?;
        self.predict(data, quantiles, interpolation, weighted_quantile)
    }

    /// Fill `values` row by row, returning how many points were empty.
    fn predict_rows(
        &self,
        data: &Matrix<f64>,
        quantiles: &QuantileSpec,
        interpolation: Interpolation,
        weighted_quantile: bool,
        values: &mut [f64],
        width: usize,
    ) -> Result<usize, QuantileForestError> {
        if width == 0 || data.rows == 0 {
            return Ok(0);
        }
        let row_fn = |(i, out): (&usize, &mut [f64])| {
            self.predict_row(&data.get_row(*i), quantiles, interpolation, weighted_quantile, out)
        };
        let empty: Vec<bool> = if self.cfg.parallel {
            data.index.par_iter().zip(values.par_chunks_mut(width)).map(row_fn).collect::<Result<_, _>>()?
        } else {
            data.index.iter().zip(values.chunks_mut(width)).map(row_fn).collect::<Result<_, _>>()?
        };
        Ok(empty.iter().filter(|e| **e).count())
    }

    /// Estimate one point into `out`. Returns `true` when the point had no
    /// training samples.
    fn predict_row(
        &self,
        row: &[f64],
        quantiles: &QuantileSpec,
        interpolation: Interpolation,
        weighted_quantile: bool,
        out: &mut [f64],
    ) -> Result<bool, QuantileForestError> {
        let mut leaves = vec![0; self.router.n_trees()];
        self.router.apply_row(row, &mut leaves);
        let estimate = if self.cfg.aggregate_leaves_first {
            self.estimate_pooled(&leaves, quantiles, interpolation, weighted_quantile, out)
        } else {
            self.estimate_per_tree(&leaves, quantiles, interpolation, weighted_quantile, out)
        };
        match estimate {
            Ok(()) => Ok(false),
            Err(QuantileForestError::EmptySampleSet) => {
                out.fill(f64::NAN);
                Ok(true)
            }
            Err(e) => Err(e),
        }
    }

    /// Pool every tree's leaf into one weighted sample set, then estimate.
    fn estimate_pooled(
        &self,
        leaves: &[usize],
        quantiles: &QuantileSpec,
        interpolation: Interpolation,
        weighted_quantile: bool,
        out: &mut [f64],
    ) -> Result<(), QuantileForestError> {
        let set = aggregate_weights(&self.table, leaves, self.cfg.normalization)?;
        if set.is_empty() {
            return Err(QuantileForestError::EmptySampleSet);
        }
        if !weighted_quantile && set.replicas.is_none() {
            warn!(
                "More than {} replicas for a point of {} samples, using weighted quantiles.",
                MAX_REPLICAS,
                set.indices.len()
            );
        }
        let weights = set.exact_weights();
        for (output, chunk) in out.chunks_mut(quantiles.n_columns()).enumerate() {
            let values = set.values(&self.targets, self.n_outputs, output);
            let estimates = match (&set.replicas, weighted_quantile) {
                (Some(replicas), false) => estimate_unweighted(&values, replicas, quantiles, interpolation)?,
                _ => estimate_weighted(&values, &weights, quantiles, interpolation)?,
            };
            chunk.copy_from_slice(&estimates);
        }
        Ok(())
    }

    /// Estimate every tree's leaf on its own and average the estimates.
    fn estimate_per_tree(
        &self,
        leaves: &[usize],
        quantiles: &QuantileSpec,
        interpolation: Interpolation,
        weighted_quantile: bool,
        out: &mut [f64],
    ) -> Result<(), QuantileForestError> {
        let members = collect_leaves(&self.table, leaves)?;
        if members.is_empty() {
            return Err(QuantileForestError::EmptySampleSet);
        }
        out.fill(0.0);
        let n_columns = quantiles.n_columns();
        for m in &members {
            for (output, chunk) in out.chunks_mut(n_columns).enumerate() {
                let values: Vec<f64> = m.iter().map(|i| self.targets[i * self.n_outputs + output]).collect();
                let estimates = if weighted_quantile {
                    estimate_weighted(&values, &vec![1.0; values.len()], quantiles, interpolation)?
                } else {
                    estimate_unweighted(&values, &vec![1; values.len()], quantiles, interpolation)?
                };
                chunk.iter_mut().zip(estimates).for_each(|(o, e)| *o += e);
            }
        }
        let n = members.len() as f64;
        out.iter_mut().for_each(|o| *o /= n);
        Ok(())
    }
}

fn estimate_weighted(
    values: &[f64],
    weights: &[f64],
    quantiles: &QuantileSpec,
    interpolation: Interpolation,
) -> Result<Vec<f64>, QuantileForestError> {
    match quantiles {
        QuantileSpec::Mean => Ok(vec![weighted_mean(values, weights)?]),
        _ => weighted_quantiles(values, weights, quantiles.levels(), interpolation),
    }
}

fn estimate_unweighted(
    values: &[f64],
    replicas: &[u64],
    quantiles: &QuantileSpec,
    interpolation: Interpolation,
) -> Result<Vec<f64>, QuantileForestError> {
    match quantiles {
        QuantileSpec::Mean => Ok(vec![unweighted_mean(values, replicas)?]),
        _ => unweighted_quantiles(values, replicas, quantiles.levels(), interpolation),
    }
}
