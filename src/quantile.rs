//! Quantile
//!
//! Weighted and unweighted quantile estimation over a weighted sample set.
//!
//! Both paths reduce their input to the same cumulative distribution: the
//! distinct values in ascending order, each anchored at the cumulative weight
//! (or rank) reached once all of its occurrences are counted. A level `q`
//! targets the position `q * total` on that axis. The first anchor at or past
//! it and the next one form the bracket. Linear interpolation instead runs
//! along the same axis rescaled so that the first anchor sits at 0 and the
//! last one at 1.
use crate::constants::QUANTILE_EPS;
use crate::errors::QuantileForestError;
use crate::interpolation::Interpolation;
use crate::utils::validate_quantiles;
use serde::{Deserialize, Serialize};

/// What to estimate for every query point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum QuantileSpec {
    /// A single level, returned as a single column.
    Single(f64),
    /// An ordered list of levels, one column each.
    Levels(Vec<f64>),
    /// The weighted mean of the sample set.
    Mean,
}

impl QuantileSpec {
    /// Levels requested, empty for the mean.
    pub fn levels(&self) -> &[f64] {
        match self {
            QuantileSpec::Single(q) => std::slice::from_ref(q),
            QuantileSpec::Levels(q) => q,
            QuantileSpec::Mean => &[],
        }
    }

    /// Number of output columns per target.
    pub fn n_columns(&self) -> usize {
        match self {
            QuantileSpec::Mean => 1,
            _ => self.levels().len(),
        }
    }

    /// Validate every level up front.
    pub fn validate(&self) -> Result<(), QuantileForestError> {
        if let QuantileSpec::Levels(q) = self {
            if q.is_empty() {
                return Err(QuantileForestError::InvalidParameter(
                    "quantiles".to_string(),
                    "at least one level".to_string(),
                    "an empty list".to_string(),
                ));
            }
        }
        validate_quantiles(self.levels())
    }
}

impl From<f64> for QuantileSpec {
    fn from(q: f64) -> Self {
        QuantileSpec::Single(q)
    }
}

impl From<Vec<f64>> for QuantileSpec {
    fn from(q: Vec<f64>) -> Self {
        QuantileSpec::Levels(q)
    }
}

/// Sorted distinct values and their cumulative weights.
#[derive(Debug)]
struct CumulativeDistribution {
    values: Vec<f64>,
    cumulative: Vec<f64>,
}

impl CumulativeDistribution {
    fn from_weighted(values: &[f64], weights: &[f64]) -> Result<Self, QuantileForestError> {
        check_lengths(values.len(), weights.len())?;
        if let Some(w) = weights.iter().find(|w| !(**w >= 0.0) || w.is_infinite()) {
            return Err(QuantileForestError::InvalidParameter(
                "weight".to_string(),
                "finite non-negative weights".to_string(),
                w.to_string(),
            ));
        }
        let mut idx: Vec<usize> = (0..values.len()).filter(|i| weights[*i] > 0.0).collect();
        idx.sort_unstable_by(|a, b| values[*a].total_cmp(&values[*b]));

        let mut distinct = Vec::with_capacity(idx.len());
        let mut cumulative = Vec::with_capacity(idx.len());
        let mut total = 0.0;
        for i in idx {
            total += weights[i];
            push_or_merge(&mut distinct, &mut cumulative, values[i], total);
        }
        Self::checked(distinct, cumulative)
    }

    /// Materialize every replica and count by plain rank.
    fn from_replicas(values: &[f64], replicas: &[u64]) -> Result<Self, QuantileForestError> {
        check_lengths(values.len(), replicas.len())?;
        let n = replicas
            .iter()
            .try_fold(0usize, |acc, r| usize::try_from(*r).ok().and_then(|r| acc.checked_add(r)))
            .ok_or_else(|| {
                QuantileForestError::InvalidParameter(
                    "replicas".to_string(),
                    "a total replica count that fits in memory".to_string(),
                    "an overflowing count".to_string(),
                )
            })?;
        let mut expanded = Vec::with_capacity(n);
        for (v, r) in values.iter().zip(replicas) {
            expanded.extend(std::iter::repeat(*v).take(*r as usize));
        }
        expanded.sort_unstable_by(|a, b| a.total_cmp(b));

        let mut distinct = Vec::new();
        let mut cumulative = Vec::new();
        for (rank, v) in expanded.iter().enumerate() {
            push_or_merge(&mut distinct, &mut cumulative, *v, (rank + 1) as f64);
        }
        Self::checked(distinct, cumulative)
    }

    fn checked(values: Vec<f64>, cumulative: Vec<f64>) -> Result<Self, QuantileForestError> {
        match cumulative.last() {
            Some(total) if *total > 0.0 => Ok(CumulativeDistribution { values, cumulative }),
            _ => Err(QuantileForestError::EmptySampleSet),
        }
    }

    fn total(&self) -> f64 {
        self.cumulative[self.cumulative.len() - 1]
    }

    /// Brackets of `q * total`.
    ///
    /// The lower bracket is the first anchor at or past the target, the
    /// upper one the next anchor. They coincide when the target sits on an
    /// anchor or the lower bracket is the last one.
    fn bracket(&self, q: f64) -> (usize, usize) {
        let last = self.cumulative.len() - 1;
        let total = self.total();
        let g = q * total;
        let tol = QUANTILE_EPS * total;
        let lo = self.cumulative.partition_point(|c| *c < g - tol).min(last);
        if lo == last || (self.cumulative[lo] - g).abs() <= tol {
            (lo, lo)
        } else {
            (lo, lo + 1)
        }
    }

    /// Linear interpolation along the normalized cumulative weights, which
    /// place the first anchor at 0 and the last one at 1.
    fn linear(&self, q: f64) -> f64 {
        let last = self.cumulative.len() - 1;
        let first = self.cumulative[0];
        let span = self.total() - first;
        let tol = QUANTILE_EPS * self.total();
        if span <= tol {
            return self.values[0];
        }
        let t = first + q * span;
        let j = self.cumulative.partition_point(|c| *c <= t + tol).saturating_sub(1);
        if j == last || (t - self.cumulative[j]).abs() <= tol {
            return self.values[j];
        }
        let frac = ((t - self.cumulative[j]) / (self.cumulative[j + 1] - self.cumulative[j])).clamp(0.0, 1.0);
        self.values[j] + frac * (self.values[j + 1] - self.values[j])
    }

    fn quantile(&self, q: f64, interpolation: Interpolation) -> f64 {
        let last = self.values.len() - 1;
        if q <= 0.0 {
            return self.values[0];
        }
        if q >= 1.0 {
            return self.values[last];
        }
        let (lo, hi) = self.bracket(q);
        interpolation.resolve(self.values[lo], self.values[hi], self.linear(q), QUANTILE_EPS)
    }

    fn quantiles(&self, quantiles: &[f64], interpolation: Interpolation) -> Vec<f64> {
        quantiles.iter().map(|q| self.quantile(*q, interpolation)).collect()
    }
}

#[inline]
fn push_or_merge(values: &mut Vec<f64>, cumulative: &mut Vec<f64>, value: f64, position: f64) {
    match (values.last(), cumulative.last_mut()) {
        (Some(last), Some(c)) if *last == value => *c = position,
        _ => {
            values.push(value);
            cumulative.push(position);
        }
    }
}

fn check_lengths(n_values: usize, n_weights: usize) -> Result<(), QuantileForestError> {
    if n_values == n_weights {
        Ok(())
    } else {
        Err(QuantileForestError::InvalidParameter(
            "weights".to_string(),
            format!("{} weights", n_values),
            n_weights.to_string(),
        ))
    }
}

/// Weighted quantiles.
///
/// * `values` - Observed values.
/// * `weights` - Non-negative weight of every value.
/// * `quantiles` - Levels in [0, 1], any order.
/// * `interpolation` - Policy used between two brackets.
pub fn weighted_quantiles(
    values: &[f64],
    weights: &[f64],
    quantiles: &[f64],
    interpolation: Interpolation,
) -> Result<Vec<f64>, QuantileForestError> {
    validate_quantiles(quantiles)?;
    let dist = CumulativeDistribution::from_weighted(values, weights)?;
    Ok(dist.quantiles(quantiles, interpolation))
}

/// Unweighted quantiles over `values` replicated `replicas[i]` times.
///
/// Yields exactly what [`weighted_quantiles`] yields for the same integer
/// weights, at the cost of sorting the full replica list.
pub fn unweighted_quantiles(
    values: &[f64],
    replicas: &[u64],
    quantiles: &[f64],
    interpolation: Interpolation,
) -> Result<Vec<f64>, QuantileForestError> {
    validate_quantiles(quantiles)?;
    let dist = CumulativeDistribution::from_replicas(values, replicas)?;
    Ok(dist.quantiles(quantiles, interpolation))
}

/// Weighted mean of `values`.
pub fn weighted_mean(values: &[f64], weights: &[f64]) -> Result<f64, QuantileForestError> {
    check_lengths(values.len(), weights.len())?;
    let (sum, total) = values
        .iter()
        .zip(weights)
        .fold((0.0, 0.0), |(s, t), (v, w)| (s + v * w, t + w));
    if values.is_empty() || !(total > 0.0) {
        return Err(QuantileForestError::EmptySampleSet);
    }
    Ok(sum / total)
}

/// Mean of `values` replicated `replicas[i]` times.
pub fn unweighted_mean(values: &[f64], replicas: &[u64]) -> Result<f64, QuantileForestError> {
    let counts: Vec<f64> = replicas.iter().map(|r| *r as f64).collect();
    weighted_mean(values, &counts)
}
