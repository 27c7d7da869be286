use crate::errors::QuantileForestError;

/// Create a string of all available items.
pub fn items_to_strings(items: Vec<&str>) -> String {
    let mut s = String::new();
    for i in items {
        s.push_str(i);
        s.push_str(&String::from(", "));
    }
    s
}

pub fn fmt_vec_output(v: &[f64]) -> String {
    let mut res = String::new();
    if let Some(last) = v.len().checked_sub(1) {
        if last == 0 {
            return format!("{:.4}", v[0]);
        }
        for n in &v[..last] {
            res.push_str(format!("{:.4}", n).as_str());
            res.push_str(", ");
        }
        res.push_str(format!("{:.4}", &v[last]).as_str());
    }
    res
}

// Validation
pub fn validate_float_parameter(value: f64, min: f64, max: f64, parameter: &str) -> Result<(), QuantileForestError> {
    if value.is_nan() || value < min || max < value {
        let ex_msg = format!("real value within range {} and {}", min, max);
        Err(QuantileForestError::InvalidParameter(
            parameter.to_string(),
            ex_msg,
            value.to_string(),
        ))
    } else {
        Ok(())
    }
}

/// Check every level lies in [0, 1].
///
/// Run once per request, before any point is processed.
pub fn validate_quantiles(quantiles: &[f64]) -> Result<(), QuantileForestError> {
    match quantiles.iter().find(|q| validate_float_parameter(**q, 0.0, 1.0, "quantile").is_err()) {
        Some(q) => Err(QuantileForestError::InvalidQuantile(*q)),
        None => Ok(()),
    }
}

/// Calculate if a value is missing.
///
/// NaN is always treated as missing, whatever the missing value is.
#[inline]
pub fn is_missing(value: &f64, missing: &f64) -> bool {
    value.is_nan() || value == missing
}

/// Greatest common divisor.
#[inline]
pub fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

/// Least common multiple, `None` on overflow.
#[inline]
pub fn checked_lcm(a: u64, b: u64) -> Option<u64> {
    if a == 0 || b == 0 {
        return Some(a.max(b));
    }
    (a / gcd(a, b)).checked_mul(b)
}
