// src/core/median.rs

//! Median over a small sequence of doubles.

/// Median of `values`, computed on a sorted copy — `values` is never
/// mutated. An empty sequence reads as `0.0`, which is a deliberate routing
/// signal (an empty group snapshot should read as "cold"), not a missing
/// value.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let n = sorted.len();
    if n % 2 == 0 {
        (sorted[n / 2 - 1] + sorted[n / 2]) * 0.5
    } else {
        sorted[n / 2]
    }
}
