//! Unbiased pass@k estimation.

/// Probability that at least one of `k` draws from `n` samples, `c` of which
/// are correct, is correct: `1 - C(n-c, k) / C(n, k)`.
///
/// Computed as a running product to stay within `f64` for large `n`. Returns
/// 0.0 when `n` or `k` is zero and 1.0 when fewer than `k` samples are wrong.
pub fn estimate_pass_at_k(n: usize, c: usize, k: usize) -> f64 {
    if n == 0 || k == 0 {
        return 0.0;
    }
    let c = c.min(n);
    let k = k.min(n);
    if n - c < k {
        return 1.0;
    }
    1.0 - (1..=k).fold(1.0_f64, |acc, i| {
        acc * (n - c - k + i) as f64 / (n - k + i) as f64
    })
}

/// Mean of [`estimate_pass_at_k`] over per-task `(samples, correct)` pairs.
///
/// Tasks without samples are skipped; an empty input yields 0.0.
pub fn mean_pass_at_k(per_task: &[(usize, usize)], k: usize) -> f64 {
    let scored: Vec<f64> = per_task
        .iter()
        .filter(|(n, _)| *n > 0)
        .map(|(n, c)| estimate_pass_at_k(*n, *c, k))
        .collect();
    if scored.is_empty() {
        return 0.0;
    }
    scored.iter().sum::<f64>() / scored.len() as f64
}
