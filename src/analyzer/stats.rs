//! Reusable statistical helpers for report payloads.

/// Arithmetic mean. Returns 0.0 if the slice is empty.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Percentile with linear interpolation. `p` is in [0, 1].
/// Returns 0.0 if the slice is empty.
pub fn percentile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let n = sorted.len();
    let k = (n - 1) as f64 * p.clamp(0.0, 1.0);
    let f = k.floor() as usize;
    let c = (f + 1).min(n - 1);
    if f == c {
        sorted[f]
    } else {
        sorted[f] + (sorted[c] - sorted[f]) * (k - f as f64)
    }
}

pub fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// `part / whole * 100` rounded to one decimal, 0 when `whole` is 0.
pub fn pct(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        round1(part as f64 / whole as f64 * 100.0)
    }
}

/// Same as [`pct`] with two decimals.
pub fn pct2(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        round2(part as f64 / whole as f64 * 100.0)
    }
}

/// Seconds to hours.
pub fn hours(seconds: f64) -> f64 {
    seconds / 3600.0
}

/// Chart colors: `hsl(i*37 mod 360 60% 52%)`.
pub fn palette(n: usize) -> Vec<String> {
    hsl_palette(n, 37, 60, 52)
}

pub fn hsl_palette(n: usize, step: usize, saturation: u8, lightness: u8) -> Vec<String> {
    (0..n)
        .map(|i| format!("hsl({} {}% {}%)", (i * step) % 360, saturation, lightness))
        .collect()
}
