/// `n` evenly spaced samples from `lower` to `upper`, both included. A single sample is `lower`.
pub fn linspace(lower: f64, upper: f64, n: usize) -> impl Iterator<Item = f64> {
    let step = if n > 1 {
        (upper - lower) / ((n - 1) as f64)
    } else {
        0.0
    };
    (0..n).map(move |x| lower + step * (x as f64))
}

/// Index of the grid value closest to `value`. Ties go to the lower index.
pub fn nearest_index(grid: &[f64], value: f64) -> Option<usize> {
    grid.iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| (*a - value).abs().total_cmp(&(*b - value).abs()))
        .map(|(i, _)| i)
}
