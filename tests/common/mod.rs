//! Common test utilities and data generators.

use faer::{Col, Mat};

/// Capture log output in tests. Safe to call from every test; only the
/// first call installs the logger.
pub fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Deterministic "random" draw in [-1, 1] for reproducibility.
pub fn next_rand(state: &mut u64) -> f64 {
    *state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
    ((*state >> 33) as f64) / (u32::MAX as f64) * 2.0 - 1.0
}

/// Regular side×side grid with unit spacing, one row per location.
pub fn grid_coords(side: usize) -> Mat<f64> {
    Mat::from_fn(side * side, 2, |i, j| {
        if j == 0 {
            (i % side) as f64
        } else {
            (i / side) as f64
        }
    })
}

/// Single-predictor Gaussian data on the given locations:
/// y = intercept + slope·x + noise, with x loosely tied to the coordinates
/// so nearby locations see similar predictor values.
pub fn generate_gwr_data(
    coords: &Mat<f64>,
    intercept: f64,
    slope: f64,
    noise_std: f64,
    seed: u64,
) -> (Mat<f64>, Col<f64>) {
    let n = coords.nrows();
    let mut state = seed;
    let mut x = Mat::zeros(n, 1);
    let mut y = Col::zeros(n);

    for i in 0..n {
        x[(i, 0)] = coords[(i, 0)] + 0.3 * coords[(i, 1)] + 0.5 * next_rand(&mut state);
        y[i] = intercept + slope * x[(i, 0)] + noise_std * next_rand(&mut state);
    }

    (x, y)
}

/// Poisson-style counts with a log-linear mean exp(a + b·x); the draw is a
/// deterministic perturbation of the mean, rounded and clamped to keep the
/// counts valid.
pub fn generate_count_data(coords: &Mat<f64>, a: f64, b: f64, seed: u64) -> (Mat<f64>, Col<f64>) {
    let n = coords.nrows();
    let mut state = seed;
    let mut x = Mat::zeros(n, 1);
    let mut y = Col::zeros(n);

    for i in 0..n {
        x[(i, 0)] = (coords[(i, 0)] + coords[(i, 1)]) / 2.0 + 0.5 * next_rand(&mut state);
        let mu = (a + b * x[(i, 0)]).exp();
        y[i] = (mu + next_rand(&mut state) * mu.sqrt()).round().max(0.0);
    }

    (x, y)
}
