//! Weighted linear algebra shared by the solvers.

use faer::{Col, Mat};

/// Weighted Gram matrix XᵗWX for a diagonal weight vector.
pub fn weighted_gram(x: &Mat<f64>, weights: &Col<f64>) -> Mat<f64> {
    let n = x.nrows();
    let k = x.ncols();

    let mut xtwx = Mat::zeros(k, k);
    for a in 0..k {
        for b in 0..k {
            let mut sum = 0.0;
            for i in 0..n {
                sum += x[(i, a)] * weights[i] * x[(i, b)];
            }
            xtwx[(a, b)] = sum;
        }
    }

    xtwx
}

/// Weighted transpose XᵗW, the k×n map from responses to normal-equation
/// right-hand sides.
pub fn weighted_transpose(x: &Mat<f64>, weights: &Col<f64>) -> Mat<f64> {
    Mat::from_fn(x.ncols(), x.nrows(), |a, i| x[(i, a)] * weights[i])
}

/// Invert a square matrix through its QR decomposition.
///
/// Returns `None` when any diagonal entry of R falls below `rank_tolerance`
/// in absolute value, signalling rank deficiency.
pub fn qr_inverse(a: &Mat<f64>, rank_tolerance: f64) -> Option<Mat<f64>> {
    let k = a.nrows();

    let qr = a.as_ref().qr();
    let q = qr.compute_Q();
    let r = qr.R().to_owned();

    for i in 0..k {
        if r[(i, i)].abs() < rank_tolerance {
            return None;
        }
    }

    // A⁻¹ = R⁻¹Qᵗ, one column at a time: R x = Qᵗ e_j.
    let mut inverse = Mat::zeros(k, k);
    for j in 0..k {
        let rhs = Col::from_fn(k, |i| q[(j, i)]);
        let col = back_substitute(&r, &rhs);
        for i in 0..k {
            inverse[(i, j)] = col[i];
        }
    }

    Some(inverse)
}

/// Solve the upper-triangular system R x = rhs.
fn back_substitute(r: &Mat<f64>, rhs: &Col<f64>) -> Col<f64> {
    let k = r.nrows();
    let mut x = Col::zeros(k);

    for i in (0..k).rev() {
        let mut sum = rhs[i];
        for j in (i + 1)..k {
            sum -= r[(i, j)] * x[j];
        }
        x[i] = sum / r[(i, i)];
    }

    x
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weighted_gram_unit_weights_is_xtx() {
        let x = Mat::from_fn(4, 2, |i, j| (i + 2 * j) as f64);
        let w = Col::from_fn(4, |_| 1.0);

        let gram = weighted_gram(&x, &w);

        for a in 0..2 {
            for b in 0..2 {
                let expected: f64 = (0..4).map(|i| x[(i, a)] * x[(i, b)]).sum();
                assert!((gram[(a, b)] - expected).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_weighted_gram_is_symmetric() {
        let x = Mat::from_fn(5, 3, |i, j| ((i * 3 + j) as f64).sin());
        let w = Col::from_fn(5, |i| 0.1 + i as f64);

        let gram = weighted_gram(&x, &w);

        for a in 0..3 {
            for b in 0..3 {
                assert!((gram[(a, b)] - gram[(b, a)]).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_weighted_transpose_scales_rows() {
        let x = Mat::from_fn(3, 2, |i, j| (i + j) as f64);
        let w = Col::from_fn(3, |i| (i + 1) as f64);

        let xtw = weighted_transpose(&x, &w);

        assert_eq!(xtw.nrows(), 2);
        assert_eq!(xtw.ncols(), 3);
        for a in 0..2 {
            for i in 0..3 {
                assert!((xtw[(a, i)] - x[(i, a)] * w[i]).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_qr_inverse_recovers_identity() {
        let mut a = Mat::zeros(3, 3);
        a[(0, 0)] = 4.0;
        a[(0, 1)] = 1.0;
        a[(1, 0)] = 1.0;
        a[(1, 1)] = 3.0;
        a[(1, 2)] = 0.5;
        a[(2, 1)] = 0.5;
        a[(2, 2)] = 2.0;

        let inv = qr_inverse(&a, 1e-10).unwrap();
        let product = &a * &inv;

        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((product[(i, j)] - expected).abs() < 1e-10);
            }
        }
    }

    #[test]
    fn test_qr_inverse_known_2x2() {
        let mut a = Mat::zeros(2, 2);
        a[(0, 0)] = 2.0;
        a[(0, 1)] = 1.0;
        a[(1, 0)] = 1.0;
        a[(1, 1)] = 1.0;

        // det = 1, inverse = [[1, -1], [-1, 2]]
        let inv = qr_inverse(&a, 1e-10).unwrap();

        assert!((inv[(0, 0)] - 1.0).abs() < 1e-10);
        assert!((inv[(0, 1)] + 1.0).abs() < 1e-10);
        assert!((inv[(1, 0)] + 1.0).abs() < 1e-10);
        assert!((inv[(1, 1)] - 2.0).abs() < 1e-10);
    }

    #[test]
    fn test_qr_inverse_nonsymmetric_orientation() {
        let mut a = Mat::zeros(2, 2);
        a[(0, 0)] = 1.0;
        a[(0, 1)] = 2.0;
        a[(1, 1)] = 1.0;

        // Upper triangular, inverse = [[1, -2], [0, 1]]
        let inv = qr_inverse(&a, 1e-10).unwrap();

        assert!((inv[(0, 0)] - 1.0).abs() < 1e-10);
        assert!((inv[(0, 1)] + 2.0).abs() < 1e-10);
        assert!(inv[(1, 0)].abs() < 1e-10);
        assert!((inv[(1, 1)] - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_qr_inverse_detects_rank_deficiency() {
        // Second column is twice the first.
        let mut a = Mat::zeros(2, 2);
        a[(0, 0)] = 1.0;
        a[(0, 1)] = 2.0;
        a[(1, 0)] = 3.0;
        a[(1, 1)] = 6.0;

        assert!(qr_inverse(&a, 1e-10).is_none());
    }
}
