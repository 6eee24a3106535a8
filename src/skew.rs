//! Skew-symmetric cross-product operator.
use nalgebra::{Matrix3, Vector3};
use rayon::prelude::*;

/// Builds the skew-symmetric matrix `S` of `v`, such that `S * w == v.cross(&w)`
/// # Arguments
/// * `v` - The vector to build the operator for
/// # Returns
/// * The 3x3 cross-product matrix of `v`
/// # Example
/// ```
/// use auv_dynamics::skew::skew;
/// use nalgebra::Vector3;
/// let v = Vector3::new(1.0, 2.0, 3.0);
/// let w = Vector3::new(-4.0, 0.5, 2.0);
/// assert_eq!(skew(&v) * w, v.cross(&w));
/// ```
pub fn skew(v: &Vector3<f64>) -> Matrix3<f64> {
    Matrix3::new(
        0.0, -v[2], v[1], //
        v[2], 0.0, -v[0], //
        -v[1], v[0], 0.0,
    )
}

/// Batched version of [`skew`], one matrix per input vector
pub fn skew_batch(vs: &[Vector3<f64>]) -> Vec<Matrix3<f64>> {
    vs.par_iter().map(skew).collect()
}
