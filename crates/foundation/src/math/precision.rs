//! Total ordering for distances in meters.
//!
//! Ranking and nearest-building lookups sort raw `f64` distances. Those come
//! from trigonometry on user-supplied coordinates, so a NaN can appear and
//! `-0.0` can appear for a fix sitting exactly on a vertex.

use core::cmp::Ordering;

/// Folds `-0.0` into `0.0` and every NaN payload into one positive NaN.
pub fn canonical_f64(v: f64) -> f64 {
    if v.is_nan() {
        f64::NAN
    } else if v == 0.0 {
        0.0
    } else {
        v
    }
}

/// Orders two distances; NaN sorts after every number.
pub fn cmp_distance_m(a: f64, b: f64) -> Ordering {
    canonical_f64(a).total_cmp(&canonical_f64(b))
}
