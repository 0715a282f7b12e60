use ndarray::ArrayViewMut2;
use serde::{Deserialize, Serialize};

use crate::routines::math::nanmean;

/// Controls the relaxation used to fill gaps in a 2D slice
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FillSettings {
    pub max_iterations: usize,
    /// Convergence threshold on the largest update of a sweep
    pub epsilon: f64,
    /// Over-relaxation factor, 1.0 is plain Gauss-Seidel
    pub relaxation: f64,
}

impl Default for FillSettings {
    fn default() -> Self {
        FillSettings {
            max_iterations: 2000,
            epsilon: 1e-4,
            relaxation: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FillOutcome {
    /// Sweeps performed
    pub iterations: usize,
    pub converged: bool,
    /// Number of gap cells that received a value
    pub filled: usize,
}

/// Fill NaN cells of a `(lat, lon)` slice by relaxing the 5-point Laplacian.
///
/// Gap cells start from the mean of the valid cells on their row (0 when the
/// row is empty) and are then swept in place; valid cells are never modified.
/// Edges are mirrored. A slice without a single valid cell is left untouched.
pub fn gauss_seidel(mut slice: ArrayViewMut2<'_, f64>, settings: &FillSettings) -> FillOutcome {
    let (ny, nx) = slice.dim();
    let gaps: Vec<(usize, usize)> = slice
        .indexed_iter()
        .filter(|(_, v)| v.is_nan())
        .map(|(ij, _)| ij)
        .collect();

    if gaps.is_empty() {
        return FillOutcome {
            iterations: 0,
            converged: true,
            filled: 0,
        };
    }
    if gaps.len() == ny * nx {
        return FillOutcome {
            iterations: 0,
            converged: false,
            filled: 0,
        };
    }

    // first guess
    for j in 0..ny {
        let mean = nanmean(slice.row(j).iter());
        let guess = if mean.is_nan() { 0.0 } else { mean };
        for v in slice.row_mut(j).iter_mut().filter(|v| v.is_nan()) {
            *v = guess;
        }
    }

    let mut iterations = 0;
    let mut converged = false;
    while iterations < settings.max_iterations {
        iterations += 1;
        let mut max_update = 0.0_f64;
        for &(j, i) in &gaps {
            let (north, south) = (mirror(j as isize - 1, ny), mirror(j as isize + 1, ny));
            let (west, east) = (mirror(i as isize - 1, nx), mirror(i as isize + 1, nx));
            let average = 0.25
                * (slice[[north, i]] + slice[[south, i]] + slice[[j, west]] + slice[[j, east]]);
            let update = average - slice[[j, i]];
            slice[[j, i]] += settings.relaxation * update;
            max_update = max_update.max(update.abs());
        }
        if max_update < settings.epsilon {
            converged = true;
            break;
        }
    }

    FillOutcome {
        iterations,
        converged,
        filled: gaps.len(),
    }
}

/// Reflect an out-of-range index back into `0..n` without repeating the edge.
fn mirror(index: isize, n: usize) -> usize {
    let last = n as isize - 1;
    let reflected = if index < 0 {
        -index
    } else if index > last {
        2 * last - index
    } else {
        index
    };
    reflected.clamp(0, last) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};

    #[test]
    fn mirrored_indices() {
        assert_eq!(mirror(-1, 4), 1);
        assert_eq!(mirror(4, 4), 2);
        assert_eq!(mirror(2, 4), 2);
        assert_eq!(mirror(-1, 1), 0);
        assert_eq!(mirror(1, 1), 0);
    }

    #[test]
    fn complete_slice_is_untouched() {
        let mut a = array![[1.0, 2.0], [3.0, 4.0]];
        let outcome = gauss_seidel(a.view_mut(), &FillSettings::default());
        assert_eq!(outcome.filled, 0);
        assert!(outcome.converged);
        assert_eq!(a, array![[1.0, 2.0], [3.0, 4.0]]);
    }

    #[test]
    fn empty_slice_stays_nan() {
        let mut a = Array2::from_elem((3, 3), f64::NAN);
        let outcome = gauss_seidel(a.view_mut(), &FillSettings::default());
        assert!(!outcome.converged);
        assert!(a.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn hole_in_linear_field_is_recovered() {
        let mut a = Array2::from_shape_fn((5, 6), |(j, i)| 2.0 * j as f64 + i as f64);
        let truth = a.clone();
        a[[2, 2]] = f64::NAN;
        a[[2, 3]] = f64::NAN;
        a[[3, 2]] = f64::NAN;
        let settings = FillSettings {
            max_iterations: 10_000,
            epsilon: 1e-12,
            relaxation: 1.5,
        };
        let outcome = gauss_seidel(a.view_mut(), &settings);
        assert!(outcome.converged);
        assert_eq!(outcome.filled, 3);
        for (v, t) in a.iter().zip(truth.iter()) {
            assert!((v - t).abs() < 1e-8, "{v} != {t}");
        }
    }

    #[test]
    fn constant_field_fills_with_constant() {
        let mut a = array![[f64::NAN, 7.0, 7.0], [f64::NAN, f64::NAN, 7.0]];
        let outcome = gauss_seidel(a.view_mut(), &FillSettings::default());
        assert!(outcome.converged);
        assert!(a.iter().all(|v| (v - 7.0).abs() < 1e-3));
    }
}
