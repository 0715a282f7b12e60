use faer::prelude::*;
use faer::FaerMat;
use faer::Mat;
use linfa_linalg::cholesky::Cholesky;
use linfa_linalg::triangular::{SolveTriangular, UPLO};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// Failure of a covariance solve. The solver never returns a solution it cannot vouch for.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LinalgError {
    #[error("matrix is not positive definite")]
    NotPositiveDefinite,
    #[error("matrix is ill-conditioned (reciprocal condition estimate {rcond:e})")]
    IllConditioned { rcond: f64 },
    #[error("relative residual {residual:e} exceeds tolerance")]
    Inaccurate { residual: f64 },
    #[error("solution contains non-finite values")]
    NonFinite,
    #[error("dimension mismatch: matrix is {rows}x{cols}, right-hand side has {rhs}")]
    Dimension { rows: usize, cols: usize, rhs: usize },
    #[error("{0}")]
    Backend(String),
}

/// Solves `coo · x = rhs` for the symmetric observation covariance of a step.
pub trait CovarianceSolver: Send + Sync {
    fn solve(&self, coo: &Array2<f64>, rhs: &Array1<f64>) -> Result<Array1<f64>, LinalgError>;

    fn name(&self) -> &'static str;
}

/// Linear algebra backend selected in the settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SolverKind {
    #[default]
    Cholesky,
    Lu,
}

impl SolverKind {
    pub fn build(&self) -> Box<dyn CovarianceSolver> {
        match self {
            SolverKind::Cholesky => Box::new(CholeskySolver::default()),
            SolverKind::Lu => Box::new(LuSolver::default()),
        }
    }
}

fn check_dimensions(coo: &Array2<f64>, rhs: &Array1<f64>) -> Result<(), LinalgError> {
    let (rows, cols) = coo.dim();
    if rows != cols || rows != rhs.len() {
        return Err(LinalgError::Dimension {
            rows,
            cols,
            rhs: rhs.len(),
        });
    }
    Ok(())
}

/// Cholesky factorization followed by two triangular solves.
///
/// The factor diagonal gives a cheap reciprocal condition estimate
/// `(min Lᵢᵢ / max Lᵢᵢ)²`; factors below `m · ε · rcond_factor` are rejected.
#[derive(Debug, Clone)]
pub struct CholeskySolver {
    pub rcond_factor: f64,
}

impl Default for CholeskySolver {
    fn default() -> Self {
        CholeskySolver { rcond_factor: 1.0 }
    }
}

impl CovarianceSolver for CholeskySolver {
    fn solve(&self, coo: &Array2<f64>, rhs: &Array1<f64>) -> Result<Array1<f64>, LinalgError> {
        check_dimensions(coo, rhs)?;
        let m = rhs.len();
        if m == 0 {
            return Ok(Array1::zeros(0));
        }

        let l = coo.cholesky().map_err(|e| match e {
            linfa_linalg::LinalgError::NotPositiveDefinite => LinalgError::NotPositiveDefinite,
            other => LinalgError::Backend(other.to_string()),
        })?;

        let diag = l.diag();
        let max = diag.iter().cloned().fold(0.0_f64, f64::max);
        let min = diag.iter().cloned().fold(f64::INFINITY, f64::min);
        let rcond = (min / max).powi(2);
        if !rcond.is_finite() || rcond < m as f64 * f64::EPSILON * self.rcond_factor {
            return Err(LinalgError::IllConditioned { rcond });
        }

        let b = rhs.clone().insert_axis(Axis(1));
        let y = l
            .solve_triangular(&b, UPLO::Lower)
            .map_err(|e| LinalgError::Backend(e.to_string()))?;
        let x = l
            .t()
            .solve_triangular(&y, UPLO::Upper)
            .map_err(|e| LinalgError::Backend(e.to_string()))?;

        let x = x.index_axis_move(Axis(1), 0);
        if x.iter().any(|v| !v.is_finite()) {
            return Err(LinalgError::NonFinite);
        }
        Ok(x)
    }

    fn name(&self) -> &'static str {
        "cholesky"
    }
}

/// Partial-pivoting LU factorization, with an a posteriori residual check.
#[derive(Debug, Clone)]
pub struct LuSolver {
    pub residual_tolerance: f64,
}

impl Default for LuSolver {
    fn default() -> Self {
        LuSolver {
            residual_tolerance: 1e-8,
        }
    }
}

impl CovarianceSolver for LuSolver {
    fn solve(&self, coo: &Array2<f64>, rhs: &Array1<f64>) -> Result<Array1<f64>, LinalgError> {
        check_dimensions(coo, rhs)?;
        let m = rhs.len();
        if m == 0 {
            return Ok(Array1::zeros(0));
        }

        let a = Mat::<f64>::from_fn(m, m, |i, j| coo[[i, j]]);
        let b = Mat::<f64>::from_fn(m, 1, |i, _| rhs[i]);
        let lu = a.partial_piv_lu();
        let sol = lu.solve(b.as_ref());

        let x = Array1::from_shape_fn(m, |i| sol.read(i, 0));
        if x.iter().any(|v| !v.is_finite()) {
            return Err(LinalgError::NonFinite);
        }

        let rhs_norm = rhs.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
        let residual = (coo.dot(&x) - rhs)
            .iter()
            .fold(0.0_f64, |acc, v| acc.max(v.abs()))
            / rhs_norm.max(f64::MIN_POSITIVE);
        if !(residual <= self.residual_tolerance) {
            return Err(LinalgError::Inaccurate { residual });
        }
        Ok(x)
    }

    fn name(&self) -> &'static str {
        "lu"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn solvers() -> Vec<Box<dyn CovarianceSolver>> {
        vec![SolverKind::Cholesky.build(), SolverKind::Lu.build()]
    }

    #[test]
    fn solves_spd_system() {
        let a = array![[4.0, 1.0, 0.5], [1.0, 3.0, 0.2], [0.5, 0.2, 2.0]];
        let x_true = array![1.0, -2.0, 0.5];
        let b = a.dot(&x_true);
        for solver in solvers() {
            let x = solver.solve(&a, &b).unwrap();
            for (xi, ti) in x.iter().zip(x_true.iter()) {
                assert!((xi - ti).abs() < 1e-12, "{}", solver.name());
            }
        }
    }

    #[test]
    fn rejects_duplicate_rows() {
        let a = array![[1.0, 1.0], [1.0, 1.0]];
        let b = array![2.0, 2.0];
        for solver in solvers() {
            assert!(solver.solve(&a, &b).is_err(), "{}", solver.name());
        }
    }

    #[test]
    fn rejects_dimension_mismatch() {
        let a = Array2::<f64>::eye(2);
        let b = array![1.0, 2.0, 3.0];
        assert!(matches!(
            CholeskySolver::default().solve(&a, &b),
            Err(LinalgError::Dimension { rows: 2, cols: 2, rhs: 3 })
        ));
    }

    #[test]
    fn empty_system_has_empty_solution() {
        let a = Array2::<f64>::zeros((0, 0));
        let b = Array1::<f64>::zeros(0);
        assert_eq!(CholeskySolver::default().solve(&a, &b).unwrap().len(), 0);
    }

    #[test]
    fn solver_kind_from_settings_string() {
        let kind: SolverKind = serde_json::from_str("\"lu\"").unwrap();
        assert_eq!(kind, SolverKind::Lu);
        assert_eq!(SolverKind::default(), SolverKind::Cholesky);
    }
}
