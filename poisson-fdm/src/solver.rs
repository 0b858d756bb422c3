//! Finite-difference solver for `-div(grad(u)) = f` with Dirichlet
//! boundaries, using a matrix-free 5-point stencil and Jacobi-preconditioned
//! conjugate gradients.

use ndarray::{Array1, Array2, Zip};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::boundary::{Boundaries, BoundaryProfiles};
use crate::grid::Grid;
use crate::source::SourceTerm;

#[derive(Debug, Error, PartialEq)]
pub enum SolverError {
    #[error("grid must have at least 3 x 3 points, got {imax} x {jmax}")]
    GridTooSmall { imax: usize, jmax: usize },

    #[error("{axis} coordinates are not strictly increasing at index {index}")]
    NotIncreasing { axis: char, index: usize },

    #[error("iteration failure: residual is {residual} at iteration {iteration}")]
    Diverged { iteration: usize, residual: f64 },
}

#[derive(Debug, Clone, Copy)]
pub struct SolverParams {
    pub max_iterations: usize,
    pub tolerance: f64,       // on the RMS residual
    pub report_period: usize, // log every this many iterations
}

impl Default for SolverParams {
    fn default() -> Self {
        SolverParams {
            max_iterations: 5000,
            tolerance: 1e-15,
            report_period: 100,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolveReport {
    pub iterations: usize,
    pub residual: f64,
    pub converged: bool,
}

/// Second-difference weights along one axis for interior nodes.
///
/// For node `k` with spacings `h1 = c[k]-c[k-1]`, `h2 = c[k+1]-c[k]`:
/// `lower = -2/(h1(h1+h2))`, `centre = 2/(h1 h2)`, `upper = -2/(h2(h1+h2))`.
struct AxisWeights {
    lower: Array1<f64>,
    centre: Array1<f64>,
    upper: Array1<f64>,
}

impl AxisWeights {
    fn new(coords: &Array1<f64>, axis: char) -> Result<Self, SolverError> {
        let n = coords.len();
        for k in 1..n {
            if !(coords[k] > coords[k - 1]) {
                return Err(SolverError::NotIncreasing { axis, index: k });
            }
        }

        let mut lower = Array1::zeros(n);
        let mut centre = Array1::zeros(n);
        let mut upper = Array1::zeros(n);
        for k in 1..n - 1 {
            let h1 = coords[k] - coords[k - 1];
            let h2 = coords[k + 1] - coords[k];
            lower[k] = -2.0 / (h1 * (h1 + h2));
            centre[k] = 2.0 / (h1 * h2);
            upper[k] = -2.0 / (h2 * (h1 + h2));
        }
        Ok(AxisWeights {
            lower,
            centre,
            upper,
        })
    }
}

pub struct PoissonProblem {
    pub grid: Grid,
    pub boundaries: Boundaries,
    pub source: SourceTerm,
    wx: AxisWeights,
    wy: AxisWeights,
}

impl PoissonProblem {
    pub fn new(
        grid: Grid,
        profiles: &BoundaryProfiles,
        source: SourceTerm,
    ) -> Result<Self, SolverError> {
        if grid.imax() < 3 || grid.jmax() < 3 {
            return Err(SolverError::GridTooSmall {
                imax: grid.imax(),
                jmax: grid.jmax(),
            });
        }
        let wx = AxisWeights::new(&grid.x, 'x')?;
        let wy = AxisWeights::new(&grid.y, 'y')?;
        let boundaries = Boundaries::new(&grid, profiles);

        Ok(Self {
            grid,
            boundaries,
            source,
            wx,
            wy,
        })
    }

    fn is_boundary(&self, i: usize, j: usize) -> bool {
        i == 0 || j == 0 || i == self.grid.imax() - 1 || j == self.grid.jmax() - 1
    }

    /// Apply the system matrix: identity rows on the boundary, the 5-point
    /// stencil inside.
    pub fn apply(&self, p: &Array2<f64>, out: &mut Array2<f64>) {
        let (jmax, imax) = self.grid.shape();
        for j in 0..jmax {
            for i in 0..imax {
                out[[j, i]] = if self.is_boundary(i, j) {
                    p[[j, i]]
                } else {
                    self.wy.lower[j] * p[[j - 1, i]]
                        + self.wx.lower[i] * p[[j, i - 1]]
                        + (self.wx.centre[i] + self.wy.centre[j]) * p[[j, i]]
                        + self.wx.upper[i] * p[[j, i + 1]]
                        + self.wy.upper[j] * p[[j + 1, i]]
                }
            }
        }
    }

    /// Diagonal of the system matrix.
    pub fn diagonal(&self) -> Array2<f64> {
        Array2::from_shape_fn(self.grid.shape(), |(j, i)| {
            if self.is_boundary(i, j) {
                1.0
            } else {
                self.wx.centre[i] + self.wy.centre[j]
            }
        })
    }

    /// Right-hand side: boundary values on the boundary, the source inside.
    pub fn rhs(&self) -> Array2<f64> {
        let mut b = self.grid.sample(|x, y| self.source.value(x, y));
        for ((j, i), value) in b.indexed_iter_mut() {
            if let Some(boundary) = self.boundaries.value_at(i, j) {
                *value = boundary;
            }
        }
        b
    }

    /// Starting iterate: boundary values on the boundary, zero inside.
    pub fn initial_guess(&self) -> Array2<f64> {
        Array2::from_shape_fn(self.grid.shape(), |(j, i)| {
            self.boundaries.value_at(i, j).unwrap_or(0.0)
        })
    }

    pub fn solve(&self, params: &SolverParams) -> Result<(Array2<f64>, SolveReport), SolverError> {
        let shape = self.grid.shape();
        let n = self.grid.len() as f64;

        let b = self.rhs();
        let inv_diag = self.diagonal().mapv(|d| 1.0 / d);
        let mut u = self.initial_guess();

        let mut ap = Array2::<f64>::zeros(shape);
        self.apply(&u, &mut ap);
        let mut r = &b - &ap;
        let mut p = Array2::<f64>::zeros(shape);

        let mut err = rms(&r, n);
        if !err.is_finite() {
            return Err(SolverError::Diverged {
                iteration: 0,
                residual: err,
            });
        }
        info!(
            "Starting PCG: {} x {} grid, tolerance {:e}, at most {} iterations",
            self.grid.imax(),
            self.grid.jmax(),
            params.tolerance,
            params.max_iterations
        );

        let mut kappa = 0;
        let mut rz_old = 0.0;
        while kappa < params.max_iterations && err > params.tolerance {
            let z = &r * &inv_diag;
            let rz = dot(&r, &z);
            kappa += 1;

            if kappa == 1 {
                p.assign(&z);
            } else {
                let beta = rz / rz_old;
                Zip::from(&mut p).and(&z).for_each(|p, &z| *p = z + beta * *p);
            }

            self.apply(&p, &mut ap);
            let alpha = rz / dot(&p, &ap);
            u.scaled_add(alpha, &p);
            r.scaled_add(-alpha, &ap);
            rz_old = rz;

            err = rms(&r, n);
            if !err.is_finite() {
                return Err(SolverError::Diverged {
                    iteration: kappa,
                    residual: err,
                });
            }

            if params.report_period > 0 && kappa % params.report_period == 0 {
                info!("kappa = {:<5} err = {:.4e}", kappa, err);
            } else {
                debug!("kappa = {:<5} err = {:.4e}", kappa, err);
            }
        }

        let report = SolveReport {
            iterations: kappa,
            residual: err,
            converged: err <= params.tolerance,
        };
        if report.converged {
            info!("PCG converged after {} iterations, err = {:.4e}", kappa, err);
        } else {
            warn!(
                "PCG stopped at the iteration limit ({}) with err = {:.4e}",
                kappa, err
            );
        }
        Ok((u, report))
    }
}

fn dot(a: &Array2<f64>, b: &Array2<f64>) -> f64 {
    Zip::from(a).and(b).fold(0.0, |acc, &x, &y| acc + x * y)
}

fn rms(r: &Array2<f64>, n: f64) -> f64 {
    (dot(r, r) / n).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::BoundaryProfile;

    fn params(tolerance: f64) -> SolverParams {
        SolverParams {
            tolerance,
            report_period: 0,
            ..SolverParams::default()
        }
    }

    fn dirichlet_from(grid: &Grid, exact: &Array2<f64>) -> Boundaries {
        Boundaries {
            north: exact.row(grid.jmax() - 1).to_owned(),
            south: exact.row(0).to_owned(),
            east: exact.column(grid.imax() - 1).to_owned(),
            west: exact.column(0).to_owned(),
        }
    }

    #[test]
    fn test_stencil_is_exact_for_quadratics() {
        let grid = Grid::new(
            Array1::from(vec![0.0, 0.1, 0.3, 0.6, 1.0]),
            Array1::from(vec![0.0, 0.5, 0.7, 1.2]),
        );
        let problem =
            PoissonProblem::new(grid.clone(), &BoundaryProfiles::default(), SourceTerm::Zero)
                .unwrap();
        let u = grid.sample(|x, y| x * x + 3.0 * y * y);
        let mut au = Array2::zeros(grid.shape());
        problem.apply(&u, &mut au);
        // -(2 + 6) inside
        for j in 1..3 {
            for i in 1..4 {
                assert!((au[[j, i]] + 8.0).abs() < 1e-10);
            }
        }
        assert_eq!(au[[0, 2]], u[[0, 2]]);
    }

    #[test]
    fn test_pcg_recovers_constant_source_solution() {
        // u = -(x^2 + y^2)/4 solves -lap(u) = 1 and is reproduced exactly by the stencil
        let grid = Grid::linspace(17, 13, [0.0, 1.0], [0.0, 1.0]);
        let exact = grid.sample(|x, y| -(x * x + y * y) / 4.0);
        let mut problem = PoissonProblem::new(
            grid.clone(),
            &BoundaryProfiles::default(),
            SourceTerm::Constant { value: 1.0 },
        )
        .unwrap();
        problem.boundaries = dirichlet_from(&grid, &exact);

        let (u, report) = problem.solve(&params(1e-10)).unwrap();
        assert!(report.converged);
        let err = (&u - &exact).mapv(f64::abs).fold(0.0_f64, |a, &b| a.max(b));
        assert!(err < 1e-8, "max error {}", err);
    }

    #[test]
    fn test_linear_boundaries_give_linear_solution() {
        // u = x + y is discretely harmonic, so it is the exact solution
        let grid = Grid::linspace(9, 7, [0.0, 2.0], [0.0, 1.0]);
        let exact = grid.sample(|x, y| x + y);
        let mut problem =
            PoissonProblem::new(grid.clone(), &BoundaryProfiles::default(), SourceTerm::Zero)
                .unwrap();
        problem.boundaries = dirichlet_from(&grid, &exact);

        let (u, report) = problem.solve(&params(1e-11)).unwrap();
        assert!(report.converged);
        assert!(report.iterations > 0);
        for ((j, i), &v) in u.indexed_iter() {
            assert!(
                (v - exact[[j, i]]).abs() < 1e-9,
                "u[{}, {}] = {}, expected {}",
                j,
                i,
                v,
                exact[[j, i]]
            );
        }
    }

    #[test]
    fn test_constant_boundaries_give_constant_solution() {
        let grid = Grid::linspace(9, 7, [0.0, 2.0], [0.0, 1.0]);
        let profiles = BoundaryProfiles {
            north: BoundaryProfile::Constant { value: 5.0 },
            south: BoundaryProfile::Constant { value: 5.0 },
            east: BoundaryProfile::Constant { value: 5.0 },
            west: BoundaryProfile::Constant { value: 5.0 },
        };
        let problem = PoissonProblem::new(grid, &profiles, SourceTerm::Zero).unwrap();
        let (u, report) = problem.solve(&params(1e-11)).unwrap();
        assert!(report.converged);
        assert!(u.iter().all(|&v| (v - 5.0).abs() < 1e-9));
    }

    #[test]
    fn test_zero_residual_needs_no_iterations() {
        let grid = Grid::linspace(5, 5, [0.0, 1.0], [0.0, 1.0]);
        let profiles = BoundaryProfiles {
            west: BoundaryProfile::Zero,
            ..BoundaryProfiles::default()
        };
        let problem = PoissonProblem::new(grid, &profiles, SourceTerm::Zero).unwrap();
        let (u, report) = problem.solve(&params(1e-15)).unwrap();
        assert_eq!(report.iterations, 0);
        assert!(report.converged);
        assert!(u.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_iteration_limit_is_reported() {
        let grid = Grid::linspace(21, 21, [0.0, 1.0], [0.0, 1.0]);
        let problem =
            PoissonProblem::new(grid, &BoundaryProfiles::default(), SourceTerm::Zero).unwrap();
        let limited = SolverParams {
            max_iterations: 3,
            tolerance: 1e-15,
            report_period: 1,
        };
        let (_, report) = problem.solve(&limited).unwrap();
        assert_eq!(report.iterations, 3);
        assert!(!report.converged);
    }

    #[test]
    fn test_non_finite_source_diverges() {
        let grid = Grid::linspace(5, 5, [0.0, 1.0], [0.0, 1.0]);
        let problem = PoissonProblem::new(
            grid,
            &BoundaryProfiles::default(),
            SourceTerm::Constant { value: f64::NAN },
        )
        .unwrap();
        assert!(matches!(
            problem.solve(&params(1e-12)),
            Err(SolverError::Diverged { iteration: 0, .. })
        ));
    }

    #[test]
    fn test_rejects_small_or_unordered_grids() {
        let small = Grid::linspace(2, 5, [0.0, 1.0], [0.0, 1.0]);
        assert!(matches!(
            PoissonProblem::new(small, &BoundaryProfiles::default(), SourceTerm::Zero),
            Err(SolverError::GridTooSmall { imax: 2, jmax: 5 })
        ));

        let unordered = Grid::new(
            Array1::from(vec![0.0, 2.0, 1.0]),
            Array1::linspace(0.0, 1.0, 3),
        );
        assert!(matches!(
            PoissonProblem::new(unordered, &BoundaryProfiles::default(), SourceTerm::Zero),
            Err(SolverError::NotIncreasing { axis: 'x', index: 2 })
        ));
    }
}
