//! Finite-difference Poisson solver and gradient diagnostics.
//!
//! `solve` produces a binary solution file for `-div(grad(u)) = f`; `post`
//! reads it back, evaluates curl(grad(u)) and div(grad(u)) by repeated
//! finite differencing and renders a filled contour plot.

pub mod boundary;
pub mod config;
pub mod diagnostics;
pub mod gradient;
pub mod grid;
pub mod io;
pub mod pipeline;
pub mod solver;
pub mod source;
pub mod visualisation;

pub use config::Config;
pub use diagnostics::{Derivatives, Diagnostics, FieldStats, PlotField};
pub use gradient::{gradient, gradient_along, EdgeOrder, GradientError};
pub use grid::{Grid, ScalarField};
pub use io::{read_data_binary, write_data_binary, DataFileError};
pub use solver::{PoissonProblem, SolveReport, SolverError, SolverParams};
