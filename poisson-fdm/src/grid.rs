//! Tensor-product grids and the scalar field sampled on them.
//!
//! Every 2D array in this crate is indexed `[[j, i]]`: axis 0 runs along y
//! (`j`), axis 1 runs along x (`i`), so a field has shape `(jmax, imax)`.

use ndarray::{Array1, Array2, Axis};
use thiserror::Error;

/// Axis holding the y (`j`) index.
pub const Y_AXIS: Axis = Axis(0);
/// Axis holding the x (`i`) index.
pub const X_AXIS: Axis = Axis(1);

#[derive(Debug, Error, PartialEq)]
pub enum FieldError {
    #[error("shape mismatch: {name} has shape {found:?}, expected {expected:?}")]
    ShapeMismatch {
        name: &'static str,
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("field is empty")]
    Empty,
}

/// Coordinates of a rectangular tensor grid.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    pub x: Array1<f64>, // length imax
    pub y: Array1<f64>, // length jmax
}

impl Grid {
    pub fn new(x: Array1<f64>, y: Array1<f64>) -> Self {
        Grid { x, y }
    }

    /// Evenly spaced grid over `[x0, x1] × [y0, y1]`, endpoints included.
    pub fn linspace(imax: usize, jmax: usize, x_range: [f64; 2], y_range: [f64; 2]) -> Self {
        Grid {
            x: Array1::linspace(x_range[0], x_range[1], imax),
            y: Array1::linspace(y_range[0], y_range[1], jmax),
        }
    }

    pub fn imax(&self) -> usize {
        self.x.len()
    }

    pub fn jmax(&self) -> usize {
        self.y.len()
    }

    /// Shape of a field living on this grid.
    pub fn shape(&self) -> (usize, usize) {
        (self.jmax(), self.imax())
    }

    pub fn len(&self) -> usize {
        self.imax() * self.jmax()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 2D coordinate arrays `(x[j,i], y[j,i])`.
    pub fn meshgrid(&self) -> (Array2<f64>, Array2<f64>) {
        let shape = self.shape();
        let x = Array2::from_shape_fn(shape, |(_, i)| self.x[i]);
        let y = Array2::from_shape_fn(shape, |(j, _)| self.y[j]);
        (x, y)
    }

    /// Sample `f(x, y)` at every node.
    pub fn sample<F>(&self, f: F) -> Array2<f64>
    where
        F: Fn(f64, f64) -> f64,
    {
        Array2::from_shape_fn(self.shape(), |(j, i)| f(self.x[i], self.y[j]))
    }
}

/// A scalar field `u[j,i]` together with its coordinate arrays.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarField {
    pub x: Array2<f64>,
    pub y: Array2<f64>,
    pub u: Array2<f64>,
}

impl ScalarField {
    pub fn new(x: Array2<f64>, y: Array2<f64>, u: Array2<f64>) -> Result<Self, FieldError> {
        let expected = u.dim();
        if expected.0 == 0 || expected.1 == 0 {
            return Err(FieldError::Empty);
        }
        for (name, found) in [("x", x.dim()), ("y", y.dim())] {
            if found != expected {
                return Err(FieldError::ShapeMismatch {
                    name,
                    expected,
                    found,
                });
            }
        }
        Ok(ScalarField { x, y, u })
    }

    pub fn from_grid(grid: &Grid, u: Array2<f64>) -> Result<Self, FieldError> {
        let (x, y) = grid.meshgrid();
        Self::new(x, y, u)
    }

    /// `(jmax, imax)`
    pub fn dim(&self) -> (usize, usize) {
        self.u.dim()
    }

    /// The 1D x coordinates, taken from the first row.
    pub fn x_axis(&self) -> Array1<f64> {
        self.x.index_axis(Y_AXIS, 0).to_owned()
    }

    /// The 1D y coordinates, taken from the first column.
    pub fn y_axis(&self) -> Array1<f64> {
        self.y.index_axis(X_AXIS, 0).to_owned()
    }
}
