//! Finite-difference gradient on non-uniform tensor grids.
//!
//! Interior nodes use the three-point central difference, which is second
//! order accurate for arbitrary spacing. Boundary nodes use one-sided
//! differences of first or second order, selected by [`EdgeOrder`].

use ndarray::{Array1, Array2, ArrayView1, ArrayViewMut1, Axis, Zip};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::grid::{X_AXIS, Y_AXIS};

#[derive(Debug, Error, PartialEq)]
pub enum GradientError {
    #[error("axis {axis} has {expected} points but {found} coordinates were given")]
    CoordinateLength {
        axis: usize,
        expected: usize,
        found: usize,
    },

    #[error("axis {axis} has {points} points, edge order {order} needs at least {required}")]
    TooFewPoints {
        axis: usize,
        points: usize,
        order: u8,
        required: usize,
    },

    #[error("coordinates along axis {axis} are not strictly increasing at index {index}")]
    NotIncreasing { axis: usize, index: usize },
}

/// Accuracy of the one-sided differences used at the two ends of an axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum EdgeOrder {
    First,
    #[default]
    Second,
}

impl EdgeOrder {
    /// Fewest points along an axis the boundary stencil can be built on.
    pub fn min_points(self) -> usize {
        match self {
            EdgeOrder::First => 2,
            EdgeOrder::Second => 3,
        }
    }
}

impl TryFrom<u8> for EdgeOrder {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(EdgeOrder::First),
            2 => Ok(EdgeOrder::Second),
            other => Err(format!("edge order must be 1 or 2, got {}", other)),
        }
    }
}

impl From<EdgeOrder> for u8 {
    fn from(order: EdgeOrder) -> u8 {
        match order {
            EdgeOrder::First => 1,
            EdgeOrder::Second => 2,
        }
    }
}

/// Three (index, weight) pairs per node. Unused slots carry zero weight.
type Stencil = [(usize, f64); 3];

fn build_stencils(
    coords: &Array1<f64>,
    axis: usize,
    edge_order: EdgeOrder,
) -> Result<Vec<Stencil>, GradientError> {
    let n = coords.len();
    let mut h = Vec::with_capacity(n.saturating_sub(1));
    for k in 0..n - 1 {
        let step = coords[k + 1] - coords[k];
        // also rejects NaN spacing
        if !(step > 0.0) {
            return Err(GradientError::NotIncreasing { axis, index: k + 1 });
        }
        h.push(step);
    }

    let mut stencils = Vec::with_capacity(n);

    match edge_order {
        EdgeOrder::First => {
            stencils.push([(0, -1.0 / h[0]), (1, 1.0 / h[0]), (0, 0.0)]);
        }
        EdgeOrder::Second => {
            let (h1, h2) = (h[0], h[1]);
            stencils.push([
                (0, -(2.0 * h1 + h2) / (h1 * (h1 + h2))),
                (1, (h1 + h2) / (h1 * h2)),
                (2, -h1 / (h2 * (h1 + h2))),
            ]);
        }
    }

    for k in 1..n - 1 {
        let (h1, h2) = (h[k - 1], h[k]);
        stencils.push([
            (k - 1, -h2 / (h1 * (h1 + h2))),
            (k, (h2 - h1) / (h1 * h2)),
            (k + 1, h1 / (h2 * (h1 + h2))),
        ]);
    }

    let last = n - 1;
    match edge_order {
        EdgeOrder::First => {
            let hl = h[last - 1];
            stencils.push([(last - 1, -1.0 / hl), (last, 1.0 / hl), (last, 0.0)]);
        }
        EdgeOrder::Second => {
            let (h1, h2) = (h[last - 2], h[last - 1]);
            stencils.push([
                (last - 2, h2 / (h1 * (h1 + h2))),
                (last - 1, -(h1 + h2) / (h1 * h2)),
                (last, (2.0 * h2 + h1) / (h2 * (h1 + h2))),
            ]);
        }
    }

    Ok(stencils)
}

fn differentiate_lane(values: ArrayView1<f64>, stencils: &[Stencil], mut out: ArrayViewMut1<f64>) {
    for (d, stencil) in out.iter_mut().zip(stencils) {
        *d = stencil.iter().map(|&(k, w)| w * values[k]).sum();
    }
}

/// Partial derivative of `f` along `axis`, sampled at `coords`.
///
/// The result has the same shape as `f`.
pub fn gradient_along(
    f: &Array2<f64>,
    coords: &Array1<f64>,
    axis: Axis,
    edge_order: EdgeOrder,
) -> Result<Array2<f64>, GradientError> {
    let n = f.len_of(axis);
    if coords.len() != n {
        return Err(GradientError::CoordinateLength {
            axis: axis.index(),
            expected: n,
            found: coords.len(),
        });
    }
    if n < edge_order.min_points() {
        return Err(GradientError::TooFewPoints {
            axis: axis.index(),
            points: n,
            order: edge_order.into(),
            required: edge_order.min_points(),
        });
    }

    let stencils = build_stencils(coords, axis.index(), edge_order)?;
    let mut out = Array2::<f64>::zeros(f.raw_dim());
    Zip::from(out.lanes_mut(axis))
        .and(f.lanes(axis))
        .for_each(|d, v| differentiate_lane(v, &stencils, d));

    Ok(out)
}

/// Both partial derivatives of `f[j,i]`, returned as `(df/dy, df/dx)`.
pub fn gradient(
    f: &Array2<f64>,
    y: &Array1<f64>,
    x: &Array1<f64>,
    edge_order: EdgeOrder,
) -> Result<(Array2<f64>, Array2<f64>), GradientError> {
    let dfdy = gradient_along(f, y, Y_AXIS, edge_order)?;
    let dfdx = gradient_along(f, x, X_AXIS, edge_order)?;
    Ok((dfdy, dfdx))
}
