use std::fmt;
use std::str::FromStr;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::gradient::{gradient, EdgeOrder, GradientError};
use crate::grid::ScalarField;

/// First and second partial derivatives of a scalar field.
///
/// `d2udydx` is the x-derivative of `dudy`, `d2udxdy` the y-derivative of
/// `dudx`. For smooth data the two agree up to discretisation error.
pub struct Derivatives {
    pub dudy: Array2<f64>,
    pub dudx: Array2<f64>,
    pub d2udydy: Array2<f64>,
    pub d2udydx: Array2<f64>,
    pub d2udxdy: Array2<f64>,
    pub d2udxdx: Array2<f64>,
}

impl Derivatives {
    pub fn compute(field: &ScalarField, edge_order: EdgeOrder) -> Result<Self, GradientError> {
        let x = field.x_axis();
        let y = field.y_axis();

        let (dudy, dudx) = gradient(&field.u, &y, &x, edge_order)?;
        let (d2udydy, d2udydx) = gradient(&dudy, &y, &x, edge_order)?;
        let (d2udxdy, d2udxdx) = gradient(&dudx, &y, &x, edge_order)?;

        Ok(Derivatives {
            dudy,
            dudx,
            d2udydy,
            d2udydx,
            d2udxdy,
            d2udxdx,
        })
    }

    /// curl(grad u), ideally zero everywhere
    pub fn curl_of_gradient(&self) -> Array2<f64> {
        &self.d2udydx - &self.d2udxdy
    }

    /// div(grad u), the discrete Laplacian
    pub fn divergence_of_gradient(&self) -> Array2<f64> {
        &self.d2udxdx + &self.d2udydy
    }
}

pub struct Diagnostics {
    pub curl: Array2<f64>,
    pub div: Array2<f64>,
}

impl Diagnostics {
    pub fn from_derivatives(derivatives: &Derivatives) -> Self {
        Diagnostics {
            curl: derivatives.curl_of_gradient(),
            div: derivatives.divergence_of_gradient(),
        }
    }
}

/// Summary statistics of a field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub rms: f64,
}

impl FieldStats {
    pub fn of(data: &Array2<f64>) -> Self {
        let n = data.len().max(1) as f64;
        let min = data.iter().copied().fold(f64::INFINITY, f64::min);
        let max = data.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mean = data.sum() / n;
        let rms = (data.iter().map(|v| v * v).sum::<f64>() / n).sqrt();
        FieldStats { min, max, mean, rms }
    }

    pub fn max_abs(&self) -> f64 {
        self.min.abs().max(self.max.abs())
    }
}

impl fmt::Display for FieldStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "min={:.4e} max={:.4e} mean={:.4e} rms={:.4e}",
            self.min, self.max, self.mean, self.rms
        )
    }
}

/// Fields that can be selected for plotting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlotField {
    U,
    Dudx,
    Dudy,
    D2udx2,
    D2udy2,
    D2udxdy,
    D2udydx,
    Curl,
    Div,
}

impl PlotField {
    pub const ALL: [PlotField; 9] = [
        PlotField::U,
        PlotField::Dudx,
        PlotField::Dudy,
        PlotField::D2udx2,
        PlotField::D2udy2,
        PlotField::D2udxdy,
        PlotField::D2udydx,
        PlotField::Curl,
        PlotField::Div,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PlotField::U => "u",
            PlotField::Dudx => "dudx",
            PlotField::Dudy => "dudy",
            PlotField::D2udx2 => "d2udx2",
            PlotField::D2udy2 => "d2udy2",
            PlotField::D2udxdy => "d2udxdy",
            PlotField::D2udydx => "d2udydx",
            PlotField::Curl => "curl",
            PlotField::Div => "div",
        }
    }

    /// Pick the selected array out of a computed post-processing result.
    pub fn select<'a>(
        self,
        field: &'a ScalarField,
        derivatives: &'a Derivatives,
        diagnostics: &'a Diagnostics,
    ) -> &'a Array2<f64> {
        match self {
            PlotField::U => &field.u,
            PlotField::Dudx => &derivatives.dudx,
            PlotField::Dudy => &derivatives.dudy,
            PlotField::D2udx2 => &derivatives.d2udxdx,
            PlotField::D2udy2 => &derivatives.d2udydy,
            PlotField::D2udxdy => &derivatives.d2udxdy,
            PlotField::D2udydx => &derivatives.d2udydx,
            PlotField::Curl => &diagnostics.curl,
            PlotField::Div => &diagnostics.div,
        }
    }
}

impl fmt::Display for PlotField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PlotField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PlotField::ALL
            .into_iter()
            .find(|field| field.name() == s)
            .ok_or_else(|| {
                let names: Vec<&str> = PlotField::ALL.iter().map(|f| f.name()).collect();
                format!("Invalid field '{}'. Must be one of: {:?}", s, names)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Grid;

    fn assert_all_close(data: &Array2<f64>, expected: f64, tol: f64) {
        for (idx, &v) in data.indexed_iter() {
            assert!(
                (v - expected).abs() < tol,
                "value {} at {:?} differs from {}",
                v,
                idx,
                expected
            );
        }
    }

    #[test]
    fn test_quadratic_laplacian_is_four() {
        let grid = Grid::linspace(21, 17, [-1.0, 2.0], [0.0, 1.5]);
        let field = ScalarField::from_grid(&grid, grid.sample(|x, y| x * x + y * y)).unwrap();
        let derivatives = Derivatives::compute(&field, EdgeOrder::Second).unwrap();
        let diagnostics = Diagnostics::from_derivatives(&derivatives);

        assert_all_close(&diagnostics.div, 4.0, 1e-8);
        assert_all_close(&diagnostics.curl, 0.0, 1e-8);
    }

    #[test]
    fn test_bilinear_cross_derivatives() {
        let grid = Grid::new(
            ndarray::Array1::from(vec![0.0, 0.2, 0.5, 0.9, 1.4]),
            ndarray::Array1::linspace(-1.0, 1.0, 9),
        );
        let field = ScalarField::from_grid(&grid, grid.sample(|x, y| x * y)).unwrap();
        let d = Derivatives::compute(&field, EdgeOrder::Second).unwrap();

        assert_all_close(&d.d2udxdx, 0.0, 1e-9);
        assert_all_close(&d.d2udydy, 0.0, 1e-9);
        assert_all_close(&d.d2udxdy, 1.0, 1e-9);
        assert_all_close(&d.d2udydx, 1.0, 1e-9);
        assert_all_close(&d.curl_of_gradient(), 0.0, 1e-9);
    }

    #[test]
    fn test_smooth_field_has_small_curl() {
        let grid = Grid::linspace(81, 61, [0.0, 3.0], [0.0, 2.0]);
        let field = ScalarField::from_grid(&grid, grid.sample(|x, y| x.sin() * y.cos())).unwrap();
        let d = Derivatives::compute(&field, EdgeOrder::Second).unwrap();
        let curl = FieldStats::of(&d.curl_of_gradient());
        let div = d.divergence_of_gradient();

        assert!(curl.max_abs() < 1e-2);
        // interior Laplacian of sin(x)cos(y) is -2 sin(x)cos(y)
        let (jmax, imax) = field.dim();
        for j in 2..jmax - 2 {
            for i in 2..imax - 2 {
                let expected = -2.0 * field.u[[j, i]];
                assert!((div[[j, i]] - expected).abs() < 1e-2);
            }
        }
    }

    #[test]
    fn test_recompute_is_bit_identical() {
        let grid = Grid::linspace(33, 29, [0.0, 1.0], [0.0, 1.0]);
        let u = grid.sample(|x, y| (3.0 * x).exp() * (2.0 * y).sin());
        let field = ScalarField::from_grid(&grid, u).unwrap();
        let a = Derivatives::compute(&field, EdgeOrder::Second).unwrap();
        let b = Derivatives::compute(&field, EdgeOrder::Second).unwrap();
        assert_eq!(a.d2udydx, b.d2udydx);
        assert_eq!(a.d2udxdy, b.d2udxdy);
        assert_eq!(
            Diagnostics::from_derivatives(&a).div,
            Diagnostics::from_derivatives(&b).div
        );
    }

    #[test]
    fn test_stats_and_field_names() {
        let data = Array2::from_shape_vec((2, 2), vec![-3.0, 1.0, 1.0, 1.0]).unwrap();
        let stats = FieldStats::of(&data);
        assert_eq!(stats.min, -3.0);
        assert_eq!(stats.max, 1.0);
        assert_eq!(stats.mean, 0.0);
        assert_eq!(stats.rms, 3.0_f64.sqrt());
        assert_eq!(stats.max_abs(), 3.0);

        assert_eq!("curl".parse::<PlotField>(), Ok(PlotField::Curl));
        assert_eq!("d2udxdy".parse::<PlotField>(), Ok(PlotField::D2udxdy));
        assert!("vmag".parse::<PlotField>().is_err());
    }
}
