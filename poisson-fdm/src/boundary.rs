//! Dirichlet boundary values on the four sides of the domain.
//!
//! North and south profiles are indexed by `i` (length `imax`), east and
//! west by `j` (length `jmax`).

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::grid::Grid;

/// Shape of the prescribed value along one side, as a function of the
/// coordinate running along that side.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BoundaryProfile {
    #[default]
    Zero,
    Constant {
        value: f64,
    },
    /// `amplitude * sin(wavenumber * s)`
    Sine {
        amplitude: f64,
        #[serde(default = "default_wavenumber")]
        wavenumber: f64,
    },
}

fn default_wavenumber() -> f64 {
    1.0
}

impl BoundaryProfile {
    pub fn evaluate(&self, s: &Array1<f64>) -> Array1<f64> {
        match *self {
            BoundaryProfile::Zero => Array1::zeros(s.len()),
            BoundaryProfile::Constant { value } => Array1::from_elem(s.len(), value),
            BoundaryProfile::Sine {
                amplitude,
                wavenumber,
            } => s.mapv(|v| amplitude * (wavenumber * v).sin()),
        }
    }

    pub fn is_finite(&self) -> bool {
        match *self {
            BoundaryProfile::Zero => true,
            BoundaryProfile::Constant { value } => value.is_finite(),
            BoundaryProfile::Sine {
                amplitude,
                wavenumber,
            } => amplitude.is_finite() && wavenumber.is_finite(),
        }
    }
}

/// Profile per side. Defaults to `sin(y)` on the west side, zero elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundaryProfiles {
    #[serde(default)]
    pub north: BoundaryProfile,
    #[serde(default)]
    pub south: BoundaryProfile,
    #[serde(default)]
    pub east: BoundaryProfile,
    #[serde(default = "default_west")]
    pub west: BoundaryProfile,
}

fn default_west() -> BoundaryProfile {
    BoundaryProfile::Sine {
        amplitude: 1.0,
        wavenumber: 1.0,
    }
}

impl Default for BoundaryProfiles {
    fn default() -> Self {
        BoundaryProfiles {
            north: BoundaryProfile::Zero,
            south: BoundaryProfile::Zero,
            east: BoundaryProfile::Zero,
            west: default_west(),
        }
    }
}

impl BoundaryProfiles {
    pub fn is_finite(&self) -> bool {
        [self.north, self.south, self.east, self.west]
            .iter()
            .all(BoundaryProfile::is_finite)
    }
}

pub struct Boundaries {
    pub north: Array1<f64>, // j = jmax-1
    pub south: Array1<f64>, // j = 0
    pub east: Array1<f64>,  // i = imax-1
    pub west: Array1<f64>,  // i = 0
}

impl Boundaries {
    pub fn new(grid: &Grid, profiles: &BoundaryProfiles) -> Self {
        Boundaries {
            north: profiles.north.evaluate(&grid.x),
            south: profiles.south.evaluate(&grid.x),
            east: profiles.east.evaluate(&grid.y),
            west: profiles.west.evaluate(&grid.y),
        }
    }

    /// Value at boundary node `(i, j)`, or `None` for interior nodes.
    ///
    /// East and west win at the corners.
    pub fn value_at(&self, i: usize, j: usize) -> Option<f64> {
        let imax = self.north.len();
        let jmax = self.west.len();
        if i == 0 {
            Some(self.west[j])
        } else if i == imax - 1 {
            Some(self.east[j])
        } else if j == 0 {
            Some(self.south[i])
        } else if j == jmax - 1 {
            Some(self.north[i])
        } else {
            None
        }
    }
}
