use serde::{Deserialize, Serialize};

/// Right-hand side `f(x, y)` of `-div(grad(u)) = f`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceTerm {
    #[default]
    Zero,
    Constant {
        value: f64,
    },
    /// `amplitude * sin(kx x) * sin(ky y)`
    SineProduct {
        amplitude: f64,
        #[serde(default = "default_wavenumber")]
        kx: f64,
        #[serde(default = "default_wavenumber")]
        ky: f64,
    },
}

fn default_wavenumber() -> f64 {
    1.0
}

impl SourceTerm {
    pub fn value(&self, x: f64, y: f64) -> f64 {
        match *self {
            SourceTerm::Zero => 0.0,
            SourceTerm::Constant { value } => value,
            SourceTerm::SineProduct { amplitude, kx, ky } => {
                amplitude * (kx * x).sin() * (ky * y).sin()
            }
        }
    }

    pub fn is_finite(&self) -> bool {
        match *self {
            SourceTerm::Zero => true,
            SourceTerm::Constant { value } => value.is_finite(),
            SourceTerm::SineProduct { amplitude, kx, ky } => {
                amplitude.is_finite() && kx.is_finite() && ky.is_finite()
            }
        }
    }
}
