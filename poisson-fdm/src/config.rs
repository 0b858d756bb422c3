use std::f64::consts::PI;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::boundary::BoundaryProfiles;
use crate::diagnostics::PlotField;
use crate::gradient::EdgeOrder;
use crate::grid::Grid;
use crate::solver::SolverParams;
use crate::source::SourceTerm;

/// Grid configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridConfig {
    #[serde(default = "default_points")]
    pub imax: usize, // points in x
    #[serde(default = "default_points")]
    pub jmax: usize, // points in y
    #[serde(default = "default_range")]
    pub x_range: [f64; 2],
    #[serde(default = "default_range")]
    pub y_range: [f64; 2],
}

fn default_points() -> usize {
    1001
}

fn default_range() -> [f64; 2] {
    [0.0, PI]
}

impl Default for GridConfig {
    fn default() -> Self {
        GridConfig {
            imax: default_points(),
            jmax: default_points(),
            x_range: default_range(),
            y_range: default_range(),
        }
    }
}

impl GridConfig {
    fn validate(&self) -> Result<()> {
        if self.imax < 3 || self.jmax < 3 {
            return Err(anyhow!(
                "Grid needs at least 3 points per direction (imax={}, jmax={})",
                self.imax,
                self.jmax
            ));
        }
        if self.imax > u32::MAX as usize || self.jmax > u32::MAX as usize {
            return Err(anyhow!("Grid dimensions must fit in a u32 header"));
        }
        for (name, range) in [("x_range", self.x_range), ("y_range", self.y_range)] {
            if !range.iter().all(|v| v.is_finite()) || range[1] <= range[0] {
                return Err(anyhow!(
                    "{} must be finite and increasing, got [{}, {}]",
                    name,
                    range[0],
                    range[1]
                ));
            }
        }
        Ok(())
    }

    pub fn build(&self) -> Grid {
        Grid::linspace(self.imax, self.jmax, self.x_range, self.y_range)
    }
}

/// Solver configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverConfig {
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    #[serde(default = "default_report_period")]
    pub report_period: usize,
    #[serde(default)]
    pub source: SourceTerm,
    #[serde(default = "default_data_path")]
    pub output: PathBuf,
}

fn default_max_iterations() -> usize {
    SolverParams::default().max_iterations
}

fn default_tolerance() -> f64 {
    SolverParams::default().tolerance
}

fn default_report_period() -> usize {
    SolverParams::default().report_period
}

fn default_data_path() -> PathBuf {
    PathBuf::from("./bin/data.bin")
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            max_iterations: default_max_iterations(),
            tolerance: default_tolerance(),
            report_period: default_report_period(),
            source: SourceTerm::default(),
            output: default_data_path(),
        }
    }
}

impl SolverConfig {
    fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(anyhow!("max_iterations must be positive"));
        }
        if !(self.tolerance >= 0.0) || !self.tolerance.is_finite() {
            return Err(anyhow!("tolerance must be non-negative, got {}", self.tolerance));
        }
        if !self.source.is_finite() {
            return Err(anyhow!("source term has non-finite parameters: {:?}", self.source));
        }
        Ok(())
    }

    pub fn params(&self) -> SolverParams {
        SolverParams {
            max_iterations: self.max_iterations,
            tolerance: self.tolerance,
            report_period: self.report_period,
        }
    }
}

/// Post-processing configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostConfig {
    #[serde(default = "default_data_path")]
    pub input: PathBuf,
    #[serde(default = "default_field")]
    pub field: PlotField,
    #[serde(default)]
    pub edge_order: EdgeOrder,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>, // defaults to <input dir>/<field>.png
    #[serde(default = "default_image_width")]
    pub image_width: u32,
    #[serde(default = "default_image_height")]
    pub image_height: u32,
    #[serde(default = "default_levels")]
    pub levels: usize,
}

fn default_field() -> PlotField {
    PlotField::Curl
}

fn default_image_width() -> u32 {
    1200
}

fn default_image_height() -> u32 {
    1000
}

fn default_levels() -> usize {
    10
}

impl Default for PostConfig {
    fn default() -> Self {
        PostConfig {
            input: default_data_path(),
            field: default_field(),
            edge_order: EdgeOrder::default(),
            output: None,
            image_width: default_image_width(),
            image_height: default_image_height(),
            levels: default_levels(),
        }
    }
}

impl PostConfig {
    fn validate(&self) -> Result<()> {
        if self.image_width < 100 || self.image_height < 100 {
            return Err(anyhow!(
                "Image dimensions must be at least 100 px (width={}, height={})",
                self.image_width,
                self.image_height
            ));
        }
        if self.levels == 0 {
            return Err(anyhow!("levels must be positive"));
        }
        Ok(())
    }

    pub fn output_path(&self) -> PathBuf {
        match &self.output {
            Some(path) => path.clone(),
            None => self
                .input
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join(format!("{}.png", self.field)),
        }
    }
}

/// Complete configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub grid: GridConfig,
    #[serde(default)]
    pub boundaries: BoundaryProfiles,
    #[serde(default)]
    pub solver: SolverConfig,
    #[serde(default)]
    pub post: PostConfig,
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| anyhow!("Failed to read config file '{}': {}", path.display(), e))?;

        let config: Config =
            toml::from_str(&content).map_err(|e| anyhow!("Failed to parse TOML config: {}", e))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate all configuration parameters
    pub fn validate(&self) -> Result<()> {
        self.grid.validate()?;
        self.solver.validate()?;
        self.post.validate()?;
        if !self.boundaries.is_finite() {
            return Err(anyhow!(
                "boundary profiles have non-finite parameters: {:?}",
                self.boundaries
            ));
        }
        Ok(())
    }

    pub fn log_summary(&self) {
        info!("=== Configuration ===");
        info!(
            "Grid: {}x{} over [{}, {}] x [{}, {}]",
            self.grid.imax,
            self.grid.jmax,
            self.grid.x_range[0],
            self.grid.x_range[1],
            self.grid.y_range[0],
            self.grid.y_range[1]
        );
        info!(
            "Boundaries: N={:?} S={:?} E={:?} W={:?}",
            self.boundaries.north, self.boundaries.south, self.boundaries.east, self.boundaries.west
        );
        info!(
            "Solver: max_iterations={}, tolerance={:e}, source={:?}, output={}",
            self.solver.max_iterations,
            self.solver.tolerance,
            self.solver.source,
            self.solver.output.display()
        );
        info!(
            "Post: input={}, field={}, edge_order={}, image {}x{}, {} levels",
            self.post.input.display(),
            self.post.field,
            u8::from(self.post.edge_order),
            self.post.image_width,
            self.post.image_height,
            self.post.levels
        );
    }
}
