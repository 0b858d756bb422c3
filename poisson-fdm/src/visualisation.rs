use std::path::Path;

use ndarray::Array2;
use plotters::prelude::*;
use thiserror::Error;
use tracing::info;

use crate::grid::{FieldError, ScalarField};

#[derive(Debug, Error)]
pub enum PlotError {
    #[error(transparent)]
    Shape(#[from] FieldError),

    #[error("cannot create output directory for '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("need at least 2 points per axis to plot, got {imax} x {jmax}")]
    TooFewPoints { imax: usize, jmax: usize },

    #[error("drawing failed: {0}")]
    Drawing(String),
}

fn drawing<E: std::fmt::Display>(e: E) -> PlotError {
    PlotError::Drawing(e.to_string())
}

/// Equal-width bands between the smallest and largest finite value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContourLevels {
    pub min: f64,
    pub max: f64,
    pub count: usize,
}

impl ContourLevels {
    pub fn spanning(data: &Array2<f64>, count: usize) -> Self {
        let (min, max) = data
            .iter()
            .filter(|v| v.is_finite())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        if min > max {
            // nothing finite to show
            return ContourLevels {
                min: 0.0,
                max: 0.0,
                count: count.max(1),
            };
        }
        ContourLevels {
            min,
            max,
            count: count.max(1),
        }
    }

    /// Band holding `value`. A flat field falls into a single band.
    pub fn band(&self, value: f64) -> usize {
        if self.max <= self.min {
            return 0;
        }
        let t = (value - self.min) / (self.max - self.min);
        ((t * self.count as f64) as usize).min(self.count - 1)
    }

    pub fn bounds(&self, band: usize) -> (f64, f64) {
        let width = (self.max - self.min) / self.count as f64;
        (
            self.min + band as f64 * width,
            self.min + (band + 1) as f64 * width,
        )
    }

    /// Position of the band centre on the colour scale, in `[0, 1]`.
    pub fn scale_position(&self, band: usize) -> f64 {
        (band as f64 + 0.5) / self.count as f64
    }
}

pub struct ContourPlotter {
    width: u32,
    height: u32,
    levels: usize,
    gradient: Box<dyn colorgrad::Gradient>,
}

impl ContourPlotter {
    pub fn new(width: u32, height: u32, levels: usize) -> Self {
        let gradient = Box::new(colorgrad::preset::rd_yl_bu());

        Self {
            width,
            height,
            levels,
            gradient,
        }
    }

    /// Draw filled contours of `data` over the field's `(x, y)` grid and save
    /// them as a PNG at `path`.
    pub fn plot(
        &self,
        field: &ScalarField,
        data: &Array2<f64>,
        name: &str,
        path: &Path,
    ) -> Result<(), PlotError> {
        if data.dim() != field.dim() {
            return Err(FieldError::ShapeMismatch {
                name: "plotted field",
                expected: field.dim(),
                found: data.dim(),
            }
            .into());
        }
        let (jmax, imax) = data.dim();
        if imax < 2 || jmax < 2 {
            // the axis ranges would collapse to a point
            return Err(PlotError::TooFewPoints { imax, jmax });
        }
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| PlotError::Io {
                path: path.display().to_string(),
                source,
            })?;
        }

        let levels = ContourLevels::spanning(data, self.levels);
        let x = field.x_axis();
        let y = field.y_axis();
        let x_range = x[0]..x[imax - 1];
        let y_range = y[0]..y[jmax - 1];

        let root = BitMapBackend::new(path, (self.width, self.height)).into_drawing_area();
        root.fill(&WHITE).map_err(drawing)?;
        let bar_width = 140.min(self.width / 4);
        let (plot_area, bar_area) = root.split_horizontally(self.width - bar_width);

        let mut chart = ChartBuilder::on(&plot_area)
            .caption(name, ("sans-serif", 30))
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(50)
            .build_cartesian_2d(x_range, y_range)
            .map_err(drawing)?;

        chart
            .configure_mesh()
            .disable_mesh()
            .x_desc("x")
            .y_desc("y")
            .draw()
            .map_err(drawing)?;

        // one cell per quad, coloured by the band of its corner average
        let cells = (0..jmax - 1).flat_map(|j| (0..imax - 1).map(move |i| (j, i)));
        chart
            .draw_series(cells.filter_map(|(j, i)| {
                let mean = 0.25
                    * (data[[j, i]] + data[[j, i + 1]] + data[[j + 1, i]] + data[[j + 1, i + 1]]);
                if !mean.is_finite() {
                    return None;
                }
                let color = self.band_color(&levels, levels.band(mean));
                Some(Rectangle::new(
                    [(x[i], y[j]), (x[i + 1], y[j + 1])],
                    color.filled(),
                ))
            }))
            .map_err(drawing)?;

        self.draw_colour_bar(&bar_area, &levels)?;

        root.present().map_err(drawing)?;
        info!("Saved plot: {}", path.display());
        Ok(())
    }

    fn draw_colour_bar<DB: DrawingBackend>(
        &self,
        area: &DrawingArea<DB, plotters::coord::Shift>,
        levels: &ContourLevels,
    ) -> Result<(), PlotError> {
        let (lo, hi) = if levels.max > levels.min {
            (levels.min, levels.max)
        } else {
            (levels.min - 0.5, levels.min + 0.5)
        };

        let mut bar = ChartBuilder::on(area)
            .margin_top(50)
            .margin_bottom(50)
            .margin_right(10)
            .y_label_area_size(80)
            .build_cartesian_2d(0.0..1.0, lo..hi)
            .map_err(drawing)?;

        bar.configure_mesh()
            .disable_mesh()
            .disable_x_axis()
            .y_label_formatter(&|v| format!("{:.2e}", v))
            .draw()
            .map_err(drawing)?;

        bar.draw_series((0..levels.count).map(|band| {
            let (b0, b1) = if levels.max > levels.min {
                levels.bounds(band)
            } else {
                (lo, hi)
            };
            Rectangle::new([(0.0, b0), (1.0, b1)], self.band_color(levels, band).filled())
        }))
        .map_err(drawing)?;

        Ok(())
    }

    fn band_color(&self, levels: &ContourLevels, band: usize) -> RGBColor {
        let color_rgba = self
            .gradient
            .at(levels.scale_position(band) as f32)
            .to_rgba8();
        RGBColor(color_rgba[0], color_rgba[1], color_rgba[2])
    }
}
