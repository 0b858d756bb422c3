//! The two runs the binary offers: produce a solution file, and analyse one.

use anyhow::{Context, Result};
use tracing::info;

use crate::config::Config;
use crate::diagnostics::{Derivatives, Diagnostics, FieldStats};
use crate::grid::ScalarField;
use crate::io::{read_data_binary, write_data_binary};
use crate::solver::{PoissonProblem, SolveReport};
use crate::visualisation::ContourPlotter;

/// Solve the configured Poisson problem and write the solution file.
pub fn run_solve(config: &Config) -> Result<SolveReport> {
    let grid = config.grid.build();
    let problem = PoissonProblem::new(grid, &config.boundaries, config.solver.source)?;
    info!("Matrix-free operator set up for {} unknowns", problem.grid.len());

    let (u, report) = problem.solve(&config.solver.params())?;
    let solution = ScalarField::from_grid(&problem.grid, u)?;
    info!("u: {}", FieldStats::of(&solution.u));

    let path = &config.solver.output;
    write_data_binary(path, &problem.grid, &solution.u)
        .with_context(|| format!("Failed to export solution to '{}'", path.display()))?;
    info!("Solution saved to {}", path.display());
    Ok(report)
}

/// Everything computed from one solution file.
pub struct Analysis {
    pub field: ScalarField,
    pub derivatives: Derivatives,
    pub diagnostics: Diagnostics,
}

impl Analysis {
    pub fn compute(field: ScalarField, config: &Config) -> Result<Self> {
        let derivatives = Derivatives::compute(&field, config.post.edge_order)?;
        let diagnostics = Diagnostics::from_derivatives(&derivatives);
        Ok(Analysis {
            field,
            derivatives,
            diagnostics,
        })
    }

    pub fn log_stats(&self) {
        let curl = FieldStats::of(&self.diagnostics.curl);
        info!("u:                {}", FieldStats::of(&self.field.u));
        info!("curl(grad(u)):    {}", curl);
        info!("div(grad(u)):     {}", FieldStats::of(&self.diagnostics.div));
        info!("max |curl(grad(u))| = {:.4e}", curl.max_abs());
    }
}

/// Read the solution file, compute the diagnostics and plot the selected field.
pub fn run_post(config: &Config) -> Result<Analysis> {
    let post = &config.post;
    let field = read_data_binary(&post.input)?;
    let (jmax, imax) = field.dim();
    info!("Loaded {} ({} x {})", post.input.display(), imax, jmax);

    let analysis = Analysis::compute(field, config)?;
    analysis.log_stats();

    let data = post.field.select(&analysis.field, &analysis.derivatives, &analysis.diagnostics);
    let plotter = ContourPlotter::new(post.image_width, post.image_height, post.levels);
    plotter.plot(&analysis.field, data, post.field.name(), &post.output_path())?;

    Ok(analysis)
}
