use std::path::PathBuf;

use clap::{Parser, Subcommand};
use poisson_fdm::config::Config;
use poisson_fdm::diagnostics::PlotField;
use poisson_fdm::pipeline::{run_post, run_solve};
use tracing::{warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Poisson FDM solver and gradient post-processing
#[derive(Parser)]
#[command(name = "poisson-fdm")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(
    about = "Solve -div(grad(u)) = f and inspect the derivatives of the result",
    long_about = None
)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve the Poisson problem and write the binary solution file
    Solve {
        /// Solution file to write
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Compute curl/div of grad(u) from a solution file and plot a field
    Post {
        /// Solution file to read
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Field to plot (u, dudx, dudy, d2udx2, d2udy2, d2udxdy, d2udydx, curl, div)
        #[arg(short, long)]
        field: Option<PlotField>,

        /// PNG file to write
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    match cli.command {
        Commands::Solve { output } => {
            if let Some(output) = output {
                config.solver.output = output;
            }
            config.validate()?;
            config.log_summary();
            let report = run_solve(&config)?;
            if !report.converged {
                warn!(
                    "Solution written without reaching tolerance (err = {:.4e})",
                    report.residual
                );
            }
        }
        Commands::Post {
            input,
            field,
            output,
        } => {
            if let Some(input) = input {
                config.post.input = input;
            }
            if let Some(field) = field {
                config.post.field = field;
            }
            if output.is_some() {
                config.post.output = output;
            }
            config.validate()?;
            config.log_summary();
            run_post(&config)?;
        }
    }

    Ok(())
}
