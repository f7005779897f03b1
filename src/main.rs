//! autoregress - Main entry point
//!
//! Automated regression model selection: train, export, evaluate.

use autoregress::cli::{cmd_evaluate, cmd_export, cmd_runs, cmd_train, Cli, Commands};
use autoregress::worker::run_worker;
use clap::Parser;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // The worker writes its event stream to stdout; keep tracing off it
    if !matches!(cli.command, Commands::Worker { .. }) {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "autoregress=warn".into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }

    match cli.command {
        Commands::Train {
            csv,
            target,
            seed,
            models,
            runs_root,
        } => {
            cmd_train(&csv, &target, seed, &models, &runs_root)?;
        }
        Commands::Export {
            run,
            dest,
            runs_root,
        } => {
            cmd_export(&run, &dest, &runs_root)?;
        }
        Commands::Evaluate {
            bundle,
            csv,
            out,
            max_rows,
        } => {
            cmd_evaluate(&bundle, &csv, &out, max_rows)?;
        }
        Commands::Runs { runs_root } => {
            cmd_runs(&runs_root)?;
        }
        Commands::Worker { request } => {
            std::process::exit(run_worker(&request));
        }
    }

    Ok(())
}
