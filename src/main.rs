//! stemfx CLI
//!
//! Command-line interface for the stemfx effect chains.

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use log::debug;

use stemfx::cli::{commands, Cli, Commands};
use stemfx::FxError;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(level)).init();

    debug!("stemfx v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Some(cmd) => handle_command(cmd).inspect_err(print_suggestions),
        None => {
            println!("stemfx v{}", env!("CARGO_PKG_VERSION"));
            println!("Use --help for available commands");
            Ok(())
        }
    }
}

fn print_suggestions(err: &anyhow::Error) {
    if let Some(fx) = err.downcast_ref::<FxError>() {
        if fx.is_recoverable() {
            eprintln!("[{}] the input may be fixable:", fx.error_code());
        }
        for hint in fx.recovery_suggestions() {
            eprintln!("  hint: {}", hint);
        }
    }
}

fn handle_command(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Process {
            input,
            output,
            session,
            preset,
            overrides,
            seed,
            sample_rate,
        } => commands::process(&input, &output, session, preset, overrides, seed, sample_rate)
            .with_context(|| format!("processing {}", input.display())),
        Commands::Pipeline {
            input,
            output_dir,
            device,
            stems_dir,
            config,
        } => commands::pipeline(
            &input,
            &output_dir,
            &device,
            stems_dir.as_deref(),
            config.as_deref(),
        )
        .with_context(|| format!("pipeline for {}", input.display())),
        Commands::Batch {
            inputs,
            input_dir,
            output_dir,
            session,
            preset,
            no_effects,
        } => commands::batch(inputs, input_dir.as_deref(), &output_dir, session, preset, no_effects)
            .context("batch processing"),
        Commands::Presets { session } => commands::presets(session).context("listing presets"),
        Commands::Sample { session, seed } => {
            commands::sample(session, seed)
                .with_context(|| format!("sampling {} with seed {}", session, seed))
        }
    }
}
