//! ignis-images CLI - Tiered container image builds for Ignis

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use ignis_images::core::{BuildError, PipelineError};
use ignis_images::runtime::RuntimeError;
use ignis_images::util::diagnostic::{emit, suggestions, Diagnostic};
use ignis_images::util::Shell;
use ignis_images::TierAborted;

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();
    let shell = Arc::new(Shell::from_flags(
        cli.global.quiet,
        cli.global.verbose,
        cli.global.color,
    ));

    if let Err(e) = run(cli, Arc::clone(&shell)) {
        report(&e, &shell);
        std::process::exit(1);
    }
}

fn run(cli: Cli, shell: Arc<Shell>) -> Result<()> {
    // Set up logging
    let filter = if cli.global.verbose {
        EnvFilter::new("ignis_images=debug")
    } else if cli.global.quiet {
        EnvFilter::new("ignis_images=error")
    } else {
        EnvFilter::new("ignis_images=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    // Execute command
    match cli.command {
        Commands::Build(args) => commands::build::execute(args, &cli.global, shell),
        Commands::Clear(args) => commands::clear::execute(args, &cli.global, shell),
        Commands::Push(args) => commands::push::execute(args, &cli.global, shell),
        Commands::Status(args) => commands::status::execute(args),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}

/// Print a fatal error, with a full diagnostic when the cause is known.
fn report(err: &anyhow::Error, shell: &Shell) {
    let diagnostic = if let Some(aborted) = err.downcast_ref::<TierAborted>() {
        Some(aborted.to_diagnostic())
    } else if let Some(e) = err.downcast_ref::<PipelineError>() {
        Some(e.to_diagnostic())
    } else if let Some(e) = err.downcast_ref::<BuildError>() {
        Some(e.to_diagnostic(None))
    } else if let Some(e @ RuntimeError::Spawn { .. }) = err.downcast_ref::<RuntimeError>() {
        Some(Diagnostic::error(e.to_string()).with_suggestion(suggestions::RUNTIME_UNAVAILABLE))
    } else {
        None
    };

    match diagnostic {
        Some(diagnostic) => emit(&diagnostic, shell.use_color()),
        None => eprintln!("error: {:#}", err),
    }
}
