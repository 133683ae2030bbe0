use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::{Generator, generate};
use colored::Colorize;
use std::io;
use std::process;
use syncer::cli::{Cli, Commands};
use syncer::output::{self, Verbosity};
use syncer::prompt::Interrupted;
use syncer::{SyncerContext, commands};
use tracing_subscriber::{EnvFilter, fmt};

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        if e.downcast_ref::<Interrupted>().is_some() {
            eprintln!("\nCheerio!");
        } else {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
        }
        process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("syncer=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    output::set_verbosity(if cli.quiet {
        Verbosity::Quiet
    } else if cli.verbose {
        Verbosity::Verbose
    } else {
        Verbosity::Normal
    });

    if let Commands::Completion { shell } = cli.command {
        print_completions(shell, &mut Cli::command());
        return Ok(());
    }

    let mut ctx = SyncerContext::new()?;
    match cli.command {
        Commands::Track { items } => commands::track::execute(&mut ctx, &items)?,
        Commands::Check { all } => commands::check::execute(&mut ctx, all)?,
        Commands::Remind => commands::remind::execute(&ctx)?,
        Commands::List => commands::list::execute(&mut ctx)?,
        Commands::Config { key, value, list } => {
            commands::config::execute(&mut ctx, key.as_deref(), value.as_deref(), list)?;
        }
        Commands::Completion { .. } => {}
    }

    Ok(())
}

fn print_completions<G: Generator>(g: G, cmd: &mut clap::Command) {
    generate(g, cmd, cmd.get_name().to_string(), &mut io::stdout());
}
