//! rebranch CLI - rebase a stack of dependent branches onto a new base.

use clap::Parser;

mod commands;
mod output;

use commands::{Cli, Commands, Stopped};

/// Exit code for a run paused on a conflict.
const EXIT_CONFLICT: i32 = 3;

fn main() {
    let cli = Cli::parse();
    output::set_quiet(cli.quiet);
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Onto {
            base,
            branches,
            dry_run,
            json,
            no_upstream,
        } => commands::onto::run(&commands::onto::OntoOptions {
            base: &base,
            branches: &branches,
            dry_run,
            json,
            no_upstream,
        }),
        Commands::Resume { json } => commands::resume::run(json),
        Commands::Abort { yes, json } => commands::abort::run(yes, json),
        Commands::Status { json } => commands::status::run(json),
        Commands::Completions { shell } => commands::completions::run(shell),
    };

    if let Err(e) = result {
        let code = match e.downcast_ref::<Stopped>() {
            Some(Stopped::Conflict) => EXIT_CONFLICT,
            Some(Stopped::Failed) => 1,
            None => {
                output::error(&format!("{e:#}"));
                1
            }
        };
        std::process::exit(code);
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}
