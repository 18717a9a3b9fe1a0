//! Sprig CLI - branch and merge intelligence over git.

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{BranchCommand, Cli, Commands, MergeCommand};

fn main() {
    let cli = Cli::parse();
    output::set_quiet(cli.quiet);
    init_tracing(cli.verbose);

    let global = cli.global();
    let result = match cli.command {
        Commands::Branch(command) => match command {
            BranchCommand::List(args) => commands::branch::list(&global, &args),
            BranchCommand::Show { name, json } => commands::branch::show(&global, &name, json),
            BranchCommand::Current { json } => commands::branch::current(&global, json),
            BranchCommand::Create(args) => commands::branch::create(&global, &args),
            BranchCommand::Delete(args) => commands::branch::delete(&global, &args),
            BranchCommand::Rename { old, new, force } => {
                commands::branch::rename(&global, &old, &new, force)
            }
        },
        Commands::Merge(command) => match command {
            MergeCommand::Detect {
                source,
                target,
                json,
            } => commands::merge::detect(&global, &source, &target, json),
            MergeCommand::Do(args) => commands::merge::merge(&global, &args),
            MergeCommand::Rebase(args) => commands::merge::rebase(&global, &args),
            MergeCommand::Abort => commands::merge::abort(&global),
            MergeCommand::Status { json } => commands::merge::status(&global, json),
        },
        Commands::Completions { shell } => commands::completions::run(shell),
    };

    if let Err(e) = result {
        output::error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

/// Install the stderr log subscriber. `SPRIG_LOG` wins over `-v`.
fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_env("SPRIG_LOG").unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
