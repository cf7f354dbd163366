pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "tripdesk",
    about = "Tripdesk operator CLI",
    long_about = "Operate tripdesk database migrations, seed data, config inspection, and policy checks.",
    after_help = "Examples:\n  tripdesk doctor --json\n  tripdesk config\n  tripdesk evaluate --offer fare.json --traveler trv-seed-rohan"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the deterministic seed dataset (three travelers and an active policy)")]
    Seed,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, supplier and payment readiness, and DB connectivity")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Evaluate a fare offer against a traveler's active policy")]
    Evaluate {
        #[arg(long, value_name = "PATH", help = "Path to an offer JSON document")]
        offer: PathBuf,
        #[arg(long, value_name = "TRAVELER_ID", help = "Traveler the offer is for")]
        traveler: String,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
        Command::Evaluate { offer, traveler } => commands::evaluate::run(&offer, &traveler),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
