pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "stairbooks",
    about = "Stairbooks operator CLI",
    long_about = "Price quotes, expand payment schedules, export the CIS deduction ledger, and operate the Stairbooks database.",
    after_help = "Examples:\n  stairbooks price quote.json\n  stairbooks cis-export --out cis.csv\n  stairbooks doctor --json"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Price a quote file and print the full per-item breakdown")]
    Price {
        #[arg(help = "Path to a quote JSON file")]
        quote: PathBuf,
    },
    #[command(about = "Expand a quote's payment terms into staged amounts")]
    Schedule {
        #[arg(help = "Path to a quote JSON file")]
        quote: PathBuf,
    },
    #[command(name = "cis-export", about = "Export the CIS deduction ledger as CSV")]
    CisExport {
        #[arg(long, help = "Write the CSV to a file instead of stdout")]
        out: Option<PathBuf>,
    },
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Validate config and database connectivity")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_env("STAIRBOOKS_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init();
}

pub fn run() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Price { quote } => commands::price::run(&quote),
        Command::Schedule { quote } => commands::schedule::run(&quote),
        Command::CisExport { out } => commands::export::run(out.as_deref()),
        Command::Migrate => commands::migrate::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
