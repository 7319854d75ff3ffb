//! # pms-conformance CLI Entry Point

use std::process::ExitCode;

use clap::Parser;

/// Conformance harness for the PMS API.
///
/// Checks that every role sees only the fields its permissions allow and
/// that the API rejects what it must.
#[derive(Parser, Debug)]
#[command(name = "pms-conformance", version, about)]
struct Cli {
    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Run a test plan against a deployment.
    Run(pms_conformance::cli::RunArgs),
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if cli.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    let runtime = tokio::runtime::Runtime::new()?;

    match cli.command {
        Commands::Run(args) => {
            let report = runtime.block_on(pms_conformance::cli::run(&args))?;
            println!("{}", pms_conformance::cli::render(&report, args.format)?);
            if report.is_success() {
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::FAILURE)
            }
        }
    }
}
