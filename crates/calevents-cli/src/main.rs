//! calendar-events entry point.

use std::process::ExitCode;

use clap::Parser;
use tracing::warn;

use calevents_cli::app;
use calevents_cli::cli::Cli;
use calevents_cli::error::CliResult;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // Usage errors exit 1; --help and --version are not failures.
            let code = if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
            let _ = e.print();
            return code;
        }
    };

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    let (config, default_config_error) = app::load_config(&cli)?;
    calevents_core::init_tracing(app::tracing_config(&cli, &config))?;

    if let Some(e) = default_config_error {
        warn!(error = %e, "Ignoring default configuration file");
    }

    let json = app::run(&cli, &config).await?;
    println!("{}", json);
    Ok(())
}
