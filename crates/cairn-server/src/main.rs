//! Main entry point for the Cairn server.
//!
//! Loads configuration, starts the standalone server and runs one
//! administration command, printing its result as JSON.

use clap::Parser;
use tracing::{error, info};

use cairn_server::{command, model, startup};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = model::Cli::parse();
    let configuration = model::load_configuration(&cli)?;

    let logging_config = model::logging_config(&configuration);
    let logging_guard = startup::init_logging(&logging_config)?;

    cairn_server::metrics::init_metrics();

    let app = startup::bootstrap(configuration).await?;
    info!(command = ?cli.command, "Running command");

    let output = command::run(&app.service, cli.command).await;
    app.shutdown();

    let output = match output {
        Ok(output) => output,
        Err(e) => {
            error!(error = %e, "Command failed");
            return Err(e);
        }
    };

    println!("{}", serde_json::to_string_pretty(&output.body)?);
    if !output.is_successful() {
        drop(logging_guard);
        std::process::exit(1);
    }
    Ok(())
}
