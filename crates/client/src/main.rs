//! `sheetsync` command-line entry point.

use sheetsync_client::ClientConfig;
use sheetsync_client::commands::{AppState, Command, CommandError, USAGE};

#[tokio::main]
async fn main() {
    sheetsync_observability::init();

    let command = match Command::parse(std::env::args().skip(1)) {
        Ok(command) => command,
        Err(err) => {
            eprintln!("{err}\n{USAGE}");
            std::process::exit(2);
        }
    };

    if let Err(err) = run(command).await {
        tracing::error!(error = %format!("{err:#}"), "command failed");
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run(command: Command) -> anyhow::Result<()> {
    let config = ClientConfig::from_env()?;
    let state = AppState::from_config(&config).await?;

    let output = match state.run(command).await {
        Ok(output) => output,
        Err(CommandError::Usage(msg)) => {
            eprintln!("{msg}\n{USAGE}");
            std::process::exit(2);
        }
        Err(err) => return Err(err.into()),
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
