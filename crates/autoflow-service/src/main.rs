use autoflow_service::{run, Cli, CliError};
use clap::Parser;
use tracing::error;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        error!("autoflow: {}", e);
        eprintln!("autoflow: {e}");

        let exit_code = match e {
            CliError::Configuration(_) => 1,
            CliError::Service(_) => 2,
            CliError::Startup { .. } => 3,
        };

        std::process::exit(exit_code);
    }
}
