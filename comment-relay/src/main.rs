mod config;
mod telemetry;

use clap::{Args, Parser};
use config::Config;
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(about = "Relays storefront image comments to the store's content API")]
enum CliCommand {
    /// Serve the comment endpoints
    Run(ConfigArgs),
    /// Load and validate the config file, then exit
    CheckConfig(ConfigArgs),
}

#[derive(Args)]
struct ConfigArgs {
    #[arg(long)]
    config_file_path: PathBuf,
}

fn load_config(args: &ConfigArgs) -> Config {
    match Config::from_file(&args.config_file_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Failed to load config {}: {e}",
                args.config_file_path.display()
            );
            process::exit(1);
        }
    }
}

fn main() {
    let cli = CliCommand::parse();

    match &cli {
        CliCommand::CheckConfig(args) => {
            load_config(args);
            println!("Config ok");
        }
        CliCommand::Run(args) => {
            let config = load_config(args);
            let sentry_guard = telemetry::init_logging(config.common.logging.as_ref());

            if let Err(e) = serve(config) {
                tracing::error!(error = %e, "comment relay stopped");
                drop(sentry_guard);
                process::exit(1);
            }
        }
    }
}

#[derive(thiserror::Error, Debug)]
enum ServeError {
    #[error(transparent)]
    Telemetry(#[from] telemetry::TelemetryError),
    #[error("failed to start runtime: {0}")]
    Runtime(#[from] std::io::Error),
    #[error(transparent)]
    Relay(#[from] comments::RelayServiceError),
}

fn serve(config: Config) -> Result<(), ServeError> {
    if let Some(metrics) = &config.common.metrics {
        telemetry::init_metrics(metrics)?;
    }

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    tracing::info!("Starting comment relay");
    rt.block_on(comments::run(config.relay))?;
    Ok(())
}
