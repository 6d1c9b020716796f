mod bootstrap;
mod config;
mod error;
mod logger;
mod responder;
mod runtime;

use std::process::ExitCode;

use dotenvy::dotenv;

pub async fn run() -> ExitCode {
    // Install rustls crypto provider before any TLS connections
    let _ = rustls::crypto::ring::default_provider().install_default();

    dotenv().ok();
    let cli = config::parse_cli();

    // Logging is configured from the loaded config, so load errors go to stderr.
    let config = match config::initialize_configuration(cli.config_path.as_deref()) {
        Ok(config) => config,
        Err(error) => {
            eprintln!("Failed to load configuration: {error}");
            return ExitCode::FAILURE;
        }
    };
    logger::initialize(&config.logger, &config.telemetry);
    tracing::info!(
        environment = config::current_env(),
        "Configuration loaded successfully"
    );

    match bootstrap::execute(cli.command, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(error = %error, "Responder stopped with an error");
            ExitCode::FAILURE
        }
    }
}
