use std::{path::Path, sync::OnceLock};

use clap::{Arg, ArgMatches, Command};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::Deserialize;

use super::{Config, ConfigRaw, defaults};
use crate::config::ConfigError;

static CONFIG_ENV: OnceLock<String> = OnceLock::new();

/// Environment variables merged over file configuration, with the config key
/// each one sets.
const SECRET_ENV_VARS: [(&str, &str); 2] = [
    (
        "EVM_OPERATIONAL_WALLET_PRIVATE_KEY",
        "blockchain.evm_operational_wallet_private_key",
    ),
    ("DB_PASSWORD", "repository.password"),
];

#[derive(Debug, Deserialize)]
struct EnvironmentConfig {
    environment: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CliCommand {
    /// Answer requests until shutdown.
    Run,
    /// Emit one request from the operational wallet.
    Ping,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Cli {
    pub config_path: Option<String>,
    pub command: CliCommand,
}

/// Returns the currently selected environment, or `"unknown"` before
/// configuration has been loaded.
pub(crate) fn current_env() -> &'static str {
    CONFIG_ENV.get().map(String::as_str).unwrap_or("unknown")
}

fn command() -> Command {
    Command::new("pong-responder")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Answers every Ping event with exactly one confirmed pong transaction")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .global(true)
                .help("Sets a custom config file (.toml format)"),
        )
        .subcommand(Command::new("run").about("Answer requests until shutdown (default)"))
        .subcommand(Command::new("ping").about("Send one ping() transaction and exit"))
}

fn cli_from_matches(matches: &ArgMatches) -> Cli {
    let (command, sub_matches) = match matches.subcommand() {
        Some(("ping", sub_matches)) => (CliCommand::Ping, Some(sub_matches)),
        Some((_, sub_matches)) => (CliCommand::Run, Some(sub_matches)),
        None => (CliCommand::Run, None),
    };

    let config_path = sub_matches
        .and_then(|m| m.get_one::<String>("config"))
        .or_else(|| matches.get_one::<String>("config"))
        .cloned();

    Cli {
        config_path,
        command,
    }
}

pub(crate) fn parse_cli() -> Cli {
    cli_from_matches(&command().get_matches())
}

pub(crate) fn initialize_configuration(custom_config_path: Option<&str>) -> Result<Config, ConfigError> {
    let node_env = resolve_environment(custom_config_path)?;
    set_config_env(&node_env);

    // Build configuration with layered sources (priority: lowest to highest)
    let mut figment = Figment::from(Serialized::defaults(defaults::config_for(&node_env)?));

    // User overrides from config.toml
    if Path::new("config.toml").exists() {
        figment = figment.merge(Toml::file("config.toml"));
    }

    // If custom config file is provided, merge it with highest file priority
    if let Some(config_path) = custom_config_path {
        figment = figment.merge(Toml::file(config_path));
    }

    figment = merge_secret_env(figment);

    let config: ConfigRaw = figment.extract().map_err(Box::new)?;
    if config.environment != node_env {
        return Err(ConfigError::UnknownEnvironment(format!(
            "config environment '{}' does not match selected '{}'",
            config.environment, node_env
        )));
    }

    config.resolve()
}

fn merge_secret_env(mut figment: Figment) -> Figment {
    for (var, key) in SECRET_ENV_VARS {
        figment = figment.merge(Env::raw().only(&[var]).map(move |_| key.into()));
    }
    figment
}

fn set_config_env(env: &str) {
    let _ = CONFIG_ENV.set(env.to_string());
}

fn resolve_environment(custom_config_path: Option<&str>) -> Result<String, ConfigError> {
    let config_path = custom_config_path.unwrap_or("config.toml");

    if !Path::new(config_path).exists() {
        return Err(ConfigError::MissingConfig(config_path.to_string()));
    }

    let env = read_environment_from(config_path).ok_or_else(|| {
        ConfigError::MissingEnvironment(
            "set environment = \"development|testnet|mainnet\" in your config".to_string(),
        )
    })?;

    if !matches!(env.as_str(), "development" | "testnet" | "mainnet") {
        return Err(ConfigError::UnknownEnvironment(env));
    }

    Ok(env)
}

fn read_environment_from(path: &str) -> Option<String> {
    Figment::from(Toml::file(path))
        .extract::<EnvironmentConfig>()
        .ok()
        .and_then(|config| config.environment)
        .map(normalize_env)
}

fn normalize_env(env: String) -> String {
    env.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn parse(args: &[&str]) -> Cli {
        cli_from_matches(&command().try_get_matches_from(args).unwrap())
    }

    #[test]
    fn run_is_the_default_command() {
        assert_eq!(
            parse(&["pong-responder"]),
            Cli {
                config_path: None,
                command: CliCommand::Run,
            }
        );
    }

    #[test]
    fn config_flag_is_accepted_before_and_after_subcommand() {
        assert_eq!(
            parse(&["pong-responder", "--config", "a.toml", "ping"]),
            Cli {
                config_path: Some("a.toml".to_string()),
                command: CliCommand::Ping,
            }
        );
        assert_eq!(
            parse(&["pong-responder", "run", "-c", "b.toml"]),
            Cli {
                config_path: Some("b.toml".to_string()),
                command: CliCommand::Run,
            }
        );
    }

    #[test]
    fn secrets_from_environment_override_files() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("DB_PASSWORD", "from-env");
            jail.set_env("EVM_OPERATIONAL_WALLET_PRIVATE_KEY", "0xabc");

            let defaults = defaults::config_for("development").unwrap();
            let figment = merge_secret_env(
                Figment::from(Serialized::defaults(&defaults)).merge(Toml::string(
                    r#"
                        environment = "development"
                        [repository]
                        password = "from-file"
                    "#,
                )),
            );
            let config: ConfigRaw = figment.extract()?;

            assert_eq!(config.repository.password.as_deref(), Some("from-env"));
            assert_eq!(
                config.blockchain.evm_operational_wallet_private_key.as_deref(),
                Some("0xabc")
            );
            Ok(())
        });
    }

    #[test]
    fn environment_is_read_from_config_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("custom.toml", "environment = \" Testnet \"")?;
            assert_eq!(resolve_environment(Some("custom.toml")).unwrap(), "testnet");

            jail.create_file("bad.toml", "environment = \"staging\"")?;
            assert!(matches!(
                resolve_environment(Some("bad.toml")),
                Err(ConfigError::UnknownEnvironment(env)) if env == "staging"
            ));

            assert!(matches!(
                resolve_environment(Some("missing.toml")),
                Err(ConfigError::MissingConfig(_))
            ));
            Ok(())
        });
    }
}
