//! # Schema Migration Tool
//!
//! Applies or reverts the embedded migrations against PostgreSQL.
//!
//! ## Usage
//! ```bash
//! # Apply every pending migration (default)
//! cargo run -p storefront-db --bin migrate
//!
//! # Revert everything
//! cargo run -p storefront-db --bin migrate -- down
//!
//! # Move to a specific version
//! cargo run -p storefront-db --bin migrate -- to 3
//!
//! # Read settings from a file (environment still wins)
//! cargo run -p storefront-db --bin migrate -- --config ./storefront.toml up
//! ```
//!
//! ## Environment
//! - `STOREFRONT_DATABASE_URL` (or `DATABASE_URL`)
//! - `STOREFRONT_LOAD_EXAMPLE_DATA`
//! - `STOREFRONT_CONNECT_ATTEMPTS`, `STOREFRONT_CONNECT_INTERVAL_MS`
//! - `RUST_LOG` (default: `info`)

use std::env;
use std::path::PathBuf;

use storefront_db::{BootstrapConfig, Bootstrapper};
use tracing_subscriber::EnvFilter;

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Up,
    Down,
    To(u64),
}

#[derive(Debug, PartialEq, Eq)]
struct Options {
    config_path: Option<PathBuf>,
    command: Command,
}

fn print_help() {
    println!("Storefront schema migrations");
    println!();
    println!("Usage: migrate [OPTIONS] [up | down | to <VERSION>]");
    println!();
    println!("Options:");
    println!("  -c, --config <PATH>  TOML config file");
    println!("  -h, --help           Show this help message");
}

/// Parses arguments after the program name. `Ok(None)` means help was asked for.
fn parse_args(args: &[String]) -> Result<Option<Options>, String> {
    let mut options = Options {
        config_path: None,
        command: Command::Up,
    };

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                let path = args.get(i + 1).ok_or("`--config` needs a file path")?;
                options.config_path = Some(PathBuf::from(path));
                i += 1;
            }
            "--help" | "-h" => return Ok(None),
            "up" => options.command = Command::Up,
            "down" => options.command = Command::Down,
            "to" => {
                let version = args.get(i + 1).ok_or("`to` needs a version number")?;
                let version = version
                    .parse::<u64>()
                    .map_err(|e| format!("invalid version '{version}': {e}"))?;
                options.command = Command::To(version);
                i += 1;
            }
            other => return Err(format!("unknown argument: {other}")),
        }
        i += 1;
    }

    Ok(Some(options))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Parse command line arguments
    let args: Vec<String> = env::args().skip(1).collect();
    let options = match parse_args(&args) {
        Ok(Some(options)) => options,
        Ok(None) => {
            print_help();
            return Ok(());
        }
        Err(message) => {
            print_help();
            return Err(message.into());
        }
    };

    let config = BootstrapConfig::load(options.config_path)?;
    let bootstrapper = Bootstrapper::from_config(&config)?;

    let report = match options.command {
        Command::Up => bootstrapper.up().await?,
        Command::Down => bootstrapper.down().await?,
        Command::To(version) => bootstrapper.migrate_to(version).await?,
    };

    println!(
        "Schema at version {} ({} migration(s) applied, was {})",
        report.to, report.applied, report.from
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_defaults_to_up() {
        let options = parse_args(&[]).unwrap().unwrap();
        assert_eq!(options.command, Command::Up);
        assert_eq!(options.config_path, None);
    }

    #[test]
    fn test_config_and_target_version() {
        let options = parse_args(&args(&["-c", "store.toml", "to", "3"]))
            .unwrap()
            .unwrap();
        assert_eq!(options.config_path, Some(PathBuf::from("store.toml")));
        assert_eq!(options.command, Command::To(3));
    }

    #[test]
    fn test_missing_values_are_errors() {
        assert!(parse_args(&args(&["--config"])).is_err());
        assert!(parse_args(&args(&["down", "-c"])).is_err());
        assert!(parse_args(&args(&["to"])).is_err());
        assert!(parse_args(&args(&["to", "three"])).is_err());
        assert!(parse_args(&args(&["sideways"])).is_err());
    }

    #[test]
    fn test_help() {
        assert_eq!(parse_args(&args(&["up", "--help"])).unwrap(), None);
    }
}
