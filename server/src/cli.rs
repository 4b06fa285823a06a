//! # CLI Interface
//!
//! Command-line argument structure for `badgery-server` using `clap`
//! derive. Three subcommands: `run`, `init`, and `version`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::logging::LogFormat;

/// Badgery Open Badges server.
///
/// Issues and serves hosted Open Badges assertions: badge class documents,
/// assertion documents, the revocation list, and recipient badge pages.
#[derive(Parser, Debug)]
#[command(
    name = "badgery-server",
    about = "Open Badges issuing and verification service",
    version,
    propagate_version = true
)]
pub struct BadgeryCli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the server binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the badge server.
    Run(RunArgs),
    /// Initialize the data directory and store the issuer profile.
    /// Must be run once before `run` — the server refuses to start
    /// without an issuer.
    Init(InitArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Path to the data directory holding the badge database.
    #[arg(long, short = 'd', env = "BADGERY_DATA_DIR", default_value = "./badgery-data")]
    pub data_dir: PathBuf,

    /// Absolute base URL under which the public routes are reachable,
    /// e.g. `https://badges.example.org`. Every URL embedded in a served
    /// document is built from it.
    #[arg(long, env = "BADGERY_BASE_URL")]
    pub base_url: String,

    /// Port for the public HTTP API.
    #[arg(long, env = "BADGERY_HTTP_PORT", default_value_t = 8310)]
    pub http_port: u16,

    /// Port for the Prometheus metrics endpoint.
    #[arg(long, env = "BADGERY_METRICS_PORT", default_value_t = 8311)]
    pub metrics_port: u16,

    /// Log output format.
    #[arg(long, env = "BADGERY_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

/// Arguments for the `init` subcommand.
#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Path to the data directory to initialize.
    #[arg(long, short = 'd', env = "BADGERY_DATA_DIR", default_value = "./badgery-data")]
    pub data_dir: PathBuf,

    /// Issuing organization name.
    #[arg(long)]
    pub name: String,

    /// Issuing organization homepage URL.
    #[arg(long)]
    pub url: String,

    /// Issuing organization description.
    #[arg(long)]
    pub description: Option<String>,

    /// Contact email published in the issuer document.
    #[arg(long)]
    pub email: Option<String>,

    /// Path to a PNG logo for the issuer.
    #[arg(long)]
    pub image: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli_structure() {
        // Ensures the derive macros produce a valid CLI definition.
        BadgeryCli::command().debug_assert();
    }

    #[test]
    fn init_requires_name_and_url() {
        let parsed = BadgeryCli::try_parse_from([
            "badgery-server",
            "init",
            "--name",
            "Example Academy",
            "--url",
            "https://academy.example.org",
        ]);
        assert!(parsed.is_ok());

        let missing = BadgeryCli::try_parse_from(["badgery-server", "init"]);
        assert!(missing.is_err());
    }
}
