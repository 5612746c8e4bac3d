//! CLI command definitions for the `aichat` binary.

pub mod works;

use clap::{Parser, Subcommand};

/// Streaming chat proxy and generation task manager.
#[derive(Parser)]
#[command(name = "aichat", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Emit log lines as JSON objects.
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Bearer credential for the upstream provider.
    #[arg(long, env = "AICHAT_API_KEY", hide_env_values = true, global = true)]
    pub api_key: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP API server.
    Serve {
        /// Listen address (defaults to `[server].host` from config.toml).
        #[arg(long)]
        host: Option<String>,

        /// Listen port (defaults to `[server].port` from config.toml).
        #[arg(long)]
        port: Option<u16>,

        /// Export spans to stdout through OpenTelemetry.
        #[arg(long)]
        otel: bool,
    },

    /// Print one page of a user's generated works as JSON.
    Works {
        /// Owner id.
        #[arg(long)]
        owner: String,

        /// 1 = images, 2 = videos, 3 = both.
        #[arg(long = "type", default_value_t = 3)]
        kind: i64,

        /// 1-based page number.
        #[arg(long, default_value_t = 1)]
        page: u32,

        /// Leave out tasks recorded without parameters.
        #[arg(long)]
        hide_personal_uploads: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        <Cli as clap::CommandFactory>::command().debug_assert();
    }

    #[test]
    fn test_parse_works() {
        let cli = Cli::try_parse_from(["aichat", "-v", "works", "--owner", "u-1", "--type", "2"]).unwrap();
        assert_eq!(cli.verbose, 1);
        match cli.command {
            Commands::Works { owner, kind, page, hide_personal_uploads } => {
                assert_eq!(owner, "u-1");
                assert_eq!(kind, 2);
                assert_eq!(page, 1);
                assert!(!hide_personal_uploads);
            }
            Commands::Serve { .. } => panic!("expected works"),
        }
    }

    #[test]
    fn test_parse_serve() {
        let cli = Cli::try_parse_from(["aichat", "serve", "--port", "9000", "--otel"]).unwrap();
        match cli.command {
            Commands::Serve { host, port, otel } => {
                assert!(host.is_none());
                assert_eq!(port, Some(9000));
                assert!(otel);
            }
            Commands::Works { .. } => panic!("expected serve"),
        }
    }
}
