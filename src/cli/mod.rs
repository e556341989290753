//! CLI module for the drill feedback service
//!
//! - `serve`: run the HTTP API
//! - `check-config`: print the resolved configuration

pub mod check_config;
pub mod serve;

use clap::{Parser, Subcommand};

/// Drill Feedback - AI feedback for consulting practice drills
#[derive(Parser)]
#[command(name = "drill-feedback")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP API server
    Serve,

    /// Print the resolved configuration with secrets redacted
    CheckConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_subcommands() {
        let cli = Cli::try_parse_from(["drill-feedback", "serve"]).unwrap();
        assert!(matches!(cli.command, Command::Serve));

        let cli = Cli::try_parse_from(["drill-feedback", "check-config"]).unwrap();
        assert!(matches!(cli.command, Command::CheckConfig));

        assert!(Cli::try_parse_from(["drill-feedback"]).is_err());
    }
}
