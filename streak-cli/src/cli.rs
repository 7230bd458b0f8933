use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "streak")]
#[command(about = "Command-line client for the STREAK timer service")]
#[command(long_about = "streak - timer session client

Reads the running session and history from the timer service, reconciled
against the locally stored snapshot, and starts or ends the timer.

Every command prints a JSON object with `success`, `data` and `error`.

Configuration is read from --config when given, otherwise defaults are used.
STREAK_BASE_URL, STREAK_SESSION_COOKIE and STREAK_DATABASE override either.")]
#[command(version, propagate_version = true)]
pub struct Cli {
    /// Path to a JSON configuration file
    #[arg(short, long, global = true, env = "STREAK_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// List every recorded session
    History,

    /// Show the running session, if any
    Active,

    /// Start the timer
    Start {
        /// Start in abstinence mode
        #[arg(long)]
        abstinence: bool,
    },

    /// End the running timer
    End,

    /// Poll the running session until Ctrl-C
    ///
    /// Prints one line per poll interval. Focus and reconnect events are not
    /// available from a terminal, so only the periodic poll drives refreshes.
    Watch,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_start() {
        let cli = Cli::try_parse_from(["streak", "start", "--abstinence"]).unwrap();
        assert_eq!(cli.command, Commands::Start { abstinence: true });

        let cli = Cli::try_parse_from(["streak", "start"]).unwrap();
        assert_eq!(cli.command, Commands::Start { abstinence: false });
    }

    #[test]
    fn test_global_config_flag() {
        let cli = Cli::try_parse_from(["streak", "active", "--config", "/tmp/streak.json"]).unwrap();
        assert_eq!(cli.command, Commands::Active);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/streak.json")));
    }

    #[test]
    fn test_unknown_command_rejected() {
        assert!(Cli::try_parse_from(["streak", "pause"]).is_err());
    }
}
