//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// proxyflow - HTTP proxy profile manager
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Config directory (default: $XDG_CONFIG_HOME/proxyflow or ~/.config/proxyflow)
    #[arg(long, global = true, env = crate::constants::CONFIG_DIR_ENV, value_name = "DIR")]
    pub config_dir: Option<PathBuf>,

    /// Subcommand to execute; opens the terminal UI when omitted
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List saved profiles
    List,
    /// Print the full application state as JSON
    Status,
    /// Add a new profile
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        host: String,
        #[arg(long)]
        port: String,
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        password: Option<String>,
    },
    /// Change fields of an existing profile
    Edit {
        /// Profile id
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<String>,
        /// New user name (empty string removes it)
        #[arg(long)]
        username: Option<String>,
        /// New password (empty string removes it)
        #[arg(long)]
        password: Option<String>,
    },
    /// Delete a profile
    Delete {
        /// Profile id
        id: String,
    },
    /// Activate a profile, or deactivate it if it is active
    Toggle {
        /// Profile id
        id: String,
        /// Wait for the connectivity check after activating
        #[arg(long)]
        wait: bool,
    },
    /// Probe connectivity through the active profile
    Test,
    /// Serve newline-delimited JSON requests on stdin/stdout
    Serve,
}

impl Commands {
    /// Whether the command keeps running and owns the system proxy.
    pub fn is_long_running(&self) -> bool {
        matches!(self, Self::Serve)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_add() {
        let args = Args::try_parse_from([
            "proxyflow", "add", "--name", "A", "--host", "1.2.3.4", "--port", "8080",
        ])
        .unwrap();
        match args.command {
            Some(Commands::Add {
                name, host, port, username, ..
            }) => {
                assert_eq!((name.as_str(), host.as_str(), port.as_str()), ("A", "1.2.3.4", "8080"));
                assert!(username.is_none());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_parse_toggle_wait_and_global_config_dir() {
        let args =
            Args::try_parse_from(["proxyflow", "toggle", "17", "--wait", "--config-dir", "/tmp/x"])
                .unwrap();
        assert_eq!(args.config_dir, Some(PathBuf::from("/tmp/x")));
        assert!(matches!(
            args.command,
            Some(Commands::Toggle { ref id, wait: true }) if id == "17"
        ));
    }

    #[test]
    fn test_no_command_means_tui() {
        let args = Args::try_parse_from(["proxyflow"]).unwrap();
        assert!(args.command.is_none());
    }

    #[test]
    fn test_add_requires_fields() {
        assert!(Args::try_parse_from(["proxyflow", "add", "--name", "A"]).is_err());
    }
}
