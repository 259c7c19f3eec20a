//! Clap CLI definitions for dtnma.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub const AFTER_HELP: &str = "\
\x1b[1;36mExamples:\x1b[0m
  dtnma decode 8418192001810A             Show an encoded ARI
  dtnma listen --bind /tmp/agent.sock     Print messages arriving on a socket
  dtnma send --to file:/tmp/agent.sock 8318192001";

/// dtnma: inspect and exchange AMP messages.
#[derive(Parser, Debug)]
#[command(name = "dtnma", version, after_help = AFTER_HELP)]
pub struct Cli {
    /// Path to config file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Decode hex-encoded CBOR ARIs and print them.
    Decode {
        /// One hex string per ARI.
        #[arg(required = true)]
        items: Vec<String>,
    },
    /// Send one AMP message to a socket endpoint.
    Send {
        /// Destination endpoint, e.g. file:/tmp/agent.sock.
        #[arg(long)]
        to: String,
        /// Hex-encoded CBOR ARIs forming the message body.
        items: Vec<String>,
    },
    /// Bind a socket and print received messages until Ctrl+C.
    Listen {
        /// Socket path (overrides transport.socket_path).
        #[arg(long)]
        bind: Option<PathBuf>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_send() {
        let cli = Cli::parse_from([
            "dtnma",
            "--config",
            "/tmp/c.toml",
            "send",
            "--to",
            "file:/tmp/a.sock",
            "0A",
            "F6",
        ]);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.toml")));
        match cli.command {
            Commands::Send { to, items } => {
                assert_eq!(to, "file:/tmp/a.sock");
                assert_eq!(items, vec!["0A", "F6"]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_decode_requires_items() {
        assert!(Cli::try_parse_from(["dtnma", "decode"]).is_err());
    }

    #[test]
    fn test_global_config_after_subcommand() {
        let cli = Cli::parse_from(["dtnma", "listen", "--config", "x.toml"]);
        assert_eq!(cli.config, Some(PathBuf::from("x.toml")));
        assert!(matches!(cli.command, Commands::Listen { bind: None }));
    }
}
