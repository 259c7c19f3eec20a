//! dtnma CLI: decode, send, and receive AMP messages from the terminal.
//!
//! Messages travel over local datagram sockets addressed by `file:` URIs.

mod cli;
mod config;

use crate::cli::{Cli, Commands};
use clap::Parser;
use dtnma_types::config::NodeConfig;
use dtnma_types::Ari;
use dtnma_wire::cbor;
use dtnma_wire::{MessageLimits, MsgMetadata, Received, SendStatus};

fn init_tracing_stderr(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    let (node_config, source) = config::load_config(cli.config.as_deref());
    init_tracing_stderr(&node_config.log_level);
    source.log();

    let result = match cli.command {
        Commands::Decode { items } => cmd_decode(&node_config, &items),
        Commands::Send { to, items } => block_on(cmd_send(&node_config, to, items)),
        Commands::Listen { bind } => block_on(cmd_listen(&node_config, bind)),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn block_on<F: std::future::Future<Output = Result<(), String>>>(fut: F) -> Result<(), String> {
    let rt = tokio::runtime::Runtime::new().map_err(|e| format!("Failed to start runtime: {e}"))?;
    rt.block_on(fut)
}

fn limits_from(config: &NodeConfig) -> MessageLimits {
    MessageLimits {
        max_message_size: config.transport.max_message_size,
        max_prealloc: config.codec.max_prealloc,
    }
}

/// Parse hex arguments into ARIs, naming the first bad argument.
fn parse_items(args: &[String], max_prealloc: usize) -> Result<Vec<Ari>, String> {
    args.iter()
        .enumerate()
        .map(|(i, arg)| {
            let bytes = hex::decode(arg.trim()).map_err(|e| format!("Item {i}: bad hex: {e}"))?;
            let (ari, used) = cbor::decode_prefix_with(&bytes, max_prealloc)
                .map_err(|e| format!("Item {i}: {e}"))?;
            if used < bytes.len() {
                return Err(format!(
                    "Item {i}: {}",
                    cbor::CodecError::TrailingData(bytes.len() - used)
                ));
            }
            Ok(ari)
        })
        .collect()
}

fn cmd_decode(config: &NodeConfig, args: &[String]) -> Result<(), String> {
    for ari in parse_items(args, config.codec.max_prealloc)? {
        println!("{ari}");
    }
    Ok(())
}

#[cfg(unix)]
async fn cmd_send(config: &NodeConfig, to: String, args: Vec<String>) -> Result<(), String> {
    use dtnma_wire::{MessageTransport, SocketTransport};

    let items = parse_items(&args, config.codec.max_prealloc)?;
    let transport = SocketTransport::bind(config::default_socket_path(), limits_from(config))
        .map_err(|e| format!("Failed to bind socket: {e}"))?;
    let meta = MsgMetadata {
        src: transport.local_endpoint(),
        ..MsgMetadata::to(to.clone())
    };
    match transport
        .send(&items, &meta)
        .await
        .map_err(|e| format!("Send failed: {e}"))?
    {
        SendStatus::Sent => {
            println!("Sent {} item(s) to {to}", items.len());
            Ok(())
        }
        SendStatus::Closed => Err("Transport closed".to_string()),
    }
}

#[cfg(unix)]
async fn cmd_listen(config: &NodeConfig, bind: Option<std::path::PathBuf>) -> Result<(), String> {
    use dtnma_wire::{shutdown_channel, MessageTransport, SocketTransport};

    let path = bind
        .or_else(|| config.transport.socket_path.clone())
        .unwrap_or_else(config::default_socket_path);
    let transport = SocketTransport::bind(&path, limits_from(config))
        .map_err(|e| format!("Failed to bind {}: {e}", path.display()))?;
    println!(
        "Listening on {} (Ctrl+C to stop)",
        String::from_utf8_lossy(&transport.local_endpoint())
    );

    let (handle, mut shutdown) = shutdown_channel();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            handle.trigger();
        }
    });

    loop {
        match transport
            .recv(&mut shutdown)
            .await
            .map_err(|e| format!("Receive failed: {e}"))?
        {
            Received::Message { items, meta } => {
                println!(
                    "[{}] from {} ({} item(s))",
                    meta.timestamp.to_rfc3339(),
                    display_endpoint(&meta.src),
                    items.len()
                );
                for ari in &items {
                    println!("  {ari}");
                }
            }
            Received::End => break,
        }
    }
    Ok(())
}

#[cfg(not(unix))]
async fn cmd_send(_config: &NodeConfig, _to: String, _args: Vec<String>) -> Result<(), String> {
    Err("Socket transport requires a Unix platform".to_string())
}

#[cfg(not(unix))]
async fn cmd_listen(
    _config: &NodeConfig,
    _bind: Option<std::path::PathBuf>,
) -> Result<(), String> {
    Err("Socket transport requires a Unix platform".to_string())
}

fn display_endpoint(eid: &[u8]) -> String {
    if eid.is_empty() {
        "(unnamed)".to_string()
    } else {
        String::from_utf8_lossy(eid).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_items() {
        let items = parse_items(&["0A".to_string(), "8318192001".to_string()], 1024).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0], Ari::int(10));
        assert!(items[1].is_ref());
    }

    #[test]
    fn test_parse_items_names_bad_argument() {
        let err = parse_items(&["0A".to_string(), "zz".to_string()], 1024).unwrap_err();
        assert!(err.starts_with("Item 1"));
        let err = parse_items(&["0A0A".to_string()], 1024).unwrap_err();
        assert!(err.contains("Trailing"));
    }

    #[test]
    fn test_limits_from_config() {
        let mut config = NodeConfig::default();
        config.transport.max_message_size = 512;
        config.codec.max_prealloc = 16;
        assert_eq!(
            limits_from(&config),
            MessageLimits {
                max_message_size: 512,
                max_prealloc: 16,
            }
        );
    }

    #[test]
    fn test_display_endpoint() {
        assert_eq!(display_endpoint(b""), "(unnamed)");
        assert_eq!(display_endpoint(b"file:/tmp/a"), "file:/tmp/a");
    }
}
