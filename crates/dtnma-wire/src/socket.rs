//! Unix datagram socket transport.
//!
//! Each datagram carries exactly one AMP message. Endpoint ids are
//! `file:<path>` URIs naming the peer's bound socket.

use crate::message::{decode_message_with, encode_message, MessageError, MessageLimits};
use crate::shutdown::ShutdownSignal;
use crate::transport::{
    MessageTransport, MsgMetadata, Received, SendStatus, TransportError, TransportResult,
};
use async_trait::async_trait;
use chrono::Utc;
use dtnma_types::Ari;
use std::path::{Path, PathBuf};
use tokio::net::UnixDatagram;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// URI scheme prefix for socket endpoint ids.
pub const URI_PREFIX: &str = "file:";

/// Endpoint id for a socket path.
pub fn endpoint_for(path: &Path) -> Vec<u8> {
    format!("{URI_PREFIX}{}", path.display()).into_bytes()
}

/// Socket path named by a `file:` endpoint id.
pub fn path_for(endpoint: &[u8]) -> TransportResult<PathBuf> {
    let text = std::str::from_utf8(endpoint)
        .map_err(|_| TransportError::InvalidEndpoint("endpoint is not text".to_string()))?;
    let rest = text
        .strip_prefix(URI_PREFIX)
        .ok_or_else(|| TransportError::InvalidEndpoint(format!("not a {URI_PREFIX} URI: {text}")))?;
    let rest = rest.strip_prefix("//").unwrap_or(rest);
    if rest.is_empty() {
        return Err(TransportError::InvalidEndpoint(format!("empty path: {text}")));
    }
    Ok(PathBuf::from(rest))
}

/// A bound local datagram socket.
pub struct SocketTransport {
    sock: UnixDatagram,
    path: PathBuf,
    limits: MessageLimits,
    closed: watch::Sender<bool>,
}

impl SocketTransport {
    /// Bind to `path`, replacing any stale socket file there.
    pub fn bind(path: impl AsRef<Path>, limits: MessageLimits) -> TransportResult<Self> {
        let path = path.as_ref().to_path_buf();
        if path.exists() {
            debug!(path = %path.display(), "Removing stale socket file");
            std::fs::remove_file(&path)?;
        }
        let sock = UnixDatagram::bind(&path)?;
        info!(path = %path.display(), "Bound AMP socket");
        Ok(Self {
            sock,
            path,
            limits,
            closed: watch::channel(false).0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// This socket's own endpoint id.
    pub fn local_endpoint(&self) -> Vec<u8> {
        endpoint_for(&self.path)
    }

    /// Stop sending and receiving. Blocked receives end; the socket file
    /// stays until drop.
    pub fn close(&self) {
        debug!(path = %self.path.display(), "Closing AMP socket");
        self.closed.send_replace(true);
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }
}

impl Drop for SocketTransport {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %e, "Failed to remove socket file");
        }
    }
}

#[async_trait]
impl MessageTransport for SocketTransport {
    async fn send(&self, items: &[Ari], meta: &MsgMetadata) -> TransportResult<SendStatus> {
        if self.is_closed() {
            return Ok(SendStatus::Closed);
        }
        let dest = path_for(&meta.dest)?;
        let bytes = encode_message(items)?;
        if bytes.len() > self.limits.max_message_size {
            return Err(MessageError::TooLarge {
                size: bytes.len(),
                max: self.limits.max_message_size,
            }
            .into());
        }

        debug!(dest = %dest.display(), items = items.len(), size = bytes.len(), "Sending datagram");
        let sent = self.sock.send_to(&bytes, &dest).await?;
        if sent < bytes.len() {
            return Err(TransportError::Io(std::io::Error::new(
                std::io::ErrorKind::WriteZero,
                format!("sent only {sent} of {} bytes", bytes.len()),
            )));
        }
        Ok(SendStatus::Sent)
    }

    async fn recv(&self, shutdown: &mut ShutdownSignal) -> TransportResult<Received> {
        // One spare byte detects datagrams over the limit.
        let mut buf = vec![0u8; self.limits.max_message_size + 1];
        let mut closed = self.closed.subscribe();
        loop {
            if self.is_closed() || shutdown.is_triggered() {
                return Ok(Received::End);
            }

            let (len, addr) = tokio::select! {
                biased;
                _ = shutdown.wait() => return Ok(Received::End),
                _ = closed.changed() => return Ok(Received::End),
                res = self.sock.recv_from(&mut buf) => res?,
            };

            let src = addr
                .as_pathname()
                .map(endpoint_for)
                .unwrap_or_default();
            if len == 0 {
                warn!(src = %String::from_utf8_lossy(&src), "Ignoring empty datagram");
                continue;
            }
            if len > self.limits.max_message_size {
                warn!(
                    src = %String::from_utf8_lossy(&src),
                    max = self.limits.max_message_size,
                    "Ignoring oversized datagram"
                );
                continue;
            }

            match decode_message_with(&buf[..len], self.limits) {
                Ok(items) => {
                    debug!(items = items.len(), size = len, "Received datagram");
                    return Ok(Received::Message {
                        items,
                        meta: MsgMetadata {
                            src,
                            dest: self.local_endpoint(),
                            timestamp: Utc::now(),
                        },
                    });
                }
                Err(e) => {
                    warn!(
                        src = %String::from_utf8_lossy(&src),
                        error = %e,
                        "Ignoring undecodable datagram"
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shutdown::shutdown_channel;
    use dtnma_types::{ObjectType, Reference};
    use std::time::Duration;

    fn bind_in(dir: &tempfile::TempDir, name: &str) -> SocketTransport {
        SocketTransport::bind(dir.path().join(name), MessageLimits::default()).unwrap()
    }

    #[test]
    fn test_endpoint_parsing() {
        assert_eq!(path_for(b"file:/tmp/x.sock").unwrap(), PathBuf::from("/tmp/x.sock"));
        assert_eq!(path_for(b"file:///tmp/x.sock").unwrap(), PathBuf::from("/tmp/x.sock"));
        assert!(path_for(b"ipn:1.2").is_err());
        assert!(path_for(b"file:").is_err());
        assert!(path_for(&[0xFF, 0xFE]).is_err());
        assert_eq!(endpoint_for(Path::new("/tmp/x.sock")), b"file:/tmp/x.sock".to_vec());
    }

    #[tokio::test]
    async fn test_datagram_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let agent = bind_in(&dir, "agent.sock");
        let manager = bind_in(&dir, "manager.sock");
        let (_handle, mut shutdown) = shutdown_channel();

        let items = vec![
            Ari::from(Reference::new(25, ObjectType::Ctrl, 1).with_params(vec![Ari::int(3)])),
            Ari::bytes(vec![1, 2, 3]),
        ];
        let meta = MsgMetadata::to(agent.local_endpoint());
        assert_eq!(manager.send(&items, &meta).await.unwrap(), SendStatus::Sent);

        match agent.recv(&mut shutdown).await.unwrap() {
            Received::Message { items: got, meta } => {
                assert_eq!(got, items);
                assert_eq!(meta.src, manager.local_endpoint());
                assert_eq!(meta.dest, agent.local_endpoint());
            }
            Received::End => panic!("expected a message"),
        }
    }

    #[tokio::test]
    async fn test_bad_datagram_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let agent = bind_in(&dir, "agent.sock");
        let manager = bind_in(&dir, "manager.sock");
        let (_handle, mut shutdown) = shutdown_channel();

        // Wrong version header, then a valid message.
        let raw = UnixDatagram::unbound().unwrap();
        raw.send_to(&[0x02, 0x00], agent.path()).await.unwrap();
        manager
            .send(&[Ari::int(5)], &MsgMetadata::to(agent.local_endpoint()))
            .await
            .unwrap();

        match agent.recv(&mut shutdown).await.unwrap() {
            Received::Message { items, .. } => assert_eq!(items, vec![Ari::int(5)]),
            Received::End => panic!("expected a message"),
        }
    }

    #[tokio::test]
    async fn test_shutdown_ends_recv() {
        let dir = tempfile::tempdir().unwrap();
        let agent = bind_in(&dir, "agent.sock");
        let (handle, mut shutdown) = shutdown_channel();

        let waiter = tokio::spawn(async move { agent.recv(&mut shutdown).await.unwrap() });
        tokio::time::sleep(Duration::from_millis(10)).await;
        handle.trigger();
        let got = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(got, Received::End);
    }

    #[tokio::test]
    async fn test_send_rejects_non_file_dest() {
        let dir = tempfile::tempdir().unwrap();
        let manager = bind_in(&dir, "manager.sock");
        let err = manager
            .send(&[Ari::null()], &MsgMetadata::to("ipn:2.1"))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::InvalidEndpoint(_)));
    }

    #[tokio::test]
    async fn test_closed_and_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agent.sock");
        let agent = SocketTransport::bind(&path, MessageLimits::default()).unwrap();
        let (_handle, mut shutdown) = shutdown_channel();
        agent.close();
        assert_eq!(agent.recv(&mut shutdown).await.unwrap(), Received::End);
        assert_eq!(
            agent.send(&[Ari::null()], &MsgMetadata::to("file:/nowhere")).await.unwrap(),
            SendStatus::Closed
        );
        assert!(path.exists());
        drop(agent);
        assert!(!path.exists());
    }
}
