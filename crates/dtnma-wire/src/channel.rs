//! In-process transport over tokio channels.
//!
//! Each side encodes messages to AMP bytes and the peer decodes them, so the
//! full framing and codec path is exercised without any sockets.

use crate::message::{decode_message_with, encode_message, MessageError, MessageLimits};
use crate::shutdown::ShutdownSignal;
use crate::transport::{MessageTransport, MsgMetadata, Received, SendStatus, TransportResult};
use async_trait::async_trait;
use dtnma_types::Ari;
use std::sync::Mutex;
use tokio::sync::{mpsc, watch};
use tracing::debug;

/// Default number of messages buffered per direction.
pub const DEFAULT_CAPACITY: usize = 64;

struct Frame {
    bytes: Vec<u8>,
    meta: MsgMetadata,
}

/// One end of an in-memory transport pair.
pub struct ChannelTransport {
    name: String,
    tx: Mutex<Option<mpsc::Sender<Frame>>>,
    rx: tokio::sync::Mutex<mpsc::Receiver<Frame>>,
    closed: watch::Sender<bool>,
    limits: MessageLimits,
}

impl ChannelTransport {
    /// Create two connected ends.
    pub fn pair(capacity: usize) -> (Self, Self) {
        let (a_tx, b_rx) = mpsc::channel(capacity);
        let (b_tx, a_rx) = mpsc::channel(capacity);
        (Self::new("a", a_tx, a_rx), Self::new("b", b_tx, b_rx))
    }

    fn new(name: &str, tx: mpsc::Sender<Frame>, rx: mpsc::Receiver<Frame>) -> Self {
        Self {
            name: name.to_string(),
            tx: Mutex::new(Some(tx)),
            rx: tokio::sync::Mutex::new(rx),
            closed: watch::channel(false).0,
            limits: MessageLimits::default(),
        }
    }

    /// Apply decode limits to received messages.
    pub fn with_limits(mut self, limits: MessageLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Close this end. Local receives end, and the peer sees the close on
    /// its next send or receive.
    pub fn close(&self) {
        debug!(end = %self.name, "Closing channel transport");
        self.tx.lock().unwrap_or_else(|e| e.into_inner()).take();
        self.closed.send_replace(true);
        if let Ok(mut rx) = self.rx.try_lock() {
            rx.close();
        }
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }
}

#[async_trait]
impl MessageTransport for ChannelTransport {
    async fn send(&self, items: &[Ari], meta: &MsgMetadata) -> TransportResult<SendStatus> {
        let tx = self.tx.lock().unwrap_or_else(|e| e.into_inner()).clone();
        let Some(tx) = tx else {
            return Ok(SendStatus::Closed);
        };

        let bytes = encode_message(items)?;
        if bytes.len() > self.limits.max_message_size {
            return Err(MessageError::TooLarge {
                size: bytes.len(),
                max: self.limits.max_message_size,
            }
            .into());
        }
        debug!(end = %self.name, items = items.len(), size = bytes.len(), "Sending message");
        let frame = Frame {
            bytes,
            meta: meta.clone(),
        };
        match tx.send(frame).await {
            Ok(()) => Ok(SendStatus::Sent),
            Err(_) => Ok(SendStatus::Closed),
        }
    }

    async fn recv(&self, shutdown: &mut ShutdownSignal) -> TransportResult<Received> {
        let mut closed = self.closed.subscribe();
        // Another receive may hold the queue; keep watching for an end
        // while waiting our turn.
        let mut rx = tokio::select! {
            biased;
            _ = shutdown.wait() => return Ok(Received::End),
            _ = closed.changed() => return Ok(Received::End),
            rx = self.rx.lock() => rx,
        };
        if *closed.borrow() {
            rx.close();
            return Ok(Received::End);
        }
        if shutdown.is_triggered() {
            return Ok(Received::End);
        }

        tokio::select! {
            biased;
            _ = shutdown.wait() => Ok(Received::End),
            _ = closed.changed() => {
                rx.close();
                Ok(Received::End)
            }
            frame = rx.recv() => match frame {
                Some(frame) => {
                    let items = decode_message_with(&frame.bytes, self.limits)?;
                    debug!(end = %self.name, items = items.len(), "Received message");
                    Ok(Received::Message {
                        items,
                        meta: frame.meta,
                    })
                }
                None => Ok(Received::End),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shutdown::shutdown_channel;
    use dtnma_types::{ObjectType, Reference};
    use std::sync::Arc;
    use std::time::Duration;

    fn make_items() -> Vec<Ari> {
        vec![
            Ari::from(Reference::new(25, ObjectType::Ident, 1)),
            Ari::int(7),
        ]
    }

    #[tokio::test]
    async fn test_send_recv_preserves_items_and_meta() {
        let (a, b) = ChannelTransport::pair(DEFAULT_CAPACITY);
        let (_handle, mut shutdown) = shutdown_channel();
        let meta = MsgMetadata {
            src: b"file:/tmp/a".to_vec(),
            dest: b"file:/tmp/b".to_vec(),
            timestamp: chrono::Utc::now(),
        };

        assert_eq!(a.send(&make_items(), &meta).await.unwrap(), SendStatus::Sent);
        match b.recv(&mut shutdown).await.unwrap() {
            Received::Message { items, meta: got } => {
                assert_eq!(items, make_items());
                assert_eq!(got, meta);
            }
            Received::End => panic!("expected a message"),
        }
    }

    #[tokio::test]
    async fn test_shutdown_ends_blocked_recv() {
        let (a, _b) = ChannelTransport::pair(DEFAULT_CAPACITY);
        let (handle, mut shutdown) = shutdown_channel();

        let waiter = tokio::spawn(async move { a.recv(&mut shutdown).await.unwrap() });
        tokio::time::sleep(Duration::from_millis(10)).await;
        handle.trigger();
        let got = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(got, Received::End);
    }

    #[tokio::test]
    async fn test_queued_recv_sees_own_shutdown() {
        let (a, _b) = ChannelTransport::pair(DEFAULT_CAPACITY);
        let a = Arc::new(a);
        let (_first_handle, mut first) = shutdown_channel();
        let (second_handle, mut second) = shutdown_channel();

        let holder = tokio::spawn({
            let a = a.clone();
            async move { a.recv(&mut first).await.unwrap() }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        let queued = tokio::spawn({
            let a = a.clone();
            async move { a.recv(&mut second).await.unwrap() }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;

        second_handle.trigger();
        let got = tokio::time::timeout(Duration::from_secs(1), queued)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(got, Received::End);
        assert!(!holder.is_finished());
        holder.abort();
    }

    #[tokio::test]
    async fn test_close_wakes_queued_recv() {
        let (a, _b) = ChannelTransport::pair(DEFAULT_CAPACITY);
        let a = Arc::new(a);
        let (_handle, shutdown) = shutdown_channel();

        let mut waiters = Vec::new();
        for _ in 0..2 {
            let a = a.clone();
            let mut shutdown = shutdown.clone();
            waiters.push(tokio::spawn(async move { a.recv(&mut shutdown).await.unwrap() }));
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
        a.close();
        for waiter in waiters {
            let got = tokio::time::timeout(Duration::from_secs(1), waiter)
                .await
                .unwrap()
                .unwrap();
            assert_eq!(got, Received::End);
        }
    }

    #[tokio::test]
    async fn test_close_ends_both_sides() {
        let (a, b) = ChannelTransport::pair(DEFAULT_CAPACITY);
        let (_handle, mut shutdown) = shutdown_channel();
        a.close();
        assert!(a.is_closed());

        assert_eq!(a.recv(&mut shutdown).await.unwrap(), Received::End);
        assert_eq!(a.recv(&mut shutdown).await.unwrap(), Received::End);
        assert_eq!(b.recv(&mut shutdown).await.unwrap(), Received::End);
        assert_eq!(
            b.send(&make_items(), &MsgMetadata::to("a")).await.unwrap(),
            SendStatus::Closed
        );
        assert_eq!(
            a.send(&make_items(), &MsgMetadata::to("b")).await.unwrap(),
            SendStatus::Closed
        );
    }

    #[tokio::test]
    async fn test_messages_arrive_in_order() {
        let (a, b) = ChannelTransport::pair(DEFAULT_CAPACITY);
        let (_handle, mut shutdown) = shutdown_channel();
        for i in 0..5 {
            a.send(&[Ari::int(i)], &MsgMetadata::to("b")).await.unwrap();
        }
        for i in 0..5 {
            match b.recv(&mut shutdown).await.unwrap() {
                Received::Message { items, .. } => assert_eq!(items, vec![Ari::int(i)]),
                Received::End => panic!("ended early"),
            }
        }
    }

    #[tokio::test]
    async fn test_oversized_send_rejected() {
        let (a, _b) = ChannelTransport::pair(DEFAULT_CAPACITY);
        let a = a.with_limits(MessageLimits {
            max_message_size: 8,
            ..MessageLimits::default()
        });
        let big = vec![Ari::text("x".repeat(32))];
        assert!(a.send(&big, &MsgMetadata::to("b")).await.is_err());
    }
}
