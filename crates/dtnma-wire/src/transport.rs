//! Message transport interface implemented by each binding.
//!
//! A transport moves whole AMP messages between endpoints. Bindings own
//! their connection state; callers only see [`MessageTransport`].

use crate::message::MessageError;
use crate::shutdown::ShutdownSignal;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dtnma_types::Ari;
use thiserror::Error;

/// Addressing and timing information carried alongside a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MsgMetadata {
    /// Opaque source endpoint id.
    pub src: Vec<u8>,
    /// Opaque destination endpoint id.
    pub dest: Vec<u8>,
    /// When the message was sent or received.
    pub timestamp: DateTime<Utc>,
}

impl MsgMetadata {
    /// Metadata addressed to `dest`, stamped now.
    pub fn to(dest: impl Into<Vec<u8>>) -> Self {
        Self {
            src: Vec::new(),
            dest: dest.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Outcome of a send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendStatus {
    Sent,
    /// The transport is closed; nothing was sent.
    Closed,
}

/// Outcome of a receive.
#[derive(Debug, Clone, PartialEq)]
pub enum Received {
    Message {
        items: Vec<Ari>,
        meta: MsgMetadata,
    },
    /// Shutdown was requested or the transport is closed.
    End,
}

/// Transport failures.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Message error: {0}")]
    Message(#[from] MessageError),
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),
}

/// Alias for Result with TransportError.
pub type TransportResult<T> = Result<T, TransportError>;

/// A binding that sends and receives AMP messages.
#[async_trait]
pub trait MessageTransport: Send + Sync {
    /// Send one message. The items are borrowed, not consumed.
    async fn send(&self, items: &[Ari], meta: &MsgMetadata) -> TransportResult<SendStatus>;

    /// Wait for the next message.
    ///
    /// Returns [`Received::End`] once `shutdown` is triggered or the
    /// transport has closed, and on every call after that.
    async fn recv(&self, shutdown: &mut ShutdownSignal) -> TransportResult<Received>;
}
