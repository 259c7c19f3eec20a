//! AMP wire layer for the DTNMA management core.
//!
//! Encodes ARIs to and from their binary CBOR form, frames them into AMP
//! messages, and moves those messages between endpoints.
//!
//! ## Architecture
//!
//! - **cbor**: ARI binary encoding and decoding
//! - **message**: Version-prefixed AMP message framing
//! - **MessageTransport**: Trait implemented by each transport binding
//! - **SocketTransport**: Local datagram sockets addressed by `file:` URIs
//! - **ChannelTransport**: In-process pair for tests and embedding

pub mod cbor;
pub mod channel;
pub mod message;
pub mod shutdown;
#[cfg(unix)]
pub mod socket;
pub mod transport;

pub use cbor::{CodecError, CodecResult};
pub use channel::ChannelTransport;
pub use message::{
    decode_message, decode_message_with, encode_message, MessageError, MessageLimits,
    AMP_VERSION, MAX_MESSAGE_SIZE,
};
pub use shutdown::{shutdown_channel, ShutdownHandle, ShutdownSignal};
#[cfg(unix)]
pub use socket::SocketTransport;
pub use transport::{
    MessageTransport, MsgMetadata, Received, SendStatus, TransportError, TransportResult,
};
