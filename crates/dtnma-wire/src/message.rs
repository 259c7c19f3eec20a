//! AMP message framing.
//!
//! A message is the CBOR unsigned integer protocol version followed by the
//! concatenated encodings of zero or more ARIs. There is no length prefix;
//! the transport delimits whole messages.

use crate::cbor::{self, CodecError, DEFAULT_MAX_PREALLOC};
use dtnma_types::Ari;
use thiserror::Error;
use tracing::debug;

/// AMP protocol version written and accepted by this node.
pub const AMP_VERSION: u64 = 1;

/// Default maximum message size (64 KiB).
pub const MAX_MESSAGE_SIZE: usize = 65_536;

/// Message framing failures. A failed item fails the whole message.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MessageError {
    /// The leading version header is absent or not an unsigned integer.
    #[error("Missing AMP version header")]
    MissingVersion,

    /// The peer speaks a different protocol version.
    #[error("Incompatible AMP version: {0}")]
    IncompatibleVersion(u64),

    /// The message exceeds the configured size limit.
    #[error("Message too large: {size} bytes (max {max})")]
    TooLarge {
        /// Actual size in bytes.
        size: usize,
        /// Configured maximum.
        max: usize,
    },

    /// An item failed to encode or decode.
    #[error("Item {index}: {source}")]
    Item {
        /// Position of the failing item.
        index: usize,
        /// Underlying codec error.
        source: CodecError,
    },
}

/// Size and allocation limits applied when decoding messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageLimits {
    pub max_message_size: usize,
    pub max_prealloc: usize,
}

impl Default for MessageLimits {
    fn default() -> Self {
        Self {
            max_message_size: MAX_MESSAGE_SIZE,
            max_prealloc: DEFAULT_MAX_PREALLOC,
        }
    }
}

/// Frame a list of ARIs as one message.
pub fn encode_message(items: &[Ari]) -> Result<Vec<u8>, MessageError> {
    let mut buf = serde_cbor::to_vec(&AMP_VERSION).map_err(|e| MessageError::Item {
        index: 0,
        source: CodecError::Encode(e.to_string()),
    })?;
    for (index, item) in items.iter().enumerate() {
        cbor::encode_into(item, &mut buf).map_err(|source| MessageError::Item { index, source })?;
    }
    Ok(buf)
}

/// Decode a message with the default limits.
pub fn decode_message(bytes: &[u8]) -> Result<Vec<Ari>, MessageError> {
    decode_message_with(bytes, MessageLimits::default())
}

/// Decode a message, checking its version header and size.
pub fn decode_message_with(bytes: &[u8], limits: MessageLimits) -> Result<Vec<Ari>, MessageError> {
    if bytes.len() > limits.max_message_size {
        return Err(MessageError::TooLarge {
            size: bytes.len(),
            max: limits.max_message_size,
        });
    }

    let mut header = serde_cbor::Deserializer::from_slice(bytes).into_iter::<u64>();
    let version = match header.next() {
        Some(Ok(v)) => v,
        _ => return Err(MessageError::MissingVersion),
    };
    if version != AMP_VERSION {
        return Err(MessageError::IncompatibleVersion(version));
    }
    let mut offset = header.byte_offset();

    let mut items = Vec::new();
    while offset < bytes.len() {
        let (item, used) = cbor::decode_prefix_with(&bytes[offset..], limits.max_prealloc)
            .map_err(|source| MessageError::Item {
                index: items.len(),
                source,
            })?;
        debug!(item = %item, "Decoded AMP item");
        items.push(item);
        offset += used;
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dtnma_types::{ObjectType, Reference};

    fn make_items() -> Vec<Ari> {
        vec![
            Ari::from(Reference::new(25, ObjectType::Ident, 1).with_params(vec![Ari::int(10)])),
            Ari::text("status"),
            Ari::ac(vec![Ari::int(1), Ari::int(2)]),
        ]
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let items = make_items();
        let bytes = encode_message(&items).unwrap();
        assert_eq!(bytes[0], 0x01);
        assert_eq!(decode_message(&bytes).unwrap(), items);
    }

    #[test]
    fn test_header_only_is_empty_message() {
        let bytes = encode_message(&[]).unwrap();
        assert_eq!(bytes, vec![0x01]);
        assert!(decode_message(&bytes).unwrap().is_empty());
    }

    #[test]
    fn test_known_bytes() {
        // Version 1, then ari://25/IDENT/1(10).
        let bytes = hex::decode("018418192001810A").unwrap();
        let items = decode_message(&bytes).unwrap();
        assert_eq!(items.len(), 1);
        assert!(items[0].is_ref());
    }

    #[test]
    fn test_bad_version() {
        assert_eq!(
            decode_message(&[0x02, 0x0A]),
            Err(MessageError::IncompatibleVersion(2))
        );
        assert_eq!(decode_message(&[]), Err(MessageError::MissingVersion));
        assert_eq!(decode_message(&[0x20]), Err(MessageError::MissingVersion));
        assert_eq!(decode_message(&[0x61, 0x31]), Err(MessageError::MissingVersion));
    }

    #[test]
    fn test_bad_item_fails_message() {
        // Second item truncated.
        let err = decode_message(&hex::decode("010A8318").unwrap()).unwrap_err();
        assert!(matches!(err, MessageError::Item { index: 1, .. }));
    }

    #[test]
    fn test_size_limit() {
        let limits = MessageLimits {
            max_message_size: 4,
            ..MessageLimits::default()
        };
        let bytes = encode_message(&make_items()).unwrap();
        assert!(matches!(
            decode_message_with(&bytes, limits),
            Err(MessageError::TooLarge { max: 4, .. })
        ));
    }
}
