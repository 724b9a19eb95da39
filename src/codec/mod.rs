//! Model codecs
//!
//! A codec translates a domain model to bytes for the write path and back for
//! the caches. Caches hold codecs behind an `Arc` and never assume `decode`
//! is total: a failing decode is reported with the node it came from.

mod bincode_codec;
mod json_codec;

pub use bincode_codec::BincodeCodec;
pub use json_codec::JsonCodec;


use bytes::Bytes;

use crate::CodecError;
use crate::DecodeError;
use crate::RawNode;

/// Encode/decode contract between a model type and node payloads
pub trait ModelCodec<T>: Send + Sync + 'static {
    fn encode(
        &self,
        value: &T,
    ) -> Result<Bytes, CodecError>;

    fn decode(
        &self,
        bytes: &[u8],
    ) -> Result<T, CodecError>;
}

/// Decode a raw node's payload, attaching path and version on failure.
///
/// `Ok(None)` when the raw node carries no payload.
pub(crate) fn decode_raw<T: 'static>(
    codec: &dyn ModelCodec<T>,
    raw: &RawNode,
) -> Result<Option<T>, DecodeError> {
    let Some(bytes) = raw.data.as_ref() else {
        return Ok(None);
    };
    codec
        .decode(bytes)
        .map(Some)
        .map_err(|source| DecodeError {
            path: raw.path.clone(),
            version: raw.stat.version,
            bytes: bytes.clone(),
            source,
        })
}
