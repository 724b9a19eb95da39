use std::marker::PhantomData;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::ModelCodec;
use crate::CodecError;

/// JSON codec backed by serde_json
pub struct JsonCodec<T> {
    _model: PhantomData<fn() -> T>,
}

impl<T> JsonCodec<T> {
    pub fn new() -> Self {
        Self {
            _model: PhantomData,
        }
    }
}

impl<T> Default for JsonCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for JsonCodec<T> {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.write_str("JsonCodec")
    }
}

impl<T> ModelCodec<T> for JsonCodec<T>
where
    T: Serialize + DeserializeOwned + 'static,
{
    fn encode(
        &self,
        value: &T,
    ) -> Result<Bytes, CodecError> {
        Ok(Bytes::from(serde_json::to_vec(value)?))
    }

    fn decode(
        &self,
        bytes: &[u8],
    ) -> Result<T, CodecError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
