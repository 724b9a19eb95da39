use std::marker::PhantomData;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::ModelCodec;
use crate::CodecError;

/// Compact binary codec backed by bincode
pub struct BincodeCodec<T> {
    _model: PhantomData<fn() -> T>,
}

impl<T> BincodeCodec<T> {
    pub fn new() -> Self {
        Self {
            _model: PhantomData,
        }
    }
}

impl<T> Default for BincodeCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for BincodeCodec<T> {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.write_str("BincodeCodec")
    }
}

impl<T> ModelCodec<T> for BincodeCodec<T>
where
    T: Serialize + DeserializeOwned + 'static,
{
    fn encode(
        &self,
        value: &T,
    ) -> Result<Bytes, CodecError> {
        Ok(Bytes::from(bincode::serialize(value)?))
    }

    fn decode(
        &self,
        bytes: &[u8],
    ) -> Result<T, CodecError> {
        Ok(bincode::deserialize(bytes)?)
    }
}
