use crate::codec::decode_raw;
use crate::DecodeError;
use crate::ModelCodec;
use crate::RawNode;
use crate::Stat;
use crate::ZPath;

/// Decoded view of one node at a point in time
///
/// Built fresh on every read and notification, never mutated. `data` is
/// `None` when the raw adapter holds no payload for the node, or (children
/// caches only) when the payload could not be decoded.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeSnapshot<T> {
    path: ZPath,
    data: Option<T>,
    stat: Stat,
}

impl<T> NodeSnapshot<T> {
    pub fn new(
        path: ZPath,
        data: Option<T>,
        stat: Stat,
    ) -> Self {
        Self { path, data, stat }
    }

    pub fn path(&self) -> &ZPath {
        &self.path
    }

    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    /// Version stamp of the node when the raw state was captured
    pub fn stat(&self) -> &Stat {
        &self.stat
    }

    pub fn into_data(self) -> Option<T> {
        self.data
    }
}

impl<T: 'static> NodeSnapshot<T> {
    /// Decode `raw`, failing on an undecodable payload
    pub(crate) fn decode(
        codec: &dyn ModelCodec<T>,
        raw: &RawNode,
    ) -> Result<Self, DecodeError> {
        let data = decode_raw(codec, raw)?;
        Ok(Self::new(raw.path.clone(), data, raw.stat))
    }

    /// Decode `raw`, degrading an undecodable payload to `data: None`.
    ///
    /// The decode error, if any, is returned alongside the snapshot.
    pub(crate) fn decode_lenient(
        codec: &dyn ModelCodec<T>,
        raw: &RawNode,
    ) -> (Self, Option<DecodeError>) {
        match decode_raw(codec, raw) {
            Ok(data) => (Self::new(raw.path.clone(), data, raw.stat), None),
            Err(e) => (Self::new(raw.path.clone(), None, raw.stat), Some(e)),
        }
    }
}
