use std::sync::Arc;

use super::MemoryStore;
use super::Stat;
use crate::DecodeError;
use crate::ModelCodec;
use crate::Result;
use crate::ZPath;

/// Typed read/write access to one store path
///
/// Encodes models with the shared codec before writing. Creation makes
/// missing parents, so `store.at("1")?.create(&model)` works on an empty
/// store.
pub struct ModeledStore<T> {
    store: MemoryStore,
    path: ZPath,
    codec: Arc<dyn ModelCodec<T>>,
}

impl<T> Clone for ModeledStore<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            path: self.path.clone(),
            codec: Arc::clone(&self.codec),
        }
    }
}

impl<T> std::fmt::Debug for ModeledStore<T> {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("ModeledStore").field("path", &self.path).finish_non_exhaustive()
    }
}

impl<T: 'static> ModeledStore<T> {
    pub fn wrap(
        store: MemoryStore,
        path: ZPath,
        codec: Arc<dyn ModelCodec<T>>,
    ) -> Self {
        Self { store, path, codec }
    }

    pub fn path(&self) -> &ZPath {
        &self.path
    }

    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    /// Same store and codec, child path
    pub fn at(
        &self,
        child: impl AsRef<str>,
    ) -> Result<Self> {
        Ok(Self {
            store: self.store.clone(),
            path: self.path.at(child)?,
            codec: Arc::clone(&self.codec),
        })
    }

    /// Create the node (and missing parents) holding `model`
    pub fn create(
        &self,
        model: &T,
    ) -> Result<Stat> {
        let bytes = self.codec.encode(model)?;
        self.store.create_with_parents(&self.path, bytes)
    }

    /// Overwrite the node's model regardless of its version
    pub fn update(
        &self,
        model: &T,
    ) -> Result<Stat> {
        self.update_with_version(model, None)
    }

    /// Overwrite the node's model if its data version still equals `version`
    pub fn update_with_version(
        &self,
        model: &T,
        version: Option<i32>,
    ) -> Result<Stat> {
        let bytes = self.codec.encode(model)?;
        self.store.set_data(&self.path, bytes, version)
    }

    pub fn read(&self) -> Result<(T, Stat)> {
        let (bytes, stat) = self.store.get_data(&self.path)?;
        let model = self.codec.decode(&bytes).map_err(|source| DecodeError {
            path: self.path.clone(),
            version: stat.version,
            bytes,
            source,
        })?;
        Ok((model, stat))
    }

    pub fn delete(&self) -> Result<()> {
        self.store.delete(&self.path, None)
    }

    pub fn delete_with_version(
        &self,
        version: i32,
    ) -> Result<()> {
        self.store.delete(&self.path, Some(version))
    }

    /// Child paths of this node, sorted by name
    pub fn children(&self) -> Result<Vec<ZPath>> {
        self.store
            .get_children(&self.path)?
            .into_iter()
            .map(|name| self.path.at(name))
            .collect()
    }
}
