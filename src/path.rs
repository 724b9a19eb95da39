//! Node paths for the coordination store.
//!
//! A [`ZPath`] is an absolute, slash-separated path such as `/test/path/1`.
//! Paths are validated on construction so every other component can assume
//! well-formed input.

use std::fmt;
use std::sync::Arc;

use crate::PathError;
use crate::Result;

pub(crate) const PATH_SEPARATOR: char = '/';

/// Validated absolute node path
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ZPath {
    full: Arc<str>,
}

impl ZPath {
    /// The root path `/`
    pub fn root() -> Self {
        Self { full: Arc::from("/") }
    }

    /// Parse and validate an absolute path.
    ///
    /// # Errors
    /// Returns [`PathError`] when the path is empty, relative, ends with a
    /// separator, contains empty or relative (`.`/`..`) segments, or contains
    /// a NUL character.
    pub fn parse(path: &str) -> Result<Self> {
        validate(path)?;
        Ok(Self { full: Arc::from(path) })
    }

    /// Child path `self/name`.
    ///
    /// `name` must be a single segment.
    pub fn at(
        &self,
        name: impl AsRef<str>,
    ) -> Result<Self> {
        let name = name.as_ref();
        validate_segment(name)?;
        let full = if self.is_root() {
            format!("/{name}")
        } else {
            format!("{}/{name}", self.full)
        };
        Ok(Self { full: Arc::from(full) })
    }

    /// Parent path, `None` for the root
    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        match self.full.rfind(PATH_SEPARATOR) {
            Some(0) => Some(Self::root()),
            Some(idx) => Some(Self {
                full: Arc::from(&self.full[..idx]),
            }),
            None => None,
        }
    }

    /// Last segment of the path, empty for the root
    pub fn name(&self) -> &str {
        match self.full.rfind(PATH_SEPARATOR) {
            Some(idx) => &self.full[idx + 1..],
            None => &self.full,
        }
    }

    pub fn full_path(&self) -> &str {
        &self.full
    }

    pub fn is_root(&self) -> bool {
        &*self.full == "/"
    }

    /// Whether `self` is a direct child of `parent`
    pub fn is_child_of(
        &self,
        parent: &ZPath,
    ) -> bool {
        self.parent().as_ref() == Some(parent)
    }

    /// All ancestors from the root down to (excluding) `self`
    pub fn ancestors(&self) -> Vec<ZPath> {
        let mut out = Vec::new();
        let mut current = self.parent();
        while let Some(path) = current {
            current = path.parent();
            out.push(path);
        }
        out.reverse();
        out
    }
}

impl fmt::Display for ZPath {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(&self.full)
    }
}

impl fmt::Debug for ZPath {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "ZPath({})", self.full)
    }
}

impl TryFrom<&str> for ZPath {
    type Error = crate::Error;

    fn try_from(value: &str) -> Result<Self> {
        ZPath::parse(value)
    }
}

impl AsRef<str> for ZPath {
    fn as_ref(&self) -> &str {
        &self.full
    }
}

fn validate(path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(PathError::Empty.into());
    }
    if !path.starts_with(PATH_SEPARATOR) {
        return Err(PathError::NotAbsolute(path.to_string()).into());
    }
    if path == "/" {
        return Ok(());
    }
    if path.ends_with(PATH_SEPARATOR) {
        return Err(PathError::TrailingSeparator(path.to_string()).into());
    }
    for segment in path[1..].split(PATH_SEPARATOR) {
        validate_segment(segment).map_err(|_| PathError::InvalidSegment {
            path: path.to_string(),
            segment: segment.to_string(),
        })?;
    }
    Ok(())
}

fn validate_segment(segment: &str) -> std::result::Result<(), PathError> {
    if segment.is_empty()
        || segment == "."
        || segment == ".."
        || segment.contains(PATH_SEPARATOR)
        || segment.contains('\0')
    {
        return Err(PathError::InvalidSegment {
            path: segment.to_string(),
            segment: segment.to_string(),
        });
    }
    Ok(())
}
