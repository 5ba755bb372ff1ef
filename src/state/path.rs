//! Compiled dot-paths into the state tree.

use crate::error::{HubError, Result};
use lru::LruCache;
use parking_lot::Mutex;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// Default number of compiled string paths kept by a [`PathCache`].
const DEFAULT_PATH_CACHE_SIZE: usize = 256;

/// A validated, pre-split path into the state tree.
///
/// Cloning is cheap; the segments are shared.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct StatePath {
    segments: Arc<[String]>,
}

impl StatePath {
    /// Parse a dot-separated path.
    ///
    /// One leading and one trailing dot are stripped before splitting. An
    /// empty result is the empty path; an empty interior segment is rejected.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.strip_prefix('.').unwrap_or(raw);
        let trimmed = trimmed.strip_suffix('.').unwrap_or(trimmed);

        if trimmed.is_empty() {
            return Ok(Self::empty());
        }

        let segments: Vec<String> = trimmed.split('.').map(str::to_string).collect();
        if segments.iter().any(String::is_empty) {
            return Err(HubError::InvalidPath(raw.to_string()));
        }

        Ok(Self {
            segments: segments.into(),
        })
    }

    /// Build from already-split segments. Segments may contain dots.
    pub fn from_segments<I, S>(segments: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments.iter().any(String::is_empty) {
            return Err(HubError::InvalidPath(segments.join(".")));
        }
        Ok(Self {
            segments: segments.into(),
        })
    }

    /// The path with no segments. Reads through it yield nothing.
    pub fn empty() -> Self {
        Self {
            segments: Vec::new().into(),
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

impl fmt::Display for StatePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}

impl fmt::Debug for StatePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StatePath({:?})", self.segments)
    }
}

/// Bounded cache of string paths to their compiled form.
pub struct PathCache {
    entries: Mutex<LruCache<String, StatePath>>,
}

impl PathCache {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_PATH_CACHE_SIZE)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Return the compiled path for `raw`, parsing it on first use.
    pub fn compile(&self, raw: &str) -> Result<StatePath> {
        if let Some(path) = self.entries.lock().get(raw) {
            return Ok(path.clone());
        }

        let path = StatePath::parse(raw)?;
        self.entries.lock().put(raw.to_string(), path.clone());
        Ok(path)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for PathCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Anything the hub accepts as a path: dotted strings, segment lists, or an
/// already compiled [`StatePath`].
pub trait AsStatePath {
    fn resolve(&self, cache: &PathCache) -> Result<StatePath>;
}

impl AsStatePath for str {
    fn resolve(&self, cache: &PathCache) -> Result<StatePath> {
        cache.compile(self)
    }
}

impl AsStatePath for String {
    fn resolve(&self, cache: &PathCache) -> Result<StatePath> {
        cache.compile(self)
    }
}

impl AsStatePath for StatePath {
    fn resolve(&self, _cache: &PathCache) -> Result<StatePath> {
        Ok(self.clone())
    }
}

impl AsStatePath for [&str] {
    fn resolve(&self, _cache: &PathCache) -> Result<StatePath> {
        StatePath::from_segments(self.iter().copied())
    }
}

impl AsStatePath for [String] {
    fn resolve(&self, _cache: &PathCache) -> Result<StatePath> {
        StatePath::from_segments(self.iter().cloned())
    }
}

impl<const N: usize> AsStatePath for [&str; N] {
    fn resolve(&self, cache: &PathCache) -> Result<StatePath> {
        self.as_slice().resolve(cache)
    }
}

impl AsStatePath for Vec<&str> {
    fn resolve(&self, cache: &PathCache) -> Result<StatePath> {
        self.as_slice().resolve(cache)
    }
}

impl AsStatePath for Vec<String> {
    fn resolve(&self, cache: &PathCache) -> Result<StatePath> {
        self.as_slice().resolve(cache)
    }
}

impl<T: AsStatePath + ?Sized> AsStatePath for &T {
    fn resolve(&self, cache: &PathCache) -> Result<StatePath> {
        (**self).resolve(cache)
    }
}
