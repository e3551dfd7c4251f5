//! Position persistence backends.
use std::cell::RefCell;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use desk_traits::{BoxError, PositionStore};

use crate::error::HwError;

/// Stores the position as decimal text in a single file.
///
/// Writes go to a sibling temp file which is synced and then renamed over the
/// target, so a power cut leaves either the old or the new value. Anything
/// that does not parse as an integer loads as "absent".
#[derive(Debug, Clone)]
pub struct FilePositionStore {
    path: PathBuf,
}

impl FilePositionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl PositionStore for FilePositionStore {
    fn load_position(&mut self) -> Result<Option<i32>, BoxError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Box::new(HwError::Io(e))),
        };
        match text.trim().parse::<i32>() {
            Ok(v) => Ok(Some(v)),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "position file unreadable, treating as absent");
                Ok(None)
            }
        }
    }

    fn store_position(&mut self, position: i32) -> Result<(), BoxError> {
        let tmp = self.tmp_path();
        let mut f = fs::File::create(&tmp).map_err(HwError::Io)?;
        write!(f, "{position}").map_err(HwError::Io)?;
        f.sync_all().map_err(HwError::Io)?;
        drop(f);
        fs::rename(&tmp, &self.path).map_err(HwError::Io)?;
        tracing::trace!(position, path = %self.path.display(), "position stored");
        Ok(())
    }
}

#[derive(Debug, Default)]
struct MemoryInner {
    value: Option<i32>,
    writes: usize,
    fail_loads: bool,
    fail_stores: bool,
}

/// In-memory store; clones share the same slot so tests can inspect writes.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Rc<RefCell<MemoryInner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(v: i32) -> Self {
        let s = Self::default();
        s.inner.borrow_mut().value = Some(v);
        s
    }

    pub fn value(&self) -> Option<i32> {
        self.inner.borrow().value
    }

    pub fn writes(&self) -> usize {
        self.inner.borrow().writes
    }

    pub fn set_fail_loads(&self, fail: bool) {
        self.inner.borrow_mut().fail_loads = fail;
    }

    pub fn set_fail_stores(&self, fail: bool) {
        self.inner.borrow_mut().fail_stores = fail;
    }
}

impl PositionStore for MemoryStore {
    fn load_position(&mut self) -> Result<Option<i32>, BoxError> {
        let inner = self.inner.borrow();
        if inner.fail_loads {
            return Err(Box::new(HwError::Io(std::io::Error::other(
                "memory store load failure",
            ))));
        }
        Ok(inner.value)
    }

    fn store_position(&mut self, position: i32) -> Result<(), BoxError> {
        let mut inner = self.inner.borrow_mut();
        if inner.fail_stores {
            return Err(Box::new(HwError::Io(std::io::Error::other(
                "memory store write failure",
            ))));
        }
        inner.value = Some(position);
        inner.writes += 1;
        Ok(())
    }
}
