use std::fs;
use std::io;
use std::path::Path;

use crate::internal::errors::{Error, Result};

/// Read access to durable storage, keyed by canonical path.
pub trait SourceLoader: Send + Sync {
  /// Return the full text at `path`, failing with [`Error::NotFound`] when it does not exist.
  fn load(&self, path: &Path) -> Result<String>;
}

/// Loads sources straight from the local filesystem. Nothing is cached.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsSourceLoader;

impl SourceLoader for FsSourceLoader {
  fn load(&self, path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|source| match source.kind() {
      io::ErrorKind::NotFound => Error::NotFound {
        path: path.to_path_buf(),
      },
      _ => Error::Io {
        path: path.to_path_buf(),
        source,
      },
    })
  }
}
