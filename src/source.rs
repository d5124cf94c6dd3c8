//! Byte sources the configuration document is loaded from.
//!
//! The installer ships its default configuration inside a file tree, either
//! on disk or embedded in the binary. [`ByteSource`] abstracts over both so
//! loading never depends on process-global state:
//!
//! - [`DirSource`] reads files below a root directory.
//! - [`MemorySource`] serves files from memory, for embedded trees and tests.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Location of the installer configuration inside a source tree.
pub const DEFAULT_CONFIG_PATH: &str = "installer/config.yaml";

/// Something that can hand out the bytes of a file by relative path.
pub trait ByteSource {
    fn read(&self, path: &Path) -> Result<Vec<u8>, ConfigError>;
}

/// Files below a directory on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirSource {
    root: PathBuf,
}

impl DirSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DirSource { root: root.into() }
    }

    /// Rooted at the current working directory.
    pub fn cwd() -> Result<Self, ConfigError> {
        std::env::current_dir()
            .map(DirSource::new)
            .map_err(|e| ConfigError::IoError {
                path: PathBuf::from("."),
                source: e,
            })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ByteSource for DirSource {
    fn read(&self, path: &Path) -> Result<Vec<u8>, ConfigError> {
        let full = self.root.join(path);
        std::fs::read(&full).map_err(|e| ConfigError::IoError {
            path: full,
            source: e,
        })
    }
}

/// Files held in memory, keyed by relative path.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    files: HashMap<PathBuf, Vec<u8>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a file and return the source, builder style.
    pub fn with_file(mut self, path: impl Into<PathBuf>, content: impl Into<Vec<u8>>) -> Self {
        self.insert(path, content);
        self
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, content: impl Into<Vec<u8>>) {
        self.files.insert(path.into(), content.into());
    }
}

impl ByteSource for MemorySource {
    fn read(&self, path: &Path) -> Result<Vec<u8>, ConfigError> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| ConfigError::IoError {
                path: path.to_path_buf(),
                source: io::Error::new(io::ErrorKind::NotFound, "no such file in memory source"),
            })
    }
}
