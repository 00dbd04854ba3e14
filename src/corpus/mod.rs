//! The local corpus an endpoint cycles through while publishing.

use std::fs;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use tracing::info;

use crate::utils::{Error, Result};

/// Files loaded once at startup and served round-robin.
#[derive(Debug, Clone)]
pub struct Corpus {
    items: Vec<Bytes>,
}

impl Corpus {
    /// Loads every file in `dir` whose extension equals `extension`,
    /// in file-name order.
    pub fn load(dir: &Path, extension: &str) -> Result<Self> {
        let mut paths: Vec<PathBuf> = fs::read_dir(dir)
            .map_err(|e| Error::Config(format!("cannot read corpus {}: {e}", dir.display())))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file())
            .filter(|path| path.extension().is_some_and(|ext| ext == extension))
            .collect();
        paths.sort();

        let items = paths
            .iter()
            .map(|path| fs::read(path).map(Bytes::from))
            .collect::<std::io::Result<Vec<_>>>()?;

        let corpus = Self::from_items(items)?;
        info!(
            "Loaded {} .{} files from {}",
            corpus.len(),
            extension,
            dir.display()
        );
        Ok(corpus)
    }

    pub fn from_items(items: Vec<Bytes>) -> Result<Self> {
        if items.is_empty() {
            return Err(Error::Config("corpus is empty".to_string()));
        }
        Ok(Self { items })
    }

    /// Item for message `i`, wrapping around the corpus.
    pub fn get(&self, i: u64) -> Bytes {
        let idx = (i % self.items.len() as u64) as usize;
        self.items[idx].clone()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
