// src/watch/hash.rs

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use blake3::Hasher;
use tracing::debug;

use crate::fs::FileSystem;

/// Hash the contents of a single file.
pub fn compute_file_hash(fs: &dyn FileSystem, path: &Path) -> Result<String> {
    let bytes = fs
        .read(path)
        .with_context(|| format!("reading file for hashing: {:?}", path))?;
    let mut hasher = Hasher::new();
    hasher.update(&bytes);
    Ok(hasher.finalize().to_hex().to_string())
}

/// Last seen content hash per (group, relative path).
pub trait HashStore: Send + Sync {
    fn load(&self, group: &str, path: &str) -> Option<String>;
    fn save(&mut self, group: &str, path: &str, hash: &str);
    fn forget(&mut self, group: &str, path: &str);
}

/// Process-local hash memory; nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryHashStore {
    map: HashMap<(String, String), String>,
}

impl MemoryHashStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl HashStore for MemoryHashStore {
    fn load(&self, group: &str, path: &str) -> Option<String> {
        self.map
            .get(&(group.to_string(), path.to_string()))
            .cloned()
    }

    fn save(&mut self, group: &str, path: &str, hash: &str) {
        debug!(group, path, hash, "stored content hash");
        self.map
            .insert((group.to_string(), path.to_string()), hash.to_string());
    }

    fn forget(&mut self, group: &str, path: &str) {
        self.map.remove(&(group.to_string(), path.to_string()));
    }
}

/// Decide whether a change to `rel_path` should trigger `group`.
///
/// A file whose hash matches the stored one is skipped. A file that can no
/// longer be read (deleted, renamed away) always triggers and is forgotten.
pub fn content_changed(
    store: &mut dyn HashStore,
    fs: &dyn FileSystem,
    group: &str,
    rel_path: &str,
    abs_path: &Path,
) -> bool {
    if !fs.is_file(abs_path) {
        store.forget(group, rel_path);
        return true;
    }

    let hash = match compute_file_hash(fs, abs_path) {
        Ok(h) => h,
        Err(err) => {
            debug!(group, path = rel_path, error = %err, "hashing failed; triggering anyway");
            return true;
        }
    };

    if store.load(group, rel_path).as_deref() == Some(hash.as_str()) {
        return false;
    }
    store.save(group, rel_path, &hash);
    true
}
