use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

use crate::symbols::SymbolEntry;

/// Parsed entries of one `symbols.js`, tagged with the hash of the text they came from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedIndex {
    pub content_hash: u64,
    pub version: String,
    pub parsed_at: u64,
    pub entries: Vec<SymbolEntry>,
}

/// Content-addressed cache of parsed symbol indexes, kept in memory and on disk.
///
/// Keys and content hashes come from `DefaultHasher`, whose output is not stable
/// across Rust releases. After a toolchain upgrade old disk entries simply miss
/// and get rewritten on the next `set`.
pub struct ParseCache {
    memory: Arc<DashMap<String, CachedIndex>>,
    cache_dir: PathBuf,
    /// Bumped whenever the entry layout changes; older files are ignored.
    version: String,
}

impl ParseCache {
    pub fn new(cache_dir: impl AsRef<Path>, version: &str) -> Self {
        let cache_dir = cache_dir.as_ref().to_path_buf();
        if let Err(err) = fs::create_dir_all(&cache_dir) {
            warn!(dir = %cache_dir.display(), %err, "cannot create cache directory");
        }
        Self {
            memory: Arc::new(DashMap::new()),
            cache_dir,
            version: version.to_string(),
        }
    }

    fn hash_content(content: &str) -> u64 {
        let mut hasher = DefaultHasher::new();
        content.hash(&mut hasher);
        hasher.finish()
    }

    fn now() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    }

    fn disk_path(&self, file_path: &str) -> PathBuf {
        let mut hasher = DefaultHasher::new();
        file_path.hash(&mut hasher);
        self.version.hash(&mut hasher);
        self.cache_dir.join(format!("{:x}.json", hasher.finish()))
    }

    fn is_fresh(&self, cached: &CachedIndex, content_hash: u64) -> bool {
        cached.content_hash == content_hash && cached.version == self.version
    }

    /// Entries previously parsed from `file_path`, if `content` is unchanged.
    pub fn get(&self, file_path: &str, content: &str) -> Option<Vec<SymbolEntry>> {
        let content_hash = Self::hash_content(content);

        if let Some(cached) = self.memory.get(file_path) {
            if self.is_fresh(&cached, content_hash) {
                debug!(file = file_path, "symbol index cache hit (memory)");
                return Some(cached.entries.clone());
            }
        }

        let raw = fs::read_to_string(self.disk_path(file_path)).ok()?;
        let cached = serde_json::from_str::<CachedIndex>(&raw).ok()?;
        if !self.is_fresh(&cached, content_hash) {
            return None;
        }
        debug!(file = file_path, "symbol index cache hit (disk)");
        let entries = cached.entries.clone();
        self.memory.insert(file_path.to_string(), cached);
        Some(entries)
    }

    pub fn set(&self, file_path: &str, content: &str, entries: &[SymbolEntry]) {
        let cached = CachedIndex {
            content_hash: Self::hash_content(content),
            version: self.version.clone(),
            parsed_at: Self::now(),
            entries: entries.to_vec(),
        };

        let disk_path = self.disk_path(file_path);
        match serde_json::to_string(&cached) {
            Ok(json) => {
                if let Err(err) = fs::write(&disk_path, json) {
                    warn!(path = %disk_path.display(), %err, "cannot persist symbol index cache");
                }
            }
            Err(err) => warn!(file = file_path, %err, "cannot serialize symbol index cache"),
        }
        self.memory.insert(file_path.to_string(), cached);
    }

    pub fn clear(&self) {
        self.memory.clear();
        fs::remove_dir_all(&self.cache_dir).ok();
        fs::create_dir_all(&self.cache_dir).ok();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            memory_entries: self.memory.len(),
            cache_dir: self.cache_dir.display().to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CacheStats {
    pub memory_entries: usize,
    pub cache_dir: String,
}
