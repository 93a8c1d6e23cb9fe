use dashmap::mapref::one::Ref;
use dashmap::DashMap;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::cache::ParseCache;
use crate::ddox;
use crate::error::SymbolError;
use crate::symbols::{SymbolEntry, SymbolTable};

pub const INDEX_FILE_NAME: &str = "symbols.js";

/// A `symbols.js` that could not be read or parsed.
#[derive(Debug, Clone, Serialize)]
pub struct IndexFailure {
    pub path: String,
    pub message: String,
}

#[derive(Serialize)]
struct IndexSnapshot<'a> {
    versions: BTreeMap<&'a str, &'a [SymbolEntry]>,
    failures: Vec<IndexFailure>,
}

/// Symbol tables of every documented release under a docs root, keyed by version directory.
pub struct DocsIndex {
    pub tables: Arc<DashMap<String, SymbolTable>>,
    pub failures: Arc<DashMap<String, String>>,
}

impl DocsIndex {
    pub fn index_root(root: impl AsRef<Path>, cache: Option<&ParseCache>) -> Self {
        let root = root.as_ref();
        let files = find_index_files(root);
        info!(root = %root.display(), files = files.len(), "indexing documentation root");

        let tables = Arc::new(DashMap::new());
        let failures = Arc::new(DashMap::new());

        files.par_iter().for_each(|file| {
            let shown = file.display().to_string();
            match load_entries(file, cache) {
                Ok(entries) => {
                    let version = version_key(root, file);
                    debug!(%version, symbols = entries.len(), "indexed symbol file");
                    tables.insert(version, SymbolTable::from_entries(entries));
                }
                Err(err) => {
                    warn!(file = %shown, %err, "skipping symbol index");
                    failures.insert(shown, err.to_string());
                }
            }
        });

        Self { tables, failures }
    }

    pub fn versions(&self) -> Vec<String> {
        let mut versions: Vec<String> = self.tables.iter().map(|e| e.key().clone()).collect();
        versions.sort();
        versions
    }

    pub fn table(&self, version: &str) -> Option<Ref<'_, String, SymbolTable>> {
        self.tables.get(version)
    }

    pub fn lookup(&self, version: &str, name: &str) -> Option<SymbolEntry> {
        self.tables.get(version)?.lookup(name).cloned()
    }

    pub fn failures(&self) -> Vec<IndexFailure> {
        let mut out: Vec<IndexFailure> = self
            .failures
            .iter()
            .map(|e| IndexFailure {
                path: e.key().clone(),
                message: e.value().clone(),
            })
            .collect();
        out.sort_by(|a, b| a.path.cmp(&b.path));
        out
    }

    pub fn to_json(&self) -> String {
        let tables: Vec<(String, SymbolTable)> = self
            .tables
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        let versions = tables
            .iter()
            .map(|(version, table)| (version.as_str(), table.entries()))
            .collect();
        let snapshot = IndexSnapshot {
            versions,
            failures: self.failures(),
        };
        serde_json::to_string(&snapshot).unwrap_or_else(|_| "{}".into())
    }
}

fn load_entries(
    file: &Path,
    cache: Option<&ParseCache>,
) -> Result<Vec<SymbolEntry>, SymbolError> {
    let source = fs::read_to_string(file).map_err(|source| SymbolError::Io {
        path: file.to_path_buf(),
        source,
    })?;
    let key = file.to_string_lossy();

    if let Some(entries) = cache.and_then(|c| c.get(&key, &source)) {
        return Ok(entries);
    }
    let entries = ddox::parse(&source)?;
    if let Some(cache) = cache {
        cache.set(&key, &source, &entries);
    }
    Ok(entries)
}

/// Version directory of an index file relative to the root; `.` for the root itself.
fn version_key(root: &Path, file: &Path) -> String {
    let dir = file.parent().unwrap_or(root);
    match dir.strip_prefix(root) {
        Ok(rel) if rel.as_os_str().is_empty() => ".".to_string(),
        Ok(rel) => rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/"),
        Err(_) => dir.display().to_string(),
    }
}

pub fn find_index_files(root: &Path) -> Vec<PathBuf> {
    let mut out = Vec::new();
    let walker = WalkDir::new(root).into_iter().filter_entry(|entry| {
        let name = entry.file_name();
        !(entry.depth() > 0 && (name == ".git" || name == "node_modules" || name == "target"))
    });
    for entry in walker.filter_map(|e| e.ok()) {
        if entry.file_type().is_file() && entry.file_name() == INDEX_FILE_NAME {
            out.push(entry.into_path());
        }
    }
    out.sort();
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const GENERATED: &str = include_str!("../docs/v0.1.0/symbols.js");

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn indexes_versioned_docs() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "v0.1.0/symbols.js", GENERATED);
        write(
            dir.path(),
            "v0.2.0/symbols.js",
            concat!(
                "var symbols = [\n",
                "{name: 'quill.pool', kind: \"module\", ",
                "path: './quill/pool.html', attributes: []},\n",
                "];",
            ),
        );
        write(dir.path(), "v0.2.0/index.html", "<html></html>");

        let index = DocsIndex::index_root(dir.path(), None);
        assert_eq!(index.versions(), vec!["v0.1.0", "v0.2.0"]);
        assert!(index.failures().is_empty());
        assert_eq!(index.table("v0.1.0").map(|t| t.len()), Some(24));
        assert_eq!(
            index.lookup("v0.2.0", "quill.pool").map(|e| e.path),
            Some("./quill/pool.html".to_string())
        );
        assert!(index.lookup("v0.2.0", "quill.database").is_none());
        assert!(index.lookup("v9", "quill.pool").is_none());
    }

    #[test]
    fn broken_file_is_isolated() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "good/symbols.js", GENERATED);
        write(dir.path(), "bad/symbols.js", "var symbols = [\n{oops}\n];");

        let index = DocsIndex::index_root(dir.path(), None);
        assert_eq!(index.versions(), vec!["good"]);
        let failures = index.failures();
        assert_eq!(failures.len(), 1);
        assert!(failures[0].path.ends_with("symbols.js"));
        assert!(failures[0].path.contains("bad"));
        assert!(failures[0].message.contains("line 2"));
    }

    #[test]
    fn skips_vendor_dirs_and_keys_root_file() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "symbols.js", GENERATED);
        write(dir.path(), "node_modules/pkg/symbols.js", GENERATED);
        write(dir.path(), ".git/symbols.js", GENERATED);

        let index = DocsIndex::index_root(dir.path(), None);
        assert_eq!(index.versions(), vec!["."]);
    }

    #[test]
    fn cache_is_filled_and_reused() {
        let docs = tempfile::tempdir().unwrap();
        let cache_dir = tempfile::tempdir().unwrap();
        write(docs.path(), "v0.1.0/symbols.js", GENERATED);
        let cache = ParseCache::new(cache_dir.path(), "1");

        let first = DocsIndex::index_root(docs.path(), Some(&cache));
        assert_eq!(cache.stats().memory_entries, 1);
        let second = DocsIndex::index_root(docs.path(), Some(&cache));
        assert_eq!(first.versions(), second.versions());
        assert_eq!(
            second.table("v0.1.0").map(|t| t.entries().to_vec()),
            Some(SymbolTable::builtin().entries().to_vec())
        );
    }

    #[test]
    fn json_snapshot_lists_versions() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "v0.1.0/symbols.js", GENERATED);
        let index = DocsIndex::index_root(dir.path(), None);
        let value: serde_json::Value = serde_json::from_str(&index.to_json()).unwrap();
        assert_eq!(value["versions"]["v0.1.0"].as_array().map(Vec::len), Some(24));
        assert_eq!(value["versions"]["v0.1.0"][0]["name"], "quill.bind");
        assert_eq!(value["failures"].as_array().map(Vec::len), Some(0));
    }
}
