//! Per-neighborhood subgraph cache.
//!
//! One JSON file per `lie_name` under the cache directory, holding the node
//! and edge tables at the post-construction, pre-scoring state. Entry
//! existence is the cache-hit signal; entries embed a schema version and any
//! unreadable or mismatched entry is treated as a miss and overwritten by the
//! rebuild. There is no staleness check against source layers: clearing the
//! directory is how new layers get picked up.

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::{fs, process};

use kerb_core::errors::{KerbError, Result};
use kerb_core::node::{GraphNode, Subgraph};

/// Bump when the node or edge table layout changes; old entries then rebuild
/// automatically.
pub const CACHE_SCHEMA_VERSION: u32 = 2;

/// Serialized form of one cached subgraph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub schema_version: u32,
    pub lie_name: String,
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<[usize; 2]>,
}

impl CacheEntry {
    fn from_subgraph(subgraph: &Subgraph) -> Self {
        Self {
            schema_version: CACHE_SCHEMA_VERSION,
            lie_name: subgraph.lie_name.clone(),
            nodes: subgraph.nodes.clone(),
            edges: subgraph.edges.clone(),
        }
    }

    fn into_subgraph(self) -> Subgraph {
        Subgraph::new(self.lie_name, self.nodes, self.edges)
    }
}

/// Maps a neighborhood name to a filesystem-safe file stem.
fn sanitize_name(lie_name: &str) -> String {
    let stem: String = lie_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if stem.is_empty() {
        "unnamed".to_string()
    } else {
        stem
    }
}

/// Disk store for per-neighborhood cache entries.
#[derive(Debug, Clone)]
pub struct CacheStore {
    dir: PathBuf,
}

impl CacheStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Deterministic entry path for a neighborhood.
    pub fn entry_path(&self, lie_name: &str) -> PathBuf {
        self.dir.join(format!("{}.json", sanitize_name(lie_name)))
    }

    /// Whether an entry file exists for the neighborhood.
    pub fn is_cached(&self, lie_name: &str) -> bool {
        self.entry_path(lie_name).exists()
    }

    /// Loads a cached subgraph, absorbing every anomaly as a miss.
    ///
    /// Unreadable files, malformed JSON, schema-version mismatches, and
    /// identity mismatches all warn and return `None` so the caller rebuilds.
    pub fn load(&self, lie_name: &str) -> Option<Subgraph> {
        let path = self.entry_path(lie_name);
        if !path.exists() {
            return None;
        }
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) => {
                warn!("cache read failed at {}: {e}; rebuilding", path.display());
                return None;
            }
        };
        let entry: CacheEntry = match serde_json::from_str(&text) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("cache entry {} is unreadable: {e}; rebuilding", path.display());
                return None;
            }
        };
        if entry.schema_version != CACHE_SCHEMA_VERSION {
            warn!(
                "cache entry {} has schema v{}, expected v{CACHE_SCHEMA_VERSION}; rebuilding",
                path.display(),
                entry.schema_version
            );
            return None;
        }
        if entry.lie_name != lie_name {
            warn!(
                "cache entry {} belongs to '{}', not '{lie_name}'; rebuilding",
                path.display(),
                entry.lie_name
            );
            return None;
        }
        debug!("cache hit for '{lie_name}'");
        Some(entry.into_subgraph())
    }

    /// Persists a subgraph's pre-scoring state atomically.
    ///
    /// Writes to a process-unique temp file in the cache directory, then
    /// renames over the final path, so a racing writer can never leave a
    /// truncated entry behind.
    pub fn store(&self, subgraph: &Subgraph) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| KerbError::cache(self.dir.display().to_string(), e.to_string()))?;
        let path = self.entry_path(&subgraph.lie_name);
        let entry = CacheEntry::from_subgraph(subgraph);
        let json = serde_json::to_string_pretty(&entry)
            .map_err(|e| KerbError::cache(path.display().to_string(), e.to_string()))?;

        let tmp = path.with_extension(format!("json.tmp{}", process::id()));
        fs::write(&tmp, json)
            .map_err(|e| KerbError::cache(tmp.display().to_string(), e.to_string()))?;
        fs::rename(&tmp, &path)
            .map_err(|e| KerbError::cache(path.display().to_string(), e.to_string()))?;
        debug!("cached '{}' at {}", subgraph.lie_name, path.display());
        Ok(())
    }

    /// Removes one entry; returns whether it existed.
    pub fn remove(&self, lie_name: &str) -> Result<bool> {
        let path = self.entry_path(lie_name);
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(KerbError::cache(path.display().to_string(), e.to_string())),
        }
    }

    /// Removes every `.json` entry in the cache directory; returns how many
    /// were deleted. A missing directory counts as an empty cache.
    pub fn clear(&self) -> Result<usize> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(KerbError::cache(self.dir.display().to_string(), e.to_string())),
        };
        let mut removed = 0;
        for entry in entries {
            let entry = entry
                .map_err(|e| KerbError::cache(self.dir.display().to_string(), e.to_string()))?;
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                fs::remove_file(&path)
                    .map_err(|e| KerbError::cache(path.display().to_string(), e.to_string()))?;
                removed += 1;
            }
        }
        debug!("cleared {removed} cache entries under {}", self.dir.display());
        Ok(removed)
    }
}
