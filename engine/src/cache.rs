use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use crate::config::{ColumnConfig, EngineConfig, KeyConfig};
use crate::controllers::reconcile::Dataset;
use crate::error::EngineError;

/// Where a source stood on disk when it was read.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SourceIdentity {
    NotConfigured,
    Missing(PathBuf),
    File {
        path: PathBuf,
        len: u64,
        modified: Option<SystemTime>,
    },
}

impl SourceIdentity {
    pub fn of(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return SourceIdentity::NotConfigured;
        };
        match fs::metadata(path) {
            Ok(meta) => SourceIdentity::File {
                path: path.to_path_buf(),
                len: meta.len(),
                modified: meta.modified().ok(),
            },
            Err(_) => SourceIdentity::Missing(path.to_path_buf()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    orders: SourceIdentity,
    returns: SourceIdentity,
    tickets: SourceIdentity,
    columns: ColumnConfig,
    keys: KeyConfig,
}

impl CacheKey {
    pub fn for_config(config: &EngineConfig) -> Self {
        CacheKey {
            orders: SourceIdentity::of(Some(&config.orders_path)),
            returns: SourceIdentity::of(config.returns_path.as_deref()),
            tickets: SourceIdentity::of(config.tickets_path.as_deref()),
            columns: config.columns.clone(),
            keys: config.keys.clone(),
        }
    }
}

/// Read-through cache of the latest reconciled dataset. A source whose
/// length or modification time changed produces a new key; the dataset is
/// read again and replaces the stale one.
#[derive(Debug, Default)]
pub struct SourceCache {
    entry: Option<(CacheKey, Arc<Dataset>)>,
    hits: usize,
    misses: usize,
}

impl SourceCache {
    pub fn new() -> Self {
        SourceCache::default()
    }

    pub fn get_or_load<F>(&mut self, config: &EngineConfig, load: F) -> Result<Arc<Dataset>, EngineError>
    where
        F: FnOnce() -> Result<Dataset, EngineError>,
    {
        let key = CacheKey::for_config(config);
        if let Some((cached, dataset)) = &self.entry {
            if *cached == key {
                self.hits += 1;
                log::debug!("Source cache hit for {}", config.orders_path.display());
                return Ok(Arc::clone(dataset));
            }
        }

        self.misses += 1;
        log::debug!("Source cache miss for {}", config.orders_path.display());
        let dataset = Arc::new(load()?);
        self.entry = Some((key, Arc::clone(&dataset)));
        Ok(dataset)
    }

    pub fn hits(&self) -> usize {
        self.hits
    }

    pub fn misses(&self) -> usize {
        self.misses
    }

    pub fn len(&self) -> usize {
        usize::from(self.entry.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.entry.is_none()
    }

    pub fn clear(&mut self) {
        self.entry = None;
    }
}
