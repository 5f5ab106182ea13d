// Upstream seam: where normalized CNAE records come from

use crate::error::CnaeResult;
use crate::types::{CnaeEntity, Level};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Provider of normalized CNAE records.
///
/// Implementations map whatever the upstream returns onto [`CnaeEntity`].
/// They do not cache; caching is the access layer's job.
#[async_trait::async_trait]
pub trait CnaeSource: Send + Sync {
    /// Every entity of `level`.
    async fn fetch_level(&self, level: Level) -> CnaeResult<Vec<CnaeEntity>>;

    /// A single entity, `Ok(None)` when the upstream knows no such code.
    async fn fetch_entity(&self, level: Level, code: &str) -> CnaeResult<Option<CnaeEntity>>;
}

/// Source backed by a fixed set of records
pub struct InMemorySource {
    by_level: HashMap<Level, Vec<CnaeEntity>>,
    fetches: AtomicUsize,
}

impl InMemorySource {
    pub fn new(entities: impl IntoIterator<Item = CnaeEntity>) -> Self {
        let mut by_level: HashMap<Level, Vec<CnaeEntity>> = HashMap::new();
        for entity in entities {
            by_level.entry(entity.level).or_default().push(entity);
        }
        Self {
            by_level,
            fetches: AtomicUsize::new(0),
        }
    }

    /// Number of fetch calls served so far
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl CnaeSource for InMemorySource {
    async fn fetch_level(&self, level: Level) -> CnaeResult<Vec<CnaeEntity>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.by_level.get(&level).cloned().unwrap_or_default())
    }

    async fn fetch_entity(&self, level: Level, code: &str) -> CnaeResult<Option<CnaeEntity>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .by_level
            .get(&level)
            .and_then(|entities| entities.iter().find(|e| e.code == code))
            .cloned())
    }
}
