//! CNAE access layer.
//!
//! [`CnaeService`] sits between callers and a [`CnaeSource`]: it validates
//! code shapes, memoizes upstream answers, enforces the record invariants
//! (non-empty descriptions, parent links, unique codes) and implements
//! filtered listing and search on top of whole-level fetches.

use crate::cache::ResponseCache;
use crate::code;
use crate::error::{CnaeError, CnaeResult};
use crate::search::{rank, resolve_levels, SearchQuery};
use crate::source::CnaeSource;
use crate::types::{CnaeEntity, Level, SearchHit};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// Default soft bound on cached responses
pub const DEFAULT_CACHE_CAPACITY: usize = 512;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum CacheKey {
    Level(Level),
    Entity(Level, String),
}

#[derive(Debug, Clone)]
enum Cached {
    Many(Arc<Vec<CnaeEntity>>),
    One(Arc<CnaeEntity>),
}

/// Hierarchical navigation and search over the CNAE taxonomy
#[derive(Clone)]
pub struct CnaeService {
    source: Arc<dyn CnaeSource>,
    cache: ResponseCache<CacheKey, Cached>,
}

impl CnaeService {
    pub fn new(source: Arc<dyn CnaeSource>) -> Self {
        Self::with_cache_capacity(source, DEFAULT_CACHE_CAPACITY)
    }

    pub fn with_cache_capacity(source: Arc<dyn CnaeSource>, capacity: usize) -> Self {
        Self {
            source,
            cache: ResponseCache::new(capacity),
        }
    }

    pub async fn list_sections(&self) -> CnaeResult<Vec<CnaeEntity>> {
        self.list(Level::Section, None).await
    }

    pub async fn get_section(&self, code: &str) -> CnaeResult<CnaeEntity> {
        self.get(Level::Section, code).await
    }

    pub async fn list_divisions(&self, section_code: Option<&str>) -> CnaeResult<Vec<CnaeEntity>> {
        self.list(Level::Division, section_code).await
    }

    pub async fn get_division(&self, code: &str) -> CnaeResult<CnaeEntity> {
        self.get(Level::Division, code).await
    }

    pub async fn list_groups(&self, division_code: Option<&str>) -> CnaeResult<Vec<CnaeEntity>> {
        self.list(Level::Group, division_code).await
    }

    pub async fn get_group(&self, code: &str) -> CnaeResult<CnaeEntity> {
        self.get(Level::Group, code).await
    }

    pub async fn list_classes(&self, group_code: Option<&str>) -> CnaeResult<Vec<CnaeEntity>> {
        self.list(Level::Class, group_code).await
    }

    pub async fn get_class(&self, code: &str) -> CnaeResult<CnaeEntity> {
        self.get(Level::Class, code).await
    }

    pub async fn list_subclasses(&self, class_code: Option<&str>) -> CnaeResult<Vec<CnaeEntity>> {
        self.list(Level::Subclass, class_code).await
    }

    pub async fn get_subclass(&self, code: &str) -> CnaeResult<CnaeEntity> {
        self.get(Level::Subclass, code).await
    }

    /// List every entity of `level`, ordered by code, optionally restricted
    /// to the children of `parent_code`.
    pub async fn list(&self, level: Level, parent_code: Option<&str>) -> CnaeResult<Vec<CnaeEntity>> {
        let all = self.level_entities(level).await?;

        let Some(parent_code) = parent_code else {
            return Ok(all.as_ref().clone());
        };

        let parent_level = level.parent().ok_or_else(|| {
            CnaeError::InvalidInput(format!("{} entries have no parent filter", level))
        })?;

        // Unknown parents are an error, not an empty listing
        self.get(parent_level, parent_code).await?;

        Ok(all
            .iter()
            .filter(|e| e.parent_code.as_deref() == Some(parent_code))
            .cloned()
            .collect())
    }

    /// Look up a single entity by its exact code.
    pub async fn get(&self, level: Level, code: &str) -> CnaeResult<CnaeEntity> {
        code::validate(level, code)?;

        let key = CacheKey::Entity(level, code.to_string());
        if let Some(Cached::One(entity)) = self.cache.get(&key) {
            return Ok(entity.as_ref().clone());
        }

        // A cached listing already answers the lookup
        if let Some(Cached::Many(all)) = self.cache.get(&CacheKey::Level(level)) {
            return all
                .iter()
                .find(|e| e.code == code)
                .cloned()
                .ok_or_else(|| CnaeError::not_found(level, code));
        }

        debug!(level = %level, code, "Cache miss, fetching entity");
        let entity = self
            .source
            .fetch_entity(level, code)
            .await?
            .ok_or_else(|| CnaeError::not_found(level, code))?;

        check_entity(level, &entity)?;
        if entity.code != code {
            return Err(CnaeError::UpstreamMalformed(format!(
                "asked for {} {} but received {}",
                level, code, entity.code
            )));
        }

        self.cache.insert(key, Cached::One(Arc::new(entity.clone())));
        Ok(entity)
    }

    /// Accent- and case-insensitive substring search over descriptions.
    ///
    /// Results are ordered by level (sections first), then by code.
    pub async fn search(&self, query: &str, levels: Option<&[Level]>) -> CnaeResult<Vec<SearchHit>> {
        let query = SearchQuery::parse(query)?;

        let mut hits = Vec::new();
        // Levels come back broadest first and each batch is code-ordered
        for level in resolve_levels(levels) {
            let entities = self.level_entities(level).await?;
            hits.extend(rank(&query, entities.iter()));
        }

        debug!(query = query.as_str(), hits = hits.len(), "Search completed");
        Ok(hits)
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Entities of `level`, with every ancestor level loaded first so each
    /// record's parent link can be checked before anything is cached.
    async fn level_entities(&self, level: Level) -> CnaeResult<Arc<Vec<CnaeEntity>>> {
        let mut parents: Option<Arc<Vec<CnaeEntity>>> = None;
        for ancestor in Level::ALL.into_iter().take_while(|l| *l < level) {
            let loaded = self
                .load_level(ancestor, parents.as_deref().map(Vec::as_slice))
                .await?;
            parents = Some(loaded);
        }
        self.load_level(level, parents.as_deref().map(Vec::as_slice))
            .await
    }

    async fn load_level(
        &self,
        level: Level,
        parents: Option<&[CnaeEntity]>,
    ) -> CnaeResult<Arc<Vec<CnaeEntity>>> {
        let key = CacheKey::Level(level);
        if let Some(Cached::Many(all)) = self.cache.get(&key) {
            return Ok(all);
        }

        debug!(level = %level, "Cache miss, fetching level");
        let mut entities = self.source.fetch_level(level).await?;

        let parent_codes: Option<HashSet<&str>> =
            parents.map(|all| all.iter().map(|p| p.code.as_str()).collect());

        let mut seen = HashSet::with_capacity(entities.len());
        for entity in &entities {
            check_entity(level, entity)?;
            if !seen.insert(entity.code.as_str()) {
                return Err(CnaeError::UpstreamMalformed(format!(
                    "duplicate {} code {}",
                    level, entity.code
                )));
            }
            if let (Some(codes), Some(parent)) = (&parent_codes, entity.parent_code.as_deref()) {
                if !codes.contains(parent) {
                    return Err(CnaeError::UpstreamMalformed(format!(
                        "{} {} refers to unknown parent {}",
                        level, entity.code, parent
                    )));
                }
            }
        }
        entities.sort_by(|a, b| a.code.cmp(&b.code));

        let entities = Arc::new(entities);
        self.cache.insert(key, Cached::Many(Arc::clone(&entities)));
        Ok(entities)
    }
}

/// Enforce the per-record invariants on anything a source hands back
fn check_entity(level: Level, entity: &CnaeEntity) -> CnaeResult<()> {
    if entity.level != level {
        return Err(CnaeError::UpstreamMalformed(format!(
            "expected a {} record, got a {} ({})",
            level, entity.level, entity.code
        )));
    }
    if entity.code.trim().is_empty() {
        return Err(CnaeError::UpstreamMalformed(format!("{} record without code", level)));
    }
    if entity.description.trim().is_empty() {
        return Err(CnaeError::UpstreamMalformed(format!(
            "{} {} has an empty description",
            level, entity.code
        )));
    }
    match (level.parent(), entity.parent_code.as_deref()) {
        (None, None) => Ok(()),
        (Some(_), Some(parent)) if !parent.trim().is_empty() => Ok(()),
        (None, Some(_)) => Err(CnaeError::UpstreamMalformed(format!(
            "{} {} must not have a parent",
            level, entity.code
        ))),
        (Some(_), _) => Err(CnaeError::UpstreamMalformed(format!(
            "{} {} has no parent",
            level, entity.code
        ))),
    }
}
