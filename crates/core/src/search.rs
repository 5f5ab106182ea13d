// Free-text search over CNAE descriptions

use crate::error::{CnaeError, CnaeResult};
use crate::normalize::{contains_folded, fold_text};
use crate::types::{CnaeEntity, Level, SearchHit};

/// A validated, folded search query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    folded: String,
}

impl SearchQuery {
    /// Fold the raw query. Fails with `InvalidInput` when nothing is left.
    pub fn parse(raw: &str) -> CnaeResult<Self> {
        let folded = fold_text(raw);
        if folded.is_empty() {
            return Err(CnaeError::InvalidInput(
                "search query must not be empty".to_string(),
            ));
        }
        Ok(Self { folded })
    }

    pub fn as_str(&self) -> &str {
        &self.folded
    }

    pub fn matches(&self, entity: &CnaeEntity) -> bool {
        contains_folded(&entity.description, &self.folded)
    }
}

/// Resolve the optional level filter; `None` or an empty list means every level.
pub fn resolve_levels(levels: Option<&[Level]>) -> Vec<Level> {
    let mut resolved: Vec<Level> = match levels {
        Some(levels) if !levels.is_empty() => levels.to_vec(),
        _ => Level::ALL.to_vec(),
    };
    resolved.sort();
    resolved.dedup();
    resolved
}

/// Keep matching entities and order them by level breadth, then code.
pub fn rank<'a, I>(query: &SearchQuery, entities: I) -> Vec<SearchHit>
where
    I: IntoIterator<Item = &'a CnaeEntity>,
{
    let mut hits: Vec<SearchHit> = entities
        .into_iter()
        .filter(|e| query.matches(e))
        .cloned()
        .map(SearchHit::from)
        .collect();

    hits.sort_by(|a, b| {
        a.level
            .cmp(&b.level)
            .then_with(|| a.entity.code.cmp(&b.entity.code))
    });
    hits
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<CnaeEntity> {
        vec![
            CnaeEntity::child_of(
                Level::Subclass,
                "1091102",
                "Fabricação de produtos de padaria e confeitaria com predominância de produção própria",
                "10911",
            ),
            CnaeEntity::child_of(
                Level::Class,
                "47211",
                "COMÉRCIO VAREJISTA DE PRODUTOS DE PADARIA, LATICÍNIO, DOCES, BALAS E SEMELHANTES",
                "472",
            ),
            CnaeEntity::section("I", "ALOJAMENTO E ALIMENTAÇÃO"),
            CnaeEntity::child_of(
                Level::Subclass,
                "4721102",
                "Padaria e confeitaria com predominância de revenda",
                "47211",
            ),
            CnaeEntity::child_of(Level::Division, "03", "PESCA E AQÜICULTURA", "A"),
        ]
    }

    #[test]
    fn test_empty_query_rejected() {
        assert!(matches!(
            SearchQuery::parse(""),
            Err(CnaeError::InvalidInput(_))
        ));
        assert!(matches!(
            SearchQuery::parse("   \t "),
            Err(CnaeError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_rank_orders_by_level_then_code() {
        let query = SearchQuery::parse("padaria").unwrap();
        let hits = rank(&query, &sample());

        let keys: Vec<(Level, &str)> = hits
            .iter()
            .map(|h| (h.level, h.entity.code.as_str()))
            .collect();
        assert_eq!(
            keys,
            vec![
                (Level::Class, "47211"),
                (Level::Subclass, "1091102"),
                (Level::Subclass, "4721102"),
            ]
        );
    }

    #[test]
    fn test_rank_is_stable_under_input_order() {
        let query = SearchQuery::parse("padaria").unwrap();
        let forward = rank(&query, &sample());

        let mut reversed = sample();
        reversed.reverse();
        assert_eq!(rank(&query, &reversed), forward);

        let mut rotated = sample();
        rotated.rotate_left(2);
        assert_eq!(rank(&query, &rotated), forward);
    }

    #[test]
    fn test_accent_insensitive_match() {
        let accented = SearchQuery::parse("AQÜICULTURA").unwrap();
        let plain = SearchQuery::parse("aquicultura").unwrap();
        assert_eq!(rank(&accented, &sample()), rank(&plain, &sample()));
        assert_eq!(rank(&plain, &sample()).len(), 1);

        let hits = rank(&SearchQuery::parse("alimentacao").unwrap(), &sample());
        assert_eq!(hits[0].entity.code, "I");
    }

    #[test]
    fn test_resolve_levels() {
        assert_eq!(resolve_levels(None), Level::ALL.to_vec());
        assert_eq!(resolve_levels(Some(&[])), Level::ALL.to_vec());
        assert_eq!(
            resolve_levels(Some(&[Level::Subclass, Level::Class, Level::Subclass])),
            vec![Level::Class, Level::Subclass]
        );
    }
}
