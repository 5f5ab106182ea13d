use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Level of the CNAE hierarchy, ordered from broadest to most specific
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Level {
    #[serde(rename = "secao")]
    Section,
    #[serde(rename = "divisao")]
    Division,
    #[serde(rename = "grupo")]
    Group,
    #[serde(rename = "classe")]
    Class,
    #[serde(rename = "subclasse")]
    Subclass,
}

impl Level {
    /// All levels, broadest first
    pub const ALL: [Level; 5] = [
        Level::Section,
        Level::Division,
        Level::Group,
        Level::Class,
        Level::Subclass,
    ];

    /// Level that owns entities of this level (none for sections)
    pub fn parent(self) -> Option<Level> {
        match self {
            Level::Section => None,
            Level::Division => Some(Level::Section),
            Level::Group => Some(Level::Division),
            Level::Class => Some(Level::Group),
            Level::Subclass => Some(Level::Class),
        }
    }

    /// Stable machine name, also used on the tool surface
    pub fn key(self) -> &'static str {
        match self {
            Level::Section => "secao",
            Level::Division => "divisao",
            Level::Group => "grupo",
            Level::Class => "classe",
            Level::Subclass => "subclasse",
        }
    }

    /// Human-readable Portuguese label
    pub fn label(self) -> &'static str {
        match self {
            Level::Section => "seção",
            Level::Division => "divisão",
            Level::Group => "grupo",
            Level::Class => "classe",
            Level::Subclass => "subclasse",
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}

impl FromStr for Level {
    type Err = String;

    /// Accepts the machine name with or without accents, singular or plural
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let folded = crate::normalize::fold_text(s);
        match folded.as_str() {
            "secao" | "secoes" => Ok(Level::Section),
            "divisao" | "divisoes" => Ok(Level::Division),
            "grupo" | "grupos" => Ok(Level::Group),
            "classe" | "classes" => Ok(Level::Class),
            "subclasse" | "subclasses" => Ok(Level::Subclass),
            _ => Err(format!("unknown CNAE level: {}", s)),
        }
    }
}

/// A normalized CNAE record of any level
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CnaeEntity {
    pub level: Level,
    pub code: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_code: Option<String>,
}

impl CnaeEntity {
    pub fn new(
        level: Level,
        code: impl Into<String>,
        description: impl Into<String>,
        parent_code: Option<String>,
    ) -> Self {
        Self {
            level,
            code: code.into(),
            description: description.into(),
            parent_code,
        }
    }

    pub fn section(code: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(Level::Section, code, description, None)
    }

    pub fn child_of(
        level: Level,
        code: impl Into<String>,
        description: impl Into<String>,
        parent_code: impl Into<String>,
    ) -> Self {
        Self::new(level, code, description, Some(parent_code.into()))
    }
}

/// One search result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub level: Level,
    pub entity: CnaeEntity,
}

impl From<CnaeEntity> for SearchHit {
    fn from(entity: CnaeEntity) -> Self {
        Self {
            level: entity.level,
            entity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_order_is_breadth_first() {
        let mut levels = vec![Level::Subclass, Level::Section, Level::Class, Level::Group, Level::Division];
        levels.sort();
        assert_eq!(levels, Level::ALL.to_vec());
    }

    #[test]
    fn test_parent_is_the_previous_level() {
        for pair in Level::ALL.windows(2) {
            assert_eq!(pair[1].parent(), Some(pair[0]));
        }
        assert_eq!(Level::Section.parent(), None);
    }

    #[test]
    fn test_level_from_str_accepts_accents_and_plurals() {
        assert_eq!("seção".parse::<Level>().unwrap(), Level::Section);
        assert_eq!("SECOES".parse::<Level>().unwrap(), Level::Section);
        assert_eq!("Divisão".parse::<Level>().unwrap(), Level::Division);
        assert_eq!("subclasses".parse::<Level>().unwrap(), Level::Subclass);
        assert!("municipio".parse::<Level>().is_err());
    }

    #[test]
    fn test_entity_serialization_omits_missing_parent() {
        let section = CnaeEntity::section("A", "AGRICULTURA");
        let json = serde_json::to_value(&section).unwrap();
        assert_eq!(json["level"], "secao");
        assert!(json.get("parent_code").is_none());
    }
}
