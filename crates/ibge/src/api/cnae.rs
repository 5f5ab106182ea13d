//! CNAE API endpoints.

use crate::client::IbgeClient;
use crate::error::IbgeResult;
use crate::payload::{normalize_list, normalize_lookup};
use mcpbr_core::{CnaeEntity, Level};

/// URL segment of each level's collection
pub fn resource(level: Level) -> &'static str {
    match level {
        Level::Section => "secoes",
        Level::Division => "divisoes",
        Level::Group => "grupos",
        Level::Class => "classes",
        Level::Subclass => "subclasses",
    }
}

/// CNAE API for listing and looking up classification records.
pub struct CnaeApi<'a> {
    client: &'a IbgeClient,
}

impl<'a> CnaeApi<'a> {
    pub(crate) fn new(client: &'a IbgeClient) -> Self {
        Self { client }
    }

    /// List every record of a level.
    pub async fn list(&self, level: Level) -> IbgeResult<Vec<CnaeEntity>> {
        match self.client.http.get_json(resource(level)).await? {
            Some(body) => normalize_list(level, &body),
            None => Ok(Vec::new()),
        }
    }

    /// Get a record by code, `None` when IBGE does not know it.
    pub async fn get(&self, level: Level, code: &str) -> IbgeResult<Option<CnaeEntity>> {
        let path = format!("{}/{}", resource(level), code);
        match self.client.http.get_json(&path).await? {
            Some(body) => normalize_lookup(level, code, &body),
            None => Ok(None),
        }
    }
}
