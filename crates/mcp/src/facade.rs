//! Handler facade for the CNAE access layer.
//!
//! The facade pins the externally visible operation names, cleans up what
//! tool callers type (stray whitespace, lowercase section letters, formatted
//! codes like `0111-3/01`) and turns records into flat JSON objects. Every
//! access-layer failure is translated into a [`FacadeError`] carrying a
//! Portuguese message; internal error chains never leave this module.

use mcpbr_core::code::{coerce, expected_shape};
use mcpbr_core::normalize::fold_text;
use mcpbr_core::{CnaeEntity, CnaeError, CnaeService, ErrorKind, Level, SearchHit};
use serde_json::{Map, Value};

/// A record as seen by tool callers: field name to scalar
pub type Record = Map<String, Value>;

/// Failure surfaced to tool callers
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct FacadeError {
    pub kind: ErrorKind,
    pub message: String,
}

impl FacadeError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::InvalidInput,
            message: message.into(),
        }
    }
}

impl From<CnaeError> for FacadeError {
    fn from(err: CnaeError) -> Self {
        let message = match &err {
            CnaeError::InvalidInput(_) => "parâmetros de entrada inválidos".to_string(),
            CnaeError::InvalidCode { level, code } => format!(
                "código de {} inválido: '{}' (esperado: {})",
                level.label(),
                code,
                expected_shape(*level)
            ),
            CnaeError::NotFound { level, code } => {
                format!("{} '{}' não encontrado(a) na CNAE", level.label(), code)
            }
            CnaeError::UpstreamUnavailable(_) => {
                "o serviço de classificações do IBGE está indisponível no momento; tente novamente mais tarde".to_string()
            }
            CnaeError::UpstreamMalformed(_) => {
                "o serviço do IBGE retornou uma resposta em formato inesperado".to_string()
            }
            CnaeError::Cancelled => "operação cancelada".to_string(),
        };

        if matches!(
            err.kind(),
            ErrorKind::UpstreamUnavailable | ErrorKind::UpstreamMalformed
        ) {
            tracing::warn!(kind = %err.kind(), error = %err, "Upstream failure");
        }

        Self {
            kind: err.kind(),
            message,
        }
    }
}

/// Flatten an entity into the tool-facing record shape
pub fn to_record(entity: &CnaeEntity) -> Record {
    let mut record = Map::new();
    record.insert("nivel".to_string(), Value::from(entity.level.key()));
    record.insert("codigo".to_string(), Value::from(entity.code.clone()));
    record.insert("descricao".to_string(), Value::from(entity.description.clone()));
    if let Some(parent) = &entity.parent_code {
        record.insert("codigo_pai".to_string(), Value::from(parent.clone()));
    }
    record
}

fn to_records(entities: &[CnaeEntity]) -> Vec<Record> {
    entities.iter().map(to_record).collect()
}

fn hits_to_records(hits: &[SearchHit]) -> Vec<Record> {
    hits.iter().map(|hit| to_record(&hit.entity)).collect()
}

/// Empty or whitespace-only filters count as "no filter"
fn coerce_filter(raw: Option<&str>) -> Option<String> {
    raw.map(coerce).filter(|code| !code.is_empty())
}

/// Stable, caller-facing operations over the CNAE taxonomy
#[derive(Clone)]
pub struct CnaeFacade {
    service: CnaeService,
}

impl CnaeFacade {
    pub fn new(service: CnaeService) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &CnaeService {
        &self.service
    }

    pub async fn listar_secoes(&self) -> Result<Vec<Record>, FacadeError> {
        self.listar(Level::Section, None).await
    }

    pub async fn obter_secao(&self, codigo: &str) -> Result<Record, FacadeError> {
        self.obter(Level::Section, codigo).await
    }

    pub async fn listar_divisoes(&self, secao: Option<&str>) -> Result<Vec<Record>, FacadeError> {
        self.listar(Level::Division, secao).await
    }

    pub async fn obter_divisao(&self, codigo: &str) -> Result<Record, FacadeError> {
        self.obter(Level::Division, codigo).await
    }

    pub async fn listar_grupos(&self, divisao: Option<&str>) -> Result<Vec<Record>, FacadeError> {
        self.listar(Level::Group, divisao).await
    }

    pub async fn obter_grupo(&self, codigo: &str) -> Result<Record, FacadeError> {
        self.obter(Level::Group, codigo).await
    }

    pub async fn listar_classes(&self, grupo: Option<&str>) -> Result<Vec<Record>, FacadeError> {
        self.listar(Level::Class, grupo).await
    }

    pub async fn obter_classe(&self, codigo: &str) -> Result<Record, FacadeError> {
        self.obter(Level::Class, codigo).await
    }

    pub async fn listar_subclasses(&self, classe: Option<&str>) -> Result<Vec<Record>, FacadeError> {
        self.listar(Level::Subclass, classe).await
    }

    pub async fn obter_subclasse(&self, codigo: &str) -> Result<Record, FacadeError> {
        self.obter(Level::Subclass, codigo).await
    }

    /// Search descriptions across `niveis` (all levels when absent or empty),
    /// keeping at most `limite` results after ordering.
    pub async fn pesquisar_cnae(
        &self,
        termo: &str,
        niveis: Option<&[Level]>,
        limite: Option<usize>,
    ) -> Result<Vec<Record>, FacadeError> {
        if fold_text(termo).is_empty() {
            return Err(FacadeError::invalid_input(
                "o termo de pesquisa não pode ser vazio",
            ));
        }
        if limite == Some(0) {
            return Err(FacadeError::invalid_input("o limite deve ser maior que zero"));
        }

        let mut hits = self.service.search(termo, niveis).await?;
        if let Some(limite) = limite {
            hits.truncate(limite);
        }
        Ok(hits_to_records(&hits))
    }

    async fn listar(&self, level: Level, parent: Option<&str>) -> Result<Vec<Record>, FacadeError> {
        let parent = coerce_filter(parent);
        let entities = self.service.list(level, parent.as_deref()).await?;
        Ok(to_records(&entities))
    }

    async fn obter(&self, level: Level, codigo: &str) -> Result<Record, FacadeError> {
        let entity = self.service.get(level, &coerce(codigo)).await?;
        Ok(to_record(&entity))
    }
}
