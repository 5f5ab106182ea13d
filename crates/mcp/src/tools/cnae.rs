// CNAE tools: one MCP tool per facade operation

use crate::facade::{CnaeFacade, FacadeError, Record};
use crate::protocol::{CallToolResult, ToolSchema};
use crate::tools::{
    json_schema_array, json_schema_integer, json_schema_object, json_schema_string, Tool,
    ToolRegistry,
};
use anyhow::Result;
use mcpbr_core::code::expected_shape;
use mcpbr_core::{run_cancellable, Level};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// The closed set of CNAE operations exposed as tools.
///
/// Tool names are part of the external surface and must stay stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CnaeOperation {
    ListarSecoes,
    ObterSecao,
    ListarDivisoes,
    ObterDivisao,
    ListarGrupos,
    ObterGrupo,
    ListarClasses,
    ObterClasse,
    ListarSubclasses,
    ObterSubclasse,
    PesquisarCnae,
}

#[derive(Debug, Deserialize)]
struct CodeArgs {
    codigo: String,
}

#[derive(Debug, Deserialize)]
struct ParentArgs {
    #[serde(default)]
    secao: Option<String>,
    #[serde(default)]
    divisao: Option<String>,
    #[serde(default)]
    grupo: Option<String>,
    #[serde(default)]
    classe: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchArgs {
    termo: String,
    #[serde(default)]
    niveis: Vec<String>,
    #[serde(default)]
    limite: Option<usize>,
}

impl CnaeOperation {
    pub const ALL: [CnaeOperation; 11] = [
        CnaeOperation::ListarSecoes,
        CnaeOperation::ObterSecao,
        CnaeOperation::ListarDivisoes,
        CnaeOperation::ObterDivisao,
        CnaeOperation::ListarGrupos,
        CnaeOperation::ObterGrupo,
        CnaeOperation::ListarClasses,
        CnaeOperation::ObterClasse,
        CnaeOperation::ListarSubclasses,
        CnaeOperation::ObterSubclasse,
        CnaeOperation::PesquisarCnae,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CnaeOperation::ListarSecoes => "listar_secoes",
            CnaeOperation::ObterSecao => "obter_secao",
            CnaeOperation::ListarDivisoes => "listar_divisoes",
            CnaeOperation::ObterDivisao => "obter_divisao",
            CnaeOperation::ListarGrupos => "listar_grupos",
            CnaeOperation::ObterGrupo => "obter_grupo",
            CnaeOperation::ListarClasses => "listar_classes",
            CnaeOperation::ObterClasse => "obter_classe",
            CnaeOperation::ListarSubclasses => "listar_subclasses",
            CnaeOperation::ObterSubclasse => "obter_subclasse",
            CnaeOperation::PesquisarCnae => "pesquisar_cnae",
        }
    }

    /// Hierarchy level a listing or lookup works on; `None` for search
    pub fn level(self) -> Option<Level> {
        match self {
            CnaeOperation::ListarSecoes | CnaeOperation::ObterSecao => Some(Level::Section),
            CnaeOperation::ListarDivisoes | CnaeOperation::ObterDivisao => Some(Level::Division),
            CnaeOperation::ListarGrupos | CnaeOperation::ObterGrupo => Some(Level::Group),
            CnaeOperation::ListarClasses | CnaeOperation::ObterClasse => Some(Level::Class),
            CnaeOperation::ListarSubclasses | CnaeOperation::ObterSubclasse => {
                Some(Level::Subclass)
            }
            CnaeOperation::PesquisarCnae => None,
        }
    }

    fn is_lookup(self) -> bool {
        matches!(
            self,
            CnaeOperation::ObterSecao
                | CnaeOperation::ObterDivisao
                | CnaeOperation::ObterGrupo
                | CnaeOperation::ObterClasse
                | CnaeOperation::ObterSubclasse
        )
    }

    pub fn description(self) -> String {
        let Some(level) = self.level() else {
            return "Pesquisa atividades econômicas da CNAE pela descrição, ignorando acentos e maiúsculas".to_string();
        };

        if self.is_lookup() {
            return format!(
                "Obtém o registro de {} da CNAE pelo código ({})",
                level.label(),
                expected_shape(level)
            );
        }

        match level.parent() {
            Some(parent) => format!(
                "Lista os registros de {} da CNAE, opcionalmente filtrados pelo código de {}",
                level.label(),
                parent.label()
            ),
            None => "Lista as seções da CNAE (nível mais alto da classificação)".to_string(),
        }
    }

    pub fn input_schema(self) -> Value {
        let Some(level) = self.level() else {
            let level_names: Vec<&str> = Level::ALL.iter().map(|l| l.key()).collect();
            return json_schema_object(
                serde_json::json!({
                    "termo": json_schema_string("Termo a pesquisar nas descrições"),
                    "niveis": json_schema_array(
                        serde_json::json!({"type": "string", "enum": level_names}),
                        "Níveis a pesquisar (vazio ou ausente: todos)"
                    ),
                    "limite": json_schema_integer("Número máximo de resultados")
                }),
                vec!["termo"],
            );
        };

        let mut properties = serde_json::Map::new();
        let mut required = Vec::new();
        if self.is_lookup() {
            properties.insert(
                "codigo".to_string(),
                json_schema_string(&format!(
                    "Código de {} ({})",
                    level.label(),
                    expected_shape(level)
                )),
            );
            required.push("codigo");
        } else if let Some(parent) = level.parent() {
            properties.insert(
                parent.key().to_string(),
                json_schema_string(&format!("Código de {} para filtrar (opcional)", parent.label())),
            );
        }

        json_schema_object(Value::Object(properties), required)
    }

    pub fn schema(self) -> ToolSchema {
        ToolSchema {
            name: self.name().to_string(),
            description: self.description(),
            input_schema: self.input_schema(),
        }
    }

    /// Decode `arguments` and run the operation against `facade`
    pub async fn invoke(self, facade: &CnaeFacade, arguments: Value) -> Result<Value, FacadeError> {
        let value = match self {
            CnaeOperation::ListarSecoes => records_to_value(facade.listar_secoes().await?),
            CnaeOperation::ListarDivisoes => {
                let args: ParentArgs = decode(arguments)?;
                records_to_value(facade.listar_divisoes(args.secao.as_deref()).await?)
            }
            CnaeOperation::ListarGrupos => {
                let args: ParentArgs = decode(arguments)?;
                records_to_value(facade.listar_grupos(args.divisao.as_deref()).await?)
            }
            CnaeOperation::ListarClasses => {
                let args: ParentArgs = decode(arguments)?;
                records_to_value(facade.listar_classes(args.grupo.as_deref()).await?)
            }
            CnaeOperation::ListarSubclasses => {
                let args: ParentArgs = decode(arguments)?;
                records_to_value(facade.listar_subclasses(args.classe.as_deref()).await?)
            }
            CnaeOperation::ObterSecao => {
                let args: CodeArgs = decode(arguments)?;
                Value::Object(facade.obter_secao(&args.codigo).await?)
            }
            CnaeOperation::ObterDivisao => {
                let args: CodeArgs = decode(arguments)?;
                Value::Object(facade.obter_divisao(&args.codigo).await?)
            }
            CnaeOperation::ObterGrupo => {
                let args: CodeArgs = decode(arguments)?;
                Value::Object(facade.obter_grupo(&args.codigo).await?)
            }
            CnaeOperation::ObterClasse => {
                let args: CodeArgs = decode(arguments)?;
                Value::Object(facade.obter_classe(&args.codigo).await?)
            }
            CnaeOperation::ObterSubclasse => {
                let args: CodeArgs = decode(arguments)?;
                Value::Object(facade.obter_subclasse(&args.codigo).await?)
            }
            CnaeOperation::PesquisarCnae => {
                let args: SearchArgs = decode(arguments)?;
                let levels = parse_levels(&args.niveis)?;
                records_to_value(
                    facade
                        .pesquisar_cnae(&args.termo, Some(levels.as_slice()), args.limite)
                        .await?,
                )
            }
        };
        Ok(value)
    }
}

/// Missing or null arguments decode like an empty object
fn decode<T: DeserializeOwned>(arguments: Value) -> Result<T, FacadeError> {
    let arguments = if arguments.is_null() {
        Value::Object(Default::default())
    } else {
        arguments
    };
    serde_json::from_value(arguments)
        .map_err(|e| FacadeError::invalid_input(format!("argumentos inválidos: {}", e)))
}

fn parse_levels(names: &[String]) -> Result<Vec<Level>, FacadeError> {
    names
        .iter()
        .map(|name| {
            name.parse::<Level>().map_err(|_| {
                FacadeError::invalid_input(format!(
                    "nível desconhecido: '{}' (use secao, divisao, grupo, classe ou subclasse)",
                    name
                ))
            })
        })
        .collect()
}

fn records_to_value(records: Vec<Record>) -> Value {
    Value::Array(records.into_iter().map(Value::Object).collect())
}

/// MCP tool backed by one CNAE operation
pub struct CnaeTool {
    op: CnaeOperation,
    facade: Arc<CnaeFacade>,
}

impl CnaeTool {
    pub fn new(op: CnaeOperation, facade: Arc<CnaeFacade>) -> Self {
        Self { op, facade }
    }
}

#[async_trait::async_trait]
impl Tool for CnaeTool {
    fn schema(&self) -> ToolSchema {
        self.op.schema()
    }

    async fn execute(&self, arguments: Value, cancel: &CancellationToken) -> Result<CallToolResult> {
        let started = Instant::now();
        let outcome = run_cancellable(cancel, self.op.invoke(&self.facade, arguments)).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Ok(value) => {
                tracing::info!(tool = self.op.name(), elapsed_ms, "Tool call completed");
                Ok(CallToolResult::text(serde_json::to_string_pretty(&value)?))
            }
            Err(err) => {
                tracing::info!(
                    tool = self.op.name(),
                    kind = %err.kind,
                    elapsed_ms,
                    "Tool call failed"
                );
                Ok(CallToolResult::error(err.message))
            }
        }
    }
}

/// Register one tool per CNAE operation
pub fn register_cnae_tools(registry: &mut ToolRegistry, facade: Arc<CnaeFacade>) {
    for op in CnaeOperation::ALL {
        registry.register(Arc::new(CnaeTool::new(op, facade.clone())));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ToolContent;
    use mcpbr_core::testing::sample_taxonomy;
    use mcpbr_core::{CnaeService, InMemorySource};
    use serde_json::json;

    fn registry() -> ToolRegistry {
        let facade = Arc::new(CnaeFacade::new(CnaeService::new(Arc::new(
            InMemorySource::new(sample_taxonomy()),
        ))));
        let mut registry = ToolRegistry::new();
        register_cnae_tools(&mut registry, facade);
        registry
    }

    async fn call(registry: &ToolRegistry, name: &str, arguments: Value) -> CallToolResult {
        registry
            .get(name)
            .unwrap()
            .execute(arguments, &CancellationToken::new())
            .await
            .unwrap()
    }

    fn text(result: &CallToolResult) -> &str {
        match &result.content[0] {
            ToolContent::Text { text } => text,
        }
    }

    #[test]
    fn test_operation_names_are_unique() {
        let names: std::collections::HashSet<&str> =
            CnaeOperation::ALL.iter().map(|op| op.name()).collect();
        assert_eq!(names.len(), 11);
        assert!(CnaeOperation::ALL.iter().all(|op| !op.description().is_empty()));
    }

    #[test]
    fn test_schemas() {
        let lookup = CnaeOperation::ObterClasse.input_schema();
        assert_eq!(lookup["required"], json!(["codigo"]));

        let listing = CnaeOperation::ListarGrupos.input_schema();
        assert!(listing["properties"].get("divisao").is_some());
        assert_eq!(listing["required"], json!([]));

        let sections = CnaeOperation::ListarSecoes.input_schema();
        assert_eq!(sections["properties"], json!({}));

        let search = CnaeOperation::PesquisarCnae.input_schema();
        assert_eq!(search["required"], json!(["termo"]));
        assert_eq!(search["properties"]["niveis"]["items"]["enum"][4], "subclasse");
    }

    #[test]
    fn test_registry_exposes_all_operations() {
        let registry = registry();
        assert_eq!(registry.len(), 11);
        for op in CnaeOperation::ALL {
            assert!(registry.contains(op.name()));
        }
    }

    #[tokio::test]
    async fn test_listar_secoes_without_arguments() {
        let result = call(&registry(), "listar_secoes", Value::Null).await;
        assert!(result.is_error.is_none());

        let records: Vec<Value> = serde_json::from_str(text(&result)).unwrap();
        assert_eq!(records.len(), 21);
        assert_eq!(records[0]["codigo"], "A");
    }

    #[tokio::test]
    async fn test_listar_with_parent_filter() {
        let result = call(&registry(), "listar_divisoes", json!({"secao": "a"})).await;
        let records: Vec<Value> = serde_json::from_str(text(&result)).unwrap();
        let codes: Vec<&str> = records.iter().map(|r| r["codigo"].as_str().unwrap()).collect();
        assert_eq!(codes, vec!["01", "02", "03"]);
    }

    #[tokio::test]
    async fn test_obter_not_found_is_tool_error() {
        let result = call(&registry(), "obter_secao", json!({"codigo": "Z"})).await;
        assert_eq!(result.is_error, Some(true));
        assert!(text(&result).starts_with("Erro: "));
        assert!(text(&result).contains("'Z'"));
    }

    #[tokio::test]
    async fn test_missing_codigo_is_tool_error() {
        let result = call(&registry(), "obter_classe", json!({})).await;
        assert_eq!(result.is_error, Some(true));
        assert!(text(&result).contains("argumentos inválidos"));
    }

    #[tokio::test]
    async fn test_pesquisar_cnae() {
        let registry = registry();

        let result = call(
            &registry,
            "pesquisar_cnae",
            json!({"termo": "PADARIA", "niveis": ["subclasse"], "limite": 1}),
        )
        .await;
        let records: Vec<Value> = serde_json::from_str(text(&result)).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["nivel"], "subclasse");

        let bad_level = call(
            &registry,
            "pesquisar_cnae",
            json!({"termo": "padaria", "niveis": ["setor"]}),
        )
        .await;
        assert_eq!(bad_level.is_error, Some(true));
        assert!(text(&bad_level).contains("setor"));
    }

    #[tokio::test]
    async fn test_cancelled_call() {
        let registry = registry();
        let token = CancellationToken::new();
        token.cancel();

        let result = registry
            .get("listar_secoes")
            .unwrap()
            .execute(Value::Null, &token)
            .await
            .unwrap();
        assert_eq!(result.is_error, Some(true));
        assert!(text(&result).contains("cancelada"));
    }
}
