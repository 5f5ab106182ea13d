//! Main client for the IBGE CNAE API.

use crate::api::CnaeApi;
use crate::config::{ClientConfig, RetryConfig, DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
use crate::error::{IbgeError, IbgeResult};
use crate::transport::HttpTransport;
use mcpbr_core::{CnaeEntity, CnaeResult, CnaeSource, Level};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Client for the IBGE classification services.
#[derive(Debug, Clone)]
pub struct IbgeClient {
    config: Arc<ClientConfig>,
    pub(crate) http: HttpTransport,
}

impl IbgeClient {
    /// Create a new client builder.
    pub fn builder() -> IbgeClientBuilder {
        IbgeClientBuilder::new()
    }

    /// Create a client from configuration.
    pub fn from_config(config: ClientConfig) -> IbgeResult<Self> {
        let config = Arc::new(config);
        let http = HttpTransport::new(config.clone())?;

        Ok(Self { config, http })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Get the CNAE API.
    pub fn cnae(&self) -> CnaeApi<'_> {
        CnaeApi::new(self)
    }
}

#[async_trait::async_trait]
impl CnaeSource for IbgeClient {
    async fn fetch_level(&self, level: Level) -> CnaeResult<Vec<CnaeEntity>> {
        Ok(self.cnae().list(level).await?)
    }

    async fn fetch_entity(&self, level: Level, code: &str) -> CnaeResult<Option<CnaeEntity>> {
        Ok(self.cnae().get(level, code).await?)
    }
}

/// Builder for creating an IbgeClient.
pub struct IbgeClientBuilder {
    base_url: Option<String>,
    timeout: Duration,
    retry_config: RetryConfig,
    user_agent: Option<String>,
}

impl IbgeClientBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            base_url: None,
            timeout: DEFAULT_TIMEOUT,
            retry_config: RetryConfig::default(),
            user_agent: None,
        }
    }

    /// Override the base URL (defaults to the IBGE production endpoint).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the retry configuration.
    pub fn retry_config(mut self, config: RetryConfig) -> Self {
        self.retry_config = config;
        self
    }

    /// Set the user agent sent upstream.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Build the client.
    pub fn build(self) -> IbgeResult<IbgeClient> {
        let base_url_str = self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
        let base_url = Url::parse(base_url_str)?;

        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(IbgeError::Config(format!(
                "base_url must be http(s), got {}",
                base_url.scheme()
            )));
        }
        if self.timeout.is_zero() {
            return Err(IbgeError::Config("timeout must be greater than zero".to_string()));
        }

        let mut config = ClientConfig::new(base_url);
        config.timeout = self.timeout;
        config.retry_config = self.retry_config;
        if let Some(user_agent) = self.user_agent {
            config.user_agent = user_agent;
        }

        IbgeClient::from_config(config)
    }
}

impl Default for IbgeClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcpbr_core::{run_cancellable, CnaeError, CnaeService, ErrorKind};
    use tokio_util::sync::CancellationToken;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> IbgeClient {
        IbgeClient::builder()
            .base_url(server.uri())
            .retry_config(RetryConfig {
                max_retries: 2,
                initial_backoff: Duration::from_millis(1),
                ..Default::default()
            })
            .build()
            .unwrap()
    }

    async fn mount_json(server: &MockServer, route: &str, body: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    #[test]
    fn test_builder_defaults() {
        let client = IbgeClient::builder().build().unwrap();
        assert_eq!(client.config().base_url.as_str(), DEFAULT_BASE_URL);
        assert_eq!(client.config().timeout, Duration::from_secs(10));
        assert_eq!(client.config().retry_config.max_retries, 2);
    }

    #[test]
    fn test_builder_rejects_bad_config() {
        assert!(matches!(
            IbgeClient::builder().base_url("not a url").build(),
            Err(IbgeError::InvalidUrl(_))
        ));
        assert!(matches!(
            IbgeClient::builder().base_url("ftp://ibge.gov.br").build(),
            Err(IbgeError::Config(_))
        ));
        assert!(matches!(
            IbgeClient::builder().timeout(Duration::ZERO).build(),
            Err(IbgeError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_list_sections() {
        let server = MockServer::start().await;
        mount_json(
            &server,
            "/secoes",
            json!([
                {"id": "B", "descricao": "INDÚSTRIAS EXTRATIVAS", "observacoes": []},
                {"id": "A", "descricao": "AGRICULTURA, PECUÁRIA, PRODUÇÃO FLORESTAL, PESCA E AQÜICULTURA", "observacoes": []}
            ]),
        )
        .await;

        let sections = client_for(&server).cnae().list(Level::Section).await.unwrap();
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[1].code, "A");
    }

    #[tokio::test]
    async fn test_get_division_with_nested_parent() {
        let server = MockServer::start().await;
        mount_json(
            &server,
            "/divisoes/01",
            json!([{
                "id": "01",
                "descricao": "AGRICULTURA, PECUÁRIA E SERVIÇOS RELACIONADOS",
                "secao": {"id": "A", "descricao": "AGRICULTURA, PECUÁRIA, PRODUÇÃO FLORESTAL, PESCA E AQÜICULTURA"},
                "observacoes": []
            }]),
        )
        .await;

        let division = client_for(&server)
            .cnae()
            .get(Level::Division, "01")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(division.parent_code.as_deref(), Some("A"));
    }

    #[tokio::test]
    async fn test_unknown_code_through_service() {
        let server = MockServer::start().await;
        mount_json(&server, "/secoes/Z", json!([])).await;

        let service = CnaeService::new(Arc::new(client_for(&server)));
        assert_eq!(
            service.get_section("Z").await.unwrap_err(),
            CnaeError::not_found(Level::Section, "Z")
        );
    }

    #[tokio::test]
    async fn test_service_over_ibge_client() {
        let server = MockServer::start().await;
        mount_json(
            &server,
            "/secoes",
            json!([
                {"id": "A", "descricao": "AGRICULTURA, PECUÁRIA, PRODUÇÃO FLORESTAL, PESCA E AQÜICULTURA"},
                {"id": "B", "descricao": "INDÚSTRIAS EXTRATIVAS"}
            ]),
        )
        .await;
        mount_json(
            &server,
            "/secoes/A",
            json!({"id": "A", "descricao": "AGRICULTURA, PECUÁRIA, PRODUÇÃO FLORESTAL, PESCA E AQÜICULTURA"}),
        )
        .await;
        mount_json(
            &server,
            "/divisoes",
            json!([
                {"id": "01", "descricao": "AGRICULTURA, PECUÁRIA E SERVIÇOS RELACIONADOS", "secao": {"id": "A"}},
                {"id": "03", "descricao": "PESCA E AQÜICULTURA", "secao": {"id": "A"}},
                {"id": "05", "descricao": "EXTRAÇÃO DE CARVÃO MINERAL", "secao": {"id": "B"}}
            ]),
        )
        .await;

        let service = CnaeService::new(Arc::new(client_for(&server)));

        let divisions = service.list_divisions(Some("A")).await.unwrap();
        let codes: Vec<&str> = divisions.iter().map(|d| d.code.as_str()).collect();
        assert_eq!(codes, vec!["01", "03"]);

        let hits = service.search("aquicultura", None).await.unwrap();
        let found: Vec<(Level, &str)> = hits.iter().map(|h| (h.level, h.entity.code.as_str())).collect();
        assert!(found.contains(&(Level::Section, "A")));
        assert!(found.contains(&(Level::Division, "03")));
    }

    #[tokio::test]
    async fn test_upstream_outage_maps_to_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/grupos"))
            .respond_with(ResponseTemplate::new(503))
            .expect(3)
            .mount(&server)
            .await;

        let service = CnaeService::new(Arc::new(client_for(&server)));
        // Ancestor levels answer 404 here and are cached as empty
        service.list_divisions(None).await.unwrap();
        let warmed = service.cache_len();

        let err = service.list_groups(None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UpstreamUnavailable);
        assert_eq!(service.cache_len(), warmed);
    }

    #[tokio::test]
    async fn test_cancel_during_fetch() {
        let server = MockServer::start().await;
        mount_json(&server, "/secoes", json!([{"id": "A", "descricao": "AGRICULTURA"}])).await;
        mount_json(
            &server,
            "/divisoes",
            json!([{"id": "01", "descricao": "AGRICULTURA, PECUÁRIA E SERVIÇOS RELACIONADOS", "secao": {"id": "A"}}]),
        )
        .await;
        Mock::given(method("GET"))
            .and(path("/grupos"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([{"id": "011", "descricao": "PRODUÇÃO DE LAVOURAS TEMPORÁRIAS", "divisao": {"id": "01"}}]))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let service = CnaeService::new(Arc::new(client_for(&server)));
        service.list_divisions(None).await.unwrap();
        let warmed = service.cache_len();

        let token = CancellationToken::new();
        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });

        let started = std::time::Instant::now();
        let result = run_cancellable(&token, service.list_groups(None)).await;

        assert_eq!(result.unwrap_err(), CnaeError::Cancelled);
        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(service.cache_len(), warmed);

        // One upstream request, abandoned mid-flight
        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.iter().filter(|r| r.url.path() == "/grupos").count(), 1);
    }

    #[tokio::test]
    async fn test_malformed_payload_maps_to_malformed() {
        let server = MockServer::start().await;
        mount_json(&server, "/classes", json!({"erro": "formato inesperado"})).await;
        mount_json(&server, "/subclasses", json!([{"id": "0111301", "descricao": "", "classe": {"id": "01113"}}])).await;

        let service = CnaeService::new(Arc::new(client_for(&server)));
        assert_eq!(
            service.list_classes(None).await.unwrap_err().kind(),
            ErrorKind::UpstreamMalformed
        );
        assert_eq!(
            service.list_subclasses(None).await.unwrap_err().kind(),
            ErrorKind::UpstreamMalformed
        );
    }
}
