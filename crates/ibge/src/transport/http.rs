//! HTTP transport layer for the IBGE client.

use crate::config::ClientConfig;
use crate::error::{IbgeError, IbgeResult};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// HTTP transport for making API requests.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    config: Arc<ClientConfig>,
}

impl HttpTransport {
    /// Create a new HTTP transport with the given configuration.
    pub fn new(config: Arc<ClientConfig>) -> IbgeResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self { client, config })
    }

    /// Build a URL for the given path, relative to the configured base.
    fn build_url(&self, path: &str) -> IbgeResult<url::Url> {
        Ok(self.config.base_url.join(path.trim_start_matches('/'))?)
    }

    /// GET `path` and parse the body as JSON.
    ///
    /// `Ok(None)` means the upstream answered 404. Transient failures are
    /// retried according to the retry configuration; everything else is
    /// returned as-is.
    pub async fn get_json(&self, path: &str) -> IbgeResult<Option<Value>> {
        let url = self.build_url(path)?;
        let retry_config = &self.config.retry_config;
        let mut attempts = 0;

        loop {
            debug!(url = %url, attempt = attempts + 1, "GET request");

            let error = match self.fetch_once(url.clone()).await {
                Ok(body) => return Ok(body),
                Err(e) => e,
            };

            let retryable = match &error {
                IbgeError::Api { status, .. } => retry_config.should_retry_status(*status),
                other => other.is_retryable(),
            };

            if attempts < retry_config.max_retries && retryable {
                let backoff = retry_config.backoff_for_attempt(attempts);
                warn!(
                    url = %url,
                    attempt = attempts + 1,
                    backoff_ms = backoff.as_millis() as u64,
                    error = %error,
                    "Request failed, retrying"
                );
                tokio::time::sleep(backoff).await;
                attempts += 1;
                continue;
            }

            return Err(error);
        }
    }

    async fn fetch_once(&self, url: url::Url) -> IbgeResult<Option<Value>> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                IbgeError::Timeout
            } else {
                IbgeError::Http(e)
            }
        })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                IbgeError::Timeout
            } else {
                IbgeError::Http(e)
            }
        })?;

        if !status.is_success() {
            return Err(IbgeError::from_response(status.as_u16(), &body));
        }

        Ok(Some(serde_json::from_str(&body)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetryConfig;
    use std::time::Duration;
    use wiremock::matchers::{header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn create_config(base_url: &str, retry_config: RetryConfig) -> Arc<ClientConfig> {
        let mut config = ClientConfig::new(url::Url::parse(base_url).unwrap());
        config.retry_config = retry_config;
        Arc::new(config)
    }

    fn fast_retries(max_retries: u32) -> RetryConfig {
        RetryConfig {
            max_retries,
            initial_backoff: Duration::from_millis(1),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_get_json() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/secoes"))
            .and(header_exists("user-agent"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!([{"id": "A", "descricao": "AGRICULTURA"}])),
            )
            .mount(&server)
            .await;

        let transport = HttpTransport::new(create_config(&server.uri(), RetryConfig::no_retry())).unwrap();
        let body = transport.get_json("secoes").await.unwrap().unwrap();
        assert_eq!(body[0]["id"], "A");
    }

    #[tokio::test]
    async fn test_not_found_is_none() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/secoes/Z"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let transport = HttpTransport::new(create_config(&server.uri(), fast_retries(2))).unwrap();
        assert!(transport.get_json("secoes/Z").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_retries_transient_status_then_succeeds() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/divisoes"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/divisoes"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let transport = HttpTransport::new(create_config(&server.uri(), fast_retries(2))).unwrap();
        let body = transport.get_json("divisoes").await.unwrap().unwrap();
        assert_eq!(body, serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_gives_up_after_retry_budget() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/grupos"))
            .respond_with(ResponseTemplate::new(500))
            .expect(3)
            .mount(&server)
            .await;

        let transport = HttpTransport::new(create_config(&server.uri(), fast_retries(2))).unwrap();
        match transport.get_json("grupos").await {
            Err(IbgeError::Api { status, .. }) => assert_eq!(status, 500),
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_client_errors_are_not_retried() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/classes"))
            .respond_with(ResponseTemplate::new(400).set_body_string("Bad Request"))
            .expect(1)
            .mount(&server)
            .await;

        let transport = HttpTransport::new(create_config(&server.uri(), fast_retries(2))).unwrap();
        assert!(matches!(
            transport.get_json("classes").await,
            Err(IbgeError::Api { status: 400, .. })
        ));
    }

    #[tokio::test]
    async fn test_invalid_json_is_not_retried() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/subclasses"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>manutenção</html>"))
            .expect(1)
            .mount(&server)
            .await;

        let transport = HttpTransport::new(create_config(&server.uri(), fast_retries(2))).unwrap();
        assert!(matches!(
            transport.get_json("subclasses").await,
            Err(IbgeError::Json(_))
        ));
    }

    #[tokio::test]
    async fn test_timeout() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/secoes"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let mut config = ClientConfig::new(url::Url::parse(&server.uri()).unwrap());
        config.timeout = Duration::from_millis(50);
        config.retry_config = RetryConfig::no_retry();
        let transport = HttpTransport::new(Arc::new(config)).unwrap();

        assert!(matches!(
            transport.get_json("secoes").await,
            Err(IbgeError::Timeout)
        ));
    }

    #[tokio::test]
    async fn test_build_url() {
        let config = create_config("http://localhost:8080/api/v2/cnae", RetryConfig::no_retry());
        let transport = HttpTransport::new(config).unwrap();

        let url = transport.build_url("/secoes/A").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/api/v2/cnae/secoes/A");
    }
}
