use crate::config::file::BridgeConfig;
use crate::domain::model::TransactionType;
use crate::domain::ports::{ConfigProvider, Upstream};
use crate::utils::error::{BridgeError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

/// 以 JSON POST 呼叫合作夥伴 API
#[derive(Debug, Clone)]
pub struct HttpUpstream {
    client: Client,
    endpoint: String,
    bearer_token: Option<String>,
    headers: HashMap<String, String>,
}

impl HttpUpstream {
    pub fn new(endpoint: impl Into<String>, timeout_seconds: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            bearer_token: None,
            headers: HashMap::new(),
        })
    }

    /// 端點與逾時由 [`ConfigProvider`] 提供，token 與標頭取自 `[upstream]`
    pub fn from_config(config: &BridgeConfig) -> Result<Self> {
        let endpoint = config.upstream_endpoint();
        if endpoint.trim().is_empty() {
            return Err(BridgeError::MissingConfigError {
                field: "upstream.endpoint".to_string(),
            });
        }
        let mut upstream = Self::new(endpoint, config.request_timeout_seconds())?;
        upstream.bearer_token = config.upstream.bearer_token.clone().filter(|t| !t.is_empty());
        upstream.headers = config.upstream.headers.clone();
        Ok(upstream)
    }

    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    fn url_for(&self, transaction: &TransactionType) -> String {
        self.endpoint.replace("{transaction}", transaction.as_str())
    }
}

#[async_trait]
impl Upstream for HttpUpstream {
    async fn call(&self, transaction: &TransactionType, payload: &Value) -> Result<Value> {
        let url = self.url_for(transaction);
        tracing::debug!("📡 POST {} ({})", url, transaction);

        let mut request = self.client.post(&url).json(payload);
        for (name, value) in &self.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        tracing::debug!("📡 Upstream response status: {}", status);

        let body = response.text().await?;
        if !status.is_success() {
            tracing::warn!("❌ Upstream rejected {} with HTTP {}", transaction, status.as_u16());
            return Err(BridgeError::UpstreamError {
                status: status.as_u16(),
                message: body,
            });
        }

        if body.trim().is_empty() {
            return Ok(Value::Object(Default::default()));
        }
        Ok(serde_json::from_str(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_posts_json_with_auth_and_headers() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/api/payment")
                .header("authorization", "Bearer t0k3n")
                .header("x-channel", "collector")
                .json_body(json!({"amount": 150.5}));
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(json!({"status": "approved"}));
        });

        let upstream = HttpUpstream::new(server.url("/api/{transaction}"), 5)
            .unwrap()
            .with_bearer_token("t0k3n")
            .with_header("X-Channel", "collector");
        let response = upstream
            .call(&TransactionType::payment(), &json!({"amount": 150.5}))
            .await
            .unwrap();

        api_mock.assert();
        assert_eq!(response, json!({"status": "approved"}));
    }

    #[tokio::test]
    async fn test_non_success_status_is_upstream_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/");
            then.status(503).body("maintenance");
        });

        let upstream = HttpUpstream::new(server.url("/"), 5).unwrap();
        let err = upstream
            .call(&TransactionType::query(), &json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::UpstreamError { status: 503, ref message } if message == "maintenance"));
    }

    #[test]
    fn test_from_config_requires_endpoint() {
        assert!(matches!(
            HttpUpstream::from_config(&BridgeConfig::default()),
            Err(BridgeError::MissingConfigError { .. })
        ));
    }

    #[tokio::test]
    async fn test_from_config_applies_timeout_token_and_headers() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/partner/reversal")
                .header("authorization", "Bearer from-file")
                .header("x-channel", "collector");
            then.status(200).body("");
        });

        let mut config = BridgeConfig::default();
        config.upstream.endpoint = Some(server.url("/partner/{transaction}"));
        config.upstream.timeout_seconds = 3;
        config.upstream.bearer_token = Some("from-file".to_string());
        config
            .upstream
            .headers
            .insert("X-Channel".to_string(), "collector".to_string());

        let upstream = HttpUpstream::from_config(&config).unwrap();
        let response = upstream
            .call(&TransactionType::reversal(), &json!({}))
            .await
            .unwrap();

        api_mock.assert();
        assert_eq!(response, json!({}));
    }
}
