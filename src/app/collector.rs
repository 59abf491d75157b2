//! 端到端流程：XML 請求 → JSON → 合作夥伴 API → JSON 回應 → XML。

use crate::core::engine::{error_envelope, Diagnostic, TransformEngine};
use crate::core::store::ConfigurationStore;
use crate::core::xml_check::XmlValidator;
use crate::domain::model::TransactionType;
use crate::domain::ports::Upstream;
use crate::utils::error::{BridgeError, Result};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone)]
pub struct CollectorOutcome {
    /// 回給呼叫端的 XML；上游失敗時為錯誤信封
    pub xml: String,
    /// 送往上游的 JSON 請求
    pub request: Value,
    pub diagnostics: Vec<Diagnostic>,
    pub upstream_error: Option<String>,
}

impl CollectorOutcome {
    pub fn is_success(&self) -> bool {
        self.upstream_error.is_none()
    }
}

#[derive(Clone)]
pub struct CollectorService {
    engine: TransformEngine,
    upstream: Arc<dyn Upstream>,
    validator: XmlValidator,
    reject_malformed: bool,
}

impl CollectorService {
    pub fn new(store: Arc<ConfigurationStore>, upstream: Arc<dyn Upstream>) -> Self {
        Self {
            engine: TransformEngine::new(store),
            upstream,
            validator: XmlValidator::new(),
            reject_malformed: false,
        }
    }

    /// 開啟後格式錯誤的 XML 以 `ValidationError` 拒絕
    pub fn with_reject_malformed(mut self, reject: bool) -> Self {
        self.reject_malformed = reject;
        self
    }

    pub fn engine(&self) -> &TransformEngine {
        &self.engine
    }

    pub fn store(&self) -> &Arc<ConfigurationStore> {
        self.engine.store()
    }

    /// 未知交易類型與被拒絕的輸入回傳 `Err`；上游失敗則以錯誤信封回應
    pub async fn process(&self, transaction: &TransactionType, xml: &str) -> Result<CollectorOutcome> {
        let started = Instant::now();
        tracing::info!("📨 Collector request for '{}' ({} bytes)", transaction, xml.len());

        if self.reject_malformed {
            let report = self.validator.check_well_formed(xml);
            if !report.well_formed {
                tracing::warn!("❌ Rejected malformed XML for '{}'", transaction);
                return Err(BridgeError::ValidationError {
                    message: report.errors.join("; "),
                });
            }
        }

        let request = self.engine.xml_to_structured(xml, transaction)?;
        let mut diagnostics = request.diagnostics;

        let response = match self.upstream.call(transaction, &request.value).await {
            Ok(response) => response,
            Err(err) => {
                tracing::error!("❌ Upstream call for '{}' failed: {}", transaction, err);
                return Ok(CollectorOutcome {
                    xml: error_envelope(&err.user_friendly_message()),
                    request: request.value,
                    diagnostics,
                    upstream_error: Some(err.to_string()),
                });
            }
        };

        let rendered = self.engine.structured_to_xml(&response, transaction)?;
        diagnostics.extend(rendered.diagnostics);

        tracing::info!(
            "✅ Collector '{}' completed in {} ms with {} diagnostics",
            transaction,
            started.elapsed().as_millis(),
            diagnostics.len()
        );
        Ok(CollectorOutcome {
            xml: rendered.value,
            request: request.value,
            diagnostics,
            upstream_error: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MockUpstream;
    use async_trait::async_trait;
    use serde_json::json;

    struct FailingUpstream;

    #[async_trait]
    impl Upstream for FailingUpstream {
        async fn call(&self, _transaction: &TransactionType, _payload: &Value) -> Result<Value> {
            Err(BridgeError::UpstreamError {
                status: 500,
                message: "boom".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_mock_pipeline_renders_example_response() {
        let store = Arc::new(ConfigurationStore::with_defaults());
        let service = CollectorService::new(store.clone(), Arc::new(MockUpstream::new(store)));

        let outcome = service
            .process(&TransactionType::new("pago"), "<pago><transaccion><id>T-1</id></transaccion></pago>")
            .await
            .unwrap();

        assert!(outcome.is_success());
        assert_eq!(outcome.request, json!({"id": "T-1"}));
        assert!(outcome.xml.contains("<codigoAutorizacion>AUTH-789</codigoAutorizacion>"));
        assert!(outcome.xml.contains("<comisiones>2.5</comisiones>"));
    }

    #[tokio::test]
    async fn test_upstream_failure_becomes_error_envelope() {
        let store = Arc::new(ConfigurationStore::with_defaults());
        let service = CollectorService::new(store, Arc::new(FailingUpstream));

        let outcome = service
            .process(&TransactionType::query(), "<consulta/>")
            .await
            .unwrap();
        assert!(!outcome.is_success());
        assert!(outcome.xml.contains("<status>error</status>"));
    }

    #[tokio::test]
    async fn test_reject_malformed_and_unknown_type() {
        let store = Arc::new(ConfigurationStore::with_defaults());
        let service =
            CollectorService::new(store.clone(), Arc::new(MockUpstream::new(store))).with_reject_malformed(true);

        assert!(matches!(
            service.process(&TransactionType::payment(), "<pago>").await,
            Err(BridgeError::ValidationError { .. })
        ));
        assert!(matches!(
            service.process(&TransactionType::new("refund"), "<r/>").await,
            Err(BridgeError::UnknownTransactionType(_))
        ));
    }
}
