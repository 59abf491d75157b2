use crate::core::store::ConfigurationStore;
use crate::domain::model::TransactionType;
use crate::domain::ports::Upstream;
use crate::utils::error::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// 不呼叫外部服務，直接回傳交易設定中的範例 JSON 回應
///
/// 沒有範例時原樣回傳請求內容。
#[derive(Debug, Clone)]
pub struct MockUpstream {
    store: Arc<ConfigurationStore>,
}

impl MockUpstream {
    pub fn new(store: Arc<ConfigurationStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Upstream for MockUpstream {
    async fn call(&self, transaction: &TransactionType, payload: &Value) -> Result<Value> {
        let snapshot = self.store.snapshot();
        let example = &snapshot.require(transaction)?.json_response_template;

        if example.is_blank() {
            tracing::debug!("🧪 Mock upstream echoing request for '{}'", transaction);
            return Ok(payload.clone());
        }
        tracing::debug!("🧪 Mock upstream answering '{}' with example response", transaction);
        Ok(serde_json::from_str(example.as_str())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::TransactionConfig;
    use serde_json::json;

    #[tokio::test]
    async fn test_returns_example_response() {
        let upstream = MockUpstream::new(Arc::new(ConfigurationStore::with_defaults()));
        let response = upstream
            .call(&TransactionType::payment(), &json!({}))
            .await
            .unwrap();
        assert_eq!(response["authorizationCode"], json!("AUTH-789"));
    }

    #[tokio::test]
    async fn test_echoes_without_example() {
        let store = Arc::new(ConfigurationStore::default());
        store.register(TransactionType::new("refund"), TransactionConfig::default());
        let upstream = MockUpstream::new(store);

        let payload = json!({"id": "R-1"});
        let response = upstream
            .call(&TransactionType::new("refund"), &payload)
            .await
            .unwrap();
        assert_eq!(response, payload);
        assert!(upstream
            .call(&TransactionType::new("unknown"), &payload)
            .await
            .is_err());
    }
}
