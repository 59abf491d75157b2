use crate::domain::model::TransactionType;
use crate::utils::error::Result;
use async_trait::async_trait;
use serde_json::Value;

/// 上游合作夥伴 API：接收結構化請求並回傳結構化回應
#[async_trait]
pub trait Upstream: Send + Sync {
    async fn call(&self, transaction: &TransactionType, payload: &Value) -> Result<Value>;
}

pub trait ConfigProvider: Send + Sync {
    fn upstream_endpoint(&self) -> &str;
    fn listen_address(&self) -> String;
    fn request_timeout_seconds(&self) -> u64;
}
