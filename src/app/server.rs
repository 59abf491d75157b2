//! HTTP 介面（axum）。
//!
//! collector 路由收發 `application/xml`，設定與驗證路由使用 JSON。

use crate::adapters::{HttpUpstream, MockUpstream};
use crate::app::collector::CollectorService;
use crate::config::file::{BridgeConfig, UpstreamMode};
use crate::core::autodetect;
use crate::core::engine::error_envelope;
use crate::core::store::{ConfigUpdate, ConfigurationStore};
use crate::core::xml_check::{ValidationReport, XmlValidator};
use crate::domain::model::{Direction, MappingRule, TransactionType};
use crate::domain::ports::{ConfigProvider, Upstream};
use crate::utils::error::{BridgeError, Result};
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post, put},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

const XML_CONTENT_TYPE: &str = "application/xml; charset=utf-8";

#[derive(Clone)]
pub struct AppState {
    collector: CollectorService,
    validator: XmlValidator,
}

impl AppState {
    pub fn new(collector: CollectorService) -> Self {
        Self {
            collector,
            validator: XmlValidator::new(),
        }
    }

    /// 依設定檔建立 store 與 upstream
    pub fn from_config(config: &BridgeConfig) -> Result<Self> {
        let store = Arc::new(config.build_store());
        let upstream: Arc<dyn Upstream> = match config.upstream.mode {
            UpstreamMode::Http => {
                tracing::info!("📡 Upstream: {}", config.upstream_endpoint());
                Arc::new(HttpUpstream::from_config(config)?)
            }
            UpstreamMode::Mock => {
                tracing::info!("🧪 Upstream: mock (example responses)");
                Arc::new(MockUpstream::new(store.clone()))
            }
        };
        let collector = CollectorService::new(store, upstream).with_reject_malformed(config.server.reject_malformed);
        Ok(Self::new(collector))
    }

    pub fn store(&self) -> &Arc<ConfigurationStore> {
        self.collector.store()
    }
}

#[derive(Debug, Deserialize)]
pub struct ValidateRequest {
    pub xml: String,
    /// 只接受內嵌 XSD，不讀取伺服器上的檔案
    #[serde(default)]
    pub schema: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(service_info))
        .route("/health", get(health))
        .route("/api/collector/:transaction", post(collect))
        .route("/api/config", get(get_config).post(update_config))
        .route("/api/config/:transaction/detect/:direction", post(detect_mappings))
        .route(
            "/api/config/:transaction/mappings/:direction",
            post(add_mapping).delete(clear_mappings),
        )
        .route(
            "/api/config/:transaction/mappings/:direction/:id",
            put(update_mapping).delete(remove_mapping),
        )
        .route("/api/validate", post(validate_xml))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(config: &BridgeConfig, state: AppState) -> Result<()> {
    let address = config.listen_address();
    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!("🚀 XML bridge listening on http://{}", address);
    axum::serve(listener, build_router(state)).await?;
    Ok(())
}

fn status_for(err: &BridgeError) -> StatusCode {
    match err {
        BridgeError::UnknownTransactionType(_) | BridgeError::RuleNotFound { .. } => StatusCode::NOT_FOUND,
        BridgeError::ValidationError { .. } | BridgeError::InvalidPath { .. } => StatusCode::BAD_REQUEST,
        BridgeError::ApiError(_) | BridgeError::UpstreamError { .. } => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn xml_response(status: StatusCode, body: String) -> Response {
    (status, [(header::CONTENT_TYPE, XML_CONTENT_TYPE)], body).into_response()
}

fn json_error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ErrorResponse { error: message.into() })).into_response()
}

/// GET /
async fn service_info(State(state): State<AppState>) -> Json<serde_json::Value> {
    let snapshot = state.store().snapshot();
    let transactions: Vec<&str> = snapshot.transaction_types().map(TransactionType::as_str).collect();
    Json(json!({
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "config_version": snapshot.version,
        "transactions": transactions,
        "endpoints": {
            "collector": "POST /api/collector/{transaction}",
            "config": "GET|POST /api/config",
            "detect": "POST /api/config/{transaction}/detect/{request|response}",
            "mappings": "POST|DELETE /api/config/{transaction}/mappings/{direction}, PUT|DELETE .../{id}",
            "validate": "POST /api/validate",
            "health": "GET /health"
        }
    }))
}

/// GET /health
async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "config_version": state.store().version(),
    }))
}

/// POST /api/collector/:transaction
async fn collect(State(state): State<AppState>, Path(transaction): Path<String>, body: String) -> Response {
    let transaction = TransactionType::new(transaction);
    match state.collector.process(&transaction, &body).await {
        Ok(outcome) if outcome.is_success() => xml_response(StatusCode::OK, outcome.xml),
        Ok(outcome) => xml_response(StatusCode::BAD_GATEWAY, outcome.xml),
        Err(err) => {
            tracing::warn!("❌ Collector '{}' failed: {}", transaction, err);
            xml_response(status_for(&err), error_envelope(&err.user_friendly_message()))
        }
    }
}

/// GET /api/config
async fn get_config(State(state): State<AppState>) -> Response {
    Json(state.store().snapshot().as_ref().clone()).into_response()
}

/// POST /api/config
async fn update_config(State(state): State<AppState>, Json(update): Json<ConfigUpdate>) -> Json<serde_json::Value> {
    let mode = update.mode;
    let version = state.store().replace_config(update);
    Json(json!({
        "success": true,
        "mode": mode,
        "version": version,
    }))
}

/// POST /api/config/:transaction/detect/:direction
async fn detect_mappings(
    State(state): State<AppState>,
    Path((transaction, direction)): Path<(String, Direction)>,
) -> Response {
    let transaction = TransactionType::new(transaction);
    match autodetect::apply(state.store(), &transaction, direction) {
        Ok(rules) => Json(json!({
            "transaction": transaction,
            "direction": direction,
            "mappings": rules,
            "version": state.store().version(),
        }))
        .into_response(),
        Err(err) => json_error(status_for(&err), err.user_friendly_message()),
    }
}

fn edited(state: &AppState, mut body: serde_json::Value) -> Response {
    body["version"] = json!(state.store().version());
    Json(body).into_response()
}

/// POST /api/config/:transaction/mappings/:direction
async fn add_mapping(
    State(state): State<AppState>,
    Path((transaction, direction)): Path<(String, Direction)>,
    Json(rule): Json<MappingRule>,
) -> Response {
    let transaction = TransactionType::new(transaction);
    match state.store().add_rule(&transaction, direction, rule) {
        Ok(id) => edited(&state, json!({"success": true, "id": id})),
        Err(err) => json_error(status_for(&err), err.user_friendly_message()),
    }
}

/// PUT /api/config/:transaction/mappings/:direction/:id
async fn update_mapping(
    State(state): State<AppState>,
    Path((transaction, direction, id)): Path<(String, Direction, u64)>,
    Json(mut rule): Json<MappingRule>,
) -> Response {
    let transaction = TransactionType::new(transaction);
    rule.id = id;
    match state.store().update_rule(&transaction, direction, rule) {
        Ok(()) => edited(&state, json!({"success": true, "id": id})),
        Err(err) => json_error(status_for(&err), err.user_friendly_message()),
    }
}

/// DELETE /api/config/:transaction/mappings/:direction/:id
async fn remove_mapping(
    State(state): State<AppState>,
    Path((transaction, direction, id)): Path<(String, Direction, u64)>,
) -> Response {
    let transaction = TransactionType::new(transaction);
    match state.store().remove_rule(&transaction, direction, id) {
        Ok(removed) => edited(&state, json!({"success": true, "removed": removed})),
        Err(err) => json_error(status_for(&err), err.user_friendly_message()),
    }
}

/// DELETE /api/config/:transaction/mappings/:direction
async fn clear_mappings(
    State(state): State<AppState>,
    Path((transaction, direction)): Path<(String, Direction)>,
) -> Response {
    let transaction = TransactionType::new(transaction);
    match state.store().clear_rules(&transaction, direction) {
        Ok(()) => edited(&state, json!({"success": true})),
        Err(err) => json_error(status_for(&err), err.user_friendly_message()),
    }
}

/// POST /api/validate
async fn validate_xml(State(state): State<AppState>, Json(request): Json<ValidateRequest>) -> Response {
    let schema = request.schema.as_deref().filter(|s| !s.trim().is_empty());
    if let Some(schema) = schema {
        if !schema.trim_start().starts_with('<') {
            return json_error(StatusCode::BAD_REQUEST, "schema must be inline XSD content");
        }
    }

    match state.validator.validate(&request.xml, schema) {
        Ok(report) => Json::<ValidationReport>(report).into_response(),
        Err(err) => json_error(status_for(&err), err.user_friendly_message()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_mapping() {
        assert_eq!(
            status_for(&BridgeError::UnknownTransactionType("x".into())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_for(&BridgeError::UpstreamError {
                status: 500,
                message: String::new()
            }),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_for(&BridgeError::ValidationError {
                message: String::new()
            }),
            StatusCode::BAD_REQUEST
        );
    }
}
