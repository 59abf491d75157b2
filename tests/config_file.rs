use anyhow::Result;
use std::io::Write;
use tempfile::NamedTempFile;
use xml_bridge::config::UpstreamMode;
use xml_bridge::utils::validation::Validate;
use xml_bridge::{AppState, BridgeConfig, FieldType, TransactionType};

const CONFIG: &str = r#"
[server]
port = 7070

[upstream]
mode = "mock"
timeout_seconds = 15

[[transactions.payment.request_mappings]]
source_path = "transaccion.monto"
target_path = "amount"
type = "number"

[[transactions.payment.request_mappings]]
source_path = "transaccion.fecha"
target_path = "requestedAt"
type = "date"

[transactions.refund]
json_response_template = '{"status": "refunded"}'
xml_response_template = "<reembolso><estado>{status}</estado></reembolso>"
"#;

#[tokio::test]
async fn test_file_config_drives_the_collector() -> Result<()> {
    let mut file = NamedTempFile::new()?;
    file.write_all(CONFIG.as_bytes())?;

    let config = BridgeConfig::from_file(file.path())?;
    config.validate()?;
    assert_eq!(config.server.port, 7070);
    assert_eq!(config.upstream.mode, UpstreamMode::Mock);

    let state = AppState::from_config(&config)?;
    let payment = state
        .store()
        .get(&TransactionType::payment())
        .expect("payment survives the overlay");
    assert_eq!(payment.request_mappings.len(), 2);
    assert_eq!(
        payment.request_mappings.iter().last().map(|r| r.field_type),
        Some(FieldType::Date)
    );

    let engine = xml_bridge::TransformEngine::new(state.store().clone());
    let outcome = engine.xml_to_structured(
        "<pago><transaccion><monto>10</monto><fecha>15/10/2025</fecha></transaccion></pago>",
        &TransactionType::payment(),
    )?;
    assert_eq!(
        outcome.value,
        serde_json::json!({"amount": 10, "requestedAt": "2025-10-15T00:00:00.000Z"})
    );

    let refund = engine.structured_to_xml(
        &serde_json::json!({"status": "refunded"}),
        &TransactionType::new("refund"),
    )?;
    assert_eq!(refund.value, "<reembolso><estado>refunded</estado></reembolso>");
    Ok(())
}

#[test]
fn test_missing_file_is_io_error() {
    let err = BridgeConfig::from_file("/definitely/not/here.toml").unwrap_err();
    assert_eq!(err.category(), xml_bridge::utils::error::ErrorCategory::System);
}
