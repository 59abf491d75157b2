//! XML ↔ 結構化資料的雙向轉換。
//!
//! 引擎本身無狀態：每次呼叫取得一份設定快照，所有中間資料只屬於該次呼叫。
//! 資料品質問題（缺標籤、未解析的佔位符、日期錯誤、路徑衝突）只會產生 [`Diagnostic`]，
//! 唯一的硬性錯誤是未註冊的交易類型。

use crate::core::store::ConfigurationStore;
use crate::core::template::{self, TemplateFormat};
use crate::core::{coerce, heuristic, path};
use crate::domain::model::{MappingRule, TransactionConfig, TransactionType};
use crate::utils::error::{MappingError, Result};
use regex::{Regex, RegexBuilder};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// 轉換過程中的非致命訊號
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// 設定的來源標籤不在輸入 XML 中
    MissingTag { rule_id: u64, tag: String },
    /// 模板佔位符沒有對應資料，原樣保留在輸出
    UnresolvedPlaceholder { placeholder: String },
    PathConflict { rule_id: u64, path: String, segment: String },
    InvalidDate { rule_id: u64, input: String },
    /// 輸入無法掃描，結果退化為空物件
    MalformedInput { reason: String },
}

impl Diagnostic {
    fn from_rule_error(rule: &MappingRule, err: MappingError) -> Self {
        match err {
            MappingError::PathConflict { path, segment } => Diagnostic::PathConflict {
                rule_id: rule.id,
                path,
                segment,
            },
            MappingError::InvalidDate { input } => Diagnostic::InvalidDate {
                rule_id: rule.id,
                input,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransformOutcome<T> {
    pub value: T,
    pub diagnostics: Vec<Diagnostic>,
}

impl<T> TransformOutcome<T> {
    pub fn has_warnings(&self) -> bool {
        !self.diagnostics.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct TransformEngine {
    store: Arc<ConfigurationStore>,
}

impl TransformEngine {
    pub fn new(store: Arc<ConfigurationStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<ConfigurationStore> {
        &self.store
    }

    /// XML → 結構化資料（request 方向）
    pub fn xml_to_structured(&self, xml: &str, transaction: &TransactionType) -> Result<TransformOutcome<Value>> {
        let snapshot = self.store.snapshot();
        let config = snapshot.require(transaction)?;
        tracing::debug!(
            "🔄 {}: XML → JSON with config version {}",
            transaction,
            snapshot.version
        );
        Ok(xml_to_structured_with(config, xml))
    }

    /// 結構化資料 → XML（response 方向）
    pub fn structured_to_xml(&self, data: &Value, transaction: &TransactionType) -> Result<TransformOutcome<String>> {
        let snapshot = self.store.snapshot();
        let config = snapshot.require(transaction)?;
        tracing::debug!(
            "🔄 {}: JSON → XML with config version {}",
            transaction,
            snapshot.version
        );
        Ok(structured_to_xml_with(config, data))
    }
}

/// 以指定設定執行 XML → 結構化資料：
/// 有 request 映射時逐條套用，否則退回啟發式擷取
pub fn xml_to_structured_with(config: &TransactionConfig, xml: &str) -> TransformOutcome<Value> {
    let mut diagnostics = Vec::new();

    if let Err(reason) = check_scannable(xml) {
        tracing::warn!("⚠️ Malformed XML input, degrading to empty result: {}", reason);
        diagnostics.push(Diagnostic::MalformedInput { reason });
        return TransformOutcome {
            value: Value::Object(Map::new()),
            diagnostics,
        };
    }

    if config.request_mappings.is_empty() {
        tracing::debug!("📋 No request mappings configured, using heuristic extraction");
        return TransformOutcome {
            value: Value::Object(heuristic::extract_flat(xml)),
            diagnostics,
        };
    }

    let mut data = Value::Object(Map::new());
    for rule in config.request_mappings.iter() {
        let tag = rule.source_path.leaf();
        let text = match find_leaf_text(xml, tag) {
            Some(text) => text,
            None => {
                tracing::debug!("⏭️ Rule {}: tag <{}> not found, skipped", rule.id, tag);
                diagnostics.push(Diagnostic::MissingTag {
                    rule_id: rule.id,
                    tag: tag.to_string(),
                });
                continue;
            }
        };

        let applied = coerce::to_typed(&text, rule.field_type)
            .and_then(|typed| path::set(&mut data, &rule.target_path, typed));
        if let Err(err) = applied {
            tracing::warn!("⚠️ Rule {} ({} → {}) skipped: {}", rule.id, rule.source_path, rule.target_path, err);
            diagnostics.push(Diagnostic::from_rule_error(rule, err));
        }
    }

    TransformOutcome {
        value: data,
        diagnostics,
    }
}

/// 以指定設定執行結構化資料 → XML，優先順序：
/// 1. 有 XML 回應模板且有 response 映射：依規則替換 `{targetPath}`
/// 2. 只有模板：將資料攤平，名稱相同的佔位符自動對應
/// 3. 沒有模板：輸出包含資料文字的通用 XML 信封
pub fn structured_to_xml_with(config: &TransactionConfig, data: &Value) -> TransformOutcome<String> {
    let template = &config.xml_response_template;
    let mut diagnostics = Vec::new();

    if template.is_blank() {
        tracing::debug!("📋 No XML response template configured, emitting generic envelope");
        return TransformOutcome {
            value: generic_envelope(data),
            diagnostics,
        };
    }

    let values: HashMap<String, String> = if config.response_mappings.is_empty() {
        tracing::debug!("📋 No response mappings configured, auto-mapping by placeholder name");
        path::flatten(data)
            .into_iter()
            .map(|(path, value)| (path, coerce::to_text(value)))
            .collect()
    } else {
        let mut values = HashMap::new();
        for rule in config.response_mappings.iter() {
            let Some(value) = path::get(data, &rule.source_path) else {
                tracing::debug!("⏭️ Rule {}: no value at '{}'", rule.id, rule.source_path);
                continue;
            };
            match coerce::to_text_as(value, rule.field_type) {
                Ok(text) => {
                    values.insert(rule.target_path.to_string(), text);
                }
                Err(err) => {
                    tracing::warn!("⚠️ Rule {} ({} → {}) skipped: {}", rule.id, rule.source_path, rule.target_path, err);
                    diagnostics.push(Diagnostic::from_rule_error(rule, err));
                }
            }
        }
        values
    };

    let rendered = template::render_values(template, &values, TemplateFormat::Xml);
    for placeholder in rendered.unresolved {
        tracing::warn!("⚠️ Unresolved placeholder {{{}}} left in output", placeholder);
        diagnostics.push(Diagnostic::UnresolvedPlaceholder { placeholder });
    }

    TransformOutcome {
        value: rendered.text,
        diagnostics,
    }
}

/// 沒有模板時的通用信封，資料以跳脫後的 JSON 文字嵌入
pub fn generic_envelope(data: &Value) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<response>
    <status>success</status>
    <data>{}</data>
</response>"#,
        quick_xml::escape::escape(data.to_string().as_str())
    )
}

/// 錯誤回應信封
pub fn error_envelope(message: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<response>
    <status>error</status>
    <message>{}</message>
</response>"#,
        quick_xml::escape::escape(message)
    )
}

fn check_scannable(xml: &str) -> std::result::Result<(), String> {
    let trimmed = xml.trim_start_matches('\u{feff}').trim();
    if trimmed.is_empty() {
        return Err("input is empty".to_string());
    }
    if !trimmed.starts_with('<') {
        return Err("input does not start with a markup tag".to_string());
    }
    Ok(())
}

/// 以標籤名稱（不分大小寫）尋找第一個 `<tag>文字</tag>` 葉元素
fn find_leaf_text(xml: &str, tag: &str) -> Option<String> {
    let regex = leaf_regex(tag)?;
    let caps = regex.captures(xml)?;
    Some(heuristic::decode_entities(caps[1].trim()))
}

fn leaf_regex(tag: &str) -> Option<Regex> {
    let escaped = regex::escape(tag);
    RegexBuilder::new(&format!(r"<{0}(?:\s[^>]*)?>([^<]*)</{0}\s*>", escaped))
        .case_insensitive(true)
        .build()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{FieldType, MappingSet, Template};
    use serde_json::json;

    fn rule(source: &str, target: &str, field_type: FieldType) -> MappingRule {
        MappingRule::parse(source, target, field_type).unwrap()
    }

    #[test]
    fn test_mapped_payment_uses_leaf_tag() {
        let config = TransactionConfig {
            request_mappings: MappingSet::new(vec![rule("transaccion.monto", "amount", FieldType::Number)]),
            ..Default::default()
        };
        let outcome = xml_to_structured_with(
            &config,
            "<pago><transaccion><monto>150.50</monto></transaccion></pago>",
        );
        assert_eq!(outcome.value, json!({"amount": 150.5}));
        assert!(outcome.diagnostics.is_empty());
    }

    #[test]
    fn test_tag_match_is_case_insensitive_and_allows_attributes() {
        let config = TransactionConfig {
            request_mappings: MappingSet::new(vec![rule("monto", "payment.amount", FieldType::Number)]),
            ..Default::default()
        };
        let outcome = xml_to_structured_with(&config, r#"<pago><Monto moneda="GTQ"> 12 </Monto></pago>"#);
        assert_eq!(outcome.value, json!({"payment": {"amount": 12}}));
    }

    #[test]
    fn test_missing_tag_is_reported_not_fatal() {
        let missing = rule("cliente.email", "customer.email", FieldType::String);
        let missing_id = missing.id;
        let config = TransactionConfig {
            request_mappings: MappingSet::new(vec![missing, rule("id", "transactionId", FieldType::String)]),
            ..Default::default()
        };
        let outcome = xml_to_structured_with(&config, "<pago><id>T-1</id></pago>");
        assert_eq!(outcome.value, json!({"transactionId": "T-1"}));
        assert_eq!(
            outcome.diagnostics,
            vec![Diagnostic::MissingTag {
                rule_id: missing_id,
                tag: "email".to_string()
            }]
        );
    }

    #[test]
    fn test_conflicting_rule_is_skipped() {
        let config = TransactionConfig {
            request_mappings: MappingSet::new(vec![
                rule("a", "x", FieldType::String),
                rule("b", "x.y", FieldType::String),
                rule("c", "z", FieldType::Boolean),
            ]),
            ..Default::default()
        };
        let outcome = xml_to_structured_with(&config, "<r><a>1</a><b>2</b><c>TRUE</c></r>");
        assert_eq!(outcome.value, json!({"x": "1", "z": true}));
        assert!(matches!(outcome.diagnostics[0], Diagnostic::PathConflict { .. }));
    }

    #[test]
    fn test_invalid_date_omits_field() {
        let config = TransactionConfig {
            request_mappings: MappingSet::new(vec![
                rule("fecha", "date", FieldType::Date),
                rule("id", "id", FieldType::String),
            ]),
            ..Default::default()
        };
        let outcome = xml_to_structured_with(&config, "<r><fecha>ayer</fecha><id>9</id></r>");
        assert_eq!(outcome.value, json!({"id": "9"}));
        assert!(matches!(outcome.diagnostics[0], Diagnostic::InvalidDate { .. }));
    }

    #[test]
    fn test_heuristic_fallback_without_mappings() {
        let outcome = xml_to_structured_with(&TransactionConfig::default(), "<root><amount>100</amount></root>");
        assert_eq!(outcome.value, json!({"amount": "100"}));
    }

    #[test]
    fn test_malformed_input_degrades_to_empty() {
        let outcome = xml_to_structured_with(&TransactionConfig::default(), "amount=100");
        assert_eq!(outcome.value, json!({}));
        assert!(matches!(outcome.diagnostics[0], Diagnostic::MalformedInput { .. }));
    }

    #[test]
    fn test_explicit_response_mapping() {
        let config = TransactionConfig {
            response_mappings: MappingSet::new(vec![
                rule("status", "estado", FieldType::String),
                rule("fees", "comisiones", FieldType::Number),
                rule("processedAt", "fecha", FieldType::Date),
            ]),
            xml_response_template: Template::new(
                "<r><e>{estado}</e><e2>{estado}</e2><c>{comisiones}</c><f>{fecha}</f><x>{status}</x></r>",
            ),
            ..Default::default()
        };
        let data = json!({"status": "approved", "fees": 2.50, "processedAt": "2025-10-16T12:30:00Z"});
        let outcome = structured_to_xml_with(&config, &data);
        assert_eq!(
            outcome.value,
            "<r><e>approved</e><e2>approved</e2><c>2.5</c><f>2025-10-16T12:30:00.000Z</f><x>{status}</x></r>"
        );
        assert_eq!(
            outcome.diagnostics,
            vec![Diagnostic::UnresolvedPlaceholder {
                placeholder: "status".to_string()
            }]
        );
    }

    #[test]
    fn test_duplicate_targets_last_write_wins() {
        let config = TransactionConfig {
            response_mappings: MappingSet::new(vec![
                rule("a", "out", FieldType::String),
                rule("b", "out", FieldType::String),
            ]),
            xml_response_template: Template::new("<r>{out}</r>"),
            ..Default::default()
        };
        let outcome = structured_to_xml_with(&config, &json!({"a": "first", "b": "second"}));
        assert_eq!(outcome.value, "<r>second</r>");
    }

    #[test]
    fn test_auto_map_without_rules() {
        let config = TransactionConfig {
            xml_response_template: Template::new("<r><n>{account.number}</n><ok>{success}</ok></r>"),
            ..Default::default()
        };
        let outcome = structured_to_xml_with(&config, &json!({"success": true, "account": {"number": "123"}}));
        assert_eq!(outcome.value, "<r><n>123</n><ok>true</ok></r>");
        assert!(outcome.diagnostics.is_empty());
    }

    #[test]
    fn test_unresolved_placeholder_scenario() {
        let config = TransactionConfig {
            xml_response_template: Template::new("<r><x>{foo}</x></r>"),
            ..Default::default()
        };
        let outcome = structured_to_xml_with(&config, &json!({}));
        assert_eq!(outcome.value, "<r><x>{foo}</x></r>");
        assert_eq!(
            outcome.diagnostics,
            vec![Diagnostic::UnresolvedPlaceholder {
                placeholder: "foo".to_string()
            }]
        );
    }

    #[test]
    fn test_generic_envelope_is_escaped() {
        let outcome = structured_to_xml_with(&TransactionConfig::default(), &json!({"msg": "<b>&\"x\""}));
        assert!(outcome.value.starts_with("<?xml"));
        assert!(!outcome.value.contains("\"msg\""));
        assert!(outcome.value.contains("&quot;msg&quot;"));
        assert!(outcome.value.contains("&lt;b&gt;&amp;"));
    }

    #[test]
    fn test_engine_rejects_unknown_transaction() {
        let engine = TransformEngine::new(Arc::new(ConfigurationStore::default()));
        assert!(engine
            .xml_to_structured("<a/>", &TransactionType::new("refund"))
            .is_err());
        assert!(engine
            .structured_to_xml(&json!({}), &TransactionType::new("refund"))
            .is_err());
    }
}
