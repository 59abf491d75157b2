//! 由範本推導映射規則。
//!
//! - request：XML 請求範本與 JSON 請求範本共有的佔位符，各產生一條 `path → path` 規則
//! - response：範例 JSON 回應攤平後的路徑，若也出現在 XML 回應範本中則產生規則，型別依範例值推斷

use crate::core::store::{ConfigUpdate, ConfigurationStore, UpdateMode};
use crate::core::{path, template};
use crate::domain::model::{
    Direction, FieldType, MappingRule, MappingSet, PathExpression, TransactionConfig,
    TransactionConfigPatch, TransactionType,
};
use crate::utils::error::{BridgeError, Result};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};

pub fn detect_request_rules(config: &TransactionConfig) -> MappingSet {
    let json_placeholders: HashSet<String> = template::placeholders(&config.json_request_template)
        .into_iter()
        .collect();

    template::placeholders(&config.xml_request_template)
        .into_iter()
        .filter(|placeholder| json_placeholders.contains(placeholder))
        .filter_map(|placeholder| identity_rule(&placeholder, FieldType::String))
        .collect()
}

/// 範例 JSON 回應無法解析時回傳 `ValidationError`
pub fn detect_response_rules(config: &TransactionConfig) -> Result<MappingSet> {
    if config.json_response_template.is_blank() {
        return Ok(MappingSet::default());
    }

    let example: Value = serde_json::from_str(config.json_response_template.as_str()).map_err(|e| {
        BridgeError::ValidationError {
            message: format!("example JSON response is not valid JSON: {}", e),
        }
    })?;

    let xml_placeholders: HashSet<String> = template::placeholders(&config.xml_response_template)
        .into_iter()
        .collect();

    Ok(path::flatten(&example)
        .into_iter()
        .filter(|(path, _)| xml_placeholders.contains(path))
        .filter_map(|(path, value)| identity_rule(&path, infer_type(value)))
        .collect())
}

pub fn detect(config: &TransactionConfig, direction: Direction) -> Result<MappingSet> {
    match direction {
        Direction::Request => Ok(detect_request_rules(config)),
        Direction::Response => detect_response_rules(config),
    }
}

/// 偵測並以結果取代該方向目前的規則，回傳新規則
pub fn apply(store: &ConfigurationStore, transaction: &TransactionType, direction: Direction) -> Result<MappingSet> {
    let snapshot = store.snapshot();
    let detected = detect(snapshot.require(transaction)?, direction)?;

    let mut patch = TransactionConfigPatch::default();
    match direction {
        Direction::Request => patch.request_mappings = Some(detected.clone()),
        Direction::Response => patch.response_mappings = Some(detected.clone()),
    }
    store.replace_config(ConfigUpdate {
        mode: UpdateMode::Merge,
        configurations: BTreeMap::from([(transaction.clone(), patch)]),
    });

    tracing::info!(
        "🔍 Auto-detected {} {:?} mappings for '{}'",
        detected.len(),
        direction,
        transaction
    );
    Ok(detected)
}

pub fn infer_type(example: &Value) -> FieldType {
    match example {
        Value::Bool(_) => FieldType::Boolean,
        Value::Number(_) => FieldType::Number,
        _ => FieldType::String,
    }
}

fn identity_rule(path: &str, field_type: FieldType) -> Option<MappingRule> {
    // 佔位符語法比路徑寬鬆，例如 `{a..b}`，這類直接略過
    let parsed = PathExpression::parse(path).ok()?;
    Some(MappingRule::new(parsed.clone(), parsed, field_type))
}
