use crate::utils::error::{BridgeError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

/// 交易類型（query / payment / reversal …），決定套用哪一組映射與模板
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct TransactionType(String);

impl TransactionType {
    pub const QUERY: &'static str = "query";
    pub const PAYMENT: &'static str = "payment";
    pub const REVERSAL: &'static str = "reversal";

    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let canonical = match name.trim().to_ascii_lowercase().as_str() {
            "consulta" | "query" => Self::QUERY.to_string(),
            "pago" | "payment" => Self::PAYMENT.to_string(),
            "reversa" | "reversal" => Self::REVERSAL.to_string(),
            other => other.to_string(),
        };
        Self(canonical)
    }

    pub fn query() -> Self {
        Self(Self::QUERY.to_string())
    }

    pub fn payment() -> Self {
        Self(Self::PAYMENT.to_string())
    }

    pub fn reversal() -> Self {
        Self(Self::REVERSAL.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for TransactionType {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

impl From<TransactionType> for String {
    fn from(transaction: TransactionType) -> Self {
        transaction.0
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TransactionType {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self> {
        if s.trim().is_empty() {
            return Err(BridgeError::UnknownTransactionType(s.to_string()));
        }
        Ok(Self::new(s))
    }
}

/// 以點號分隔的路徑，例如 `customer.account.number`
///
/// 區段不可為空，比對時大小寫敏感。區段內不得有空白、大括號或雙引號，
/// 否則無法寫成模板佔位符 `{path}`。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathExpression {
    segments: Vec<String>,
}

impl PathExpression {
    pub fn parse(path: &str) -> Result<Self> {
        let trimmed = path.trim();
        if trimmed.is_empty() {
            return Err(BridgeError::InvalidPath {
                path: path.to_string(),
                reason: "path cannot be empty".to_string(),
            });
        }

        let segments: Vec<String> = trimmed.split('.').map(str::to_string).collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(BridgeError::InvalidPath {
                path: path.to_string(),
                reason: "path contains an empty segment".to_string(),
            });
        }
        if let Some(c) = trimmed
            .chars()
            .find(|c| c.is_whitespace() || matches!(c, '{' | '}' | '"'))
        {
            return Err(BridgeError::InvalidPath {
                path: path.to_string(),
                reason: format!("character {:?} cannot appear in a template placeholder", c),
            });
        }

        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// 最後一個區段，在 XML 中作為葉節點標籤名稱
    pub fn leaf(&self) -> &str {
        // parse() 保證至少一個區段
        self.segments.last().map(String::as_str).unwrap_or_default()
    }
}

impl fmt::Display for PathExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

impl FromStr for PathExpression {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for PathExpression {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PathExpression {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    #[default]
    String,
    Number,
    Boolean,
    Date,
}

/// 映射方向：request 為 XML → JSON，response 為 JSON → XML
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Request,
    Response,
}

static NEXT_RULE_ID: AtomicU64 = AtomicU64::new(1);

fn next_rule_id() -> u64 {
    NEXT_RULE_ID.fetch_add(1, Ordering::Relaxed)
}

/// 外部帶入的 id 照用，但計數器必須越過它，之後產生的 id 才不會重複
fn claim_rule_id<'de, D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<u64, D::Error> {
    let id = u64::deserialize(deserializer)?;
    NEXT_RULE_ID.fetch_max(id.saturating_add(1), Ordering::Relaxed);
    Ok(id)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingRule {
    #[serde(default = "next_rule_id", deserialize_with = "claim_rule_id")]
    pub id: u64,
    #[serde(alias = "sourcePath")]
    pub source_path: PathExpression,
    #[serde(alias = "targetPath")]
    pub target_path: PathExpression,
    #[serde(default, rename = "type")]
    pub field_type: FieldType,
}

impl MappingRule {
    pub fn new(source_path: PathExpression, target_path: PathExpression, field_type: FieldType) -> Self {
        Self {
            id: next_rule_id(),
            source_path,
            target_path,
            field_type,
        }
    }

    /// 由字串建立規則，路徑格式錯誤時回傳 `InvalidPath`
    pub fn parse(source: &str, target: &str, field_type: FieldType) -> Result<Self> {
        Ok(Self::new(
            PathExpression::parse(source)?,
            PathExpression::parse(target)?,
            field_type,
        ))
    }
}

/// 同一方向的規則集合，插入順序即評估順序
///
/// 集合內 id 唯一：重複的 id 會重新配發。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<MappingRule>", into = "Vec<MappingRule>")]
pub struct MappingSet {
    rules: Vec<MappingRule>,
}

impl MappingSet {
    pub fn new(rules: Vec<MappingRule>) -> Self {
        let mut set = Self {
            rules: Vec::with_capacity(rules.len()),
        };
        for rule in rules {
            set.push(rule);
        }
        set
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MappingRule> {
        self.rules.iter()
    }

    pub fn get(&self, id: u64) -> Option<&MappingRule> {
        self.rules.iter().find(|r| r.id == id)
    }

    /// 加入規則並回傳實際使用的 id
    pub fn push(&mut self, mut rule: MappingRule) -> u64 {
        if self.get(rule.id).is_some() {
            let reassigned = next_rule_id();
            tracing::debug!("🔧 Rule id {} already in use, reassigned to {}", rule.id, reassigned);
            rule.id = reassigned;
        }
        let id = rule.id;
        self.rules.push(rule);
        id
    }

    /// 依 id 取代規則；找不到時回傳 false
    pub fn replace(&mut self, rule: MappingRule) -> bool {
        match self.rules.iter_mut().find(|r| r.id == rule.id) {
            Some(existing) => {
                *existing = rule;
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: u64) -> Option<MappingRule> {
        let index = self.rules.iter().position(|r| r.id == id)?;
        Some(self.rules.remove(index))
    }
}

impl FromIterator<MappingRule> for MappingSet {
    fn from_iter<I: IntoIterator<Item = MappingRule>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl From<Vec<MappingRule>> for MappingSet {
    fn from(rules: Vec<MappingRule>) -> Self {
        Self::new(rules)
    }
}

impl From<MappingSet> for Vec<MappingRule> {
    fn from(set: MappingSet) -> Self {
        set.rules
    }
}

/// 含有 `{path}` 佔位符的文字模板（XML 或 JSON）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Template(String);

impl Template {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl From<&str> for Template {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransactionConfig {
    #[serde(default)]
    pub request_mappings: MappingSet,
    #[serde(default)]
    pub response_mappings: MappingSet,
    #[serde(default)]
    pub xml_request_template: Template,
    #[serde(default)]
    pub json_request_template: Template,
    /// 僅作為範例與 schema 參考，用於自動偵測與 mock upstream
    #[serde(default)]
    pub json_response_template: Template,
    #[serde(default)]
    pub xml_response_template: Template,
}

impl TransactionConfig {
    pub fn mappings_mut(&mut self, direction: Direction) -> &mut MappingSet {
        match direction {
            Direction::Request => &mut self.request_mappings,
            Direction::Response => &mut self.response_mappings,
        }
    }
}

/// 部分更新：未設定的欄位保留原值
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransactionConfigPatch {
    #[serde(default, alias = "requestMappings")]
    pub request_mappings: Option<MappingSet>,
    #[serde(default, alias = "responseMappings")]
    pub response_mappings: Option<MappingSet>,
    #[serde(default, alias = "xmlRequestTemplate")]
    pub xml_request_template: Option<Template>,
    #[serde(default, alias = "jsonRequestTemplate")]
    pub json_request_template: Option<Template>,
    #[serde(default, alias = "jsonResponseTemplate")]
    pub json_response_template: Option<Template>,
    #[serde(default, alias = "xmlResponseTemplate")]
    pub xml_response_template: Option<Template>,
}

impl TransactionConfigPatch {
    pub fn apply_to(self, base: &TransactionConfig) -> TransactionConfig {
        TransactionConfig {
            request_mappings: self
                .request_mappings
                .unwrap_or_else(|| base.request_mappings.clone()),
            response_mappings: self
                .response_mappings
                .unwrap_or_else(|| base.response_mappings.clone()),
            xml_request_template: self
                .xml_request_template
                .unwrap_or_else(|| base.xml_request_template.clone()),
            json_request_template: self
                .json_request_template
                .unwrap_or_else(|| base.json_request_template.clone()),
            json_response_template: self
                .json_response_template
                .unwrap_or_else(|| base.json_response_template.clone()),
            xml_response_template: self
                .xml_response_template
                .unwrap_or_else(|| base.xml_response_template.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_expression_rejects_empty_segments() {
        assert!(PathExpression::parse("a..b").is_err());
        assert!(PathExpression::parse(".a").is_err());
        assert!(PathExpression::parse("").is_err());
        assert!(PathExpression::parse("customer.full name").is_err());
        assert!(PathExpression::parse("a.{b}").is_err());
        assert!(PathExpression::parse("a.\"b\"").is_err());
        assert!(PathExpression::parse("  a.b  ").is_ok());

        let path = PathExpression::parse("transaccion.monto").unwrap();
        assert_eq!(path.segments(), ["transaccion", "monto"]);
        assert_eq!(path.leaf(), "monto");
        assert_eq!(path.to_string(), "transaccion.monto");
    }

    #[test]
    fn test_transaction_type_aliases() {
        assert_eq!(TransactionType::new("pago"), TransactionType::payment());
        assert_eq!(TransactionType::new("Consulta"), TransactionType::query());
        assert_eq!(TransactionType::new("reversa").as_str(), "reversal");
        assert_eq!(TransactionType::new("refund").as_str(), "refund");
        assert!("  ".parse::<TransactionType>().is_err());
    }

    #[test]
    fn test_rule_ids_are_unique() {
        let a = MappingRule::parse("a", "b", FieldType::String).unwrap();
        let b = MappingRule::parse("a", "b", FieldType::String).unwrap();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_client_supplied_ids_never_collide_with_new_rules() {
        let posted: MappingRule = serde_json::from_value(serde_json::json!({
            "id": 1_000_000,
            "sourcePath": "a",
            "targetPath": "b"
        }))
        .unwrap();
        assert_eq!(posted.id, 1_000_000);

        let created = MappingRule::parse("c", "d", FieldType::String).unwrap();
        assert!(created.id > posted.id);

        let mut set = MappingSet::new(vec![posted]);
        assert_ne!(set.push(created.clone()), 1_000_000);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_duplicate_ids_in_a_set_are_reassigned() {
        let set: MappingSet = serde_json::from_value(serde_json::json!([
            {"id": 7, "source_path": "a", "target_path": "x"},
            {"id": 7, "source_path": "b", "target_path": "y"}
        ]))
        .unwrap();
        let ids: Vec<u64> = set.iter().map(|r| r.id).collect();
        assert_eq!(ids[0], 7);
        assert_ne!(ids[1], 7);

        // 序列化仍是單純的陣列
        let json = serde_json::to_value(&set).unwrap();
        assert_eq!(json.as_array().map(Vec::len), Some(2));
        assert_eq!(json[1]["target_path"], "y");
    }

    #[test]
    fn test_mapping_set_replace_and_remove() {
        let rule = MappingRule::parse("x", "y", FieldType::String).unwrap();
        let id = rule.id;
        let mut set = MappingSet::new(vec![rule]);

        let mut updated = MappingRule::parse("x", "z", FieldType::Number).unwrap();
        updated.id = id;
        assert!(set.replace(updated));
        assert_eq!(set.get(id).unwrap().target_path.to_string(), "z");

        assert!(set.remove(id).is_some());
        assert!(set.is_empty());
        assert!(set.remove(id).is_none());
    }

    #[test]
    fn test_rule_deserializes_from_editor_shape() {
        let rule: MappingRule = serde_json::from_value(serde_json::json!({
            "sourcePath": "transaccion.monto",
            "targetPath": "amount",
            "type": "number"
        }))
        .unwrap();
        assert_eq!(rule.field_type, FieldType::Number);
        assert_eq!(rule.target_path.to_string(), "amount");
        assert!(rule.id > 0);

        let bad = serde_json::from_value::<MappingRule>(serde_json::json!({
            "source_path": "a..b",
            "target_path": "c"
        }));
        assert!(bad.is_err());
    }

    #[test]
    fn test_patch_keeps_unset_fields() {
        let base = TransactionConfig {
            xml_response_template: Template::new("<r>{a}</r>"),
            ..Default::default()
        };
        let patch = TransactionConfigPatch {
            xml_request_template: Some(Template::new("<q/>")),
            ..Default::default()
        };
        let merged = patch.apply_to(&base);
        assert_eq!(merged.xml_request_template.as_str(), "<q/>");
        assert_eq!(merged.xml_response_template.as_str(), "<r>{a}</r>");
    }
}
