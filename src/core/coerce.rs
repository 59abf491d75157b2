//! 字串與型別化純量之間的轉換。

use crate::domain::model::FieldType;
use crate::utils::error::MappingError;
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde_json::{Number, Value};

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%d/%m/%Y %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%Y%m%d"];

/// 依欄位型別將文字轉為純量
///
/// - Number：無法解析時為 `0`
/// - Boolean：不分大小寫等於 `"true"`
/// - Date：輸出 ISO-8601 UTC（毫秒精度），無法解析時回傳 `InvalidDate`
pub fn to_typed(text: &str, field_type: FieldType) -> Result<Value, MappingError> {
    match field_type {
        FieldType::String => Ok(Value::String(text.to_string())),
        FieldType::Number => Ok(parse_number(text)),
        FieldType::Boolean => Ok(Value::Bool(text.trim().eq_ignore_ascii_case("true"))),
        FieldType::Date => parse_date(text)
            .map(|dt| Value::String(format_date(&dt)))
            .ok_or_else(|| MappingError::InvalidDate {
                input: text.to_string(),
            }),
    }
}

/// 純量的文字表示；物件與陣列輸出為緊湊 JSON
pub fn to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => format_number(n),
        Value::String(s) => s.clone(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

/// 先依型別正規化再輸出文字，用於 JSON → XML 方向
pub fn to_text_as(value: &Value, field_type: FieldType) -> Result<String, MappingError> {
    match (field_type, value) {
        (FieldType::String, _) => Ok(to_text(value)),
        (FieldType::Number, Value::Number(_)) | (FieldType::Boolean, Value::Bool(_)) => {
            Ok(to_text(value))
        }
        _ => to_typed(&to_text(value), field_type).map(|typed| to_text(&typed)),
    }
}

fn parse_number(text: &str) -> Value {
    let trimmed = text.trim();
    if let Ok(i) = trimmed.parse::<i64>() {
        return Value::Number(i.into());
    }
    if let Ok(u) = trimmed.parse::<u64>() {
        return Value::Number(u.into());
    }
    match trimmed.parse::<f64>() {
        Ok(f) if f.is_finite() => Value::Number(integral_or_float(f)),
        _ => Value::Number(0.into()),
    }
}

/// 整數值的浮點數（例如 `150.00`）存成整數
fn integral_or_float(f: f64) -> Number {
    const I64_BOUND: f64 = 9_223_372_036_854_775_808.0;
    if f.fract() == 0.0 && f > -I64_BOUND && f < I64_BOUND {
        return Number::from(f as i64);
    }
    Number::from_f64(f).unwrap_or_else(|| Number::from(0))
}

/// 十進位表示，不帶多餘的 `.0` 也不使用指數記號
fn format_number(n: &Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    if let Some(u) = n.as_u64() {
        return u.to_string();
    }
    match n.as_f64() {
        // f64 的 Display 輸出最短可還原的十進位字串，且不含指數
        Some(f) if f == 0.0 => "0".to_string(),
        Some(f) => f.to_string(),
        None => n.to_string(),
    }
}

fn parse_date(text: &str) -> Option<DateTime<Utc>> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    // 沒有時區資訊時視為 UTC
    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(naive.and_utc());
        }
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
        }
    }

    None
}

fn format_date(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}
