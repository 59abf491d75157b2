//! 以點號路徑讀寫巢狀的 JSON 結構。
//!
//! 只走訪物件（map），不處理陣列索引。

use crate::domain::model::PathExpression;
use crate::utils::error::MappingError;
use serde_json::{Map, Value};

/// 依序走訪每個區段；任何中間節點缺少或不是 map 時回傳 `None`
pub fn get<'a>(data: &'a Value, path: &PathExpression) -> Option<&'a Value> {
    let mut current = data;
    for segment in path.segments() {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// 寫入葉節點，途中缺少的中間 map 會自動建立。
///
/// 中間節點存在但不是 map 時回傳 `PathConflict`，且不修改任何資料。
pub fn set(data: &mut Value, path: &PathExpression, value: Value) -> Result<(), MappingError> {
    let conflict = |segment: &str| MappingError::PathConflict {
        path: path.to_string(),
        segment: segment.to_string(),
    };

    // 先檢查整條路徑，避免寫到一半才發現衝突
    let segments = path.segments();
    let (leaf, parents) = match segments.split_last() {
        Some(split) => split,
        None => return Ok(()),
    };

    if data.is_null() {
        *data = Value::Object(Map::new());
    }

    let mut cursor = Some(&*data);
    let mut holder = "$";
    for segment in parents {
        match cursor {
            Some(Value::Object(map)) => {
                cursor = map.get(segment);
                holder = segment.as_str();
            }
            Some(_) => return Err(conflict(holder)),
            None => break,
        }
    }
    if let Some(node) = cursor {
        if !node.is_object() {
            return Err(conflict(holder));
        }
    }

    let mut current = data;
    for segment in parents {
        let map = current
            .as_object_mut()
            .ok_or_else(|| conflict(segment))?;
        current = map
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Map::new()));
    }

    current
        .as_object_mut()
        .ok_or_else(|| conflict(leaf))?
        .insert(leaf.clone(), value);
    Ok(())
}

/// 將巢狀物件攤平為 (點號路徑, 葉值) 列表；陣列與純量視為葉值，空物件不產生路徑
pub fn flatten(data: &Value) -> Vec<(String, &Value)> {
    let mut out = Vec::new();
    if let Value::Object(map) = data {
        flatten_into(map, "", &mut out);
    }
    out
}

fn flatten_into<'a>(map: &'a Map<String, Value>, prefix: &str, out: &mut Vec<(String, &'a Value)>) {
    for (key, value) in map {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };

        match value {
            Value::Object(child) => flatten_into(child, &path, out),
            _ => out.push((path, value)),
        }
    }
}
