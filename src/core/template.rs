//! `{path}` 佔位符模板的渲染。
//!
//! 每個佔位符只解析一次，替換後的文字不會再被掃描，所以值本身含有 `{...}` 也不會遞迴替換。

use crate::core::{coerce, path};
use crate::domain::model::{PathExpression, Template};
use regex::{Captures, Regex};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use std::sync::LazyLock;

/// 佔位符：大括號內不可再有大括號、空白或引號，避免把 JSON 物件字面值誤認為佔位符
static PLACEHOLDER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\{([^{}\s"]+?)\}"#).expect("placeholder regex is valid"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateFormat {
    Xml,
    Json,
}

impl TemplateFormat {
    fn escape(self, text: &str) -> String {
        match self {
            TemplateFormat::Xml => quick_xml::escape::escape(text).into_owned(),
            TemplateFormat::Json => {
                let quoted = Value::String(text.to_string()).to_string();
                quoted[1..quoted.len() - 1].to_string()
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub text: String,
    /// 沒有對應資料而保留原樣的佔位符名稱（去重、排序）
    pub unresolved: Vec<String>,
}

/// 依出現順序列出模板中的佔位符名稱（去重）
pub fn placeholders(template: &Template) -> Vec<String> {
    let mut seen = BTreeSet::new();
    PLACEHOLDER_REGEX
        .captures_iter(template.as_str())
        .filter_map(|caps| {
            let name = caps[1].to_string();
            seen.insert(name.clone()).then_some(name)
        })
        .collect()
}

/// 以結構化資料渲染模板，佔位符名稱視為路徑
pub fn render(template: &Template, data: &Value, format: TemplateFormat) -> Rendered {
    substitute(template, format, |name| {
        let expr = PathExpression::parse(name).ok()?;
        path::get(data, &expr).map(coerce::to_text)
    })
}

/// 以預先算好的值表渲染模板（鍵為佔位符名稱）
pub fn render_values(template: &Template, values: &HashMap<String, String>, format: TemplateFormat) -> Rendered {
    substitute(template, format, |name| values.get(name).cloned())
}

fn substitute<F>(template: &Template, format: TemplateFormat, mut lookup: F) -> Rendered
where
    F: FnMut(&str) -> Option<String>,
{
    let mut resolved: HashMap<String, Option<String>> = HashMap::new();
    let mut unresolved = BTreeSet::new();

    let text = PLACEHOLDER_REGEX.replace_all(template.as_str(), |caps: &Captures| {
        let name = &caps[1];
        let value = resolved
            .entry(name.to_string())
            .or_insert_with(|| lookup(name).map(|raw| format.escape(&raw)));

        match value {
            Some(text) => text.clone(),
            None => {
                unresolved.insert(name.to_string());
                caps[0].to_string()
            }
        }
    });

    Rendered {
        text: text.into_owned(),
        unresolved: unresolved.into_iter().collect(),
    }
}
