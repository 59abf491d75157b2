//! 沒有映射設定時的退化路徑：從簡單 XML 抓出扁平的 `tag → 文字` 配對。
//!
//! 這不是 XML 解析器。巢狀、帶屬性或命名空間的元素不在支援範圍內，可能被略過。

use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;

/// `<tag>content</tag>`，內容不可含 `<` 或 `>`；regex 不支援反向參照，開閉標籤在程式中比對
static LEAF_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<([A-Za-z_][\w.\-]*)>([^<>]+)</([A-Za-z_][\w.\-]*)>").expect("leaf regex is valid")
});

/// 擷取所有葉元素，值一律為字串（不做型別轉換）；重複標籤以最後出現者為準
pub fn extract_flat(xml: &str) -> Map<String, Value> {
    let mut out = Map::new();
    for caps in LEAF_REGEX.captures_iter(xml) {
        let (open, content, close) = (&caps[1], &caps[2], &caps[3]);
        if open != close {
            continue;
        }
        out.insert(open.to_string(), Value::String(decode_entities(content)));
    }
    out
}

pub(crate) fn decode_entities(text: &str) -> String {
    quick_xml::escape::unescape(text)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| text.to_string())
}
