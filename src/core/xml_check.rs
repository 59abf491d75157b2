//! XML 文件檢查：格式正確性，以及 XSD 的結構子集。
//!
//! XSD 只檢查兩件事：根元素必須是 schema 的頂層 `xs:element`，
//! 文件中出現的每個元素名稱都必須在 schema 某處宣告。型別、次數、順序不檢查。

use crate::utils::error::Result;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub well_formed: bool,
    /// 未提供 schema 時為 `None`
    pub schema_valid: Option<bool>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.well_formed && self.schema_valid.unwrap_or(true)
    }
}

#[derive(Debug, Default)]
struct Scan {
    root: Option<String>,
    names: BTreeSet<String>,
    has_declaration: bool,
    errors: Vec<String>,
}

#[derive(Debug, Default)]
struct SchemaOutline {
    top_level: BTreeSet<String>,
    declared: BTreeSet<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct XmlValidator;

impl XmlValidator {
    pub fn new() -> Self {
        Self
    }

    pub fn check_well_formed(&self, xml: &str) -> ValidationReport {
        let scan = scan_document(xml);
        let mut report = ValidationReport {
            well_formed: scan.errors.is_empty(),
            schema_valid: None,
            errors: scan.errors,
            warnings: Vec::new(),
        };
        if report.well_formed && !scan.has_declaration {
            report.warnings.push("document has no XML declaration".to_string());
        }
        report
    }

    /// `schema` 可以是 XSD 內容本身，或指向 XSD 檔案的路徑
    pub fn validate(&self, xml: &str, schema: Option<&str>) -> Result<ValidationReport> {
        let Some(schema) = schema.filter(|s| !s.trim().is_empty()) else {
            return Ok(self.check_well_formed(xml));
        };
        let schema_text = load_schema(schema)?;

        let scan = scan_document(xml);
        let mut report = ValidationReport {
            well_formed: scan.errors.is_empty(),
            schema_valid: Some(false),
            errors: scan.errors,
            warnings: Vec::new(),
        };
        if !report.well_formed {
            report
                .warnings
                .push("schema validation skipped: document is not well-formed".to_string());
            return Ok(report);
        }
        if !scan.has_declaration {
            report.warnings.push("document has no XML declaration".to_string());
        }

        let outline = match outline_schema(&schema_text) {
            Ok(outline) => outline,
            Err(message) => {
                report.errors.push(format!("schema is not usable: {}", message));
                return Ok(report);
            }
        };

        let mut schema_errors = Vec::new();
        if let Some(root) = &scan.root {
            if !outline.top_level.contains(root) {
                schema_errors.push(format!("root element <{}> is not a top-level element of the schema", root));
            }
        }
        for name in scan.names.iter().filter(|n| !outline.declared.contains(*n)) {
            schema_errors.push(format!("element <{}> is not declared in the schema", name));
        }

        report.schema_valid = Some(schema_errors.is_empty());
        report.errors.extend(schema_errors);
        tracing::debug!(
            "🔍 XML validation finished: well_formed={}, schema_valid={:?}",
            report.well_formed,
            report.schema_valid
        );
        Ok(report)
    }
}

fn load_schema(schema: &str) -> Result<String> {
    let trimmed = schema.trim_start();
    if trimmed.starts_with('<') {
        return Ok(schema.to_string());
    }
    Ok(std::fs::read_to_string(Path::new(schema.trim()))?)
}

fn local_name(element: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(element.local_name().as_ref()).into_owned()
}

fn scan_document(xml: &str) -> Scan {
    let mut scan = Scan::default();
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<String> = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Decl(_)) => scan.has_declaration = true,
            Ok(Event::Start(e)) => {
                let name = local_name(&e);
                open_element(&mut scan, &stack, &name);
                stack.push(name);
            }
            Ok(Event::Empty(e)) => {
                let name = local_name(&e);
                open_element(&mut scan, &stack, &name);
            }
            Ok(Event::End(_)) => {
                stack.pop();
            }
            Ok(Event::Text(text)) => {
                if stack.is_empty() && text.iter().any(|b| !b.is_ascii_whitespace()) {
                    scan.errors.push("text content outside of the root element".to_string());
                }
            }
            Ok(Event::CData(_)) if stack.is_empty() => {
                scan.errors.push("CDATA outside of the root element".to_string());
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                scan.errors.push(format!(
                    "syntax error at byte {}: {}",
                    reader.buffer_position(),
                    e
                ));
                return scan;
            }
        }
    }

    if let Some(open) = stack.last() {
        scan.errors.push(format!("element <{}> is never closed", open));
    }
    if scan.root.is_none() && scan.errors.is_empty() {
        scan.errors.push("document has no root element".to_string());
    }
    scan
}

fn open_element(scan: &mut Scan, stack: &[String], name: &str) {
    if stack.is_empty() {
        if let Some(root) = &scan.root {
            scan.errors.push(format!(
                "multiple root elements: <{}> follows <{}>",
                name, root
            ));
        } else {
            scan.root = Some(name.to_string());
        }
    }
    scan.names.insert(name.to_string());
}

fn outline_schema(xsd: &str) -> std::result::Result<SchemaOutline, String> {
    let mut outline = SchemaOutline::default();
    let mut reader = Reader::from_str(xsd);
    reader.config_mut().trim_text(true);

    let mut depth = 0usize;
    let mut saw_schema = false;

    loop {
        let (element, is_start) = match reader.read_event() {
            Ok(Event::Start(e)) => (e, true),
            Ok(Event::Empty(e)) => (e, false),
            Ok(Event::End(_)) => {
                depth = depth.saturating_sub(1);
                continue;
            }
            Ok(Event::Eof) => break,
            Ok(_) => continue,
            Err(e) => return Err(e.to_string()),
        };

        let kind = local_name(&element);
        if depth == 0 && kind == "schema" {
            saw_schema = true;
        }
        if kind == "element" {
            let name = element
                .attributes()
                .flatten()
                .find(|attr| attr.key.local_name().as_ref() == b"name")
                .map(|attr| String::from_utf8_lossy(&attr.value).into_owned());
            if let Some(name) = name {
                if depth == 1 {
                    outline.top_level.insert(name.clone());
                }
                outline.declared.insert(name);
            }
        }
        if is_start {
            depth += 1;
        }
    }

    if !saw_schema {
        return Err("root element is not xs:schema".to_string());
    }
    Ok(outline)
}
