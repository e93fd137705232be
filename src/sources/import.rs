//! JSON candidate import
//!
//! The input is a JSON array of objects:
//!
//! ```json
//! [{"title": "Stay hungry, stay foolish", "author": "Steve Jobs", "category": "tech"}]
//! ```
//!
//! `title` is required. `url`, `category`, `author`, `source_module`,
//! `content_type` and a free-form `metadata` object are optional; `author`
//! is folded into the metadata.

use crate::error::{Error, Result};
use crate::store::{ContentType, NewItem};
use serde::Deserialize;
use serde_json::{Map, Value};

/// Source module recorded when a record does not name one
pub const IMPORT_SOURCE_MODULE: &str = "import";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ImportRecord {
    title: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    source_module: Option<String>,
    #[serde(default)]
    content_type: Option<ContentType>,
    #[serde(default)]
    metadata: Option<Map<String, Value>>,
}

/// Parse an import file into candidates of `default_type`.
///
/// Records with a blank title are rejected with their position, so a bad
/// file fails before anything is written.
pub fn parse_import(json: &str, default_type: ContentType) -> Result<Vec<NewItem>> {
    let records: Vec<ImportRecord> = serde_json::from_str(json)?;

    records
        .into_iter()
        .enumerate()
        .map(|(index, record)| {
            let title = record.title.trim();
            if title.is_empty() {
                return Err(Error::Other(format!("record {} has an empty title", index)));
            }

            let mut metadata = record.metadata.unwrap_or_default();
            if let Some(author) = record.author.filter(|a| !a.trim().is_empty()) {
                metadata.insert("author".to_string(), Value::String(author.trim().to_string()));
            }

            let mut item = NewItem::new(
                title,
                record.content_type.unwrap_or(default_type),
                record
                    .source_module
                    .unwrap_or_else(|| IMPORT_SOURCE_MODULE.to_string()),
            )
            .with_metadata(Value::Object(metadata));
            if let Some(url) = record.url {
                item = item.with_url(url);
            }
            if let Some(category) = record.category.filter(|c| !c.trim().is_empty()) {
                item = item.with_category(category.trim());
            }
            Ok(item)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_quotes() {
        let json = r#"[
            {"title": "  Talk is cheap. Show me the code. ", "author": "Linus Torvalds", "category": "tech"},
            {"title": "So say we all", "content_type": "quote", "metadata": {"series": "BSG"}}
        ]"#;
        let items = parse_import(json, ContentType::Quote).unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "Talk is cheap. Show me the code.");
        assert_eq!(items[0].metadata["author"], "Linus Torvalds");
        assert_eq!(items[0].category.as_deref(), Some("tech"));
        assert_eq!(items[0].source_module, IMPORT_SOURCE_MODULE);
        assert_eq!(items[1].metadata["series"], "BSG");
        assert!(items[1].category.is_none());
    }

    #[test]
    fn test_record_type_overrides_default() {
        let json = r#"[{"title": "x", "content_type": "news", "source_module": "manual"}]"#;
        let items = parse_import(json, ContentType::Quote).unwrap();
        assert_eq!(items[0].content_type, ContentType::News);
        assert_eq!(items[0].source_module, "manual");
    }

    #[test]
    fn test_blank_title_rejected() {
        let json = r#"[{"title": "ok"}, {"title": "   "}]"#;
        let err = parse_import(json, ContentType::Quote).unwrap_err();
        assert!(err.to_string().contains("record 1"));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let json = r#"[{"title": "ok", "posted": true}]"#;
        assert!(matches!(
            parse_import(json, ContentType::Quote),
            Err(Error::Json(_))
        ));
    }
}
