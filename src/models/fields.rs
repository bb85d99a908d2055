//! Loosely typed field mappings produced by the page parsers.

use serde_json::{Map, Value};

use crate::error::{AppError, Result};

/// One parsed row: known keys (`id`, `name`, `permit`, `event_date`, ...)
/// mapped to JSON values. Absent non-required keys are normal.
pub type Fields = Map<String, Value>;

/// Typed accessors over [`Fields`].
pub trait FieldsExt {
    /// Trimmed, non-empty text for `key`. Numbers are rendered as text.
    fn text(&self, key: &str) -> Option<String>;

    /// Like [`FieldsExt::text`] but missing values are a record error.
    fn require(&self, record: &'static str, key: &str) -> Result<String>;

    /// Insert `value` under `key` when it is non-empty after trimming.
    fn put_text(&mut self, key: &str, value: impl AsRef<str>);
}

impl FieldsExt for Fields {
    fn text(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            Value::String(s) => {
                let s = s.trim();
                (!s.is_empty()).then(|| s.to_string())
            }
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    fn require(&self, record: &'static str, key: &str) -> Result<String> {
        self.text(key)
            .ok_or_else(|| AppError::missing_field(record, key))
    }

    fn put_text(&mut self, key: &str, value: impl AsRef<str>) {
        let value = value.as_ref().trim();
        if !value.is_empty() {
            self.insert(key.to_string(), Value::String(value.to_string()));
        }
    }
}
