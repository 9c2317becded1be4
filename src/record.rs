//! Records are rows of named fields. Values are kept as JSON values so nested
//! fields (a continent object, a list of languages) survive loading.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: Map<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(|k| k.as_str())
    }

    /// Looks up a field by name. Names containing dots that are not present
    /// verbatim are resolved as a path into nested objects.
    pub fn get(&self, name: &str) -> Option<&Value> {
        if let Some(value) = self.fields.get(name) {
            return Some(value);
        }
        if !name.contains('.') {
            return None;
        }
        let mut parts = name.split('.');
        let mut current = self.fields.get(parts.next()?)?;
        for part in parts {
            current = current.as_object()?.get(part)?;
        }
        Some(current)
    }

    /// Field value as text. Missing fields read as empty text.
    pub fn text(&self, name: &str) -> String {
        self.get(name).map(value_text).unwrap_or_default()
    }

    pub fn from_object(object: Map<String, Value>) -> Self {
        Self { fields: object }
    }
}

impl From<Map<String, Value>> for Record {
    fn from(object: Map<String, Value>) -> Self {
        Record::from_object(object)
    }
}

pub fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items
            .iter()
            .map(value_text)
            .filter(|s| !s.is_empty())
            .collect::<Vec<String>>()
            .join(", "),
        Value::Object(object) => object
            .values()
            .map(value_text)
            .filter(|s| !s.is_empty())
            .collect::<Vec<String>>()
            .join(" "),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn germany() -> Record {
        serde_json::from_value(json!({
            "name": "Germany",
            "code": "DE",
            "emoji": "🇩🇪",
            "currency": "EUR",
            "continent": { "name": "Europe" },
            "languages": [ { "code": "de", "name": "German" } ],
            "population": 83,
            "capital": null
        }))
        .unwrap()
    }

    #[test]
    fn reads_plain_fields() {
        let r = germany();
        assert_eq!(r.text("name"), "Germany");
        assert_eq!(r.text("population"), "83");
    }

    #[test]
    fn missing_and_null_fields_are_empty() {
        let r = germany();
        assert_eq!(r.text("capital"), "");
        assert_eq!(r.text("nope"), "");
        assert_eq!(r.text("continent.nope"), "");
        assert_eq!(r.text("name.deeper"), "");
    }

    #[test]
    fn resolves_nested_paths() {
        let r = germany();
        assert_eq!(r.text("continent.name"), "Europe");
        assert_eq!(r.text("continent"), "Europe");
    }

    #[test]
    fn lists_are_joined() {
        let r = germany().with(
            "languages",
            json!([{ "code": "de", "name": "German" }, { "code": "fr", "name": "French" }]),
        );
        assert_eq!(r.text("languages"), "de German, fr French");
    }

    #[test]
    fn dotted_names_prefer_verbatim_fields() {
        let r = Record::new()
            .with("continent.name", "flat")
            .with("continent", json!({ "name": "nested" }));
        assert_eq!(r.text("continent.name"), "flat");
    }

    #[test]
    fn field_order_is_kept() {
        let r = germany();
        let names: Vec<&str> = r.field_names().collect();
        assert_eq!(names[0], "name");
        assert_eq!(names[1], "code");
    }
}
