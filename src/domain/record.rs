use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const PREPARED_FIELD: &str = "prepared";
pub const CONTENT_FIELD: &str = "content";
pub const PREDICTION_FIELD: &str = "prediction";
pub const TEXT_FIELD: &str = "text";

/// One unit of work: the dataset fields plus whatever the runner derived so far.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: Map<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_text(text: impl Into<String>) -> Self {
        let mut record = Self::new();
        record.insert(TEXT_FIELD, Value::String(text.into()));
        record
    }

    pub fn from_map(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.fields.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }

    pub fn prepared(&self) -> Option<&Value> {
        self.get(PREPARED_FIELD).filter(|value| !value.is_null())
    }

    pub fn prepared_text(&self) -> Option<&str> {
        self.prepared().and_then(Value::as_str)
    }

    pub fn prepared_turns(&self) -> Option<Vec<&str>> {
        self.prepared()?
            .as_array()?
            .iter()
            .map(Value::as_str)
            .collect()
    }

    pub fn set_prepared(&mut self, prepared: Value) {
        self.insert(PREPARED_FIELD, prepared);
    }

    pub fn content(&self) -> Option<&Value> {
        self.get(CONTENT_FIELD)
    }

    pub fn prediction(&self) -> Option<&Value> {
        self.get(PREDICTION_FIELD).filter(|value| !value.is_null())
    }

    pub fn is_complete(&self) -> bool {
        self.prediction().is_some()
    }

    pub fn set_result(&mut self, content: Value, prediction: Value) {
        self.insert(CONTENT_FIELD, content);
        self.insert(PREDICTION_FIELD, prediction);
    }
}

impl From<Map<String, Value>> for Record {
    fn from(fields: Map<String, Value>) -> Self {
        Self::from_map(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn null_prediction_is_not_complete() {
        let record = Record::from_text("hi").with_field(PREDICTION_FIELD, Value::Null);
        assert!(!record.is_complete());
        assert!(record.clone().with_field(PREDICTION_FIELD, "x").is_complete());
    }

    #[test]
    fn prepared_turns_require_all_strings() {
        let record = Record::new().with_field(PREPARED_FIELD, json!(["a", "b"]));
        assert_eq!(record.prepared_turns(), Some(vec!["a", "b"]));
        assert_eq!(record.prepared_text(), None);

        let mixed = Record::new().with_field(PREPARED_FIELD, json!(["a", 1]));
        assert_eq!(mixed.prepared_turns(), None);
    }

    #[test]
    fn serializes_as_a_flat_object_in_insertion_order() {
        let record = Record::new()
            .with_field("zeta", "z")
            .with_field("alpha", 1)
            .with_field(PREPARED_FIELD, "prompt");
        let text = serde_json::to_string(&record).unwrap();
        assert_eq!(text, r#"{"zeta":"z","alpha":1,"prepared":"prompt"}"#);
    }
}
