use serde_json::Value;

use crate::core::Entity;

/// Query parameters for one upstream call, in insertion order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params(Vec<(String, String)>);

impl Params {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn with(mut self, key: &str, value: impl ToString) -> Self {
        self.set(key, value);
        self
    }

    /// Replace `key` if present, append otherwise.
    pub fn set(&mut self, key: &str, value: impl ToString) {
        let value = value.to_string();
        match self.0.iter_mut().find(|(k, _)| k == key) {
            Some(slot) => slot.1 = value,
            None => self.0.push((key.to_string(), value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    pub fn as_pairs(&self) -> &[(String, String)] {
        &self.0
    }
}

/// One upstream response page: `{ data: [...], pagination?: { has_next } }`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawResourcePage {
    pub items: Vec<Entity>,
    pub has_next: Option<bool>,
}

impl RawResourcePage {
    /// Tolerant decode: absent, null or non-array `data` yields no items.
    pub fn from_value(mut body: Value) -> Self {
        let has_next = body
            .get("pagination")
            .and_then(|p| p.get("has_next"))
            .and_then(Value::as_bool);

        let items = match body.get_mut("data").map(Value::take) {
            Some(Value::Array(values)) => values
                .into_iter()
                .filter_map(|value| match value {
                    Value::Object(map) => Some(map),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        };

        Self { items, has_next }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn first(&self) -> Option<&Entity> {
        self.items.first()
    }

    pub fn into_first(self) -> Option<Entity> {
        self.items.into_iter().next()
    }
}
