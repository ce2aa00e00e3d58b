use serde_json::Value;

use crate::core::fields;
use crate::core::Entity;

/// Index-0 view of a resource for snapshot queries. Every accessor yields its
/// documented default when the record is missing.
#[derive(Debug, Clone, Copy)]
pub struct Snapshot<'a> {
    record: Option<&'a Entity>,
}

impl<'a> Snapshot<'a> {
    pub fn new(record: Option<&'a Entity>) -> Self {
        Self { record }
    }

    pub fn record(&self) -> Option<&'a Entity> {
        self.record
    }

    pub fn is_available(&self) -> bool {
        self.record.is_some()
    }

    pub fn number(&self, key: &str) -> f64 {
        fields::number_or_zero(self.record, key)
    }

    pub fn integer(&self, key: &str) -> i64 {
        fields::integer_or_zero(self.record, key)
    }

    pub fn flag(&self, key: &str) -> bool {
        fields::flag(self.record, key)
    }

    /// Two-decimal string or "Not Available".
    pub fn fixed2(&self, key: &str) -> String {
        fields::fixed2(self.record, key)
    }

    pub fn fixed2_or(&self, key: &str, fallback: &str) -> String {
        fields::fixed2_or(self.record, key, fallback)
    }

    pub fn display_or(&self, key: &str, fallback: &str) -> String {
        fields::display_or(self.record, key, fallback)
    }

    /// Empty strings count as absent.
    pub fn text_or(&self, key: &str, fallback: &str) -> String {
        fields::text(self.record, key)
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| fallback.to_string())
    }

    pub fn truthy_or_not_available(&self, key: &str) -> Value {
        fields::truthy_or_not_available(self.record, key)
    }

    pub fn array(&self, key: &str) -> Option<&'a Vec<Value>> {
        fields::array(self.record, key)
    }

    /// Positional read of a metric array; 0 when out of range.
    pub fn at(&self, key: &str, index: usize) -> f64 {
        fields::array_number(self.record, key, index)
    }

    /// A nested object field as its own snapshot.
    pub fn nested(&self, key: &str) -> Snapshot<'a> {
        Snapshot::new(self.record.and_then(|r| r.get(key)).and_then(Value::as_object))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fields::NOT_AVAILABLE;
    use serde_json::json;

    #[test]
    fn test_missing_record_yields_defaults() {
        let snapshot = Snapshot::new(None);
        assert!(!snapshot.is_available());
        assert_eq!(snapshot.number("volume"), 0.0);
        assert_eq!(snapshot.fixed2("price"), NOT_AVAILABLE);
        assert_eq!(snapshot.display_or("sales", "0"), "0");
        assert_eq!(snapshot.at("volume_trend", 3), 0.0);
        assert!(!snapshot.nested("reward").is_available());
    }

    #[test]
    fn test_nested_objects() {
        let record = json!({"nft_marketplace_reward": {"blur": 12.5}}).as_object().cloned().unwrap();
        let snapshot = Snapshot::new(Some(&record));
        assert_eq!(snapshot.nested("nft_marketplace_reward").number("blur"), 12.5);
        assert_eq!(snapshot.nested("nft_marketplace_reward").number("looks"), 0.0);
    }
}
