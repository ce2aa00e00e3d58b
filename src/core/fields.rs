/// Lenient field readers for upstream entities
///
/// The upstream API is inconsistent about numeric encoding: the same metric can
/// arrive as a JSON number, a numeric string, or be missing entirely. These
/// helpers centralize the coercions so flows never null-propagate.

use serde_json::Value;

use super::types::Entity;

/// Placeholder emitted for snapshot fields whose source record is missing.
pub const NOT_AVAILABLE: &str = "Not Available";

/// Parse a JSON value as a finite number. Numeric strings are accepted.
pub fn parse_number(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_matches('\'').parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|n| n.is_finite())
}

/// Present and not null.
pub fn is_present(entity: &Entity, key: &str) -> bool {
    entity.get(key).map(|v| !v.is_null()).unwrap_or(false)
}

pub fn number(entity: &Entity, key: &str) -> Option<f64> {
    entity.get(key).and_then(parse_number)
}

/// Integer reading that truncates toward zero.
pub fn integer(entity: &Entity, key: &str) -> Option<i64> {
    number(entity, key).map(|n| n.trunc() as i64)
}

/// Numeric field or 0 when the record or field is missing or unusable.
pub fn number_or_zero(entity: Option<&Entity>, key: &str) -> f64 {
    entity.and_then(|e| number(e, key)).unwrap_or(0.0)
}

pub fn integer_or_zero(entity: Option<&Entity>, key: &str) -> i64 {
    entity.and_then(|e| integer(e, key)).unwrap_or(0)
}

pub fn flag(entity: Option<&Entity>, key: &str) -> bool {
    entity
        .and_then(|e| e.get(key))
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

pub fn text(entity: Option<&Entity>, key: &str) -> Option<String> {
    match entity?.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Number rendered with two decimals, or `fallback`.
pub fn fixed2_or(entity: Option<&Entity>, key: &str, fallback: &str) -> String {
    entity
        .and_then(|e| number(e, key))
        .map(|n| format!("{:.2}", n))
        .unwrap_or_else(|| fallback.to_string())
}

pub fn fixed2(entity: Option<&Entity>, key: &str) -> String {
    fixed2_or(entity, key, NOT_AVAILABLE)
}

/// Field rendered as text, or `fallback`.
pub fn display_or(entity: Option<&Entity>, key: &str, fallback: &str) -> String {
    text(entity, key).unwrap_or_else(|| fallback.to_string())
}

/// Raw field value when it is truthy, otherwise the `NOT_AVAILABLE` marker.
pub fn truthy_or_not_available(entity: Option<&Entity>, key: &str) -> Value {
    match entity.and_then(|e| e.get(key)) {
        Some(value) if is_truthy(value) => value.clone(),
        _ => Value::String(NOT_AVAILABLE.to_string()),
    }
}

pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Element `index` of the numeric array stored under `key`; 0 when out of range.
pub fn array_number(entity: Option<&Entity>, key: &str, index: usize) -> f64 {
    entity
        .and_then(|e| e.get(key))
        .and_then(Value::as_array)
        .and_then(|values| values.get(index))
        .and_then(parse_number)
        .unwrap_or(0.0)
}

pub fn array<'a>(entity: Option<&'a Entity>, key: &str) -> Option<&'a Vec<Value>> {
    entity?.get(key)?.as_array()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entity(value: Value) -> Entity {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_number_accepts_numeric_strings() {
        let e = entity(json!({"a": 12.5, "b": "7", "c": "abc", "d": null, "e": "'3.5'"}));
        assert_eq!(number(&e, "a"), Some(12.5));
        assert_eq!(number(&e, "b"), Some(7.0));
        assert_eq!(number(&e, "c"), None);
        assert_eq!(number(&e, "d"), None);
        assert_eq!(number(&e, "e"), Some(3.5));
        assert_eq!(number(&e, "missing"), None);
    }

    #[test]
    fn test_integer_truncates() {
        let e = entity(json!({"traders": "12.9", "neg": -3.7}));
        assert_eq!(integer(&e, "traders"), Some(12));
        assert_eq!(integer(&e, "neg"), Some(-3));
    }

    #[test]
    fn test_snapshot_defaults() {
        assert_eq!(fixed2(None, "price"), NOT_AVAILABLE);
        assert_eq!(fixed2_or(None, "volume", "0"), "0");
        let e = entity(json!({"price": 3.14159, "sales": 42}));
        assert_eq!(fixed2(Some(&e), "price"), "3.14");
        assert_eq!(display_or(Some(&e), "sales", "0"), "42");
        assert_eq!(display_or(Some(&e), "transfers", "0"), "0");
    }

    #[test]
    fn test_truthy_or_not_available() {
        let e = entity(json!({"zero": 0, "text": "", "value": 1200.5, "obj": {"k": 1}}));
        assert_eq!(truthy_or_not_available(Some(&e), "zero"), json!(NOT_AVAILABLE));
        assert_eq!(truthy_or_not_available(Some(&e), "text"), json!(NOT_AVAILABLE));
        assert_eq!(truthy_or_not_available(Some(&e), "value"), json!(1200.5));
        assert_eq!(truthy_or_not_available(Some(&e), "obj"), json!({"k": 1}));
    }

    #[test]
    fn test_array_number_out_of_range_is_zero() {
        let e = entity(json!({"trend": [1, "2", null]}));
        assert_eq!(array_number(Some(&e), "trend", 0), 1.0);
        assert_eq!(array_number(Some(&e), "trend", 1), 2.0);
        assert_eq!(array_number(Some(&e), "trend", 2), 0.0);
        assert_eq!(array_number(Some(&e), "trend", 9), 0.0);
        assert_eq!(array_number(None, "trend", 0), 0.0);
    }
}
