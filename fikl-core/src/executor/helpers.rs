//! Value helpers shared by the local engine, the in-memory store and the
//! mutation path:
//! - get_field: dotted path lookup
//! - values_equal / compare_values / compare_same_type: comparisons
//! - flatten: dotted-key view of a document
//! - like_regex: `%` wildcard patterns
//! - expand_key / deep_merge: setter expansion for writes

use std::cmp::Ordering;

use regex::Regex;
use serde_json::{Map, Value};

/// Look up a dot-separated path. `None` when any segment is missing.
#[inline]
pub fn get_field<'a>(value: &'a Value, field_path: &str) -> Option<&'a Value> {
    let mut current = value;

    for part in field_path.split('.') {
        current = current.get(part)?;
    }

    Some(current)
}

/// Same as [`get_field`] but starting from a field map.
#[inline]
pub fn get_in_map<'a>(map: &'a Map<String, Value>, field_path: &str) -> Option<&'a Value> {
    let (head, rest) = match field_path.split_once('.') {
        Some((head, rest)) => (head, Some(rest)),
        None => (field_path, None),
    };
    let value = map.get(head)?;
    match rest {
        Some(rest) => get_field(value, rest),
        None => Some(value),
    }
}

/// Numbers compare by their f64 value, everything else structurally.
#[inline]
pub fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| values_equal(x, y))
        }
        _ => left == right,
    }
}

/// Whether `needle` is an element of `haystack`.
pub fn array_contains(haystack: &[Value], needle: &Value) -> bool {
    haystack.iter().any(|item| values_equal(item, needle))
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Total order over JSON values.
///
/// Null < Bool < Number < String < Array < Object
#[inline]
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (Value::Number(a), Value::Number(b)) => {
            let a_f64 = a.as_f64().unwrap_or(0.0);
            let b_f64 = b.as_f64().unwrap_or(0.0);
            a_f64.partial_cmp(&b_f64).unwrap_or(Ordering::Equal)
        }
        (Value::String(a), Value::String(b)) => a.cmp(b),
        (Value::Array(a), Value::Array(b)) => a
            .iter()
            .zip(b)
            .map(|(x, y)| compare_values(x, y))
            .find(|o| o.is_ne())
            .unwrap_or_else(|| a.len().cmp(&b.len())),
        (Value::Object(a), Value::Object(b)) => a.len().cmp(&b.len()),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

/// Ordering for range operators: only numbers, strings and booleans of the
/// same type compare.
pub fn compare_same_type(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(_), Value::Number(_))
        | (Value::String(_), Value::String(_))
        | (Value::Bool(_), Value::Bool(_)) => Some(compare_values(a, b)),
        _ => None,
    }
}

/// Flatten nested objects into dotted keys. Arrays and empty objects are
/// kept as values.
pub fn flatten(map: &Map<String, Value>) -> Map<String, Value> {
    let mut flat = Map::new();
    flatten_into(&mut flat, "", map);
    flat
}

fn flatten_into(flat: &mut Map<String, Value>, prefix: &str, map: &Map<String, Value>) {
    for (key, value) in map {
        let full_key = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };
        match value {
            Value::Object(inner) if !inner.is_empty() => flatten_into(flat, &full_key, inner),
            _ => {
                flat.insert(full_key, value.clone());
            }
        }
    }
}

/// Longest `like` pattern accepted, counted before escaping.
pub const MAX_LIKE_PATTERN: usize = 1000;

/// Translate a `like` pattern: `%` matches any run of characters, everything
/// else is literal, anchored at both ends.
pub fn like_regex(pattern: &str) -> Result<Regex, regex::Error> {
    if pattern.chars().count() > MAX_LIKE_PATTERN {
        return Err(regex::Error::Syntax(format!(
            "pattern too long (max {} chars)",
            MAX_LIKE_PATTERN
        )));
    }

    let mut regex_pattern = String::from("^");
    for (i, part) in pattern.split('%').enumerate() {
        if i > 0 {
            regex_pattern.push_str(".*?");
        }
        regex_pattern.push_str(&regex::escape(part));
    }
    regex_pattern.push('$');
    Regex::new(&regex_pattern)
}

/// Build a fresh nested map holding `value` at the dotted `key`.
pub fn expand_key(key: &str, value: Value) -> Map<String, Value> {
    let mut parts = key.rsplit('.');
    let mut current = value;
    let mut leaf = parts.next().unwrap_or(key).to_string();

    for part in parts {
        let mut wrapper = Map::new();
        wrapper.insert(leaf, current);
        current = Value::Object(wrapper);
        leaf = part.to_string();
    }

    let mut root = Map::new();
    root.insert(leaf, current);
    root
}

/// Merge `patch` into `target`: maps merge recursively on shared keys, any
/// other value replaces what was there.
pub fn deep_merge(target: &mut Map<String, Value>, patch: Map<String, Value>) {
    for (key, value) in patch {
        match value {
            Value::Object(incoming) => {
                if let Some(Value::Object(existing)) = target.get_mut(&key) {
                    deep_merge(existing, incoming);
                } else {
                    target.insert(key, Value::Object(incoming));
                }
            }
            value => {
                target.insert(key, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_get_field() {
        let doc = json!({"name": "Alice", "address": {"city": "NYC"}, "n": null});
        assert_eq!(get_field(&doc, "name"), Some(&json!("Alice")));
        assert_eq!(get_field(&doc, "address.city"), Some(&json!("NYC")));
        assert_eq!(get_field(&doc, "n"), Some(&Value::Null));
        assert_eq!(get_field(&doc, "missing"), None);
        assert_eq!(get_field(&doc, "name.first"), None);
        assert_eq!(
            get_in_map(&map(doc.clone()), "address.city"),
            Some(&json!("NYC"))
        );
    }

    #[test]
    fn test_values_equal() {
        assert!(values_equal(&json!(1), &json!(1)));
        assert!(values_equal(&json!(1.0), &json!(1)));
        assert!(values_equal(&json!([1, 2.0]), &json!([1.0, 2])));
        assert!(!values_equal(&json!(1), &json!("1")));
    }

    #[test]
    fn test_compare_values_cross_type() {
        let ordered = [
            json!(null),
            json!(false),
            json!(true),
            json!(-1),
            json!(2.5),
            json!("a"),
            json!([1]),
            json!({"a": 1}),
        ];
        for pair in ordered.windows(2) {
            assert_eq!(
                compare_values(&pair[0], &pair[1]),
                Ordering::Less,
                "{} < {}",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn test_compare_same_type() {
        assert_eq!(
            compare_same_type(&json!(2), &json!(1.5)),
            Some(Ordering::Greater)
        );
        assert_eq!(compare_same_type(&json!("10"), &json!(9)), None);
        assert_eq!(compare_same_type(&json!(null), &json!(null)), None);
    }

    #[test]
    fn test_flatten() {
        let flat = flatten(&map(json!({
            "a": {"b": 1, "c": {"d": [1, 2]}},
            "e": "x",
            "empty": {}
        })));
        assert_eq!(
            Value::Object(flat),
            json!({"a.b": 1, "a.c.d": [1, 2], "e": "x", "empty": {}})
        );
    }

    #[test]
    fn test_like_regex() {
        let re = like_regex("A%").unwrap();
        assert!(re.is_match("Alice"));
        assert!(re.is_match("A"));
        assert!(!re.is_match("bA"));

        let re = like_regex("%.com").unwrap();
        assert!(re.is_match("a@b.com"));
        assert!(!re.is_match("a@bxcom"));

        let re = like_regex("a(b)").unwrap();
        assert!(re.is_match("a(b)"));
    }

    #[test]
    fn test_like_regex_length_counts_raw_pattern() {
        // Escaping doubles every '.', the cap applies before that
        let dots = ".".repeat(600);
        assert!(like_regex(&dots).unwrap().is_match(&dots));

        let long = "a".repeat(MAX_LIKE_PATTERN + 1);
        assert!(like_regex(&long).is_err());
    }

    #[test]
    fn test_expand_key() {
        assert_eq!(
            Value::Object(expand_key("a.b.c", json!(1))),
            json!({"a": {"b": {"c": 1}}})
        );
        assert_eq!(Value::Object(expand_key("x", json!("v"))), json!({"x": "v"}));
    }

    #[test]
    fn test_deep_merge() {
        let mut target = map(json!({"a": {"b": 1, "keep": true}, "s": 1}));
        deep_merge(&mut target, map(json!({"a": {"c": 2}, "s": {"now": "map"}})));
        assert_eq!(
            Value::Object(target),
            json!({"a": {"b": 1, "keep": true, "c": 2}, "s": {"now": "map"}})
        );

        let mut target = map(json!({"a": {"b": 1}}));
        deep_merge(&mut target, map(json!({"a": 5})));
        assert_eq!(Value::Object(target), json!({"a": 5}));
    }
}
