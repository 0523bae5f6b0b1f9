//! Deserializers for values written by form-driven admin screens.
//!
//! Option and meta values are persisted by a forms layer that stores numbers
//! as text, checkboxes as `"1"`/`""`, and empty repeaters as `""` or `null`
//! instead of an empty list. These helpers accept those shapes and normalize
//! them into the typed model.

use serde::de::{DeserializeOwned, Deserializer};
use serde::Deserialize;
use serde_json::Value;

/// A list that may have been stored as `""`, `null`, `false` or a single scalar.
pub fn list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        Value::Object(map) => map
            .into_iter()
            .filter_map(|(_, item)| serde_json::from_value(item).ok())
            .collect(),
        Value::String(ref s) if s.is_empty() => Vec::new(),
        Value::Null | Value::Bool(false) => Vec::new(),
        scalar => serde_json::from_value(scalar).into_iter().collect(),
    })
}

/// An unsigned integer that may be stored as text. Mirrors `absint`.
pub fn uint<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(absint(&value))
}

/// A checkbox flag: `true`, non-zero numbers and non-empty strings are set.
pub fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Bool(b) => b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty() && s != "0",
        Value::Null => false,
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    })
}

/// A string that is treated as absent when empty.
pub fn opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) if !s.trim().is_empty() => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// A string that may be stored as a number or be missing.
pub fn string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(opt_string(deserializer)?.unwrap_or_default())
}

pub(crate) fn absint(value: &Value) -> u32 {
    match value {
        Value::Number(n) => n
            .as_i64()
            .map(|n| n.unsigned_abs())
            .or_else(|| n.as_f64().map(|f| f.abs() as u64))
            .map(|n| u32::try_from(n).unwrap_or(u32::MAX))
            .unwrap_or(0),
        Value::String(s) => {
            let trimmed = s.trim();
            let digits: String = trimmed
                .trim_start_matches(['-', '+'])
                .chars()
                .take_while(|c| c.is_ascii_digit())
                .collect();
            if digits.is_empty() {
                0
            } else {
                digits.parse().unwrap_or(u32::MAX)
            }
        }
        Value::Bool(true) => 1,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Deserialize)]
    struct Form {
        #[serde(default, deserialize_with = "list")]
        items: Vec<String>,
        #[serde(default, deserialize_with = "uint")]
        width: u32,
        #[serde(default, deserialize_with = "flag")]
        checked: bool,
    }

    #[test]
    fn empty_string_is_an_empty_list() {
        let form: Form = serde_json::from_value(json!({ "items": "" })).unwrap();
        assert!(form.items.is_empty());
    }

    #[test]
    fn scalar_becomes_single_item_list() {
        let form: Form = serde_json::from_value(json!({ "items": "search" })).unwrap();
        assert_eq!(form.items, vec!["search"]);
    }

    #[test]
    fn numbers_stored_as_text() {
        let form: Form = serde_json::from_value(json!({ "width": "728" })).unwrap();
        assert_eq!(form.width, 728);
        let form: Form = serde_json::from_value(json!({ "width": "12px" })).unwrap();
        assert_eq!(form.width, 12);
        let form: Form = serde_json::from_value(json!({ "width": -90 })).unwrap();
        assert_eq!(form.width, 90);
    }

    #[test]
    fn oversized_numbers_saturate() {
        let form: Form = serde_json::from_value(json!({ "width": "99999999999" })).unwrap();
        assert_eq!(form.width, u32::MAX);
        let form: Form = serde_json::from_value(json!({ "width": "px" })).unwrap();
        assert_eq!(form.width, 0);
    }

    #[test]
    fn checkbox_values() {
        for (raw, expected) in [
            (json!("1"), true),
            (json!(""), false),
            (json!("0"), false),
            (json!(true), true),
            (json!(0), false),
        ] {
            let form: Form = serde_json::from_value(json!({ "checked": raw })).unwrap();
            assert_eq!(form.checked, expected);
        }
    }
}
