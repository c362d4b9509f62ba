//! Key normalization and per-field coercion for model-produced JSON.
//!
//! A field whose value has the wrong shape is treated as absent; the record as
//! a whole stays valid.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

static LEADING_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(\d+(?:[.,]\d+)?)").expect("valid regex"));

/// Values models emit instead of leaving a field empty.
const PLACEHOLDERS: &[&str] = &[
    "null",
    "none",
    "n/a",
    "na",
    "unknown",
    "not specified",
    "not provided",
    "not mentioned",
    "-",
];

/// Keys tried, in order, when a list item is an object rather than a string.
const ITEM_NAME_KEYS: &[&str] = &["name", "title", "value", "skill", "language", "company"];

/// `firstName`, `First Name`, `first-name` → `first_name`.
pub fn normalize_key(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 4);
    let mut prev_lower_or_digit = false;

    for c in raw.trim().chars() {
        if c.is_uppercase() {
            if prev_lower_or_digit {
                out.push('_');
            }
            out.extend(c.to_lowercase());
            prev_lower_or_digit = false;
        } else if c.is_alphanumeric() {
            out.push(c);
            prev_lower_or_digit = true;
        } else {
            if !out.ends_with('_') {
                out.push('_');
            }
            prev_lower_or_digit = false;
        }
    }

    out.trim_matches('_').to_string()
}

/// A JSON object with canonical keys, read through typed accessors.
#[derive(Debug, Default)]
pub struct FieldMap {
    fields: HashMap<String, Value>,
}

impl FieldMap {
    /// Normalizes every key, then maps it through `aliases` (alias → canonical).
    /// When several keys land on the same canonical name, the first non-null value wins.
    pub fn from_object(object: Map<String, Value>, aliases: &[(&str, &str)]) -> Self {
        let mut fields: HashMap<String, Value> = HashMap::new();

        for (key, value) in object {
            let normalized = normalize_key(&key);
            let canonical = aliases
                .iter()
                .find(|(alias, _)| *alias == normalized)
                .map(|(_, canonical)| canonical.to_string())
                .unwrap_or(normalized);

            match fields.get(&canonical) {
                Some(existing) if !existing.is_null() => {}
                _ => {
                    fields.insert(canonical, value);
                }
            }
        }

        Self { fields }
    }

    /// String field. Numbers are stringified; for an array the first usable item is taken.
    pub fn string(&self, key: &str) -> Option<String> {
        match self.fields.get(key)? {
            Value::Array(items) => items.iter().find_map(scalar_string),
            other => scalar_string(other),
        }
    }

    /// List of strings. Accepts an array (strings, numbers, or objects with a
    /// name-like key) or one comma/semicolon/newline separated string.
    /// Duplicates are dropped case-insensitively, order preserved.
    pub fn string_list(&self, key: &str) -> Vec<String> {
        let items: Vec<String> = match self.fields.get(key) {
            Some(Value::Array(items)) => items.iter().filter_map(list_item).collect(),
            Some(Value::String(s)) => s.split([',', ';', '\n']).filter_map(clean).collect(),
            _ => Vec::new(),
        };
        dedup_case_insensitive(items)
    }

    /// Non-negative finite number. Accepts strings with a leading number ("5+ years").
    pub fn number(&self, key: &str) -> Option<f64> {
        let n = match self.fields.get(key)? {
            Value::Number(n) => n.as_f64()?,
            Value::String(s) => LEADING_NUMBER
                .captures(s)?
                .get(1)?
                .as_str()
                .replace(',', ".")
                .parse()
                .ok()?,
            _ => return None,
        };
        (n.is_finite() && n >= 0.0).then_some(n)
    }

    /// Array items that are objects, each as its own `FieldMap`. String items are
    /// passed to `from_string` so callers can decide which field they populate.
    pub fn records(
        &self,
        key: &str,
        aliases: &[(&str, &str)],
        from_string: impl Fn(String) -> Option<(String, Value)>,
    ) -> Vec<FieldMap> {
        let items = match self.fields.get(key) {
            Some(Value::Array(items)) => items.clone(),
            Some(obj @ Value::Object(_)) => vec![obj.clone()],
            _ => return Vec::new(),
        };

        items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(map) => Some(FieldMap::from_object(map, aliases)),
                Value::String(s) => {
                    let (k, v) = from_string(clean(&s)?)?;
                    let mut fields = HashMap::new();
                    fields.insert(k, v);
                    Some(FieldMap { fields })
                }
                _ => None,
            })
            .collect()
    }
}

/// Trims and rejects empty strings and placeholders.
pub fn clean(s: &str) -> Option<String> {
    let trimmed = s.trim().trim_matches('"').trim();
    if trimmed.is_empty() || PLACEHOLDERS.contains(&trimmed.to_lowercase().as_str()) {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => clean(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn list_item(value: &Value) -> Option<String> {
    match value {
        Value::Object(map) => ITEM_NAME_KEYS
            .iter()
            .find_map(|k| map.get(*k).and_then(scalar_string)),
        other => scalar_string(other),
    }
}

fn dedup_case_insensitive(items: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.to_lowercase()))
        .collect()
}
