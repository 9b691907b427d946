//! Type-checked reads over untrusted JSON objects. Every accessor tolerates a
//! missing object, a missing key, or a value of the wrong type.

use serde_json::{Map, Value};

pub(crate) type Obj<'a> = Option<&'a Map<String, Value>>;

pub(crate) fn object(value: &Value) -> Obj<'_> {
    value.as_object()
}

pub(crate) fn str_field<'a>(obj: Obj<'a>, key: &str) -> Option<&'a str> {
    obj?.get(key)?.as_str()
}

/// Non-empty string under `key`, otherwise the fallback.
pub(crate) fn id_or(obj: Obj<'_>, key: &str, fallback: impl FnOnce() -> String) -> String {
    match str_field(obj, key) {
        Some(s) if !s.trim().is_empty() => s.to_string(),
        _ => fallback(),
    }
}

/// Any string under `key` (even empty), otherwise the fallback.
pub(crate) fn string_or(obj: Obj<'_>, key: &str, fallback: impl FnOnce() -> String) -> String {
    str_field(obj, key).map(str::to_string).unwrap_or_else(fallback)
}

/// First key that holds a string.
pub(crate) fn first_str<'a>(obj: Obj<'a>, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|k| str_field(obj, k))
}

pub(crate) fn bool_or(obj: Obj<'_>, key: &str, fallback: bool) -> bool {
    obj.and_then(|o| o.get(key))
        .and_then(Value::as_bool)
        .unwrap_or(fallback)
}

pub(crate) fn finite_number(obj: Obj<'_>, key: &str) -> Option<f64> {
    obj?.get(key)?.as_f64().filter(|n| n.is_finite())
}

pub(crate) fn array<'a>(obj: Obj<'a>, key: &str) -> &'a [Value] {
    obj.and_then(|o| o.get(key))
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// String entries of an array; non-strings are skipped.
pub(crate) fn string_list(obj: Obj<'_>, key: &str) -> Vec<String> {
    array(obj, key)
        .iter()
        .filter_map(Value::as_str)
        .map(str::to_string)
        .collect()
}

/// Everything except the keys the caller models explicitly.
pub(crate) fn extras(obj: Obj<'_>, known: &[&str]) -> Map<String, Value> {
    let Some(obj) = obj else {
        return Map::new();
    };
    obj.iter()
        .filter(|(k, _)| !known.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}
