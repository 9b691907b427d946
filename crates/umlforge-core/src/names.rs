//! Canonical data types, visibilities and identifier casing.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::{DataType, Visibility};

/// Map a free-text type name to a canonical type. Unknown names pass through.
pub fn canonical_type(raw: &str) -> DataType {
    let trimmed = raw.trim();
    match trimmed.to_lowercase().as_str() {
        "" | "str" | "string" | "text" => DataType::String,
        "int" | "integer" | "number" => DataType::Integer,
        "long" => DataType::Long,
        "float" | "double" => DataType::Double,
        "bool" | "boolean" => DataType::Boolean,
        "date" => DataType::Date,
        "datetime" | "timestamp" => DataType::DateTime,
        _ => DataType::Other(trimmed.to_string()),
    }
}

/// Map a visibility keyword or UML sigil. Unknown or absent means private.
pub fn canonical_visibility(raw: Option<&str>) -> Visibility {
    match raw.map(|r| r.trim().to_lowercase()).as_deref() {
        Some("public" | "+") => Visibility::Public,
        Some("protected" | "#") => Visibility::Protected,
        Some("package" | "~") => Visibility::Package,
        _ => Visibility::Private,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Case {
    /// `OrdenCompra`
    Pascal,
    /// `orden_compra`
    Snake,
}

/// Decompose accented letters and drop the combining marks (`á` → `a`, `Ñ` → `N`).
pub fn strip_diacritics(s: &str) -> String {
    s.nfd().filter(|c| !is_combining_mark(*c)).collect()
}

/// Split a name into words: `_`, `-` and whitespace separate, and every
/// upper-case letter starts a new word. Characters outside `[A-Za-z0-9]` are dropped.
fn split_words(name: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();

    for c in strip_diacritics(name).chars() {
        if c == '_' || c == '-' || c.is_whitespace() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
        } else if c.is_ascii_alphanumeric() {
            if c.is_ascii_uppercase() && !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            current.push(c);
        }
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + &chars.as_str().to_ascii_lowercase(),
        None => String::new(),
    }
}

pub fn to_identifier_case(name: &str, case: Case) -> String {
    let words = split_words(name);
    match case {
        Case::Pascal => words.iter().map(|w| capitalize(w)).collect(),
        Case::Snake => words
            .iter()
            .map(|w| w.to_ascii_lowercase())
            .collect::<Vec<_>>()
            .join("_"),
    }
}

pub fn to_pascal_case(name: &str) -> String {
    to_identifier_case(name, Case::Pascal)
}

pub fn to_snake_case(name: &str) -> String {
    to_identifier_case(name, Case::Snake)
}

/// Lower-camel field identifier: accents stripped, anything outside
/// `[A-Za-z0-9_]` removed, leading non-letters removed, first letter lowered.
/// Falls back to `field` when no letter survives.
pub fn sanitize_field_name(name: &str) -> String {
    let cleaned: String = strip_diacritics(name)
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    let trimmed = cleaned.trim_start_matches(|c: char| !c.is_ascii_alphabetic());

    let mut chars = trimmed.chars();
    match chars.next() {
        Some(first) => first.to_ascii_lowercase().to_string() + chars.as_str(),
        None => "field".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_synonyms() {
        assert_eq!(canonical_type("str"), DataType::String);
        assert_eq!(canonical_type("NUMBER"), DataType::Integer);
        assert_eq!(canonical_type("float"), DataType::Double);
        assert_eq!(canonical_type("Timestamp"), DataType::DateTime);
        assert_eq!(canonical_type("bool"), DataType::Boolean);
        assert_eq!(canonical_type(""), DataType::String);
        assert_eq!(canonical_type("BigDecimal"), DataType::Other("BigDecimal".into()));
    }

    #[test]
    fn canonical_type_is_stable_on_its_own_output() {
        for raw in ["int", "long", "double", "date", "datetime", "UUID", "text"] {
            let once = canonical_type(raw);
            assert_eq!(canonical_type(once.as_str()), once);
        }
    }

    #[test]
    fn visibility_defaults_to_private() {
        assert_eq!(canonical_visibility(Some("PUBLIC")), Visibility::Public);
        assert_eq!(canonical_visibility(Some("#")), Visibility::Protected);
        assert_eq!(canonical_visibility(Some("~")), Visibility::Package);
        assert_eq!(canonical_visibility(Some("internal")), Visibility::Private);
        assert_eq!(canonical_visibility(None), Visibility::Private);
    }

    #[test]
    fn casing_strips_accents_and_separators() {
        assert_eq!(to_pascal_case("orden de compra"), "OrdenDeCompra");
        assert_eq!(to_pascal_case("Dirección"), "Direccion");
        assert_eq!(to_pascal_case("año_fiscal"), "AnoFiscal");
        assert_eq!(to_snake_case("OrdenDeCompra"), "orden_de_compra");
        assert_eq!(to_snake_case("Categoría-Producto"), "categoria_producto");
        assert_eq!(to_snake_case("Niño"), "nino");
        assert_eq!(to_pascal_case("a.b!c"), "Abc");
    }

    #[test]
    fn casing_is_idempotent() {
        for name in ["OrdenDeCompra", "orden_de_compra", "HTTPServer", "línea 2"] {
            let pascal = to_pascal_case(name);
            assert_eq!(to_pascal_case(&pascal), pascal);
            let snake = to_snake_case(name);
            assert_eq!(to_snake_case(&snake), snake);
        }
    }

    #[test]
    fn field_names() {
        assert_eq!(sanitize_field_name("número"), "numero");
        assert_eq!(sanitize_field_name("Fecha Nacimiento"), "fechaNacimiento");
        assert_eq!(sanitize_field_name("2do_apellido"), "do_apellido");
        assert_eq!(sanitize_field_name("_id"), "id");
        assert_eq!(sanitize_field_name("123"), "field");
        assert_eq!(sanitize_field_name("ñandú"), "nandu");
    }

    mod laws {
        use super::super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn pascal_snake_round_trip(s in "[A-Za-z0-9_]{0,24}") {
                let pascal = to_pascal_case(&s);
                prop_assert_eq!(to_pascal_case(&to_snake_case(&pascal)), pascal);
            }

            #[test]
            fn casing_idempotent_on_any_text(s in "\\PC{0,24}") {
                let pascal = to_pascal_case(&s);
                prop_assert_eq!(to_pascal_case(&pascal), pascal.clone());
                let snake = to_snake_case(&s);
                prop_assert_eq!(to_snake_case(&snake), snake);
            }

            #[test]
            fn field_name_is_lower_camel_identifier(s in "\\PC{0,24}") {
                let field = sanitize_field_name(&s);
                let first = field.chars().next();
                prop_assert!(first.is_some_and(|c| c.is_ascii_lowercase()));
                prop_assert!(field.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'));
            }
        }
    }
}
