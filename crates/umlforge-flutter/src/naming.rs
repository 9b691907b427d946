//! Dart identifiers, types and literals derived from diagram entities.

use std::collections::HashSet;

use umlforge_core::names::{sanitize_field_name, to_pascal_case, to_snake_case};
use umlforge_core::{Attribute, DataType, Diagram, Entity};

const DART_KEYWORDS: &[&str] = &[
    "abstract", "as", "assert", "async", "await", "base", "break", "case", "catch", "class",
    "const", "continue", "covariant", "default", "deferred", "do", "dynamic", "else", "enum",
    "export", "extends", "extension", "external", "factory", "false", "final", "finally", "for",
    "get", "hide", "if", "implements", "import", "in", "interface", "is", "late", "library",
    "mixin", "new", "null", "of", "on", "operator", "part", "required", "rethrow", "return",
    "sealed", "set", "show", "static", "super", "switch", "sync", "this", "throw", "true", "try",
    "typedef", "var", "void", "when", "while", "with", "yield",
    // members every generated model already has
    "hashCode", "runtimeType", "toString", "noSuchMethod", "toJson", "fromJson",
];

/// Class names the generated files already use from the Dart or Flutter SDK.
const TAKEN_CLASS_NAMES: &[&str] = &[
    "ApiConfig", "ApiService", "AppBar", "Card", "Center", "Colors", "Column", "DateTime",
    "Duration", "Exception", "Expanded", "Form", "Function", "Future", "GeneratedApp", "Icon",
    "Iterable", "List", "Map", "Navigator", "Object", "Padding", "Row", "Scaffold", "Set",
    "State", "Stream", "String", "Switch", "Text", "Theme", "Type", "Uri", "Widget",
];

const FALLBACK_CLASS_NAME: &str = "Entidad";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DartType {
    String,
    Int,
    Double,
    Bool,
    DateTime,
}

impl DartType {
    pub fn from_data_type(data_type: &DataType) -> Self {
        match data_type {
            DataType::String => DartType::String,
            DataType::Integer | DataType::Long => DartType::Int,
            DataType::Double => DartType::Double,
            DataType::Boolean => DartType::Bool,
            DataType::Date | DataType::DateTime => DartType::DateTime,
            DataType::Other(name) => match name.to_lowercase().as_str() {
                "float" | "number" | "bigdecimal" | "decimal" => DartType::Double,
                _ => DartType::String,
            },
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            DartType::String => "String",
            DartType::Int => "int",
            DartType::Double => "double",
            DartType::Bool => "bool",
            DartType::DateTime => "DateTime",
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, DartType::Int | DartType::Double)
    }
}

/// One model field. `wire` is the JSON key, `field` the Dart member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub wire: String,
    pub field: String,
    pub dart: DartType,
    /// Identifier fields are nullable and never edited in forms.
    pub is_id: bool,
}

#[derive(Debug, Clone)]
pub struct EntityPlan {
    pub class: String,
    pub snake: String,
    pub endpoint: String,
    /// Includes the synthesized `id` when the entity declares none.
    pub fields: Vec<Field>,
    /// Number of leading synthesized fields (0 or 1).
    pub synthesized: usize,
}

impl EntityPlan {
    /// Fields the user declared, in declaration order.
    pub fn declared(&self) -> &[Field] {
        &self.fields[self.synthesized..]
    }

    pub fn id_field(&self) -> &Field {
        self.fields
            .iter()
            .find(|f| f.is_id)
            .unwrap_or(&self.fields[0])
    }

    pub fn editable(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|f| !f.is_id)
    }

    /// `cliente` for messages such as "eliminar este cliente".
    pub fn lower_label(&self) -> String {
        self.class.to_lowercase()
    }
}

/// Name every entity of the diagram, keeping class and file names unique.
pub fn plan_entities(diagram: &Diagram) -> Vec<EntityPlan> {
    let mut classes: HashSet<String> = HashSet::new();
    diagram
        .entities
        .iter()
        .map(|entity| {
            let class = unique_with_suffix(&class_name(&entity.name), |c| classes.contains(c));
            classes.insert(class.clone());
            plan_entity(entity, class)
        })
        .collect()
}

fn plan_entity(entity: &Entity, class: String) -> EntityPlan {
    let snake = to_snake_case(&class);
    let id_index = entity.attributes.iter().position(is_identifier);

    let mut taken: HashSet<String> = HashSet::new();
    let mut fields = Vec::with_capacity(entity.attributes.len() + 1);
    if id_index.is_none() {
        fields.push(Field {
            wire: "id".to_string(),
            field: "id".to_string(),
            dart: DartType::Int,
            is_id: true,
        });
    }
    // The identifier owns `id` even when it is declared after a clashing field.
    taken.insert("id".to_string());

    for (i, attribute) in entity.attributes.iter().enumerate() {
        let is_id = Some(i) == id_index;
        let field = if is_id {
            "id".to_string()
        } else {
            let name = unique_with_suffix(&field_name(&attribute.name), |f| taken.contains(f));
            taken.insert(name.clone());
            name
        };
        fields.push(Field {
            wire: attribute.name.clone(),
            field,
            dart: DartType::from_data_type(&attribute.data_type),
            is_id,
        });
    }

    EntityPlan {
        endpoint: format!("{snake}s"),
        snake,
        class,
        synthesized: usize::from(id_index.is_none()),
        fields,
    }
}

fn is_identifier(attribute: &Attribute) -> bool {
    attribute.name.trim().eq_ignore_ascii_case("id")
}

/// Pascal class name that is a valid Dart identifier and does not shadow
/// an SDK class the generated code relies on.
pub fn class_name(raw: &str) -> String {
    let pascal = to_pascal_case(raw);
    let pascal = match pascal.chars().next() {
        None => FALLBACK_CLASS_NAME.to_string(),
        Some(c) if c.is_ascii_digit() => format!("{FALLBACK_CLASS_NAME}{pascal}"),
        Some(_) => pascal,
    };
    if TAKEN_CLASS_NAMES.contains(&pascal.as_str()) {
        format!("{pascal}Entity")
    } else {
        pascal
    }
}

/// Field identifier with Dart keywords moved out of the way (`class` → `classValue`).
pub fn field_name(raw: &str) -> String {
    let name = sanitize_field_name(raw);
    if DART_KEYWORDS.contains(&name.as_str()) {
        format!("{name}Value")
    } else {
        name
    }
}

/// `base`, then `base2`, `base3`, ... until `taken` rejects it.
fn unique_with_suffix(base: &str, taken: impl Fn(&str) -> bool) -> String {
    if !taken(base) {
        return base.to_string();
    }
    (2..)
        .map(|n| format!("{base}{n}"))
        .find(|candidate| !taken(candidate))
        .unwrap_or_else(|| base.to_string())
}

/// Escape text for a single-quoted Dart string literal, interpolation included.
pub fn dart_string(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '$' => out.push_str("\\$"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out
}
