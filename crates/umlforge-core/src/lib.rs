pub mod changes;
mod lenient;
pub mod names;
pub mod rules;
pub mod sanitize;
pub mod settings;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};

pub use changes::{apply_changes, ChangeSet, EntityModification, NewRelation};
pub use names::{canonical_type, canonical_visibility, sanitize_field_name, to_identifier_case, Case};
pub use sanitize::{relink_relations, sanitize};
pub use settings::{AiSettings, Settings, SettingsError, VisionSettings};

// --- Types (wire format shared with the diagram editor) ---

/// Open bag of keys the editor or a model attached that this crate does not model.
pub type Extra = Map<String, Value>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    #[default]
    Class,
}

/// Canonical attribute/parameter type. Unknown names pass through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DataType {
    String,
    Integer,
    Long,
    Double,
    Boolean,
    Date,
    DateTime,
    Other(String),
}

impl DataType {
    pub fn as_str(&self) -> &str {
        match self {
            DataType::String => "String",
            DataType::Integer => "Integer",
            DataType::Long => "Long",
            DataType::Double => "Double",
            DataType::Boolean => "Boolean",
            DataType::Date => "Date",
            DataType::DateTime => "DateTime",
            DataType::Other(name) => name,
        }
    }
}

impl Default for DataType {
    fn default() -> Self {
        DataType::String
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for DataType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for DataType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(names::canonical_type(&raw))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    #[default]
    Private,
    Protected,
    Package,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Private => "private",
            Visibility::Protected => "protected",
            Visibility::Package => "package",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum RelationType {
    #[default]
    Association,
    Inheritance,
    Composition,
    Aggregation,
    Dependency,
    Implementation,
}

impl RelationType {
    /// Lenient mapping; `generalization` is read as inheritance, anything unknown as association.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "inheritance" | "generalization" => RelationType::Inheritance,
            "composition" => RelationType::Composition,
            "aggregation" => RelationType::Aggregation,
            "dependency" => RelationType::Dependency,
            "implementation" => RelationType::Implementation,
            _ => RelationType::Association,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RelationType::Association => "association",
            RelationType::Inheritance => "inheritance",
            RelationType::Composition => "composition",
            RelationType::Aggregation => "aggregation",
            RelationType::Dependency => "dependency",
            RelationType::Implementation => "implementation",
        }
    }
}

/// Upper bound of a cardinality: a number, or `"unlimited"` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardinalityMax {
    Bounded(u32),
    Unlimited,
}

impl CardinalityMax {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_u64().map(|n| CardinalityMax::Bounded(clamp_u32(n))),
            Value::String(s) => match s.trim() {
                "*" | "n" | "N" | "unlimited" | "many" => Some(CardinalityMax::Unlimited),
                other => other.parse::<u32>().ok().map(CardinalityMax::Bounded),
            },
            _ => None,
        }
    }
}

impl Serialize for CardinalityMax {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CardinalityMax::Bounded(n) => serializer.serialize_u32(*n),
            CardinalityMax::Unlimited => serializer.serialize_str("unlimited"),
        }
    }
}

impl<'de> Deserialize<'de> for CardinalityMax {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        CardinalityMax::from_value(&value)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid cardinality max: {value}")))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, schemars::JsonSchema)]
pub struct Cardinality {
    pub min: u32,
    #[schemars(with = "serde_json::Value")]
    pub max: CardinalityMax,
    pub label: String,
}

impl Default for Cardinality {
    fn default() -> Self {
        Cardinality {
            min: 1,
            max: CardinalityMax::Bounded(1),
            label: "1".to_string(),
        }
    }
}

impl Cardinality {
    /// Parse loose textual forms: `1`, `*`, `0..*`, `1..1`, `0..1`, `n..m`, and a few words.
    /// Anything unreadable becomes exactly-one.
    pub fn parse(raw: &str) -> Self {
        let text = raw.trim();
        let lowered = text.to_lowercase();
        let (min, max) = match lowered.as_str() {
            "*" | "n" | "many" | "muchos" | "varios" => (0, CardinalityMax::Unlimited),
            "optional" | "opcional" => (0, CardinalityMax::Bounded(1)),
            "one" | "uno" => (1, CardinalityMax::Bounded(1)),
            "one or more" | "uno o mas" | "uno o más" => (1, CardinalityMax::Unlimited),
            other => match other.split_once("..") {
                Some((lo, hi)) => {
                    let Ok(min) = lo.trim().parse::<u32>() else {
                        return Cardinality::default();
                    };
                    let Some(max) = CardinalityMax::from_value(&Value::String(hi.trim().to_string()))
                    else {
                        return Cardinality::default();
                    };
                    (min, max)
                }
                None => match other.parse::<u32>() {
                    Ok(n) => (n, CardinalityMax::Bounded(n)),
                    Err(_) => return Cardinality::default(),
                },
            },
        };
        Cardinality {
            min,
            max,
            label: text.to_string(),
        }
    }

    /// Accepts a string, a bare number, or an already structured `{min, max, label}` object.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::String(s) => Cardinality::parse(s),
            Value::Number(n) => match n.as_u64() {
                Some(n) => Cardinality::parse(&n.to_string()),
                None => Cardinality::default(),
            },
            Value::Object(map) => {
                let min = map.get("min").and_then(Value::as_u64).map(clamp_u32);
                let max = map.get("max").and_then(CardinalityMax::from_value);
                let label = map.get("label").and_then(Value::as_str);
                match (min, max, label) {
                    (None, None, Some(label)) => Cardinality::parse(label),
                    (None, None, None) => Cardinality::default(),
                    (min, max, label) => {
                        let min = min.unwrap_or(1);
                        let max = max.unwrap_or(CardinalityMax::Bounded(min));
                        let label = label
                            .map(str::to_string)
                            .unwrap_or_else(|| render_label(min, max));
                        Cardinality { min, max, label }
                    }
                }
            }
            _ => Cardinality::default(),
        }
    }
}

fn render_label(min: u32, max: CardinalityMax) -> String {
    match max {
        CardinalityMax::Bounded(max) if max == min => min.to_string(),
        CardinalityMax::Bounded(max) => format!("{min}..{max}"),
        CardinalityMax::Unlimited => format!("{min}..*"),
    }
}

fn clamp_u32(n: u64) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, schemars::JsonSchema)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    /// Three-column grid used when an entity arrives without coordinates.
    pub fn grid(index: usize) -> Self {
        Position {
            x: 100.0 + (index % 3) as f64 * 300.0,
            y: 100.0 + (index / 3) as f64 * 250.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, schemars::JsonSchema)]
pub struct Parameter {
    pub id: String,
    pub name: String,
    #[serde(rename = "type", default)]
    #[schemars(with = "String")]
    pub data_type: DataType,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Attribute {
    pub id: String,
    pub name: String,
    #[serde(rename = "type", default)]
    #[schemars(with = "String")]
    pub data_type: DataType,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub is_key: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Method {
    pub id: String,
    pub name: String,
    #[serde(default)]
    #[schemars(with = "String")]
    pub return_type: DataType,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    #[serde(default)]
    pub is_static: bool,
    #[serde(default)]
    pub is_abstract: bool,
    #[serde(flatten)]
    pub extra: Extra,
}

/// A class node. Matches the editor's entity structure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, schemars::JsonSchema)]
pub struct Entity {
    pub id: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: EntityKind,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
    #[serde(default)]
    pub methods: Vec<Method>,
    #[serde(default)]
    pub position: Position,
    #[serde(flatten)]
    pub extra: Extra,
}

impl Entity {
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }
}

/// An edge between two entities, keyed by entity id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Relation {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(rename = "type", default)]
    pub kind: RelationType,
    #[serde(default)]
    pub source_cardinality: Cardinality,
    #[serde(default)]
    pub target_cardinality: Cardinality,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl Relation {
    /// Undirected endpoint check.
    pub fn connects(&self, a: &str, b: &str) -> bool {
        (self.source == a && self.target == b) || (self.source == b && self.target == a)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, schemars::JsonSchema)]
pub struct Metadata {
    #[schemars(with = "String")]
    pub created: DateTime<Utc>,
    #[schemars(with = "String")]
    pub modified: DateTime<Utc>,
    pub version: String,
    #[serde(flatten)]
    pub extra: Extra,
}

impl Metadata {
    pub fn now() -> Self {
        let now = Utc::now();
        Metadata {
            created: now,
            modified: now,
            version: DEFAULT_VERSION.to_string(),
            extra: Extra::new(),
        }
    }
}

pub const DEFAULT_VERSION: &str = "1.0.0";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, schemars::JsonSchema)]
pub struct Diagram {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub entities: Vec<Entity>,
    #[serde(default)]
    pub relations: Vec<Relation>,
    pub metadata: Metadata,
    #[serde(flatten)]
    pub extra: Extra,
}

impl Diagram {
    /// A fresh diagram with no entities, as the editor creates one.
    pub fn empty(name: &str) -> Self {
        Diagram {
            id: format!("diagram-{}", next_stamp()),
            name: name.to_string(),
            entities: Vec::new(),
            relations: Vec::new(),
            metadata: Metadata::now(),
            extra: Extra::new(),
        }
    }

    /// Exact id-or-name lookup.
    pub fn find_entity(&self, key: &str) -> Option<&Entity> {
        self.entities.iter().find(|e| e.id == key || e.name == key)
    }

    /// Resolve an entity reference coming from a model: exact id or name first,
    /// then a case-insensitive match on either.
    pub fn resolve_entity_id(&self, key: &str) -> Option<String> {
        if let Some(e) = self.find_entity(key) {
            return Some(e.id.clone());
        }

        let key_lower = key.to_lowercase();
        self.entities
            .iter()
            .find(|e| e.id.to_lowercase() == key_lower || e.name.to_lowercase() == key_lower)
            .map(|e| e.id.clone())
    }

    pub fn entity_names(&self) -> Vec<&str> {
        self.entities.iter().map(|e| e.name.as_str()).collect()
    }

    pub fn has_entity_id(&self, id: &str) -> bool {
        self.entities.iter().any(|e| e.id == id)
    }
}

// --- Ids ---

static LAST_STAMP: AtomicI64 = AtomicI64::new(0);

/// Millisecond timestamp that strictly increases across calls in this process,
/// so ids built from it never repeat even when two passes land in the same millisecond.
pub fn next_stamp() -> i64 {
    let now = Utc::now().timestamp_millis();
    let mut prev = LAST_STAMP.load(Ordering::Relaxed);
    loop {
        let next = if now > prev { now } else { prev + 1 };
        match LAST_STAMP.compare_exchange_weak(prev, next, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => return next,
            Err(actual) => prev = actual,
        }
    }
}

/// Return `base` if unused, otherwise `base-2`, `base-3`, ...
pub fn unique_id(base: &str, taken: impl Fn(&str) -> bool) -> String {
    if !taken(base) {
        return base.to_string();
    }
    (2..)
        .map(|n| format!("{base}-{n}"))
        .find(|candidate| !taken(candidate))
        .unwrap_or_else(|| format!("{base}-{}", next_stamp()))
}
