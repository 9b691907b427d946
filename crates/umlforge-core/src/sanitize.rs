//! Turn any JSON value that claims to be a diagram into a structurally valid
//! [`Diagram`]. Missing or wrong-typed fields get deterministic defaults, keys
//! we do not model are carried along untouched.

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::debug;

use crate::lenient::{
    array, bool_or, extras, finite_number, first_str, id_or, object, str_field, string_or, Obj,
};
use crate::names::{canonical_type, canonical_visibility};
use crate::{
    next_stamp, Attribute, Cardinality, DataType, Diagram, Entity, EntityKind, Extra, Metadata, Method,
    Parameter, Position, Relation, RelationType, DEFAULT_VERSION,
};

const DIAGRAM_KEYS: &[&str] = &["id", "name", "entities", "relations", "metadata"];
const ENTITY_KEYS: &[&str] = &["id", "name", "type", "attributes", "methods", "position"];
const ATTRIBUTE_KEYS: &[&str] = &["id", "name", "type", "visibility", "isKey", "defaultValue"];
const METHOD_KEYS: &[&str] = &[
    "id",
    "name",
    "returnType",
    "visibility",
    "parameters",
    "isStatic",
    "isAbstract",
];
const RELATION_KEYS: &[&str] = &[
    "id",
    "source",
    "target",
    "type",
    "sourceCardinality",
    "targetCardinality",
    "label",
];
const PARAMETER_KEYS: &[&str] = &["id", "name", "type"];
const METADATA_KEYS: &[&str] = &["created", "modified", "version"];

pub const DEFAULT_DIAGRAM_NAME: &str = "Diagrama importado";
pub const DEFAULT_ATTRIBUTE_NAME: &str = "atributo";
pub const DEFAULT_METHOD_NAME: &str = "metodo";
pub const DEFAULT_PARAMETER_NAME: &str = "param";

/// Total: never fails, whatever `raw` is.
pub fn sanitize(raw: &Value) -> Diagram {
    sanitize_with_stamp(raw, next_stamp())
}

/// Same as [`sanitize`] with an explicit stamp for the generated ids.
pub fn sanitize_with_stamp(raw: &Value, ts: i64) -> Diagram {
    let obj = object(raw);

    let entities: Vec<Entity> = array(obj, "entities")
        .iter()
        .enumerate()
        .map(|(i, e)| sanitize_entity(e, ts, i))
        .collect();
    let relations: Vec<Relation> = array(obj, "relations")
        .iter()
        .enumerate()
        .map(|(i, r)| sanitize_relation(r, &format!("rel-{ts}-{i}")))
        .collect();

    debug!(
        entities = entities.len(),
        relations = relations.len(),
        "sanitized diagram"
    );

    Diagram {
        id: id_or(obj, "id", || format!("import-{ts}")),
        name: string_or(obj, "name", || DEFAULT_DIAGRAM_NAME.to_string()),
        entities,
        relations,
        metadata: sanitize_metadata(obj.and_then(|o| o.get("metadata"))),
        extra: extras(obj, DIAGRAM_KEYS),
    }
}

/// Entity at position `index` of its diagram; the index drives default ids,
/// name and grid position.
pub fn sanitize_entity(raw: &Value, ts: i64, index: usize) -> Entity {
    let obj = object(raw);
    let grid = Position::grid(index);
    let position = obj.and_then(|o| o.get("position")).and_then(Value::as_object);

    Entity {
        id: id_or(obj, "id", || format!("entity-{ts}-{index}")),
        name: string_or(obj, "name", || format!("Entidad{index}")),
        kind: EntityKind::Class,
        attributes: array(obj, "attributes")
            .iter()
            .enumerate()
            .map(|(j, a)| sanitize_attribute(a, format!("attr-{ts}-{index}-{j}")))
            .collect(),
        methods: array(obj, "methods")
            .iter()
            .enumerate()
            .map(|(j, m)| sanitize_method(m, &format!("{ts}-{index}-{j}")))
            .collect(),
        position: Position {
            x: finite_number(position, "x").unwrap_or(grid.x),
            y: finite_number(position, "y").unwrap_or(grid.y),
        },
        extra: extras(obj, ENTITY_KEYS),
    }
}

pub fn sanitize_attribute(raw: &Value, default_id: String) -> Attribute {
    let obj = object(raw);
    Attribute {
        id: id_or(obj, "id", || default_id),
        name: string_or(obj, "name", || DEFAULT_ATTRIBUTE_NAME.to_string()),
        data_type: data_type(obj, "type", DataType::String),
        visibility: canonical_visibility(str_field(obj, "visibility")),
        is_key: bool_or(obj, "isKey", false),
        default_value: obj
            .and_then(|o| o.get("defaultValue"))
            .filter(|v| !v.is_null())
            .cloned(),
        extra: extras(obj, ATTRIBUTE_KEYS),
    }
}

/// `key` is the `{ts}-{entity}-{method}` suffix shared by the default method
/// and parameter ids.
pub fn sanitize_method(raw: &Value, key: &str) -> Method {
    let obj = object(raw);
    let parameters = array(obj, "parameters")
        .iter()
        .enumerate()
        .map(|(k, p)| sanitize_parameter(p, format!("param-{key}-{k}")))
        .collect();

    Method {
        name: string_or(obj, "name", || DEFAULT_METHOD_NAME.to_string()),
        return_type: data_type(obj, "returnType", DataType::Other("void".to_string())),
        visibility: canonical_visibility(str_field(obj, "visibility")),
        parameters,
        is_static: bool_or(obj, "isStatic", false),
        is_abstract: bool_or(obj, "isAbstract", false),
        extra: extras(obj, METHOD_KEYS),
        id: id_or(obj, "id", || format!("method-{key}")),
    }
}

fn sanitize_parameter(raw: &Value, default_id: String) -> Parameter {
    // A bare string is taken as the parameter name.
    if let Some(name) = raw.as_str() {
        return Parameter {
            id: default_id,
            name: name.to_string(),
            data_type: DataType::String,
            extra: Extra::new(),
        };
    }
    let obj = object(raw);
    Parameter {
        id: id_or(obj, "id", || default_id),
        name: string_or(obj, "name", || DEFAULT_PARAMETER_NAME.to_string()),
        data_type: data_type(obj, "type", DataType::String),
        extra: extras(obj, PARAMETER_KEYS),
    }
}

/// Endpoints fall back to the `sourceId`/`targetId` spelling models like to use.
pub fn sanitize_relation(raw: &Value, default_id: &str) -> Relation {
    let obj = object(raw);
    Relation {
        id: id_or(obj, "id", || default_id.to_string()),
        source: first_str(obj, &["source", "sourceId"]).unwrap_or_default().to_string(),
        target: first_str(obj, &["target", "targetId"]).unwrap_or_default().to_string(),
        kind: str_field(obj, "type")
            .map(RelationType::parse)
            .unwrap_or_default(),
        source_cardinality: cardinality(obj, "sourceCardinality"),
        target_cardinality: cardinality(obj, "targetCardinality"),
        label: str_field(obj, "label").map(str::to_string),
        extra: extras(obj, RELATION_KEYS),
    }
}

fn sanitize_metadata(raw: Option<&Value>) -> Metadata {
    let obj = raw.and_then(Value::as_object);
    let now = Utc::now();
    Metadata {
        created: timestamp(obj, "created").unwrap_or(now),
        modified: timestamp(obj, "modified").unwrap_or(now),
        version: string_or(obj, "version", || DEFAULT_VERSION.to_string()),
        extra: extras(obj, METADATA_KEYS),
    }
}

fn data_type(obj: Obj<'_>, key: &str, fallback: DataType) -> DataType {
    str_field(obj, key).map(canonical_type).unwrap_or(fallback)
}

fn cardinality(obj: Obj<'_>, key: &str) -> Cardinality {
    obj.and_then(|o| o.get(key))
        .map(Cardinality::from_value)
        .unwrap_or_default()
}

fn timestamp(obj: Obj<'_>, key: &str) -> Option<DateTime<Utc>> {
    let raw = str_field(obj, key)?;
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

/// Point relation endpoints that name an entity (rather than carry its id) at
/// the entity id, using the exact-then-case-insensitive lookup. Returns how
/// many endpoints were rewritten; unresolvable ones are left as they are.
pub fn relink_relations(diagram: &mut Diagram) -> usize {
    let mut rewritten = 0;
    for i in 0..diagram.relations.len() {
        for endpoint in [Endpoint::Source, Endpoint::Target] {
            let current = endpoint.get(&diagram.relations[i]);
            if diagram.has_entity_id(current) {
                continue;
            }
            if let Some(id) = diagram.resolve_entity_id(current) {
                *endpoint.get_mut(&mut diagram.relations[i]) = id;
                rewritten += 1;
            }
        }
    }
    rewritten
}

#[derive(Clone, Copy)]
enum Endpoint {
    Source,
    Target,
}

impl Endpoint {
    fn get(self, r: &Relation) -> &str {
        match self {
            Endpoint::Source => &r.source,
            Endpoint::Target => &r.target,
        }
    }

    fn get_mut(self, r: &mut Relation) -> &mut String {
        match self {
            Endpoint::Source => &mut r.source,
            Endpoint::Target => &mut r.target,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CardinalityMax, Visibility};
    use serde_json::json;

    fn resanitize(d: &Diagram) -> Diagram {
        sanitize(&serde_json::to_value(d).unwrap())
    }

    #[test]
    fn fills_defaults_for_empty_input() {
        let d = sanitize_with_stamp(&json!({}), 42);
        assert_eq!(d.id, "import-42");
        assert_eq!(d.name, DEFAULT_DIAGRAM_NAME);
        assert!(d.entities.is_empty());
        assert!(d.relations.is_empty());
        assert_eq!(d.metadata.version, "1.0.0");
    }

    #[test]
    fn non_objects_become_empty_diagrams() {
        for raw in [json!(null), json!(3), json!("diagram"), json!([1, 2]), json!(true)] {
            let d = sanitize(&raw);
            assert!(d.entities.is_empty());
            assert!(d.relations.is_empty());
            assert!(d.extra.is_empty());
        }
    }

    #[test]
    fn entity_defaults_follow_index() {
        let d = sanitize_with_stamp(
            &json!({"entities": [{}, {"name": "Cliente"}, 7, {}, {"position": {"x": 5}}]}),
            7,
        );
        assert_eq!(d.entities.len(), 5);
        assert_eq!(d.entities[0].id, "entity-7-0");
        assert_eq!(d.entities[0].name, "Entidad0");
        assert_eq!(d.entities[1].name, "Cliente");
        assert_eq!(d.entities[2].name, "Entidad2");
        assert_eq!(d.entities[3].position, Position { x: 100.0, y: 350.0 });
        assert_eq!(d.entities[4].position, Position { x: 5.0, y: 350.0 });
    }

    #[test]
    fn attributes_are_typed_and_defaulted() {
        let d = sanitize_with_stamp(
            &json!({"entities": [{
                "id": "e1",
                "attributes": [
                    {"name": "edad", "type": "int", "visibility": "+"},
                    {"type": 12, "isKey": "yes"},
                    {"name": "precio", "type": "BigDecimal", "defaultValue": 0}
                ]
            }]}),
            9,
        );
        let attrs = &d.entities[0].attributes;
        assert_eq!(attrs[0].data_type, DataType::Integer);
        assert_eq!(attrs[0].visibility, Visibility::Public);
        assert_eq!(attrs[0].id, "attr-9-0-0");
        assert_eq!(attrs[1].name, DEFAULT_ATTRIBUTE_NAME);
        assert_eq!(attrs[1].data_type, DataType::String);
        assert!(!attrs[1].is_key);
        assert_eq!(attrs[2].data_type, DataType::Other("BigDecimal".into()));
        assert_eq!(attrs[2].default_value, Some(json!(0)));
    }

    #[test]
    fn relation_reads_source_id_spelling() {
        let d = sanitize_with_stamp(
            &json!({"relations": [
                {"sourceId": "a", "targetId": "b", "type": "generalization", "targetCardinality": "0..*"},
                {}
            ]}),
            3,
        );
        let r = &d.relations[0];
        assert_eq!((r.source.as_str(), r.target.as_str()), ("a", "b"));
        assert_eq!(r.kind, RelationType::Inheritance);
        assert_eq!(r.target_cardinality.max, CardinalityMax::Unlimited);
        assert_eq!(r.source_cardinality, Cardinality::default());
        assert_eq!(d.relations[1].id, "rel-3-1");
        assert_eq!(d.relations[1].kind, RelationType::Association);
    }

    #[test]
    fn unknown_keys_pass_through() {
        let d = sanitize(&json!({
            "owner": "ana",
            "entities": [{"name": "A", "color": "red", "attributes": [{"name": "x", "note": 1}],
                          "methods": [{"name": "m", "parameters": [{"name": "x", "type": "int", "direction": "in"}]}]}],
            "relations": [{"source": "a", "target": "b", "isNavigable": {"source": true}}]
        }));
        assert_eq!(d.extra.get("owner"), Some(&json!("ana")));
        assert_eq!(d.entities[0].extra.get("color"), Some(&json!("red")));
        assert_eq!(d.entities[0].attributes[0].extra.get("note"), Some(&json!(1)));
        assert_eq!(
            d.entities[0].methods[0].parameters[0].extra.get("direction"),
            Some(&json!("in"))
        );
        assert_eq!(
            d.relations[0].extra.get("isNavigable"),
            Some(&json!({"source": true}))
        );

        let out = serde_json::to_value(&d).unwrap();
        assert_eq!(out["owner"], json!("ana"));
        assert_eq!(out["entities"][0]["color"], json!("red"));
        assert_eq!(out["entities"][0]["methods"][0]["parameters"][0]["direction"], json!("in"));
    }

    #[test]
    fn sanitizing_twice_changes_nothing() {
        let raw = json!({
            "name": "Ventas",
            "entities": [
                {"name": "Cliente", "attributes": [{"name": "nombre"}, {"name": "edad", "type": "number"}],
                 "methods": [{"name": "comprar", "parameters": ["monto", {"name": "fecha", "type": "date"}]}]},
                {"id": "e2", "name": "Factura", "position": {"x": 1, "y": 2}, "extra": [1]}
            ],
            "relations": [{"sourceId": "Cliente", "target": "e2", "sourceCardinality": 1, "label": "emite"}],
            "metadata": {"version": "2.0.0", "author": "x"}
        });
        let once = sanitize(&raw);
        assert_eq!(resanitize(&once), once);
    }

    #[test]
    fn metadata_keeps_valid_timestamps() {
        let d = sanitize(&json!({"metadata": {"created": "2024-01-02T03:04:05Z", "modified": "junk"}}));
        assert_eq!(d.metadata.created.to_rfc3339(), "2024-01-02T03:04:05+00:00");
        assert!(d.metadata.modified > d.metadata.created);
    }

    #[test]
    fn relink_resolves_names_to_ids() {
        let mut d = sanitize(&json!({
            "entities": [{"id": "e1", "name": "Cliente"}, {"id": "e2", "name": "Factura"}],
            "relations": [
                {"source": "cliente", "target": "Factura"},
                {"source": "e1", "target": "Nadie"}
            ]
        }));
        assert_eq!(relink_relations(&mut d), 2);
        assert_eq!((d.relations[0].source.as_str(), d.relations[0].target.as_str()), ("e1", "e2"));
        assert_eq!(d.relations[1].target, "Nadie");
    }

    mod laws {
        use super::*;
        use proptest::prelude::*;

        fn arb_json() -> impl Strategy<Value = Value> {
            let leaf = prop_oneof![
                Just(Value::Null),
                any::<bool>().prop_map(Value::Bool),
                any::<i64>().prop_map(|n| json!(n)),
                (-1.0e6f64..1.0e6).prop_map(|n| json!(n)),
                "[a-zA-Z0-9 _.*]{0,8}".prop_map(Value::String),
            ];
            leaf.prop_recursive(4, 48, 6, |inner| {
                prop_oneof![
                    prop::collection::vec(inner.clone(), 0..5).prop_map(Value::Array),
                    prop::collection::btree_map(
                        prop_oneof![
                            Just("id".to_string()),
                            Just("name".to_string()),
                            Just("type".to_string()),
                            Just("entities".to_string()),
                            Just("relations".to_string()),
                            Just("attributes".to_string()),
                            Just("methods".to_string()),
                            Just("parameters".to_string()),
                            Just("position".to_string()),
                            Just("source".to_string()),
                            Just("targetCardinality".to_string()),
                            Just("metadata".to_string()),
                            "[a-z]{1,6}",
                        ],
                        inner,
                        0..6
                    )
                    .prop_map(|m| Value::Object(m.into_iter().collect())),
                ]
            })
        }

        proptest! {
            #[test]
            fn sanitize_is_total(raw in arb_json()) {
                let d = sanitize(&raw);
                let out = serde_json::to_value(&d).unwrap();
                prop_assert!(out["entities"].is_array());
                prop_assert!(out["relations"].is_array());
            }

            #[test]
            fn sanitize_is_idempotent(raw in arb_json()) {
                let once = sanitize(&raw);
                prop_assert_eq!(resanitize(&once), once);
            }

            #[test]
            fn unknown_keys_survive_at_every_level(key in "zz[a-z]{1,5}", value in arb_json()) {
                let raw = json!({
                    key.clone(): value.clone(),
                    "entities": [{
                        key.clone(): value.clone(),
                        "attributes": [{key.clone(): value.clone()}],
                        "methods": [{
                            key.clone(): value.clone(),
                            "parameters": [{key.clone(): value.clone()}]
                        }]
                    }],
                    "relations": [{key.clone(): value.clone()}]
                });
                let d = sanitize(&raw);
                let entity = &d.entities[0];
                prop_assert_eq!(d.extra.get(&key), Some(&value));
                prop_assert_eq!(entity.extra.get(&key), Some(&value));
                prop_assert_eq!(entity.attributes[0].extra.get(&key), Some(&value));
                prop_assert_eq!(entity.methods[0].extra.get(&key), Some(&value));
                prop_assert_eq!(entity.methods[0].parameters[0].extra.get(&key), Some(&value));
                prop_assert_eq!(d.relations[0].extra.get(&key), Some(&value));
            }
        }
    }
}
