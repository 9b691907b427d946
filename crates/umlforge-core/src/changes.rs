//! Apply a change set (usually produced by a model from a natural-language
//! command) to a diagram.

use std::sync::OnceLock;

use chrono::Utc;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use crate::lenient::{array, first_str, object, string_list};
use crate::sanitize::{sanitize_attribute, sanitize_entity, sanitize_method, sanitize_relation};
use crate::{next_stamp, unique_id, Diagram, Entity};

/// Lenient view of a `changes` object. Entities, attributes and relations
/// stay raw until they are applied, because their defaults depend on where
/// they land in the diagram.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    pub new_entities: Vec<Value>,
    pub modified_entities: Vec<EntityModification>,
    pub new_relations: Vec<NewRelation>,
    pub deleted_entities: Vec<String>,
    /// Relation ids, or phrases of the form `entre <A> y <B>`.
    pub deleted_relations: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityModification {
    /// Entity id or exact name.
    pub target: String,
    pub new_attributes: Vec<Value>,
    pub new_methods: Vec<Value>,
    pub deleted_attributes: Vec<String>,
    pub deleted_methods: Vec<String>,
}

/// A relation to add. Endpoints are entity ids or names and are resolved on apply.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRelation {
    pub source: String,
    pub target: String,
    pub raw: Value,
}

impl ChangeSet {
    /// Total: a non-object or a malformed entry yields an empty part.
    pub fn from_value(value: &Value) -> Self {
        let obj = object(value);
        ChangeSet {
            new_entities: array(obj, "newEntities").to_vec(),
            modified_entities: array(obj, "modifiedEntities")
                .iter()
                .filter_map(EntityModification::from_value)
                .collect(),
            new_relations: array(obj, "newRelations")
                .iter()
                .map(NewRelation::from_value)
                .collect(),
            deleted_entities: string_list(obj, "deletedEntities"),
            deleted_relations: string_list(obj, "deletedRelations"),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.new_entities.is_empty()
            && self.modified_entities.is_empty()
            && self.new_relations.is_empty()
            && self.deleted_entities.is_empty()
            && self.deleted_relations.is_empty()
    }
}

impl EntityModification {
    /// The target comes from `id` (or `name`). The edit lists may sit under a
    /// nested `changes` object or directly on the entry.
    fn from_value(value: &Value) -> Option<Self> {
        let obj = object(value);
        let Some(target) = first_str(obj, &["id", "name"]).filter(|t| !t.trim().is_empty()) else {
            warn!(entry = %value, "modified entity without a target, skipping");
            return None;
        };
        let fields = obj
            .and_then(|o| o.get("changes"))
            .and_then(Value::as_object)
            .or(obj);

        Some(EntityModification {
            target: target.to_string(),
            new_attributes: array(fields, "newAttributes").to_vec(),
            new_methods: array(fields, "newMethods").to_vec(),
            deleted_attributes: string_list(fields, "deletedAttributes"),
            deleted_methods: string_list(fields, "deletedMethods"),
        })
    }
}

impl NewRelation {
    fn from_value(value: &Value) -> Self {
        let obj = object(value);
        NewRelation {
            source: first_str(obj, &["sourceId", "source"]).unwrap_or_default().to_string(),
            target: first_str(obj, &["targetId", "target"]).unwrap_or_default().to_string(),
            raw: value.clone(),
        }
    }
}

/// Returns the updated copy; `diagram` is left untouched.
///
/// Steps run in a fixed order so that relations can point at entities added in
/// the same batch, and deletions never remove something the batch just added
/// under a colliding id: new entities, entity edits, new relations, entity
/// deletions, relation deletions. `metadata.modified` is refreshed at the end.
pub fn apply_changes(diagram: &Diagram, changes: &ChangeSet) -> Diagram {
    let mut updated = diagram.clone();
    let ts = next_stamp();

    add_entities(&mut updated, &changes.new_entities, ts);
    for modification in &changes.modified_entities {
        modify_entity(&mut updated, modification);
    }
    add_relations(&mut updated, &changes.new_relations, ts);
    delete_entities(&mut updated, &changes.deleted_entities);
    delete_relations(&mut updated, &changes.deleted_relations);

    updated.metadata.modified = Utc::now();
    debug!(
        entities = updated.entities.len(),
        relations = updated.relations.len(),
        "applied change set"
    );
    updated
}

fn add_entities(diagram: &mut Diagram, raw: &[Value], ts: i64) {
    for value in raw {
        let index = diagram.entities.len();
        let mut entity = sanitize_entity(value, ts, index);
        if diagram.has_entity_id(&entity.id) {
            let rekeyed = unique_id(&entity.id, |id| diagram.has_entity_id(id));
            debug!(from = %entity.id, to = %rekeyed, "re-keyed colliding entity id");
            entity.id = rekeyed;
        }
        diagram.entities.push(entity);
    }
}

fn modify_entity(diagram: &mut Diagram, modification: &EntityModification) {
    let target = modification.target.as_str();
    let Some(entity) = diagram
        .entities
        .iter_mut()
        .find(|e| e.id == target || e.name == target)
    else {
        warn!(entity = target, "modified entity not found, skipping");
        return;
    };

    for raw in &modification.new_attributes {
        let base = format!("attr-{}-{}", entity.id, entity.attributes.len());
        let mut attribute = sanitize_attribute(raw, base);
        attribute.id = unique_id(&attribute.id, |id| has_attribute_id(entity, id));
        entity.attributes.push(attribute);
    }
    for raw in &modification.new_methods {
        let key = format!("{}-{}", entity.id, entity.methods.len());
        let mut method = sanitize_method(raw, &key);
        method.id = unique_id(&method.id, |id| entity.methods.iter().any(|m| m.id == id));
        entity.methods.push(method);
    }

    entity
        .attributes
        .retain(|a| !modification.deleted_attributes.contains(&a.name));
    entity
        .methods
        .retain(|m| !modification.deleted_methods.contains(&m.name));
}

fn has_attribute_id(entity: &Entity, id: &str) -> bool {
    entity.attributes.iter().any(|a| a.id == id)
}

fn add_relations(diagram: &mut Diagram, relations: &[NewRelation], ts: i64) {
    for (i, wanted) in relations.iter().enumerate() {
        let source = diagram.resolve_entity_id(&wanted.source);
        let target = diagram.resolve_entity_id(&wanted.target);
        let (Some(source), Some(target)) = (source, target) else {
            warn!(
                from = %wanted.source,
                to = %wanted.target,
                available = ?diagram.entity_names(),
                "could not resolve relation endpoints, dropping relation"
            );
            continue;
        };

        let mut relation = sanitize_relation(&wanted.raw, &format!("rel-{ts}-{i}"));
        relation.source = source;
        relation.target = target;
        relation.extra.remove("sourceId");
        relation.extra.remove("targetId");
        if diagram.relations.iter().any(|r| r.id == relation.id) {
            relation.id = unique_id(&relation.id, |id| diagram.relations.iter().any(|r| r.id == id));
        }
        diagram.relations.push(relation);
    }
}

fn delete_entities(diagram: &mut Diagram, keys: &[String]) {
    if keys.is_empty() {
        return;
    }
    diagram
        .entities
        .retain(|e| !keys.contains(&e.name) && !keys.contains(&e.id));
}

fn between_pattern() -> &'static Regex {
    static BETWEEN: OnceLock<Regex> = OnceLock::new();
    BETWEEN.get_or_init(|| Regex::new(r"(?i)entre\s+(\w+)\s+y\s+(\w+)").expect("valid regex"))
}

/// Entity id pair named by an `entre <A> y <B>` phrase, if both names resolve.
fn between_pair(diagram: &Diagram, phrase: &str) -> Option<(String, String)> {
    let captures = between_pattern().captures(phrase)?;
    let a = diagram.resolve_entity_id(captures.get(1)?.as_str());
    let b = diagram.resolve_entity_id(captures.get(2)?.as_str());
    match (a, b) {
        (Some(a), Some(b)) => Some((a, b)),
        _ => {
            warn!(phrase, "relation deletion names unknown entities");
            None
        }
    }
}

fn delete_relations(diagram: &mut Diagram, keys: &[String]) {
    if keys.is_empty() {
        return;
    }
    let pairs: Vec<(String, String)> = keys
        .iter()
        .filter_map(|k| between_pair(diagram, k))
        .collect();

    diagram.relations.retain(|r| {
        !keys.contains(&r.id) && !pairs.iter().any(|(a, b)| r.connects(a, b))
    });
}
