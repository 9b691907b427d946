use std::sync::OnceLock;

use regex::Regex;
use umlforge_core::{rules::RULES, Diagram, Entity, Visibility};

use crate::GenerationRequest;

fn name_of<'a>(id: &'a str, diagram: &'a Diagram) -> &'a str {
    diagram
        .entities
        .iter()
        .find(|e| e.id == id)
        .map(|e| e.name.as_str())
        .unwrap_or(id)
}

fn sigil(visibility: Visibility) -> char {
    match visibility {
        Visibility::Public => '+',
        Visibility::Private => '-',
        Visibility::Protected => '#',
        Visibility::Package => '~',
    }
}

/// Convert a diagram to a compact text representation for LLM consumption.
pub fn serialize_diagram(diagram: &Diagram) -> String {
    let mut out = String::with_capacity(2048);

    out.push_str("ENTITIES:\n");
    for entity in &diagram.entities {
        serialize_entity(&mut out, entity);
    }

    out.push_str("RELATIONS:\n");
    for relation in &diagram.relations {
        out.push_str(&relation.id);
        out.push(' ');
        out.push_str(&relation.source);
        out.push_str(" \"");
        out.push_str(name_of(&relation.source, diagram));
        out.push_str("\" [");
        out.push_str(&relation.source_cardinality.label);
        out.push_str("] --");
        out.push_str(relation.kind.as_str());
        if let Some(label) = relation.label.as_deref().filter(|l| !l.is_empty()) {
            out.push('/');
            out.push_str(label);
        }
        out.push_str("--> [");
        out.push_str(&relation.target_cardinality.label);
        out.push_str("] ");
        out.push_str(&relation.target);
        out.push_str(" \"");
        out.push_str(name_of(&relation.target, diagram));
        out.push_str("\"\n");
    }

    out
}

fn serialize_entity(out: &mut String, entity: &Entity) {
    out.push_str("[C] ");
    out.push_str(&entity.id);
    out.push_str(" \"");
    out.push_str(&entity.name);
    out.push_str("\"\n");

    for attr in &entity.attributes {
        out.push_str("  ");
        out.push(sigil(attr.visibility));
        out.push(' ');
        out.push_str(&attr.name);
        out.push_str(": ");
        out.push_str(attr.data_type.as_str());
        if attr.is_key {
            out.push_str(" {key}");
        }
        out.push('\n');
    }
    for method in &entity.methods {
        out.push_str("  ");
        out.push(sigil(method.visibility));
        out.push(' ');
        out.push_str(&method.name);
        out.push('(');
        let params: Vec<String> = method
            .parameters
            .iter()
            .map(|p| format!("{}: {}", p.name, p.data_type))
            .collect();
        out.push_str(&params.join(", "));
        out.push_str("): ");
        out.push_str(method.return_type.as_str());
        out.push('\n');
    }
}

/// Human name of a language code, for prompt directives.
pub fn language_name(lang: &str) -> &str {
    match lang.trim().to_lowercase().as_str() {
        "" | "es" => "Spanish",
        "en" => "English",
        "pt" => "Portuguese",
        "fr" => "French",
        _ => lang.trim(),
    }
}

fn entity_count_pattern() -> &'static Regex {
    static COUNT: OnceLock<Regex> = OnceLock::new();
    COUNT.get_or_init(|| {
        Regex::new(r"(?i)(\d+)\s*(tablas?|clases?|entidad(?:es)?|entit(?:y|ies)|tables?|class(?:es)?)")
            .expect("valid regex")
    })
}

/// Number of entities the user explicitly asked for ("crea 4 clases ...").
pub fn requested_entity_count(description: &str) -> Option<u32> {
    entity_count_pattern()
        .captures(description)?
        .get(1)?
        .as_str()
        .parse()
        .ok()
}

pub fn generation_system_prompt(lang: &str) -> String {
    format!(
        "You are a UML class-diagram designer. Turn the user's description into a complete class \
diagram.\n\n\
Write class, attribute and method names in {language}, using intuitive, realistic names. \
If the user does not say how many classes to create, pick a reasonable number (usually 6 to 8) \
for the system described.\n\n\
Answer with JSON only, in this shape:\n\
{{\n\
  \"name\": \"Diagram name\",\n\
  \"entities\": [\n\
    {{\n\
      \"id\": \"unique_id\",\n\
      \"name\": \"ClassName\",\n\
      \"type\": \"class\",\n\
      \"position\": {{\"x\": 100, \"y\": 100}},\n\
      \"attributes\": [{{\"name\": \"id\", \"type\": \"Long\", \"visibility\": \"private\", \"isKey\": true}}],\n\
      \"methods\": [{{\"name\": \"method\", \"returnType\": \"void\", \"parameters\": [], \"visibility\": \"public\"}}]\n\
    }}\n\
  ],\n\
  \"relations\": [\n\
    {{\"id\": \"rel1\", \"sourceId\": \"id1\", \"targetId\": \"id2\", \"type\": \"association\", \
\"sourceCardinality\": \"1\", \"targetCardinality\": \"*\"}}\n\
  ]\n\
}}\n\n\
## Modeling rules\n{RULES}\n\n\
No explanations and no extra text, only the JSON.",
        language = language_name(lang),
    )
}

pub fn generation_user_prompt(request: &GenerationRequest) -> String {
    let mut prompt = format!("Generate a UML class diagram for: {}", request.description);

    if let Some(context) = request.business_context.as_deref().filter(|c| !c.trim().is_empty()) {
        prompt.push_str("\n\nBusiness context: ");
        prompt.push_str(context);
    }
    if let Some(extra) = request
        .additional_requirements
        .as_deref()
        .filter(|c| !c.trim().is_empty())
    {
        prompt.push_str("\n\nAdditional requirements: ");
        prompt.push_str(extra);
    }
    if let Some(count) = requested_entity_count(&request.description) {
        prompt.push_str(&format!(
            "\n\nIMPORTANT: create exactly {count} entities, as the user asked."
        ));
    }

    prompt.push_str(
        "\n\nProduce a complete, coherent diagram with:\n\
- as many entities as the system needs\n\
- correct relations between them (inheritance, composition, association, ...)\n\
- realistic attributes with appropriate data types\n\
- key methods per class\n\
- sensible visibility modifiers\n\
- a readable layout",
    );
    prompt.push_str("\n\nCRITICAL: every entity MUST have type \"class\". Do not produce interfaces, abstract classes or enums.");
    prompt
}

pub fn modification_system_prompt(diagram: &Diagram, lang: &str) -> String {
    format!(
        "You modify existing UML class diagrams following the user's commands. New names are \
written in {language}.\n\n\
Current diagram:\n{current}\n\
Answer ONLY with valid JSON in this shape:\n\
{{\n\
  \"action\": \"add|modify|delete\",\n\
  \"message\": \"short description of what was done\",\n\
  \"changes\": {{\n\
    \"newEntities\": [{{\"id\": \"unique_id\", \"name\": \"ClassName\", \"type\": \"class\", \
\"attributes\": [{{\"name\": \"attr\", \"type\": \"String\", \"visibility\": \"private\"}}], \"methods\": []}}],\n\
    \"modifiedEntities\": [{{\"id\": \"existing_entity_id\", \"changes\": {{\
\"newAttributes\": [], \"newMethods\": [], \"deletedAttributes\": [\"attribute_name\"], \"deletedMethods\": [\"method_name\"]}}}}],\n\
    \"newRelations\": [{{\"sourceId\": \"source id or name\", \"targetId\": \"target id or name\", \
\"type\": \"association|inheritance|composition|aggregation|dependency|implementation\", \
\"sourceCardinality\": \"1\", \"targetCardinality\": \"*\"}}],\n\
    \"deletedEntities\": [\"entity_name\"],\n\
    \"deletedRelations\": [\"relation_id\", \"entre Cliente y Factura\"]\n\
  }}\n\
}}\n\n\
Relation types:\n\
- association: plain link (\"has\", \"relates to\", \"tiene\", \"posee\")\n\
- inheritance: \"extends\", \"is a\", \"hereda de\"; sourceId is the CHILD, targetId the PARENT\n\
- composition: \"is composed of\", \"contains\", \"se compone de\"; sourceId is the whole\n\
- aggregation: \"aggregates\", \"includes\", \"puede tener\"; sourceId is the whole\n\
- dependency: \"uses\", \"depends on\", \"usa\"\n\
- implementation: \"implements\", \"implementa\"\n\n\
Cardinalities: \"1\", \"0..1\", \"*\" / \"0..*\", \"1..*\". \"one to many\" / \"uno a muchos\" means \
sourceCardinality \"1\" and targetCardinality \"*\".\n\n\
To remove an attribute or method use deletedAttributes / deletedMethods inside modifiedEntities. \
To remove a relation use its id or the phrase \"entre A y B\". Keep changes minimal and limited to \
what the user asked for.\n\n\
## Modeling rules\n{RULES}",
        language = language_name(lang),
        current = serialize_diagram(diagram),
    )
}

pub fn chat_system_prompt(diagram: Option<&Diagram>) -> String {
    let mut prompt = String::from(
        "You are an expert assistant for UML class diagrams. Help users understand, modify and \
improve their diagrams.\n\n\
You can:\n\
- explain UML concepts and relations\n\
- suggest improvements to existing diagrams\n\
- answer questions about the structure of the diagram\n\
- give good UML design practices\n\n\
Be helpful, concise and technically precise. Answer in the user's language. If the user asks for a \
whole new diagram, remind them to use diagram generation.",
    );

    if let Some(diagram) = diagram {
        prompt.push_str(&format!(
            "\n\nCurrent diagram context:\n- Name: {}\n- Entities: {} ({})\n- Relations: {}",
            diagram.name,
            diagram.entities.len(),
            diagram.entity_names().join(", "),
            diagram.relations.len(),
        ));
    }
    prompt
}

pub fn suggestions_system_prompt() -> String {
    "You are an expert reviewer of UML class diagrams. Analyze the diagram and suggest specific \
improvements. Focus on:\n\
- applicable design patterns\n\
- missing relations or entities\n\
- better organization of entities\n\
- normalization\n\
- readiness for code generation\n\n\
Give 3 to 5 specific, actionable suggestions in the language the diagram is written in. \
Output ONLY a JSON array of strings, nothing else.\n\
Example: [\"Add a BaseEntity class with common attributes such as id and timestamps\", \
\"The User-Order relation should be bidirectional\"]"
        .to_string()
}

pub fn suggestions_user_message(diagram: &Diagram) -> String {
    format!(
        "Analyze this UML diagram \"{}\" and suggest improvements:\n{}",
        diagram.name,
        serialize_diagram(diagram)
    )
}

/// Instructions sent with an image of a class diagram. `ts` seeds the example ids.
pub fn vision_prompt(ts: i64, lang: &str) -> String {
    format!(
        "You are a UML expert. Analyze this image containing a UML CLASS DIAGRAM.\n\n\
IMPORTANT: it is a UML diagram, not a database table or a loose sketch.\n\n\
INSTRUCTIONS:\n\
1. Identify ALL classes (the rectangles with a name at the top).\n\
2. For each class extract its name, ALL listed attributes (+, -, #, ~ give the visibility) and the \
type of each attribute (after \":\" or inferred).\n\
3. Identify ALL lines and arrows between classes; these are RELATIONS:\n\
   - plain line = association\n\
   - hollow diamond = aggregation\n\
   - filled diamond = composition\n\
   - hollow triangle arrow = inheritance\n\
   - dashed line = dependency\n\
4. Extract the cardinalities near the lines (1, 1..1, 1..*, 0..*, *).\n\n\
Keep names exactly as written in the image; if you must invent one, write it in {language}.\n\n\
ANSWER ONLY WITH VALID JSON (no code fences, no explanations):\n\
{{\n\
  \"id\": \"import-{ts}\",\n\
  \"name\": \"Diagrama importado\",\n\
  \"entities\": [\n\
    {{\n\
      \"id\": \"entity-{ts}-1\",\n\
      \"name\": \"ClassName\",\n\
      \"type\": \"class\",\n\
      \"attributes\": [{{\"id\": \"attr-{ts}-1-1\", \"name\": \"attributeName\", \"type\": \"String\", \
\"visibility\": \"private\", \"isKey\": false}}],\n\
      \"methods\": [],\n\
      \"position\": {{\"x\": 100, \"y\": 100}}\n\
    }}\n\
  ],\n\
  \"relations\": [\n\
    {{\n\
      \"id\": \"rel-{ts}-1\",\n\
      \"source\": \"entity-{ts}-1\",\n\
      \"target\": \"entity-{ts}-2\",\n\
      \"type\": \"association\",\n\
      \"sourceCardinality\": {{\"min\": 1, \"max\": 1, \"label\": \"1\"}},\n\
      \"targetCardinality\": {{\"min\": 0, \"max\": \"unlimited\", \"label\": \"0..*\"}}\n\
    }}\n\
  ]\n\
}}\n\n\
STRICT RULES:\n\
- Visibility: + = public, - = private, # = protected, ~ = package\n\
- An attribute named \"id\", marked with a key icon or \"PK\" gets isKey: true\n\
- Common types: String, Integer, Long, Date, Boolean, Double\n\
- ALWAYS include relations when lines connect classes\n\
- Position: spread classes 300px apart in x and 250px apart in y\n\
- Do NOT invent data that is not in the image\n\
- When unsure about a type, use \"String\"\n\n\
JSON:",
        language = language_name(lang),
    )
}
