/// Class-diagram modeling rules, shared by the generation prompts and the MCP server instructions.
pub const RULES: &str = "\
1. Entities are classes. Every entity has type \"class\"; interfaces and enums are modeled as classes \
with a descriptive name.\n\
2. Names are singular nouns in PascalCase (\"Cliente\", \"OrdenCompra\"). Attribute and method names \
are lowerCamelCase. Accents are allowed in names but are stripped when code is generated.\n\
3. Every entity that will be persisted carries an attribute named \"id\" with isKey: true. If it is \
missing, generated code adds a nullable integer id on its own.\n\
4. Attribute types come from a closed set: String, Integer, Long, Double, Boolean, Date, DateTime. \
Anything else is kept as written and treated as text by the code generator.\n\
5. Visibility is public, private, protected or package. Attributes default to private.\n\
6. One relation per pair of related entities. Do not add a reverse relation to express navigation \
in the other direction.\n\
7. Relation type must match the semantics: inheritance for is-a (source is the subclass, target the \
parent), composition when the part cannot exist without the whole, aggregation when it can, \
dependency for transient use, implementation for realizing a contract, association otherwise.\n\
8. Cardinalities use \"1\", \"0..1\", \"0..*\", \"1..*\", \"*\" or \"n..m\". Put the multiplicity \
of each end on that end (sourceCardinality describes how many source instances take part).\n\
9. Relations reference entity ids. When an entity is created in the same change set, it may be \
referenced by its name; names are resolved exactly first, then ignoring case.\n\
10. Foreign keys are not attributes. A relation already states that a Factura belongs to a Cliente; \
do not also add a clienteId attribute.\n\
11. Methods describe behavior, not CRUD. Create/read/update/delete operations are generated for every \
entity and should not be listed as methods.\n\
\n\
## Change sets\n\
Modifications are expressed as a change set with the keys newEntities, modifiedEntities, newRelations, \
deletedEntities and deletedRelations. They are applied in that order, so a new relation may point at a \
new entity, and deletions run last: deleting by name also removes an entity or relation added by the \
same change set.\n\
- modifiedEntities entries name their target with \"id\" (entity id or exact name) and list \
newAttributes, newMethods, deletedAttributes and deletedMethods, either directly or under \"changes\".\n\
- deletedRelations accepts relation ids or the phrase \"entre <A> y <B>\", which removes the relation \
between A and B in either direction.\n\
- Deleting an entity does not delete its relations; list them in deletedRelations as well.\n\
\n\
## Workflow\n\
1. `get_schema` to see the diagram shape.\n\
2. `generate_diagram` from a description, or `parse_image` from a picture of a diagram.\n\
3. `modify_diagram` with a natural-language command, or `apply_changes` with an explicit change set.\n\
4. `export_flutter` once the diagram is final.";
