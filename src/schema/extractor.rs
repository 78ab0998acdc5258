//! Schema extraction from declarative model classes.

use std::path::Path;

use tree_sitter::Node;

use crate::parser::{Frontend, ParsedFile, PythonFrontend};

use super::{SchemaField, SchemaOutput, SchemaRelationship, SchemaTable};

/// Relation-field type names. A field whose declared type contains one of
/// these is a foreign key.
const RELATION_FIELD_MARKERS: &[&str] = &["ForeignKey", "OneToOneField"];

/// Base-class identifier that marks a model class.
const MODEL_BASE: &str = "Model";

/// Default cascade policy when `on_delete` is missing or unresolvable.
const DEFAULT_ON_DELETE: &str = "CASCADE";

/// Extracts tables and relationships from one file.
pub struct SchemaExtractor;

impl SchemaExtractor {
    /// Extract schema facts from file content.
    ///
    /// Best-effort: unparseable source yields empty output rather than an
    /// error, so a batch run is never aborted by one bad file.
    pub fn extract(path: &str, source: &[u8]) -> SchemaOutput {
        let frontend = PythonFrontend::new();
        let parsed = match frontend.parse(Path::new(path), source) {
            Ok(p) => p,
            Err(_) => return SchemaOutput::default(),
        };
        if parsed.has_errors() {
            return SchemaOutput::default();
        }
        Self::extract_parsed(&parsed)
    }

    /// Extract from an already-parsed file.
    pub fn extract_parsed(parsed: &ParsedFile) -> SchemaOutput {
        let mut tables = Vec::new();

        let root = parsed.tree.root_node();
        let mut cursor = root.walk();
        for child in root.named_children(&mut cursor) {
            let class_node = match child.kind() {
                "class_definition" => Some(child),
                "decorated_definition" => child
                    .child_by_field_name("definition")
                    .filter(|d| d.kind() == "class_definition"),
                _ => None,
            };
            if let Some(class_node) = class_node {
                if is_model_class(parsed, class_node) {
                    if let Some(table) = extract_table(parsed, class_node) {
                        tables.push(table);
                    }
                }
            }
        }

        let relationships = build_relationships(&tables);
        SchemaOutput {
            tables,
            relationships,
        }
    }
}

/// A class is a model iff a direct base is a one- or two-segment name
/// ending in the model base identifier. Covers `models.Model` and bare
/// `Model`; purely syntactic.
fn is_model_class(parsed: &ParsedFile, class_node: Node) -> bool {
    let superclasses = match class_node.child_by_field_name("superclasses") {
        Some(s) => s,
        None => return false,
    };
    let mut cursor = superclasses.walk();
    for base in superclasses.named_children(&mut cursor) {
        let text = parsed.node_text(base);
        let segments: Vec<&str> = text.split('.').collect();
        if segments.len() <= 2 && segments.last() == Some(&MODEL_BASE) {
            return true;
        }
    }
    false
}

/// Extract a table from a model class body.
///
/// Returns None when no field is recognized: a class without declarative
/// fields is not a useful schema node and is dropped silently.
fn extract_table(parsed: &ParsedFile, class_node: Node) -> Option<SchemaTable> {
    let name = parsed.node_text(class_node.child_by_field_name("name")?).to_string();
    let body = class_node.child_by_field_name("body")?;

    let mut fields = Vec::new();
    let mut cursor = body.walk();
    for stmt in body.named_children(&mut cursor) {
        if stmt.kind() != "expression_statement" {
            continue;
        }
        let assignment = match stmt.named_child(0) {
            Some(n) if n.kind() == "assignment" => n,
            _ => continue,
        };
        let target = match assignment.child_by_field_name("left") {
            // Multi-target and tuple assignments are skipped, not errored
            Some(t) if t.kind() == "identifier" => t,
            _ => continue,
        };
        let value = match assignment.child_by_field_name("right") {
            Some(v) if v.kind() == "call" => v,
            _ => continue,
        };

        let field_name = parsed.node_text(target).to_string();
        if let Some(field) = extract_field(parsed, field_name, value) {
            fields.push(field);
        }
    }

    if fields.is_empty() {
        return None;
    }

    Some(SchemaTable {
        name,
        fields,
        file: parsed.path.clone(),
        line: class_node.start_position().row + 1,
    })
}

/// Extract one field from a call-valued assignment.
fn extract_field(parsed: &ParsedFile, name: String, call: Node) -> Option<SchemaField> {
    let declared_type = callee_name(parsed, call.child_by_field_name("function")?)?;

    let is_foreign_key = RELATION_FIELD_MARKERS
        .iter()
        .any(|m| declared_type.contains(m));

    let mut field = SchemaField {
        name,
        declared_type,
        is_primary_key: false,
        is_foreign_key,
        is_unique: false,
        foreign_key_target: None,
        on_delete: None,
    };

    if let Some(args) = call.child_by_field_name("arguments") {
        let mut on_delete = None;
        let mut cursor = args.walk();
        for arg in args.named_children(&mut cursor) {
            if arg.kind() == "keyword_argument" {
                let key = arg
                    .child_by_field_name("name")
                    .map(|n| parsed.node_text(n))
                    .unwrap_or("");
                let value = arg.child_by_field_name("value");
                match key {
                    "primary_key" => {
                        field.is_primary_key = matches!(value.map(|v| v.kind()), Some("true"));
                    }
                    "unique" => {
                        field.is_unique = matches!(value.map(|v| v.kind()), Some("true"));
                    }
                    "on_delete" => {
                        // models.CASCADE -> "CASCADE"; anything else is
                        // left unresolved and falls back to the default
                        if let Some(v) = value {
                            if v.kind() == "attribute" {
                                on_delete = v
                                    .child_by_field_name("attribute")
                                    .map(|a| parsed.node_text(a).to_string());
                            }
                        }
                    }
                    _ => {}
                }
            } else if field.is_foreign_key && field.foreign_key_target.is_none() {
                // First positional argument names the referenced table
                field.foreign_key_target = Some(reference_name(parsed, arg));
            }
        }
        if field.is_foreign_key {
            field.on_delete = Some(on_delete.unwrap_or_else(|| DEFAULT_ON_DELETE.to_string()));
        }
    } else if field.is_foreign_key {
        field.on_delete = Some(DEFAULT_ON_DELETE.to_string());
    }

    // Implicit primary key convention: a field literally named "id"
    if field.name == "id" && !field.is_primary_key {
        field.is_primary_key = true;
    }

    Some(field)
}

/// Resolve the callee name of a field constructor: the bare name of a
/// direct call or the attribute name of a qualified call.
fn callee_name(parsed: &ParsedFile, func: Node) -> Option<String> {
    match func.kind() {
        "identifier" => Some(parsed.node_text(func).to_string()),
        "attribute" => func
            .child_by_field_name("attribute")
            .map(|a| parsed.node_text(a).to_string()),
        _ => None,
    }
}

/// Referenced table name from a relation field's first positional
/// argument: a string literal, a bare identifier, or an attribute.
fn reference_name(parsed: &ParsedFile, node: Node) -> String {
    match node.kind() {
        "string" => parsed
            .node_text(node)
            .trim_matches(|c| c == '"' || c == '\'')
            .to_string(),
        "identifier" => parsed.node_text(node).to_string(),
        "attribute" => node
            .child_by_field_name("attribute")
            .map(|a| parsed.node_text(a).to_string())
            .unwrap_or_else(|| "Unknown".to_string()),
        _ => "Unknown".to_string(),
    }
}

/// One relationship per foreign-key field, resolved against the batch's
/// tables. Unresolved targets are still emitted under the referenced
/// name so renderers can show a dangling reference.
fn build_relationships(tables: &[SchemaTable]) -> Vec<SchemaRelationship> {
    let mut relationships = Vec::new();
    for table in tables {
        for field in &table.fields {
            if !field.is_foreign_key {
                continue;
            }
            let target = match &field.foreign_key_target {
                Some(t) => t.clone(),
                None => continue,
            };
            let to_table = tables
                .iter()
                .find(|t| t.name == target)
                .map(|t| t.name.clone())
                .unwrap_or(target);
            relationships.push(SchemaRelationship {
                from_table: table.name.clone(),
                from_field: field.name.clone(),
                to_table,
                to_field: "id".to_string(),
                cardinality: "one-to-many".to_string(),
                on_delete: field
                    .on_delete
                    .clone()
                    .unwrap_or_else(|| DEFAULT_ON_DELETE.to_string()),
            });
        }
    }
    relationships
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(source: &str) -> SchemaOutput {
        SchemaExtractor::extract("models.py", source.as_bytes())
    }

    #[test]
    fn test_basic_model_with_foreign_key() {
        let source = r#"
from django.db import models

class Document(models.Model):
    id = models.AutoField()
    name = models.CharField(max_length=100)
    owner = models.ForeignKey("User", on_delete=models.CASCADE)
"#;
        let schema = extract(source);

        assert_eq!(schema.tables.len(), 1);
        let table = &schema.tables[0];
        assert_eq!(table.name, "Document");
        assert_eq!(table.fields.len(), 3);

        // "id" is promoted to primary key without an explicit flag
        let id = &table.fields[0];
        assert_eq!(id.name, "id");
        assert!(id.is_primary_key);

        let owner = &table.fields[2];
        assert!(owner.is_foreign_key);
        assert_eq!(owner.foreign_key_target.as_deref(), Some("User"));
        assert_eq!(owner.on_delete.as_deref(), Some("CASCADE"));

        assert_eq!(schema.relationships.len(), 1);
        let rel = &schema.relationships[0];
        assert_eq!(rel.from_table, "Document");
        assert_eq!(rel.from_field, "owner");
        assert_eq!(rel.to_table, "User");
        assert_eq!(rel.to_field, "id");
        assert_eq!(rel.cardinality, "one-to-many");
    }

    #[test]
    fn test_bare_model_base_and_bare_field_calls() {
        let source = r#"
from django.db.models import Model, CharField, ForeignKey

class Tag(Model):
    label = CharField(max_length=50, unique=True)
    parent = ForeignKey(Tag, on_delete=models.SET_NULL)
"#;
        let schema = extract(source);

        assert_eq!(schema.tables.len(), 1);
        let table = &schema.tables[0];
        assert_eq!(table.fields[0].declared_type, "CharField");
        assert!(table.fields[0].is_unique);

        let parent = &table.fields[1];
        assert!(parent.is_foreign_key);
        // Bare identifier reference resolves to its name
        assert_eq!(parent.foreign_key_target.as_deref(), Some("Tag"));
        assert_eq!(parent.on_delete.as_deref(), Some("SET_NULL"));

        // Self-reference resolves within the batch
        assert_eq!(schema.relationships.len(), 1);
        assert_eq!(schema.relationships[0].to_table, "Tag");
    }

    #[test]
    fn test_explicit_primary_key_and_defaults() {
        let source = r#"
class Account(models.Model):
    number = models.CharField(primary_key=True)
    holder = models.OneToOneField("Person")
"#;
        let schema = extract(source);
        let table = &schema.tables[0];

        assert!(table.fields[0].is_primary_key);
        assert!(!table.fields[0].is_foreign_key);

        // OneToOneField is a relation field; missing on_delete defaults
        let holder = &table.fields[1];
        assert!(holder.is_foreign_key);
        assert_eq!(holder.on_delete.as_deref(), Some("CASCADE"));
    }

    #[test]
    fn test_unresolved_target_still_emitted() {
        let source = r#"
class Order(models.Model):
    customer = models.ForeignKey("accounts.Customer", on_delete=models.PROTECT)
"#;
        let schema = extract(source);

        // No table named "accounts.Customer" in this batch; the name is
        // recorded verbatim
        assert_eq!(schema.relationships.len(), 1);
        assert_eq!(schema.relationships[0].to_table, "accounts.Customer");
        assert_eq!(schema.relationships[0].on_delete, "PROTECT");
    }

    #[test]
    fn test_class_with_no_fields_is_dropped() {
        let source = r#"
class Empty(models.Model):
    def save(self):
        pass

class Constantly(models.Model):
    LIMIT = 10
    note = "not a call"
"#;
        let schema = extract(source);
        // Methods and non-call assignments are not fields; both classes
        // yield no table
        assert!(schema.tables.is_empty());
        assert!(schema.relationships.is_empty());
    }

    #[test]
    fn test_non_model_classes_ignored() {
        let source = r#"
class Helper:
    value = compute()

class Form(forms.ModelForm):
    name = forms.CharField()

class Deep(a.b.c.Model):
    x = models.CharField()
"#;
        let schema = extract(source);
        // No base, a base not ending in Model, and a three-segment base
        // are all rejected
        assert!(schema.tables.is_empty());
    }

    #[test]
    fn test_unparseable_source_yields_empty() {
        let schema = extract("class Broken(models.Model:\n    x = 1\n");
        assert!(schema.is_empty());
    }

    #[test]
    fn test_field_order_is_declaration_order() {
        let source = r#"
class Ordered(models.Model):
    zulu = models.CharField()
    alpha = models.CharField()
    mike = models.CharField()
"#;
        let schema = extract(source);
        let names: Vec<_> = schema.tables[0].fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["zulu", "alpha", "mike"]);
    }

    #[test]
    fn test_full_store_example() {
        let source = r#"
from django.db import models

class User(models.Model):
    username = models.CharField(max_length=100, unique=True)
    email = models.EmailField(unique=True)

class Order(models.Model):
    user = models.ForeignKey(User, on_delete=models.CASCADE)
    total = models.DecimalField(max_digits=10, decimal_places=2)

class OrderItem(models.Model):
    order = models.ForeignKey(Order, on_delete=models.CASCADE)
    product = models.ForeignKey('Product', on_delete=models.CASCADE)
    quantity = models.IntegerField()
"#;
        let schema = extract(source);

        assert_eq!(schema.tables.len(), 3);
        assert_eq!(schema.relationships.len(), 3);

        // 'Product' has no table in the batch but the relationship stays
        let product_rel = schema
            .relationships
            .iter()
            .find(|r| r.from_field == "product")
            .unwrap();
        assert_eq!(product_rel.to_table, "Product");

        let order_rel = schema
            .relationships
            .iter()
            .find(|r| r.from_field == "order")
            .unwrap();
        assert_eq!(order_rel.from_table, "OrderItem");
        assert_eq!(order_rel.to_table, "Order");
    }
}
