//! Relational-schema facts inferred from ORM model classes.
//!
//! Recognition is syntactic: a class whose base list contains a one- or
//! two-segment name ending in `Model` is treated as a model, whatever the
//! name actually resolves to. Aliased or indirected base classes are
//! missed, and an unrelated class named `Model` is misclassified. That
//! trade-off is deliberate; no type resolution is performed.

mod extractor;

pub use extractor::SchemaExtractor;

use std::path::Path;

use serde::{Deserialize, Serialize};

/// A column inferred from a declarative field assignment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaField {
    pub name: String,
    /// The field constructor name, e.g. "CharField" or "ForeignKey".
    pub declared_type: String,
    pub is_primary_key: bool,
    pub is_foreign_key: bool,
    pub is_unique: bool,
    /// Referenced table name for relation fields. Recorded even when no
    /// table of that name exists in the same batch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub foreign_key_target: Option<String>,
    /// Cascade policy for relation fields, e.g. "CASCADE" or "SET_NULL".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_delete: Option<String>,
}

/// A table inferred from a model class. Field order is declaration order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaTable {
    pub name: String,
    pub fields: Vec<SchemaField>,
    pub file: String,
    pub line: usize,
}

/// A foreign-key relationship between two tables.
///
/// Derived from relation fields after all tables in a batch are known;
/// `to_table` keeps the referenced name verbatim when unresolved so
/// renderers can show a dangling reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaRelationship {
    pub from_table: String,
    pub from_field: String,
    pub to_table: String,
    /// Always "id" by convention.
    pub to_field: String,
    /// Always "one-to-many".
    pub cardinality: String,
    pub on_delete: String,
}

/// Tables and relationships extracted from one file (or one batch).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaOutput {
    pub tables: Vec<SchemaTable>,
    pub relationships: Vec<SchemaRelationship>,
}

impl SchemaOutput {
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty() && self.relationships.is_empty()
    }

    /// Merge another batch into this one, re-resolving nothing: each
    /// batch resolved its own relationships already.
    pub fn merge(&mut self, other: SchemaOutput) {
        self.tables.extend(other.tables);
        self.relationships.extend(other.relationships);
    }
}

/// Whether a file path matches the model-file naming convention.
pub fn looks_like_model_file(path: &Path) -> bool {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("")
        .to_lowercase();
    name == "models.py" || name.contains("model")
}
