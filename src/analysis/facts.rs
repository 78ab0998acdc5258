//! Fact structures extracted from a single file.

use serde::{Deserialize, Serialize};

use crate::cfg::ControlFlowGraph;
use crate::schema::SchemaOutput;

/// How a module was imported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportKind {
    /// `import module`
    Import,
    /// `from module import name`
    ImportFrom,
}

/// An import statement fact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Import {
    /// The module path, e.g. "django.db".
    pub module: String,
    /// The imported name for `from` imports, e.g. "models".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Alias, when imported `as` something.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    pub line: usize,
    pub kind: ImportKind,
}

/// A function or method signature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionInfo {
    pub name: String,
    pub line: usize,
    pub end_line: usize,
    pub args: Vec<String>,
    /// Return annotation text, when the signature has one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub returns: Option<String>,
    pub decorators: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docstring: Option<String>,
    pub is_async: bool,
}

/// A class definition with its methods.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassInfo {
    pub name: String,
    pub line: usize,
    pub end_line: usize,
    pub bases: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docstring: Option<String>,
    pub methods: Vec<FunctionInfo>,
}

/// Complete analysis of one file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileAnalysis {
    pub path: String,
    pub file_name: String,
    pub imports: Vec<Import>,
    pub classes: Vec<ClassInfo>,
    /// Functions not nested inside any class.
    pub functions: Vec<FunctionInfo>,
    /// One CFG per function-like node, methods included.
    pub control_flow_graphs: Vec<ControlFlowGraph>,
    /// Present only for files matching the model-file convention.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<SchemaOutput>,
}

impl FileAnalysis {
    /// Find a CFG by function name.
    pub fn cfg_for(&self, name: &str) -> Option<&ControlFlowGraph> {
        self.control_flow_graphs
            .iter()
            .find(|g| g.function_name == name)
    }
}
