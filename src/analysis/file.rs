//! Single-file analysis.

use std::path::Path;

use tree_sitter::Node;

use crate::cfg::{CfgBuilder, ControlFlowGraph};
use crate::error::AnalyzeError;
use crate::parser::{Frontend, ParsedFile, PythonFrontend};
use crate::schema::{looks_like_model_file, SchemaExtractor};

use super::{ClassInfo, FileAnalysis, FunctionInfo, Import, ImportKind};

/// Analyzes one file: parse once, extract everything.
pub struct FileAnalyzer {
    frontend: PythonFrontend,
}

impl FileAnalyzer {
    pub fn new() -> Self {
        Self {
            frontend: PythonFrontend::new(),
        }
    }

    /// Full analysis of one file's content.
    ///
    /// Parse failure is surfaced as a descriptive error naming the file;
    /// callers running batches catch it per file.
    pub fn analyze(&self, path: &Path, source: &[u8]) -> Result<FileAnalysis, AnalyzeError> {
        let parsed = self.parse(path, source)?;

        let mut collector = Collector::new(&parsed);
        collector.walk(parsed.tree.root_node(), &mut Vec::new(), &[]);

        let schema = if looks_like_model_file(path) {
            Some(SchemaExtractor::extract_parsed(&parsed))
        } else {
            None
        };

        Ok(FileAnalysis {
            path: parsed.path.clone(),
            file_name: path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| parsed.path.clone()),
            imports: collector.imports,
            classes: collector.classes,
            functions: collector.functions,
            control_flow_graphs: collector.graphs,
            schema,
        })
    }

    /// Build the CFG for one named function.
    ///
    /// An unknown name is a distinct "not found" condition, never
    /// conflated with parse failure.
    pub fn cfg_for_function(
        &self,
        path: &Path,
        source: &[u8],
        function_name: &str,
    ) -> Result<ControlFlowGraph, AnalyzeError> {
        let parsed = self.parse(path, source)?;

        let func = self
            .frontend
            .find_function(&parsed, function_name)
            .map_err(|e| AnalyzeError::parse(parsed.path.clone(), e.to_string()))?
            .ok_or_else(|| AnalyzeError::FunctionNotFound {
                function: function_name.to_string(),
                file: parsed.path.clone(),
            })?;

        Ok(CfgBuilder::build(func, &parsed.path, source))
    }

    fn parse(&self, path: &Path, source: &[u8]) -> Result<ParsedFile, AnalyzeError> {
        let parsed = self
            .frontend
            .parse(path, source)
            .map_err(|e| AnalyzeError::parse(path.to_string_lossy(), e.to_string()))?;
        if parsed.has_errors() {
            return Err(AnalyzeError::parse(
                path.to_string_lossy(),
                "invalid syntax",
            ));
        }
        Ok(parsed)
    }
}

impl Default for FileAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

/// Top-down tree walk carrying an ancestor-kind stack.
///
/// The stack replaces parent pointers: a function is standalone iff no
/// class definition appears among its ancestors.
struct Collector<'a> {
    parsed: &'a ParsedFile,
    imports: Vec<Import>,
    classes: Vec<ClassInfo>,
    functions: Vec<FunctionInfo>,
    graphs: Vec<ControlFlowGraph>,
}

impl<'a> Collector<'a> {
    fn new(parsed: &'a ParsedFile) -> Self {
        Self {
            parsed,
            imports: Vec::new(),
            classes: Vec::new(),
            functions: Vec::new(),
            graphs: Vec::new(),
        }
    }

    fn walk(&mut self, node: Node, ancestors: &mut Vec<&'static str>, decorators: &[String]) {
        match node.kind() {
            "import_statement" => self.collect_import(node),
            "import_from_statement" => self.collect_import_from(node),
            "decorated_definition" => {
                let decs = self.collect_decorators(node);
                if let Some(def) = node.child_by_field_name("definition") {
                    self.walk(def, ancestors, &decs);
                }
                return;
            }
            "class_definition" => {
                let info = self.class_info(node);
                self.classes.push(info);
                ancestors.push("class_definition");
                if let Some(body) = node.child_by_field_name("body") {
                    self.walk_children(body, ancestors);
                }
                ancestors.pop();
                return;
            }
            "function_definition" => {
                if !ancestors.contains(&"class_definition") {
                    self.functions
                        .push(self.function_info(node, decorators.to_vec()));
                }
                self.graphs
                    .push(CfgBuilder::build(node, &self.parsed.path, &self.parsed.source));
                ancestors.push("function_definition");
                if let Some(body) = node.child_by_field_name("body") {
                    self.walk_children(body, ancestors);
                }
                ancestors.pop();
                return;
            }
            _ => {}
        }
        self.walk_children(node, ancestors);
    }

    fn walk_children(&mut self, node: Node, ancestors: &mut Vec<&'static str>) {
        let mut cursor = node.walk();
        let children: Vec<Node> = node.named_children(&mut cursor).collect();
        for child in children {
            self.walk(child, ancestors, &[]);
        }
    }

    fn collect_import(&mut self, node: Node) {
        let line = node.start_position().row + 1;
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            match child.kind() {
                "dotted_name" => self.imports.push(Import {
                    module: self.parsed.node_text(child).to_string(),
                    name: None,
                    alias: None,
                    line,
                    kind: ImportKind::Import,
                }),
                "aliased_import" => {
                    let module = child
                        .child_by_field_name("name")
                        .map(|n| self.parsed.node_text(n).to_string())
                        .unwrap_or_default();
                    let alias = child
                        .child_by_field_name("alias")
                        .map(|n| self.parsed.node_text(n).to_string());
                    self.imports.push(Import {
                        module,
                        name: None,
                        alias,
                        line,
                        kind: ImportKind::Import,
                    });
                }
                _ => {}
            }
        }
    }

    fn collect_import_from(&mut self, node: Node) {
        let line = node.start_position().row + 1;
        let module = node
            .child_by_field_name("module_name")
            .map(|n| self.parsed.node_text(n).to_string())
            .unwrap_or_default();

        let mut cursor = node.walk();
        let names: Vec<Node> = node.children_by_field_name("name", &mut cursor).collect();
        if names.is_empty() {
            // from module import *
            self.imports.push(Import {
                module,
                name: Some("*".to_string()),
                alias: None,
                line,
                kind: ImportKind::ImportFrom,
            });
            return;
        }

        for name_node in names {
            let (name, alias) = match name_node.kind() {
                "aliased_import" => (
                    name_node
                        .child_by_field_name("name")
                        .map(|n| self.parsed.node_text(n).to_string())
                        .unwrap_or_default(),
                    name_node
                        .child_by_field_name("alias")
                        .map(|n| self.parsed.node_text(n).to_string()),
                ),
                _ => (self.parsed.node_text(name_node).to_string(), None),
            };
            self.imports.push(Import {
                module: module.clone(),
                name: Some(name),
                alias,
                line,
                kind: ImportKind::ImportFrom,
            });
        }
    }

    fn collect_decorators(&self, node: Node) -> Vec<String> {
        let mut cursor = node.walk();
        node.children(&mut cursor)
            .filter(|c| c.kind() == "decorator")
            .map(|c| {
                self.parsed
                    .node_text(c)
                    .trim_start_matches('@')
                    .trim()
                    .to_string()
            })
            .collect()
    }

    fn class_info(&self, node: Node) -> ClassInfo {
        let name = node
            .child_by_field_name("name")
            .map(|n| self.parsed.node_text(n).to_string())
            .unwrap_or_default();

        let bases = node
            .child_by_field_name("superclasses")
            .map(|sup| {
                let mut cursor = sup.walk();
                sup.named_children(&mut cursor)
                    .map(|b| self.parsed.node_text(b).to_string())
                    .collect()
            })
            .unwrap_or_default();

        let body = node.child_by_field_name("body");
        let docstring = body.and_then(|b| self.docstring(b));

        let mut methods = Vec::new();
        if let Some(body) = body {
            let mut cursor = body.walk();
            for stmt in body.named_children(&mut cursor) {
                match stmt.kind() {
                    "function_definition" => {
                        methods.push(self.function_info(stmt, Vec::new()));
                    }
                    "decorated_definition" => {
                        if let Some(def) = stmt.child_by_field_name("definition") {
                            if def.kind() == "function_definition" {
                                let decs = self.collect_decorators(stmt);
                                methods.push(self.function_info(def, decs));
                            }
                        }
                    }
                    _ => {}
                }
            }
        }

        ClassInfo {
            name,
            line: node.start_position().row + 1,
            end_line: node.end_position().row + 1,
            bases,
            docstring,
            methods,
        }
    }

    fn function_info(&self, node: Node, decorators: Vec<String>) -> FunctionInfo {
        let name = node
            .child_by_field_name("name")
            .map(|n| self.parsed.node_text(n).to_string())
            .unwrap_or_default();

        let args = node
            .child_by_field_name("parameters")
            .map(|params| {
                let mut cursor = params.walk();
                params
                    .named_children(&mut cursor)
                    .filter_map(|p| self.param_name(p))
                    .collect()
            })
            .unwrap_or_default();

        let returns = node
            .child_by_field_name("return_type")
            .map(|n| self.parsed.node_text(n).to_string());

        let docstring = node
            .child_by_field_name("body")
            .and_then(|b| self.docstring(b));

        let is_async = {
            let mut cursor = node.walk();
            let found = node.children(&mut cursor).any(|c| c.kind() == "async");
            found
        };

        FunctionInfo {
            name,
            line: node.start_position().row + 1,
            end_line: node.end_position().row + 1,
            args,
            returns,
            decorators,
            docstring,
            is_async,
        }
    }

    fn param_name(&self, param: Node) -> Option<String> {
        match param.kind() {
            "identifier" => Some(self.parsed.node_text(param).to_string()),
            "typed_parameter" => param
                .named_child(0)
                .map(|n| self.parsed.node_text(n).to_string()),
            "default_parameter" | "typed_default_parameter" => param
                .child_by_field_name("name")
                .map(|n| self.parsed.node_text(n).to_string()),
            "list_splat_pattern" | "dictionary_splat_pattern" => {
                Some(self.parsed.node_text(param).to_string())
            }
            _ => None,
        }
    }

    /// First statement of a block, when it is a bare string literal.
    fn docstring(&self, body: Node) -> Option<String> {
        let first = body.named_child(0)?;
        if first.kind() != "expression_statement" {
            return None;
        }
        let string = first.named_child(0)?;
        if string.kind() != "string" {
            return None;
        }
        let text = self.parsed.node_text(string);
        let trimmed = text
            .trim_start_matches("r")
            .trim_matches(|c| c == '"' || c == '\'')
            .trim();
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyze(source: &str) -> FileAnalysis {
        FileAnalyzer::new()
            .analyze(Path::new("views.py"), source.as_bytes())
            .unwrap()
    }

    #[test]
    fn test_imports_extracted_with_aliases() {
        let analysis = analyze(
            r#"
import os
import numpy as np
from django.db import models
from typing import List, Optional
from collections import OrderedDict as OD
"#,
        );

        assert_eq!(analysis.imports.len(), 6);

        let numpy = analysis.imports.iter().find(|i| i.module == "numpy").unwrap();
        assert_eq!(numpy.alias.as_deref(), Some("np"));
        assert_eq!(numpy.kind, ImportKind::Import);

        let models = analysis
            .imports
            .iter()
            .find(|i| i.name.as_deref() == Some("models"))
            .unwrap();
        assert_eq!(models.module, "django.db");
        assert_eq!(models.kind, ImportKind::ImportFrom);

        let od = analysis
            .imports
            .iter()
            .find(|i| i.name.as_deref() == Some("OrderedDict"))
            .unwrap();
        assert_eq!(od.alias.as_deref(), Some("OD"));

        // Two names from one `from typing import` line
        assert_eq!(
            analysis
                .imports
                .iter()
                .filter(|i| i.module == "typing")
                .count(),
            2
        );
    }

    #[test]
    fn test_classes_with_methods_and_docstrings() {
        let analysis = analyze(
            r#"
class OrderService(BaseService):
    """Handles order lifecycle."""

    def place(self, order):
        """Place an order."""
        return order

    @staticmethod
    def cancel(order_id):
        pass

    async def refresh(self):
        pass
"#,
        );

        assert_eq!(analysis.classes.len(), 1);
        let class = &analysis.classes[0];
        assert_eq!(class.name, "OrderService");
        assert_eq!(class.bases, vec!["BaseService"]);
        assert_eq!(class.docstring.as_deref(), Some("Handles order lifecycle."));
        assert_eq!(class.methods.len(), 3);

        let place = &class.methods[0];
        assert_eq!(place.args, vec!["self", "order"]);
        assert_eq!(place.docstring.as_deref(), Some("Place an order."));

        let cancel = &class.methods[1];
        assert_eq!(cancel.decorators, vec!["staticmethod"]);

        let refresh = &class.methods[2];
        assert!(refresh.is_async);

        // Methods are not standalone functions
        assert!(analysis.functions.is_empty());
    }

    #[test]
    fn test_standalone_function_detection() {
        let analysis = analyze(
            r#"
def top_level():
    def nested():
        pass
    return nested

class Holder:
    def method(self):
        def inner_of_method():
            pass
        return inner_of_method
"#,
        );

        let names: Vec<_> = analysis.functions.iter().map(|f| f.name.as_str()).collect();
        // Functions nested in functions are standalone; anything under a
        // class boundary is not
        assert!(names.contains(&"top_level"));
        assert!(names.contains(&"nested"));
        assert!(!names.contains(&"method"));
        assert!(!names.contains(&"inner_of_method"));
    }

    #[test]
    fn test_cfg_built_for_every_function_like_node() {
        let analysis = analyze(
            r#"
def free(x):
    if x:
        return 1
    return 0

class Thing:
    def method(self):
        return self
"#,
        );

        let cfg_names: Vec<_> = analysis
            .control_flow_graphs
            .iter()
            .map(|g| g.function_name.as_str())
            .collect();
        assert!(cfg_names.contains(&"free"));
        assert!(cfg_names.contains(&"method"));

        let free = analysis.cfg_for("free").unwrap();
        assert_eq!(free.cyclomatic_complexity, 2);
    }

    #[test]
    fn test_schema_only_for_model_files() {
        let source = r#"
from django.db import models

class Project(models.Model):
    name = models.CharField(max_length=100)
"#;
        let analyzer = FileAnalyzer::new();

        let as_models = analyzer
            .analyze(Path::new("app/models.py"), source.as_bytes())
            .unwrap();
        let schema = as_models.schema.expect("models.py should carry schema");
        assert_eq!(schema.tables.len(), 1);

        let as_views = analyzer
            .analyze(Path::new("app/views.py"), source.as_bytes())
            .unwrap();
        assert!(as_views.schema.is_none());
    }

    #[test]
    fn test_parse_failure_names_the_file() {
        let err = FileAnalyzer::new()
            .analyze(Path::new("broken.py"), b"def f(:\n")
            .unwrap_err();
        assert!(matches!(err, AnalyzeError::Parse { .. }));
        assert!(err.to_string().contains("broken.py"));
    }

    #[test]
    fn test_cfg_for_unknown_function_is_not_found() {
        let analyzer = FileAnalyzer::new();
        let source = b"def exists():\n    pass\n";

        let cfg = analyzer
            .cfg_for_function(Path::new("m.py"), source, "exists")
            .unwrap();
        assert_eq!(cfg.function_name, "exists");

        let err = analyzer
            .cfg_for_function(Path::new("m.py"), source, "missing")
            .unwrap_err();
        assert!(matches!(err, AnalyzeError::FunctionNotFound { .. }));
    }

    #[test]
    fn test_return_annotation_captured() {
        let analysis = analyze(
            r#"
def lookup(key: str) -> Optional[int]:
    return None

def bare(key):
    return None

class Repo:
    def count(self) -> int:
        return 0
"#,
        );

        let lookup = analysis.functions.iter().find(|f| f.name == "lookup").unwrap();
        assert_eq!(lookup.returns.as_deref(), Some("Optional[int]"));
        assert_eq!(lookup.args, vec!["key"]);

        let bare = analysis.functions.iter().find(|f| f.name == "bare").unwrap();
        assert!(bare.returns.is_none());

        // Methods carry the annotation too
        let count = &analysis.classes[0].methods[0];
        assert_eq!(count.returns.as_deref(), Some("int"));
    }

    #[test]
    fn test_decorated_standalone_function() {
        let analysis = analyze(
            r#"
@app.route("/health")
def health():
    return "ok"
"#,
        );
        assert_eq!(analysis.functions.len(), 1);
        assert_eq!(analysis.functions[0].decorators, vec!["app.route(\"/health\")"]);
        // Decorated functions still get a CFG
        assert!(analysis.cfg_for("health").is_some());
    }
}
