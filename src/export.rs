//! Visualization exchange format.
//!
//! Renderers consume a flat node/edge record shape rather than the
//! analysis structures directly. Node `kind` discriminators and the
//! conditional edge labels ("YES", "NO", "LOOP", "NEXT") pass through
//! verbatim; everything else rides along as metadata.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::cfg::ControlFlowGraph;
use crate::schema::SchemaOutput;

/// A renderable node record: `{ id, label, kind, ...metadata }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VizNode {
    pub id: String,
    pub label: String,
    pub kind: String,
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

/// A renderable edge record: `{ id, source, target, label, ...metadata }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VizEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    pub label: String,
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

/// The full renderable shape handed to a front end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VizGraph {
    pub nodes: Vec<VizNode>,
    pub edges: Vec<VizEdge>,
}

impl VizGraph {
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}

/// Render a control-flow graph to the exchange format.
pub fn graph_to_viz(graph: &ControlFlowGraph) -> VizGraph {
    let nodes = graph
        .nodes
        .iter()
        .map(|node| {
            let mut metadata = Map::new();
            metadata.insert("file".to_string(), json!(node.source_position.file));
            metadata.insert("line".to_string(), json!(node.source_position.line));
            metadata.insert("column".to_string(), json!(node.source_position.column));
            metadata.insert("code".to_string(), json!(node.code_excerpt));
            metadata.insert("context".to_string(), json!(node.context_lines));
            VizNode {
                id: node.id.clone(),
                label: node.label.clone(),
                kind: node.kind.as_str().to_string(),
                metadata,
            }
        })
        .collect();

    let edges = graph
        .edges
        .iter()
        .enumerate()
        .map(|(i, edge)| VizEdge {
            id: format!("edge_{}", i),
            source: edge.source.clone(),
            target: edge.target.clone(),
            label: edge.label_str().to_string(),
            metadata: Map::new(),
        })
        .collect();

    VizGraph { nodes, edges }
}

/// Render extracted schema facts to the exchange format.
///
/// One node per table with its field list attached as metadata, one edge
/// per relationship labeled `from_field -> to_field`.
pub fn schema_to_viz(schema: &SchemaOutput) -> VizGraph {
    let nodes = schema
        .tables
        .iter()
        .map(|table| {
            let mut metadata = Map::new();
            metadata.insert("file".to_string(), json!(table.file));
            metadata.insert("line".to_string(), json!(table.line));
            metadata.insert(
                "fields".to_string(),
                serde_json::to_value(&table.fields).unwrap_or(Value::Null),
            );
            VizNode {
                id: table_node_id(&table.name),
                label: table.name.clone(),
                kind: "table".to_string(),
                metadata,
            }
        })
        .collect();

    let edges = schema
        .relationships
        .iter()
        .enumerate()
        .map(|(i, rel)| {
            let mut metadata = Map::new();
            metadata.insert("cardinality".to_string(), json!(rel.cardinality));
            metadata.insert("from_field".to_string(), json!(rel.from_field));
            metadata.insert("to_field".to_string(), json!(rel.to_field));
            metadata.insert("on_delete".to_string(), json!(rel.on_delete));
            VizEdge {
                id: format!("rel_{}", i),
                source: table_node_id(&rel.from_table),
                target: table_node_id(&rel.to_table),
                label: format!("{} -> {}", rel.from_field, rel.to_field),
                metadata,
            }
        })
        .collect();

    VizGraph { nodes, edges }
}

fn table_node_id(table_name: &str) -> String {
    format!("table_{}", table_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfg::CfgBuilder;
    use crate::parser::{Frontend, PythonFrontend};
    use crate::schema::SchemaExtractor;
    use std::path::Path;

    fn build_cfg(source: &str) -> ControlFlowGraph {
        let frontend = PythonFrontend::new();
        let parsed = frontend.parse(Path::new("viz.py"), source.as_bytes()).unwrap();
        let func = frontend.find_function(&parsed, "f").unwrap().unwrap();
        CfgBuilder::build(func, "viz.py", source.as_bytes())
    }

    #[test]
    fn test_graph_round_trip_preserves_counts() {
        let cfg = build_cfg(
            "def f(x):\n    if x > 0:\n        return 1\n    else:\n        return -1\n",
        );
        let viz = graph_to_viz(&cfg);
        assert_eq!(viz.node_count(), cfg.nodes.len());
        assert_eq!(viz.edge_count(), cfg.edges.len());

        let json = serde_json::to_string(&viz).unwrap();
        let back: VizGraph = serde_json::from_str(&json).unwrap();
        assert_eq!(back.node_count(), cfg.nodes.len());
        assert_eq!(back.edge_count(), cfg.edges.len());
    }

    #[test]
    fn test_edge_labels_pass_through_verbatim() {
        let cfg = build_cfg(
            "def f(items):\n    for i in items:\n        while i:\n            i -= 1\n",
        );
        let viz = graph_to_viz(&cfg);

        let labels: Vec<&str> = viz.edges.iter().map(|e| e.label.as_str()).collect();
        assert!(labels.contains(&"LOOP"));
        assert!(labels.contains(&"NEXT"));

        let kinds: Vec<&str> = viz.nodes.iter().map(|n| n.kind.as_str()).collect();
        assert!(kinds.contains(&"start"));
        assert!(kinds.contains(&"decision"));
        assert!(kinds.contains(&"end"));
    }

    #[test]
    fn test_node_metadata_flattened_into_record() {
        let cfg = build_cfg("def f():\n    return 1\n");
        let viz = graph_to_viz(&cfg);
        let value = serde_json::to_value(&viz).unwrap();
        let first = &value["nodes"][0];

        // Metadata keys sit beside id/label/kind, not nested
        assert!(first.get("id").is_some());
        assert!(first.get("line").is_some());
        assert!(first.get("file").is_some());
        assert!(first.get("metadata").is_none());
    }

    #[test]
    fn test_schema_to_viz_tables_and_relationships() {
        let source = r#"
class User(models.Model):
    name = models.CharField(max_length=50)

class Post(models.Model):
    author = models.ForeignKey('User', on_delete=models.CASCADE)
"#;
        let schema = SchemaExtractor::extract("models.py", source.as_bytes());
        let viz = schema_to_viz(&schema);

        assert_eq!(viz.node_count(), 2);
        assert_eq!(viz.edge_count(), 1);

        let edge = &viz.edges[0];
        assert_eq!(edge.source, "table_Post");
        assert_eq!(edge.target, "table_User");
        assert_eq!(edge.label, "author -> id");
        assert_eq!(edge.metadata["on_delete"], "CASCADE");

        let user = viz.nodes.iter().find(|n| n.label == "User").unwrap();
        assert_eq!(user.kind, "table");
        assert!(user.metadata["fields"].is_array());
    }
}
