//! Control-flow graph types.
//!
//! A [`ControlFlowGraph`] is a directed graph of one function's execution
//! paths: one start node, one end node, process nodes for straight-line
//! statements, and decision nodes for conditional and loop heads. Edge
//! labels ("YES", "NO", "LOOP", "NEXT") are a contract with downstream
//! renderers and must be preserved verbatim.

mod builder;

pub use builder::CfgBuilder;

use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of a graph node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Start,
    End,
    Process,
    Decision,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Start => "start",
            NodeKind::End => "end",
            NodeKind::Process => "process",
            NodeKind::Decision => "decision",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Label on a conditional edge.
///
/// The empty label marks a sequential edge; the rest mark branch entries
/// and loop back-edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EdgeLabel {
    #[serde(rename = "YES")]
    Yes,
    #[serde(rename = "NO")]
    No,
    #[serde(rename = "LOOP")]
    Loop,
    #[serde(rename = "NEXT")]
    Next,
}

impl EdgeLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeLabel::Yes => "YES",
            EdgeLabel::No => "NO",
            EdgeLabel::Loop => "LOOP",
            EdgeLabel::Next => "NEXT",
        }
    }
}

/// Source location of a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourcePosition {
    pub file: String,
    /// 1-indexed line.
    pub line: usize,
    /// 1-indexed column.
    pub column: usize,
}

/// A node in a control-flow graph.
///
/// Created exactly once by the builder, never mutated afterwards, owned
/// by the graph that contains it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphNode {
    /// Opaque counter-derived id, unique within one graph.
    pub id: String,
    pub kind: NodeKind,
    /// Human-readable label for rendering.
    pub label: String,
    pub source_position: SourcePosition,
    /// Source text of the statement this node represents.
    pub code_excerpt: String,
    /// Raw source lines around the statement (3 before, 3 after), for
    /// display only; not part of graph semantics.
    pub context_lines: Vec<String>,
}

/// An edge between two nodes in the same graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
    /// Rendered as "" | "YES" | "NO" | "LOOP" | "NEXT".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<EdgeLabel>,
    /// "conditional" iff the label is non-empty, else "sequential".
    pub kind: EdgeKind,
}

/// Edge kind discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    Sequential,
    Conditional,
}

impl GraphEdge {
    /// Edge label rendered for the exchange format.
    pub fn label_str(&self) -> &'static str {
        self.label.map(|l| l.as_str()).unwrap_or("")
    }
}

/// Control-flow graph for one function.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlFlowGraph {
    pub function_name: String,
    pub file_path: String,
    pub line_start: usize,
    pub line_end: usize,
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    /// 1 + number of decision points (if/while/for heads and exception
    /// handler clauses). Always >= 1.
    pub cyclomatic_complexity: u32,
    pub node_count: usize,
    pub decision_count: usize,
}

impl ControlFlowGraph {
    /// Find a node by id.
    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Nodes of a given kind.
    pub fn nodes_of_kind(&self, kind: NodeKind) -> impl Iterator<Item = &GraphNode> {
        self.nodes.iter().filter(move |n| n.kind == kind)
    }

    /// Outgoing edges of a node.
    pub fn out_edges<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a GraphEdge> {
        self.edges.iter().filter(move |e| e.source == id)
    }
}
