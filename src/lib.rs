//! Flowscope - static analysis backend for code visualization.
//!
//! Flowscope extracts structured facts from source files: imports, class
//! and function inventories, per-function control-flow graphs, and (for
//! ORM model files) inferred relational-schema tables and foreign-key
//! relationships. Consumers are visualization front ends that render
//! flowcharts and entity-relationship diagrams.
//!
//! # Architecture
//!
//! The codebase uses tree-sitter for AST-based analysis:
//!
//! - `parser`: Syntax front ends behind the `Frontend` trait
//! - `cfg`: Control-flow graph construction from function nodes
//! - `schema`: ORM schema extraction from model classes
//! - `analysis`: Per-file fact collection (imports, classes, functions)
//! - `project`: Directory-wide scans with aggregate statistics
//! - `export`: Node/edge exchange format for renderers
//! - `report`: Output formatting (pretty, JSON)
//!
//! # Adding a New Language
//!
//! Implement the `Frontend` trait in `src/parser/` and register it in
//! `register_frontends`.

pub mod analysis;
pub mod cfg;
pub mod cli;
pub mod error;
pub mod export;
pub mod parser;
pub mod project;
pub mod report;
pub mod schema;

pub use analysis::{FileAnalysis, FileAnalyzer};
pub use cfg::{CfgBuilder, ControlFlowGraph, EdgeLabel, GraphEdge, GraphNode, NodeKind};
pub use error::AnalyzeError;
pub use export::{graph_to_viz, schema_to_viz, VizGraph};
pub use parser::{frontend_for, register_frontends, Frontend, ParsedFile};
pub use project::{ProjectAnalysis, ProjectAnalyzer, ProjectSummary};
pub use schema::{SchemaExtractor, SchemaOutput, SchemaRelationship, SchemaTable};

/// Initialize all subsystems.
///
/// Call this once at startup.
pub fn init() {
    register_frontends();
}
