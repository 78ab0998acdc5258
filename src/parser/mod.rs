//! Syntax front ends.
//!
//! A front end turns file text into a tree-sitter parse tree. Only Python
//! is implemented, but every consumer goes through the [`Frontend`] trait
//! so further grammars slot in behind the same seam.

mod python;

pub use python::PythonFrontend;

use std::path::Path;

use once_cell::sync::OnceCell;

/// Holds a parsed tree and the source it was parsed from.
///
/// Kept separate from analysis results so the tree can feed multiple
/// passes (facts, CFGs, schema) without re-parsing.
pub struct ParsedFile {
    /// The tree-sitter parse tree.
    pub tree: tree_sitter::Tree,
    /// The original source bytes (kept for node text extraction).
    pub source: Vec<u8>,
    /// The file path, for error reporting and node positions.
    pub path: String,
}

impl ParsedFile {
    /// Source as a string slice.
    pub fn source_str(&self) -> &str {
        std::str::from_utf8(&self.source).unwrap_or("")
    }

    /// Text for a tree-sitter node.
    pub fn node_text(&self, node: tree_sitter::Node) -> &str {
        node.utf8_text(&self.source).unwrap_or("")
    }

    /// Whether the tree contains ERROR nodes.
    pub fn has_errors(&self) -> bool {
        self.tree.root_node().has_error()
    }
}

/// Language front end.
///
/// tree_sitter::Parser is not Sync, so implementations create parsers
/// per call rather than holding one.
pub trait Frontend: Send + Sync {
    /// Language identifier (e.g. "python").
    fn language_id(&self) -> &'static str;

    /// File extensions this front end handles (without dot).
    fn file_extensions(&self) -> &'static [&'static str];

    /// Parse source into a tree.
    ///
    /// Fails only when parsing cannot produce a tree at all; partial
    /// errors come back as a tree with ERROR nodes.
    fn parse(&self, path: &Path, source: &[u8]) -> anyhow::Result<ParsedFile>;

    /// Check whether this front end handles the given extension.
    fn handles_extension(&self, ext: &str) -> bool {
        self.file_extensions().contains(&ext)
    }
}

static PYTHON_FRONTEND: OnceCell<PythonFrontend> = OnceCell::new();

/// Register all front ends. Idempotent; call once at startup.
pub fn register_frontends() {
    PYTHON_FRONTEND.get_or_init(PythonFrontend::new);
}

/// Look up the front end for a file extension.
pub fn frontend_for(ext: &str) -> Option<&'static dyn Frontend> {
    let py = PYTHON_FRONTEND.get_or_init(PythonFrontend::new);
    if py.handles_extension(ext) {
        return Some(py);
    }
    None
}
