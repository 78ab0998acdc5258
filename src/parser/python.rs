//! Python front end using tree-sitter.

use std::path::Path;

use streaming_iterator::StreamingIterator;
use tree_sitter::{Language, Parser, Query, QueryCursor};

use super::{Frontend, ParsedFile};

/// Query for locating function definitions by name. Covers plain and
/// decorated definitions; methods match too since the query is not
/// anchored to module scope.
const FUNCTION_QUERY: &str = r#"
(function_definition
  name: (identifier) @func_name
) @function
"#;

pub struct PythonFrontend {
    language: Language,
}

impl PythonFrontend {
    pub fn new() -> Self {
        Self {
            language: tree_sitter_python::LANGUAGE.into(),
        }
    }

    fn create_parser(&self) -> anyhow::Result<Parser> {
        let mut parser = Parser::new();
        parser.set_language(&self.language)?;
        Ok(parser)
    }

    /// Find a function definition node by name anywhere in the file.
    ///
    /// Returns the first match in document order. Methods count: a CFG
    /// request for "save" finds `Order.save` if that is the only `save`.
    pub fn find_function<'a>(
        &self,
        parsed: &'a ParsedFile,
        name: &str,
    ) -> anyhow::Result<Option<tree_sitter::Node<'a>>> {
        let query = Query::new(&self.language, FUNCTION_QUERY)?;
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&query, parsed.tree.root_node(), &parsed.source[..]);

        let mut best: Option<tree_sitter::Node> = None;
        while let Some(m) = matches.next() {
            let mut func_node = None;
            let mut func_name = None;

            for capture in m.captures {
                let capture_name = query.capture_names()[capture.index as usize];
                match capture_name {
                    "function" => func_node = Some(capture.node),
                    "func_name" => func_name = Some(parsed.node_text(capture.node)),
                    _ => {}
                }
            }

            if let (Some(node), Some(found)) = (func_node, func_name) {
                if found == name {
                    match best {
                        Some(b) if b.start_byte() <= node.start_byte() => {}
                        _ => best = Some(node),
                    }
                }
            }
        }

        Ok(best)
    }
}

impl Default for PythonFrontend {
    fn default() -> Self {
        Self::new()
    }
}

impl Frontend for PythonFrontend {
    fn language_id(&self) -> &'static str {
        "python"
    }

    fn file_extensions(&self) -> &'static [&'static str] {
        &["py"]
    }

    fn parse(&self, path: &Path, source: &[u8]) -> anyhow::Result<ParsedFile> {
        let mut parser = self.create_parser()?;
        let tree = parser
            .parse(source, None)
            .ok_or_else(|| anyhow::anyhow!("failed to parse Python source: {}", path.display()))?;

        Ok(ParsedFile {
            tree,
            source: source.to_vec(),
            path: path.to_string_lossy().to_string(),
        })
    }
}
