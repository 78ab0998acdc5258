//! Control-flow graph construction.
//!
//! The builder walks one function's statement list and threads a
//! *frontier* through it: the set of node ids that are valid predecessors
//! for the next statement. Each frontier entry carries an optional
//! pending edge label, so a branch entry ("YES"/"NO") lands on the edge
//! actually created into the branch's first node instead of being patched
//! in afterwards.
//!
//! A builder is a per-build value: it owns its node and edge vectors and
//! a monotonic id counter, and nothing survives across builds.

use tree_sitter::Node;

use super::{
    ControlFlowGraph, EdgeKind, EdgeLabel, GraphEdge, GraphNode, NodeKind, SourcePosition,
};

/// Maximum label length for statements rendered via the generic fallback.
const MAX_LABEL_LEN: usize = 50;

/// A frontier entry: a predecessor node id plus the label the next edge
/// out of it should carry.
#[derive(Debug, Clone)]
struct Exit {
    id: String,
    label: Option<EdgeLabel>,
}

impl Exit {
    fn plain(id: String) -> Self {
        Exit { id, label: None }
    }

    fn labeled(id: String, label: EdgeLabel) -> Self {
        Exit {
            id,
            label: Some(label),
        }
    }
}

/// Builds a [`ControlFlowGraph`] for one function.
pub struct CfgBuilder<'src> {
    file_path: String,
    source: &'src [u8],
    lines: Vec<&'src str>,
    nodes: Vec<GraphNode>,
    edges: Vec<GraphEdge>,
    counter: usize,
    complexity: u32,
}

impl<'src> CfgBuilder<'src> {
    /// Build the CFG for a `function_definition` node.
    ///
    /// Never fails on syntactically valid input: statements the builder
    /// does not model degrade to generic process nodes.
    pub fn build(function_node: Node, file_path: &str, source: &'src [u8]) -> ControlFlowGraph {
        let text = std::str::from_utf8(source).unwrap_or("");
        let builder = CfgBuilder {
            file_path: file_path.to_string(),
            source,
            lines: text.lines().collect(),
            nodes: Vec::new(),
            edges: Vec::new(),
            counter: 0,
            complexity: 1,
        };
        builder.run(function_node)
    }

    fn run(mut self, function_node: Node) -> ControlFlowGraph {
        let name = function_node
            .child_by_field_name("name")
            .map(|n| self.text(n).to_string())
            .unwrap_or_else(|| "<anonymous>".to_string());
        let params = function_node
            .child_by_field_name("parameters")
            .map(|n| self.text(n).to_string())
            .unwrap_or_else(|| "()".to_string());

        let start_id = self.add_node(
            NodeKind::Start,
            format!("START: {}()", name),
            format!("def {}{}:", name, params),
            function_node,
        );

        let mut frontier = vec![Exit::plain(start_id)];
        if let Some(body) = function_node.child_by_field_name("body") {
            frontier = self.process_block(body, frontier);
        }

        let end_id = self.add_node(
            NodeKind::End,
            "END".to_string(),
            String::new(),
            function_node,
        );
        // End node position is the function's last line
        if let Some(last) = self.nodes.last_mut() {
            last.source_position.line = function_node.end_position().row + 1;
            last.source_position.column = 1;
        }
        self.connect(&frontier, &end_id);

        let decision_count = self
            .nodes
            .iter()
            .filter(|n| n.kind == NodeKind::Decision)
            .count();

        ControlFlowGraph {
            function_name: name,
            file_path: self.file_path,
            line_start: function_node.start_position().row + 1,
            line_end: function_node.end_position().row + 1,
            node_count: self.nodes.len(),
            decision_count,
            cyclomatic_complexity: self.complexity,
            nodes: self.nodes,
            edges: self.edges,
        }
    }

    // ------------------------------------------------------------------
    // Statement dispatch
    // ------------------------------------------------------------------

    fn process_block(&mut self, block: Node, frontier: Vec<Exit>) -> Vec<Exit> {
        let mut frontier = frontier;
        let mut cursor = block.walk();
        let statements: Vec<Node> = block
            .named_children(&mut cursor)
            .filter(|n| n.kind() != "comment")
            .collect();
        for stmt in statements {
            frontier = self.process_statement(stmt, frontier);
        }
        frontier
    }

    fn process_statement(&mut self, stmt: Node, frontier: Vec<Exit>) -> Vec<Exit> {
        match stmt.kind() {
            "if_statement" => self.process_if(stmt, frontier),
            "while_statement" => self.process_while(stmt, frontier),
            "for_statement" => self.process_for(stmt, frontier),
            "try_statement" => self.process_try(stmt, frontier),
            "return_statement" => self.process_return(stmt, frontier),
            "expression_statement" => self.process_simple(stmt, frontier),
            _ => self.process_generic(stmt, frontier),
        }
    }

    /// Assignments and expression statements: one process node labeled
    /// with the statement text.
    fn process_simple(&mut self, stmt: Node, frontier: Vec<Exit>) -> Vec<Exit> {
        let text = self.text(stmt).to_string();
        let id = self.add_node(NodeKind::Process, truncate(&text), text, stmt);
        self.connect(&frontier, &id);
        vec![Exit::plain(id)]
    }

    fn process_return(&mut self, stmt: Node, frontier: Vec<Exit>) -> Vec<Exit> {
        let value = stmt
            .named_child(0)
            .map(|n| self.text(n).to_string())
            .unwrap_or_else(|| "None".to_string());
        let id = self.add_node(
            NodeKind::Process,
            format!("RETURN {}", value),
            format!("return {}", value),
            stmt,
        );
        self.connect(&frontier, &id);
        vec![Exit::plain(id)]
    }

    /// Any statement kind without dedicated handling degrades to a
    /// generic process node; never an error.
    fn process_generic(&mut self, stmt: Node, frontier: Vec<Exit>) -> Vec<Exit> {
        let text = self.text(stmt).to_string();
        let id = self.add_node(NodeKind::Process, truncate(&text), text, stmt);
        self.connect(&frontier, &id);
        vec![Exit::plain(id)]
    }

    /// if/elif/else. One decision node per head; "YES" enters each
    /// consequence, "NO" chains to the next alternative. Without an else,
    /// the last decision re-enters the frontier with a pending "NO".
    fn process_if(&mut self, stmt: Node, frontier: Vec<Exit>) -> Vec<Exit> {
        self.complexity += 1;

        let condition = stmt
            .child_by_field_name("condition")
            .map(|n| self.text(n).to_string())
            .unwrap_or_else(|| "condition".to_string());
        let decision_id = self.add_node(
            NodeKind::Decision,
            format!("IF {}?", condition),
            format!("if {}:", condition),
            stmt,
        );
        self.connect(&frontier, &decision_id);

        let mut exits = Vec::new();
        if let Some(consequence) = stmt.child_by_field_name("consequence") {
            exits.extend(
                self.process_block(consequence, vec![Exit::labeled(
                    decision_id.clone(),
                    EdgeLabel::Yes,
                )]),
            );
        } else {
            exits.push(Exit::labeled(decision_id.clone(), EdgeLabel::Yes));
        }

        // Walk the alternative chain: each elif is a fresh decision
        // entered via the previous decision's "NO" edge.
        let mut prev_decision = decision_id;
        let mut has_else = false;
        let mut cursor = stmt.walk();
        let alternatives: Vec<Node> = stmt
            .children_by_field_name("alternative", &mut cursor)
            .collect();
        for alt in alternatives {
            match alt.kind() {
                "elif_clause" => {
                    self.complexity += 1;
                    let elif_condition = alt
                        .child_by_field_name("condition")
                        .map(|n| self.text(n).to_string())
                        .unwrap_or_else(|| "condition".to_string());
                    let elif_id = self.add_node(
                        NodeKind::Decision,
                        format!("IF {}?", elif_condition),
                        format!("elif {}:", elif_condition),
                        alt,
                    );
                    self.connect(
                        &[Exit::labeled(prev_decision.clone(), EdgeLabel::No)],
                        &elif_id,
                    );
                    if let Some(consequence) = alt.child_by_field_name("consequence") {
                        exits.extend(self.process_block(
                            consequence,
                            vec![Exit::labeled(elif_id.clone(), EdgeLabel::Yes)],
                        ));
                    }
                    prev_decision = elif_id;
                }
                "else_clause" => {
                    has_else = true;
                    if let Some(body) = alt.child_by_field_name("body") {
                        exits.extend(self.process_block(
                            body,
                            vec![Exit::labeled(prev_decision.clone(), EdgeLabel::No)],
                        ));
                    }
                }
                _ => {}
            }
        }

        if !has_else {
            exits.push(Exit::labeled(prev_decision, EdgeLabel::No));
        }
        exits
    }

    /// while loop: decision head, body exits wire back with "LOOP", the
    /// false exit (the decision itself) continues past the loop.
    fn process_while(&mut self, stmt: Node, frontier: Vec<Exit>) -> Vec<Exit> {
        self.complexity += 1;

        let condition = stmt
            .child_by_field_name("condition")
            .map(|n| self.text(n).to_string())
            .unwrap_or_else(|| "condition".to_string());
        let decision_id = self.add_node(
            NodeKind::Decision,
            format!("WHILE {}?", condition),
            format!("while {}:", condition),
            stmt,
        );
        self.connect(&frontier, &decision_id);

        self.process_loop_body(stmt, &decision_id, EdgeLabel::Loop);
        vec![Exit::plain(decision_id)]
    }

    /// for loop: same shape as while, back-edge labeled "NEXT".
    fn process_for(&mut self, stmt: Node, frontier: Vec<Exit>) -> Vec<Exit> {
        self.complexity += 1;

        let target = stmt
            .child_by_field_name("left")
            .map(|n| self.text(n).to_string())
            .unwrap_or_else(|| "item".to_string());
        let iterable = stmt
            .child_by_field_name("right")
            .map(|n| self.text(n).to_string())
            .unwrap_or_else(|| "iterable".to_string());
        let decision_id = self.add_node(
            NodeKind::Decision,
            format!("FOR {} in {}", target, iterable),
            format!("for {} in {}:", target, iterable),
            stmt,
        );
        self.connect(&frontier, &decision_id);

        self.process_loop_body(stmt, &decision_id, EdgeLabel::Next);
        vec![Exit::plain(decision_id)]
    }

    fn process_loop_body(&mut self, stmt: Node, decision_id: &str, back_label: EdgeLabel) {
        let body_exits = match stmt.child_by_field_name("body") {
            Some(body) => self.process_block(body, vec![Exit::plain(decision_id.to_string())]),
            None => vec![Exit::plain(decision_id.to_string())],
        };
        // Back-edge models iteration; it intentionally creates a cycle.
        // The back-label overrides any pending branch label on a body exit.
        for exit in body_exits {
            self.edges.push(GraphEdge {
                source: exit.id,
                target: decision_id.to_string(),
                label: Some(back_label),
                kind: EdgeKind::Conditional,
            });
        }
    }

    /// try/except/finally. The try body runs from the incoming frontier;
    /// every handler also runs from the incoming frontier, modeling "may
    /// jump here from any point in the try". Each handler clause is a
    /// decision point for complexity.
    fn process_try(&mut self, stmt: Node, frontier: Vec<Exit>) -> Vec<Exit> {
        let mut all_exits = match stmt.child_by_field_name("body") {
            Some(body) => self.process_block(body, frontier.clone()),
            None => frontier.clone(),
        };

        let mut cursor = stmt.walk();
        let clauses: Vec<Node> = stmt.named_children(&mut cursor).collect();
        for clause in &clauses {
            if clause.kind() == "except_clause" {
                self.complexity += 1;
                if let Some(block) = last_block_child(*clause) {
                    all_exits.extend(self.process_block(block, frontier.clone()));
                }
            }
        }

        for clause in &clauses {
            if clause.kind() == "finally_clause" {
                if let Some(block) = last_block_child(*clause) {
                    all_exits = self.process_block(block, all_exits);
                }
            }
        }

        all_exits
    }

    // ------------------------------------------------------------------
    // Node and edge emission
    // ------------------------------------------------------------------

    fn add_node(&mut self, kind: NodeKind, label: String, excerpt: String, node: Node) -> String {
        let id = format!("node_{}", self.counter);
        self.counter += 1;

        let line = node.start_position().row + 1;
        let column = node.start_position().column + 1;

        self.nodes.push(GraphNode {
            id: id.clone(),
            kind,
            label,
            source_position: SourcePosition {
                file: self.file_path.clone(),
                line,
                column,
            },
            code_excerpt: excerpt.trim().to_string(),
            context_lines: self.context_lines(line),
        });
        id
    }

    /// 3 lines before and 3 after the statement's (1-indexed) line.
    fn context_lines(&self, line: usize) -> Vec<String> {
        let start = line.saturating_sub(4);
        let end = (line + 3).min(self.lines.len());
        self.lines[start..end].iter().map(|l| l.to_string()).collect()
    }

    fn connect(&mut self, exits: &[Exit], target: &str) {
        for exit in exits {
            self.edges.push(GraphEdge {
                source: exit.id.clone(),
                target: target.to_string(),
                label: exit.label,
                kind: if exit.label.is_some() {
                    EdgeKind::Conditional
                } else {
                    EdgeKind::Sequential
                },
            });
        }
    }

    fn text(&self, node: Node) -> &str {
        node.utf8_text(self.source).unwrap_or("")
    }
}

/// Last `block` child of a clause node (except/finally bodies).
fn last_block_child(node: Node) -> Option<Node> {
    let mut cursor = node.walk();
    let mut found = None;
    for child in node.children(&mut cursor) {
        if child.kind() == "block" {
            found = Some(child);
        }
    }
    found
}

fn truncate(text: &str) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() > MAX_LABEL_LEN {
        let cut: String = flat.chars().take(MAX_LABEL_LEN).collect();
        format!("{}...", cut)
    } else {
        flat
    }
}
