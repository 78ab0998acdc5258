//! Output formatting for analysis results.
//!
//! Supports two output formats:
//! - Pretty: colored terminal output for human readability
//! - JSON: structured output for programmatic consumption

use colored::*;
use serde::Serialize;

use crate::analysis::{ClassInfo, FileAnalysis, FunctionInfo};
use crate::cfg::{ControlFlowGraph, NodeKind};
use crate::project::ProjectAnalysis;
use crate::schema::SchemaOutput;

/// Write any serializable result as pretty-printed JSON.
pub fn write_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}

/// Write a single-file analysis in pretty (human-readable) format.
pub fn write_pretty_file(analysis: &FileAnalysis) {
    write_header();

    print!("  {}", "File: ".dimmed());
    println!("{}", analysis.path);
    println!();

    if !analysis.imports.is_empty() {
        println!("  {} ({}):", "Imports".bold(), analysis.imports.len());
        for import in &analysis.imports {
            print!("    {}", import.module.blue());
            if let Some(name) = &import.name {
                print!(" {} {}", "->".dimmed(), name);
            }
            if let Some(alias) = &import.alias {
                print!(" {} {}", "as".dimmed(), alias);
            }
            println!("{}", format!("  :{}", import.line).dimmed());
        }
        println!();
    }

    if !analysis.classes.is_empty() {
        println!("  {} ({}):", "Classes".bold(), analysis.classes.len());
        for class in &analysis.classes {
            write_class(class);
        }
        println!();
    }

    if !analysis.functions.is_empty() {
        println!("  {} ({}):", "Functions".bold(), analysis.functions.len());
        for func in &analysis.functions {
            write_function(func, "    ");
        }
        println!();
    }

    if !analysis.control_flow_graphs.is_empty() {
        println!(
            "  {} ({}):",
            "Control flow".bold(),
            analysis.control_flow_graphs.len()
        );
        for graph in &analysis.control_flow_graphs {
            write_cfg_summary(graph);
        }
        println!();
    }

    if let Some(schema) = &analysis.schema {
        if !schema.is_empty() {
            write_schema(schema);
            println!();
        }
    }
}

/// Write a project analysis in pretty format.
pub fn write_pretty_project(analysis: &ProjectAnalysis) {
    write_header();

    print!("  {}", "Project: ".dimmed());
    println!("{}", analysis.root);
    print!("  {}", "Architecture: ".dimmed());
    println!("{}", analysis.architecture_pattern.cyan().bold());
    println!();

    let summary = &analysis.summary;
    println!("  {}", "Summary:".bold());
    println!("    {:<22} {}", "Files analyzed", summary.total_files);
    println!("    {:<22} {}", "Classes", summary.total_classes);
    println!("    {:<22} {}", "Functions", summary.total_functions);
    println!(
        "    {:<22} {}",
        "Control-flow graphs", summary.total_control_flow_graphs
    );
    print!("    {:<22} ", "Avg complexity");
    write_colored_complexity(summary.average_cyclomatic_complexity);
    println!();
    println!("    {:<22} {}", "Schema tables", summary.total_tables);
    println!(
        "    {:<22} {}",
        "Relationships", summary.total_relationships
    );
    println!();

    if !analysis.schema.is_empty() {
        write_schema(&analysis.schema);
        println!();
    }

    for file in &analysis.files {
        print!("    {}", file.path.blue());
        println!(
            "{}",
            format!(
                "  ({} classes, {} functions)",
                file.classes.len(),
                file.functions.len()
            )
            .dimmed()
        );
    }
    println!();
}

/// Write a single control-flow graph in pretty format.
pub fn write_pretty_cfg(graph: &ControlFlowGraph) {
    write_header();

    print!("  {}", "Function: ".dimmed());
    print!("{}", graph.function_name.cyan().bold());
    println!(
        "{}",
        format!(
            "  {}:{}-{}",
            graph.file_path, graph.line_start, graph.line_end
        )
        .dimmed()
    );
    println!();

    println!("    {:<22} {}", "Nodes", graph.node_count);
    println!("    {:<22} {}", "Edges", graph.edges.len());
    println!("    {:<22} {}", "Decisions", graph.decision_count);
    print!("    {:<22} ", "Complexity");
    write_colored_complexity(graph.cyclomatic_complexity as f64);
    println!();
    println!();

    for node in &graph.nodes {
        write_node_tag(node.kind);
        print!("  {:<10}", node.id.dimmed());
        print!("{}", node.label);
        println!("{}", format!("  :{}", node.source_position.line).dimmed());
    }
    println!();

    for edge in &graph.edges {
        print!("    {} {} {}", edge.source.dimmed(), "->".dimmed(), edge.target.dimmed());
        let label = edge.label_str();
        if !label.is_empty() {
            print!("  {}", label.yellow());
        }
        println!();
    }
    println!();
}

fn write_header() {
    println!();
    print!("  ");
    print!("{}", "flowscope".cyan().bold());
    println!(" v{}", env!("CARGO_PKG_VERSION"));
    println!();
}

fn write_class(class: &ClassInfo) {
    print!("    {}", class.name.cyan());
    if !class.bases.is_empty() {
        print!("{}", format!("({})", class.bases.join(", ")).dimmed());
    }
    println!("{}", format!("  :{}", class.line).dimmed());

    for method in &class.methods {
        write_function(method, "      ");
    }
}

fn write_function(func: &FunctionInfo, indent: &str) {
    print!("{}", indent);
    if func.is_async {
        print!("{} ", "async".yellow());
    }
    print!("{}", func.name);
    print!("{}", format!("({})", func.args.join(", ")).dimmed());
    if let Some(returns) = &func.returns {
        print!("{}", format!(" -> {}", returns).dimmed());
    }
    println!("{}", format!("  :{}", func.line).dimmed());
}

fn write_cfg_summary(graph: &ControlFlowGraph) {
    print!("    {:<24}", graph.function_name);
    print!("{}", format!("{} nodes, ", graph.node_count).dimmed());
    print!("{}", format!("{} decisions, ", graph.decision_count).dimmed());
    print!("complexity ");
    write_colored_complexity(graph.cyclomatic_complexity as f64);
    println!();
}

fn write_schema(schema: &SchemaOutput) {
    println!("  {} ({}):", "Schema tables".bold(), schema.tables.len());
    for table in &schema.tables {
        print!("    {}", table.name.cyan().bold());
        println!("{}", format!("  {}:{}", table.file, table.line).dimmed());
        for field in &table.fields {
            print!("      {:<20}", field.name);
            print!("{:<18}", field.declared_type.dimmed());
            if field.is_primary_key {
                print!(" {}", "PK".green());
            }
            if field.is_foreign_key {
                let target = field.foreign_key_target.as_deref().unwrap_or("?");
                print!(" {}", format!("FK -> {}", target).yellow());
            }
            if field.is_unique {
                print!(" {}", "UNIQUE".blue());
            }
            println!();
        }
    }

    if !schema.relationships.is_empty() {
        println!();
        println!(
            "  {} ({}):",
            "Relationships".bold(),
            schema.relationships.len()
        );
        for rel in &schema.relationships {
            print!("    {}", rel.from_table);
            print!("{}", format!(".{}", rel.from_field).dimmed());
            print!(" {} ", "->".dimmed());
            print!("{}", rel.to_table);
            print!("{}", format!(".{}", rel.to_field).dimmed());
            println!(
                "{}",
                format!("  ({}, on_delete={})", rel.cardinality, rel.on_delete).dimmed()
            );
        }
    }
}

fn write_colored_complexity(c: f64) {
    let text = if c.fract() == 0.0 {
        format!("{}", c as u64)
    } else {
        format!("{:.2}", c)
    };
    match c {
        c if c <= 5.0 => print!("{}", text.green()),
        c if c <= 10.0 => print!("{}", text.yellow()),
        _ => print!("{}", text.red()),
    }
}

fn write_node_tag(kind: NodeKind) {
    match kind {
        NodeKind::Start => print!("    {} ", "START   ".green()),
        NodeKind::End => print!("    {} ", "END     ".green()),
        NodeKind::Process => print!("    {} ", "PROCESS ".blue()),
        NodeKind::Decision => print!("    {} ", "DECISION".yellow()),
    }
}
