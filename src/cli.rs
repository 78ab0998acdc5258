//! Command-line interface for flowscope.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::analysis::FileAnalyzer;
use crate::error::AnalyzeError;
use crate::parser;
use crate::project::ProjectAnalyzer;
use crate::report;

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILED: i32 = 1;
pub const EXIT_ERROR: i32 = 2;

/// Static analysis backend for code visualization.
///
/// Flowscope extracts structured facts from source files: imports,
/// class and function inventories, per-function control-flow graphs,
/// and (for ORM model files) inferred relational schemas. Output is
/// consumed by flowchart and entity-relationship renderers.
#[derive(Parser)]
#[command(name = "flowscope")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyze a single source file
    File(FileArgs),
    /// Analyze every source file under a directory
    Project(ProjectArgs),
    /// Build the control-flow graph of one function
    Cfg(CfgArgs),
}

/// Arguments for the file command.
#[derive(Parser)]
pub struct FileArgs {
    /// Path to the source file
    pub path: PathBuf,

    /// Output format: pretty or json
    #[arg(short, long, default_value = "pretty")]
    pub format: String,
}

/// Arguments for the project command.
#[derive(Parser)]
pub struct ProjectArgs {
    /// Root directory to scan
    pub path: PathBuf,

    /// Output format: pretty or json
    #[arg(short, long, default_value = "pretty")]
    pub format: String,
}

/// Arguments for the cfg command.
#[derive(Parser)]
pub struct CfgArgs {
    /// Path to the source file
    pub path: PathBuf,

    /// Name of the function to graph
    pub function: String,

    /// Output format: pretty or json
    #[arg(short, long, default_value = "pretty")]
    pub format: String,
}

fn validate_format(format: &str) -> Option<i32> {
    if format != "pretty" && format != "json" {
        eprintln!(
            "Error: invalid format {:?}, must be 'pretty' or 'json'",
            format
        );
        return Some(EXIT_ERROR);
    }
    None
}

fn read_source(path: &Path) -> Result<Vec<u8>, AnalyzeError> {
    std::fs::read(path).map_err(|e| AnalyzeError::Io {
        file: path.to_string_lossy().to_string(),
        source: e,
    })
}

/// Run the file command.
pub fn run_file(args: &FileArgs) -> anyhow::Result<i32> {
    parser::register_frontends();

    if let Some(code) = validate_format(&args.format) {
        return Ok(code);
    }

    let source = match read_source(&args.path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {}", e);
            return Ok(EXIT_ERROR);
        }
    };

    let analysis = match FileAnalyzer::new().analyze(&args.path, &source) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("Error: {}", e);
            return Ok(EXIT_FAILED);
        }
    };

    match args.format.as_str() {
        "json" => report::write_json(&analysis)?,
        _ => report::write_pretty_file(&analysis),
    }

    Ok(EXIT_SUCCESS)
}

/// Run the project command.
pub fn run_project(args: &ProjectArgs) -> anyhow::Result<i32> {
    parser::register_frontends();

    if let Some(code) = validate_format(&args.format) {
        return Ok(code);
    }

    let metadata = match std::fs::metadata(&args.path) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("Error: cannot access {}: {}", args.path.display(), e);
            return Ok(EXIT_ERROR);
        }
    };
    if !metadata.is_dir() {
        eprintln!("Error: {} is not a directory", args.path.display());
        return Ok(EXIT_ERROR);
    }

    let analysis = ProjectAnalyzer::new(&args.path).analyze();

    match args.format.as_str() {
        "json" => report::write_json(&analysis)?,
        _ => report::write_pretty_project(&analysis),
    }

    Ok(EXIT_SUCCESS)
}

/// Run the cfg command.
pub fn run_cfg(args: &CfgArgs) -> anyhow::Result<i32> {
    parser::register_frontends();

    if let Some(code) = validate_format(&args.format) {
        return Ok(code);
    }

    let source = match read_source(&args.path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {}", e);
            return Ok(EXIT_ERROR);
        }
    };

    let graph = match FileAnalyzer::new().cfg_for_function(&args.path, &source, &args.function) {
        Ok(g) => g,
        Err(e) => {
            eprintln!("Error: {}", e);
            return Ok(EXIT_FAILED);
        }
    };

    match args.format.as_str() {
        "json" => report::write_json(&crate::export::graph_to_viz(&graph))?,
        _ => report::write_pretty_cfg(&graph),
    }

    Ok(EXIT_SUCCESS)
}
