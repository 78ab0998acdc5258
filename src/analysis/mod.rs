//! Per-file fact extraction.
//!
//! A file analysis collects imports, the class inventory (with method
//! signatures, decorators, and docstrings), standalone functions, one
//! control-flow graph per function-like node, and, for files matching
//! the model-file naming convention, the inferred relational schema.

mod facts;
mod file;

pub use facts::{ClassInfo, FileAnalysis, FunctionInfo, Import, ImportKind};
pub use file::FileAnalyzer;
