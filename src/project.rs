//! Project-wide analysis.
//!
//! Scans a directory tree, analyzes every source file, and aggregates
//! summary statistics, schema facts, and an architecture-pattern guess.
//! Files are independent, so analysis runs on a rayon pool; a failed
//! file is logged and excluded, never fatal to the scan.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::analysis::{FileAnalysis, FileAnalyzer};
use crate::schema::SchemaOutput;

/// Directory names excluded from scans: virtual envs, caches, VCS, and
/// dependency-manager directories.
const EXCLUDED_DIRS: &[&str] = &[
    "venv",
    "env",
    ".venv",
    "__pycache__",
    ".git",
    "node_modules",
    ".idea",
    ".vscode",
];

/// Default architecture label when no heuristic matches.
const DEFAULT_PATTERN: &str = "Custom Architecture";

/// Aggregate counts over a whole project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectSummary {
    pub total_files: usize,
    pub total_classes: usize,
    pub total_functions: usize,
    pub total_control_flow_graphs: usize,
    /// Mean cyclomatic complexity across all graphs, rounded to 2
    /// decimal places. 0.0 when there are no graphs.
    pub average_cyclomatic_complexity: f64,
    pub total_tables: usize,
    pub total_relationships: usize,
}

/// Result of a project scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectAnalysis {
    pub root: String,
    pub files: Vec<FileAnalysis>,
    pub schema: SchemaOutput,
    pub architecture_pattern: String,
    pub summary: ProjectSummary,
}

/// Analyzes every source file under a root directory.
pub struct ProjectAnalyzer {
    root: PathBuf,
}

impl ProjectAnalyzer {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Enumerate analyzable files, skipping excluded directories.
    pub fn scan_files(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();
        for entry in WalkDir::new(&self.root)
            .into_iter()
            .filter_entry(|e| {
                if e.depth() == 0 {
                    return true;
                }
                let name = e.file_name().to_string_lossy();
                if e.file_type().is_dir()
                    && (name.starts_with('.') || EXCLUDED_DIRS.contains(&name.as_ref()))
                {
                    return false;
                }
                true
            })
            .flatten()
        {
            if entry.file_type().is_file() {
                let path = entry.path();
                let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
                if crate::parser::frontend_for(ext).is_some() {
                    files.push(path.to_path_buf());
                }
            }
        }
        files.sort();
        files
    }

    /// Analyze the whole project.
    ///
    /// Per-file read or parse failures are logged and excluded from the
    /// aggregate; they never abort the scan.
    pub fn analyze(&self) -> ProjectAnalysis {
        let files = self.scan_files();

        let mut results: Vec<FileAnalysis> = files
            .par_iter()
            .filter_map(|path| {
                let source = match std::fs::read(path) {
                    Ok(s) => s,
                    Err(e) => {
                        eprintln!("Warning: cannot read {}: {}", path.display(), e);
                        return None;
                    }
                };
                let analyzer = FileAnalyzer::new();
                match analyzer.analyze(path, &source) {
                    Ok(analysis) => Some(analysis),
                    Err(e) => {
                        eprintln!("Warning: skipping file: {}", e);
                        None
                    }
                }
            })
            .collect();

        // Deterministic ordering; consumers key by path anyway
        results.sort_by(|a, b| a.path.cmp(&b.path));

        let mut schema = SchemaOutput::default();
        for analysis in &results {
            if let Some(s) = &analysis.schema {
                schema.merge(s.clone());
            }
        }

        let architecture_pattern = detect_architecture(&results);
        let summary = summarize(&results, &schema);

        ProjectAnalysis {
            root: self.root.to_string_lossy().to_string(),
            files: results,
            schema,
            architecture_pattern,
            summary,
        }
    }
}

fn summarize(results: &[FileAnalysis], schema: &SchemaOutput) -> ProjectSummary {
    let total_classes = results.iter().map(|r| r.classes.len()).sum();
    let total_functions = results.iter().map(|r| r.functions.len()).sum();
    let total_graphs: usize = results.iter().map(|r| r.control_flow_graphs.len()).sum();

    let average = if total_graphs > 0 {
        let sum: u64 = results
            .iter()
            .flat_map(|r| &r.control_flow_graphs)
            .map(|g| g.cyclomatic_complexity as u64)
            .sum();
        round2(sum as f64 / total_graphs as f64)
    } else {
        0.0
    };

    ProjectSummary {
        total_files: results.len(),
        total_classes,
        total_functions,
        total_control_flow_graphs: total_graphs,
        average_cyclomatic_complexity: average,
        total_tables: schema.tables.len(),
        total_relationships: schema.relationships.len(),
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Ordered naming-convention heuristics; first match wins.
fn detect_architecture(results: &[FileAnalysis]) -> String {
    let file_names: BTreeSet<&str> = results.iter().map(|r| r.file_name.as_str()).collect();
    let dir_names: BTreeSet<String> = results
        .iter()
        .filter_map(|r| {
            Path::new(&r.path)
                .parent()
                .and_then(|p| p.file_name())
                .map(|n| n.to_string_lossy().to_string())
        })
        .collect();

    let imports_module = |needle: &str| {
        results
            .iter()
            .flat_map(|r| &r.imports)
            .any(|i| i.module == needle || i.module.starts_with(&format!("{}.", needle)))
    };

    if file_names.contains("models.py")
        && file_names.contains("views.py")
        && file_names.contains("urls.py")
    {
        return "Django MVT".to_string();
    }

    if (file_names.contains("app.py") || file_names.contains("__init__.py"))
        && imports_module("flask")
    {
        return "Flask Application".to_string();
    }

    if imports_module("fastapi") {
        return "FastAPI Application".to_string();
    }

    if dir_names.contains("controllers")
        && dir_names.contains("services")
        && dir_names.contains("models")
    {
        return "Layered Architecture".to_string();
    }

    DEFAULT_PATTERN.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, content: &str) {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_scan_skips_excluded_dirs() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "app.py", "x = 1\n");
        write(temp.path(), "venv/lib.py", "x = 1\n");
        write(temp.path(), "__pycache__/app.py", "x = 1\n");
        write(temp.path(), "src/util.py", "x = 1\n");
        write(temp.path(), "README.md", "docs\n");

        let files = ProjectAnalyzer::new(temp.path()).scan_files();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.strip_prefix(temp.path()).unwrap().to_string_lossy().to_string())
            .collect();

        assert_eq!(names.len(), 2);
        assert!(names.contains(&"app.py".to_string()));
        assert!(names.contains(&"src/util.py".to_string()));
    }

    #[test]
    fn test_bad_file_does_not_abort_scan() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "good_one.py", "def a():\n    return 1\n");
        write(temp.path(), "good_two.py", "def b():\n    return 2\n");
        write(temp.path(), "broken.py", "def broken(:\n");

        let analysis = ProjectAnalyzer::new(temp.path()).analyze();

        // Two valid files analyzed, the broken one excluded
        assert_eq!(analysis.summary.total_files, 2);
        assert!(analysis.files.iter().all(|f| !f.path.contains("broken")));
    }

    #[test]
    fn test_summary_and_average_complexity() {
        let temp = TempDir::new().unwrap();
        // complexity 1
        write(temp.path(), "flat.py", "def a():\n    return 1\n");
        // complexity 2
        write(
            temp.path(),
            "branchy.py",
            "def b(x):\n    if x:\n        return 1\n    return 0\n",
        );

        let analysis = ProjectAnalyzer::new(temp.path()).analyze();
        let summary = &analysis.summary;

        assert_eq!(summary.total_files, 2);
        assert_eq!(summary.total_functions, 2);
        assert_eq!(summary.total_control_flow_graphs, 2);
        assert_eq!(summary.average_cyclomatic_complexity, 1.5);
    }

    #[test]
    fn test_django_pattern_detected() {
        let temp = TempDir::new().unwrap();
        write(
            temp.path(),
            "app/models.py",
            "from django.db import models\n\nclass Item(models.Model):\n    name = models.CharField(max_length=10)\n",
        );
        write(temp.path(), "app/views.py", "def index(request):\n    return None\n");
        write(temp.path(), "app/urls.py", "urlpatterns = []\n");

        let analysis = ProjectAnalyzer::new(temp.path()).analyze();
        assert_eq!(analysis.architecture_pattern, "Django MVT");
        assert_eq!(analysis.summary.total_tables, 1);
    }

    #[test]
    fn test_flask_pattern_requires_import() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "app.py", "import flask\n\napp = flask.Flask(__name__)\n");

        let analysis = ProjectAnalyzer::new(temp.path()).analyze();
        assert_eq!(analysis.architecture_pattern, "Flask Application");
    }

    #[test]
    fn test_default_pattern() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "script.py", "print('hi')\n");

        let analysis = ProjectAnalyzer::new(temp.path()).analyze();
        assert_eq!(analysis.architecture_pattern, DEFAULT_PATTERN);
    }

    #[test]
    fn test_schema_aggregated_across_model_files() {
        let temp = TempDir::new().unwrap();
        write(
            temp.path(),
            "a/models.py",
            "class User(models.Model):\n    name = models.CharField()\n",
        );
        write(
            temp.path(),
            "b/models.py",
            "class Post(models.Model):\n    author = models.ForeignKey('User', on_delete=models.CASCADE)\n",
        );

        let analysis = ProjectAnalyzer::new(temp.path()).analyze();
        assert_eq!(analysis.summary.total_tables, 2);
        assert_eq!(analysis.summary.total_relationships, 1);
    }
}
