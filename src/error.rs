//! Error taxonomy for analysis operations.
//!
//! Single-file and single-function entry points surface these to the
//! caller. Project scans catch them per file and keep going.

use thiserror::Error;

/// Errors surfaced by analysis entry points.
#[derive(Debug, Error)]
pub enum AnalyzeError {
    /// The source could not be parsed by the target grammar.
    #[error("syntax error in {file}: {message}")]
    Parse { file: String, message: String },

    /// A CFG was requested for a function that does not exist in the file.
    /// Distinct from parse failure: the file parsed fine, the name is wrong.
    #[error("function '{function}' not found in {file}")]
    FunctionNotFound { function: String, file: String },

    /// The file could not be read from storage.
    #[error("cannot read {file}: {source}")]
    Io {
        file: String,
        #[source]
        source: std::io::Error,
    },
}

impl AnalyzeError {
    /// Build a parse error for a file.
    pub fn parse(file: impl Into<String>, message: impl Into<String>) -> Self {
        AnalyzeError::Parse {
            file: file.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_file() {
        let err = AnalyzeError::parse("app/models.py", "unexpected indent");
        assert!(err.to_string().contains("app/models.py"));
        assert!(err.to_string().contains("unexpected indent"));

        let err = AnalyzeError::FunctionNotFound {
            function: "handle".to_string(),
            file: "views.py".to_string(),
        };
        assert!(err.to_string().contains("'handle'"));
        assert!(err.to_string().contains("views.py"));
    }
}
