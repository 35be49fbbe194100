//! Error handling for the ProMSA CLI

use promsa_core::{ErrorKind, MsaError};
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for CLI operations
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Input/Output error: {message}")]
    Io { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Parsing error in {file}: {message}")]
    Parse { file: String, message: String },

    #[error("Alignment error: {message}")]
    Alignment { message: String },

    #[error("Resource error: {message}")]
    Resource { message: String },
}

impl CliError {
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config { message: message.into() }
    }

    pub fn io<S: Into<String>>(message: S) -> Self {
        Self::Io { message: message.into() }
    }

    pub fn file_not_found(path: PathBuf) -> Self {
        Self::FileNotFound { path }
    }

    pub fn invalid_input<S: Into<String>>(message: S) -> Self {
        Self::InvalidInput { message: message.into() }
    }

    pub fn parse<S: Into<String>>(file: S, message: S) -> Self {
        Self::Parse {
            file: file.into(),
            message: message.into(),
        }
    }

    pub fn alignment<S: Into<String>>(message: S) -> Self {
        Self::Alignment { message: message.into() }
    }

    pub fn resource<S: Into<String>>(message: S) -> Self {
        Self::Resource { message: message.into() }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::io(err.to_string())
    }
}

impl From<toml::de::Error> for CliError {
    fn from(err: toml::de::Error) -> Self {
        Self::config(format!("TOML parsing error: {}", err))
    }
}

impl From<MsaError> for CliError {
    fn from(err: MsaError) -> Self {
        match (&err, err.kind()) {
            (MsaError::InvalidConfig(message), _) => Self::config(message.clone()),
            (_, ErrorKind::InvalidInput) => Self::invalid_input(err.to_string()),
            (_, ErrorKind::ResourceExhaustion) => Self::resource(err.to_string()),
            (_, ErrorKind::StructuralInvariant) => Self::alignment(err.to_string()),
        }
    }
}

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// Provide helpful error messages and suggestions
pub fn format_error_with_suggestions(error: &CliError) -> String {
    let mut message = error.to_string();

    match error {
        CliError::FileNotFound { path } => {
            message.push_str(&format!(
                "\n\nSuggestions:\n\
                 • Check that the file path is correct: {}\n\
                 • Ensure you have read permissions for the file\n\
                 • Gzipped FASTA files must end in .gz",
                path.display()
            ));
        }

        CliError::InvalidInput { .. } | CliError::Parse { .. } => {
            message.push_str(
                "\n\nSuggestions:\n\
                 • Input must be FASTA or FASTQ with unique sequence ids\n\
                 • All sequences must be DNA, RNA or protein; mixed files are rejected\n\
                 • Use --matrix to pick a similarity matrix matching the alphabet",
            );
        }

        CliError::Config { .. } => {
            message.push_str(
                "\n\nSuggestions:\n\
                 • Check your promsa.toml configuration file\n\
                 • Use 'promsa config' to print a sample configuration\n\
                 • Algorithm names are kebab-case, e.g. 'weighted-inner-product'",
            );
        }

        CliError::Resource { .. } => {
            message.push_str(
                "\n\nSuggestions:\n\
                 • Reduce the number of threads or partitions\n\
                 • Use --faster to skip the refinement stages\n\
                 • Split very long sequences or large families into smaller runs",
            );
        }

        _ => {}
    }

    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = CliError::config("test message");
        assert!(matches!(err, CliError::Config { .. }));
        assert_eq!(err.to_string(), "Configuration error: test message");
    }

    #[test]
    fn test_error_suggestions() {
        let err = CliError::file_not_found(PathBuf::from("test.fa"));
        let formatted = format_error_with_suggestions(&err);
        assert!(formatted.contains("Suggestions:"));
        assert!(formatted.contains("Check that the file path is correct"));
    }

    #[test]
    fn test_msa_error_conversion() {
        let err: CliError = MsaError::EmptyInput("no sequences".to_string()).into();
        assert!(matches!(err, CliError::InvalidInput { .. }));

        let err: CliError = MsaError::InvalidConfig("bad partitions".to_string()).into();
        assert!(matches!(err, CliError::Config { .. }));

        let err: CliError = MsaError::out_of_memory(100_000, 100_000, true).into();
        assert!(matches!(err, CliError::Resource { .. }));
        assert!(format_error_with_suggestions(&err).contains("--faster"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let cli_err: CliError = io_err.into();
        assert!(matches!(cli_err, CliError::Io { .. }));
    }
}
