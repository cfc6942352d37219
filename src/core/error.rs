//! Error taxonomy for the execution engine.
//!
//! Validation, unknown-operation and extension-load errors are fatal before
//! any task runs; reference and execution errors fail only the task that
//! raised them. Nothing is retried.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Malformed instruction set or task. Aborts the run before execution.
    #[error("missing key '{key}' in {scope}")]
    Validation { key: String, scope: String },

    /// A task names a kind the engine does not recognize.
    #[error("'{operation}' is an unknown operation in \"{task}\" task")]
    UnknownOperation { operation: String, task: String },

    /// A `$step` token names a step that has not successfully executed.
    #[error("reference in task \"{task}\" has either not been executed or does not exist")]
    Reference { task: String },

    /// No instruction set stored under the requested name.
    #[error("'{0}' instruction set was not found")]
    NotFound(String),

    /// An operation failed while executing. Fails that task only.
    #[error("{0}")]
    Execution(String),

    /// An operation requires an OS this host is not.
    #[error("'{operation}' is not supported on {os}")]
    Platform { operation: String, os: String },

    /// A configured extension could not be loaded. Fatal at engine
    /// construction: a broken extension must not masquerade as installed.
    #[error("there was a problem loading the '{name}' extension: {reason}")]
    ExtensionLoad { name: String, reason: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("archive error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message_names_key_and_scope() {
        let e = Error::Validation {
            key: "description".to_string(),
            scope: "Definition".to_string(),
        };
        assert_eq!(e.to_string(), "missing key 'description' in Definition");
    }

    #[test]
    fn test_unknown_operation_message() {
        let e = Error::UnknownOperation {
            operation: "teleport".to_string(),
            task: "beam me up".to_string(),
        };
        assert!(e.to_string().contains("teleport"));
        assert!(e.to_string().contains("beam me up"));
    }

    #[test]
    fn test_reference_message_names_requesting_task() {
        let e = Error::Reference {
            task: "cleanup".to_string(),
        };
        assert!(e.to_string().contains("\"cleanup\""));
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let e: Error = io.into();
        assert!(matches!(e, Error::Io(_)));
    }
}
