// This module defines the error types for kernel generation using the thiserror crate.
// GenError covers every way a generation run can fail: a template placeholder with no bound
// value, a malformed template, an operator missing from one backend's lowering table, a
// duplicated label, an unsupported arity, a signature no renderer has a template for, and
// the final write of the unit. Generation is side-effect free until that write, so every
// error aborts the run with no partial output. GenResult<T> is the matching alias.

//! Error types for kernel generation.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for a generation run.
#[derive(Error, Debug)]
pub enum GenError {
    #[error("Template placeholder `${{{key}}}` has no value")]
    MissingPlaceholder { key: String },

    #[error("Malformed template: {reason}")]
    MalformedTemplate { reason: String },

    #[error("Operator `{label}` has no {backend} lowering")]
    CatalogMismatch {
        label: String,
        backend: &'static str,
    },

    #[error("Operator `{label}` is defined more than once")]
    DuplicateOperator { label: String },

    #[error("Operator `{label}` has arity {arity}; only binary and ternary operators are supported")]
    InvalidArity { label: String, arity: usize },

    #[error("No {backend} kernel template for `{label}` with signature {signature}")]
    UnsupportedSignature {
        label: String,
        signature: String,
        backend: &'static str,
    },

    #[error("Failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for generation operations.
pub type GenResult<T> = Result<T, GenError>;
