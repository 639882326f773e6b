//! Error taxonomy shared across the masklab crates.
//!
//! Defined in `masklab-core` so every layer can classify failures the same
//! way: input problems abort the initiating operation, ledger-write problems
//! are logged and swallowed, integrity problems are always fatal.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the metrics engine, the stores, and the classroom layer.
#[derive(Debug, Error)]
pub enum TrainerError {
    /// The two volumes do not share their first three spatial dimensions.
    #[error("shape mismatch: {left:?} vs {right:?}")]
    ShapeMismatch {
        left: [usize; 3],
        right: [usize; 3],
    },

    /// The path does not look like a supported volume file.
    #[error("not a volume file: {0}")]
    NotAVolume(PathBuf),

    /// A required input path is missing.
    #[error("missing input: {0}")]
    MissingInput(PathBuf),

    /// The codec recognizes the file but cannot introspect this format.
    #[error("format not introspectable by this codec: {0}")]
    Unsupported(PathBuf),

    /// A file exists but its contents cannot be parsed.
    #[error("malformed record {path}: {detail}")]
    Malformed { path: PathBuf, detail: String },

    /// An operation precondition failed; no partial state was created.
    #[error("{0}")]
    Validation(String),

    /// A filesystem copy/write failed mid-operation.
    #[error("storage error at {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// One redundant ledger view could not be written.
    #[error("ledger write failed at {path}: {source}")]
    LedgerWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A downloaded artifact did not match its published digest.
    #[error("integrity failure: expected sha256 {expected}, got {actual}")]
    Integrity { expected: String, actual: String },

    /// A network operation failed or timed out.
    #[error("network error: {0}")]
    Network(String),
}

impl TrainerError {
    /// Returns `true` if this failure must never block the training
    /// workflow (it is logged for diagnostics instead).
    pub fn is_swallowable(&self) -> bool {
        matches!(self, TrainerError::LedgerWrite { .. })
    }

    /// Returns `true` if skipping the offending record and continuing the
    /// surrounding aggregate operation is the correct response.
    pub fn is_skippable(&self) -> bool {
        matches!(
            self,
            TrainerError::Malformed { .. } | TrainerError::Unsupported(_)
        )
    }

    /// Shorthand for wrapping an I/O failure at a known path.
    pub fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        TrainerError::Storage {
            path: path.into(),
            source,
        }
    }
}
