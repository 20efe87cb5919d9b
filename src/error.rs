//! Error types for jitbench-db
//!
//! Every failure propagates to the driver. Nothing is retried and the
//! accelerated path never silently degrades to the reference path.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// jitbench-db error types
#[derive(Error, Debug)]
pub enum Error {
    /// Accelerated kernel could not be built (unsupported signature, unavailable backend)
    #[error("Setup failed: {0}\nNo accelerated kernel was cached")]
    SetupFailed(String),

    /// Measurement requested before the procedures were prepared
    #[error("Missing dependency: {0}\nRun `SELECT prepare()` first")]
    MissingDependency(String),

    /// Input grid does not match the compiled kernel's signature
    #[error("Shape mismatch: kernel compiled for {expected}, got {actual}")]
    ShapeMismatch {
        /// Signature the kernel was specialized for
        expected: String,
        /// Signature of the offending input
        actual: String,
    },

    /// Input grid holds a non-numeric element type
    #[error("Non-numeric element type: {0}")]
    NotNumeric(String),

    /// Accelerated duration rounded to zero; the ratio is undefined
    #[error("Accelerated duration is zero ({reference_ns} ns reference); speedup ratio undefined")]
    ZeroDuration {
        /// Reference duration that would have been divided
        reference_ns: u64,
    },

    /// Accelerated result diverged from the reference (critical bug)
    #[error("Backend equivalence failed: accelerated result != reference result\nReference: {reference}\nAccelerated: {accelerated}")]
    BackendMismatch {
        /// Reference SUM
        reference: String,
        /// Accelerated SUM
        accelerated: String,
    },

    /// Query parsing error
    #[error("SQL parse error: {0}")]
    ParseError(String),

    /// SELECT names a procedure the session does not expose
    #[error("Unknown procedure: {0}")]
    UnknownProcedure(String),

    /// Invalid input parameters
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
