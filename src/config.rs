//! Benchmark configuration
//!
//! Loaded from JSON (every field optional) or built in code:
//!
//! ```
//! use jitbench_db::{Backend, BenchConfig};
//!
//! let config = BenchConfig::default().rows(50).cols(20).seed(7).backend(Backend::Simd);
//! assert_eq!(config.shape(), (50, 20));
//!
//! let from_json = BenchConfig::from_json_str(r#"{ "rows": 50, "cols": 20 }"#).unwrap();
//! assert_eq!(from_json.shape(), (50, 20));
//! assert_eq!(from_json.seed_value(), None);
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Backend, Error, Result};

/// Rows of the sample input grid
pub const DEFAULT_ROWS: usize = 100;

/// Columns of the sample input grid
pub const DEFAULT_COLS: usize = 100;

/// Shape, seed and backend for one benchmark session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BenchConfig {
    rows: usize,
    cols: usize,
    seed: Option<u64>,
    backend: Backend,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            rows: DEFAULT_ROWS,
            cols: DEFAULT_COLS,
            seed: None,
            backend: Backend::CostBased,
        }
    }
}

impl BenchConfig {
    /// Set the number of rows of the generated grid
    #[must_use]
    pub const fn rows(mut self, rows: usize) -> Self {
        self.rows = rows;
        self
    }

    /// Set the number of columns of the generated grid
    #[must_use]
    pub const fn cols(mut self, cols: usize) -> Self {
        self.cols = cols;
        self
    }

    /// Seed the input generator (reproducible grids)
    #[must_use]
    pub const fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set the backend the accelerated kernel is compiled for
    #[must_use]
    pub const fn backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    /// `(rows, cols)` of the generated grid
    #[must_use]
    pub const fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Input seed, if fixed
    #[must_use]
    pub const fn seed_value(&self) -> Option<u64> {
        self.seed
    }

    /// Requested backend
    #[must_use]
    pub const fn backend_value(&self) -> Backend {
        self.backend
    }

    /// Check that the grid shape is addressable
    ///
    /// # Errors
    /// Returns `Config` if `rows * cols` overflows `usize`
    pub fn validate(&self) -> Result<()> {
        self.rows
            .checked_mul(self.cols)
            .map(|_| ())
            .ok_or_else(|| Error::Config(format!("grid {}x{} is too large", self.rows, self.cols)))
    }

    /// Parse a JSON config; missing fields take their defaults
    ///
    /// # Errors
    /// Returns `Json` on malformed input or unknown fields, `Config` if the
    /// result fails [`validate`](Self::validate)
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a JSON config file
    ///
    /// # Errors
    /// Returns `Io` if the file cannot be read, otherwise as
    /// [`from_json_str`](Self::from_json_str)
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_100x100_cost_based() {
        let config = BenchConfig::default();
        assert_eq!(config.shape(), (100, 100));
        assert_eq!(config.seed_value(), None);
        assert_eq!(config.backend_value(), Backend::CostBased);
    }

    #[test]
    fn test_from_json_full() {
        let config = BenchConfig::from_json_str(
            r#"{ "rows": 8, "cols": 4, "seed": 99, "backend": "simd" }"#,
        )
        .unwrap();
        assert_eq!(config, BenchConfig::default().rows(8).cols(4).seed(99).backend(Backend::Simd));
    }

    #[test]
    fn test_from_json_empty_object_uses_defaults() {
        assert_eq!(BenchConfig::from_json_str("{}").unwrap(), BenchConfig::default());
    }

    #[test]
    fn test_from_json_rejects_unknown_fields() {
        let err = BenchConfig::from_json_str(r#"{ "trials": 10 }"#).unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn test_validate_overflow() {
        let config = BenchConfig::default().rows(usize::MAX).cols(2);
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_from_path_missing_file() {
        let err = BenchConfig::from_path("/nonexistent/jitbench.json").unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_json_roundtrip_backend_names() {
        let json = serde_json::to_string(&BenchConfig::default().backend(Backend::Gpu)).unwrap();
        assert!(json.contains(r#""backend":"gpu""#));
    }
}
