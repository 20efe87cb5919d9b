//! # jitbench-db: Interpreted vs JIT-Specialized Procedure Benchmark
//!
//! **Version**: 0.1.0
//!
//! jitbench-db answers one question: how much faster is a JIT-specialized SUM
//! over a 2-D `float64` grid than the straightforward reference loop? A driver
//! opens a [`Session`], calls `SELECT prepare()` to build both procedures and
//! `SELECT measure()` to time them on a fresh random grid, and reads back the
//! speedup ratio.
//!
//! ## Design Principles
//!
//! - **Fail loudly**: a missing or failed compile is an error, never a silent
//!   fallback to the reference path
//! - **Construct once**: procedures live in an explicit [`BenchContext`], built
//!   by the first `prepare()` and reused after
//! - **Like for like**: both procedures see the same input; the accelerated
//!   kernel's first-call specialization happens outside the timed window
//!
//! ## Example Usage
//!
//! ```rust
//! use jitbench_db::{BenchConfig, Session};
//!
//! let mut session = Session::open(BenchConfig::default().seed(42))?;
//! let status = session.execute("SELECT prepare()")?;
//! assert_eq!(status.as_i64(), Some(0));
//!
//! let ratio = session.execute("SELECT measure()")?;
//! assert!(ratio.as_f64().is_some_and(|r| r.is_finite() && r > 0.0));
//! session.commit()?;
//! session.close();
//! # Ok::<(), jitbench_db::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub mod bench;
pub mod config;
pub mod error;
pub mod grid;
pub mod kernel;
pub mod query;
pub mod session;

pub use bench::{BenchContext, Measurement, STATUS_OK};
pub use config::BenchConfig;
pub use error::{Error, Result};
pub use grid::{ElementType, Grid, Layout};
pub use kernel::{CompiledSum, InterpretedSum, JitCompiler, Reduction, Signature};
pub use session::{Session, Value};

/// Backend selection strategy for the accelerated kernel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    /// Pick the best available backend (currently SIMD lanes)
    #[default]
    CostBased,
    /// Force GPU execution (unavailable in this build; compiling fails)
    Gpu,
    /// Force SIMD lane-parallel execution
    Simd,
}

impl Backend {
    /// Lowercase backend name, as accepted by [`FromStr`]
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::CostBased => "cost_based",
            Self::Gpu => "gpu",
            Self::Simd => "simd",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cost_based" | "costbased" | "auto" => Ok(Self::CostBased),
            "gpu" => Ok(Self::Gpu),
            "simd" => Ok(Self::Simd),
            other => Err(format!(
                "unknown backend '{other}' (expected cost_based, gpu or simd)"
            )),
        }
    }
}
