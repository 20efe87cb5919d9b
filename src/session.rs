//! Driver-facing session
//!
//! A [`Session`] plays the part of a database connection: open it with a
//! config, send `SELECT prepare()` and `SELECT measure()`, read back the
//! values, commit, close. Every error from the stages propagates unchanged.

use std::fmt;

use serde::Serialize;
use tracing::{debug, info};

use crate::bench::BenchContext;
use crate::config::BenchConfig;
use crate::query::{CallPlan, Procedure, QueryEngine};
use crate::Result;

/// Scalar returned by a procedure call
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// Integer result (`prepare()` status)
    Int(i64),
    /// Float result (`measure()` speedup ratio)
    Float(f64),
}

impl Value {
    /// Integer payload, if this is an `Int`
    #[must_use]
    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::Float(_) => None,
        }
    }

    /// Float payload, if this is a `Float`
    #[must_use]
    pub const fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(_) => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
        }
    }
}

/// Open connection to the benchmark procedures
pub struct Session {
    engine: QueryEngine,
    context: BenchContext,
    statements: u64,
}

impl Session {
    /// Open a session
    ///
    /// # Errors
    /// Returns `Config` if the config fails validation
    pub fn open(config: BenchConfig) -> Result<Self> {
        let (rows, cols) = config.shape();
        let backend = config.backend_value();
        let context = BenchContext::new(config)?;
        info!(rows, cols, %backend, "session opened");
        Ok(Self {
            engine: QueryEngine::new(),
            context,
            statements: 0,
        })
    }

    /// Parse and run one procedure call
    ///
    /// # Errors
    /// Parse errors from [`QueryEngine::parse`], and any error from the
    /// called stage (`SetupFailed`, `MissingDependency`, ...)
    pub fn execute(&mut self, sql: &str) -> Result<Value> {
        let plan = self.engine.parse(sql)?;
        self.statements += 1;
        debug!(sql, procedure = %plan.procedure, "executing");
        self.call(&plan)
    }

    /// Run an already-parsed call
    ///
    /// # Errors
    /// As [`execute`](Self::execute), minus parse errors
    pub fn call(&mut self, plan: &CallPlan) -> Result<Value> {
        match plan.procedure {
            Procedure::Prepare => self.context.prepare().map(|status| Value::Int(i64::from(status))),
            Procedure::Measure => self.context.measure().map(Value::Float),
        }
    }

    /// Commit the current transaction
    ///
    /// The procedures write nothing durable, so this only marks the boundary.
    ///
    /// # Errors
    /// Never fails today; kept fallible for driver symmetry
    pub fn commit(&mut self) -> Result<()> {
        debug!(statements = self.statements, "commit");
        Ok(())
    }

    /// Statements executed so far
    #[must_use]
    pub const fn statement_count(&self) -> u64 {
        self.statements
    }

    /// Benchmark state behind this session
    #[must_use]
    pub const fn context(&self) -> &BenchContext {
        &self.context
    }

    /// Mutable benchmark state, for callers needing the full [`Measurement`](crate::Measurement)
    pub fn context_mut(&mut self) -> &mut BenchContext {
        &mut self.context
    }

    /// Close the session, dropping the prepared procedures
    pub fn close(self) {
        info!(statements = self.statements, "session closed");
    }
}
