//! Definition and measurement stages
//!
//! [`BenchContext`] owns everything a session needs between calls: the
//! config, the input generator, the JIT compiler, and the prepared
//! procedures. `prepare()` fills the procedures once; `measure()` refuses to
//! run until it has.
//!
//! Measurement protocol (single sample, no averaging):
//!
//! 1. generate one `rows x cols` standard-normal grid
//! 2. time the reference SUM once
//! 3. call the accelerated SUM once, untimed (first-call specialization)
//! 4. time the accelerated SUM once
//! 5. ratio = reference / accelerated

use std::hint::black_box;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::BenchConfig;
use crate::grid::Grid;
use crate::kernel::{CompiledSum, InterpretedSum, JitCompiler, Reduction, Signature};
use crate::{Error, Result};

/// Status returned by a successful `prepare()`
pub const STATUS_OK: i32 = 0;

/// Relative tolerance between reference and accelerated sums, scaled by the
/// grid's absolute sum
pub const EQUIVALENCE_TOLERANCE: f64 = 1e-9;

/// The two procedures built by `prepare()`
struct Procedures {
    reference: InterpretedSum,
    accelerated: Arc<CompiledSum>,
}

/// One timed comparison
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Measurement {
    rows: usize,
    cols: usize,
    reference_sum: f64,
    accelerated_sum: f64,
    reference_ns: u64,
    accelerated_ns: u64,
    ratio: f64,
}

fn duration_ns(duration: Duration) -> u64 {
    u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX)
}

impl Measurement {
    /// Build a measurement from raw results and durations
    ///
    /// # Errors
    /// `ZeroDuration` if the accelerated duration is zero (the ratio would be
    /// infinite or NaN)
    pub fn new(
        shape: (usize, usize),
        sums: (f64, f64),
        reference: Duration,
        accelerated: Duration,
    ) -> Result<Self> {
        let reference_ns = duration_ns(reference);
        let accelerated_ns = duration_ns(accelerated);
        if accelerated_ns == 0 {
            return Err(Error::ZeroDuration { reference_ns });
        }

        #[allow(clippy::cast_precision_loss)]
        let ratio = reference_ns as f64 / accelerated_ns as f64;

        Ok(Self {
            rows: shape.0,
            cols: shape.1,
            reference_sum: sums.0,
            accelerated_sum: sums.1,
            reference_ns,
            accelerated_ns,
            ratio,
        })
    }

    /// `(rows, cols)` of the measured grid
    #[must_use]
    pub const fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Result of the reference SUM
    #[must_use]
    pub const fn reference_sum(&self) -> f64 {
        self.reference_sum
    }

    /// Result of the accelerated SUM
    #[must_use]
    pub const fn accelerated_sum(&self) -> f64 {
        self.accelerated_sum
    }

    /// Reference duration in nanoseconds
    #[must_use]
    pub const fn reference_ns(&self) -> u64 {
        self.reference_ns
    }

    /// Accelerated duration in nanoseconds
    #[must_use]
    pub const fn accelerated_ns(&self) -> u64 {
        self.accelerated_ns
    }

    /// Reference duration in seconds
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn reference_secs(&self) -> f64 {
        self.reference_ns as f64 / 1e9
    }

    /// Accelerated duration in seconds
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn accelerated_secs(&self) -> f64 {
        self.accelerated_ns as f64 / 1e9
    }

    /// Speedup ratio: reference duration / accelerated duration
    #[must_use]
    pub const fn ratio(&self) -> f64 {
        self.ratio
    }
}

fn timed<T>(f: impl FnOnce() -> Result<T>) -> Result<(T, Duration)> {
    let start = Instant::now();
    let value = f()?;
    Ok((value, start.elapsed()))
}

/// Session state for the definition and measurement stages
pub struct BenchContext {
    config: BenchConfig,
    rng: StdRng,
    compiler: JitCompiler,
    procedures: Option<Procedures>,
}

impl BenchContext {
    /// Create an unprepared context
    ///
    /// # Errors
    /// Returns `Config` if the config fails [`BenchConfig::validate`]
    pub fn new(config: BenchConfig) -> Result<Self> {
        config.validate()?;
        let rng = config
            .seed_value()
            .map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
        Ok(Self {
            config,
            rng,
            compiler: JitCompiler::new(),
            procedures: None,
        })
    }

    /// Configuration the context was created with
    #[must_use]
    pub const fn config(&self) -> &BenchConfig {
        &self.config
    }

    /// Whether `prepare()` has succeeded
    #[must_use]
    pub const fn is_prepared(&self) -> bool {
        self.procedures.is_some()
    }

    /// The accelerated kernel, once prepared
    #[must_use]
    pub fn accelerated(&self) -> Option<&Arc<CompiledSum>> {
        self.procedures.as_ref().map(|p| &p.accelerated)
    }

    /// Compiler cache statistics (size, capacity)
    #[must_use]
    pub fn cache_stats(&self) -> (usize, usize) {
        self.compiler.cache_stats()
    }

    /// Definition stage: build the reference and accelerated procedures
    ///
    /// Idempotent: once prepared, later calls return [`STATUS_OK`] without
    /// rebuilding anything.
    ///
    /// # Errors
    /// `SetupFailed` if the accelerated kernel cannot be compiled; the context
    /// stays unprepared.
    pub fn prepare(&mut self) -> Result<i32> {
        if let Some(procedures) = &self.procedures {
            debug!(
                accelerated = %procedures.accelerated,
                "procedures already prepared; reusing"
            );
            return Ok(STATUS_OK);
        }

        let reference = InterpretedSum::new();
        let accelerated = self.compiler.compile(
            &reference,
            Signature::float64_2d_c(),
            self.config.backend_value(),
        )?;

        info!(
            reference = reference.name(),
            accelerated = %accelerated,
            backend = %accelerated.backend(),
            "procedures prepared"
        );
        self.procedures = Some(Procedures {
            reference,
            accelerated,
        });
        Ok(STATUS_OK)
    }

    /// Measurement stage: return the speedup ratio
    ///
    /// # Errors
    /// As [`measure_report`](Self::measure_report)
    pub fn measure(&mut self) -> Result<f64> {
        self.measure_report().map(|m| m.ratio())
    }

    /// Measurement stage on a fresh `rows x cols` standard-normal grid
    ///
    /// # Errors
    /// - `MissingDependency` if `prepare()` has not succeeded
    /// - `ZeroDuration` if the accelerated call took no measurable time
    /// - `BackendMismatch` if the two sums disagree beyond tolerance
    pub fn measure_report(&mut self) -> Result<Measurement> {
        if self.procedures.is_none() {
            return Err(Self::not_prepared());
        }
        let (rows, cols) = self.config.shape();
        let grid = Grid::random_normal(rows, cols, &mut self.rng)?;
        self.measure_grid(&grid)
    }

    /// Measurement stage on a caller-supplied grid
    ///
    /// # Errors
    /// - `MissingDependency` if `prepare()` has not succeeded
    /// - `ShapeMismatch` / `NotNumeric` if the grid does not fit the
    ///   accelerated kernel's signature
    /// - `ZeroDuration` if the accelerated call took no measurable time
    /// - `BackendMismatch` if the two sums disagree beyond tolerance
    pub fn measure_grid(&self, grid: &Grid) -> Result<Measurement> {
        let procedures = self.procedures.as_ref().ok_or_else(Self::not_prepared)?;
        let shape = match *grid.shape() {
            [rows, cols] => (rows, cols),
            _ => (0, 0),
        };

        let (reference_sum, reference_time) =
            timed(|| procedures.reference.apply(black_box(grid)))?;

        // warm-up: pays the first-call specialization outside the timed window
        black_box(procedures.accelerated.apply(grid)?);
        let (accelerated_sum, accelerated_time) =
            timed(|| procedures.accelerated.apply(black_box(grid)))?;

        let magnitude = grid
            .as_f64_slice()
            .map_or(0.0, |data| data.iter().map(|x| x.abs()).sum::<f64>());
        if (reference_sum - accelerated_sum).abs() > EQUIVALENCE_TOLERANCE * magnitude.max(1.0) {
            return Err(Error::BackendMismatch {
                reference: reference_sum.to_string(),
                accelerated: accelerated_sum.to_string(),
            });
        }

        let measurement = Measurement::new(
            shape,
            (reference_sum, accelerated_sum),
            reference_time,
            accelerated_time,
        )?;

        info!(
            rows = shape.0,
            cols = shape.1,
            duration_reference_s = measurement.reference_secs(),
            duration_accelerated_s = measurement.accelerated_secs(),
            ratio = measurement.ratio(),
            "measured speedup"
        );
        Ok(measurement)
    }

    fn not_prepared() -> Error {
        Error::MissingDependency(
            "reference and accelerated procedures have not been prepared".to_string(),
        )
    }
}
