//! JIT specialization of the reference SUM
//!
//! No machine code is generated at runtime. `JitCompiler::compile` only
//! validates and caches: it checks that the backend and the target
//! [`Signature`] are supported and returns a [`CompiledSum`] bound to that
//! signature. Kernels are cached by signature so repeated compiles in one
//! session reuse the first result.
//!
//! The specialization itself happens on the kernel's first call: it checks
//! the host CPU once and fixes the lane width of the precompiled
//! lane-parallel sum for every later call. That first call is the warm-up
//! the measurement stage discards.
//!
//! References:
//! - Neumann (2011): Efficiently compiling efficient query plans
//! - MonetDB/X100 (2005): Vectorized query execution

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use tracing::debug;

use super::{InterpretedSum, Reduction, Signature};
use crate::grid::{ElementType, Grid, Layout};
use crate::{Backend, Error, Result};

/// Number of independent accumulators in the compiled kernel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaneWidth {
    /// 4 lanes (256-bit of f64)
    Four,
    /// 8 lanes (512-bit of f64)
    Eight,
}

impl LaneWidth {
    /// Pick the widest lane count the host CPU handles natively
    #[must_use]
    pub fn detect() -> Self {
        #[cfg(target_arch = "x86_64")]
        {
            if std::arch::is_x86_feature_detected!("avx512f") {
                return Self::Eight;
            }
        }
        Self::Four
    }

    /// Lane count
    #[must_use]
    pub const fn lanes(self) -> usize {
        match self {
            Self::Four => 4,
            Self::Eight => 8,
        }
    }
}

/// Lane-parallel sum: `L` running accumulators, combined left to right,
/// then the tail added in order.
fn sum_lanes<const L: usize>(data: &[f64]) -> f64 {
    let mut acc = [0.0_f64; L];
    let chunks = data.chunks_exact(L);
    let tail = chunks.remainder();
    for chunk in chunks {
        for (a, &x) in acc.iter_mut().zip(chunk) {
            *a += x;
        }
    }
    let mut total = acc.iter().fold(0.0, |s, &a| s + a);
    for &x in tail {
        total += x;
    }
    total
}

/// SUM kernel specialized for one signature
#[derive(Debug)]
pub struct CompiledSum {
    name: String,
    signature: Signature,
    backend: Backend,
    lanes: OnceLock<LaneWidth>,
}

impl CompiledSum {
    fn new(source: &str, signature: Signature, backend: Backend) -> Self {
        Self {
            name: format!("{source}_jit"),
            signature,
            backend,
            lanes: OnceLock::new(),
        }
    }

    /// Signature this kernel accepts
    #[must_use]
    pub const fn signature(&self) -> Signature {
        self.signature
    }

    /// Backend the kernel was compiled for (never `CostBased`)
    #[must_use]
    pub const fn backend(&self) -> Backend {
        self.backend
    }

    /// Lane width, once the first call has fixed it
    #[must_use]
    pub fn lane_width(&self) -> Option<LaneWidth> {
        self.lanes.get().copied()
    }

    /// Whether the first-call specialization has happened
    #[must_use]
    pub fn is_warm(&self) -> bool {
        self.lanes.get().is_some()
    }
}

impl Reduction for CompiledSum {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, grid: &Grid) -> Result<f64> {
        if !grid.element_type().is_numeric() {
            return Err(Error::NotNumeric(grid.element_type().to_string()));
        }
        let mismatch = || Error::ShapeMismatch {
            expected: self.signature.to_string(),
            actual: Signature::of(grid).to_string(),
        };
        if !self.signature.accepts(grid) {
            return Err(mismatch());
        }
        let data = grid.as_f64_slice().ok_or_else(mismatch)?;

        let lanes = *self.lanes.get_or_init(|| {
            let width = LaneWidth::detect();
            debug!(kernel = %self.name, lanes = width.lanes(), "specialized on first call");
            width
        });

        Ok(match lanes {
            LaneWidth::Four => sum_lanes::<4>(data),
            LaneWidth::Eight => sum_lanes::<8>(data),
        })
    }
}

impl fmt::Display for CompiledSum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.signature)
    }
}

/// Compiled-kernel cache
///
/// Keyed by `source::signature::backend`. Thread-safe so one compiler can be
/// shared; a failed build inserts nothing.
pub struct KernelCache {
    cache: Mutex<HashMap<String, Arc<CompiledSum>>>,
}

impl KernelCache {
    /// Create an empty cache
    #[must_use]
    pub fn new() -> Self {
        Self {
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Get the cached kernel for `key`, or build and insert one
    ///
    /// # Errors
    /// Propagates the error from `build`; the cache is left unchanged.
    pub fn get_or_try_insert(
        &self,
        key: &str,
        build: impl FnOnce() -> Result<CompiledSum>,
    ) -> Result<Arc<CompiledSum>> {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(kernel) = cache.get(key) {
            debug!(key, "kernel cache hit");
            return Ok(Arc::clone(kernel));
        }

        let kernel = Arc::new(build()?);
        cache.insert(key.to_string(), Arc::clone(&kernel));
        debug!(key, "kernel compiled and cached");
        Ok(kernel)
    }

    /// Cache statistics (size, capacity)
    #[must_use]
    pub fn stats(&self) -> (usize, usize) {
        let cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        (cache.len(), cache.capacity())
    }
}

impl Default for KernelCache {
    fn default() -> Self {
        Self::new()
    }
}

/// JIT compiler for the SUM reduction
pub struct JitCompiler {
    cache: KernelCache,
}

impl JitCompiler {
    /// Create a compiler with an empty kernel cache
    #[must_use]
    pub fn new() -> Self {
        Self {
            cache: KernelCache::new(),
        }
    }

    /// Resolve a requested backend to the one the kernel will run on
    ///
    /// # Errors
    /// `SetupFailed` for `Backend::Gpu`: this build has no device backend.
    pub fn resolve_backend(backend: Backend) -> Result<Backend> {
        match backend {
            Backend::CostBased | Backend::Simd => Ok(Backend::Simd),
            Backend::Gpu => Err(Error::SetupFailed(
                "GPU backend unavailable: no device compiler in this build".to_string(),
            )),
        }
    }

    fn check_signature(signature: &Signature) -> Result<()> {
        if signature.element_type != ElementType::Float64 {
            return Err(Error::SetupFailed(format!(
                "unsupported element type {} (only float64 kernels are generated)",
                signature.element_type
            )));
        }
        if signature.ndim != 2 {
            return Err(Error::SetupFailed(format!(
                "unsupported rank {} (only 2-D kernels are generated)",
                signature.ndim
            )));
        }
        if signature.layout != Layout::RowMajor {
            return Err(Error::SetupFailed(
                "unsupported layout (only C-contiguous kernels are generated)".to_string(),
            ));
        }
        Ok(())
    }

    /// Validate `signature` and `backend` for `source` and return the cached
    /// kernel; lane-width specialization is deferred to its first call
    ///
    /// # Errors
    /// `SetupFailed` if the backend is unavailable or the signature is not
    /// `float64[:, ::1]`. Nothing is cached on failure.
    pub fn compile(
        &self,
        source: &InterpretedSum,
        signature: Signature,
        backend: Backend,
    ) -> Result<Arc<CompiledSum>> {
        let backend = Self::resolve_backend(backend)?;
        Self::check_signature(&signature)?;

        let key = format!("{}::{signature}::{backend}", source.name());
        self.cache.get_or_try_insert(&key, || {
            Ok(CompiledSum::new(source.name(), signature, backend))
        })
    }

    /// Get cache statistics (size, capacity)
    #[must_use]
    pub fn cache_stats(&self) -> (usize, usize) {
        self.cache.stats()
    }
}

impl Default for JitCompiler {
    fn default() -> Self {
        Self::new()
    }
}
