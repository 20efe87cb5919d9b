//! SUM reductions over 2-D grids
//!
//! Two implementations of the same computation:
//!
//! - [`InterpretedSum`]: the reference. Row-major nested loop, every element
//!   read through the dynamically-typed [`Grid::get`] path.
//! - [`CompiledSum`]: produced by [`JitCompiler`] from the reference, bound to
//!   one [`Signature`] (`float64[:, ::1]`) and summing the contiguous buffer
//!   with independent lane accumulators.
//!
//! Results agree within accumulated floating-point error; bit-equality is
//! not guaranteed because the accumulation order differs.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::grid::{ElementType, Grid, Layout};
use crate::Result;

pub mod jit;
mod reference;

pub use jit::{CompiledSum, JitCompiler, KernelCache, LaneWidth};
pub use reference::InterpretedSum;

/// A reduction from a grid to one scalar
pub trait Reduction: Send + Sync {
    /// Procedure name (used in logs and cache keys)
    fn name(&self) -> &str;

    /// Reduce `grid` to a scalar
    ///
    /// # Errors
    /// Implementations reject grids they cannot reduce (wrong rank,
    /// non-numeric elements, layout mismatch).
    fn apply(&self, grid: &Grid) -> Result<f64>;
}

/// Element type, rank and layout a kernel is specialized for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Signature {
    /// Element type
    pub element_type: ElementType,
    /// Number of dimensions
    pub ndim: usize,
    /// Memory layout
    pub layout: Layout,
}

impl Signature {
    /// `float64`, 2-D, C-contiguous
    #[must_use]
    pub const fn float64_2d_c() -> Self {
        Self {
            element_type: ElementType::Float64,
            ndim: 2,
            layout: Layout::RowMajor,
        }
    }

    /// Signature describing an existing grid
    #[must_use]
    pub fn of(grid: &Grid) -> Self {
        Self {
            element_type: grid.element_type(),
            ndim: grid.ndim(),
            layout: grid.layout(),
        }
    }

    /// Whether `grid` can be handed to a kernel with this signature
    ///
    /// A strided signature accepts any layout; a row-major one only accepts
    /// C-contiguous grids.
    #[must_use]
    pub fn accepts(&self, grid: &Grid) -> bool {
        grid.element_type() == self.element_type
            && grid.ndim() == self.ndim
            && (self.layout == Layout::Strided || grid.is_c_contiguous())
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut axes = vec![":"; self.ndim];
        if self.layout == Layout::RowMajor {
            if let Some(last) = axes.last_mut() {
                *last = "::1";
            }
        }
        write!(f, "{}[{}]", self.element_type, axes.join(", "))
    }
}
