//! Reference SUM: straightforward row-major iteration

use super::Reduction;
use crate::grid::Grid;
use crate::{Error, Result};

/// Reference sum over every element of a 2-D numeric grid
///
/// Accumulates into an `f64` starting at `0.0`, outer loop over rows, inner
/// loop over columns. That order fixes the rounding behaviour; consumers
/// needing bit-for-bit parity with this function must sum in the same order.
#[derive(Debug, Clone, Copy, Default)]
pub struct InterpretedSum;

impl InterpretedSum {
    /// Procedure name
    pub const NAME: &'static str = "sum_reference";

    /// Create the reference reduction
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Reduction for InterpretedSum {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn apply(&self, grid: &Grid) -> Result<f64> {
        if grid.ndim() != 2 {
            return Err(Error::ShapeMismatch {
                expected: "2-D grid".to_string(),
                actual: format!("{}-D grid", grid.ndim()),
            });
        }
        if !grid.element_type().is_numeric() {
            return Err(Error::NotNumeric(grid.element_type().to_string()));
        }

        let (rows, cols) = (grid.shape()[0], grid.shape()[1]);
        let mut total = 0.0_f64;
        for i in 0..rows {
            for j in 0..cols {
                total += grid.get(&[i, j])?;
            }
        }
        Ok(total)
    }
}
