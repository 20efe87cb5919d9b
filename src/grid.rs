//! Strided numeric grids
//!
//! A [`Grid`] is a shape + strides view over a shared, typed buffer. The
//! measurement stage only ever builds 2-D row-major `float64` grids, but the
//! reference reduction accepts any numeric element type and layout, so the
//! model keeps both explicit.

use std::f64::consts::PI;
use std::fmt;
use std::sync::Arc;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Element type of a grid buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementType {
    /// 64-bit IEEE float
    Float64,
    /// 32-bit IEEE float
    Float32,
    /// 64-bit signed integer
    Int64,
    /// Boolean (non-numeric)
    Boolean,
}

impl ElementType {
    /// Whether values of this type can be summed
    #[must_use]
    pub const fn is_numeric(self) -> bool {
        !matches!(self, Self::Boolean)
    }

    /// Short lowercase type name (`float64`, `int64`, ...)
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Float64 => "float64",
            Self::Float32 => "float32",
            Self::Int64 => "int64",
            Self::Boolean => "bool",
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Memory layout of a grid relative to its shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layout {
    /// C-contiguous: row-major with unit inner stride
    RowMajor,
    /// Any other stride pattern (e.g. a transposed view)
    Strided,
}

#[derive(Debug)]
enum Buffer {
    F64(Vec<f64>),
    F32(Vec<f32>),
    I64(Vec<i64>),
    Bool(Vec<bool>),
}

impl Buffer {
    fn len(&self) -> usize {
        match self {
            Self::F64(v) => v.len(),
            Self::F32(v) => v.len(),
            Self::I64(v) => v.len(),
            Self::Bool(v) => v.len(),
        }
    }

    const fn element_type(&self) -> ElementType {
        match self {
            Self::F64(_) => ElementType::Float64,
            Self::F32(_) => ElementType::Float32,
            Self::I64(_) => ElementType::Int64,
            Self::Bool(_) => ElementType::Boolean,
        }
    }
}

/// N-dimensional strided view over a shared buffer
///
/// Cloning a grid (or taking a [`transpose`](Grid::transpose)) shares the
/// underlying buffer; grids are read-only once built.
#[derive(Debug, Clone)]
pub struct Grid {
    buffer: Arc<Buffer>,
    shape: Vec<usize>,
    strides: Vec<usize>,
}

/// Row-major strides (in elements) for `shape`
fn c_strides(shape: &[usize]) -> Vec<usize> {
    let mut strides = vec![1; shape.len()];
    for i in (0..shape.len().saturating_sub(1)).rev() {
        strides[i] = strides[i + 1] * shape[i + 1].max(1);
    }
    strides
}

/// Element count of `shape`, or `InvalidInput` if it overflows `usize`
fn element_count(shape: &[usize]) -> Result<usize> {
    shape
        .iter()
        .try_fold(1usize, |acc, &dim| acc.checked_mul(dim))
        .ok_or_else(|| Error::InvalidInput(format!("shape {shape:?} overflows usize")))
}

/// Sample a standard normal variate with the Box-Muller transform
fn standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    let u1: f64 = rng.gen::<f64>().max(1e-300);
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

impl Grid {
    fn new(buffer: Buffer, shape: &[usize]) -> Result<Self> {
        let expected = element_count(shape)?;

        if expected != buffer.len() {
            return Err(Error::InvalidInput(format!(
                "shape {shape:?} needs {expected} elements, got {}",
                buffer.len()
            )));
        }

        Ok(Self {
            buffer: Arc::new(buffer),
            shape: shape.to_vec(),
            strides: c_strides(shape),
        })
    }

    /// Build a row-major `float64` grid
    ///
    /// # Errors
    /// Returns `InvalidInput` if `data.len()` differs from the shape's element count
    pub fn from_f64(shape: &[usize], data: Vec<f64>) -> Result<Self> {
        Self::new(Buffer::F64(data), shape)
    }

    /// Build a row-major `float32` grid
    ///
    /// # Errors
    /// Returns `InvalidInput` if `data.len()` differs from the shape's element count
    pub fn from_f32(shape: &[usize], data: Vec<f32>) -> Result<Self> {
        Self::new(Buffer::F32(data), shape)
    }

    /// Build a row-major `int64` grid
    ///
    /// # Errors
    /// Returns `InvalidInput` if `data.len()` differs from the shape's element count
    pub fn from_i64(shape: &[usize], data: Vec<i64>) -> Result<Self> {
        Self::new(Buffer::I64(data), shape)
    }

    /// Build a row-major boolean grid
    ///
    /// # Errors
    /// Returns `InvalidInput` if `data.len()` differs from the shape's element count
    pub fn from_bool(shape: &[usize], data: Vec<bool>) -> Result<Self> {
        Self::new(Buffer::Bool(data), shape)
    }

    /// Build a 2-D `float64` grid from equal-length rows
    ///
    /// # Errors
    /// Returns `InvalidInput` if the rows are ragged
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let cols = rows.first().map_or(0, Vec::len);
        if let Some(bad) = rows.iter().position(|row| row.len() != cols) {
            return Err(Error::InvalidInput(format!(
                "ragged rows: row {bad} has {} columns, expected {cols}",
                rows[bad].len()
            )));
        }
        Self::from_f64(&[rows.len(), cols], rows.concat())
    }

    /// All-zero `rows x cols` grid
    ///
    /// # Errors
    /// Returns `InvalidInput` if `rows * cols` overflows `usize`
    pub fn zeros(rows: usize, cols: usize) -> Result<Self> {
        let len = element_count(&[rows, cols])?;
        Self::from_f64(&[rows, cols], vec![0.0; len])
    }

    /// `rows x cols` grid of independent standard-normal samples
    ///
    /// # Errors
    /// Returns `InvalidInput` if `rows * cols` overflows `usize`
    pub fn random_normal<R: Rng + ?Sized>(rows: usize, cols: usize, rng: &mut R) -> Result<Self> {
        let len = element_count(&[rows, cols])?;
        let data = (0..len).map(|_| standard_normal(rng)).collect();
        Self::from_f64(&[rows, cols], data)
    }

    /// Swap the axes of a 2-D grid without copying
    ///
    /// The result shares the buffer and is not C-contiguous (unless one axis
    /// has length <= 1).
    ///
    /// # Errors
    /// Returns `InvalidInput` if the grid is not 2-D
    pub fn transpose(&self) -> Result<Self> {
        if self.ndim() != 2 {
            return Err(Error::InvalidInput(format!(
                "transpose needs a 2-D grid, got {}-D",
                self.ndim()
            )));
        }
        Ok(Self {
            buffer: Arc::clone(&self.buffer),
            shape: vec![self.shape[1], self.shape[0]],
            strides: vec![self.strides[1], self.strides[0]],
        })
    }

    /// Number of dimensions
    #[must_use]
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Extent of each dimension
    #[must_use]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Element strides of each dimension
    #[must_use]
    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    /// Total number of elements
    #[must_use]
    pub fn len(&self) -> usize {
        self.shape.iter().product()
    }

    /// True if any dimension has zero extent
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element type of the underlying buffer
    #[must_use]
    pub fn element_type(&self) -> ElementType {
        self.buffer.element_type()
    }

    /// Row-major with unit inner stride
    #[must_use]
    pub fn is_c_contiguous(&self) -> bool {
        if self.is_empty() {
            return true;
        }
        let mut expected = 1;
        for (&dim, &stride) in self.shape.iter().zip(&self.strides).rev() {
            if dim > 1 && stride != expected {
                return false;
            }
            expected *= dim;
        }
        true
    }

    /// Layout classification used by kernel signatures
    #[must_use]
    pub fn layout(&self) -> Layout {
        if self.is_c_contiguous() {
            Layout::RowMajor
        } else {
            Layout::Strided
        }
    }

    /// Read one element as `f64`
    ///
    /// Dispatches on the element type per call; this is the slow, general
    /// access path.
    ///
    /// # Errors
    /// - `InvalidInput` if the index has the wrong rank or is out of bounds
    /// - `NotNumeric` for boolean grids
    #[allow(clippy::cast_precision_loss)]
    pub fn get(&self, index: &[usize]) -> Result<f64> {
        if index.len() != self.ndim() {
            return Err(Error::InvalidInput(format!(
                "index {index:?} has rank {}, grid has rank {}",
                index.len(),
                self.ndim()
            )));
        }

        let mut offset = 0;
        for ((&i, &dim), &stride) in index.iter().zip(&self.shape).zip(&self.strides) {
            if i >= dim {
                return Err(Error::InvalidInput(format!(
                    "index {index:?} out of bounds for shape {:?}",
                    self.shape
                )));
            }
            offset += i * stride;
        }

        match self.buffer.as_ref() {
            Buffer::F64(v) => Ok(v[offset]),
            Buffer::F32(v) => Ok(f64::from(v[offset])),
            Buffer::I64(v) => Ok(v[offset] as f64),
            Buffer::Bool(_) => Err(Error::NotNumeric(ElementType::Boolean.to_string())),
        }
    }

    /// Borrow the elements as one contiguous row-major `f64` slice
    ///
    /// Returns `None` unless the grid is `float64` and C-contiguous.
    #[must_use]
    pub fn as_f64_slice(&self) -> Option<&[f64]> {
        match self.buffer.as_ref() {
            Buffer::F64(v) if self.is_c_contiguous() => Some(&v[..self.len()]),
            _ => None,
        }
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:?}", self.element_type(), self.shape)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_from_f64_shape_mismatch() {
        let err = Grid::from_f64(&[2, 3], vec![1.0; 5]).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_from_rows_ragged() {
        let err = Grid::from_rows(&[vec![1.0, 2.0], vec![3.0]]).unwrap_err();
        assert!(err.to_string().contains("ragged rows"));
    }

    #[test]
    fn test_get_row_major() {
        let grid = Grid::from_rows(&[vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]).unwrap();
        assert_eq!(grid.shape(), &[2, 3]);
        assert_eq!(grid.strides(), &[3, 1]);
        assert_eq!(grid.get(&[0, 2]).unwrap(), 3.0);
        assert_eq!(grid.get(&[1, 0]).unwrap(), 4.0);
    }

    #[test]
    fn test_get_out_of_bounds() {
        let grid = Grid::zeros(2, 2).unwrap();
        assert!(grid.get(&[2, 0]).is_err());
        assert!(grid.get(&[0]).is_err());
    }

    #[test]
    fn test_get_converts_numeric_types() {
        let ints = Grid::from_i64(&[1, 2], vec![7, -3]).unwrap();
        assert_eq!(ints.get(&[0, 1]).unwrap(), -3.0);

        let floats = Grid::from_f32(&[1, 1], vec![0.5]).unwrap();
        assert_eq!(floats.get(&[0, 0]).unwrap(), 0.5);
    }

    #[test]
    fn test_get_boolean_is_not_numeric() {
        let grid = Grid::from_bool(&[1, 1], vec![true]).unwrap();
        assert!(!grid.element_type().is_numeric());
        assert!(matches!(grid.get(&[0, 0]), Err(Error::NotNumeric(_))));
    }

    #[test]
    fn test_transpose_is_strided_view() {
        let grid = Grid::from_rows(&[vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]).unwrap();
        let t = grid.transpose().unwrap();

        assert_eq!(t.shape(), &[3, 2]);
        assert!(!t.is_c_contiguous());
        assert_eq!(t.layout(), Layout::Strided);
        assert!(t.as_f64_slice().is_none());
        assert_eq!(t.get(&[2, 1]).unwrap(), 6.0);
        assert_eq!(t.get(&[0, 1]).unwrap(), 4.0);
    }

    #[test]
    fn test_transpose_requires_2d() {
        let grid = Grid::from_f64(&[4], vec![0.0; 4]).unwrap();
        assert!(grid.transpose().is_err());
    }

    #[test]
    fn test_degenerate_transpose_stays_contiguous() {
        let column = Grid::from_f64(&[3, 1], vec![1.0, 2.0, 3.0]).unwrap();
        assert!(column.transpose().unwrap().is_c_contiguous());
    }

    #[test]
    fn test_empty_grid() {
        let grid = Grid::zeros(0, 0).unwrap();
        assert!(grid.is_empty());
        assert!(grid.is_c_contiguous());
        assert_eq!(grid.as_f64_slice(), Some(&[][..]));
    }

    #[test]
    fn test_random_normal_shape_and_moments() {
        let mut rng = StdRng::seed_from_u64(42);
        let grid = Grid::random_normal(100, 100, &mut rng).unwrap();
        assert_eq!(grid.shape(), &[100, 100]);
        assert_eq!(grid.element_type(), ElementType::Float64);

        let data = grid.as_f64_slice().unwrap();
        let n = data.len() as f64;
        let mean = data.iter().sum::<f64>() / n;
        let var = data.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
        assert!(mean.abs() < 0.05, "mean {mean}");
        assert!((var - 1.0).abs() < 0.1, "variance {var}");
        assert!(data.iter().all(|x| x.is_finite()));
    }

    #[test]
    fn test_generators_reject_overflowing_shape() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(
            Grid::random_normal(usize::MAX, 2, &mut rng),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(Grid::zeros(2, usize::MAX), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_random_normal_seeded_is_reproducible() {
        let a = Grid::random_normal(3, 3, &mut StdRng::seed_from_u64(7)).unwrap();
        let b = Grid::random_normal(3, 3, &mut StdRng::seed_from_u64(7)).unwrap();
        assert_eq!(a.as_f64_slice(), b.as_f64_slice());
    }

    #[test]
    fn test_display() {
        assert_eq!(Grid::zeros(2, 5).unwrap().to_string(), "float64[2, 5]");
    }
}
