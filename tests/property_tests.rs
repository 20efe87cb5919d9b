//! Property-based tests for jitbench-db
//!
//! - Test mathematical invariants of the reference SUM
//! - Test the prepare/measure lifecycle
//! - Run with ProptestConfig::with_cases(100)

use jitbench_db::{
    BenchConfig, BenchContext, Error, Grid, InterpretedSum, Reduction, Signature, STATUS_OK,
};
use proptest::prelude::*;

// ============================================================================
// Property Test Generators (Strategies)
// ============================================================================

/// Generate equal-length rows of bounded floats
fn arb_rows(max_dim: usize) -> impl Strategy<Value = Vec<Vec<f64>>> {
    (1..=max_dim, 1..=max_dim).prop_flat_map(|(rows, cols)| {
        proptest::collection::vec(proptest::collection::vec(-1.0e3f64..1.0e3, cols), rows)
    })
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property: reference SUM equals the arithmetic sum of every element
    #[test]
    fn prop_reference_is_arithmetic_sum(rows in arb_rows(25)) {
        let expected: f64 = rows.iter().flatten().sum();
        let grid = Grid::from_rows(&rows).unwrap();
        let actual = InterpretedSum::new().apply(&grid).unwrap();

        let magnitude: f64 = rows.iter().flatten().map(|x| x.abs()).sum();
        prop_assert!((expected - actual).abs() <= 1e-12 * magnitude.max(1.0));
    }

    /// Property: reference SUM is bit-identical to a row-major fold
    #[test]
    fn prop_reference_is_row_major_fold(rows in arb_rows(25)) {
        let expected = rows.iter().flatten().fold(0.0_f64, |acc, &x| acc + x);
        let grid = Grid::from_rows(&rows).unwrap();
        prop_assert_eq!(InterpretedSum::new().apply(&grid).unwrap().to_bits(), expected.to_bits());
    }

    /// Property: transposing does not change the reference SUM's value set
    #[test]
    fn prop_transpose_same_total(rows in arb_rows(20)) {
        let grid = Grid::from_rows(&rows).unwrap();
        let transposed = grid.transpose().unwrap();

        let a = InterpretedSum::new().apply(&grid).unwrap();
        let b = InterpretedSum::new().apply(&transposed).unwrap();
        let magnitude: f64 = rows.iter().flatten().map(|x| x.abs()).sum();
        prop_assert!((a - b).abs() <= 1e-12 * magnitude.max(1.0));
    }

    /// Property: only C-contiguous float64 2-D grids satisfy the compiled signature
    #[test]
    fn prop_signature_accepts_row_major_only(rows in arb_rows(10)) {
        let grid = Grid::from_rows(&rows).unwrap();
        let transposed = grid.transpose().unwrap();
        let sig = Signature::float64_2d_c();

        prop_assert!(sig.accepts(&grid));
        prop_assert_eq!(sig.accepts(&transposed), transposed.is_c_contiguous());
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(20))]

    /// Property: N >= 1 prepares leave measure() callable with a finite positive ratio
    #[test]
    fn prop_prepare_idempotent(n in 1usize..6, seed in any::<u64>()) {
        let mut ctx = BenchContext::new(BenchConfig::default().rows(32).cols(32).seed(seed)).unwrap();
        for _ in 0..n {
            prop_assert_eq!(ctx.prepare().unwrap(), STATUS_OK);
        }
        prop_assert_eq!(ctx.cache_stats().0, 1);

        let ratio = ctx.measure().unwrap();
        prop_assert!(ratio.is_finite() && ratio > 0.0);
    }

    /// Property: measure() before any prepare() always fails loudly
    #[test]
    fn prop_measure_requires_prepare(seed in any::<u64>()) {
        let mut ctx = BenchContext::new(BenchConfig::default().seed(seed)).unwrap();
        prop_assert!(matches!(ctx.measure(), Err(Error::MissingDependency(_))));
    }
}
