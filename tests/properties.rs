//! Property tests: algebraic identities and cross-checks between kernels

use grblas::matrix::{dense_reference, reference_ewise, reference_mxm};
use grblas::{
    ewise_add, ewise_mult, mxm, transpose, AxbMethod, BinaryOp, BinaryOpcode, Context, Descriptor,
    Format, Matrix, Semiring, SparsityControl, NO_MASK,
};
use proptest::prelude::*;

type Entries = Vec<(usize, usize, i32)>;

const CONTROLS: [SparsityControl; 4] = [
    SparsityControl::AUTO,
    SparsityControl::SPARSE,
    SparsityControl::HYPERSPARSE,
    SparsityControl::BITMAP,
];

fn build(
    nrows: usize,
    ncols: usize,
    entries: &Entries,
    format: Format,
    control: SparsityControl,
) -> Matrix<i32> {
    let mut m = Matrix::new_with_format(nrows, ncols, format);
    m.set_sparsity_control(control).unwrap();
    let rows: Vec<usize> = entries.iter().map(|e| e.0).collect();
    let cols: Vec<usize> = entries.iter().map(|e| e.1).collect();
    let vals: Vec<i32> = entries.iter().map(|e| e.2).collect();
    m.build(&rows, &cols, &vals, Some(&BinaryOp::plus())).unwrap();
    m
}

fn sorted_tuples(m: &Matrix<i32>) -> Entries {
    let (r, c, v) = m.clone().extract_tuples().unwrap();
    let mut t: Entries = r.into_iter().zip(c).zip(v).map(|((r, c), v)| (r, c, v)).collect();
    t.sort_by_key(|e| (e.0, e.1));
    t
}

fn entries(nrows: usize, ncols: usize) -> impl Strategy<Value = Entries> {
    proptest::collection::vec((0..nrows, 0..ncols, -20i32..20), 0..=nrows * ncols)
}

/// Two matrices of the same shape
fn pair() -> impl Strategy<Value = (usize, usize, Entries, Entries)> {
    (2usize..9, 2usize..9).prop_flat_map(|(m, n)| (Just(m), Just(n), entries(m, n), entries(m, n)))
}

/// Two matrices with a shared inner dimension
fn product() -> impl Strategy<Value = (usize, usize, usize, Entries, Entries)> {
    (2usize..8, 2usize..8, 2usize..8)
        .prop_flat_map(|(m, k, n)| (Just(m), Just(k), Just(n), entries(m, k), entries(k, n)))
}

fn format(k: usize) -> Format {
    if k % 2 == 0 {
        Format::ByRow
    } else {
        Format::ByCol
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn union_restricted_to_overlap_is_intersection(
        (m, n, ea, eb) in pair(),
        fa in 0usize..2,
        fb in 0usize..2,
        ca in 0usize..4,
        cb in 0usize..4,
    ) {
        let ctx = Context::sequential();
        let a = build(m, n, &ea, format(fa), CONTROLS[ca]);
        let b = build(m, n, &eb, format(fb), CONTROLS[cb]);
        let plus = BinaryOp::<i32>::plus();

        let mut union = Matrix::<i32>::new(m, n);
        ewise_add(&ctx, &mut union, NO_MASK, None, &plus, &a, &b, &Descriptor::default()).unwrap();
        let mut inter = Matrix::<i32>::new(m, n);
        ewise_mult(&ctx, &mut inter, NO_MASK, None, &plus, &a, &b, &Descriptor::default()).unwrap();

        // the overlap is the pattern of A ∩ B, taken with a structural mask
        let pattern = BinaryOp::<i32>::pair();
        let mut overlap = Matrix::<i32>::new(m, n);
        ewise_mult(
            &ctx,
            &mut overlap,
            NO_MASK,
            None,
            &pattern,
            &a,
            &b,
            &Descriptor::default(),
        )
        .unwrap();
        let mut restricted = Matrix::<i32>::new(m, n);
        let desc = Descriptor::default().structural();
        ewise_add(&ctx, &mut restricted, Some(&overlap), None, &plus, &a, &b, &desc).unwrap();

        prop_assert_eq!(sorted_tuples(&restricted), sorted_tuples(&inter));

        let (da, db) = (dense_reference(&a).unwrap(), dense_reference(&b).unwrap());
        prop_assert_eq!(
            dense_reference(&union).unwrap(),
            reference_ewise(&da, &db, &plus, true).unwrap()
        );
        prop_assert_eq!(
            dense_reference(&inter).unwrap(),
            reference_ewise(&da, &db, &plus, false).unwrap()
        );
    }

    #[test]
    fn transpose_twice_is_identity(
        (m, n, ea, _) in pair(),
        fa in 0usize..2,
        fc in 0usize..2,
        ca in 0usize..4,
    ) {
        let ctx = Context::sequential();
        let a = build(m, n, &ea, format(fa), CONTROLS[ca]);
        let mut t = Matrix::<i32>::new_with_format(n, m, format(fc));
        transpose(&ctx, &mut t, NO_MASK, None, &a, &Descriptor::default()).unwrap();
        t.check().unwrap();
        let mut back = Matrix::<i32>::new_with_format(m, n, format(fa));
        transpose(&ctx, &mut back, NO_MASK, None, &t, &Descriptor::default()).unwrap();
        prop_assert_eq!(sorted_tuples(&back), sorted_tuples(&a));
    }

    #[test]
    fn multiply_methods_agree(
        (m, k, n, ea, eb) in product(),
        fa in 0usize..2,
        fb in 0usize..2,
        fc in 0usize..2,
        threads in 1usize..4,
    ) {
        let ctx = Context::with_threads(threads).unwrap().chunk(1);
        let a = build(m, k, &ea, format(fa), SparsityControl::AUTO);
        let b = build(k, n, &eb, format(fb), SparsityControl::AUTO);
        let expected = reference_mxm(
            &dense_reference(&a).unwrap(),
            &dense_reference(&b).unwrap(),
            &Semiring::<i32>::plus_times(),
        )
        .unwrap();
        let min_plus = Semiring::<i32>::builtin(BinaryOpcode::Min, BinaryOpcode::Plus).unwrap();
        let expected_min_plus =
            reference_mxm(
                &dense_reference(&a).unwrap(),
                &dense_reference(&b).unwrap(),
                &min_plus,
            )
            .unwrap();

        for method in [AxbMethod::Dot, AxbMethod::Gustavson, AxbMethod::Heap, AxbMethod::Auto] {
            let desc = Descriptor::default().method(method);
            let mut c = Matrix::<i32>::new_with_format(m, n, format(fc));
            mxm(&ctx, &mut c, NO_MASK, None, &Semiring::<i32>::plus_times(), &a, &b, &desc).unwrap();
            c.check().unwrap();
            prop_assert_eq!(dense_reference(&c).unwrap(), expected.clone(), "{:?}", method);

            let mut c = Matrix::<i32>::new_with_format(m, n, format(fc));
            mxm(&ctx, &mut c, NO_MASK, None, &min_plus, &a, &b, &desc).unwrap();
            prop_assert_eq!(
                dense_reference(&c).unwrap(),
                expected_min_plus.clone(),
                "{:?}",
                method
            );
        }
    }

    #[test]
    fn import_export_round_trip((m, n, ea, _) in pair(), by_col in any::<bool>(), ca in 0usize..4) {
        let a = build(m, n, &ea, format(by_col as usize), CONTROLS[ca]);
        let expected = sorted_tuples(&a);
        let back = if by_col {
            let parts = a.export_csc().unwrap();
            Matrix::import_csc(parts.nrows, parts.ncols, parts.p, parts.i, parts.x, false).unwrap()
        } else {
            let parts = a.export_csr().unwrap();
            Matrix::import_csr(parts.nrows, parts.ncols, parts.p, parts.i, parts.x, false).unwrap()
        };
        back.check().unwrap();
        prop_assert_eq!(sorted_tuples(&back), expected);
    }

    #[test]
    fn wait_is_idempotent(
        (m, n, ea, eb) in pair(),
        fa in 0usize..2,
    ) {
        let mut a = build(m, n, &ea, format(fa), SparsityControl::SPARSE);
        for &(r, c, v) in &eb {
            if v % 3 == 0 {
                a.remove_element(r, c).unwrap();
            } else {
                a.set_element(r, c, v).unwrap();
            }
        }
        a.wait().unwrap();
        a.check().unwrap();
        let once = a.clone();
        a.wait().unwrap();
        prop_assert!(a.is_finished());
        prop_assert_eq!(sorted_tuples(&a), sorted_tuples(&once));
        prop_assert_eq!(a.sparsity(), once.sparsity());
    }
}
