//! End-to-end scenarios checked against the dense reference implementations

use grblas::matrix::{dense_reference, reference_ewise, reference_mxm, DenseMatrix};
use grblas::{
    assign, ewise_add, extract, mxm, reduce_to_scalar, select, AxbMethod, BinaryOp, Context,
    Descriptor, Format, IndexUnaryOp, Indices, Matrix, Monoid, Scalar, Semiring, Sparsity, Type,
    NO_MASK,
};

/// `A(i,j) = i + 1` everywhere except `(0,0)`
fn scenario_matrix(format: Format) -> Matrix<f64> {
    let mut a = Matrix::new_with_format(4, 4, format);
    let (mut rows, mut cols, mut vals) = (Vec::new(), Vec::new(), Vec::new());
    for i in 0..4 {
        for j in 0..4 {
            if (i, j) != (0, 0) {
                rows.push(i);
                cols.push(j);
                vals.push((i + 1) as f64);
            }
        }
    }
    a.build(&rows, &cols, &vals, None).unwrap();
    a
}

#[test]
fn test_four_by_four_sum() {
    let ctx = Context::sequential();
    for format in [Format::ByRow, Format::ByCol] {
        let a = scenario_matrix(format);
        let mut c = Matrix::<f64>::new_with_format(4, 4, format);
        let plus = BinaryOp::<f64>::plus();
        ewise_add(&ctx, &mut c, NO_MASK, None, &plus, &a, &a, &Descriptor::default()).unwrap();

        let da = dense_reference(&a).unwrap();
        let expected = reference_ewise(&da, &da, &plus, true).unwrap();
        assert_eq!(dense_reference(&c).unwrap(), expected);
        assert_eq!(c.nvals().unwrap(), 15);
        assert!(c.extract_element(0, 0).unwrap_err().is_no_value());
        assert_eq!(c.extract_element(3, 1).unwrap(), 8.0);
    }
}

#[test]
fn test_four_by_four_product() {
    let ctx = Context::sequential();
    let semiring = Semiring::<f64>::plus_times();
    for format in [Format::ByRow, Format::ByCol] {
        let a = scenario_matrix(format);
        let da = dense_reference(&a).unwrap();
        let expected = reference_mxm(&da, &da, &semiring).unwrap();
        // (i+1) * (1 + 2 + 3 + 4), less the k = 0 term where (0,0) is missing
        assert_eq!(expected.get(2, 1), Some(&30.0));
        assert_eq!(expected.get(2, 0), Some(&27.0));
        assert_eq!(expected.get(0, 1), Some(&9.0));
        assert_eq!(expected.get(0, 0), Some(&9.0));

        for method in [AxbMethod::Auto, AxbMethod::Dot, AxbMethod::Gustavson, AxbMethod::Heap] {
            let mut c = Matrix::<f64>::new_with_format(4, 4, format);
            let desc = Descriptor::default().method(method);
            mxm(&ctx, &mut c, NO_MASK, None, &semiring, &a, &a, &desc).unwrap();
            assert_eq!(dense_reference(&c).unwrap(), expected, "{method:?}");
        }
    }
}

#[test]
fn test_scattered_inserts_equal_sorted_build() {
    let n = 1000;
    // 100 distinct positions visited in a scrambled order
    let positions: Vec<(usize, usize)> =
        (0..100).map(|k| ((k * 37) % 100 * 7 % n, (k * 53) % 97)).collect();

    let mut scattered = Matrix::<i64>::new_with_format(n, 100, Format::ByCol);
    for (k, &(r, c)) in positions.iter().enumerate() {
        scattered.set_element(r, c, k as i64).unwrap();
    }
    assert!(scattered.has_pending());
    scattered.wait().unwrap();
    scattered.check().unwrap();

    let mut sorted: Vec<(usize, usize, i64)> =
        positions.iter().enumerate().map(|(k, &(r, c))| (r, c, k as i64)).collect();
    sorted.sort_by_key(|&(r, c, _)| (c, r));
    let mut immediate = Matrix::<i64>::new_with_format(n, 100, Format::ByCol);
    for &(r, c, v) in &sorted {
        immediate.set_element(r, c, v).unwrap();
    }
    immediate.wait().unwrap();

    assert_eq!(scattered.extract_tuples().unwrap(), immediate.extract_tuples().unwrap());
    assert_eq!(scattered.nvals().unwrap(), 100);
}

#[test]
fn test_multiply_by_empty() {
    let ctx = Context::sequential();
    let a = scenario_matrix(Format::ByRow);
    let empty = Matrix::<f64>::new(4, 3);
    for method in [AxbMethod::Auto, AxbMethod::Dot, AxbMethod::Gustavson, AxbMethod::Heap] {
        let desc = Descriptor::default().method(method);
        let mut c = Matrix::<f64>::new(4, 3);
        mxm(&ctx, &mut c, NO_MASK, None, &Semiring::<f64>::plus_times(), &a, &empty, &desc).unwrap();
        assert_eq!(c.nvals().unwrap(), 0, "{method:?}");

        let mut c = Matrix::<f64>::new(3, 4);
        let desc = desc.transpose_a();
        mxm(&ctx, &mut c, NO_MASK, None, &Semiring::<f64>::plus_times(), &empty, &a, &desc).unwrap();
        assert_eq!(c.nvals().unwrap(), 0, "{method:?}");
    }
}

#[test]
fn test_sprs_and_ndarray_interop() {
    let a = scenario_matrix(Format::ByCol);
    let s = a.to_sprs().unwrap();
    assert_eq!(s.nnz(), 15);
    assert!(s.is_csc());
    let back = Matrix::from_sprs(s).unwrap();
    assert_eq!(dense_reference(&back).unwrap(), dense_reference(&a).unwrap());

    let dense = a.to_ndarray().unwrap();
    assert_eq!(dense[[0, 0]], 0.0);
    assert_eq!(dense[[2, 3]], 3.0);
    let mut full = Matrix::from_ndarray(dense.view()).unwrap();
    assert_eq!(full.sparsity(), Sparsity::Full);
    assert_eq!(full.nvals().unwrap(), 16);
}

#[test]
fn test_extract_after_assign_round_trips() {
    let ctx = Context::with_threads(2).unwrap().chunk(1);
    let mut c = Matrix::<f64>::new_with_format(10, 10, Format::ByCol);
    let block = scenario_matrix(Format::ByRow);
    let rows = [1, 3, 5, 7];
    let cols = [9, 0, 4, 2];
    assign(&ctx, &mut c, None, &block, Indices::List(&rows), Indices::List(&cols)).unwrap();
    c.wait().unwrap();
    assert_eq!(c.nvals().unwrap(), 15);

    let mut back = Matrix::<f64>::new(4, 4);
    extract(
        &ctx,
        &mut back,
        NO_MASK,
        None,
        &c,
        Indices::List(&rows),
        Indices::List(&cols),
        &Descriptor::default(),
    )
    .unwrap();
    assert_eq!(dense_reference(&back).unwrap(), dense_reference(&block).unwrap());
}

#[test]
fn test_triangle_count() {
    // an undirected 5-cycle with one chord (0,2): one triangle, 0-1-2
    let ctx = Context::sequential();
    let edges = [(0, 1), (1, 2), (2, 3), (3, 4), (4, 0), (0, 2)];
    let mut a = Matrix::<u32>::new(5, 5);
    for &(u, v) in &edges {
        a.set_element(u, v, 1).unwrap();
        a.set_element(v, u, 1).unwrap();
    }
    a.wait().unwrap();

    let mut lower = Matrix::<u32>::new(5, 5);
    select(
        &ctx,
        &mut lower,
        NO_MASK,
        None,
        &IndexUnaryOp::<u32>::tril(-1),
        &a,
        &Descriptor::default(),
    )
    .unwrap();

    // C<L> = L * L' counts, for every edge of L, the triangles closing it
    let mut c = Matrix::<u32>::new(5, 5);
    let desc = Descriptor::default().structural().transpose_b().method(AxbMethod::Dot);
    mxm(&ctx, &mut c, Some(&lower), None, &Semiring::<u32>::plus_times(), &lower, &lower, &desc).unwrap();
    let triangles = reduce_to_scalar(&ctx, &Monoid::<u32>::plus(), &c).unwrap();
    assert_eq!(triangles, 1);
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct MinMax {
    lo: i32,
    hi: i32,
}

impl Scalar for MinMax {
    fn type_desc() -> Type {
        Type::user("minmax", std::mem::size_of::<MinMax>())
    }
}

#[test]
fn test_user_defined_semiring_matches_reference() {
    let ctx = Context::sequential();
    let widen = BinaryOp::new("widen", |a: &MinMax, b: &MinMax| MinMax {
        lo: a.lo.min(b.lo),
        hi: a.hi.max(b.hi),
    });
    let identity = MinMax { lo: i32::MAX, hi: i32::MIN };
    let shift = BinaryOp::new("shift", |a: &MinMax, b: &MinMax| MinMax {
        lo: a.lo + b.lo,
        hi: a.hi + b.hi,
    });
    let semiring = Semiring::new(Monoid::new(widen, identity, None).unwrap(), shift);

    let mut a = Matrix::<MinMax>::new(3, 3);
    let mut da = DenseMatrix::empty(3, 3);
    for (k, &(i, j)) in [(0, 0), (0, 2), (1, 1), (2, 0), (2, 1)].iter().enumerate() {
        let v = MinMax { lo: k as i32, hi: 2 * k as i32 };
        a.set_element(i, j, v).unwrap();
        da.set(i, j, v);
    }
    let expected = reference_mxm(&da, &da, &semiring).unwrap();
    for method in [AxbMethod::Dot, AxbMethod::Gustavson, AxbMethod::Heap] {
        let mut c = Matrix::<MinMax>::new(3, 3);
        mxm(
            &ctx,
            &mut c,
            NO_MASK,
            None,
            &semiring,
            &a,
            &a,
            &Descriptor::default().method(method),
        )
        .unwrap();
        assert_eq!(dense_reference(&c).unwrap(), expected, "{method:?}");
    }
}
