use grblas::{
    ewise_add, mxm, reduce_to_scalar, BinaryOp, BinaryOpcode, Context, Descriptor, Format, Matrix,
    Monoid, Scalar, Semiring, Type, NO_MASK,
};
use tracing_subscriber::EnvFilter;

/// A Gaussian integer `re + im·i`, as a user-defined type
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Gaussian {
    re: i64,
    im: i64,
}

impl Scalar for Gaussian {
    fn type_desc() -> Type {
        Type::user("gaussian", std::mem::size_of::<Gaussian>())
    }
}

fn gaussian_semiring() -> grblas::Result<Semiring<Gaussian>> {
    let add = BinaryOp::new("gaussian_plus", |a: &Gaussian, b: &Gaussian| Gaussian {
        re: a.re + b.re,
        im: a.im + b.im,
    });
    let times = BinaryOp::new("gaussian_times", |a: &Gaussian, b: &Gaussian| Gaussian {
        re: a.re * b.re - a.im * b.im,
        im: a.re * b.im + a.im * b.re,
    });
    Ok(Semiring::new(Monoid::new(add, Gaussian::default(), None)?, times))
}

fn main() -> grblas::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    println!("grblas {}: sparse linear algebra over semirings", grblas::VERSION);
    let ctx = Context::default().burble(true);

    // A path graph 0 → 1 → 2 → 3 with edge weights
    let w = Matrix::from_tuples(4, 4, &[0, 1, 2], &[1, 2, 3], &[2.0f64, 1.5, 4.0])?;
    println!("\nW:\n{:?}", w);

    // two-hop shortest paths on min.plus
    let min_plus = Semiring::<f64>::builtin(BinaryOpcode::Min, BinaryOpcode::Plus)?;
    let mut two_hop = Matrix::<f64>::new(4, 4);
    mxm(&ctx, &mut two_hop, NO_MASK, None, &min_plus, &w, &w, &Descriptor::default())?;
    let (rows, cols, vals) = two_hop.extract_tuples()?;
    println!("\nTwo-hop paths (min.plus):");
    for ((r, c), v) in rows.iter().zip(&cols).zip(&vals) {
        println!("  {r} → {c}: {v}");
    }

    // reachability within two hops on lor.land
    let reach = Matrix::from_tuples(4, 4, &[0, 1, 2], &[1, 2, 3], &[true; 3])?;
    let lor_land = Semiring::<bool>::plus_times();
    let mut within_two = reach.clone();
    mxm(
        &ctx,
        &mut within_two,
        NO_MASK,
        Some(&BinaryOp::builtin(BinaryOpcode::Lor)?),
        &lor_land,
        &reach,
        &reach,
        &Descriptor::default(),
    )?;
    println!("\nPairs reachable within two hops: {}", within_two.nvals()?);

    // A + A' and its total
    let mut sym = Matrix::<f64>::new(4, 4);
    ewise_add(
        &ctx,
        &mut sym,
        NO_MASK,
        None,
        &BinaryOp::<f64>::plus(),
        &w,
        &w,
        &Descriptor::default().transpose_b(),
    )?;
    let total = reduce_to_scalar(&ctx, &Monoid::<f64>::plus(), &sym)?;
    println!("\nSum of W + W': {total}");

    // Gaussian integers: (1 + i)² = 2i
    let semiring = gaussian_semiring()?;
    let mut z = ctx.new_matrix::<Gaussian>(1, 1, Format::ByCol);
    z.set_element(0, 0, Gaussian { re: 1, im: 1 })?;
    let mut sq = Matrix::<Gaussian>::new(1, 1);
    mxm(&ctx, &mut sq, NO_MASK, None, &semiring, &z, &z, &Descriptor::default())?;
    println!("\n(1 + i)² = {:?}", sq.extract_element(0, 0)?);
    Ok(())
}
