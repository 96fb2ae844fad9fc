//! `C(I,J) = accum(C(I,J), A)` and its scalar form
//!
//! Assignment edits C in place. Entries of the submatrix that A does not
//! hold are deleted as zombies, new entries are appended as pending tuples,
//! and existing ones are updated where they sit; the next [`Matrix::wait`]
//! settles everything. Assigning into a full C with an accumulator over the
//! whole matrix skips all of that and updates the values in parallel.
//!
//! An index repeated in `I` or `J` takes the last of its sources.

use rayon::prelude::*;

use super::{entry_tasks, logical, Indices};
use crate::config::{burble, Context};
use crate::error::{Error, Result};
use crate::matrix::{is_zombie, Matrix, Operand, Sparsity};
use crate::ops::BinaryOp;
use crate::parallel::split_by_offsets_mut;
use crate::types::{cast_factory, Scalar};

/// `C(rows, cols) = accum(C(rows, cols), A)`
///
/// Without an accumulator the submatrix is replaced by A, entries A lacks
/// included. With one, entries of A are combined into C and nothing is
/// deleted.
pub fn assign<C, A>(
    ctx: &Context,
    c: &mut Matrix<C>,
    accum: Option<&BinaryOp<C>>,
    a: &Matrix<A>,
    rows: Indices<'_>,
    cols: Indices<'_>,
) -> Result<()>
where
    C: Scalar,
    A: Scalar,
{
    rows.check(c.nrows())?;
    cols.check(c.ncols())?;
    let shape = (rows.len(c.nrows()), cols.len(c.ncols()));
    if (a.nrows(), a.ncols()) != shape {
        return Err(Error::dimension_mismatch(
            "assign",
            format!(
                "A is {}×{} but the index lists select {}×{}",
                a.nrows(),
                a.ncols(),
                shape.0,
                shape.1
            ),
        ));
    }
    let ac = cast_factory::<A, C>()?;

    let whole = rows.is_all() && cols.is_all();
    if let Some(op) = accum {
        if whole && c.sparsity == Sparsity::Full && c.is_finished() {
            return dense_accumulate(ctx, c, op, a);
        }
    }

    c.wait()?;
    let is_csc = c.is_csc;
    let oa = Operand::new(a, false, is_csc)?;
    let av = oa.view();
    let (ilist, jlist) = if is_csc { (rows, cols) } else { (cols, rows) };
    let ipairs = last_sources(ilist, c.vlen);
    let jpairs = last_sources(jlist, c.vdim);
    burble!(
        ctx,
        ni = ipairs.len(),
        nj = jpairs.len(),
        anz = av.nnz(),
        accum = accum.is_some(),
        "assign"
    );

    // C(I, J) loses whatever A does not hold; every deletion lands before the
    // first insertion so C never has to be finished midway
    if accum.is_none() {
        let mut doomed = Vec::new();
        for &(j, jj) in &jpairs {
            let (s, e) = av.vector_range(jj);
            match ilist {
                Indices::All => doomed.extend(
                    live_indices(c, j)
                        .into_iter()
                        .filter(|&i| av.find_in_vector(s, e, i).is_none())
                        .map(|i| (i, j)),
                ),
                Indices::List(_) => doomed.extend(
                    ipairs
                        .iter()
                        .filter(|&&(_, ii)| av.find_in_vector(s, e, ii).is_none())
                        .map(|&(i, _)| (i, j)),
                ),
            }
        }
        for (i, j) in doomed {
            let (row, col) = logical(is_csc, i, j);
            c.remove_element(row, col)?;
        }
    }

    for &(j, jj) in &jpairs {
        let (s, e) = av.vector_range(jj);
        for p in s..e {
            let ii = av.index(p);
            let i = match ilist {
                Indices::All => ii,
                Indices::List(list) => {
                    let i = list[ii];
                    // a repeated index keeps only its last source
                    if source_of(&ipairs, i) != Some(ii) {
                        continue;
                    }
                    i
                }
            };
            let (row, col) = logical(is_csc, i, j);
            let value = ac(av.value(p));
            match accum {
                Some(op) => c.accumulate_element(row, col, value, op)?,
                None => c.set_element(row, col, value)?,
            }
        }
    }
    Ok(())
}

/// `C(rows, cols) = accum(C(rows, cols), value)`
///
/// Assigning to the whole matrix without an accumulator makes C full and
/// iso.
pub fn assign_scalar<C: Scalar>(
    ctx: &Context,
    c: &mut Matrix<C>,
    accum: Option<&BinaryOp<C>>,
    value: C,
    rows: Indices<'_>,
    cols: Indices<'_>,
) -> Result<()> {
    rows.check(c.nrows())?;
    cols.check(c.ncols())?;
    let whole = rows.is_all() && cols.is_all();
    burble!(ctx, whole, accum = accum.is_some(), "assign scalar");

    if whole {
        match accum {
            None => {
                let mut full = Matrix::full_from_parts(c.vlen, c.vdim, c.is_csc, vec![value], true);
                full.copy_settings_from(c);
                *c = full;
                return Ok(());
            }
            Some(op) if c.sparsity == Sparsity::Full && c.is_finished() => {
                if c.iso {
                    c.x[0] = op.call(&c.x[0], &value);
                } else {
                    ctx.install(|| c.x.par_iter_mut().for_each(|x| *x = op.call(x, &value)));
                }
                return Ok(());
            }
            Some(_) => {}
        }
    }

    let is_csc = c.is_csc;
    let (ilist, jlist) = if is_csc { (rows, cols) } else { (cols, rows) };
    let ipairs = last_sources(ilist, c.vlen);
    let jpairs = last_sources(jlist, c.vdim);
    for &(j, _) in &jpairs {
        for &(i, _) in &ipairs {
            let (row, col) = logical(is_csc, i, j);
            match accum {
                Some(op) => c.accumulate_element(row, col, value.clone(), op)?,
                None => c.set_element(row, col, value.clone())?,
            }
        }
    }
    Ok(())
}

/// `C += A` with C full, positionally and in parallel
///
/// The entries of A are cut into tasks; the slots of C those entries land
/// on are increasing in entry order, so each task owns a disjoint run of C.
fn dense_accumulate<C: Scalar, A: Scalar>(
    ctx: &Context,
    c: &mut Matrix<C>,
    op: &BinaryOp<C>,
    a: &Matrix<A>,
) -> Result<()> {
    let ac = cast_factory::<A, C>()?;
    let oa = Operand::new(a, false, c.is_csc)?;
    let av = oa.view();
    let anz = av.nnz();
    if anz == 0 {
        return Ok(());
    }
    c.expand_iso()?;
    let vlen = c.vlen;
    let slot = |k: usize, p: usize| av.vector_id(k) * vlen + av.index(p);

    let tasks = entry_tasks(ctx, &av)?;
    burble!(ctx, anz, ntasks = tasks.len(), op = op.name(), "dense C += A");
    let mut offsets: Vec<usize> = tasks
        .iter()
        .enumerate()
        .map(|(t, task)| if t == 0 { 0 } else { slot(task.kfirst, task.pstart) })
        .collect();
    offsets.push(c.x.len());
    let chunks = split_by_offsets_mut(&mut c.x, &offsets);

    ctx.install(|| {
        chunks
            .into_par_iter()
            .zip(tasks.par_iter())
            .zip(offsets.par_iter())
            .for_each(|((chunk, task), &base)| {
                for k in task.kfirst..task.kend {
                    let (s, e) = task.clip(av.vstart(k), av.vend(k));
                    for p in s..e {
                        let x = &mut chunk[slot(k, p) - base];
                        *x = op.call(x, &ac(av.value(p)));
                    }
                }
            })
    });
    Ok(())
}

/// `(target, source)` pairs sorted by target, keeping the last source of a
/// repeated target
fn last_sources(list: Indices<'_>, n: usize) -> Vec<(usize, usize)> {
    match list {
        Indices::All => (0..n).map(|k| (k, k)).collect(),
        Indices::List(list) => {
            let mut pairs: Vec<(usize, usize)> = list.iter().copied().zip(0..).collect();
            pairs.sort_unstable();
            let mut out: Vec<(usize, usize)> = Vec::with_capacity(pairs.len());
            for (target, source) in pairs {
                match out.last_mut() {
                    Some(last) if last.0 == target => last.1 = source,
                    _ => out.push((target, source)),
                }
            }
            out
        }
    }
}

fn source_of(pairs: &[(usize, usize)], target: usize) -> Option<usize> {
    pairs
        .binary_search_by_key(&target, |&(t, _)| t)
        .ok()
        .map(|k| pairs[k].1)
}

/// Indices of the live entries in vector `j` of a finished matrix
fn live_indices<T: Scalar>(c: &Matrix<T>, j: usize) -> Vec<usize> {
    let (s, e) = c.vector_range(j);
    match c.sparsity {
        Sparsity::Full => (0..e - s).collect(),
        Sparsity::Bitmap => (s..e).filter(|&p| c.b[p]).map(|p| p - s).collect(),
        _ => (s..e).map(|p| c.i[p]).filter(|&i| !is_zombie(i)).collect(),
    }
}
