//! Finishing deferred work: zombies, jumbled vectors and pending tuples

use rayon::prelude::*;
use tracing::trace;

use super::tuples::{build_from_tuples, Dup};
use super::{is_zombie, Matrix, Pending, Sparsity};
use crate::error::Result;
use crate::parallel::split_by_offsets_mut;
use crate::types::Scalar;
use crate::utils::try_vec;

impl<T: Scalar> Matrix<T> {
    /// Finish all pending work
    ///
    /// Zombies are removed, jumbled vectors sorted and pending tuples merged
    /// in (duplicates combined with the pending dup operator, or the last
    /// one kept). The matrix then conforms to its preferred format. Calling
    /// `wait` on a finished matrix does nothing.
    pub fn wait(&mut self) -> Result<()> {
        if self.is_finished() {
            return Ok(());
        }
        trace!(
            zombies = self.nzombies,
            pending = self.pending.as_ref().map_or(0, |p| p.len()),
            jumbled = self.jumbled,
            "wait"
        );
        if self.nzombies > 0 {
            self.remove_zombies();
        }
        if self.jumbled {
            self.unjumble();
        }
        if let Some(pending) = self.pending.take() {
            if let Err(e) = self.assemble_pending(&pending) {
                self.pending = Some(pending);
                return Err(e);
            }
        }
        self.conform()
    }

    /// Compact out every zombie, pruning vectors of a hypersparse matrix
    /// that become empty
    fn remove_zombies(&mut self) {
        let hyper = self.sparsity == Sparsity::Hypersparse;
        let nvec = self.nvec();
        let mut pnew = 0;
        let mut knew = 0;
        for k in 0..nvec {
            let (start, end) = (self.p[k], self.p[k + 1]);
            let vstart = pnew;
            for pos in start..end {
                if !is_zombie(self.i[pos]) {
                    self.i[pnew] = self.i[pos];
                    if !self.iso {
                        self.x.swap(pnew, pos);
                    }
                    pnew += 1;
                }
            }
            if hyper {
                if pnew > vstart {
                    self.h[knew] = self.h[k];
                    self.p[knew] = vstart;
                    knew += 1;
                }
            } else {
                self.p[k] = vstart;
            }
        }
        if hyper {
            self.h.truncate(knew);
            self.p.truncate(knew + 1);
            self.p[knew] = pnew;
        } else {
            self.p[nvec] = pnew;
        }
        self.i.truncate(pnew);
        if !self.iso {
            self.x.truncate(pnew);
        }
        self.nzombies = 0;
        self.invalidate_hyper_hash();
    }

    /// Sort the indices of every vector
    fn unjumble(&mut self) {
        let offsets = &self.p;
        let i_chunks = split_by_offsets_mut(&mut self.i, offsets);
        if self.iso {
            i_chunks.into_par_iter().for_each(|ci| ci.sort_unstable());
        } else {
            let x_chunks = split_by_offsets_mut(&mut self.x, offsets);
            i_chunks
                .into_par_iter()
                .zip(x_chunks)
                .for_each(|(ci, cx)| sort_vector(ci, cx));
        }
        self.jumbled = false;
    }

    /// Merge the pending tuples into the matrix
    ///
    /// Pending tuples never collide with stored entries (writes to existing
    /// entries happen in place), so this is a disjoint union.
    fn assemble_pending(&mut self, pending: &Pending<T>) -> Result<()> {
        let dup = match &pending.dup {
            Some(op) => Dup::Combine(op),
            None => Dup::Last,
        };
        let t = build_from_tuples(
            self.vlen,
            self.vdim,
            self.is_csc,
            &pending.i,
            &pending.j,
            &pending.x,
            dup,
            pending.sorted,
        )?;

        if self.stored_slots() == 0 {
            self.p = t.p;
            self.h = t.h;
            self.i = t.i;
            self.x = t.x;
            self.iso = false;
            self.sparsity = Sparsity::Hypersparse;
            self.invalidate_hyper_hash();
            return Ok(());
        }

        let keep_iso = self.iso && t.x.iter().all(|v| *v == self.x[0]);
        let hyper = self.sparsity == Sparsity::Hypersparse;

        // (vector id, position in self, position in t)
        let mut vectors: Vec<(usize, Option<usize>, Option<usize>)> =
            try_vec(if hyper { self.h.len() + t.h.len() } else { self.vdim })?;
        let (mut ka, mut kt) = (0, 0);
        let (na, nt) = (self.nvec(), t.h.len());
        while ka < na || kt < nt {
            let ja = (ka < na).then(|| self.vector_id(ka));
            let jt = (kt < nt).then(|| t.h[kt]);
            match (ja, jt) {
                (Some(a), Some(b)) if a == b => {
                    vectors.push((a, Some(ka), Some(kt)));
                    ka += 1;
                    kt += 1;
                }
                (Some(a), Some(b)) if a < b => {
                    vectors.push((a, Some(ka), None));
                    ka += 1;
                }
                (Some(a), None) => {
                    vectors.push((a, Some(ka), None));
                    ka += 1;
                }
                (_, Some(b)) => {
                    vectors.push((b, None, Some(kt)));
                    kt += 1;
                }
                (None, None) => break,
            }
        }

        let this = &*self;
        let merged: Vec<(Vec<usize>, Vec<T>)> = vectors
            .par_iter()
            .map(|&(_, ka, kt)| {
                let (a0, a1) = ka.map_or((0, 0), |k| (this.p[k], this.p[k + 1]));
                let (t0, t1) = kt.map_or((0, 0), |k| (t.p[k], t.p[k + 1]));
                let mut idx = Vec::with_capacity(a1 - a0 + t1 - t0);
                let mut val = Vec::with_capacity(if keep_iso { 0 } else { idx.capacity() });
                let (mut pa, mut pt) = (a0, t0);
                while pa < a1 || pt < t1 {
                    let take_a = pt >= t1 || (pa < a1 && this.i[pa] < t.i[pt]);
                    if take_a {
                        idx.push(this.i[pa]);
                        if !keep_iso {
                            val.push(this.value_at(pa).clone());
                        }
                        pa += 1;
                    } else {
                        debug_assert!(pa >= a1 || this.i[pa] != t.i[pt]);
                        idx.push(t.i[pt]);
                        if !keep_iso {
                            val.push(t.x[pt].clone());
                        }
                        pt += 1;
                    }
                }
                (idx, val)
            })
            .collect();

        // Assemble the vector pointers and entries
        let total: usize = merged.iter().map(|(idx, _)| idx.len()).sum();
        let mut p = try_vec(merged.len() + 1)?;
        let mut i = try_vec(total)?;
        let mut x = try_vec(if keep_iso { 1 } else { total })?;
        p.push(0);
        for (idx, val) in merged {
            i.extend(idx);
            x.extend(val);
            p.push(i.len());
        }
        if keep_iso {
            x.push(self.x[0].clone());
        }

        if hyper {
            let mut h = try_vec(vectors.len())?;
            h.extend(vectors.iter().map(|v| v.0));
            self.h = h;
        }
        self.p = p;
        self.i = i;
        self.x = x;
        self.iso = keep_iso;
        self.invalidate_hyper_hash();
        Ok(())
    }
}

/// Sort one vector's indices, carrying its values along
fn sort_vector<T: Clone>(ci: &mut [usize], cx: &mut [T]) {
    if ci.windows(2).all(|w| w[0] < w[1]) {
        return;
    }
    let mut pairs: Vec<(usize, T)> = ci.iter().copied().zip(cx.iter().cloned()).collect();
    pairs.sort_unstable_by_key(|pair| pair.0);
    for (k, (i, x)) in pairs.into_iter().enumerate() {
        ci[k] = i;
        cx[k] = x;
    }
}
