//! Configuration and system parameters for grblas
//!
//! Every top-level operation takes a [`Context`] explicitly instead of reading
//! process-wide globals, so operations stay reentrant and can be tuned per
//! call site (thread count, format switches, merge heuristics).

use std::sync::Arc;

use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::error::{Error, Result};
use crate::matrix::{Format, Matrix};
use crate::types::Scalar;

/// Default fraction of non-empty vectors below which a matrix goes hypersparse
pub const DEFAULT_HYPER_SWITCH: f64 = 0.0625;

/// Default density above which a matrix may be held as a bitmap
pub const DEFAULT_BITMAP_SWITCH: f64 = 0.10;

/// Default nnz ratio that switches a sparse merge to binary search
pub const DEFAULT_MERGE_RATIO: usize = 32;

/// Default factor for deciding that a mask is "very sparse"
pub const DEFAULT_MASK_SPARSITY_RATIO: usize = 8;

/// Default minimum work handed to a single thread
pub const DEFAULT_CHUNK: usize = 64 * 1024;

/// Default smallest hyperlist for which the hyper hash is built
pub const DEFAULT_HYPER_HASH_MIN: usize = 1024;

/// System parameters for performance tuning
#[derive(Debug, Clone)]
pub struct SystemParameters {
    /// Maximum number of threads to use
    pub n_threads: usize,
    /// Minimum amount of work (entries or flops) per thread
    pub chunk: usize,
}

impl Default for SystemParameters {
    fn default() -> Self {
        Self {
            n_threads: num_cpus::get(), // Use all available cores
            chunk: DEFAULT_CHUNK,
        }
    }
}

/// Execution context for grblas operations
#[derive(Debug, Clone)]
pub struct Context {
    /// Thread and chunk parameters
    pub system_params: SystemParameters,

    /// A matrix becomes hypersparse when its non-empty vectors number at most
    /// `hyper_switch * vdim`, and stops being hypersparse above twice that
    pub hyper_switch: f64,

    /// A matrix whose sparsity control allows it becomes a bitmap when
    /// `nnz >= bitmap_switch * vlen * vdim`
    pub bitmap_switch: f64,

    /// Sparse/sparse merges use binary search once one side has more than
    /// `merge_ratio` times the entries of the other
    pub merge_ratio: usize,

    /// A non-complemented mask is exploited inside element-wise kernels when
    /// `mask_sparsity_ratio * nnz(M) < nnz(A) + nnz(B)`
    pub mask_sparsity_ratio: usize,

    /// Hypersparse matrices with at least this many vectors get a hyper hash
    pub hyper_hash_min: usize,

    /// Emit per-operation diagnostics through `tracing`
    pub burble: bool,

    pub(crate) pool: Option<Arc<ThreadPool>>,
}

impl Default for Context {
    fn default() -> Self {
        Self {
            system_params: SystemParameters::default(),
            hyper_switch: DEFAULT_HYPER_SWITCH,
            bitmap_switch: DEFAULT_BITMAP_SWITCH,
            merge_ratio: DEFAULT_MERGE_RATIO,
            mask_sparsity_ratio: DEFAULT_MASK_SPARSITY_RATIO,
            hyper_hash_min: DEFAULT_HYPER_HASH_MIN,
            burble: false,
            pool: None,
        }
    }
}

impl Context {
    /// Create a context running on a dedicated pool of `n_threads` workers
    pub fn with_threads(n_threads: usize) -> Result<Self> {
        if n_threads == 0 {
            return Err(Error::invalid_value("thread count must be at least 1"));
        }
        let pool = ThreadPoolBuilder::new()
            .num_threads(n_threads)
            .build()
            .map_err(|e| Error::invalid_value(format!("cannot build thread pool: {e}")))?;
        Ok(Self {
            system_params: SystemParameters {
                n_threads,
                ..SystemParameters::default()
            },
            pool: Some(Arc::new(pool)),
            ..Self::default()
        })
    }

    /// A single-threaded context, useful for deterministic comparisons
    pub fn sequential() -> Self {
        Self {
            system_params: SystemParameters {
                n_threads: 1,
                chunk: DEFAULT_CHUNK,
            },
            ..Self::default()
        }
    }

    /// Set the minimum work per thread
    pub fn chunk(mut self, chunk: usize) -> Self {
        self.system_params.chunk = chunk.max(1);
        self
    }

    /// Set the sparse-merge ratio
    pub fn merge_ratio(mut self, ratio: usize) -> Self {
        self.merge_ratio = ratio.max(1);
        self
    }

    /// Set the hypersparse switch
    pub fn hyper_switch(mut self, switch: f64) -> Self {
        self.hyper_switch = switch;
        self
    }

    /// Set the bitmap switch
    pub fn bitmap_switch(mut self, switch: f64) -> Self {
        self.bitmap_switch = switch;
        self
    }

    /// Set the hyper hash threshold
    pub fn hyper_hash_min(mut self, min: usize) -> Self {
        self.hyper_hash_min = min;
        self
    }

    /// Enable or disable diagnostics
    pub fn burble(mut self, on: bool) -> Self {
        self.burble = on;
        self
    }

    /// A new empty matrix that takes its format switches from this context
    pub fn new_matrix<T: Scalar>(&self, nrows: usize, ncols: usize, format: Format) -> Matrix<T> {
        let mut m = Matrix::new_with_format(nrows, ncols, format);
        m.set_hyper_switch(self.hyper_switch);
        m.set_bitmap_switch(self.bitmap_switch);
        m.set_hyper_hash_min(self.hyper_hash_min);
        m
    }

    /// Number of threads to use for `work` units of work
    pub fn nthreads_for(&self, work: usize) -> usize {
        let chunk = self.system_params.chunk.max(1);
        let max = self.system_params.n_threads.max(1);
        (work / chunk).clamp(1, max)
    }

    /// Number of tasks to create for `nthreads` threads and `work` units
    pub fn ntasks_for(&self, nthreads: usize, work: usize) -> usize {
        let ntasks = if nthreads == 1 { 1 } else { 32 * nthreads };
        ntasks.min(work).max(1)
    }

    /// Run `op` inside this context's thread pool (or the global one)
    pub fn install<R, F>(&self, op: F) -> R
    where
        F: FnOnce() -> R + Send,
        R: Send,
    {
        match &self.pool {
            Some(pool) => pool.install(op),
            None => op(),
        }
    }
}

/// Log a diagnostic line when the context asks for it
macro_rules! burble {
    ($ctx:expr, $($arg:tt)*) => {
        if $ctx.burble {
            tracing::debug!($($arg)*);
        }
    };
}

pub(crate) use burble;
