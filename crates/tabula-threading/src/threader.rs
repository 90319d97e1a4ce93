//! Fork/join parallel regions.
//!
//! Each region shares an atomic cursor over its block indices, spawns
//! scoped workers that claim blocks from it, runs one worker on the
//! calling thread, and joins. The join is the only blocking point.

use std::any::Any;
use std::ops::Range;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::OnceLock;
use std::thread;

use tabula_core::{Error, ErrorId, Status};
use tabula_dispatch::CacheInfo;

use crate::config::{ConfigError, ThreadingConfig};
use crate::tls::Tls;

/// Blocks handed to each worker by [`Threader::threader_for`], on average.
const TASKS_PER_WORKER: usize = 4;

/// Runs data-parallel regions on scoped worker threads.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Threader {
    num_threads: usize,
    min_block_rows: usize,
}

static GLOBAL: OnceLock<Threader> = OnceLock::new();

impl Default for Threader {
    fn default() -> Self {
        let config = ThreadingConfig::default();
        Self {
            num_threads: config.resolved_num_threads(),
            min_block_rows: config.min_block_rows,
        }
    }
}

impl Threader {
    /// Build a threader from a validated config.
    pub fn new(config: &ThreadingConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            num_threads: config.resolved_num_threads(),
            min_block_rows: config.min_block_rows,
        })
    }

    /// Process-wide threader with the default config.
    pub fn global() -> &'static Threader {
        GLOBAL.get_or_init(Threader::default)
    }

    /// Workers per region, the calling thread included.
    pub fn num_threads(&self) -> usize {
        self.num_threads
    }

    /// Row block size for rows of `n_cols` values of `elem_bytes` each.
    ///
    /// `explicit` wins when given. Otherwise the L2 heuristic from
    /// [`CacheInfo`] applies, floored at the configured `min_block_rows`.
    /// The result never exceeds `n_rows` and is at least 1.
    pub fn block_rows(
        &self,
        n_rows: usize,
        n_cols: usize,
        elem_bytes: usize,
        explicit: Option<usize>,
    ) -> usize {
        let rows = explicit.unwrap_or_else(|| {
            CacheInfo::detect()
                .block_size_for_rows(n_cols, elem_bytes)
                .max(self.min_block_rows)
        });
        rows.min(n_rows).max(1)
    }

    /// Call `f(i)` for every `i` in `0..n`.
    pub fn threader_for<F>(&self, n: usize, f: F) -> Result<(), Status>
    where
        F: Fn(usize) + Sync,
    {
        let grain = n.div_ceil(self.num_threads * TASKS_PER_WORKER).max(1);
        self.threader_for_blocked(n, grain, |range| range.for_each(&f))
    }

    /// Call `f(range)` for consecutive ranges of `block_size` items
    /// covering `0..n`. The last range may be shorter.
    pub fn threader_for_blocked<F>(&self, n: usize, block_size: usize, f: F) -> Result<(), Status>
    where
        F: Fn(Range<usize>) + Sync,
    {
        let n_blocks = block_count(n, block_size)?;
        self.region(n_blocks, |tasks| {
            while let Some(b) = tasks.claim() {
                f(block_range(b, block_size, n));
            }
        })
    }

    /// Like [`threader_for_blocked`](Self::threader_for_blocked), with
    /// per-worker scratch from `tls` passed to every call.
    ///
    /// Each worker hands its scratch back to `tls` once every block is
    /// claimed; reduce it with [`Tls::reduce`] after this returns.
    pub fn threader_reduce<T, I, F>(
        &self,
        n: usize,
        block_size: usize,
        tls: &Tls<T, I>,
        f: F,
    ) -> Result<(), Status>
    where
        T: Send,
        I: Fn() -> T + Sync,
        F: Fn(&mut T, Range<usize>) + Sync,
    {
        let n_blocks = block_count(n, block_size)?;
        self.region(n_blocks, |tasks| {
            let mut local = None;
            while let Some(b) = tasks.claim() {
                let scratch = local.get_or_insert_with(|| tls.create());
                f(scratch, block_range(b, block_size, n));
            }
            if let Some(scratch) = local {
                tls.hand_back(scratch);
            }
        })
    }

    fn region<W>(&self, n_tasks: usize, worker: W) -> Result<(), Status>
    where
        W: Fn(&Tasks) + Sync,
    {
        if n_tasks == 0 {
            return Ok(());
        }
        let tasks = Tasks::new(n_tasks);

        let workers = self.num_threads.min(n_tasks);
        tracing::debug!(tasks = n_tasks, workers, "threader region");

        let mut status = Status::ok();
        thread::scope(|s| {
            let mut handles = Vec::with_capacity(workers - 1);
            for i in 1..workers {
                let (tasks, worker) = (&tasks, &worker);
                let spawned = thread::Builder::new()
                    .name(format!("tabula-worker-{i}"))
                    .spawn_scoped(s, move || worker(tasks));
                match spawned {
                    Ok(handle) => handles.push(handle),
                    Err(err) => {
                        tracing::warn!(%err, worker = i, "worker spawn failed, continuing with fewer");
                        break;
                    }
                }
            }
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| worker(&tasks))) {
                status.add(panicked(0, payload.as_ref()));
            }
            for (i, handle) in handles.into_iter().enumerate() {
                if let Err(payload) = handle.join() {
                    status.add(panicked(i + 1, payload.as_ref()));
                }
            }
        });
        status.into_result()
    }
}

/// Task indices `0..len` of one region, claimed in order.
struct Tasks {
    next: AtomicUsize,
    len: usize,
}

impl Tasks {
    fn new(len: usize) -> Self {
        Self {
            next: AtomicUsize::new(0),
            len,
        }
    }

    /// The next unclaimed index, or `None` once all are taken.
    fn claim(&self) -> Option<usize> {
        // Stop bumping once exhausted so the cursor cannot wrap.
        self.next
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |t| {
                (t < self.len).then_some(t + 1)
            })
            .ok()
    }
}

fn block_count(n: usize, block_size: usize) -> Result<usize, Status> {
    if block_size == 0 {
        return Err(Error::new(ErrorId::IncorrectParameter)
            .with_argument("block_size")
            .with_message("block size must be at least 1")
            .into());
    }
    Ok(n.div_ceil(block_size))
}

fn block_range(block: usize, block_size: usize, n: usize) -> Range<usize> {
    let start = block * block_size;
    start..(start + block_size).min(n)
}

fn panicked(worker: usize, payload: &(dyn Any + Send)) -> Error {
    let reason = payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_owned());
    Error::new(ErrorId::ThreadPanicked).with_message(format!("worker {worker}: {reason}"))
}
