//! Multi-threaded drivers for exercising an [`IntMap`].
//!
//! Every value a driver stores carries the key and the writing worker
//! (see [`encode_value`]), so a later single-threaded [`verify`] pass can
//! tell a value some store really wrote from a corrupted one.

use std::fmt;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::unbounded;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;
use tracing::{debug, debug_span, trace};

use crate::{IntMap, Key, Value};

const WORKER_STRIDE: Value = 1 << 16;

pub const MAX_WORKERS: usize = WORKER_STRIDE as usize;
pub const MAX_KEY_SPACE: Key = Key::MAX / WORKER_STRIDE;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkloadError {
    #[error("workload needs at least one worker")]
    NoWorkers,
    #[error("too many workers: {0} (max 65536)")]
    TooManyWorkers(usize),
    #[error("key space {0} out of range")]
    KeySpace(Key),
    #[error("operation mix has no weight")]
    EmptyMix,
    #[error("worker {0} panicked")]
    WorkerPanicked(usize),
    #[error("key {key} holds {value}, which no store wrote")]
    Corrupted { key: Key, value: Value },
}

/// Value written by `worker` for `key`.
#[inline]
pub fn encode_value(key: Key, worker: usize) -> Value {
    key * WORKER_STRIDE + worker as Value
}

/// Inverse of [`encode_value`]: `(key, worker)`.
#[inline]
pub fn decode_value(value: Value) -> (Key, usize) {
    (
        value.div_euclid(WORKER_STRIDE),
        value.rem_euclid(WORKER_STRIDE) as usize,
    )
}

/// Relative weights of each operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpMix {
    pub load: u32,
    pub store: u32,
    pub delete: u32,
}

impl OpMix {
    pub const STORE_ONLY: OpMix = OpMix {
        load: 0,
        store: 1,
        delete: 0,
    };

    fn total(&self) -> u64 {
        self.load as u64 + self.store as u64 + self.delete as u64
    }

    fn pick(&self, rng: &mut impl Rng) -> Op {
        let roll = rng.gen_range(0..self.total());
        if roll < self.load as u64 {
            Op::Load
        } else if roll < self.load as u64 + self.store as u64 {
            Op::Store
        } else {
            Op::Delete
        }
    }
}

impl Default for OpMix {
    fn default() -> Self {
        Self::STORE_ONLY
    }
}

#[derive(Debug, Clone, Copy)]
enum Op {
    Load,
    Store,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkloadConfig {
    pub workers: usize,
    pub ops_per_worker: usize,
    /// Keys are drawn from `0..key_space`.
    pub key_space: Key,
    pub mix: OpMix,
    pub seed: u64,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            ops_per_worker: 10_000,
            key_space: 40_000,
            mix: OpMix::default(),
            seed: 0,
        }
    }
}

impl WorkloadConfig {
    pub fn validate(&self) -> Result<(), WorkloadError> {
        validate_workers(self.workers)?;
        if self.key_space < 1 || self.key_space > MAX_KEY_SPACE {
            return Err(WorkloadError::KeySpace(self.key_space));
        }
        if self.mix.total() == 0 {
            return Err(WorkloadError::EmptyMix);
        }
        Ok(())
    }
}

fn validate_workers(workers: usize) -> Result<(), WorkloadError> {
    match workers {
        0 => Err(WorkloadError::NoWorkers),
        n if n > MAX_WORKERS => Err(WorkloadError::TooManyWorkers(n)),
        _ => Ok(()),
    }
}

/// Operation counts of a finished run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    pub loads: u64,
    /// Loads that found their key.
    pub hits: u64,
    pub stores: u64,
    pub deletes: u64,
    pub elapsed: Duration,
}

impl Report {
    pub fn total_ops(&self) -> u64 {
        self.loads + self.stores + self.deletes
    }

    pub fn ops_per_sec(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs == 0.0 {
            0.0
        } else {
            self.total_ops() as f64 / secs
        }
    }

    fn absorb(&mut self, tally: &Tally) {
        self.loads += tally.loads;
        self.hits += tally.hits;
        self.stores += tally.stores;
        self.deletes += tally.deletes;
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ops in {:?} ({:.0} ops/s): {} loads ({} hits), {} stores, {} deletes",
            self.total_ops(),
            self.elapsed,
            self.ops_per_sec(),
            self.loads,
            self.hits,
            self.stores,
            self.deletes
        )
    }
}

#[derive(Debug, Default)]
struct Tally {
    loads: u64,
    hits: u64,
    stores: u64,
    deletes: u64,
}

/// Runs `config.workers` threads against `map`, each issuing
/// `config.ops_per_worker` randomly chosen operations.
///
/// Worker `i` seeds its generator with `config.seed + i`, so the sequence
/// each worker issues is reproducible. The interleaving is not.
pub fn run<M>(map: Arc<M>, config: &WorkloadConfig) -> Result<Report, WorkloadError>
where
    M: IntMap + ?Sized + 'static,
{
    config.validate()?;
    let span = debug_span!(
        "workload",
        workers = config.workers,
        ops = config.ops_per_worker
    );
    let _enter = span.enter();

    let (tx, rx) = unbounded();
    let start = Instant::now();
    let handles: Vec<_> = (0..config.workers)
        .map(|worker| {
            let map = Arc::clone(&map);
            let tx = tx.clone();
            let config = config.clone();
            thread::spawn(move || {
                trace!(worker, "worker started");
                let mut rng = StdRng::seed_from_u64(config.seed.wrapping_add(worker as u64));
                let mut tally = Tally::default();
                for _ in 0..config.ops_per_worker {
                    let key = rng.gen_range(0..config.key_space);
                    match config.mix.pick(&mut rng) {
                        Op::Load => {
                            tally.loads += 1;
                            if map.load(key).1 {
                                tally.hits += 1;
                            }
                        }
                        Op::Store => {
                            tally.stores += 1;
                            map.store(key, encode_value(key, worker));
                        }
                        Op::Delete => {
                            tally.deletes += 1;
                            map.delete(key);
                        }
                    }
                }
                trace!(worker, "worker finished");
                // receiver outlives every worker
                let _ = tx.send(tally);
            })
        })
        .collect();
    drop(tx);

    join_all(handles)?;
    let mut report = Report {
        elapsed: start.elapsed(),
        ..Default::default()
    };
    for tally in rx.iter() {
        report.absorb(&tally);
    }
    debug!(total = report.total_ops(), elapsed = ?report.elapsed, "workload done");
    Ok(report)
}

/// Each of `workers` threads stores its own `keys_per_worker` keys:
/// worker `w` owns `w * keys_per_worker .. (w + 1) * keys_per_worker`.
pub fn fill_disjoint<M>(
    map: Arc<M>,
    workers: usize,
    keys_per_worker: usize,
) -> Result<Report, WorkloadError>
where
    M: IntMap + ?Sized + 'static,
{
    validate_workers(workers)?;
    let requested = workers.saturating_mul(keys_per_worker);
    let key_space = Key::try_from(requested).unwrap_or(Key::MAX);
    if key_space > MAX_KEY_SPACE {
        return Err(WorkloadError::KeySpace(key_space));
    }
    // both fit: workers >= 1 and the product is at most MAX_KEY_SPACE
    let per_worker = keys_per_worker as Key;

    let start = Instant::now();
    let handles: Vec<_> = (0..workers)
        .map(|worker| {
            let map = Arc::clone(&map);
            thread::spawn(move || {
                let first = worker as Key * per_worker;
                for key in first..first + per_worker {
                    map.store(key, encode_value(key, worker));
                }
            })
        })
        .collect();
    join_all(handles)?;

    let report = Report {
        stores: key_space as u64,
        elapsed: start.elapsed(),
        ..Default::default()
    };
    debug!(workers, keys_per_worker, elapsed = ?report.elapsed, "fill done");
    Ok(report)
}

/// Single-threaded pass over `0..key_space`. Every present key must hold a
/// value encoded for that key by one of `workers`. Returns the number of
/// present keys.
pub fn verify<M>(map: &M, key_space: Key, workers: usize) -> Result<usize, WorkloadError>
where
    M: IntMap + ?Sized,
{
    let mut live = 0;
    for key in 0..key_space {
        if let (value, true) = map.load(key) {
            let (owner, worker) = decode_value(value);
            if owner != key || worker >= workers {
                return Err(WorkloadError::Corrupted { key, value });
            }
            live += 1;
        }
    }
    Ok(live)
}

fn join_all(handles: Vec<thread::JoinHandle<()>>) -> Result<(), WorkloadError> {
    let mut failed = None;
    for (worker, handle) in handles.into_iter().enumerate() {
        if handle.join().is_err() && failed.is_none() {
            failed = Some(worker);
        }
    }
    match failed {
        Some(worker) => Err(WorkloadError::WorkerPanicked(worker)),
        None => Ok(()),
    }
}
