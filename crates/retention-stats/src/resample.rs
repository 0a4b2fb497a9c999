//! Non-parametric bootstrap resampling.
//!
//! [`Bootstrap`] repeatedly draws `n` items with replacement from a slice of
//! `n` items and evaluates a caller-supplied statistic on each draw. The
//! resulting values form the empirical sampling distribution of the
//! statistic.
//!
//! # Determinism
//!
//! Iterations are grouped into chunks of [`CHUNK_SIZE`]. Every chunk owns a
//! PCG stream whose seed is drawn from a master generator seeded with the
//! [`ResampleSeed`]. Chunks write into disjoint parts of the output buffer,
//! so the output depends only on the seed, never on how many worker threads
//! ran the chunks.

use std::{fmt, num::NonZeroUsize, thread};

use rand::{
    Rng, SeedableRng as _,
    distr::{Distribution, StandardUniform},
};
use rand_pcg::Pcg32;

/// Number of resample iterations driven by one PCG stream.
pub const CHUNK_SIZE: usize = 512;

/// Seed for deterministic resampling.
///
/// Using the same seed with the same input produces the same sequence of
/// resampled statistics.
///
/// # Example
///
/// ```
/// use rand::Rng as _;
/// use retention_stats::resample::ResampleSeed;
///
/// let fixed = ResampleSeed::from(42);
/// assert_eq!(fixed.value(), 42);
///
/// let random: ResampleSeed = rand::rng().random();
/// # let _ = random;
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResampleSeed(u64);

impl ResampleSeed {
    /// Draws a fresh seed from the thread-local generator.
    #[must_use]
    pub fn random() -> Self {
        rand::rng().random()
    }

    #[must_use]
    pub fn value(self) -> u64 {
        self.0
    }
}

impl From<u64> for ResampleSeed {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for ResampleSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Allows generating random `ResampleSeed` values with `rng.random()`.
impl Distribution<ResampleSeed> for StandardUniform {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> ResampleSeed {
        ResampleSeed(rng.random())
    }
}

/// Bootstrap resampling configuration.
///
/// # Examples
///
/// ```
/// use retention_stats::resample::{Bootstrap, ResampleSeed};
///
/// let items = [1.0, 2.0, 3.0, 4.0];
/// let bootstrap = Bootstrap::new(100, ResampleSeed::from(7));
/// let means = bootstrap.run(&items, |sample| {
///     sample.iter().copied().sum::<f64>() / sample.len() as f64
/// });
///
/// assert_eq!(means.len(), 100);
/// assert!(means.iter().all(|m| (1.0..=4.0).contains(m)));
/// ```
#[derive(Debug, Clone)]
pub struct Bootstrap {
    resample_count: usize,
    seed: ResampleSeed,
    workers: NonZeroUsize,
}

impl Bootstrap {
    /// Creates a single-threaded bootstrap with `resample_count` iterations.
    #[must_use]
    pub fn new(resample_count: usize, seed: ResampleSeed) -> Self {
        Self {
            resample_count,
            seed,
            workers: NonZeroUsize::MIN,
        }
    }

    /// Sets the number of worker threads used by [`Self::run`].
    #[must_use]
    pub fn with_workers(mut self, workers: NonZeroUsize) -> Self {
        self.workers = workers;
        self
    }

    #[must_use]
    pub fn resample_count(&self) -> usize {
        self.resample_count
    }

    #[must_use]
    pub fn seed(&self) -> ResampleSeed {
        self.seed
    }

    #[must_use]
    pub fn workers(&self) -> NonZeroUsize {
        self.workers
    }

    /// Evaluates `statistic` on `resample_count` resamples of `items`.
    ///
    /// Each resample has `items.len()` elements drawn independently and
    /// uniformly with replacement. The returned vector is in iteration order.
    ///
    /// Returns an empty vector if `items` is empty.
    pub fn run<T, F>(&self, items: &[T], statistic: F) -> Vec<f64>
    where
        T: Sync,
        F: Fn(&[&T]) -> f64 + Sync,
    {
        if items.is_empty() {
            return vec![];
        }

        let mut master = Pcg32::seed_from_u64(self.seed.0);
        let mut output = vec![0.0; self.resample_count];
        let mut chunks = output
            .chunks_mut(CHUNK_SIZE)
            .map(|chunk| (master.random::<u64>(), chunk))
            .collect::<Vec<_>>();

        let workers = self.workers.get().min(chunks.len());
        if workers <= 1 {
            for (seed, chunk) in &mut chunks {
                fill_chunk(items, &statistic, *seed, chunk);
            }
        } else {
            let per_worker = chunks.len().div_ceil(workers);
            let statistic = &statistic;
            thread::scope(|s| {
                for group in chunks.chunks_mut(per_worker) {
                    s.spawn(move || {
                        for (seed, chunk) in group {
                            fill_chunk(items, statistic, *seed, chunk);
                        }
                    });
                }
            });
        }

        output
    }
}

fn fill_chunk<T, F>(items: &[T], statistic: &F, seed: u64, out: &mut [f64])
where
    F: Fn(&[&T]) -> f64,
{
    let mut rng = Pcg32::seed_from_u64(seed);
    let mut sample = Vec::with_capacity(items.len());
    for slot in out {
        sample.clear();
        sample.extend((0..items.len()).map(|_| &items[rng.random_range(0..items.len())]));
        *slot = statistic(&sample);
    }
}
