use rayon::prelude::*;
use std::num::NonZeroUsize;
use std::ops::Range;

/// Splits primitives over a bounded number of workers.
///
/// Each worker gets one contiguous range; ranges are disjoint and together
/// cover every primitive exactly once.
#[derive(Debug, Clone)]
pub struct RasterThreads {
    max_threads: usize,
}

impl RasterThreads {
    /// Bounded by the machine's available parallelism.
    pub fn new() -> Self {
        Self {
            max_threads: std::thread::available_parallelism().map_or(1, NonZeroUsize::get),
        }
    }

    pub fn with_max_threads(max_threads: usize) -> Self {
        Self {
            max_threads: max_threads.max(1),
        }
    }

    #[inline]
    pub fn max_thread_count(&self) -> usize {
        self.max_threads
    }

    /// Returns `false` and keeps the previous limit when `count` is zero.
    pub fn set_max_thread_count(&mut self, count: usize) -> bool {
        if count == 0 {
            return false;
        }
        self.max_threads = count;
        true
    }

    /// Workers used for `primitives` primitives.
    #[inline]
    pub fn worker_count(&self, primitives: usize) -> usize {
        primitives.min(self.max_threads)
    }

    pub fn split(&self, primitives: usize) -> Vec<Range<usize>> {
        split_ranges(primitives, self.worker_count(primitives))
    }

    /// Run `work` once per primitive index and return after every range is done.
    pub fn run<F>(&self, primitives: usize, work: F)
    where
        F: Fn(usize) + Send + Sync,
    {
        self.split(primitives)
            .into_par_iter()
            .for_each(|range| range.for_each(&work));
    }
}

impl Default for RasterThreads {
    fn default() -> Self {
        Self::new()
    }
}

/// Chunked division of `0..count` into at most `workers` ranges, the
/// remainder going one each to the first ranges.
pub fn split_ranges(count: usize, workers: usize) -> Vec<Range<usize>> {
    if count == 0 || workers == 0 {
        return Vec::new();
    }
    let workers = workers.min(count);
    let base = count / workers;
    let extra = count % workers;

    let mut start = 0;
    (0..workers)
        .map(|i| {
            let len = base + usize::from(i < extra);
            let range = start..start + len;
            start += len;
            range
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn remainder_goes_to_first_ranges() {
        assert_eq!(split_ranges(10, 4), vec![0..3, 3..6, 6..8, 8..10]);
        assert_eq!(split_ranges(3, 8), vec![0..1, 1..2, 2..3]);
        assert!(split_ranges(0, 4).is_empty());
        assert!(split_ranges(5, 0).is_empty());
    }

    #[test]
    fn split_is_exhaustive_and_disjoint() {
        for count in 0..64 {
            for workers in 1..12 {
                let ranges = split_ranges(count, workers);
                assert!(ranges.len() <= workers);
                let mut next = 0;
                for range in &ranges {
                    assert_eq!(range.start, next);
                    assert!(!range.is_empty());
                    next = range.end;
                }
                assert_eq!(next, count);
            }
        }
    }

    #[test]
    fn run_visits_each_primitive_once() {
        let threads = RasterThreads::with_max_threads(3);
        let hits: Vec<AtomicUsize> = (0..37).map(|_| AtomicUsize::new(0)).collect();
        threads.run(hits.len(), |i| {
            hits[i].fetch_add(1, Ordering::Relaxed);
        });
        assert!(hits.iter().all(|h| h.load(Ordering::Relaxed) == 1));
    }

    #[test]
    fn zero_thread_limit_is_rejected() {
        let mut threads = RasterThreads::with_max_threads(4);
        assert!(!threads.set_max_thread_count(0));
        assert_eq!(threads.max_thread_count(), 4);
        assert!(threads.set_max_thread_count(2));
        assert_eq!(threads.worker_count(100), 2);
        assert_eq!(threads.worker_count(1), 1);
    }
}
