//! Index partitioning, the parallel-for primitive, and the error metric.
//!
//! Every layer phase in the engine (forward middle, forward output, update
//! output, update middle) is the same shape of work: N independent per-neuron
//! computations that each write one disjoint slot. [`parallel_for_each_mut`]
//! captures that shape once — partition `[0, N)` into contiguous ranges, run
//! one scoped thread per range, and join them all before returning. The join
//! is the barrier between phases; no phase overlaps the next.

use std::ops::Range;
use std::thread;

/// Mean squared error between one produced output and its answer.
///
/// The aggregate convergence error is the mean of this value across all
/// output dimensions and all samples of the current trial.
#[inline]
pub fn mean_squared_error(output: f64, answer: f64) -> f64 {
    (output - answer) * (output - answer)
}

/// Partition `[0, total)` into at most `workers` contiguous ranges.
///
/// Ranges are disjoint, in order, and cover every index exactly once for any
/// `(total, workers)` pair. Each range gets `total / workers` indices and the
/// last range absorbs the remainder. When `total < workers` the worker count
/// collapses to `total` so no empty ranges are produced; `total == 0` yields
/// no ranges at all.
pub fn partition_ranges(total: usize, workers: usize) -> Vec<Range<usize>> {
    if total == 0 {
        return Vec::new();
    }
    let workers = workers.clamp(1, total);
    let chunk = total / workers;

    let mut ranges = Vec::with_capacity(workers);
    let mut begin = 0;
    for i in 0..workers {
        let end = if i == workers - 1 { total } else { begin + chunk };
        ranges.push(begin..end);
        begin = end;
    }
    ranges
}

/// Run `f(index, &mut item)` over every item of `items`, fanned out across
/// `workers` OS threads, and block until all of them finish.
///
/// The slice is split into the contiguous sub-slices given by
/// [`partition_ranges`], so each thread owns a disjoint region and no locking
/// is needed. Returning from this function is a hard barrier: all per-item
/// work is complete before the caller proceeds.
///
/// With a single worker (or a single partition) the work runs inline on the
/// calling thread — useful for tests that pin `num_threads` to 1.
pub fn parallel_for_each_mut<T, F>(items: &mut [T], workers: usize, f: F)
where
    T: Send,
    F: Fn(usize, &mut T) + Sync,
{
    let ranges = partition_ranges(items.len(), workers);

    if ranges.len() <= 1 {
        for (index, item) in items.iter_mut().enumerate() {
            f(index, item);
        }
        return;
    }

    thread::scope(|scope| {
        let f = &f;
        let mut rest = items;
        for range in ranges {
            let (chunk, tail) = rest.split_at_mut(range.len());
            rest = tail;
            let begin = range.start;
            scope.spawn(move || {
                for (offset, item) in chunk.iter_mut().enumerate() {
                    f(begin + offset, item);
                }
            });
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Every index must be covered exactly once, whatever the host reports.
    fn assert_exact_cover(total: usize, workers: usize) {
        let ranges = partition_ranges(total, workers);
        let mut seen = vec![0usize; total];
        let mut prev_end = 0;
        for range in &ranges {
            assert_eq!(range.start, prev_end, "ranges must be contiguous");
            prev_end = range.end;
            for i in range.clone() {
                seen[i] += 1;
            }
        }
        assert_eq!(prev_end, total);
        assert!(seen.iter().all(|&count| count == 1), "{total}/{workers}");
    }

    #[test]
    fn test_partition_exact_cover() {
        for total in 0..40 {
            for workers in 0..12 {
                assert_exact_cover(total, workers);
            }
        }
        assert_exact_cover(1000, 7);
        assert_exact_cover(7, 1000);
    }

    #[test]
    fn test_partition_last_absorbs_remainder() {
        let ranges = partition_ranges(10, 3);
        assert_eq!(ranges, vec![0..3, 3..6, 6..10]);
    }

    #[test]
    fn test_partition_more_workers_than_items() {
        let ranges = partition_ranges(3, 8);
        assert_eq!(ranges.len(), 3);
        assert!(ranges.iter().all(|r| r.len() == 1));
    }

    #[test]
    fn test_partition_empty() {
        assert!(partition_ranges(0, 4).is_empty());
    }

    #[test]
    fn test_parallel_for_visits_each_slot_once() {
        for workers in [1, 2, 3, 8] {
            let mut slots = vec![0u32; 23];
            parallel_for_each_mut(&mut slots, workers, |_, slot| *slot += 1);
            assert!(slots.iter().all(|&v| v == 1), "workers={workers}");
        }
    }

    #[test]
    fn test_parallel_for_passes_global_indices() {
        let mut slots = vec![0usize; 57];
        parallel_for_each_mut(&mut slots, 4, |index, slot| *slot = index);
        for (i, &v) in slots.iter().enumerate() {
            assert_eq!(v, i);
        }
    }

    #[test]
    fn test_parallel_for_empty_slice() {
        let mut slots: Vec<f64> = Vec::new();
        parallel_for_each_mut(&mut slots, 4, |_, _| unreachable!());
    }

    #[test]
    fn test_mse_known_values() {
        assert_eq!(mean_squared_error(3.0, 5.0), 4.0);
        assert_eq!(mean_squared_error(5.0, 3.0), 4.0);
        for x in [-2.5, 0.0, 1.0, 1e6] {
            assert_eq!(mean_squared_error(x, x), 0.0);
        }
    }
}
