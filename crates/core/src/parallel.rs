//! Scoped worker pools over an index range.
//!
//! Both entry points spawn one worker per requested thread; workers claim
//! indices from a shared atomic counter until the range is drained, so
//! uneven per-index cost self-balances. A panic on any worker is re-raised
//! on the calling thread once every worker has been joined.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

/// Number of worker threads to use when the caller passes 0: one per
/// hardware thread, falling back to 1 if the parallelism query fails.
pub fn default_threads() -> usize {
    thread::available_parallelism().map_or(1, |n| n.get())
}

/// Run `body(i)` for every `i` in `[0, count)` across `num_threads` workers.
///
/// `num_threads = 0` selects [`default_threads`]. With one thread (or one
/// index) the loop runs inline without spawning.
pub fn parallel_for<F>(count: usize, num_threads: usize, body: F)
where
    F: Fn(usize) + Sync,
{
    let num_threads = effective_threads(count, num_threads);
    if num_threads <= 1 {
        for i in 0..count {
            body(i);
        }
        return;
    }

    let next = AtomicUsize::new(0);
    thread::scope(|s| {
        for _ in 0..num_threads {
            s.spawn(|| loop {
                let i = next.fetch_add(1, Ordering::Relaxed);
                if i >= count {
                    break;
                }
                body(i);
            });
        }
    });
}

/// Run `f(i)` for every `i` in `[0, count)` and return the results in input
/// order.
///
/// Workers collect `(index, value)` pairs privately; the driver places each
/// value into its pre-sized slot after all workers have been joined. Results
/// are therefore aligned to input positions no matter the completion order.
pub fn parallel_map<T, F>(count: usize, num_threads: usize, f: F) -> Vec<T>
where
    T: Send,
    F: Fn(usize) -> T + Sync,
{
    let num_threads = effective_threads(count, num_threads);
    if num_threads <= 1 {
        return (0..count).map(f).collect();
    }

    let next = AtomicUsize::new(0);
    let mut slots: Vec<Option<T>> = (0..count).map(|_| None).collect();
    thread::scope(|s| {
        let handles: Vec<_> = (0..num_threads)
            .map(|_| {
                s.spawn(|| {
                    let mut local = Vec::new();
                    loop {
                        let i = next.fetch_add(1, Ordering::Relaxed);
                        if i >= count {
                            break;
                        }
                        local.push((i, f(i)));
                    }
                    local
                })
            })
            .collect();
        for handle in handles {
            let local = handle
                .join()
                .unwrap_or_else(|payload| std::panic::resume_unwind(payload));
            for (i, value) in local {
                slots[i] = Some(value);
            }
        }
    });
    slots
        .into_iter()
        .map(|v| v.expect("every index is claimed exactly once"))
        .collect()
}

fn effective_threads(count: usize, num_threads: usize) -> usize {
    let requested = if num_threads == 0 {
        default_threads()
    } else {
        num_threads
    };
    requested.min(count.max(1))
}
