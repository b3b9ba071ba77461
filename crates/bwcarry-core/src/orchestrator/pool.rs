//! Fixed-size worker pool over the worklist.
//!
//! Workers pull unit indices from a shared queue and send each result back
//! over a channel; the call returns once every worker has exited.

use std::collections::VecDeque;
use std::sync::mpsc;
use std::sync::{Mutex, PoisonError};
use std::thread;

use super::worker::{UnitStatus, WorkerResult};
use crate::model::WorkItem;

pub(crate) struct PoolOutput {
    /// One slot per work item, in worklist order; `None` when the worker died mid-unit.
    pub results: Vec<Option<WorkerResult>>,
    /// The pool's own exit status: a worker thread panicked, or a worker's
    /// returned failure count was non-zero. Taken from `join`, never from `results`.
    pub pool_failed: bool,
}

pub(crate) fn dispatch<F>(items: &[WorkItem], parallelism: usize, work: F) -> PoolOutput
where
    F: Fn(&WorkItem) -> WorkerResult + Sync,
{
    let count = items.len();
    let mut results: Vec<Option<WorkerResult>> = (0..count).map(|_| None).collect();
    if count == 0 {
        return PoolOutput {
            results,
            pool_failed: false,
        };
    }

    let queue: Mutex<VecDeque<usize>> = Mutex::new((0..count).collect());
    let (tx, rx) = mpsc::channel::<(usize, WorkerResult)>();
    let num_workers = parallelism.max(1).min(count);
    let work = &work;
    let queue = &queue;
    let mut panicked = 0usize;
    let mut reported_failures = 0usize;

    thread::scope(|scope| {
        let mut handles = Vec::with_capacity(num_workers);
        for _ in 0..num_workers {
            let tx = tx.clone();
            handles.push(scope.spawn(move || {
                // Exit code of this worker: units it saw end without success.
                let mut failures = 0usize;
                loop {
                    let next = queue
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .pop_front();
                    let Some(index) = next else {
                        break;
                    };
                    let result = work(&items[index]);
                    if result.status != Some(UnitStatus::Success) {
                        failures += 1;
                    }
                    if tx.send((index, result)).is_err() {
                        break;
                    }
                }
                failures
            }));
        }
        drop(tx);

        for (index, result) in rx {
            results[index] = Some(result);
        }
        for h in handles {
            match h.join() {
                Ok(failures) => reported_failures += failures,
                Err(_) => panicked += 1,
            }
        }
    });

    if panicked > 0 {
        tracing::error!(
            panicked,
            "worker thread(s) panicked; their in-flight units have no result"
        );
    }
    PoolOutput {
        results,
        pool_failed: panicked > 0 || reported_failures > 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{RawAmount, ServerId};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn items(n: u64) -> Vec<WorkItem> {
        (1..=n)
            .map(|i| WorkItem {
                server_id: ServerId(i),
                bandwidth_limit: RawAmount::from(100),
                bandwidth_used: Some(RawAmount::from(1)),
                plan_id: "1".into(),
                ip_list: None,
            })
            .collect()
    }

    fn ok_result(id: ServerId) -> WorkerResult {
        let mut r = WorkerResult::empty(id);
        r.status = Some(UnitStatus::Success);
        r.log_lines.push("STATUS 0".into());
        r
    }

    #[test]
    fn every_unit_processed_exactly_once_in_slot_order() {
        let list = items(23);
        let calls = AtomicUsize::new(0);
        let out = dispatch(&list, 4, |item| {
            calls.fetch_add(1, Ordering::SeqCst);
            ok_result(item.server_id)
        });
        assert_eq!(calls.load(Ordering::SeqCst), 23);
        assert!(!out.pool_failed);
        for (item, slot) in list.iter().zip(&out.results) {
            assert_eq!(slot.as_ref().unwrap().server_id, item.server_id);
        }
    }

    #[test]
    fn concurrency_bounded_by_parallelism() {
        let list = items(12);
        let active = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);
        dispatch(&list, 3, |item| {
            let now = active.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(10));
            active.fetch_sub(1, Ordering::SeqCst);
            ok_result(item.server_id)
        });
        let peak = peak.load(Ordering::SeqCst);
        assert!(peak >= 1 && peak <= 3, "peak concurrency {}", peak);
    }

    #[test]
    fn panicking_worker_leaves_empty_slot_and_fails_pool() {
        let list = items(6);
        let out = dispatch(&list, 2, |item| {
            if item.server_id == ServerId(3) {
                panic!("boom");
            }
            ok_result(item.server_id)
        });
        assert!(out.pool_failed);
        assert!(out.results[2].is_none());
        let done = out.results.iter().filter(|r| r.is_some()).count();
        assert_eq!(done, 5);
    }

    #[test]
    fn failed_unit_fails_pool() {
        let list = items(2);
        let out = dispatch(&list, 2, |item| {
            let mut r = ok_result(item.server_id);
            if item.server_id == ServerId(2) {
                r.status = Some(UnitStatus::Failure);
            }
            r
        });
        assert!(out.pool_failed);
    }

    #[test]
    fn pool_status_ignores_what_the_aggregator_classifies() {
        // Success sentinel with an empty log: the worker exits cleanly even
        // though the aggregator will count the unit as failed.
        let list = items(3);
        let out = dispatch(&list, 2, |item| {
            let mut r = ok_result(item.server_id);
            if item.server_id == ServerId(2) {
                r.log_lines.clear();
            }
            r
        });
        assert!(!out.pool_failed);

        let entries = list
            .iter()
            .map(|w| w.server_id)
            .zip(out.results)
            .collect();
        let report = crate::aggregate::aggregate(entries, out.pool_failed);
        assert_eq!(report.summary.failed, 1);
        assert!(report.inconsistent);
    }

    #[test]
    fn empty_worklist() {
        let out = dispatch(&[], 5, |item| ok_result(item.server_id));
        assert!(out.results.is_empty());
        assert!(!out.pool_failed);
    }
}
