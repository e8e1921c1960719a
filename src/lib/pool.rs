//! Bounded worker pool.
//!
//! A fixed number of scoped worker threads pull items from a queue that is filled
//! in caller order before any worker starts, so dispatch order follows the input
//! while completion order is whatever the work dictates. Every completion is
//! appended to a shared list; the pool returns only after all workers have
//! drained the queue or observed cancellation.

use std::thread;

use crossbeam_channel::unbounded;
use log::debug;
use parking_lot::Mutex;

use crate::cancel::CancellationToken;
use crate::errors::Result;
use crate::validation::validate_concurrency;

/// What a pool run produced.
#[derive(Debug)]
pub struct PoolOutcome<T, R> {
    /// Results of every item that was started, in completion order.
    pub completed: Vec<R>,
    /// Items never started because the run was cancelled.
    pub not_dispatched: Vec<T>,
}

/// Runs items with at most `max_concurrency` in flight.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    max_concurrency: usize,
    cancel: CancellationToken,
}

impl WorkerPool {
    /// Creates a pool.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `max_concurrency` is zero.
    pub fn new(max_concurrency: usize) -> Result<Self> {
        validate_concurrency(max_concurrency, "max_concurrency")?;
        Ok(Self { max_concurrency, cancel: CancellationToken::new() })
    }

    /// Uses `cancel` to stop dispatching. Items already running are left to finish.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// The concurrency bound.
    #[must_use]
    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Dispatches `items` in order to `work` and collects every result.
    ///
    /// A failing item is just another result: nothing here stops sibling work
    /// unless the cancellation token is raised.
    pub fn run_all<T, R, F>(&self, items: Vec<T>, work: F) -> PoolOutcome<T, R>
    where
        T: Send,
        R: Send,
        F: Fn(T) -> R + Sync,
    {
        let total = items.len();
        let (tx, rx) = unbounded();
        for item in items {
            // `rx` lives until the end of this call, so sending cannot fail.
            let _ = tx.send(item);
        }
        drop(tx);

        let completed = Mutex::new(Vec::with_capacity(total));
        let returned = Mutex::new(Vec::new());
        let workers = self.max_concurrency.min(total);
        debug!("Dispatching {total} item(s) to {workers} worker(s)");

        thread::scope(|scope| {
            for _ in 0..workers {
                let rx = rx.clone();
                let (work, completed, returned) = (&work, &completed, &returned);
                scope.spawn(move || {
                    while let Ok(item) = rx.recv() {
                        if self.cancel.is_cancelled() {
                            returned.lock().push(item);
                            break;
                        }
                        let result = work(item);
                        completed.lock().push(result);
                    }
                });
            }
        });

        let mut not_dispatched = returned.into_inner();
        not_dispatched.extend(rx.try_iter());
        PoolOutcome { completed: completed.into_inner(), not_dispatched }
    }
}
