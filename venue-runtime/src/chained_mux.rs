use crate::{Job, Service};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

struct State {
    locked: bool,
    queue: VecDeque<Job>,
}

/// An ordered, single-flight executor layered over a shared [`Service`]. At most one
/// posted task is in-flight at any time; tasks observed in posting order execute in
/// posting order.
///
/// `post(t)`: if not locked, lock and submit `t` directly. Otherwise enqueue. When a
/// submitted task completes, if the queue is non-empty, the queued tasks are
/// concatenated into a single chained task and submitted; otherwise the lock clears.
pub struct ChainedMux {
    pool: Arc<dyn Service>,
    state: Arc<Mutex<State>>,
}

impl ChainedMux {
    pub fn new(pool: Arc<dyn Service>) -> Self {
        Self {
            pool,
            state: Arc::new(Mutex::new(State {
                locked: false,
                queue: VecDeque::new(),
            })),
        }
    }

    /// Posts `job` onto this mux. Runs immediately on the underlying pool if no task is
    /// in-flight; otherwise queues behind the in-flight task.
    pub fn post(&self, job: Job) {
        let mut guard = self.state.lock();
        if guard.locked {
            guard.queue.push_back(job);
            return;
        }
        guard.locked = true;
        drop(guard);
        self.submit(job);
    }

    fn submit(&self, job: Job) {
        let state = Arc::clone(&self.state);
        let pool = Arc::clone(&self.pool);
        self.pool.execute(Box::new(move || {
            job();
            Self::on_complete(state, pool);
        }));
    }

    fn on_complete(state: Arc<Mutex<State>>, pool: Arc<dyn Service>) {
        let mut guard = state.lock();
        if guard.queue.is_empty() {
            guard.locked = false;
            return;
        }
        let pending: Vec<Job> = guard.queue.drain(..).collect();
        drop(guard);

        let chained: Job = Box::new(move || {
            for job in pending {
                job();
            }
        });
        let state_for_next = Arc::clone(&state);
        let pool_for_next = Arc::clone(&pool);
        pool.execute(Box::new(move || {
            chained();
            Self::on_complete(state_for_next, pool_for_next);
        }));
    }
}

impl Drop for ChainedMux {
    fn drop(&mut self) {
        let guard = self.state.lock();
        if guard.locked {
            tracing::error!("chained mux destroyed while a task was in-flight");
            std::process::abort();
        }
        if !guard.queue.is_empty() {
            tracing::error!(
                pending = guard.queue.len(),
                "chained mux destroyed with pending tasks; they will never run"
            );
        }
    }
}
