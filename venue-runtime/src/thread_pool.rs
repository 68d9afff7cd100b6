use crate::{Job, Service};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};

struct Shared {
    jobs: Mutex<VecDeque<Job>>,
    not_empty: Condvar,
    shutting_down: AtomicBool,
}

/// Fixed-size worker pool. Tasks are FIFO-dequeued; idle workers block on a condition
/// variable. [`ThreadPool::shutdown`] stops accepting new tasks, drains the queue, then
/// joins every worker.
pub struct ThreadPool {
    shared: Arc<Shared>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    worker_ids: Mutex<Vec<ThreadId>>,
}

impl ThreadPool {
    pub fn new(size: usize) -> Self {
        assert!(size > 0, "thread pool size must be non-zero");

        let shared = Arc::new(Shared {
            jobs: Mutex::new(VecDeque::new()),
            not_empty: Condvar::new(),
            shutting_down: AtomicBool::new(false),
        });

        let mut workers = Vec::with_capacity(size);
        let mut worker_ids = Vec::with_capacity(size);
        for index in 0..size {
            let shared = Arc::clone(&shared);
            let (tx, rx) = std::sync::mpsc::channel::<ThreadId>();
            let handle = thread::Builder::new()
                .name(format!("venue-pool-{index}"))
                .spawn(move || {
                    tx.send(thread::current().id()).ok();
                    worker_loop(shared);
                })
                .expect("failed to spawn worker thread");
            worker_ids.push(rx.recv().expect("worker failed to report its thread id"));
            workers.push(handle);
        }

        Self {
            shared,
            workers: Mutex::new(workers),
            worker_ids: Mutex::new(worker_ids),
        }
    }

    /// Stops accepting new tasks, drains whatever remains in the queue, then joins
    /// every worker. Calling this from a worker thread of this same pool is a
    /// programmer error and aborts the process.
    pub fn shutdown(&self) {
        if self.worker_ids.lock().contains(&thread::current().id()) {
            tracing::error!("thread pool shutdown invoked from its own worker thread");
            std::process::abort();
        }

        self.shared.shutting_down.store(true, Ordering::SeqCst);
        self.shared.not_empty.notify_all();

        let mut workers = self.workers.lock();
        for worker in workers.drain(..) {
            let _ = worker.join();
        }
    }
}

impl Service for ThreadPool {
    fn execute(&self, job: Job) {
        if self.shared.shutting_down.load(Ordering::SeqCst) {
            tracing::warn!("rejected task submitted after thread pool shutdown");
            return;
        }
        self.shared.jobs.lock().push_back(job);
        self.shared.not_empty.notify_one();
    }
}

fn worker_loop(shared: Arc<Shared>) {
    loop {
        let mut guard = shared.jobs.lock();
        loop {
            if let Some(job) = guard.pop_front() {
                drop(guard);
                job();
                break;
            }
            if shared.shutting_down.load(Ordering::SeqCst) {
                return;
            }
            shared.not_empty.wait(&mut guard);
        }
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        if !self.shared.shutting_down.load(Ordering::SeqCst) {
            self.shutdown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn executes_all_submitted_jobs() {
        let pool = ThreadPool::new(4);
        let counter = Arc::new(AtomicUsize::new(0));
        for _ in 0..100 {
            let counter = Arc::clone(&counter);
            pool.execute(Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }));
        }
        pool.shutdown();
        assert_eq!(counter.load(Ordering::SeqCst), 100);
    }

    #[test]
    fn rejects_tasks_after_shutdown() {
        let pool = ThreadPool::new(2);
        pool.shutdown();
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = Arc::clone(&counter);
        pool.execute(Box::new(move || {
            counter_clone.fetch_add(1, Ordering::SeqCst);
        }));
        thread::sleep(std::time::Duration::from_millis(20));
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }
}
