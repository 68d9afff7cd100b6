use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Duration;

type Callback = Box<dyn Fn() + Send + 'static>;

/// A dedicated thread that, every second, invokes all registered callbacks in
/// registration order. Registering a callback after [`OneSecondLoop::start`], or
/// calling [`OneSecondLoop::terminate`] from within the loop's own thread, is a
/// programmer error and aborts the process.
pub struct OneSecondLoop {
    callbacks: Mutex<Vec<Callback>>,
    started: AtomicBool,
    stop: Arc<AtomicBool>,
    handle: Mutex<Option<JoinHandle<()>>>,
    loop_thread_id: Mutex<Option<ThreadId>>,
}

impl OneSecondLoop {
    pub fn new() -> Self {
        Self {
            callbacks: Mutex::new(Vec::new()),
            started: AtomicBool::new(false),
            stop: Arc::new(AtomicBool::new(false)),
            handle: Mutex::new(None),
            loop_thread_id: Mutex::new(None),
        }
    }

    /// Registers `callback` to run on every tick, in registration order. Must be
    /// called before [`Self::start`].
    pub fn add_callback(&self, callback: impl Fn() + Send + 'static) {
        if self.started.load(Ordering::SeqCst) {
            tracing::error!("callback registered on a one-second loop after it started");
            std::process::abort();
        }
        self.callbacks.lock().push(Box::new(callback));
    }

    /// Spawns the dedicated tick thread.
    pub fn start(&self) {
        self.started.store(true, Ordering::SeqCst);
        let callbacks: Vec<Callback> = std::mem::take(&mut self.callbacks.lock());
        let stop = Arc::clone(&self.stop);
        let (tx, rx) = std::sync::mpsc::channel::<ThreadId>();

        let handle = thread::Builder::new()
            .name("venue-tick-loop".to_string())
            .spawn(move || {
                tx.send(thread::current().id()).ok();
                while !stop.load(Ordering::SeqCst) {
                    thread::sleep(Duration::from_secs(1));
                    if stop.load(Ordering::SeqCst) {
                        break;
                    }
                    for callback in &callbacks {
                        callback();
                    }
                }
            })
            .expect("failed to spawn tick loop thread");

        *self.loop_thread_id.lock() = Some(rx.recv().expect("tick loop failed to report its id"));
        *self.handle.lock() = Some(handle);
    }

    /// Signals the loop to stop and joins its thread. Calling this from within the
    /// loop's own thread is a programmer error and aborts the process.
    pub fn terminate(&self) {
        if self.loop_thread_id.lock().as_ref() == Some(&thread::current().id()) {
            tracing::error!("one-second loop terminated from within its own thread");
            std::process::abort();
        }
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.lock().take() {
            let _ = handle.join();
        }
    }
}

impl Default for OneSecondLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for OneSecondLoop {
    fn drop(&mut self) {
        if self.handle.lock().is_some() {
            self.terminate();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn invokes_callbacks_in_registration_order() {
        let loop_ = OneSecondLoop::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for i in 0..3 {
            let order = Arc::clone(&order);
            loop_.add_callback(move || order.lock().push(i));
        }
        loop_.start();
        thread::sleep(Duration::from_millis(1200));
        loop_.terminate();

        let observed = order.lock().clone();
        assert!(!observed.is_empty());
        assert_eq!(&observed[0..3], &[0, 1, 2]);
    }

    #[test]
    fn ticks_at_least_once_per_second() {
        let loop_ = OneSecondLoop::new();
        let ticks = Arc::new(AtomicUsize::new(0));
        let ticks_clone = Arc::clone(&ticks);
        loop_.add_callback(move || {
            ticks_clone.fetch_add(1, Ordering::SeqCst);
        });
        loop_.start();
        thread::sleep(Duration::from_millis(2200));
        loop_.terminate();
        assert!(ticks.load(Ordering::SeqCst) >= 2);
    }
}
