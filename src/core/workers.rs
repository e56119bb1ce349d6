//! Background pool for image decode.
//!
//! A playback tick must never wait on a decode, so frame bytes are handed to
//! this pool and the registry slot fills whenever the decode lands. Uses
//! work-stealing deques: jobs enter through a global injector, idle workers
//! steal from each other.
//!
//! The epoch counter cancels stale work: jobs are enqueued with the epoch
//! current at submission and skipped at execution time if it has moved on
//! (global disable, subsystem teardown).

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam::deque::{Injector, Worker};
use log::trace;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Work-stealing decode pool.
pub struct DecodePool {
    injector: Arc<Injector<Job>>,
    handles: Vec<thread::JoinHandle<()>>,
    epoch: Arc<AtomicU64>,
    shutdown: Arc<AtomicBool>,
}

impl DecodePool {
    pub fn new(num_threads: usize) -> Self {
        let num_threads = num_threads.max(1);
        let injector: Arc<Injector<Job>> = Arc::new(Injector::new());
        let shutdown = Arc::new(AtomicBool::new(false));

        let mut locals: Vec<Worker<Job>> = Vec::new();
        let mut stealers = Vec::new();
        for _ in 0..num_threads {
            let worker: Worker<Job> = Worker::new_fifo();
            stealers.push(worker.stealer());
            locals.push(worker);
        }

        let mut handles = Vec::new();
        for (worker_id, local) in locals.into_iter().enumerate() {
            let injector = Arc::clone(&injector);
            let shutdown = Arc::clone(&shutdown);
            let stealers = stealers.clone();

            let handle = thread::Builder::new()
                .name(format!("glimpse-decode-{}", worker_id))
                .spawn(move || {
                    trace!("Decode worker {} started", worker_id);
                    loop {
                        if let Some(job) = local.pop() {
                            job();
                            continue;
                        }
                        if let Some(job) = injector.steal().success() {
                            job();
                            continue;
                        }
                        if let Some(job) = stealers.iter().find_map(|s| s.steal().success()) {
                            job();
                            continue;
                        }
                        if shutdown.load(Ordering::Relaxed) {
                            break;
                        }
                        thread::sleep(Duration::from_millis(1));
                    }
                    trace!("Decode worker {} stopped", worker_id);
                })
                .expect("failed to spawn decode worker");

            handles.push(handle);
        }

        Self {
            injector,
            handles,
            epoch: Arc::new(AtomicU64::new(0)),
            shutdown,
        }
    }

    pub fn current_epoch(&self) -> u64 {
        self.epoch.load(Ordering::Relaxed)
    }

    /// Invalidate all queued-but-unexecuted jobs.
    pub fn bump_epoch(&self) -> u64 {
        self.epoch.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Enqueue a job tagged with the submission-time epoch. The epoch is
    /// re-checked when a worker picks the job up, not when it is queued.
    pub fn execute_with_epoch<F>(&self, epoch: u64, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let current = Arc::clone(&self.epoch);
        self.injector.push(Box::new(move || {
            if current.load(Ordering::Relaxed) == epoch {
                f();
            }
        }));
    }
}

impl Drop for DecodePool {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        self.bump_epoch();

        // Bounded wait; leftover threads die with the process.
        let deadline = Instant::now() + Duration::from_millis(500);
        for handle in std::mem::take(&mut self.handles) {
            while !handle.is_finished() {
                if Instant::now() >= deadline {
                    trace!("Decode pool shutdown timeout");
                    return;
                }
                thread::sleep(Duration::from_millis(1));
            }
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicI32;

    fn wait_for(pred: impl Fn() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(2);
        while !pred() {
            assert!(Instant::now() < deadline, "timed out waiting");
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn jobs_run() {
        let pool = DecodePool::new(2);
        let count = Arc::new(AtomicI32::new(0));
        for _ in 0..8 {
            let count = Arc::clone(&count);
            pool.execute_with_epoch(pool.current_epoch(), move || {
                count.fetch_add(1, Ordering::SeqCst);
            });
        }
        wait_for(|| count.load(Ordering::SeqCst) == 8);
    }

    #[test]
    fn stale_epoch_jobs_are_skipped() {
        let pool = DecodePool::new(1);
        let stale = pool.current_epoch();

        // Park the worker so the stale job cannot run before the bump.
        let gate = Arc::new(AtomicBool::new(false));
        {
            let gate = Arc::clone(&gate);
            pool.execute_with_epoch(stale, move || {
                while !gate.load(Ordering::SeqCst) {
                    thread::sleep(Duration::from_millis(1));
                }
            });
        }

        let count = Arc::new(AtomicI32::new(0));
        {
            let count = Arc::clone(&count);
            pool.execute_with_epoch(stale, move || {
                count.fetch_add(1, Ordering::SeqCst);
            });
        }

        pool.bump_epoch();
        gate.store(true, Ordering::SeqCst);

        let fresh = pool.current_epoch();
        let ran = Arc::new(AtomicBool::new(false));
        {
            let ran = Arc::clone(&ran);
            pool.execute_with_epoch(fresh, move || {
                ran.store(true, Ordering::SeqCst);
            });
        }

        wait_for(|| ran.load(Ordering::SeqCst));
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
