//! Hand-off worker pool.
//!
//! Jobs are never queued. [`HandoffPool::submit`] passes a job straight to a
//! worker blocked waiting for one; when no worker is idle it starts a new
//! thread for the job. Idle workers exit after the keep-alive elapses, so the
//! pool grows with load and shrinks back to nothing.

use std::{
    any::Any,
    io,
    panic::{self, AssertUnwindSafe},
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    thread,
    time::Duration,
};

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use tracing::{debug, warn};

/// A unit of work.
type Job = Box<dyn FnOnce() + Send + 'static>;

/// Unbounded pool of threads fed through a rendezvous channel.
pub struct HandoffPool {
    /// Thread name prefix.
    name: String,
    /// Zero-capacity sender; a send succeeds only into a waiting worker.
    sender: Sender<Job>,
    /// Shared by every worker.
    receiver: Receiver<Job>,
    /// How long an idle worker waits before exiting.
    keep_alive: Duration,
    /// Live worker threads.
    workers: Arc<AtomicUsize>,
    /// Suffix of the next thread name.
    next_id: AtomicUsize,
}

impl HandoffPool {
    /// Creates an empty pool.
    pub fn new(name: impl Into<String>, keep_alive: Duration) -> Self {
        let (sender, receiver) = bounded(0);
        Self {
            name: name.into(),
            sender,
            receiver,
            keep_alive,
            workers: Arc::new(AtomicUsize::new(0)),
            next_id: AtomicUsize::new(0),
        }
    }

    /// Runs `job` on an idle worker, or on a new one if none is idle.
    ///
    /// Fails only if a thread cannot be spawned.
    pub fn submit<F>(&self, job: F) -> io::Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        match self.sender.try_send(Box::new(job)) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(job) | TrySendError::Disconnected(job)) => self.spawn_worker(job),
        }
    }

    /// Number of live worker threads.
    pub fn worker_count(&self) -> usize {
        self.workers.load(Ordering::SeqCst)
    }

    /// Starts a worker that runs `first` and then waits for hand-offs.
    fn spawn_worker(&self, first: Job) -> io::Result<()> {
        let receiver = self.receiver.clone();
        let keep_alive = self.keep_alive;
        let workers = Arc::clone(&self.workers);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let name = format!("{}-{id}", self.name);

        self.workers.fetch_add(1, Ordering::SeqCst);
        let spawned = thread::Builder::new().name(name.clone()).spawn(move || {
            run_job(first);
            while let Ok(job) = receiver.recv_timeout(keep_alive) {
                run_job(job);
            }
            workers.fetch_sub(1, Ordering::SeqCst);
            debug!(worker = %name, "idle worker exiting");
        });

        if let Err(e) = spawned {
            self.workers.fetch_sub(1, Ordering::SeqCst);
            return Err(e);
        }
        Ok(())
    }
}

/// Runs a job, logging instead of propagating a panic.
fn run_job(job: Job) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
        warn!(panic = panic_message(payload.as_ref()), "pool job panicked");
    }
}

/// Best-effort text of a panic payload.
fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "non-string panic payload"
    }
}
