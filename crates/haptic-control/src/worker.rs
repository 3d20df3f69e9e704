//! Single-threaded actor that owns mutable state and runs timed ticks.
//!
//! Every external entry point enqueues a closure. The worker thread waits
//! for the next job or the tick deadline, drains every job already queued
//! in FIFO order, then runs one tick. The tick's return value arms the next
//! deadline:
//!
//! | Tick result | Next wait |
//! |---|---|
//! | `Some(0)` | none, tick again right after draining |
//! | `Some(ms)` | until `now + ms` or the next job |
//! | `None` | until the next job |
//!
//! Panics inside jobs and ticks are caught and logged; the loop survives.
//! Stopping skips whatever is still queued and hands the state to
//! [`Tickable::shutdown`].

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded, unbounded};
use parking_lot::Mutex;

use crate::error::WorkerError;

/// State driven by a [`Worker`].
pub trait Tickable: Send + 'static {
    /// Advances the state by one tick.
    ///
    /// Returns milliseconds until the next tick is wanted, or `None` to
    /// sleep until the next job arrives.
    fn tick(&mut self) -> Option<u64>;

    /// Runs on the worker thread once the loop has exited. Jobs still
    /// queued at that point are dropped unrun.
    fn shutdown(&mut self) {}
}

type Job<S> = Box<dyn FnOnce(&mut S) + Send>;

enum Message<S> {
    Run(Job<S>),
    Wake,
}

/// Handle to a worker thread owning an `S`.
///
/// Dropping the handle stops the thread.
pub struct Worker<S> {
    sender: Sender<Message<S>>,
    stopped: Arc<AtomicBool>,
    handle: Mutex<Option<JoinHandle<()>>>,
    thread_id: ThreadId,
}

impl<S: Tickable> Worker<S> {
    /// Moves `state` onto a new named thread and starts the loop.
    pub fn spawn(name: impl Into<String>, state: S) -> Result<Self, WorkerError> {
        let (sender, receiver) = unbounded();
        let stopped = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stopped);
        let handle = thread::Builder::new()
            .name(name.into())
            .spawn(move || run(state, &receiver, &flag))
            .map_err(WorkerError::Spawn)?;
        let thread_id = handle.thread().id();
        Ok(Self {
            sender,
            stopped,
            handle: Mutex::new(Some(handle)),
            thread_id,
        })
    }

    /// Enqueues a fire-and-forget job.
    pub fn post(&self, job: impl FnOnce(&mut S) + Send + 'static) -> Result<(), WorkerError> {
        if self.is_stopped() {
            return Err(WorkerError::Stopped);
        }
        self.sender
            .send(Message::Run(Box::new(job)))
            .map_err(|_| WorkerError::Stopped)
    }

    /// Runs `job` on the worker and blocks until it returns.
    ///
    /// Must not be called from the worker thread itself.
    pub fn query<R: Send + 'static>(
        &self,
        job: impl FnOnce(&mut S) -> R + Send + 'static,
    ) -> Result<R, WorkerError> {
        if thread::current().id() == self.thread_id {
            return Err(WorkerError::Reentrant);
        }
        let (reply, answer) = bounded(1);
        self.post(move |state| {
            let _ = reply.send(job(state));
        })?;
        answer.recv().map_err(|_| {
            if self.is_stopped() {
                WorkerError::Stopped
            } else {
                WorkerError::NoReply
            }
        })
    }
}

impl<S> Worker<S> {
    /// Forces a tick without queueing work.
    pub fn wake(&self) {
        let _ = self.sender.send(Message::Wake);
    }

    /// Whether [`stop`](Self::stop) has been called.
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// Stops the loop and joins the thread. Queued jobs are discarded.
    ///
    /// Idempotent. Called from the worker thread it only raises the flag.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
        self.wake();
        if thread::current().id() == self.thread_id {
            return;
        }
        let handle = self.handle.lock().take();
        if let Some(handle) = handle
            && handle.join().is_err()
        {
            tracing::error!("worker thread terminated by panic");
        }
    }
}

impl<S> Drop for Worker<S> {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run<S: Tickable>(mut state: S, receiver: &Receiver<Message<S>>, stopped: &AtomicBool) {
    let name = thread::current().name().unwrap_or("worker").to_owned();
    tracing::debug!(thread = %name, "worker started");
    let mut deadline: Option<Instant> = None;

    loop {
        let first = match deadline {
            Some(at) => match receiver.recv_deadline(at) {
                Ok(message) => Some(message),
                Err(RecvTimeoutError::Timeout) => None,
                Err(RecvTimeoutError::Disconnected) => break,
            },
            None => match receiver.recv() {
                Ok(message) => Some(message),
                Err(_) => break,
            },
        };

        let mut next = first;
        while let Some(message) = next {
            if stopped.load(Ordering::Acquire) {
                break;
            }
            if let Message::Run(job) = message
                && catch_unwind(AssertUnwindSafe(|| job(&mut state))).is_err()
            {
                tracing::error!(thread = %name, "worker job panicked");
            }
            next = receiver.try_recv().ok();
        }
        if stopped.load(Ordering::Acquire) {
            break;
        }

        let delay = match catch_unwind(AssertUnwindSafe(|| state.tick())) {
            Ok(delay) => delay,
            Err(_) => {
                tracing::error!(thread = %name, "worker tick panicked");
                None
            }
        };
        deadline = delay.map(|ms| Instant::now() + Duration::from_millis(ms));
    }

    let skipped = receiver
        .try_iter()
        .filter(|message| matches!(message, Message::Run(_)))
        .count();
    if catch_unwind(AssertUnwindSafe(|| state.shutdown())).is_err() {
        tracing::error!(thread = %name, "worker shutdown panicked");
    }
    tracing::debug!(thread = %name, skipped, "worker stopped");
}
