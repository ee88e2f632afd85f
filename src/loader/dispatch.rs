//! UI-thread hand-off.
//!
//! Loaders never call observers from their worker. They enqueue a job on a
//! [`UiDispatcher`], and whichever thread owns the matching [`UiQueue`]
//! (the host's UI or main loop) runs it.

use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

pub type UiJob = Box<dyn FnOnce() + Send + 'static>;

/// Sending half; cheap to clone into workers.
#[derive(Clone)]
pub struct UiDispatcher {
    sender: UnboundedSender<UiJob>,
}

impl UiDispatcher {
    /// Enqueues `job` for the UI thread. Returns `false` once the queue has
    /// been dropped, in which case the job is discarded.
    pub fn dispatch<F>(&self, job: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        self.sender.send(Box::new(job)).is_ok()
    }
}

/// Receiving half, owned by the UI thread.
pub struct UiQueue {
    receiver: UnboundedReceiver<UiJob>,
}

impl UiQueue {
    /// Runs every job queued so far on the calling thread and returns how many ran.
    pub fn run_pending(&mut self) -> usize {
        let mut ran = 0;
        while let Ok(job) = self.receiver.try_recv() {
            job();
            ran += 1;
        }
        ran
    }

    /// Blocks until one job arrives and runs it. Returns `false` when every
    /// dispatcher is gone.
    ///
    /// Must not be called from inside the tokio runtime.
    pub fn run_next_blocking(&mut self) -> bool {
        match self.receiver.blocking_recv() {
            Some(job) => {
                job();
                true
            }
            None => false,
        }
    }
}

pub fn ui_channel() -> (UiDispatcher, UiQueue) {
    let (sender, receiver) = unbounded_channel();
    (UiDispatcher { sender }, UiQueue { receiver })
}
