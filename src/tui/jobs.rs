//! Worker-thread job runner for the TUI screens.
//!
//! Network work must never block the render loop. A screen owns a [`Jobs`]
//! value, spawns closures onto worker threads and drains finished results
//! between frames. Every job is tagged with the epoch current at spawn time;
//! bumping the epoch makes all outstanding completions stale, and stale
//! completions are dropped at drain time. There is no cancellation: a screen
//! that moves on simply stops caring about the answer.

use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

#[derive(Debug)]
pub struct Jobs<M> {
    tx: Sender<(u64, M)>,
    rx: Receiver<(u64, M)>,
    epoch: u64,
}

impl<M: Send + 'static> Jobs<M> {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Jobs { tx, rx, epoch: 0 }
    }

    /// Abandon interest in everything currently in flight.
    pub fn invalidate(&mut self) {
        self.epoch += 1;
    }

    /// Run `work` on a worker thread. The result reaches the next
    /// [`Jobs::drain`] unless the epoch has moved on in the meantime.
    pub fn spawn<F>(&self, work: F)
    where
        F: FnOnce() -> M + Send + 'static,
    {
        let tx = self.tx.clone();
        let epoch = self.epoch;
        thread::spawn(move || {
            let msg = work();
            // The receiver is gone once the TUI has exited; that is fine.
            let _ = tx.send((epoch, msg));
        });
    }

    /// Collect every completion that is still current.
    pub fn drain(&self) -> Vec<M> {
        let mut out = Vec::new();
        while let Ok((epoch, msg)) = self.rx.try_recv() {
            if epoch == self.epoch {
                out.push(msg);
            } else {
                log::debug!("dropping stale completion (epoch {epoch}, now {})", self.epoch);
            }
        }
        out
    }
}
