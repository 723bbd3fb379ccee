//! crates/courseware_core/src/debounce.rs
//!
//! Coalesces bursts of edits (e.g. typing a project name) into a single save
//! that runs once the edits have been idle for a while.

use std::future::Future;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

enum Signal {
    Touch,
    FlushNow(oneshot::Sender<()>),
}

/// Handle to a background task that runs `flush` after `idle` has passed
/// without a `touch`. Dropping every handle flushes any pending edit and stops
/// the task.
#[derive(Clone)]
pub struct SaveDebouncer {
    tx: mpsc::UnboundedSender<Signal>,
}

impl SaveDebouncer {
    pub fn spawn<F, Fut>(idle: Duration, flush: F) -> Self
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<Signal>();

        tokio::spawn(async move {
            while let Some(signal) = rx.recv().await {
                let mut waiter = match signal {
                    Signal::Touch => None,
                    Signal::FlushNow(done) => Some(done),
                };

                // An edit is pending: wait for the quiet period.
                while waiter.is_none() {
                    tokio::select! {
                        next = rx.recv() => match next {
                            Some(Signal::Touch) => continue,
                            Some(Signal::FlushNow(done)) => waiter = Some(done),
                            None => break,
                        },
                        _ = tokio::time::sleep(idle) => break,
                    }
                }

                debug!("Flushing debounced save.");
                flush().await;
                if let Some(done) = waiter {
                    let _ = done.send(());
                }
            }
        });

        Self { tx }
    }

    /// Records an edit, restarting the idle window.
    pub fn touch(&self) {
        let _ = self.tx.send(Signal::Touch);
    }

    /// Runs the save immediately and waits for it to finish.
    pub async fn flush_now(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(Signal::FlushNow(done_tx)).is_ok() {
            let _ = done_rx.await;
        }
    }
}
