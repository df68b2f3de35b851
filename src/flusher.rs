use crate::{Filesystem, Store};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error};

/// Background checkpointing, off the request path.
///
/// Flushes `fs` into `store` every `every`, plus once more when stopped.
/// Failed flushes are logged and retried on the next tick.
#[derive(Debug)]
pub struct Flusher {
    stop: Option<mpsc::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Flusher {
    pub fn spawn(fs: Arc<Filesystem>, store: Store, every: Duration) -> Self {
        let (tx, rx) = mpsc::channel();

        let handle = thread::spawn(move || loop {
            let last = match rx.recv_timeout(every) {
                Err(RecvTimeoutError::Timeout) => false,
                Ok(()) | Err(RecvTimeoutError::Disconnected) => true,
            };

            debug!("checkpointing");

            if let Err(err) = store.save(&fs) {
                error!("checkpoint failed: {:?}", err);
            }

            if last {
                break;
            }
        });

        Self {
            stop: Some(tx),
            handle: Some(handle),
        }
    }

    /// Performs the final flush and waits for the thread to finish.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }

        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("flusher thread panicked");
            }
        }
    }
}

impl Drop for Flusher {
    fn drop(&mut self) {
        self.shutdown();
    }
}
