//! The host context: a single consumer that owns the document.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use hostbridge_commands::Document;
use thiserror::Error;
use tracing::{debug, info};

use super::{BRIDGE_TARGET, Bridge, WorkItem};

/// Errors raised while running the host thread.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The host thread could not be started.
    #[error("failed to spawn host thread: {source}")]
    Spawn {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The host thread panicked.
    #[error("host thread panicked")]
    ThreadPanic,
}

/// Owns the document and drains submitted work one item at a time.
#[derive(Debug)]
pub struct HostRuntime {
    document: Document,
    queue: Receiver<WorkItem>,
    submit: Sender<WorkItem>,
}

impl HostRuntime {
    /// Creates a runtime around `document` with an empty queue.
    #[must_use]
    pub fn new(document: Document) -> Self {
        let (submit, queue) = mpsc::channel();
        Self {
            document,
            queue,
            submit,
        }
    }

    /// Returns a bridge that submits to this runtime.
    #[must_use]
    pub fn bridge(&self) -> Bridge {
        Bridge::new(self.submit.clone())
    }

    /// Read access to the document.
    #[must_use]
    pub const fn document(&self) -> &Document {
        &self.document
    }

    /// Runs every item currently queued and returns how many ran.
    pub fn drain_pending(&mut self) -> usize {
        let mut executed = 0;
        while let Ok(item) = self.queue.try_recv() {
            item.run(&mut self.document);
            executed += 1;
        }
        executed
    }

    /// Starts the host loop on a dedicated thread.
    ///
    /// The loop wakes when work arrives or after `idle_interval`, drains the
    /// queue, and exits once stopped, finishing the item in progress first.
    /// Items still queued at exit are dropped, which releases their callers
    /// with [`super::BridgeError::Abandoned`].
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Spawn`] if the thread cannot be created.
    pub fn spawn(self, idle_interval: Duration) -> Result<HostRuntimeHandle, RuntimeError> {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);
        let handle = thread::Builder::new()
            .name("hostbridge-host".into())
            .spawn(move || self.run_loop(&stop_flag, idle_interval))
            .map_err(|source| RuntimeError::Spawn { source })?;
        Ok(HostRuntimeHandle {
            stop,
            handle: Some(handle),
        })
    }

    fn run_loop(mut self, stop: &AtomicBool, idle_interval: Duration) {
        info!(
            target: BRIDGE_TARGET,
            idle_ms = idle_interval.as_millis(),
            "host context running"
        );
        while !stop.load(Ordering::SeqCst) {
            match self.queue.recv_timeout(idle_interval) {
                Ok(item) => {
                    item.run(&mut self.document);
                    while !stop.load(Ordering::SeqCst) {
                        let Ok(next) = self.queue.try_recv() else {
                            break;
                        };
                        next.run(&mut self.document);
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        debug!(
            target: BRIDGE_TARGET,
            revision = self.document.revision(),
            "host context stopped"
        );
    }
}

/// Handle to the background host thread.
#[derive(Debug)]
pub struct HostRuntimeHandle {
    stop: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl HostRuntimeHandle {
    /// Asks the host loop to stop after its current item.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    /// Waits for the host thread to exit.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::ThreadPanic`] if the thread panicked.
    pub fn join(mut self) -> Result<(), RuntimeError> {
        match self.handle.take() {
            Some(handle) => handle.join().map_err(|_| RuntimeError::ThreadPanic),
            None => Ok(()),
        }
    }
}

impl Drop for HostRuntimeHandle {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
    }
}
