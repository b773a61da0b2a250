//! Background writer for the preset file.
//!
//! The reactor thread never touches the disk on its own: it hands snapshots
//! to the persister, which coalesces bursts of changes and writes the most
//! recent one once the stream has been quiet for the debounce interval.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded, unbounded};
use tracing::{debug, error, trace, warn};

use crate::model::preset::PresetCollection;
use crate::model::store;

enum Job {
    Write(u64, PresetCollection),
    Flush(Sender<()>),
}

pub struct Persister {
    tx: Option<Sender<Job>>,
    handle: Option<JoinHandle<()>>,
    /// Generation of the most recent submitted snapshot.
    submitted: AtomicU64,
    /// Generation of the most recent snapshot the worker has dealt with.
    written: Arc<AtomicU64>,
}

impl Persister {
    pub fn spawn(path: PathBuf, debounce: Duration) -> std::io::Result<Self> {
        let (tx, rx) = unbounded();
        let written = Arc::new(AtomicU64::new(0));
        let worker_written = Arc::clone(&written);
        let handle = thread::Builder::new()
            .name("persister".to_string())
            .spawn(move || run(path, rx, debounce, worker_written))?;
        Ok(Self {
            tx: Some(tx),
            handle: Some(handle),
            submitted: AtomicU64::new(0),
            written,
        })
    }

    pub fn submit(&self, presets: PresetCollection) {
        let generation = self.submitted.fetch_add(1, Ordering::SeqCst) + 1;
        let sent = match &self.tx {
            Some(tx) => tx.send(Job::Write(generation, presets)).is_ok(),
            None => false,
        };
        if !sent {
            warn!("persister thread is gone; dropping preset write");
            self.written.fetch_max(generation, Ordering::SeqCst);
        }
    }

    /// Whether a submitted snapshot has not reached the disk yet. Never
    /// blocks.
    pub fn is_pending(&self) -> bool {
        self.written.load(Ordering::SeqCst) < self.submitted.load(Ordering::SeqCst)
    }

    /// Blocks until every snapshot submitted so far is on disk.
    pub fn flush(&self) {
        let Some(tx) = &self.tx else { return };
        let (done_tx, done_rx) = bounded(1);
        if tx.send(Job::Flush(done_tx)).is_ok() {
            let _ = done_rx.recv();
        }
    }

    pub fn shutdown(&mut self) {
        // Closing the channel makes the worker write whatever is pending and exit.
        self.tx.take();
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            error!("persister thread panicked");
        }
    }
}

impl Drop for Persister {
    fn drop(&mut self) { self.shutdown(); }
}

fn run(path: PathBuf, rx: Receiver<Job>, debounce: Duration, written: Arc<AtomicU64>) {
    let mut pending: Option<(u64, PresetCollection)> = None;
    loop {
        let job = if pending.is_some() {
            match rx.recv_timeout(debounce) {
                Ok(job) => job,
                Err(RecvTimeoutError::Timeout) => {
                    write(&path, pending.take(), &written);
                    continue;
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        } else {
            match rx.recv() {
                Ok(job) => job,
                Err(_) => break,
            }
        };
        match job {
            Job::Write(generation, presets) => {
                trace!(generation, "coalescing preset write");
                pending = Some((generation, presets));
            }
            Job::Flush(done) => {
                write(&path, pending.take(), &written);
                let _ = done.send(());
            }
        }
    }
    write(&path, pending.take(), &written);
    debug!("persister exiting");
}

/// A failed write still retires its generation; the next commit retries
/// with fresh data.
fn write(path: &PathBuf, pending: Option<(u64, PresetCollection)>, written: &AtomicU64) {
    let Some((generation, presets)) = pending else { return };
    match store::save(path, &presets) {
        Ok(()) => debug!(?path, generation, "presets written"),
        Err(e) => error!("failed to write presets: {e}"),
    }
    written.store(generation, Ordering::SeqCst);
}
