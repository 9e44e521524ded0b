//! # Cleanup
//!
//! Best-effort deletion of produced files after a retention delay.
//!
//! A [`Janitor`] owns one background thread fed through a crossbeam channel.
//! Scheduled paths are removed once their deadline passes; files that are
//! already gone are fine. Dropping the janitor removes everything still
//! pending without waiting for the deadlines; [`Janitor::wait`] honours them.

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

enum Command {
    Delete { path: PathBuf, at: Instant },
    Flush(Sender<()>),
    /// Exit once every pending deadline has passed.
    Finish,
}

/// Deletes scheduled files after a fixed delay.
#[derive(Debug)]
pub struct Janitor {
    tx: Option<Sender<Command>>,
    handle: Option<JoinHandle<()>>,
    delay: Duration,
}

impl Janitor {
    pub fn new(delay: Duration) -> std::io::Result<Self> {
        let (tx, rx) = unbounded();
        let handle = thread::Builder::new()
            .name("dropmap-janitor".into())
            .spawn(move || run(rx))?;
        Ok(Self {
            tx: Some(tx),
            handle: Some(handle),
            delay,
        })
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Schedules `paths` for deletion `delay` from now.
    pub fn schedule<I, P>(&self, paths: I)
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let at = Instant::now() + self.delay;
        for path in paths {
            let path = path.into();
            debug!(
                path = %path.display(),
                delay_secs = self.delay.as_secs(),
                "Scheduled for deletion"
            );
            if let Some(tx) = &self.tx {
                if tx.send(Command::Delete { path, at }).is_err() {
                    warn!("Janitor thread is gone, file will not be removed");
                }
            }
        }
    }

    /// Deletes everything scheduled so far immediately and waits for it.
    pub fn flush(&self) {
        let Some(tx) = &self.tx else {
            return;
        };
        let (done_tx, done_rx) = crossbeam_channel::bounded(1);
        if tx.send(Command::Flush(done_tx)).is_ok() {
            let _ = done_rx.recv();
        }
    }

    /// Blocks until every scheduled file has reached its deadline and been removed.
    pub fn wait(mut self) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(Command::Finish);
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Janitor thread panicked");
            }
        }
    }
}

impl Drop for Janitor {
    fn drop(&mut self) {
        // closing the channel makes the thread drain and exit
        self.tx.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Janitor thread panicked");
            }
        }
    }
}

fn run(rx: Receiver<Command>) {
    let mut pending: Vec<(PathBuf, Instant)> = Vec::new();
    let mut finishing = false;
    loop {
        let next = pending.iter().map(|(_, at)| *at).min();
        let received = match next {
            Some(at) => rx.recv_timeout(at.saturating_duration_since(Instant::now())),
            None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };

        match received {
            Ok(Command::Delete { path, at }) => pending.push((path, at)),
            Ok(Command::Flush(done)) => {
                for (path, _) in pending.drain(..) {
                    remove_quietly(&path);
                }
                let _ = done.send(());
            }
            Ok(Command::Finish) => finishing = true,
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) if finishing => {
                // sender gone after Finish; keep honouring deadlines
                match pending.iter().map(|(_, at)| *at).min() {
                    Some(at) => thread::sleep(at.saturating_duration_since(Instant::now())),
                    None => break,
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }

        let now = Instant::now();
        pending.retain(|(path, at)| {
            if *at <= now {
                remove_quietly(path);
                false
            } else {
                true
            }
        });
        if finishing && pending.is_empty() {
            break;
        }
    }

    for (path, _) in pending {
        remove_quietly(&path);
    }
}

/// Removes a file, treating "already gone" as success.
pub fn remove_quietly(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => debug!(path = %path.display(), "Removed"),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!("Could not remove {}: {}", path.display(), e),
    }
}
