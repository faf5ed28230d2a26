//! Background work: decoding, thumbnail capture and export.
//!
//! Each job runs on its own named thread and reports through a channel that
//! the UI thread drains with [`JobQueue::drain`]. Results are tagged with the
//! generation they were started for; applying them is the editor's job.

use crate::session::Generation;
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::path::PathBuf;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::thread;
use std::time::Duration;
use tracing::{debug, error, warn};
use trimdeck_audio::AudioBuffer;
use trimdeck_core::{Result, TrimdeckError};
use trimdeck_media::{ExportOutcome, ThumbnailCache};

/// Message from a background job.
#[derive(Debug)]
pub enum JobMessage {
    Decoded {
        generation: Generation,
        path: PathBuf,
        result: Result<AudioBuffer>,
    },
    Thumbnails {
        generation: Generation,
        cache: ThumbnailCache,
    },
    /// Intermediate progress; does not finish the job.
    ExportProgress {
        generation: Generation,
        fraction: f64,
    },
    ExportDone {
        generation: Generation,
        result: Result<ExportOutcome>,
    },
}

impl JobMessage {
    pub fn generation(&self) -> Generation {
        match self {
            JobMessage::Decoded { generation, .. }
            | JobMessage::Thumbnails { generation, .. }
            | JobMessage::ExportProgress { generation, .. }
            | JobMessage::ExportDone { generation, .. } => *generation,
        }
    }

    fn is_final(&self) -> bool {
        !matches!(self, JobMessage::ExportProgress { .. })
    }
}

/// Cloneable sender handed to a running job for intermediate messages.
#[derive(Debug, Clone)]
pub struct JobSender(Sender<JobMessage>);

impl JobSender {
    pub fn send(&self, message: JobMessage) {
        // The queue may be gone after shutdown; nothing to report to.
        let _ = self.0.send(message);
    }
}

/// Spawns jobs and collects their messages.
#[derive(Debug)]
pub struct JobQueue {
    tx: Sender<JobMessage>,
    rx: Receiver<JobMessage>,
    pending: usize,
}

impl Default for JobQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl JobQueue {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx, pending: 0 }
    }

    /// Jobs started but not yet finished.
    pub fn pending(&self) -> usize {
        self.pending
    }

    /// Run `job` on a thread named `trimdeck-<name>`. Its return value is
    /// the final message. If the job panics, `on_panic` builds the final
    /// message from the panic text instead, so the job still finishes.
    pub fn spawn<F, P>(&mut self, name: &str, job: F, on_panic: P) -> Result<()>
    where
        F: FnOnce(&JobSender) -> JobMessage + Send + 'static,
        P: FnOnce(String) -> JobMessage + Send + 'static,
    {
        let sender = JobSender(self.tx.clone());
        let label = name.to_string();
        thread::Builder::new()
            .name(format!("trimdeck-{name}"))
            .spawn(move || {
                let message = match panic::catch_unwind(AssertUnwindSafe(|| job(&sender))) {
                    Ok(message) => message,
                    Err(payload) => {
                        let reason = panic_reason(payload.as_ref());
                        error!("{} job panicked: {}", label, reason);
                        on_panic(reason)
                    }
                };
                sender.send(message);
            })
            .map_err(|e| {
                warn!("Failed to spawn {} job: {}", name, e);
                TrimdeckError::Io(e)
            })?;
        self.pending += 1;
        debug!("Spawned {} job ({} pending)", name, self.pending);
        Ok(())
    }

    /// Everything received so far. Never blocks.
    pub fn drain(&mut self) -> Vec<JobMessage> {
        let messages: Vec<_> = self.rx.try_iter().collect();
        for message in &messages {
            self.note(message);
        }
        messages
    }

    /// Block for the next message, up to `timeout`.
    pub fn wait(&mut self, timeout: Duration) -> Option<JobMessage> {
        match self.rx.recv_timeout(timeout) {
            Ok(message) => {
                self.note(&message);
                Some(message)
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    fn note(&mut self, message: &JobMessage) {
        if message.is_final() {
            self.pending = self.pending.saturating_sub(1);
        }
    }
}

fn panic_reason(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_reports_progress_then_result() {
        let mut queue = JobQueue::new();
        let generation = Generation::default().next();
        queue
            .spawn(
                "test",
                move |tx| {
                    tx.send(JobMessage::ExportProgress { generation, fraction: 0.5 });
                    JobMessage::ExportDone {
                        generation,
                        result: Err(TrimdeckError::ExportFailure("boom".into())),
                    }
                },
                move |reason| JobMessage::ExportDone {
                    generation,
                    result: Err(TrimdeckError::ExportFailure(reason)),
                },
            )
            .unwrap();
        assert_eq!(queue.pending(), 1);

        let first = queue.wait(Duration::from_secs(5)).unwrap();
        assert!(matches!(first, JobMessage::ExportProgress { fraction, .. } if fraction == 0.5));
        assert_eq!(queue.pending(), 1);

        let second = queue.wait(Duration::from_secs(5)).unwrap();
        assert_eq!(second.generation(), generation);
        assert!(matches!(second, JobMessage::ExportDone { result: Err(_), .. }));
        assert_eq!(queue.pending(), 0);
    }

    #[test]
    fn test_drain_empty() {
        let mut queue = JobQueue::new();
        assert!(queue.drain().is_empty());
        assert!(queue.wait(Duration::from_millis(1)).is_none());
    }

    #[test]
    fn test_panicking_job_still_finishes() {
        let mut queue = JobQueue::new();
        let generation = Generation::default().next().next();
        queue
            .spawn(
                "test",
                |_| panic!("decoder blew up"),
                move |reason| JobMessage::Decoded {
                    generation,
                    path: PathBuf::from("x.wav"),
                    result: Err(TrimdeckError::DecodeFailure(reason)),
                },
            )
            .unwrap();
        assert_eq!(queue.pending(), 1);

        let message = queue.wait(Duration::from_secs(5)).unwrap();
        assert_eq!(message.generation(), generation);
        match message {
            JobMessage::Decoded { result: Err(TrimdeckError::DecodeFailure(reason)), .. } => {
                assert_eq!(reason, "decoder blew up");
            }
            other => panic!("unexpected message {:?}", other),
        }
        assert_eq!(queue.pending(), 0);
    }
}
