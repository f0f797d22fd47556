/// Background mail delivery queue
///
/// A single worker task drains a bounded queue of delivery jobs. Each job is
/// one or more messages; every message is attempted up to `max_attempts`
/// times with a linearly growing pause between attempts. Bulk jobs pause
/// between recipients so a large mailing does not flood the relay.
///
/// # Architecture
///
/// ```text
/// handler ──send()/send_bulk()──> mpsc (bounded) ──> worker ──> Mailer
///    │                                                 │
///    └──── MailReceipt::wait() <──── oneshot ──────────┘
/// ```
///
/// Enqueueing never waits: a full queue rejects the job with
/// [`MailError::QueueFull`]. On [`MailDispatcher::shutdown`] the worker stops
/// accepting jobs, delivers whatever is already queued and exits.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::{MailError, Mailer, OutgoingMail};

/// Dispatcher configuration
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Jobs that may wait in the queue
    pub queue_capacity: usize,

    /// Delivery attempts per message before giving up
    pub max_attempts: u32,

    /// Pause after the first failed attempt; grows linearly
    pub retry_backoff: Duration,

    /// Pause between recipients of a bulk job
    pub bulk_delay: Duration,

    /// Longest wait for queued mail at shutdown
    pub drain_timeout: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        DispatcherConfig {
            queue_capacity: 256,
            max_attempts: 5,
            retry_backoff: Duration::from_secs(1),
            bulk_delay: Duration::from_millis(250),
            drain_timeout: Duration::from_secs(30),
        }
    }
}

/// Outcome of one job
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeliveryReport {
    pub sent: usize,
    pub failed: usize,
}

/// Lifetime counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatcherStats {
    pub sent: u64,
    pub failed: u64,
    pub rejected: u64,
}

#[derive(Debug, Default)]
struct Counters {
    sent: AtomicU64,
    failed: AtomicU64,
    rejected: AtomicU64,
}

struct MailJob {
    mails: Vec<OutgoingMail>,
    bulk: bool,
    done: oneshot::Sender<DeliveryReport>,
}

/// Handle to a queued job
#[derive(Debug)]
pub struct MailReceipt {
    done: oneshot::Receiver<DeliveryReport>,
}

impl MailReceipt {
    /// Waits until every message of the job was sent or given up on
    ///
    /// # Errors
    ///
    /// `MailError::Closed` if the worker exited without finishing the job
    pub async fn wait(self) -> Result<DeliveryReport, MailError> {
        self.done.await.map_err(|_| MailError::Closed)
    }
}

/// Cloneable handle to the delivery worker
#[derive(Clone)]
pub struct MailDispatcher {
    tx: mpsc::Sender<MailJob>,
    counters: Arc<Counters>,
    shutdown: CancellationToken,
    drain_timeout: Duration,
}

impl MailDispatcher {
    /// Spawns the worker
    ///
    /// # Returns
    ///
    /// The handle and the worker's join handle, which completes after
    /// [`shutdown`](Self::shutdown) once the queue is drained
    pub fn start(mailer: Arc<dyn Mailer>, config: DispatcherConfig) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        let counters = Arc::new(Counters::default());
        let shutdown = CancellationToken::new();
        let drain_timeout = config.drain_timeout;

        let worker = Worker {
            mailer,
            config,
            counters: counters.clone(),
        };
        let handle = tokio::spawn(worker.run(rx, shutdown.clone()));

        (
            MailDispatcher {
                tx,
                counters,
                shutdown,
                drain_timeout,
            },
            handle,
        )
    }

    /// Queues a single transactional message
    pub fn send(&self, mail: OutgoingMail) -> Result<MailReceipt, MailError> {
        self.enqueue(vec![mail], false)
    }

    /// Queues a paced mailing
    pub fn send_bulk(&self, mails: Vec<OutgoingMail>) -> Result<MailReceipt, MailError> {
        self.enqueue(mails, true)
    }

    fn enqueue(&self, mails: Vec<OutgoingMail>, bulk: bool) -> Result<MailReceipt, MailError> {
        if self.shutdown.is_cancelled() {
            return Err(MailError::Closed);
        }

        let (done, receipt) = oneshot::channel();
        let count = mails.len();

        match self.tx.try_send(MailJob { mails, bulk, done }) {
            Ok(()) => {
                tracing::debug!(messages = count, bulk, "Mail job queued");
                Ok(MailReceipt { done: receipt })
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.counters.rejected.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(messages = count, "Mail queue full, job rejected");
                Err(MailError::QueueFull)
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(MailError::Closed),
        }
    }

    pub fn stats(&self) -> DispatcherStats {
        DispatcherStats {
            sent: self.counters.sent.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            rejected: self.counters.rejected.load(Ordering::Relaxed),
        }
    }

    /// Stops accepting jobs; queued jobs are still delivered
    pub fn shutdown(&self) {
        tracing::info!("Mail dispatcher shutting down");
        self.shutdown.cancel();
    }

    /// Shuts down and waits for `worker` to drain the queue
    ///
    /// The worker is aborted once the drain timeout elapses and whatever is
    /// still queued is dropped.
    ///
    /// # Returns
    ///
    /// `true` if every queued job finished
    pub async fn shutdown_and_drain(&self, worker: JoinHandle<()>) -> bool {
        self.shutdown();
        let abort = worker.abort_handle();

        match tokio::time::timeout(self.drain_timeout, worker).await {
            Ok(Ok(())) => true,
            Ok(Err(err)) => {
                tracing::error!(error = %err, "Mail worker terminated abnormally");
                false
            }
            Err(_) => {
                abort.abort();
                let stats = self.stats();
                tracing::warn!(
                    timeout_ms = self.drain_timeout.as_millis() as u64,
                    queued_jobs = self.tx.max_capacity() - self.tx.capacity(),
                    sent = stats.sent,
                    failed = stats.failed,
                    "Mail drain timed out, pending mail abandoned"
                );
                false
            }
        }
    }
}

struct Worker {
    mailer: Arc<dyn Mailer>,
    config: DispatcherConfig,
    counters: Arc<Counters>,
}

impl Worker {
    async fn run(self, mut rx: mpsc::Receiver<MailJob>, shutdown: CancellationToken) {
        tracing::info!(capacity = self.config.queue_capacity, "Mail dispatcher started");

        loop {
            tokio::select! {
                job = rx.recv() => match job {
                    Some(job) => self.process(job).await,
                    None => break,
                },
                _ = shutdown.cancelled() => {
                    rx.close();
                    while let Some(job) = rx.recv().await {
                        self.process(job).await;
                    }
                    break;
                }
            }
        }

        tracing::info!("Mail dispatcher stopped");
    }

    async fn process(&self, job: MailJob) {
        let mut report = DeliveryReport::default();
        let total = job.mails.len();

        for (index, mail) in job.mails.iter().enumerate() {
            if self.deliver(mail).await {
                report.sent += 1;
            } else {
                report.failed += 1;
            }

            if job.bulk && index + 1 < total {
                tokio::time::sleep(self.config.bulk_delay).await;
            }
        }

        if job.bulk {
            tracing::info!(
                recipients = total,
                sent = report.sent,
                failed = report.failed,
                "Finished sending bulk e-mail"
            );
        }

        // Receiver may have been dropped; the report is informational
        let _ = job.done.send(report);
    }

    async fn deliver(&self, mail: &OutgoingMail) -> bool {
        let attempts = self.config.max_attempts.max(1);

        for attempt in 1..=attempts {
            match self.mailer.send(mail).await {
                Ok(()) => {
                    self.counters.sent.fetch_add(1, Ordering::Relaxed);
                    tracing::info!(to = %mail.to, subject = %mail.subject, attempt, "Mail sent");
                    return true;
                }
                Err(e) if attempt < attempts => {
                    tracing::warn!(to = %mail.to, attempt, error = %e, "Mail delivery failed, retrying");
                    tokio::time::sleep(self.config.retry_backoff * attempt).await;
                }
                Err(e) => {
                    tracing::error!(to = %mail.to, attempts, error = %e, "Mail delivery failed, giving up");
                }
            }
        }

        self.counters.failed.fetch_add(1, Ordering::Relaxed);
        false
    }
}
