//! Background transfer jobs.
//!
//! Every job runs as its own task in a [`JoinSet`]. Outcomes are reported on
//! a channel as jobs finish; a panicking job is logged and forgotten without
//! affecting the others. [`TransferSupervisor::shutdown`] gives in-flight
//! jobs a grace period and aborts whatever is left. An aborted job commits
//! nothing, since the transfer cache is only written after a full upload.

use crate::transfer::DeliveryOutcome;
use std::future::Future;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};

/// Outcome of one finished job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobReport {
    pub source_id: String,
    pub outcome: DeliveryOutcome,
}

/// What [`TransferSupervisor::shutdown`] found.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShutdownSummary {
    pub completed: usize,
    pub aborted: usize,
}

#[derive(Debug)]
pub struct TransferSupervisor {
    tasks: Mutex<JoinSet<()>>,
    reports: mpsc::UnboundedSender<JobReport>,
}

impl TransferSupervisor {
    /// Creates a supervisor and the receiving end of its report channel.
    /// Dropping the receiver is fine: reports are then discarded.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<JobReport>) {
        let (reports, receiver) = mpsc::unbounded_channel();
        let supervisor = Self {
            tasks: Mutex::new(JoinSet::new()),
            reports,
        };
        (supervisor, receiver)
    }

    /// Starts `job` in the background. Must be called within a runtime.
    pub fn spawn<F>(&self, source_id: impl Into<String>, job: F)
    where
        F: Future<Output = DeliveryOutcome> + Send + 'static,
    {
        let source_id = source_id.into();
        let reports = self.reports.clone();
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        // Reap finished jobs so the set only holds live ones.
        while let Some(result) = tasks.try_join_next() {
            log_join(result);
        }
        tasks.spawn(async move {
            let outcome = job.await;
            let _ = reports.send(JobReport { source_id, outcome });
        });
        tracing::debug!(in_flight = tasks.len(), "Spawned transfer job");
    }

    /// Jobs spawned and not yet reaped. May include jobs that have finished
    /// since the last spawn.
    pub fn len(&self) -> usize {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Waits up to `grace` for running jobs, then aborts the rest.
    pub async fn shutdown(&self, grace: Duration) -> ShutdownSummary {
        let mut tasks = std::mem::take(&mut *self.tasks.lock().unwrap_or_else(PoisonError::into_inner));
        let mut summary = ShutdownSummary::default();
        tracing::info!(in_flight = tasks.len(), ?grace, "Waiting for transfer jobs");
        let drained = tokio::time::timeout(grace, async {
            while let Some(result) = tasks.join_next().await {
                log_join(result);
                summary.completed += 1;
            }
        })
        .await;
        if drained.is_err() {
            tasks.abort_all();
            while let Some(result) = tasks.join_next().await {
                match result {
                    Err(err) if err.is_cancelled() => summary.aborted += 1,
                    other => {
                        log_join(other);
                        summary.completed += 1;
                    },
                }
            }
            tracing::warn!(aborted = summary.aborted, "Aborted unfinished transfer jobs");
        }
        summary
    }
}

fn log_join(result: Result<(), JoinError>) {
    match result {
        Ok(()) => {},
        Err(err) if err.is_panic() => tracing::error!(error = %err, "Transfer job panicked"),
        Err(err) => tracing::debug!(error = %err, "Transfer job cancelled"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transfer::TransferFailure;

    #[tokio::test]
    async fn test_reports_outcomes() {
        let (supervisor, mut reports) = TransferSupervisor::new();
        supervisor.spawn("a", async { DeliveryOutcome::Delivered { from_cache: true } });
        let report = reports.recv().await.unwrap();
        assert_eq!(
            report,
            JobReport {
                source_id: "a".into(),
                outcome: DeliveryOutcome::Delivered { from_cache: true },
            }
        );
        let summary = supervisor.shutdown(Duration::from_secs(1)).await;
        assert_eq!(summary.aborted, 0);
    }

    #[tokio::test]
    async fn test_panicking_job_is_isolated() {
        let (supervisor, mut reports) = TransferSupervisor::new();
        supervisor.spawn("boom", async { panic!("job exploded") });
        supervisor.spawn("fine", async { DeliveryOutcome::Failed(TransferFailure::Init("x".into())) });
        let report = reports.recv().await.unwrap();
        assert_eq!(report.source_id, "fine");
        let summary = supervisor.shutdown(Duration::from_secs(1)).await;
        assert_eq!(summary, ShutdownSummary { completed: 2, aborted: 0 });
        assert!(supervisor.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_aborts_after_grace() {
        let (supervisor, mut reports) = TransferSupervisor::new();
        supervisor.spawn("slow", async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            DeliveryOutcome::Delivered { from_cache: false }
        });
        supervisor.spawn("quick", async { DeliveryOutcome::Delivered { from_cache: true } });
        let summary = supervisor.shutdown(Duration::from_secs(5)).await;
        assert_eq!(summary, ShutdownSummary { completed: 1, aborted: 1 });
        assert_eq!(reports.recv().await.unwrap().source_id, "quick");
        assert!(reports.try_recv().is_err());
    }
}
