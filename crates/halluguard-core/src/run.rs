//! Top-level validation run.
//!
//! Iterates knowledge base entries in load order, resolves each one through
//! the [`RetryController`], and folds the results into a
//! [`ValidationReport`]. Entries are independent: one entry's outcome never
//! influences another's. Cancellation is cooperative and checked between
//! entries only.

use std::time::Instant;

use chrono::Utc;
use tokio::sync::watch;
use tracing::Instrument;
use uuid::Uuid;

use crate::client::ModelClient;
use crate::domain::{GuardError, Result, ValidationReport};
use crate::knowledge_base::KnowledgeBase;
use crate::matcher::Matcher;
use crate::metrics::METRICS;
use crate::obs;
use crate::retry::{RetryController, RetryPolicy};

/// Sender half of a cancellation signal.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    /// Request cancellation. Takes effect before the next entry starts.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

/// Receiver half of a cancellation signal. Cheap to clone.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

impl CancelSignal {
    /// A signal that can never fire.
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self { rx }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }
}

/// Create a linked cancel handle and signal.
pub fn cancel_pair() -> (CancelHandle, CancelSignal) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelSignal { rx })
}

/// Sequential validation driver.
#[derive(Debug, Clone)]
pub struct ValidationRun {
    controller: RetryController,
}

impl ValidationRun {
    pub fn new(matcher: Matcher, policy: RetryPolicy) -> Self {
        Self {
            controller: RetryController::new(matcher, policy),
        }
    }

    /// Validate every entry and return the completed report.
    ///
    /// # Errors
    ///
    /// `GuardError::Cancelled` when `cancel` fires before all entries are
    /// resolved. No partial report is returned.
    pub async fn execute(
        &self,
        kb: &KnowledgeBase,
        client: &dyn ModelClient,
        cancel: &CancelSignal,
    ) -> Result<ValidationReport> {
        let run_id = Uuid::new_v4();
        self.drive(run_id, kb, client, cancel)
            .instrument(obs::run_span(&run_id.to_string()))
            .await
    }

    async fn drive(
        &self,
        run_id: Uuid,
        kb: &KnowledgeBase,
        client: &dyn ModelClient,
        cancel: &CancelSignal,
    ) -> Result<ValidationReport> {
        let run_key = run_id.to_string();
        let max_retries = self.controller.policy().max_retries;
        let started_at = Utc::now();
        let clock = Instant::now();
        obs::emit_run_started(&run_key, client.identity(), kb.len(), max_retries);

        let mut results = Vec::with_capacity(kb.len());
        for entry in kb.get_all() {
            if cancel.is_cancelled() {
                obs::emit_run_cancelled(&run_key, results.len());
                METRICS.flush();
                return Err(GuardError::Cancelled {
                    completed: results.len(),
                });
            }
            let result = self.controller.run_entry(entry, client).await;
            METRICS.inc_entries_validated();
            results.push(result);
        }

        let report = ValidationReport::new(
            run_id,
            client.identity(),
            max_retries,
            started_at,
            Utc::now(),
            results,
        );
        obs::emit_run_finished(&run_key, clock.elapsed().as_millis() as u64, report.stats());
        METRICS.flush();

        Ok(report)
    }
}

/// Validate a knowledge base with the default matcher and no cancellation.
pub async fn execute(
    kb: &KnowledgeBase,
    client: &dyn ModelClient,
    max_retries: u32,
) -> Result<ValidationReport> {
    ValidationRun::new(Matcher::default(), RetryPolicy::with_max_retries(max_retries))
        .execute(kb, client, &CancelSignal::never())
        .await
}
