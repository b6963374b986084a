//! Verification engine and check-in commit.
//!
//! Turns ticket store answers into the verdicts staff see. Store faults
//! stop here: they become [`VerificationResult::TransientFault`] or
//! [`CheckInResult::TransientFault`] and never masquerade as "not found".
//!
//! Reads are retried with backoff, and the whole read including its
//! retries is bounded by the configured timeout. Commits are bounded but
//! never retried automatically.

use crate::error::StoreError;
use crate::extract::extract_ticket_id;
use crate::providers::{CommitOutcome, TicketStore};
use crate::ticket::{Ticket, TicketId, TicketStatus};
use gatecheck_runtime::retry::{RetryPolicy, retry_with_predicate};
use std::future::Future;
use std::time::{Duration, Instant};

/// Classification of a scanned ticket at read time.
///
/// A snapshot, not a reservation: a `Valid` ticket may be consumed by
/// another device before this one commits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationResult {
    /// Ticket exists and is still `issued`.
    Valid(Ticket),
    /// Ticket exists and was already checked in.
    Used(Ticket),
    /// No ticket has this identifier.
    Invalid,
    /// The store could not answer; the ticket may well exist.
    TransientFault(StoreError),
}

impl VerificationResult {
    /// Metric label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Valid(_) => "valid",
            Self::Used(_) => "used",
            Self::Invalid => "invalid",
            Self::TransientFault(_) => "transient_fault",
        }
    }
}

/// Result of an operator-triggered check-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckInResult {
    /// This device checked the guest in.
    Committed,
    /// Another scan got there first.
    AlreadyUsed,
    /// The ticket vanished between read and commit.
    NotFound,
    /// The store could not answer. The write may or may not have applied;
    /// re-reading the ticket tells which.
    TransientFault(StoreError),
}

impl CheckInResult {
    /// Metric label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Committed => "committed",
            Self::AlreadyUsed => "already_used",
            Self::NotFound => "not_found",
            Self::TransientFault(_) => "transient_fault",
        }
    }
}

impl From<CommitOutcome> for CheckInResult {
    fn from(outcome: CommitOutcome) -> Self {
        match outcome {
            CommitOutcome::Committed => Self::Committed,
            CommitOutcome::AlreadyUsed => Self::AlreadyUsed,
            CommitOutcome::NotFound => Self::NotFound,
        }
    }
}

/// Bounds applied to every store call made for a scan session.
#[derive(Debug, Clone)]
pub struct OperationSettings {
    /// Upper bound on a single store call.
    pub timeout: Duration,
    /// Backoff applied to transient fetch faults.
    pub fetch_retry: RetryPolicy,
}

impl Default for OperationSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            fetch_retry: RetryPolicy::default(),
        }
    }
}

/// Extract the identifier from `payload` and classify the ticket.
///
/// Returns `None` when the payload holds no identifier; that is a
/// non-event and no store call is made.
pub async fn verify<T: TicketStore>(
    store: &T,
    payload: &str,
    settings: &OperationSettings,
) -> Option<VerificationResult> {
    let id = extract_ticket_id(payload)?;
    Some(verify_ticket(store, &id, settings).await)
}

/// Fetch a ticket and classify it.
#[tracing::instrument(skip(store, id, settings), fields(ticket_id = %id))]
pub async fn verify_ticket<T: TicketStore>(
    store: &T,
    id: &TicketId,
    settings: &OperationSettings,
) -> VerificationResult {
    let started = Instant::now();
    let fetched = bounded(
        settings.timeout,
        retry_with_predicate(
            settings.fetch_retry.clone(),
            || store.fetch_ticket(id),
            StoreError::is_transient,
        ),
    )
    .await;
    metrics::histogram!("scanner.ticket_store.duration_seconds", "operation" => "fetch")
        .record(started.elapsed().as_secs_f64());

    let result = match fetched {
        Ok(Some(ticket)) if ticket.status == TicketStatus::Used => {
            VerificationResult::Used(ticket)
        },
        Ok(Some(ticket)) => VerificationResult::Valid(ticket),
        Ok(None) => VerificationResult::Invalid,
        Err(error) => {
            tracing::warn!(error = %error, kind = error.kind(), "Ticket lookup failed");
            VerificationResult::TransientFault(error)
        },
    };

    metrics::counter!("scanner.verifications.total", "result" => result.label()).increment(1);
    tracing::debug!(result = result.label(), "Ticket verified");
    result
}

/// Atomically check a ticket in.
///
/// Single attempt. Calling this again after a fault is safe: the store's
/// conditional write reports [`CheckInResult::AlreadyUsed`] instead of a
/// second success.
#[tracing::instrument(skip(store, id, settings), fields(ticket_id = %id))]
pub async fn commit_check_in<T: TicketStore>(
    store: &T,
    id: &TicketId,
    settings: &OperationSettings,
) -> CheckInResult {
    let started = Instant::now();
    let committed = bounded(settings.timeout, store.commit_check_in(id)).await;
    metrics::histogram!("scanner.ticket_store.duration_seconds", "operation" => "commit")
        .record(started.elapsed().as_secs_f64());

    let result = match committed {
        Ok(outcome) => CheckInResult::from(outcome),
        Err(error) => {
            tracing::warn!(error = %error, kind = error.kind(), "Check-in commit failed");
            CheckInResult::TransientFault(error)
        },
    };

    metrics::counter!("scanner.check_ins.total", "outcome" => result.label()).increment(1);
    tracing::info!(outcome = result.label(), "Check-in finished");
    result
}

/// Run a store call under a deadline; expiry is a [`StoreError::Timeout`].
async fn bounded<T, F>(limit: Duration, call: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Timeout),
    }
}
