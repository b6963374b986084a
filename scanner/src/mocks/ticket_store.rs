//! In-memory ticket store for testing.

use crate::error::{Result, StoreError};
use crate::providers::{CommitOutcome, TicketStore};
use crate::ticket::{Ticket, TicketId, TicketStatus};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

#[derive(Debug, Default)]
struct Faults {
    fetch: VecDeque<StoreError>,
    commit: Option<StoreError>,
    apply_then_fail: Option<StoreError>,
}

#[derive(Debug, Default)]
struct Inner {
    tickets: Mutex<HashMap<TicketId, Ticket>>,
    faults: Mutex<Faults>,
    fetch_calls: AtomicUsize,
    commit_calls: AtomicUsize,
}

/// In-memory ticket store.
///
/// Clones share the same tickets, so several scanner stores built from
/// clones behave like devices sharing one backend. The conditional
/// check-in happens under a single lock, which gives it the same
/// exactly-once behaviour as the PostgreSQL statement.
///
/// Faults can be injected to exercise retry, timeout and cancellation
/// paths.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTicketStore {
    inner: Arc<Inner>,
    latency: Option<Duration>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl InMemoryTicketStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every call by `latency` before it touches the data.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Add or replace a ticket.
    pub fn insert(&self, ticket: Ticket) {
        lock(&self.inner.tickets).insert(ticket.id.clone(), ticket);
    }

    /// Current status of a ticket, if it exists.
    #[must_use]
    pub fn status(&self, id: &TicketId) -> Option<TicketStatus> {
        lock(&self.inner.tickets).get(id).map(|ticket| ticket.status)
    }

    /// Fail the next `count` fetches with `error`.
    pub fn fail_next_fetches(&self, count: usize, error: StoreError) {
        let mut faults = lock(&self.inner.faults);
        faults.fetch.extend(std::iter::repeat_n(error, count));
    }

    /// Fail every commit with `error` until [`Self::clear_faults`]. The
    /// ticket is left untouched.
    pub fn fail_commits(&self, error: StoreError) {
        lock(&self.inner.faults).commit = Some(error);
    }

    /// Apply the next commit, then report `error` as if the answer was
    /// lost on the way back.
    pub fn apply_then_fail_next_commit(&self, error: StoreError) {
        lock(&self.inner.faults).apply_then_fail = Some(error);
    }

    /// Remove every injected fault.
    pub fn clear_faults(&self) {
        *lock(&self.inner.faults) = Faults::default();
    }

    /// Number of `fetch_ticket` calls so far.
    #[must_use]
    pub fn fetch_calls(&self) -> usize {
        self.inner.fetch_calls.load(Ordering::SeqCst)
    }

    /// Number of `commit_check_in` calls so far.
    #[must_use]
    pub fn commit_calls(&self) -> usize {
        self.inner.commit_calls.load(Ordering::SeqCst)
    }

    async fn simulate_latency(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

impl TicketStore for InMemoryTicketStore {
    async fn fetch_ticket(&self, id: &TicketId) -> Result<Option<Ticket>> {
        self.inner.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;

        if let Some(error) = lock(&self.inner.faults).fetch.pop_front() {
            return Err(error);
        }

        Ok(lock(&self.inner.tickets).get(id).cloned())
    }

    async fn commit_check_in(&self, id: &TicketId) -> Result<CommitOutcome> {
        self.inner.commit_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;

        let lost_reply = {
            let mut faults = lock(&self.inner.faults);
            if let Some(error) = faults.commit.clone() {
                return Err(error);
            }
            faults.apply_then_fail.take()
        };

        let outcome = {
            let mut tickets = lock(&self.inner.tickets);
            match tickets.get_mut(id) {
                None => CommitOutcome::NotFound,
                Some(ticket) if ticket.status == TicketStatus::Used => CommitOutcome::AlreadyUsed,
                Some(ticket) => {
                    ticket.status = TicketStatus::Used;
                    CommitOutcome::Committed
                },
            }
        };

        match lost_reply {
            Some(error) => Err(error),
            None => Ok(outcome),
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_clones_share_tickets() {
        let store = InMemoryTicketStore::new();
        let other_device = store.clone();
        store.insert(Ticket::issued("abc", "Ana Quispe", "45879632"));

        let outcome = other_device
            .commit_check_in(&TicketId::from("abc"))
            .await
            .expect("commit");

        assert_eq!(outcome, CommitOutcome::Committed);
        assert_eq!(store.status(&TicketId::from("abc")), Some(TicketStatus::Used));
    }

    #[tokio::test]
    async fn test_concurrent_commits_have_one_winner() {
        let store = InMemoryTicketStore::new();
        store.insert(Ticket::issued("abc", "Ana Quispe", "45879632"));

        let attempts: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.commit_check_in(&TicketId::from("abc")).await })
            })
            .collect();

        let mut committed = 0;
        let mut already_used = 0;
        for attempt in attempts {
            match attempt.await.expect("join").expect("commit") {
                CommitOutcome::Committed => committed += 1,
                CommitOutcome::AlreadyUsed => already_used += 1,
                CommitOutcome::NotFound => {},
            }
        }

        assert_eq!(committed, 1);
        assert_eq!(already_used, 7);
    }

    #[tokio::test]
    async fn test_injected_fetch_faults_are_consumed_in_order() {
        let store = InMemoryTicketStore::new();
        store.fail_next_fetches(1, StoreError::Timeout);

        assert_eq!(
            store.fetch_ticket(&TicketId::from("abc")).await,
            Err(StoreError::Timeout)
        );
        assert_eq!(store.fetch_ticket(&TicketId::from("abc")).await, Ok(None));
        assert_eq!(store.fetch_calls(), 2);
    }
}
