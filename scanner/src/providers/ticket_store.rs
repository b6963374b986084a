//! Ticket store provider trait.

use crate::error::Result;
use crate::ticket::{Ticket, TicketId};
use std::future::Future;

/// Outcome of an atomic check-in attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// This call moved the ticket from `issued` to `used`.
    Committed,
    /// The ticket was already `used`; nothing changed.
    AlreadyUsed,
    /// No ticket with this id exists.
    NotFound,
}

impl CommitOutcome {
    /// Short label for metrics and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Committed => "committed",
            Self::AlreadyUsed => "already_used",
            Self::NotFound => "not_found",
        }
    }
}

/// Authoritative ticket storage shared by every scanning device.
///
/// # Consistency
///
/// `commit_check_in` must be a single conditional write: of any number of
/// concurrent commits for the same issued ticket, exactly one returns
/// [`CommitOutcome::Committed`]. A read followed by an unconditional write
/// does not satisfy this contract.
pub trait TicketStore: Send + Sync {
    /// Look up a ticket by id.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::StoreError`] when the store cannot answer.
    /// A missing ticket is `Ok(None)`.
    fn fetch_ticket(
        &self,
        id: &TicketId,
    ) -> impl Future<Output = Result<Option<Ticket>>> + Send;

    /// Atomically set the ticket to `used` if and only if it is `issued`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::StoreError`] when the store cannot answer.
    /// After an error the write may or may not have been applied.
    fn commit_check_in(&self, id: &TicketId) -> impl Future<Output = Result<CommitOutcome>> + Send;
}
