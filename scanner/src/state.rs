//! Per-device scan session and staff session state.

use crate::error::StoreError;
use crate::providers::StaffIdentity;
use crate::ticket::{Ticket, TicketId};
use chrono::{DateTime, Utc};
use futures::future::AbortHandle;
use serde::{Deserialize, Serialize};

/// Phase of the scan session, as shown to staff.
///
/// `Valid`, `Used` and `Invalid` are terminal for the current subject:
/// further scans are ignored until a reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanPhase {
    /// Waiting for a scan
    #[default]
    Idle,
    /// Ticket lookup in flight
    Loading,
    /// Ticket exists and is unused; check-in may be confirmed
    Valid,
    /// Ticket already checked in
    Used,
    /// No such ticket, or the store could not answer
    Invalid,
}

impl ScanPhase {
    /// Whether the phase is a verdict for the current subject.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Valid | Self::Used | Self::Invalid)
    }
}

/// Admitted operator on this device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaffSession {
    /// Who was admitted
    pub identity: StaffIdentity,
    /// When the gate admitted them
    pub admitted_at: DateTime<Utc>,
}

/// What the last check-in attempt reported to the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckInNotice {
    /// This device checked the guest in
    CheckedIn,
    /// Another device (or an earlier scan) checked the guest in first
    AlreadyUsed,
}

/// Which store call is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Ticket lookup
    Fetch,
    /// Check-in commit
    Commit,
}

/// The one store call allowed in flight per session.
///
/// Results come back tagged with `token`; a result whose token no longer
/// matches was cancelled or superseded and is dropped.
#[derive(Debug, Clone)]
pub struct InFlight {
    /// Which call
    pub operation: Operation,
    /// Tag carried by the result action
    pub token: u64,
    /// Aborts the spawned call
    pub abort: AbortHandle,
}

/// Externally supplied identifier waiting to be scanned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeepLink {
    /// Received; fires on admission while idle
    Pending(TicketId),
    /// Fired, or discarded by a reset
    Spent,
}

/// State of one scanning device.
#[derive(Debug, Clone, Default)]
pub struct ScannerState {
    /// Present once the staff gate admitted someone
    pub staff: Option<StaffSession>,
    /// Current scan phase
    pub phase: ScanPhase,
    /// Identifier under consideration
    pub subject_id: Option<TicketId>,
    /// Last fetched record; only set while `Valid` or `Used`
    pub ticket: Option<Ticket>,
    /// Store fault behind an `Invalid` phase; retryable when set
    pub fault: Option<StoreError>,
    /// Result of the last check-in attempt for the current subject
    pub notice: Option<CheckInNotice>,
    /// Camera banner; never changes the phase
    pub camera_fault: Option<String>,
    /// Deep link bookkeeping
    pub deep_link: Option<DeepLink>,
    /// Store call in flight, if any
    pub in_flight: Option<InFlight>,
    /// Token of the credential check awaiting the gate's answer
    pub pending_admission: Option<u64>,
    /// Next in-flight token
    pub next_token: u64,
    /// Rejected gate attempts since the last admission
    pub rejected_attempts: u32,
}

impl ScannerState {
    /// Whether a staff session exists.
    #[must_use]
    pub const fn is_admitted(&self) -> bool {
        self.staff.is_some()
    }

    /// Whether a store call is in flight.
    #[must_use]
    pub const fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Whether a new scan would be acted on.
    #[must_use]
    pub fn accepts_scans(&self) -> bool {
        self.is_admitted() && !self.is_busy() && self.phase == ScanPhase::Idle
    }

    /// Whether the operator may confirm check-in.
    #[must_use]
    pub fn can_check_in(&self) -> bool {
        self.is_admitted()
            && !self.is_busy()
            && self.phase == ScanPhase::Valid
            && self.ticket.is_some()
    }

    /// Whether the current `Invalid` verdict came from a store fault.
    #[must_use]
    pub fn can_retry(&self) -> bool {
        self.is_admitted()
            && !self.is_busy()
            && self.phase == ScanPhase::Invalid
            && self.fault.is_some()
            && self.subject_id.is_some()
    }

    /// Allocate a token for the next store call.
    pub fn issue_token(&mut self) -> u64 {
        let token = self.next_token;
        self.next_token = self.next_token.wrapping_add(1);
        token
    }

    /// Whether `token` answers the credential check still awaited. Consumes
    /// the pending check when it does.
    pub fn answer_admission(&mut self, token: u64) -> bool {
        if self.pending_admission == Some(token) {
            self.pending_admission = None;
            true
        } else {
            false
        }
    }

    /// Abort the in-flight call, if any, and return what it was.
    pub fn abort_in_flight(&mut self) -> Option<Operation> {
        self.in_flight.take().map(|in_flight| {
            in_flight.abort.abort();
            in_flight.operation
        })
    }

    /// Take the in-flight call if `token` matches it.
    pub fn complete(&mut self, token: u64) -> Option<Operation> {
        match &self.in_flight {
            Some(in_flight) if in_flight.token == token => {
                self.in_flight.take().map(|in_flight| in_flight.operation)
            },
            _ => None,
        }
    }

    /// Back to `Idle` with no subject. Aborts anything in flight and spends
    /// any pending deep link.
    pub fn reset_scan(&mut self) {
        self.abort_in_flight();
        self.phase = ScanPhase::Idle;
        self.subject_id = None;
        self.ticket = None;
        self.fault = None;
        self.notice = None;
        if self.deep_link.is_some() {
            self.deep_link = Some(DeepLink::Spent);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_state_is_idle_and_locked() {
        let state = ScannerState::default();
        assert_eq!(state.phase, ScanPhase::Idle);
        assert!(!state.accepts_scans());
    }

    #[test]
    fn test_stale_token_does_not_complete() {
        let (abort, _registration) = AbortHandle::new_pair();
        let mut state = ScannerState {
            in_flight: Some(InFlight { operation: Operation::Fetch, token: 4, abort }),
            ..ScannerState::default()
        };

        assert_eq!(state.complete(3), None);
        assert!(state.is_busy());
        assert_eq!(state.complete(4), Some(Operation::Fetch));
        assert!(!state.is_busy());
    }

    #[test]
    fn test_reset_aborts_and_spends_deep_link() {
        let (abort, _registration) = AbortHandle::new_pair();
        let observer = abort.clone();
        let mut state = ScannerState {
            phase: ScanPhase::Loading,
            subject_id: Some(TicketId::from("abc")),
            deep_link: Some(DeepLink::Pending(TicketId::from("abc"))),
            in_flight: Some(InFlight { operation: Operation::Fetch, token: 0, abort }),
            ..ScannerState::default()
        };

        state.reset_scan();

        assert!(observer.is_aborted());
        assert_eq!(state.phase, ScanPhase::Idle);
        assert_eq!(state.subject_id, None);
        assert_eq!(state.deep_link, Some(DeepLink::Spent));
    }

    #[test]
    fn test_only_the_pending_admission_is_answered() {
        let mut state = ScannerState {
            pending_admission: Some(2),
            ..ScannerState::default()
        };

        assert!(!state.answer_admission(1));
        assert_eq!(state.pending_admission, Some(2));
        assert!(state.answer_admission(2));
        assert!(!state.answer_admission(2));
    }
}
