//! Scanner environment.
//!
//! Dependencies injected into the scanner reducer.

use crate::providers::{StaffAuthenticator, TicketStore};
use crate::verification::OperationSettings;
use gatecheck_core::environment::Clock;

/// Scanner environment.
///
/// # Type Parameters
///
/// - `T`: Ticket store
/// - `G`: Staff gate
/// - `C`: Clock
#[derive(Clone)]
pub struct ScannerEnvironment<T, G, C>
where
    T: TicketStore + Clone,
    G: StaffAuthenticator + Clone,
    C: Clock + Clone,
{
    /// Ticket store shared with every other device (`PostgreSQL`).
    pub tickets: T,

    /// Staff gate.
    pub gate: G,

    /// Clock used to stamp staff sessions.
    pub clock: C,

    /// Timeout and retry bounds for store calls.
    pub operations: OperationSettings,
}

impl<T, G, C> ScannerEnvironment<T, G, C>
where
    T: TicketStore + Clone,
    G: StaffAuthenticator + Clone,
    C: Clock + Clone,
{
    /// Create a new environment with default operation bounds.
    #[must_use]
    pub fn new(tickets: T, gate: G, clock: C) -> Self {
        Self {
            tickets,
            gate,
            clock,
            operations: OperationSettings::default(),
        }
    }

    /// Replace the timeout and retry bounds.
    #[must_use]
    pub fn with_operations(mut self, operations: OperationSettings) -> Self {
        self.operations = operations;
        self
    }
}
