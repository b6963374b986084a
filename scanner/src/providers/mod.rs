//! Scanner providers.
//!
//! Traits for everything the scanner talks to outside its own state. The
//! reducer depends only on these; the binary wires in PostgreSQL and the
//! shared-PIN gate, tests wire in the in-memory mocks.

pub mod staff;
pub mod ticket_store;

pub use staff::{Admission, StaffAuthenticator, StaffIdentity};
pub use ticket_store::{CommitOutcome, TicketStore};
