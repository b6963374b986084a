//! # Gatecheck Scanner
//!
//! Single-use ticket check-in behind a QR scanner.
//!
//! A scanned payload (bare ticket id or `https://host/scan?id=<ticket>`)
//! is resolved to a ticket, classified as valid, used or invalid, and on
//! operator confirmation checked in exactly once, even when several
//! devices scan the same code at the same time.
//!
//! ## Architecture
//!
//! Each scanning device is one [`gatecheck_runtime::Store`] running the
//! [`ScannerReducer`]:
//!
//! ```text
//! payload → extract id → ScannerReducer → lookup effect → TicketFetched
//!                                       → commit effect → CheckInFinished
//! ```
//!
//! Devices share nothing in process. They meet only at the
//! [`TicketStore`], whose conditional check-in is the single point where
//! "exactly one check-in succeeds" is enforced.
//!
//! ## Example
//!
//! ```no_run
//! use gatecheck_core::environment::SystemClock;
//! use gatecheck_runtime::Store;
//! use gatecheck_scanner::{
//!     ScannerAction, ScannerEnvironment, ScannerReducer, ScannerState, SharedPinGate,
//!     mocks::InMemoryTicketStore,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let env = ScannerEnvironment::new(InMemoryTicketStore::new(), SharedPinGate::new("4821"), SystemClock);
//! let store = Store::new(ScannerState::default(), ScannerReducer::new(), env);
//!
//! store.send(ScannerAction::SubmitCredential { credential: "4821".into() }).await?;
//! store.send(ScannerAction::PayloadScanned { payload: "abc".into() }).await?;
//! # Ok(())
//! # }
//! ```

pub mod actions;
pub mod config;
pub mod console;
pub mod environment;
pub mod error;
pub mod extract;
pub mod gate;
pub mod providers;
pub mod reducer;
pub mod state;
pub mod stores;
pub mod ticket;
pub mod verification;

#[cfg(any(test, feature = "test-utils"))]
pub mod mocks;

// Re-export main types for convenience
pub use actions::ScannerAction;
pub use config::Config;
pub use environment::ScannerEnvironment;
pub use error::{ConfigError, Result, StoreError};
pub use extract::extract_ticket_id;
pub use gate::SharedPinGate;
pub use providers::{Admission, CommitOutcome, StaffAuthenticator, StaffIdentity, TicketStore};
pub use reducer::ScannerReducer;
pub use state::{CheckInNotice, ScanPhase, ScannerState};
pub use ticket::{Ticket, TicketId, TicketStatus};
pub use verification::{CheckInResult, OperationSettings, VerificationResult, verify};
