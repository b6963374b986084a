//! # Gatecheck Testing
//!
//! Testing utilities for gatecheck reducers.
//!
//! This crate provides:
//! - [`FixedClock`] for deterministic timestamps
//! - [`ReducerTest`], a Given-When-Then harness for reducers
//! - Effect assertions
//!
//! ## Example
//!
//! ```ignore
//! use gatecheck_testing::{ReducerTest, test_clock};
//!
//! ReducerTest::new(ScannerReducer::new())
//!     .with_env(test_environment())
//!     .given_state(ScannerState::admitted())
//!     .when_action(ScannerAction::PayloadScanned { payload: "T1".into() })
//!     .then_state(|s| assert_eq!(s.phase, ScanPhase::Loading))
//!     .run();
//! ```

use chrono::{DateTime, Utc};
use gatecheck_core::environment::Clock;


/// Mock implementations of Environment traits
pub mod mocks {
    use super::{Clock, DateTime, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// # Example
    ///
    /// ```
    /// use gatecheck_testing::mocks::FixedClock;
    /// use gatecheck_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(test_time())
    }

    /// The instant returned by [`test_clock`]
    #[must_use]
    pub fn test_time() -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(1_735_689_600, 0).unwrap_or_default()
    }
}

// Re-export commonly used items
pub use mocks::{FixedClock, test_clock, test_time};
pub use reducer_test::{ReducerTest, assertions};
