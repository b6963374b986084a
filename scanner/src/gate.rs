//! Shared-PIN staff gate.

use crate::providers::{Admission, StaffAuthenticator, StaffIdentity};
use constant_time_eq::constant_time_eq;

/// Admits anyone who knows the venue PIN.
///
/// Comparison is constant-time. An empty configured PIN admits nobody.
#[derive(Clone)]
pub struct SharedPinGate {
    pin: String,
    identity: StaffIdentity,
}

impl SharedPinGate {
    /// Gate with the given PIN; admitted sessions are labelled `staff`.
    #[must_use]
    pub fn new(pin: impl Into<String>) -> Self {
        Self {
            pin: pin.into(),
            identity: StaffIdentity("staff".to_string()),
        }
    }

    /// Label admitted sessions with a device or operator name.
    #[must_use]
    pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = StaffIdentity(identity.into());
        self
    }
}

impl std::fmt::Debug for SharedPinGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedPinGate")
            .field("pin", &"<redacted>")
            .field("identity", &self.identity)
            .finish()
    }
}

impl StaffAuthenticator for SharedPinGate {
    async fn admit(&self, credential: &str) -> Admission {
        if self.pin.is_empty() || !constant_time_eq(self.pin.as_bytes(), credential.as_bytes()) {
            metrics::counter!("scanner.gate.admissions", "result" => "rejected").increment(1);
            return Admission::Rejected;
        }

        metrics::counter!("scanner.gate.admissions", "result" => "admitted").increment(1);
        Admission::Admitted(self.identity.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_matching_pin_is_admitted() {
        let gate = SharedPinGate::new("4821").with_identity("door-2");
        assert_eq!(
            gate.admit("4821").await,
            Admission::Admitted(StaffIdentity("door-2".to_string()))
        );
    }

    #[tokio::test]
    async fn test_wrong_or_partial_pin_is_rejected() {
        let gate = SharedPinGate::new("4821");
        assert_eq!(gate.admit("4822").await, Admission::Rejected);
        assert_eq!(gate.admit("482").await, Admission::Rejected);
        assert_eq!(gate.admit("").await, Admission::Rejected);
    }

    #[tokio::test]
    async fn test_empty_pin_admits_nobody() {
        let gate = SharedPinGate::new("");
        assert_eq!(gate.admit("").await, Admission::Rejected);
    }

    #[test]
    fn test_debug_hides_pin() {
        let rendered = format!("{:?}", SharedPinGate::new("4821"));
        assert!(!rendered.contains("4821"));
    }
}
