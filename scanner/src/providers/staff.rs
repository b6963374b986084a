//! Staff admission provider trait.

use serde::{Deserialize, Serialize};
use std::future::Future;

/// Who was admitted to operate the scanner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffIdentity(pub String);

impl StaffIdentity {
    /// Label used in logs.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Decision on a submitted staff credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// Credential accepted.
    Admitted(StaffIdentity),
    /// Credential rejected. Carries no reason.
    Rejected,
}

/// Gate in front of the scanning surface.
///
/// Until a credential is admitted, scanning must not be reachable.
pub trait StaffAuthenticator: Send + Sync {
    /// Check a credential.
    fn admit(&self, credential: &str) -> impl Future<Output = Admission> + Send;
}
