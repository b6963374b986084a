//! Actions accepted by the scanner reducer.

use crate::providers::StaffIdentity;
use crate::verification::{CheckInResult, VerificationResult};

/// Everything that can happen to a scanning device.
#[derive(Debug, Clone, PartialEq)]
pub enum ScannerAction {
    // ═══════════════════════════════════════════════════════════════
    // Staff gate
    // ═══════════════════════════════════════════════════════════════
    /// Operator submitted a credential at the gate.
    SubmitCredential {
        /// PIN or token as typed
        credential: String,
    },

    /// Gate accepted the credential (effect result).
    StaffAdmitted {
        /// Credential check tag
        token: u64,
        /// Who was admitted
        identity: StaffIdentity,
    },

    /// Gate rejected the credential (effect result).
    StaffRejected {
        /// Credential check tag
        token: u64,
    },

    /// Operator left; the staff session ends and the scan session resets.
    Logout,

    // ═══════════════════════════════════════════════════════════════
    // Scan input transport
    // ═══════════════════════════════════════════════════════════════
    /// Identifier supplied at session start, e.g. from a link.
    DeepLinkReceived {
        /// Raw link or identifier
        payload: String,
    },

    /// Camera decoded a payload.
    PayloadScanned {
        /// Raw decoded text
        payload: String,
    },

    /// Camera could not be accessed.
    CameraFault {
        /// Description shown in the banner
        message: String,
    },

    // ═══════════════════════════════════════════════════════════════
    // Operator
    // ═══════════════════════════════════════════════════════════════
    /// Check the displayed valid ticket in.
    ConfirmCheckIn,

    /// Re-read the ticket after a store fault.
    Retry,

    /// Abandon the in-flight lookup or commit.
    Cancel,

    /// Clear the verdict and wait for the next scan.
    Reset,

    // ═══════════════════════════════════════════════════════════════
    // Effect results
    // ═══════════════════════════════════════════════════════════════
    /// Ticket lookup finished.
    TicketFetched {
        /// In-flight tag
        token: u64,
        /// Verdict
        result: VerificationResult,
    },

    /// Check-in commit finished.
    CheckInFinished {
        /// In-flight tag
        token: u64,
        /// Outcome
        result: CheckInResult,
    },
}
