//! Ticket records as owned by the ticket store.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Opaque ticket identifier, assigned at issuance and never changed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TicketId(String);

impl TicketId {
    /// Wrap a raw identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as stored.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TicketId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Check-in status. The only legal transition is `Issued → Used`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    /// Issued and not yet checked in
    Issued,
    /// Checked in; never reverts
    Used,
}

impl TicketStatus {
    /// Storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Issued => "issued",
            Self::Used => "used",
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a stored status is neither `issued` nor `used`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown ticket status `{0}`")]
pub struct UnknownStatus(pub String);

impl FromStr for TicketStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "issued" => Ok(Self::Issued),
            "used" => Ok(Self::Used),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// One admitted guest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    /// Unique identifier encoded in the QR code
    pub id: TicketId,
    /// Guest name shown to staff
    pub full_name: String,
    /// Guest identity document number shown to staff
    pub dni: String,
    /// Current check-in status
    pub status: TicketStatus,
}

impl Ticket {
    /// A freshly issued ticket.
    #[must_use]
    pub fn issued(id: impl Into<String>, full_name: impl Into<String>, dni: impl Into<String>) -> Self {
        Self {
            id: TicketId::new(id),
            full_name: full_name.into(),
            dni: dni.into(),
            status: TicketStatus::Issued,
        }
    }

    /// Whether the ticket has already been checked in.
    #[must_use]
    pub fn is_used(&self) -> bool {
        self.status == TicketStatus::Used
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parses_storage_values() {
        assert_eq!("issued".parse::<TicketStatus>(), Ok(TicketStatus::Issued));
        assert_eq!("used".parse::<TicketStatus>(), Ok(TicketStatus::Used));
        assert_eq!(
            "USED".parse::<TicketStatus>(),
            Err(UnknownStatus("USED".to_string()))
        );
    }

    #[test]
    fn test_ticket_serializes_with_lowercase_status() {
        let ticket = Ticket::issued("abc", "Ana Quispe", "45879632");
        let json = serde_json::to_value(&ticket).unwrap_or_default();

        assert_eq!(json["id"], "abc");
        assert_eq!(json["status"], "issued");
        assert!(!ticket.is_used());
    }
}
