//! Identifier extraction from raw scanner payloads.
//!
//! QR codes printed on invitations carry either the bare ticket id or a
//! link to the scanning page (`https://host/scan?id=<ticket>`). Both must
//! resolve to the same ticket.

use crate::ticket::TicketId;
use url::Url;

/// Name of the query parameter that carries the ticket id in scan links.
pub const ID_QUERY_PARAM: &str = "id";

/// Extract the ticket identifier from a decoded payload.
///
/// - An absolute URL with a non-empty `id` query parameter yields that value.
/// - Anything else (including URLs without `id`, or unparseable input)
///   yields the payload verbatim.
/// - An empty or whitespace-only payload yields `None`.
///
/// ```
/// use gatecheck_scanner::extract::extract_ticket_id;
///
/// assert_eq!(extract_ticket_id("https://x.test/scan?id=T1").unwrap().as_str(), "T1");
/// assert_eq!(extract_ticket_id("T1").unwrap().as_str(), "T1");
/// assert!(extract_ticket_id("").is_none());
/// ```
#[must_use]
pub fn extract_ticket_id(payload: &str) -> Option<TicketId> {
    if payload.trim().is_empty() {
        return None;
    }

    let from_url = Url::parse(payload).ok().and_then(|url| {
        url.query_pairs()
            .find(|(key, _)| key == ID_QUERY_PARAM)
            .map(|(_, value)| value.into_owned())
            .filter(|value| !value.is_empty())
    });

    Some(TicketId::new(from_url.unwrap_or_else(|| payload.to_string())))
}
