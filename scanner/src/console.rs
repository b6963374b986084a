//! Line-oriented scan input and operator display.
//!
//! Keyboard-wedge scanners type one decoded payload per line. Lines that
//! start with `:` are operator commands; every other line is a payload.

use crate::actions::ScannerAction;
use crate::state::{CheckInNotice, ScanPhase, ScannerState};
use serde::Serialize;

/// One parsed console line.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleInput {
    /// Forward to the scanner store.
    Action(ScannerAction),
    /// Print a JSON snapshot of the session.
    Status,
    /// Stop reading input.
    Quit,
    /// Unrecognised `:` command.
    Unknown(String),
}

/// Parse one input line.
///
/// Returns `None` for an empty line.
#[must_use]
pub fn parse_line(line: &str) -> Option<ConsoleInput> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.is_empty() {
        return None;
    }

    let Some(command) = line.strip_prefix(':') else {
        return Some(ConsoleInput::Action(ScannerAction::PayloadScanned {
            payload: line.to_string(),
        }));
    };

    let (name, argument) = command
        .split_once(char::is_whitespace)
        .map_or((command, ""), |(name, rest)| (name, rest.trim()));

    let input = match name {
        "login" => ConsoleInput::Action(ScannerAction::SubmitCredential {
            credential: argument.to_string(),
        }),
        "checkin" => ConsoleInput::Action(ScannerAction::ConfirmCheckIn),
        "reset" => ConsoleInput::Action(ScannerAction::Reset),
        "retry" => ConsoleInput::Action(ScannerAction::Retry),
        "cancel" => ConsoleInput::Action(ScannerAction::Cancel),
        "logout" => ConsoleInput::Action(ScannerAction::Logout),
        "camera-error" => ConsoleInput::Action(ScannerAction::CameraFault {
            message: if argument.is_empty() {
                "camera unavailable".to_string()
            } else {
                argument.to_string()
            },
        }),
        "status" => ConsoleInput::Status,
        "quit" | "exit" => ConsoleInput::Quit,
        _ => ConsoleInput::Unknown(line.to_string()),
    };
    Some(input)
}

/// Human-readable rendering of what the operator should see.
#[must_use]
pub fn describe(state: &ScannerState) -> String {
    let mut lines = Vec::new();

    if let Some(message) = &state.camera_fault {
        lines.push(format!("[camera] {message}"));
    }

    if !state.is_admitted() {
        lines.push("LOCKED: enter :login <pin>".to_string());
        return lines.join("\n");
    }

    let guest = state
        .ticket
        .as_ref()
        .map(|ticket| format!(" {} (DNI {})", ticket.full_name, ticket.dni))
        .unwrap_or_default();

    let verdict = match state.phase {
        ScanPhase::Idle => "READY: scan a ticket".to_string(),
        ScanPhase::Loading => "VERIFYING...".to_string(),
        ScanPhase::Valid if state.is_busy() => format!("CHECKING IN...{guest}"),
        ScanPhase::Valid => format!("VALID TICKET{guest}: :checkin to admit"),
        ScanPhase::Used => match state.notice {
            Some(CheckInNotice::CheckedIn) => format!("ACCESS GRANTED{guest}"),
            Some(CheckInNotice::AlreadyUsed) => {
                format!("ALREADY USED{guest}: checked in elsewhere first")
            },
            None => format!("ALREADY USED{guest}"),
        },
        ScanPhase::Invalid => match &state.fault {
            Some(fault) => format!("COULD NOT VERIFY ({fault}): :retry or :reset"),
            None => match &state.subject_id {
                Some(id) => format!("INVALID TICKET (ID: {id})"),
                None => "INVALID TICKET".to_string(),
            },
        },
    };
    lines.push(verdict);

    lines.join("\n")
}

/// Machine-readable session snapshot printed by `:status`.
#[derive(Debug, Serialize)]
pub struct SessionSnapshot<'a> {
    /// Whether staff are admitted
    pub admitted: bool,
    /// Scan phase
    pub phase: ScanPhase,
    /// Identifier under consideration
    pub subject_id: Option<&'a str>,
    /// Displayed ticket
    pub ticket: Option<&'a crate::ticket::Ticket>,
    /// Store fault, if the verdict came from one
    pub fault: Option<String>,
    /// Last check-in notice
    pub notice: Option<CheckInNotice>,
    /// Camera banner
    pub camera_fault: Option<&'a str>,
    /// Whether a store call is in flight
    pub busy: bool,
}

impl<'a> SessionSnapshot<'a> {
    /// Capture the displayable parts of `state`.
    #[must_use]
    pub fn of(state: &'a ScannerState) -> Self {
        Self {
            admitted: state.is_admitted(),
            phase: state.phase,
            subject_id: state.subject_id.as_ref().map(crate::ticket::TicketId::as_str),
            ticket: state.ticket.as_ref(),
            fault: state.fault.as_ref().map(ToString::to_string),
            notice: state.notice,
            camera_fault: state.camera_fault.as_deref(),
            busy: state.is_busy(),
        }
    }
}
