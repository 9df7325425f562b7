//! Inline-button payload codec.
//!
//! A payload is `<version>:<tag>[:<id>]`. Decoding is an exact match on the
//! tag, so no code can shadow another. Approval buttons carry no IDs: the
//! subject travels in the hidden link of the message (see [`super::token`]).

use std::fmt;

const VERSION: &str = "1";

/// Telegram rejects callback data longer than this.
pub const MAX_PAYLOAD_LEN: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ButtonAction {
    ApproveJoin,
    RejectJoin,
    ApproveTake,
    RejectTake,
    ViewGroup(String),
    TakeTerritory(String),
    ReturnTerritory(String),
    LeaveNote(String),
}

impl ButtonAction {
    pub fn encode(&self) -> String {
        match self {
            ButtonAction::ApproveJoin => format!("{VERSION}:ja"),
            ButtonAction::RejectJoin => format!("{VERSION}:jr"),
            ButtonAction::ApproveTake => format!("{VERSION}:ta"),
            ButtonAction::RejectTake => format!("{VERSION}:tr"),
            ButtonAction::ViewGroup(id) => format!("{VERSION}:g:{id}"),
            ButtonAction::TakeTerritory(id) => format!("{VERSION}:tt:{id}"),
            ButtonAction::ReturnTerritory(id) => format!("{VERSION}:rt:{id}"),
            ButtonAction::LeaveNote(id) => format!("{VERSION}:ln:{id}"),
        }
    }

    /// `None` for payloads of another version or an unknown shape.
    pub fn decode(payload: &str) -> Option<Self> {
        let mut parts = payload.splitn(3, ':');
        if parts.next()? != VERSION {
            return None;
        }
        let tag = parts.next()?;
        let id = parts.next().filter(|id| !id.is_empty()).map(str::to_string);

        match (tag, id) {
            ("ja", None) => Some(ButtonAction::ApproveJoin),
            ("jr", None) => Some(ButtonAction::RejectJoin),
            ("ta", None) => Some(ButtonAction::ApproveTake),
            ("tr", None) => Some(ButtonAction::RejectTake),
            ("g", Some(id)) => Some(ButtonAction::ViewGroup(id)),
            ("tt", Some(id)) => Some(ButtonAction::TakeTerritory(id)),
            ("rt", Some(id)) => Some(ButtonAction::ReturnTerritory(id)),
            ("ln", Some(id)) => Some(ButtonAction::LeaveNote(id)),
            _ => None,
        }
    }
}

impl fmt::Display for ButtonAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}
