//! Domain model: users, congregations, territory groups, territories, notes
//! and the pending-action records that correlate admin decisions.
//!
//! Plain data. Persistence lives in [`crate::storage`], behavior in
//! [`crate::workflow`].

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Generates a fresh record ID.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Returned when a stored enum value is not one we know.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown {kind} value: {value:?}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseEnumError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// Congregation role. A user without a role is represented as `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Admin,
    Publisher,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Publisher => "publisher",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "publisher" => Ok(Role::Publisher),
            other => Err(ParseEnumError::new("role", other)),
        }
    }
}

/// Persisted conversation stage of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    EnterFullName,
    EnterCongregationName,
    WaitingForAdminApproval,
    JoinRequestRejected,
    SelectActionFromMenu,
    AdminSendTerritory,
    LeaveTerritoryNote,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::EnterFullName => "enter_full_name",
            Stage::EnterCongregationName => "enter_congregation_name",
            Stage::WaitingForAdminApproval => "waiting_for_admin_approval",
            Stage::JoinRequestRejected => "join_request_rejected",
            Stage::SelectActionFromMenu => "select_action_from_menu",
            Stage::AdminSendTerritory => "admin_send_territory",
            Stage::LeaveTerritoryNote => "leave_territory_note",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "enter_full_name" => Stage::EnterFullName,
            "enter_congregation_name" => Stage::EnterCongregationName,
            "waiting_for_admin_approval" => Stage::WaitingForAdminApproval,
            "join_request_rejected" => Stage::JoinRequestRejected,
            "select_action_from_menu" => Stage::SelectActionFromMenu,
            "admin_send_territory" => Stage::AdminSendTerritory,
            "leave_territory_note" => Stage::LeaveTerritoryNote,
            other => return Err(ParseEnumError::new("stage", other)),
        })
    }
}

/// A chat participant known to the bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub messenger_user_id: i64,
    pub messenger_chat_id: i64,
    pub full_name: String,
    pub congregation_id: Option<String>,
    /// Congregation the user asked to join (deep link or typed name).
    pub join_congregation_id: Option<String>,
    pub role: Option<Role>,
    pub stage: Stage,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// A first-contact user: no name, no role, asked for the full name.
    pub fn new(messenger_user_id: i64, messenger_chat_id: i64) -> Self {
        Self {
            id: new_id(),
            messenger_user_id,
            messenger_chat_id,
            full_name: String::new(),
            congregation_id: None,
            join_congregation_id: None,
            role: None,
            stage: Stage::EnterFullName,
            created_at: Utc::now(),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Some(Role::Admin)
    }

    /// True when the user administers the given congregation.
    pub fn administers(&self, congregation_id: &str) -> bool {
        self.is_admin() && self.congregation_id.as_deref() == Some(congregation_id)
    }

    /// Role-less users must not belong to a congregation.
    pub fn is_consistent(&self) -> bool {
        self.role.is_some() || self.congregation_id.is_none()
    }

    /// Makes the user a member of `congregation_id` with `role`.
    pub fn join(&mut self, congregation_id: String, role: Role) {
        self.congregation_id = Some(congregation_id);
        self.role = Some(role);
        self.join_congregation_id = None;
        self.stage = Stage::SelectActionFromMenu;
    }
}

/// A named organizational unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Congregation {
    pub id: String,
    pub name: String,
}

/// A named subdivision of a congregation's territories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerritoryGroup {
    pub id: String,
    pub congregation_id: String,
    pub title: String,
}

/// How the territory map was uploaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileKind {
    Photo,
    Document,
}

impl FileKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileKind::Photo => "photo",
            FileKind::Document => "document",
        }
    }
}

impl FromStr for FileKind {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "photo" => Ok(FileKind::Photo),
            "document" => Ok(FileKind::Document),
            other => Err(ParseEnumError::new("file kind", other)),
        }
    }
}

/// The unit handed out to publishers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Territory {
    pub id: String,
    pub congregation_id: String,
    pub group_id: String,
    pub title: String,
    /// Messenger-side file reference.
    pub file_id: String,
    pub file_kind: FileKind,
    /// Holder; `None` means the territory is available.
    pub in_use_by_user_id: Option<String>,
    pub last_taken_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Territory {
    pub fn new(
        congregation_id: impl Into<String>,
        group_id: impl Into<String>,
        title: impl Into<String>,
        file_id: impl Into<String>,
        file_kind: FileKind,
    ) -> Self {
        Self {
            id: new_id(),
            congregation_id: congregation_id.into(),
            group_id: group_id.into(),
            title: title.into(),
            file_id: file_id.into(),
            file_kind,
            in_use_by_user_id: None,
            last_taken_at: None,
            created_at: Utc::now(),
        }
    }

    pub fn is_available(&self) -> bool {
        self.in_use_by_user_id.is_none()
    }

    pub fn is_held_by(&self, user_id: &str) -> bool {
        self.in_use_by_user_id.as_deref() == Some(user_id)
    }
}

/// Free-text annotation left by a territory holder. Append-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerritoryNote {
    pub id: String,
    pub territory_id: String,
    pub author_user_id: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl TerritoryNote {
    pub fn new(territory_id: impl Into<String>, author_user_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            territory_id: territory_id.into(),
            author_user_id: author_user_id.into(),
            text: text.into(),
            created_at: Utc::now(),
        }
    }
}

/// Address of a message already delivered by the messenger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageRef {
    pub chat_id: i64,
    pub message_id: i32,
}

impl MessageRef {
    pub fn new(chat_id: i64, message_id: i32) -> Self {
        Self { chat_id, message_id }
    }
}

/// Which decision a pending action is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PendingKind {
    Join,
    Take,
}

impl PendingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PendingKind::Join => "join",
            PendingKind::Take => "take",
        }
    }
}

impl FromStr for PendingKind {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "join" => Ok(PendingKind::Join),
            "take" => Ok(PendingKind::Take),
            other => Err(ParseEnumError::new("pending action kind", other)),
        }
    }
}

/// Correlation record for an in-flight admin decision.
///
/// The ID is the correlation token carried in the hidden link of every
/// fanned-out message; `admin_messages` lists those messages so the outcome
/// can be written back to each of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAction {
    pub id: String,
    pub kind: PendingKind,
    pub admin_messages: Vec<MessageRef>,
    pub created_at: DateTime<Utc>,
}

impl PendingAction {
    pub fn new(id: impl Into<String>, kind: PendingKind, admin_messages: Vec<MessageRef>) -> Self {
        Self {
            id: id.into(),
            kind,
            admin_messages,
            created_at: Utc::now(),
        }
    }
}
