use fluent_templates::fluent_bundle::FluentArgs;
use thiserror::Error;
use unic_langid::LanguageIdentifier;

use super::transport::TransportError;
use crate::i18n;
use crate::storage::StorageError;

/// Expected business outcomes that end an update early.
///
/// Each variant maps to exactly one localized message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Refusal {
    #[error("user not found")]
    UserNotFound,
    #[error("congregation {name:?} not found")]
    CongregationNotFound { name: String },
    #[error("congregation has no admins")]
    NoAdmins,
    #[error("no admin could be reached")]
    AdminsUnreachable,
    #[error("not an admin of the congregation")]
    NotAdmin,
    #[error("user has no congregation")]
    NotRegistered,
    #[error("territory not found")]
    TerritoryNotFound,
    #[error("territory is not available")]
    TerritoryUnavailable,
    #[error("territory {title:?} already exists in group {group:?}")]
    TerritoryExists { title: String, group: String },
    #[error("user does not hold the territory")]
    NotHolder,
    #[error("user cannot leave a note for this territory")]
    CannotLeaveNote,
    #[error("note is not a reply to a note prompt")]
    NoteTargetMissing,
    #[error("note is longer than {max} characters")]
    NoteTooLong { max: usize },
    #[error("button belongs to an already resolved request")]
    StaleButton,
    #[error("caption is not <group>_<title>")]
    InvalidCaption,
    #[error("publisher not found")]
    PublisherNotFound,
    #[error("no territories")]
    NoTerritories,
}

impl Refusal {
    pub fn message_key(&self) -> &'static str {
        match self {
            Refusal::UserNotFound => "refusal-user-not-found",
            Refusal::CongregationNotFound { .. } => "refusal-congregation-not-found",
            Refusal::NoAdmins => "refusal-no-admins",
            Refusal::AdminsUnreachable => "refusal-admins-unreachable",
            Refusal::NotAdmin => "refusal-not-admin",
            Refusal::NotRegistered => "refusal-not-registered",
            Refusal::TerritoryNotFound => "refusal-territory-not-found",
            Refusal::TerritoryUnavailable => "refusal-territory-unavailable",
            Refusal::TerritoryExists { .. } => "refusal-territory-exists",
            Refusal::NotHolder => "refusal-not-holder",
            Refusal::CannotLeaveNote => "refusal-cannot-leave-note",
            Refusal::NoteTargetMissing => "refusal-note-target-missing",
            Refusal::NoteTooLong { .. } => "refusal-note-too-long",
            Refusal::StaleButton => "refusal-stale-button",
            Refusal::InvalidCaption => "refusal-invalid-caption",
            Refusal::PublisherNotFound => "refusal-publisher-not-found",
            Refusal::NoTerritories => "refusal-no-territories",
        }
    }

    /// Localized reply. User-supplied values are HTML-escaped.
    pub fn localized(&self, lang: &LanguageIdentifier) -> String {
        let mut args = FluentArgs::new();
        match self {
            Refusal::CongregationNotFound { name } => {
                args.set("name", super::messages::escape(name));
            }
            Refusal::TerritoryExists { title, group } => {
                args.set("title", super::messages::escape(title));
                args.set("group", super::messages::escape(group));
            }
            Refusal::NoteTooLong { max } => {
                args.set("max", *max);
            }
            _ => return i18n::t(lang, self.message_key()),
        }
        i18n::t_args(lang, self.message_key(), &args)
    }
}

/// Errors returned by workflow handlers.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("refused: {0}")]
    Refused(#[from] Refusal),

    #[error("update timed out")]
    Timeout,

    #[error("handler panicked: {0}")]
    Panicked(String),
}

pub type WorkflowResult<T> = Result<T, WorkflowError>;
