//! Territory browsing, take requests, returns, notes and uploads.

use chrono::Utc;
use log::{info, warn};

use super::callback::ButtonAction;
use super::messages::{self, CaptionView};
use super::token::CorrelationToken;
use super::transport::{Body, Button, Keyboard, MessageEdit, OutgoingMessage};
use super::{congregation_of, Refusal, Workflow, WorkflowResult};
use crate::core::config::limits;
use crate::domain::{FileKind, MessageRef, Role, Stage, Territory, TerritoryNote, User};
use crate::storage::{StorageError, TerritoryFilter, TerritoryQuery, UserFilter};

/// Splits an upload caption `"<group>_<title>"` at the first underscore.
pub fn parse_territory_caption(caption: &str) -> Option<(String, String)> {
    let (group, title) = caption.split_once('_')?;
    let (group, title) = (group.trim(), title.trim());
    if group.is_empty() || title.is_empty() {
        return None;
    }
    Some((group.to_string(), title.to_string()))
}

impl Workflow {
    /// One button per group with something to show.
    pub async fn show_groups(&self, user: &User) -> WorkflowResult<()> {
        let congregation_id = congregation_of(user)?;
        let available = availability_filter(user);

        let mut rows = Vec::new();
        for group in self.storage.list_groups(congregation_id)? {
            let count = self
                .storage
                .list_territories(
                    &TerritoryQuery::in_congregation(congregation_id)
                        .group(&group.id)
                        .available(available),
                )?
                .len();
            if count > 0 {
                rows.push(vec![Button::new(
                    messages::group_label(&group.title, count),
                    ButtonAction::ViewGroup(group.id).encode(),
                )]);
            }
        }
        if rows.is_empty() {
            return Err(Refusal::NoTerritories.into());
        }

        let message = OutgoingMessage::text(messages::plain(&self.lang, "groups-prompt")).inline(rows);
        self.send(user.messenger_chat_id, message).await?;
        Ok(())
    }

    /// Sends every visible territory of a group, least recently worked first.
    pub async fn show_group(&self, user: &User, group_id: &str) -> WorkflowResult<()> {
        let congregation_id = congregation_of(user)?;
        let group = self
            .storage
            .get_group(group_id)?
            .filter(|g| g.congregation_id == congregation_id)
            .ok_or(Refusal::TerritoryNotFound)?;

        let territories = self.storage.list_territories(
            &TerritoryQuery::in_congregation(congregation_id)
                .group(&group.id)
                .available(availability_filter(user)),
        )?;
        if territories.is_empty() {
            return Err(Refusal::NoTerritories.into());
        }

        for territory in &territories {
            let (holder_name, notes) = if user.is_admin() {
                (self.holder_name(territory)?, self.storage.list_notes(&territory.id)?)
            } else {
                (None, Vec::new())
            };
            let caption = messages::territory_caption(
                &self.lang,
                &CaptionView {
                    territory,
                    group_title: &group.title,
                    holder_name: holder_name.as_deref(),
                    notes: &notes,
                },
            );

            let mut message = OutgoingMessage::new(Body::file(territory.file_kind, &territory.file_id, caption));
            if territory.is_available() {
                message = message.inline(vec![vec![Button::new(
                    messages::plain(&self.lang, "button-take"),
                    ButtonAction::TakeTerritory(territory.id.clone()).encode(),
                )]]);
            }
            self.send_listed(user, territory, message).await;
        }
        Ok(())
    }

    /// Territories the user holds, with note and return buttons.
    pub async fn show_my_territories(&self, user: &User) -> WorkflowResult<()> {
        let congregation_id = congregation_of(user)?;
        let territories = self
            .storage
            .list_territories(&TerritoryQuery::in_congregation(congregation_id).held_by(&user.id))?;
        if territories.is_empty() {
            return Err(Refusal::NoTerritories.into());
        }

        for territory in &territories {
            let group_title = self.group_title(&territory.group_id)?;
            let notes = self.storage.list_notes(&territory.id)?;
            let caption = messages::territory_caption(
                &self.lang,
                &CaptionView {
                    territory,
                    group_title: &group_title,
                    holder_name: None,
                    notes: &notes,
                },
            );
            let message = OutgoingMessage::new(Body::file(territory.file_kind, &territory.file_id, caption))
                .inline(self.holder_buttons(&territory.id));
            self.send_listed(user, territory, message).await;
        }
        Ok(())
    }

    /// Sends one territory of a listing. A failed send is logged and the
    /// listing goes on.
    async fn send_listed(&self, user: &User, territory: &Territory, message: OutgoingMessage) {
        if let Err(e) = self.send(user.messenger_chat_id, message).await {
            warn!("Could not send territory {} to user {}: {}", territory.id, user.id, e);
        }
    }

    /// "Take" pressed: re-check availability, then ask the admins.
    pub async fn request_take(
        &self,
        user: &User,
        territory_id: &str,
        pressed: Option<MessageRef>,
    ) -> WorkflowResult<Option<String>> {
        let territory = self.member_territory(user, territory_id)?;
        if !territory.is_available() {
            return Err(Refusal::TerritoryUnavailable.into());
        }

        self.request_take_approval(user, &territory).await?;
        info!("User {} asked for territory {}", user.id, territory.id);

        let sent = messages::take_request_sent(&self.lang, &territory.title);
        self.replace_pressed(user, pressed, sent).await;
        Ok(Some(messages::plain(&self.lang, "ack-done")))
    }

    /// Holder gives a territory back.
    pub async fn return_territory(
        &self,
        user: &User,
        territory_id: &str,
        pressed: Option<MessageRef>,
    ) -> WorkflowResult<Option<String>> {
        let territory = self.member_territory(user, territory_id)?;
        if !territory.is_held_by(&user.id) {
            return Err(Refusal::NotHolder.into());
        }
        if !self
            .storage
            .set_territory_holder(&territory.id, Some(&user.id), None, Utc::now())?
        {
            return Err(Refusal::NotHolder.into());
        }
        info!("User {} returned territory {}", user.id, territory.id);

        if user.role == Some(Role::Publisher) {
            let admins = self.storage.list_users(&territory.congregation_id, Role::Admin)?;
            let notice = messages::returned_admin_notice(&self.lang, &user.full_name, &territory.title);
            self.fan_out(&admins, &OutgoingMessage::text(notice)).await;
        }

        let returned = messages::returned(&self.lang, &territory.title);
        self.replace_pressed(user, pressed, returned).await;
        Ok(Some(messages::plain(&self.lang, "ack-done")))
    }

    /// "Leave note" pressed: ask for the note as a reply.
    pub async fn prompt_note(&self, user: &mut User, territory_id: &str) -> WorkflowResult<Option<String>> {
        let territory = self.member_territory(user, territory_id)?;
        if !territory.is_held_by(&user.id) {
            return Err(Refusal::CannotLeaveNote.into());
        }

        user.stage = Stage::LeaveTerritoryNote;
        self.storage.update_user(user)?;

        let token = CorrelationToken::Note {
            territory_id: territory.id.clone(),
        };
        let prompt = token.embed(&messages::note_prompt(&self.lang, &territory.title));
        self.send(
            user.messenger_chat_id,
            OutgoingMessage::text(prompt).keyboard(Keyboard::ForceReply),
        )
        .await?;
        Ok(None)
    }

    /// Reply to a note prompt.
    pub(crate) async fn save_note(&self, user: &mut User, text: &str, reply_link: Option<&str>) -> WorkflowResult<()> {
        let territory_id = match reply_link.and_then(CorrelationToken::parse) {
            Some(CorrelationToken::Note { territory_id }) => territory_id,
            _ => return Err(Refusal::NoteTargetMissing.into()),
        };
        let territory = self
            .storage
            .get_territory(TerritoryFilter::Id(&territory_id))?
            .ok_or(Refusal::TerritoryNotFound)?;
        if !territory.is_held_by(&user.id) {
            return Err(Refusal::CannotLeaveNote.into());
        }

        let text = text.trim();
        if text.is_empty() {
            return Err(Refusal::NoteTargetMissing.into());
        }
        if text.chars().count() > limits::NOTE_MAX_CHARS {
            return Err(Refusal::NoteTooLong {
                max: limits::NOTE_MAX_CHARS,
            }
            .into());
        }
        self.storage.add_note(&TerritoryNote::new(&territory.id, &user.id, text))?;
        info!("User {} left a note on territory {}", user.id, territory.id);

        self.reset_to_menu(user)?;
        self.say(user.messenger_chat_id, messages::plain(&self.lang, "note-saved"))
            .await?;
        self.show_menu(user).await
    }

    /// "Add territory" menu entry.
    pub(crate) async fn start_add_territory(&self, user: &mut User) -> WorkflowResult<()> {
        if !user.is_admin() {
            return Err(Refusal::NotAdmin.into());
        }
        congregation_of(user)?;

        user.stage = Stage::AdminSendTerritory;
        self.storage.update_user(user)?;
        self.say(user.messenger_chat_id, messages::plain(&self.lang, "territory-add-prompt"))
            .await?;
        Ok(())
    }

    /// Admin upload captioned `"<group>_<title>"`.
    pub async fn register_territory(
        &self,
        user: &User,
        file_id: &str,
        file_kind: FileKind,
        caption: Option<&str>,
    ) -> WorkflowResult<()> {
        if !user.is_admin() {
            return Err(Refusal::NotAdmin.into());
        }
        let congregation_id = congregation_of(user)?;
        let (group_title, title) = caption
            .and_then(parse_territory_caption)
            .ok_or(Refusal::InvalidCaption)?;

        let group = self.storage.get_or_create_group(congregation_id, &group_title)?;
        let exists = || Refusal::TerritoryExists {
            title: title.clone(),
            group: group.title.clone(),
        };
        if self
            .storage
            .get_territory(TerritoryFilter::Title {
                congregation_id,
                group_id: &group.id,
                title: &title,
            })?
            .is_some()
        {
            return Err(exists().into());
        }

        let territory = Territory::new(congregation_id, &group.id, &title, file_id, file_kind);
        match self.storage.create_territory(&territory) {
            Ok(()) => {}
            Err(StorageError::Conflict(_)) => return Err(exists().into()),
            Err(e) => return Err(e.into()),
        }
        info!(
            "Admin {} registered territory {} ({}) in group {}",
            user.id, territory.id, title, group.title
        );

        self.say(
            user.messenger_chat_id,
            messages::territory_added(&self.lang, &title, &group.title),
        )
        .await?;
        Ok(())
    }

    /// Leave-note and return buttons of a held territory.
    pub(crate) fn holder_buttons(&self, territory_id: &str) -> Vec<Vec<Button>> {
        vec![vec![
            Button::new(
                messages::plain(&self.lang, "button-leave-note"),
                ButtonAction::LeaveNote(territory_id.to_string()).encode(),
            ),
            Button::new(
                messages::plain(&self.lang, "button-return"),
                ButtonAction::ReturnTerritory(territory_id.to_string()).encode(),
            ),
        ]]
    }

    pub(crate) fn group_title(&self, group_id: &str) -> WorkflowResult<String> {
        Ok(self
            .storage
            .get_group(group_id)?
            .map(|g| g.title)
            .unwrap_or_default())
    }

    fn holder_name(&self, territory: &Territory) -> WorkflowResult<Option<String>> {
        match &territory.in_use_by_user_id {
            Some(holder_id) => Ok(self
                .storage
                .get_user(UserFilter::Id(holder_id))?
                .map(|holder| holder.full_name)),
            None => Ok(None),
        }
    }

    /// A territory of the user's own congregation.
    fn member_territory(&self, user: &User, territory_id: &str) -> WorkflowResult<Territory> {
        let congregation_id = congregation_of(user)?;
        self.storage
            .get_territory(TerritoryFilter::Id(territory_id))?
            .filter(|t| t.congregation_id == congregation_id)
            .ok_or_else(|| Refusal::TerritoryNotFound.into())
    }

    /// Rewrites the caption of the pressed territory message, or sends the
    /// text when there is none to rewrite.
    async fn replace_pressed(&self, user: &User, pressed: Option<MessageRef>, text: String) {
        let result: WorkflowResult<()> = match pressed {
            Some(message) => self
                .messenger
                .edit(message, MessageEdit::caption(text))
                .await
                .map_err(Into::into),
            None => self.say(user.messenger_chat_id, text).await.map(|_| ()),
        };
        if let Err(e) = result {
            warn!("Could not update pressed message for user {}: {}", user.id, e);
        }
    }
}

/// Publishers only see what they can take.
fn availability_filter(user: &User) -> Option<bool> {
    if user.is_admin() {
        None
    } else {
        Some(true)
    }
}
