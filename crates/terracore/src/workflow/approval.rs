//! Admin approval protocol.
//!
//! A request is fanned out to every admin of the congregation. Each copy
//! carries approve/reject buttons and a hidden [`CorrelationToken`]; the
//! delivered copies are recorded in a [`PendingAction`] keyed by the request
//! ID. Resolution claims that record with an atomic get-and-delete, so only
//! the first admin press mutates anything; later presses find nothing and
//! take the stale branch.

use chrono::Utc;
use futures_util::future::join_all;
use log::{error, info, warn};
use unic_langid::LanguageIdentifier;

use super::callback::ButtonAction;
use super::menu::render_menu;
use super::messages::{self, TakeOutcome};
use super::token::CorrelationToken;
use super::transport::{Body, Button, Keyboard, MessageEdit, OutgoingMessage};
use super::{Refusal, Workflow, WorkflowResult};
use crate::domain::{
    new_id, Congregation, MessageRef, PendingAction, PendingKind, Role, Stage, Territory, User,
};
use crate::storage::{CongregationFilter, TerritoryFilter, UserFilter};

/// Approve/reject row attached to every admin copy.
pub(crate) fn decision_buttons(lang: &LanguageIdentifier, approve: ButtonAction, reject: ButtonAction) -> Vec<Vec<Button>> {
    vec![vec![
        Button::new(messages::plain(lang, "button-approve"), approve.encode()),
        Button::new(messages::plain(lang, "button-reject"), reject.encode()),
    ]]
}

impl Workflow {
    /// Sends `message` to every admin. Failed sends are logged and left out.
    pub(crate) async fn fan_out(&self, admins: &[User], message: &OutgoingMessage) -> Vec<MessageRef> {
        let sends = admins
            .iter()
            .map(|admin| self.messenger.send(admin.messenger_chat_id, message.clone()));
        let results = join_all(sends).await;

        admins
            .iter()
            .zip(results)
            .filter_map(|(admin, result)| match result {
                Ok(message) => Some(message),
                Err(e) => {
                    warn!("Could not deliver request to admin {}: {}", admin.id, e);
                    None
                }
            })
            .collect()
    }

    /// Admins of a congregation, or `NoAdmins`.
    pub(crate) fn admins_of(&self, congregation_id: &str) -> WorkflowResult<Vec<User>> {
        let admins = self.storage.list_users(congregation_id, Role::Admin)?;
        if admins.is_empty() {
            warn!("Congregation {} has no admins", congregation_id);
            return Err(Refusal::NoAdmins.into());
        }
        Ok(admins)
    }

    /// Fans out a decision request and records it under `request_id`.
    async fn open_request(
        &self,
        kind: PendingKind,
        request_id: String,
        admins: &[User],
        message: OutgoingMessage,
    ) -> WorkflowResult<()> {
        let delivered = self.fan_out(admins, &message).await;
        if delivered.is_empty() {
            return Err(Refusal::AdminsUnreachable.into());
        }
        info!(
            "Opened {} request {} with {}/{} admin copies",
            kind.as_str(),
            request_id,
            delivered.len(),
            admins.len()
        );
        self.storage
            .create_pending_action(&PendingAction::new(request_id, kind, delivered))?;
        Ok(())
    }

    /// Asks the admins of `congregation` to let `user` in.
    pub(crate) async fn request_join(&self, user: &mut User, congregation: &Congregation) -> WorkflowResult<()> {
        let admins = self.admins_of(&congregation.id)?;

        let request_id = new_id();
        let token = CorrelationToken::Join {
            publisher_id: user.id.clone(),
            request_id: request_id.clone(),
        };
        let text = token.embed(&messages::join_request(&self.lang, &user.full_name, &congregation.name));
        let message = OutgoingMessage::text(text).inline(decision_buttons(
            &self.lang,
            ButtonAction::ApproveJoin,
            ButtonAction::RejectJoin,
        ));
        self.open_request(PendingKind::Join, request_id, &admins, message).await?;

        user.join_congregation_id = Some(congregation.id.clone());
        user.stage = Stage::WaitingForAdminApproval;
        self.storage.update_user(user)?;

        let sent = OutgoingMessage::text(messages::plain(&self.lang, "join-request-sent")).keyboard(Keyboard::Remove);
        self.send(user.messenger_chat_id, sent).await?;
        Ok(())
    }

    /// Asks the admins to hand `territory` to `user`.
    pub(crate) async fn request_take_approval(&self, user: &User, territory: &Territory) -> WorkflowResult<()> {
        let admins = self.admins_of(&territory.congregation_id)?;
        let group_title = self.group_title(&territory.group_id)?;

        let request_id = new_id();
        let token = CorrelationToken::Take {
            publisher_id: user.id.clone(),
            territory_id: territory.id.clone(),
            request_id: request_id.clone(),
        };
        let caption = token.embed(&messages::take_request(
            &self.lang,
            &user.full_name,
            &territory.title,
            &group_title,
        ));
        let message = OutgoingMessage::new(Body::file(territory.file_kind, &territory.file_id, caption)).inline(
            decision_buttons(&self.lang, ButtonAction::ApproveTake, ButtonAction::RejectTake),
        );
        self.open_request(PendingKind::Take, request_id, &admins, message).await
    }

    /// Settles a join request. Returns the button-answer text.
    pub async fn resolve_join(
        &self,
        admin: &User,
        publisher_id: &str,
        request_id: &str,
        approve: bool,
    ) -> WorkflowResult<Option<String>> {
        let mut publisher = self
            .storage
            .get_user(UserFilter::Id(publisher_id))?
            .ok_or(Refusal::PublisherNotFound)?;

        let congregation_id = publisher
            .join_congregation_id
            .clone()
            .or_else(|| admin.congregation_id.clone())
            .ok_or(Refusal::NotAdmin)?;
        if !admin.administers(&congregation_id) {
            return Err(Refusal::NotAdmin.into());
        }

        let Some(action) = self.storage.take_pending_action(request_id)? else {
            info!("Join request {} already resolved", request_id);
            return Err(Refusal::StaleButton.into());
        };

        if approve {
            publisher.join(congregation_id.clone(), Role::Publisher);
        } else {
            publisher.join_congregation_id = None;
            publisher.stage = Stage::JoinRequestRejected;
        }
        if let Err(e) = self.storage.update_user(&publisher) {
            self.restore_pending(&action);
            return Err(e.into());
        }
        info!(
            "Join request {} {} by admin {}",
            request_id,
            if approve { "approved" } else { "rejected" },
            admin.id
        );

        self.notify_join_outcome(&publisher, &congregation_id, approve).await;

        let outcome = messages::join_outcome(&self.lang, approve, &publisher.full_name, &admin.full_name);
        self.sync_admin_copies(&action, MessageEdit::text(outcome)).await;

        Ok(Some(messages::plain(&self.lang, "ack-done")))
    }

    /// Settles a take request. Returns the button-answer text.
    pub async fn resolve_take(
        &self,
        admin: &User,
        publisher_id: &str,
        territory_id: &str,
        request_id: &str,
        approve: bool,
    ) -> WorkflowResult<Option<String>> {
        let territory = self
            .storage
            .get_territory(TerritoryFilter::Id(territory_id))?
            .ok_or(Refusal::TerritoryNotFound)?;
        if !admin.administers(&territory.congregation_id) {
            return Err(Refusal::NotAdmin.into());
        }
        let publisher = self
            .storage
            .get_user(UserFilter::Id(publisher_id))?
            .ok_or(Refusal::PublisherNotFound)?;

        let Some(action) = self.storage.take_pending_action(request_id)? else {
            info!("Take request {} already resolved", request_id);
            return Err(Refusal::StaleButton.into());
        };

        let outcome = if approve {
            match self
                .storage
                .set_territory_holder(&territory.id, None, Some(&publisher.id), Utc::now())
            {
                Ok(true) => TakeOutcome::Approved,
                Ok(false) => TakeOutcome::Unavailable,
                Err(e) => {
                    self.restore_pending(&action);
                    return Err(e.into());
                }
            }
        } else {
            TakeOutcome::Rejected
        };
        info!(
            "Take request {} for territory {} settled as {:?} by admin {}",
            request_id, territory.id, outcome, admin.id
        );

        self.notify_take_outcome(&publisher, &territory, outcome).await;

        let caption = messages::take_outcome(
            &self.lang,
            outcome,
            &publisher.full_name,
            &territory.title,
            &admin.full_name,
        );
        self.sync_admin_copies(&action, MessageEdit::caption(caption)).await;

        let ack = match outcome {
            TakeOutcome::Unavailable => Refusal::TerritoryUnavailable.localized(&self.lang),
            TakeOutcome::Approved | TakeOutcome::Rejected => messages::plain(&self.lang, "ack-done"),
        };
        Ok(Some(ack))
    }

    async fn notify_join_outcome(&self, publisher: &User, congregation_id: &str, approved: bool) {
        let chat_id = publisher.messenger_chat_id;
        let result = if approved {
            let name = match self.storage.get_congregation(CongregationFilter::Id(congregation_id)) {
                Ok(Some(congregation)) => congregation.name,
                _ => String::new(),
            };
            let notice = self
                .send(chat_id, OutgoingMessage::text(messages::join_approved_notice(&self.lang, &name)))
                .await;
            match notice {
                Ok(_) => self.send(chat_id, render_menu(&self.lang, publisher)).await,
                Err(e) => Err(e),
            }
        } else {
            self.say(chat_id, messages::plain(&self.lang, "join-rejected-notice")).await
        };

        if let Err(e) = result {
            warn!("Could not notify user {} about join outcome: {}", publisher.id, e);
        }
    }

    async fn notify_take_outcome(&self, publisher: &User, territory: &Territory, outcome: TakeOutcome) {
        let result = match outcome {
            TakeOutcome::Approved => {
                let notes = match self.storage.list_notes(&territory.id) {
                    Ok(notes) => notes,
                    Err(e) => {
                        warn!("Could not load notes of territory {}: {}", territory.id, e);
                        Vec::new()
                    }
                };
                let caption = messages::take_notice(&self.lang, true, &territory.title, &notes);
                let message = OutgoingMessage::new(Body::file(territory.file_kind, &territory.file_id, caption))
                    .inline(self.holder_buttons(&territory.id));
                self.send(publisher.messenger_chat_id, message).await
            }
            TakeOutcome::Rejected | TakeOutcome::Unavailable => {
                let notice = messages::take_notice(&self.lang, false, &territory.title, &[]);
                self.say(publisher.messenger_chat_id, notice).await
            }
        };

        if let Err(e) = result {
            warn!("Could not notify user {} about take outcome: {}", publisher.id, e);
        }
    }

    /// Writes the final outcome onto every admin copy and clears its buttons.
    async fn sync_admin_copies(&self, action: &PendingAction, edit: MessageEdit) {
        let edits = action
            .admin_messages
            .iter()
            .map(|message| self.messenger.edit(*message, edit.clone()));
        let results = join_all(edits).await;

        for (message, result) in action.admin_messages.iter().zip(results) {
            if let Err(e) = result {
                warn!(
                    "Could not update admin copy {}/{} of request {}: {}",
                    message.chat_id, message.message_id, action.id, e
                );
            }
        }
    }

    /// Puts a claimed record back after its mutation failed.
    fn restore_pending(&self, action: &PendingAction) {
        if let Err(e) = self.storage.create_pending_action(action) {
            error!("Could not restore pending action {}: {}", action.id, e);
        }
    }
}
