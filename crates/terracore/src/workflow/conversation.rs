//! Per-user stage machine for `/start` and plain messages.

use log::{debug, info};

use super::menu::{render_menu, MenuCommand};
use super::messages;
use super::transport::{InboundKind, Keyboard, OutgoingMessage, Sender};
use super::{Refusal, Workflow, WorkflowResult};
use crate::domain::{FileKind, Stage, User};
use crate::storage::CongregationFilter;

impl Workflow {
    /// `/start [payload]`. The payload of a deep link is a congregation ID.
    pub async fn handle_start(&self, sender: &Sender, payload: Option<&str>) -> WorkflowResult<()> {
        let target = match payload.map(str::trim).filter(|p| !p.is_empty()) {
            Some(id) => self.storage.get_congregation(CongregationFilter::Id(id))?,
            None => None,
        };

        let Some(mut user) = self.find_user(sender.user_id)? else {
            let mut user = User::new(sender.user_id, sender.chat_id);
            user.join_congregation_id = target.map(|c| c.id);
            self.storage.create_user(&user)?;
            info!("New user {} (messenger id {})", user.id, sender.user_id);
            self.prompt_full_name(&user).await?;
            return Ok(());
        };
        self.refresh_chat(&mut user, sender)?;

        match user.stage {
            Stage::EnterFullName => {
                if let Some(congregation) = target {
                    user.join_congregation_id = Some(congregation.id);
                    self.storage.update_user(&user)?;
                }
                self.prompt_full_name(&user).await?;
            }
            Stage::EnterCongregationName => match target {
                Some(congregation) => self.request_join(&mut user, &congregation).await?,
                None => self.prompt_congregation(&user).await?,
            },
            Stage::WaitingForAdminApproval => {
                self.say(user.messenger_chat_id, messages::plain(&self.lang, "join-still-waiting"))
                    .await?;
            }
            Stage::JoinRequestRejected => {
                self.say(user.messenger_chat_id, messages::plain(&self.lang, "join-rejected-notice"))
                    .await?;
            }
            Stage::SelectActionFromMenu | Stage::AdminSendTerritory | Stage::LeaveTerritoryNote => {
                self.show_menu(&mut user).await?;
            }
        }
        Ok(())
    }

    /// Text, photo or document outside of `/start`.
    pub async fn handle_message(&self, sender: &Sender, kind: &InboundKind) -> WorkflowResult<()> {
        let Some(mut user) = self.find_user(sender.user_id)? else {
            let user = User::new(sender.user_id, sender.chat_id);
            self.storage.create_user(&user)?;
            info!("New user {} (messenger id {})", user.id, sender.user_id);
            self.prompt_full_name(&user).await?;
            return Ok(());
        };
        self.refresh_chat(&mut user, sender)?;

        // Menu labels win over the stage for members
        if let InboundKind::Text { text, .. } = kind {
            if user.role.is_some() {
                if let Some(command) = MenuCommand::parse(text, &self.lang) {
                    return self.run_menu_command(&mut user, command).await;
                }
            }
        }

        debug!("User {} at stage {} sent {:?}", user.id, user.stage, kind_name(kind));

        match (user.stage, kind) {
            (Stage::EnterFullName, InboundKind::Text { text, .. }) => self.save_full_name(&mut user, text).await,
            (Stage::EnterFullName, _) => self.prompt_full_name(&user).await,

            (Stage::EnterCongregationName, InboundKind::Text { text, .. }) => {
                let name = text.trim();
                let congregation = self
                    .storage
                    .get_congregation(CongregationFilter::Name(name))?
                    .ok_or_else(|| Refusal::CongregationNotFound { name: name.to_string() })?;
                self.request_join(&mut user, &congregation).await
            }
            (Stage::EnterCongregationName, _) => self.prompt_congregation(&user).await,

            (Stage::WaitingForAdminApproval, _) => {
                self.say(user.messenger_chat_id, messages::plain(&self.lang, "join-still-waiting"))
                    .await?;
                Ok(())
            }
            (Stage::JoinRequestRejected, _) => {
                self.say(user.messenger_chat_id, messages::plain(&self.lang, "join-rejected-notice"))
                    .await?;
                Ok(())
            }

            (Stage::AdminSendTerritory, InboundKind::Photo { file_id, caption }) => {
                self.register_territory(&user, file_id, FileKind::Photo, caption.as_deref())
                    .await
            }
            (Stage::AdminSendTerritory, InboundKind::Document { file_id, caption }) => {
                self.register_territory(&user, file_id, FileKind::Document, caption.as_deref())
                    .await
            }
            (Stage::AdminSendTerritory, _) => {
                self.say(user.messenger_chat_id, messages::plain(&self.lang, "territory-add-prompt"))
                    .await?;
                Ok(())
            }

            (Stage::LeaveTerritoryNote, InboundKind::Text { text, reply_link }) => {
                self.save_note(&mut user, text, reply_link.as_deref()).await
            }
            (Stage::LeaveTerritoryNote, _) => Err(Refusal::NoteTargetMissing.into()),

            (Stage::SelectActionFromMenu, _) => self.show_menu(&mut user).await,
        }
    }

    async fn save_full_name(&self, user: &mut User, text: &str) -> WorkflowResult<()> {
        let name = text.trim();
        if name.is_empty() {
            return self.prompt_full_name(user).await;
        }

        user.full_name = name.to_string();
        user.stage = Stage::EnterCongregationName;
        let target = user.join_congregation_id.take();
        self.storage.update_user(user)?;

        let congregation = match target {
            Some(id) => self.storage.get_congregation(CongregationFilter::Id(&id))?,
            None => None,
        };
        match congregation {
            Some(congregation) => self.request_join(user, &congregation).await,
            None => self.prompt_congregation(user).await,
        }
    }

    async fn run_menu_command(&self, user: &mut User, command: MenuCommand) -> WorkflowResult<()> {
        if !command.allowed_for(user) {
            return Err(Refusal::NotAdmin.into());
        }
        match command {
            MenuCommand::ViewTerritories => {
                self.reset_to_menu(user)?;
                self.show_groups(user).await
            }
            MenuCommand::MyTerritories => {
                self.reset_to_menu(user)?;
                self.show_my_territories(user).await
            }
            MenuCommand::AddTerritory => self.start_add_territory(user).await,
        }
    }

    /// Puts a member back at the menu and renders it.
    pub(crate) async fn show_menu(&self, user: &mut User) -> WorkflowResult<()> {
        if user.role.is_none() {
            user.stage = Stage::EnterCongregationName;
            self.storage.update_user(user)?;
            return self.prompt_congregation(user).await;
        }
        self.reset_to_menu(user)?;
        self.send(user.messenger_chat_id, render_menu(&self.lang, user)).await?;
        Ok(())
    }

    pub(crate) fn reset_to_menu(&self, user: &mut User) -> WorkflowResult<()> {
        if user.stage != Stage::SelectActionFromMenu {
            user.stage = Stage::SelectActionFromMenu;
            self.storage.update_user(user)?;
        }
        Ok(())
    }

    async fn prompt_full_name(&self, user: &User) -> WorkflowResult<()> {
        let prompt = OutgoingMessage::text(messages::plain(&self.lang, "start-name-prompt")).keyboard(Keyboard::Remove);
        self.send(user.messenger_chat_id, prompt).await?;
        Ok(())
    }

    async fn prompt_congregation(&self, user: &User) -> WorkflowResult<()> {
        self.say(user.messenger_chat_id, messages::plain(&self.lang, "start-congregation-prompt"))
            .await?;
        Ok(())
    }

    /// Users may reach the bot from a new chat.
    fn refresh_chat(&self, user: &mut User, sender: &Sender) -> WorkflowResult<()> {
        if user.messenger_chat_id != sender.chat_id {
            user.messenger_chat_id = sender.chat_id;
            self.storage.update_user(user)?;
        }
        Ok(())
    }
}

fn kind_name(kind: &InboundKind) -> &'static str {
    match kind {
        InboundKind::Start { .. } => "start",
        InboundKind::Text { .. } => "text",
        InboundKind::Photo { .. } => "photo",
        InboundKind::Document { .. } => "document",
        InboundKind::Button { .. } => "button",
    }
}
