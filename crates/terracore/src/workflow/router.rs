//! Update dispatch and the inline-button router.

use log::debug;

use super::callback::ButtonAction;
use super::token::CorrelationToken;
use super::transport::{InboundEvent, InboundKind, Sender};
use super::{Refusal, Workflow, WorkflowResult};
use crate::domain::MessageRef;

impl Workflow {
    /// Handles one inbound event. For button presses, the `Ok` value is the
    /// text to answer the press with.
    pub async fn dispatch(&self, event: &InboundEvent) -> WorkflowResult<Option<String>> {
        match &event.kind {
            InboundKind::Start { payload } => {
                self.handle_start(&event.sender, payload.as_deref()).await?;
                Ok(None)
            }
            InboundKind::Button {
                payload, hidden_link, ..
            } => {
                self.handle_button(&event.sender, event.message, payload, hidden_link.as_deref())
                    .await
            }
            kind @ (InboundKind::Text { .. } | InboundKind::Photo { .. } | InboundKind::Document { .. }) => {
                self.handle_message(&event.sender, kind).await?;
                Ok(None)
            }
        }
    }

    /// Routes a button press by its decoded action.
    ///
    /// Approval buttons carry no subject; it is read from the hidden link of
    /// the pressed message. Unknown payloads and links are treated as stale.
    pub async fn handle_button(
        &self,
        sender: &Sender,
        pressed: Option<MessageRef>,
        payload: &str,
        hidden_link: Option<&str>,
    ) -> WorkflowResult<Option<String>> {
        let Some(action) = ButtonAction::decode(payload) else {
            debug!("Unknown button payload {:?}", payload);
            return Err(Refusal::StaleButton.into());
        };
        let mut user = self.require_user(sender.user_id)?;
        let token = hidden_link.and_then(CorrelationToken::parse);
        let approve = matches!(action, ButtonAction::ApproveJoin | ButtonAction::ApproveTake);

        match action {
            ButtonAction::ApproveJoin | ButtonAction::RejectJoin => match token {
                Some(CorrelationToken::Join {
                    publisher_id,
                    request_id,
                }) => {
                    self.resolve_join(&user, &publisher_id, &request_id, approve).await
                }
                _ => Err(Refusal::StaleButton.into()),
            },
            ButtonAction::ApproveTake | ButtonAction::RejectTake => match token {
                Some(CorrelationToken::Take {
                    publisher_id,
                    territory_id,
                    request_id,
                }) => {
                    self.resolve_take(
                        &user,
                        &publisher_id,
                        &territory_id,
                        &request_id,
                        approve,
                    )
                    .await
                }
                _ => Err(Refusal::StaleButton.into()),
            },
            ButtonAction::ViewGroup(group_id) => {
                self.show_group(&user, &group_id).await?;
                Ok(None)
            }
            ButtonAction::TakeTerritory(territory_id) => self.request_take(&user, &territory_id, pressed).await,
            ButtonAction::ReturnTerritory(territory_id) => {
                self.return_territory(&user, &territory_id, pressed).await
            }
            ButtonAction::LeaveNote(territory_id) => self.prompt_note(&mut user, &territory_id).await,
        }
    }
}
