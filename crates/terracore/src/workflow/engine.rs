//! Per-update boundary.
//!
//! Every inbound event goes through [`Engine::handle`], which bounds the
//! handler with a deadline, turns a panic into an error, decides what the
//! user sees, and answers a button press exactly once.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::FutureExt;
use log::{debug, error, info, warn};

use super::transport::{InboundEvent, OutgoingMessage, TransportResult};
use super::{messages, Refusal, Workflow, WorkflowError, WorkflowResult};

pub struct Engine {
    workflow: Arc<Workflow>,
    timeout: Duration,
}

/// What the user gets back from one update.
#[derive(Debug, Default, PartialEq, Eq)]
struct Outcome {
    /// Toast text of the button answer.
    answer: Option<String>,
    /// Message to the sender's chat.
    reply: Option<String>,
}

impl Engine {
    pub fn new(workflow: Arc<Workflow>, timeout: Duration) -> Self {
        Self { workflow, timeout }
    }

    /// Processes one event. Never panics and never returns an error.
    pub async fn handle(&self, event: InboundEvent) {
        let started = Instant::now();
        let handler = AssertUnwindSafe(self.workflow.dispatch(&event)).catch_unwind();

        let result = match tokio::time::timeout(self.timeout, handler).await {
            Ok(Ok(result)) => result,
            Ok(Err(panic)) => Err(WorkflowError::Panicked(panic_message(panic.as_ref()))),
            Err(_) => Err(WorkflowError::Timeout),
        };
        let outcome = self.outcome(&event, result);
        let messenger = self.workflow.messenger();

        if let Some(callback_id) = event.callback_id() {
            guarded(
                "answer button press",
                messenger.answer_button(callback_id, outcome.answer.as_deref()),
            )
            .await;
        }
        if let Some(reply) = outcome.reply {
            guarded(
                "send reply",
                messenger.send(event.sender.chat_id, OutgoingMessage::text(reply)),
            )
            .await;
        }

        debug!(
            "Update from {} handled in {:?}",
            event.sender.user_id,
            started.elapsed()
        );
    }

    /// Logs the handler result and picks the user-facing texts.
    fn outcome(&self, event: &InboundEvent, result: WorkflowResult<Option<String>>) -> Outcome {
        let lang = self.workflow.lang();
        let is_button = event.callback_id().is_some();

        match result {
            Ok(answer) => Outcome { answer, reply: None },
            Err(WorkflowError::Refused(refusal)) => {
                info!("Update from {} refused: {}", event.sender.user_id, refusal);
                let text = refusal.localized(lang);
                // Stale and lost-race presses only get the toast
                if is_button && matches!(refusal, Refusal::StaleButton | Refusal::TerritoryUnavailable) {
                    Outcome {
                        answer: Some(text),
                        reply: None,
                    }
                } else {
                    Outcome {
                        answer: None,
                        reply: Some(text),
                    }
                }
            }
            Err(e) => {
                error!("Failed to handle update from {}: {}", event.sender.user_id, e);
                Outcome {
                    answer: None,
                    reply: Some(messages::plain(lang, "error-generic")),
                }
            }
        }
    }
}

/// Runs a transport call that must not take the update down with it.
async fn guarded<T>(what: &str, call: impl Future<Output = TransportResult<T>>) {
    match AssertUnwindSafe(call).catch_unwind().await {
        Ok(Ok(_)) => {}
        Ok(Err(e)) => warn!("Failed to {}: {}", what, e),
        Err(panic) => error!("Panicked while trying to {}: {}", what, panic_message(panic.as_ref())),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
