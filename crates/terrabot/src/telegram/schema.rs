//! Dispatcher schema and handler chain builders

use std::sync::Arc;

use teloxide::dispatching::{UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;
use teloxide::types::Message;

use terracore::Engine;

use super::bot::Command;
use super::inbound::{callback_event, message_event, start_event};

pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Dependencies required by handlers
#[derive(Clone)]
pub struct HandlerDeps {
    pub engine: Arc<Engine>,
}

impl HandlerDeps {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self { engine }
    }
}

/// Creates the dispatcher schema for the bot.
///
/// Every branch converts its update into an inbound event and hands it to
/// the engine, which never fails; the endpoints therefore always return `Ok`.
pub fn schema(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    let deps_commands = deps.clone();
    let deps_messages = deps.clone();
    let deps_callback = deps;

    dptree::entry()
        // Command handler
        .branch(command_handler(deps_commands))
        // Text, photos and documents
        .branch(message_handler(deps_messages))
        // Inline button presses
        .branch(callback_handler(deps_callback))
}

fn command_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message().branch(dptree::entry().filter_command::<Command>().endpoint(
        move |msg: Message, cmd: Command| {
            let deps = deps.clone();
            async move {
                log::info!("Received command {:?} from chat {}", cmd, msg.chat.id);

                if let Some(event) = start_event(&msg, cmd.start_payload()) {
                    deps.engine.handle(event).await;
                }
                Ok(())
            }
        },
    ))
}

fn message_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message().endpoint(move |msg: Message| {
        let deps = deps.clone();
        async move {
            match message_event(&msg) {
                Some(event) => deps.engine.handle(event).await,
                None => log::debug!("Ignoring unsupported message {} in chat {}", msg.id, msg.chat.id),
            }
            Ok(())
        }
    })
}

fn callback_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_callback_query().endpoint(move |bot: Bot, q: CallbackQuery| {
        let deps = deps.clone();
        async move {
            match callback_event(&q) {
                Some(event) => deps.engine.handle(event).await,
                None => {
                    log::debug!("Answering callback {} without data", q.id.0);
                    // The client spins until every press is answered
                    if let Err(e) = bot.answer_callback_query(q.id.clone()).await {
                        log::warn!("Could not answer callback {}: {}", q.id.0, e);
                    }
                }
            }
            Ok(())
        }
    })
}
