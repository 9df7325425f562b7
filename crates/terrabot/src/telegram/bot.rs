//! Bot initialization
//!
//! This module contains:
//! - Command enum definition
//! - Bot instance creation
//! - Command menu registration

use reqwest::ClientBuilder;
use teloxide::prelude::*;
use teloxide::types::BotCommand;
use teloxide::utils::command::BotCommands;

use terracore::config;

/// Bot commands enum with descriptions
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Команди:")]
pub enum Command {
    /// Deep-link payload follows the command (`/start <payload>`)
    #[command(description = "почати або повернутися до меню")]
    Start(String),
}

impl Command {
    /// Deep-link payload, if the command carried one.
    pub fn start_payload(&self) -> Option<String> {
        match self {
            Command::Start(payload) => Some(payload.trim().to_string()).filter(|p| !p.is_empty()),
        }
    }
}

/// Creates a Bot instance with custom or default API URL
///
/// # Returns
/// * `Ok(Bot)` - Successfully created bot instance
/// * `Err(anyhow::Error)` - Missing token or invalid BOT_API_URL
pub fn create_bot() -> anyhow::Result<Bot> {
    if config::BOT_TOKEN.is_empty() {
        anyhow::bail!("BOT_TOKEN is not set");
    }

    let client = ClientBuilder::new().timeout(config::network::timeout()).build()?;
    let bot = Bot::with_client(config::BOT_TOKEN.as_str(), client);

    let bot = match config::BOT_API_URL.as_deref() {
        Some(bot_api_url) => {
            log::info!("Using custom Bot API URL: {}", bot_api_url);
            let url = url::Url::parse(bot_api_url).map_err(|e| anyhow::anyhow!("Invalid BOT_API_URL: {}", e))?;
            bot.set_api_url(url)
        }
        None => bot,
    };

    Ok(bot)
}

/// Sets up bot commands in Telegram UI
pub async fn setup_bot_commands(bot: &Bot) -> Result<(), teloxide::RequestError> {
    bot.set_my_commands(vec![BotCommand::new("start", "почати або повернутися до меню")])
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_start_with_and_without_payload() {
        let bare = Command::parse("/start", "terrabot").unwrap();
        assert_eq!(bare.start_payload(), None);

        let linked = Command::parse("/start join_ab12", "terrabot").unwrap();
        assert_eq!(linked.start_payload(), Some("join_ab12".to_string()));

        let addressed = Command::parse("/start@terrabot", "terrabot").unwrap();
        assert_eq!(addressed, Command::Start(String::new()));
    }

    #[test]
    fn ignores_unknown_commands() {
        assert!(Command::parse("/help", "terrabot").is_err());
    }
}
