//! Role-gated reply-keyboard menu.

use unic_langid::LanguageIdentifier;

use super::messages;
use super::transport::{Keyboard, OutgoingMessage};
use crate::domain::User;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuCommand {
    ViewTerritories,
    MyTerritories,
    AddTerritory,
}

impl MenuCommand {
    const ALL: [MenuCommand; 3] = [
        MenuCommand::ViewTerritories,
        MenuCommand::MyTerritories,
        MenuCommand::AddTerritory,
    ];

    fn key(self) -> &'static str {
        match self {
            MenuCommand::ViewTerritories => "menu-view-territories",
            MenuCommand::MyTerritories => "menu-my-territories",
            MenuCommand::AddTerritory => "menu-add-territory",
        }
    }

    pub fn label(self, lang: &LanguageIdentifier) -> String {
        messages::plain(lang, self.key())
    }

    /// Matches a text message against the menu labels.
    pub fn parse(text: &str, lang: &LanguageIdentifier) -> Option<Self> {
        let text = text.trim();
        Self::ALL.into_iter().find(|command| command.label(lang) == text)
    }

    pub fn allowed_for(self, user: &User) -> bool {
        match self {
            MenuCommand::AddTerritory => user.is_admin(),
            MenuCommand::ViewTerritories | MenuCommand::MyTerritories => user.role.is_some(),
        }
    }
}

/// Menu keyboard for `user`; admins get the extra "add territory" row.
pub fn render_menu(lang: &LanguageIdentifier, user: &User) -> OutgoingMessage {
    let rows: Vec<Vec<String>> = MenuCommand::ALL
        .into_iter()
        .filter(|command| command.allowed_for(user))
        .map(|command| vec![command.label(lang)])
        .collect();

    OutgoingMessage::text(messages::plain(lang, "menu-prompt")).keyboard(Keyboard::Menu(rows))
}
