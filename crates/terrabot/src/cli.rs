use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "terrabot")]
#[command(author, version, about = "Telegram bot that hands out congregation territories", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the bot (default when no command is given)
    Run,

    /// Register a congregation so members can join it
    AddCongregation {
        /// Congregation name, as members will type it
        name: String,
    },

    /// Make an already registered user an admin of a congregation
    PromoteAdmin {
        /// Telegram user id of the person to promote
        user_id: i64,

        /// Name of the congregation they will administer
        congregation: String,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_arguments_means_run() {
        let cli = Cli::try_parse_from(["terrabot"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn parses_promote_admin() {
        let cli = Cli::try_parse_from(["terrabot", "promote-admin", "42", "Lviv"]).unwrap();
        match cli.command {
            Some(Commands::PromoteAdmin { user_id, congregation }) => {
                assert_eq!(user_id, 42);
                assert_eq!(congregation, "Lviv");
            }
            _ => panic!("expected promote-admin"),
        }
    }

    #[test]
    fn parses_add_congregation() {
        let cli = Cli::try_parse_from(["terrabot", "add-congregation", "North Lviv"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::AddCongregation { name }) if name == "North Lviv"));
    }
}
