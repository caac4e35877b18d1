//! CLI argument definitions for Corkboard.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::models::{BoardId, CardId};

fn parse_card_id(s: &str) -> Result<CardId, String> {
    s.parse().map_err(|e: crate::Error| e.to_string())
}

fn parse_board_id(s: &str) -> Result<BoardId, String> {
    s.parse().map_err(|e: crate::Error| e.to_string())
}

/// Version string with the build commit and timestamp, shown by `--version`.
const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("CORK_GIT_COMMIT"),
    ", built ",
    env!("CORK_BUILD_TIMESTAMP"),
    ")"
);

/// Corkboard - spatial card boards with inline mentions and backlinks.
///
/// Start with `cork init`, create cards with `cork card create`, and place
/// them on a board with `cork board add`.
#[derive(Parser, Debug)]
#[command(name = "cork")]
#[command(author, version, long_version = LONG_VERSION, about = "Spatial card boards with inline mentions and backlinks", long_about = None)]
pub struct Cli {
    /// Output in human-readable format instead of JSON
    #[arg(short = 'H', long = "human", global = true)]
    pub human_readable: bool,

    /// Data directory holding the database and its config.kdl.
    /// Can also be set via CORK_DATA_DIR environment variable.
    #[arg(long = "data-dir", global = true, env = "CORK_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Override a config value for this run (e.g. --config max-scale=3).
    /// May be repeated before the subcommand; takes precedence over config.kdl files.
    #[arg(long = "config", value_name = "KEY=VALUE")]
    pub config: Vec<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the data directory and database
    Init,

    /// Card management commands
    Card {
        #[command(subcommand)]
        command: CardCommands,
    },

    /// Board management commands
    Board {
        #[command(subcommand)]
        command: BoardCommands,
    },

    /// Mention autocomplete commands
    Mention {
        #[command(subcommand)]
        command: MentionCommands,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

/// Card subcommands
#[derive(Subcommand, Debug)]
pub enum CardCommands {
    /// Create a new card
    Create {
        /// Card title
        title: String,

        /// Markdown body (may contain @[[id|title]] mentions)
        #[arg(short, long)]
        content: Option<String>,
    },

    /// Show a card with its boards and linked cards
    Show {
        /// Card ID
        #[arg(value_parser = parse_card_id)]
        id: CardId,
    },

    /// List all cards
    List,

    /// Change a card's title and/or body
    Edit {
        /// Card ID
        #[arg(value_parser = parse_card_id)]
        id: CardId,

        /// New title
        #[arg(short, long)]
        title: Option<String>,

        /// New body
        #[arg(short, long)]
        content: Option<String>,
    },

    /// Delete a card and take it off every board
    Delete {
        /// Card ID
        #[arg(value_parser = parse_card_id)]
        id: CardId,
    },

    /// Show outgoing mentions, incoming mentions and the merged linked list
    Links {
        /// Card ID
        #[arg(value_parser = parse_card_id)]
        id: CardId,
    },
}

/// Board subcommands
#[derive(Subcommand, Debug)]
pub enum BoardCommands {
    /// Create a new board
    Create {
        /// Board name
        name: String,
    },

    /// List boards
    List,

    /// Show a board's cards and their positions
    Show {
        /// Board ID
        #[arg(value_parser = parse_board_id)]
        id: BoardId,
    },

    /// Place a card on a board
    Add {
        /// Board ID
        #[arg(value_parser = parse_board_id)]
        board: BoardId,

        /// Card ID
        #[arg(value_parser = parse_card_id)]
        card: CardId,

        /// X position in world units
        #[arg(short, long, allow_hyphen_values = true, requires = "y")]
        x: Option<i64>,

        /// Y position in world units
        #[arg(short, long, allow_hyphen_values = true, requires = "x")]
        y: Option<i64>,
    },

    /// Take a card off a board (the card is kept)
    Remove {
        /// Board ID
        #[arg(value_parser = parse_board_id)]
        board: BoardId,

        /// Card ID
        #[arg(value_parser = parse_card_id)]
        card: CardId,
    },

    /// Run a JSON gesture script against a board and persist the commits
    Replay {
        /// Board ID
        #[arg(value_parser = parse_board_id)]
        board: BoardId,

        /// Path to the script
        script: PathBuf,

        /// Run against an in-memory copy and leave storage untouched
        #[arg(long)]
        dry_run: bool,
    },
}

/// Mention subcommands
#[derive(Subcommand, Debug)]
pub enum MentionCommands {
    /// Show autocomplete candidates for the `@` run at the caret
    Complete {
        /// Card being edited (excluded from candidates)
        #[arg(value_parser = parse_card_id)]
        card: CardId,

        /// Full body text
        #[arg(long)]
        text: String,

        /// Caret as a byte offset into the text (default: end of text)
        #[arg(long)]
        caret: Option<usize>,

        /// Insert a mention of this card and print the rewritten text
        #[arg(long, value_parser = parse_card_id)]
        select: Option<CardId>,
    },
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show every effective setting and its source
    Show,

    /// Store a setting in the data-dir config.kdl
    Set {
        /// Setting as key=value (e.g. autosave-delay-ms=500)
        assignment: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_board_add_with_negative_position() {
        let cli = Cli::parse_from(["cork", "board", "add", "1", "7", "-x", "-40", "-y", "25"]);
        match cli.command {
            Commands::Board {
                command: BoardCommands::Add { board, card, x, y },
            } => {
                assert_eq!(board, BoardId(1));
                assert_eq!(card, CardId(7));
                assert_eq!((x, y), (Some(-40), Some(25)));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_repeated_config_flags() {
        let cli = Cli::parse_from([
            "cork",
            "--config",
            "min-scale=0.5",
            "--config",
            "max-scale=3",
            "config",
            "show",
        ]);
        assert_eq!(cli.config, vec!["min-scale=0.5", "max-scale=3"]);
    }

    #[test]
    fn test_config_flag_after_subcommand_rejected() {
        let result = Cli::try_parse_from([
            "cork",
            "--config",
            "min-scale=0.5",
            "config",
            "show",
            "--config",
            "max-scale=3",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_card_id_rejected() {
        assert!(Cli::try_parse_from(["cork", "card", "show", "abc"]).is_err());
    }

    #[test]
    fn test_verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
