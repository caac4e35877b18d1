//! Corkboard CLI - spatial card boards with inline mentions and backlinks.

use clap::Parser;
use corkboard::cli::{
    BoardCommands, CardCommands, Cli, Commands, ConfigCommands, MentionCommands,
};
use corkboard::commands::{self, CommandResult};
use corkboard::config::ConfigOverrides;
use corkboard::models::GridPosition;
use corkboard::storage::get_storage_dir;
use std::path::Path;
use std::process;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter (e.g. `CORK_LOG=corkboard=debug`).
const LOG_ENV: &str = "CORK_LOG";

fn main() {
    init_tracing();

    let cli = Cli::parse();
    let human = cli.human_readable;

    let result = get_storage_dir(cli.data_dir.as_deref()).and_then(|data_dir| {
        let overrides = parse_overrides(&cli.config)?;
        run_command(cli.command, &data_dir, &overrides, human)
    });

    if let Err(e) = result {
        if human {
            eprintln!("Error: {}", e);
        } else {
            eprintln!("{}", serde_json::json!({ "error": e.to_string() }));
        }
        process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn parse_overrides(assignments: &[String]) -> Result<ConfigOverrides, corkboard::Error> {
    let mut overrides = ConfigOverrides::new();
    for assignment in assignments {
        overrides.set(assignment)?;
    }
    Ok(overrides)
}

fn run_command(
    command: Commands,
    data_dir: &Path,
    overrides: &ConfigOverrides,
    human: bool,
) -> Result<(), corkboard::Error> {
    match command {
        Commands::Init => {
            let result = commands::init(data_dir)?;
            output(&result, human);
        }

        Commands::Card { command } => match command {
            CardCommands::Create { title, content } => {
                let result = commands::card_create(data_dir, &title, content.as_deref())?;
                output(&result, human);
            }
            CardCommands::Show { id } => {
                let result = commands::card_show(data_dir, id)?;
                output(&result, human);
            }
            CardCommands::List => {
                let result = commands::card_list(data_dir)?;
                output(&result, human);
            }
            CardCommands::Edit { id, title, content } => {
                let result = commands::card_edit(data_dir, overrides, id, title, content)?;
                output(&result, human);
            }
            CardCommands::Delete { id } => {
                let result = commands::card_delete(data_dir, id)?;
                output(&result, human);
            }
            CardCommands::Links { id } => {
                let result = commands::card_links(data_dir, id)?;
                output(&result, human);
            }
        },

        Commands::Board { command } => match command {
            BoardCommands::Create { name } => {
                let result = commands::board_create(data_dir, &name)?;
                output(&result, human);
            }
            BoardCommands::List => {
                let result = commands::board_list(data_dir)?;
                output(&result, human);
            }
            BoardCommands::Show { id } => {
                let result = commands::board_show(data_dir, overrides, id)?;
                output(&result, human);
            }
            BoardCommands::Add { board, card, x, y } => {
                let position = x.zip(y).map(|(x, y)| GridPosition::new(x, y));
                let result = commands::board_add(data_dir, overrides, board, card, position)?;
                output(&result, human);
            }
            BoardCommands::Remove { board, card } => {
                let result = commands::board_remove(data_dir, overrides, board, card)?;
                output(&result, human);
            }
            BoardCommands::Replay {
                board,
                script,
                dry_run,
            } => {
                let result = commands::board_replay(data_dir, overrides, board, &script, dry_run)?;
                output(&result, human);
            }
        },

        Commands::Mention { command } => match command {
            MentionCommands::Complete {
                card,
                text,
                caret,
                select,
            } => {
                let result =
                    commands::mention_complete(data_dir, overrides, card, &text, caret, select)?;
                output(&result, human);
            }
        },

        Commands::Config { command } => match command {
            ConfigCommands::Show => {
                let result = commands::config_show(data_dir, overrides)?;
                output(&result, human);
            }
            ConfigCommands::Set { assignment } => {
                let result = commands::config_set(data_dir, &assignment)?;
                output(&result, human);
            }
        },
    }
    Ok(())
}

fn output<T: CommandResult>(result: &T, human: bool) {
    if human {
        println!("{}", result.to_human());
    } else {
        println!("{}", result.to_json());
    }
}
