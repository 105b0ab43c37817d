use std::path::PathBuf;

use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::{Args, CommandFactory, Parser, Subcommand};

use crate::domain::entity_class::EntityClass;

fn cli_styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::BrightCyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::BrightYellow.on_default() | Effects::BOLD)
        .literal(AnsiColor::BrightGreen.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::BrightMagenta.on_default())
}

pub fn styled_command() -> clap::Command {
    Cli::command()
}

#[derive(Debug, Parser)]
#[command(name = "sp")]
#[command(bin_name = "sp")]
#[command(version)]
#[command(about = "Track epics, stories, tasks and time entries with configurable workflows")]
#[command(styles = cli_styles())]
pub struct Cli {
    #[arg(
        short = 'd',
        long,
        env = "SMARTPLANNER_DB_PATH",
        default_value = ".smartplanner/state.sqlite",
        help = "Path to the SQLite database."
    )]
    pub db: String,

    #[arg(
        short = 'c',
        long,
        env = "SMARTPLANNER_CONFIG",
        default_value = ".smartplanner/config.toml",
        help = "Path to the TOML settings file."
    )]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    #[command(about = "Create an epic, story, task or time entry.")]
    New(NewArgs),
    #[command(about = "Move an entity to another state.")]
    Status(StatusArgs),
    #[command(about = "Update title and effort fields.")]
    Update(UpdateArgs),
    #[command(about = "Show one entity by id.")]
    Show(ShowArgs),
    #[command(about = "List entities with filtering.")]
    Ls(ListArgs),
    #[command(about = "Show completion progress of an entity's children.")]
    Progress(ProgressArgs),
    #[command(about = "Inspect and customize per-class state sets.")]
    States(StatesArgs),
    #[command(about = "Generate or install shell completions.")]
    Completions(CompletionsArgs),
}

#[derive(Debug, Args)]
#[command(about = "Generate or install shell completions.")]
pub struct CompletionsArgs {
    #[arg(help = "Shell name (bash, zsh, fish). Auto-detected if omitted.")]
    pub shell: Option<String>,

    #[arg(
        short = 'i',
        long = "install",
        help = "Write completions to the canonical path for the shell."
    )]
    pub install: bool,
}

#[derive(Debug, Args)]
pub struct NewArgs {
    #[arg(help = "Entity class: epic, story, task or time_entry.")]
    pub class: EntityClass,

    #[arg(help = "Entity title.")]
    pub title: String,

    #[arg(short = 'p', long, help = "Parent entity id.")]
    pub parent: Option<String>,

    #[arg(short = 'e', long, help = "Estimated effort in hours.")]
    pub estimate: Option<f64>,

    #[arg(
        short = 's',
        long,
        help = "Initial state (defaults to the class default state)."
    )]
    pub status: Option<String>,

    #[arg(short = 'j', long, help = "Render machine-readable JSON.")]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct StatusArgs {
    #[arg(help = "Entity id.")]
    pub id: String,

    #[arg(help = "Target state id.")]
    pub state: String,

    #[arg(
        short = 'f',
        long,
        help = "Leave a final state even under the strict policy."
    )]
    pub force: bool,

    #[arg(short = 'j', long, help = "Render machine-readable JSON.")]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct UpdateArgs {
    #[arg(help = "Entity id.")]
    pub id: String,

    #[arg(short = 't', long, help = "Set title.")]
    pub title: Option<String>,

    #[arg(short = 'e', long, help = "Set estimated hours.")]
    pub estimate: Option<f64>,

    #[arg(short = 'a', long, help = "Set actual hours.")]
    pub actual: Option<f64>,

    #[arg(short = 'j', long, help = "Render machine-readable JSON.")]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct ShowArgs {
    #[arg(help = "Entity id.")]
    pub id: String,

    #[arg(short = 'j', long, help = "Render machine-readable JSON.")]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct ListArgs {
    #[arg(
        short = 'a',
        long = "all",
        help = "Include entities sitting in a final state."
    )]
    pub all: bool,

    #[arg(short = 'k', long, help = "Filter by entity class.")]
    pub class: Option<EntityClass>,

    #[arg(short = 'p', long, help = "Filter by parent id.")]
    pub parent: Option<String>,

    #[arg(short = 's', long, help = "Filter by state id or label.")]
    pub status: Option<String>,

    #[arg(short = 'q', long, help = "Substring match on id, title or state label.")]
    pub query: Option<String>,

    #[arg(short = 'j', long, help = "Render machine-readable JSON.")]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct ProgressArgs {
    #[arg(help = "Entity id.")]
    pub id: String,

    #[arg(short = 'j', long, help = "Render machine-readable JSON.")]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct StatesArgs {
    #[command(subcommand)]
    pub command: StatesSubcommands,
}

#[derive(Debug, Subcommand)]
pub enum StatesSubcommands {
    #[command(about = "List the state set of every class.", alias = "ls")]
    List(StatesListArgs),
    #[command(about = "Show one class's state set.")]
    Show(StatesShowArgs),
    #[command(about = "Add a state to a class.")]
    Add(StatesAddArgs),
    #[command(about = "Remove an unprotected state.")]
    Remove(StateRefArgs),
    #[command(about = "Make a state the class default.")]
    Default(StateRefArgs),
    #[command(about = "Mark or unmark a state as final.")]
    Final(StatesFinalArgs),
    #[command(about = "Move a state to another display position.")]
    Move(StatesMoveArgs),
    #[command(about = "Set or clear the state parents revert to on reopen.")]
    Reopen(StatesReopenArgs),
    #[command(about = "Drop customizations and restore the built-in set.")]
    Reset(StatesResetArgs),
}

#[derive(Debug, Args)]
pub struct StatesListArgs {
    #[arg(short = 'j', long, help = "Render machine-readable JSON.")]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct StatesShowArgs {
    pub class: EntityClass,

    #[arg(short = 'j', long, help = "Render machine-readable JSON.")]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct StatesAddArgs {
    pub class: EntityClass,

    #[arg(help = "State id; integers stay numeric.")]
    pub id: String,

    pub label: String,

    #[arg(long)]
    pub icon: Option<String>,

    #[arg(long)]
    pub color: Option<String>,

    #[arg(long, help = "Zero-based display position (appends when omitted).")]
    pub position: Option<usize>,

    #[arg(long = "final", help = "Also mark the new state as final.")]
    pub terminal: bool,

    #[arg(long)]
    pub protected: bool,
}

#[derive(Debug, Args)]
pub struct StateRefArgs {
    pub class: EntityClass,
    pub id: String,
}

#[derive(Debug, Args)]
pub struct StatesFinalArgs {
    pub class: EntityClass,
    pub id: String,

    #[arg(long, help = "Remove the state from the final states instead.")]
    pub unset: bool,
}

#[derive(Debug, Args)]
pub struct StatesMoveArgs {
    pub class: EntityClass,
    pub id: String,
    pub index: usize,
}

#[derive(Debug, Args)]
pub struct StatesReopenArgs {
    pub class: EntityClass,

    #[arg(help = "Reopen state id; clears the setting when omitted.")]
    pub id: Option<String>,
}

#[derive(Debug, Args)]
pub struct StatesResetArgs {
    pub class: EntityClass,
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
