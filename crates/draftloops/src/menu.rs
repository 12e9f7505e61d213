//! Interactive prompts for picking a pipeline action.
//!
//! Used when the CLI is invoked without a subcommand or without a topic.

use anyhow::Result;
use colored::Colorize;
use dialoguer::{Confirm, Input, Select};

/// What the user chose to do
pub enum MenuAction {
    /// Research a topic and run the revision loop
    Create { topic: String, expansions: Vec<String> },
    /// Reload the most recent snapshot and keep revising it
    Continue { filter: Option<String> },
    /// Do nothing
    Exit,
}

/// Top-level menu shown when no subcommand is given.
pub fn main_menu() -> Result<MenuAction> {
    eprintln!("{}", "draftloops".bold());
    eprintln!();

    let items = &[
        "Create a new document",
        "Continue the latest document",
        "Exit",
    ];

    let selection = Select::new()
        .with_prompt("What would you like to do?")
        .items(items)
        .default(0)
        .interact()?;

    match selection {
        0 => prompt_create(Vec::new()),
        1 => prompt_continue(),
        _ => Ok(MenuAction::Exit),
    }
}

/// Collect a topic (and optional expansion topics) for a new document.
///
/// Expansion topics passed on the command line skip the interactive loop.
pub fn prompt_create(preset_expansions: Vec<String>) -> Result<MenuAction> {
    let topic: String = Input::new()
        .with_prompt("Document topic")
        .validate_with(|input: &String| {
            if input.trim().is_empty() {
                Err("Topic cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;
    let topic = topic.trim().to_string();

    let mut expansions = preset_expansions;

    if expansions.is_empty() {
        while Confirm::new()
            .with_prompt("Add an expansion topic?")
            .default(false)
            .interact()?
        {
            let expansion: String = Input::new()
                .with_prompt("Expansion topic")
                .allow_empty(true)
                .interact_text()?;
            let expansion = expansion.trim().to_string();
            if expansion.is_empty() {
                break;
            }
            expansions.push(expansion);
        }
    }

    let confirmed = Confirm::new()
        .with_prompt(format!(
            "Research \"{}\" and start the revision loop?",
            topic
        ))
        .default(true)
        .interact()?;

    if !confirmed {
        return Ok(MenuAction::Exit);
    }

    Ok(MenuAction::Create { topic, expansions })
}

/// Ask which stored document to pick up. An empty filter means "the newest".
pub fn prompt_continue() -> Result<MenuAction> {
    let filter: String = Input::new()
        .with_prompt("Topic filter (blank for the newest snapshot)")
        .allow_empty(true)
        .interact_text()?;
    let filter = filter.trim();

    let filter = if filter.is_empty() {
        None
    } else {
        Some(filter.to_string())
    };

    Ok(MenuAction::Continue { filter })
}
