//! Slash command parsing for the chat loop.
//!
//! Commands start with `/` and provide in-chat controls for session and
//! model management, history, and recipe lookup.

use console::style;

/// Available slash commands in the chat loop.
#[derive(Debug, PartialEq)]
pub enum ChatCommand {
    /// Show available commands.
    Help,
    /// Clear the terminal screen.
    Clear,
    /// Exit the chat session.
    Exit,
    /// Start a new session.
    New,
    /// Show the current conversation.
    History,
    /// Show the session's keyword summary.
    Summary,
    /// List installed models, or switch to the named one.
    Model(Option<String>),
    /// List persisted sessions.
    Sessions,
    /// Switch to a persisted session by list index or id.
    Session(String),
    /// Search the recipe catalog (same matching as @-autocomplete).
    Recipes(String),
    /// Unknown command.
    Unknown(String),
}

/// Parse user input as a slash command.
///
/// Returns `None` if the input doesn't start with `/`.
pub fn parse(input: &str) -> Option<ChatCommand> {
    let trimmed = input.trim();
    if !trimmed.starts_with('/') {
        return None;
    }

    let parts: Vec<&str> = trimmed.splitn(2, ' ').collect();
    let cmd = parts[0].to_lowercase();
    let arg = parts.get(1).map(|s| s.trim().to_string()).filter(|s| !s.is_empty());

    match cmd.as_str() {
        "/help" | "/h" | "/?" => Some(ChatCommand::Help),
        "/clear" | "/cls" => Some(ChatCommand::Clear),
        "/exit" | "/quit" | "/q" => Some(ChatCommand::Exit),
        "/new" => Some(ChatCommand::New),
        "/history" => Some(ChatCommand::History),
        "/summary" => Some(ChatCommand::Summary),
        "/model" | "/m" => Some(ChatCommand::Model(arg)),
        "/sessions" => Some(ChatCommand::Sessions),
        "/session" => match arg {
            Some(selector) => Some(ChatCommand::Session(selector)),
            None => Some(ChatCommand::Unknown(
                "/session requires a session number or id".to_string(),
            )),
        },
        "/recipes" | "/r" => Some(ChatCommand::Recipes(arg.unwrap_or_default())),
        other => Some(ChatCommand::Unknown(other.to_string())),
    }
}

/// Print the help text listing all available commands.
pub fn print_help() {
    println!();
    println!("  {}", style("Available commands:").bold());
    println!();
    println!("  {}      {}", style("/help").cyan(), "Show this help message");
    println!("  {}     {}", style("/clear").cyan(), "Clear the screen");
    println!("  {}      {}", style("/exit").cyan(), "End the chat session");
    println!("  {}       {}", style("/new").cyan(), "Start a new session");
    println!("  {}   {}", style("/history").cyan(), "Show the current conversation");
    println!("  {}   {}", style("/summary").cyan(), "Show the session keyword summary");
    println!("  {}     {}", style("/model").cyan(), "List models, or switch: /model <name>");
    println!("  {}  {}", style("/sessions").cyan(), "List persisted sessions");
    println!("  {}   {}", style("/session").cyan(), "Load a session: /session <n|id>");
    println!("  {}   {}", style("/recipes").cyan(), "Search the cookbook: /recipes <query>");
    println!();
    println!(
        "  {}",
        style("Reference a recipe inline with @[Recipe Name]. Submitting while a reply streams cancels it.").dim()
    );
    println!();
}
