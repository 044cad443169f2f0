//! Welcome banner for the chat loop.

use console::style;

/// Print the welcome banner shown when the chat loop starts.
pub fn print_welcome_banner(model: &str, recipe_count: Option<u64>) {
    println!();
    println!("  {}", style("Culina").magenta().bold());
    println!(
        "  {}",
        style("Your cookbook, with a conversation.").dim()
    );
    println!();
    println!("  model: {}", style(model).cyan());
    if let Some(count) = recipe_count {
        println!("  recipes: {}", style(count).cyan());
    }
    println!();
    println!(
        "  {}",
        style("Type /help for commands, Ctrl+D to exit.").dim()
    );
    println!();
}
