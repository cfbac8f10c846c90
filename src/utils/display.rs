use crate::memory::{ConversationStats, Message, Role};
use colored::*;

pub fn print_header(text: &str) {
    println!("\n{}", text.bright_cyan().bold());
    println!("{}", "=".repeat(text.len()).bright_cyan());
}

pub fn print_success(text: &str) {
    println!("{}", text.green());
}

pub fn print_error(text: &str) {
    eprintln!("{}", text.red().bold());
}

pub fn print_info(text: &str) {
    println!("{}", text.blue());
}

pub fn print_prompt(text: &str) {
    print!("{}", text.yellow().bold());
}

pub fn print_message(message: &Message) {
    let role = match message.role() {
        Role::User => "user".yellow().bold(),
        Role::Assistant => "assistant".green().bold(),
        Role::System => "system".magenta().bold(),
    };
    println!(
        "{} {} {}",
        message.timestamp().format("%H:%M:%S").to_string().dimmed(),
        role,
        message.content()
    );
}

pub fn print_stats(stats: &ConversationStats) {
    println!("  {} {}", "Conversation:".bold(), stats.conversation_id);
    println!("  {} {}", "Messages added:".bold(), stats.message_count);
    println!("  {} {}", "Messages kept:".bold(), stats.retained_messages);
    println!("  {} {}", "Created:".bold(), stats.created_at.to_rfc3339());
    println!("  {} {}", "Last activity:".bold(), stats.last_activity.to_rfc3339());
    println!("  {} {}s", "Duration:".bold(), stats.duration.as_secs());
}
