use anyhow::{Context, Result};
use clap::Parser;
use convo_memory::cli::{Cli, Commands};
use convo_memory::{
    store_from_settings, utils, CachedStorage, ConversationStorage, FileSystemStorage,
    Settings, SharedConversationStore,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{self, AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::new().context("Failed to load settings")?;
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let storage_dir = cli
        .storage_dir
        .map(PathBuf::from)
        .unwrap_or_else(|| settings.storage.dir.clone());

    match cli.command {
        Commands::Interactive {
            conversation_id,
            persist,
        } => handle_interactive(&settings, storage_dir, conversation_id, persist).await,
        Commands::List { search } => handle_list(storage_dir, search).await,
        Commands::Show {
            conversation_id,
            last,
        } => handle_show(&settings, storage_dir, conversation_id, last).await,
        Commands::Cleanup {
            max_age_days,
            dry_run,
        } => {
            let max_age = max_age_days
                .map(|days| Duration::from_secs(days.saturating_mul(86_400)))
                .unwrap_or_else(|| settings.storage.max_age());
            handle_cleanup(storage_dir, max_age, dry_run).await
        }
    }
}

async fn open_storage(settings: &Settings, dir: PathBuf) -> Result<CachedStorage> {
    let backend = FileSystemStorage::new(dir).await?;
    Ok(CachedStorage::new(
        Arc::new(backend),
        settings.storage.cache_capacity,
    ))
}

async fn handle_interactive(
    settings: &Settings,
    storage_dir: PathBuf,
    conversation_id: Option<String>,
    persist: bool,
) -> Result<()> {
    let store = SharedConversationStore::new(store_from_settings(settings));
    let sweeper = store.spawn_sweeper(settings.memory.limits().cleanup_interval);
    let storage = open_storage(settings, storage_dir.clone()).await?;

    let conversation_id = match conversation_id {
        Some(id) => {
            if store.load_from(&id, &storage).await? {
                let count = store.get_messages(&id).await.len();
                utils::print_success(&format!("Resumed conversation with {} messages", count));
            }
            id
        }
        None => store.create_conversation().await?,
    };

    utils::print_header("Interactive Memory Session");
    utils::print_info(&format!("Conversation ID: {}", conversation_id));
    if persist {
        utils::print_info(&format!("Storage: {:?}", storage_dir));
    }
    utils::print_info("Type messages to record them as the user, /help for commands\n");

    let stdin = io::stdin();
    let mut reader = BufReader::new(stdin);

    loop {
        utils::print_prompt("You: ");
        let mut input = String::new();
        if reader.read_line(&mut input).await? == 0 {
            break;
        }

        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        let (command, rest) = match input.split_once(' ') {
            Some((command, rest)) => (command, rest.trim()),
            None => (input, ""),
        };

        match command {
            "/quit" | "/exit" => break,
            "/help" => print_help(),
            "/assistant" | "/system" => {
                let role = &command[1..];
                record(&store, &conversation_id, role, rest).await;
            }
            "/history" => {
                let messages = match rest.parse::<usize>() {
                    Ok(n) => store.get_recent_messages(&conversation_id, n).await,
                    Err(_) => store.get_messages(&conversation_id).await,
                };
                if messages.is_empty() {
                    utils::print_info("No messages yet");
                }
                for message in &messages {
                    utils::print_message(message);
                }
            }
            "/stats" => match store.get_conversation_stats(&conversation_id).await {
                Ok(stats) => utils::print_stats(&stats),
                Err(e) => utils::print_error(&e.to_string()),
            },
            "/search" => {
                let hits = store.search_messages(&conversation_id, rest).await;
                utils::print_info(&format!("{} matching messages", hits.len()));
                for message in &hits {
                    utils::print_message(message);
                }
            }
            "/clear" => {
                store.clear_conversation(&conversation_id).await?;
                utils::print_success("Conversation cleared");
            }
            "/save" => save(&store, &conversation_id, &storage).await,
            _ if command.starts_with('/') => {
                utils::print_error(&format!("Unknown command: {}", command));
            }
            _ => record(&store, &conversation_id, "user", input).await,
        }
        println!();
    }

    if persist {
        save(&store, &conversation_id, &storage).await;
    }
    sweeper.shutdown().await?;
    Ok(())
}

fn print_help() {
    println!("Special commands:");
    println!("  /assistant <text>  - Record an assistant reply");
    println!("  /system <text>     - Record a system message");
    println!("  /history [n]       - Show all or the last n messages");
    println!("  /stats             - Show conversation statistics");
    println!("  /search <text>     - Search this conversation");
    println!("  /clear             - Clear conversation history");
    println!("  /save              - Save to the storage directory");
    println!("  /quit              - Exit");
}

async fn record(store: &SharedConversationStore, conversation_id: &str, role: &str, content: &str) {
    match store.add_message(conversation_id, role, content).await {
        Ok(id) => utils::print_success(&format!("Recorded {} message {}", role, id)),
        Err(e) if e.is_validation() => utils::print_error(&format!("Rejected: {}", e)),
        Err(e) => utils::print_error(&format!("Failed to record message: {}", e)),
    }
}

async fn save(store: &SharedConversationStore, conversation_id: &str, storage: &CachedStorage) {
    match store.persist(conversation_id, storage).await {
        Ok(true) => utils::print_success("Conversation saved"),
        Ok(false) => utils::print_info("Nothing to save"),
        Err(e) => utils::print_error(&format!("{:#}", e)),
    }
}

async fn handle_list(storage_dir: PathBuf, search: Option<String>) -> Result<()> {
    let storage = FileSystemStorage::new(storage_dir).await?;

    let ids = match search {
        Some(query) => storage.search(&query).await?,
        None => storage.list_conversations().await?,
    };

    utils::print_header("Saved Conversations");
    if ids.is_empty() {
        utils::print_info("No conversations found");
    }
    for id in ids {
        println!("  {}", id);
    }
    Ok(())
}

async fn handle_show(
    settings: &Settings,
    storage_dir: PathBuf,
    conversation_id: String,
    last: Option<usize>,
) -> Result<()> {
    let storage = open_storage(settings, storage_dir).await?;
    let store = SharedConversationStore::new(store_from_settings(settings));

    if !store.load_from(&conversation_id, &storage).await? {
        utils::print_error(&format!("Conversation '{}' not found", conversation_id));
        return Ok(());
    }

    utils::print_header(&format!("Conversation {}", conversation_id));
    let stats = store.get_conversation_stats(&conversation_id).await?;
    utils::print_stats(&stats);
    println!();

    let messages = match last {
        Some(n) => store.get_recent_messages(&conversation_id, n).await,
        None => store.get_messages(&conversation_id).await,
    };
    for message in &messages {
        utils::print_message(message);
    }
    Ok(())
}

async fn handle_cleanup(storage_dir: PathBuf, max_age: Duration, dry_run: bool) -> Result<()> {
    let storage = FileSystemStorage::new(storage_dir).await?;

    utils::print_info(&format!(
        "Starting cleanup{}",
        if dry_run { " (dry run)" } else { "" }
    ));
    let report = storage.cleanup(max_age, dry_run).await?;

    utils::print_success(&format!(
        "Cleanup complete: {} total files, {} deleted, {} corrupted",
        report.total, report.deleted, report.corrupted
    ));
    Ok(())
}
