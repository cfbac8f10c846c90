use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "convo-memory")]
#[command(author, version, about = "Bounded conversation memory for chat applications", long_about = None)]
pub struct Cli {
    /// Storage directory for saved conversations (overrides config)
    #[arg(long, global = true)]
    pub storage_dir: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Record a conversation interactively
    Interactive {
        /// Conversation ID to resume or create (default: a fresh UUID)
        #[arg(short = 'c', long)]
        conversation_id: Option<String>,

        /// Save the conversation to the storage directory on exit
        #[arg(short = 'p', long)]
        persist: bool,
    },

    /// List saved conversations
    List {
        /// Only show conversations containing this text
        #[arg(short, long)]
        search: Option<String>,
    },

    /// Show a saved conversation
    Show {
        conversation_id: String,

        /// Only show the last N messages
        #[arg(short = 'n', long)]
        last: Option<usize>,
    },

    /// Remove old and corrupted conversation files
    Cleanup {
        /// Maximum age of conversations in days (overrides config)
        #[arg(long)]
        max_age_days: Option<u64>,

        /// Don't delete anything, just report what would be removed
        #[arg(long)]
        dry_run: bool,
    },
}
