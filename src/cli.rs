use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "hindsight", about = "Browse and search your Claude Code chat history")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Bring the search index in line with the transcript files on disk
    Sync,
    /// Search indexed messages
    Search {
        /// Search query
        query: String,
        /// Restrict results to one project (encoded id)
        #[arg(long)]
        project: Option<String>,
        /// Max results
        #[arg(long, default_value = "50")]
        limit: usize,
    },
    /// Show index-level counters
    Stats,
    /// List projects with session and message counts
    Projects,
    /// List sessions for a project
    Sessions {
        /// Encoded project id
        project: String,
    },
    /// Generate or refresh AI summaries for a project
    Summarize {
        /// Encoded project id
        project: String,
        /// Summarize only this session
        #[arg(long)]
        session: Option<String>,
    },
    /// Rewrite a project's encoded id inside the index
    #[command(hide = true)]
    Rename {
        /// Current encoded id
        old: String,
        /// Replacement encoded id
        new: String,
    },
}
