use clap::{Parser, Subcommand, ValueEnum};

/// CLI for running and inspecting the site content service
#[derive(Parser)]
#[command(name = "aperture")]
#[command(about = "Content and media feed service for a personal site", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP server (feed API + revalidation)
    Serve {
        /// Bind address, e.g. 0.0.0.0:4000 (overrides config)
        #[arg(long)]
        bind: Option<String>,
    },
    /// Inspect the photo/video feed
    Feed {
        #[command(subcommand)]
        cmd: FeedCmd,
    },
    /// List or fetch site content
    Content {
        #[command(subcommand)]
        cmd: ContentCmd,
    },
    /// Manage the local content cache
    Cache {
        #[command(subcommand)]
        cmd: CacheCmd,
    },
}

#[derive(Subcommand)]
pub enum FeedCmd {
    /// Print one page of the feed with captions
    Ls {
        /// Sort order by photo date
        #[arg(long, default_value = "desc")]
        order: String,
        #[arg(long, default_value_t = 24)]
        limit: i64,
        #[arg(long, default_value_t = 0)]
        offset: i64,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ContentKind {
    Articles,
    Poems,
    Journals,
    Projects,
    Uses,
}

#[derive(Subcommand)]
pub enum ContentCmd {
    /// List entries of one content kind
    Ls { kind: ContentKind },
    /// Fetch a single entry by slug (prints the body when present)
    Get { kind: ContentKind, slug: String },
}

#[derive(Subcommand)]
pub enum CacheCmd {
    /// Delete cached payloads, optionally scoped to a key prefix
    Clear {
        /// Key prefix, e.g. "content|articles". Omit to clear everything.
        #[arg(long)]
        prefix: Option<String>,
        /// Only drop entries that have already expired
        #[arg(long, default_value_t = false)]
        expired: bool,
    },
    /// Fetch every content list once to prime the cache
    Warm,
}
