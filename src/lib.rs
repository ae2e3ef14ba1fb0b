pub mod backend;
pub mod cli;
pub mod config;
pub mod content;
pub mod db;
pub mod decode;
pub mod feed;
pub mod gallery;
pub mod media;
pub mod routes;
pub mod server;
pub mod storage;
pub mod types;

// --- Library API for embedding ---

/// Convenience re-exports for embedders.
pub mod prelude {
    pub use crate::backend::{ContentBackend, Endpoint, HttpBackend};
    pub use crate::content::ContentService;
    pub use crate::feed::{FeedMedia, FeedPage, MediaKind, SortOrder};
    pub use crate::gallery::{FeedView, FetchPlan, Lightbox};
    pub use crate::media::{PlaybackPath, Slide, SlideSource};
    pub use crate::storage::Storage;
    pub use crate::types::{Article, PhotoJournal, Poem, Project, UsesCategory};
}
