// Draftsync - Newsletter Draft Synchronization Engine

pub mod document;
pub mod network;
pub mod session;
pub mod store;
pub mod sync;

pub use document::fingerprint::Fingerprint;
pub use document::history::HistoryStack;
pub use document::{BlockEdit, BlockKind, BrandKit, ContentBlock, Document, Position, ViewMode};
pub use network::retry::RetryPolicy;
pub use network::Connectivity;
pub use session::{format_save_time, EditorSession, SessionConfig};
pub use store::cache::{CacheStore, FileCacheStore, MemoryCacheStore, OfflineCache};
pub use store::{
    ApiError, Listing, ListingSource, ProjectApi, ProjectPayload, ProjectRecord, ProjectStatus,
    ProjectStore,
};
pub use sync::{SaveOutcome, SaveState, SaveTrigger, SyncError};
