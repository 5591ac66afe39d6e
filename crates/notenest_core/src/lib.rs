//! Core domain logic for NoteNest.
//! This crate is the single source of truth for the document tree and its
//! save/load protocol.

pub mod config;
pub mod controller;
pub mod db;
pub mod logging;
pub mod model;
pub mod presentation;
pub mod protocol;
pub mod relay;
pub mod store;

pub use config::{ConfigError, NestConfig, WidthBounds};
pub use controller::{
    EditState, HeadlessView, PanelController, PanelEvent, PanelInputError, PanelView, SaveStatus,
};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::clock::{Clock, ManualClock, SystemClock};
pub use model::text::{visible_text, word_count, word_count_label};
pub use model::tree::{DocumentTree, Folder, FolderId, Note, NoteId, TreeError};
pub use presentation::{PanelFrame, PresentationLayer};
pub use protocol::{PanelReply, PanelSignal, RelayNotice, RelayRequest, RelayResponse};
pub use relay::{Relay, RelayError, RelayHandle};
pub use store::{
    KeyValueStore, MemoryKvStore, NestStore, SqliteKvStore, StoreError, StoreResult,
};

/// Minimal health-check API for integration smoke tests.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
