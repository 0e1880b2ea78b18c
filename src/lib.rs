/// Simple Skins - skin restoration for proxied game servers
///
/// Resolves player names to signed textures from the identity service,
/// deduplicates concurrent lookups, remembers the last known skin per player
/// and hands out default skins when nothing else can be found.

pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod jobs;
pub mod service;
pub mod skin;

pub use context::AppContext;
pub use error::{SkinError, SkinResult};
