/// Skin Resolution System
///
/// Resolves player names and UUIDs to signed texture properties, with an
/// in-flight deduplicating cache, persistent storage of the last known skin
/// and a round-robin pool of default skins.

pub mod apply;
pub mod cache;
pub mod fetcher;
pub mod pool;
pub mod resolver;
pub mod store;

pub use apply::{apply_skin, has_skin, with_texture, ProfileProperty, SkinTarget};
pub use cache::{FetchCache, WorkingGuard};
pub use fetcher::{TextureFetcher, TextureSource};
pub use pool::DefaultSkinPool;
pub use resolver::SkinResolver;
pub use store::SkinStore;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Name of the profile property carrying the skin
pub const TEXTURES_PROPERTY: &str = "textures";

/// Signed texture blob as issued by the identity service
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextureProperty {
    /// Base64 encoded texture JSON
    pub value: String,
    pub signature: String,
}

impl TextureProperty {
    pub fn new(value: impl Into<String>, signature: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            signature: signature.into(),
        }
    }

    pub fn name(&self) -> &'static str {
        TEXTURES_PROPERTY
    }
}

/// Outcome of a texture fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchResult {
    /// A usable skin. The id is absent for rows persisted without one.
    Skin {
        id: Option<Uuid>,
        texture: TextureProperty,
    },
    /// Every texture endpoint refused the request; carries no texture.
    RateLimited { id: Uuid },
}

impl FetchResult {
    pub fn skin(id: Uuid, texture: TextureProperty) -> Self {
        FetchResult::Skin {
            id: Some(id),
            texture,
        }
    }

    pub fn id(&self) -> Option<Uuid> {
        match self {
            FetchResult::Skin { id, .. } => *id,
            FetchResult::RateLimited { id } => Some(*id),
        }
    }

    pub fn texture(&self) -> Option<&TextureProperty> {
        match self {
            FetchResult::Skin { texture, .. } => Some(texture),
            FetchResult::RateLimited { .. } => None,
        }
    }

    pub fn has_texture(&self) -> bool {
        matches!(self, FetchResult::Skin { .. })
    }

    /// Only results with both an identity and a texture may be reused
    pub fn is_cacheable(&self) -> bool {
        matches!(self, FetchResult::Skin { id: Some(_), .. })
    }
}

/// What the coordinator produced for a single resolution request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found(FetchResult),
    /// Another task is already fetching this identity
    InProgress,
    NotFound,
    RateLimited(Uuid),
    TransientError,
}

impl Resolution {
    /// The usable result, if any
    pub fn found(self) -> Option<FetchResult> {
        match self {
            Resolution::Found(result) => Some(result),
            _ => None,
        }
    }

    pub fn is_in_progress(&self) -> bool {
        matches!(self, Resolution::InProgress)
    }
}

/// Last known skin of a player, as stored on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedUser {
    /// Lowercase player name
    pub name: String,
    pub id: Option<Uuid>,
    pub texture: TextureProperty,
    pub updated_at: DateTime<Utc>,
}

impl PersistedUser {
    pub fn to_fetch_result(&self) -> FetchResult {
        FetchResult::Skin {
            id: self.id,
            texture: self.texture.clone(),
        }
    }
}

/// Parse a UUID in hyphenated or simple form
pub fn parse_identity(input: &str) -> Option<Uuid> {
    Uuid::parse_str(input.trim()).ok()
}
