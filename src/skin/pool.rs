/// Round-robin pool of default skins
use crate::skin::{FetchResult, Resolution, SkinResolver};
use futures::future::join_all;
use std::sync::Mutex;
use tracing::{info, warn};

/// Cycles forever over a fixed list of skins, in insertion order
pub struct DefaultSkinPool {
    skins: Vec<FetchResult>,
    cursor: Mutex<usize>,
}

impl DefaultSkinPool {
    pub fn new(skins: Vec<FetchResult>) -> Self {
        Self {
            skins,
            cursor: Mutex::new(0),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Resolve `names` concurrently, keeping configuration order and
    /// discarding every name that did not produce a skin
    pub async fn populate(resolver: &SkinResolver, names: &[String]) -> Self {
        info!("Loading {} default skins", names.len());

        let resolutions = join_all(names.iter().map(|name| resolver.resolve(name))).await;

        let skins: Vec<FetchResult> = names
            .iter()
            .zip(resolutions)
            .filter_map(|(name, resolution)| match resolution {
                Resolution::Found(skin) => Some(skin),
                other => {
                    warn!("Default skin {} could not be loaded: {:?}", name, other);
                    None
                }
            })
            .collect();

        info!("Default skins loaded: {}/{}", skins.len(), names.len());
        Self::new(skins)
    }

    /// Next skin in the cycle, or `None` if the pool is empty
    pub fn next(&self) -> Option<FetchResult> {
        if self.skins.is_empty() {
            return None;
        }

        let mut cursor = self.cursor.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if *cursor >= self.skins.len() {
            *cursor = 0;
        }
        let skin = self.skins[*cursor].clone();
        *cursor += 1;
        Some(skin)
    }

    /// Lazy, never ending iterator over [`next`](Self::next)
    pub fn iter(&self) -> impl Iterator<Item = FetchResult> + '_ {
        std::iter::from_fn(move || self.next())
    }

    pub fn len(&self) -> usize {
        self.skins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skins.is_empty()
    }
}
