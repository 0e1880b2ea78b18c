/// Skin Service - login policy and player skin commands
use crate::{
    jobs::WorkerPool,
    skin::{
        apply_skin, has_skin, DefaultSkinPool, FetchResult, Resolution, SkinResolver, SkinStore,
        SkinTarget,
    },
};
use dashmap::DashSet;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Command argument that restores the player's own skin
pub const RESET_ARGUMENT: &str = "reset";

/// Where an applied skin came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkinOrigin {
    Stored,
    Fetched,
    Default,
}

/// Result of the login-time skin policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOutcome {
    Applied(SkinOrigin),
    Unchanged,
}

/// Result of a player skin command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    Changed,
    NotFound,
    /// The requested identity is being fetched by someone else
    InProgress,
    /// The player already has a command running
    Busy,
    /// `update` was used but no identity is stored for the player
    NoStoredIdentity,
}

/// Ties resolution, persistence and the default pool to player events
pub struct SkinService {
    resolver: SkinResolver,
    default_pool: Arc<DefaultSkinPool>,
    workers: Arc<WorkerPool>,
    busy_players: DashSet<String>,
}

impl SkinService {
    pub fn new(
        resolver: SkinResolver,
        default_pool: Arc<DefaultSkinPool>,
        workers: Arc<WorkerPool>,
    ) -> Self {
        Self {
            resolver,
            default_pool,
            workers,
            busy_players: DashSet::new(),
        }
    }

    pub fn resolver(&self) -> &SkinResolver {
        &self.resolver
    }

    pub fn default_pool(&self) -> &DefaultSkinPool {
        &self.default_pool
    }

    /// Pick and apply a skin for a player that just logged in
    ///
    /// A stored skin wins when the player already has a skin or the proxy is
    /// in online mode. In offline mode the fallbacks are: stored skin, fresh
    /// resolution of the username, next default skin. Skins that did not come
    /// from the store are persisted in the background.
    pub async fn handle_login(&self, player: &dyn SkinTarget, online_mode: bool) -> LoginOutcome {
        let username = player.username();
        let stored = self.resolver.resolve_from_cache_only(username).await;

        if let Some(stored) = &stored {
            if online_mode || has_skin(&player.properties()) {
                return Self::apply(player, stored, SkinOrigin::Stored);
            }
        }

        if online_mode {
            return LoginOutcome::Unchanged;
        }

        if let Some(stored) = &stored {
            return Self::apply(player, stored, SkinOrigin::Stored);
        }

        let (skin, origin) = match self.resolver.resolve_silently(username).await {
            Resolution::Found(skin) => (skin, SkinOrigin::Fetched),
            other => {
                debug!("No skin resolved for {} ({:?}), using default pool", username, other);
                match self.default_pool.next() {
                    Some(skin) => (skin, SkinOrigin::Default),
                    None => return LoginOutcome::Unchanged,
                }
            }
        };

        let outcome = Self::apply(player, &skin, origin);
        if outcome != LoginOutcome::Unchanged {
            self.persist_in_background(username, skin);
        }
        outcome
    }

    /// `/skin <name|uuid|reset>`: resolve, persist and apply another skin
    pub async fn change_skin(&self, player: &dyn SkinTarget, target: &str) -> CommandOutcome {
        let Some(_busy) = self.claim_player(player.username()) else {
            return CommandOutcome::Busy;
        };

        let target = if target.eq_ignore_ascii_case(RESET_ARGUMENT) {
            player.username()
        } else {
            target
        };

        self.resolve_and_apply(player, target).await
    }

    /// `/skin update`: refetch the skin of the identity stored for the player
    pub async fn update_skin(&self, player: &dyn SkinTarget) -> CommandOutcome {
        let Some(_busy) = self.claim_player(player.username()) else {
            return CommandOutcome::Busy;
        };

        let stored = match self.resolver.store().get_identity_by_name(player.username()).await {
            Ok(stored) => stored,
            Err(e) => {
                error!("Failed to read stored identity for {}: {}", player.username(), e);
                None
            }
        };

        match stored {
            Some(id) => self.resolve_and_apply(player, &id.to_string()).await,
            None => CommandOutcome::NoStoredIdentity,
        }
    }

    async fn resolve_and_apply(&self, player: &dyn SkinTarget, target: &str) -> CommandOutcome {
        match self.resolver.resolve(target).await {
            Resolution::Found(skin) => {
                persist(self.resolver.store(), player.username(), &skin).await;
                match Self::apply(player, &skin, SkinOrigin::Fetched) {
                    LoginOutcome::Applied(_) => CommandOutcome::Changed,
                    LoginOutcome::Unchanged => CommandOutcome::NotFound,
                }
            }
            Resolution::InProgress => CommandOutcome::InProgress,
            _ => CommandOutcome::NotFound,
        }
    }

    fn apply(player: &dyn SkinTarget, skin: &FetchResult, origin: SkinOrigin) -> LoginOutcome {
        match skin.texture() {
            Some(texture) => {
                apply_skin(player, texture);
                debug!("Applied {:?} skin to {}", origin, player.username());
                LoginOutcome::Applied(origin)
            }
            None => LoginOutcome::Unchanged,
        }
    }

    fn persist_in_background(&self, name: &str, skin: FetchResult) {
        let store = self.resolver.store().clone();
        let name = name.to_string();

        let queued = self.workers.spawn(async move {
            persist(&store, &name, &skin).await;
        });
        if let Err(e) = queued {
            warn!("Skin not persisted: {}", e);
        }
    }

    fn claim_player(&self, name: &str) -> Option<PlayerGuard<'_>> {
        let key = name.to_lowercase();
        if self.busy_players.insert(key.clone()) {
            Some(PlayerGuard {
                players: &self.busy_players,
                key,
            })
        } else {
            None
        }
    }
}

/// Persistence failures must never block applying a skin
async fn persist(store: &SkinStore, name: &str, skin: &FetchResult) {
    match store.upsert(name, skin).await {
        Ok(true) => info!("Saved skin for {}", name),
        Ok(false) => debug!("Skin for {} not saved", name),
        Err(e) => error!("Can not save skin for {}: {}", name, e),
    }
}

struct PlayerGuard<'a> {
    players: &'a DashSet<String>,
    key: String,
}

impl Drop for PlayerGuard<'_> {
    fn drop(&mut self) {
        self.players.remove(&self.key);
    }
}
