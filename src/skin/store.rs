/// Skin Store - last known skin per player name, backed by SQLite
use crate::{
    error::{SkinError, SkinResult},
    skin::{FetchResult, PersistedUser, TextureProperty},
};
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

/// Persistent skin store
#[derive(Clone)]
pub struct SkinStore {
    db: SqlitePool,
}

impl SkinStore {
    /// Create a new store over an initialised pool
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Get the stored skin of a player, case-insensitively
    pub async fn get_by_name(&self, name: &str) -> SkinResult<Option<PersistedUser>> {
        let normalized = name.to_lowercase();

        let result = sqlx::query(
            r#"
            SELECT Name, SkinUUID, SkinValue, SkinSignature, Timestamp
            FROM Users
            WHERE Name = ?1
            LIMIT 1
            "#,
        )
        .bind(&normalized)
        .fetch_optional(&self.db)
        .await
        .map_err(SkinError::Persistence)?;

        if let Some(row) = result {
            let user = PersistedUser {
                name: row.try_get("Name")?,
                id: parse_uuid(row.try_get::<Option<String>, _>("SkinUUID")?)?,
                texture: TextureProperty::new(
                    row.try_get::<String, _>("SkinValue")?,
                    row.try_get::<String, _>("SkinSignature")?,
                ),
                updated_at: parse_timestamp(row.try_get("Timestamp")?)?,
            };
            return Ok(Some(user));
        }

        Ok(None)
    }

    /// Get only the identity stored for a player
    pub async fn get_identity_by_name(&self, name: &str) -> SkinResult<Option<Uuid>> {
        let normalized = name.to_lowercase();

        let result = sqlx::query("SELECT SkinUUID FROM Users WHERE Name = ?1 LIMIT 1")
            .bind(&normalized)
            .fetch_optional(&self.db)
            .await
            .map_err(SkinError::Persistence)?;

        match result {
            Some(row) => parse_uuid(row.try_get("SkinUUID")?),
            None => Ok(None),
        }
    }

    /// Insert or update the skin stored for a player.
    ///
    /// A row is only replaced by a write with an equal or newer timestamp.
    /// Results without a texture are not stored; returns whether a row was written.
    pub async fn upsert(&self, name: &str, result: &FetchResult) -> SkinResult<bool> {
        self.upsert_at(name, result, Utc::now()).await
    }

    /// [`upsert`](Self::upsert) with an explicit write time
    pub async fn upsert_at(
        &self,
        name: &str,
        result: &FetchResult,
        at: DateTime<Utc>,
    ) -> SkinResult<bool> {
        let Some(texture) = result.texture() else {
            debug!("Not persisting texture-less result for {}", name);
            return Ok(false);
        };
        let normalized = name.to_lowercase();

        let written = sqlx::query(
            r#"
            INSERT INTO Users (Name, SkinUUID, SkinValue, SkinSignature, Timestamp)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(Name) DO UPDATE SET
                SkinUUID = excluded.SkinUUID,
                SkinValue = excluded.SkinValue,
                SkinSignature = excluded.SkinSignature,
                Timestamp = excluded.Timestamp
            WHERE excluded.Timestamp >= Users.Timestamp
            "#,
        )
        .bind(&normalized)
        .bind(result.id().map(|id| id.hyphenated().to_string()))
        .bind(&texture.value)
        .bind(&texture.signature)
        .bind(at.timestamp_millis())
        .execute(&self.db)
        .await
        .map_err(SkinError::Persistence)?
        .rows_affected();

        Ok(written > 0)
    }

    /// Release the underlying pool. Safe to call more than once.
    pub async fn close(&self) {
        if self.db.is_closed() {
            return;
        }
        self.db.close().await;
        info!("Skin store closed");
    }

    pub fn is_closed(&self) -> bool {
        self.db.is_closed()
    }
}

fn parse_uuid(raw: Option<String>) -> SkinResult<Option<Uuid>> {
    raw.map(|s| {
        Uuid::parse_str(&s).map_err(|e| SkinError::Internal(format!("Invalid stored UUID: {}", e)))
    })
    .transpose()
}

/// Parse epoch milliseconds
fn parse_timestamp(millis: i64) -> SkinResult<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| SkinError::Internal(format!("Invalid timestamp: {}", millis)))
}
