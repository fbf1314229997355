//! Hall-of-fame persistence.
//!
//! Every cleared episode appends one record: the gauntlet it cleared, the
//! party that beat the last trainer, and the reward it earned. Records are
//! append-only and keyed by gauntlet.

use chrono::{DateTime, Utc};
use gauntlet_types::{EpisodeId, HallOfFameMember, RunId};
use rust_decimal::Decimal;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::StoreError;

/// A cleared run, ready to be recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewHallOfFameEntry {
    /// Episode that cleared the gauntlet.
    pub episode_id: EpisodeId,
    /// Gauntlet cleared.
    pub gauntlet_id: String,
    /// Seed the episode ran from.
    pub seed: u64,
    /// The clearing party, in slot order.
    pub party: Vec<HallOfFameMember>,
    /// Total episode reward.
    pub total_reward: Decimal,
}

/// A recorded hall-of-fame entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HallOfFameEntry {
    /// Record identifier.
    pub id: RunId,
    /// Episode that cleared the gauntlet.
    pub episode_id: EpisodeId,
    /// Gauntlet cleared.
    pub gauntlet_id: String,
    /// Seed the episode ran from.
    pub seed: u64,
    /// The clearing party, in slot order.
    pub party: Vec<HallOfFameMember>,
    /// Total episode reward.
    pub total_reward: Decimal,
    /// When the record was written.
    pub recorded_at: DateTime<Utc>,
}

/// Operations on the `hall_of_fame` table.
pub struct HallOfFameStore<'a> {
    pool: &'a SqlitePool,
}

impl<'a> HallOfFameStore<'a> {
    /// Create a new store bound to a connection pool.
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Append one cleared run.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Serialization`] if the party cannot be encoded
    /// and [`StoreError::Sqlite`] if the insert fails.
    pub async fn record(&self, entry: &NewHallOfFameEntry) -> Result<HallOfFameEntry, StoreError> {
        let id = RunId::new();
        let recorded_at = Utc::now();
        let party = serde_json::to_string(&entry.party)?;
        // SQLite integers are signed; seeds are stored bit-for-bit.
        let seed = i64::from_ne_bytes(entry.seed.to_ne_bytes());

        sqlx::query(
            r"INSERT INTO hall_of_fame (id, episode_id, gauntlet_id, seed, party, total_reward, recorded_at)
              VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(id.into_inner())
        .bind(entry.episode_id.into_inner())
        .bind(&entry.gauntlet_id)
        .bind(seed)
        .bind(party)
        .bind(entry.total_reward.to_string())
        .bind(recorded_at)
        .execute(self.pool)
        .await?;

        tracing::info!(
            record = %id,
            episode = %entry.episode_id,
            gauntlet = %entry.gauntlet_id,
            party = entry.party.len(),
            "hall-of-fame entry recorded"
        );

        Ok(HallOfFameEntry {
            id,
            episode_id: entry.episode_id,
            gauntlet_id: entry.gauntlet_id.clone(),
            seed: entry.seed,
            party: entry.party.clone(),
            total_reward: entry.total_reward,
            recorded_at,
        })
    }

    /// Records for one gauntlet, newest first (insertion order).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails or a stored row is corrupt.
    pub async fn list_by_gauntlet(
        &self,
        gauntlet_id: &str,
        limit: u32,
    ) -> Result<Vec<HallOfFameEntry>, StoreError> {
        let rows = sqlx::query_as::<_, HallOfFameRow>(
            r"SELECT id, episode_id, gauntlet_id, seed, party, total_reward, recorded_at
              FROM hall_of_fame
              WHERE gauntlet_id = ?
              ORDER BY rowid DESC
              LIMIT ?",
        )
        .bind(gauntlet_id)
        .bind(i64::from(limit))
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(HallOfFameEntry::try_from).collect()
    }

    /// Number of records for one gauntlet.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Sqlite`] if the query fails.
    pub async fn count_by_gauntlet(&self, gauntlet_id: &str) -> Result<u64, StoreError> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM hall_of_fame WHERE gauntlet_id = ?")
                .bind(gauntlet_id)
                .fetch_one(self.pool)
                .await?;
        Ok(u64::try_from(count).unwrap_or(0))
    }
}

/// A row from the `hall_of_fame` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct HallOfFameRow {
    /// Record identifier.
    pub id: Uuid,
    /// Episode identifier.
    pub episode_id: Uuid,
    /// Gauntlet cleared.
    pub gauntlet_id: String,
    /// Episode seed, reinterpreted as signed.
    pub seed: i64,
    /// Party as a JSON array.
    pub party: String,
    /// Total reward as decimal text.
    pub total_reward: String,
    /// When the record was written.
    pub recorded_at: DateTime<Utc>,
}

impl TryFrom<HallOfFameRow> for HallOfFameEntry {
    type Error = StoreError;

    fn try_from(row: HallOfFameRow) -> Result<Self, Self::Error> {
        let total_reward = row
            .total_reward
            .parse::<Decimal>()
            .map_err(|source| StoreError::CorruptReward {
                value: row.total_reward.clone(),
                source,
            })?;
        Ok(Self {
            id: RunId::from(row.id),
            episode_id: EpisodeId::from(row.episode_id),
            gauntlet_id: row.gauntlet_id,
            seed: u64::from_ne_bytes(row.seed.to_ne_bytes()),
            party: serde_json::from_str(&row.party)?,
            total_reward,
            recorded_at: row.recorded_at,
        })
    }
}
