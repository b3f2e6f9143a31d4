//! # canopy-sqlite
//!
//! Durable SQLite implementation of the Canopy store contracts.
//!
//! The schema is created on connect and runs in WAL journal mode. The
//! `achievements` table carries a `UNIQUE(planter_id, name)` constraint:
//! that constraint, not in-process locking, is what makes concurrent
//! duplicate milestone evaluation safe when the service runs as multiple
//! instances. A violation is mapped to the normal
//! [`AwardOutcome::AlreadyAwarded`] result.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};

use canopy_core::error::{Error, Result};
use canopy_core::id::{PlanterId, TreeId};
use canopy_core::model::{Achievement, NewAchievement, NewTree, Tree};
use canopy_core::store::{AchievementStore, AwardOutcome, TreeStore};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS trees (
    id               TEXT PRIMARY KEY,
    date             TEXT NOT NULL,
    created_at       TEXT NOT NULL,
    location         TEXT NOT NULL,
    gps_coordinates  TEXT,
    lat              REAL,
    lng              REAL,
    type_of_activity TEXT NOT NULL,
    species          TEXT NOT NULL,
    remarks          TEXT,
    state            TEXT NOT NULL,
    planted_by       TEXT NOT NULL,
    planted_by_id    TEXT,
    graduation_year  INTEGER,
    photo            TEXT
);

CREATE INDEX IF NOT EXISTS idx_trees_planted_by_id ON trees (planted_by_id);
CREATE INDEX IF NOT EXISTS idx_trees_date ON trees (date DESC);

CREATE TABLE IF NOT EXISTS achievements (
    planter_id  TEXT NOT NULL,
    name        TEXT NOT NULL,
    description TEXT NOT NULL,
    icon        TEXT NOT NULL,
    created_at  TEXT NOT NULL,
    UNIQUE (planter_id, name)
);
";

/// SQLite-backed implementation of [`TreeStore`] and [`AchievementStore`].
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Opens (creating if missing) the database at `path` and ensures the
    /// schema exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or the schema
    /// cannot be created.
    pub async fn open(path: &str) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| Error::storage_with_source(format!("failed to open database {path}"), e))?;

        let store = Self { pool };
        store.ensure_schema().await?;
        tracing::info!(path, "sqlite store ready");
        Ok(store)
    }

    /// Opens a private in-memory database (for tests).
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be created.
    pub async fn in_memory() -> Result<Self> {
        // A single connection keeps every query on the same in-memory database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| Error::storage_with_source("failed to open in-memory database", e))?;

        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    /// Returns the underlying pool (for readiness probes).
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn ensure_schema(&self) -> Result<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(|e| Error::storage_with_source("failed to create schema", e))?;
        Ok(())
    }
}

fn storage_err(op: &str) -> impl FnOnce(sqlx::Error) -> Error + '_ {
    move |e| Error::storage_with_source(format!("{op} failed"), e)
}

fn tree_from_row(row: &SqliteRow) -> Result<Tree> {
    let id: String = row.get("id");
    let id = TreeId::from_str(&id)?;

    let date: NaiveDate = row.get("date");
    let created_at: DateTime<Utc> = row.get("created_at");
    let planted_by_id: Option<String> = row.get("planted_by_id");

    Ok(Tree {
        id,
        date,
        created_at,
        location: row.get("location"),
        gps_coordinates: row.get("gps_coordinates"),
        lat: row.get("lat"),
        lng: row.get("lng"),
        type_of_activity: row.get("type_of_activity"),
        species: row.get("species"),
        remarks: row.get("remarks"),
        state: row.get("state"),
        planted_by: row.get("planted_by"),
        planted_by_id: planted_by_id.map(PlanterId::new_unchecked),
        graduation_year: row.get("graduation_year"),
        photo: row.get("photo"),
    })
}

#[async_trait]
impl TreeStore for SqliteStore {
    async fn insert(&self, tree: NewTree) -> Result<Tree> {
        let record = Tree {
            id: TreeId::generate(),
            date: tree.date,
            created_at: Utc::now(),
            location: tree.location,
            gps_coordinates: tree.gps_coordinates,
            lat: tree.lat,
            lng: tree.lng,
            type_of_activity: tree.type_of_activity,
            species: tree.species,
            remarks: tree.remarks,
            state: tree.state,
            planted_by: tree.planted_by,
            planted_by_id: tree.planted_by_id,
            graduation_year: tree.graduation_year,
            photo: tree.photo,
        };

        sqlx::query(
            "INSERT INTO trees (id, date, created_at, location, gps_coordinates, lat, lng, \
             type_of_activity, species, remarks, state, planted_by, planted_by_id, \
             graduation_year, photo) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(record.id.to_string())
        .bind(record.date)
        .bind(record.created_at)
        .bind(&record.location)
        .bind(&record.gps_coordinates)
        .bind(record.lat)
        .bind(record.lng)
        .bind(&record.type_of_activity)
        .bind(&record.species)
        .bind(&record.remarks)
        .bind(&record.state)
        .bind(&record.planted_by)
        .bind(record.planted_by_id.as_ref().map(PlanterId::as_str))
        .bind(record.graduation_year)
        .bind(&record.photo)
        .execute(&self.pool)
        .await
        .map_err(storage_err("insert tree"))?;

        Ok(record)
    }

    async fn get(&self, id: &TreeId) -> Result<Option<Tree>> {
        let row = sqlx::query("SELECT * FROM trees WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err("fetch tree"))?;

        row.as_ref().map(tree_from_row).transpose()
    }

    async fn delete(&self, id: &TreeId) -> Result<()> {
        sqlx::query("DELETE FROM trees WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(storage_err("delete tree"))?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Tree>> {
        let rows = sqlx::query("SELECT * FROM trees ORDER BY date DESC, created_at DESC")
            .fetch_all(&self.pool)
            .await
            .map_err(storage_err("list trees"))?;

        rows.iter().map(tree_from_row).collect()
    }

    async fn count_by_planter(&self, planter_id: &PlanterId) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM trees WHERE planted_by_id = ?")
            .bind(planter_id.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(storage_err("count trees"))?;

        Ok(count.unsigned_abs())
    }
}

#[async_trait]
impl AchievementStore for SqliteStore {
    async fn award(&self, achievement: NewAchievement) -> Result<AwardOutcome> {
        let result = sqlx::query(
            "INSERT INTO achievements (planter_id, name, description, icon, created_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(achievement.planter_id.as_str())
        .bind(&achievement.name)
        .bind(&achievement.description)
        .bind(&achievement.icon)
        .bind(Utc::now())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(AwardOutcome::Awarded(Achievement {
                planter_id: achievement.planter_id,
                name: achievement.name,
                description: achievement.description,
                icon: achievement.icon,
            })),
            // The unique constraint firing is the normal already-awarded
            // outcome, not a failure.
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Ok(AwardOutcome::AlreadyAwarded)
            }
            Err(e) => Err(Error::storage_with_source("award achievement failed", e)),
        }
    }

    async fn list_for_planter(&self, planter_id: &PlanterId) -> Result<Vec<Achievement>> {
        let rows = sqlx::query(
            "SELECT planter_id, name, description, icon FROM achievements \
             WHERE planter_id = ? ORDER BY created_at",
        )
        .bind(planter_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err("list achievements"))?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let planter_id: String = row.get("planter_id");
                Achievement {
                    planter_id: PlanterId::new_unchecked(planter_id),
                    name: row.get("name"),
                    description: row.get("description"),
                    icon: row.get("icon"),
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn full_tree() -> NewTree {
        NewTree {
            date: date(2024, 3, 10),
            location: "Riverside Park".to_string(),
            gps_coordinates: Some("40.8, -73.9".to_string()),
            lat: Some(40.8),
            lng: Some(-73.9),
            type_of_activity: "Planting".to_string(),
            species: "Red Oak".to_string(),
            remarks: Some("windy day".to_string()),
            state: "Healthy".to_string(),
            planted_by: "Jane".to_string(),
            planted_by_id: Some(PlanterId::new_unchecked("jane-1")),
            graduation_year: Some(2019),
            photo: Some("https://example.test/p.jpg".to_string()),
        }
    }

    #[tokio::test]
    async fn fully_populated_tree_round_trips() {
        let store = SqliteStore::in_memory().await.unwrap();
        let inserted = store.insert(full_tree()).await.unwrap();
        let fetched = store.get(&inserted.id).await.unwrap().unwrap();
        assert_eq!(fetched, inserted);
    }

    #[tokio::test]
    async fn get_missing_tree_is_none() {
        let store = SqliteStore::in_memory().await.unwrap();
        assert!(store.get(&TreeId::generate()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_orders_newest_planting_date_first() {
        let store = SqliteStore::in_memory().await.unwrap();
        for d in [date(2023, 1, 1), date(2024, 6, 1), date(2022, 12, 31)] {
            let tree = NewTree {
                date: d,
                ..full_tree()
            };
            store.insert(tree).await.unwrap();
        }

        let dates: Vec<NaiveDate> = store.list().await.unwrap().iter().map(|t| t.date).collect();
        assert_eq!(
            dates,
            vec![date(2024, 6, 1), date(2023, 1, 1), date(2022, 12, 31)]
        );
    }

    #[tokio::test]
    async fn count_excludes_other_planters_and_anonymous() {
        let store = SqliteStore::in_memory().await.unwrap();
        store.insert(full_tree()).await.unwrap();
        store.insert(full_tree()).await.unwrap();
        store
            .insert(NewTree {
                planted_by_id: Some(PlanterId::new_unchecked("other")),
                ..full_tree()
            })
            .await
            .unwrap();
        store
            .insert(NewTree {
                planted_by_id: None,
                ..full_tree()
            })
            .await
            .unwrap();

        let jane = PlanterId::new_unchecked("jane-1");
        assert_eq!(store.count_by_planter(&jane).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn delete_removes_the_record_and_is_idempotent() {
        let store = SqliteStore::in_memory().await.unwrap();
        let tree = store.insert(full_tree()).await.unwrap();
        store.delete(&tree.id).await.unwrap();
        store.delete(&tree.id).await.unwrap();
        assert!(store.get(&tree.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unique_constraint_turns_duplicates_into_already_awarded() {
        let store = SqliteStore::in_memory().await.unwrap();
        let award = NewAchievement {
            planter_id: PlanterId::new_unchecked("jane-1"),
            name: "First Tree".to_string(),
            description: "Planted your first tree!".to_string(),
            icon: "🌱".to_string(),
        };

        assert!(matches!(
            store.award(award.clone()).await.unwrap(),
            AwardOutcome::Awarded(_)
        ));
        assert_eq!(
            store.award(award).await.unwrap(),
            AwardOutcome::AlreadyAwarded
        );

        let jane = PlanterId::new_unchecked("jane-1");
        assert_eq!(store.list_for_planter(&jane).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn same_name_different_planters_both_award() {
        let store = SqliteStore::in_memory().await.unwrap();
        for planter in ["jane-1", "amir-2"] {
            let outcome = store
                .award(NewAchievement {
                    planter_id: PlanterId::new_unchecked(planter),
                    name: "First Tree".to_string(),
                    description: "Planted your first tree!".to_string(),
                    icon: "🌱".to_string(),
                })
                .await
                .unwrap();
            assert!(matches!(outcome, AwardOutcome::Awarded(_)));
        }
    }
}
