// Player store (SQLite via sqlx): current names plus append-only name history.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use crate::error::PersistenceError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PersistedPlayer {
    pub player_id: String,
    pub current_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct NameHistoryEntry {
    pub id: i64,
    pub player_id: String,
    pub previous_name: String,
    pub changed_at: String,
}

pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open a pool. Schema is not touched; call [`Database::run_migrations`].
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, PersistenceError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    /// Apply every `.sql` file in `folder` in lexical filename order.
    ///
    /// Each file is split on `;` and the statements run one by one. The first
    /// failing statement aborts the whole run. Returns the applied files.
    pub async fn run_migrations(&self, folder: &Path) -> Result<Vec<PathBuf>, PersistenceError> {
        let io_err = |source| PersistenceError::MigrationIo {
            path: folder.to_path_buf(),
            source,
        };

        let mut files = Vec::new();
        for entry in std::fs::read_dir(folder).map_err(io_err)? {
            let entry = entry.map_err(io_err)?;
            let path = entry.path();
            if path.is_dir() || path.extension().and_then(|e| e.to_str()) != Some("sql") {
                continue;
            }
            files.push(path);
        }
        files.sort();

        for file in &files {
            tracing::info!(file = %file.display(), "Executing migration file");
            let sql = std::fs::read_to_string(file).map_err(|source| PersistenceError::MigrationIo {
                path: file.clone(),
                source,
            })?;

            for (i, statement) in sql.split(';').enumerate() {
                let statement = statement.trim();
                if statement.is_empty() {
                    continue;
                }
                sqlx::query(statement)
                    .execute(&self.pool)
                    .await
                    .map_err(|source| PersistenceError::MigrationStatement {
                        file: file.clone(),
                        index: i + 1,
                        source,
                    })?;
            }
        }

        Ok(files)
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    // ── Players ───────────────────────────────────────────────────────

    pub async fn get_player(&self, player_id: &str) -> Result<Option<PersistedPlayer>, PersistenceError> {
        let row = sqlx::query_as::<_, PersistedPlayer>(
            "SELECT player_id, current_player_name AS current_name FROM botcrawler_players WHERE player_id = ?",
        )
        .bind(player_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn add_player(&self, player_id: &str, name: &str) -> Result<(), PersistenceError> {
        sqlx::query("INSERT INTO botcrawler_players (player_id, current_player_name) VALUES (?, ?)")
            .bind(player_id)
            .bind(name)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Returns false when no such player exists.
    pub async fn update_player_name(&self, player_id: &str, new_name: &str) -> Result<bool, PersistenceError> {
        let result =
            sqlx::query("UPDATE botcrawler_players SET current_player_name = ? WHERE player_id = ?")
                .bind(new_name)
                .bind(player_id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Number of players ever seen.
    pub async fn count_players(&self) -> Result<i64, PersistenceError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM botcrawler_players")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    // ── Name history ──────────────────────────────────────────────────

    pub async fn add_name_to_history(&self, player_id: &str, previous_name: &str) -> Result<(), PersistenceError> {
        sqlx::query(
            "INSERT INTO botcrawler_player_name_history (player_id, previous_name) VALUES (?, ?)",
        )
        .bind(player_id)
        .bind(previous_name)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// History entries for a player, oldest first.
    pub async fn get_name_history(&self, player_id: &str) -> Result<Vec<NameHistoryEntry>, PersistenceError> {
        let rows = sqlx::query_as::<_, NameHistoryEntry>(
            "SELECT id, player_id, previous_name, changed_at FROM botcrawler_player_name_history WHERE player_id = ? ORDER BY id",
        )
        .bind(player_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
