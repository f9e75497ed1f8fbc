//! MySQL-backed fingerprint store.

use crate::config::DatabaseConfig;
use crate::model::{FingerprintMatch, FingerprintRow, SongRecord};
use crate::store::{FingerprintStore, MAX_QUERY_HASHES};
use crate::{Error, Result};
use sqlx::mysql::MySqlPoolOptions;
use sqlx::{MySql, MySqlPool, QueryBuilder, Row};

/// Rows per bulk INSERT statement; 3 placeholders each keeps statements well
/// under the server-side placeholder limit.
const INSERT_BATCH_ROWS: usize = 1000;

const CREATE_SONGS: &str = "\
CREATE TABLE IF NOT EXISTS songs (
    id INT NOT NULL AUTO_INCREMENT PRIMARY KEY,
    name VARCHAR(255) NOT NULL,
    artist VARCHAR(255) NOT NULL,
    file_hash CHAR(40) NOT NULL,
    fingerprinted BOOLEAN NOT NULL DEFAULT FALSE,
    total_hashes INT NOT NULL DEFAULT 0,
    date_created TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    UNIQUE KEY uq_songs_file_hash (file_hash)
)";

const CREATE_FINGERPRINTS: &str = "\
CREATE TABLE IF NOT EXISTS fingerprints (
    hash CHAR(40) NOT NULL,
    song_id INT NOT NULL,
    offset_ms INT NOT NULL,
    KEY idx_fingerprints_hash (hash),
    UNIQUE KEY uq_fingerprints_row (hash, song_id, offset_ms),
    CONSTRAINT fk_fingerprints_song FOREIGN KEY (song_id)
        REFERENCES songs (id) ON DELETE CASCADE
)";

/// Process-wide fingerprint store over a MySQL connection pool.
#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    /// Connect to the configured database and run the idempotent setup.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        if config.backend != "mysql" {
            return Err(Error::UnsupportedBackend(config.backend.clone()));
        }

        let pool = MySqlPoolOptions::new()
            .max_connections(5)
            .connect(&config.url())
            .await?;

        let store = Self { pool };
        store.setup().await?;
        tracing::debug!(host = %config.host, dbname = %config.dbname, "connected to store");
        Ok(store)
    }
}

impl FingerprintStore for MySqlStore {
    async fn setup(&self) -> Result<()> {
        sqlx::query(CREATE_SONGS).execute(&self.pool).await?;
        sqlx::query(CREATE_FINGERPRINTS).execute(&self.pool).await?;
        Ok(())
    }

    async fn insert_song(
        &self,
        name: &str,
        artist: &str,
        file_hash: &str,
        total_hashes: i32,
    ) -> Result<i32> {
        let existing = sqlx::query("SELECT id FROM songs WHERE file_hash = ?")
            .bind(file_hash)
            .fetch_optional(&self.pool)
            .await?;
        if let Some(row) = existing {
            return Err(Error::DuplicateSong {
                file_hash: file_hash.to_string(),
                song_id: row.try_get("id")?,
            });
        }

        let result = sqlx::query(
            "INSERT INTO songs (name, artist, file_hash, total_hashes) VALUES (?, ?, ?, ?)",
        )
        .bind(name)
        .bind(artist)
        .bind(file_hash)
        .bind(total_hashes)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_id() as i32)
    }

    async fn insert_fingerprints(&self, song_id: i32, rows: &[FingerprintRow]) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        for chunk in rows.chunks(INSERT_BATCH_ROWS) {
            let mut builder: QueryBuilder<MySql> =
                QueryBuilder::new("INSERT IGNORE INTO fingerprints (hash, song_id, offset_ms) ");
            builder.push_values(chunk, |mut b, row| {
                b.push_bind(&row.hash)
                    .push_bind(song_id)
                    .push_bind(row.offset_ms);
            });
            builder.build().execute(&mut *tx).await?;
        }
        tx.commit().await?;

        tracing::debug!(song_id, rows = rows.len(), "stored fingerprints");
        Ok(())
    }

    async fn mark_fingerprinted(&self, song_id: i32) -> Result<()> {
        // rows_affected counts changed rows on MySQL, so an already-set flag
        // is indistinguishable from a missing song; don't treat 0 as an error.
        sqlx::query("UPDATE songs SET fingerprinted = TRUE WHERE id = ?")
            .bind(song_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_song(&self, song_id: i32) -> Result<()> {
        let result = sqlx::query("DELETE FROM songs WHERE id = ?")
            .bind(song_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::SongNotFound(song_id));
        }
        Ok(())
    }

    async fn query_fingerprints(&self, hashes: &[String]) -> Result<Vec<FingerprintMatch>> {
        if hashes.is_empty() {
            return Ok(Vec::new());
        }
        if hashes.len() > MAX_QUERY_HASHES {
            return Err(Error::BatchTooLarge {
                len: hashes.len(),
                max: MAX_QUERY_HASHES,
            });
        }

        let mut builder: QueryBuilder<MySql> =
            QueryBuilder::new("SELECT hash, song_id, offset_ms FROM fingerprints WHERE hash IN (");
        let mut separated = builder.separated(", ");
        for hash in hashes {
            separated.push_bind(hash);
        }
        builder.push(")");

        let rows = builder.build().fetch_all(&self.pool).await?;
        let matches = rows
            .iter()
            .map(|row| {
                Ok(FingerprintMatch {
                    hash: row.try_get("hash")?,
                    song_id: row.try_get("song_id")?,
                    offset_ms: row.try_get("offset_ms")?,
                })
            })
            .collect::<std::result::Result<Vec<_>, sqlx::Error>>()?;

        Ok(matches)
    }

    async fn get_song(&self, song_id: i32) -> Result<SongRecord> {
        sqlx::query_as::<_, SongRecord>(
            "SELECT id, name, artist, file_hash, fingerprinted, total_hashes, date_created \
             FROM songs WHERE id = ?",
        )
        .bind(song_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(Error::SongNotFound(song_id))
    }

    async fn list_songs(&self) -> Result<Vec<SongRecord>> {
        Ok(sqlx::query_as::<_, SongRecord>(
            "SELECT id, name, artist, file_hash, fingerprinted, total_hashes, date_created \
             FROM songs ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?)
    }

    async fn cleanup(&self) -> Result<u64> {
        // Later copies of the same audio lose to the earliest id; the
        // foreign key cascades their fingerprints.
        let result = sqlx::query(
            "DELETE s FROM songs s \
             INNER JOIN songs k ON s.file_hash = k.file_hash AND s.id > k.id",
        )
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
