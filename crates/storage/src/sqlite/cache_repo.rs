use chrono::{DateTime, Utc};
use quiz_core::model::TestId;
use quiz_core::wire::SessionBundle;
use sqlx::Row;

use super::SqliteCache;
use crate::repository::{AnswerMap, CachedSession, SessionCacheStore, StorageError};

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

/// SQLITE_FULL (primary code 13) is the quota case; everything else is a
/// connection-level failure.
fn store_err(e: sqlx::Error) -> StorageError {
    if let sqlx::Error::Database(db) = &e
        && db.code().as_deref() == Some("13")
    {
        return StorageError::QuotaExceeded;
    }
    StorageError::Connection(e.to_string())
}

#[async_trait::async_trait]
impl SessionCacheStore for SqliteCache {
    async fn load(&self, test_id: &TestId) -> Result<CachedSession, StorageError> {
        let row = sqlx::query(
            r"
                SELECT bundle, answers, started_at, deadline
                FROM session_cache
                WHERE test_id = ?1
            ",
        )
        .bind(test_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;

        let Some(row) = row else {
            return Ok(CachedSession::default());
        };

        let bundle = row
            .try_get::<Option<String>, _>("bundle")
            .map_err(ser)?
            .map(|json| serde_json::from_str::<SessionBundle>(&json))
            .transpose()
            .map_err(ser)?;
        let answers = row
            .try_get::<Option<String>, _>("answers")
            .map_err(ser)?
            .map(|json| serde_json::from_str::<AnswerMap>(&json))
            .transpose()
            .map_err(ser)?;
        let started_at: Option<DateTime<Utc>> = row.try_get("started_at").map_err(ser)?;
        let deadline: Option<DateTime<Utc>> = row.try_get("deadline").map_err(ser)?;

        Ok(CachedSession {
            bundle,
            answers,
            started_at,
            deadline,
        })
    }

    async fn save_bundle(
        &self,
        test_id: &TestId,
        bundle: &SessionBundle,
    ) -> Result<(), StorageError> {
        let json = serde_json::to_string(bundle).map_err(ser)?;
        sqlx::query(
            r"
                INSERT INTO session_cache (test_id, bundle, updated_at)
                VALUES (?1, ?2, ?3)
                ON CONFLICT(test_id) DO UPDATE
                SET bundle = excluded.bundle, updated_at = excluded.updated_at
            ",
        )
        .bind(test_id.as_str())
        .bind(json)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(())
    }

    async fn save_answers(
        &self,
        test_id: &TestId,
        answers: &AnswerMap,
    ) -> Result<(), StorageError> {
        let json = serde_json::to_string(answers).map_err(ser)?;
        sqlx::query(
            r"
                INSERT INTO session_cache (test_id, answers, updated_at)
                VALUES (?1, ?2, ?3)
                ON CONFLICT(test_id) DO UPDATE
                SET answers = excluded.answers, updated_at = excluded.updated_at
            ",
        )
        .bind(test_id.as_str())
        .bind(json)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(())
    }

    async fn save_started_at(
        &self,
        test_id: &TestId,
        started_at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        sqlx::query(
            r"
                INSERT INTO session_cache (test_id, started_at, updated_at)
                VALUES (?1, ?2, ?3)
                ON CONFLICT(test_id) DO UPDATE
                SET started_at = excluded.started_at, updated_at = excluded.updated_at
            ",
        )
        .bind(test_id.as_str())
        .bind(started_at)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(())
    }

    async fn save_deadline(
        &self,
        test_id: &TestId,
        deadline: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        sqlx::query(
            r"
                INSERT INTO session_cache (test_id, deadline, updated_at)
                VALUES (?1, ?2, ?3)
                ON CONFLICT(test_id) DO UPDATE
                SET deadline = excluded.deadline, updated_at = excluded.updated_at
            ",
        )
        .bind(test_id.as_str())
        .bind(deadline)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(())
    }

    async fn clear(&self, test_id: &TestId) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM session_cache WHERE test_id = ?1")
            .bind(test_id.as_str())
            .execute(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(())
    }
}
