//! # Document Sequences
//!
//! Gap-free invoice and purchase numbering. The counter increment is the
//! first write of every sale/purchase transaction, so it doubles as the
//! point where that transaction takes SQLite's write lock. A rolled-back
//! transaction rolls its number back too.

use sqlx::{SqliteConnection, SqlitePool};

use crate::error::{DbError, DbResult};
use tally_core::codes::document_number;
use tally_core::DocumentKind;

/// Row name in `document_sequences` for each document kind.
fn sequence_name(kind: DocumentKind) -> &'static str {
    match kind {
        DocumentKind::Sale => "invoice",
        DocumentKind::Purchase => "purchase",
    }
}

#[derive(Debug, Clone)]
pub struct SequenceRepository {
    pool: SqlitePool,
}

impl SequenceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SequenceRepository { pool }
    }

    /// Last number handed out for `kind` (0 if none yet).
    pub async fn current(&self, kind: DocumentKind) -> DbResult<i64> {
        let value: Option<i64> =
            sqlx::query_scalar("SELECT last_value FROM document_sequences WHERE name = ?1")
                .bind(sequence_name(kind))
                .fetch_optional(&self.pool)
                .await?;
        Ok(value.unwrap_or(0))
    }

    /// Increments and returns the counter for `kind`.
    pub async fn next_in(conn: &mut SqliteConnection, kind: DocumentKind) -> DbResult<i64> {
        let name = sequence_name(kind);
        let value: Option<i64> = sqlx::query_scalar(
            "UPDATE document_sequences SET last_value = last_value + 1 WHERE name = ?1 \
             RETURNING last_value",
        )
        .bind(name)
        .fetch_optional(&mut *conn)
        .await?;

        value.ok_or_else(|| DbError::not_found("DocumentSequence", name))
    }

    /// Next formatted number: `INV-000001`, `PO-000001`.
    pub async fn next_document_number_in(
        conn: &mut SqliteConnection,
        kind: DocumentKind,
    ) -> DbResult<String> {
        let seq = Self::next_in(conn, kind).await?;
        Ok(document_number(kind, seq))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::test_db;

    #[tokio::test]
    async fn test_numbers_are_sequential_per_kind() {
        let db = test_db().await;
        let mut conn = db.pool().acquire().await.unwrap();

        let a = SequenceRepository::next_document_number_in(&mut conn, DocumentKind::Sale)
            .await
            .unwrap();
        let b = SequenceRepository::next_document_number_in(&mut conn, DocumentKind::Sale)
            .await
            .unwrap();
        let p = SequenceRepository::next_document_number_in(&mut conn, DocumentKind::Purchase)
            .await
            .unwrap();

        assert_eq!(a, "INV-000001");
        assert_eq!(b, "INV-000002");
        assert_eq!(p, "PO-000001");
    }

    #[tokio::test]
    async fn test_rolled_back_number_is_reused() {
        let db = test_db().await;

        let mut tx = db.begin().await.unwrap();
        SequenceRepository::next_in(&mut tx, DocumentKind::Sale).await.unwrap();
        tx.rollback().await.unwrap();

        assert_eq!(db.sequences().current(DocumentKind::Sale).await.unwrap(), 0);
    }
}
