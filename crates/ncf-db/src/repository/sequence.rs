//! # Sequence Repository
//!
//! NCF ranges and number issuance.
//!
//! ## Issuance
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  issue_from(&mut tx, sequence_id, ...)                                  │
//! │                                                                         │
//! │  1. SELECT sequence (cursor C)                                         │
//! │  2. numbering::issue_next  → inactive / expired / exhausted? fail      │
//! │  3. UPDATE ... SET current_number = C + 1                              │
//! │        WHERE id = ? AND current_number = C                             │
//! │        └── 0 rows → DbError::Conflict (someone else took C)            │
//! │  4. INSERT ncf_issuance_log                                            │
//! │                                                                         │
//! │  Runs on the caller's transaction: the number, the cursor and the      │
//! │  document update commit or roll back together.                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{NaiveDate, Utc};
use ncf_core::numbering::issue_next;
use ncf_core::validation::{validate_name, validate_sequence_range};
use ncf_core::{IssuanceRecord, IssuedFor, NcfNumber, NcfSequence};
use sqlx::{Executor, Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use super::document_type::fetch_type;
use super::today;
use crate::error::{DbError, DbResult};

const SELECT_SEQUENCE: &str = r#"
    SELECT
        s.id,
        s.document_type_id,
        t.code AS type_code,
        s.name,
        s.start_number,
        s.end_number,
        s.current_number,
        s.is_active,
        s.expiry_date,
        s.created_at,
        s.updated_at
    FROM ncf_sequences s
    JOIN fiscal_document_types t ON t.id = s.document_type_id
"#;

// =============================================================================
// Shared Queries
// =============================================================================

/// Fetches a sequence by ID.
pub(crate) async fn fetch_sequence<'c, E>(executor: E, id: &str) -> DbResult<Option<NcfSequence>>
where
    E: Executor<'c, Database = Sqlite>,
{
    let sql = format!("{} WHERE s.id = ?1", SELECT_SEQUENCE);
    let sequence = sqlx::query_as::<_, NcfSequence>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?;
    Ok(sequence)
}

/// Fetches every sequence of a document type in creation order.
pub(crate) async fn fetch_for_type<'c, E>(
    executor: E,
    document_type_id: &str,
) -> DbResult<Vec<NcfSequence>>
where
    E: Executor<'c, Database = Sqlite>,
{
    let sql = format!(
        "{} WHERE s.document_type_id = ?1 ORDER BY s.rowid",
        SELECT_SEQUENCE
    );
    let sequences = sqlx::query_as::<_, NcfSequence>(&sql)
        .bind(document_type_id)
        .fetch_all(executor)
        .await?;
    Ok(sequences)
}

/// Marks a sequence inactive.
pub(crate) async fn deactivate_on(conn: &mut SqliteConnection, id: &str) -> DbResult<()> {
    let result = sqlx::query(
        "UPDATE ncf_sequences SET is_active = 0, updated_at = ?2 WHERE id = ?1",
    )
    .bind(id)
    .bind(Utc::now())
    .execute(conn)
    .await
    .map_err(|e| DbError::on_write(e, "NcfSequence", id))?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("NcfSequence", id));
    }

    Ok(())
}

/// Issues the next number of a sequence on an open transaction.
///
/// ## Errors
/// - `NotFound` if the sequence doesn't exist
/// - `Fiscal` if it is inactive, expired or exhausted
/// - `Conflict` if the cursor moved since it was read
pub(crate) async fn issue_from(
    conn: &mut SqliteConnection,
    sequence_id: &str,
    issued_for: IssuedFor,
    document_id: &str,
    today: NaiveDate,
) -> DbResult<NcfNumber> {
    let mut sequence = fetch_sequence(&mut *conn, sequence_id)
        .await?
        .ok_or_else(|| DbError::not_found("NcfSequence", sequence_id))?;

    let read_cursor = sequence.current_number;
    let number = issue_next(&mut sequence, today)?;
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        UPDATE ncf_sequences SET
            current_number = current_number + 1,
            updated_at = ?3
        WHERE id = ?1 AND current_number = ?2
        "#,
    )
    .bind(sequence_id)
    .bind(read_cursor)
    .bind(now)
    .execute(&mut *conn)
    .await
    .map_err(|e| DbError::on_write(e, "NcfSequence", sequence_id))?;

    if result.rows_affected() == 0 {
        return Err(DbError::conflict("NcfSequence", sequence_id));
    }

    sqlx::query(
        r#"
        INSERT INTO ncf_issuance_log (id, sequence_id, issued_for, document_id, ncf_number, issued_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(sequence_id)
    .bind(issued_for)
    .bind(document_id)
    .bind(number.as_str())
    .bind(now)
    .execute(&mut *conn)
    .await?;

    info!(
        ncf = %number,
        sequence_id = %sequence_id,
        document_id = %document_id,
        remaining = sequence.remaining(),
        "NCF issued"
    );

    Ok(number)
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for NCF sequences.
#[derive(Debug, Clone)]
pub struct SequenceRepository {
    pool: SqlitePool,
}

impl SequenceRepository {
    /// Creates a new SequenceRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SequenceRepository { pool }
    }

    /// Inserts an active sequence with its cursor at `start`.
    ///
    /// ## Errors
    /// - `NotFound` if the document type doesn't exist
    /// - Validation error for bad bounds or an empty name
    pub async fn insert(
        &self,
        document_type_id: &str,
        name: &str,
        start: i64,
        end: i64,
        expiry_date: Option<NaiveDate>,
    ) -> DbResult<NcfSequence> {
        validate_name("name", name, 100)?;
        validate_sequence_range(start, end, start)?;

        let doc_type = fetch_type(&self.pool, document_type_id)
            .await?
            .ok_or_else(|| DbError::not_found("FiscalDocumentType", document_type_id))?;

        let now = Utc::now();
        let sequence = NcfSequence {
            id: Uuid::new_v4().to_string(),
            document_type_id: doc_type.id,
            type_code: doc_type.code,
            name: name.trim().to_string(),
            start_number: start,
            end_number: end,
            current_number: start,
            is_active: true,
            expiry_date,
            created_at: now,
            updated_at: now,
        };

        debug!(
            type_code = %sequence.type_code,
            start,
            end,
            "Inserting NCF sequence"
        );

        sqlx::query(
            r#"
            INSERT INTO ncf_sequences (
                id, document_type_id, name,
                start_number, end_number, current_number,
                is_active, expiry_date, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&sequence.id)
        .bind(&sequence.document_type_id)
        .bind(&sequence.name)
        .bind(sequence.start_number)
        .bind(sequence.end_number)
        .bind(sequence.current_number)
        .bind(sequence.is_active)
        .bind(sequence.expiry_date)
        .bind(sequence.created_at)
        .bind(sequence.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(sequence)
    }

    /// Gets a sequence by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<NcfSequence>> {
        fetch_sequence(&self.pool, id).await
    }

    /// Lists all sequences of a document type, active or not.
    pub async fn list_for_type(&self, document_type_id: &str) -> DbResult<Vec<NcfSequence>> {
        fetch_for_type(&self.pool, document_type_id).await
    }

    /// Lists the sequences of a type that can issue a number today.
    pub async fn list_available(&self, document_type_id: &str) -> DbResult<Vec<NcfSequence>> {
        let today = today();
        let sequences = fetch_for_type(&self.pool, document_type_id).await?;
        Ok(sequences
            .into_iter()
            .filter(|s| s.is_usable_on(today))
            .collect())
    }

    /// Marks a sequence inactive.
    pub async fn deactivate(&self, id: &str) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        deactivate_on(&mut *conn, id).await?;
        info!(sequence_id = %id, "NCF sequence deactivated");
        Ok(())
    }

    /// Issues the next number for a document in its own transaction.
    pub async fn issue(
        &self,
        sequence_id: &str,
        issued_for: IssuedFor,
        document_id: &str,
    ) -> DbResult<NcfNumber> {
        let mut tx = self.pool.begin().await?;
        let number = issue_from(&mut *tx, sequence_id, issued_for, document_id, today()).await?;
        tx.commit().await?;
        Ok(number)
    }

    /// Issuance log of a sequence, oldest first.
    pub async fn issuance_log(&self, sequence_id: &str) -> DbResult<Vec<IssuanceRecord>> {
        let records = sqlx::query_as::<_, IssuanceRecord>(
            r#"
            SELECT id, sequence_id, issued_for, document_id, ncf_number, issued_at
            FROM ncf_issuance_log
            WHERE sequence_id = ?1
            ORDER BY rowid
            "#,
        )
        .bind(sequence_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::repository::test_support::{sequence, standard_types, test_db};
    use ncf_core::CoreError;

    #[tokio::test]
    async fn test_issue_formats_and_advances() {
        let db = test_db().await;
        let (b01, _) = standard_types(&db).await;
        let seq = sequence(&db, &b01, 1, 1000).await;
        let repo = db.sequences();

        let first = repo.issue(&seq.id, IssuedFor::Invoice, "inv-1").await.unwrap();
        let second = repo.issue(&seq.id, IssuedFor::Invoice, "inv-2").await.unwrap();

        assert_eq!(first.as_str(), "B0100000001");
        assert_eq!(second.as_str(), "B0100000002");

        let seq = repo.get_by_id(&seq.id).await.unwrap().unwrap();
        assert_eq!(seq.current_number, 3);
        assert_eq!(seq.type_code, "B01");
    }

    #[tokio::test]
    async fn test_last_number_then_exhausted() {
        let db = test_db().await;
        let (_, b02) = standard_types(&db).await;
        let seq = sequence(&db, &b02, 500, 500).await;
        let repo = db.sequences();

        let last = repo.issue(&seq.id, IssuedFor::PosOrder, "o1").await.unwrap();
        assert_eq!(last.as_str(), "B0200000500");

        let err = repo.issue(&seq.id, IssuedFor::PosOrder, "o2").await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Fiscal(CoreError::SequenceExhausted { end: 500, .. })
        ));

        // Failed issuance leaves the cursor and log untouched
        let seq = repo.get_by_id(&seq.id).await.unwrap().unwrap();
        assert_eq!(seq.current_number, 501);
        assert_eq!(repo.issuance_log(&seq.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_issuance_log_records_document() {
        let db = test_db().await;
        let (b01, _) = standard_types(&db).await;
        let seq = sequence(&db, &b01, 1, 10).await;

        db.sequences()
            .issue(&seq.id, IssuedFor::Invoice, "inv-7")
            .await
            .unwrap();

        let log = db.sequences().issuance_log(&seq.id).await.unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].document_id, "inv-7");
        assert_eq!(log[0].issued_for, IssuedFor::Invoice);
        assert_eq!(log[0].ncf_number, "B0100000001");
    }

    #[tokio::test]
    async fn test_inactive_and_expired_are_not_available() {
        let db = test_db().await;
        let (b01, _) = standard_types(&db).await;
        let repo = db.sequences();

        let inactive = sequence(&db, &b01, 1, 10).await;
        repo.deactivate(&inactive.id).await.unwrap();

        let expired = repo
            .insert(&b01.id, "B01 vencida", 1, 10, NaiveDate::from_ymd_opt(2020, 12, 31))
            .await
            .unwrap();
        let good = sequence(&db, &b01, 11, 20).await;

        assert_eq!(repo.list_for_type(&b01.id).await.unwrap().len(), 3);

        let available = repo.list_available(&b01.id).await.unwrap();
        assert_eq!(available.len(), 1);
        assert_eq!(available[0].id, good.id);

        let err = repo.issue(&expired.id, IssuedFor::Invoice, "x").await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Fiscal(CoreError::SequenceExpired { .. })
        ));

        let err = repo.issue(&inactive.id, IssuedFor::Invoice, "x").await.unwrap_err();
        assert!(matches!(err, DbError::Fiscal(CoreError::SequenceInactive(_))));
    }

    #[tokio::test]
    async fn test_stale_snapshot_write_is_conflict() {
        let path = std::env::temp_dir().join(format!("ncf-race-{}.db", Uuid::new_v4()));
        let db = Database::new(DbConfig::new(path.clone()).max_connections(4))
            .await
            .unwrap();
        let (_, b02) = standard_types(&db).await;
        let seq = sequence(&db, &b02, 1, 100).await;

        // First writer reads the cursor and holds its snapshot
        let mut tx = db.pool().begin().await.unwrap();
        fetch_sequence(&mut *tx, &seq.id).await.unwrap();

        // Second writer issues and commits on another connection
        let won = db
            .sequences()
            .issue(&seq.id, IssuedFor::PosOrder, "order-b")
            .await
            .unwrap();
        assert_eq!(won.as_str(), "B0200000001");

        let err = issue_from(&mut *tx, &seq.id, IssuedFor::PosOrder, "order-a", today())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Conflict { .. }), "got {:?}", err);
        tx.rollback().await.unwrap();

        let seq = db.sequences().get_by_id(&seq.id).await.unwrap().unwrap();
        assert_eq!(seq.current_number, 2);
        assert_eq!(db.sequences().issuance_log(&seq.id).await.unwrap().len(), 1);

        db.close().await;
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{}", path.display(), suffix));
        }
    }

    #[tokio::test]
    async fn test_insert_validates_bounds() {
        let db = test_db().await;
        let (b01, _) = standard_types(&db).await;

        let err = db
            .sequences()
            .insert(&b01.id, "B01", 10, 5, None)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Fiscal(CoreError::Validation(_))));

        let err = db
            .sequences()
            .insert("missing-type", "B01", 1, 5, None)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
