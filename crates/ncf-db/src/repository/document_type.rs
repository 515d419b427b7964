//! # Document Type Repository
//!
//! Fiscal document types (B01, B02, B14, B15, ...).

use chrono::Utc;
use ncf_core::validation::{validate_name, validate_type_code};
use ncf_core::FiscalDocumentType;
use sqlx::{Executor, Sqlite, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};

const SELECT_TYPE: &str = r#"
    SELECT id, code, name, requires_rnc, is_active, created_at
    FROM fiscal_document_types
"#;

/// Fetches a document type by ID.
pub(crate) async fn fetch_type<'c, E>(executor: E, id: &str) -> DbResult<Option<FiscalDocumentType>>
where
    E: Executor<'c, Database = Sqlite>,
{
    let sql = format!("{} WHERE id = ?1", SELECT_TYPE);
    let doc_type = sqlx::query_as::<_, FiscalDocumentType>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?;
    Ok(doc_type)
}

/// Fetches an active document type by code.
pub(crate) async fn fetch_active_by_code<'c, E>(
    executor: E,
    code: &str,
) -> DbResult<Option<FiscalDocumentType>>
where
    E: Executor<'c, Database = Sqlite>,
{
    let sql = format!("{} WHERE code = ?1 AND is_active = 1", SELECT_TYPE);
    let doc_type = sqlx::query_as::<_, FiscalDocumentType>(&sql)
        .bind(code)
        .fetch_optional(executor)
        .await?;
    Ok(doc_type)
}

/// Repository for fiscal document types.
#[derive(Debug, Clone)]
pub struct DocumentTypeRepository {
    pool: SqlitePool,
}

impl DocumentTypeRepository {
    /// Creates a new DocumentTypeRepository.
    pub fn new(pool: SqlitePool) -> Self {
        DocumentTypeRepository { pool }
    }

    /// Inserts an active document type.
    ///
    /// ## Errors
    /// - Validation error for a malformed code or empty name
    /// - `UniqueViolation` if the code already exists
    pub async fn insert(
        &self,
        code: &str,
        name: &str,
        requires_rnc: bool,
    ) -> DbResult<FiscalDocumentType> {
        validate_type_code(code)?;
        validate_name("name", name, 100)?;

        let doc_type = FiscalDocumentType {
            id: Uuid::new_v4().to_string(),
            code: code.to_string(),
            name: name.trim().to_string(),
            requires_rnc,
            is_active: true,
            created_at: Utc::now(),
        };

        debug!(code = %doc_type.code, requires_rnc, "Inserting document type");

        sqlx::query(
            r#"
            INSERT INTO fiscal_document_types (id, code, name, requires_rnc, is_active, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&doc_type.id)
        .bind(&doc_type.code)
        .bind(&doc_type.name)
        .bind(doc_type.requires_rnc)
        .bind(doc_type.is_active)
        .bind(doc_type.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => DbError::duplicate(field, code),
            other => other,
        })?;

        Ok(doc_type)
    }

    /// Gets a document type by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<FiscalDocumentType>> {
        fetch_type(&self.pool, id).await
    }

    /// Gets an active document type by code.
    pub async fn get_by_code(&self, code: &str) -> DbResult<Option<FiscalDocumentType>> {
        fetch_active_by_code(&self.pool, code).await
    }

    /// Lists active document types ordered by code.
    pub async fn list_active(&self) -> DbResult<Vec<FiscalDocumentType>> {
        let sql = format!("{} WHERE is_active = 1 ORDER BY code", SELECT_TYPE);
        let types = sqlx::query_as::<_, FiscalDocumentType>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(types)
    }

    /// Activates or deactivates a document type.
    pub async fn set_active(&self, id: &str, active: bool) -> DbResult<()> {
        let result = sqlx::query("UPDATE fiscal_document_types SET is_active = ?2 WHERE id = ?1")
            .bind(id)
            .bind(active)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("FiscalDocumentType", id));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::test_db;

    #[tokio::test]
    async fn test_insert_and_lookup() {
        let db = test_db().await;
        let repo = db.document_types();

        let b01 = repo.insert("B01", "Crédito Fiscal", true).await.unwrap();

        let by_code = repo.get_by_code("B01").await.unwrap().unwrap();
        assert_eq!(by_code.id, b01.id);
        assert!(by_code.requires_rnc);

        let by_id = repo.get_by_id(&b01.id).await.unwrap().unwrap();
        assert_eq!(by_id.name, "Crédito Fiscal");
    }

    #[tokio::test]
    async fn test_duplicate_code_rejected() {
        let db = test_db().await;
        let repo = db.document_types();

        repo.insert("B02", "Consumidor Final", false).await.unwrap();
        let err = repo.insert("B02", "Otra", false).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_invalid_code_rejected() {
        let db = test_db().await;
        let err = db
            .document_types()
            .insert("B2", "Consumidor Final", false)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Fiscal(_)));
    }

    #[tokio::test]
    async fn test_inactive_types_are_hidden() {
        let db = test_db().await;
        let repo = db.document_types();

        let b14 = repo.insert("B14", "Gubernamentales", true).await.unwrap();
        repo.insert("B15", "Exportaciones", true).await.unwrap();
        repo.set_active(&b14.id, false).await.unwrap();

        assert!(repo.get_by_code("B14").await.unwrap().is_none());
        let active = repo.list_active().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].code, "B15");
    }
}
