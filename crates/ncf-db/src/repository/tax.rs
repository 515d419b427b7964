//! # Tax Repository
//!
//! Taxes that can be attached to invoice lines. Whether a tax counts as
//! ITBIS is decided by `ncf_core::itbis`, not stored here.

use ncf_core::validation::{validate_name, validate_tax_rate_bps};
use ncf_core::Tax;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;

/// Repository for taxes.
#[derive(Debug, Clone)]
pub struct TaxRepository {
    pool: SqlitePool,
}

impl TaxRepository {
    /// Creates a new TaxRepository.
    pub fn new(pool: SqlitePool) -> Self {
        TaxRepository { pool }
    }

    /// Inserts a tax.
    pub async fn insert(&self, name: &str, rate_bps: u32) -> DbResult<Tax> {
        validate_name("name", name, 100)?;
        validate_tax_rate_bps(rate_bps)?;

        let tax = Tax {
            id: Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            rate_bps,
        };

        debug!(name = %tax.name, rate_bps, "Inserting tax");

        sqlx::query("INSERT INTO taxes (id, name, rate_bps) VALUES (?1, ?2, ?3)")
            .bind(&tax.id)
            .bind(&tax.name)
            .bind(tax.rate_bps)
            .execute(&self.pool)
            .await?;

        Ok(tax)
    }

    /// Gets a tax by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Tax>> {
        let tax = sqlx::query_as::<_, Tax>("SELECT id, name, rate_bps FROM taxes WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(tax)
    }

    /// Lists all taxes by name.
    pub async fn list(&self) -> DbResult<Vec<Tax>> {
        let taxes = sqlx::query_as::<_, Tax>("SELECT id, name, rate_bps FROM taxes ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(taxes)
    }
}

#[cfg(test)]
mod tests {
    use crate::repository::test_support::test_db;

    #[tokio::test]
    async fn test_insert_and_list() {
        let db = test_db().await;
        let repo = db.taxes();

        let itbis = repo.insert("ITBIS 18%", 1800).await.unwrap();
        repo.insert("ISC", 1000).await.unwrap();

        let loaded = repo.get_by_id(&itbis.id).await.unwrap().unwrap();
        assert_eq!(loaded.rate_bps, 1800);

        let all = repo.list().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].name, "ISC");
    }

    #[tokio::test]
    async fn test_rate_above_100_percent_rejected() {
        let db = test_db().await;
        assert!(db.taxes().insert("Bad", 10001).await.is_err());
    }
}
