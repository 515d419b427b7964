//! # Customer Repository

use chrono::Utc;
use ncf_core::validation::{normalize_rnc, validate_name};
use ncf_core::Customer;
use sqlx::{Executor, Sqlite, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;

/// Fetches a customer by ID.
pub(crate) async fn fetch_customer<'c, E>(executor: E, id: &str) -> DbResult<Option<Customer>>
where
    E: Executor<'c, Database = Sqlite>,
{
    let customer = sqlx::query_as::<_, Customer>(
        "SELECT id, name, vat, is_company, created_at FROM customers WHERE id = ?1",
    )
    .bind(id)
    .fetch_optional(executor)
    .await?;
    Ok(customer)
}

/// Repository for customers.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    /// Creates a new CustomerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    /// Inserts a customer. A tax ID, if given, is validated and stored as digits.
    pub async fn insert(
        &self,
        name: &str,
        vat: Option<&str>,
        is_company: bool,
    ) -> DbResult<Customer> {
        validate_name("name", name, 200)?;

        let vat = match vat.map(str::trim).filter(|v| !v.is_empty()) {
            Some(raw) => Some(normalize_rnc(raw)?),
            None => None,
        };

        let customer = Customer {
            id: Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            vat,
            is_company,
            created_at: Utc::now(),
        };

        debug!(id = %customer.id, has_vat = customer.vat.is_some(), "Inserting customer");

        sqlx::query(
            "INSERT INTO customers (id, name, vat, is_company, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&customer.id)
        .bind(&customer.name)
        .bind(&customer.vat)
        .bind(customer.is_company)
        .bind(customer.created_at)
        .execute(&self.pool)
        .await?;

        Ok(customer)
    }

    /// Gets a customer by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Customer>> {
        fetch_customer(&self.pool, id).await
    }
}

#[cfg(test)]
mod tests {
    use crate::error::DbError;
    use crate::repository::test_support::test_db;

    #[tokio::test]
    async fn test_insert_normalizes_vat() {
        let db = test_db().await;

        let customer = db
            .customers()
            .insert("Juan Pérez", Some("001-0000000-9"), false)
            .await
            .unwrap();
        assert_eq!(customer.vat.as_deref(), Some("00100000009"));

        let loaded = db.customers().get_by_id(&customer.id).await.unwrap().unwrap();
        assert_eq!(loaded.tax_id(), Some("00100000009"));
    }

    #[tokio::test]
    async fn test_blank_vat_is_none() {
        let db = test_db().await;
        let customer = db.customers().insert("Cliente Contado", Some("  "), false).await.unwrap();
        assert!(customer.vat.is_none());
    }

    #[tokio::test]
    async fn test_invalid_vat_rejected() {
        let db = test_db().await;
        let err = db
            .customers()
            .insert("Juan Pérez", Some("123"), false)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Fiscal(_)));
    }
}
