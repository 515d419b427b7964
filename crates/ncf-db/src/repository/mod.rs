//! # Repository Module
//!
//! Database repository implementations for the NCF store.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repositories                                         │
//! │                                                                         │
//! │  Caller                                                                │
//! │       │  db.invoices().post(id)                                        │
//! │       ▼                                                                 │
//! │  InvoiceRepository / PosOrderRepository                                │
//! │  ├── change_customer / change_document_type  (draft onchange chain)    │
//! │  └── post / mark_paid  (one transaction)                               │
//! │       │                                                                 │
//! │       │  sequence::issue_from(&mut tx, ...)                            │
//! │       ▼                                                                 │
//! │  SequenceRepository  (compare-and-set cursor, issuance log)            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Lookups used inside a transaction are free functions generic over
//! `sqlx::Executor`, so they run on either the pool or `&mut *tx`.
//!
//! ## Available Repositories
//!
//! - [`DocumentTypeRepository`](document_type::DocumentTypeRepository) - NCF types
//! - [`SequenceRepository`](sequence::SequenceRepository) - Ranges and issuance
//! - [`CustomerRepository`](customer::CustomerRepository) - Customers
//! - [`TaxRepository`](tax::TaxRepository) - Taxes
//! - [`InvoiceRepository`](invoice::InvoiceRepository) - Invoices and lines
//! - [`PosOrderRepository`](pos_order::PosOrderRepository) - POS orders

use chrono::NaiveDate;
use ncf_core::suggestion::select_sequence_for_type;
use serde::Serialize;
use sqlx::SqlitePool;

use crate::error::DbResult;

pub mod customer;
pub mod document_type;
pub mod invoice;
pub mod pos_order;
pub mod sequence;
pub mod tax;

/// A document after an onchange handler ran, plus the warning to show.
#[derive(Debug, Clone, Serialize)]
pub struct Onchange<T> {
    pub document: T,
    pub warning: Option<String>,
}

impl<T> Onchange<T> {
    pub(crate) fn new(document: T, warning: Option<String>) -> Self {
        Onchange { document, warning }
    }
}

/// The calendar day used for sequence expiry checks.
pub(crate) fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Type and sequence picked for a draft by an onchange handler.
#[derive(Debug, Clone, Default)]
pub(crate) struct TypeChoice {
    pub type_id: Option<String>,
    pub sequence_id: Option<String>,
    pub warning: Option<String>,
}

/// Keeps `type_id` and auto-selects its first usable sequence.
pub(crate) async fn choose_type(pool: &SqlitePool, type_id: Option<String>) -> DbResult<TypeChoice> {
    let Some(type_id) = type_id else {
        return Ok(TypeChoice::default());
    };

    let sequences = sequence::fetch_for_type(pool, &type_id).await?;
    let selection = select_sequence_for_type(&sequences, &type_id, today());

    Ok(TypeChoice {
        type_id: Some(type_id),
        sequence_id: selection.sequence_id,
        warning: selection.warning,
    })
}

/// Resolves a suggested type code, then auto-selects its sequence.
pub(crate) async fn choose_type_by_code(pool: &SqlitePool, code: &str) -> DbResult<TypeChoice> {
    match document_type::fetch_active_by_code(pool, code).await? {
        Some(doc_type) => choose_type(pool, Some(doc_type.id)).await,
        None => Ok(TypeChoice {
            warning: Some(format!("NCF type {} is not configured", code)),
            ..TypeChoice::default()
        }),
    }
}

/// Shared fixtures for repository tests.
#[cfg(test)]
pub(crate) mod test_support {
    use ncf_core::{Customer, FiscalDocumentType, NcfSequence};

    use crate::pool::{Database, DbConfig};

    pub(crate) async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    /// Inserts B01 (requires RNC) and B02.
    pub(crate) async fn standard_types(db: &Database) -> (FiscalDocumentType, FiscalDocumentType) {
        let b01 = db
            .document_types()
            .insert("B01", "Crédito Fiscal", true)
            .await
            .unwrap();
        let b02 = db
            .document_types()
            .insert("B02", "Consumidor Final", false)
            .await
            .unwrap();
        (b01, b02)
    }

    pub(crate) async fn sequence(
        db: &Database,
        document_type: &FiscalDocumentType,
        start: i64,
        end: i64,
    ) -> NcfSequence {
        db.sequences()
            .insert(
                &document_type.id,
                &format!("{} {}-{}", document_type.code, start, end),
                start,
                end,
                None,
            )
            .await
            .unwrap()
    }

    pub(crate) async fn customer(db: &Database, vat: Option<&str>) -> Customer {
        db.customers()
            .insert("Distribuidora Caribe", vat, vat.is_some())
            .await
            .unwrap()
    }
}
