//! # POS Order Repository
//!
//! Point-of-sale orders and the NCF assigned when they are paid.
//!
//! ## Payment Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  mark_paid(order)            (one transaction)                          │
//! │       │                                                                 │
//! │       ├── NCF already set or total <= 0 ──► just mark paid             │
//! │       │                                                                 │
//! │       ├── no sequence chosen                                            │
//! │       │     └── consumer type (B02) ──► first usable sequence          │
//! │       │                                     └── none ──► error         │
//! │       │                                                                 │
//! │       ├── chosen sequence can't issue                                  │
//! │       │     └── sibling of same type? ──yes──► deactivate spent one,   │
//! │       │                                        switch to sibling       │
//! │       │                             └──no───► error                    │
//! │       ▼                                                                 │
//! │  issue NCF, mark paid                                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{NaiveDate, Utc};
use ncf_core::numbering::{choose_pos_sequence, first_available, PosSequenceChoice};
use ncf_core::suggestion::{suggest_for_customer, suggest_type_code};
use ncf_core::validation::{normalize_rnc, validate_amount_cents, validate_rnc_requirement};
use ncf_core::{
    CoreError, DocumentKind, FiscalSettings, Invoice, InvoiceLine, InvoiceState, IssuedFor, Money,
    PosOrder, PosOrderState,
};
use sqlx::{Executor, Sqlite, SqliteConnection, SqlitePool};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::customer::fetch_customer;
use super::document_type::{fetch_active_by_code, fetch_type};
use super::invoice::{insert_draft_on, insert_line_on};
use super::sequence::{deactivate_on, fetch_for_type, fetch_sequence, issue_from};
use super::{choose_type, choose_type_by_code, today, Onchange};
use crate::error::{DbError, DbResult};

const SELECT_ORDER: &str = r#"
    SELECT
        id, state, customer_id, customer_rnc,
        ncf_type_id, ncf_sequence_id, ncf_number, amount_total_cents,
        invoice_id, created_at, updated_at, paid_at
    FROM pos_orders
"#;

/// Fetches a POS order by ID.
pub(crate) async fn fetch_order<'c, E>(executor: E, id: &str) -> DbResult<Option<PosOrder>>
where
    E: Executor<'c, Database = Sqlite>,
{
    let sql = format!("{} WHERE id = ?1", SELECT_ORDER);
    let order = sqlx::query_as::<_, PosOrder>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?;
    Ok(order)
}

fn ensure_state(order: &PosOrder, expected: PosOrderState) -> DbResult<()> {
    if order.state != expected {
        return Err(CoreError::InvalidDocumentState {
            document_id: order.id.clone(),
            current_state: format!("{:?}", order.state).to_lowercase(),
        }
        .into());
    }
    Ok(())
}

/// Writes the draft-editable fields of an order.
async fn save_draft_fields<'c, E>(executor: E, order: &PosOrder) -> DbResult<()>
where
    E: Executor<'c, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        UPDATE pos_orders SET
            customer_id = ?2,
            customer_rnc = ?3,
            ncf_type_id = ?4,
            ncf_sequence_id = ?5,
            amount_total_cents = ?6,
            updated_at = ?7
        WHERE id = ?1 AND state = 'draft'
        "#,
    )
    .bind(&order.id)
    .bind(&order.customer_id)
    .bind(&order.customer_rnc)
    .bind(&order.ncf_type_id)
    .bind(&order.ncf_sequence_id)
    .bind(order.amount_total_cents)
    .bind(Utc::now())
    .execute(executor)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("PosOrder (draft)", &order.id));
    }

    Ok(())
}

/// Repository for POS order database operations.
#[derive(Debug, Clone)]
pub struct PosOrderRepository {
    pool: SqlitePool,
    settings: Arc<FiscalSettings>,
}

impl PosOrderRepository {
    /// Creates a new PosOrderRepository.
    pub fn new(pool: SqlitePool, settings: Arc<FiscalSettings>) -> Self {
        PosOrderRepository { pool, settings }
    }

    /// Gets an order by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<PosOrder>> {
        fetch_order(&self.pool, id).await
    }

    async fn require(&self, id: &str) -> DbResult<PosOrder> {
        fetch_order(&self.pool, id)
            .await?
            .ok_or_else(|| DbError::not_found("PosOrder", id))
    }

    async fn require_draft(&self, id: &str) -> DbResult<PosOrder> {
        let order = self.require(id).await?;
        ensure_state(&order, PosOrderState::Draft)?;
        Ok(order)
    }

    /// Creates an empty draft order.
    pub async fn create(&self) -> DbResult<PosOrder> {
        let now = Utc::now();
        let order = PosOrder {
            id: Uuid::new_v4().to_string(),
            state: PosOrderState::Draft,
            customer_id: None,
            customer_rnc: None,
            ncf_type_id: None,
            ncf_sequence_id: None,
            ncf_number: None,
            amount_total_cents: 0,
            invoice_id: None,
            created_at: now,
            updated_at: now,
            paid_at: None,
        };

        debug!(id = %order.id, "Creating POS order");

        sqlx::query(
            r#"
            INSERT INTO pos_orders (
                id, state, customer_id, customer_rnc,
                ncf_type_id, ncf_sequence_id, ncf_number, amount_total_cents,
                invoice_id, created_at, updated_at, paid_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&order.id)
        .bind(order.state)
        .bind(&order.customer_id)
        .bind(&order.customer_rnc)
        .bind(&order.ncf_type_id)
        .bind(&order.ncf_sequence_id)
        .bind(&order.ncf_number)
        .bind(order.amount_total_cents)
        .bind(&order.invoice_id)
        .bind(order.created_at)
        .bind(order.updated_at)
        .bind(order.paid_at)
        .execute(&self.pool)
        .await?;

        Ok(order)
    }

    /// Sets the order total.
    pub async fn set_amount_total(&self, order_id: &str, total: Money) -> DbResult<PosOrder> {
        validate_amount_cents("amount_total", total.cents())?;

        let mut order = self.require_draft(order_id).await?;
        order.amount_total_cents = total.cents();
        save_draft_fields(&self.pool, &order).await?;
        self.require(order_id).await
    }

    // =========================================================================
    // Draft Onchange Handlers
    // =========================================================================

    /// Sets (or clears) the customer and runs the suggestion chain.
    ///
    /// A walk-in order (no customer) gets the final-consumer type.
    pub async fn change_customer(
        &self,
        order_id: &str,
        customer_id: Option<&str>,
    ) -> DbResult<Onchange<PosOrder>> {
        let mut order = self.require_draft(order_id).await?;

        let customer = match customer_id {
            Some(id) => Some(
                fetch_customer(&self.pool, id)
                    .await?
                    .ok_or_else(|| DbError::not_found("Customer", id))?,
            ),
            None => None,
        };

        let suggestion = suggest_for_customer(customer.as_ref(), &self.settings);
        let choice = choose_type_by_code(&self.pool, &suggestion.type_code).await?;

        order.customer_id = customer.map(|c| c.id);
        order.customer_rnc = suggestion.customer_rnc;
        order.ncf_type_id = choice.type_id;
        order.ncf_sequence_id = choice.sequence_id;
        save_draft_fields(&self.pool, &order).await?;

        Ok(Onchange::new(self.require(order_id).await?, choice.warning))
    }

    /// Sets (or clears) the tax ID typed at the register and re-suggests
    /// the type from it.
    pub async fn set_customer_rnc(
        &self,
        order_id: &str,
        rnc: Option<&str>,
    ) -> DbResult<Onchange<PosOrder>> {
        let mut order = self.require_draft(order_id).await?;

        order.customer_rnc = match rnc.map(str::trim).filter(|r| !r.is_empty()) {
            Some(raw) => Some(normalize_rnc(raw)?),
            None => None,
        };

        let type_code = suggest_type_code(order.customer_rnc.as_deref(), &self.settings);
        let choice = choose_type_by_code(&self.pool, type_code).await?;

        order.ncf_type_id = choice.type_id;
        order.ncf_sequence_id = choice.sequence_id;
        save_draft_fields(&self.pool, &order).await?;

        Ok(Onchange::new(self.require(order_id).await?, choice.warning))
    }

    /// Sets the document type and auto-selects its sequence.
    pub async fn change_document_type(
        &self,
        order_id: &str,
        type_id: Option<&str>,
    ) -> DbResult<Onchange<PosOrder>> {
        let mut order = self.require_draft(order_id).await?;

        if let Some(type_id) = type_id {
            let doc_type = fetch_type(&self.pool, type_id)
                .await?
                .ok_or_else(|| DbError::not_found("FiscalDocumentType", type_id))?;
            validate_rnc_requirement(&doc_type, order.customer_rnc.as_deref(), &self.settings)?;
        }

        let choice = choose_type(&self.pool, type_id.map(str::to_string)).await?;
        order.ncf_type_id = choice.type_id;
        order.ncf_sequence_id = choice.sequence_id;
        save_draft_fields(&self.pool, &order).await?;

        Ok(Onchange::new(self.require(order_id).await?, choice.warning))
    }

    /// Selects a specific sequence (and its type).
    pub async fn set_sequence(&self, order_id: &str, sequence_id: &str) -> DbResult<PosOrder> {
        let mut order = self.require_draft(order_id).await?;

        let sequence = fetch_sequence(&self.pool, sequence_id)
            .await?
            .ok_or_else(|| DbError::not_found("NcfSequence", sequence_id))?;

        if let Some(type_id) = order.ncf_type_id.as_deref() {
            if type_id != sequence.document_type_id {
                return Err(CoreError::SequenceTypeMismatch {
                    sequence: sequence.name,
                    type_code: sequence.type_code,
                }
                .into());
            }
        }

        order.ncf_type_id = Some(sequence.document_type_id);
        order.ncf_sequence_id = Some(sequence.id);
        save_draft_fields(&self.pool, &order).await?;
        self.require(order_id).await
    }

    // =========================================================================
    // Payment
    // =========================================================================

    /// Picks the sequence a paid order issues from, updating the order's
    /// type and sequence fields.
    async fn resolve_sequence(
        &self,
        conn: &mut SqliteConnection,
        order: &mut PosOrder,
        today: NaiveDate,
    ) -> DbResult<String> {
        let Some(sequence_id) = order.ncf_sequence_id.clone() else {
            // Without a sequence the order always falls back to the consumer type
            let code = &self.settings.consumer_type_code;
            let doc_type = fetch_active_by_code(&mut *conn, code)
                .await?
                .ok_or_else(|| CoreError::NoSequenceAvailable {
                    type_code: code.clone(),
                })?;

            let candidates = fetch_for_type(&mut *conn, &doc_type.id).await?;
            let sequence = first_available(&candidates, &doc_type.id, today).ok_or_else(|| {
                CoreError::NoSequenceAvailable {
                    type_code: doc_type.code.clone(),
                }
            })?;

            debug!(
                order_id = %order.id,
                sequence_id = %sequence.id,
                type_code = %doc_type.code,
                "No sequence on order, using default"
            );

            let sequence_id = sequence.id.clone();
            order.ncf_type_id = Some(doc_type.id);
            order.ncf_sequence_id = Some(sequence_id.clone());
            return Ok(sequence_id);
        };

        let current = fetch_sequence(&mut *conn, &sequence_id)
            .await?
            .ok_or_else(|| DbError::not_found("NcfSequence", &sequence_id))?;
        let candidates = fetch_for_type(&mut *conn, &current.document_type_id).await?;

        let chosen = match choose_pos_sequence(&current, &candidates, today)? {
            PosSequenceChoice::Keep => sequence_id,
            PosSequenceChoice::SwitchTo {
                exhausted_id,
                sibling_id,
            } => {
                deactivate_on(&mut *conn, &exhausted_id).await?;
                warn!(
                    order_id = %order.id,
                    exhausted = %exhausted_id,
                    sibling = %sibling_id,
                    "NCF sequence spent, switched to sibling"
                );
                sibling_id
            }
        };

        order.ncf_type_id = Some(current.document_type_id);
        order.ncf_sequence_id = Some(chosen.clone());
        Ok(chosen)
    }

    /// Marks a draft order paid, issuing its NCF when it needs one.
    ///
    /// ## What This Does (single transaction)
    /// 1. If the order has no NCF and a positive total: resolves the
    ///    sequence (default type fallback, sibling rollover), checks the
    ///    RNC rule and issues the next number
    /// 2. Marks the order paid
    ///
    /// ## Errors
    /// - `NoSequenceAvailable` if no usable sequence exists for the type
    /// - `RncRequired` if the type needs a tax ID the order lacks
    ///
    /// On error the transaction rolls back, including any rollover
    /// deactivation.
    pub async fn mark_paid(&self, order_id: &str) -> DbResult<PosOrder> {
        let mut tx = self.pool.begin().await?;

        let mut order = fetch_order(&mut *tx, order_id)
            .await?
            .ok_or_else(|| DbError::not_found("PosOrder", order_id))?;
        ensure_state(&order, PosOrderState::Draft)?;

        if order.ncf_number.is_none() && order.amount_total().is_positive() {
            let today = today();
            let sequence_id = self.resolve_sequence(&mut *tx, &mut order, today).await?;

            if let Some(type_id) = order.ncf_type_id.as_deref() {
                if let Some(doc_type) = fetch_type(&mut *tx, type_id).await? {
                    validate_rnc_requirement(
                        &doc_type,
                        order.customer_rnc.as_deref(),
                        &self.settings,
                    )?;
                }
            }

            let number =
                issue_from(&mut *tx, &sequence_id, IssuedFor::PosOrder, &order.id, today).await?;
            order.ncf_number = Some(number.into_string());
        }

        let now = Utc::now();
        let result = sqlx::query(
            r#"
            UPDATE pos_orders SET
                state = 'paid',
                ncf_type_id = ?2,
                ncf_sequence_id = ?3,
                ncf_number = ?4,
                paid_at = ?5,
                updated_at = ?5
            WHERE id = ?1 AND state = 'draft'
            "#,
        )
        .bind(&order.id)
        .bind(&order.ncf_type_id)
        .bind(&order.ncf_sequence_id)
        .bind(&order.ncf_number)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::conflict("PosOrder", &order.id));
        }

        tx.commit().await?;

        order.state = PosOrderState::Paid;
        order.paid_at = Some(now);
        order.updated_at = now;

        info!(
            order_id = %order.id,
            total = %order.amount_total(),
            ncf = order.ncf_number.as_deref().unwrap_or("-"),
            "POS order paid"
        );

        Ok(order)
    }

    // =========================================================================
    // Invoicing
    // =========================================================================

    /// Creates a draft customer invoice from a paid order.
    ///
    /// The invoice carries the order's customer, tax ID, type and sequence
    /// and one line for the order total. It receives its own NCF when
    /// posted.
    pub async fn create_invoice(&self, order_id: &str) -> DbResult<Invoice> {
        let mut tx = self.pool.begin().await?;

        let order = fetch_order(&mut *tx, order_id)
            .await?
            .ok_or_else(|| DbError::not_found("PosOrder", order_id))?;
        ensure_state(&order, PosOrderState::Paid)?;

        let now = Utc::now();
        let invoice = Invoice {
            id: Uuid::new_v4().to_string(),
            kind: DocumentKind::OutInvoice,
            state: InvoiceState::Draft,
            customer_id: order.customer_id.clone(),
            customer_rnc: order.customer_rnc.clone(),
            ncf_type_id: order.ncf_type_id.clone(),
            ncf_sequence_id: order.ncf_sequence_id.clone(),
            ncf_number: None,
            itbis_cents: 0,
            created_at: now,
            updated_at: now,
            posted_at: None,
        };
        insert_draft_on(&mut *tx, &invoice).await?;

        let line = InvoiceLine {
            id: Uuid::new_v4().to_string(),
            invoice_id: invoice.id.clone(),
            description: format!("POS order {}", order.id),
            subtotal_cents: order.amount_total_cents,
            created_at: now,
        };
        insert_line_on(&mut *tx, &line, &[]).await?;

        let result = sqlx::query(
            r#"
            UPDATE pos_orders SET
                state = 'invoiced',
                invoice_id = ?2,
                updated_at = ?3
            WHERE id = ?1 AND state = 'paid'
            "#,
        )
        .bind(&order.id)
        .bind(&invoice.id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::conflict("PosOrder", &order.id));
        }

        tx.commit().await?;

        info!(order_id = %order.id, invoice_id = %invoice.id, "Invoice created from POS order");
        Ok(invoice)
    }
}
