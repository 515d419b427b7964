//! # Invoice Repository
//!
//! Invoices, their lines, and the NCF assigned on posting.
//!
//! ## Invoice Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Invoice Lifecycle                                 │
//! │                                                                         │
//! │  1. CREATE DRAFT                                                       │
//! │     └── create_draft(kind) → Invoice { state: Draft }                  │
//! │                                                                         │
//! │  2. EDIT (draft only)                                                  │
//! │     ├── change_customer()      → RNC copied, B01/B02 suggested,        │
//! │     │                            first usable sequence selected        │
//! │     ├── change_document_type() → sequence re-selected or cleared       │
//! │     ├── set_customer_rnc() / set_sequence()                            │
//! │     └── add_line()             → ITBIS recomputed                      │
//! │                                                                         │
//! │  3. POST (one transaction)                                             │
//! │     ├── RNC rule checked against the type                              │
//! │     ├── out_invoice / out_refund without NCF → issue from sequence     │
//! │     └── Invoice { state: Posted, ncf_number: "B0100000001" }           │
//! │                                                                         │
//! │  Posted invoices never change their NCF.                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use ncf_core::itbis::{compute_itbis, DocumentLine};
use ncf_core::suggestion::suggest_for_customer;
use ncf_core::validation::{normalize_rnc, validate_name, validate_rnc_requirement};
use ncf_core::{
    CoreError, DocumentKind, FiscalSettings, Invoice, InvoiceLine, InvoiceState, IssuedFor, Money,
    Tax,
};
use sqlx::{Executor, Sqlite, SqliteConnection, SqlitePool};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use super::customer::fetch_customer;
use super::document_type::fetch_type;
use super::sequence::{fetch_sequence, issue_from};
use super::{choose_type, choose_type_by_code, today, Onchange};
use crate::error::{DbError, DbResult};

const SELECT_INVOICE: &str = r#"
    SELECT
        id, kind, state, customer_id, customer_rnc,
        ncf_type_id, ncf_sequence_id, ncf_number, itbis_cents,
        created_at, updated_at, posted_at
    FROM invoices
"#;

/// Fetches an invoice by ID.
pub(crate) async fn fetch_invoice<'c, E>(executor: E, id: &str) -> DbResult<Option<Invoice>>
where
    E: Executor<'c, Database = Sqlite>,
{
    let sql = format!("{} WHERE id = ?1", SELECT_INVOICE);
    let invoice = sqlx::query_as::<_, Invoice>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?;
    Ok(invoice)
}

fn ensure_draft(invoice: &Invoice) -> DbResult<()> {
    if invoice.state != InvoiceState::Draft {
        return Err(CoreError::InvalidDocumentState {
            document_id: invoice.id.clone(),
            current_state: format!("{:?}", invoice.state).to_lowercase(),
        }
        .into());
    }
    Ok(())
}

/// Writes the draft-editable NCF fields of an invoice.
async fn save_ncf_fields<'c, E>(executor: E, invoice: &Invoice) -> DbResult<()>
where
    E: Executor<'c, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        UPDATE invoices SET
            customer_id = ?2,
            customer_rnc = ?3,
            ncf_type_id = ?4,
            ncf_sequence_id = ?5,
            updated_at = ?6
        WHERE id = ?1 AND state = 'draft'
        "#,
    )
    .bind(&invoice.id)
    .bind(&invoice.customer_id)
    .bind(&invoice.customer_rnc)
    .bind(&invoice.ncf_type_id)
    .bind(&invoice.ncf_sequence_id)
    .bind(Utc::now())
    .execute(executor)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Invoice (draft)", &invoice.id));
    }

    Ok(())
}

/// Inserts a draft invoice carrying the given NCF fields.
pub(crate) async fn insert_draft_on(
    conn: &mut SqliteConnection,
    invoice: &Invoice,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO invoices (
            id, kind, state, customer_id, customer_rnc,
            ncf_type_id, ncf_sequence_id, ncf_number, itbis_cents,
            created_at, updated_at, posted_at
        ) VALUES (?1, ?2, 'draft', ?3, ?4, ?5, ?6, NULL, ?7, ?8, ?9, NULL)
        "#,
    )
    .bind(&invoice.id)
    .bind(invoice.kind)
    .bind(&invoice.customer_id)
    .bind(&invoice.customer_rnc)
    .bind(&invoice.ncf_type_id)
    .bind(&invoice.ncf_sequence_id)
    .bind(invoice.itbis_cents)
    .bind(invoice.created_at)
    .bind(invoice.updated_at)
    .execute(conn)
    .await?;

    Ok(())
}

/// Inserts a line and links its taxes.
pub(crate) async fn insert_line_on(
    conn: &mut SqliteConnection,
    line: &InvoiceLine,
    tax_ids: &[&str],
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO invoice_lines (id, invoice_id, description, subtotal_cents, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
    )
    .bind(&line.id)
    .bind(&line.invoice_id)
    .bind(&line.description)
    .bind(line.subtotal_cents)
    .bind(line.created_at)
    .execute(&mut *conn)
    .await?;

    for tax_id in tax_ids {
        sqlx::query("INSERT INTO invoice_line_taxes (line_id, tax_id) VALUES (?1, ?2)")
            .bind(&line.id)
            .bind(*tax_id)
            .execute(&mut *conn)
            .await?;
    }

    Ok(())
}

/// Loads the lines of an invoice with their taxes.
async fn document_lines(conn: &mut SqliteConnection, invoice_id: &str) -> DbResult<Vec<DocumentLine>> {
    let lines: Vec<(String, i64)> = sqlx::query_as(
        "SELECT id, subtotal_cents FROM invoice_lines WHERE invoice_id = ?1 ORDER BY rowid",
    )
    .bind(invoice_id)
    .fetch_all(&mut *conn)
    .await?;

    let line_taxes: Vec<(String, String, String, u32)> = sqlx::query_as(
        r#"
        SELECT lt.line_id, t.id, t.name, t.rate_bps
        FROM invoice_line_taxes lt
        JOIN taxes t ON t.id = lt.tax_id
        JOIN invoice_lines l ON l.id = lt.line_id
        WHERE l.invoice_id = ?1
        "#,
    )
    .bind(invoice_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(lines
        .into_iter()
        .map(|(line_id, subtotal_cents)| {
            let taxes = line_taxes
                .iter()
                .filter(|(tax_line_id, ..)| *tax_line_id == line_id)
                .map(|(_, id, name, rate_bps)| Tax {
                    id: id.clone(),
                    name: name.clone(),
                    rate_bps: *rate_bps,
                })
                .collect();
            DocumentLine::new(Money::from_cents(subtotal_cents), taxes)
        })
        .collect())
}

/// Repository for invoice database operations.
#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    pool: SqlitePool,
    settings: Arc<FiscalSettings>,
}

impl InvoiceRepository {
    /// Creates a new InvoiceRepository.
    pub fn new(pool: SqlitePool, settings: Arc<FiscalSettings>) -> Self {
        InvoiceRepository { pool, settings }
    }

    /// Gets an invoice by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Invoice>> {
        fetch_invoice(&self.pool, id).await
    }

    async fn require(&self, id: &str) -> DbResult<Invoice> {
        fetch_invoice(&self.pool, id)
            .await?
            .ok_or_else(|| DbError::not_found("Invoice", id))
    }

    async fn require_draft(&self, id: &str) -> DbResult<Invoice> {
        let invoice = self.require(id).await?;
        ensure_draft(&invoice)?;
        Ok(invoice)
    }

    /// Creates an empty draft invoice.
    pub async fn create_draft(&self, kind: DocumentKind) -> DbResult<Invoice> {
        let now = Utc::now();
        let invoice = Invoice {
            id: Uuid::new_v4().to_string(),
            kind,
            state: InvoiceState::Draft,
            customer_id: None,
            customer_rnc: None,
            ncf_type_id: None,
            ncf_sequence_id: None,
            ncf_number: None,
            itbis_cents: 0,
            created_at: now,
            updated_at: now,
            posted_at: None,
        };

        debug!(id = %invoice.id, kind = ?kind, "Creating draft invoice");

        let mut conn = self.pool.acquire().await?;
        insert_draft_on(&mut *conn, &invoice).await?;

        Ok(invoice)
    }

    // =========================================================================
    // Lines & ITBIS
    // =========================================================================

    /// Adds a line to a draft invoice and recomputes its ITBIS.
    ///
    /// ## Returns
    /// The created line. The invoice's `itbis_cents` is updated in the same
    /// transaction.
    pub async fn add_line(
        &self,
        invoice_id: &str,
        description: &str,
        subtotal: Money,
        tax_ids: &[&str],
    ) -> DbResult<InvoiceLine> {
        validate_name("description", description, 500)?;

        let mut tx = self.pool.begin().await?;

        let invoice = fetch_invoice(&mut *tx, invoice_id)
            .await?
            .ok_or_else(|| DbError::not_found("Invoice", invoice_id))?;
        ensure_draft(&invoice)?;

        let line = InvoiceLine {
            id: Uuid::new_v4().to_string(),
            invoice_id: invoice_id.to_string(),
            description: description.trim().to_string(),
            subtotal_cents: subtotal.cents(),
            created_at: Utc::now(),
        };

        insert_line_on(&mut *tx, &line, tax_ids).await?;

        let itbis = self.recompute_itbis(&mut *tx, invoice_id).await?;
        tx.commit().await?;

        debug!(invoice_id = %invoice_id, itbis = %itbis, "Invoice line added");
        Ok(line)
    }

    async fn recompute_itbis(&self, conn: &mut SqliteConnection, invoice_id: &str) -> DbResult<Money> {
        let lines = document_lines(&mut *conn, invoice_id).await?;
        let itbis = compute_itbis(&lines, &self.settings);

        sqlx::query("UPDATE invoices SET itbis_cents = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(invoice_id)
            .bind(itbis.cents())
            .bind(Utc::now())
            .execute(&mut *conn)
            .await?;

        Ok(itbis)
    }

    /// Gets all lines of an invoice.
    pub async fn lines(&self, invoice_id: &str) -> DbResult<Vec<InvoiceLine>> {
        let lines = sqlx::query_as::<_, InvoiceLine>(
            r#"
            SELECT id, invoice_id, description, subtotal_cents, created_at
            FROM invoice_lines
            WHERE invoice_id = ?1
            ORDER BY rowid
            "#,
        )
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(lines)
    }

    // =========================================================================
    // Draft Onchange Handlers
    // =========================================================================

    /// Sets the customer and runs the suggestion chain.
    ///
    /// With a customer: the tax ID is copied, B01 or B02 is suggested and
    /// its first usable sequence selected. Clearing the customer leaves the
    /// NCF fields as they are.
    pub async fn change_customer(
        &self,
        invoice_id: &str,
        customer_id: Option<&str>,
    ) -> DbResult<Onchange<Invoice>> {
        let mut invoice = self.require_draft(invoice_id).await?;

        let Some(customer_id) = customer_id else {
            invoice.customer_id = None;
            save_ncf_fields(&self.pool, &invoice).await?;
            return Ok(Onchange::new(self.require(invoice_id).await?, None));
        };

        let customer = fetch_customer(&self.pool, customer_id)
            .await?
            .ok_or_else(|| DbError::not_found("Customer", customer_id))?;

        let suggestion = suggest_for_customer(Some(&customer), &self.settings);
        let choice = choose_type_by_code(&self.pool, &suggestion.type_code).await?;

        invoice.customer_id = Some(customer.id);
        invoice.customer_rnc = suggestion.customer_rnc;
        invoice.ncf_type_id = choice.type_id;
        invoice.ncf_sequence_id = choice.sequence_id;
        save_ncf_fields(&self.pool, &invoice).await?;

        debug!(
            invoice_id = %invoice_id,
            type_code = %suggestion.type_code,
            "Invoice customer changed"
        );

        Ok(Onchange::new(self.require(invoice_id).await?, choice.warning))
    }

    /// Sets the document type and auto-selects its sequence.
    ///
    /// `None` clears both. A type whose RNC rule the invoice breaks is
    /// rejected.
    pub async fn change_document_type(
        &self,
        invoice_id: &str,
        type_id: Option<&str>,
    ) -> DbResult<Onchange<Invoice>> {
        let mut invoice = self.require_draft(invoice_id).await?;

        if let Some(type_id) = type_id {
            let doc_type = fetch_type(&self.pool, type_id)
                .await?
                .ok_or_else(|| DbError::not_found("FiscalDocumentType", type_id))?;
            validate_rnc_requirement(&doc_type, invoice.customer_rnc.as_deref(), &self.settings)?;
        }

        let choice = choose_type(&self.pool, type_id.map(str::to_string)).await?;
        invoice.ncf_type_id = choice.type_id;
        invoice.ncf_sequence_id = choice.sequence_id;
        save_ncf_fields(&self.pool, &invoice).await?;

        Ok(Onchange::new(self.require(invoice_id).await?, choice.warning))
    }

    /// Sets (or clears) the customer tax ID, validating its format.
    pub async fn set_customer_rnc(&self, invoice_id: &str, rnc: Option<&str>) -> DbResult<Invoice> {
        let mut invoice = self.require_draft(invoice_id).await?;

        invoice.customer_rnc = match rnc.map(str::trim).filter(|r| !r.is_empty()) {
            Some(raw) => Some(normalize_rnc(raw)?),
            None => None,
        };

        if let Some(type_id) = invoice.ncf_type_id.as_deref() {
            if let Some(doc_type) = fetch_type(&self.pool, type_id).await? {
                validate_rnc_requirement(
                    &doc_type,
                    invoice.customer_rnc.as_deref(),
                    &self.settings,
                )?;
            }
        }

        save_ncf_fields(&self.pool, &invoice).await?;
        self.require(invoice_id).await
    }

    /// Selects a specific sequence. It must belong to the invoice's type;
    /// an invoice without a type takes the sequence's type.
    pub async fn set_sequence(&self, invoice_id: &str, sequence_id: &str) -> DbResult<Invoice> {
        let mut invoice = self.require_draft(invoice_id).await?;

        let sequence = fetch_sequence(&self.pool, sequence_id)
            .await?
            .ok_or_else(|| DbError::not_found("NcfSequence", sequence_id))?;

        match invoice.ncf_type_id.as_deref() {
            Some(type_id) if type_id != sequence.document_type_id => {
                return Err(CoreError::SequenceTypeMismatch {
                    sequence: sequence.name,
                    type_code: sequence.type_code,
                }
                .into());
            }
            Some(_) => {}
            None => invoice.ncf_type_id = Some(sequence.document_type_id.clone()),
        }

        invoice.ncf_sequence_id = Some(sequence.id);
        save_ncf_fields(&self.pool, &invoice).await?;
        self.require(invoice_id).await
    }

    // =========================================================================
    // Posting
    // =========================================================================

    /// Posts a draft invoice, issuing its NCF when it needs one.
    ///
    /// ## What This Does (single transaction)
    /// 1. Checks the RNC rule of the chosen type
    /// 2. For `out_invoice` / `out_refund` without an NCF: issues the next
    ///    number from the chosen sequence
    /// 3. Marks the invoice posted
    ///
    /// ## Errors
    /// - `NoSequenceSelected` if a number is needed and no sequence is chosen
    /// - `SequenceExhausted` / `SequenceExpired` / `SequenceInactive`
    /// - `RncRequired` if the type needs a tax ID the invoice lacks
    ///
    /// On any error nothing is written: no number is consumed.
    pub async fn post(&self, invoice_id: &str) -> DbResult<Invoice> {
        let mut tx = self.pool.begin().await?;

        let mut invoice = fetch_invoice(&mut *tx, invoice_id)
            .await?
            .ok_or_else(|| DbError::not_found("Invoice", invoice_id))?;
        ensure_draft(&invoice)?;

        if let Some(type_id) = invoice.ncf_type_id.as_deref() {
            let doc_type = fetch_type(&mut *tx, type_id)
                .await?
                .ok_or_else(|| DbError::not_found("FiscalDocumentType", type_id))?;
            validate_rnc_requirement(&doc_type, invoice.customer_rnc.as_deref(), &self.settings)?;
        }

        if invoice.kind.requires_ncf() && invoice.ncf_number.is_none() {
            let sequence_id = invoice
                .ncf_sequence_id
                .clone()
                .ok_or(CoreError::NoSequenceSelected)?;

            let number = issue_from(
                &mut *tx,
                &sequence_id,
                IssuedFor::Invoice,
                &invoice.id,
                today(),
            )
            .await?;
            invoice.ncf_number = Some(number.into_string());
        }

        let now = Utc::now();
        let result = sqlx::query(
            r#"
            UPDATE invoices SET
                state = 'posted',
                ncf_number = ?2,
                posted_at = ?3,
                updated_at = ?3
            WHERE id = ?1 AND state = 'draft'
            "#,
        )
        .bind(&invoice.id)
        .bind(&invoice.ncf_number)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::conflict("Invoice", &invoice.id));
        }

        tx.commit().await?;

        invoice.state = InvoiceState::Posted;
        invoice.posted_at = Some(now);
        invoice.updated_at = now;

        info!(
            invoice_id = %invoice.id,
            ncf = invoice.ncf_number.as_deref().unwrap_or("-"),
            "Invoice posted"
        );

        Ok(invoice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::repository::test_support::{customer, sequence, standard_types, test_db};
    use ncf_core::RncRule;

    #[tokio::test]
    async fn test_post_issues_next_number() {
        let db = test_db().await;
        let (b01, _) = standard_types(&db).await;
        let seq = sequence(&db, &b01, 1, 1000).await;
        let client = customer(&db, Some("101010101")).await;
        let repo = db.invoices();

        let invoice = repo.create_draft(DocumentKind::OutInvoice).await.unwrap();
        repo.change_customer(&invoice.id, Some(&client.id)).await.unwrap();

        let posted = repo.post(&invoice.id).await.unwrap();
        assert_eq!(posted.state, InvoiceState::Posted);
        assert_eq!(posted.ncf_number.as_deref(), Some("B0100000001"));

        let seq = db.sequences().get_by_id(&seq.id).await.unwrap().unwrap();
        assert_eq!(seq.current_number, 2);
    }

    #[tokio::test]
    async fn test_customer_change_suggests_type_and_sequence() {
        let db = test_db().await;
        let (b01, b02) = standard_types(&db).await;
        let b01_seq = sequence(&db, &b01, 1, 100).await;
        let b02_seq = sequence(&db, &b02, 1, 100).await;
        let company = customer(&db, Some("101010101")).await;
        let consumer = customer(&db, None).await;
        let repo = db.invoices();

        let invoice = repo.create_draft(DocumentKind::OutInvoice).await.unwrap();

        let changed = repo.change_customer(&invoice.id, Some(&company.id)).await.unwrap();
        assert!(changed.warning.is_none());
        assert_eq!(changed.document.customer_rnc.as_deref(), Some("101010101"));
        assert_eq!(changed.document.ncf_type_id.as_deref(), Some(b01.id.as_str()));
        assert_eq!(changed.document.ncf_sequence_id.as_deref(), Some(b01_seq.id.as_str()));

        let changed = repo.change_customer(&invoice.id, Some(&consumer.id)).await.unwrap();
        assert_eq!(changed.document.customer_rnc, None);
        assert_eq!(changed.document.ncf_type_id.as_deref(), Some(b02.id.as_str()));
        assert_eq!(changed.document.ncf_sequence_id.as_deref(), Some(b02_seq.id.as_str()));
    }

    #[tokio::test]
    async fn test_type_without_sequences_warns_and_clears() {
        let db = test_db().await;
        let (_, b02) = standard_types(&db).await;
        let repo = db.invoices();

        let invoice = repo.create_draft(DocumentKind::OutInvoice).await.unwrap();
        let changed = repo
            .change_document_type(&invoice.id, Some(&b02.id))
            .await
            .unwrap();

        assert_eq!(changed.document.ncf_type_id.as_deref(), Some(b02.id.as_str()));
        assert!(changed.document.ncf_sequence_id.is_none());
        assert!(changed.warning.is_some());

        let err = repo.post(&invoice.id).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Fiscal(CoreError::NoSequenceSelected)
        ));
    }

    #[tokio::test]
    async fn test_post_on_exhausted_sequence_consumes_nothing() {
        let db = test_db().await;
        let (_, b02) = standard_types(&db).await;
        let seq = sequence(&db, &b02, 1, 1).await;
        let repo = db.invoices();

        let first = repo.create_draft(DocumentKind::OutInvoice).await.unwrap();
        repo.set_sequence(&first.id, &seq.id).await.unwrap();
        repo.post(&first.id).await.unwrap();

        let second = repo.create_draft(DocumentKind::OutInvoice).await.unwrap();
        repo.set_sequence(&second.id, &seq.id).await.unwrap();
        let err = repo.post(&second.id).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Fiscal(CoreError::SequenceExhausted { .. })
        ));

        let second = repo.get_by_id(&second.id).await.unwrap().unwrap();
        assert_eq!(second.state, InvoiceState::Draft);
        assert!(second.ncf_number.is_none());
    }

    #[tokio::test]
    async fn test_rnc_required_blocks_posting() {
        let db = test_db().await;
        let (b01, _) = standard_types(&db).await;
        let seq = sequence(&db, &b01, 1, 10).await;
        let repo = db.invoices();

        let invoice = repo.create_draft(DocumentKind::OutInvoice).await.unwrap();
        repo.set_sequence(&invoice.id, &seq.id).await.unwrap();

        let err = repo.post(&invoice.id).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Fiscal(CoreError::RncRequired { .. })
        ));

        repo.set_customer_rnc(&invoice.id, Some("1-01-01010-1"))
            .await
            .unwrap();
        let posted = repo.post(&invoice.id).await.unwrap();
        assert_eq!(posted.ncf_number.as_deref(), Some("B0100000001"));
    }

    #[tokio::test]
    async fn test_type_requiring_rnc_rejected_without_one() {
        let db = test_db().await;
        let (b01, _) = standard_types(&db).await;
        let repo = db.invoices();

        let invoice = repo.create_draft(DocumentKind::OutInvoice).await.unwrap();
        let err = repo
            .change_document_type(&invoice.id, Some(&b01.id))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Fiscal(CoreError::RncRequired { .. })
        ));
    }

    #[tokio::test]
    async fn test_strict_codes_require_rnc_despite_type_flag() {
        let strict = FiscalSettings {
            rnc_rule: RncRule::TypeFlagOrStrictCodes,
            ..FiscalSettings::default()
        };
        let db = Database::new(DbConfig::in_memory().fiscal(strict)).await.unwrap();
        let b14 = db
            .document_types()
            .insert("B14", "Regímenes Especiales", false)
            .await
            .unwrap();
        let seq = sequence(&db, &b14, 1, 10).await;
        let repo = db.invoices();

        let invoice = repo.create_draft(DocumentKind::OutInvoice).await.unwrap();
        let err = repo
            .change_document_type(&invoice.id, Some(&b14.id))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Fiscal(CoreError::RncRequired { .. })));

        repo.set_sequence(&invoice.id, &seq.id).await.unwrap();
        let err = repo.post(&invoice.id).await.unwrap_err();
        assert!(matches!(err, DbError::Fiscal(CoreError::RncRequired { .. })));

        let seq_after = db.sequences().get_by_id(&seq.id).await.unwrap().unwrap();
        assert_eq!(seq_after.current_number, 1);

        repo.set_customer_rnc(&invoice.id, Some("101010101")).await.unwrap();
        let posted = repo.post(&invoice.id).await.unwrap();
        assert_eq!(posted.ncf_number.as_deref(), Some("B1400000001"));
    }

    #[tokio::test]
    async fn test_type_flag_rule_ignores_strict_codes() {
        let db = test_db().await;
        let b14 = db
            .document_types()
            .insert("B14", "Regímenes Especiales", false)
            .await
            .unwrap();
        let seq = sequence(&db, &b14, 1, 10).await;
        let repo = db.invoices();

        let invoice = repo.create_draft(DocumentKind::OutInvoice).await.unwrap();
        repo.set_sequence(&invoice.id, &seq.id).await.unwrap();
        let posted = repo.post(&invoice.id).await.unwrap();
        assert_eq!(posted.ncf_number.as_deref(), Some("B1400000001"));
    }

    #[tokio::test]
    async fn test_vendor_bill_posts_without_ncf() {
        let db = test_db().await;
        let repo = db.invoices();

        let bill = repo.create_draft(DocumentKind::InInvoice).await.unwrap();
        let posted = repo.post(&bill.id).await.unwrap();

        assert_eq!(posted.state, InvoiceState::Posted);
        assert!(posted.ncf_number.is_none());
    }

    #[tokio::test]
    async fn test_posted_invoice_is_immutable() {
        let db = test_db().await;
        let (_, b02) = standard_types(&db).await;
        let seq = sequence(&db, &b02, 1, 10).await;
        let repo = db.invoices();

        let invoice = repo.create_draft(DocumentKind::OutRefund).await.unwrap();
        repo.set_sequence(&invoice.id, &seq.id).await.unwrap();
        repo.post(&invoice.id).await.unwrap();

        let err = repo.post(&invoice.id).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Fiscal(CoreError::InvalidDocumentState { .. })
        ));
        assert!(repo.set_customer_rnc(&invoice.id, None).await.is_err());

        let seq = db.sequences().get_by_id(&seq.id).await.unwrap().unwrap();
        assert_eq!(seq.current_number, 2);
    }

    #[tokio::test]
    async fn test_sequence_of_other_type_rejected() {
        let db = test_db().await;
        let (b01, b02) = standard_types(&db).await;
        let b01_seq = sequence(&db, &b01, 1, 10).await;
        sequence(&db, &b02, 1, 10).await;
        let repo = db.invoices();

        let invoice = repo.create_draft(DocumentKind::OutInvoice).await.unwrap();
        repo.change_document_type(&invoice.id, Some(&b02.id))
            .await
            .unwrap();

        let err = repo.set_sequence(&invoice.id, &b01_seq.id).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Fiscal(CoreError::SequenceTypeMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn test_lines_recompute_itbis() {
        let db = test_db().await;
        let repo = db.invoices();
        let standard = db.taxes().insert("Impuesto 18%", 1800).await.unwrap();
        let reduced = db.taxes().insert("Reducido 16%", 1600).await.unwrap();

        let invoice = repo.create_draft(DocumentKind::OutInvoice).await.unwrap();
        repo.add_line(&invoice.id, "Cemento", Money::from_pesos(100), &[standard.id.as_str()])
            .await
            .unwrap();
        repo.add_line(&invoice.id, "Varilla", Money::from_pesos(200), &[standard.id.as_str()])
            .await
            .unwrap();
        repo.add_line(&invoice.id, "Yogur", Money::from_pesos(50), &[reduced.id.as_str()])
            .await
            .unwrap();

        let invoice = repo.get_by_id(&invoice.id).await.unwrap().unwrap();
        assert_eq!(invoice.itbis(), Money::from_pesos(54));
        assert_eq!(repo.lines(&invoice.id).await.unwrap().len(), 3);
    }
}
