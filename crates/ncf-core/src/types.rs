//! # Domain Types
//!
//! Records shared by the fiscal rules and the database layer.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌──────────────────────┐        ┌──────────────────────┐              │
//! │  │ FiscalDocumentType   │ 1    * │    NcfSequence       │              │
//! │  │  ──────────────────  │◄───────│  ──────────────────  │              │
//! │  │  code ("B01")        │        │  start / end         │              │
//! │  │  name                │        │  current (cursor)    │              │
//! │  │  requires_rnc        │        │  is_active, expiry   │              │
//! │  └──────────────────────┘        └──────────▲───────────┘              │
//! │                                             │ chosen by                 │
//! │                       ┌─────────────────────┴──────────┐               │
//! │                       │                                │               │
//! │              ┌────────┴────────┐              ┌────────┴────────┐      │
//! │              │    Invoice      │              │    PosOrder     │      │
//! │              │  customer_rnc   │              │  customer_rnc   │      │
//! │              │  ncf_number     │              │  ncf_number     │      │
//! │              │  itbis_cents    │              │  amount_total   │      │
//! │              └─────────────────┘              └─────────────────┘      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every entity has a UUID v4 `id`; document types also carry their
//! business code.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// 1 basis point = 0.01%; 1800 bps = 18% (standard ITBIS).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }
}

// =============================================================================
// Fiscal Document Type
// =============================================================================

/// A fiscal document type (B01 Crédito Fiscal, B02 Consumidor Final, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct FiscalDocumentType {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// DGII code, e.g. "B01".
    pub code: String,

    /// Display name, e.g. "Crédito Fiscal".
    pub name: String,

    /// Whether documents of this type need the customer's RNC/cédula.
    pub requires_rnc: bool,

    /// Inactive types are hidden from selection.
    pub is_active: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// NCF Sequence
// =============================================================================

/// A bounded range of NCF serials authorised for one document type.
///
/// `current_number` is the next serial to hand out. The sequence is
/// exhausted once `current_number > end_number`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct NcfSequence {
    pub id: String,

    /// Owning document type.
    pub document_type_id: String,

    /// Code of the owning document type (joined, not stored).
    pub type_code: String,

    /// Display name, e.g. "B01 2026".
    pub name: String,

    pub start_number: i64,
    pub end_number: i64,

    /// Next serial to issue.
    pub current_number: i64,

    pub is_active: bool,

    /// Last day numbers from this range may be issued.
    #[ts(as = "Option<String>")]
    pub expiry_date: Option<NaiveDate>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl NcfSequence {
    /// True while the cursor has not passed the ending bound.
    #[inline]
    pub fn has_capacity(&self) -> bool {
        self.current_number <= self.end_number
    }

    /// Serials left in the range.
    pub fn remaining(&self) -> i64 {
        (self.end_number - self.current_number + 1).max(0)
    }

    /// True if the expiry date is set and lies before `today`.
    pub fn is_expired_on(&self, today: NaiveDate) -> bool {
        self.expiry_date.is_some_and(|expiry| expiry < today)
    }

    /// Active, not exhausted and not expired.
    pub fn is_usable_on(&self, today: NaiveDate) -> bool {
        self.is_active && self.has_capacity() && !self.is_expired_on(today)
    }
}

// =============================================================================
// Customer & Tax (host records)
// =============================================================================

/// A customer as seen by the fiscal rules.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Customer {
    pub id: String,
    pub name: String,

    /// RNC or cédula on file.
    pub vat: Option<String>,

    pub is_company: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Customer {
    /// The tax ID if one is on file (blank values count as missing).
    pub fn tax_id(&self) -> Option<&str> {
        self.vat.as_deref().map(str::trim).filter(|v| !v.is_empty())
    }
}

/// A tax that can be applied to document lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Tax {
    pub id: String,

    /// Display name, e.g. "ITBIS 18%".
    pub name: String,

    /// Rate in basis points.
    pub rate_bps: u32,
}

impl Tax {
    /// Returns the tax rate.
    #[inline]
    pub fn rate(&self) -> TaxRate {
        TaxRate::from_bps(self.rate_bps)
    }
}

// =============================================================================
// Document Kind & States
// =============================================================================

/// The kind of accounting document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    /// Customer invoice.
    OutInvoice,
    /// Customer credit note.
    OutRefund,
    /// Vendor bill.
    InInvoice,
    /// Vendor credit note.
    InRefund,
}

impl DocumentKind {
    /// Only customer-facing documents receive an NCF on posting.
    pub fn requires_ncf(&self) -> bool {
        matches!(self, DocumentKind::OutInvoice | DocumentKind::OutRefund)
    }
}

/// Invoice lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceState {
    /// Editable; NCF fields may change.
    #[default]
    Draft,
    /// Confirmed; NCF assigned (for customer documents).
    Posted,
}

/// POS order lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PosOrderState {
    #[default]
    Draft,
    Paid,
    /// An invoice was created from the order.
    Invoiced,
}

// =============================================================================
// Invoice
// =============================================================================

/// An accounting invoice carrying NCF fields.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Invoice {
    pub id: String,
    pub kind: DocumentKind,
    pub state: InvoiceState,
    pub customer_id: Option<String>,

    /// RNC/cédula copied from the customer or typed in.
    pub customer_rnc: Option<String>,

    pub ncf_type_id: Option<String>,
    pub ncf_sequence_id: Option<String>,

    /// Assigned once on posting, never changed afterwards.
    pub ncf_number: Option<String>,

    /// ITBIS total in centavos (recomputed when lines change).
    pub itbis_cents: i64,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub posted_at: Option<DateTime<Utc>>,
}

impl Invoice {
    /// Returns the ITBIS total as Money.
    #[inline]
    pub fn itbis(&self) -> Money {
        Money::from_cents(self.itbis_cents)
    }
}

/// A line of an invoice. Taxes are linked separately.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct InvoiceLine {
    pub id: String,
    pub invoice_id: String,
    pub description: String,

    /// Line subtotal before tax, in centavos.
    pub subtotal_cents: i64,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// POS Order
// =============================================================================

/// A point-of-sale order carrying NCF fields.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct PosOrder {
    pub id: String,
    pub state: PosOrderState,
    pub customer_id: Option<String>,
    pub customer_rnc: Option<String>,
    pub ncf_type_id: Option<String>,
    pub ncf_sequence_id: Option<String>,
    pub ncf_number: Option<String>,
    pub amount_total_cents: i64,

    /// Invoice created from this order, if any.
    pub invoice_id: Option<String>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub paid_at: Option<DateTime<Utc>>,
}

impl PosOrder {
    /// Returns the order total as Money.
    #[inline]
    pub fn amount_total(&self) -> Money {
        Money::from_cents(self.amount_total_cents)
    }
}

// =============================================================================
// Issuance Log
// =============================================================================

/// Which kind of document consumed an NCF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum IssuedFor {
    Invoice,
    PosOrder,
}

/// Audit row written for every issued NCF.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct IssuanceRecord {
    pub id: String,
    pub sequence_id: String,
    pub issued_for: IssuedFor,
    pub document_id: String,
    pub ncf_number: String,
    #[ts(as = "String")]
    pub issued_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Builds a sequence for tests in this crate.
    pub(crate) fn sequence(id: &str, type_code: &str, current: i64, end: i64) -> NcfSequence {
        let now = Utc::now();
        NcfSequence {
            id: id.to_string(),
            document_type_id: format!("type-{}", type_code),
            type_code: type_code.to_string(),
            name: format!("{} {}", type_code, id),
            start_number: 1,
            end_number: end,
            current_number: current,
            is_active: true,
            expiry_date: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_sequence_capacity() {
        let seq = sequence("s1", "B01", 500, 500);
        assert!(seq.has_capacity());
        assert_eq!(seq.remaining(), 1);

        let seq = sequence("s1", "B01", 501, 500);
        assert!(!seq.has_capacity());
        assert_eq!(seq.remaining(), 0);
    }

    #[test]
    fn test_sequence_expiry() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        let mut seq = sequence("s1", "B02", 1, 100);
        assert!(seq.is_usable_on(today));

        seq.expiry_date = NaiveDate::from_ymd_opt(2026, 10, 18);
        assert!(!seq.is_expired_on(today)); // last valid day

        seq.expiry_date = NaiveDate::from_ymd_opt(2026, 10, 17);
        assert!(seq.is_expired_on(today));
        assert!(!seq.is_usable_on(today));
    }

    #[test]
    fn test_customer_tax_id_blank_is_missing() {
        let mut customer = Customer {
            id: "c1".to_string(),
            name: "Colmado Pérez".to_string(),
            vat: Some("   ".to_string()),
            is_company: false,
            created_at: Utc::now(),
        };
        assert_eq!(customer.tax_id(), None);

        customer.vat = Some(" 101010101 ".to_string());
        assert_eq!(customer.tax_id(), Some("101010101"));
    }

    #[test]
    fn test_only_customer_documents_require_ncf() {
        assert!(DocumentKind::OutInvoice.requires_ncf());
        assert!(DocumentKind::OutRefund.requires_ncf());
        assert!(!DocumentKind::InInvoice.requires_ncf());
        assert!(!DocumentKind::InRefund.requires_ncf());
    }

    #[test]
    fn test_states_default_to_draft() {
        assert_eq!(InvoiceState::default(), InvoiceState::Draft);
        assert_eq!(PosOrderState::default(), PosOrderState::Draft);
    }
}
