//! # ncf-core: Pure Fiscal Rules for NCF Numbering
//!
//! This crate holds the Dominican Republic fiscal receipt rules (NCF:
//! Número de Comprobante Fiscal) as pure functions with zero I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        NCF Numbering Architecture                       │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │          Host lifecycle (invoice post, POS order paid)          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                ncf-db (transactions, repositories)              │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ ncf-core (THIS CRATE) ★                         │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │ numbering │  │ suggestion│  │   itbis   │  │ validation│  │   │
//! │  │   │ NcfNumber │  │ B01 / B02 │  │ tax total │  │ RNC rules │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain records (document types, sequences, invoices, POS orders)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`numbering`] - NCF formatting, parsing and sequence issuance
//! - [`suggestion`] - Default document type for a customer
//! - [`itbis`] - ITBIS (VAT) total over document lines
//! - [`validation`] - Tax ID and document type rules
//! - [`settings`] - Fiscal settings (type codes, ITBIS marker, RNC rule)
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use ncf_core::numbering::format_ncf;
//!
//! assert_eq!(format_ncf("B01", 42), "B0100000042");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod itbis;
pub mod money;
pub mod numbering;
pub mod settings;
pub mod suggestion;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use numbering::NcfNumber;
pub use settings::{FiscalSettings, RncRule};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Width of the zero-padded serial part of an NCF.
pub const NCF_SERIAL_WIDTH: usize = 8;

/// Code of the "Crédito Fiscal" document type (customer has an RNC).
pub const CREDIT_FISCAL_CODE: &str = "B01";

/// Code of the "Consumidor Final" document type (no RNC on file).
pub const FINAL_CONSUMER_CODE: &str = "B02";

/// Marker looked up (case-insensitively) in tax names to detect ITBIS.
pub const ITBIS_MARKER: &str = "ITBIS";

/// Standard ITBIS rate in basis points (18%).
pub const ITBIS_STANDARD_RATE_BPS: u32 = 1800;
