//! # ncf-db: Storage Layer for NCF Numbering
//!
//! SQLite persistence for fiscal document types, NCF sequences, invoices
//! and POS orders, with the transactional issuance that ties them together.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        NCF Data Flow                                    │
//! │                                                                         │
//! │  Caller (POS register, accounting UI, seed binary)                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     ncf-db (THIS CRATE)                         │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ InvoiceRepo   │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ PosOrderRepo  │    │ 001_init.sql │  │   │
//! │  │   │ FiscalSettings│    │ SequenceRepo  │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │           ▲                                                     │   │
//! │  │           │ AppConfig (config.rs: TOML + env)                   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`config`] - TOML and environment configuration
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ncf_db::{AppConfig, Database};
//!
//! let config = AppConfig::load(None)?;
//! let db = Database::new(config.db_config()?).await?;
//!
//! let invoice = db.invoices().create_draft(DocumentKind::OutInvoice).await?;
//! let onchange = db.invoices().change_customer(&invoice.id, Some(&customer_id)).await?;
//! let posted = db.invoices().post(&invoice.id).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::AppConfig;
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use repository::Onchange;

// Repository re-exports for convenience
pub use repository::customer::CustomerRepository;
pub use repository::document_type::DocumentTypeRepository;
pub use repository::invoice::InvoiceRepository;
pub use repository::pos_order::PosOrderRepository;
pub use repository::sequence::SequenceRepository;
pub use repository::tax::TaxRepository;
