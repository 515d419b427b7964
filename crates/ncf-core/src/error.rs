//! # Error Types
//!
//! Domain-specific error types for ncf-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  ncf-core errors (this file)                                           │
//! │  ├── CoreError        - Fiscal rule violations                         │
//! │  └── ValidationError  - Input format failures                          │
//! │                                                                         │
//! │  ncf-db errors (separate crate)                                        │
//! │  └── DbError          - Database operation failures (wraps CoreError)  │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → caller                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every `CoreError` aborts the triggering user action. None of them are
//! retried; the document has to be corrected before trying again.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Fiscal rule errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A number was requested but the document has no sequence.
    ///
    /// ## When This Occurs
    /// - Posting a customer invoice before choosing a type/sequence
    /// - The type-change handler found no usable sequence and cleared it
    #[error("No NCF sequence selected; choose an NCF type and sequence first")]
    NoSequenceSelected,

    /// The sequence cursor is past its ending bound.
    ///
    /// ## User Workflow
    /// ```text
    /// Post invoice (sequence B01 1..=500, cursor 501)
    ///      │
    ///      ▼
    /// SequenceExhausted { sequence: "B01 1-500", end: 500 }
    ///      │
    ///      ▼
    /// UI shows: "NCF sequence B01 1-500 has reached its limit (500)"
    /// ```
    #[error("NCF sequence {sequence} has reached its limit ({end})")]
    SequenceExhausted { sequence: String, end: i64 },

    /// The sequence expiry date has passed.
    #[error("NCF sequence {sequence} expired on {expired_on}")]
    SequenceExpired {
        sequence: String,
        expired_on: chrono::NaiveDate,
    },

    /// The sequence was deactivated.
    #[error("NCF sequence {0} is not active")]
    SequenceInactive(String),

    /// No active sequence with capacity exists for a document type.
    ///
    /// ## When This Occurs
    /// - POS payment on an exhausted sequence with no sibling left
    /// - POS payment with no default (final consumer) sequence configured
    #[error("No NCF sequences available for type {type_code}")]
    NoSequenceAvailable { type_code: String },

    /// The chosen sequence belongs to a different document type.
    #[error("NCF sequence {sequence} does not belong to type {type_code}")]
    SequenceTypeMismatch { sequence: String, type_code: String },

    /// The document type requires the customer's RNC/cédula.
    #[error("NCF type {type_name} requires the customer's RNC/cédula")]
    RncRequired { type_name: String },

    /// The document is not in a state that allows the requested operation.
    #[error("Document {document_id} is {current_state}, cannot perform operation")]
    InvalidDocumentState {
        document_id: String,
        current_state: String,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before fiscal rules run.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Invalid format (e.g., invalid NCF, invalid RNC).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

impl ValidationError {
    pub(crate) fn invalid_format(field: &str, reason: impl Into<String>) -> Self {
        ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
