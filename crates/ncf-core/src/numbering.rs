//! # NCF Numbering
//!
//! Formatting, parsing and issuance of NCF numbers.
//!
//! ## NCF Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │   B 01 00000042                                                         │
//! │   │ │  │                                                                │
//! │   │ │  └── serial: sequence cursor, zero-padded to 8 digits             │
//! │   │ └───── type digits                                                  │
//! │   └─────── series letter                                                │
//! │   └──┴──── together: the document type code ("B01")                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Issuance
//! ```text
//! Sequence B01, start 1, end 500, cursor 42
//!      │
//!      ▼
//! issue_next() ── cursor > end? ──► SequenceExhausted
//!      │
//!      ▼
//! "B0100000042", cursor becomes 43
//! ```
//!
//! The POS path adds a rollover: when the chosen sequence can no longer
//! issue, [`choose_pos_sequence`] picks a sibling of the same type.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::types::NcfSequence;
use crate::NCF_SERIAL_WIDTH;

/// Length of a document type code ("B01").
const TYPE_CODE_LEN: usize = 3;

// =============================================================================
// Formatting
// =============================================================================

/// Builds `<type_code><serial padded to 8 digits>`.
///
/// ## Example
/// ```rust
/// use ncf_core::numbering::format_ncf;
///
/// assert_eq!(format_ncf("B02", 1), "B0200000001");
/// ```
pub fn format_ncf(type_code: &str, serial: i64) -> String {
    format!("{}{:0width$}", type_code, serial, width = NCF_SERIAL_WIDTH)
}

// =============================================================================
// NcfNumber
// =============================================================================

/// A validated NCF, e.g. `B0100000042`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(try_from = "String", into = "String")]
#[ts(export, type = "string")]
pub struct NcfNumber(String);

impl NcfNumber {
    /// Parses and validates an NCF string.
    ///
    /// ## Rules
    /// - One uppercase ASCII letter followed by two digits (type code)
    /// - Exactly eight digits of serial
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        let value = value.trim();
        let expected_len = TYPE_CODE_LEN + NCF_SERIAL_WIDTH;

        if value.len() != expected_len {
            return Err(ValidationError::invalid_format(
                "ncf",
                format!("must be {} characters long", expected_len),
            ));
        }

        let bytes = value.as_bytes();
        if !bytes[0].is_ascii_uppercase() {
            return Err(ValidationError::invalid_format(
                "ncf",
                "must start with an uppercase series letter",
            ));
        }

        if !bytes[1..].iter().all(u8::is_ascii_digit) {
            return Err(ValidationError::invalid_format(
                "ncf",
                "type digits and serial must be numeric",
            ));
        }

        Ok(NcfNumber(value.to_string()))
    }

    /// The full NCF string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The document type code, e.g. "B01".
    pub fn type_code(&self) -> &str {
        &self.0[..TYPE_CODE_LEN]
    }

    /// The serial part as a number.
    pub fn serial(&self) -> i64 {
        // parse() guarantees eight ASCII digits
        self.0[TYPE_CODE_LEN..].parse().unwrap_or_default()
    }

    /// Consumes the value, returning the inner string.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for NcfNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for NcfNumber {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NcfNumber::parse(s)
    }
}

impl TryFrom<String> for NcfNumber {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        NcfNumber::parse(&value)
    }
}

impl From<NcfNumber> for String {
    fn from(value: NcfNumber) -> Self {
        value.0
    }
}

// =============================================================================
// Issuance
// =============================================================================

/// Checks that `sequence` may issue a number on `today`.
///
/// ## Errors
/// - `SequenceInactive` - the sequence was deactivated
/// - `SequenceExpired` - the expiry date has passed
/// - `SequenceExhausted` - the cursor is past the ending bound
pub fn ensure_can_issue(sequence: &NcfSequence, today: NaiveDate) -> CoreResult<()> {
    if !sequence.is_active {
        return Err(CoreError::SequenceInactive(sequence.name.clone()));
    }

    if let Some(expired_on) = sequence.expiry_date.filter(|_| sequence.is_expired_on(today)) {
        return Err(CoreError::SequenceExpired {
            sequence: sequence.name.clone(),
            expired_on,
        });
    }

    if !sequence.has_capacity() {
        return Err(CoreError::SequenceExhausted {
            sequence: sequence.name.clone(),
            end: sequence.end_number,
        });
    }

    Ok(())
}

/// Issues the next NCF from `sequence` and advances its cursor by one.
///
/// On error the sequence is left untouched.
///
/// ## Example
/// ```rust,ignore
/// let ncf = issue_next(&mut sequence, today)?;
/// assert_eq!(ncf.as_str(), "B0100000042");
/// assert_eq!(sequence.current_number, 43);
/// ```
pub fn issue_next(sequence: &mut NcfSequence, today: NaiveDate) -> CoreResult<NcfNumber> {
    ensure_can_issue(sequence, today)?;

    let number = NcfNumber::parse(&format_ncf(&sequence.type_code, sequence.current_number))?;
    sequence.current_number += 1;

    Ok(number)
}

// =============================================================================
// Sequence Selection
// =============================================================================

/// First sequence of `document_type_id` that can still issue on `today`.
///
/// `sequences` is expected in preference order (the store returns them in
/// creation order).
pub fn first_available<'a>(
    sequences: &'a [NcfSequence],
    document_type_id: &str,
    today: NaiveDate,
) -> Option<&'a NcfSequence> {
    sequences
        .iter()
        .find(|s| s.document_type_id == document_type_id && s.is_usable_on(today))
}

/// Outcome of the POS rollover check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PosSequenceChoice {
    /// The current sequence can issue.
    Keep,
    /// The current sequence is spent; issue from the sibling instead.
    SwitchTo {
        exhausted_id: String,
        sibling_id: String,
    },
}

/// Decides which sequence a paid POS order issues from.
///
/// If `current` cannot issue, the first usable sibling of the same type
/// (excluding `current` itself) is chosen.
///
/// ## Errors
/// `NoSequenceAvailable` when neither `current` nor any sibling can issue.
pub fn choose_pos_sequence(
    current: &NcfSequence,
    candidates: &[NcfSequence],
    today: NaiveDate,
) -> CoreResult<PosSequenceChoice> {
    if current.is_usable_on(today) {
        return Ok(PosSequenceChoice::Keep);
    }

    candidates
        .iter()
        .find(|s| {
            s.id != current.id
                && s.document_type_id == current.document_type_id
                && s.is_usable_on(today)
        })
        .map(|sibling| PosSequenceChoice::SwitchTo {
            exhausted_id: current.id.clone(),
            sibling_id: sibling.id.clone(),
        })
        .ok_or_else(|| CoreError::NoSequenceAvailable {
            type_code: current.type_code.clone(),
        })
}

// =============================================================================
// Unit Tests
// =============================================================================
