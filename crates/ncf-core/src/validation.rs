//! # Validation Module
//!
//! Input and fiscal rule validation for NCF documents.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Format (this module, ValidationError)                        │
//! │  ├── Type codes ("B01"), RNC / cédula digits and check digit           │
//! │  └── Sequence ranges, names, ids                                       │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Fiscal rules (this module, CoreError)                        │
//! │  └── Document type requires a tax ID                                   │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── UNIQUE (type code, issued NCF)                                    │
//! │  └── Foreign keys, CHECK on sequence bounds                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use ncf_core::validation::{normalize_rnc, validate_type_code};
//!
//! validate_type_code("B01").unwrap();
//! assert_eq!(normalize_rnc("402-1234567-8").unwrap(), "40212345678");
//! ```

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::settings::{FiscalSettings, RncRule};
use crate::types::FiscalDocumentType;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Highest serial an 8-digit NCF can carry.
pub const MAX_NCF_SERIAL: i64 = 99_999_999;

/// Length of a company RNC.
pub const RNC_LENGTH: usize = 9;

/// Length of a personal cédula.
pub const CEDULA_LENGTH: usize = 11;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a document type code: one uppercase letter and two digits.
///
/// ## Example
/// ```rust
/// use ncf_core::validation::validate_type_code;
///
/// assert!(validate_type_code("B14").is_ok());
/// assert!(validate_type_code("b01").is_err());
/// assert!(validate_type_code("B1").is_err());
/// ```
pub fn validate_type_code(code: &str) -> ValidationResult<()> {
    if code.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "code".to_string(),
        });
    }

    let bytes = code.as_bytes();
    let well_formed = bytes.len() == 3
        && bytes[0].is_ascii_uppercase()
        && bytes[1..].iter().all(u8::is_ascii_digit);

    if !well_formed {
        return Err(ValidationError::invalid_format(
            "code",
            "must be an uppercase letter followed by two digits",
        ));
    }

    Ok(())
}

/// Validates a display name (type, sequence, customer).
pub fn validate_name(field: &str, name: &str, max: usize) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if name.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

// =============================================================================
// Tax ID (RNC / Cédula)
// =============================================================================

/// Check digit of an 11-digit cédula (Luhn-style, weights 1,2,1,2,...).
fn cedula_check_digit(digits: &[u8]) -> u8 {
    let sum: u32 = digits
        .iter()
        .take(CEDULA_LENGTH - 1)
        .enumerate()
        .map(|(i, d)| {
            let product = (d - b'0') as u32 * if i % 2 == 0 { 1 } else { 2 };
            if product > 9 {
                product / 10 + product % 10
            } else {
                product
            }
        })
        .sum();

    ((10 - sum % 10) % 10) as u8
}

/// Cleans and validates an RNC or cédula, returning digits only.
///
/// ## Rules
/// - Spaces and dashes are stripped
/// - 9 digits: company RNC (format only)
/// - 11 digits: cédula, last digit must match the check digit
///
/// ## Example
/// ```rust
/// use ncf_core::validation::normalize_rnc;
///
/// assert_eq!(normalize_rnc(" 1-01-01010-1 ").unwrap(), "101010101");
/// assert!(normalize_rnc("001-0000000-1").is_err()); // wrong check digit
/// assert!(normalize_rnc("12345").is_err());
/// ```
pub fn normalize_rnc(raw: &str) -> ValidationResult<String> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect();

    if cleaned.is_empty() {
        return Err(ValidationError::Required {
            field: "rnc".to_string(),
        });
    }

    if !cleaned.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::invalid_format(
            "rnc",
            "must contain only digits",
        ));
    }

    match cleaned.len() {
        RNC_LENGTH => Ok(cleaned),
        CEDULA_LENGTH => {
            let digits = cleaned.as_bytes();
            let expected = cedula_check_digit(digits);
            if digits[CEDULA_LENGTH - 1] - b'0' != expected {
                return Err(ValidationError::invalid_format(
                    "rnc",
                    "cédula check digit does not match",
                ));
            }
            Ok(cleaned)
        }
        _ => Err(ValidationError::invalid_format(
            "rnc",
            "must have 9 (RNC) or 11 (cédula) digits",
        )),
    }
}

/// True if the document type needs a tax ID under the configured rule.
pub fn rnc_required(document_type: &FiscalDocumentType, settings: &FiscalSettings) -> bool {
    match settings.rnc_rule {
        RncRule::TypeFlag => document_type.requires_rnc,
        RncRule::TypeFlagOrStrictCodes => {
            document_type.requires_rnc || settings.is_strict_code(&document_type.code)
        }
    }
}

/// Rejects a document whose type needs a tax ID it does not carry.
///
/// Blank values count as missing.
pub fn validate_rnc_requirement(
    document_type: &FiscalDocumentType,
    customer_rnc: Option<&str>,
    settings: &FiscalSettings,
) -> CoreResult<()> {
    let has_rnc = customer_rnc.is_some_and(|rnc| !rnc.trim().is_empty());

    if !has_rnc && rnc_required(document_type, settings) {
        return Err(CoreError::RncRequired {
            type_name: document_type.name.clone(),
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates the bounds and cursor of a sequence.
///
/// ## Rules
/// - `1 <= start <= end <= 99_999_999`
/// - `start <= current <= end + 1` (`end + 1` means exhausted)
pub fn validate_sequence_range(start: i64, end: i64, current: i64) -> ValidationResult<()> {
    if start < 1 || start > MAX_NCF_SERIAL {
        return Err(ValidationError::OutOfRange {
            field: "start_number".to_string(),
            min: 1,
            max: MAX_NCF_SERIAL,
        });
    }

    if end < start || end > MAX_NCF_SERIAL {
        return Err(ValidationError::OutOfRange {
            field: "end_number".to_string(),
            min: start,
            max: MAX_NCF_SERIAL,
        });
    }

    if current < start || current > end + 1 {
        return Err(ValidationError::OutOfRange {
            field: "current_number".to_string(),
            min: start,
            max: end + 1,
        });
    }

    Ok(())
}

/// Validates a tax rate in basis points (0% to 100%).
pub fn validate_tax_rate_bps(bps: u32) -> ValidationResult<()> {
    if bps > 10000 {
        return Err(ValidationError::OutOfRange {
            field: "tax_rate".to_string(),
            min: 0,
            max: 10000,
        });
    }

    Ok(())
}

/// Validates a non-negative amount in centavos.
pub fn validate_amount_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn doc_type(code: &str, requires_rnc: bool) -> FiscalDocumentType {
        FiscalDocumentType {
            id: format!("type-{}", code),
            code: code.to_string(),
            name: format!("Tipo {}", code),
            requires_rnc,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_validate_type_code() {
        assert!(validate_type_code("B01").is_ok());
        assert!(validate_type_code("E31").is_ok());

        assert!(validate_type_code("").is_err());
        assert!(validate_type_code("B001").is_err());
        assert!(validate_type_code("BB1").is_err());
        assert!(validate_type_code("b01").is_err());
    }

    #[test]
    fn test_normalize_rnc() {
        assert_eq!(normalize_rnc("101010101").unwrap(), "101010101");
        assert_eq!(normalize_rnc("001-0000000-9").unwrap(), "00100000009");
        assert_eq!(normalize_rnc("402 1234567 8").unwrap(), "40212345678");

        assert!(normalize_rnc("").is_err());
        assert!(normalize_rnc("ABC123456").is_err());
        assert!(normalize_rnc("1234567890").is_err());
        assert!(normalize_rnc("40212345670").is_err());
    }

    #[test]
    fn test_rnc_required_by_type_flag() {
        let settings = FiscalSettings::default();
        let b01 = doc_type("B01", true);

        assert!(validate_rnc_requirement(&b01, Some("101010101"), &settings).is_ok());

        let err = validate_rnc_requirement(&b01, None, &settings).unwrap_err();
        assert!(matches!(err, CoreError::RncRequired { .. }));
        assert!(validate_rnc_requirement(&b01, Some("  "), &settings).is_err());
    }

    #[test]
    fn test_rnc_rule_variants() {
        // B14 without the flag
        let b14 = doc_type("B14", false);
        let b02 = doc_type("B02", false);

        let flag_only = FiscalSettings::default();
        assert!(validate_rnc_requirement(&b14, None, &flag_only).is_ok());

        let strict = FiscalSettings {
            rnc_rule: RncRule::TypeFlagOrStrictCodes,
            ..FiscalSettings::default()
        };
        assert!(validate_rnc_requirement(&b14, None, &strict).is_err());
        assert!(validate_rnc_requirement(&b02, None, &strict).is_ok());
    }

    #[test]
    fn test_validate_sequence_range() {
        assert!(validate_sequence_range(1, 1000, 1).is_ok());
        assert!(validate_sequence_range(1, 1000, 1001).is_ok()); // exhausted

        assert!(validate_sequence_range(0, 1000, 1).is_err());
        assert!(validate_sequence_range(10, 5, 10).is_err());
        assert!(validate_sequence_range(1, 100_000_000, 1).is_err());
        assert!(validate_sequence_range(1, 1000, 1002).is_err());
        assert!(validate_sequence_range(5, 1000, 4).is_err());
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("name", "Crédito Fiscal", 100).is_ok());
        assert!(validate_name("name", "  ", 100).is_err());
        assert!(validate_name("name", &"A".repeat(101), 100).is_err());
    }

    #[test]
    fn test_validate_tax_rate_and_amount() {
        assert!(validate_tax_rate_bps(1800).is_ok());
        assert!(validate_tax_rate_bps(10001).is_err());
        assert!(validate_amount_cents("amount_total", 0).is_ok());
        assert!(validate_amount_cents("amount_total", -1).is_err());
    }
}
