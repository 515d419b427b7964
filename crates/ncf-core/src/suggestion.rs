//! # Default Suggestions
//!
//! What a draft document gets when its customer or its NCF type changes.
//!
//! ```text
//! customer changes ──► copy tax ID ──► tax ID? ──yes──► B01 (Crédito Fiscal)
//!                                          │
//!                                          └──no───► B02 (Consumidor Final)
//!
//! type changes ──► first usable sequence of that type, or none + warning
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::numbering::first_available;
use crate::settings::FiscalSettings;
use crate::types::{Customer, NcfSequence};

/// Warning returned when a type has no usable sequence.
pub const NO_SEQUENCE_WARNING: &str = "No NCF sequences available for the selected type";

/// Result of a customer change on a draft document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TypeSuggestion {
    /// Tax ID to store on the document (None clears it).
    pub customer_rnc: Option<String>,
    /// Code of the suggested document type.
    pub type_code: String,
}

/// Picks the document type code for a tax ID.
///
/// ## Example
/// ```rust
/// use ncf_core::settings::FiscalSettings;
/// use ncf_core::suggestion::suggest_type_code;
///
/// let settings = FiscalSettings::default();
/// assert_eq!(suggest_type_code(Some("101010101"), &settings), "B01");
/// assert_eq!(suggest_type_code(None, &settings), "B02");
/// assert_eq!(suggest_type_code(Some("  "), &settings), "B02");
/// ```
pub fn suggest_type_code<'a>(customer_rnc: Option<&str>, settings: &'a FiscalSettings) -> &'a str {
    match customer_rnc.map(str::trim) {
        Some(rnc) if !rnc.is_empty() => &settings.credit_type_code,
        _ => &settings.consumer_type_code,
    }
}

/// Suggestion for a document whose customer changed.
///
/// `None` (walk-in customer) yields the final-consumer type with no tax ID.
pub fn suggest_for_customer(customer: Option<&Customer>, settings: &FiscalSettings) -> TypeSuggestion {
    let customer_rnc = customer.and_then(Customer::tax_id).map(str::to_string);
    let type_code = suggest_type_code(customer_rnc.as_deref(), settings).to_string();

    TypeSuggestion {
        customer_rnc,
        type_code,
    }
}

/// Result of a document type change on a draft document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SequenceSelection {
    /// Sequence to store on the document (None clears it).
    pub sequence_id: Option<String>,
    /// Shown to the user when no sequence could be selected.
    pub warning: Option<String>,
}

/// Auto-selects the first usable sequence for a newly chosen type.
pub fn select_sequence_for_type(
    sequences: &[NcfSequence],
    document_type_id: &str,
    today: NaiveDate,
) -> SequenceSelection {
    match first_available(sequences, document_type_id, today) {
        Some(sequence) => SequenceSelection {
            sequence_id: Some(sequence.id.clone()),
            warning: None,
        },
        None => SequenceSelection {
            sequence_id: None,
            warning: Some(NO_SEQUENCE_WARNING.to_string()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::tests::sequence;
    use chrono::Utc;

    fn customer(vat: Option<&str>) -> Customer {
        Customer {
            id: "c1".to_string(),
            name: "Ferretería Ochoa".to_string(),
            vat: vat.map(str::to_string),
            is_company: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_customer_with_rnc_gets_credit_type() {
        let settings = FiscalSettings::default();
        let suggestion = suggest_for_customer(Some(&customer(Some("101010101"))), &settings);

        assert_eq!(suggestion.type_code, "B01");
        assert_eq!(suggestion.customer_rnc.as_deref(), Some("101010101"));
    }

    #[test]
    fn test_customer_without_rnc_gets_final_consumer() {
        let settings = FiscalSettings::default();

        let suggestion = suggest_for_customer(Some(&customer(None)), &settings);
        assert_eq!(suggestion.type_code, "B02");
        assert_eq!(suggestion.customer_rnc, None);

        let suggestion = suggest_for_customer(None, &settings);
        assert_eq!(suggestion.type_code, "B02");
    }

    #[test]
    fn test_custom_codes_are_honoured() {
        let settings = FiscalSettings {
            credit_type_code: "E31".to_string(),
            consumer_type_code: "E32".to_string(),
            ..FiscalSettings::default()
        };
        assert_eq!(suggest_type_code(Some("101010101"), &settings), "E31");
        assert_eq!(suggest_type_code(None, &settings), "E32");
    }

    #[test]
    fn test_type_change_selects_first_usable_sequence() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        let sequences = vec![sequence("spent", "B01", 11, 10), sequence("ok", "B01", 1, 10)];

        let selection = select_sequence_for_type(&sequences, "type-B01", today);
        assert_eq!(selection.sequence_id.as_deref(), Some("ok"));
        assert!(selection.warning.is_none());

        let selection = select_sequence_for_type(&sequences, "type-B02", today);
        assert!(selection.sequence_id.is_none());
        assert_eq!(selection.warning.as_deref(), Some(NO_SEQUENCE_WARNING));
    }
}
