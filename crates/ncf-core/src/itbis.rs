//! # ITBIS Total
//!
//! ITBIS (Impuesto sobre Transferencias de Bienes Industrializados y
//! Servicios) is the Dominican VAT. A document's ITBIS amount is the sum,
//! over its lines, of `subtotal × rate` for each tax recognised as ITBIS.
//!
//! A tax counts as ITBIS when either:
//! - its name contains the marker (default "ITBIS"), compared uppercased, or
//! - its rate equals the standard rate (default 18%).
//!
//! Other taxes on the line (ISC, tips, ...) are ignored.

use crate::money::Money;
use crate::settings::FiscalSettings;
use crate::types::Tax;

/// One document line as seen by the ITBIS calculation.
#[derive(Debug, Clone)]
pub struct DocumentLine {
    /// Line subtotal before tax.
    pub subtotal: Money,
    /// Taxes applied to the line.
    pub taxes: Vec<Tax>,
}

impl DocumentLine {
    pub fn new(subtotal: Money, taxes: Vec<Tax>) -> Self {
        DocumentLine { subtotal, taxes }
    }
}

/// True if `tax` is an ITBIS tax under `settings`.
pub fn is_itbis_tax(tax: &Tax, settings: &FiscalSettings) -> bool {
    let marker = settings.itbis_marker.to_uppercase();
    (!marker.is_empty() && tax.name.to_uppercase().contains(&marker))
        || tax.rate_bps == settings.itbis_standard_rate_bps
}

/// ITBIS for a single line.
pub fn line_itbis(line: &DocumentLine, settings: &FiscalSettings) -> Money {
    line.taxes
        .iter()
        .filter(|tax| is_itbis_tax(tax, settings))
        .map(|tax| line.subtotal.calculate_tax(tax.rate()))
        .sum()
}

/// Total ITBIS over all lines of a document.
///
/// ## Example
/// ```rust
/// use ncf_core::itbis::{compute_itbis, DocumentLine};
/// use ncf_core::money::Money;
/// use ncf_core::settings::FiscalSettings;
/// use ncf_core::types::Tax;
///
/// let itbis = Tax { id: "t1".into(), name: "ITBIS 18%".into(), rate_bps: 1800 };
/// let lines = vec![DocumentLine::new(Money::from_pesos(100), vec![itbis])];
///
/// assert_eq!(compute_itbis(&lines, &FiscalSettings::default()).cents(), 1800);
/// ```
pub fn compute_itbis(lines: &[DocumentLine], settings: &FiscalSettings) -> Money {
    lines.iter().map(|line| line_itbis(line, settings)).sum()
}
