//! # Fiscal Settings
//!
//! The knobs the fiscal rules read: which type codes to suggest, how ITBIS
//! is recognised, and which RNC rule guards saving a document.
//!
//! The struct is plain data so it can be embedded in the `[fiscal]` table of
//! the application config file (loaded by ncf-db):
//!
//! ```toml
//! [fiscal]
//! credit_type_code = "B01"
//! consumer_type_code = "B02"
//! itbis_marker = "ITBIS"
//! itbis_standard_rate_bps = 1800
//! rnc_rule = "type_flag_or_strict_codes"
//! strict_rnc_codes = ["B01", "B14", "B15"]
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::{CREDIT_FISCAL_CODE, FINAL_CONSUMER_CODE, ITBIS_MARKER, ITBIS_STANDARD_RATE_BPS};

/// How the tax ID requirement is enforced when a document is saved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum RncRule {
    /// Only the type's `requires_rnc` flag decides.
    #[default]
    TypeFlag,
    /// The flag, plus the strict codes always need a tax ID.
    TypeFlagOrStrictCodes,
}

impl std::str::FromStr for RncRule {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "type_flag" | "flag" => Ok(RncRule::TypeFlag),
            "type_flag_or_strict_codes" | "strict" => Ok(RncRule::TypeFlagOrStrictCodes),
            other => Err(format!(
                "Unknown RNC rule: '{}'. Valid options: type_flag, type_flag_or_strict_codes",
                other
            )),
        }
    }
}

fn default_credit_type_code() -> String {
    CREDIT_FISCAL_CODE.to_string()
}

fn default_consumer_type_code() -> String {
    FINAL_CONSUMER_CODE.to_string()
}

fn default_itbis_marker() -> String {
    ITBIS_MARKER.to_string()
}

fn default_itbis_rate() -> u32 {
    ITBIS_STANDARD_RATE_BPS
}

fn default_strict_codes() -> Vec<String> {
    vec!["B01".to_string(), "B14".to_string(), "B15".to_string()]
}

/// Fiscal settings used by suggestion, ITBIS and validation rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct FiscalSettings {
    /// Suggested when the customer has a tax ID.
    #[serde(default = "default_credit_type_code")]
    pub credit_type_code: String,

    /// Suggested when there is no tax ID, and the POS fallback type.
    #[serde(default = "default_consumer_type_code")]
    pub consumer_type_code: String,

    /// Substring (case-insensitive) identifying ITBIS taxes by name.
    #[serde(default = "default_itbis_marker")]
    pub itbis_marker: String,

    /// Rate identifying ITBIS taxes by value.
    #[serde(default = "default_itbis_rate")]
    pub itbis_standard_rate_bps: u32,

    #[serde(default)]
    pub rnc_rule: RncRule,

    /// Codes that need a tax ID under `RncRule::TypeFlagOrStrictCodes`.
    #[serde(default = "default_strict_codes")]
    pub strict_rnc_codes: Vec<String>,
}

impl Default for FiscalSettings {
    fn default() -> Self {
        FiscalSettings {
            credit_type_code: default_credit_type_code(),
            consumer_type_code: default_consumer_type_code(),
            itbis_marker: default_itbis_marker(),
            itbis_standard_rate_bps: default_itbis_rate(),
            rnc_rule: RncRule::default(),
            strict_rnc_codes: default_strict_codes(),
        }
    }
}

impl FiscalSettings {
    /// True if `code` is one of the strict codes.
    pub fn is_strict_code(&self, code: &str) -> bool {
        self.strict_rnc_codes.iter().any(|c| c == code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = FiscalSettings::default();
        assert_eq!(settings.credit_type_code, "B01");
        assert_eq!(settings.consumer_type_code, "B02");
        assert_eq!(settings.itbis_standard_rate_bps, 1800);
        assert_eq!(settings.rnc_rule, RncRule::TypeFlag);
        assert!(settings.is_strict_code("B14"));
        assert!(!settings.is_strict_code("B02"));
    }

    #[test]
    fn test_rnc_rule_parsing() {
        assert_eq!("type_flag".parse::<RncRule>().unwrap(), RncRule::TypeFlag);
        assert_eq!(
            "STRICT".parse::<RncRule>().unwrap(),
            RncRule::TypeFlagOrStrictCodes
        );
        assert!("other".parse::<RncRule>().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let settings: FiscalSettings =
            serde_json::from_str(r#"{ "rnc_rule": "type_flag_or_strict_codes" }"#).unwrap();
        assert_eq!(settings.rnc_rule, RncRule::TypeFlagOrStrictCodes);
        assert_eq!(settings.consumer_type_code, "B02");
        assert_eq!(settings.strict_rnc_codes.len(), 3);
    }
}
