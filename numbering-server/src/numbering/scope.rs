//! Numbering scope (编号作用域)
//!
//! A scope is the set of documents sharing one sequence:
//! store, trading partner, document type and period.

use super::error::{NumberingError, NumberingResult};
use chrono::{DateTime, Datelike, Utc};
use shared::models::{Document, DocumentType};
use std::fmt;

/// Placeholder partner segment of scopes without a partner
const NO_PARTNER: &str = "*";

/// `YYYY` + `MM`, month 01..=12
pub(crate) fn is_valid_period(value: &str) -> bool {
    if value.len() != 6 || !value.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    matches!(value[4..].parse::<u32>(), Ok(1..=12))
}

/// Validated numbering period (`YYYYMM`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeriodKey(String);

impl PeriodKey {
    pub fn parse(value: &str) -> NumberingResult<Self> {
        let value = value.trim();
        if !is_valid_period(value) {
            return Err(NumberingError::InvalidScope(format!(
                "period_key must be YYYYMM, got {value:?}"
            )));
        }
        Ok(Self(value.to_string()))
    }

    /// Period (UTC month) containing a Unix-millis timestamp
    pub fn from_millis(millis: i64) -> Self {
        let at = DateTime::<Utc>::from_timestamp_millis(millis).unwrap_or_default();
        Self(format!("{:04}{:02}", at.year(), at.month()))
    }

    pub fn current() -> Self {
        Self::from_millis(shared::util::now_millis())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Numbering scope; immutable once built
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Scope {
    store_id: i64,
    partner_id: Option<i64>,
    document_type: DocumentType,
    period_key: PeriodKey,
}

impl Scope {
    pub fn new(
        store_id: i64,
        partner_id: Option<i64>,
        document_type: DocumentType,
        period_key: PeriodKey,
    ) -> NumberingResult<Self> {
        if store_id <= 0 {
            return Err(NumberingError::InvalidScope(format!(
                "store_id must be positive, got {store_id}"
            )));
        }
        if let Some(partner_id) = partner_id
            && partner_id <= 0
        {
            return Err(NumberingError::InvalidScope(format!(
                "partner_id must be positive, got {partner_id}"
            )));
        }
        Ok(Self {
            store_id,
            partner_id,
            document_type,
            period_key,
        })
    }

    /// Scope an existing document was numbered under
    pub fn of_document(document: &Document) -> NumberingResult<Self> {
        Self::new(
            document.store_id,
            document.partner_id,
            document.document_type,
            PeriodKey::parse(&document.period_key)?,
        )
    }

    pub fn store_id(&self) -> i64 {
        self.store_id
    }

    pub fn partner_id(&self) -> Option<i64> {
        self.partner_id
    }

    pub fn document_type(&self) -> DocumentType {
        self.document_type
    }

    pub fn period_key(&self) -> &PeriodKey {
        &self.period_key
    }

    pub fn prefix(&self) -> &'static str {
        self.document_type.prefix()
    }

    /// Canonical key, e.g. `1:7:PR:202510` or `1:*:PO:202510`
    pub fn key(&self) -> String {
        let partner = self
            .partner_id
            .map(|p| p.to_string())
            .unwrap_or_else(|| NO_PARTNER.to_string());
        format!(
            "{}:{}:{}:{}",
            self.store_id,
            partner,
            self.prefix(),
            self.period_key
        )
    }

    /// Inverse of [`Scope::key`]
    pub fn parse_key(key: &str) -> NumberingResult<Self> {
        let invalid = || NumberingError::InvalidScope(format!("malformed scope key {key:?}"));
        let parts: Vec<&str> = key.split(':').collect();
        let [store, partner, prefix, period] = parts.as_slice() else {
            return Err(invalid());
        };
        let store_id = store.parse::<i64>().map_err(|_| invalid())?;
        let partner_id = match *partner {
            NO_PARTNER => None,
            p => Some(p.parse::<i64>().map_err(|_| invalid())?),
        };
        let document_type = DocumentType::from_prefix(prefix).ok_or_else(invalid)?;
        Self::new(store_id, partner_id, document_type, PeriodKey::parse(period)?)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn period(value: &str) -> PeriodKey {
        PeriodKey::parse(value).unwrap()
    }

    #[test]
    fn test_key_with_and_without_partner() {
        let scope = Scope::new(1, Some(7), DocumentType::PurchaseReturn, period("202510")).unwrap();
        assert_eq!(scope.key(), "1:7:PR:202510");

        let scope = Scope::new(3, None, DocumentType::PurchaseOrder, period("202601")).unwrap();
        assert_eq!(scope.key(), "3:*:PO:202601");
    }

    #[test]
    fn test_parse_key_inverts_key() {
        let scope = Scope::new(12, Some(40), DocumentType::PurchaseOrder, period("202412")).unwrap();
        assert_eq!(Scope::parse_key(&scope.key()).unwrap(), scope);
        assert!(Scope::parse_key("1:7:PR").is_err());
        assert!(Scope::parse_key("1:7:XX:202510").is_err());
        assert!(Scope::parse_key("x:7:PR:202510").is_err());
    }

    #[test]
    fn test_rejects_non_positive_ids() {
        let err = Scope::new(0, None, DocumentType::PurchaseOrder, period("202510")).unwrap_err();
        assert!(matches!(err, NumberingError::InvalidScope(_)));

        let err =
            Scope::new(1, Some(-2), DocumentType::PurchaseOrder, period("202510")).unwrap_err();
        assert!(matches!(err, NumberingError::InvalidScope(_)));
    }

    #[test]
    fn test_period_validation() {
        assert!(PeriodKey::parse("202510").is_ok());
        assert!(PeriodKey::parse("202513").is_err());
        assert!(PeriodKey::parse("202500").is_err());
        assert!(PeriodKey::parse("2025-10").is_err());
        assert!(PeriodKey::parse("").is_err());
    }

    #[test]
    fn test_period_from_millis() {
        // 2025-10-15T08:00:00Z
        assert_eq!(PeriodKey::from_millis(1_760_515_200_000).as_str(), "202510");
        assert_eq!(PeriodKey::from_millis(0).as_str(), "197001");
    }
}
