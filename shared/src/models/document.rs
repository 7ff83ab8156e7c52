//! Numbered Document Model (采购单 / 采购退货单)

use serde::{Deserialize, Serialize};

/// Kind of numbered business document
///
/// The prefix is the first segment of every document number of that kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum DocumentType {
    /// Purchase order, confirmed with a supplier (`PO`)
    PurchaseOrder,
    /// Goods returned to a supplier (`PR`)
    PurchaseReturn,
}

impl DocumentType {
    pub const ALL: [DocumentType; 2] = [DocumentType::PurchaseOrder, DocumentType::PurchaseReturn];

    /// Number prefix for this document type
    pub const fn prefix(&self) -> &'static str {
        match self {
            Self::PurchaseOrder => "PO",
            Self::PurchaseReturn => "PR",
        }
    }

    /// Reverse lookup from a number prefix
    pub fn from_prefix(prefix: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.prefix() == prefix)
    }

    /// Stored / wire name (`PURCHASE_ORDER`)
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::PurchaseOrder => "PURCHASE_ORDER",
            Self::PurchaseReturn => "PURCHASE_RETURN",
        }
    }
}

impl std::fmt::Display for DocumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DocumentType {
    type Err = String;

    /// Accepts the stored name (`PURCHASE_RETURN`), the number prefix (`PR`)
    /// or the short aliases `order` / `return`, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        match upper.as_str() {
            "PURCHASE_ORDER" | "PO" | "ORDER" => Ok(Self::PurchaseOrder),
            "PURCHASE_RETURN" | "PR" | "RETURN" => Ok(Self::PurchaseReturn),
            _ => Err(format!("Unknown document type: {s}")),
        }
    }
}

/// One already-parsed line of a purchase document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentLine {
    pub description: String,
    pub quantity: f64,
    pub unit_price: f64,
}

/// Numbered document entity
///
/// `document_number` is assigned once at creation. Only the repair path
/// rewrites it; `removed_at` marks documents retired by a repair.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Document {
    pub id: i64,
    pub document_type: DocumentType,
    pub store_id: i64,
    /// Supplier / trading partner; `None` on legacy rows
    pub partner_id: Option<i64>,
    /// Numbering period (YYYYMM)
    pub period_key: String,
    /// Canonical scope key the number was issued under
    pub scope_key: String,
    pub document_number: String,
    /// JSON array of line items
    #[cfg_attr(feature = "db", sqlx(json))]
    pub lines: Vec<DocumentLine>,
    pub note: Option<String>,
    /// Creation time (Unix millis)
    pub created_at: i64,
    pub updated_at: i64,
    /// Soft-delete time (Unix millis), set only by a repair
    pub removed_at: Option<i64>,
}

impl Document {
    pub fn is_removed(&self) -> bool {
        self.removed_at.is_some()
    }
}

/// Create document payload (confirm purchase order / create purchase return)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentCreate {
    pub store_id: i64,
    pub partner_id: Option<i64>,
    /// Numbering period (YYYYMM); defaults to the current UTC month
    pub period_key: Option<String>,
    #[serde(default)]
    pub lines: Vec<DocumentLine>,
    pub note: Option<String>,
}
