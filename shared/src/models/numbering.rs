//! Numbering Models (计数器 / 重号检测 / 修复结果)

use super::document::{Document, DocumentType};
use serde::{Deserialize, Serialize};

/// Per-scope counter row
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct NumberingCounter {
    pub scope_key: String,
    /// Last issued sequence (never decreases)
    pub last_sequence: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// One document taking part in a duplicate group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct DuplicateMember {
    pub id: i64,
    pub created_at: i64,
}

/// `(scope_key, document_number)` pair identifying a duplicate group
///
/// Groups are scanned in ascending key order, so the last key seen doubles
/// as the resume cursor of an interrupted scan.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct DuplicateKey {
    pub scope_key: String,
    pub document_number: String,
}

/// Optional restriction of a scan / check / repair to part of the data
///
/// Every set field must match; an empty filter covers everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeFilter {
    pub store_id: Option<i64>,
    pub partner_id: Option<i64>,
    pub document_type: Option<DocumentType>,
    pub period_key: Option<String>,
    pub scope_key: Option<String>,
}

impl ScopeFilter {
    /// Filter on one exact scope key
    pub fn scope(scope_key: impl Into<String>) -> Self {
        Self {
            scope_key: Some(scope_key.into()),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// In-memory evaluation, same semantics as the SQL filter
    pub fn matches(&self, document: &Document) -> bool {
        self.store_id.is_none_or(|v| v == document.store_id)
            && self.partner_id.is_none_or(|v| Some(v) == document.partner_id)
            && self
                .document_type
                .is_none_or(|v| v == document.document_type)
            && self
                .period_key
                .as_deref()
                .is_none_or(|v| v == document.period_key)
            && self
                .scope_key
                .as_deref()
                .is_none_or(|v| v == document.scope_key)
    }
}

/// Live documents sharing one number inside one scope
///
/// `members` is ordered by `(created_at, id)` ascending; the first member is
/// the one a repair keeps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    pub scope_key: String,
    pub document_number: String,
    pub members: Vec<DuplicateMember>,
}

impl DuplicateGroup {
    /// Earliest member (authoritative holder of the number)
    pub fn earliest(&self) -> Option<&DuplicateMember> {
        self.members.first()
    }

    /// Every member after the earliest one
    pub fn later(&self) -> &[DuplicateMember] {
        self.members.get(1..).unwrap_or(&[])
    }
}

/// Renumber action, applied or planned
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenumberedDocument {
    pub id: i64,
    pub previous_number: String,
    /// `None` on dry runs
    pub new_number: Option<String>,
}

/// Member a repair could not act on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnresolvedMember {
    pub id: i64,
    pub reason: String,
}

/// Result of reconciling one duplicate group
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileOutcome {
    pub scope_key: String,
    pub document_number: String,
    pub dry_run: bool,
    /// Document that retains the number
    pub kept: Option<i64>,
    pub renumbered: Vec<RenumberedDocument>,
    pub removed: Vec<i64>,
    pub unresolved: Vec<UnresolvedMember>,
}

impl ReconcileOutcome {
    pub fn is_clean(&self) -> bool {
        self.unresolved.is_empty()
    }
}

/// Totals over a whole repair run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairSummary {
    pub dry_run: bool,
    pub groups: usize,
    pub kept: usize,
    pub renumbered: usize,
    pub removed: usize,
    pub unresolved: usize,
    /// Per-group detail
    pub outcomes: Vec<ReconcileOutcome>,
}

impl RepairSummary {
    /// Fold one group outcome into the totals
    pub fn absorb(&mut self, outcome: ReconcileOutcome) {
        self.groups += 1;
        if outcome.kept.is_some() {
            self.kept += 1;
        }
        self.renumbered += outcome.renumbered.len();
        self.removed += outcome.removed.len();
        self.unresolved += outcome.unresolved.len();
        self.outcomes.push(outcome);
    }
}

/// Presence / correctness of one uniqueness index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStatus {
    pub name: String,
    pub present: bool,
    /// Present with the expected unique, partial definition
    pub correct: bool,
    /// Definition as stored by the database, when present
    pub definition: Option<String>,
}

/// Diagnostic report: guard indexes and duplicate counts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckReport {
    pub indexes: Vec<IndexStatus>,
    pub duplicate_groups: usize,
    /// Documents taking part in any duplicate group
    pub duplicate_documents: usize,
}

impl CheckReport {
    pub fn indexes_ok(&self) -> bool {
        self.indexes.iter().all(|i| i.present && i.correct)
    }
}

/// Repair action kind as recorded in the audit log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum RepairActionKind {
    Renumber,
    Remove,
}

/// Audit row written for every applied repair action
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct RepairLogEntry {
    pub id: i64,
    pub document_id: i64,
    pub scope_key: String,
    pub action: RepairActionKind,
    pub previous_number: String,
    pub new_number: Option<String>,
    pub operator: Option<String>,
    pub created_at: i64,
}
