//! Reconciler (重号修复)
//!
//! Resolves one duplicate group: the earliest member keeps the number, every
//! later member is renumbered through the [`Allocator`] or soft-deleted.
//! Failures are isolated per member and reported, never swallowed.

use super::allocator::Allocator;
use super::error::{NumberingError, NumberingResult};
use super::store::NumberingStore;
use crate::db::repository::repair_log::NewRepairLog;
use serde::{Deserialize, Serialize};
use shared::models::{
    DuplicateGroup, DuplicateMember, ReconcileOutcome, RenumberedDocument, RepairActionKind,
    UnresolvedMember,
};
use std::sync::Arc;

/// What happens to the later members of a group
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum RepairAction {
    #[default]
    Renumber,
    /// Soft-delete; only for documents known to be erroneous
    Delete { operator: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcilePolicy {
    pub action: RepairAction,
    /// Report intended actions without writing
    pub dry_run: bool,
}

impl ReconcilePolicy {
    pub fn renumber() -> Self {
        Self::default()
    }

    pub fn delete(operator: impl Into<String>) -> Self {
        Self {
            action: RepairAction::Delete {
                operator: operator.into(),
            },
            dry_run: false,
        }
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    fn operator(&self) -> Option<String> {
        match &self.action {
            RepairAction::Renumber => None,
            RepairAction::Delete { operator } => Some(operator.clone()),
        }
    }
}

#[derive(Clone)]
pub struct Reconciler {
    store: Arc<dyn NumberingStore>,
    allocator: Allocator,
}

impl Reconciler {
    pub fn new(store: Arc<dyn NumberingStore>, allocator: Allocator) -> Self {
        Self { store, allocator }
    }

    /// Reconcile one group against its current state
    ///
    /// The group's members are re-read first; a group that no longer holds
    /// two live documents is reported with its survivor kept and left alone.
    /// An error is returned only when that read fails, in which case nothing
    /// was changed.
    pub async fn reconcile(
        &self,
        group: &DuplicateGroup,
        policy: &ReconcilePolicy,
    ) -> NumberingResult<ReconcileOutcome> {
        if let RepairAction::Delete { operator } = &policy.action
            && operator.trim().is_empty()
        {
            return Err(NumberingError::InvalidPolicy(
                "delete repairs require an operator".into(),
            ));
        }

        let members = self
            .store
            .group_members(&group.scope_key, &group.document_number)
            .await?;

        let mut outcome = ReconcileOutcome {
            scope_key: group.scope_key.clone(),
            document_number: group.document_number.clone(),
            dry_run: policy.dry_run,
            kept: members.first().map(|m| m.id),
            ..Default::default()
        };

        let Some((_, later)) = members.split_first() else {
            return Ok(outcome);
        };
        if later.is_empty() {
            tracing::info!(
                scope_key = %group.scope_key,
                document_number = %group.document_number,
                "Duplicate group already resolved"
            );
            return Ok(outcome);
        }

        for member in later {
            if policy.dry_run {
                self.plan(member, group, policy, &mut outcome);
                continue;
            }
            let result = match &policy.action {
                RepairAction::Renumber => {
                    self.renumber_member(member, group, &mut outcome).await
                }
                RepairAction::Delete { .. } => {
                    self.remove_member(member, group, policy, &mut outcome).await
                }
            };
            if let Err(e) = result {
                let reason = match e {
                    NumberingError::UnresolvedDuplicate { reason, .. } => reason,
                    other => other.to_string(),
                };
                tracing::error!(
                    scope_key = %group.scope_key,
                    document_number = %group.document_number,
                    document_id = member.id,
                    reason = %reason,
                    "Duplicate member left unresolved"
                );
                outcome.unresolved.push(UnresolvedMember {
                    id: member.id,
                    reason,
                });
            }
        }

        Ok(outcome)
    }

    fn plan(
        &self,
        member: &DuplicateMember,
        group: &DuplicateGroup,
        policy: &ReconcilePolicy,
        outcome: &mut ReconcileOutcome,
    ) {
        match policy.action {
            RepairAction::Renumber => outcome.renumbered.push(RenumberedDocument {
                id: member.id,
                previous_number: group.document_number.clone(),
                new_number: None,
            }),
            RepairAction::Delete { .. } => outcome.removed.push(member.id),
        }
    }

    async fn renumber_member(
        &self,
        member: &DuplicateMember,
        group: &DuplicateGroup,
        outcome: &mut ReconcileOutcome,
    ) -> NumberingResult<()> {
        let document = self
            .store
            .find_document(member.id)
            .await?
            .ok_or(NumberingError::NotFound(member.id))?;
        if document.is_removed() || document.document_number != group.document_number {
            return Err(NumberingError::UnresolvedDuplicate {
                document_id: member.id,
                reason: "document changed during repair".into(),
            });
        }

        let updated = self.allocator.renumber(&document).await?;
        self.audit(NewRepairLog {
            document_id: member.id,
            scope_key: group.scope_key.clone(),
            action: RepairActionKind::Renumber,
            previous_number: group.document_number.clone(),
            new_number: Some(updated.document_number.clone()),
            operator: None,
        })
        .await;

        outcome.renumbered.push(RenumberedDocument {
            id: member.id,
            previous_number: group.document_number.clone(),
            new_number: Some(updated.document_number),
        });
        Ok(())
    }

    async fn remove_member(
        &self,
        member: &DuplicateMember,
        group: &DuplicateGroup,
        policy: &ReconcilePolicy,
        outcome: &mut ReconcileOutcome,
    ) -> NumberingResult<()> {
        self.store
            .remove_document(member.id, &group.document_number)
            .await?;
        tracing::info!(
            scope_key = %group.scope_key,
            document_number = %group.document_number,
            document_id = member.id,
            "Duplicate document removed"
        );
        self.audit(NewRepairLog {
            document_id: member.id,
            scope_key: group.scope_key.clone(),
            action: RepairActionKind::Remove,
            previous_number: group.document_number.clone(),
            new_number: None,
            operator: policy.operator(),
        })
        .await;

        outcome.removed.push(member.id);
        Ok(())
    }

    // The repair itself already happened; a lost audit row is logged, not fatal
    async fn audit(&self, entry: NewRepairLog) {
        let document_id = entry.document_id;
        if let Err(e) = self.store.record_repair(entry).await {
            tracing::error!(document_id, error = %e, "Failed to write repair audit log");
        }
    }
}
