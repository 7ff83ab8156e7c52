//! Check / repair runs over the whole document set

use super::error::NumberingResult;
use super::reconciler::{ReconcilePolicy, Reconciler};
use super::scanner::DuplicateScanner;
use super::store::NumberingStore;
use futures::TryStreamExt;
use shared::models::{CheckReport, RepairSummary, ScopeFilter};
use std::sync::Arc;

/// Read-only report of guard indexes and duplicate counts
pub async fn check(store: &dyn NumberingStore, filter: &ScopeFilter) -> NumberingResult<CheckReport> {
    let indexes = store.guard_status().await?;
    let (duplicate_groups, duplicate_documents) = store.duplicate_totals(filter).await?;
    Ok(CheckReport {
        indexes,
        duplicate_groups,
        duplicate_documents,
    })
}

/// Scanner feeding the reconciler, group by group
#[derive(Clone)]
pub struct RepairRun {
    store: Arc<dyn NumberingStore>,
    scanner: DuplicateScanner,
    reconciler: Reconciler,
}

impl RepairRun {
    pub fn new(
        store: Arc<dyn NumberingStore>,
        scanner: DuplicateScanner,
        reconciler: Reconciler,
    ) -> Self {
        Self {
            store,
            scanner,
            reconciler,
        }
    }

    /// Reconcile every duplicate group under `filter`
    ///
    /// Applied runs finish by re-attempting the guard indexes, which legacy
    /// duplicates may have blocked until now.
    pub async fn run(
        &self,
        filter: ScopeFilter,
        policy: &ReconcilePolicy,
    ) -> NumberingResult<RepairSummary> {
        let mut summary = RepairSummary {
            dry_run: policy.dry_run,
            ..Default::default()
        };

        let mut groups = self.scanner.scan(filter);
        while let Some(group) = groups.try_next().await? {
            let outcome = self.reconciler.reconcile(&group, policy).await?;
            summary.absorb(outcome);
        }

        if !policy.dry_run {
            let indexes = self.store.ensure_guard().await?;
            for index in indexes.iter().filter(|i| !i.present || !i.correct) {
                tracing::warn!(index = %index.name, "Guard index still missing after repair");
            }
        }

        tracing::info!(
            dry_run = summary.dry_run,
            groups = summary.groups,
            renumbered = summary.renumbered,
            removed = summary.removed,
            unresolved = summary.unresolved,
            "Duplicate repair finished"
        );
        Ok(summary)
    }
}
