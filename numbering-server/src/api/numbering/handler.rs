//! Numbering diagnostics handlers

use axum::{
    Json,
    extract::{Query, State},
};
use futures::{StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};

use crate::core::ServerState;
use crate::numbering::{ReconcilePolicy, ScanCursor, repair};
use crate::utils::{AppError, AppResult};
use shared::models::{CheckReport, DocumentType, DuplicateGroup, RepairSummary, ScopeFilter};

const MAX_PAGE: usize = 500;

pub async fn check(
    State(state): State<ServerState>,
    Query(filter): Query<ScopeFilter>,
) -> AppResult<Json<CheckReport>> {
    let report = repair::check(state.store.as_ref(), &filter).await?;
    Ok(Json(report))
}

#[derive(Debug, Deserialize)]
pub struct DuplicatesQuery {
    pub store_id: Option<i64>,
    pub partner_id: Option<i64>,
    pub document_type: Option<DocumentType>,
    pub period_key: Option<String>,
    pub scope_key: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Resume after this group (both fields required)
    pub after_scope_key: Option<String>,
    pub after_number: Option<String>,
}

fn default_limit() -> usize {
    100
}

#[derive(Debug, Serialize)]
pub struct DuplicatePage {
    pub groups: Vec<DuplicateGroup>,
    /// Pass back as `after_scope_key` / `after_number` for the next page
    pub next: Option<ScanCursor>,
}

pub async fn list_duplicates(
    State(state): State<ServerState>,
    Query(query): Query<DuplicatesQuery>,
) -> AppResult<Json<DuplicatePage>> {
    let cursor = match (query.after_scope_key, query.after_number) {
        (Some(scope_key), Some(document_number)) => Some(ScanCursor {
            scope_key,
            document_number,
        }),
        (None, None) => None,
        _ => {
            return Err(AppError::validation(
                "after_scope_key and after_number must be given together",
            ));
        }
    };
    let filter = ScopeFilter {
        store_id: query.store_id,
        partner_id: query.partner_id,
        document_type: query.document_type,
        period_key: query.period_key,
        scope_key: query.scope_key,
    };
    let limit = query.limit.clamp(1, MAX_PAGE);

    let groups: Vec<DuplicateGroup> = state
        .scanner
        .scan_from(filter, cursor)
        .take(limit)
        .try_collect()
        .await?;
    let next = (groups.len() == limit)
        .then(|| groups.last())
        .flatten()
        .map(|g| ScanCursor {
            scope_key: g.scope_key.clone(),
            document_number: g.document_number.clone(),
        });

    Ok(Json(DuplicatePage { groups, next }))
}

#[derive(Debug, Default, Deserialize)]
pub struct RepairRequest {
    #[serde(default)]
    pub filter: ScopeFilter,
    /// Write changes; otherwise only report intended actions
    #[serde(default)]
    pub apply: bool,
    /// Soft-delete later members instead of renumbering (requires `operator`)
    #[serde(default)]
    pub delete: bool,
    pub operator: Option<String>,
}

pub async fn repair(
    State(state): State<ServerState>,
    Json(request): Json<RepairRequest>,
) -> AppResult<Json<RepairSummary>> {
    let policy = if request.delete {
        let operator = request
            .operator
            .filter(|o| !o.trim().is_empty())
            .ok_or_else(|| AppError::validation("delete repairs require an operator"))?;
        ReconcilePolicy::delete(operator)
    } else {
        ReconcilePolicy::renumber()
    }
    .dry_run(!request.apply);

    let summary = state.repair.run(request.filter, &policy).await?;
    Ok(Json(summary))
}
