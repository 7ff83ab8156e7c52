//! Document API Handlers

use axum::{
    Json,
    extract::{Path, State},
};

use crate::core::ServerState;
use crate::db::repository::document;
use crate::numbering::{DocumentDraft, PeriodKey, Scope};
use crate::utils::{AppError, AppResult, ErrorCode};
use shared::models::{Document, DocumentCreate, DocumentType};

/// Confirm a purchase order; the order receives its `PO` number here
pub async fn confirm_purchase_order(
    State(state): State<ServerState>,
    Json(payload): Json<DocumentCreate>,
) -> AppResult<Json<Document>> {
    create(&state, DocumentType::PurchaseOrder, payload).await
}

/// Create a purchase return with a `PR` number
pub async fn create_purchase_return(
    State(state): State<ServerState>,
    Json(payload): Json<DocumentCreate>,
) -> AppResult<Json<Document>> {
    create(&state, DocumentType::PurchaseReturn, payload).await
}

async fn create(
    state: &ServerState,
    document_type: DocumentType,
    payload: DocumentCreate,
) -> AppResult<Json<Document>> {
    let period_key = match payload.period_key.as_deref() {
        Some(period) => PeriodKey::parse(period)?,
        None => PeriodKey::current(),
    };
    let scope = Scope::new(payload.store_id, payload.partner_id, document_type, period_key)?;

    let document = state
        .allocator
        .allocate(DocumentDraft {
            scope,
            lines: payload.lines,
            note: payload.note,
        })
        .await?;
    Ok(Json(document))
}

pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Document>> {
    let document = document::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::DocumentNotFound).with_detail("id", id))?;
    Ok(Json(document))
}
