//! Document API Module
//!
//! Business actions that issue document numbers, plus read access.

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/api/purchase-orders", post(handler::confirm_purchase_order))
        .route("/api/purchase-returns", post(handler::create_purchase_return))
        .route("/api/documents/{id}", get(handler::get_by_id))
}
