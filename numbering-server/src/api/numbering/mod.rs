//! Numbering diagnostics API
//!
//! Report, list and repair duplicate document numbers.

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/numbering", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/check", get(handler::check))
        .route("/duplicates", get(handler::list_duplicates))
        .route("/repair", post(handler::repair))
}
