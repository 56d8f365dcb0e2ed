use axum::Router;

use crate::state::AppState;

pub mod dto;
pub mod forms;
pub mod handlers;
pub mod images;
pub mod repo;
pub mod service;

pub fn router() -> Router<AppState> {
    handlers::router()
}
