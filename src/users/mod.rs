use axum::Router;

use crate::state::AppState;

mod dto;
mod error;
pub mod handlers;
pub mod repo;
mod services;

pub fn router() -> Router<AppState> {
    handlers::user_routes()
}
