use axum::Router;

use crate::state::AppState;

pub mod dto;
pub mod extractors;
pub mod handlers;
pub mod password;
pub mod repo;
pub mod token;
pub(crate) mod validate;

pub fn router() -> Router<AppState> {
    handlers::routes()
}
