//! HTTP route definitions.

mod addresses;

use axum::Router;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    addresses::router()
}
