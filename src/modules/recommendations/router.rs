use crate::modules::recommendations::controller::suggest;
use crate::state::AppState;
use axum::{Router, routing::post};

pub fn init_recommendations_router() -> Router<AppState> {
    Router::new().route("/suggest", post(suggest))
}
