use crate::modules::calculator::controller::{get_calculator, post_calculator};
use crate::state::AppState;
use axum::{Router, routing::get};

pub fn init_calculator_router() -> Router<AppState> {
    Router::new().route(
        "/calculator/{card_id}",
        get(get_calculator).post(post_calculator),
    )
}
