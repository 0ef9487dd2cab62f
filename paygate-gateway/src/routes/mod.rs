pub mod auth;
pub mod card;
pub mod saldo;
pub mod topup;
pub mod transaction;
pub mod transfer;
pub mod withdraw;

use axum::Router;

use crate::state::AppState;

/// The full route table, grouped by domain under stable prefixes.
pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(auth::router(state.clone()))
        .merge(card::router(state.clone()))
        .merge(saldo::router(state.clone()))
        .merge(withdraw::router(state.clone()))
        .merge(topup::router(state.clone()))
        .merge(transaction::router(state.clone()))
        .merge(transfer::router(state))
}
