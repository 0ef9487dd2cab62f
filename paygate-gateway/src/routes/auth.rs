use axum::extract::State;
use axum::middleware::from_fn_with_state;
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};

use crate::middleware::require_bearer;
use crate::pb;
use crate::reply;
use crate::state::{AppState, AuthClaims};

pub fn router(state: AppState) -> Router {
    let public = Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login));

    let authed = Router::new()
        .route("/api/auth/me", get(me))
        .route_layer(from_fn_with_state(state.clone(), require_bearer));

    public.merge(authed).with_state(state)
}

async fn register(
    State(state): State<AppState>,
    Json(body): Json<pb::RegisterRequest>,
) -> Response {
    let mut client = state.auth.clone();
    match client.register(body).await {
        Ok(response) => reply::ok("user registered", response.into_inner()),
        Err(status) => reply::error(&status),
    }
}

async fn login(State(state): State<AppState>, Json(body): Json<pb::LoginRequest>) -> Response {
    let mut client = state.auth.clone();
    match client.login(body).await {
        Ok(response) => reply::ok("login successful", response.into_inner()),
        Err(status) => reply::error(&status),
    }
}

async fn me(Extension(claims): Extension<AuthClaims>) -> Response {
    reply::ok(
        "authenticated",
        serde_json::json!({
            "user_id": claims.user_id,
            "email": claims.email,
        }),
    )
}
