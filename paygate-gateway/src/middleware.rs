use std::time::Instant;

use axum::extract::{MatchedPath, Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;

use crate::pb;
use crate::reply;
use crate::state::{AppState, AuthClaims};

/// Bearer-token gate for the state-changing routes. Validation is delegated
/// to the auth service; on success the claims ride the request extensions.
pub async fn require_bearer(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|value| value.to_string());

    let Some(token) = token else {
        return reply::unauthorized("missing bearer token");
    };

    let mut auth = state.auth.clone();
    match auth.validate(pb::TokenRequest { token }).await {
        Ok(response) => {
            let claims = response.into_inner();
            request.extensions_mut().insert(AuthClaims {
                user_id: claims.user_id,
                email: claims.email,
            });
            next.run(request).await
        }
        Err(status) => reply::error(&status),
    }
}

/// Per-route counter + histogram labelled `{method, status}`, where the
/// method label is the matched route template.
pub async fn track(request: Request, next: Next) -> Response {
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());
    let start = Instant::now();

    let response = next.run(request).await;

    let status = response.status().as_u16().to_string();
    metrics::counter!(
        "api_gateway_requests_total",
        "method" => route.clone(),
        "status" => status.clone()
    )
    .increment(1);
    metrics::histogram!(
        "api_gateway_request_duration_seconds",
        "method" => route,
        "status" => status
    )
    .record(start.elapsed().as_secs_f64());

    response
}
