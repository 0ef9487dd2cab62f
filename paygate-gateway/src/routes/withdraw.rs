use axum::extract::{Path, Query, State};
use axum::middleware::from_fn_with_state;
use axum::response::Response;
use axum::routing::{delete, get, post};
use axum::{Json, Router};

use crate::middleware::require_bearer;
use crate::params::{ListParams, StatsParams};
use crate::pb;
use crate::reply;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    let command = Router::new()
        .route("/api/withdraw-command/create", post(create))
        .route("/api/withdraw-command/update/{id}", post(update))
        .route("/api/withdraw-command/trashed/{id}", post(trashed))
        .route("/api/withdraw-command/restore/all", post(restore_all))
        .route("/api/withdraw-command/restore/{id}", post(restore))
        .route("/api/withdraw-command/permanent/all", post(delete_all_permanent))
        .route("/api/withdraw-command/permanent/{id}", delete(delete_permanent))
        .route_layer(from_fn_with_state(state.clone(), require_bearer));

    let query = Router::new()
        .route("/api/withdraw-query", get(find_all))
        .route("/api/withdraw-query/active", get(find_active))
        .route("/api/withdraw-query/trashed", get(find_trashed))
        .route("/api/withdraw-query/card/{card_number}", get(find_by_card))
        .route("/api/withdraw-query/{id}", get(find_by_id));

    let stats = Router::new()
        .route("/api/withdraw-stats-amount/monthly", get(amount_monthly))
        .route("/api/withdraw-stats-amount/yearly", get(amount_yearly))
        .route("/api/withdraw-stats-amount/monthly-by-card", get(amount_monthly_by_card))
        .route("/api/withdraw-stats-amount/yearly-by-card", get(amount_yearly_by_card))
        .route("/api/withdraw-stats-status/success-monthly", get(success_monthly))
        .route("/api/withdraw-stats-status/success-yearly", get(success_yearly))
        .route("/api/withdraw-stats-status/success-monthly-by-card", get(success_monthly_by_card))
        .route("/api/withdraw-stats-status/success-yearly-by-card", get(success_yearly_by_card))
        .route("/api/withdraw-stats-status/failed-monthly", get(failed_monthly))
        .route("/api/withdraw-stats-status/failed-yearly", get(failed_yearly))
        .route("/api/withdraw-stats-status/failed-monthly-by-card", get(failed_monthly_by_card))
        .route("/api/withdraw-stats-status/failed-yearly-by-card", get(failed_yearly_by_card));

    command.merge(query).merge(stats).with_state(state)
}

async fn create(
    State(state): State<AppState>,
    Json(body): Json<pb::CreateWithdrawRequest>,
) -> Response {
    let mut client = state.withdraw_command.clone();
    match client.create(body).await {
        Ok(response) => reply::ok("withdraw created", response.into_inner().withdraw),
        Err(status) => reply::error(&status),
    }
}

async fn update(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(mut body): Json<pb::UpdateWithdrawRequest>,
) -> Response {
    body.id = id;
    let mut client = state.withdraw_command.clone();
    match client.update(body).await {
        Ok(response) => reply::ok("withdraw updated", response.into_inner().withdraw),
        Err(status) => reply::error(&status),
    }
}

async fn trashed(State(state): State<AppState>, Path(id): Path<u64>) -> Response {
    let mut client = state.withdraw_command.clone();
    match client.trashed(pb::IdRequest { id }).await {
        Ok(response) => reply::ok("withdraw trashed", response.into_inner().withdraw),
        Err(status) => reply::error(&status),
    }
}

async fn restore(State(state): State<AppState>, Path(id): Path<u64>) -> Response {
    let mut client = state.withdraw_command.clone();
    match client.restore(pb::IdRequest { id }).await {
        Ok(response) => reply::ok("withdraw restored", response.into_inner().withdraw),
        Err(status) => reply::error(&status),
    }
}

async fn delete_permanent(State(state): State<AppState>, Path(id): Path<u64>) -> Response {
    let mut client = state.withdraw_command.clone();
    match client.delete_permanent(pb::IdRequest { id }).await {
        Ok(_) => reply::ok("withdraw permanently deleted", serde_json::Value::Null),
        Err(status) => reply::error(&status),
    }
}

async fn restore_all(State(state): State<AppState>) -> Response {
    let mut client = state.withdraw_command.clone();
    match client.restore_all(pb::Empty {}).await {
        Ok(response) => reply::ok("withdraws restored", response.into_inner().affected),
        Err(status) => reply::error(&status),
    }
}

async fn delete_all_permanent(State(state): State<AppState>) -> Response {
    let mut client = state.withdraw_command.clone();
    match client.delete_all_permanent(pb::Empty {}).await {
        Ok(response) => reply::ok("withdraws permanently deleted", response.into_inner().affected),
        Err(status) => reply::error(&status),
    }
}

async fn find_all(State(state): State<AppState>, Query(params): Query<ListParams>) -> Response {
    let mut client = state.withdraw_query.clone();
    match client.find_all(params.to_pb()).await {
        Ok(response) => {
            let reply = response.into_inner();
            reply::page("withdraws", reply.withdraws, reply.page, reply.page_size, reply.total)
        }
        Err(status) => reply::error(&status),
    }
}

async fn find_active(State(state): State<AppState>, Query(params): Query<ListParams>) -> Response {
    let mut client = state.withdraw_query.clone();
    match client.find_by_active(params.to_pb()).await {
        Ok(response) => {
            let reply = response.into_inner();
            reply::page("active withdraws", reply.withdraws, reply.page, reply.page_size, reply.total)
        }
        Err(status) => reply::error(&status),
    }
}

async fn find_trashed(State(state): State<AppState>, Query(params): Query<ListParams>) -> Response {
    let mut client = state.withdraw_query.clone();
    match client.find_by_trashed(params.to_pb()).await {
        Ok(response) => {
            let reply = response.into_inner();
            reply::page("trashed withdraws", reply.withdraws, reply.page, reply.page_size, reply.total)
        }
        Err(status) => reply::error(&status),
    }
}

async fn find_by_card(
    State(state): State<AppState>,
    Path(card_number): Path<String>,
    Query(params): Query<ListParams>,
) -> Response {
    let mut client = state.withdraw_query.clone();
    let request = pb::CardNumberPageRequest {
        card_number,
        filter: Some(params.to_pb()),
    };
    match client.find_all_by_card_number(request).await {
        Ok(response) => {
            let reply = response.into_inner();
            reply::page("withdraws by card", reply.withdraws, reply.page, reply.page_size, reply.total)
        }
        Err(status) => reply::error(&status),
    }
}

async fn find_by_id(State(state): State<AppState>, Path(id): Path<u64>) -> Response {
    let mut client = state.withdraw_query.clone();
    match client.find_by_id(pb::IdRequest { id }).await {
        Ok(response) => reply::ok("withdraw", response.into_inner().withdraw),
        Err(status) => reply::error(&status),
    }
}

async fn stats(state: AppState, request: pb::StatsRequest, message: &str) -> Response {
    let mut client = state.withdraw_stats.clone();
    match client.get_stats(request).await {
        Ok(response) => reply::ok(message, response.into_inner().buckets),
        Err(status) => reply::error(&status),
    }
}

async fn amount_monthly(State(state): State<AppState>, Query(p): Query<StatsParams>) -> Response {
    stats(state, p.to_stats_request("amount", "month", "global"), "monthly withdraw amounts").await
}

async fn amount_yearly(State(state): State<AppState>, Query(p): Query<StatsParams>) -> Response {
    stats(state, p.to_stats_request("amount", "year", "global"), "yearly withdraw amounts").await
}

async fn amount_monthly_by_card(State(state): State<AppState>, Query(p): Query<StatsParams>) -> Response {
    stats(state, p.to_stats_request("amount", "month", "by-card"), "monthly withdraw amounts by card").await
}

async fn amount_yearly_by_card(State(state): State<AppState>, Query(p): Query<StatsParams>) -> Response {
    stats(state, p.to_stats_request("amount", "year", "by-card"), "yearly withdraw amounts by card").await
}

async fn success_monthly(State(state): State<AppState>, Query(p): Query<StatsParams>) -> Response {
    stats(state, p.to_stats_request("status-success", "month", "global"), "monthly successful withdraws").await
}

async fn success_yearly(State(state): State<AppState>, Query(p): Query<StatsParams>) -> Response {
    stats(state, p.to_stats_request("status-success", "year", "global"), "yearly successful withdraws").await
}

async fn success_monthly_by_card(State(state): State<AppState>, Query(p): Query<StatsParams>) -> Response {
    stats(state, p.to_stats_request("status-success", "month", "by-card"), "monthly successful withdraws by card").await
}

async fn success_yearly_by_card(State(state): State<AppState>, Query(p): Query<StatsParams>) -> Response {
    stats(state, p.to_stats_request("status-success", "year", "by-card"), "yearly successful withdraws by card").await
}

async fn failed_monthly(State(state): State<AppState>, Query(p): Query<StatsParams>) -> Response {
    stats(state, p.to_stats_request("status-failed", "month", "global"), "monthly failed withdraws").await
}

async fn failed_yearly(State(state): State<AppState>, Query(p): Query<StatsParams>) -> Response {
    stats(state, p.to_stats_request("status-failed", "year", "global"), "yearly failed withdraws").await
}

async fn failed_monthly_by_card(State(state): State<AppState>, Query(p): Query<StatsParams>) -> Response {
    stats(state, p.to_stats_request("status-failed", "month", "by-card"), "monthly failed withdraws by card").await
}

async fn failed_yearly_by_card(State(state): State<AppState>, Query(p): Query<StatsParams>) -> Response {
    stats(state, p.to_stats_request("status-failed", "year", "by-card"), "yearly failed withdraws by card").await
}
