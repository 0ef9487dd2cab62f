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
        .route("/api/saldo-command/create", post(create))
        .route("/api/saldo-command/update/{id}", post(update))
        .route("/api/saldo-command/trashed/{id}", post(trashed))
        .route("/api/saldo-command/restore/all", post(restore_all))
        .route("/api/saldo-command/restore/{id}", post(restore))
        .route("/api/saldo-command/permanent/all", post(delete_all_permanent))
        .route("/api/saldo-command/permanent/{id}", delete(delete_permanent))
        .route_layer(from_fn_with_state(state.clone(), require_bearer));

    let query = Router::new()
        .route("/api/saldo-query", get(find_all))
        .route("/api/saldo-query/active", get(find_active))
        .route("/api/saldo-query/trashed", get(find_trashed))
        .route("/api/saldo-query/number/{card_number}", get(find_by_card_number))
        .route("/api/saldo-query/{id}", get(find_by_id));

    let stats = Router::new()
        .route("/api/saldo-stats-balance/monthly-balance", get(balance_monthly))
        .route("/api/saldo-stats-balance/yearly-balance", get(balance_yearly));

    command.merge(query).merge(stats).with_state(state)
}

async fn create(State(state): State<AppState>, Json(body): Json<pb::CreateSaldoRequest>) -> Response {
    let mut client = state.saldo_command.clone();
    match client.create(body).await {
        Ok(response) => reply::ok("saldo created", response.into_inner().saldo),
        Err(status) => reply::error(&status),
    }
}

async fn update(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(mut body): Json<pb::UpdateSaldoRequest>,
) -> Response {
    body.id = id;
    let mut client = state.saldo_command.clone();
    match client.update(body).await {
        Ok(response) => reply::ok("saldo updated", response.into_inner().saldo),
        Err(status) => reply::error(&status),
    }
}

async fn trashed(State(state): State<AppState>, Path(id): Path<u64>) -> Response {
    let mut client = state.saldo_command.clone();
    match client.trashed(pb::IdRequest { id }).await {
        Ok(response) => reply::ok("saldo trashed", response.into_inner().saldo),
        Err(status) => reply::error(&status),
    }
}

async fn restore(State(state): State<AppState>, Path(id): Path<u64>) -> Response {
    let mut client = state.saldo_command.clone();
    match client.restore(pb::IdRequest { id }).await {
        Ok(response) => reply::ok("saldo restored", response.into_inner().saldo),
        Err(status) => reply::error(&status),
    }
}

async fn delete_permanent(State(state): State<AppState>, Path(id): Path<u64>) -> Response {
    let mut client = state.saldo_command.clone();
    match client.delete_permanent(pb::IdRequest { id }).await {
        Ok(_) => reply::ok("saldo permanently deleted", serde_json::Value::Null),
        Err(status) => reply::error(&status),
    }
}

async fn restore_all(State(state): State<AppState>) -> Response {
    let mut client = state.saldo_command.clone();
    match client.restore_all(pb::Empty {}).await {
        Ok(response) => reply::ok("saldos restored", response.into_inner().affected),
        Err(status) => reply::error(&status),
    }
}

async fn delete_all_permanent(State(state): State<AppState>) -> Response {
    let mut client = state.saldo_command.clone();
    match client.delete_all_permanent(pb::Empty {}).await {
        Ok(response) => reply::ok("saldos permanently deleted", response.into_inner().affected),
        Err(status) => reply::error(&status),
    }
}

async fn find_all(State(state): State<AppState>, Query(params): Query<ListParams>) -> Response {
    let mut client = state.saldo_query.clone();
    match client.find_all(params.to_pb()).await {
        Ok(response) => {
            let reply = response.into_inner();
            reply::page("saldos", reply.saldos, reply.page, reply.page_size, reply.total)
        }
        Err(status) => reply::error(&status),
    }
}

async fn find_active(State(state): State<AppState>, Query(params): Query<ListParams>) -> Response {
    let mut client = state.saldo_query.clone();
    match client.find_by_active(params.to_pb()).await {
        Ok(response) => {
            let reply = response.into_inner();
            reply::page("active saldos", reply.saldos, reply.page, reply.page_size, reply.total)
        }
        Err(status) => reply::error(&status),
    }
}

async fn find_trashed(State(state): State<AppState>, Query(params): Query<ListParams>) -> Response {
    let mut client = state.saldo_query.clone();
    match client.find_by_trashed(params.to_pb()).await {
        Ok(response) => {
            let reply = response.into_inner();
            reply::page("trashed saldos", reply.saldos, reply.page, reply.page_size, reply.total)
        }
        Err(status) => reply::error(&status),
    }
}

async fn find_by_card_number(
    State(state): State<AppState>,
    Path(card_number): Path<String>,
) -> Response {
    let mut client = state.saldo_query.clone();
    match client.find_by_card_number(pb::CardNumberRequest { card_number }).await {
        Ok(response) => reply::ok("saldo", response.into_inner().saldo),
        Err(status) => reply::error(&status),
    }
}

async fn find_by_id(State(state): State<AppState>, Path(id): Path<u64>) -> Response {
    let mut client = state.saldo_query.clone();
    match client.find_by_id(pb::IdRequest { id }).await {
        Ok(response) => reply::ok("saldo", response.into_inner().saldo),
        Err(status) => reply::error(&status),
    }
}

async fn balance_series(state: AppState, grain: &str, params: StatsParams, message: &str) -> Response {
    let mut client = state.saldo_stats.clone();
    let request = pb::SaldoStatsRequest {
        grain: grain.to_string(),
        year: params.year,
        card_number: params.card_number.unwrap_or_default(),
    };
    match client.get_balance_series(request).await {
        Ok(response) => reply::ok(message, response.into_inner().buckets),
        Err(status) => reply::error(&status),
    }
}

async fn balance_monthly(State(state): State<AppState>, Query(p): Query<StatsParams>) -> Response {
    balance_series(state, "month", p, "monthly saldo balance").await
}

async fn balance_yearly(State(state): State<AppState>, Query(p): Query<StatsParams>) -> Response {
    balance_series(state, "year", p, "yearly saldo balance").await
}
