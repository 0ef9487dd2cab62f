use axum::extract::{Path, Query, State};
use axum::middleware::from_fn_with_state;
use axum::response::Response;
use axum::routing::{delete, get, post};
use axum::{Extension, Json, Router};

use crate::middleware::require_bearer;
use crate::params::{ListParams, StatsParams};
use crate::pb;
use crate::reply;
use crate::state::{AppState, AuthClaims};

pub fn router(state: AppState) -> Router {
    let command = Router::new()
        .route("/api/card-command/create", post(create))
        .route("/api/card-command/update/{id}", post(update))
        .route("/api/card-command/trashed/{id}", post(trashed))
        .route("/api/card-command/restore/all", post(restore_all))
        .route("/api/card-command/restore/{id}", post(restore))
        .route("/api/card-command/permanent/all", post(delete_all_permanent))
        .route("/api/card-command/permanent/{id}", delete(delete_permanent))
        .route_layer(from_fn_with_state(state.clone(), require_bearer));

    // The caller's own cards resolve through the bearer token.
    let owned = Router::new()
        .route("/api/card-query/user", get(find_own))
        .route_layer(from_fn_with_state(state.clone(), require_bearer));

    let query = Router::new()
        .route("/api/card-query", get(find_all))
        .route("/api/card-query/active", get(find_active))
        .route("/api/card-query/trashed", get(find_trashed))
        .route("/api/card-query/number/{card_number}", get(find_by_card_number))
        .route("/api/card-query/{id}", get(find_by_id));

    let stats = Router::new()
        .route("/api/card-stats-balance/monthly-balance", get(balance_monthly))
        .route("/api/card-stats-balance/yearly-balance", get(balance_yearly))
        .route("/api/card-stats-balance/monthly-balance-by-card", get(balance_monthly_by_card))
        .route("/api/card-stats-balance/yearly-balance-by-card", get(balance_yearly_by_card))
        .route("/api/card-stats-topup/monthly-topup-amount", get(topup_monthly))
        .route("/api/card-stats-topup/yearly-topup-amount", get(topup_yearly))
        .route("/api/card-stats-topup/monthly-topup-amount-by-card", get(topup_monthly_by_card))
        .route("/api/card-stats-topup/yearly-topup-amount-by-card", get(topup_yearly_by_card))
        .route("/api/card-stats-withdraw/monthly-withdraw-amount", get(withdraw_monthly))
        .route("/api/card-stats-withdraw/yearly-withdraw-amount", get(withdraw_yearly))
        .route("/api/card-stats-withdraw/monthly-withdraw-amount-by-card", get(withdraw_monthly_by_card))
        .route("/api/card-stats-withdraw/yearly-withdraw-amount-by-card", get(withdraw_yearly_by_card))
        .route("/api/card-stats-transaction/monthly-transaction-amount", get(transaction_monthly))
        .route("/api/card-stats-transaction/yearly-transaction-amount", get(transaction_yearly))
        .route("/api/card-stats-transaction/monthly-transaction-amount-by-card", get(transaction_monthly_by_card))
        .route("/api/card-stats-transaction/yearly-transaction-amount-by-card", get(transaction_yearly_by_card))
        .route("/api/card-stats-transfer/monthly-transfer-amount", get(transfer_monthly))
        .route("/api/card-stats-transfer/yearly-transfer-amount", get(transfer_yearly))
        .route("/api/card-stats-transfer/monthly-transfer-amount-by-card", get(transfer_monthly_by_card))
        .route("/api/card-stats-transfer/yearly-transfer-amount-by-card", get(transfer_yearly_by_card))
        .route("/api/card-dashboard", get(dashboard))
        .route("/api/card-dashboard/{card_number}", get(dashboard_by_card));

    command.merge(owned).merge(query).merge(stats).with_state(state)
}

async fn create(State(state): State<AppState>, Json(body): Json<pb::CreateCardRequest>) -> Response {
    let mut client = state.card_command.clone();
    match client.create(body).await {
        Ok(response) => reply::ok("card created", response.into_inner().card),
        Err(status) => reply::error(&status),
    }
}

async fn update(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(mut body): Json<pb::UpdateCardRequest>,
) -> Response {
    body.id = id;
    let mut client = state.card_command.clone();
    match client.update(body).await {
        Ok(response) => reply::ok("card updated", response.into_inner().card),
        Err(status) => reply::error(&status),
    }
}

async fn trashed(State(state): State<AppState>, Path(id): Path<u64>) -> Response {
    let mut client = state.card_command.clone();
    match client.trashed(pb::IdRequest { id }).await {
        Ok(response) => reply::ok("card trashed", response.into_inner().card),
        Err(status) => reply::error(&status),
    }
}

async fn restore(State(state): State<AppState>, Path(id): Path<u64>) -> Response {
    let mut client = state.card_command.clone();
    match client.restore(pb::IdRequest { id }).await {
        Ok(response) => reply::ok("card restored", response.into_inner().card),
        Err(status) => reply::error(&status),
    }
}

async fn delete_permanent(State(state): State<AppState>, Path(id): Path<u64>) -> Response {
    let mut client = state.card_command.clone();
    match client.delete_permanent(pb::IdRequest { id }).await {
        Ok(_) => reply::ok("card permanently deleted", serde_json::Value::Null),
        Err(status) => reply::error(&status),
    }
}

async fn restore_all(State(state): State<AppState>) -> Response {
    let mut client = state.card_command.clone();
    match client.restore_all(pb::Empty {}).await {
        Ok(response) => reply::ok("cards restored", response.into_inner().affected),
        Err(status) => reply::error(&status),
    }
}

async fn delete_all_permanent(State(state): State<AppState>) -> Response {
    let mut client = state.card_command.clone();
    match client.delete_all_permanent(pb::Empty {}).await {
        Ok(response) => reply::ok("cards permanently deleted", response.into_inner().affected),
        Err(status) => reply::error(&status),
    }
}

async fn find_all(State(state): State<AppState>, Query(params): Query<ListParams>) -> Response {
    let mut client = state.card_query.clone();
    match client.find_all(params.to_pb()).await {
        Ok(response) => {
            let reply = response.into_inner();
            reply::page("cards", reply.cards, reply.page, reply.page_size, reply.total)
        }
        Err(status) => reply::error(&status),
    }
}

async fn find_active(State(state): State<AppState>, Query(params): Query<ListParams>) -> Response {
    let mut client = state.card_query.clone();
    match client.find_by_active(params.to_pb()).await {
        Ok(response) => {
            let reply = response.into_inner();
            reply::page("active cards", reply.cards, reply.page, reply.page_size, reply.total)
        }
        Err(status) => reply::error(&status),
    }
}

async fn find_trashed(State(state): State<AppState>, Query(params): Query<ListParams>) -> Response {
    let mut client = state.card_query.clone();
    match client.find_by_trashed(params.to_pb()).await {
        Ok(response) => {
            let reply = response.into_inner();
            reply::page("trashed cards", reply.cards, reply.page, reply.page_size, reply.total)
        }
        Err(status) => reply::error(&status),
    }
}

async fn find_own(
    State(state): State<AppState>,
    Extension(claims): Extension<AuthClaims>,
    Query(params): Query<ListParams>,
) -> Response {
    let mut client = state.card_query.clone();
    let request = pb::UserIdPageRequest {
        user_id: claims.user_id,
        filter: Some(params.to_pb()),
    };
    match client.find_by_user(request).await {
        Ok(response) => {
            let reply = response.into_inner();
            reply::page("cards by user", reply.cards, reply.page, reply.page_size, reply.total)
        }
        Err(status) => reply::error(&status),
    }
}

async fn find_by_card_number(
    State(state): State<AppState>,
    Path(card_number): Path<String>,
) -> Response {
    let mut client = state.card_query.clone();
    match client.find_by_card_number(pb::CardNumberRequest { card_number }).await {
        Ok(response) => reply::ok("card", response.into_inner().card),
        Err(status) => reply::error(&status),
    }
}

async fn find_by_id(State(state): State<AppState>, Path(id): Path<u64>) -> Response {
    let mut client = state.card_query.clone();
    match client.find_by_id(pb::IdRequest { id }).await {
        Ok(response) => reply::ok("card", response.into_inner().card),
        Err(status) => reply::error(&status),
    }
}

async fn stats(state: AppState, kind: &str, grain: &str, params: StatsParams, message: &str) -> Response {
    let mut client = state.card_stats.clone();
    let request = pb::CardStatsRequest {
        kind: kind.to_string(),
        grain: grain.to_string(),
        year: params.year,
        card_number: params.card_number.unwrap_or_default(),
    };
    match client.get_stats(request).await {
        Ok(response) => reply::ok(message, response.into_inner().buckets),
        Err(status) => reply::error(&status),
    }
}

async fn balance_monthly(State(state): State<AppState>, Query(p): Query<StatsParams>) -> Response {
    stats(state, "balance", "month", p, "monthly balance").await
}

async fn balance_yearly(State(state): State<AppState>, Query(p): Query<StatsParams>) -> Response {
    stats(state, "balance", "year", p, "yearly balance").await
}

async fn balance_monthly_by_card(State(state): State<AppState>, Query(p): Query<StatsParams>) -> Response {
    stats(state, "balance", "month", p, "monthly balance by card").await
}

async fn balance_yearly_by_card(State(state): State<AppState>, Query(p): Query<StatsParams>) -> Response {
    stats(state, "balance", "year", p, "yearly balance by card").await
}

async fn topup_monthly(State(state): State<AppState>, Query(p): Query<StatsParams>) -> Response {
    stats(state, "topup", "month", p, "monthly topup amounts").await
}

async fn topup_yearly(State(state): State<AppState>, Query(p): Query<StatsParams>) -> Response {
    stats(state, "topup", "year", p, "yearly topup amounts").await
}

async fn topup_monthly_by_card(State(state): State<AppState>, Query(p): Query<StatsParams>) -> Response {
    stats(state, "topup", "month", p, "monthly topup amounts by card").await
}

async fn topup_yearly_by_card(State(state): State<AppState>, Query(p): Query<StatsParams>) -> Response {
    stats(state, "topup", "year", p, "yearly topup amounts by card").await
}

async fn withdraw_monthly(State(state): State<AppState>, Query(p): Query<StatsParams>) -> Response {
    stats(state, "withdraw", "month", p, "monthly withdraw amounts").await
}

async fn withdraw_yearly(State(state): State<AppState>, Query(p): Query<StatsParams>) -> Response {
    stats(state, "withdraw", "year", p, "yearly withdraw amounts").await
}

async fn withdraw_monthly_by_card(State(state): State<AppState>, Query(p): Query<StatsParams>) -> Response {
    stats(state, "withdraw", "month", p, "monthly withdraw amounts by card").await
}

async fn withdraw_yearly_by_card(State(state): State<AppState>, Query(p): Query<StatsParams>) -> Response {
    stats(state, "withdraw", "year", p, "yearly withdraw amounts by card").await
}

async fn transaction_monthly(State(state): State<AppState>, Query(p): Query<StatsParams>) -> Response {
    stats(state, "transaction", "month", p, "monthly transaction amounts").await
}

async fn transaction_yearly(State(state): State<AppState>, Query(p): Query<StatsParams>) -> Response {
    stats(state, "transaction", "year", p, "yearly transaction amounts").await
}

async fn transaction_monthly_by_card(State(state): State<AppState>, Query(p): Query<StatsParams>) -> Response {
    stats(state, "transaction", "month", p, "monthly transaction amounts by card").await
}

async fn transaction_yearly_by_card(State(state): State<AppState>, Query(p): Query<StatsParams>) -> Response {
    stats(state, "transaction", "year", p, "yearly transaction amounts by card").await
}

async fn transfer_monthly(State(state): State<AppState>, Query(p): Query<StatsParams>) -> Response {
    stats(state, "transfer", "month", p, "monthly transfer amounts").await
}

async fn transfer_yearly(State(state): State<AppState>, Query(p): Query<StatsParams>) -> Response {
    stats(state, "transfer", "year", p, "yearly transfer amounts").await
}

async fn transfer_monthly_by_card(State(state): State<AppState>, Query(p): Query<StatsParams>) -> Response {
    stats(state, "transfer", "month", p, "monthly transfer amounts by card").await
}

async fn transfer_yearly_by_card(State(state): State<AppState>, Query(p): Query<StatsParams>) -> Response {
    stats(state, "transfer", "year", p, "yearly transfer amounts by card").await
}

async fn dashboard(State(state): State<AppState>) -> Response {
    let mut client = state.card_stats.clone();
    match client
        .get_dashboard(pb::DashboardRequest {
            card_number: String::new(),
        })
        .await
    {
        Ok(response) => reply::ok("card dashboard", response.into_inner()),
        Err(status) => reply::error(&status),
    }
}

async fn dashboard_by_card(
    State(state): State<AppState>,
    Path(card_number): Path<String>,
) -> Response {
    let mut client = state.card_stats.clone();
    match client.get_dashboard(pb::DashboardRequest { card_number }).await {
        Ok(response) => reply::ok("card dashboard by card", response.into_inner()),
        Err(status) => reply::error(&status),
    }
}
