use chrono::{DateTime, Utc};

use paygate_common::error::{Result, ServiceError};
use paygate_common::model;
use paygate_common::pagination::{Paged, Pagination};
use paygate_common::requests::{
    StatsBucket, StatsDimension, StatsGrain, StatsQuery, StatsScope,
};

use super::pb;

pub fn fmt_time(time: DateTime<Utc>) -> String {
    time.to_rfc3339()
}

pub fn fmt_opt_time(time: Option<DateTime<Utc>>) -> String {
    time.map(fmt_time).unwrap_or_default()
}

/// Wire pagination uses zero for "unset"; normalisation happens here so the
/// services always see a well-formed filter.
pub fn pagination(wire: Option<pb::Pagination>) -> Pagination {
    match wire {
        Some(p) => Pagination::new(
            (p.page != 0).then_some(p.page),
            (p.page_size != 0).then_some(p.page_size),
            (!p.search.is_empty()).then_some(p.search),
        ),
        None => Pagination::default(),
    }
}

pub fn stats_query(req: pb::StatsRequest) -> Result<StatsQuery> {
    let dimension = StatsDimension::parse(&req.dimension)?;
    let grain = StatsGrain::parse(&req.grain)?;
    let scope = match req.scope.as_str() {
        "" | "global" => StatsScope::Global,
        "by-card" => StatsScope::ByCard(require_card(&req.card_number)?),
        "by-sender" => StatsScope::BySender(require_card(&req.card_number)?),
        "by-receiver" => StatsScope::ByReceiver(require_card(&req.card_number)?),
        other => {
            return Err(ServiceError::invalid_field(format!(
                "unknown stats scope: {other}"
            )))
        }
    };
    if req.year == 0 {
        return Err(ServiceError::invalid_field("year is required"));
    }
    let month = match req.month {
        0 => None,
        m @ 1..=12 => Some(m),
        m => {
            return Err(ServiceError::invalid_field(format!(
                "month must be 1..12, got {m}"
            )))
        }
    };
    Ok(StatsQuery {
        dimension,
        grain,
        scope,
        year: req.year,
        month,
    })
}

fn require_card(card_number: &str) -> Result<String> {
    if card_number.is_empty() {
        return Err(ServiceError::invalid_field(
            "card_number is required for this scope",
        ));
    }
    Ok(card_number.to_string())
}

pub fn stats_reply(series: Vec<StatsBucket>) -> pb::StatsReply {
    pb::StatsReply {
        buckets: series
            .into_iter()
            .map(|b| pb::StatsBucket {
                period: b.period,
                total_amount: b.total_amount,
                count: b.count,
            })
            .collect(),
    }
}

pub fn user(user: &model::User) -> pb::UserReply {
    pb::UserReply {
        id: user.id,
        firstname: user.firstname.clone(),
        lastname: user.lastname.clone(),
        email: user.email.clone(),
        created_at: fmt_time(user.created_at),
    }
}

pub fn card(card: &model::Card) -> pb::Card {
    pb::Card {
        id: card.id,
        user_id: card.user_id,
        card_number: card.card_number.clone(),
        card_type: card.card_type.clone(),
        card_provider: card.card_provider.clone(),
        expire_date: card.expire_date.to_string(),
        cvv: card.cvv.clone(),
        created_at: fmt_time(card.created_at),
        updated_at: fmt_time(card.updated_at),
        deleted_at: fmt_opt_time(card.deleted_at),
    }
}

pub fn card_list(page: Paged<model::Card>) -> pb::CardListReply {
    pb::CardListReply {
        cards: page.items.iter().map(card).collect(),
        total: page.total,
        page: page.page,
        page_size: page.page_size,
    }
}

pub fn saldo(saldo: &model::Saldo) -> pb::Saldo {
    pb::Saldo {
        id: saldo.id,
        card_number: saldo.card_number.clone(),
        total_balance: saldo.total_balance,
        withdraw_amount: saldo.withdraw_amount.unwrap_or_default(),
        withdraw_time: fmt_opt_time(saldo.withdraw_time),
        created_at: fmt_time(saldo.created_at),
        updated_at: fmt_time(saldo.updated_at),
        deleted_at: fmt_opt_time(saldo.deleted_at),
    }
}

pub fn saldo_list(page: Paged<model::Saldo>) -> pb::SaldoListReply {
    pb::SaldoListReply {
        saldos: page.items.iter().map(saldo).collect(),
        total: page.total,
        page: page.page,
        page_size: page.page_size,
    }
}

pub fn withdraw(row: &model::Withdraw) -> pb::Withdraw {
    pb::Withdraw {
        id: row.id,
        card_number: row.card_number.clone(),
        withdraw_amount: row.withdraw_amount,
        withdraw_time: fmt_time(row.withdraw_time),
        status: row.status.as_str().to_string(),
        created_at: fmt_time(row.created_at),
        updated_at: fmt_time(row.updated_at),
        deleted_at: fmt_opt_time(row.deleted_at),
    }
}

pub fn withdraw_list(page: Paged<model::Withdraw>) -> pb::WithdrawListReply {
    pb::WithdrawListReply {
        withdraws: page.items.iter().map(withdraw).collect(),
        total: page.total,
        page: page.page,
        page_size: page.page_size,
    }
}

pub fn topup(row: &model::Topup) -> pb::Topup {
    pb::Topup {
        id: row.id,
        card_number: row.card_number.clone(),
        topup_no: row.topup_no.clone(),
        topup_amount: row.topup_amount,
        topup_method: row.topup_method.clone(),
        topup_time: fmt_time(row.topup_time),
        status: row.status.as_str().to_string(),
        created_at: fmt_time(row.created_at),
        updated_at: fmt_time(row.updated_at),
        deleted_at: fmt_opt_time(row.deleted_at),
    }
}

pub fn topup_list(page: Paged<model::Topup>) -> pb::TopupListReply {
    pb::TopupListReply {
        topups: page.items.iter().map(topup).collect(),
        total: page.total,
        page: page.page,
        page_size: page.page_size,
    }
}

pub fn transaction(row: &model::Transaction) -> pb::Transaction {
    pb::Transaction {
        id: row.id,
        card_number: row.card_number.clone(),
        amount: row.amount,
        payment_method: row.payment_method.clone(),
        merchant_id: row.merchant_id,
        transaction_time: fmt_time(row.transaction_time),
        status: row.status.as_str().to_string(),
        created_at: fmt_time(row.created_at),
        updated_at: fmt_time(row.updated_at),
        deleted_at: fmt_opt_time(row.deleted_at),
    }
}

pub fn transaction_list(page: Paged<model::Transaction>) -> pb::TransactionListReply {
    pb::TransactionListReply {
        transactions: page.items.iter().map(transaction).collect(),
        total: page.total,
        page: page.page,
        page_size: page.page_size,
    }
}

pub fn transfer(row: &model::Transfer) -> pb::Transfer {
    pb::Transfer {
        id: row.id,
        transfer_from: row.transfer_from.clone(),
        transfer_to: row.transfer_to.clone(),
        transfer_amount: row.transfer_amount,
        transfer_time: fmt_time(row.transfer_time),
        status: row.status.as_str().to_string(),
        created_at: fmt_time(row.created_at),
        updated_at: fmt_time(row.updated_at),
        deleted_at: fmt_opt_time(row.deleted_at),
    }
}

pub fn transfer_list(page: Paged<model::Transfer>) -> pb::TransferListReply {
    pb::TransferListReply {
        transfers: page.items.iter().map(transfer).collect(),
        total: page.total,
        page: page.page,
        page_size: page.page_size,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_zero_means_defaults() {
        let filter = pagination(Some(pb::Pagination {
            page: 0,
            page_size: 0,
            search: String::new(),
        }));
        assert_eq!(filter.page, 1);
        assert_eq!(filter.page_size, 10);
    }

    #[test]
    fn test_stats_query_parses_scope() {
        let query = stats_query(pb::StatsRequest {
            dimension: "amount".into(),
            grain: "month".into(),
            scope: "by-card".into(),
            card_number: "4000000000000001".into(),
            year: 2024,
            month: 0,
        })
        .unwrap();
        assert_eq!(query.scope, StatsScope::ByCard("4000000000000001".into()));

        let err = stats_query(pb::StatsRequest {
            dimension: "amount".into(),
            grain: "month".into(),
            scope: "by-card".into(),
            card_number: String::new(),
            year: 2024,
            month: 0,
        })
        .unwrap_err();
        assert_eq!(err.reason(), "InvalidField");
    }

    #[test]
    fn test_stats_query_rejects_bad_month() {
        let err = stats_query(pb::StatsRequest {
            dimension: "amount".into(),
            grain: "month".into(),
            scope: "global".into(),
            card_number: String::new(),
            year: 2024,
            month: 13,
        })
        .unwrap_err();
        assert_eq!(err.reason(), "InvalidField");
    }
}
