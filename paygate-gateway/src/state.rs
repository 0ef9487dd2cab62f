use std::time::Duration;

use tonic::transport::{Channel, Endpoint};

use crate::pb::auth_client::AuthClient;
use crate::pb::card_command_client::CardCommandClient;
use crate::pb::card_query_client::CardQueryClient;
use crate::pb::card_stats_client::CardStatsClient;
use crate::pb::saldo_command_client::SaldoCommandClient;
use crate::pb::saldo_query_client::SaldoQueryClient;
use crate::pb::saldo_stats_client::SaldoStatsClient;
use crate::pb::topup_command_client::TopupCommandClient;
use crate::pb::topup_query_client::TopupQueryClient;
use crate::pb::topup_stats_client::TopupStatsClient;
use crate::pb::transaction_command_client::TransactionCommandClient;
use crate::pb::transaction_query_client::TransactionQueryClient;
use crate::pb::transaction_stats_client::TransactionStatsClient;
use crate::pb::transfer_command_client::TransferCommandClient;
use crate::pb::transfer_query_client::TransferQueryClient;
use crate::pb::transfer_stats_client::TransferStatsClient;
use crate::pb::withdraw_command_client::WithdrawCommandClient;
use crate::pb::withdraw_query_client::WithdrawQueryClient;
use crate::pb::withdraw_stats_client::WithdrawStatsClient;

/// Claims attached to the request by the bearer middleware.
#[derive(Debug, Clone)]
pub struct AuthClaims {
    pub user_id: u64,
    pub email: String,
}

/// One lazily-connected channel to the domain services, one typed client
/// per sub-service. Clients are cheap clones of the channel.
#[derive(Clone)]
pub struct AppState {
    pub auth: AuthClient<Channel>,

    pub card_query: CardQueryClient<Channel>,
    pub card_command: CardCommandClient<Channel>,
    pub card_stats: CardStatsClient<Channel>,

    pub saldo_query: SaldoQueryClient<Channel>,
    pub saldo_command: SaldoCommandClient<Channel>,
    pub saldo_stats: SaldoStatsClient<Channel>,

    pub withdraw_query: WithdrawQueryClient<Channel>,
    pub withdraw_command: WithdrawCommandClient<Channel>,
    pub withdraw_stats: WithdrawStatsClient<Channel>,

    pub topup_query: TopupQueryClient<Channel>,
    pub topup_command: TopupCommandClient<Channel>,
    pub topup_stats: TopupStatsClient<Channel>,

    pub transaction_query: TransactionQueryClient<Channel>,
    pub transaction_command: TransactionCommandClient<Channel>,
    pub transaction_stats: TransactionStatsClient<Channel>,

    pub transfer_query: TransferQueryClient<Channel>,
    pub transfer_command: TransferCommandClient<Channel>,
    pub transfer_stats: TransferStatsClient<Channel>,
}

impl AppState {
    /// The connection is lazy so the gateway can start before the domain
    /// services; every request carries the per-request deadline.
    pub fn connect(
        node_addr: &str,
        request_timeout: Duration,
    ) -> Result<Self, tonic::transport::Error> {
        let channel = Endpoint::from_shared(node_addr.to_string())?
            .timeout(request_timeout)
            .connect_timeout(Duration::from_secs(2))
            .connect_lazy();

        Ok(Self {
            auth: AuthClient::new(channel.clone()),

            card_query: CardQueryClient::new(channel.clone()),
            card_command: CardCommandClient::new(channel.clone()),
            card_stats: CardStatsClient::new(channel.clone()),

            saldo_query: SaldoQueryClient::new(channel.clone()),
            saldo_command: SaldoCommandClient::new(channel.clone()),
            saldo_stats: SaldoStatsClient::new(channel.clone()),

            withdraw_query: WithdrawQueryClient::new(channel.clone()),
            withdraw_command: WithdrawCommandClient::new(channel.clone()),
            withdraw_stats: WithdrawStatsClient::new(channel.clone()),

            topup_query: TopupQueryClient::new(channel.clone()),
            topup_command: TopupCommandClient::new(channel.clone()),
            topup_stats: TopupStatsClient::new(channel.clone()),

            transaction_query: TransactionQueryClient::new(channel.clone()),
            transaction_command: TransactionCommandClient::new(channel.clone()),
            transaction_stats: TransactionStatsClient::new(channel.clone()),

            transfer_query: TransferQueryClient::new(channel.clone()),
            transfer_command: TransferCommandClient::new(channel.clone()),
            transfer_stats: TransferStatsClient::new(channel),
        })
    }
}
