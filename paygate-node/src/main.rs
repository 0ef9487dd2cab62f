mod config;
mod rpc;
mod telemetry;

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use tonic::transport::Server;
use tracing::{error, info, warn};

use paygate_cache::Cache;
use paygate_events::{spawn_email_worker, EventBus, LogMailer};
use paygate_ledger::Repositories;
use paygate_services::{Services, TokenSigner};

use config::Config;
use rpc::auth::AuthRpc;
use rpc::card::{CardCommandRpc, CardQueryRpc, CardStatsRpc};
use rpc::pb::auth_server::AuthServer;
use rpc::pb::card_command_server::CardCommandServer;
use rpc::pb::card_query_server::CardQueryServer;
use rpc::pb::card_stats_server::CardStatsServer;
use rpc::pb::saldo_command_server::SaldoCommandServer;
use rpc::pb::saldo_query_server::SaldoQueryServer;
use rpc::pb::saldo_stats_server::SaldoStatsServer;
use rpc::pb::topup_command_server::TopupCommandServer;
use rpc::pb::topup_query_server::TopupQueryServer;
use rpc::pb::topup_stats_server::TopupStatsServer;
use rpc::pb::transaction_command_server::TransactionCommandServer;
use rpc::pb::transaction_query_server::TransactionQueryServer;
use rpc::pb::transaction_stats_server::TransactionStatsServer;
use rpc::pb::transfer_command_server::TransferCommandServer;
use rpc::pb::transfer_query_server::TransferQueryServer;
use rpc::pb::transfer_stats_server::TransferStatsServer;
use rpc::pb::withdraw_command_server::WithdrawCommandServer;
use rpc::pb::withdraw_query_server::WithdrawQueryServer;
use rpc::pb::withdraw_stats_server::WithdrawStatsServer;
use rpc::saldo::{SaldoCommandRpc, SaldoQueryRpc, SaldoStatsRpc};
use rpc::topup::{TopupCommandRpc, TopupQueryRpc, TopupStatsRpc};
use rpc::transaction::{TransactionCommandRpc, TransactionQueryRpc, TransactionStatsRpc};
use rpc::transfer::{TransferCommandRpc, TransferQueryRpc, TransferStatsRpc};
use rpc::withdraw::{WithdrawCommandRpc, WithdrawQueryRpc, WithdrawStatsRpc};

#[derive(Parser, Debug)]
#[command(name = "paygate-node", about = "Payment gateway domain services")]
struct Args {
    /// JSON config file; falls back to environment variables.
    #[arg(long)]
    config: Option<String>,

    #[arg(long)]
    grpc_addr: Option<String>,

    #[arg(long)]
    data_dir: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load_from_file(path)?,
        None => Config::from_env(),
    };
    if let Some(addr) = args.grpc_addr {
        config.grpc_addr = addr;
    }
    if let Some(dir) = args.data_dir {
        config.data_dir = dir;
    }

    let _log_guard = telemetry::init_tracing("paygate-node")?;
    // The recorder is installed here, once, before any service is built.
    let metrics_handle = telemetry::install_metrics()?;

    info!(grpc_addr = %config.grpc_addr, data_dir = %config.data_dir, "starting paygate-node");

    let repos = Repositories::open(Path::new(&config.data_dir))?;
    let cache = Cache::new(config.redis_url.clone())?;
    if config.redis_url.is_none() {
        info!("no redis url configured, using in-process cache");
    }

    let (bus, bus_rx) = EventBus::new(config.event_queue_capacity);
    let _email_worker = spawn_email_worker(bus_rx, Arc::new(LogMailer));

    let signer = match &config.token_seed_hex {
        Some(seed) => TokenSigner::from_seed(&hex::decode(seed)?)?,
        None => {
            warn!("no token seed configured, issuing tokens with an ephemeral key");
            TokenSigner::generate()
        }
    };

    let services = Services::build(repos, cache, bus, signer);

    let metrics_listener = tokio::net::TcpListener::bind(&config.metrics_addr).await?;
    info!(metrics_addr = %config.metrics_addr, "metrics endpoint up");
    let metrics_router = telemetry::metrics_router(metrics_handle);
    tokio::spawn(async move {
        if let Err(e) = axum::serve(metrics_listener, metrics_router).await {
            error!(error = %e, "metrics server stopped");
        }
    });

    let grpc_addr: SocketAddr = config.grpc_addr.parse()?;
    info!(addr = %grpc_addr, "gRPC server listening");

    Server::builder()
        .add_service(AuthServer::new(AuthRpc::new(services.auth.clone())))
        .add_service(CardQueryServer::new(CardQueryRpc::new(
            services.card_query.clone(),
        )))
        .add_service(CardCommandServer::new(CardCommandRpc::new(
            services.card_command.clone(),
        )))
        .add_service(CardStatsServer::new(CardStatsRpc::new(
            services.card_stats.clone(),
        )))
        .add_service(SaldoQueryServer::new(SaldoQueryRpc::new(
            services.saldo_query.clone(),
        )))
        .add_service(SaldoCommandServer::new(SaldoCommandRpc::new(
            services.saldo_command.clone(),
        )))
        .add_service(SaldoStatsServer::new(SaldoStatsRpc::new(
            services.saldo_stats.clone(),
        )))
        .add_service(WithdrawQueryServer::new(WithdrawQueryRpc::new(
            services.withdraw_query.clone(),
        )))
        .add_service(WithdrawCommandServer::new(WithdrawCommandRpc::new(
            services.withdraw_command.clone(),
        )))
        .add_service(WithdrawStatsServer::new(WithdrawStatsRpc::new(
            services.withdraw_stats.clone(),
        )))
        .add_service(TopupQueryServer::new(TopupQueryRpc::new(
            services.topup_query.clone(),
        )))
        .add_service(TopupCommandServer::new(TopupCommandRpc::new(
            services.topup_command.clone(),
        )))
        .add_service(TopupStatsServer::new(TopupStatsRpc::new(
            services.topup_stats.clone(),
        )))
        .add_service(TransactionQueryServer::new(TransactionQueryRpc::new(
            services.transaction_query.clone(),
        )))
        .add_service(TransactionCommandServer::new(TransactionCommandRpc::new(
            services.transaction_command.clone(),
        )))
        .add_service(TransactionStatsServer::new(TransactionStatsRpc::new(
            services.transaction_stats.clone(),
        )))
        .add_service(TransferQueryServer::new(TransferQueryRpc::new(
            services.transfer_query.clone(),
        )))
        .add_service(TransferCommandServer::new(TransferCommandRpc::new(
            services.transfer_command.clone(),
        )))
        .add_service(TransferStatsServer::new(TransferStatsRpc::new(
            services.transfer_stats.clone(),
        )))
        .serve_with_shutdown(grpc_addr, async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await?;

    info!("paygate-node stopped");
    Ok(())
}
