mod config;
mod middleware;
mod params;
mod reply;
mod routes;
mod state;

pub mod pb {
    tonic::include_proto!("paygate");
}

use std::any::Any;
use std::time::Duration;

use axum::extract::State;
use axum::response::Response;
use axum::routing::get;
use clap::Parser;
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::prelude::*;

use config::Config;
use state::AppState;

#[derive(Parser, Debug)]
#[command(name = "paygate-gateway", about = "Payment gateway HTTP front end")]
struct Args {
    #[arg(long)]
    http_addr: Option<String>,

    #[arg(long)]
    node_addr: Option<String>,
}

const DURATION_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

fn init_tracing() -> std::io::Result<tracing_appender::non_blocking::WorkerGuard> {
    std::fs::create_dir_all("logs")?;
    let file_appender = tracing_appender::rolling::never("logs", "paygate-gateway.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_filter(tracing_subscriber::filter::LevelFilter::INFO);
    let stdout_layer = tracing_subscriber::fmt::layer().with_filter(
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "info".into()),
    );

    tracing_subscriber::registry()
        .with(file_layer)
        .with(stdout_layer)
        .init();
    Ok(guard)
}

async fn render_metrics(State(handle): State<PrometheusHandle>) -> String {
    handle.render()
}

fn recover_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| err.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    tracing::error!(panic = %detail, "handler panicked");
    reply::unhandled_panic()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let mut config = Config::from_env();
    if let Some(addr) = args.http_addr {
        config.http_addr = addr;
    }
    if let Some(addr) = args.node_addr {
        config.node_addr = addr;
    }

    let _log_guard = init_tracing()?;
    // Installed once, before the first request can record anything.
    let metrics_handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Suffix("_request_duration_seconds".to_string()),
            DURATION_BUCKETS,
        )?
        .install_recorder()?;

    info!(http_addr = %config.http_addr, node_addr = %config.node_addr, "starting paygate-gateway");

    let state = AppState::connect(
        &config.node_addr,
        Duration::from_secs(config.request_timeout_secs),
    )?;

    let app = routes::router(state)
        .route("/metrics", get(render_metrics).with_state(metrics_handle))
        .route("/healthz", get(|| async { "ok" }))
        .layer(axum::middleware::from_fn(middleware::track))
        .layer(CatchPanicLayer::custom(
            recover_panic as fn(Box<dyn Any + Send + 'static>) -> Response,
        ))
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(&config.http_addr).await?;
    info!(addr = %config.http_addr, "gateway listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await?;

    info!("paygate-gateway stopped");
    Ok(())
}
