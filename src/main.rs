// src/main.rs

use axum::serve;
use clap::Parser;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};
use tracing_appender::rolling;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

use rust_bidbroker::api;
use rust_bidbroker::auction::stored_request_processor::StoredRequestProcessor;
use rust_bidbroker::bidding::catalog::AdapterCatalog;
use rust_bidbroker::bidding::dispatcher::ReqwestDispatcher;
use rust_bidbroker::config::{AppConfig, ConfigManager};
use rust_bidbroker::logging::logger::LogManager;
use rust_bidbroker::logging::runtime_logger::RuntimeLogger;
use rust_bidbroker::mock_bidder;
use rust_bidbroker::settings::FileStoredRequestFetcher;
use rust_bidbroker::AppState;

#[derive(Parser, Debug)]
#[command(author = "whiteCcinn", version = "1.0", about = "Stored-request resolution and bidder fan-out server")]
struct CliArgs {
    #[arg(short, long, default_value_t = 8080)]
    port: u16,
    #[arg(long, default_value = "logs")]
    log_dir: String,
    #[arg(short, long, default_value = "static/config.json")]
    config: String,
    /// 本地 Mock Bidder 端口，0 表示不启动
    #[arg(long, default_value_t = 9001)]
    mock_bidder_port: u16,
}

#[tokio::main]
async fn main() {
    // 设置环境变量 TZ 为东八区
    std::env::set_var("TZ", "Asia/Shanghai");

    let args = CliArgs::parse();

    // 初始化全局 tracing 日志
    let log_file = rolling::hourly(&args.log_dir, "bidbroker_log.json");
    let (non_blocking, _guard) = tracing_appender::non_blocking(log_file);
    let subscriber = Registry::default()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer().json().with_writer(non_blocking));
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Unable to set global tracing subscriber: {}", e);
        return;
    }
    info!("Bid broker starting on port {}", args.port);

    // 运行日志（服务状态、错误等）
    let runtime_logger = RuntimeLogger::new(&args.log_dir, "runtime", 1000, 100, 1000);
    runtime_logger.log("INFO", "Bid broker is starting...").await;

    if let Err(message) = run(&args, &runtime_logger).await {
        error!("{}", message);
        runtime_logger.log("ERROR", &message).await;
    }

    runtime_logger.log("INFO", "Bid broker shut down.").await;
    runtime_logger.shutdown().await;
}

async fn run(args: &CliArgs, runtime_logger: &Arc<RuntimeLogger>) -> Result<(), String> {
    let config = match ConfigManager::load(&args.config) {
        Ok(config) => config,
        Err(e) => {
            runtime_logger
                .log("WARN", &format!("Config {} not loaded ({}), using defaults", args.config, e))
                .await;
            ConfigManager::new(AppConfig::default())
        }
    };

    let fetcher = FileStoredRequestFetcher::load(&config.config.stored_requests_dir)
        .map_err(|e| format!("Unable to load stored requests: {}", e))?;
    let catalog = AdapterCatalog::from_config(&config, Arc::new(ReqwestDispatcher::default()))
        .map_err(|e| format!("Unable to build adapter catalog: {}", e))?;
    let log_manager = LogManager::new(&args.log_dir, 1000, 100, 1000);

    let state = Arc::new(AppState {
        processor: Arc::new(StoredRequestProcessor::new(Arc::new(fetcher))),
        catalog: Arc::new(catalog),
        log_manager: log_manager.clone(),
        config: Arc::new(config),
    });

    if args.mock_bidder_port != 0 {
        let port = args.mock_bidder_port;
        tokio::spawn(async move {
            if let Err(e) = mock_bidder::start_mock_bidder_server(port).await {
                error!("Mock bidder stopped: {}", e);
            }
        });
    }

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| format!("Unable to bind {}: {}", addr, e))?;
    runtime_logger
        .log("INFO", &format!("Bid broker running at http://{}", addr))
        .await;

    let served = serve(listener, api::router(state))
        .with_graceful_shutdown(async {
            let _ = signal::ctrl_c().await;
        })
        .await;
    runtime_logger.log("INFO", "Shutting down gracefully...").await;
    log_manager.shutdown().await;

    served.map_err(|e| format!("Server error: {}", e))
}
