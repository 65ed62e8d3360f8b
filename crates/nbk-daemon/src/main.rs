// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon entrypoint: loads configuration, wires every collaborator, and
//! runs the websocket listener and result bus consumer side by side until
//! a shutdown signal arrives.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use nbk_adapters::{FsBlockSource, HttpWorkerClient, KubernetesOrchestrator, LapinResultBus, StaticTypeLoader};
use nbk_daemon::{BusConsumer, HeaderUserIdResolver, SessionRouter, WsServer};
use nbk_engine::{KernelManager, KernelManagerConfig};
use nbk_wire::Config;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::var("NBK_CONFIG_PATH").ok().map(PathBuf::from);
    let config = Config::load(config_path.as_deref())?;

    init_tracing(&config.log_filter);

    tracing::info!(bind = %config.http.bind, "starting nbk daemon");

    let orchestrator = Arc::new(
        KubernetesOrchestrator::connect(
            config.container.network.clone(),
            config.container.image.clone(),
            config.container.app_port as i32,
            config.container.volume_claim.clone(),
        )
        .await?,
    );
    let worker_client = Arc::new(HttpWorkerClient::new(Duration::from_millis(config.worker_request_timeout_ms), config.retry.clone())?);
    let block_source = Arc::new(FsBlockSource::new(config.mount_path.clone()));
    let type_loader = Arc::new(StaticTypeLoader);

    let kernel_manager_config = KernelManagerConfig {
        mount_path: config.mount_path.clone(),
        compiler_bin: config.compiler.bin.clone(),
        plugin_flag: config.compiler.plugin_flag.clone(),
        src_ext: config.compiler.src_ext.clone(),
        obj_ext: config.compiler.obj_ext.clone(),
        compile_timeout: Duration::from_millis(config.compile_timeout_ms),
        container_name_prefix: config.container.name_prefix.clone(),
        worker_app_port: config.container.app_port,
        rmq_addr: config.amqp_addr.clone(),
        export_prefix: config.export_prefix.clone(),
        block_prefix: config.block_prefix.clone(),
        chan_name: config.result_queue_name.clone(),
        block_timeout_secs: config.block_timeout_secs,
    };
    let kernel_manager = Arc::new(KernelManager::new(kernel_manager_config, orchestrator, worker_client, block_source, type_loader));

    let router = Arc::new(SessionRouter::new());
    let resolver = Arc::new(HeaderUserIdResolver::new());
    let ws_server = Arc::new(WsServer::new(
        Arc::clone(&kernel_manager),
        Arc::clone(&router),
        resolver,
        config.ws_path.clone(),
        config.session.max_consecutive_send_failures,
    ));

    let listener = TcpListener::bind(&config.http.bind).await?;
    tracing::info!(addr = %config.http.bind, path = %config.ws_path, "websocket listener bound");

    let result_bus = Box::new(LapinResultBus::connect(&config.amqp_addr, &config.result_queue_name).await?);
    let bus_consumer = BusConsumer::new(result_bus, router);

    let shutdown = CancellationToken::new();
    let signal_task = tokio::spawn(nbk_daemon::shutdown::wait_for_shutdown_signal(shutdown.clone()));
    let ws_task = tokio::spawn(ws_server.serve(listener, shutdown.clone()));
    let bus_task = tokio::spawn(bus_consumer.run(shutdown.clone()));

    let _ = tokio::join!(ws_task, bus_task);
    signal_task.abort();

    tracing::info!("nbk daemon shut down");
    Ok(())
}

fn init_tracing(filter: &str) {
    let filter_layer = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(true);
    tracing_subscriber::registry().with(filter_layer).with(fmt_layer).init();
}
