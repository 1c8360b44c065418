use crate::cli::ServeArgs;
use crate::infra::{build_api, seed_directory, AppState};
use crate::routes::with_resume_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use hireflow::config::AppConfig;
use hireflow::error::AppError;
use hireflow::telemetry;
use hireflow::workflows::resume::{spawn_sla_monitor, Clock, SystemClock};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{info, warn};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let api = build_api(seed_directory()?, clock, &config.sla);
    let monitor = if args.no_monitor {
        warn!("background SLA monitor disabled; sweeps only run via POST /api/v1/sla/sweep");
        None
    } else {
        Some(spawn_sla_monitor(api.monitor.clone()))
    };

    let app = with_resume_routes(api)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        sweep_interval_minutes = config.sla.sweep_interval_minutes,
        "hiring pipeline service ready"
    );

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    readiness_flag.store(false, Ordering::Release);
    if let Some(monitor) = monitor {
        monitor.shutdown().await;
    }
    info!("hiring pipeline service stopped");

    served?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
