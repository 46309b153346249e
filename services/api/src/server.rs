use crate::cli::ServeArgs;
use crate::infra::{
    seed_demo_roster, spawn_alert_drain, AppState, ChannelAlertPublisher,
    InMemoryClassificationStore, InMemoryWorkforceDirectory,
};
use crate::routes::with_operational_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use misclass_guard::classification::{
    ClassificationService, ClassificationStore, RiskAlertPublisher, WorkforceDirectory,
};
use misclass_guard::config::AppConfig;
use misclass_guard::error::AppError;
use misclass_guard::telemetry;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

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
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let scoring_config = config.classification.scoring_config()?;
    let store = Arc::new(InMemoryClassificationStore::new(
        config.classification.dashboard_top_n,
    ));
    let directory = Arc::new(InMemoryWorkforceDirectory::default());
    if args.seed_demo {
        seed_demo_roster(&directory).map_err(|err| AppError::Classification(err.into()))?;
        info!("seeded in-memory roster with demo organizations");
    }
    let (alerts, alert_receiver) = ChannelAlertPublisher::new();
    let _alert_drain = spawn_alert_drain(alert_receiver);

    let service = Arc::new(ClassificationService::new(
        store,
        directory,
        Arc::new(alerts),
        scoring_config,
    )?);

    let shutdown = Arc::new(AtomicBool::new(false));
    let _scheduler = spawn_reassessment_schedule(
        service.clone(),
        config.classification.reassessment_interval(),
        shutdown.clone(),
    );

    let app = with_operational_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        interval_hours = config.classification.reassessment_interval_hours,
        "misclassification guard ready"
    );

    let served = axum::serve(listener, app).await;
    shutdown.store(true, Ordering::Release);
    served?;
    Ok(())
}

/// Runs the reassessment batch on a fixed cadence. The first tick fires one full
/// interval after startup.
fn spawn_reassessment_schedule<S, D, A>(
    service: Arc<ClassificationService<S, D, A>>,
    every: Duration,
    shutdown: Arc<AtomicBool>,
) -> tokio::task::JoinHandle<()>
where
    S: ClassificationStore + 'static,
    D: WorkforceDirectory + 'static,
    A: RiskAlertPublisher + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + every, every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            if shutdown.load(Ordering::Acquire) {
                break;
            }

            let batch_service = service.clone();
            let batch_shutdown = shutdown.clone();
            let outcome = tokio::task::spawn_blocking(move || {
                batch_service.run_reassessment_batch_until(&batch_shutdown)
            })
            .await;

            match outcome {
                Ok(Ok(report)) => info!(
                    organizations = report.organizations,
                    attempted = report.attempted,
                    failed = report.failed(),
                    cancelled = report.cancelled,
                    "scheduled reassessment finished"
                ),
                Ok(Err(err)) => warn!(error = %err, "scheduled reassessment failed"),
                Err(join_error) => {
                    error!(error = %join_error, "scheduled reassessment task aborted")
                }
            }
        }
    })
}
