use crate::cli::ServeArgs;
use crate::demo::seed_customers;
use crate::infra::{AppState, ContactInbox, Engine};
use crate::routes;
use crate::throttle::RateLimiter;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use storefront_crm::clock::{Clock, SystemClock};
use storefront_crm::config::AppConfig;
use storefront_crm::error::AppError;
use storefront_crm::telemetry;
use tracing::{info, warn};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry, config.environment)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
        limiter: Arc::new(RateLimiter::per_minute(
            config.contact.requests_per_minute,
        )),
        inbox: Arc::new(ContactInbox::default()),
    };

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let today = clock.now().date_naive();
    let engine = Engine::in_memory(clock, config.dispatch.clone(), config.loyalty.clone());
    if args.seed {
        seed_customers(&engine, today).await?;
        let report = engine.segmentation.recompute_all().await?;
        info!(customers = report.evaluated, "sample customers loaded");
    } else {
        warn!("serving an empty in-memory store; pass --seed to load sample customers");
    }

    let app = routes::app(&engine)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        dispatch_concurrency = config.dispatch.concurrency,
        "storefront crm ready"
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}
