use crate::cli::ServeArgs;
use crate::infra::{build_orchestrator, AppState};
use crate::routes::with_draw_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use mentor_draw::config::{AppConfig, StoreConfig};
use mentor_draw::draw::{InMemoryGateway, PersistenceGateway, RestGateway};
use mentor_draw::error::AppError;
use mentor_draw::telemetry;
use std::sync::atomic::{AtomicBool, Ordering};
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

    telemetry::init(&config.telemetry, config.environment)?;

    match &config.store {
        StoreConfig::Memory => {
            warn!("using the in-memory store; draws are lost on restart");
            serve(Arc::new(InMemoryGateway::new()), &config).await
        }
        StoreConfig::Rest {
            url,
            api_key,
            timeout,
        } => {
            let gateway = RestGateway::new(url.as_str(), api_key.as_str(), *timeout)?;
            info!(%url, "using REST store");
            serve(Arc::new(gateway), &config).await
        }
    }
}

async fn serve<G>(gateway: Arc<G>, config: &AppConfig) -> Result<(), AppError>
where
    G: PersistenceGateway + 'static,
{
    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let orchestrator = Arc::new(build_orchestrator(gateway, &config.draw));
    let app = with_draw_routes(orchestrator)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, seeded = config.draw.seed.is_some(), "mentor draw service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
