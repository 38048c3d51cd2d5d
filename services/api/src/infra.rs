use metrics_exporter_prometheus::PrometheusHandle;
use mentor_draw::config::DrawConfig;
use mentor_draw::draw::{DrawOrchestrator, MentorRequest, PersistenceGateway};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Seeded when `DRAW_SEED` is set so a cohort's draw can be reproduced.
pub(crate) fn build_orchestrator<G>(gateway: Arc<G>, config: &DrawConfig) -> DrawOrchestrator<G>
where
    G: PersistenceGateway + 'static,
{
    match config.seed {
        Some(seed) => DrawOrchestrator::seeded(gateway, config.rules, seed),
        None => DrawOrchestrator::new(gateway, config.rules),
    }
}

/// Parse `NAME=CAPACITY` as accepted by `--mentor`.
pub(crate) fn parse_mentor(raw: &str) -> Result<MentorRequest, String> {
    let (name, capacity) = raw
        .rsplit_once('=')
        .ok_or_else(|| format!("expected NAME=CAPACITY, got '{raw}'"))?;

    let name = name.trim();
    if name.is_empty() {
        return Err(format!("mentor name is empty in '{raw}'"));
    }

    let capacity = capacity
        .trim()
        .parse::<u32>()
        .map_err(|err| format!("invalid capacity in '{raw}' ({err})"))?;

    Ok(MentorRequest::new(name, capacity))
}
