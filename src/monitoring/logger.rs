use serde::Serialize;
use tracing::info;

use crate::types::AppConfig;

/// `RUST_LOG` used when none is set. Lists every target the crate logs under.
pub const DEFAULT_LOG_FILTER: &str = "wager_slip=info,session=info,slip=info,sync=info,\
placement=info,catalog=info,metrics=info,storage=info,warn";

#[derive(Serialize)]
struct StartupLog<'a> {
    event: &'a str,
    user: &'a str,
    backend: &'a str,
    audit_trail: bool,
    catalog: Option<&'a str>,
}

pub fn log_startup(cfg: &AppConfig) {
    let backend = match cfg.remote.backend {
        crate::types::RemoteBackend::Redis => "redis",
        crate::types::RemoteBackend::Http => "http",
        crate::types::RemoteBackend::Memory => "memory",
    };
    let payload = StartupLog {
        event: "startup",
        user: &cfg.user_id,
        backend,
        audit_trail: cfg.postgres.is_some(),
        catalog: cfg.catalog_path.as_deref(),
    };
    info!(target: "session", startup = serde_json::to_string(&payload).unwrap_or_default().as_str());
}
