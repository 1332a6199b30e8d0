use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::OnceCell;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

static TRACING_INIT: OnceCell<()> = OnceCell::new();

#[derive(Debug, Default)]
pub struct AppMetrics {
    requests_total: AtomicU64,
    local_answers_total: AtomicU64,
    remote_answers_total: AtomicU64,
    remote_failures_total: AtomicU64,
    routes_selected_total: AtomicU64,
    routes_rejected_total: AtomicU64,
    sos_alerts_total: AtomicU64,
    total_latency_millis: AtomicU64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub requests_total: u64,
    pub local_answers_total: u64,
    pub remote_answers_total: u64,
    pub remote_failures_total: u64,
    pub routes_selected_total: u64,
    pub routes_rejected_total: u64,
    pub sos_alerts_total: u64,
    pub avg_latency_millis: f64,
}

impl AppMetrics {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn inc_request(&self) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_local_answer(&self) {
        self.local_answers_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_remote_answer(&self) {
        self.remote_answers_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_remote_failure(&self) {
        self.remote_failures_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_route_selected(&self) {
        self.routes_selected_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_route_rejections(&self, rejected: usize) {
        self.routes_rejected_total
            .fetch_add(rejected as u64, Ordering::Relaxed);
    }

    pub fn inc_sos_alert(&self) {
        self.sos_alerts_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn observe_latency(&self, duration: Duration) {
        self.total_latency_millis
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let requests = self.requests_total.load(Ordering::Relaxed);
        let latency = self.total_latency_millis.load(Ordering::Relaxed);

        MetricsSnapshot {
            requests_total: requests,
            local_answers_total: self.local_answers_total.load(Ordering::Relaxed),
            remote_answers_total: self.remote_answers_total.load(Ordering::Relaxed),
            remote_failures_total: self.remote_failures_total.load(Ordering::Relaxed),
            routes_selected_total: self.routes_selected_total.load(Ordering::Relaxed),
            routes_rejected_total: self.routes_rejected_total.load(Ordering::Relaxed),
            sos_alerts_total: self.sos_alerts_total.load(Ordering::Relaxed),
            avg_latency_millis: if requests == 0 {
                0.0
            } else {
                latency as f64 / requests as f64
            },
        }
    }
}

/// Installs the JSON subscriber once per process. Logs go to stderr so CLI
/// output on stdout stays machine-readable.
pub fn init_tracing(service_name: &str) {
    TRACING_INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}=info,raksha_api=info,raksha_agents=info,raksha_remote=info",
                service_name.replace('-', "_")
            ))
        });

        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(true)
            .with_span_list(true)
            .with_writer(std::io::stderr)
            .init();
    });
}
