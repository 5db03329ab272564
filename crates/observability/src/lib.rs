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
    strategy_attempts_total: AtomicU64,
    strategy_failures_total: AtomicU64,
    retrieval_misses_total: AtomicU64,
    degraded_total: AtomicU64,
    total_latency_millis: AtomicU64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub requests_total: u64,
    pub strategy_attempts_total: u64,
    pub strategy_failures_total: u64,
    pub retrieval_misses_total: u64,
    pub degraded_total: u64,
    pub avg_latency_millis: f64,
}

impl AppMetrics {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn inc_request(&self) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("plano_requests_total").increment(1);
    }

    pub fn add_strategy_attempts(&self, attempts: usize) {
        self.strategy_attempts_total
            .fetch_add(attempts as u64, Ordering::Relaxed);
        metrics::counter!("plano_strategy_attempts_total").increment(attempts as u64);
    }

    pub fn add_strategy_failures(&self, failures: usize) {
        if failures == 0 {
            return;
        }
        self.strategy_failures_total
            .fetch_add(failures as u64, Ordering::Relaxed);
        metrics::counter!("plano_strategy_failures_total").increment(failures as u64);
    }

    pub fn inc_miss(&self) {
        self.retrieval_misses_total.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("plano_retrieval_misses_total").increment(1);
    }

    pub fn inc_degraded(&self) {
        self.degraded_total.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("plano_degraded_total").increment(1);
    }

    pub fn observe_latency(&self, duration: Duration) {
        self.total_latency_millis
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
        metrics::histogram!("plano_request_latency_seconds").record(duration.as_secs_f64());
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let requests = self.requests_total.load(Ordering::Relaxed);
        let latency = self.total_latency_millis.load(Ordering::Relaxed);

        MetricsSnapshot {
            requests_total: requests,
            strategy_attempts_total: self.strategy_attempts_total.load(Ordering::Relaxed),
            strategy_failures_total: self.strategy_failures_total.load(Ordering::Relaxed),
            retrieval_misses_total: self.retrieval_misses_total.load(Ordering::Relaxed),
            degraded_total: self.degraded_total.load(Ordering::Relaxed),
            avg_latency_millis: if requests == 0 {
                0.0
            } else {
                latency as f64 / requests as f64
            },
        }
    }
}

pub fn init_tracing(service_name: &str) {
    TRACING_INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}=info,plano_agents=info,plano_retrieval=info",
                service_name
            ))
        });

        tracing_subscriber::fmt()
            .json()
            .with_writer(std::io::stderr)
            .with_env_filter(filter)
            .with_current_span(true)
            .with_span_list(true)
            .init();
    });
}
