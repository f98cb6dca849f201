use std::env;
use std::sync::OnceLock;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::{info, warn};

pub const RANKINGS_TOTAL: &str = "fm_rankings_total";
pub const RANKING_POOL_SIZE: &str = "fm_ranking_pool_size";
pub const RANKING_DURATION_SECONDS: &str = "fm_ranking_duration_seconds";

static EXPORTER_STARTED: OnceLock<bool> = OnceLock::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankingKind {
    TopJobs,
    TopTalents,
}

impl RankingKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RankingKind::TopJobs => "top_jobs",
            RankingKind::TopTalents => "top_talents",
        }
    }
}

fn resolve_port(raw: Option<String>, default_port: u16) -> u16 {
    raw.and_then(|raw| raw.trim().parse::<u16>().ok())
        .unwrap_or(default_port)
}

/// Starts a Prometheus exporter on `0.0.0.0:<port>`, the port coming from
/// `port_env` or `default_port`. Returns whether an exporter is running;
/// repeated calls do not start a second one.
pub fn init_metrics(port_env: &str, default_port: u16) -> bool {
    let port = resolve_port(env::var(port_env).ok(), default_port);

    *EXPORTER_STARTED.get_or_init(|| {
        match PrometheusBuilder::new()
            .with_http_listener(([0, 0, 0, 0], port))
            .install()
        {
            Ok(()) => {
                describe_metrics();
                info!(metrics_port = port, "started prometheus exporter");
                true
            }
            Err(err) => {
                warn!(error = %err, metrics_port = port, "failed to start prometheus exporter");
                false
            }
        }
    })
}

fn describe_metrics() {
    describe_counter!(RANKINGS_TOTAL, "Ranking requests by kind and outcome");
    describe_histogram!(RANKING_POOL_SIZE, "Eligible pool members scored per ranking");
    describe_histogram!(
        RANKING_DURATION_SECONDS,
        Unit::Seconds,
        "Wall time spent ranking one request"
    );
}

/// Records one finished ranking. `pool_size` is `None` when the request
/// failed before a pool was scored.
pub fn record_ranking(kind: RankingKind, pool_size: Option<usize>, elapsed: Duration) {
    let outcome = if pool_size.is_some() { "ok" } else { "error" };
    counter!(RANKINGS_TOTAL, "kind" => kind.as_str(), "outcome" => outcome).increment(1);
    histogram!(RANKING_DURATION_SECONDS, "kind" => kind.as_str()).record(elapsed.as_secs_f64());
    if let Some(size) = pool_size {
        histogram!(RANKING_POOL_SIZE, "kind" => kind.as_str()).record(size as f64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_falls_back_on_missing_or_bad_values() {
        assert_eq!(resolve_port(None, 9100), 9100);
        assert_eq!(resolve_port(Some("not-a-port".into()), 9100), 9100);
        assert_eq!(resolve_port(Some(" 9200 ".into()), 9100), 9200);
    }

    #[test]
    fn records_rankings_with_kind_and_outcome_labels() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            record_ranking(RankingKind::TopJobs, Some(42), Duration::from_millis(3));
            record_ranking(RankingKind::TopTalents, None, Duration::from_millis(1));
        });

        let rendered = handle.render();
        let counter_line = |kind: &str, outcome: &str| {
            rendered.lines().any(|line| {
                line.starts_with("fm_rankings_total{")
                    && line.contains(&format!(r#"kind="{kind}""#))
                    && line.contains(&format!(r#"outcome="{outcome}""#))
                    && line.ends_with(" 1")
            })
        };
        assert!(counter_line("top_jobs", "ok"));
        assert!(counter_line("top_talents", "error"));
        assert!(rendered.contains("fm_ranking_pool_size"));
        assert!(rendered.contains("fm_ranking_duration_seconds"));
    }
}
