use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "calamus_post_view_total",
            Unit::Count,
            "Views counted against a post after dedup."
        );
        describe_counter!(
            "calamus_post_view_deduped_total",
            Unit::Count,
            "Views suppressed by the per-fingerprint dedup window."
        );
        describe_counter!(
            "calamus_auth_failure_total",
            Unit::Count,
            "Rejected bearer tokens and failed logins."
        );
        describe_counter!(
            "calamus_rate_limited_total",
            Unit::Count,
            "Requests rejected by the API rate limiter."
        );
        describe_histogram!(
            "calamus_http_request_ms",
            Unit::Milliseconds,
            "Request handling latency in milliseconds."
        );
    });
}
