/*!
 * Structured Tracing
 * Diagnostics for the controller and workers using the tracing crate
 *
 * Features:
 * - Run ID generation for correlating every event of one simulation
 * - JSON-formatted logs for structured parsing
 * - A run span carrying the configuration of the simulation
 */

use std::time::Instant;
use tracing::{debug, info, span, warn, Level};
use tracing_subscriber::{fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

/// Initialize structured tracing
///
/// Environment variables:
/// - RUST_LOG: Set log level (default: info)
/// - OSS_TRACE_JSON: Enable JSON output (default: false)
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let use_json = std::env::var("OSS_TRACE_JSON")
        .map(|v| v == "1" || v == "true")
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(env_filter);

    let result = if use_json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_names(true)
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .compact(),
            )
            .try_init()
    };

    if result.is_ok() {
        debug!(json = use_json, "Structured tracing initialized");
    }
}

/// Generate a unique ID for one simulation run
pub fn generate_run_id() -> String {
    Uuid::new_v4().to_string()
}

/// Span covering one whole simulation run
pub struct RunSpan {
    span: tracing::Span,
    start: Instant,
    run_id: String,
}

impl RunSpan {
    pub fn new(max_concurrent: usize, resource_count: usize) -> Self {
        let run_id = generate_run_id();

        let span = span!(
            Level::INFO,
            "run",
            run_id = %run_id,
            max_concurrent = max_concurrent,
            resources = resource_count,
            duration_ms = tracing::field::Empty,
            reason = tracing::field::Empty,
        );

        Self {
            span,
            start: Instant::now(),
            run_id,
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// The underlying span, for instrumenting futures
    pub fn span(&self) -> &tracing::Span {
        &self.span
    }

    /// Record why the run ended
    pub fn record_reason(&self, reason: &str) {
        self.span.record("reason", reason);
    }
}

impl Drop for RunSpan {
    fn drop(&mut self) {
        let duration = self.start.elapsed();
        let _entered = self.span.enter();
        self.span.record("duration_ms", duration.as_millis() as u64);

        if duration.as_secs() > 60 {
            warn!(
                run_id = %self.run_id,
                duration_ms = duration.as_millis() as u64,
                "run exceeded one minute of wall time"
            );
        } else {
            info!(
                run_id = %self.run_id,
                duration_ms = duration.as_millis() as u64,
                "run finished"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_twice() {
        init_tracing();
        init_tracing();
    }

    #[test]
    fn test_run_ids_unique() {
        assert_ne!(generate_run_id(), generate_run_id());
        let span = RunSpan::new(5, 20);
        assert_eq!(span.run_id().len(), 36);
    }
}
