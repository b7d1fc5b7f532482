//! Timing telemetry.
//!
//! The core only ever *writes* metrics, through the [`MetricsSink`] trait.
//! Every timed step goes through [`timed`], which measures the closure and
//! records the duration only when it returns `Ok`.
//!
//! ## Stock sinks
//!
//! | Sink | Behavior |
//! |---|---|
//! | [`NoopSink`] | Discards everything |
//! | [`LogSink`] | Emits each update as a `tracing` debug event |
//! | [`MemorySink`] | Keeps updates in memory for inspection |
//!
//! ## Metric names
//!
//! The dispatcher and the backend share these names. Backend updates carry an
//! empty scope; dispatcher updates carry the caller's scope.

use std::sync::Mutex;
use std::time::{Duration, Instant};

pub const CROP_DURATION: &str = "cropDuration";
pub const RESIZE_DURATION: &str = "resizeDuration";
pub const WATERMARK_DURATION: &str = "watermarkDuration";
pub const GRAYSCALE_DURATION: &str = "grayScaleDuration";
pub const DECODE_DURATION: &str = "decodeDuration";
pub const ENCODE_DURATION: &str = "encodeDuration";

/// Kind of value carried by an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Duration,
}

/// A single metric update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateOption {
    pub name: &'static str,
    pub kind: MetricKind,
    pub duration: Duration,
    pub scope: String,
}

/// Destination for metric updates.
///
/// Recording is fire-and-forget: there is no return value, and an
/// implementation that fails internally must swallow the failure.
pub trait MetricsSink: Send + Sync {
    fn update(&self, option: UpdateOption);
}

/// Run `op`, recording its duration under `name` if it succeeds.
pub fn timed<T, E>(
    sink: &dyn MetricsSink,
    name: &'static str,
    scope: &str,
    op: impl FnOnce() -> Result<T, E>,
) -> Result<T, E> {
    let start = Instant::now();
    let result = op();
    if result.is_ok() {
        sink.update(UpdateOption {
            name,
            kind: MetricKind::Duration,
            duration: start.elapsed(),
            scope: scope.to_string(),
        });
    }
    result
}

/// Discards every update.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl MetricsSink for NoopSink {
    fn update(&self, _option: UpdateOption) {}
}

/// Logs each update at debug level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl MetricsSink for LogSink {
    fn update(&self, option: UpdateOption) {
        tracing::debug!(
            metric = option.name,
            scope = %option.scope,
            duration_us = option.duration.as_micros() as u64,
            "metric update"
        );
    }
}

/// Collects updates in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    updates: Mutex<Vec<UpdateOption>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far, oldest first.
    pub fn updates(&self) -> Vec<UpdateOption> {
        match self.updates.lock() {
            Ok(updates) => updates.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Names of recorded updates, oldest first.
    pub fn names(&self) -> Vec<&'static str> {
        self.updates().iter().map(|u| u.name).collect()
    }
}

impl MetricsSink for MemorySink {
    fn update(&self, option: UpdateOption) {
        // A poisoned lock only means another recorder panicked; keep recording.
        let mut updates = match self.updates.lock() {
            Ok(updates) => updates,
            Err(poisoned) => poisoned.into_inner(),
        };
        updates.push(option);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timed_records_success() {
        let sink = MemorySink::new();
        let value: Result<u32, ()> = timed(&sink, CROP_DURATION, "api", || Ok(7));

        assert_eq!(value, Ok(7));
        let updates = sink.updates();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].name, CROP_DURATION);
        assert_eq!(updates[0].kind, MetricKind::Duration);
        assert_eq!(updates[0].scope, "api");
    }

    #[test]
    fn timed_skips_failure() {
        let sink = MemorySink::new();
        let value: Result<(), &str> = timed(&sink, RESIZE_DURATION, "", || Err("boom"));

        assert_eq!(value, Err("boom"));
        assert!(sink.updates().is_empty());
    }

    #[test]
    fn memory_sink_keeps_order() {
        let sink = MemorySink::new();
        let _: Result<(), ()> = timed(&sink, DECODE_DURATION, "", || Ok(()));
        let _: Result<(), ()> = timed(&sink, ENCODE_DURATION, "", || Ok(()));
        assert_eq!(sink.names(), vec![DECODE_DURATION, ENCODE_DURATION]);
    }

    #[test]
    fn noop_and_log_sinks_accept_updates() {
        let _: Result<(), ()> = timed(&NoopSink, GRAYSCALE_DURATION, "", || Ok(()));
        let _: Result<(), ()> = timed(&LogSink, WATERMARK_DURATION, "x", || Ok(()));
    }
}
