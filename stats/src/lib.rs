// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

#![deny(missing_docs, clippy::all, clippy::pedantic)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![forbid(unsafe_code)]

//! The datapath's fixed counter set: exact-hit, masked-hit, miss, lost, and
//! dropped packets, plus the "zero with baseline subtraction" management
//! semantic spec'd for worker statistics.
//!
//! Grounded in the `Register<T>`/`Registered<T>` idiom from the example
//! corpus's metrics layer, trimmed from a dynamic, per-VPC metric registry
//! down to one fixed `WorkerCounters` struct per worker: the datapath has no
//! open-ended metric surface, just these five counters per worker plus a
//! process-wide Prometheus exporter.
//!
//! `metrics::Counter` is a write-only handle: the facade has no API to read
//! a counter back, so each counter here is mirrored in a local `AtomicU64`
//! that both drives the exported metric and backs the "zero stats"
//! baseline-subtraction semantic without ever resetting the exported value.

mod register;

pub use register::{MetricSpec, Register, Registered};

use metrics::{Counter, Unit};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use std::sync::atomic::{AtomicU64, Ordering};

/// A worker's identifying label, attached to every counter it registers.
fn worker_label(worker_id: u32) -> Vec<(&'static str, String)> {
    vec![("worker_id", worker_id.to_string())]
}

/// One counter: a `metrics::Counter` handle for export, plus a local atomic
/// mirror so the current value can be read back for baseline subtraction.
/// Written only by the owning worker, using relaxed ordering, as spec'd for
/// datapath statistics counters generally.
pub struct DpCounter {
    exported: Counter,
    mirror: AtomicU64,
}

impl DpCounter {
    fn new(exported: Counter) -> Self {
        DpCounter {
            exported,
            mirror: AtomicU64::new(0),
        }
    }

    /// Increment by `delta`, updating both the exported metric and the
    /// local mirror.
    pub fn increment(&self, delta: u64) {
        self.exported.increment(delta);
        self.mirror.fetch_add(delta, Ordering::Relaxed);
    }

    /// The current value, best-effort (see spec on statistics counters:
    /// relaxed writes, best-effort reads, clamped non-negative — already
    /// guaranteed here since the mirror only ever increments).
    #[must_use]
    pub fn value(&self) -> u64 {
        self.mirror.load(Ordering::Relaxed)
    }
}

/// The fixed set of per-worker datapath counters.
pub struct WorkerCounters {
    /// EMC lookups that hit directly.
    pub exact_hit: DpCounter,
    /// Classifier lookups that hit (after an EMC miss).
    pub masked_hit: DpCounter,
    /// Lookups that matched nothing and were escalated to the upcall path.
    pub miss: DpCounter,
    /// Packets dropped because the upcall path could not be reached (gate
    /// closed, or the upcall itself failed).
    pub lost: DpCounter,
    /// Packets dropped for any other reason (malformed frame, recirculation
    /// cap exceeded, queue full).
    pub dropped: DpCounter,
    /// Time spent in each pipeline phase, mirroring `dpif-netdev.c`'s
    /// `PMD_CYCLES_*` counters.
    pub cycles: CycleCounters,
}

/// Per-phase time spent by one worker's poll loop, in nanoseconds. A
/// software stand-in for `dpif-netdev.c`'s TSC-cycle counters: this crate
/// forbids unsafe code, so phases are timed with `std::time::Instant`
/// rather than a raw CPU cycle counter.
pub struct CycleCounters {
    /// Time spent in the driver's `receive` call.
    pub poll: DpCounter,
    /// Time spent classifying a burst (EMC lookup, classifier fallback).
    pub classify: DpCounter,
    /// Time spent processing a burst end to end (classification, upcall
    /// escalation, and action execution).
    pub process: DpCounter,
}

impl CycleCounters {
    fn register(worker_id: u32) -> Self {
        let labels = worker_label(worker_id);
        CycleCounters {
            poll: describe_and_register_time(
                "datapath_poll_cycles_nanoseconds_total",
                "Time spent in the driver's receive call",
                &labels,
            ),
            classify: describe_and_register_time(
                "datapath_classify_cycles_nanoseconds_total",
                "Time spent classifying a burst",
                &labels,
            ),
            process: describe_and_register_time(
                "datapath_process_cycles_nanoseconds_total",
                "Time spent processing a burst end to end",
                &labels,
            ),
        }
    }
}

impl WorkerCounters {
    /// Register the five counters for `worker_id` with the global recorder.
    #[must_use]
    pub fn register(worker_id: u32) -> Self {
        let labels = worker_label(worker_id);
        WorkerCounters {
            exact_hit: describe_and_register(
                "datapath_exact_hit_total",
                "Packets resolved by the exact-match cache",
                &labels,
            ),
            masked_hit: describe_and_register(
                "datapath_masked_hit_total",
                "Packets resolved by the tuple-space classifier",
                &labels,
            ),
            miss: describe_and_register(
                "datapath_miss_total",
                "Packets escalated to the upcall path",
                &labels,
            ),
            lost: describe_and_register(
                "datapath_lost_total",
                "Packets dropped because the upcall path was unreachable",
                &labels,
            ),
            dropped: describe_and_register(
                "datapath_dropped_total",
                "Packets dropped for any other reason",
                &labels,
            ),
            cycles: CycleCounters::register(worker_id),
        }
    }

    /// Take a baseline snapshot of the current counter values, for the
    /// management-facing "zero stats" operation. The underlying counters
    /// are never reset; [`Baseline::delta`] against a later snapshot
    /// reproduces the "since last zero" view operators expect.
    #[must_use]
    pub fn snapshot(&self) -> Baseline {
        Baseline {
            exact_hit: self.exact_hit.value(),
            masked_hit: self.masked_hit.value(),
            miss: self.miss.value(),
            lost: self.lost.value(),
            dropped: self.dropped.value(),
        }
    }

    /// The counters' current values minus a prior [`Baseline`], i.e. what a
    /// "zeroed" read should report.
    #[must_use]
    pub fn since(&self, baseline: &Baseline) -> Baseline {
        Baseline {
            exact_hit: self.exact_hit.value().saturating_sub(baseline.exact_hit),
            masked_hit: self.masked_hit.value().saturating_sub(baseline.masked_hit),
            miss: self.miss.value().saturating_sub(baseline.miss),
            lost: self.lost.value().saturating_sub(baseline.lost),
            dropped: self.dropped.value().saturating_sub(baseline.dropped),
        }
    }
}

fn describe_and_register(name: &'static str, description: &'static str, labels: &[(&'static str, String)]) -> DpCounter {
    let registered = MetricSpec {
        name,
        description,
        unit: Unit::Count,
        labels: labels.to_vec(),
    }
    .register();
    DpCounter::new(registered.metric)
}

fn describe_and_register_time(name: &'static str, description: &'static str, labels: &[(&'static str, String)]) -> DpCounter {
    let registered = MetricSpec {
        name,
        description,
        unit: Unit::Nanoseconds,
        labels: labels.to_vec(),
    }
    .register();
    DpCounter::new(registered.metric)
}

/// A recorded baseline: the value of each counter at the moment the
/// "zero stats" operation was issued. See [`WorkerCounters::snapshot`] and
/// [`WorkerCounters::since`].
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct Baseline {
    /// Baseline value for `exact_hit`.
    pub exact_hit: u64,
    /// Baseline value for `masked_hit`.
    pub masked_hit: u64,
    /// Baseline value for `miss`.
    pub miss: u64,
    /// Baseline value for `lost`.
    pub lost: u64,
    /// Baseline value for `dropped`.
    pub dropped: u64,
}

/// Errors from installing the process-wide Prometheus exporter.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ExporterError {
    /// The exporter failed to bind or install.
    #[error("failed to install prometheus exporter: {0}")]
    Build(#[from] BuildError),
    /// The dedicated exporter runtime/thread could not be started.
    #[error("failed to start prometheus exporter runtime: {0}")]
    Runtime(std::io::Error),
}

/// Install a process-wide Prometheus exporter listening on `addr`.
///
/// The exporter's HTTP-serving future runs on a dedicated background
/// thread with its own single-threaded Tokio runtime, so callers (the
/// datapath's worker threads and management REPL) never need to be async
/// themselves.
///
/// # Errors
///
/// Returns [`ExporterError::Build`] if the listener cannot be bound, or
/// [`ExporterError::Runtime`] if the background Tokio runtime could not be
/// started.
pub fn install_exporter(addr: std::net::SocketAddr) -> Result<PrometheusHandle, ExporterError> {
    let (recorder, exporter) = PrometheusBuilder::new().with_http_listener(addr).build()?;
    let handle = recorder.handle();
    metrics::set_global_recorder(recorder).unwrap_or_else(|_| {
        tracing::warn!("a metrics recorder was already installed; keeping the existing one");
    });

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(ExporterError::Runtime)?;
    std::thread::Builder::new()
        .name("stats-exporter".to_owned())
        .spawn(move || {
            runtime.block_on(async move {
                if let Err(error) = exporter.await {
                    tracing::error!(%error, "prometheus exporter task exited");
                }
            });
        })
        .map_err(ExporterError::Runtime)?;
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_five_counters_without_panicking() {
        let counters = WorkerCounters::register(0);
        counters.exact_hit.increment(1);
        counters.masked_hit.increment(1);
        counters.miss.increment(1);
        counters.lost.increment(1);
        counters.dropped.increment(1);
    }

    #[test]
    fn cycle_counters_accumulate_independently_of_the_baseline_counters() {
        let counters = WorkerCounters::register(2);
        counters.cycles.poll.increment(100);
        counters.cycles.classify.increment(50);
        counters.cycles.process.increment(200);
        assert_eq!(counters.cycles.poll.value(), 100);
        assert_eq!(counters.cycles.classify.value(), 50);
        assert_eq!(counters.cycles.process.value(), 200);
    }

    #[test]
    fn snapshot_and_since_implement_baseline_subtraction() {
        let counters = WorkerCounters::register(1);
        counters.exact_hit.increment(5);
        let baseline = counters.snapshot();
        assert_eq!(baseline.exact_hit, 5);

        counters.exact_hit.increment(3);
        let since = counters.since(&baseline);
        assert_eq!(since.exact_hit, 3);
        // the underlying counter itself was never reset
        assert_eq!(counters.exact_hit.value(), 8);
    }
}
