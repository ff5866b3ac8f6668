// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Registering a metric with the global recorder, independent of which
//! metric kind (counter, gauge, ...) is being registered.
//!
//! Trimmed down from a dynamic per-VPC metric registry to the one kind this
//! crate actually needs (`Counter`); the `Register<T>` trait is kept generic
//! anyway so a future metric kind does not require a new describe/register
//! code path.

use metrics::{Counter, Unit};

/// Static description of a metric, prior to registration.
pub struct MetricSpec {
    /// The metric's name, as rendered by the exporter.
    pub name: &'static str,
    /// Human-readable description, surfaced in `# HELP` lines.
    pub description: &'static str,
    /// The metric's unit.
    pub unit: Unit,
    /// Labels attached to every reading of this metric.
    pub labels: Vec<(&'static str, String)>,
}

/// Registers `Self` with the global recorder, producing a live metric
/// handle of kind `T`.
pub trait Register<T> {
    /// Describe and register this spec, returning the live handle.
    fn register(self) -> Registered<T>;
}

/// A metric spec plus the live handle obtained by registering it.
pub struct Registered<T> {
    /// The name the metric was registered under.
    pub name: &'static str,
    /// The live metric handle (e.g. `metrics::Counter`).
    pub metric: T,
}

impl Register<Counter> for MetricSpec {
    fn register(self) -> Registered<Counter> {
        metrics::describe_counter!(self.name, self.unit, self.description);
        let metric = metrics::counter!(self.name, &self.labels);
        Registered {
            name: self.name,
            metric,
        }
    }
}
