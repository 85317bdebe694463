//! Read-only derivations over the call log for the diagnostics view.
//!
//! This module never writes; it only reshapes [`CallLogEntry`] slices for
//! display (newest-first listing, status colouring, per-endpoint totals).

use std::collections::BTreeMap;

use serde::Serialize;

use crate::net::call_log::CallLogEntry;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusClass {
    Success,
    ClientError,
    ServerError,
    Other,
}

impl StatusClass {
    #[must_use]
    pub fn of(status: u16) -> Self {
        match status {
            200..=299 => Self::Success,
            400..=499 => Self::ClientError,
            500.. => Self::ServerError,
            _ => Self::Other,
        }
    }

    /// Badge colour used by the stats table.
    #[must_use]
    pub fn color(self) -> &'static str {
        match self {
            Self::Success => "green",
            Self::ClientError => "orange",
            Self::ServerError => "red",
            Self::Other => "gray",
        }
    }
}

/// Entries in display order, newest first.
#[must_use]
pub fn newest_first(entries: &[CallLogEntry]) -> Vec<&CallLogEntry> {
    entries.iter().rev().collect()
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct EndpointSummary {
    pub calls: usize,
    pub failures: usize,
    pub mean_duration_ms: f64,
    pub max_duration_ms: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct CallSummary {
    pub total: usize,
    pub by_class: BTreeMap<StatusClass, usize>,
    pub mean_duration_ms: f64,
    pub max_duration_ms: f64,
    /// Keyed by `METHOD path`.
    pub endpoints: BTreeMap<String, EndpointSummary>,
}

impl CallSummary {
    #[must_use]
    pub fn count(&self, class: StatusClass) -> usize {
        self.by_class.get(&class).copied().unwrap_or(0)
    }

    /// Share of calls that did not succeed, `0.0` for an empty log.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn failure_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        (self.total - self.count(StatusClass::Success)) as f64 / self.total as f64
    }
}

/// Aggregate totals, per-class counts, and per-endpoint timings.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn summarize(entries: &[CallLogEntry]) -> CallSummary {
    let mut summary = CallSummary { total: entries.len(), ..CallSummary::default() };
    let mut total_ms = 0.0;
    let mut endpoint_totals: BTreeMap<String, f64> = BTreeMap::new();

    for entry in entries {
        let class = StatusClass::of(entry.status);
        *summary.by_class.entry(class).or_insert(0) += 1;
        total_ms += entry.duration_ms;
        summary.max_duration_ms = summary.max_duration_ms.max(entry.duration_ms);

        let key = format!("{} {}", entry.method, entry.path);
        *endpoint_totals.entry(key.clone()).or_insert(0.0) += entry.duration_ms;
        let endpoint = summary.endpoints.entry(key).or_default();
        endpoint.calls += 1;
        if class != StatusClass::Success {
            endpoint.failures += 1;
        }
        endpoint.max_duration_ms = endpoint.max_duration_ms.max(entry.duration_ms);
    }

    if summary.total > 0 {
        summary.mean_duration_ms = total_ms / summary.total as f64;
    }
    for (key, endpoint) in &mut summary.endpoints {
        if let Some(total) = endpoint_totals.get(key) {
            endpoint.mean_duration_ms = total / endpoint.calls as f64;
        }
    }
    summary
}

#[cfg(test)]
#[path = "diagnostics_test.rs"]
mod tests;
