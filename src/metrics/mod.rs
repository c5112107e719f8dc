use crate::logging::{LogEvent, LogFields, LogLevel};
use serde_json::json;
use std::time::Duration;

/// Counters accumulated by a [`NavigationContext`](crate::NavigationContext).
#[derive(Debug, Default, Clone)]
pub struct NavigationMetrics {
    moves_attempted: u64,
    moves_succeeded: u64,
    moves_failed: u64,
    focus_changes: u64,
    events_dispatched: u64,
    events_canceled: u64,
    suppressed: u64,
    requests_dropped: u64,
}

impl NavigationMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_move(&mut self, succeeded: bool) {
        self.moves_attempted = self.moves_attempted.saturating_add(1);
        if succeeded {
            self.moves_succeeded = self.moves_succeeded.saturating_add(1);
        } else {
            self.moves_failed = self.moves_failed.saturating_add(1);
        }
    }

    pub fn record_focus_change(&mut self) {
        self.focus_changes = self.focus_changes.saturating_add(1);
    }

    pub fn record_event(&mut self, canceled: bool) {
        self.events_dispatched = self.events_dispatched.saturating_add(1);
        if canceled {
            self.events_canceled = self.events_canceled.saturating_add(1);
        }
    }

    /// Input ignored because navigation was paused.
    pub fn record_suppressed(&mut self) {
        self.suppressed = self.suppressed.saturating_add(1);
    }

    pub fn record_dropped_requests(&mut self, count: usize) {
        if count > 0 {
            self.requests_dropped = self.requests_dropped.saturating_add(count as u64);
        }
    }

    pub fn snapshot(&self, uptime: Duration) -> MetricSnapshot {
        MetricSnapshot {
            uptime_ms: uptime.as_millis() as u64,
            moves_attempted: self.moves_attempted,
            moves_succeeded: self.moves_succeeded,
            moves_failed: self.moves_failed,
            focus_changes: self.focus_changes,
            events_dispatched: self.events_dispatched,
            events_canceled: self.events_canceled,
            suppressed: self.suppressed,
            requests_dropped: self.requests_dropped,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricSnapshot {
    pub uptime_ms: u64,
    pub moves_attempted: u64,
    pub moves_succeeded: u64,
    pub moves_failed: u64,
    pub focus_changes: u64,
    pub events_dispatched: u64,
    pub events_canceled: u64,
    pub suppressed: u64,
    pub requests_dropped: u64,
}

impl MetricSnapshot {
    pub fn to_log_event(&self, target: &str) -> LogEvent {
        LogEvent::with_fields(LogLevel::Info, target, "navigation_metrics", self.as_fields())
    }

    pub fn as_fields(&self) -> LogFields {
        let mut map = LogFields::new();
        map.insert("uptime_ms".to_string(), json!(self.uptime_ms));
        map.insert("moves_attempted".to_string(), json!(self.moves_attempted));
        map.insert("moves_succeeded".to_string(), json!(self.moves_succeeded));
        map.insert("moves_failed".to_string(), json!(self.moves_failed));
        map.insert("focus_changes".to_string(), json!(self.focus_changes));
        map.insert("events_dispatched".to_string(), json!(self.events_dispatched));
        map.insert("events_canceled".to_string(), json!(self.events_canceled));
        map.insert("suppressed".to_string(), json!(self.suppressed));
        map.insert("requests_dropped".to_string(), json!(self.requests_dropped));
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_outcomes_separately() {
        let mut metrics = NavigationMetrics::new();
        metrics.record_move(true);
        metrics.record_move(false);
        metrics.record_event(false);
        metrics.record_event(true);
        metrics.record_suppressed();
        let snapshot = metrics.snapshot(Duration::from_millis(1500));
        assert_eq!(snapshot.moves_attempted, 2);
        assert_eq!(snapshot.moves_succeeded, 1);
        assert_eq!(snapshot.moves_failed, 1);
        assert_eq!(snapshot.events_dispatched, 2);
        assert_eq!(snapshot.events_canceled, 1);
        assert_eq!(snapshot.suppressed, 1);
        assert_eq!(snapshot.uptime_ms, 1500);
    }

    #[test]
    fn snapshot_log_event_carries_fields() {
        let event = NavigationMetrics::new()
            .snapshot(Duration::ZERO)
            .to_log_event("spatial_nav::metrics");
        assert_eq!(event.message, "navigation_metrics");
        assert_eq!(event.field("moves_attempted"), Some(&json!(0)));
    }
}
