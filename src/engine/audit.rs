//! Audit hooks for the navigation lifecycle.
//!
//! Records carry a stage plus structured details so callers can buffer,
//! assert on, or forward the engine's progression without touching the
//! navigation code paths.

use std::sync::Mutex;
use std::time::SystemTime;

use serde_json::Value;

/// Checkpoints emitted by [`NavigationContext`](super::NavigationContext).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavAuditStage {
    Initialized,
    Uninitialized,
    SectionAdded,
    SectionUpdated,
    SectionRemoved,
    ElementRegistered,
    ElementUnregistered,
    /// Focus moved to a new element.
    FocusCommitted,
    /// Current focus was dropped because its element or section went away.
    FocusCleared,
    MoveFailed,
    Paused,
    Resumed,
}

#[derive(Debug, Clone)]
pub struct NavAuditEvent {
    pub timestamp: SystemTime,
    pub stage: NavAuditStage,
    pub details: Vec<(String, Value)>,
}

impl NavAuditEvent {
    fn new(stage: NavAuditStage) -> Self {
        Self {
            timestamp: SystemTime::now(),
            stage,
            details: Vec::new(),
        }
    }

    pub fn detail(&self, key: &str) -> Option<&Value> {
        self.details
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value)
    }
}

pub struct NavAuditEventBuilder {
    event: NavAuditEvent,
}

impl NavAuditEventBuilder {
    pub fn new(stage: NavAuditStage) -> Self {
        Self {
            event: NavAuditEvent::new(stage),
        }
    }

    pub fn detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.event.details.push((key.into(), value.into()));
        self
    }

    pub fn finish(self) -> NavAuditEvent {
        self.event
    }
}

pub trait NavAudit: Send + Sync {
    fn record(&self, event: NavAuditEvent);
}

#[derive(Debug, Default)]
pub struct NullNavAudit;

impl NavAudit for NullNavAudit {
    fn record(&self, _event: NavAuditEvent) {}
}

/// Keeps every record in memory.
#[derive(Debug, Default)]
pub struct BufferedNavAudit {
    events: Mutex<Vec<NavAuditEvent>>,
}

impl BufferedNavAudit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stages(&self) -> Vec<NavAuditStage> {
        self.events
            .lock()
            .map(|guard| guard.iter().map(|event| event.stage).collect())
            .unwrap_or_default()
    }

    pub fn events(&self) -> Vec<NavAuditEvent> {
        self.events
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

impl NavAudit for BufferedNavAudit {
    fn record(&self, event: NavAuditEvent) {
        if let Ok(mut guard) = self.events.lock() {
            guard.push(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builder_collects_details() {
        let event = NavAuditEventBuilder::new(NavAuditStage::SectionAdded)
            .detail("section", "menu")
            .detail("generated", true)
            .finish();
        assert_eq!(event.detail("section"), Some(&json!("menu")));
        assert_eq!(event.detail("missing"), None);
    }

    #[test]
    fn buffered_audit_keeps_order() {
        let audit = BufferedNavAudit::new();
        audit.record(NavAuditEventBuilder::new(NavAuditStage::Paused).finish());
        audit.record(NavAuditEventBuilder::new(NavAuditStage::Resumed).finish());
        assert_eq!(audit.stages(), vec![NavAuditStage::Paused, NavAuditStage::Resumed]);
    }
}
