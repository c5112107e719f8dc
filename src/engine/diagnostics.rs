use serde_json::json;

use crate::events::{EventFlow, ListenerContext, NavEvent, NavListener};
use crate::logging::{LogLevel, Logger, event_with_fields, json_kv};

/// Global listener that logs every dispatched lifecycle event.
pub struct LifecycleLogger {
    logger: Logger,
    level: LogLevel,
    log_failures: bool,
    log_enter: bool,
}

impl LifecycleLogger {
    pub fn new(logger: Logger) -> Self {
        Self {
            logger,
            level: LogLevel::Debug,
            log_failures: true,
            log_enter: true,
        }
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    /// `sn:navigatefailed` is only dispatched when the engine runs with
    /// [`NavConfig::move_events`](super::NavConfig::move_events).
    pub fn log_failures(mut self, enabled: bool) -> Self {
        self.log_failures = enabled;
        self
    }

    pub fn log_enter(mut self, enabled: bool) -> Self {
        self.log_enter = enabled;
        self
    }
}

impl NavListener for LifecycleLogger {
    fn on_event(&mut self, _ctx: &mut ListenerContext, event: &NavEvent) -> EventFlow {
        use crate::events::NavEventKind::*;

        let wanted = match event.kind {
            NavigateFailed => self.log_failures,
            EnterDown | EnterUp => self.log_enter,
            _ => true,
        };
        if wanted {
            let fields = [
                json_kv("element", json!(event.element)),
                json_kv("section", json!(event.section)),
                json_kv("direction", json!(event.direction)),
                json_kv("related", json!(event.related_element)),
            ];
            let record = event_with_fields(
                self.level,
                "spatial_nav::events",
                event.kind.as_str(),
                fields,
            );
            let _ = self.logger.log_event(record);
        }
        EventFlow::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::NavEventKind;
    use crate::geometry::Direction;
    use crate::logging::MemorySink;

    #[test]
    fn logs_events_with_payload() {
        let sink = MemorySink::new();
        let mut listener = LifecycleLogger::new(Logger::new(sink.clone()));
        let event = NavEvent::new(NavEventKind::Focused, "play", Some("menu".into()))
            .with_direction(Some(Direction::Right));
        listener.on_event(&mut ListenerContext::new(), &event);

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].message, "sn:focused");
        assert_eq!(events[0].field("direction"), Some(&json!("right")));
        assert_eq!(events[0].target, "spatial_nav::events");
    }

    #[test]
    fn failure_logging_can_be_muted() {
        let sink = MemorySink::new();
        let mut listener = LifecycleLogger::new(Logger::new(sink.clone())).log_failures(false);
        let event = NavEvent::new(NavEventKind::NavigateFailed, "play", None);
        listener.on_event(&mut ListenerContext::new(), &event);
        assert!(sink.events().is_empty());
    }
}
