use std::sync::{Arc, Mutex};

use crate::logging::Logger;
use crate::metrics::NavigationMetrics;
use crate::section::{GlobalConfig, SectionId};

use super::audit::NavAudit;

/// Configuration handed to [`NavigationContext::init`](super::NavigationContext::init).
#[derive(Clone)]
pub struct NavConfig {
    /// Defaults every section falls back to.
    pub global: GlobalConfig,
    /// Section entered by `focus(None)` before any other.
    pub default_section: Option<SectionId>,
    /// Fire `enter-up` right after `enter-down` on a key press. Most
    /// terminals never report key releases.
    pub synthesize_key_release: bool,
    /// Upper bound on listener requests executed after one operation.
    pub max_queued_requests: usize,
    /// Also dispatch `sn:willmove` before each directional search and
    /// `sn:navigatefailed` when a move ends nowhere. Off by default: a move
    /// with nothing to reach stays silent.
    pub move_events: bool,
    /// Optional structured logger used by the engine.
    pub logger: Option<Logger>,
    pub metrics: Option<Arc<Mutex<NavigationMetrics>>>,
    pub audit: Option<Arc<dyn NavAudit>>,
}

impl Default for NavConfig {
    fn default() -> Self {
        Self {
            global: GlobalConfig::default(),
            default_section: None,
            synthesize_key_release: true,
            max_queued_requests: 32,
            move_events: false,
            logger: None,
            metrics: None,
            audit: None,
        }
    }
}

impl NavConfig {
    pub fn with_global(mut self, global: GlobalConfig) -> Self {
        self.global = global;
        self
    }

    pub fn with_default_section(mut self, section: impl Into<SectionId>) -> Self {
        self.default_section = Some(section.into());
        self
    }

    pub fn with_move_events(mut self, enabled: bool) -> Self {
        self.move_events = enabled;
        self
    }

    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn with_audit(mut self, audit: Arc<dyn NavAudit>) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Enable metrics collection if it has not already been configured.
    pub fn enable_metrics(&mut self) {
        if self.metrics.is_none() {
            self.metrics = Some(Arc::new(Mutex::new(NavigationMetrics::new())));
        }
    }

    pub fn disable_metrics(&mut self) {
        self.metrics = None;
    }

    pub fn metrics_handle(&self) -> Option<Arc<Mutex<NavigationMetrics>>> {
        self.metrics.as_ref().map(Arc::clone)
    }
}
