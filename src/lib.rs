//! Spatial navigation engine for keyboard and remote driven interfaces.
//!
//! Elements register a bounding box and join sections; arrow input moves
//! focus to the geometrically nearest element in the pressed direction,
//! shaped by per-section policy (restriction, leave-for rules, entry
//! element). Focus changes are announced through cancelable lifecycle
//! events. The crate has no rendering of its own: hosts report layout and
//! react to the events.

pub mod engine;
pub mod error;
pub mod events;
pub mod geometry;
pub mod logging;
pub mod metrics;
pub mod registry;
pub mod section;

pub use engine::{
    BufferedNavAudit, FocusTarget, LifecycleLogger, NavAudit, NavAuditEvent, NavAuditEventBuilder,
    NavAuditStage, NavConfig, NavigationContext, NullNavAudit, Target,
};
pub use error::{NavError, Result};
pub use events::{
    Dispatched, Dispatcher, EventFlow, ListenerContext, ListenerId, ListenerScope, MoveCause,
    NavEvent, NavEventKind, NavListener, NavRequest,
};
pub use geometry::{Direction, GeometryTuning, Point, Rect, rank, rank_groups};
pub use logging::{
    LogEvent, LogFields, LogLevel, LogSink, Logger, LoggingError, LoggingResult, MemorySink,
    WriterSink,
};
pub use metrics::{MetricSnapshot, NavigationMetrics};
pub use registry::{Element, ElementId, ElementPredicate, ElementRegistry, LeaveTarget, Selector};
pub use section::{
    DefaultElement, EnterTo, GlobalConfig, LeaveFor, NavigableFilter, PreviousMove, ResolvedConfig,
    Restrict, Section, SectionConfig, SectionId, SectionManager,
};
