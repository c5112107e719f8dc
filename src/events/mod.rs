//! Lifecycle events and their synchronous dispatcher.
//!
//! Listeners are attached to an element, to a section (they see events of
//! every member, like a bubbling DOM listener) or globally. Dispatch runs
//! element listeners first, then the section's, then global ones, each in
//! registration order. Listeners never get `&mut` access to the engine: they
//! queue requests on the [`ListenerContext`] and the engine runs them once
//! the current operation has finished.

use serde::Serialize;

use crate::geometry::Direction;
use crate::registry::{ElementId, Selector};
use crate::section::SectionId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum NavEventKind {
    WillMove,
    WillUnfocus,
    WillFocus,
    Unfocused,
    Focused,
    NavigateFailed,
    EnterDown,
    EnterUp,
}

impl NavEventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NavEventKind::WillMove => "sn:willmove",
            NavEventKind::WillUnfocus => "sn:willunfocus",
            NavEventKind::WillFocus => "sn:willfocus",
            NavEventKind::Unfocused => "sn:unfocused",
            NavEventKind::Focused => "sn:focused",
            NavEventKind::NavigateFailed => "sn:navigatefailed",
            NavEventKind::EnterDown => "sn:enter-down",
            NavEventKind::EnterUp => "sn:enter-up",
        }
    }

    /// `will-*` and enter events honour [`EventFlow::Cancel`].
    pub fn is_cancelable(self) -> bool {
        matches!(
            self,
            NavEventKind::WillMove
                | NavEventKind::WillUnfocus
                | NavEventKind::WillFocus
                | NavEventKind::EnterDown
                | NavEventKind::EnterUp
        )
    }
}

/// What triggered a directional move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveCause {
    Api,
    Key,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NavEvent {
    pub kind: NavEventKind,
    pub element: ElementId,
    pub section: Option<SectionId>,
    pub direction: Option<Direction>,
    /// The element on the other side of a transition: the next element for
    /// `will-unfocus`/`unfocused`, the previous one for `will-focus`/`focused`.
    pub related_element: Option<ElementId>,
    pub related_section: Option<SectionId>,
    pub cause: Option<MoveCause>,
}

impl NavEvent {
    pub fn new(
        kind: NavEventKind,
        element: impl Into<ElementId>,
        section: Option<SectionId>,
    ) -> Self {
        Self {
            kind,
            element: element.into(),
            section,
            direction: None,
            related_element: None,
            related_section: None,
            cause: None,
        }
    }

    pub fn with_direction(mut self, direction: Option<Direction>) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_related(mut self, element: Option<ElementId>, section: Option<SectionId>) -> Self {
        self.related_element = element;
        self.related_section = section;
        self
    }

    pub fn with_cause(mut self, cause: MoveCause) -> Self {
        self.cause = Some(cause);
        self
    }
}

/// Listener verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventFlow {
    Continue,
    Cancel,
}

/// Work a listener wants the engine to do after the current dispatch.
#[derive(Debug, Clone)]
pub enum NavRequest {
    Move {
        direction: Direction,
        origin: Option<Selector>,
    },
    Focus {
        target: Option<String>,
        silent: bool,
    },
    Pause,
    Resume,
}

/// Handed to listeners during dispatch.
#[derive(Debug, Default)]
pub struct ListenerContext {
    requests: Vec<NavRequest>,
}

impl ListenerContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_move(&mut self, direction: Direction) {
        self.requests.push(NavRequest::Move {
            direction,
            origin: None,
        });
    }

    pub fn request_move_from(&mut self, direction: Direction, origin: Selector) {
        self.requests.push(NavRequest::Move {
            direction,
            origin: Some(origin),
        });
    }

    pub fn request_focus(&mut self, target: Option<&str>) {
        self.requests.push(NavRequest::Focus {
            target: target.map(str::to_string),
            silent: false,
        });
    }

    pub fn request_pause(&mut self) {
        self.requests.push(NavRequest::Pause);
    }

    pub fn request_resume(&mut self) {
        self.requests.push(NavRequest::Resume);
    }

    pub fn into_requests(self) -> Vec<NavRequest> {
        self.requests
    }
}

pub trait NavListener: Send {
    fn on_event(&mut self, ctx: &mut ListenerContext, event: &NavEvent) -> EventFlow;
}

impl<F> NavListener for F
where
    F: FnMut(&mut ListenerContext, &NavEvent) -> EventFlow + Send,
{
    fn on_event(&mut self, ctx: &mut ListenerContext, event: &NavEvent) -> EventFlow {
        self(ctx, event)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenerScope {
    Element(ElementId),
    Section(SectionId),
    Global,
}

struct Registration {
    id: ListenerId,
    scope: ListenerScope,
    listener: Box<dyn NavListener>,
}

/// Outcome of dispatching one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Dispatched {
    pub delivered: usize,
    pub canceled: bool,
}

#[derive(Default)]
pub struct Dispatcher {
    listeners: Vec<Registration>,
    next_id: u64,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<L>(&mut self, scope: ListenerScope, listener: L) -> ListenerId
    where
        L: NavListener + 'static,
    {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.listeners.push(Registration {
            id,
            scope,
            listener: Box::new(listener),
        });
        id
    }

    pub fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|entry| entry.id != id);
        self.listeners.len() != before
    }

    /// Drop every listener bound to `scope`.
    pub fn remove_scope(&mut self, scope: &ListenerScope) -> usize {
        let before = self.listeners.len();
        self.listeners.retain(|entry| entry.scope != *scope);
        before - self.listeners.len()
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub fn clear(&mut self) {
        self.listeners.clear();
    }

    pub fn dispatch(&mut self, event: &NavEvent, ctx: &mut ListenerContext) -> Dispatched {
        let element_scope = ListenerScope::Element(event.element.clone());
        let section_scope = event.section.clone().map(ListenerScope::Section);
        let passes = [Some(element_scope), section_scope, Some(ListenerScope::Global)];

        let mut outcome = Dispatched::default();
        for scope in passes.iter().flatten() {
            for entry in self.listeners.iter_mut().filter(|entry| entry.scope == *scope) {
                let flow = entry.listener.on_event(ctx, event);
                outcome.delivered += 1;
                if flow == EventFlow::Cancel && event.kind.is_cancelable() {
                    outcome.canceled = true;
                }
            }
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn recorder(log: &Arc<Mutex<Vec<String>>>, tag: &'static str) -> impl NavListener + 'static {
        let log = Arc::clone(log);
        move |_: &mut ListenerContext, event: &NavEvent| {
            log.lock().unwrap().push(format!("{tag}:{}", event.kind.as_str()));
            EventFlow::Continue
        }
    }

    #[test]
    fn dispatch_runs_element_then_section_then_global() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut dispatcher = Dispatcher::new();
        dispatcher.add(ListenerScope::Global, recorder(&log, "global"));
        dispatcher.add(ListenerScope::Section("menu".into()), recorder(&log, "section"));
        dispatcher.add(ListenerScope::Element("play".into()), recorder(&log, "element"));
        dispatcher.add(ListenerScope::Element("other".into()), recorder(&log, "other"));

        let event = NavEvent::new(NavEventKind::Focused, "play", Some("menu".into()));
        let outcome = dispatcher.dispatch(&event, &mut ListenerContext::new());

        assert_eq!(outcome.delivered, 3);
        assert_eq!(
            *log.lock().unwrap(),
            vec!["element:sn:focused", "section:sn:focused", "global:sn:focused"]
        );
    }

    #[test]
    fn cancel_only_counts_for_cancelable_events() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.add(ListenerScope::Global, |_: &mut ListenerContext, _: &NavEvent| {
            EventFlow::Cancel
        });
        let mut ctx = ListenerContext::new();
        let will = NavEvent::new(NavEventKind::WillFocus, "a", None);
        let done = NavEvent::new(NavEventKind::Focused, "a", None);
        assert!(dispatcher.dispatch(&will, &mut ctx).canceled);
        assert!(!dispatcher.dispatch(&done, &mut ctx).canceled);
    }

    #[test]
    fn removing_listeners_by_id_and_scope() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut dispatcher = Dispatcher::new();
        let id = dispatcher.add(ListenerScope::Global, recorder(&log, "g"));
        dispatcher.add(ListenerScope::Element("a".into()), recorder(&log, "a1"));
        dispatcher.add(ListenerScope::Element("a".into()), recorder(&log, "a2"));

        assert!(dispatcher.remove(id));
        assert!(!dispatcher.remove(id));
        assert_eq!(dispatcher.remove_scope(&ListenerScope::Element("a".into())), 2);
        assert!(dispatcher.is_empty());
    }

    #[test]
    fn listeners_queue_requests() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.add(
            ListenerScope::Global,
            |ctx: &mut ListenerContext, _: &NavEvent| {
                ctx.request_move(Direction::Down);
                ctx.request_focus(Some("menu"));
                EventFlow::Continue
            },
        );
        let mut ctx = ListenerContext::new();
        dispatcher.dispatch(&NavEvent::new(NavEventKind::Focused, "a", None), &mut ctx);
        let requests = ctx.into_requests();
        assert_eq!(requests.len(), 2);
        assert!(matches!(
            requests[0],
            NavRequest::Move {
                direction: Direction::Down,
                origin: None
            }
        ));
    }
}
