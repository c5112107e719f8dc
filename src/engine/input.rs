use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};

use crate::error::Result;
use crate::events::{MoveCause, NavEvent, NavEventKind};
use crate::geometry::Direction;
use crate::metrics::NavigationMetrics;

use super::NavigationContext;

fn direction_for(code: KeyCode) -> Option<Direction> {
    match code {
        KeyCode::Up => Some(Direction::Up),
        KeyCode::Down => Some(Direction::Down),
        KeyCode::Left => Some(Direction::Left),
        KeyCode::Right => Some(Direction::Right),
        _ => None,
    }
}

impl NavigationContext {
    /// Feed a terminal key event to the engine.
    ///
    /// Arrow keys move focus, Enter fires `enter-down`/`enter-up` on the
    /// focused element. Keys with modifiers are left alone. Returns whether
    /// focus changed or an enter event was delivered.
    pub fn handle_key(&mut self, key: &KeyEvent) -> bool {
        if !self.ready || self.sections.is_empty() || !key.modifiers.is_empty() {
            return false;
        }
        if self.paused {
            if direction_for(key.code).is_some() || key.code == KeyCode::Enter {
                self.with_metrics(NavigationMetrics::record_suppressed);
            }
            return false;
        }

        let handled = match (key.code, key.kind) {
            (KeyCode::Enter, KeyEventKind::Press) => {
                match self.fire_enter(NavEventKind::EnterDown) {
                    Some(canceled) => {
                        if !canceled && self.config.synthesize_key_release {
                            self.fire_enter(NavEventKind::EnterUp);
                        }
                        true
                    }
                    None => false,
                }
            }
            (KeyCode::Enter, KeyEventKind::Repeat) => {
                self.fire_enter(NavEventKind::EnterDown).is_some()
            }
            (KeyCode::Enter, KeyEventKind::Release) => {
                self.fire_enter(NavEventKind::EnterUp).is_some()
            }
            (_, KeyEventKind::Release) => false,
            (code, _) => match direction_for(code) {
                Some(direction) => self.arrow(direction).is_ok(),
                None => false,
            },
        };
        self.drain_requests();
        handled
    }

    /// Fire `enter-up` on the focused element, as if Enter had been released.
    pub fn activate(&mut self) -> bool {
        if self.paused {
            self.with_metrics(NavigationMetrics::record_suppressed);
            return false;
        }
        let handled = self.fire_enter(NavEventKind::EnterUp).is_some();
        self.drain_requests();
        handled
    }

    /// With nothing focused an arrow key only brings focus back: to the last
    /// section's remembered element, or wherever `focus(None)` lands.
    fn arrow(&mut self, direction: Direction) -> Result<()> {
        if self.current.is_some() {
            return self.navigate(direction, None, MoveCause::Key);
        }
        let remembered = self
            .last_section
            .as_deref()
            .and_then(|id| self.sections.last_focused_element(&self.registry, id));
        match remembered {
            Some(id) => self.focus_element(&id, None, false),
            None => self.focus_any(None, false),
        }
    }

    /// `None` when nothing is focused, otherwise whether a listener canceled.
    /// A canceled `enter-down` suppresses the synthesized `enter-up`.
    fn fire_enter(&mut self, kind: NavEventKind) -> Option<bool> {
        let element = self.current.clone()?;
        let section = self.current_section().map(str::to_string)?;
        let event = NavEvent::new(kind, element, Some(section)).with_cause(MoveCause::Key);
        Some(self.emit(&event))
    }
}
