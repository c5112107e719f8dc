//! Navigation engine.
//!
//! [`NavigationContext`] owns the element registry, the sections, the
//! listener dispatcher and the focus state. Every public operation runs to
//! completion on the calling thread; requests queued by listeners are
//! executed in FIFO order once the operation that triggered them returns.

mod audit;
mod config;
mod diagnostics;
mod input;


pub use audit::{
    BufferedNavAudit, NavAudit, NavAuditEvent, NavAuditEventBuilder, NavAuditStage, NullNavAudit,
};
pub use config::NavConfig;
pub use diagnostics::LifecycleLogger;

use std::collections::VecDeque;
use std::time::Instant;

use serde_json::json;

use crate::error::{NavError, Result};
use crate::events::{
    Dispatcher, ListenerContext, ListenerId, ListenerScope, MoveCause, NavEvent, NavEventKind,
    NavListener, NavRequest,
};
use crate::geometry::{Direction, Rect, rank_groups};
use crate::logging::{LogLevel, event_with_fields, json_kv};
use crate::metrics::{MetricSnapshot, NavigationMetrics};
use crate::registry::{Element, ElementId, ElementRegistry, LeaveTarget, Selector};
use crate::section::{
    GlobalConfig, PreviousMove, ResolvedConfig, Restrict, Section, SectionConfig, SectionId,
    SectionManager,
};

const ENGINE_TARGET: &str = "spatial_nav::engine";
const METRICS_TARGET: &str = "spatial_nav::metrics";

/// What a programmatic focus call points at.
#[derive(Debug, Clone)]
pub enum FocusTarget {
    /// Enter a section through its entry element.
    Section(SectionId),
    /// First navigable element matching the selector.
    Selector(Selector),
}

impl FocusTarget {
    /// A known section id wins over a selector with the same spelling.
    pub fn parse(input: &str, sections: &SectionManager) -> Result<Self> {
        if sections.contains(input) {
            return Ok(FocusTarget::Section(input.to_string()));
        }
        Ok(match input.parse::<Selector>()? {
            Selector::Section(Some(id)) => FocusTarget::Section(id),
            selector => FocusTarget::Selector(selector),
        })
    }
}

impl From<Selector> for FocusTarget {
    fn from(selector: Selector) -> Self {
        match selector {
            Selector::Section(Some(id)) => FocusTarget::Section(id),
            selector => FocusTarget::Selector(selector),
        }
    }
}

/// Subject of [`NavigationContext::set_enabled`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target<'a> {
    Element(&'a str),
    Section(&'a str),
}

pub struct NavigationContext {
    registry: ElementRegistry,
    sections: SectionManager,
    dispatcher: Dispatcher,
    config: NavConfig,
    current: Option<ElementId>,
    last_section: Option<SectionId>,
    default_section: Option<SectionId>,
    ready: bool,
    paused: bool,
    pending: VecDeque<NavRequest>,
    started_at: Instant,
}

impl Default for NavigationContext {
    fn default() -> Self {
        Self::new()
    }
}

impl NavigationContext {
    pub fn new() -> Self {
        Self {
            registry: ElementRegistry::new(),
            sections: SectionManager::new(),
            dispatcher: Dispatcher::new(),
            config: NavConfig::default(),
            current: None,
            last_section: None,
            default_section: None,
            ready: false,
            paused: false,
            pending: VecDeque::new(),
            started_at: Instant::now(),
        }
    }

    /// Start (or reconfigure) the engine. Sections and elements already
    /// present are kept.
    pub fn init(&mut self, mut config: NavConfig) -> Result<()> {
        let global = std::mem::take(&mut config.global);
        self.sections.replace_global(global)?;
        if let Some(section) = config.default_section.take() {
            self.default_section = Some(section);
        }
        self.config = config;
        if !self.ready {
            self.started_at = Instant::now();
        }
        self.ready = true;
        self.ensure_current_valid();
        self.audit(NavAuditEventBuilder::new(NavAuditStage::Initialized));
        self.log(
            LogLevel::Info,
            "initialized",
            [json_kv("default_section", json!(self.default_section))],
        );
        Ok(())
    }

    /// Drop every section, element, listener and focus record.
    pub fn uninit(&mut self) {
        self.registry.clear();
        self.sections.clear();
        self.dispatcher.clear();
        self.pending.clear();
        self.current = None;
        self.last_section = None;
        self.default_section = None;
        self.paused = false;
        self.ready = false;
        self.audit(NavAuditEventBuilder::new(NavAuditStage::Uninitialized));
        self.log(LogLevel::Info, "uninitialized", std::iter::empty());
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn config(&self) -> &NavConfig {
        &self.config
    }

    pub fn global(&self) -> &GlobalConfig {
        self.sections.global()
    }

    // ---- sections -------------------------------------------------------

    /// Create a section and return its id (`section-N` when `id` is `None`).
    pub fn add(&mut self, id: Option<&str>, config: SectionConfig) -> Result<SectionId> {
        let id = self.sections.create(id, config)?;
        self.audit(
            NavAuditEventBuilder::new(NavAuditStage::SectionAdded).detail("section", id.as_str()),
        );
        self.log(LogLevel::Debug, "section_added", [json_kv("section", id.as_str())]);
        // A new section can claim the focused element through its explicit owner.
        self.ensure_current_valid();
        Ok(id)
    }

    /// Merge the keys set in `config` into section `id`.
    pub fn set(&mut self, id: &str, config: SectionConfig) -> Result<()> {
        self.sections.update(id, config)?;
        self.audit(NavAuditEventBuilder::new(NavAuditStage::SectionUpdated).detail("section", id));
        self.ensure_current_valid();
        Ok(())
    }

    pub fn set_global(&mut self, config: SectionConfig) -> Result<()> {
        self.sections.set_global(config)?;
        self.ensure_current_valid();
        Ok(())
    }

    /// Remove a section. Its explicit members stay registered but lose their
    /// owner; focus held inside it is dropped without events.
    pub fn remove(&mut self, id: &str) -> bool {
        let held_focus = self.current_section().is_some_and(|owner| owner == id);
        if self.sections.remove(id).is_none() {
            return false;
        }
        let released = self.registry.release_section(id);
        self.dispatcher
            .remove_scope(&ListenerScope::Section(id.to_string()));
        if self.last_section.as_deref() == Some(id) {
            self.last_section = None;
        }
        if self.default_section.as_deref() == Some(id) {
            self.default_section = None;
        }
        if held_focus {
            self.clear_focus("section_removed");
        }
        self.ensure_current_valid();
        self.audit(
            NavAuditEventBuilder::new(NavAuditStage::SectionRemoved)
                .detail("section", id)
                .detail("released", released),
        );
        self.log(
            LogLevel::Debug,
            "section_removed",
            [json_kv("section", id), json_kv("released", released)],
        );
        true
    }

    /// Returns false for unknown sections.
    pub fn enable(&mut self, id: &str) -> bool {
        self.sections.set_disabled(id, false)
    }

    /// Returns false for unknown sections.
    pub fn disable(&mut self, id: &str) -> bool {
        let known = self.sections.set_disabled(id, true);
        if known {
            self.ensure_current_valid();
        }
        known
    }

    pub fn section(&self, id: &str) -> Option<&Section> {
        self.sections.get(id)
    }

    pub fn sections(&self) -> &SectionManager {
        &self.sections
    }

    pub fn resolve_entry_element(&self, id: &str) -> Option<ElementId> {
        self.sections.resolve_entry_element(&self.registry, id)
    }

    pub fn set_default_section(&mut self, id: Option<&str>) -> Result<()> {
        match id {
            Some(id) if !self.sections.contains(id) => {
                Err(NavError::UnknownSection(id.to_string()))
            }
            id => {
                self.default_section = id.map(str::to_string);
                Ok(())
            }
        }
    }

    pub fn default_section(&self) -> Option<&str> {
        self.default_section.as_deref()
    }

    pub fn last_section(&self) -> Option<&str> {
        self.last_section.as_deref()
    }

    /// Clear the `excluded` flag on members of one section (or of every
    /// section), skipping elements that carry a class from the section's
    /// `tab_index_ignore_list`. Returns how many elements changed.
    pub fn make_focusable(&mut self, section: Option<&str>) -> Result<usize> {
        let targets: Vec<SectionId> = match section {
            Some(id) if !self.sections.contains(id) => {
                return Err(NavError::UnknownSection(id.to_string()));
            }
            Some(id) => vec![id.to_string()],
            None => self.sections.ids().map(str::to_string).collect(),
        };

        let mut changed = Vec::new();
        for id in &targets {
            let ignore = self
                .sections
                .resolved(id)
                .map(|config| config.tab_index_ignore_list)
                .unwrap_or_default();
            changed.extend(
                self.registry
                    .iter()
                    .filter(|element| element.excluded)
                    .filter(|element| self.sections.section_of(element) == Some(id.as_str()))
                    .filter(|element| !ignore.iter().any(|class| element.has_class(class)))
                    .map(|element| element.id.clone()),
            );
        }
        for id in &changed {
            self.registry.set_excluded(id, false)?;
        }
        Ok(changed.len())
    }

    // ---- elements -------------------------------------------------------

    pub fn register(&mut self, element: Element) -> Result<()> {
        let id = element.id.clone();
        self.registry.register(element)?;
        self.audit(
            NavAuditEventBuilder::new(NavAuditStage::ElementRegistered)
                .detail("element", id.as_str()),
        );
        Ok(())
    }

    /// Returns whether an element was removed. Listeners bound to it go too.
    pub fn unregister(&mut self, id: &str) -> bool {
        if self.registry.unregister(id).is_none() {
            return false;
        }
        self.dispatcher
            .remove_scope(&ListenerScope::Element(id.to_string()));
        if self.current.as_deref() == Some(id) {
            self.clear_focus("element_unregistered");
        }
        self.audit(
            NavAuditEventBuilder::new(NavAuditStage::ElementUnregistered).detail("element", id),
        );
        true
    }

    pub fn set_enabled(&mut self, target: Target<'_>, enabled: bool) -> Result<()> {
        match target {
            Target::Element(id) => self.registry.set_enabled(id, enabled)?,
            Target::Section(id) => {
                if !self.sections.set_disabled(id, !enabled) {
                    return Err(NavError::UnknownSection(id.to_string()));
                }
            }
        }
        self.ensure_current_valid();
        Ok(())
    }

    pub fn set_excluded(&mut self, id: &str, excluded: bool) -> Result<()> {
        self.registry.set_excluded(id, excluded)?;
        self.ensure_current_valid();
        Ok(())
    }

    pub fn set_active(&mut self, id: &str, active: bool) -> Result<()> {
        self.registry.set_active(id, active)
    }

    /// Report a new layout box for an element.
    pub fn update_rect(&mut self, id: &str, rect: Rect) -> Result<()> {
        self.registry.update_rect(id, rect)?;
        self.ensure_current_valid();
        Ok(())
    }

    pub fn element(&self, id: &str) -> Option<&Element> {
        self.registry.get(id)
    }

    pub fn registry(&self) -> &ElementRegistry {
        &self.registry
    }

    pub fn candidates_for(&self, section: Option<&str>) -> Vec<ElementId> {
        self.registry.candidates_for(&self.sections, section)
    }

    pub fn current_focus(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn current_section(&self) -> Option<&str> {
        let element = self.registry.get(self.current.as_deref()?)?;
        self.sections.section_of(element)
    }

    // ---- listeners ------------------------------------------------------

    pub fn add_listener<L>(&mut self, element: &str, listener: L) -> ListenerId
    where
        L: NavListener + 'static,
    {
        self.dispatcher
            .add(ListenerScope::Element(element.to_string()), listener)
    }

    /// Listener receiving the events of every member of `section`.
    pub fn add_section_listener<L>(&mut self, section: &str, listener: L) -> ListenerId
    where
        L: NavListener + 'static,
    {
        self.dispatcher
            .add(ListenerScope::Section(section.to_string()), listener)
    }

    pub fn add_global_listener<L>(&mut self, listener: L) -> ListenerId
    where
        L: NavListener + 'static,
    {
        self.dispatcher.add(ListenerScope::Global, listener)
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.dispatcher.remove(id)
    }

    // ---- pause ----------------------------------------------------------

    pub fn pause(&mut self) {
        if !self.paused {
            self.paused = true;
            self.audit(NavAuditEventBuilder::new(NavAuditStage::Paused));
            self.log(LogLevel::Debug, "paused", std::iter::empty());
        }
    }

    pub fn resume(&mut self) {
        if self.paused {
            self.paused = false;
            self.audit(NavAuditEventBuilder::new(NavAuditStage::Resumed));
            self.log(LogLevel::Debug, "resumed", std::iter::empty());
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    // ---- navigation -----------------------------------------------------

    /// Move focus one step in `direction`, starting from the first element
    /// matching `origin` or from the current focus.
    pub fn move_focus(&mut self, direction: Direction, origin: Option<&Selector>) -> bool {
        self.try_move(direction, origin).is_ok()
    }

    /// Same as [`move_focus`](Self::move_focus) but reports why nothing moved.
    pub fn try_move(&mut self, direction: Direction, origin: Option<&Selector>) -> Result<()> {
        let result = self.navigate(direction, origin, MoveCause::Api);
        self.drain_requests();
        result
    }

    /// Focus an element, a section (`"menu"` or `"@menu"`), or with `None`
    /// the default section, then the last section, then any section.
    /// `silent` updates state without firing events.
    pub fn focus(&mut self, target: Option<&str>, silent: bool) -> bool {
        self.try_focus(target, silent).is_ok()
    }

    pub fn try_focus(&mut self, target: Option<&str>, silent: bool) -> Result<()> {
        let result = match target {
            Some(raw) => match FocusTarget::parse(raw, &self.sections) {
                Ok(target) => self.focus_target(Some(target), silent),
                Err(err) => Err(err),
            },
            None => self.focus_target(None, silent),
        };
        self.drain_requests();
        result
    }

    pub fn metrics_snapshot(&self) -> Option<MetricSnapshot> {
        let metrics = self.config.metrics.as_ref()?;
        let guard = metrics.lock().ok()?;
        Some(guard.snapshot(self.started_at.elapsed()))
    }

    /// Write the current metrics snapshot to the configured logger.
    pub fn log_metrics(&self) {
        if let Some(logger) = self.config.logger.as_ref() {
            if let Some(snapshot) = self.metrics_snapshot() {
                let _ = logger.log_event(snapshot.to_log_event(METRICS_TARGET));
            }
        }
    }

    fn navigate(
        &mut self,
        direction: Direction,
        origin: Option<&Selector>,
        cause: MoveCause,
    ) -> Result<()> {
        if self.paused {
            self.with_metrics(NavigationMetrics::record_suppressed);
            return Err(NavError::Paused);
        }
        let (origin, section) = self.resolve_origin(origin)?;
        let result = self.navigate_from(direction, &origin, &section, cause);
        self.with_metrics(|metrics| metrics.record_move(result.is_ok()));

        if let Err(err @ (NavError::NoCandidate | NavError::Blocked)) = &result {
            if self.config.move_events {
                let event = NavEvent::new(
                    NavEventKind::NavigateFailed,
                    origin.as_str(),
                    Some(section.clone()),
                )
                .with_direction(Some(direction))
                .with_cause(cause);
                self.emit(&event);
            }
            self.audit(
                NavAuditEventBuilder::new(NavAuditStage::MoveFailed)
                    .detail("element", origin.as_str())
                    .detail("direction", direction.as_str())
                    .detail("reason", err.to_string()),
            );
            self.log(
                LogLevel::Debug,
                "navigate_failed",
                [
                    json_kv("element", origin.as_str()),
                    json_kv("direction", direction.as_str()),
                    json_kv("reason", err.to_string()),
                ],
            );
        }
        result
    }

    fn resolve_origin(&self, origin: Option<&Selector>) -> Result<(ElementId, SectionId)> {
        let element = match origin {
            Some(selector) => self.registry.query(selector, &self.sections).next(),
            None => self
                .current
                .as_deref()
                .and_then(|id| self.registry.get(id)),
        }
        .ok_or(NavError::NoOrigin)?;
        let section = self
            .sections
            .section_of(element)
            .filter(|owner| self.sections.is_navigable(element, owner))
            .ok_or(NavError::NoOrigin)?;
        Ok((element.id.clone(), section.to_string()))
    }

    fn navigate_from(
        &mut self,
        direction: Direction,
        origin: &str,
        section: &str,
        cause: MoveCause,
    ) -> Result<()> {
        if self.config.move_events {
            let will_move = NavEvent::new(NavEventKind::WillMove, origin, Some(section.to_string()))
                .with_direction(Some(direction))
                .with_cause(cause);
            if self.emit(&will_move) {
                return Err(NavError::Canceled(NavEventKind::WillMove.as_str()));
            }
        }

        let Some(origin_element) = self.registry.get(origin) else {
            return Err(NavError::NoOrigin);
        };
        let origin_rect = origin_element.rect;
        if let Some(target) = origin_element.overrides.get(&direction).cloned() {
            return match target {
                LeaveTarget::Block => Err(NavError::Blocked),
                LeaveTarget::Selector(selector) => {
                    match self.goto_selector(&selector, Some(direction), false) {
                        Err(err @ NavError::Canceled(_)) => Err(err),
                        Err(_) => Err(NavError::NoCandidate),
                        Ok(()) => Ok(()),
                    }
                }
            };
        }

        let config = self
            .sections
            .resolved(section)
            .ok_or_else(|| NavError::UnknownSection(section.to_string()))?;
        let mut leave_for = config.leave_for.get(&direction).cloned();
        let previous = self.sections.get(section).and_then(|s| s.previous()).cloned();

        let own = self.pool(origin, |owner| owner == section);
        let mut winner = match config.restrict {
            Restrict::SelfOnly | Restrict::SelfFirst => {
                self.pick(direction, origin, &origin_rect, &own, &config, previous.as_ref())
            }
            Restrict::None => {
                let all = self.pool(origin, |_| true);
                self.pick(direction, origin, &origin_rect, &all, &config, previous.as_ref())
            }
        };
        if winner.is_none() && config.restrict == Restrict::SelfFirst {
            if let Some(outcome) = leave_for
                .take()
                .and_then(|target| self.follow_leave_for(&target, direction))
            {
                return outcome;
            }
            let others = self.pool(origin, |owner| owner != section);
            winner = self.pick(
                direction,
                origin,
                &origin_rect,
                &others,
                &config,
                previous.as_ref(),
            );
        }

        let Some(next) = winner else {
            if let Some(outcome) = leave_for
                .as_ref()
                .and_then(|target| self.follow_leave_for(target, direction))
            {
                return outcome;
            }
            return Err(NavError::NoCandidate);
        };

        let next_section = self
            .registry
            .get(&next)
            .and_then(|element| self.sections.section_of(element))
            .map(str::to_string);
        if next_section.as_deref() != Some(section) {
            if let Some(outcome) = leave_for
                .as_ref()
                .and_then(|target| self.follow_leave_for(target, direction))
            {
                return outcome;
            }
        }

        self.focus_element(&next, Some(direction), false)?;
        if config.remember_source {
            self.sections.record_move(
                section,
                PreviousMove {
                    source: origin.to_string(),
                    destination: next,
                    reverse: direction.reverse(),
                },
            );
        }
        Ok(())
    }

    /// Apply a `leave_for` rule. `None` means the rule could not be honoured
    /// and the geometric search should continue.
    fn follow_leave_for(
        &mut self,
        target: &LeaveTarget,
        direction: Direction,
    ) -> Option<Result<()>> {
        let selector = match target {
            LeaveTarget::Block => return Some(Err(NavError::Blocked)),
            LeaveTarget::Selector(selector) => selector,
        };
        match self.goto_selector(selector, Some(direction), false) {
            Ok(()) => Some(Ok(())),
            Err(err @ NavError::Canceled(_)) => Some(Err(err)),
            Err(_) => None,
        }
    }

    /// Navigable elements other than `origin` whose owning section passes
    /// `owner_filter`, in registration order.
    fn pool<F>(&self, origin: &str, owner_filter: F) -> Vec<&Element>
    where
        F: Fn(&str) -> bool,
    {
        self.registry
            .iter()
            .filter(|element| element.id != origin)
            .filter(|element| {
                self.sections.section_of(element).is_some_and(|owner| {
                    owner_filter(owner) && self.sections.is_navigable(element, owner)
                })
            })
            .collect()
    }

    fn pick(
        &self,
        direction: Direction,
        origin: &str,
        origin_rect: &Rect,
        pool: &[&Element],
        config: &ResolvedConfig,
        previous: Option<&PreviousMove>,
    ) -> Option<ElementId> {
        let rects: Vec<Rect> = pool.iter().map(|element| element.rect).collect();
        let groups = rank_groups(direction, origin_rect, &rects, &config.tuning());
        let top = groups.first()?;

        if config.remember_source {
            let remembered = previous
                .filter(|prev| prev.destination == origin && prev.reverse == direction)
                .and_then(|prev| top.iter().find(|&&idx| pool[idx].id == prev.source));
            if let Some(&idx) = remembered {
                return Some(pool[idx].id.clone());
            }
        }
        top.first().map(|&idx| pool[idx].id.clone())
    }

    fn focus_target(&mut self, target: Option<FocusTarget>, silent: bool) -> Result<()> {
        if self.paused {
            self.with_metrics(NavigationMetrics::record_suppressed);
            return Err(NavError::Paused);
        }
        match target {
            None => self.focus_any(None, silent),
            Some(FocusTarget::Section(id)) => self.focus_section(&id, None, silent),
            Some(FocusTarget::Selector(selector)) => self.goto_selector(&selector, None, silent),
        }
    }

    fn goto_selector(
        &mut self,
        selector: &Selector,
        direction: Option<Direction>,
        silent: bool,
    ) -> Result<()> {
        match selector {
            Selector::Section(Some(id)) => self.focus_section(id, direction, silent),
            Selector::Section(None) => self.focus_any(direction, silent),
            selector => {
                let target = self
                    .registry
                    .query(selector, &self.sections)
                    .find(|element| {
                        self.sections
                            .section_of(element)
                            .is_some_and(|owner| self.sections.is_navigable(element, owner))
                    })
                    .map(|element| element.id.clone())
                    .ok_or(NavError::NoCandidate)?;
                self.focus_element(&target, direction, silent)
            }
        }
    }

    fn focus_section(
        &mut self,
        id: &str,
        direction: Option<Direction>,
        silent: bool,
    ) -> Result<()> {
        if !self.sections.contains(id) {
            return Err(NavError::UnknownSection(id.to_string()));
        }
        let target = self
            .sections
            .resolve_entry_element(&self.registry, id)
            .ok_or(NavError::NoCandidate)?;
        self.focus_element(&target, direction, silent)
    }

    /// Default section, then last section, then every section in creation
    /// order; the first one with an entry element is entered.
    fn focus_any(&mut self, direction: Option<Direction>, silent: bool) -> Result<()> {
        let mut order: Vec<&str> = Vec::new();
        order.extend(self.default_section.as_deref());
        order.extend(self.last_section.as_deref());
        order.extend(self.sections.ids());

        let target = order
            .into_iter()
            .filter(|id| self.sections.contains(id))
            .find_map(|id| self.sections.resolve_entry_element(&self.registry, id))
            .ok_or(NavError::NoCandidate)?;
        self.focus_element(&target, direction, silent)
    }

    /// Run the focus transition onto `target`.
    ///
    /// Order: `will-unfocus` on the old element, `will-focus` on the new one,
    /// state commit, `unfocused`, `focused`. A cancel on either `will-*`
    /// event aborts before anything changes.
    fn focus_element(
        &mut self,
        target: &str,
        direction: Option<Direction>,
        silent: bool,
    ) -> Result<()> {
        let section = self
            .registry
            .get(target)
            .and_then(|element| {
                let owner = self.sections.section_of(element)?;
                self.sections
                    .is_navigable(element, owner)
                    .then(|| owner.to_string())
            })
            .ok_or(NavError::NoCandidate)?;
        if self.current.as_deref() == Some(target) {
            return Ok(());
        }

        let previous = self.current.clone();
        let previous_section = self.current_section().map(str::to_string);

        if silent {
            self.apply_focus(target, &section, true);
            return Ok(());
        }

        if let Some(prev) = previous.as_deref() {
            let will_unfocus =
                NavEvent::new(NavEventKind::WillUnfocus, prev, previous_section.clone())
                    .with_direction(direction)
                    .with_related(Some(target.to_string()), Some(section.clone()));
            if self.emit(&will_unfocus) {
                return Err(NavError::Canceled(NavEventKind::WillUnfocus.as_str()));
            }
        }
        let will_focus = NavEvent::new(NavEventKind::WillFocus, target, Some(section.clone()))
            .with_direction(direction)
            .with_related(previous.clone(), previous_section.clone());
        if self.emit(&will_focus) {
            return Err(NavError::Canceled(NavEventKind::WillFocus.as_str()));
        }

        self.apply_focus(target, &section, false);

        if let Some(prev) = previous.as_deref() {
            let unfocused = NavEvent::new(NavEventKind::Unfocused, prev, previous_section.clone())
                .with_direction(direction)
                .with_related(Some(target.to_string()), Some(section.clone()));
            self.emit(&unfocused);
        }
        let focused = NavEvent::new(NavEventKind::Focused, target, Some(section))
            .with_direction(direction)
            .with_related(previous, previous_section);
        self.emit(&focused);
        Ok(())
    }

    fn apply_focus(&mut self, target: &str, section: &str, silent: bool) {
        self.current = Some(target.to_string());
        self.sections.record_focus(section, target);
        self.last_section = Some(section.to_string());
        self.with_metrics(NavigationMetrics::record_focus_change);
        self.audit(
            NavAuditEventBuilder::new(NavAuditStage::FocusCommitted)
                .detail("element", target)
                .detail("section", section)
                .detail("silent", silent),
        );
        self.log(
            LogLevel::Debug,
            "focus_committed",
            [
                json_kv("element", target),
                json_kv("section", section),
                json_kv("silent", silent),
            ],
        );
    }

    /// Drop current focus if its element is no longer focusable where it is.
    fn ensure_current_valid(&mut self) {
        let valid = self
            .current
            .as_deref()
            .and_then(|id| self.registry.get(id))
            .is_some_and(|element| {
                self.sections
                    .section_of(element)
                    .is_some_and(|owner| self.sections.is_navigable(element, owner))
            });
        if !valid && self.current.is_some() {
            self.clear_focus("no_longer_navigable");
        }
    }

    fn clear_focus(&mut self, reason: &str) {
        if let Some(id) = self.current.take() {
            self.audit(
                NavAuditEventBuilder::new(NavAuditStage::FocusCleared)
                    .detail("element", id.as_str())
                    .detail("reason", reason),
            );
            self.log(
                LogLevel::Debug,
                "focus_cleared",
                [json_kv("element", id), json_kv("reason", reason)],
            );
        }
    }

    /// Dispatch `event` and collect the requests listeners queued. Returns
    /// whether a listener canceled it.
    fn emit(&mut self, event: &NavEvent) -> bool {
        let mut ctx = ListenerContext::new();
        let outcome = self.dispatcher.dispatch(event, &mut ctx);
        self.pending.extend(ctx.into_requests());
        self.with_metrics(|metrics| metrics.record_event(outcome.canceled));
        outcome.canceled
    }

    /// Execute queued listener requests, including the ones they queue in
    /// turn, up to `max_queued_requests` per call.
    fn drain_requests(&mut self) {
        let mut executed = 0;
        while let Some(request) = self.pending.pop_front() {
            if executed == self.config.max_queued_requests {
                let dropped = self.pending.len() + 1;
                self.pending.clear();
                self.with_metrics(|metrics| metrics.record_dropped_requests(dropped));
                self.log(
                    LogLevel::Warn,
                    "requests_dropped",
                    [json_kv("dropped", dropped), json_kv("limit", executed)],
                );
                break;
            }
            executed += 1;
            match request {
                NavRequest::Move { direction, origin } => {
                    let _ = self.navigate(direction, origin.as_ref(), MoveCause::Api);
                }
                NavRequest::Focus { target, silent } => {
                    let target = match target.as_deref() {
                        Some(raw) => match FocusTarget::parse(raw, &self.sections) {
                            Ok(target) => Some(target),
                            Err(_) => continue,
                        },
                        None => None,
                    };
                    let _ = self.focus_target(target, silent);
                }
                NavRequest::Pause => self.pause(),
                NavRequest::Resume => self.resume(),
            }
        }
    }

    fn with_metrics<F>(&self, record: F)
    where
        F: FnOnce(&mut NavigationMetrics),
    {
        if let Some(metrics) = self.config.metrics.as_ref() {
            if let Ok(mut guard) = metrics.lock() {
                record(&mut *guard);
            }
        }
    }

    fn audit(&self, builder: NavAuditEventBuilder) {
        if let Some(audit) = self.config.audit.as_ref() {
            audit.record(builder.finish());
        }
    }

    fn log<I>(&self, level: LogLevel, message: &str, fields: I)
    where
        I: IntoIterator<Item = (String, serde_json::Value)>,
    {
        if let Some(logger) = self.config.logger.as_ref() {
            let _ = logger.log_event(event_with_fields(level, ENGINE_TARGET, message, fields));
        }
    }
}
