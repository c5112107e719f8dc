use std::collections::{BTreeMap, HashMap};

use crate::error::{NavError, Result};
use crate::geometry::{Direction, Rect};
use crate::section::{SectionId, SectionManager};

use super::selector::{LeaveTarget, Selector};

pub type ElementId = String;

/// A navigable node as seen by the engine.
#[derive(Debug, Clone)]
pub struct Element {
    pub id: ElementId,
    pub rect: Rect,
    /// Explicit owner. Elements without one are claimed by the first section
    /// whose selector matches them.
    pub section: Option<SectionId>,
    pub classes: Vec<String>,
    pub enabled: bool,
    /// Kept out of navigation entirely (the `tabindex` style opt-out).
    pub excluded: bool,
    /// Marks the element picked by the `active` default-element sentinel.
    pub active: bool,
    /// Per-direction replacement for the geometric search.
    pub overrides: BTreeMap<Direction, LeaveTarget>,
}

impl Element {
    pub fn new(id: impl Into<ElementId>, rect: Rect) -> Self {
        Self {
            id: id.into(),
            rect,
            section: None,
            classes: Vec::new(),
            enabled: true,
            excluded: false,
            active: false,
            overrides: BTreeMap::new(),
        }
    }

    pub fn in_section(mut self, section: impl Into<SectionId>) -> Self {
        self.section = Some(section.into());
        self
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn excluded(mut self) -> Self {
        self.excluded = true;
        self
    }

    pub fn active(mut self) -> Self {
        self.active = true;
        self
    }

    pub fn with_override(mut self, direction: Direction, target: impl Into<LeaveTarget>) -> Self {
        self.overrides.insert(direction, target.into());
        self
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    /// Enabled, not opted out, and laid out with a non-empty box.
    pub fn is_focusable(&self) -> bool {
        self.enabled && !self.excluded && self.rect.is_visible()
    }
}

/// Registry of navigable elements in registration order.
#[derive(Debug, Default)]
pub struct ElementRegistry {
    entries: HashMap<ElementId, Element>,
    order: Vec<ElementId>,
}

impl ElementRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, element: Element) -> Result<()> {
        if self.entries.contains_key(&element.id) {
            return Err(NavError::DuplicateElement(element.id));
        }
        self.order.push(element.id.clone());
        self.entries.insert(element.id.clone(), element);
        Ok(())
    }

    /// Remove an element. Unknown ids are ignored.
    pub fn unregister(&mut self, id: &str) -> Option<Element> {
        let removed = self.entries.remove(id)?;
        self.order.retain(|entry| entry != id);
        Some(removed)
    }

    pub fn get(&self, id: &str) -> Option<&Element> {
        self.entries.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Elements in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Element> {
        self.order.iter().filter_map(|id| self.entries.get(id))
    }

    pub fn set_enabled(&mut self, id: &str, enabled: bool) -> Result<()> {
        self.entry_mut(id)?.enabled = enabled;
        Ok(())
    }

    pub fn set_excluded(&mut self, id: &str, excluded: bool) -> Result<()> {
        self.entry_mut(id)?.excluded = excluded;
        Ok(())
    }

    pub fn set_active(&mut self, id: &str, active: bool) -> Result<()> {
        self.entry_mut(id)?.active = active;
        Ok(())
    }

    pub fn update_rect(&mut self, id: &str, rect: Rect) -> Result<()> {
        self.entry_mut(id)?.rect = rect;
        Ok(())
    }

    /// Drop explicit ownership for every member of `section`.
    pub fn release_section(&mut self, section: &str) -> usize {
        let mut released = 0;
        for element in self.entries.values_mut() {
            if element.section.as_deref() == Some(section) {
                element.section = None;
                released += 1;
            }
        }
        released
    }

    /// Elements matching `selector`, in registration order.
    pub fn query<'a>(
        &'a self,
        selector: &'a Selector,
        sections: &'a SectionManager,
    ) -> impl Iterator<Item = &'a Element> + 'a {
        self.iter()
            .filter(move |element| selector.is_match(element, sections.section_of(element)))
    }

    /// Navigable elements of one section, or of every enabled section.
    pub fn candidates_for(
        &self,
        sections: &SectionManager,
        section: Option<&str>,
    ) -> Vec<ElementId> {
        self.iter()
            .filter(|element| match sections.section_of(element) {
                Some(owner) => {
                    section.is_none_or(|wanted| wanted == owner)
                        && sections.is_navigable(element, owner)
                }
                None => false,
            })
            .map(|element| element.id.clone())
            .collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    fn entry_mut(&mut self, id: &str) -> Result<&mut Element> {
        self.entries
            .get_mut(id)
            .ok_or_else(|| NavError::UnknownElement(id.to_string()))
    }
}
