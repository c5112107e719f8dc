use std::collections::HashMap;

use crate::error::{NavError, Result};
use crate::geometry::Direction;
use crate::registry::{Element, ElementId, ElementRegistry};

use super::config::{DefaultElement, EnterTo, GlobalConfig, ResolvedConfig, SectionConfig};

pub type SectionId = String;

/// Last directional move that left a section, kept for `rememberSource`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviousMove {
    pub source: ElementId,
    pub destination: ElementId,
    /// Direction that leads back to `source`.
    pub reverse: Direction,
}

#[derive(Debug, Clone)]
pub struct Section {
    id: SectionId,
    config: SectionConfig,
    last_focused: Option<ElementId>,
    previous: Option<PreviousMove>,
}

impl Section {
    fn new(id: SectionId, config: SectionConfig) -> Self {
        Self {
            id,
            config,
            last_focused: None,
            previous: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn config(&self) -> &SectionConfig {
        &self.config
    }

    pub fn last_focused(&self) -> Option<&str> {
        self.last_focused.as_deref()
    }

    pub fn previous(&self) -> Option<&PreviousMove> {
        self.previous.as_ref()
    }
}

/// Owns sections in creation order together with the global defaults.
#[derive(Debug, Default)]
pub struct SectionManager {
    sections: HashMap<SectionId, Section>,
    order: Vec<SectionId>,
    id_pool: u64,
    global: GlobalConfig,
}

impl SectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn global(&self) -> &GlobalConfig {
        &self.global
    }

    pub fn replace_global(&mut self, global: GlobalConfig) -> Result<()> {
        global.validate()?;
        self.global = global;
        Ok(())
    }

    pub fn set_global(&mut self, partial: SectionConfig) -> Result<()> {
        self.global.apply(partial)
    }

    /// Create a section, generating `section-N` when no id is given.
    pub fn create(&mut self, id: Option<&str>, config: SectionConfig) -> Result<SectionId> {
        config.validate()?;
        let id = match id {
            Some("") => {
                return Err(NavError::InvalidConfig("section id must not be empty".into()));
            }
            Some(id) if self.sections.contains_key(id) => {
                return Err(NavError::DuplicateSection(id.to_string()));
            }
            Some(id) => id.to_string(),
            None => self.next_id(),
        };
        self.sections
            .insert(id.clone(), Section::new(id.clone(), config));
        self.order.push(id.clone());
        Ok(id)
    }

    pub fn update(&mut self, id: &str, partial: SectionConfig) -> Result<()> {
        partial.validate()?;
        self.section_mut(id)?.config.merge(partial);
        Ok(())
    }

    pub fn remove(&mut self, id: &str) -> Option<Section> {
        let removed = self.sections.remove(id)?;
        self.order.retain(|entry| entry != id);
        Some(removed)
    }

    pub fn get(&self, id: &str) -> Option<&Section> {
        self.sections.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.sections.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Section ids in creation order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Returns false for unknown sections.
    pub fn set_disabled(&mut self, id: &str, disabled: bool) -> bool {
        match self.sections.get_mut(id) {
            Some(section) => {
                section.config.disabled = Some(disabled);
                true
            }
            None => false,
        }
    }

    pub fn is_enabled(&self, id: &str) -> bool {
        self.sections
            .get(id)
            .is_some_and(|section| !section.config.disabled.unwrap_or(self.global.disabled))
    }

    pub fn resolved(&self, id: &str) -> Option<ResolvedConfig> {
        self.sections
            .get(id)
            .map(|section| self.global.resolve(&section.config))
    }

    /// Owning section of `element`: its explicit section if that exists,
    /// otherwise the first section whose selector matches.
    pub fn section_of<'a>(&'a self, element: &'a Element) -> Option<&'a str> {
        if let Some(owner) = element.section.as_deref() {
            if self.sections.contains_key(owner) {
                return Some(owner);
            }
        }
        self.order
            .iter()
            .find(|id| {
                self.sections
                    .get(id.as_str())
                    .and_then(|section| section.config.selector.as_ref())
                    .is_some_and(|selector| selector.is_match(element, None))
            })
            .map(String::as_str)
    }

    /// Whether `element` may receive focus as part of section `id`.
    pub fn is_navigable(&self, element: &Element, id: &str) -> bool {
        let Some(section) = self.sections.get(id) else {
            return false;
        };
        if section.config.disabled.unwrap_or(self.global.disabled) || !element.is_focusable() {
            return false;
        }
        section
            .config
            .navigable_filter
            .as_ref()
            .or(self.global.navigable_filter.as_ref())
            .is_none_or(|filter| filter.allows(element, id))
    }

    /// Navigable members of `id` in registration order.
    pub fn members<'a>(
        &'a self,
        registry: &'a ElementRegistry,
        id: &'a str,
    ) -> impl Iterator<Item = &'a Element> + 'a {
        registry
            .iter()
            .filter(move |element| self.is_member(element, id))
    }

    /// Remembered element of `id`, if it is still a navigable member.
    pub fn last_focused_element(&self, registry: &ElementRegistry, id: &str) -> Option<ElementId> {
        let remembered = self.sections.get(id)?.last_focused.as_deref()?;
        let element = registry.get(remembered)?;
        self.is_member(element, id).then(|| element.id.clone())
    }

    pub fn default_element(&self, registry: &ElementRegistry, id: &str) -> Option<ElementId> {
        let default = self.resolved(id)?.default_element?;
        let mut members = self.members(registry, id);
        let found = match &default {
            DefaultElement::First => members.next(),
            DefaultElement::Active => members.find(|element| element.active),
            DefaultElement::Selector(selector) => {
                members.find(|element| selector.is_match(element, Some(id)))
            }
        };
        found.map(|element| element.id.clone())
    }

    /// Element that receives focus when `id` is entered programmatically.
    pub fn resolve_entry_element(&self, registry: &ElementRegistry, id: &str) -> Option<ElementId> {
        let config = self.resolved(id)?;
        if config.disabled {
            return None;
        }
        let entry = match config.enter_to {
            EnterTo::LastFocused => self
                .last_focused_element(registry, id)
                .or_else(|| self.default_element(registry, id)),
            EnterTo::DefaultElement | EnterTo::None => self.default_element(registry, id),
        };
        entry.or_else(|| self.members(registry, id).next().map(|element| element.id.clone()))
    }

    pub(crate) fn record_focus(&mut self, id: &str, element: &str) {
        if let Some(section) = self.sections.get_mut(id) {
            section.last_focused = Some(element.to_string());
        }
    }

    pub(crate) fn record_move(&mut self, id: &str, previous: PreviousMove) {
        if let Some(section) = self.sections.get_mut(id) {
            section.previous = Some(previous);
        }
    }

    /// Drop every section and restart id generation. Global defaults stay.
    pub fn clear(&mut self) {
        self.sections.clear();
        self.order.clear();
        self.id_pool = 0;
    }

    fn is_member(&self, element: &Element, id: &str) -> bool {
        self.section_of(element) == Some(id) && self.is_navigable(element, id)
    }

    fn next_id(&mut self) -> SectionId {
        loop {
            self.id_pool += 1;
            let id = format!("section-{}", self.id_pool);
            if !self.sections.contains_key(&id) {
                return id;
            }
        }
    }

    fn section_mut(&mut self, id: &str) -> Result<&mut Section> {
        self.sections
            .get_mut(id)
            .ok_or_else(|| NavError::UnknownSection(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;
    use crate::registry::Selector;

    fn tile(id: &str, x: f64) -> Element {
        Element::new(id, Rect::new(x, 0.0, 40.0, 40.0))
    }

    #[test]
    fn generated_ids_skip_taken_names() {
        let mut sections = SectionManager::new();
        sections.create(Some("section-2"), SectionConfig::default()).unwrap();
        assert_eq!(sections.create(None, SectionConfig::default()).unwrap(), "section-1");
        assert_eq!(sections.create(None, SectionConfig::default()).unwrap(), "section-3");
        assert_eq!(
            sections.create(Some("section-1"), SectionConfig::default()),
            Err(NavError::DuplicateSection("section-1".into()))
        );
        assert!(sections.create(Some(""), SectionConfig::default()).is_err());
    }

    #[test]
    fn invalid_config_leaves_state_untouched() {
        let mut sections = SectionManager::new();
        let bad = SectionConfig::new().straight_overlap_threshold(3.0);
        assert!(sections.create(Some("menu"), bad.clone()).is_err());
        assert!(sections.is_empty());
        sections.create(Some("menu"), SectionConfig::default()).unwrap();
        assert!(sections.update("menu", bad).is_err());
        assert!(sections.get("menu").unwrap().config().straight_overlap_threshold.is_none());
        assert_eq!(
            sections.update("ghost", SectionConfig::default()),
            Err(NavError::UnknownSection("ghost".into()))
        );
    }

    #[test]
    fn selector_claims_unowned_elements() {
        let mut sections = SectionManager::new();
        sections
            .create(Some("menu"), SectionConfig::new().with_selector(Selector::class("menu-item")))
            .unwrap();
        sections.create(Some("grid"), SectionConfig::default()).unwrap();

        let claimed = tile("a", 0.0).with_class("menu-item");
        let explicit = tile("b", 0.0).with_class("menu-item").in_section("grid");
        let orphan = tile("c", 0.0).in_section("gone");
        assert_eq!(sections.section_of(&claimed), Some("menu"));
        assert_eq!(sections.section_of(&explicit), Some("grid"));
        assert_eq!(sections.section_of(&orphan), None);
    }

    #[test]
    fn entry_prefers_last_focused_then_default_then_first() {
        let mut sections = SectionManager::new();
        sections
            .create(
                Some("row"),
                SectionConfig::new()
                    .enter_to(EnterTo::LastFocused)
                    .default_element(DefaultElement::Active),
            )
            .unwrap();
        let mut registry = ElementRegistry::new();
        registry.register(tile("a", 0.0).in_section("row")).unwrap();
        registry.register(tile("b", 50.0).in_section("row").active()).unwrap();
        registry.register(tile("c", 100.0).in_section("row")).unwrap();

        assert_eq!(sections.resolve_entry_element(&registry, "row").as_deref(), Some("b"));

        sections.record_focus("row", "c");
        assert_eq!(sections.resolve_entry_element(&registry, "row").as_deref(), Some("c"));
        assert_eq!(sections.resolve_entry_element(&registry, "row").as_deref(), Some("c"));

        registry.set_enabled("c", false).unwrap();
        assert_eq!(sections.resolve_entry_element(&registry, "row").as_deref(), Some("b"));

        registry.set_active("b", false).unwrap();
        assert_eq!(sections.resolve_entry_element(&registry, "row").as_deref(), Some("a"));
    }

    #[test]
    fn default_element_selector_and_disabled_section() {
        let mut sections = SectionManager::new();
        sections
            .create(
                Some("row"),
                SectionConfig::new()
                    .enter_to(EnterTo::DefaultElement)
                    .default_element(Selector::id("c")),
            )
            .unwrap();
        let mut registry = ElementRegistry::new();
        registry.register(tile("a", 0.0).in_section("row")).unwrap();
        registry.register(tile("c", 100.0).in_section("row")).unwrap();
        sections.record_focus("row", "a");

        assert_eq!(sections.resolve_entry_element(&registry, "row").as_deref(), Some("c"));
        sections.set_disabled("row", true);
        assert_eq!(sections.resolve_entry_element(&registry, "row"), None);
    }

    #[test]
    fn navigable_filter_applies_per_section() {
        let mut sections = SectionManager::new();
        sections
            .create(
                Some("row"),
                SectionConfig::new().navigable_filter(|element, _| !element.has_class("ghost")),
            )
            .unwrap();
        let visible = tile("a", 0.0).in_section("row");
        let ghost = tile("b", 0.0).in_section("row").with_class("ghost");
        let hidden = Element::new("c", Rect::new(0.0, 0.0, 0.0, 0.0)).in_section("row");
        assert!(sections.is_navigable(&visible, "row"));
        assert!(!sections.is_navigable(&ghost, "row"));
        assert!(!sections.is_navigable(&hidden, "row"));
        assert!(!sections.is_navigable(&visible, "other"));
    }

    #[test]
    fn clear_resets_id_pool() {
        let mut sections = SectionManager::new();
        sections.create(None, SectionConfig::default()).unwrap();
        sections.clear();
        assert_eq!(sections.create(None, SectionConfig::default()).unwrap(), "section-1");
    }
}
