use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::Deserialize;

use crate::error::{NavError, Result};
use crate::geometry::{Direction, GeometryTuning};
use crate::registry::{Element, LeaveTarget, Selector};

/// Which element receives focus when a section is entered programmatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EnterTo {
    LastFocused,
    DefaultElement,
    #[default]
    #[serde(alias = "")]
    None,
}

/// How far a directional search may reach from the origin's section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Restrict {
    #[default]
    SelfFirst,
    SelfOnly,
    #[serde(alias = "")]
    None,
}

/// Entry element of a section.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "String")]
pub enum DefaultElement {
    /// First navigable member in registration order.
    First,
    /// First navigable member flagged `active`.
    Active,
    Selector(Selector),
}

impl TryFrom<String> for DefaultElement {
    type Error = NavError;

    fn try_from(value: String) -> Result<Self> {
        match value.as_str() {
            "first" => Ok(DefaultElement::First),
            "active" => Ok(DefaultElement::Active),
            other => Ok(DefaultElement::Selector(other.parse()?)),
        }
    }
}

impl From<Selector> for DefaultElement {
    fn from(selector: Selector) -> Self {
        DefaultElement::Selector(selector)
    }
}

pub type LeaveFor = BTreeMap<Direction, LeaveTarget>;

/// Predicate excluding elements from navigation, called with the element and
/// the id of the section being searched.
#[derive(Clone)]
pub struct NavigableFilter(Arc<dyn Fn(&Element, &str) -> bool + Send + Sync>);

impl NavigableFilter {
    pub fn new<F>(filter: F) -> Self
    where
        F: Fn(&Element, &str) -> bool + Send + Sync + 'static,
    {
        Self(Arc::new(filter))
    }

    pub fn allows(&self, element: &Element, section: &str) -> bool {
        (self.0)(element, section)
    }
}

impl fmt::Debug for NavigableFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("NavigableFilter(..)")
    }
}

/// Per-section configuration. Unset keys fall back to [`GlobalConfig`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct SectionConfig {
    pub selector: Option<Selector>,
    pub straight_only: Option<bool>,
    pub straight_overlap_threshold: Option<f64>,
    pub remember_source: Option<bool>,
    pub disabled: Option<bool>,
    pub default_element: Option<DefaultElement>,
    pub enter_to: Option<EnterTo>,
    pub leave_for: Option<LeaveFor>,
    pub restrict: Option<Restrict>,
    pub tab_index_ignore_list: Option<Vec<String>>,
    #[serde(skip)]
    pub navigable_filter: Option<NavigableFilter>,
}

impl SectionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|err| NavError::InvalidConfig(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_selector(mut self, selector: Selector) -> Self {
        self.selector = Some(selector);
        self
    }

    pub fn straight_only(mut self, enabled: bool) -> Self {
        self.straight_only = Some(enabled);
        self
    }

    pub fn straight_overlap_threshold(mut self, threshold: f64) -> Self {
        self.straight_overlap_threshold = Some(threshold);
        self
    }

    pub fn remember_source(mut self, enabled: bool) -> Self {
        self.remember_source = Some(enabled);
        self
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = Some(disabled);
        self
    }

    pub fn default_element(mut self, element: impl Into<DefaultElement>) -> Self {
        self.default_element = Some(element.into());
        self
    }

    pub fn enter_to(mut self, enter_to: EnterTo) -> Self {
        self.enter_to = Some(enter_to);
        self
    }

    pub fn leave_for(mut self, direction: Direction, target: impl Into<LeaveTarget>) -> Self {
        self.leave_for
            .get_or_insert_with(LeaveFor::new)
            .insert(direction, target.into());
        self
    }

    pub fn restrict(mut self, restrict: Restrict) -> Self {
        self.restrict = Some(restrict);
        self
    }

    pub fn tab_index_ignore_list(mut self, classes: Vec<String>) -> Self {
        self.tab_index_ignore_list = Some(classes);
        self
    }

    pub fn navigable_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&Element, &str) -> bool + Send + Sync + 'static,
    {
        self.navigable_filter = Some(NavigableFilter::new(filter));
        self
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(threshold) = self.straight_overlap_threshold {
            check_threshold(threshold)?;
        }
        Ok(())
    }

    /// Overlay every key set in `partial`.
    pub fn merge(&mut self, partial: SectionConfig) {
        let SectionConfig {
            selector: _,
            straight_only,
            straight_overlap_threshold,
            remember_source,
            disabled,
            default_element,
            enter_to,
            leave_for,
            restrict,
            tab_index_ignore_list,
            navigable_filter,
        } = partial;

        overlay(&mut self.straight_only, straight_only);
        overlay(&mut self.straight_overlap_threshold, straight_overlap_threshold);
        overlay(&mut self.remember_source, remember_source);
        overlay(&mut self.disabled, disabled);
        overlay(&mut self.default_element, default_element);
        overlay(&mut self.enter_to, enter_to);
        overlay(&mut self.leave_for, leave_for);
        overlay(&mut self.restrict, restrict);
        overlay(&mut self.tab_index_ignore_list, tab_index_ignore_list);
        overlay(&mut self.navigable_filter, navigable_filter);
    }
}

fn overlay<T>(slot: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *slot = value;
    }
}

fn check_threshold(threshold: f64) -> Result<()> {
    if (0.0..=1.0).contains(&threshold) {
        Ok(())
    } else {
        Err(NavError::InvalidConfig(format!(
            "straightOverlapThreshold must be within 0..=1, got {threshold}"
        )))
    }
}

/// Defaults applied to every section.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct GlobalConfig {
    pub straight_only: bool,
    pub straight_overlap_threshold: f64,
    pub remember_source: bool,
    pub disabled: bool,
    pub default_element: Option<DefaultElement>,
    pub enter_to: EnterTo,
    pub leave_for: LeaveFor,
    pub restrict: Restrict,
    pub tab_index_ignore_list: Vec<String>,
    #[serde(skip)]
    pub navigable_filter: Option<NavigableFilter>,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            straight_only: false,
            straight_overlap_threshold: 0.5,
            remember_source: false,
            disabled: false,
            default_element: None,
            enter_to: EnterTo::None,
            leave_for: LeaveFor::new(),
            restrict: Restrict::SelfFirst,
            tab_index_ignore_list: Vec::new(),
            navigable_filter: None,
        }
    }
}

impl GlobalConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|err| NavError::InvalidConfig(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        check_threshold(self.straight_overlap_threshold)
    }

    /// Overlay the keys set in `partial` onto the global defaults.
    /// Membership is per section, so `selector` is refused here.
    pub fn apply(&mut self, partial: SectionConfig) -> Result<()> {
        partial.validate()?;
        if partial.selector.is_some() {
            return Err(NavError::InvalidConfig(
                "selector can only be set on a section".into(),
            ));
        }
        let SectionConfig {
            selector: _,
            straight_only,
            straight_overlap_threshold,
            remember_source,
            disabled,
            default_element,
            enter_to,
            leave_for,
            restrict,
            tab_index_ignore_list,
            navigable_filter,
        } = partial;

        overlay(&mut self.default_element, default_element);
        overlay(&mut self.navigable_filter, navigable_filter);
        self.straight_only = straight_only.unwrap_or(self.straight_only);
        self.straight_overlap_threshold =
            straight_overlap_threshold.unwrap_or(self.straight_overlap_threshold);
        self.remember_source = remember_source.unwrap_or(self.remember_source);
        self.disabled = disabled.unwrap_or(self.disabled);
        self.enter_to = enter_to.unwrap_or(self.enter_to);
        self.restrict = restrict.unwrap_or(self.restrict);
        if let Some(leave_for) = leave_for {
            self.leave_for = leave_for;
        }
        if let Some(list) = tab_index_ignore_list {
            self.tab_index_ignore_list = list;
        }
        Ok(())
    }

    /// Effective configuration of a section.
    pub fn resolve(&self, section: &SectionConfig) -> ResolvedConfig {
        ResolvedConfig {
            straight_only: section.straight_only.unwrap_or(self.straight_only),
            straight_overlap_threshold: section
                .straight_overlap_threshold
                .unwrap_or(self.straight_overlap_threshold),
            remember_source: section.remember_source.unwrap_or(self.remember_source),
            disabled: section.disabled.unwrap_or(self.disabled),
            default_element: section
                .default_element
                .clone()
                .or_else(|| self.default_element.clone()),
            enter_to: section.enter_to.unwrap_or(self.enter_to),
            leave_for: section
                .leave_for
                .clone()
                .unwrap_or_else(|| self.leave_for.clone()),
            restrict: section.restrict.unwrap_or(self.restrict),
            tab_index_ignore_list: section
                .tab_index_ignore_list
                .clone()
                .unwrap_or_else(|| self.tab_index_ignore_list.clone()),
            navigable_filter: section
                .navigable_filter
                .clone()
                .or_else(|| self.navigable_filter.clone()),
        }
    }
}

/// Section configuration with global defaults filled in.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub straight_only: bool,
    pub straight_overlap_threshold: f64,
    pub remember_source: bool,
    pub disabled: bool,
    pub default_element: Option<DefaultElement>,
    pub enter_to: EnterTo,
    pub leave_for: LeaveFor,
    pub restrict: Restrict,
    pub tab_index_ignore_list: Vec<String>,
    pub navigable_filter: Option<NavigableFilter>,
}

impl ResolvedConfig {
    pub fn tuning(&self) -> GeometryTuning {
        GeometryTuning {
            straight_only: self.straight_only,
            straight_overlap_threshold: self.straight_overlap_threshold,
        }
    }
}
