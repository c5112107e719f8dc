use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::Deserialize;

use super::core::{Element, ElementId};
use crate::error::NavError;
use crate::section::SectionId;

/// Opaque element predicate usable inside selectors.
#[derive(Clone)]
pub struct ElementPredicate(Arc<dyn Fn(&Element) -> bool + Send + Sync>);

impl ElementPredicate {
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&Element) -> bool + Send + Sync + 'static,
    {
        Self(Arc::new(predicate))
    }

    pub fn test(&self, element: &Element) -> bool {
        (self.0)(element)
    }
}

impl fmt::Debug for ElementPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ElementPredicate(..)")
    }
}

/// Identifies one or more registered elements.
///
/// String form: `#id`, `.class`, `@section`, `@` (the default section), or a
/// bare element id.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "String")]
pub enum Selector {
    Id(ElementId),
    Class(String),
    /// Members of a section; `None` stands for "the default section" when
    /// used as a focus target.
    Section(Option<SectionId>),
    Matches(ElementPredicate),
}

impl Selector {
    pub fn id(id: impl Into<ElementId>) -> Self {
        Selector::Id(id.into())
    }

    pub fn class(name: impl Into<String>) -> Self {
        Selector::Class(name.into())
    }

    pub fn section(id: impl Into<SectionId>) -> Self {
        Selector::Section(Some(id.into()))
    }

    pub fn matches<F>(predicate: F) -> Self
    where
        F: Fn(&Element) -> bool + Send + Sync + 'static,
    {
        Selector::Matches(ElementPredicate::new(predicate))
    }

    /// Check `element`, whose resolved owner is `owner`.
    pub fn is_match(&self, element: &Element, owner: Option<&str>) -> bool {
        match self {
            Selector::Id(id) => element.id == *id,
            Selector::Class(name) => element.has_class(name),
            Selector::Section(Some(section)) => owner == Some(section.as_str()),
            Selector::Section(None) => owner.is_some(),
            Selector::Matches(predicate) => predicate.test(element),
        }
    }
}

impl FromStr for Selector {
    type Err = NavError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(NavError::InvalidConfig("empty selector".into()));
        }
        let head = s.chars().next().map(char::len_utf8).unwrap_or(0);
        let selector = match s.split_at(head) {
            ("#", rest) if !rest.is_empty() => Selector::Id(rest.to_string()),
            (".", rest) if !rest.is_empty() => Selector::Class(rest.to_string()),
            ("@", "") => Selector::Section(None),
            ("@", rest) => Selector::Section(Some(rest.to_string())),
            ("#", _) | (".", _) => {
                return Err(NavError::InvalidConfig(format!("incomplete selector `{s}`")));
            }
            _ => Selector::Id(s.to_string()),
        };
        Ok(selector)
    }
}

impl TryFrom<String> for Selector {
    type Error = NavError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Where focus goes instead of the geometric search: either nowhere, or the
/// first navigable match of a selector (`@id` enters a section). The empty
/// string blocks.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "String")]
pub enum LeaveTarget {
    Block,
    Selector(Selector),
}

impl TryFrom<String> for LeaveTarget {
    type Error = NavError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.trim().is_empty() {
            return Ok(LeaveTarget::Block);
        }
        Ok(LeaveTarget::Selector(value.parse()?))
    }
}

impl From<Selector> for LeaveTarget {
    fn from(selector: Selector) -> Self {
        LeaveTarget::Selector(selector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;

    #[test]
    fn parses_prefixes() {
        assert!(matches!("#play".parse::<Selector>().unwrap(), Selector::Id(id) if id == "play"));
        assert!(matches!(".tile".parse::<Selector>().unwrap(), Selector::Class(c) if c == "tile"));
        assert!(matches!(
            "@menu".parse::<Selector>().unwrap(),
            Selector::Section(Some(s)) if s == "menu"
        ));
        assert!(matches!("@".parse::<Selector>().unwrap(), Selector::Section(None)));
        assert!(matches!("play".parse::<Selector>().unwrap(), Selector::Id(id) if id == "play"));
        assert!("".parse::<Selector>().is_err());
        assert!("#".parse::<Selector>().is_err());
    }

    #[test]
    fn matches_by_class_owner_and_predicate() {
        let element = Element::new("a", Rect::new(0.0, 0.0, 10.0, 10.0)).with_class("tile");
        assert!(Selector::class("tile").is_match(&element, None));
        assert!(!Selector::class("other").is_match(&element, None));
        assert!(Selector::section("grid").is_match(&element, Some("grid")));
        assert!(!Selector::Section(None).is_match(&element, None));
        assert!(Selector::matches(|el| el.rect.width > 5.0).is_match(&element, None));
    }

    #[test]
    fn empty_leave_target_blocks() {
        assert!(matches!(LeaveTarget::try_from(String::new()).unwrap(), LeaveTarget::Block));
        assert!(matches!(
            LeaveTarget::try_from("@footer".to_string()).unwrap(),
            LeaveTarget::Selector(Selector::Section(Some(_)))
        ));
    }

    #[test]
    fn incomplete_leave_target_is_rejected() {
        for raw in ["#", "."] {
            let err = LeaveTarget::try_from(raw.to_string()).unwrap_err();
            assert!(matches!(err, NavError::InvalidConfig(_)), "{raw}");
        }
    }
}
