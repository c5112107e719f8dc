//! Element registry and selectors.
//!
//! The registry only stores elements; section membership and navigability
//! are answered by the [`SectionManager`](crate::section::SectionManager),
//! which is why the queries here take it by reference.

mod core;
mod selector;

pub use core::{Element, ElementId, ElementRegistry};
pub use selector::{ElementPredicate, LeaveTarget, Selector};
