//! Sections: named groups of elements with their own entry and exit policy.

mod config;
mod core;

pub use config::{
    DefaultElement, EnterTo, GlobalConfig, LeaveFor, NavigableFilter, ResolvedConfig, Restrict,
    SectionConfig,
};
pub use core::{PreviousMove, Section, SectionId, SectionManager};
