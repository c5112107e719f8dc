//! Geometry primitives and the directional ranking used by the engine.
//!
//! Everything in here is pure: no registry access, no events. The engine
//! hands in rectangles and gets back candidate indices ordered nearest
//! first, which keeps the heuristics testable in isolation.

mod rank;
mod rect;

pub use rank::{GeometryTuning, rank, rank_groups};
pub use rect::{Direction, Point, Rect};
