use std::cmp::Ordering;

use super::rect::{Direction, Rect};

/// Geometry knobs taken from the effective section configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeometryTuning {
    /// Drop diagonal candidates instead of ranking them last.
    pub straight_only: bool,
    /// Fraction (0..=1) of the origin's extent a diagonal candidate must
    /// overlap on the perpendicular axis to count as straight.
    pub straight_overlap_threshold: f64,
}

impl Default for GeometryTuning {
    fn default() -> Self {
        Self {
            straight_only: false,
            straight_overlap_threshold: 0.5,
        }
    }
}

/// Rank `candidates` for a move from `origin`, nearest first.
///
/// Candidates outside the requested half-plane are left out of the result.
pub fn rank(
    direction: Direction,
    origin: &Rect,
    candidates: &[Rect],
    tuning: &GeometryTuning,
) -> Vec<usize> {
    rank_groups(direction, origin, candidates, tuning)
        .into_iter()
        .flatten()
        .collect()
}

/// Same as [`rank`] but keeps the priority groups apart. Every index shows up
/// at most once, in the highest-priority group that holds it.
pub fn rank_groups(
    direction: Direction,
    origin: &Rect,
    candidates: &[Rect],
    tuning: &GeometryTuning,
) -> Vec<Vec<usize>> {
    let threshold = tuning.straight_overlap_threshold.clamp(0.0, 1.0);
    let all: Vec<usize> = (0..candidates.len()).collect();
    let cells = partition(&all, candidates, origin, threshold);
    let inner = partition(&cells[4], candidates, &Rect::at(origin.center()), threshold);

    let mut priorities = priorities(direction, &cells, &inner);
    if tuning.straight_only {
        priorities.pop();
    }

    let mut seen = vec![false; candidates.len()];
    let mut ranked = Vec::new();
    for (members, metrics) in priorities {
        let mut group: Vec<usize> = members
            .into_iter()
            .filter(|&idx| !std::mem::replace(&mut seen[idx], true))
            .collect();
        if group.is_empty() {
            continue;
        }
        group.sort_by(|&a, &b| compare(direction, origin, candidates, metrics, a, b));
        ranked.push(group);
    }
    ranked
}

#[derive(Debug, Clone, Copy)]
enum Metric {
    /// Gap to the origin's vertical centre line.
    PlumbLine,
    /// Gap to the origin's horizontal centre line.
    Horizon,
    TargetLeft,
    TargetTop,
    Top,
    Bottom,
    Left,
    Right,
}

impl Metric {
    fn eval(self, rect: &Rect, origin: &Rect) -> f64 {
        let center = rect.center();
        let anchor = origin.center();
        let value = match self {
            Metric::PlumbLine => {
                if center.x < anchor.x {
                    anchor.x - rect.right()
                } else {
                    rect.left() - anchor.x
                }
            }
            Metric::Horizon => {
                if center.y < anchor.y {
                    anchor.y - rect.bottom()
                } else {
                    rect.top() - anchor.y
                }
            }
            Metric::TargetLeft => {
                if center.x < anchor.x {
                    origin.left() - rect.right()
                } else {
                    rect.left() - origin.left()
                }
            }
            Metric::TargetTop => {
                if center.y < anchor.y {
                    origin.top() - rect.bottom()
                } else {
                    rect.top() - origin.top()
                }
            }
            Metric::Top => return rect.top(),
            Metric::Bottom => return -rect.bottom(),
            Metric::Left => return rect.left(),
            Metric::Right => return -rect.right(),
        };
        value.max(0.0)
    }
}

const STRAIGHT_H: &[Metric] = &[Metric::PlumbLine, Metric::Top];
const STRAIGHT_V: &[Metric] = &[Metric::Horizon, Metric::Left];
const DIAGONAL_LEFT: &[Metric] = &[Metric::Horizon, Metric::Right, Metric::TargetTop];
const DIAGONAL_RIGHT: &[Metric] = &[Metric::Horizon, Metric::Left, Metric::TargetTop];
const DIAGONAL_UP: &[Metric] = &[Metric::PlumbLine, Metric::Bottom, Metric::TargetLeft];
const DIAGONAL_DOWN: &[Metric] = &[Metric::PlumbLine, Metric::Top, Metric::TargetLeft];

type Priority = (Vec<usize>, &'static [Metric]);

fn priorities(
    direction: Direction,
    cells: &[Vec<usize>; 9],
    inner: &[Vec<usize>; 9],
) -> Vec<Priority> {
    let join = |groups: &[Vec<usize>; 9], ids: &[usize]| -> Vec<usize> {
        ids.iter().flat_map(|&id| groups[id].iter().copied()).collect()
    };
    match direction {
        Direction::Left => vec![
            (join(inner, &[0, 3, 6]), STRAIGHT_H),
            (cells[3].clone(), STRAIGHT_H),
            (join(cells, &[0, 6]), DIAGONAL_LEFT),
        ],
        Direction::Right => vec![
            (join(inner, &[2, 5, 8]), STRAIGHT_H),
            (cells[5].clone(), STRAIGHT_H),
            (join(cells, &[2, 8]), DIAGONAL_RIGHT),
        ],
        Direction::Up => vec![
            (join(inner, &[0, 1, 2]), STRAIGHT_V),
            (cells[1].clone(), STRAIGHT_V),
            (join(cells, &[0, 2]), DIAGONAL_UP),
        ],
        Direction::Down => vec![
            (join(inner, &[6, 7, 8]), STRAIGHT_V),
            (cells[7].clone(), STRAIGHT_V),
            (join(cells, &[6, 8]), DIAGONAL_DOWN),
        ],
    }
}

/// Split candidates into a 3x3 grid around `origin` by their centre point.
/// Corner candidates that overlap the origin enough on one axis are also
/// copied into the neighbouring edge cell.
fn partition(ids: &[usize], candidates: &[Rect], origin: &Rect, threshold: f64) -> [Vec<usize>; 9] {
    let mut cells: [Vec<usize>; 9] = Default::default();
    for &idx in ids {
        let rect = &candidates[idx];
        let center = rect.center();

        let col = if center.x < origin.left() {
            0
        } else if center.x <= origin.right() {
            1
        } else {
            2
        };
        let row = if center.y < origin.top() {
            0
        } else if center.y <= origin.bottom() {
            1
        } else {
            2
        };
        let cell = row * 3 + col;
        cells[cell].push(idx);

        if !matches!(cell, 0 | 2 | 6 | 8) {
            continue;
        }
        if rect.left() <= origin.right() - origin.width * threshold {
            match cell {
                2 => cells[1].push(idx),
                8 => cells[7].push(idx),
                _ => {}
            }
        }
        if rect.right() >= origin.left() + origin.width * threshold {
            match cell {
                0 => cells[1].push(idx),
                6 => cells[7].push(idx),
                _ => {}
            }
        }
        if rect.top() <= origin.bottom() - origin.height * threshold {
            match cell {
                6 => cells[3].push(idx),
                8 => cells[5].push(idx),
                _ => {}
            }
        }
        if rect.bottom() >= origin.top() + origin.height * threshold {
            match cell {
                0 => cells[3].push(idx),
                2 => cells[5].push(idx),
                _ => {}
            }
        }
    }
    cells
}

fn compare(
    direction: Direction,
    origin: &Rect,
    candidates: &[Rect],
    metrics: &[Metric],
    a: usize,
    b: usize,
) -> Ordering {
    let (ra, rb) = (&candidates[a], &candidates[b]);
    metrics
        .iter()
        .map(|metric| metric.eval(ra, origin).total_cmp(&metric.eval(rb, origin)))
        .find(|ord| ord.is_ne())
        .unwrap_or(Ordering::Equal)
        .then_with(|| {
            primary_gap(direction, ra, origin).total_cmp(&primary_gap(direction, rb, origin))
        })
        .then(a.cmp(&b))
}

fn primary_gap(direction: Direction, rect: &Rect, origin: &Rect) -> f64 {
    let (from, to) = (origin.center(), rect.center());
    if direction.is_horizontal() {
        (to.x - from.x).abs()
    } else {
        (to.y - from.y).abs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x: f64, y: f64) -> Rect {
        Rect::new(x, y, 50.0, 50.0)
    }

    #[test]
    fn picks_nearest_in_a_row() {
        let origin = square(0.0, 0.0);
        let candidates = [square(200.0, 0.0), square(100.0, 0.0)];
        let order = rank(Direction::Right, &origin, &candidates, &GeometryTuning::default());
        assert_eq!(order, vec![1, 0]);
    }

    #[test]
    fn excludes_candidates_behind_origin() {
        let origin = square(100.0, 0.0);
        let candidates = [square(0.0, 0.0), square(100.0, 100.0)];
        let order = rank(Direction::Right, &origin, &candidates, &GeometryTuning::default());
        assert!(order.is_empty());
    }

    #[test]
    fn straight_candidates_beat_closer_diagonals() {
        let origin = square(0.0, 0.0);
        // Diagonal but close, then far but aligned.
        let candidates = [square(60.0, 80.0), square(400.0, 0.0)];
        let order = rank(Direction::Right, &origin, &candidates, &GeometryTuning::default());
        assert_eq!(order, vec![1, 0]);
    }

    #[test]
    fn straight_only_drops_diagonals() {
        let origin = square(0.0, 0.0);
        let candidates = [square(60.0, 80.0)];
        let tuning = GeometryTuning {
            straight_only: true,
            ..GeometryTuning::default()
        };
        assert!(rank(Direction::Right, &origin, &candidates, &tuning).is_empty());
        assert_eq!(
            rank(Direction::Right, &origin, &candidates, &GeometryTuning::default()),
            vec![0]
        );
    }

    #[test]
    fn overlap_threshold_promotes_partially_aligned_corner() {
        let origin = square(0.0, 0.0);
        // Centre below the origin's bottom edge but its top overlaps 40% of the height.
        let candidate = Rect::new(100.0, 30.0, 50.0, 50.0);
        let loose = GeometryTuning {
            straight_only: true,
            straight_overlap_threshold: 0.3,
        };
        let strict = GeometryTuning {
            straight_only: true,
            straight_overlap_threshold: 0.5,
        };
        assert_eq!(rank(Direction::Right, &origin, &[candidate], &loose), vec![0]);
        assert!(rank(Direction::Right, &origin, &[candidate], &strict).is_empty());
    }

    #[test]
    fn ties_fall_back_to_input_order() {
        let origin = square(100.0, 100.0);
        let candidates = [square(100.0, 0.0), square(100.0, 0.0)];
        let order = rank(Direction::Up, &origin, &candidates, &GeometryTuning::default());
        assert_eq!(order, vec![0, 1]);
    }

    #[test]
    fn nested_candidates_rank_by_centre() {
        let origin = Rect::new(0.0, 0.0, 300.0, 100.0);
        let inside_right = Rect::new(200.0, 10.0, 20.0, 20.0);
        let inside_left = Rect::new(10.0, 10.0, 20.0, 20.0);
        let order = rank(
            Direction::Right,
            &origin,
            &[inside_left, inside_right],
            &GeometryTuning::default(),
        );
        assert_eq!(order, vec![1]);
    }

    #[test]
    fn groups_do_not_repeat_members() {
        let origin = square(0.0, 0.0);
        // Corner cell candidate that is also promoted to the straight cell.
        let candidates = [Rect::new(100.0, 20.0, 50.0, 70.0)];
        let groups =
            rank_groups(Direction::Right, &origin, &candidates, &GeometryTuning::default());
        assert_eq!(groups, vec![vec![0]]);
    }

    #[test]
    fn vertical_moves_prefer_aligned_targets() {
        let origin = square(100.0, 100.0);
        let candidates = [square(0.0, 0.0), square(110.0, 0.0), square(100.0, 300.0)];
        assert_eq!(
            rank(Direction::Up, &origin, &candidates, &GeometryTuning::default()),
            vec![1, 0]
        );
        assert_eq!(
            rank(Direction::Down, &origin, &candidates, &GeometryTuning::default()),
            vec![2]
        );
    }
}
