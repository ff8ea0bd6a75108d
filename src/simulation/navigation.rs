//! Direction and curve geometry helpers
//!
//! Pure functions; traffic keeps to the right, so a left turn rotates
//! counter-clockwise on screen.

use super::types::{Cell, Direction, Vec2};

/// Classification of a change of heading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnKind {
    Left,
    Right,
    Straight,
    UTurn,
}

pub fn turn_left(direction: Direction) -> Direction {
    match direction {
        Direction::North => Direction::West,
        Direction::West => Direction::South,
        Direction::South => Direction::East,
        Direction::East => Direction::North,
    }
}

pub fn turn_right(direction: Direction) -> Direction {
    match direction {
        Direction::North => Direction::East,
        Direction::East => Direction::South,
        Direction::South => Direction::West,
        Direction::West => Direction::North,
    }
}

pub fn reverse(direction: Direction) -> Direction {
    match direction {
        Direction::North => Direction::South,
        Direction::South => Direction::North,
        Direction::East => Direction::West,
        Direction::West => Direction::East,
    }
}

/// Classify the turn from one heading to another by the sign of the 2D cross
/// product. With y pointing down a positive cross product is clockwise, i.e. a
/// right turn.
pub fn classify_turn(from: Direction, to: Direction) -> TurnKind {
    let (fx, fy) = from.delta();
    let (tx, ty) = to.delta();
    let cross = fx * ty - fy * tx;
    if cross > 0 {
        TurnKind::Right
    } else if cross < 0 {
        TurnKind::Left
    } else if fx * tx + fy * ty < 0 {
        TurnKind::UTurn
    } else {
        TurnKind::Straight
    }
}

/// Unit vector pointing to the right-hand side of travel
pub fn right_of(direction: Direction) -> Vec2 {
    turn_right(direction).unit()
}

/// Point inside `cell` on the travel lane for `direction`.
///
/// Ordinary cells offset perpendicular to travel towards the right by
/// `lane_fraction` of a tile. Roundabout cells instead offset radially back
/// towards the side the agent arrives from, by the smaller `ring_fraction`.
pub fn lane_offset_point(
    cell: Cell,
    direction: Direction,
    is_roundabout: bool,
    tile_size: f32,
    lane_fraction: f32,
    ring_fraction: f32,
) -> Vec2 {
    let center = Vec2::new(
        (cell.x as f32 + 0.5) * tile_size,
        (cell.y as f32 + 0.5) * tile_size,
    );
    if is_roundabout {
        center - direction.unit() * (ring_fraction * tile_size)
    } else {
        center + right_of(direction) * (lane_fraction * tile_size)
    }
}

/// Control point of the quadratic curve for a 90 degree turn: where the
/// incoming lane's constant axis meets the outgoing lane's constant axis.
pub fn corner_control_point(from: Vec2, to: Vec2, from_dir: Direction, to_dir: Direction) -> Vec2 {
    if from_dir.is_horizontal() && !to_dir.is_horizontal() {
        Vec2::new(to.x, from.y)
    } else if !from_dir.is_horizontal() && to_dir.is_horizontal() {
        Vec2::new(from.x, to.y)
    } else {
        from.lerp(&to, 0.5)
    }
}

/// Control point for reversing: the midpoint pushed forward along the old
/// heading so the curve swings out ahead of the agent.
pub fn u_turn_control_point(from: Vec2, to: Vec2, from_dir: Direction, reach: f32) -> Vec2 {
    from.lerp(&to, 0.5) + from_dir.unit() * reach
}

pub fn bezier_point(p0: Vec2, p1: Vec2, p2: Vec2, s: f32) -> Vec2 {
    let u = 1.0 - s;
    p0 * (u * u) + p1 * (2.0 * u * s) + p2 * (s * s)
}

/// Derivative of the quadratic curve at `s`
pub fn bezier_tangent(p0: Vec2, p1: Vec2, p2: Vec2, s: f32) -> Vec2 {
    (p1 - p0) * (2.0 * (1.0 - s)) + (p2 - p1) * (2.0 * s)
}

/// Polyline length of the quadratic curve using `segments` straight pieces
pub fn estimate_curve_length(p0: Vec2, p1: Vec2, p2: Vec2, segments: u32) -> f32 {
    let segments = segments.max(1);
    let mut length = 0.0;
    let mut previous = p0;
    for step in 1..=segments {
        let point = bezier_point(p0, p1, p2, step as f32 / segments as f32);
        length += previous.distance(&point);
        previous = point;
    }
    length
}
