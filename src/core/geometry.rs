//! Arena geometry: rectangles, facing directions and movement bounds

use serde::{Deserialize, Serialize};

use crate::constants::{MAP_HEIGHT, MAP_WIDTH, MOVE_STEP};

/// Cardinal facing / movement direction. Encoded on the wire as 0..=3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Direction {
    #[default]
    North,
    East,
    South,
    West,
}

impl TryFrom<u8> for Direction {
    type Error = String;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            0 => Ok(Direction::North),
            1 => Ok(Direction::East),
            2 => Ok(Direction::South),
            3 => Ok(Direction::West),
            other => Err(format!("unknown direction {}", other)),
        }
    }
}

impl From<Direction> for u8 {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::North => 0,
            Direction::East => 1,
            Direction::South => 2,
            Direction::West => 3,
        }
    }
}

/// Axis-aligned rectangle in arena pixels
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Open-interval overlap test. Rectangles that only share an edge do not
    /// intersect.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.x + other.width
            && self.x + self.width > other.x
            && self.y < other.y + other.height
            && self.y + self.height > other.y
    }
}

/// Bounded playing field and the per-move displacement
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Arena {
    pub width: f64,
    pub height: f64,
    pub step: f64,
}

impl Default for Arena {
    fn default() -> Self {
        Self {
            width: MAP_WIDTH,
            height: MAP_HEIGHT,
            step: MOVE_STEP,
        }
    }
}

impl Arena {
    /// Displace `rect` one step toward `direction`, keeping it fully inside
    /// the arena. Pushing against an edge leaves the rectangle where it is.
    pub fn step(&self, rect: &Rect, direction: Direction) -> Rect {
        let max_x = (self.width - rect.width).max(0.0);
        let max_y = (self.height - rect.height).max(0.0);

        let (x, y) = match direction {
            Direction::North => (rect.x, rect.y - self.step),
            Direction::East => (rect.x + self.step, rect.y),
            Direction::South => (rect.x, rect.y + self.step),
            Direction::West => (rect.x - self.step, rect.y),
        };

        Rect {
            x: x.clamp(0.0, max_x),
            y: y.clamp(0.0, max_y),
            ..*rect
        }
    }
}
