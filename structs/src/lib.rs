use serde::{Deserialize, Serialize};

pub mod plan;
pub mod problem;

pub use problem::InputError;

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn dist(&self, other: &Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    pub fn eq_xy(&self, other: &Point) -> bool {
        self.dist(other) < 1e-9
    }
}
