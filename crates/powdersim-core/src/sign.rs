//! Text signs placed on the simulation area

use serde::{Deserialize, Serialize};

/// Maximum number of signs in a simulation
pub const MAX_SIGNS: usize = 16;
/// Longest sign text kept when loading
pub const MAX_SIGN_TEXT: usize = 45;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Justification {
    Left = 0,
    #[default]
    Middle = 1,
    Right = 2,
    None = 3,
}

impl Justification {
    /// Decode a saved justification, rejecting values outside 0..=3
    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            0 => Some(Justification::Left),
            1 => Some(Justification::Middle),
            2 => Some(Justification::Right),
            3 => Some(Justification::None),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sign {
    pub text: String,
    pub x: i32,
    pub y: i32,
    pub justification: Justification,
}

impl Sign {
    pub fn new(text: impl Into<String>, x: i32, y: i32, justification: Justification) -> Self {
        Self {
            text: text.into(),
            x,
            y,
            justification,
        }
    }

    /// Whether the sign anchor lies in `[x0, x1) x [y0, y1)`
    pub fn is_in_area(&self, x0: i32, y0: i32, x1: i32, y1: i32) -> bool {
        self.x >= x0 && self.y >= y0 && self.x < x1 && self.y < y1
    }
}

/// Cut sign text to the stored maximum on a character boundary
pub fn truncate_text(text: &str) -> String {
    text.chars().take(MAX_SIGN_TEXT).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_justification_range() {
        assert_eq!(Justification::from_i32(2), Some(Justification::Right));
        assert_eq!(Justification::from_i32(4), None);
        assert_eq!(Justification::from_i32(-1), None);
    }

    #[test]
    fn test_sign_area() {
        let sign = Sign::new("hello", 10, 10, Justification::Left);
        assert!(sign.is_in_area(0, 0, 11, 11));
        assert!(!sign.is_in_area(0, 0, 10, 10));
    }

    #[test]
    fn test_truncate_text() {
        let long = "x".repeat(60);
        assert_eq!(truncate_text(&long).len(), MAX_SIGN_TEXT);
        assert_eq!(truncate_text("short"), "short");
    }
}
