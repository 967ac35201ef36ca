//! Value types embedded in a [`Game`](super::Game).

use std::fmt;

use serde::{Deserialize, Serialize};

/// Recommended age range, e.g. `10+` or `8-99`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeRange {
    /// Minimum recommended age.
    pub min: u32,
    /// Maximum recommended age, if the publisher states one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<u32>,
}

impl AgeRange {
    /// Range with a lower bound only.
    pub fn from_min(min: u32) -> Self {
        Self { min, max: None }
    }
}

impl fmt::Display for AgeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max {
            Some(max) => write!(f, "{}-{}", self.min, max),
            None => write!(f, "{}+", self.min),
        }
    }
}

/// Supported number of players, with an optional sweet spot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerCount {
    /// Minimum number of players.
    pub min: u32,
    /// Maximum number of players.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<u32>,
    /// Best player count according to the community.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub best: Option<u32>,
}

impl PlayerCount {
    /// Player count with a lower bound only.
    pub fn from_min(min: u32) -> Self {
        Self {
            min,
            max: None,
            best: None,
        }
    }

    /// Bounded player count without a best count.
    pub fn between(min: u32, max: u32) -> Self {
        Self {
            min,
            max: Some(max),
            best: None,
        }
    }
}

impl fmt::Display for PlayerCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.max, self.best) {
            (Some(max), Some(best)) => write!(f, "{}-{} ({})", self.min, max, best),
            (Some(max), None) => write!(f, "{}-{}", self.min, max),
            (None, _) => write!(f, "{}+", self.min),
        }
    }
}

/// Coarse complexity tier of a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    /// Weight below 2.
    Easy,
    /// Weight in `[2, 3)`.
    Medium,
    /// Weight of 3 and above.
    Hard,
}

impl Complexity {
    /// All tiers in ascending order.
    pub const ALL: [Complexity; 3] = [Complexity::Easy, Complexity::Medium, Complexity::Hard];

    /// Classify a BoardGameGeek "average weight" score.
    pub fn from_weight(weight: f64) -> Self {
        if weight < 2.0 {
            Complexity::Easy
        } else if weight < 3.0 {
            Complexity::Medium
        } else {
            Complexity::Hard
        }
    }

    /// Capitalised label for display.
    pub fn name(&self) -> &'static str {
        match self {
            Complexity::Easy => "Easy",
            Complexity::Medium => "Medium",
            Complexity::Hard => "Hard",
        }
    }
}

impl fmt::Display for Complexity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weight_boundaries_are_half_open() {
        assert_eq!(Complexity::from_weight(0.0), Complexity::Easy);
        assert_eq!(Complexity::from_weight(1.99), Complexity::Easy);
        assert_eq!(Complexity::from_weight(2.0), Complexity::Medium);
        assert_eq!(Complexity::from_weight(2.5), Complexity::Medium);
        assert_eq!(Complexity::from_weight(2.999), Complexity::Medium);
        assert_eq!(Complexity::from_weight(3.0), Complexity::Hard);
        assert_eq!(Complexity::from_weight(4.8), Complexity::Hard);
    }

    #[test]
    fn age_range_rendering() {
        assert_eq!(AgeRange::from_min(10).to_string(), "10+");
        assert_eq!(
            AgeRange {
                min: 8,
                max: Some(99)
            }
            .to_string(),
            "8-99"
        );
    }

    #[test]
    fn player_count_rendering() {
        let full = PlayerCount {
            min: 2,
            max: Some(4),
            best: Some(3),
        };
        assert_eq!(full.to_string(), "2-4 (3)");
        assert_eq!(PlayerCount::between(1, 5).to_string(), "1-5");
        assert_eq!(PlayerCount::from_min(2).to_string(), "2+");

        let best_without_max = PlayerCount {
            min: 3,
            max: None,
            best: Some(4),
        };
        assert_eq!(best_without_max.to_string(), "3+");
    }

    #[test]
    fn complexity_serializes_lowercase() {
        let json = serde_json::to_string(&Complexity::Medium).unwrap();
        assert_eq!(json, "\"medium\"");
        assert_eq!(Complexity::Hard.name(), "Hard");
    }
}
