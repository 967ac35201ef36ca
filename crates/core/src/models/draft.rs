//! Editable state behind the add-game form.

use super::{AgeRange, Complexity, NewGame, PlayerCount};
use crate::error::StoreError;

/// Upper bound for player counts and ages entered in the form.
pub const MAX_STEPPER: u32 = 99;
/// Upper bound for the playing time entered in the form.
pub const MAX_DURATION: u32 = 600;

/// A game being assembled by hand or from a lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct GameDraft {
    /// Title typed or picked from a search.
    pub name: String,
    /// Where the cover came from.
    pub image_url: Option<String>,
    /// PNG cover fetched for this draft.
    pub cover: Option<Vec<u8>>,
    /// Typical play time.
    pub duration_minutes: u32,
    /// Must be chosen before the draft can be saved.
    pub complexity: Option<Complexity>,
    /// Lower player bound.
    pub min_players: u32,
    /// Whether `max_players` is stored.
    pub has_max_players: bool,
    /// Upper player bound.
    pub max_players: u32,
    /// Lower age bound.
    pub min_age: u32,
    /// Whether `max_age` is stored.
    pub has_max_age: bool,
    /// Upper age bound.
    pub max_age: u32,
}

impl Default for GameDraft {
    fn default() -> Self {
        Self {
            name: String::new(),
            image_url: None,
            cover: None,
            duration_minutes: 0,
            complexity: None,
            min_players: 1,
            has_max_players: false,
            max_players: 1,
            min_age: 0,
            has_max_age: false,
            max_age: 0,
        }
    }
}

impl GameDraft {
    /// Change the minimum player count. A maximum that tracked the old
    /// minimum, or fell below the new one, follows it.
    pub fn set_min_players(&mut self, value: u32) {
        let previous = self.min_players;
        self.min_players = value.clamp(1, MAX_STEPPER);
        if self.max_players == previous || self.max_players < self.min_players {
            self.max_players = self.min_players;
        }
    }

    /// Change the maximum player count, never below the minimum.
    pub fn set_max_players(&mut self, value: u32) {
        self.max_players = value.clamp(self.min_players, MAX_STEPPER);
    }

    /// Change the minimum age, dragging the maximum along like the player count.
    pub fn set_min_age(&mut self, value: u32) {
        let previous = self.min_age;
        self.min_age = value.min(MAX_STEPPER);
        if self.max_age == previous || self.max_age < self.min_age {
            self.max_age = self.min_age;
        }
    }

    /// Change the maximum age, never below the minimum.
    pub fn set_max_age(&mut self, value: u32) {
        self.max_age = value.clamp(self.min_age, MAX_STEPPER);
    }

    /// Change the playing time.
    pub fn set_duration(&mut self, minutes: u32) {
        self.duration_minutes = minutes.min(MAX_DURATION);
    }

    /// Whether the name search can be offered.
    pub fn can_search(&self) -> bool {
        !self.name.trim().is_empty()
    }

    /// Whether the draft holds everything a game needs.
    pub fn is_complete(&self) -> bool {
        self.can_search() && self.complexity.is_some()
    }

    /// Attach a fetched cover.
    pub fn set_cover(&mut self, url: String, png: Vec<u8>) {
        self.image_url = Some(url);
        self.cover = Some(png);
    }

    /// Convert into store input.
    pub fn to_new_game(&self) -> Result<NewGame, StoreError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(StoreError::Validation("game name must not be empty".into()));
        }
        let complexity = self
            .complexity
            .ok_or_else(|| StoreError::Validation("choose a complexity".into()))?;

        Ok(NewGame {
            name: name.to_string(),
            image_url: self.image_url.clone(),
            cover: self.cover.clone(),
            player_count: PlayerCount {
                min: self.min_players,
                max: self.has_max_players.then_some(self.max_players),
                best: None,
            },
            age_range: AgeRange {
                min: self.min_age,
                max: self.has_max_age.then_some(self.max_age),
            },
            duration_minutes: self.duration_minutes,
            complexity,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_players_follows_min_while_tracking() {
        let mut draft = GameDraft::default();
        draft.set_min_players(3);
        assert_eq!(draft.max_players, 3);

        draft.set_max_players(6);
        draft.set_min_players(4);
        assert_eq!(draft.max_players, 6);

        draft.set_min_players(8);
        assert_eq!(draft.max_players, 8);

        draft.set_max_players(2);
        assert_eq!(draft.max_players, 8);
        draft.set_min_players(0);
        assert_eq!(draft.min_players, 1);
    }

    #[test]
    fn steppers_are_bounded() {
        let mut draft = GameDraft::default();
        draft.set_min_age(150);
        assert_eq!(draft.min_age, MAX_STEPPER);
        draft.set_duration(1_000);
        assert_eq!(draft.duration_minutes, MAX_DURATION);
    }

    #[test]
    fn requires_name_and_complexity() {
        let mut draft = GameDraft {
            name: "   ".into(),
            ..GameDraft::default()
        };
        assert!(!draft.can_search());
        assert!(matches!(draft.to_new_game(), Err(StoreError::Validation(_))));

        draft.name = " Azul ".into();
        assert!(draft.can_search());
        assert!(!draft.is_complete());
        assert!(matches!(draft.to_new_game(), Err(StoreError::Validation(_))));

        draft.complexity = Some(Complexity::Easy);
        assert!(draft.is_complete());
        let game = draft.to_new_game().unwrap();
        assert_eq!(game.name, "Azul");
    }

    #[test]
    fn optional_maxima_only_when_enabled() {
        let mut draft = GameDraft {
            name: "Root".into(),
            complexity: Some(Complexity::Hard),
            min_age: 10,
            max_age: 14,
            ..GameDraft::default()
        };
        draft.set_min_players(2);
        draft.set_max_players(4);

        let game = draft.to_new_game().unwrap();
        assert_eq!(game.player_count, PlayerCount::from_min(2));
        assert_eq!(game.age_range, AgeRange::from_min(10));

        draft.has_max_players = true;
        draft.has_max_age = true;
        let game = draft.to_new_game().unwrap();
        assert_eq!(game.player_count, PlayerCount::between(2, 4));
        assert_eq!(game.age_range.to_string(), "10-14");
    }
}
