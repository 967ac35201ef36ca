//! Scanner for item detail responses and merging into a form draft.

use quick_xml::events::BytesStart;

use super::scan::{attribute, XmlScanner};
use crate::models::{Complexity, GameDraft};

/// Fields read from an item detail response. Anything the response lacked
/// or that failed to parse stays `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GameDetails {
    /// Full-size image URL.
    pub image_url: Option<String>,
    /// Tier derived from the community weight.
    pub complexity: Option<Complexity>,
    /// Minimum player count.
    pub min_players: Option<u32>,
    /// Maximum player count.
    pub max_players: Option<u32>,
    /// Minimum age.
    pub min_age: Option<u32>,
    /// Playing time in minutes.
    pub duration_minutes: Option<u32>,
}

impl GameDetails {
    /// Merge into `draft`: present values win, absent ones keep the draft's.
    /// A merge also switches the maximum player count on and the maximum age
    /// off.
    pub fn apply_to(&self, draft: &mut GameDraft) {
        if let Some(complexity) = self.complexity {
            draft.complexity = Some(complexity);
        }
        if let Some(duration) = self.duration_minutes {
            draft.duration_minutes = duration;
        }
        if let Some(min) = self.min_players {
            draft.min_players = min;
        }
        if let Some(max) = self.max_players {
            draft.max_players = max;
        }
        if let Some(age) = self.min_age {
            draft.min_age = age;
        }
        draft.has_max_players = true;
        draft.has_max_age = false;
        draft.max_players = draft.max_players.max(draft.min_players);
    }
}

/// Reads the first occurrence of each detail field.
#[derive(Debug, Default)]
pub struct DetailsScanner {
    details: GameDetails,
    in_image: bool,
}

fn parse_value<T: std::str::FromStr>(element: &BytesStart<'_>) -> Option<T> {
    attribute(element, b"value").and_then(|value| value.trim().parse().ok())
}

fn fill<T>(slot: &mut Option<T>, value: Option<T>) {
    if slot.is_none() {
        *slot = value;
    }
}

impl XmlScanner for DetailsScanner {
    type Output = GameDetails;

    fn start(&mut self, element: &BytesStart<'_>) {
        let details = &mut self.details;
        match element.name().as_ref() {
            b"image" => self.in_image = true,
            b"averageweight" => fill(
                &mut details.complexity,
                parse_value::<f64>(element).map(Complexity::from_weight),
            ),
            b"minplayers" => fill(&mut details.min_players, parse_value(element)),
            b"maxplayers" => fill(&mut details.max_players, parse_value(element)),
            b"minage" => fill(&mut details.min_age, parse_value(element)),
            b"playingtime" => fill(&mut details.duration_minutes, parse_value(element)),
            _ => {}
        }
    }

    fn text(&mut self, text: &str) {
        if self.in_image && !text.is_empty() {
            fill(&mut self.details.image_url, Some(text.to_string()));
        }
    }

    fn end(&mut self, name: &[u8]) {
        if name == b"image" {
            self.in_image = false;
        }
    }

    fn finish(self) -> Self::Output {
        self.details
    }
}
