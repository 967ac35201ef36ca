//! Shared domain models.

mod draft;
mod values;

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub use draft::{GameDraft, MAX_DURATION, MAX_STEPPER};
pub use values::{AgeRange, Complexity, PlayerCount};

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

record_id!(
    /// Store-assigned identifier of a [`Game`].
    GameId
);
record_id!(
    /// Store-assigned identifier of a [`Player`].
    PlayerId
);
record_id!(
    /// Store-assigned identifier of a [`Session`].
    SessionId
);

/// A board game in the collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    /// Identifier assigned on insert.
    pub id: GameId,
    /// Title shown in lists.
    pub name: String,
    /// Where the cover image was downloaded from.
    #[serde(default)]
    pub image_url: Option<String>,
    /// Whether cover bytes are stored for this game.
    #[serde(default)]
    pub has_cover: bool,
    /// Supported player count.
    pub player_count: PlayerCount,
    /// Recommended ages.
    pub age_range: AgeRange,
    /// Typical play time.
    pub duration_minutes: u32,
    /// Complexity tier.
    pub complexity: Complexity,
    /// Starred by the user.
    #[serde(default)]
    pub is_favorite: bool,
    /// Sessions owned by this game, in insertion order.
    #[serde(default)]
    pub sessions: Vec<SessionId>,
}

impl Game {
    /// True when no session has been recorded yet.
    pub fn is_unplayed(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Number of recorded sessions.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// One-line summary used by list views, e.g. `Easy · 10+`.
    pub fn summary(&self) -> String {
        format!("{} · {}", self.complexity.name(), self.age_range)
    }
}

/// Input for [`CollectionStore::insert_game`](crate::store::CollectionStore::insert_game).
#[derive(Debug, Clone, PartialEq)]
pub struct NewGame {
    /// Title; must not be blank.
    pub name: String,
    /// Source URL of the cover, if it came from a lookup.
    pub image_url: Option<String>,
    /// PNG-encoded cover image.
    pub cover: Option<Vec<u8>>,
    /// Supported player count.
    pub player_count: PlayerCount,
    /// Recommended ages.
    pub age_range: AgeRange,
    /// Typical play time.
    pub duration_minutes: u32,
    /// Complexity tier.
    pub complexity: Complexity,
}

/// Someone who takes part in sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    /// Identifier assigned on insert.
    pub id: PlayerId,
    /// Display name.
    pub name: String,
}

/// A single play of a game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Identifier assigned on insert.
    pub id: SessionId,
    /// Day the game was played.
    pub date: NaiveDate,
    /// Owning game.
    pub game: GameId,
    /// Participants; never empty for sessions created through the store.
    pub players: Vec<PlayerId>,
}

impl Session {
    /// Whether the given player took part in this session.
    pub fn includes(&self, player: PlayerId) -> bool {
        self.players.contains(&player)
    }
}
