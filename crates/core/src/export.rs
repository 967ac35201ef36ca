//! Clipboard export of the collection as JSON.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;

use crate::{
    error::ExportError,
    models::{AgeRange, Complexity, PlayerCount},
    store::CollectionSnapshot,
};

/// Destination for exported text.
pub trait Clipboard {
    /// Replace the clipboard contents with `text`.
    fn set_text(&mut self, text: String) -> Result<(), ExportError>;
}

/// Clipboard that keeps the last text in memory.
#[derive(Debug, Default, Clone)]
pub struct MemoryClipboard {
    /// Last text written.
    pub contents: Option<String>,
}

impl Clipboard for MemoryClipboard {
    fn set_text(&mut self, text: String) -> Result<(), ExportError> {
        self.contents = Some(text);
        Ok(())
    }
}

/// The exported document.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    /// Day the export was taken.
    pub exported_on: NaiveDate,
    /// Every game, sorted by name.
    pub games: Vec<ExportedGame>,
}

/// One game with its sessions inlined.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedGame {
    /// Title.
    pub name: String,
    /// Cover source URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Supported player count.
    pub player_count: PlayerCount,
    /// Recommended ages.
    pub age_range: AgeRange,
    /// Typical play time.
    pub duration_minutes: u32,
    /// Complexity tier.
    pub complexity: Complexity,
    /// Sessions in the order they were recorded.
    pub sessions: Vec<ExportedSession>,
    /// Starred by the user.
    pub is_favorite: bool,
}

/// A session with participant names.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportedSession {
    /// Day played.
    pub date: NaiveDate,
    /// Participants.
    pub players: Vec<ExportedPlayer>,
}

/// A participant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportedPlayer {
    /// Display name.
    pub name: String,
}

/// Assemble the export document for `snapshot`.
pub fn build(snapshot: &CollectionSnapshot, today: NaiveDate) -> ExportDocument {
    let games = snapshot
        .games
        .iter()
        .map(|game| ExportedGame {
            name: game.name.clone(),
            image_url: game.image_url.clone(),
            player_count: game.player_count,
            age_range: game.age_range,
            duration_minutes: game.duration_minutes,
            complexity: game.complexity,
            sessions: snapshot
                .sessions_of(game)
                .map(|session| ExportedSession {
                    date: session.date,
                    players: snapshot
                        .player_names(session)
                        .into_iter()
                        .map(|name| ExportedPlayer { name })
                        .collect(),
                })
                .collect(),
            is_favorite: game.is_favorite,
        })
        .collect();

    ExportDocument {
        exported_on: today,
        games,
    }
}

/// Serialize `snapshot` as pretty JSON and place it on `clipboard`.
/// Returns the number of games exported.
pub fn to_clipboard(
    snapshot: &CollectionSnapshot,
    today: NaiveDate,
    clipboard: &mut dyn Clipboard,
) -> Result<usize, ExportError> {
    let document = build(snapshot, today);
    let json = serde_json::to_string_pretty(&document)?;
    clipboard.set_text(json)?;
    info!(games = document.games.len(), "Collection exported to clipboard");
    Ok(document.games.len())
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};
    use tempfile::tempdir;

    use super::*;
    use crate::{models::NewGame, store::CollectionStore};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn game(name: &str) -> NewGame {
        NewGame {
            name: name.into(),
            image_url: None,
            cover: None,
            player_count: PlayerCount::between(2, 4),
            age_range: AgeRange::from_min(10),
            duration_minutes: 60,
            complexity: Complexity::Medium,
        }
    }

    #[test]
    fn exports_nested_sessions_with_camel_case_keys() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let store = CollectionStore::open(dir.path())?;
        let azul = store.insert_game(NewGame {
            image_url: Some("https://img.test/azul.jpg".into()),
            ..game("Azul")
        })?;
        store.insert_game(game("Brass"))?;
        store.toggle_favorite(azul.id)?;
        let ana = store.insert_player("Ana")?;
        let ben = store.insert_player("Ben")?;
        store.add_session(azul.id, date(2024, 11, 25), &[ana.id, ben.id])?;

        let mut clipboard = MemoryClipboard::default();
        let count = to_clipboard(&store.snapshot(), date(2024, 12, 1), &mut clipboard)?;
        assert_eq!(count, 2);

        let exported: Value = serde_json::from_str(clipboard.contents.as_deref().unwrap_or(""))?;
        assert_eq!(exported["exportedOn"], "2024-12-01");
        assert_eq!(
            exported["games"][0],
            json!({
                "name": "Azul",
                "imageUrl": "https://img.test/azul.jpg",
                "playerCount": { "min": 2, "max": 4 },
                "ageRange": { "min": 10 },
                "durationMinutes": 60,
                "complexity": "medium",
                "sessions": [
                    { "date": "2024-11-25", "players": [{ "name": "Ana" }, { "name": "Ben" }] }
                ],
                "isFavorite": true
            })
        );
        assert_eq!(exported["games"][1]["name"], "Brass");
        assert!(exported["games"][1].get("imageUrl").is_none());
        assert_eq!(exported["games"][1]["sessions"], json!([]));
        Ok(())
    }

    #[test]
    fn empty_collection_exports_empty_list() -> Result<(), ExportError> {
        let mut clipboard = MemoryClipboard::default();
        let count = to_clipboard(&CollectionSnapshot::default(), date(2025, 1, 1), &mut clipboard)?;
        assert_eq!(count, 0);
        assert!(clipboard
            .contents
            .as_deref()
            .is_some_and(|text| text.contains("\"games\": []")));
        Ok(())
    }

    #[test]
    fn clipboard_failure_is_reported() {
        struct Unavailable;
        impl Clipboard for Unavailable {
            fn set_text(&mut self, _text: String) -> Result<(), ExportError> {
                Err(ExportError::Clipboard("no display".into()))
            }
        }

        let result = to_clipboard(
            &CollectionSnapshot::default(),
            date(2025, 1, 1),
            &mut Unavailable,
        );
        assert!(matches!(result, Err(ExportError::Clipboard(_))));
    }
}
