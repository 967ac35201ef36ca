//! Persistent collection store.
//!
//! The whole collection lives in a single JSON document. Every mutation runs
//! its integrity checks and its write under one lock: the change is applied to
//! a copy of the document, the copy is written to disk atomically, and only
//! then does it replace the in-memory state. A rejected or failed mutation
//! therefore leaves both the file and the store untouched.
//!
//! Cover images are kept next to the document, one PNG per game, together
//! with a lazily generated thumbnail cache.

use std::{
    collections::HashMap,
    fs,
    io::{self, Cursor, Write},
    path::{Path, PathBuf},
    sync::Arc,
};

use chrono::NaiveDate;
use image::{DynamicImage, ImageFormat};
use parking_lot::RwLock;
use rand::{seq::IndexedRandom, Rng};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::{
    error::StoreError,
    models::{Complexity, Game, GameId, NewGame, Player, PlayerId, Session, SessionId},
};

/// File name of the collection document inside the data directory.
pub const COLLECTION_FILE: &str = "collection.json";

/// Bounding box of generated thumbnails.
pub const THUMBNAIL_SIZE: u32 = 300;

const DOCUMENT_VERSION: u32 = 1;

/// On-disk representation of the collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CollectionDocument {
    version: u32,
    next_id: u64,
    #[serde(default)]
    games: Vec<Game>,
    #[serde(default)]
    players: Vec<Player>,
    #[serde(default)]
    sessions: Vec<Session>,
}

impl Default for CollectionDocument {
    fn default() -> Self {
        Self {
            version: DOCUMENT_VERSION,
            next_id: 1,
            games: Vec::new(),
            players: Vec::new(),
            sessions: Vec::new(),
        }
    }
}

impl CollectionDocument {
    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn game_mut(&mut self, id: GameId) -> Result<&mut Game, StoreError> {
        self.games
            .iter_mut()
            .find(|game| game.id == id)
            .ok_or(StoreError::NotFound {
                entity: "game",
                id: id.0,
            })
    }

    fn player(&self, id: PlayerId) -> Result<&Player, StoreError> {
        self.players
            .iter()
            .find(|player| player.id == id)
            .ok_or(StoreError::NotFound {
                entity: "player",
                id: id.0,
            })
    }
}

/// Point-in-time copy of the whole collection.
#[derive(Debug, Clone, Default)]
pub struct CollectionSnapshot {
    /// Games sorted by name.
    pub games: Vec<Game>,
    /// Players keyed by id.
    pub players: HashMap<PlayerId, Player>,
    /// Sessions keyed by id.
    pub sessions: HashMap<SessionId, Session>,
}

impl CollectionSnapshot {
    /// Sessions of `game` in the order they were recorded.
    pub fn sessions_of<'a>(&'a self, game: &'a Game) -> impl Iterator<Item = &'a Session> + 'a {
        game.sessions.iter().filter_map(|id| self.sessions.get(id))
    }

    /// Names of the players that took part in `session`.
    pub fn player_names(&self, session: &Session) -> Vec<String> {
        session
            .players
            .iter()
            .filter_map(|id| self.players.get(id))
            .map(|player| player.name.clone())
            .collect()
    }
}

/// Thumbnail of a cover image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thumbnail {
    /// PNG-encoded pixels.
    pub png: Vec<u8>,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// Thread-safe handle to the on-disk collection.
#[derive(Clone)]
pub struct CollectionStore {
    inner: Arc<RwLock<Inner>>,
}

struct Inner {
    files: StoreFiles,
    document: CollectionDocument,
}

impl Inner {
    fn commit(&mut self, draft: CollectionDocument) -> Result<(), StoreError> {
        self.files.write_document(&draft)?;
        self.document = draft;
        Ok(())
    }
}

impl CollectionStore {
    /// Open the store rooted at `data_dir`, starting empty when no collection
    /// file exists yet.
    pub fn open(data_dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let files = StoreFiles::new(data_dir.into());
        let document = files.read_document()?;
        info!(
            path = %files.collection_path().display(),
            games = document.games.len(),
            players = document.players.len(),
            sessions = document.sessions.len(),
            "Collection opened"
        );
        Ok(Self {
            inner: Arc::new(RwLock::new(Inner { files, document })),
        })
    }

    /// Location of the collection document.
    pub fn collection_path(&self) -> PathBuf {
        self.inner.read().files.collection_path()
    }

    /// All games sorted by name.
    pub fn games(&self) -> Vec<Game> {
        let mut games = self.inner.read().document.games.clone();
        sort_by_name(&mut games, |game| &game.name);
        games
    }

    /// Look up a single game.
    pub fn game(&self, id: GameId) -> Option<Game> {
        self.inner
            .read()
            .document
            .games
            .iter()
            .find(|game| game.id == id)
            .cloned()
    }

    /// All players sorted by name.
    pub fn players(&self) -> Vec<Player> {
        let mut players = self.inner.read().document.players.clone();
        sort_by_name(&mut players, |player| &player.name);
        players
    }

    /// Look up a single player.
    pub fn player(&self, id: PlayerId) -> Option<Player> {
        self.inner.read().document.player(id).ok().cloned()
    }

    /// Sessions owned by `game`, in the order they were recorded.
    pub fn sessions_for_game(&self, game: GameId) -> Vec<Session> {
        let inner = self.inner.read();
        let Some(owner) = inner.document.games.iter().find(|g| g.id == game) else {
            return Vec::new();
        };
        owner
            .sessions
            .iter()
            .filter_map(|id| inner.document.sessions.iter().find(|s| s.id == *id))
            .cloned()
            .collect()
    }

    /// Sessions a player took part in.
    pub fn sessions_for_player(&self, player: PlayerId) -> Vec<Session> {
        self.inner
            .read()
            .document
            .sessions
            .iter()
            .filter(|session| session.includes(player))
            .cloned()
            .collect()
    }

    /// Write the current state to disk again.
    pub fn save(&self) -> Result<(), StoreError> {
        let inner = self.inner.read();
        inner.files.write_document(&inner.document)
    }

    /// Consistent copy of every record.
    pub fn snapshot(&self) -> CollectionSnapshot {
        let inner = self.inner.read();
        let mut games = inner.document.games.clone();
        sort_by_name(&mut games, |game| &game.name);
        CollectionSnapshot {
            games,
            players: inner
                .document
                .players
                .iter()
                .map(|player| (player.id, player.clone()))
                .collect(),
            sessions: inner
                .document
                .sessions
                .iter()
                .map(|session| (session.id, session.clone()))
                .collect(),
        }
    }

    /// Add a game, storing its cover image when one is supplied.
    pub fn insert_game(&self, new_game: NewGame) -> Result<Game, StoreError> {
        let name = required_name(&new_game.name, "game")?;
        let cover = new_game.cover.as_deref().map(encode_png).transpose()?;

        let mut inner = self.inner.write();
        let mut draft = inner.document.clone();
        let game = Game {
            id: GameId(draft.allocate_id()),
            name,
            image_url: new_game.image_url,
            has_cover: cover.is_some(),
            player_count: new_game.player_count,
            age_range: new_game.age_range,
            duration_minutes: new_game.duration_minutes,
            complexity: new_game.complexity,
            is_favorite: false,
            sessions: Vec::new(),
        };
        draft.games.push(game.clone());

        if let Some(png) = &cover {
            inner.files.write_cover(game.id, png)?;
        }
        if let Err(err) = inner.commit(draft) {
            if cover.is_some() {
                inner.files.remove_images(game.id);
            }
            return Err(err);
        }

        info!(game_id = %game.id, name = %game.name, "Game added");
        Ok(game)
    }

    /// Add a player to the roster.
    pub fn insert_player(&self, name: &str) -> Result<Player, StoreError> {
        let name = required_name(name, "player")?;
        let player = self.mutate(|doc| {
            let player = Player {
                id: PlayerId(doc.allocate_id()),
                name,
            };
            doc.players.push(player.clone());
            Ok(player)
        })?;
        info!(player_id = %player.id, name = %player.name, "Player added");
        Ok(player)
    }

    /// Record a session of `game` played on `date` by `players`.
    ///
    /// Duplicate player ids are collapsed; at least one player is required.
    pub fn add_session(
        &self,
        game: GameId,
        date: NaiveDate,
        players: &[PlayerId],
    ) -> Result<Session, StoreError> {
        let mut participants: Vec<PlayerId> = Vec::with_capacity(players.len());
        for id in players {
            if !participants.contains(id) {
                participants.push(*id);
            }
        }
        if participants.is_empty() {
            return Err(StoreError::Validation(
                "a session needs at least one player".to_string(),
            ));
        }

        let session = self.mutate(|doc| {
            for id in &participants {
                doc.player(*id)?;
            }
            let session = Session {
                id: SessionId(doc.allocate_id()),
                date,
                game,
                players: participants,
            };
            doc.game_mut(game)?.sessions.push(session.id);
            doc.sessions.push(session.clone());
            Ok(session)
        })?;
        info!(session_id = %session.id, game_id = %game, %date, "Session recorded");
        Ok(session)
    }

    /// Delete a game together with every session it owns and its images.
    pub fn delete_game(&self, id: GameId) -> Result<Game, StoreError> {
        let mut inner = self.inner.write();
        let mut draft = inner.document.clone();
        let position = draft
            .games
            .iter()
            .position(|game| game.id == id)
            .ok_or(StoreError::NotFound {
                entity: "game",
                id: id.0,
            })?;
        let game = draft.games.remove(position);
        let before = draft.sessions.len();
        draft.sessions.retain(|session| session.game != id);
        let removed_sessions = before - draft.sessions.len();

        inner.commit(draft)?;
        inner.files.remove_images(id);
        info!(game_id = %id, name = %game.name, removed_sessions, "Game deleted");
        Ok(game)
    }

    /// Delete a player. Refused while any session references the player.
    pub fn delete_player(&self, id: PlayerId) -> Result<Player, StoreError> {
        let player = self.mutate(|doc| {
            let player = doc.player(id)?.clone();
            let sessions = doc
                .sessions
                .iter()
                .filter(|session| session.includes(id))
                .count();
            if sessions > 0 {
                return Err(StoreError::PlayerInUse {
                    player: player.name,
                    sessions,
                });
            }
            doc.players.retain(|candidate| candidate.id != id);
            Ok(player)
        });
        match &player {
            Ok(player) => info!(player_id = %id, name = %player.name, "Player deleted"),
            Err(err) => warn!(player_id = %id, %err, "Player deletion refused"),
        }
        player
    }

    /// Delete a single session; its game and players stay untouched.
    pub fn delete_session(&self, id: SessionId) -> Result<Session, StoreError> {
        let session = self.mutate(|doc| {
            let position = doc
                .sessions
                .iter()
                .position(|session| session.id == id)
                .ok_or(StoreError::NotFound {
                    entity: "session",
                    id: id.0,
                })?;
            let session = doc.sessions.remove(position);
            if let Ok(game) = doc.game_mut(session.game) {
                game.sessions.retain(|owned| *owned != id);
            }
            Ok(session)
        })?;
        info!(session_id = %id, game_id = %session.game, "Session deleted");
        Ok(session)
    }

    /// Flip the favorite flag and return its new value.
    pub fn toggle_favorite(&self, id: GameId) -> Result<bool, StoreError> {
        self.mutate(|doc| {
            let game = doc.game_mut(id)?;
            game.is_favorite = !game.is_favorite;
            Ok(game.is_favorite)
        })
    }

    /// Replace (or with `None`, remove) the cover of a game. The cached
    /// thumbnail is always discarded.
    pub fn set_cover(&self, id: GameId, image: Option<&[u8]>) -> Result<(), StoreError> {
        let png = image.map(encode_png).transpose()?;

        let mut inner = self.inner.write();
        let mut draft = inner.document.clone();
        draft.game_mut(id)?.has_cover = png.is_some();

        let staged = png
            .as_deref()
            .map(|png| inner.files.stage_cover(id, png))
            .transpose()?;
        inner.commit(draft)?;

        match staged {
            Some(staged) => {
                inner.files.install_cover(id, staged)?;
                inner.files.remove_thumbnail(id);
            }
            None => inner.files.remove_images(id),
        }
        debug!(game_id = %id, has_cover = png.is_some(), "Cover replaced");
        Ok(())
    }

    /// Stored cover of a game as PNG bytes.
    pub fn cover(&self, id: GameId) -> Result<Option<Vec<u8>>, StoreError> {
        let inner = self.inner.read();
        let has_cover = inner
            .document
            .games
            .iter()
            .any(|game| game.id == id && game.has_cover);
        if !has_cover {
            return Ok(None);
        }
        inner.files.read_optional(&inner.files.cover_path(id))
    }

    /// Thumbnail of the cover, generated and cached on first use.
    pub fn thumbnail(&self, id: GameId) -> Result<Option<Thumbnail>, StoreError> {
        let inner = self.inner.read();
        let has_cover = inner
            .document
            .games
            .iter()
            .any(|game| game.id == id && game.has_cover);
        if !has_cover {
            return Ok(None);
        }

        let cached_path = inner.files.thumbnail_path(id);
        if let Some(png) = inner.files.read_optional(&cached_path)? {
            let decoded = image::load_from_memory_with_format(&png, ImageFormat::Png)?;
            return Ok(Some(Thumbnail {
                width: decoded.width(),
                height: decoded.height(),
                png,
            }));
        }

        let Some(cover) = inner.files.read_optional(&inner.files.cover_path(id))? else {
            return Ok(None);
        };
        let thumbnail = image::load_from_memory(&cover)?.thumbnail(THUMBNAIL_SIZE, THUMBNAIL_SIZE);
        let png = png_bytes(&thumbnail)?;
        write_atomic(&cached_path, &png)?;
        debug!(game_id = %id, "Thumbnail generated");
        Ok(Some(Thumbnail {
            width: thumbnail.width(),
            height: thumbnail.height(),
            png,
        }))
    }

    /// Pick a random game, optionally restricted to one complexity tier.
    /// Unplayed games are preferred; when every match has been played, any
    /// match may be picked.
    pub fn random_game<R: Rng + ?Sized>(
        &self,
        complexity: Option<Complexity>,
        rng: &mut R,
    ) -> Option<Game> {
        let inner = self.inner.read();
        let matching: Vec<&Game> = inner
            .document
            .games
            .iter()
            .filter(|game| complexity.map_or(true, |wanted| game.complexity == wanted))
            .collect();
        let unplayed: Vec<&Game> = matching
            .iter()
            .copied()
            .filter(|game| game.is_unplayed())
            .collect();

        unplayed
            .choose(rng)
            .or_else(|| matching.choose(rng))
            .map(|game| (*game).clone())
    }

    fn mutate<T>(
        &self,
        apply: impl FnOnce(&mut CollectionDocument) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut inner = self.inner.write();
        let mut draft = inner.document.clone();
        let value = apply(&mut draft)?;
        inner.commit(draft)?;
        Ok(value)
    }
}

/// Paths of everything the store keeps on disk.
struct StoreFiles {
    root: PathBuf,
}

impl StoreFiles {
    fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn collection_path(&self) -> PathBuf {
        self.root.join(COLLECTION_FILE)
    }

    fn cover_path(&self, id: GameId) -> PathBuf {
        self.root.join("covers").join(format!("{id}.png"))
    }

    fn thumbnail_path(&self, id: GameId) -> PathBuf {
        self.root.join("thumbnails").join(format!("{id}.png"))
    }

    fn read_document(&self) -> Result<CollectionDocument, StoreError> {
        let Some(bytes) = self.read_optional(&self.collection_path())? else {
            return Ok(CollectionDocument::default());
        };
        let document: CollectionDocument = serde_json::from_slice(&bytes)?;
        if document.version > DOCUMENT_VERSION {
            return Err(StoreError::Validation(format!(
                "collection version {} is newer than supported version {}",
                document.version, DOCUMENT_VERSION
            )));
        }
        Ok(document)
    }

    fn write_document(&self, document: &CollectionDocument) -> Result<(), StoreError> {
        let serialized = serde_json::to_vec_pretty(document)?;
        write_atomic(&self.collection_path(), &serialized)?;
        Ok(())
    }

    fn write_cover(&self, id: GameId, png: &[u8]) -> Result<(), StoreError> {
        write_atomic(&self.cover_path(id), png)?;
        Ok(())
    }

    /// Write a cover next to its final path without replacing the current one.
    fn stage_cover(&self, id: GameId, png: &[u8]) -> Result<NamedTempFile, StoreError> {
        Ok(stage(&self.cover_path(id), png)?)
    }

    fn install_cover(&self, id: GameId, staged: NamedTempFile) -> Result<(), StoreError> {
        staged
            .persist(self.cover_path(id))
            .map_err(|err| err.error)?;
        Ok(())
    }

    fn remove_thumbnail(&self, id: GameId) {
        remove_if_present(&self.thumbnail_path(id));
    }

    fn remove_images(&self, id: GameId) {
        remove_if_present(&self.cover_path(id));
        remove_if_present(&self.thumbnail_path(id));
    }

    fn read_optional(&self, path: &Path) -> Result<Option<Vec<u8>>, StoreError> {
        match fs::read(path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    stage(path, bytes)?.persist(path).map_err(|err| err.error)?;
    Ok(())
}

fn stage(path: &Path, bytes: &[u8]) -> io::Result<NamedTempFile> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)?;
    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(bytes)?;
    file.as_file().sync_all()?;
    Ok(file)
}

fn remove_if_present(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => warn!(path = %path.display(), %err, "Failed to remove image file"),
    }
}

fn encode_png(image: &[u8]) -> Result<Vec<u8>, StoreError> {
    let decoded = image::load_from_memory(image)?;
    png_bytes(&decoded)
}

fn png_bytes(image: &DynamicImage) -> Result<Vec<u8>, StoreError> {
    let mut buffer = Cursor::new(Vec::new());
    image.write_to(&mut buffer, ImageFormat::Png)?;
    Ok(buffer.into_inner())
}

fn required_name(name: &str, entity: &str) -> Result<String, StoreError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(StoreError::Validation(format!("{entity} name is required")));
    }
    Ok(trimmed.to_string())
}

fn sort_by_name<T>(items: &mut [T], name: impl Fn(&T) -> &str) {
    items.sort_by(|a, b| {
        let (a, b) = (name(a), name(b));
        a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b))
    });
}

#[cfg(test)]
mod tests {
    use image::RgbImage;
    use rand::{rngs::StdRng, SeedableRng};
    use tempfile::tempdir;

    use super::*;
    use crate::models::{AgeRange, PlayerCount};

    fn new_game(name: &str, complexity: Complexity) -> NewGame {
        NewGame {
            name: name.to_string(),
            image_url: None,
            cover: None,
            player_count: PlayerCount::between(2, 4),
            age_range: AgeRange::from_min(10),
            duration_minutes: 45,
            complexity,
        }
    }

    fn sample_png(width: u32, height: u32) -> Vec<u8> {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(
            width,
            height,
            image::Rgb([200, 40, 40]),
        ));
        png_bytes(&image).expect("encode sample png")
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 11, day).expect("valid date")
    }

    #[test]
    fn games_and_players_are_sorted_by_name() -> Result<(), StoreError> {
        let dir = tempdir()?;
        let store = CollectionStore::open(dir.path())?;
        store.insert_game(new_game("Wingspan", Complexity::Medium))?;
        store.insert_game(new_game("azul", Complexity::Easy))?;
        store.insert_game(new_game("Splendor", Complexity::Easy))?;
        store.insert_player("Charlie")?;
        store.insert_player("alice")?;

        let names: Vec<_> = store.games().into_iter().map(|game| game.name).collect();
        assert_eq!(names, ["azul", "Splendor", "Wingspan"]);
        let players: Vec<_> = store.players().into_iter().map(|p| p.name).collect();
        assert_eq!(players, ["alice", "Charlie"]);
        Ok(())
    }

    #[test]
    fn deleting_game_cascades_to_sessions() -> Result<(), StoreError> {
        let dir = tempdir()?;
        let store = CollectionStore::open(dir.path())?;
        let tapestry = store.insert_game(new_game("Tapestry", Complexity::Medium))?;
        let azul = store.insert_game(new_game("Azul", Complexity::Easy))?;
        let alice = store.insert_player("Alice")?;
        let bob = store.insert_player("Bob")?;

        store.add_session(tapestry.id, date(1), &[alice.id, bob.id])?;
        store.add_session(tapestry.id, date(2), &[alice.id])?;
        let kept = store.add_session(azul.id, date(3), &[bob.id])?;

        store.delete_game(tapestry.id)?;
        assert!(store.game(tapestry.id).is_none());
        let remaining: Vec<_> = store.snapshot().sessions.into_keys().collect();
        assert_eq!(remaining, vec![kept.id]);
        assert_eq!(store.players().len(), 2);

        store.delete_player(alice.id)?;
        assert!(store.player(alice.id).is_none());
        Ok(())
    }

    #[test]
    fn referenced_player_cannot_be_deleted() -> Result<(), StoreError> {
        let dir = tempdir()?;
        let store = CollectionStore::open(dir.path())?;
        let game = store.insert_game(new_game("Splendor", Complexity::Easy))?;
        let alice = store.insert_player("Alice")?;
        store.add_session(game.id, date(5), &[alice.id])?;
        let before = fs::read(store.collection_path())?;

        let err = store.delete_player(alice.id).unwrap_err();
        assert!(matches!(
            err,
            StoreError::PlayerInUse { ref player, sessions: 1 } if player == "Alice"
        ));
        assert!(store.player(alice.id).is_some());
        assert_eq!(store.sessions_for_player(alice.id).len(), 1);
        assert_eq!(fs::read(store.collection_path())?, before);
        Ok(())
    }

    #[test]
    fn deleting_session_keeps_game_and_players() -> Result<(), StoreError> {
        let dir = tempdir()?;
        let store = CollectionStore::open(dir.path())?;
        let game = store.insert_game(new_game("Azul", Complexity::Easy))?;
        let alice = store.insert_player("Alice")?;
        let first = store.add_session(game.id, date(1), &[alice.id])?;
        let second = store.add_session(game.id, date(2), &[alice.id])?;

        store.delete_session(first.id)?;

        let game = store.game(game.id).expect("game survives");
        assert_eq!(game.sessions, vec![second.id]);
        assert!(store.player(alice.id).is_some());
        let sessions = store.sessions_for_game(game.id);
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].date, date(2));
        Ok(())
    }

    #[test]
    fn session_requires_players_and_known_records() -> Result<(), StoreError> {
        let dir = tempdir()?;
        let store = CollectionStore::open(dir.path())?;
        let game = store.insert_game(new_game("Azul", Complexity::Easy))?;
        let alice = store.insert_player("Alice")?;

        assert!(matches!(
            store.add_session(game.id, date(1), &[]),
            Err(StoreError::Validation(_))
        ));
        assert!(matches!(
            store.add_session(game.id, date(1), &[PlayerId(999)]),
            Err(StoreError::NotFound {
                entity: "player",
                ..
            })
        ));
        assert!(matches!(
            store.add_session(GameId(999), date(1), &[alice.id]),
            Err(StoreError::NotFound { entity: "game", .. })
        ));

        let session = store.add_session(game.id, date(1), &[alice.id, alice.id])?;
        assert_eq!(session.players, vec![alice.id]);
        assert!(store.game(game.id).is_some_and(|g| g.sessions.len() == 1));
        Ok(())
    }

    #[test]
    fn blank_names_are_rejected() -> Result<(), StoreError> {
        let dir = tempdir()?;
        let store = CollectionStore::open(dir.path())?;
        assert!(matches!(
            store.insert_player("   "),
            Err(StoreError::Validation(_))
        ));
        assert!(matches!(
            store.insert_game(new_game("", Complexity::Easy)),
            Err(StoreError::Validation(_))
        ));
        assert!(store.games().is_empty());
        Ok(())
    }

    #[test]
    fn collection_survives_reopen() -> Result<(), StoreError> {
        let dir = tempdir()?;
        let game_id = {
            let store = CollectionStore::open(dir.path())?;
            let game = store.insert_game(new_game("Wingspan", Complexity::Medium))?;
            let alice = store.insert_player("Alice")?;
            store.add_session(game.id, date(9), &[alice.id])?;
            assert!(store.toggle_favorite(game.id)?);
            game.id
        };

        let store = CollectionStore::open(dir.path())?;
        let game = store.game(game_id).expect("game persisted");
        assert!(game.is_favorite);
        assert_eq!(store.sessions_for_game(game_id).len(), 1);

        let next = store.insert_player("Bob")?;
        assert!(next.id.0 > game_id.0, "ids are never reused");
        Ok(())
    }

    #[test]
    fn save_rewrites_a_missing_document() -> Result<(), StoreError> {
        let dir = tempdir()?;
        let store = CollectionStore::open(dir.path())?;
        store.insert_game(new_game("Cascadia", Complexity::Easy))?;
        fs::remove_file(store.collection_path())?;

        store.save()?;
        let reopened = CollectionStore::open(dir.path())?;
        assert_eq!(reopened.games().len(), 1);
        Ok(())
    }

    #[test]
    fn replacing_cover_invalidates_thumbnail() -> Result<(), StoreError> {
        let dir = tempdir()?;
        let store = CollectionStore::open(dir.path())?;
        let mut input = new_game("Tapestry", Complexity::Medium);
        input.cover = Some(sample_png(600, 400));
        let game = store.insert_game(input)?;
        assert!(game.has_cover);

        let thumbnail = store.thumbnail(game.id)?.expect("thumbnail generated");
        assert_eq!((thumbnail.width, thumbnail.height), (300, 200));
        assert!(dir.path().join("thumbnails/1.png").exists());

        store.set_cover(game.id, Some(&sample_png(100, 500)))?;
        assert!(!dir.path().join("thumbnails/1.png").exists());
        let thumbnail = store.thumbnail(game.id)?.expect("thumbnail regenerated");
        assert_eq!((thumbnail.width, thumbnail.height), (60, 300));

        store.set_cover(game.id, None)?;
        assert!(store.cover(game.id)?.is_none());
        assert!(store.thumbnail(game.id)?.is_none());
        Ok(())
    }

    #[test]
    fn failed_commit_keeps_previous_cover() -> Result<(), StoreError> {
        let dir = tempdir()?;
        let store = CollectionStore::open(dir.path())?;
        let mut input = new_game("Everdell", Complexity::Medium);
        input.cover = Some(sample_png(10, 10));
        let game = store.insert_game(input)?;
        let original = store.cover(game.id)?.expect("cover stored");

        let path = store.collection_path();
        fs::remove_file(&path)?;
        fs::create_dir(&path)?;
        fs::write(path.join("blocker"), b"occupied")?;

        assert!(store.set_cover(game.id, Some(&sample_png(40, 20))).is_err());
        assert_eq!(store.cover(game.id)?.as_ref(), Some(&original));

        assert!(store.set_cover(game.id, None).is_err());
        assert!(store.game(game.id).expect("game kept").has_cover);
        assert_eq!(store.cover(game.id)?, Some(original));
        assert_eq!(fs::read_dir(dir.path().join("covers"))?.count(), 1);
        Ok(())
    }

    #[test]
    fn undecodable_cover_is_rejected() -> Result<(), StoreError> {
        let dir = tempdir()?;
        let store = CollectionStore::open(dir.path())?;
        let mut input = new_game("Azul", Complexity::Easy);
        input.cover = Some(b"not an image".to_vec());
        assert!(matches!(store.insert_game(input), Err(StoreError::Image(_))));
        assert!(store.games().is_empty());
        Ok(())
    }

    #[test]
    fn deleting_game_removes_images() -> Result<(), StoreError> {
        let dir = tempdir()?;
        let store = CollectionStore::open(dir.path())?;
        let mut input = new_game("Azul", Complexity::Easy);
        input.cover = Some(sample_png(50, 50));
        let game = store.insert_game(input)?;
        store.thumbnail(game.id)?;

        store.delete_game(game.id)?;
        assert!(!dir.path().join(format!("covers/{}.png", game.id)).exists());
        assert!(!dir.path().join(format!("thumbnails/{}.png", game.id)).exists());
        Ok(())
    }

    #[test]
    fn random_game_prefers_unplayed_matches() -> Result<(), StoreError> {
        let dir = tempdir()?;
        let store = CollectionStore::open(dir.path())?;
        let played = store.insert_game(new_game("Azul", Complexity::Easy))?;
        let fresh = store.insert_game(new_game("Splendor", Complexity::Easy))?;
        let heavy = store.insert_game(new_game("Brass", Complexity::Hard))?;
        let alice = store.insert_player("Alice")?;
        store.add_session(played.id, date(1), &[alice.id])?;
        store.add_session(heavy.id, date(2), &[alice.id])?;

        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            let pick = store
                .random_game(Some(Complexity::Easy), &mut rng)
                .expect("easy games exist");
            assert_eq!(pick.id, fresh.id);
        }

        let pick = store
            .random_game(Some(Complexity::Hard), &mut rng)
            .expect("falls back to played games");
        assert_eq!(pick.id, heavy.id);
        assert!(store
            .random_game(Some(Complexity::Medium), &mut rng)
            .is_none());
        Ok(())
    }
}
