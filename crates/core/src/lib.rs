#![warn(clippy::all, missing_docs)]

//! Core domain logic for the Meeple board-game tracker.
//!
//! This crate hosts the collection models, the JSON-backed store with its
//! integrity rules, the BoardGameGeek lookup and the clipboard export used
//! by the terminal UI.

pub mod config;
pub mod error;
pub mod export;
pub mod lookup;
pub mod models;
pub mod store;

pub use config::AppConfig;
pub use error::{ExportError, LookupError, StoreError};
pub use models::{
    AgeRange, Complexity, Game, GameDraft, GameId, NewGame, Player, PlayerCount, PlayerId,
    Session, SessionId,
};
pub use store::{CollectionSnapshot, CollectionStore};
