use std::collections::BTreeSet;

use chrono::NaiveDate;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use meeple_core::{
    lookup::{LookupEvent, LookupHandle, SearchHit},
    Complexity, GameDraft, GameId, Player, PlayerId,
};
use tracing::debug;

const MAX_INPUT_LEN: usize = 80;
const DURATION_STEP: i32 = 5;
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Single-line text field with a character cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextInput {
    pub value: String,
    pub cursor: usize,
}

impl TextInput {
    pub fn new(value: impl Into<String>) -> Self {
        let value = value.into();
        let cursor = value.chars().count();
        Self { value, cursor }
    }

    fn byte_offset(&self, cursor: usize) -> usize {
        self.value
            .char_indices()
            .nth(cursor)
            .map_or(self.value.len(), |(offset, _)| offset)
    }

    fn len(&self) -> usize {
        self.value.chars().count()
    }

    pub fn move_cursor(&mut self, delta: isize) {
        self.cursor = self.cursor.saturating_add_signed(delta).min(self.len());
    }

    pub fn insert(&mut self, ch: char) {
        if self.len() >= MAX_INPUT_LEN || ch.is_control() {
            return;
        }
        let offset = self.byte_offset(self.cursor);
        self.value.insert(offset, ch);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let offset = self.byte_offset(self.cursor);
            self.value.remove(offset);
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.len() {
            let offset = self.byte_offset(self.cursor);
            self.value.remove(offset);
        }
    }

    /// Apply an editing key. Returns whether the key was consumed.
    pub fn handle_key(&mut self, key: &KeyEvent) -> bool {
        match key.code {
            KeyCode::Left => self.move_cursor(-1),
            KeyCode::Right => self.move_cursor(1),
            KeyCode::Home => self.cursor = 0,
            KeyCode::End => self.cursor = self.len(),
            KeyCode::Backspace => self.backspace(),
            KeyCode::Delete => self.delete(),
            KeyCode::Char(ch)
                if key.modifiers.is_empty() || key.modifiers == KeyModifiers::SHIFT =>
            {
                self.insert(ch)
            }
            _ => return false,
        }
        true
    }
}

/// What the owner of a form should do after a key press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormAction {
    None,
    Cancel,
    Submit,
    /// Start a name search.
    Search(String),
    /// Fetch the details of a search hit.
    Pick(u64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameField {
    Name,
    Complexity,
    Duration,
    MinPlayers,
    HasMaxPlayers,
    MaxPlayers,
    MinAge,
    HasMaxAge,
    MaxAge,
}

impl GameField {
    pub const ALL: [GameField; 9] = [
        GameField::Name,
        GameField::Complexity,
        GameField::Duration,
        GameField::MinPlayers,
        GameField::HasMaxPlayers,
        GameField::MaxPlayers,
        GameField::MinAge,
        GameField::HasMaxAge,
        GameField::MaxAge,
    ];

    pub fn label(self) -> &'static str {
        match self {
            GameField::Name => "Name",
            GameField::Complexity => "Complexity",
            GameField::Duration => "Duration",
            GameField::MinPlayers => "Min players",
            GameField::HasMaxPlayers => "Has max players",
            GameField::MaxPlayers => "Max players",
            GameField::MinAge => "Min age",
            GameField::HasMaxAge => "Has max age",
            GameField::MaxAge => "Max age",
        }
    }
}

#[derive(Debug, Default)]
pub enum SearchState {
    #[default]
    Idle,
    Searching(LookupHandle),
    Results {
        hits: Vec<SearchHit>,
        cursor: usize,
    },
}

/// The add-game form, including its lookup state.
#[derive(Debug)]
pub struct GameForm {
    pub draft: GameDraft,
    pub name: TextInput,
    pub field: GameField,
    pub search: SearchState,
    /// Detail request whose cover may still be on its way.
    pub details: Option<LookupHandle>,
    /// Detail fields not merged yet; the form is read-only meanwhile.
    pub loading_details: bool,
}

impl Default for GameForm {
    fn default() -> Self {
        Self {
            draft: GameDraft::default(),
            name: TextInput::default(),
            field: GameField::Name,
            search: SearchState::Idle,
            details: None,
            loading_details: false,
        }
    }
}

impl GameForm {
    pub fn is_searching(&self) -> bool {
        matches!(self.search, SearchState::Searching(_))
    }

    pub fn begin_search(&mut self, handle: LookupHandle) {
        self.search = SearchState::Searching(handle);
    }

    pub fn begin_details(&mut self, handle: LookupHandle) {
        self.details = Some(handle);
        self.loading_details = true;
    }

    fn owns_search(&self, event: &LookupEvent) -> bool {
        matches!(&self.search, SearchState::Searching(handle) if event.belongs_to(handle))
    }

    fn owns_details(&self, event: &LookupEvent) -> bool {
        self.details
            .as_ref()
            .is_some_and(|handle| event.belongs_to(handle))
    }

    /// Apply a lookup result. Returns a status line, or `None` when the event
    /// belongs to a request this form no longer waits for.
    pub fn apply_lookup(&mut self, event: LookupEvent) -> Option<String> {
        let owned = match &event {
            LookupEvent::SearchResults { .. } => self.owns_search(&event),
            LookupEvent::Details { .. } => self.loading_details && self.owns_details(&event),
            LookupEvent::Cover { .. } => self.owns_details(&event),
            LookupEvent::Failed { .. } => self.owns_search(&event) || self.owns_details(&event),
        };
        if !owned {
            debug!(ticket = ?event.ticket(), "Ignoring stale lookup event");
            return None;
        }

        let from_search = self.owns_search(&event);
        let status = match event {
            LookupEvent::SearchResults { hits, .. } if hits.is_empty() => {
                self.search = SearchState::Idle;
                "No games found".to_string()
            }
            LookupEvent::SearchResults { hits, .. } => {
                let status = format!("{} result(s), Enter to pick", hits.len());
                self.search = SearchState::Results { hits, cursor: 0 };
                status
            }
            LookupEvent::Details { details, .. } => {
                details.apply_to(&mut self.draft);
                self.loading_details = false;
                "Details loaded".to_string()
            }
            LookupEvent::Cover { cover, .. } => {
                self.draft.set_cover(cover.url, cover.png);
                "Cover downloaded".to_string()
            }
            LookupEvent::Failed { message, .. } => {
                if from_search {
                    self.search = SearchState::Idle;
                } else {
                    self.loading_details = false;
                }
                format!("Lookup failed: {message}")
            }
        };
        Some(status)
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = TextInput::new(name);
        self.draft.name = name.to_string();
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> FormAction {
        if self.loading_details {
            return match key.code {
                KeyCode::Esc => FormAction::Cancel,
                _ => FormAction::None,
            };
        }

        match &mut self.search {
            SearchState::Searching(_) => {
                if key.code == KeyCode::Esc {
                    self.search = SearchState::Idle;
                }
                return FormAction::None;
            }
            SearchState::Results { hits, cursor } => {
                match key.code {
                    KeyCode::Esc => self.search = SearchState::Idle,
                    KeyCode::Up | KeyCode::Char('k') => *cursor = cursor.saturating_sub(1),
                    KeyCode::Down | KeyCode::Char('j') => {
                        *cursor = (*cursor + 1).min(hits.len().saturating_sub(1))
                    }
                    KeyCode::Enter => {
                        if let Some(hit) = hits.get(*cursor).cloned() {
                            self.search = SearchState::Idle;
                            self.set_name(&hit.name);
                            return FormAction::Pick(hit.id);
                        }
                    }
                    _ => {}
                }
                return FormAction::None;
            }
            SearchState::Idle => {}
        }

        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('s') {
            return if self.draft.can_search() {
                FormAction::Search(self.draft.name.trim().to_string())
            } else {
                FormAction::None
            };
        }

        match key.code {
            KeyCode::Esc => return FormAction::Cancel,
            KeyCode::Enter if self.draft.is_complete() => return FormAction::Submit,
            KeyCode::Enter => {}
            KeyCode::Tab | KeyCode::Down => self.move_field(1),
            KeyCode::BackTab | KeyCode::Up => self.move_field(-1),
            _ if self.field == GameField::Name => {
                if self.name.handle_key(&key) {
                    self.draft.name = self.name.value.clone();
                }
            }
            KeyCode::Left | KeyCode::Char('-') => self.adjust(-1),
            KeyCode::Right | KeyCode::Char('+') | KeyCode::Char(' ') => self.adjust(1),
            _ => {}
        }
        FormAction::None
    }

    fn move_field(&mut self, delta: isize) {
        let count = GameField::ALL.len() as isize;
        let index = GameField::ALL
            .iter()
            .position(|field| *field == self.field)
            .unwrap_or(0) as isize;
        self.field = GameField::ALL[(index + delta).rem_euclid(count) as usize];
    }

    fn adjust(&mut self, delta: i32) {
        let draft = &mut self.draft;
        match self.field {
            GameField::Name => {}
            GameField::Complexity => draft.complexity = cycle_complexity(draft.complexity, delta),
            GameField::Duration => draft
                .set_duration(draft.duration_minutes.saturating_add_signed(delta * DURATION_STEP)),
            GameField::MinPlayers => {
                draft.set_min_players(draft.min_players.saturating_add_signed(delta))
            }
            GameField::HasMaxPlayers => draft.has_max_players = !draft.has_max_players,
            GameField::MaxPlayers => {
                draft.set_max_players(draft.max_players.saturating_add_signed(delta))
            }
            GameField::MinAge => draft.set_min_age(draft.min_age.saturating_add_signed(delta)),
            GameField::HasMaxAge => draft.has_max_age = !draft.has_max_age,
            GameField::MaxAge => draft.set_max_age(draft.max_age.saturating_add_signed(delta)),
        }
    }
}

fn cycle_complexity(current: Option<Complexity>, delta: i32) -> Option<Complexity> {
    let options = [
        None,
        Some(Complexity::Easy),
        Some(Complexity::Medium),
        Some(Complexity::Hard),
    ];
    let index = options.iter().position(|c| *c == current).unwrap_or(0) as i32;
    options[(index + delta).rem_euclid(options.len() as i32) as usize]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionFocus {
    Date,
    Players,
}

/// The add-session form.
#[derive(Debug, Clone)]
pub struct SessionForm {
    pub game: GameId,
    pub game_name: String,
    pub date: TextInput,
    pub players: Vec<Player>,
    pub selected: BTreeSet<PlayerId>,
    pub cursor: usize,
    pub focus: SessionFocus,
}

impl SessionForm {
    pub fn new(game: GameId, game_name: String, players: Vec<Player>, today: NaiveDate) -> Self {
        Self {
            game,
            game_name,
            date: TextInput::new(today.format(DATE_FORMAT).to_string()),
            players,
            selected: BTreeSet::new(),
            cursor: 0,
            focus: SessionFocus::Players,
        }
    }

    pub fn parsed_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(self.date.value.trim(), DATE_FORMAT).ok()
    }

    pub fn can_submit(&self) -> bool {
        !self.selected.is_empty() && self.parsed_date().is_some()
    }

    /// Selected players in list order.
    pub fn selected_players(&self) -> Vec<PlayerId> {
        self.players
            .iter()
            .map(|player| player.id)
            .filter(|id| self.selected.contains(id))
            .collect()
    }

    fn toggle_current(&mut self) {
        if let Some(player) = self.players.get(self.cursor) {
            if !self.selected.remove(&player.id) {
                self.selected.insert(player.id);
            }
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> FormAction {
        match key.code {
            KeyCode::Esc => return FormAction::Cancel,
            KeyCode::Enter if self.can_submit() => return FormAction::Submit,
            KeyCode::Enter => {}
            KeyCode::Tab | KeyCode::BackTab => {
                self.focus = match self.focus {
                    SessionFocus::Date => SessionFocus::Players,
                    SessionFocus::Players => SessionFocus::Date,
                }
            }
            _ if self.focus == SessionFocus::Date => {
                self.date.handle_key(&key);
            }
            KeyCode::Up | KeyCode::Char('k') => self.cursor = self.cursor.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => {
                self.cursor = (self.cursor + 1).min(self.players.len().saturating_sub(1))
            }
            KeyCode::Char(' ') => self.toggle_current(),
            _ => {}
        }
        FormAction::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(ch: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(ch), KeyModifiers::CONTROL)
    }

    fn type_text(form: &mut GameForm, text: &str) {
        for ch in text.chars() {
            form.handle_key(key(KeyCode::Char(ch)));
        }
    }

    #[test]
    fn text_input_edits_multibyte_names() {
        let mut input = TextInput::new("Caf");
        input.insert('é');
        input.move_cursor(-10);
        input.insert('>');
        assert_eq!(input.value, ">Café");
        input.handle_key(&key(KeyCode::End));
        input.backspace();
        assert_eq!(input.value, ">Caf");
        input.handle_key(&key(KeyCode::Home));
        input.delete();
        assert_eq!(input.value, "Caf");
        assert_eq!(input.cursor, 0);
    }

    #[test]
    fn search_requires_a_name() {
        let mut form = GameForm::default();
        assert_eq!(form.handle_key(ctrl('s')), FormAction::None);

        type_text(&mut form, "Wingspan");
        assert_eq!(form.draft.name, "Wingspan");
        assert_eq!(
            form.handle_key(ctrl('s')),
            FormAction::Search("Wingspan".into())
        );
    }

    #[test]
    fn saving_needs_a_name_and_complexity() {
        let mut form = GameForm::default();
        type_text(&mut form, "Cascadia");
        assert_eq!(form.handle_key(key(KeyCode::Enter)), FormAction::None);

        form.handle_key(key(KeyCode::Tab));
        form.handle_key(key(KeyCode::Right));
        assert_eq!(form.handle_key(key(KeyCode::Enter)), FormAction::Submit);
    }

    #[test]
    fn picking_a_hit_sets_the_name() {
        let mut form = GameForm::default();
        form.search = SearchState::Results {
            hits: vec![
                SearchHit {
                    id: 1,
                    name: "Wingspan".into(),
                    year: 2019,
                },
                SearchHit {
                    id: 2,
                    name: "Wingspan Asia".into(),
                    year: 2022,
                },
            ],
            cursor: 0,
        };

        form.handle_key(key(KeyCode::Down));
        form.handle_key(key(KeyCode::Down));
        assert_eq!(form.handle_key(key(KeyCode::Enter)), FormAction::Pick(2));
        assert_eq!(form.draft.name, "Wingspan Asia");
        assert!(matches!(form.search, SearchState::Idle));
    }

    #[test]
    fn loading_details_disables_the_form() {
        let mut form = GameForm {
            loading_details: true,
            ..GameForm::default()
        };
        type_text(&mut form, "abc");
        assert_eq!(form.draft.name, "");
        assert_eq!(form.handle_key(key(KeyCode::Enter)), FormAction::None);
        assert_eq!(form.handle_key(key(KeyCode::Esc)), FormAction::Cancel);
    }

    #[test]
    fn steppers_adjust_the_focused_field() {
        let mut form = GameForm::default();
        form.handle_key(key(KeyCode::Tab));
        assert_eq!(form.field, GameField::Complexity);
        form.handle_key(key(KeyCode::Right));
        form.handle_key(key(KeyCode::Right));
        assert_eq!(form.draft.complexity, Some(Complexity::Medium));
        form.handle_key(key(KeyCode::Left));
        form.handle_key(key(KeyCode::Left));
        form.handle_key(key(KeyCode::Left));
        assert_eq!(form.draft.complexity, Some(Complexity::Hard));

        form.handle_key(key(KeyCode::Tab));
        form.handle_key(key(KeyCode::Right));
        form.handle_key(key(KeyCode::Right));
        assert_eq!(form.draft.duration_minutes, 10);
        form.handle_key(key(KeyCode::Left));
        form.handle_key(key(KeyCode::Left));
        form.handle_key(key(KeyCode::Left));
        assert_eq!(form.draft.duration_minutes, 0);

        form.handle_key(key(KeyCode::Tab));
        form.handle_key(key(KeyCode::Char('+')));
        assert_eq!((form.draft.min_players, form.draft.max_players), (2, 2));

        form.handle_key(key(KeyCode::BackTab));
        form.handle_key(key(KeyCode::BackTab));
        form.handle_key(key(KeyCode::BackTab));
        form.handle_key(key(KeyCode::BackTab));
        assert_eq!(form.field, GameField::MaxAge);
    }

    #[test]
    fn session_needs_players_and_a_valid_date() {
        let today = NaiveDate::from_ymd_opt(2024, 11, 25).unwrap();
        let players = vec![
            Player {
                id: PlayerId(4),
                name: "Ana".into(),
            },
            Player {
                id: PlayerId(2),
                name: "Ben".into(),
            },
        ];
        let mut form = SessionForm::new(GameId(1), "Azul".into(), players, today);
        assert_eq!(form.parsed_date(), Some(today));
        assert_eq!(form.handle_key(key(KeyCode::Enter)), FormAction::None);

        form.handle_key(key(KeyCode::Down));
        form.handle_key(key(KeyCode::Char(' ')));
        form.handle_key(key(KeyCode::Up));
        form.handle_key(key(KeyCode::Char(' ')));
        assert_eq!(form.selected_players(), [PlayerId(4), PlayerId(2)]);

        form.handle_key(key(KeyCode::Tab));
        form.handle_key(key(KeyCode::Backspace));
        form.handle_key(key(KeyCode::Backspace));
        assert_eq!(form.parsed_date(), None);
        assert_eq!(form.handle_key(key(KeyCode::Enter)), FormAction::None);
        form.handle_key(key(KeyCode::Char('2')));
        form.handle_key(key(KeyCode::Char('4')));
        assert_eq!(form.parsed_date(), NaiveDate::from_ymd_opt(2024, 11, 24));
        assert_eq!(form.handle_key(key(KeyCode::Enter)), FormAction::Submit);
    }
}
