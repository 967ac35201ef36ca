use std::{
    cmp,
    collections::HashMap,
    io, thread,
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use chrono::Local;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use meeple_core::{
    export::{self, Clipboard},
    lookup::{Lookup, LookupEvent},
    models::{MAX_DURATION, MAX_STEPPER},
    CollectionSnapshot, CollectionStore, Complexity, ExportError, Game, GameId, Player, PlayerId,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Tabs, Wrap},
    Frame, Terminal,
};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::forms::{
    FormAction, GameField, GameForm, SearchState, SessionFocus, SessionForm, TextInput,
    DATE_FORMAT,
};

const TICK_RATE: Duration = Duration::from_millis(250);

const ACCENT: Color = Color::Cyan;
const MUTED: Color = Color::DarkGray;
const FAVORITE: Color = Color::Yellow;
const SUCCESS: Color = Color::Green;

enum AppEvent {
    Input(Event),
    Tick,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tab {
    Games,
    Players,
    Data,
}

impl Tab {
    const ALL: [Tab; 3] = [Tab::Games, Tab::Players, Tab::Data];

    fn title(self) -> &'static str {
        match self {
            Tab::Games => "Games",
            Tab::Players => "Players",
            Tab::Data => "Data",
        }
    }

    fn index(self) -> usize {
        Tab::ALL.iter().position(|tab| *tab == self).unwrap_or(0)
    }

    fn next(self, delta: isize) -> Self {
        let count = Tab::ALL.len() as isize;
        Tab::ALL[(self.index() as isize + delta).rem_euclid(count) as usize]
    }
}

enum Modal {
    AddGame(Box<GameForm>),
    AddSession(SessionForm),
    AddPlayer(TextInput),
}

struct DetailView {
    game: GameId,
    cursor: usize,
    /// Thumbnail dimensions, when the game has a cover.
    thumbnail: Option<(u32, u32)>,
}

struct SystemClipboard(arboard::Clipboard);

impl Clipboard for SystemClipboard {
    fn set_text(&mut self, text: String) -> Result<(), ExportError> {
        self.0
            .set_text(text)
            .map_err(|err| ExportError::Clipboard(err.to_string()))
    }
}

/// Terminal front end for the collection.
pub struct MeepleApp {
    store: CollectionStore,
    lookup: Lookup,
    lookup_rx: Option<mpsc::Receiver<LookupEvent>>,
    clipboard: Option<SystemClipboard>,
    banner_duration: Duration,
    snapshot: CollectionSnapshot,
    players: Vec<Player>,
    state: UiState,
    detail: Option<DetailView>,
    modal: Option<Modal>,
}

impl MeepleApp {
    pub fn new(store: CollectionStore, lookup: Lookup, banner_duration: Duration) -> Self {
        Self {
            store,
            lookup,
            lookup_rx: None,
            clipboard: None,
            banner_duration,
            snapshot: CollectionSnapshot::default(),
            players: Vec::new(),
            state: UiState::default(),
            detail: None,
            modal: None,
        }
    }

    pub fn attach_lookup(&mut self, receiver: mpsc::Receiver<LookupEvent>) {
        self.lookup_rx = Some(receiver);
    }

    pub async fn run(&mut self) -> Result<()> {
        self.reload();
        self.state.set_status(format!(
            "Loaded {} games and {} players",
            self.snapshot.games.len(),
            self.players.len()
        ));

        let mut stdout = io::stdout();
        enable_raw_mode().context("failed to enter raw mode")?;
        execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).context("failed to create terminal")?;
        terminal.hide_cursor()?;
        terminal.clear()?;

        let (event_tx, mut event_rx) = mpsc::channel::<AppEvent>(128);
        spawn_input_thread(event_tx);

        let mut lookup_rx = self.lookup_rx.take();

        loop {
            terminal.draw(|frame| self.draw(frame))?;
            if self.state.should_quit {
                break;
            }

            if let Some(rx) = lookup_rx.as_mut() {
                let mut lookup_closed = false;
                tokio::select! {
                    maybe_event = event_rx.recv() => {
                        if !self.process_app_event(maybe_event) {
                            break;
                        }
                    }
                    maybe_lookup = rx.recv() => {
                        match maybe_lookup {
                            Some(event) => self.handle_lookup_event(event),
                            None => lookup_closed = true,
                        }
                    }
                }
                if lookup_closed {
                    lookup_rx = None;
                }
            } else {
                let maybe_event = event_rx.recv().await;
                if !self.process_app_event(maybe_event) {
                    break;
                }
            }
        }

        restore_terminal(&mut terminal)?;
        info!("Terminal restored");
        Ok(())
    }

    fn reload(&mut self) {
        self.snapshot = self.store.snapshot();
        self.players = self.store.players();
        self.state.game_cursor = clamp_index(self.state.game_cursor, self.snapshot.games.len());
        self.state.player_cursor = clamp_index(self.state.player_cursor, self.players.len());
        if let Some(detail) = self.detail.as_mut() {
            let sessions = self
                .snapshot
                .games
                .iter()
                .find(|game| game.id == detail.game)
                .map_or(0, Game::session_count);
            detail.cursor = clamp_index(detail.cursor, sessions);
        }
        debug!(
            games = self.snapshot.games.len(),
            players = self.players.len(),
            "Collection reloaded"
        );
    }

    fn process_app_event(&mut self, maybe_event: Option<AppEvent>) -> bool {
        match maybe_event {
            Some(AppEvent::Input(event)) => {
                if let Err(err) = self.handle_input(event) {
                    error!(?err, "Input handling failed");
                    self.state.set_status(format!("Error: {err}"));
                }
                true
            }
            Some(AppEvent::Tick) => {
                self.handle_tick();
                true
            }
            None => false,
        }
    }

    fn handle_tick(&mut self) {
        if self
            .state
            .export_banner_until
            .is_some_and(|until| Instant::now() >= until)
        {
            self.state.export_banner_until = None;
        }
    }

    fn handle_lookup_event(&mut self, event: LookupEvent) {
        let Some(Modal::AddGame(form)) = self.modal.as_mut() else {
            debug!(ticket = ?event.ticket(), "Lookup event without an open form");
            return;
        };
        if let Some(status) = form.apply_lookup(event) {
            self.state.set_status(status);
        }
    }

    fn handle_input(&mut self, event: Event) -> Result<()> {
        let Event::Key(key) = event else {
            return Ok(());
        };
        if key.kind != KeyEventKind::Press {
            return Ok(());
        }
        if key.modifiers == KeyModifiers::CONTROL && key.code == KeyCode::Char('c') {
            self.state.should_quit = true;
            return Ok(());
        }

        if self.modal.is_some() {
            return self.handle_modal_key(key);
        }
        if self.detail.is_some() {
            return self.handle_detail_key(key);
        }

        match key.code {
            KeyCode::Char('q') => {
                self.state.should_quit = true;
                return Ok(());
            }
            KeyCode::Tab => {
                self.state.tab = self.state.tab.next(1);
                return Ok(());
            }
            KeyCode::BackTab => {
                self.state.tab = self.state.tab.next(-1);
                return Ok(());
            }
            _ => {}
        }

        match self.state.tab {
            Tab::Games => self.handle_games_key(key),
            Tab::Players => self.handle_players_key(key),
            Tab::Data => self.handle_data_key(key),
        }
    }

    fn handle_games_key(&mut self, key: KeyEvent) -> Result<()> {
        let total = self.snapshot.games.len();
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.state.game_cursor = self.state.game_cursor.saturating_sub(1)
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.state.game_cursor = clamp_index(self.state.game_cursor + 1, total)
            }
            KeyCode::Enter => {
                if let Some(game) = self.current_game().map(|game| game.id) {
                    self.open_detail(game);
                }
            }
            KeyCode::Char('f') => {
                if let Some(game) = self.current_game().map(|game| game.id) {
                    self.toggle_favorite(game)?;
                }
            }
            KeyCode::Char('r') => self.open_random(None),
            KeyCode::Char(digit @ '1'..='3') => {
                let index = digit as usize - '1' as usize;
                self.open_random(Complexity::ALL.get(index).copied());
            }
            KeyCode::Char('a') => {
                self.modal = Some(Modal::AddGame(Box::default()));
                self.state
                    .set_status("Ctrl-S searches BoardGameGeek, Enter saves".to_string());
            }
            KeyCode::Char('d') => {
                if let Some(game) = self.current_game().map(|game| game.id) {
                    let deleted = self.store.delete_game(game)?;
                    info!(game = %deleted.id, name = %deleted.name, "Game deleted");
                    self.state.set_status(format!(
                        "Deleted {} and {} session(s)",
                        deleted.name,
                        deleted.session_count()
                    ));
                    self.reload();
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_detail_key(&mut self, key: KeyEvent) -> Result<()> {
        let Some(detail) = self.detail.as_mut() else {
            return Ok(());
        };
        let game_id = detail.game;
        let sessions = self.store.sessions_for_game(game_id);
        match key.code {
            KeyCode::Esc | KeyCode::Backspace | KeyCode::Char('q') => self.detail = None,
            KeyCode::Up | KeyCode::Char('k') => detail.cursor = detail.cursor.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => {
                detail.cursor = clamp_index(detail.cursor + 1, sessions.len())
            }
            KeyCode::Char('f') => self.toggle_favorite(game_id)?,
            KeyCode::Char('n') => {
                if self.players.is_empty() {
                    self.state
                        .set_status("Add a player on the Players tab first".to_string());
                    return Ok(());
                }
                let name = self
                    .store
                    .game(game_id)
                    .map(|game| game.name)
                    .unwrap_or_default();
                let today = Local::now().date_naive();
                self.modal = Some(Modal::AddSession(SessionForm::new(
                    game_id,
                    name,
                    self.players.clone(),
                    today,
                )));
            }
            KeyCode::Char('x') => {
                if let Some(session) = sessions.get(detail.cursor) {
                    let removed = self.store.delete_session(session.id)?;
                    info!(session = %removed.id, game = %removed.game, "Session deleted");
                    self.state
                        .set_status(format!("Deleted session of {}", removed.date));
                    self.reload();
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_players_key(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.state.player_cursor = self.state.player_cursor.saturating_sub(1)
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.state.player_cursor =
                    clamp_index(self.state.player_cursor + 1, self.players.len())
            }
            KeyCode::Char('a') => self.modal = Some(Modal::AddPlayer(TextInput::default())),
            KeyCode::Char('d') => {
                let Some(player) = self.players.get(self.state.player_cursor) else {
                    return Ok(());
                };
                match self.store.delete_player(player.id) {
                    Ok(player) => {
                        info!(player = %player.id, "Player deleted");
                        self.state.set_status(format!("Deleted {}", player.name));
                        self.reload();
                    }
                    Err(err) => {
                        warn!(error = %err, "Player deletion refused");
                        self.state.set_status(err.to_string());
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_data_key(&mut self, key: KeyEvent) -> Result<()> {
        if matches!(key.code, KeyCode::Enter | KeyCode::Char('e')) {
            self.export();
        }
        Ok(())
    }

    fn handle_modal_key(&mut self, key: KeyEvent) -> Result<()> {
        let Some(mut modal) = self.modal.take() else {
            return Ok(());
        };
        let keep = match &mut modal {
            Modal::AddGame(form) => self.handle_game_form(form, key),
            Modal::AddSession(form) => self.handle_session_form(form, key),
            Modal::AddPlayer(input) => self.handle_player_input(input, key),
        };
        if keep {
            self.modal = Some(modal);
        }
        Ok(())
    }

    /// Returns whether the form stays open.
    fn handle_game_form(&mut self, form: &mut GameForm, key: KeyEvent) -> bool {
        match form.handle_key(key) {
            FormAction::None => true,
            FormAction::Cancel => {
                self.state.set_status("Add game cancelled".to_string());
                false
            }
            FormAction::Search(name) => {
                info!(query = %name, "Searching BoardGameGeek");
                self.state.set_status(format!("Searching for {name}…"));
                form.begin_search(self.lookup.search(name));
                true
            }
            FormAction::Pick(id) => {
                info!(id, "Fetching item details");
                self.state.set_status("Fetching details…".to_string());
                form.begin_details(self.lookup.details(id));
                true
            }
            FormAction::Submit => {
                let result = form
                    .draft
                    .to_new_game()
                    .and_then(|new_game| self.store.insert_game(new_game));
                match result {
                    Ok(game) => {
                        info!(game = %game.id, name = %game.name, "Game added");
                        self.state.set_status(format!("Added {}", game.name));
                        self.reload();
                        if let Some(index) =
                            self.snapshot.games.iter().position(|g| g.id == game.id)
                        {
                            self.state.game_cursor = index;
                        }
                        false
                    }
                    Err(err) => {
                        self.state.set_status(err.to_string());
                        true
                    }
                }
            }
        }
    }

    fn handle_session_form(&mut self, form: &mut SessionForm, key: KeyEvent) -> bool {
        match form.handle_key(key) {
            FormAction::Cancel => false,
            FormAction::Submit => {
                let Some(date) = form.parsed_date() else {
                    return true;
                };
                match self
                    .store
                    .add_session(form.game, date, &form.selected_players())
                {
                    Ok(session) => {
                        info!(session = %session.id, game = %session.game, "Session added");
                        self.state.set_status(format!(
                            "Recorded {} with {} player(s)",
                            session.date,
                            session.players.len()
                        ));
                        self.reload();
                        false
                    }
                    Err(err) => {
                        self.state.set_status(err.to_string());
                        true
                    }
                }
            }
            _ => true,
        }
    }

    fn handle_player_input(&mut self, input: &mut TextInput, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Esc => false,
            KeyCode::Enter => match self.store.insert_player(&input.value) {
                Ok(player) => {
                    info!(player = %player.id, "Player added");
                    self.state.set_status(format!("Added {}", player.name));
                    self.reload();
                    if let Some(index) = self.players.iter().position(|p| p.id == player.id) {
                        self.state.player_cursor = index;
                    }
                    false
                }
                Err(err) => {
                    self.state.set_status(err.to_string());
                    true
                }
            },
            _ => {
                input.handle_key(&key);
                true
            }
        }
    }

    fn current_game(&self) -> Option<&Game> {
        self.snapshot.games.get(self.state.game_cursor)
    }

    fn open_detail(&mut self, game: GameId) {
        let thumbnail = match self.store.thumbnail(game) {
            Ok(thumbnail) => thumbnail.map(|thumb| (thumb.width, thumb.height)),
            Err(err) => {
                warn!(%game, error = %err, "Thumbnail unavailable");
                None
            }
        };
        self.detail = Some(DetailView {
            game,
            cursor: 0,
            thumbnail,
        });
    }

    fn open_random(&mut self, complexity: Option<Complexity>) {
        match self.store.random_game(complexity, &mut rand::rng()) {
            Some(game) => {
                info!(game = %game.id, ?complexity, "Random game picked");
                if let Some(index) = self.snapshot.games.iter().position(|g| g.id == game.id) {
                    self.state.game_cursor = index;
                }
                self.state.set_status(format!("How about {}?", game.name));
                self.open_detail(game.id);
            }
            None => self.state.set_status("No matching games".to_string()),
        }
    }

    fn toggle_favorite(&mut self, game: GameId) -> Result<()> {
        let favorite = self.store.toggle_favorite(game)?;
        self.state.set_status(if favorite {
            "Marked as favorite".to_string()
        } else {
            "Removed from favorites".to_string()
        });
        self.reload();
        Ok(())
    }

    fn export(&mut self) {
        if self.clipboard.is_none() {
            match arboard::Clipboard::new() {
                Ok(clipboard) => self.clipboard = Some(SystemClipboard(clipboard)),
                Err(err) => {
                    warn!(error = %err, "Clipboard unavailable");
                    self.state.set_status(format!("Clipboard unavailable: {err}"));
                    return;
                }
            }
        }
        let Some(clipboard) = self.clipboard.as_mut() else {
            return;
        };

        let today = Local::now().date_naive();
        match export::to_clipboard(&self.store.snapshot(), today, clipboard) {
            Ok(count) => {
                self.state.export_banner_until = Some(Instant::now() + self.banner_duration);
                self.state.set_status(format!("Exported {count} game(s)"));
            }
            Err(err) => {
                error!(error = %err, "Export failed");
                self.state.set_status(format!("Export failed: {err}"));
            }
        }
    }

    fn draw(&mut self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(5),
                Constraint::Length(3),
            ])
            .split(frame.size());

        self.render_tabs(frame, chunks[0]);
        if let Some(detail) = &self.detail {
            self.render_detail(frame, chunks[1], detail);
        } else {
            match self.state.tab {
                Tab::Games => self.render_games(frame, chunks[1]),
                Tab::Players => self.render_players(frame, chunks[1]),
                Tab::Data => self.render_data(frame, chunks[1]),
            }
        }
        self.render_status(frame, chunks[2]);

        match &self.modal {
            Some(Modal::AddGame(form)) => self.render_game_form(frame, form),
            Some(Modal::AddSession(form)) => self.render_session_form(frame, form),
            Some(Modal::AddPlayer(input)) => self.render_player_input(frame, input),
            None => {}
        }
    }

    fn render_tabs(&self, frame: &mut Frame, area: Rect) {
        let titles: Vec<Line> = Tab::ALL.iter().map(|tab| Line::from(tab.title())).collect();
        let tabs = Tabs::new(titles)
            .block(Block::default().borders(Borders::ALL).title("Meeple"))
            .select(self.state.tab.index())
            .highlight_style(Style::default().fg(ACCENT).add_modifier(Modifier::BOLD));
        frame.render_widget(tabs, area);
    }

    fn render_games(&self, frame: &mut Frame, area: Rect) {
        let items: Vec<ListItem> = self
            .snapshot
            .games
            .iter()
            .map(|game| {
                let star = if game.is_favorite {
                    Span::styled("★ ", Style::default().fg(FAVORITE))
                } else {
                    Span::raw("  ")
                };
                ListItem::new(vec![
                    Line::from(vec![
                        star,
                        Span::styled(
                            game.name.clone(),
                            Style::default().add_modifier(Modifier::BOLD),
                        ),
                        Span::styled(
                            format!("  {} players", game.player_count),
                            Style::default().fg(MUTED),
                        ),
                    ]),
                    Line::from(Span::styled(
                        format!("  {}", game.summary()),
                        Style::default().fg(MUTED),
                    )),
                ])
            })
            .collect();

        let mut list_state = ListState::default();
        if !items.is_empty() {
            list_state.select(Some(self.state.game_cursor));
        }
        let list = List::new(items)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title("Games  [a]dd [f]avorite [r]andom [1-3] by complexity [d]elete"),
            )
            .highlight_style(Style::default().bg(MUTED))
            .highlight_symbol("▶ ");
        frame.render_stateful_widget(list, area, &mut list_state);
    }

    fn render_detail(&self, frame: &mut Frame, area: Rect, detail: &DetailView) {
        let Some(game) = self.snapshot.games.iter().find(|game| game.id == detail.game) else {
            frame.render_widget(Paragraph::new("Game no longer exists"), area);
            return;
        };

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(9), Constraint::Min(3)])
            .split(area);

        let label = |name: &str, value: String| {
            Line::from(vec![
                Span::styled(format!("{name:<12}"), Style::default().fg(MUTED)),
                Span::raw(value),
            ])
        };
        let cover = match detail.thumbnail {
            Some((width, height)) => format!("thumbnail {width}x{height}"),
            None => "none".to_string(),
        };
        let mut title = game.name.clone();
        if game.is_favorite {
            title.push_str(" ★");
        }
        let info = Paragraph::new(vec![
            label("Age", game.age_range.to_string()),
            label("Players", game.player_count.to_string()),
            label("Duration", format!("{} minutes", game.duration_minutes)),
            label("Complexity", game.complexity.name().to_string()),
            label("Sessions", game.session_count().to_string()),
            label("Cover", cover),
            Line::from(Span::styled(
                "[n]ew session  [x] delete session  [f]avorite  Esc back",
                Style::default().fg(ACCENT),
            )),
        ])
        .block(Block::default().borders(Borders::ALL).title(title));
        frame.render_widget(info, chunks[0]);

        let items: Vec<ListItem> = self
            .snapshot
            .sessions_of(game)
            .map(|session| {
                ListItem::new(Line::from(vec![
                    Span::raw(session.date.format(DATE_FORMAT).to_string()),
                    Span::styled(
                        format!("  {}", self.snapshot.player_names(session).join(", ")),
                        Style::default().fg(MUTED),
                    ),
                ]))
            })
            .collect();
        let mut list_state = ListState::default();
        if !items.is_empty() {
            list_state.select(Some(detail.cursor));
        }
        let list = List::new(items)
            .block(Block::default().borders(Borders::ALL).title("Sessions"))
            .highlight_style(Style::default().bg(MUTED));
        frame.render_stateful_widget(list, chunks[1], &mut list_state);
    }

    fn render_players(&self, frame: &mut Frame, area: Rect) {
        let counts: HashMap<PlayerId, usize> =
            self.snapshot
                .sessions
                .values()
                .fold(HashMap::new(), |mut counts, session| {
                    for player in &session.players {
                        *counts.entry(*player).or_default() += 1;
                    }
                    counts
                });
        let items: Vec<ListItem> = self
            .players
            .iter()
            .map(|player| {
                let played = counts.get(&player.id).copied().unwrap_or(0);
                ListItem::new(Line::from(vec![
                    Span::raw(player.name.clone()),
                    Span::styled(format!("  {played} session(s)"), Style::default().fg(MUTED)),
                ]))
            })
            .collect();
        let mut list_state = ListState::default();
        if !items.is_empty() {
            list_state.select(Some(self.state.player_cursor));
        }
        let list = List::new(items)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title("Players  [a]dd [d]elete"),
            )
            .highlight_style(Style::default().bg(MUTED))
            .highlight_symbol("▶ ");
        frame.render_stateful_widget(list, area, &mut list_state);
    }

    fn render_data(&self, frame: &mut Frame, area: Rect) {
        let mut lines = vec![
            Line::from("Press Enter to copy the collection to the clipboard as JSON."),
            Line::from(""),
        ];
        if self.state.export_banner_until.is_some() {
            lines.push(Line::from(Span::styled(
                " Copied to clipboard ",
                Style::default()
                    .fg(Color::Black)
                    .bg(SUCCESS)
                    .add_modifier(Modifier::BOLD),
            )));
        }
        let paragraph = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title("Export Data"))
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn render_status(&self, frame: &mut Frame, area: Rect) {
        let paragraph = Paragraph::new(Line::from(self.state.status.clone()))
            .block(Block::default().borders(Borders::ALL).title("Status"))
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn render_game_form(&self, frame: &mut Frame, form: &GameForm) {
        let area = centered(frame.size(), 64, 18);
        frame.render_widget(Clear, area);

        if let SearchState::Results { hits, cursor } = &form.search {
            let items: Vec<ListItem> = hits.iter().map(|hit| ListItem::new(hit.label())).collect();
            let mut list_state = ListState::default();
            list_state.select(Some(*cursor));
            let list = List::new(items)
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .title("Search results  Enter pick, Esc back"),
                )
                .highlight_style(Style::default().bg(MUTED))
                .highlight_symbol("▶ ");
            frame.render_stateful_widget(list, area, &mut list_state);
            return;
        }

        let draft = &form.draft;
        let enabled = |on: bool| if on { "yes" } else { "no" };
        let lines: Vec<Line> = GameField::ALL
            .iter()
            .map(|field| {
                let value = match field {
                    GameField::Name => form.name.value.clone(),
                    GameField::Complexity => draft
                        .complexity
                        .map_or("choose…".to_string(), |c| c.name().to_string()),
                    GameField::Duration => {
                        format!("{} min (max {MAX_DURATION})", draft.duration_minutes)
                    }
                    GameField::MinPlayers => draft.min_players.to_string(),
                    GameField::HasMaxPlayers => enabled(draft.has_max_players).to_string(),
                    GameField::MaxPlayers => format!("{} (max {MAX_STEPPER})", draft.max_players),
                    GameField::MinAge => draft.min_age.to_string(),
                    GameField::HasMaxAge => enabled(draft.has_max_age).to_string(),
                    GameField::MaxAge => draft.max_age.to_string(),
                };
                let style = if *field == form.field {
                    Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                };
                Line::from(vec![
                    Span::styled(format!("{:<16}", field.label()), style),
                    Span::raw(value),
                ])
            })
            .chain([
                Line::from(format!(
                    "Cover           {}",
                    if draft.cover.is_some() { "downloaded" } else { "none" }
                )),
                Line::from(""),
                Line::from(Span::styled(
                    if form.loading_details {
                        "Fetching details…"
                    } else if form.is_searching() {
                        "Searching…  Esc stops"
                    } else if draft.is_complete() {
                        "Tab/↑↓ field  ←→ change  Ctrl-S search  Enter save  Esc cancel"
                    } else {
                        "Name and complexity are required  Ctrl-S search  Esc cancel"
                    },
                    Style::default().fg(MUTED),
                )),
            ])
            .collect();

        let paragraph = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title("Add Game"))
            .wrap(Wrap { trim: false });
        frame.render_widget(paragraph, area);

        if form.field == GameField::Name && !form.loading_details {
            let x = (area.x + 17 + form.name.cursor as u16).min(area.right().saturating_sub(2));
            frame.set_cursor(x, area.y + 1);
        }
    }

    fn render_session_form(&self, frame: &mut Frame, form: &SessionForm) {
        let area = centered(frame.size(), 50, 16);
        frame.render_widget(Clear, area);
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(3), Constraint::Length(1)])
            .split(area);

        let date_style = if form.focus == SessionFocus::Date {
            Style::default().fg(ACCENT)
        } else {
            Style::default()
        };
        let date = Paragraph::new(Line::from(form.date.value.clone())).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(date_style)
                .title(format!("New Session - {}", form.game_name)),
        );
        frame.render_widget(date, chunks[0]);

        let items: Vec<ListItem> = form
            .players
            .iter()
            .map(|player| {
                let mark = if form.selected.contains(&player.id) { "[x] " } else { "[ ] " };
                ListItem::new(format!("{mark}{}", player.name))
            })
            .collect();
        let mut list_state = ListState::default();
        if form.focus == SessionFocus::Players && !items.is_empty() {
            list_state.select(Some(form.cursor));
        }
        let list = List::new(items)
            .block(Block::default().borders(Borders::ALL).title("Players"))
            .highlight_style(Style::default().bg(MUTED));
        frame.render_stateful_widget(list, chunks[1], &mut list_state);

        let help = Paragraph::new(Span::styled(
            "Tab focus  Space select  Enter save  Esc cancel",
            Style::default().fg(MUTED),
        ))
        .alignment(Alignment::Center);
        frame.render_widget(help, chunks[2]);

        if form.focus == SessionFocus::Date {
            frame.set_cursor(chunks[0].x + 1 + form.date.cursor as u16, chunks[0].y + 1);
        }
    }

    fn render_player_input(&self, frame: &mut Frame, input: &TextInput) {
        let area = centered(frame.size(), 40, 5);
        frame.render_widget(Clear, area);
        let paragraph = Paragraph::new(vec![
            Line::from(vec![
                Span::styled("> ", Style::default().fg(ACCENT)),
                Span::raw(input.value.clone()),
            ]),
            Line::from(Span::styled("Enter add  Esc cancel", Style::default().fg(MUTED))),
        ])
        .block(Block::default().borders(Borders::ALL).title("Add Player"));
        frame.render_widget(paragraph, area);
        let x = (area.x + 3 + input.cursor as u16).min(area.right().saturating_sub(2));
        frame.set_cursor(x, area.y + 1);
    }
}

fn clamp_index(index: usize, len: usize) -> usize {
    index.min(len.saturating_sub(1))
}

fn centered(outer: Rect, width: u16, height: u16) -> Rect {
    let width = cmp::min(width, outer.width.saturating_sub(2));
    let height = cmp::min(height, outer.height.saturating_sub(2));
    let x = outer.x + outer.width.saturating_sub(width) / 2;
    let y = outer.y + outer.height.saturating_sub(height) / 2;
    Rect::new(x, y, width, height)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor()?;
    Ok(())
}

fn spawn_input_thread(sender: mpsc::Sender<AppEvent>) {
    thread::spawn(move || loop {
        match event::poll(TICK_RATE) {
            Ok(true) => match event::read() {
                Ok(evt) => {
                    if sender.blocking_send(AppEvent::Input(evt)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            },
            Ok(false) => {
                if sender.blocking_send(AppEvent::Tick).is_err() {
                    break;
                }
            }
            Err(_) => break,
        }
    });
}

struct UiState {
    tab: Tab,
    game_cursor: usize,
    player_cursor: usize,
    status: String,
    should_quit: bool,
    export_banner_until: Option<Instant>,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            tab: Tab::Games,
            game_cursor: 0,
            player_cursor: 0,
            status: "Ready".to_string(),
            should_quit: false,
            export_banner_until: None,
        }
    }
}

impl UiState {
    fn set_status(&mut self, message: String) {
        self.status = message;
    }
}
