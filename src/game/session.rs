use std::time::{Duration, Instant};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use super::grid::{Grid, SerializedGrid};
use super::random::{spawn_value, RandomSource};
use super::resolver::{can_merge, resolve};
use super::tile::Tile;
use super::{Direction, GameError, GameEvent};
use crate::config::GameConfig;
use crate::storage::Storage;

// ============================================================================
// Types
// ============================================================================

/// At-rest form of a session; field names match existing saved games.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedState {
    pub grid: SerializedGrid,
    pub score: u32,
    pub over: bool,
    pub won: bool,
    pub keep_playing: bool,
}

impl SerializedState {
    pub fn is_terminated(&self) -> bool {
        self.over || (self.won && !self.keep_playing)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum GameStatus {
    Playing,
    /// Reached the win value and waiting for the player to keep going.
    Won,
    Over,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Input {
    Move(Direction),
    Restart,
    KeepPlaying,
}

/// Frame handed to actuators after every input.
#[derive(Clone, PartialEq, Debug)]
pub struct Snapshot {
    pub grid: Grid,
    pub score: u32,
    pub best_score: u32,
    pub over: bool,
    pub won: bool,
    pub terminated: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Outcome {
    Won,
    Over,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct ScoreReport {
    pub final_score: u32,
    pub outcome: Outcome,
}

// ============================================================================
// Observer Traits
// ============================================================================

/// Render sink.
pub trait Actuator {
    fn actuate(&mut self, snapshot: &Snapshot);
}

/// Receives final scores when a game is won or lost.
pub trait ScoreSubmitter {
    fn submit(&mut self, report: ScoreReport);
}

const DEDUP_WINDOW: Duration = Duration::from_secs(5);

/// Drops a report repeating the previous score within a short window.
pub struct DedupSubmitter<S> {
    inner: S,
    window: Duration,
    last: Option<(u32, Instant)>,
}

impl<S: ScoreSubmitter> DedupSubmitter<S> {
    pub fn new(inner: S) -> Self {
        Self::with_window(inner, DEDUP_WINDOW)
    }

    pub fn with_window(inner: S, window: Duration) -> Self {
        Self {
            inner,
            window,
            last: None,
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: ScoreSubmitter> ScoreSubmitter for DedupSubmitter<S> {
    fn submit(&mut self, report: ScoreReport) {
        let now = Instant::now();
        if let Some((score, at)) = self.last {
            if score == report.final_score && now.duration_since(at) < self.window {
                debug!("dropping repeated score report {}", score);
                return;
            }
        }
        self.last = Some((report.final_score, now));
        self.inner.submit(report);
    }
}

// ============================================================================
// Session
// ============================================================================

pub struct GameSession {
    config: GameConfig,
    grid: Grid,
    score: u32,
    best_score: u32,
    over: bool,
    won: bool,
    keep_playing: bool,
    storage: Box<dyn Storage>,
    random: Box<dyn RandomSource>,
    actuators: Vec<Box<dyn Actuator>>,
    submitters: Vec<Box<dyn ScoreSubmitter>>,
    events: Vec<GameEvent>,
}

impl GameSession {
    /// Resumes the stored game when there is a valid, unfinished one;
    /// otherwise starts a fresh board.
    pub fn new(
        config: GameConfig,
        storage: Box<dyn Storage>,
        random: Box<dyn RandomSource>,
    ) -> Result<Self, GameError> {
        config.validate()?;
        let mut session = Self::blank(config, storage, random);
        session.setup();
        Ok(session)
    }

    /// Starts from an explicit saved state, failing on anything inconsistent.
    pub fn restore(
        config: GameConfig,
        state: &SerializedState,
        storage: Box<dyn Storage>,
        random: Box<dyn RandomSource>,
    ) -> Result<Self, GameError> {
        config.validate()?;
        let mut session = Self::blank(config, storage, random);
        session.apply_state(state)?;
        Ok(session)
    }

    fn blank(config: GameConfig, mut storage: Box<dyn Storage>, random: Box<dyn RandomSource>) -> Self {
        let best_score = storage.load_best_score().unwrap_or_else(|err| {
            warn!("could not load best score: {}", err);
            0
        });
        Self {
            config,
            grid: Grid::empty(config.size),
            score: 0,
            best_score,
            over: false,
            won: false,
            keep_playing: false,
            storage,
            random,
            actuators: Vec::new(),
            submitters: Vec::new(),
            events: Vec::new(),
        }
    }

    fn setup(&mut self) {
        match self.storage.load_state() {
            Ok(Some(state)) if state.is_terminated() => {
                info!("stored game already finished, starting fresh");
                self.start_fresh();
            }
            Ok(Some(state)) => {
                if let Err(err) = self.apply_state(&state) {
                    warn!("discarding stored game: {}", err);
                    self.start_fresh();
                }
            }
            Ok(None) => self.start_fresh(),
            Err(err) => {
                warn!("could not load stored game: {}", err);
                self.start_fresh();
            }
        }
        self.persist();
    }

    fn apply_state(&mut self, state: &SerializedState) -> Result<(), GameError> {
        if state.grid.size != self.config.size {
            return Err(GameError::corrupt(format!(
                "saved board is {}x{}, expected {}x{}",
                state.grid.size, state.grid.size, self.config.size, self.config.size
            )));
        }
        self.grid = Grid::from_serialized(&state.grid)?;
        self.score = state.score;
        self.over = state.over;
        self.won = state.won;
        self.keep_playing = state.keep_playing;
        Ok(())
    }

    fn start_fresh(&mut self) {
        self.grid = Grid::empty(self.config.size);
        self.score = 0;
        self.over = false;
        self.won = false;
        self.keep_playing = false;
        for _ in 0..self.config.start_tiles {
            self.add_random_tile();
        }
    }

    /// Registers a render sink and immediately sends it the current frame.
    pub fn subscribe(&mut self, mut actuator: Box<dyn Actuator>) {
        actuator.actuate(&self.snapshot());
        self.actuators.push(actuator);
    }

    pub fn add_score_submitter(&mut self, submitter: Box<dyn ScoreSubmitter>) {
        self.submitters.push(submitter);
    }

    pub fn handle(&mut self, input: Input) {
        match input {
            Input::Move(direction) => {
                self.make_move(direction);
            }
            Input::Restart => self.restart(),
            Input::KeepPlaying => self.continue_playing(),
        }
    }

    /// Plays one move. Returns whether any tile moved; rejected and blocked
    /// moves leave the session untouched.
    pub fn make_move(&mut self, direction: Direction) -> bool {
        if self.is_game_terminated() {
            self.notify();
            return false;
        }

        let outcome = resolve(&self.grid, direction, self.config.win_value);
        debug!(
            "move {:?}: moved={} score_delta={}",
            direction, outcome.moved, outcome.score_delta
        );
        if !outcome.moved {
            self.notify();
            return false;
        }

        self.grid = outcome.grid;
        self.score = self.score.saturating_add(outcome.score_delta);
        self.events.push(GameEvent::Moved {
            direction,
            score_delta: outcome.score_delta,
        });
        let merged: Vec<u32> = self
            .grid
            .tiles()
            .filter(|tile| tile.is_merged())
            .map(|tile| tile.value)
            .collect();
        self.events.extend(merged.into_iter().map(GameEvent::Merged));

        let mut report = None;
        if outcome.reached_win && !self.won {
            self.won = true;
            info!("reached {} with score {}", self.config.win_value, self.score);
            self.events.push(GameEvent::Won(self.score));
            report = Some(Outcome::Won);
        }

        self.add_random_tile();

        if !self.moves_available() {
            self.over = true;
            info!("game over with score {}", self.score);
            self.events.push(GameEvent::GameOver(self.score));
            report = Some(Outcome::Over);
        }

        self.persist();
        if let Some(outcome) = report {
            self.report(outcome);
        }
        self.notify();
        true
    }

    /// Clears the stored game and deals a new board; best score is kept.
    pub fn restart(&mut self) {
        if let Err(err) = self.storage.clear_state() {
            warn!("could not clear stored game: {}", err);
        }
        self.start_fresh();
        info!("restarted");
        self.events.push(GameEvent::Restarted);
        self.persist();
        self.notify();
    }

    /// Dismisses the win banner so play can continue past the win value.
    pub fn continue_playing(&mut self) {
        if self.keep_playing {
            return;
        }
        self.keep_playing = true;
        self.events.push(GameEvent::ContinuedAfterWin);
        self.persist();
        self.notify();
    }

    pub fn is_game_terminated(&self) -> bool {
        self.over || (self.won && !self.keep_playing)
    }

    pub fn status(&self) -> GameStatus {
        if self.over {
            GameStatus::Over
        } else if self.won && !self.keep_playing {
            GameStatus::Won
        } else {
            GameStatus::Playing
        }
    }

    pub fn moves_available(&self) -> bool {
        self.grid.cells_available() || self.tile_matches_available()
    }

    /// True when any tile has an equal neighbour.
    pub fn tile_matches_available(&self) -> bool {
        self.grid.tiles().any(|tile| {
            Direction::ALL.iter().any(|direction| {
                self.grid
                    .cell_content(tile.position.offset(direction.vector()))
                    .is_some_and(|other| can_merge(tile, other))
            })
        })
    }

    /// Spawns one tile on an empty cell; a full grid is left alone.
    pub fn add_random_tile(&mut self) {
        if !self.grid.cells_available() {
            return;
        }
        let value = spawn_value(self.random.as_mut());
        if let Some(position) = self.grid.random_available_cell(self.random.as_mut()) {
            self.grid.insert_tile(Tile::new(position, value));
        }
    }

    pub fn serialize(&self) -> SerializedState {
        SerializedState {
            grid: self.grid.serialize(),
            score: self.score,
            over: self.over,
            won: self.won,
            keep_playing: self.keep_playing,
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            grid: self.grid.clone(),
            score: self.score,
            best_score: self.best_score,
            over: self.over,
            won: self.won,
            terminated: self.is_game_terminated(),
        }
    }

    /// Takes and clears all pending events
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn best_score(&self) -> u32 {
        self.best_score
    }

    pub fn over(&self) -> bool {
        self.over
    }

    pub fn won(&self) -> bool {
        self.won
    }

    pub fn keep_playing(&self) -> bool {
        self.keep_playing
    }

    /// Saves the running game, or on a finished one flushes the best score
    /// and drops the save. Storage failures never interrupt play.
    fn persist(&mut self) {
        if self.is_game_terminated() {
            if self.score > self.best_score {
                self.best_score = self.score;
                if let Err(err) = self.storage.save_best_score(self.score) {
                    warn!("could not save best score: {}", err);
                }
            }
            if let Err(err) = self.storage.clear_state() {
                warn!("could not clear stored game: {}", err);
            }
        } else if let Err(err) = self.storage.save_state(&self.serialize()) {
            warn!("could not save game: {}", err);
        }
    }

    fn report(&mut self, outcome: Outcome) {
        let report = ScoreReport {
            final_score: self.score,
            outcome,
        };
        for submitter in &mut self.submitters {
            submitter.submit(report);
        }
    }

    fn notify(&mut self) {
        if self.actuators.is_empty() {
            return;
        }
        let snapshot = self.snapshot();
        for actuator in &mut self.actuators {
            actuator.actuate(&snapshot);
        }
    }
}
