//! Persistence adapters for saved games, the best score and the local
//! leaderboard.
//!
//! Adapters report failures as [`StorageError`]; the game session logs and
//! swallows them so play never stops on a storage problem.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use log::warn;
use serde::{Deserialize, Serialize};

use crate::game::{Outcome, ScoreReport, ScoreSubmitter, SerializedState};

pub const GAME_STATE_KEY: &str = "gameState";
pub const BEST_SCORE_KEY: &str = "bestScore";

const GAME_STATE_FILE: &str = "game_state.json";
const BEST_SCORE_FILE: &str = "best_score.txt";
pub const LEADERBOARD_FILE: &str = "scores.json";
pub const LEADERBOARD_LEN: usize = 10;

#[derive(thiserror::Error, Debug)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("storage unavailable")]
    Unavailable,
}

// ============================================================================
// Storage Trait
// ============================================================================

pub trait Storage {
    fn load_state(&mut self) -> Result<Option<SerializedState>, StorageError>;
    fn save_state(&mut self, state: &SerializedState) -> Result<(), StorageError>;
    fn clear_state(&mut self) -> Result<(), StorageError>;
    fn load_best_score(&mut self) -> Result<u32, StorageError>;
    fn save_best_score(&mut self, score: u32) -> Result<(), StorageError>;
}

// ============================================================================
// In-memory Storage
// ============================================================================

/// Key/value store kept in memory, holding the same JSON strings a file or
/// browser store would. Clones share the same data, so a test can keep a
/// handle after giving one to a session.
#[derive(Clone, Default, Debug)]
pub struct MemoryStorage {
    data: Rc<RefCell<HashMap<String, String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.data.borrow().get(key).cloned()
    }

    pub fn set(&self, key: &str, value: impl Into<String>) {
        self.data.borrow_mut().insert(key.to_string(), value.into());
    }

    pub fn remove(&self, key: &str) {
        self.data.borrow_mut().remove(key);
    }

    /// Stored game decoded, if present and readable.
    pub fn state(&self) -> Option<SerializedState> {
        self.get(GAME_STATE_KEY)
            .and_then(|json| serde_json::from_str(&json).ok())
    }

    pub fn best_score(&self) -> u32 {
        parse_best_score(self.get(BEST_SCORE_KEY).as_deref())
    }
}

impl Storage for MemoryStorage {
    fn load_state(&mut self) -> Result<Option<SerializedState>, StorageError> {
        match self.get(GAME_STATE_KEY) {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn save_state(&mut self, state: &SerializedState) -> Result<(), StorageError> {
        self.set(GAME_STATE_KEY, serde_json::to_string(state)?);
        Ok(())
    }

    fn clear_state(&mut self) -> Result<(), StorageError> {
        self.remove(GAME_STATE_KEY);
        Ok(())
    }

    fn load_best_score(&mut self) -> Result<u32, StorageError> {
        Ok(self.best_score())
    }

    fn save_best_score(&mut self, score: u32) -> Result<(), StorageError> {
        self.set(BEST_SCORE_KEY, score.to_string());
        Ok(())
    }
}

// ============================================================================
// File Storage
// ============================================================================

/// Saves into a directory: the game as JSON, the best score as plain text.
#[derive(Clone, Debug)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn state_path(&self) -> PathBuf {
        self.dir.join(GAME_STATE_FILE)
    }

    fn best_score_path(&self) -> PathBuf {
        self.dir.join(BEST_SCORE_FILE)
    }
}

impl Storage for FileStorage {
    fn load_state(&mut self) -> Result<Option<SerializedState>, StorageError> {
        match fs::read_to_string(self.state_path()) {
            Ok(json) => Ok(Some(serde_json::from_str(&json)?)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn save_state(&mut self, state: &SerializedState) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.state_path(), serde_json::to_string(state)?)?;
        Ok(())
    }

    fn clear_state(&mut self) -> Result<(), StorageError> {
        match fs::remove_file(self.state_path()) {
            Err(err) if err.kind() != io::ErrorKind::NotFound => Err(err.into()),
            _ => Ok(()),
        }
    }

    fn load_best_score(&mut self) -> Result<u32, StorageError> {
        match fs::read_to_string(self.best_score_path()) {
            Ok(text) => Ok(parse_best_score(Some(&text))),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(0),
            Err(err) => Err(err.into()),
        }
    }

    fn save_best_score(&mut self, score: u32) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.best_score_path(), score.to_string())?;
        Ok(())
    }
}

/// Unreadable best scores count as zero.
fn parse_best_score(text: Option<&str>) -> u32 {
    text.and_then(|s| s.trim().parse().ok()).unwrap_or(0)
}

// ============================================================================
// Leaderboard
// ============================================================================

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub score: u32,
    pub won: bool,
    /// Seconds since the Unix epoch.
    pub recorded_at: u64,
}

/// Top scores kept in a JSON file, highest first.
#[derive(Clone, Debug)]
pub struct Leaderboard {
    path: PathBuf,
}

impl Leaderboard {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(LEADERBOARD_FILE))
    }

    pub fn entries(&self) -> Result<Vec<LeaderboardEntry>, StorageError> {
        match fs::read_to_string(&self.path) {
            Ok(json) => Ok(serde_json::from_str(&json)?),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(err) => Err(err.into()),
        }
    }

    /// Inserts an entry and keeps only the best [`LEADERBOARD_LEN`].
    pub fn record(&self, entry: LeaderboardEntry) -> Result<Vec<LeaderboardEntry>, StorageError> {
        let mut entries = self.entries()?;
        entries.push(entry);
        entries.sort_by(|a, b| b.score.cmp(&a.score).then(a.recorded_at.cmp(&b.recorded_at)));
        entries.truncate(LEADERBOARD_LEN);

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(&entries)?)?;
        Ok(entries)
    }
}

impl ScoreSubmitter for Leaderboard {
    fn submit(&mut self, report: ScoreReport) {
        let recorded_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let entry = LeaderboardEntry {
            score: report.final_score,
            won: report.outcome == Outcome::Won,
            recorded_at,
        };
        if let Err(err) = self.record(entry) {
            warn!("could not record score {}: {}", report.final_score, err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::Grid;

    fn sample_state() -> SerializedState {
        SerializedState {
            grid: Grid::empty(4).serialize(),
            score: 12,
            over: false,
            won: false,
            keep_playing: false,
        }
    }

    #[test]
    fn memory_clones_share_data() {
        let handle = MemoryStorage::new();
        let mut storage = handle.clone();

        storage.save_state(&sample_state()).unwrap();
        storage.save_best_score(40).unwrap();

        assert_eq!(handle.state(), Some(sample_state()));
        assert_eq!(handle.best_score(), 40);

        storage.clear_state().unwrap();
        assert_eq!(handle.get(GAME_STATE_KEY), None);
        assert_eq!(handle.best_score(), 40);
    }

    #[test]
    fn memory_reports_unreadable_state() {
        let mut storage = MemoryStorage::new();
        storage.set(GAME_STATE_KEY, "{not json");
        assert!(matches!(storage.load_state(), Err(StorageError::Json(_))));
    }

    #[test]
    fn unreadable_best_score_is_zero() {
        let mut storage = MemoryStorage::new();
        storage.set(BEST_SCORE_KEY, "lots");
        assert_eq!(storage.load_best_score().unwrap(), 0);
        storage.set(BEST_SCORE_KEY, " 96\n");
        assert_eq!(storage.load_best_score().unwrap(), 96);
    }

    #[test]
    fn saved_state_uses_camel_case_fields() {
        let mut storage = MemoryStorage::new();
        storage.save_state(&sample_state()).unwrap();
        let json = storage.get(GAME_STATE_KEY).unwrap();
        assert!(json.contains("\"keepPlaying\":false"));
        assert!(json.contains("\"grid\":{\"size\":4,\"cells\":[[null,null,null,null]"));
    }
}
