//! twenty48: a 2048 engine with an injectable random source and storage.
//!
//! The engine is a pure state machine over a square [`game::Grid`]:
//! - [`game::resolver`] slides and merges tiles for one direction
//! - [`game::GameSession`] runs the turn sequence, win/loss detection and persistence
//! - [`storage`] holds the persistence adapters the session writes through
//!
//! ```
//! use twenty48::config::GameConfig;
//! use twenty48::game::{Direction, GameSession, SeededRandom};
//! use twenty48::storage::MemoryStorage;
//!
//! let mut session = GameSession::new(
//!     GameConfig::default(),
//!     Box::new(MemoryStorage::new()),
//!     Box::new(SeededRandom::new(7)),
//! )
//! .unwrap();
//! assert_eq!(session.grid().tile_count(), 2);
//! session.make_move(Direction::Left);
//! ```
pub mod config;
pub mod game;
pub mod storage;
