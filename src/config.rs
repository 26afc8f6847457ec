use crate::game::{GameError, DEFAULT_SIZE, MAX_SIZE, MAX_TILE_VALUE, START_TILES, WIN_VALUE};

/// Board shape and rules for a session.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct GameConfig {
    /// Side length of the square board.
    pub size: usize,
    /// Tiles spawned on a fresh board.
    pub start_tiles: usize,
    /// Tile value that wins the game.
    pub win_value: u32,
}

impl GameConfig {
    pub fn with_size(size: usize) -> Self {
        Self {
            size,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), GameError> {
        if self.size < 2 || self.size > MAX_SIZE {
            return Err(GameError::InvalidConfig(format!(
                "board size {} outside 2..={}",
                self.size, MAX_SIZE
            )));
        }
        if self.start_tiles > self.size * self.size {
            return Err(GameError::InvalidConfig(format!(
                "{} start tiles do not fit a {}x{} board",
                self.start_tiles, self.size, self.size
            )));
        }
        if self.win_value < 4 || self.win_value > MAX_TILE_VALUE || !self.win_value.is_power_of_two() {
            return Err(GameError::InvalidConfig(format!(
                "win value {} is not a power of two in 4..={}",
                self.win_value, MAX_TILE_VALUE
            )));
        }
        Ok(())
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            size: DEFAULT_SIZE,
            start_tiles: START_TILES,
            win_value: WIN_VALUE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_canonical_board() {
        let config = GameConfig::default();
        assert_eq!(config.size, 4);
        assert_eq!(config.start_tiles, 2);
        assert_eq!(config.win_value, 2048);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_degenerate_sizes() {
        assert!(GameConfig::with_size(1).validate().is_err());
        assert!(GameConfig::with_size(MAX_SIZE + 1).validate().is_err());
        assert!(GameConfig::with_size(2).validate().is_ok());
    }

    #[test]
    fn rejects_bad_win_value() {
        let config = GameConfig {
            win_value: 1000,
            ..GameConfig::default()
        };
        assert!(matches!(config.validate(), Err(GameError::InvalidConfig(_))));

        let unreachable = GameConfig {
            win_value: 1 << 31,
            ..GameConfig::default()
        };
        assert!(unreachable.validate().is_err());
    }

    #[test]
    fn rejects_too_many_start_tiles() {
        let config = GameConfig {
            size: 2,
            start_tiles: 5,
            win_value: 2048,
        };
        assert!(config.validate().is_err());
    }
}
