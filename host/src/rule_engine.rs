//! The command/query contract the host consumes from the rule engine.
//!
//! The engine owns all game rules. The host only issues commands, asks scalar questions, and
//! reads the board straight out of the engine's linear memory.

use std::fmt;

/// Failure reading or writing the engine's linear memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryError {
    /// Word index outside a bounded view.
    OutOfBounds { index: u32, len: u32 },
    /// Byte range outside the engine's memory.
    OutOfRange { offset: u64, len: usize },
    /// Offset arithmetic overflowed the 32-bit address space.
    Overflow,
}

impl fmt::Display for MemoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryError::OutOfBounds { index, len } => {
                write!(f, "word index {index} outside view of {len} words")
            }
            MemoryError::OutOfRange { offset, len } => {
                write!(f, "{len} bytes at offset {offset} outside engine memory")
            }
            MemoryError::Overflow => write!(f, "engine memory offset overflow"),
        }
    }
}

impl std::error::Error for MemoryError {}

/// Byte-addressed access to the engine's linear memory.
pub trait LinearMemory {
    fn read_memory(&self, offset: u64, buf: &mut [u8]) -> Result<(), MemoryError>;
    fn write_memory(&mut self, offset: u64, bytes: &[u8]) -> Result<(), MemoryError>;
}

/// One discrete player action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineCommand {
    MoveLeft,
    MoveRight,
    SoftDrop,
    RotateCw,
    RotateCcw,
    HardDrop,
}

impl EngineCommand {
    pub const ALL: [EngineCommand; 6] = [
        EngineCommand::MoveLeft,
        EngineCommand::MoveRight,
        EngineCommand::SoftDrop,
        EngineCommand::RotateCw,
        EngineCommand::RotateCcw,
        EngineCommand::HardDrop,
    ];
}

/// The rule engine's command/query surface.
///
/// Every call is synchronous and returns immediately. Illegal actions are ignored by the engine;
/// the host never second-guesses it.
pub trait RuleEngine: LinearMemory {
    /// Allocates a new session. `false` means the settings were rejected.
    fn init_game(&mut self, rows: i32, cols: i32, drop_limit: i32) -> bool;
    /// Replaces the current session. On `false` the previous session is left intact.
    fn reset_game(&mut self, rows: i32, cols: i32, drop_limit: i32) -> bool;
    /// Reseeds the piece randomiser. Returns `false` when the engine has no seed control.
    fn set_seed(&mut self, _seed: u32) -> bool {
        false
    }

    fn tick(&mut self);

    fn move_left(&mut self);
    fn move_right(&mut self);
    fn soft_drop(&mut self);
    fn rotate_cw(&mut self);
    fn rotate_ccw(&mut self);
    fn hard_drop(&mut self);

    fn is_game_over(&mut self) -> bool;
    fn score(&mut self) -> i32;
    fn lines(&mut self) -> i32;
    fn drop_cap(&mut self) -> i32;
    fn drop_count(&mut self) -> i32;

    /// Byte offset of the `rows * cols` i32 board inside linear memory.
    fn board_ptr(&mut self) -> i32;
    fn rows(&mut self) -> i32;
    fn cols(&mut self) -> i32;

    /// Writes 4 `(x, y)` pairs (8 i32 words) for the falling piece at byte offset `ptr`.
    fn write_active_cells(&mut self, ptr: u32);
    /// Palette index of the falling piece; 0 selects the default colour.
    fn active_color(&mut self) -> i32;

    /// Allocates `bytes` inside linear memory; `None` when the engine is out of memory.
    fn allocate(&mut self, bytes: u32) -> Option<u32>;

    fn apply(&mut self, command: EngineCommand) {
        match command {
            EngineCommand::MoveLeft => self.move_left(),
            EngineCommand::MoveRight => self.move_right(),
            EngineCommand::SoftDrop => self.soft_drop(),
            EngineCommand::RotateCw => self.rotate_cw(),
            EngineCommand::RotateCcw => self.rotate_ccw(),
            EngineCommand::HardDrop => self.hard_drop(),
        }
    }
}
