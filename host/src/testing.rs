//! An in-process `RuleEngine` with scriptable state and a call log.
//!
//! It implements the same linear-memory contract as the wasm module (board and scratch buffer
//! live inside a byte vector, the board is re-allocated on every init/reset) but carries no game
//! rules of its own: tests poke state directly and assert on the calls the host made.

use crate::rule_engine::{EngineCommand, LinearMemory, MemoryError, RuleEngine};

pub const MEMORY_BYTES: usize = 1 << 20;
const HEAP_START: u32 = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineCall {
    Init { rows: i32, cols: i32, drops: i32 },
    Reset { rows: i32, cols: i32, drops: i32 },
    SetSeed(u32),
    Tick,
    Command(EngineCommand),
    IsGameOver,
    Score,
    Lines,
    DropCap,
    DropCount,
    BoardPtr,
    Rows,
    Cols,
    WriteActiveCells(u32),
    ActiveColor,
    Allocate(u32),
}

#[derive(Debug, Clone, Copy)]
struct Board {
    ptr: u32,
    rows: i32,
    cols: i32,
}

#[derive(Debug, Clone)]
pub struct ScriptedEngine {
    memory: Vec<u8>,
    next_alloc: u32,
    allocations: u32,
    min_rows: i32,
    min_cols: i32,
    board: Option<Board>,
    score: i32,
    lines: i32,
    drop_cap: i32,
    drop_count: i32,
    game_over: bool,
    game_over_after_ticks: Option<u32>,
    ticks: u32,
    active_cells: [(i32, i32); 4],
    active_color: i32,
    calls: Vec<EngineCall>,
}

impl Default for ScriptedEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self {
            memory: vec![0u8; MEMORY_BYTES],
            next_alloc: HEAP_START,
            allocations: 0,
            min_rows: 5,
            min_cols: 5,
            board: None,
            score: 0,
            lines: 0,
            drop_cap: 0,
            drop_count: 0,
            game_over: false,
            game_over_after_ticks: None,
            ticks: 0,
            active_cells: [(0, 0), (1, 0), (2, 0), (3, 0)],
            active_color: 1,
            calls: Vec::new(),
        }
    }

    /// Smallest board the engine accepts; smaller init/reset requests return `false`.
    pub fn with_min_size(mut self, min_rows: i32, min_cols: i32) -> Self {
        self.min_rows = min_rows;
        self.min_cols = min_cols;
        self
    }

    /// Reports game over once `ticks` ticks have run in the current session.
    pub fn with_game_over_after_ticks(mut self, ticks: u32) -> Self {
        self.game_over_after_ticks = Some(ticks);
        self
    }

    pub fn calls(&self) -> &[EngineCall] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    pub fn count_calls(&self, call: EngineCall) -> usize {
        self.calls.iter().filter(|c| **c == call).count()
    }

    /// Number of host allocations (board allocations made by init/reset are not counted).
    pub fn allocation_count(&self) -> u32 {
        self.allocations
    }

    pub fn ticks(&self) -> u32 {
        self.ticks
    }

    pub fn set_cell(&mut self, row: i32, col: i32, color: i32) {
        let Some(board) = self.board else {
            return;
        };
        if row < 0 || col < 0 || row >= board.rows || col >= board.cols {
            return;
        }
        let offset = board.ptr as u64 + ((row * board.cols + col) as u64) * 4;
        let _ = self.write_memory(offset, &color.to_le_bytes());
    }

    pub fn set_active_cells(&mut self, cells: [(i32, i32); 4]) {
        self.active_cells = cells;
    }

    pub fn set_active_color(&mut self, color: i32) {
        self.active_color = color;
    }

    pub fn set_score(&mut self, score: i32) {
        self.score = score;
    }

    pub fn set_lines(&mut self, lines: i32) {
        self.lines = lines;
    }

    pub fn set_drop_count(&mut self, drop_count: i32) {
        self.drop_count = drop_count;
    }

    pub fn set_game_over(&mut self, game_over: bool) {
        self.game_over = game_over;
    }

    fn alloc_raw(&mut self, bytes: u32) -> Option<u32> {
        let aligned = bytes.checked_add(7)? & !7;
        let ptr = self.next_alloc;
        let end = ptr.checked_add(aligned)?;
        if end as usize > self.memory.len() {
            return None;
        }
        self.next_alloc = end;
        Some(ptr)
    }

    fn start_session(&mut self, rows: i32, cols: i32, drops: i32) -> bool {
        if rows < self.min_rows || cols < self.min_cols {
            return false;
        }
        let Some(bytes) = rows
            .checked_mul(cols)
            .and_then(|cells| cells.checked_mul(4))
            .and_then(|b| u32::try_from(b).ok())
        else {
            return false;
        };
        let Some(ptr) = self.alloc_raw(bytes) else {
            return false;
        };
        let start = ptr as usize;
        self.memory[start..start + bytes as usize].fill(0);

        self.board = Some(Board { ptr, rows, cols });
        self.score = 0;
        self.lines = 0;
        self.drop_cap = drops.max(1);
        self.drop_count = 0;
        self.game_over = false;
        self.ticks = 0;
        true
    }

    fn command(&mut self, command: EngineCommand) {
        self.calls.push(EngineCall::Command(command));
        if self.game_over {
            return;
        }
        match command {
            EngineCommand::MoveLeft => self.shift_active(-1, 0),
            EngineCommand::MoveRight => self.shift_active(1, 0),
            EngineCommand::SoftDrop => self.shift_active(0, 1),
            EngineCommand::HardDrop => self.drop_count += 1,
            EngineCommand::RotateCw | EngineCommand::RotateCcw => {}
        }
    }

    fn shift_active(&mut self, dx: i32, dy: i32) {
        for cell in &mut self.active_cells {
            cell.0 += dx;
            cell.1 += dy;
        }
    }
}

impl LinearMemory for ScriptedEngine {
    fn read_memory(&self, offset: u64, buf: &mut [u8]) -> Result<(), MemoryError> {
        let start = usize::try_from(offset).map_err(|_| MemoryError::Overflow)?;
        let src = start
            .checked_add(buf.len())
            .and_then(|end| self.memory.get(start..end))
            .ok_or(MemoryError::OutOfRange {
                offset,
                len: buf.len(),
            })?;
        buf.copy_from_slice(src);
        Ok(())
    }

    fn write_memory(&mut self, offset: u64, bytes: &[u8]) -> Result<(), MemoryError> {
        let start = usize::try_from(offset).map_err(|_| MemoryError::Overflow)?;
        let dst = start
            .checked_add(bytes.len())
            .and_then(|end| self.memory.get_mut(start..end))
            .ok_or(MemoryError::OutOfRange {
                offset,
                len: bytes.len(),
            })?;
        dst.copy_from_slice(bytes);
        Ok(())
    }
}

impl RuleEngine for ScriptedEngine {
    fn init_game(&mut self, rows: i32, cols: i32, drop_limit: i32) -> bool {
        self.calls.push(EngineCall::Init {
            rows,
            cols,
            drops: drop_limit,
        });
        self.start_session(rows, cols, drop_limit)
    }

    fn reset_game(&mut self, rows: i32, cols: i32, drop_limit: i32) -> bool {
        self.calls.push(EngineCall::Reset {
            rows,
            cols,
            drops: drop_limit,
        });
        self.start_session(rows, cols, drop_limit)
    }

    fn set_seed(&mut self, seed: u32) -> bool {
        self.calls.push(EngineCall::SetSeed(seed));
        true
    }

    fn tick(&mut self) {
        self.calls.push(EngineCall::Tick);
        if self.game_over {
            return;
        }
        self.ticks += 1;
        if self
            .game_over_after_ticks
            .is_some_and(|limit| self.ticks >= limit)
        {
            self.game_over = true;
        }
    }

    fn move_left(&mut self) {
        self.command(EngineCommand::MoveLeft);
    }

    fn move_right(&mut self) {
        self.command(EngineCommand::MoveRight);
    }

    fn soft_drop(&mut self) {
        self.command(EngineCommand::SoftDrop);
    }

    fn rotate_cw(&mut self) {
        self.command(EngineCommand::RotateCw);
    }

    fn rotate_ccw(&mut self) {
        self.command(EngineCommand::RotateCcw);
    }

    fn hard_drop(&mut self) {
        self.command(EngineCommand::HardDrop);
    }

    fn is_game_over(&mut self) -> bool {
        self.calls.push(EngineCall::IsGameOver);
        self.game_over
    }

    fn score(&mut self) -> i32 {
        self.calls.push(EngineCall::Score);
        self.score
    }

    fn lines(&mut self) -> i32 {
        self.calls.push(EngineCall::Lines);
        self.lines
    }

    fn drop_cap(&mut self) -> i32 {
        self.calls.push(EngineCall::DropCap);
        self.drop_cap
    }

    fn drop_count(&mut self) -> i32 {
        self.calls.push(EngineCall::DropCount);
        self.drop_count
    }

    fn board_ptr(&mut self) -> i32 {
        self.calls.push(EngineCall::BoardPtr);
        self.board.map_or(0, |b| b.ptr as i32)
    }

    fn rows(&mut self) -> i32 {
        self.calls.push(EngineCall::Rows);
        self.board.map_or(0, |b| b.rows)
    }

    fn cols(&mut self) -> i32 {
        self.calls.push(EngineCall::Cols);
        self.board.map_or(0, |b| b.cols)
    }

    fn write_active_cells(&mut self, ptr: u32) {
        self.calls.push(EngineCall::WriteActiveCells(ptr));
        if ptr == 0 {
            return;
        }
        let cells = self.active_cells;
        for (i, (x, y)) in cells.into_iter().enumerate() {
            let offset = ptr as u64 + (i as u64) * 8;
            let _ = self.write_memory(offset, &x.to_le_bytes());
            let _ = self.write_memory(offset + 4, &y.to_le_bytes());
        }
    }

    fn active_color(&mut self) -> i32 {
        self.calls.push(EngineCall::ActiveColor);
        self.active_color
    }

    fn allocate(&mut self, bytes: u32) -> Option<u32> {
        self.calls.push(EngineCall::Allocate(bytes));
        self.allocations += 1;
        self.alloc_raw(bytes)
    }
}
