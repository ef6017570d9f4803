//! Typed access to the engine's linear memory.
//!
//! Raw byte offsets never leave this module: callers see bounded i32 views over the board and
//! over the host-owned scratch buffer.

use tracing::{debug, warn};

use crate::rule_engine::{LinearMemory, MemoryError, RuleEngine};

const WORD_BYTES: u32 = 4;

/// Number of i32 words in the scratch buffer: 4 `(x, y)` pairs.
pub const SCRATCH_WORDS: u32 = 8;
pub const CELLS_PER_PIECE: usize = 4;

/// A bounded window of i32 words inside linear memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForeignBufferView {
    base: u32,
    len: u32,
}

impl ForeignBufferView {
    pub const fn new(base: u32, len: u32) -> Self {
        Self { base, len }
    }

    /// Byte offset of the first word.
    pub const fn base(&self) -> u32 {
        self.base
    }

    /// Length in words.
    pub const fn len(&self) -> u32 {
        self.len
    }

    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn byte_offset(&self, index: u32) -> Result<u64, MemoryError> {
        if index >= self.len {
            return Err(MemoryError::OutOfBounds {
                index,
                len: self.len,
            });
        }
        index
            .checked_mul(WORD_BYTES)
            .and_then(|rel| self.base.checked_add(rel))
            .map(u64::from)
            .ok_or(MemoryError::Overflow)
    }

    pub fn read_i32<M: LinearMemory + ?Sized>(
        &self,
        mem: &M,
        index: u32,
    ) -> Result<i32, MemoryError> {
        let offset = self.byte_offset(index)?;
        let mut word = [0u8; 4];
        mem.read_memory(offset, &mut word)?;
        Ok(i32::from_le_bytes(word))
    }

    pub fn write_i32<M: LinearMemory + ?Sized>(
        &self,
        mem: &mut M,
        index: u32,
        value: i32,
    ) -> Result<(), MemoryError> {
        let offset = self.byte_offset(index)?;
        mem.write_memory(offset, &value.to_le_bytes())
    }
}

/// Host-side description of where the engine keeps its grid and what shape it has.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardView {
    view: ForeignBufferView,
    rows: u32,
    cols: u32,
}

impl BoardView {
    /// Builds a view from raw engine answers. Negative values collapse to an empty board, and a
    /// shape whose cell count overflows gets a zero-length view so every read falls back to 0.
    pub fn from_engine(base_ptr: i32, rows: i32, cols: i32) -> Self {
        let rows = u32::try_from(rows).unwrap_or(0);
        let cols = u32::try_from(cols).unwrap_or(0);
        let base = u32::try_from(base_ptr).unwrap_or(0);
        let len = rows.checked_mul(cols).unwrap_or(0);
        Self {
            view: ForeignBufferView::new(base, len),
            rows,
            cols,
        }
    }

    pub fn base_ptr(&self) -> u32 {
        self.view.base()
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn cols(&self) -> u32 {
        self.cols
    }

    /// Colour id at `(row, col)`; anything out of bounds or unreadable reads as empty.
    pub fn cell<M: LinearMemory + ?Sized>(&self, mem: &M, row: u32, col: u32) -> i32 {
        if row >= self.rows || col >= self.cols {
            return 0;
        }
        self.view
            .read_i32(mem, row * self.cols + col)
            .unwrap_or(0)
    }
}

/// The host-owned 8-word region the engine writes the falling piece's cells into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScratchBuffer {
    view: ForeignBufferView,
}

impl ScratchBuffer {
    pub fn ptr(&self) -> u32 {
        self.view.base()
    }

    pub fn view(&self) -> ForeignBufferView {
        self.view
    }
}

/// Board view plus scratch buffer, refreshed from the engine on demand.
#[derive(Debug, Default)]
pub struct MemoryInterop {
    board: Option<BoardView>,
    scratch: Option<ScratchBuffer>,
}

impl MemoryInterop {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn board(&self) -> Option<BoardView> {
        self.board
    }

    pub fn scratch(&self) -> Option<ScratchBuffer> {
        self.scratch
    }

    /// Re-reads pointer, rows and cols and replaces the board view in one assignment.
    pub fn refresh_board_view<E: RuleEngine + ?Sized>(&mut self, engine: &mut E) -> BoardView {
        let base_ptr = engine.board_ptr();
        let rows = engine.rows();
        let cols = engine.cols();
        let view = BoardView::from_engine(base_ptr, rows, cols);
        debug!(base_ptr, rows, cols, "board view refreshed");
        self.board = Some(view);
        view
    }

    /// Allocates the scratch buffer once per engine lifetime.
    pub fn ensure_scratch_buffer<E: RuleEngine + ?Sized>(
        &mut self,
        engine: &mut E,
    ) -> Option<ScratchBuffer> {
        if self.scratch.is_some() {
            return self.scratch;
        }
        match engine.allocate(SCRATCH_WORDS * WORD_BYTES) {
            Some(ptr) if ptr != 0 => {
                debug!(ptr, "scratch buffer allocated");
                self.scratch = Some(ScratchBuffer {
                    view: ForeignBufferView::new(ptr, SCRATCH_WORDS),
                });
            }
            _ => warn!("engine refused scratch buffer allocation"),
        }
        self.scratch
    }

    /// Colour id at `(row, col)` of the current board; 0 when there is no board or the index is
    /// outside the known shape.
    pub fn read_cell<M: LinearMemory + ?Sized>(&self, mem: &M, row: u32, col: u32) -> i32 {
        self.board.map_or(0, |board| board.cell(mem, row, col))
    }

    /// Asks the engine to write the falling piece into the scratch buffer and reads the 4 `(x, y)`
    /// pairs back. `None` without a scratch buffer.
    pub fn active_cells<E: RuleEngine + ?Sized>(
        &self,
        engine: &mut E,
    ) -> Option<[(i32, i32); CELLS_PER_PIECE]> {
        let scratch = self.scratch?;
        engine.write_active_cells(scratch.ptr());
        let view = scratch.view();
        let mut cells = [(0, 0); CELLS_PER_PIECE];
        for (i, cell) in cells.iter_mut().enumerate() {
            let i = i as u32;
            let x = view.read_i32(&*engine, i * 2).ok()?;
            let y = view.read_i32(&*engine, i * 2 + 1).ok()?;
            *cell = (x, y);
        }
        Some(cells)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedEngine;

    #[test]
    fn view_rejects_indices_past_len() {
        let mut engine = ScriptedEngine::new();
        let view = ForeignBufferView::new(64, 2);

        view.write_i32(&mut engine, 1, -7).unwrap();
        assert_eq!(view.read_i32(&engine, 1), Ok(-7));
        assert_eq!(
            view.read_i32(&engine, 2),
            Err(MemoryError::OutOfBounds { index: 2, len: 2 })
        );
    }

    #[test]
    fn view_reports_offset_overflow() {
        let engine = ScriptedEngine::new();
        let view = ForeignBufferView::new(u32::MAX - 2, 4);
        assert_eq!(view.read_i32(&engine, 1), Err(MemoryError::Overflow));
    }

    #[test]
    fn read_cell_defaults_to_empty_outside_board() {
        let mut engine = ScriptedEngine::new();
        assert!(engine.init_game(6, 5, 10));
        engine.set_cell(2, 3, 4);

        let mut interop = MemoryInterop::new();
        assert_eq!(interop.read_cell(&engine, 2, 3), 0, "no board view yet");

        interop.refresh_board_view(&mut engine);
        assert_eq!(interop.read_cell(&engine, 2, 3), 4);
        assert_eq!(interop.read_cell(&engine, 6, 0), 0);
        assert_eq!(interop.read_cell(&engine, 0, 5), 0);
    }

    #[test]
    fn negative_engine_shape_collapses_to_empty_board() {
        let view = BoardView::from_engine(128, -1, 10);
        assert_eq!(view.rows(), 0);
        assert_eq!(view.cols(), 10);
    }

    #[test]
    fn scratch_buffer_is_allocated_once() {
        let mut engine = ScriptedEngine::new();
        let mut interop = MemoryInterop::new();

        let first = interop.ensure_scratch_buffer(&mut engine).unwrap();
        let second = interop.ensure_scratch_buffer(&mut engine).unwrap();

        assert_eq!(first, second);
        assert_eq!(engine.allocation_count(), 1);
    }

    #[test]
    fn active_cells_round_trip_through_scratch() {
        let mut engine = ScriptedEngine::new();
        assert!(engine.init_game(20, 10, 150));
        engine.set_active_cells([(4, 0), (5, 0), (4, 1), (5, 1)]);

        let mut interop = MemoryInterop::new();
        assert!(interop.active_cells(&mut engine).is_none());

        interop.ensure_scratch_buffer(&mut engine);
        assert_eq!(
            interop.active_cells(&mut engine),
            Some([(4, 0), (5, 0), (4, 1), (5, 1)])
        );
    }
}
