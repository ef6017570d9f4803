//! Board rasteriser: engine memory in, RGBA board surface out.

use canvas::graphics::{Color, CpuRenderer, Renderer2d};
use canvas::surface::{Surface, SurfaceSize};
use canvas::ui::Rect;

use crate::memory::MemoryInterop;
use crate::rule_engine::RuleEngine;

/// Largest cell edge in pixels.
pub const MAX_CELL_PX: u32 = 28;
/// The longer board side never exceeds this many pixels.
pub const BOARD_BUDGET_PX: u32 = 520;

pub const PALETTE: [Color; 8] = [
    [0x02, 0x06, 0x17, 255],
    [0x38, 0xbd, 0xf8, 255],
    [0x25, 0x63, 0xeb, 255],
    [0xf9, 0x73, 0x16, 255],
    [0xfa, 0xcc, 0x15, 255],
    [0x22, 0xc5, 0x5e, 255],
    [0xa8, 0x55, 0xf7, 255],
    [0xef, 0x44, 0x44, 255],
];

pub const COLOR_BACKGROUND: Color = PALETTE[0];
pub const COLOR_GRID_LINE: Color = [0x1e, 0x29, 0x3b, 255];
pub const COLOR_ACTIVE_FALLBACK: Color = [0xe1, 0x1d, 0x48, 255];

/// Square cell edge shared by both axes: `floor(min(28, 520 / max(rows, cols)))`.
pub fn cell_size(rows: u32, cols: u32) -> u32 {
    let longest = rows.max(cols);
    if longest == 0 {
        return MAX_CELL_PX;
    }
    (BOARD_BUDGET_PX / longest).min(MAX_CELL_PX)
}

fn palette_entry(color_id: i32) -> Option<Color> {
    usize::try_from(color_id)
        .ok()
        .filter(|&id| id > 0)
        .and_then(|id| PALETTE.get(id).copied())
}

/// Fill colour of a locked block; ids outside the palette fall back to entry 0.
pub fn locked_color(color_id: i32) -> Color {
    palette_entry(color_id).unwrap_or(PALETTE[0])
}

/// Fill colour of the falling piece; 0 and unknown ids use the highlight fallback.
pub fn active_color(color_id: i32) -> Color {
    palette_entry(color_id).unwrap_or(COLOR_ACTIVE_FALLBACK)
}

/// Redraws the whole board surface from the engine.
///
/// Returns `Ok(false)` without touching the surface when there is no board view yet.
pub fn draw_board<S, E>(
    surface: &mut S,
    interop: &MemoryInterop,
    engine: &mut E,
) -> Result<bool, S::Error>
where
    S: Surface,
    E: RuleEngine + ?Sized,
{
    let Some(board) = interop.board() else {
        return Ok(false);
    };
    let rows = board.rows();
    let cols = board.cols();
    let cell = cell_size(rows, cols);
    let size = SurfaceSize::new(cols.saturating_mul(cell), rows.saturating_mul(cell));
    surface.resize(size)?;

    let mut gfx = CpuRenderer::new(surface.frame_mut(), size);
    gfx.begin_frame(size);
    gfx.clear(COLOR_BACKGROUND);

    let block = cell.saturating_sub(1);
    for row in 0..rows {
        for col in 0..cols {
            let color_id = board.cell(&*engine, row, col);
            if color_id > 0 {
                gfx.fill_rect(Rect::grid_cell(col, row, cell, block), locked_color(color_id));
            } else {
                gfx.rect_outline(Rect::grid_cell(col, row, cell, cell), COLOR_GRID_LINE);
            }
        }
    }

    if let Some(cells) = interop.active_cells(engine) {
        let color = active_color(engine.active_color());
        for (x, y) in cells {
            // Cells above or left of the board are off-surface.
            let (Ok(x), Ok(y)) = (u32::try_from(x), u32::try_from(y)) else {
                continue;
            };
            gfx.fill_rect(Rect::grid_cell(x, y, cell, block), color);
        }
    }

    Ok(true)
}
