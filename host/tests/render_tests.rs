use canvas::surface::{RgbaBufferSurface, Surface, SurfaceSize};

use host::memory::MemoryInterop;
use host::render::{
    COLOR_ACTIVE_FALLBACK, COLOR_BACKGROUND, COLOR_GRID_LINE, PALETTE, cell_size, draw_board,
};
use host::rule_engine::RuleEngine;
use host::testing::{EngineCall, ScriptedEngine};

fn ready_engine(rows: i32, cols: i32) -> (ScriptedEngine, MemoryInterop) {
    let mut engine = ScriptedEngine::new();
    assert!(engine.init_game(rows, cols, 150));
    let mut interop = MemoryInterop::new();
    interop.refresh_board_view(&mut engine);
    (engine, interop)
}

#[test]
fn surface_is_resized_to_grid_times_cell() {
    let (mut engine, mut interop) = ready_engine(20, 10);
    interop.ensure_scratch_buffer(&mut engine);
    let mut surface = RgbaBufferSurface::default();

    assert_eq!(draw_board(&mut surface, &interop, &mut engine), Ok(true));
    assert_eq!(cell_size(20, 10), 26);
    assert_eq!(surface.size(), SurfaceSize::new(260, 520));
}

#[test]
fn no_board_view_leaves_surface_untouched() {
    let mut engine = ScriptedEngine::new();
    assert!(engine.init_game(20, 10, 150));
    let interop = MemoryInterop::new();
    let mut surface = RgbaBufferSurface::new(SurfaceSize::new(4, 4));
    let before = surface.sha256_hex();

    assert_eq!(draw_board(&mut surface, &interop, &mut engine), Ok(false));
    assert_eq!(surface.sha256_hex(), before);
}

#[test]
fn locked_cells_fill_with_one_pixel_gap_and_empty_cells_outline() {
    let (mut engine, interop) = ready_engine(20, 10);
    engine.set_cell(1, 2, 3);
    let mut surface = RgbaBufferSurface::default();
    draw_board(&mut surface, &interop, &mut engine).unwrap();

    let cell = 26;
    assert_eq!(surface.pixel(2 * cell, cell), Some(PALETTE[3]));
    assert_eq!(surface.pixel(2 * cell + 24, cell + 24), Some(PALETTE[3]));
    assert_eq!(
        surface.pixel(2 * cell + 25, cell + 10),
        Some(COLOR_BACKGROUND),
        "gap column"
    );

    assert_eq!(surface.pixel(0, 0), Some(COLOR_GRID_LINE));
    assert_eq!(surface.pixel(cell - 1, 5), Some(COLOR_GRID_LINE));
    assert_eq!(surface.pixel(5, 5), Some(COLOR_BACKGROUND));
}

#[test]
fn out_of_palette_ids_use_default_colour() {
    let (mut engine, interop) = ready_engine(10, 10);
    engine.set_cell(0, 0, 42);
    let mut surface = RgbaBufferSurface::default();
    draw_board(&mut surface, &interop, &mut engine).unwrap();

    assert_eq!(surface.pixel(5, 5), Some(PALETTE[0]));
    assert_eq!(surface.pixel(0, 0), Some(PALETTE[0]), "filled, not outlined");
}

#[test]
fn active_piece_drawn_from_scratch_buffer() {
    let (mut engine, mut interop) = ready_engine(20, 10);
    interop.ensure_scratch_buffer(&mut engine);
    engine.set_active_cells([(4, 0), (5, 0), (4, 1), (5, 1)]);
    engine.set_active_color(5);
    let mut surface = RgbaBufferSurface::default();
    draw_board(&mut surface, &interop, &mut engine).unwrap();

    let cell = 26;
    assert_eq!(surface.pixel(4 * cell + 1, 1), Some(PALETTE[5]));
    assert_eq!(surface.pixel(5 * cell + 1, cell + 1), Some(PALETTE[5]));
    assert_eq!(surface.pixel(6 * cell + 5, 5), Some(COLOR_BACKGROUND));

    engine.set_active_color(0);
    draw_board(&mut surface, &interop, &mut engine).unwrap();
    assert_eq!(surface.pixel(4 * cell + 1, 1), Some(COLOR_ACTIVE_FALLBACK));
}

#[test]
fn missing_scratch_buffer_skips_active_piece() {
    let (mut engine, interop) = ready_engine(20, 10);
    engine.set_active_cells([(0, 0), (1, 0), (2, 0), (3, 0)]);
    engine.clear_calls();
    let mut surface = RgbaBufferSurface::default();

    assert_eq!(draw_board(&mut surface, &interop, &mut engine), Ok(true));
    assert_eq!(surface.pixel(5, 5), Some(COLOR_BACKGROUND));
    assert!(
        !engine
            .calls()
            .iter()
            .any(|c| matches!(c, EngineCall::WriteActiveCells(_) | EngineCall::ActiveColor))
    );
}

#[test]
fn active_cells_above_the_board_are_skipped() {
    let (mut engine, mut interop) = ready_engine(20, 10);
    interop.ensure_scratch_buffer(&mut engine);
    engine.set_active_cells([(0, -1), (-1, 0), (1, 1), (1, 1)]);
    engine.set_active_color(2);
    let mut surface = RgbaBufferSurface::default();
    draw_board(&mut surface, &interop, &mut engine).unwrap();

    assert_eq!(surface.pixel(0, 0), Some(COLOR_GRID_LINE));
    assert_eq!(surface.pixel(26 + 1, 26 + 1), Some(PALETTE[2]));
}

#[test]
fn identical_state_renders_identical_frames() {
    let (mut engine, mut interop) = ready_engine(20, 10);
    interop.ensure_scratch_buffer(&mut engine);
    engine.set_cell(19, 0, 1);
    let mut a = RgbaBufferSurface::default();
    let mut b = RgbaBufferSurface::default();
    draw_board(&mut a, &interop, &mut engine).unwrap();
    draw_board(&mut b, &interop, &mut engine).unwrap();

    assert_eq!(a.sha256_hex(), b.sha256_hex());
    engine.set_cell(19, 1, 2);
    draw_board(&mut b, &interop, &mut engine).unwrap();
    assert_ne!(a.sha256_hex(), b.sha256_hex());
}
