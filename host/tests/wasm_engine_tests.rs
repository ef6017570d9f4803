use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use host::config::GameConfig;
use host::game_loop::TickScheduler;
use host::hud::STATUS_GAME_OVER;
use host::input::Key;
use host::memory::MemoryInterop;
use host::rule_engine::RuleEngine;
use host::session::{ApplyOutcome, HostSession};
use host::settings::{SettingsForm, SettingsStore};
use host::wasm_engine::WasmRuleEngine;

/// A tiny engine with the same exports as the real module: a fixed board at 1024 with one locked
/// cell, a 2x2 piece that only ever moves left, and game over after three ticks.
const ENGINE_WAT: &str = r#"
(module
  (import "env" "emscripten_notify_memory_growth" (func $notify (param i32)))
  (import "env" "clock_ms" (func $clock (result i32)))
  (memory (export "memory") 1)
  (global $heap (mut i32) (i32.const 8192))
  (global $rows (mut i32) (i32.const 0))
  (global $cols (mut i32) (i32.const 0))
  (global $cap (mut i32) (i32.const 0))
  (global $ticks (mut i32) (i32.const 0))
  (global $left (mut i32) (i32.const 0))

  (func (export "malloc") (param $n i32) (result i32)
    (local $p i32)
    (local.set $p (global.get $heap))
    (global.set $heap (i32.add (global.get $heap) (local.get $n)))
    (local.get $p))

  (func $init (export "wasm_init_game") (param $r i32) (param $c i32) (param $d i32) (result i32)
    (if (result i32) (i32.lt_s (local.get $r) (i32.const 4))
      (then (i32.const 0))
      (else
        (call $notify (i32.const 0))
        (global.set $rows (local.get $r))
        (global.set $cols (local.get $c))
        (global.set $cap (local.get $d))
        (global.set $ticks (i32.const 0))
        (global.set $left (i32.const 0))
        (i32.store
          (i32.add (i32.const 1024) (i32.mul (i32.add (local.get $c) (i32.const 2)) (i32.const 4)))
          (i32.const 3))
        (i32.const 1))))

  (func (export "wasm_reset_game") (param $r i32) (param $c i32) (param $d i32) (result i32)
    (call $init (local.get $r) (local.get $c) (local.get $d)))

  (func (export "wasm_tick") (result i32)
    (drop (call $clock))
    (global.set $ticks (i32.add (global.get $ticks) (i32.const 1)))
    (global.get $ticks))

  (func (export "wasm_move_left") (result i32)
    (global.set $left (i32.add (global.get $left) (i32.const 1)))
    (global.get $left))
  (func (export "wasm_move_right") (result i32) (i32.const 0))
  (func (export "wasm_soft_drop") (result i32) (i32.const 0))
  (func (export "wasm_rotate_cw") (result i32) (i32.const 0))
  (func (export "wasm_rotate_ccw") (result i32) (i32.const 0))
  (func (export "wasm_hard_drop") (result i32) (i32.const 0))

  (func (export "wasm_is_game_over") (result i32)
    (i32.ge_s (global.get $ticks) (i32.const 3)))
  (func (export "wasm_get_score") (result i32)
    (i32.mul (global.get $left) (i32.const 10)))
  (func (export "wasm_get_lines") (result i32) (unreachable))
  (func (export "wasm_get_drop_cap") (result i32) (global.get $cap))
  (func (export "wasm_get_drop_count") (result i32) (global.get $ticks))
  (func (export "wasm_get_board_ptr") (result i32) (i32.const 1024))
  (func (export "wasm_get_rows") (result i32) (global.get $rows))
  (func (export "wasm_get_cols") (result i32) (global.get $cols))
  (func (export "wasm_get_active_color") (result i32) (i32.const 2))

  (func (export "wasm_write_active_cells") (param $p i32)
    (i32.store (local.get $p) (i32.const 4))
    (i32.store offset=4 (local.get $p) (i32.const 0))
    (i32.store offset=8 (local.get $p) (i32.const 5))
    (i32.store offset=12 (local.get $p) (i32.const 0))
    (i32.store offset=16 (local.get $p) (i32.const 4))
    (i32.store offset=20 (local.get $p) (i32.const 1))
    (i32.store offset=24 (local.get $p) (i32.const 5))
    (i32.store offset=28 (local.get $p) (i32.const 1)))
)
"#;

fn load() -> WasmRuleEngine {
    WasmRuleEngine::from_bytes(ENGINE_WAT.as_bytes()).expect("engine module")
}

#[test]
fn exports_drive_board_and_scratch_through_memory() {
    let mut engine = load();
    assert!(engine.init_game(20, 10, 150));

    let mut interop = MemoryInterop::new();
    let board = interop.refresh_board_view(&mut engine);
    assert_eq!((board.base_ptr(), board.rows(), board.cols()), (1024, 20, 10));
    assert_eq!(interop.read_cell(&engine, 1, 2), 3);
    assert_eq!(interop.read_cell(&engine, 0, 0), 0);

    let scratch = interop.ensure_scratch_buffer(&mut engine).expect("scratch");
    assert_eq!(scratch.ptr(), 8192);
    assert_eq!(
        interop.active_cells(&mut engine),
        Some([(4, 0), (5, 0), (4, 1), (5, 1)])
    );
    assert_eq!(engine.active_color(), 2);
}

#[test]
fn rejected_init_and_missing_seed_are_reported_as_false() {
    let mut engine = load();
    assert!(!engine.init_game(3, 10, 150));
    assert!(!engine.set_seed(42));
}

#[test]
fn trapping_export_folds_into_zero() {
    let mut engine = load();
    assert!(engine.init_game(20, 10, 150));
    assert_eq!(engine.lines(), 0);
    // The instance is still usable after a trap.
    engine.move_left();
    assert_eq!(engine.score(), 10);
}

#[test]
fn missing_export_is_a_load_error() {
    let err = WasmRuleEngine::from_bytes(br#"(module (memory (export "memory") 1))"#)
        .err()
        .expect("load error");
    assert!(format!("{err:#}").contains("wasm_"), "{err:#}");
}

#[test]
fn missing_file_is_a_load_error() {
    assert!(WasmRuleEngine::load("/nonexistent/tetris.wasm").is_err());
}

#[test]
fn session_runs_on_the_wasm_engine_until_game_over() {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("tetris_host_wasm_session_{nanos}"));
    let tick = Duration::from_millis(700);
    let mut session = HostSession::new(
        Some(load()),
        GameConfig::default(),
        SettingsStore::at(dir.join("tetris-settings.json")),
        SettingsForm {
            rows: "20".to_string(),
            cols: "10".to_string(),
            drops: "150".to_string(),
        },
        TickScheduler::new(tick),
    );

    let t0 = Instant::now();
    assert!(matches!(session.bootstrap(t0), ApplyOutcome::Applied(_)));
    assert_eq!(session.surface().pixel(2 * 26 + 1, 26 + 1), Some([0xf9, 0x73, 0x16, 255]));

    session.handle_key(Key::ArrowLeft);
    assert_eq!(session.hud().score, "10");

    for i in 1..=3 {
        assert!(session.poll_tick(t0 + tick * i));
    }
    assert!(!session.is_running());
    assert_eq!(session.hud().status.text, STATUS_GAME_OVER);
    assert_eq!(session.hud().drops_left, "147");

    let _ = std::fs::remove_dir_all(dir);
}
