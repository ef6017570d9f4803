pub mod config;
pub mod game_loop;
pub mod hud;
pub mod input;
pub mod memory;
pub mod panel;
pub mod render;
pub mod rule_engine;
pub mod session;
pub mod settings;
pub mod testing;
pub mod wasm_engine;
