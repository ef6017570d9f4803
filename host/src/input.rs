//! Keyboard dispatch: symbolic key codes, the binding table, and a FIFO decoupling event
//! delivery from dispatch.

use std::collections::VecDeque;

use crate::rule_engine::EngineCommand;

/// Physical key codes the host cares about, named after DOM `KeyboardEvent.code`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    ArrowLeft,
    ArrowRight,
    ArrowDown,
    ArrowUp,
    Space,
    KeyZ,
    KeyX,
    Other,
}

impl Key {
    pub fn from_code(code: &str) -> Self {
        match code {
            "ArrowLeft" => Key::ArrowLeft,
            "ArrowRight" => Key::ArrowRight,
            "ArrowDown" => Key::ArrowDown,
            "ArrowUp" => Key::ArrowUp,
            "Space" => Key::Space,
            "KeyZ" => Key::KeyZ,
            "KeyX" => Key::KeyX,
            _ => Key::Other,
        }
    }
}

/// Whether a key press was consumed. `Handled` keys suppress any default handling by the
/// surrounding UI; `Ignored` keys pass through untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyDisposition {
    Handled,
    Ignored,
}

/// Key to command table. Rotate-clockwise is bound twice (ArrowUp and KeyX).
pub const KEY_BINDINGS: [(Key, EngineCommand); 7] = [
    (Key::ArrowLeft, EngineCommand::MoveLeft),
    (Key::ArrowRight, EngineCommand::MoveRight),
    (Key::ArrowDown, EngineCommand::SoftDrop),
    (Key::ArrowUp, EngineCommand::RotateCw),
    (Key::Space, EngineCommand::HardDrop),
    (Key::KeyZ, EngineCommand::RotateCcw),
    (Key::KeyX, EngineCommand::RotateCw),
];

pub fn command_for_key(key: Key) -> Option<EngineCommand> {
    KEY_BINDINGS
        .iter()
        .find(|(bound, _)| *bound == key)
        .map(|(_, command)| *command)
}

/// Pending key presses in arrival order.
#[derive(Debug, Default)]
pub struct InputQueue {
    keys: VecDeque<Key>,
}

impl InputQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: Key) {
        self.keys.push_back(key);
    }

    pub fn pop(&mut self) -> Option<Key> {
        self.keys.pop_front()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
