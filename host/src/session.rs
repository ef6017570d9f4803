//! The session context: one value owning every piece of host state, passed to each operation.

use std::time::Instant;

use canvas::surface::RgbaBufferSurface;
use tracing::{debug, info, warn};

use crate::config::GameConfig;
use crate::game_loop::TickScheduler;
use crate::hud::{Hud, STATUS_MODULE_MISSING, STATUS_PAUSED, STATUS_REJECTED};
use crate::input::{InputQueue, Key, KeyDisposition, command_for_key};
use crate::memory::MemoryInterop;
use crate::render::draw_board;
use crate::rule_engine::RuleEngine;
use crate::settings::{SettingsForm, SettingsRecord, SettingsStore, read_settings};

/// `initialized` flips to true on the first accepted init and stays true. Running is not stored
/// here: it is whether the scheduler is armed, so the two can never disagree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionState {
    pub initialized: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied(SettingsRecord),
    /// The engine refused the settings; the previous session is untouched.
    Rejected(SettingsRecord),
    /// There is no engine to apply settings to.
    EngineUnavailable,
}

pub struct HostSession<E: RuleEngine> {
    pub(crate) engine: Option<E>,
    pub(crate) state: SessionState,
    pub(crate) interop: MemoryInterop,
    pub(crate) surface: RgbaBufferSurface,
    pub(crate) hud: Hud,
    pub(crate) scheduler: TickScheduler,
    config: GameConfig,
    store: SettingsStore,
    form: SettingsForm,
    seed: Option<u32>,
}

impl<E: RuleEngine> HostSession<E> {
    pub fn new(
        engine: Option<E>,
        config: GameConfig,
        store: SettingsStore,
        form: SettingsForm,
        scheduler: TickScheduler,
    ) -> Self {
        Self {
            engine,
            state: SessionState::default(),
            interop: MemoryInterop::new(),
            surface: RgbaBufferSurface::default(),
            hud: Hud::default(),
            scheduler,
            config,
            store,
            form,
            seed: None,
        }
    }

    /// Reseed the engine after every accepted init/reset.
    pub fn with_seed(mut self, seed: Option<u32>) -> Self {
        self.seed = seed;
        self
    }

    pub fn engine(&self) -> Option<&E> {
        self.engine.as_ref()
    }

    pub fn engine_mut(&mut self) -> Option<&mut E> {
        self.engine.as_mut()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.scheduler.is_active()
    }

    pub fn scheduler(&self) -> &TickScheduler {
        &self.scheduler
    }

    pub fn interop(&self) -> &MemoryInterop {
        &self.interop
    }

    pub fn surface(&self) -> &RgbaBufferSurface {
        &self.surface
    }

    pub fn hud(&self) -> &Hud {
        &self.hud
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn form(&self) -> &SettingsForm {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut SettingsForm {
        &mut self.form
    }

    /// First run: report a missing engine, otherwise apply whatever the form holds.
    pub fn bootstrap(&mut self, now: Instant) -> ApplyOutcome {
        if self.engine.is_none() {
            self.hud.set_status(STATUS_MODULE_MISSING, true);
            return ApplyOutcome::EngineUnavailable;
        }
        self.apply_settings(now)
    }

    /// Reads and persists the form, then inits (first time) or resets the engine.
    ///
    /// On acceptance the board view and scratch buffer are refreshed before anything renders,
    /// and the loop is restarted from scratch. On rejection nothing but the status line changes.
    pub fn apply_settings(&mut self, now: Instant) -> ApplyOutcome {
        let Some(engine) = self.engine.as_mut() else {
            return ApplyOutcome::EngineUnavailable;
        };
        let settings = read_settings(&self.form, &self.config);
        self.store.save_or_warn(&settings);

        let (rows, cols, drops) = (
            to_engine_int(settings.rows),
            to_engine_int(settings.cols),
            to_engine_int(settings.drops),
        );
        let accepted = if self.state.initialized {
            engine.reset_game(rows, cols, drops)
        } else {
            engine.init_game(rows, cols, drops)
        };
        if !accepted {
            warn!(rows, cols, drops, "engine rejected settings");
            self.hud.set_status(STATUS_REJECTED, true);
            return ApplyOutcome::Rejected(settings);
        }

        if let Some(seed) = self.seed {
            if !engine.set_seed(seed) {
                debug!(seed, "engine has no seed control");
            }
        }

        self.state.initialized = true;
        self.interop.refresh_board_view(engine);
        self.interop.ensure_scratch_buffer(engine);
        self.redraw();
        self.refresh_hud();
        self.stop_loop(None);
        self.start_loop(now);
        info!(rows, cols, drops, "session started");
        ApplyOutcome::Applied(settings)
    }

    /// The pause/resume control. Does nothing before the first accepted init.
    pub fn toggle_pause(&mut self, now: Instant) {
        if !self.state.initialized {
            return;
        }
        if self.is_running() {
            self.stop_loop(Some(STATUS_PAUSED));
        } else {
            self.resume_if_possible(now);
        }
    }

    /// Dispatches one key press. Recognised keys send their command and force an immediate
    /// redraw and HUD refresh, outside the tick cadence.
    pub fn handle_key(&mut self, key: Key) -> KeyDisposition {
        let Some(engine) = self.engine.as_mut() else {
            return KeyDisposition::Ignored;
        };
        let Some(command) = command_for_key(key) else {
            return KeyDisposition::Ignored;
        };
        engine.apply(command);
        self.redraw();
        self.refresh_hud();
        KeyDisposition::Handled
    }

    /// Dispatches every queued key in order. Returns how many were handled.
    pub fn drain_input(&mut self, queue: &mut InputQueue) -> usize {
        let mut handled = 0;
        while let Some(key) = queue.pop() {
            if self.handle_key(key) == KeyDisposition::Handled {
                handled += 1;
            }
        }
        handled
    }

    /// Full redraw of the board surface. Skipped until a board view exists.
    pub fn redraw(&mut self) {
        let Some(engine) = self.engine.as_mut() else {
            return;
        };
        match draw_board(&mut self.surface, &self.interop, engine) {
            Ok(_) => {}
            Err(never) => match never {},
        }
    }

    pub fn refresh_hud(&mut self) {
        if let Some(engine) = self.engine.as_mut() {
            self.hud.refresh(engine);
        }
    }
}

fn to_engine_int(value: i64) -> i32 {
    i32::try_from(value).unwrap_or(if value < 0 { i32::MIN } else { i32::MAX })
}
