use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::anyhow;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use winit::dpi::PhysicalSize;
use winit::event::VirtualKeyCode;

use canvas::app::{AppConfig, AppContext, AppHandler, run_app};
use canvas::graphics::Renderer2d;
use host::config::{ConfigSource, DEFAULT_CONFIG_PATH, load_config};
use host::game_loop::TickScheduler;
use host::input::{InputQueue, Key};
use host::panel::{PanelButton, PanelLayout, WINDOW_SIZE, draw_window};
use host::rule_engine::RuleEngine;
use host::session::HostSession;
use host::settings::{FormField, SettingsStore, hydrate_form};
use host::wasm_engine::WasmRuleEngine;

const MAX_FIELD_CHARS: usize = 6;

#[derive(Debug, Parser)]
#[command(name = "tetris-host")]
#[command(about = "Native host for the wasm Tetris rule engine")]
struct Cli {
    /// Compiled engine module.
    #[arg(long, default_value = "public/tetris.wasm")]
    module: PathBuf,
    /// Game config: a JSON file path or an http:// URL.
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: String,
    /// Settings file; defaults to the user config directory.
    #[arg(long)]
    settings: Option<PathBuf>,
    /// Override the rows field.
    #[arg(long)]
    rows: Option<String>,
    /// Override the columns field.
    #[arg(long)]
    cols: Option<String>,
    /// Override the drop limit field.
    #[arg(long)]
    drops: Option<String>,
    /// Reseed the engine's piece randomiser after every reset.
    #[arg(long)]
    seed: Option<u32>,
    #[arg(long, default_value_t = 700)]
    tick_ms: u64,
    /// Run this many ticks without a window, then print the HUD and the board digest.
    #[arg(long)]
    headless_ticks: Option<u32>,
}

fn env_bool(name: &str) -> Option<bool> {
    std::env::var(name).ok().and_then(|v| match v.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    })
}

fn setup_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .compact()
        .init();
}

fn key_from_virtual(code: VirtualKeyCode) -> Key {
    match code {
        VirtualKeyCode::Left => Key::ArrowLeft,
        VirtualKeyCode::Right => Key::ArrowRight,
        VirtualKeyCode::Down => Key::ArrowDown,
        VirtualKeyCode::Up => Key::ArrowUp,
        VirtualKeyCode::Space => Key::Space,
        VirtualKeyCode::Z => Key::KeyZ,
        VirtualKeyCode::X => Key::KeyX,
        _ => Key::Other,
    }
}

struct HostApp<E: RuleEngine> {
    session: HostSession<E>,
    layout: PanelLayout,
    input: InputQueue,
    focus: Option<FormField>,
    dirty: bool,
}

impl<E: RuleEngine> HostApp<E> {
    fn new(session: HostSession<E>) -> Self {
        Self {
            session,
            layout: PanelLayout::compute(),
            input: InputQueue::new(),
            focus: None,
            dirty: true,
        }
    }

    /// Keys typed while a form field has focus edit the form instead of the game.
    fn edit_field(&mut self, field: FormField, key: VirtualKeyCode) {
        match key {
            VirtualKeyCode::Back => {
                self.session.form_mut().field_mut(field).pop();
            }
            VirtualKeyCode::Return | VirtualKeyCode::NumpadEnter => {
                self.focus = None;
                self.session.apply_settings(Instant::now());
            }
            VirtualKeyCode::Escape => self.focus = None,
            VirtualKeyCode::Tab => {
                let next = FormField::ALL
                    .iter()
                    .position(|f| *f == field)
                    .map_or(0, |i| (i + 1) % FormField::ALL.len());
                self.focus = Some(FormField::ALL[next]);
            }
            _ => return,
        }
        self.dirty = true;
    }
}

impl<E: RuleEngine> AppHandler for HostApp<E> {
    fn key_pressed(&mut self, key: VirtualKeyCode, _ctx: &mut AppContext) {
        match self.focus {
            Some(field) => self.edit_field(field, key),
            None => self.input.push(key_from_virtual(key)),
        }
    }

    fn char_typed(&mut self, ch: char, _ctx: &mut AppContext) {
        let Some(field) = self.focus else {
            return;
        };
        let text = self.session.form_mut().field_mut(field);
        if (ch.is_ascii_digit() || ch == '-') && text.len() < MAX_FIELD_CHARS {
            text.push(ch);
            self.dirty = true;
        }
    }

    fn mouse_pressed(&mut self, x: u32, y: u32, _ctx: &mut AppContext) {
        self.focus = self.layout.field_at(x, y);
        match self.layout.button_at(x, y) {
            Some(PanelButton::Reset) => {
                self.session.apply_settings(Instant::now());
            }
            Some(PanelButton::Pause) => self.session.toggle_pause(Instant::now()),
            None => {}
        }
        self.dirty = true;
    }

    fn update(&mut self, now: Instant, ctx: &mut AppContext) -> Option<Instant> {
        if self.session.drain_input(&mut self.input) > 0 {
            self.dirty = true;
        }
        if self.session.poll_tick(now) {
            self.dirty = true;
        }
        if self.dirty {
            self.dirty = false;
            ctx.request_redraw();
        }
        self.session.scheduler().next_deadline()
    }

    fn draw(&mut self, r: &mut dyn Renderer2d) {
        draw_window(r, &self.layout, &self.session, self.focus);
    }
}

fn run_headless<E: RuleEngine>(session: &mut HostSession<E>, ticks: u32) {
    let mut ran = 0;
    while ran < ticks && session.is_running() {
        session.on_tick();
        ran += 1;
    }
    let hud = session.hud();
    println!("ticks: {ran}");
    println!("score: {}", hud.score);
    println!("lines: {}", hud.lines);
    println!("drops left: {}", hud.drops_left);
    println!("status: {}", hud.status.text);
    println!("board sha256: {}", session.surface().sha256_hex());
}

fn main() -> anyhow::Result<()> {
    setup_logging();
    let cli = Cli::parse();

    let config = load_config(&ConfigSource::parse(&cli.config));
    let store = cli
        .settings
        .map(SettingsStore::at)
        .unwrap_or_else(SettingsStore::from_env);
    let mut form = hydrate_form(&config, store.load());
    for (field, value) in [
        (FormField::Rows, cli.rows),
        (FormField::Cols, cli.cols),
        (FormField::Drops, cli.drops),
    ] {
        if let Some(value) = value {
            *form.field_mut(field) = value;
        }
    }

    let engine = match WasmRuleEngine::load(&cli.module) {
        Ok(engine) => Some(engine),
        Err(err) => {
            error!("engine module unavailable: {err:#}");
            None
        }
    };

    let scheduler = TickScheduler::new(Duration::from_millis(cli.tick_ms));
    let mut session =
        HostSession::new(engine, config, store, form, scheduler).with_seed(cli.seed);
    let outcome = session.bootstrap(Instant::now());
    info!(?outcome, "bootstrap finished");

    if let Some(ticks) = cli.headless_ticks {
        run_headless(&mut session, ticks);
        return Ok(());
    }

    let app_config = AppConfig {
        title: "Tetris".to_string(),
        desired_size: PhysicalSize::new(WINDOW_SIZE.width, WINDOW_SIZE.height),
        clamp_to_monitor: true,
        vsync: env_bool("TETRIS_HOST_VSYNC"),
    };
    run_app(app_config, HostApp::new(session)).map_err(|err| anyhow!("window loop failed: {err}"))
}
