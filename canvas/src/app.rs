//! One window, one handler: `run_app` owns the `winit` loop and turns raw window events into
//! handler callbacks.

use std::error::Error;
use std::time::Instant;

use pixels::{Pixels, PixelsBuilder, SurfaceTexture};
use tracing::{error, warn};
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, Event, KeyboardInput, MouseButton, VirtualKeyCode, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::window::{Window, WindowBuilder};

use crate::graphics::Renderer2d;
use crate::pixels_renderer::PixelsRenderer2d;
use crate::surface::SurfaceSize;

pub struct AppConfig {
    pub title: String,
    pub desired_size: PhysicalSize<u32>,
    pub clamp_to_monitor: bool,
    pub vsync: Option<bool>,
}

pub struct AppContext {
    pub window: Window,
    pub surface_size: SurfaceSize,
    /// Last cursor position in frame pixels.
    pub cursor: (u32, u32),
}

impl AppContext {
    pub fn request_redraw(&self) {
        self.window.request_redraw();
    }
}

/// Window callbacks. Each runs to completion before the next event is delivered.
pub trait AppHandler {
    fn init(&mut self, _ctx: &mut AppContext) -> Result<(), Box<dyn Error>> {
        Ok(())
    }

    fn key_pressed(&mut self, _key: VirtualKeyCode, _ctx: &mut AppContext) {}

    fn char_typed(&mut self, _ch: char, _ctx: &mut AppContext) {}

    /// Left button press at frame coordinates `(x, y)`.
    fn mouse_pressed(&mut self, _x: u32, _y: u32, _ctx: &mut AppContext) {}

    /// Called once per loop turn after all pending input. Returns when the loop must wake up
    /// next; `None` sleeps until the next window event.
    fn update(&mut self, now: Instant, ctx: &mut AppContext) -> Option<Instant>;

    fn draw(&mut self, r: &mut dyn Renderer2d);
}

fn initial_size(event_loop: &EventLoop<()>, config: &AppConfig) -> PhysicalSize<u32> {
    let desired = config.desired_size;
    match event_loop.primary_monitor().filter(|_| config.clamp_to_monitor) {
        Some(monitor) => {
            let max = monitor.size();
            PhysicalSize::new(desired.width.min(max.width), desired.height.min(max.height))
        }
        None => desired,
    }
}

/// Opens the window and runs `handler` until the window is closed.
pub fn run_app<H: AppHandler + 'static>(
    config: AppConfig,
    mut handler: H,
) -> Result<(), Box<dyn Error>> {
    let event_loop = EventLoop::new();
    let window = WindowBuilder::new()
        .with_title(config.title.as_str())
        .with_inner_size(initial_size(&event_loop, &config))
        .build(&event_loop)?;

    let inner = window.inner_size();
    let surface_size = SurfaceSize::new(inner.width.max(1), inner.height.max(1));
    let pixels: Pixels = {
        let texture = SurfaceTexture::new(surface_size.width, surface_size.height, &window);
        let mut builder = PixelsBuilder::new(surface_size.width, surface_size.height, texture);
        if let Some(vsync) = config.vsync {
            builder = builder.enable_vsync(vsync);
        }
        builder.build()?
    };
    let mut renderer = PixelsRenderer2d::new(pixels, surface_size)?;

    let mut ctx = AppContext {
        window,
        surface_size,
        cursor: (0, 0),
    };
    handler.init(&mut ctx)?;

    event_loop.run(move |event, _, control_flow| match event {
        Event::WindowEvent { event, .. } => match event {
            WindowEvent::CloseRequested => *control_flow = ControlFlow::Exit,
            WindowEvent::Resized(size) => {
                ctx.surface_size = SurfaceSize::new(size.width, size.height);
                if let Err(err) = renderer.resize(ctx.surface_size) {
                    warn!("resize failed: {err}");
                }
                ctx.request_redraw();
            }
            WindowEvent::CursorMoved { position, .. } => {
                ctx.cursor = (position.x.max(0.0) as u32, position.y.max(0.0) as u32);
            }
            WindowEvent::MouseInput {
                state: ElementState::Pressed,
                button: MouseButton::Left,
                ..
            } => {
                let (x, y) = ctx.cursor;
                handler.mouse_pressed(x, y, &mut ctx);
            }
            WindowEvent::KeyboardInput {
                input:
                    KeyboardInput {
                        state: ElementState::Pressed,
                        virtual_keycode: Some(key),
                        ..
                    },
                ..
            } => handler.key_pressed(key, &mut ctx),
            WindowEvent::ReceivedCharacter(ch) => handler.char_typed(ch, &mut ctx),
            _ => {}
        },
        Event::MainEventsCleared => {
            let wake = handler.update(Instant::now(), &mut ctx);
            *control_flow = wake.map_or(ControlFlow::Wait, ControlFlow::WaitUntil);
        }
        Event::RedrawRequested(_) => {
            if let Err(err) = renderer.render(|r| handler.draw(r)) {
                error!("present failed: {err}");
                *control_flow = ControlFlow::Exit;
            }
        }
        _ => {}
    });
}
