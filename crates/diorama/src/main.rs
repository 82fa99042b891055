//! Snowfall diorama viewer.
//!
//! A snowy ground, two imported models, layered fog and a drifting snow
//! field, watched through an orbit camera. The spacesuit grows while the
//! pointer is over it.

mod app;
mod assets;
mod config;
mod frame;
mod hover;
mod particles;
mod render;
mod scene;

use anyhow::Result;
use app::DioramaApp;
use std::sync::Arc;
use winit::{
    application::ApplicationHandler,
    event::{DeviceEvent, DeviceId, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{Window, WindowId},
};

/// Application handler for winit.
struct App {
    state: Option<DioramaApp>,
}

impl App {
    fn new() -> Self {
        Self { state: None }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_none() {
            let config = config::DioramaConfig::load();
            let window_attrs = Window::default_attributes()
                .with_title("Snowfall Diorama")
                .with_inner_size(winit::dpi::LogicalSize::new(config.window_width, config.window_height));

            let window = match event_loop.create_window(window_attrs) {
                Ok(w) => Arc::new(w),
                Err(e) => {
                    log::error!("Failed to create window: {}", e);
                    event_loop.exit();
                    return;
                }
            };

            match pollster::block_on(DioramaApp::new(window.clone(), &config)) {
                Ok(s) => {
                    self.state = Some(s);
                    window.request_redraw();
                }
                Err(e) => {
                    log::error!("Failed to initialize diorama: {:#}", e);
                    event_loop.exit();
                }
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, id: WindowId, event: WindowEvent) {
        if let Some(state) = &mut self.state {
            if state.window().id() == id && state.handle_window_event(event) {
                event_loop.exit();
            }
        }
    }

    fn device_event(&mut self, _: &ActiveEventLoop, _: DeviceId, event: DeviceEvent) {
        if let Some(state) = &mut self.state {
            state.handle_device_event(event);
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Starting snowfall diorama (left drag: orbit, right drag: pan, wheel: zoom, Esc: quit)");

    let event_loop = EventLoop::new()?;
    // Redraws are re-armed at the end of every tick; Poll keeps input handling prompt between them.
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new();
    event_loop.run_app(&mut app)?;

    Ok(())
}
