//! Window-side application state and event handling.

use crate::assets::AssetLoader;
use crate::config::DioramaConfig;
use crate::frame::{FrameLoop, TickOutcome};
use crate::render::SceneGpu;
use crate::scene::{SceneComposer, SceneContext};
use anyhow::Result;
use input::{InputState, KeyCode};
use renderer::Renderer;
use std::sync::Arc;
use winit::event::{DeviceEvent, MouseScrollDelta, WindowEvent};
use winit::window::Window;

/// Pixels per wheel line for touchpads that report pixel deltas.
const PIXELS_PER_LINE: f32 = 40.0;

pub struct DioramaApp {
    window: Arc<Window>,
    gpu: SceneGpu,
    ctx: SceneContext,
    frame_loop: FrameLoop,
    input: InputState,
}

impl DioramaApp {
    pub async fn new(window: Arc<Window>, config: &DioramaConfig) -> Result<Self> {
        let renderer = Renderer::new(window.clone(), config.vsync).await?;
        let mut gpu = SceneGpu::new(renderer);
        let mut ctx = SceneComposer::compose(config, &mut gpu);

        let size = window.inner_size();
        ctx.camera.set_aspect(size.width, size.height);
        let mut input = InputState::new();
        input.set_viewport(size.width, size.height);

        let loader = AssetLoader::new();
        SceneComposer::request_assets(config, &loader);

        Ok(Self {
            window,
            gpu,
            ctx,
            frame_loop: FrameLoop::new(loader),
            input,
        })
    }

    pub fn window(&self) -> &Arc<Window> {
        &self.window
    }

    /// Handle a window event. Returns true when the app should exit.
    pub fn handle_window_event(&mut self, event: WindowEvent) -> bool {
        match event {
            WindowEvent::CloseRequested => {
                self.frame_loop.stop();
                true
            }
            WindowEvent::Resized(size) => {
                self.gpu.renderer.resize(size);
                self.ctx.camera.set_aspect(size.width, size.height);
                self.input.set_viewport(size.width, size.height);
                false
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if let winit::keyboard::PhysicalKey::Code(key) = event.physical_key {
                    self.input.process_keyboard(key, event.state);
                }
                if self.input.is_key_pressed(KeyCode::Escape) {
                    self.frame_loop.stop();
                    return true;
                }
                false
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.input.process_cursor_position((position.x, position.y));
                self.ctx.pointer = self.input.pointer();
                false
            }
            WindowEvent::MouseInput { state, button, .. } => {
                self.input.process_mouse_button(button, state);
                false
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let lines = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(p) => p.y as f32 / PIXELS_PER_LINE,
                };
                self.input.process_scroll(lines);
                false
            }
            WindowEvent::RedrawRequested => self.redraw(),
            _ => false,
        }
    }

    pub fn handle_device_event(&mut self, event: DeviceEvent) {
        if let DeviceEvent::MouseMotion { delta } = event {
            self.input.process_mouse_motion(delta);
        }
    }

    fn redraw(&mut self) -> bool {
        self.input.begin_frame();
        self.apply_orbit_input();

        match self.frame_loop.tick(&mut self.ctx, &mut self.gpu) {
            Ok(TickOutcome::Continue) => {
                self.window.request_redraw();
                false
            }
            Ok(TickOutcome::Stopped) => true,
            Err(e) => {
                log::error!("Frame failed: {:#}", e);
                self.frame_loop.stop();
                true
            }
        }
    }

    fn apply_orbit_input(&mut self) {
        let delta = self.input.mouse_delta();
        let height = self.input.viewport().y;
        if self.input.is_orbiting() {
            self.ctx.camera.rotate(delta, height);
        } else if self.input.is_panning() {
            self.ctx.camera.pan(delta, height);
        }
        self.ctx.camera.zoom(self.input.scroll());
    }
}
