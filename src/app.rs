use std::sync::Arc;

use glam::Vec2;
use log::{error, info, warn};
use pollster::FutureExt as _;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{
        DeviceEvent, DeviceId, ElementState, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent,
    },
    event_loop::ActiveEventLoop,
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use crate::{
    clock::AnimationClock,
    config::DemoConfig,
    errors::{DemoError, Result},
    renderer::{wgpu_context::WgpuContext, Renderer},
    scene_tree::Scene,
};

/// Pixels of a touchpad scroll that count as one wheel line.
const PIXELS_PER_LINE: f64 = 50.0;

struct RenderState<'surface> {
    wgpu_context: WgpuContext<'surface>,
    renderer: Renderer,
}

pub struct App<'surface> {
    config: DemoConfig,
    scene: Scene,
    clock: AnimationClock,
    state: Option<RenderState<'surface>>,
    mouse_btn_is_pressed: bool,
    /// First fatal error; the event loop exits once it is set.
    pub failure: Option<DemoError>,
}

impl App<'_> {
    pub fn new(config: DemoConfig, scene: Scene) -> Self {
        let clock = AnimationClock::new(config.frames_per_second);
        Self {
            config,
            scene,
            clock,
            state: None,
            mouse_btn_is_pressed: false,
            failure: None,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, e: DemoError) {
        error!("{e}");
        self.failure.get_or_insert(e);
        event_loop.exit();
    }

    fn request_redraw(&self) {
        if let Some(state) = &self.state {
            state.wgpu_context.window.request_redraw();
        }
    }

    fn resize(&mut self, size: PhysicalSize<u32>) {
        if let Some(state) = &mut self.state {
            if state.wgpu_context.resize(size) {
                state.renderer.resize(&state.wgpu_context);
            }
        }
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let Some(state) = &mut self.state else {
            return;
        };
        self.clock.tick();
        let Err(e) = state
            .renderer
            .render(&state.wgpu_context, &self.scene, &self.clock)
        else {
            return;
        };
        match FrameOutcome::of(&e) {
            FrameOutcome::Reconfigure => state.wgpu_context.reconfigure(),
            FrameOutcome::Skip => warn!("dropped frame: {e}"),
            FrameOutcome::Fatal => self.fail(event_loop, DemoError::Surface(e)),
        }
    }
}

/// What the event loop does after a frame fails to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameOutcome {
    Reconfigure,
    Skip,
    Fatal,
}

impl FrameOutcome {
    fn of(e: &wgpu::SurfaceError) -> Self {
        match e {
            wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => Self::Reconfigure,
            wgpu::SurfaceError::OutOfMemory => Self::Fatal,
            _ => Self::Skip,
        }
    }
}

fn create_render_state<'a>(
    event_loop: &ActiveEventLoop,
    config: &DemoConfig,
    scene: &mut Scene,
) -> Result<RenderState<'a>> {
    let attributes = Window::default_attributes()
        .with_title(config.window_title.clone())
        .with_inner_size(PhysicalSize::new(config.window_width, config.window_height));
    let window = Arc::new(event_loop.create_window(attributes)?);
    let wgpu_context = WgpuContext::new(window, config.backend.to_wgpu()).block_on()?;
    let max_binding_size = wgpu_context.device.limits().max_storage_buffer_binding_size;
    scene.drop_oversized_skinnings(u64::from(max_binding_size));
    let renderer = Renderer::new(&wgpu_context, scene, config.msaa_samples)?;
    Ok(RenderState {
        wgpu_context,
        renderer,
    })
}

impl ApplicationHandler for App<'_> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }
        match create_render_state(event_loop, &self.config, &mut self.scene) {
            Ok(state) => {
                info!("window ready");
                state.wgpu_context.window.request_redraw();
                self.state = Some(state);
            }
            Err(e) => self.fail(event_loop, e),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested
            | WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(KeyCode::Escape),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => event_loop.exit(),
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            WindowEvent::Resized(physical_size) => self.resize(physical_size),
            WindowEvent::ScaleFactorChanged { .. } => {
                let size = self.state.as_ref().map(|s| s.wgpu_context.window.inner_size());
                if let Some(size) = size {
                    self.resize(size);
                }
            }
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => {
                self.mouse_btn_is_pressed = state == ElementState::Pressed;
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let lines = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(pos) => (pos.y / PIXELS_PER_LINE) as f32,
                };
                self.scene.camera.zoom(lines);
            }
            _ => (),
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: DeviceId,
        event: DeviceEvent,
    ) {
        if let DeviceEvent::MouseMotion { delta: (x, y) } = event {
            if !self.mouse_btn_is_pressed {
                return;
            }
            let Some(state) = &self.state else {
                return;
            };
            let height = state.wgpu_context.surface_config.height as f32;
            self.scene
                .camera
                .rotate(Vec2::new(x as f32, y as f32), height);
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        self.request_redraw();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn surface_errors_map_to_frame_outcomes() {
        assert_eq!(
            FrameOutcome::of(&wgpu::SurfaceError::Lost),
            FrameOutcome::Reconfigure
        );
        assert_eq!(
            FrameOutcome::of(&wgpu::SurfaceError::Outdated),
            FrameOutcome::Reconfigure
        );
        assert_eq!(FrameOutcome::of(&wgpu::SurfaceError::Timeout), FrameOutcome::Skip);
        assert_eq!(FrameOutcome::of(&wgpu::SurfaceError::Other), FrameOutcome::Skip);
        assert_eq!(
            FrameOutcome::of(&wgpu::SurfaceError::OutOfMemory),
            FrameOutcome::Fatal
        );
    }

    #[test]
    fn out_of_memory_is_a_failure() {
        let e = DemoError::Surface(wgpu::SurfaceError::OutOfMemory);
        assert!(e.to_string().contains("surface"));
    }
}
