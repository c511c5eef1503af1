//! # Application Core (`app.rs`)
//!
//! The `App` struct is the `winit` application handler. It owns everything
//! that lives on the event loop thread: the window, the renderer, the `egui`
//! state, the [`Camera`], the held-input state and the [`FrameLimiter`].
//!
//! ## Frame Flow
//!
//! Every `RedrawRequested` event runs one frame:
//!
//! 1. The limiter marks the frame start and yields the time since the last one.
//! 2. Held movement keys move the camera, scaled by that delta (and by three
//!    while shift is held); accumulated mouse motion turns it.
//! 3. The overlay is laid out and tessellated.
//! 4. The renderer updates the uniforms from the camera and draws the frame.
//! 5. On desktop, the limiter sleeps away whatever is left of the frame budget
//!    through its adaptive pacer.
//!
//! ## Controls
//!
//! - **Left click**: capture the cursor for mouse look.
//! - **W/A/S/D** or **arrow keys**: move; **Shift**: sprint.
//! - **Escape**: release the cursor, or quit when it is not captured.
//! - **F1**: toggle the overlay.
//!
//! ## Platform-Specific Notes
//!
//! - **Desktop**: the renderer is created synchronously with `pollster`.
//! - **WebAssembly**: the renderer is created asynchronously and handed over
//!   through a `oneshot` channel; frames are paced by the browser, so the
//!   limiter never sleeps.

// Brings `JsCast::dyn_into` into scope for the canvas lookup.
#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

use std::sync::Arc;

use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{DeviceEvent, ElementState, KeyEvent, MouseButton, WindowEvent},
    event_loop::ActiveEventLoop,
    keyboard::{KeyCode, PhysicalKey},
    window::{CursorGrabMode, Theme, Window},
};

use crate::camera::Camera;
use crate::config::Config;
use crate::error::Error;
use crate::frame_timing::FrameLimiter;
use crate::input::InputState;
use crate::renderer::{Renderer, RendererOptions};
use crate::texture::TextureImage;

/// How far back from the cube the camera starts, along its initial line of sight.
const START_DISTANCE: f32 = 3.0;

/// Main application structure, driven by the `winit` event loop.
pub struct App {
    /// Start-up options.
    config: Config,

    /// The window, created on the first `resumed` event.
    window: Option<Arc<Window>>,

    /// The wgpu renderer. `None` until initialisation has finished, which on
    /// WebAssembly happens some time after the window exists.
    renderer: Option<Renderer>,

    /// `egui` integration with the window.
    gui_state: Option<egui_winit::State>,

    camera: Camera,

    input: InputState,

    /// Frame cap and frame-rate measurement. Its pacer keeps learning for the
    /// whole run.
    limiter: FrameLimiter,

    /// Receives the asynchronously created renderer on WebAssembly.
    #[cfg(target_arch = "wasm32")]
    renderer_receiver: Option<futures::channel::oneshot::Receiver<Renderer>>,

    /// Window size in physical pixels as of the last resize.
    last_size: (u32, u32),

    overlay_visible: bool,

    /// The error that stopped the event loop, if one did.
    fatal: Option<Error>,
}

impl Default for App {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl App {
    pub fn new(config: Config) -> Self {
        Self {
            camera: initial_camera(&config),
            input: InputState::new(),
            limiter: FrameLimiter::new(config.max_fps),
            window: None,
            renderer: None,
            gui_state: None,
            #[cfg(target_arch = "wasm32")]
            renderer_receiver: None,
            last_size: (config.width, config.height),
            overlay_visible: true,
            fatal: None,
            config,
        }
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Takes the error that ended the event loop, if any.
    pub fn take_error(&mut self) -> Option<Error> {
        self.fatal.take()
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: Error) {
        log::error!("{error}");
        self.fatal = Some(error);
        event_loop.exit();
    }
}

/// The configured camera, backed off from the origin so the cube is in view.
fn initial_camera(config: &Config) -> Camera {
    let mut camera = Camera::default();
    camera.set_orientation(config.yaw, config.pitch);
    camera.set_position(-camera.front() * START_DISTANCE);
    camera.set_speed(config.speed);
    camera.set_sensitivity(config.sensitivity);
    camera.set_fov(config.fov);
    camera
}

/// Grabs (or releases) and hides (or shows) the cursor for mouse look. Mouse
/// motion only reaches the camera while captured.
fn capture_cursor(window: &Window, input: &mut InputState, captured: bool) {
    if captured {
        let grabbed = window
            .set_cursor_grab(CursorGrabMode::Locked)
            .or_else(|_| window.set_cursor_grab(CursorGrabMode::Confined));
        if let Err(error) = grabbed {
            log::warn!("Could not capture the cursor: {error}");
            return;
        }
    } else if let Err(error) = window.set_cursor_grab(CursorGrabMode::None) {
        log::warn!("Could not release the cursor: {error}");
    }

    window.set_cursor_visible(!captured);
    input.set_captured(captured);
}

fn draw_overlay(ctx: &egui::Context, camera: &mut Camera, limiter: &FrameLimiter, captured: bool) {
    egui::Window::new("Camera")
        .default_pos([12.0, 12.0])
        .resizable(false)
        .show(ctx, |ui| {
            let cap = match limiter.target_fps() {
                0 => "uncapped".to_owned(),
                fps => format!("cap {fps}"),
            };
            ui.label(format!("{:.1} fps ({cap})", limiter.fps()));

            let position = camera.position();
            ui.label(format!(
                "Position: ({:.2}, {:.2}, {:.2})",
                position.x, position.y, position.z
            ));
            ui.label(format!("Yaw {:.1}°  Pitch {:.1}°", camera.yaw(), camera.pitch()));

            let pacer = limiter.pacer();
            ui.label(format!(
                "Sleep estimate: {:.3} ms ({} samples)",
                pacer.estimate().as_secs_f64() * 1e3,
                pacer.samples()
            ));

            ui.separator();

            let mut speed = camera.speed();
            if ui.add(egui::Slider::new(&mut speed, 0.5..=20.0).text("Speed")).changed() {
                camera.set_speed(speed);
            }

            let mut sensitivity = camera.sensitivity();
            if ui
                .add(egui::Slider::new(&mut sensitivity, 0.01..=0.5).text("Sensitivity"))
                .changed()
            {
                camera.set_sensitivity(sensitivity);
            }

            let mut fov = camera.fov();
            if ui.add(egui::Slider::new(&mut fov, 30.0..=120.0).text("Field of view")).changed() {
                camera.set_fov(fov);
            }

            ui.separator();
            ui.label(if captured {
                "Esc releases the cursor"
            } else {
                "Click the scene to look around"
            });
            ui.label("WASD / arrows move, Shift sprints, F1 hides this panel");
        });
}

impl ApplicationHandler for App {
    /// Creates the window, the `egui` state and the renderer the first time the
    /// application is resumed.
    ///
    /// Window and renderer failures are fatal: they are logged, kept for
    /// [`App::take_error`] and the event loop is asked to exit.
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        #[allow(unused_mut)]
        let mut attributes = Window::default_attributes()
            .with_title(self.config.title.as_str())
            .with_inner_size(PhysicalSize::new(self.config.width, self.config.height));

        // On the web the window renders into the page's `#canvas` element.
        #[cfg(target_arch = "wasm32")]
        {
            use winit::platform::web::WindowAttributesExtWebSys;

            let canvas = wgpu::web_sys::window()
                .and_then(|window| window.document())
                .and_then(|document| document.get_element_by_id("canvas"))
                .and_then(|element| element.dyn_into::<wgpu::web_sys::HtmlCanvasElement>().ok());

            match canvas {
                Some(canvas) => {
                    self.last_size = (canvas.width(), canvas.height());
                    attributes = attributes.with_canvas(Some(canvas));
                }
                None => log::warn!("No #canvas element found, letting winit create one"),
            }
        }

        let window_handle = match event_loop.create_window(attributes) {
            Ok(window) => Arc::new(window),
            Err(error) => {
                self.fail(event_loop, error.into());
                return;
            }
        };
        self.window = Some(window_handle.clone());

        let gui_context = egui::Context::default();

        #[cfg(not(target_arch = "wasm32"))]
        {
            let inner_size = window_handle.inner_size();
            self.last_size = (inner_size.width, inner_size.height);
        }

        #[cfg(target_arch = "wasm32")]
        {
            gui_context.set_pixels_per_point(window_handle.scale_factor() as f32);
        }

        let viewport_id = gui_context.viewport_id();
        self.gui_state = Some(egui_winit::State::new(
            gui_context,
            viewport_id,
            &window_handle,
            Some(window_handle.scale_factor() as _),
            Some(Theme::Dark),
            None,
        ));

        let options = RendererOptions {
            // A frame cap paces the loop by itself; only uncapped runs need vsync.
            vsync: self.config.max_fps == 0,
            image: TextureImage::open_or_checkerboard(self.config.texture.as_deref()),
            spin: self.config.spin,
        };
        let (width, height) = self.last_size;

        #[cfg(not(target_arch = "wasm32"))]
        {
            let renderer = pollster::block_on(Renderer::new(
                window_handle.clone(),
                width,
                height,
                options,
            ));
            match renderer {
                Ok(renderer) => self.renderer = Some(renderer),
                Err(error) => {
                    self.fail(event_loop, error);
                    return;
                }
            }
        }

        #[cfg(target_arch = "wasm32")]
        {
            let (sender, receiver) = futures::channel::oneshot::channel();
            self.renderer_receiver = Some(receiver);
            log::info!("Canvas dimensions: ({width} x {height})");
            let window = window_handle.clone();
            wasm_bindgen_futures::spawn_local(async move {
                // On failure the sender is dropped and the receiver sees the
                // cancellation.
                match Renderer::new(window, width, height, options).await {
                    Ok(renderer) => {
                        if sender.send(renderer).is_err() {
                            log::error!("Failed to hand over the renderer!");
                        }
                    }
                    Err(error) => log::error!("{error}"),
                }
            });
        }

        log::info!("Window ready at {width}x{height}");
        window_handle.request_redraw();
    }

    /// Raw mouse motion, used for mouse look. Unlike cursor positions it keeps
    /// arriving while the cursor is locked.
    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: winit::event::DeviceId,
        event: DeviceEvent,
    ) {
        if let DeviceEvent::MouseMotion { delta: (dx, dy) } = event {
            self.input.accumulate_mouse(dx, dy);
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        #[cfg(target_arch = "wasm32")]
        if let Some(receiver) = self.renderer_receiver.as_mut() {
            match receiver.try_recv() {
                Ok(Some(renderer)) => {
                    self.renderer = Some(renderer);
                    self.renderer_receiver = None;
                }
                Ok(None) => {}
                Err(_) => {
                    self.renderer_receiver = None;
                    self.fail(event_loop, Error::RendererCancelled);
                    return;
                }
            }
        }

        let (Some(gui_state), Some(renderer), Some(window)) = (
            self.gui_state.as_mut(),
            self.renderer.as_mut(),
            self.window.as_ref(),
        ) else {
            return;
        };

        // While the cursor is captured the overlay is not interactive.
        let consumed = !self.input.captured() && gui_state.on_window_event(window, &event).consumed;

        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested. Exiting...");
                event_loop.exit();
            }
            WindowEvent::Resized(PhysicalSize { width, height }) => {
                log::info!("Resizing renderer surface to: ({width}, {height})");
                renderer.resize(width, height);
                self.last_size = (width, height);
            }
            WindowEvent::Focused(false) => {
                self.input.clear();
                if self.input.captured() {
                    capture_cursor(window, &mut self.input, false);
                }
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key_code),
                        state,
                        repeat,
                        ..
                    },
                ..
            } => {
                let pressed = state == ElementState::Pressed;

                // Releases always go through so keys cannot get stuck when the
                // overlay swallowed the matching press.
                if !pressed || !consumed {
                    self.input.handle_key(key_code, pressed);
                }

                if pressed && !repeat && !consumed {
                    match key_code {
                        KeyCode::Escape if self.input.captured() => {
                            capture_cursor(window, &mut self.input, false);
                        }
                        KeyCode::Escape => event_loop.exit(),
                        KeyCode::F1 => self.overlay_visible = !self.overlay_visible,
                        _ => {}
                    }
                }
            }
            WindowEvent::MouseInput {
                state: ElementState::Pressed,
                button: MouseButton::Left,
                ..
            } if !consumed && !self.input.captured() => {
                capture_cursor(window, &mut self.input, true);
            }
            WindowEvent::RedrawRequested => {
                let delta_time = self.limiter.begin_frame();

                let movement_time = delta_time.as_secs_f32() * self.input.time_scale();
                for movement in self.input.movements() {
                    self.camera.process_keyboard(movement, movement_time);
                }

                let (x_offset, y_offset) = self.input.take_mouse_delta();
                if x_offset != 0.0 || y_offset != 0.0 {
                    self.camera.process_mouse_movement(x_offset, y_offset, true);
                }

                let gui_input = gui_state.take_egui_input(window);
                gui_state.egui_ctx().begin_pass(gui_input);

                if self.overlay_visible {
                    draw_overlay(
                        gui_state.egui_ctx(),
                        &mut self.camera,
                        &self.limiter,
                        self.input.captured(),
                    );
                }

                let egui::FullOutput {
                    textures_delta,
                    shapes,
                    pixels_per_point,
                    platform_output,
                    ..
                } = gui_state.egui_ctx().end_pass();

                gui_state.handle_platform_output(window, platform_output);

                let paint_jobs = gui_state.egui_ctx().tessellate(shapes, pixels_per_point);

                let screen_descriptor = {
                    let (width, height) = self.last_size;
                    egui_wgpu::ScreenDescriptor {
                        size_in_pixels: [width, height],
                        pixels_per_point: window.scale_factor() as f32,
                    }
                };

                match renderer.render_frame(
                    screen_descriptor,
                    paint_jobs,
                    textures_delta,
                    &self.camera,
                    delta_time,
                ) {
                    Ok(()) => {}
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        log::debug!("Surface lost or outdated, reconfiguring");
                        renderer.recover_surface();
                    }
                    Err(wgpu::SurfaceError::OutOfMemory) => {
                        log::error!("Out of GPU memory. Exiting...");
                        event_loop.exit();
                    }
                    Err(error) => log::warn!("Skipping frame: {error}"),
                }

                #[cfg(not(target_arch = "wasm32"))]
                if let Some(pace) = self.limiter.wait() {
                    log::trace!(
                        "Paced {:?} ({} sleeps, {:?} spinning)",
                        pace.total(),
                        pace.coarse_sleeps,
                        pace.spin
                    );
                }
            }
            _ => (),
        }

        window.request_redraw();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camera_starts_looking_at_the_cube() {
        let app = App::new(Config::default());
        let camera = app.camera();

        let to_origin = nalgebra_glm::normalize(&(-camera.position()));
        assert!(nalgebra_glm::distance(&to_origin, &camera.front()) < 1e-5);
        assert!((nalgebra_glm::length(&camera.position()) - START_DISTANCE).abs() < 1e-5);
    }

    #[test]
    fn camera_takes_its_tuning_from_the_config() {
        let config = Config {
            speed: 7.0,
            sensitivity: 0.2,
            fov: 60.0,
            yaw: -90.0,
            pitch: 10.0,
            ..Config::default()
        };
        let camera = initial_camera(&config);

        assert_eq!(camera.speed(), 7.0);
        assert_eq!(camera.sensitivity(), 0.2);
        assert_eq!(camera.fov(), 60.0);
        assert_eq!((camera.yaw(), camera.pitch()), (-90.0, 10.0));
    }
}
