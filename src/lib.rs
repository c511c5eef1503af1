//! # Cube Flight
//!
//! A small free-flying camera demo: a textured cube rendered with wgpu, a
//! first-person camera driven by the keyboard and mouse, and a frame limiter
//! whose sleeps are learned at runtime so frames land on time without burning
//! a core.
//!
//! ## Modules
//!
//! - [`app`]: The `winit` application handler. Owns the window and routes input.
//! - [`camera`]: Yaw/pitch camera, its orthonormal basis and the view/projection matrices.
//! - [`pacer`]: Adaptive precise sleep (coarse sleeps plus a spin-wait) with online statistics.
//! - [`frame_timing`]: Frame cap and frame-rate measurement on top of the pacer.
//! - [`input`]: Held keys and accumulated mouse motion, turned into camera movement.
//! - [`config`]: Command line options.
//! - [`renderer`], [`gpu`], [`scene`]: Surface and device setup, the cube pipeline and the overlay pass.
//! - [`texture`]: Image decoding, mip generation and upload.
//! - [`vertex`], [`uniform_buffer`], [`uniform_binding`]: Cube geometry and the transform uniforms.
//!
//! ## Coordinate System
//!
//! World space is right-handed with +Y up. The camera looks along its `front`
//! vector, which the view matrix maps onto -Z. Clip-space depth runs from 0 to
//! 1 as wgpu expects.
//!
//! ## Usage
//!
//! ```ignore
//! use clap::Parser;
//!
//! let config = cube_flight::Config::parse();
//! cube_flight::run(config)?;
//! ```
//!
//! The camera is usable without a window:
//!
//! ```
//! use cube_flight::{Camera, Movement};
//!
//! let mut camera = Camera::default();
//! camera.process_keyboard(Movement::Forward, 0.5);
//! let view = camera.view_matrix();
//! assert!(view[15] == 1.0);
//! ```

mod app;
mod camera;
mod config;
mod error;
mod frame_timing;
mod gpu;
mod input;
mod pacer;
mod renderer;
mod scene;
mod texture;
mod uniform_binding;
mod uniform_buffer;
mod vertex;

use web_time::Duration;
use winit::event_loop::EventLoop;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

pub use crate::app::App;
pub use crate::camera::{Basis, Camera, Movement, PITCH_LIMIT};
pub use crate::config::Config;
pub use crate::error::{Error, Result};
pub use crate::frame_timing::FrameLimiter;
pub use crate::gpu::Gpu;
pub use crate::input::InputState;
pub use crate::pacer::{Clock, Pace, Pacer, SystemClock};
pub use crate::renderer::{Renderer, RendererOptions};
pub use crate::scene::Scene;
pub use crate::texture::{Texture, TextureImage};
pub use crate::uniform_binding::UniformBinding;
pub use crate::uniform_buffer::UniformBuffer;
pub use crate::vertex::{Vertex, VERTICES};

/// Two triangles per cube face, indexing the four corners each face owns in
/// [`VERTICES`]. Both triangles keep the face's counter-clockwise winding.
#[rustfmt::skip]
pub const INDICES: [u32; 36] = [
     0,  1,  2,  2,  3,  0, // +Z
     4,  5,  6,  6,  7,  4, // -Z
     8,  9, 10, 10, 11,  8, // +X
    12, 13, 14, 14, 15, 12, // -X
    16, 17, 18, 18, 19, 16, // +Y
    20, 21, 22, 22, 23, 20, // -Y
];

/// WGSL for the cube: `model`, `view` and `projection` at `@group(0)`, the
/// texture and its sampler at `@group(1)`.
pub const SHADER_SOURCE: &str = include_str!("shader_source.wgsl");

/// Opens the window and runs the event loop until the user quits.
///
/// Returns the error that stopped the loop early, if any: window creation,
/// surface, adapter or device failures.
#[cfg(not(target_arch = "wasm32"))]
pub fn run(config: Config) -> Result<()> {
    let event_loop = EventLoop::new()?;
    let mut app = App::new(config);
    event_loop.run_app(&mut app)?;

    match app.take_error() {
        Some(error) => Err(error),
        None => Ok(()),
    }
}

/// Browser entry point. Logs to the console and hands the application to the
/// browser's event loop.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn start() -> std::result::Result<(), JsValue> {
    use winit::platform::web::EventLoopExtWebSys;

    std::panic::set_hook(Box::new(console_error_panic_hook::hook));
    console_log::init_with_level(log::Level::Info)
        .map_err(|error| JsValue::from_str(&error.to_string()))?;

    let event_loop = EventLoop::new().map_err(|error| JsValue::from_str(&error.to_string()))?;
    event_loop.spawn_app(App::new(Config::default()));
    Ok(())
}
