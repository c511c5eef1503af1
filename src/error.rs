//! # Errors
//!
//! Every fallible step of the demo funnels into [`Error`]. Window, surface,
//! adapter and device failures are fatal and end the event loop; texture
//! failures are recovered from by [`crate::TextureImage::open_or_checkerboard`],
//! which swaps in a generated checkerboard instead of binding a
//! half-initialised texture. Images larger than the device allows are scaled
//! down before upload.

use std::path::PathBuf;

/// Errors raised while setting up the window, the GPU or the scene resources.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to build the event loop: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),

    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),

    #[error("failed to create surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),

    #[error("no compatible graphics adapter found")]
    NoAdapter,

    #[error("failed to request device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),

    #[error("surface reports no supported texture formats")]
    NoSurfaceFormat,

    #[error("failed to load texture {}: {source}", .path.display())]
    Texture {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("world up vector must have a non-zero length")]
    DegenerateWorldUp,

    #[error("renderer initialisation was cancelled")]
    RendererCancelled,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
