//! # Configuration
//!
//! Command line options, parsed with `clap`. The browser build uses the defaults.

use std::path::PathBuf;

use clap::Parser;

/// Start-up options for the viewer.
#[derive(Debug, Clone, Parser)]
#[command(name = "cube-flight", version, about = "Fly a free camera around a textured cube")]
pub struct Config {
    /// Initial window width in physical pixels
    #[arg(long, default_value_t = 800)]
    pub width: u32,

    /// Initial window height in physical pixels
    #[arg(long, default_value_t = 600)]
    pub height: u32,

    /// Window title
    #[arg(long, default_value = "Node Game Engine")]
    pub title: String,

    /// Frame cap; 0 leaves pacing to vsync
    #[arg(long, default_value_t = 30)]
    pub max_fps: u32,

    /// Image applied to every face of the cube (a checkerboard when omitted)
    #[arg(long)]
    pub texture: Option<PathBuf>,

    /// Vertical field of view in degrees
    #[arg(long, default_value_t = 90.0, value_parser = parse_fov)]
    pub fov: f32,

    /// Movement speed in units per second
    #[arg(long, default_value_t = 2.5, value_parser = parse_finite)]
    pub speed: f32,

    /// Degrees of rotation per mouse count
    #[arg(long, default_value_t = 0.07, value_parser = parse_finite)]
    pub sensitivity: f32,

    /// Initial yaw in degrees
    #[arg(long, default_value_t = 45.0, allow_hyphen_values = true, value_parser = parse_finite)]
    pub yaw: f32,

    /// Initial pitch in degrees, within ±89
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true, value_parser = parse_pitch)]
    pub pitch: f32,

    /// Cube rotation about the world up axis, in degrees per second
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true, value_parser = parse_finite)]
    pub spin: f32,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self::parse_from(["cube-flight"])
    }
}

impl Config {
    /// Default `env_logger` filter when `RUST_LOG` is not set. The GPU stack is
    /// kept at `warn` since it is very chatty at `info`.
    pub fn log_filter(&self) -> &'static str {
        if self.verbose {
            "debug,wgpu_core=info,wgpu_hal=info,naga=info"
        } else {
            "info,wgpu_core=warn,wgpu_hal=warn,naga=warn"
        }
    }
}

fn parse_finite(value: &str) -> Result<f32, String> {
    let number: f32 = value.parse().map_err(|e| format!("{e}"))?;
    if number.is_finite() {
        Ok(number)
    } else {
        Err(format!("expected a finite number, got {value}"))
    }
}

fn parse_fov(value: &str) -> Result<f32, String> {
    let fov = parse_finite(value)?;
    if fov > 0.0 && fov < 180.0 {
        Ok(fov)
    } else {
        Err(format!("field of view must be between 0 and 180 degrees, got {fov}"))
    }
}

fn parse_pitch(value: &str) -> Result<f32, String> {
    let pitch = parse_finite(value)?;
    if pitch.abs() <= crate::camera::PITCH_LIMIT {
        Ok(pitch)
    } else {
        Err(format!("pitch must be within ±{} degrees, got {pitch}", crate::camera::PITCH_LIMIT))
    }
}
