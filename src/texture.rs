//! # Texture
//!
//! Loading and uploading the image applied to the cube.
//!
//! Decoding happens on the CPU through the `image` crate into a
//! [`TextureImage`]; any colour type it supports (grey, RGB, RGBA, 8 or 16 bit)
//! is normalised to 8-bit RGBA. A full mip chain is generated on the CPU before
//! upload, since wgpu has no built-in mipmap generation.
//!
//! A texture that fails to decode is reported as [`Error::Texture`] and never
//! reaches the GPU. Callers fall back to [`TextureImage::checkerboard`].

use std::path::Path;

use image::{imageops::FilterType, Rgba, RgbaImage};

use crate::error::{Error, Result};

/// A decoded image ready for upload.
#[derive(Debug, Clone)]
pub struct TextureImage {
    pub rgba: RgbaImage,
    /// Whether the source carried an alpha channel. Such images are clamped at
    /// the edges instead of repeated, so interpolation does not bleed the
    /// opposite border into semi-transparent edges.
    pub has_alpha: bool,
    pub label: String,
}

impl TextureImage {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let decoded = image::open(path).map_err(|source| Error::Texture {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(Self {
            has_alpha: decoded.color().has_alpha(),
            rgba: decoded.to_rgba8(),
            label: path.display().to_string(),
        })
    }

    /// Loads `path` if given, otherwise (or when it cannot be decoded) returns
    /// the default checkerboard. Decode failures are logged, never bound.
    pub fn open_or_checkerboard(path: Option<&Path>) -> Self {
        match path.map(Self::open) {
            Some(Ok(image)) => image,
            Some(Err(error)) => {
                log::warn!("{error}; using the checkerboard texture instead");
                Self::checkerboard(256, 8)
            }
            None => Self::checkerboard(256, 8),
        }
    }

    /// Two-tone checkerboard of `cells × cells` squares on a `size × size` image.
    pub fn checkerboard(size: u32, cells: u32) -> Self {
        let cell = (size / cells.max(1)).max(1);
        let light = Rgba([0xd9, 0xcf, 0xb8, 0xff]);
        let dark = Rgba([0x4a, 0x5a, 0x6a, 0xff]);

        let rgba = RgbaImage::from_fn(size, size, |x, y| {
            if (x / cell + y / cell) % 2 == 0 {
                light
            } else {
                dark
            }
        });

        Self {
            rgba,
            has_alpha: false,
            label: "checkerboard".to_owned(),
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.rgba.dimensions()
    }

    pub fn address_mode(&self) -> wgpu::AddressMode {
        if self.has_alpha {
            wgpu::AddressMode::ClampToEdge
        } else {
            wgpu::AddressMode::Repeat
        }
    }

    /// A copy scaled down so neither side exceeds `max_dimension`, keeping the
    /// aspect ratio. `None` when the image already fits.
    pub fn fit_within(&self, max_dimension: u32) -> Option<Self> {
        let (width, height) = self.dimensions();
        let larger = width.max(height);
        if larger <= max_dimension {
            return None;
        }

        let scale = |side: u32| {
            (u64::from(side) * u64::from(max_dimension) / u64::from(larger)).max(1) as u32
        };
        let rgba = image::imageops::resize(
            &self.rgba,
            scale(width),
            scale(height),
            FilterType::Triangle,
        );

        Some(Self {
            rgba,
            has_alpha: self.has_alpha,
            label: self.label.clone(),
        })
    }

    /// Number of mip levels down to 1×1.
    pub fn mip_level_count(&self) -> u32 {
        let (width, height) = self.dimensions();
        u32::BITS - width.max(height).max(1).leading_zeros()
    }

    /// The base image followed by successively halved, triangle-filtered levels.
    pub fn mip_chain(&self) -> Vec<RgbaImage> {
        let mut levels = vec![self.rgba.clone()];
        for _ in 1..self.mip_level_count() {
            let Some(previous) = levels.last() else {
                break;
            };
            let (width, height) = previous.dimensions();
            let next = image::imageops::resize(
                previous,
                (width / 2).max(1),
                (height / 2).max(1),
                FilterType::Triangle,
            );
            levels.push(next);
        }
        levels
    }
}

/// An uploaded texture with its sampler, exposed to the fragment stage at
/// `@group(1)`: the view at binding 0 and the sampler at binding 1.
pub struct Texture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl Texture {
    /// Group index the shader declares the texture at.
    pub const GROUP: u32 = 1;

    // The surface is configured non-sRGB, so texel values are passed through
    // untouched rather than being linearised on sampling.
    const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

    /// Uploads `image`, first scaling it down if it exceeds the device's
    /// maximum 2D texture size.
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue, image: &TextureImage) -> Self {
        let max_dimension = device.limits().max_texture_dimension_2d;
        let fitted = image.fit_within(max_dimension);
        if let Some(fitted) = &fitted {
            log::warn!(
                "Texture '{}' is {:?}, above the device limit of {max_dimension}; scaled to {:?}",
                image.label,
                image.dimensions(),
                fitted.dimensions()
            );
        }
        let image = fitted.as_ref().unwrap_or(image);

        let (width, height) = image.dimensions();
        let mip_level_count = image.mip_level_count();

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(image.label.as_str()),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        for (mip_level, level) in (0..).zip(image.mip_chain()) {
            let (level_width, level_height) = level.dimensions();
            queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    texture: &texture,
                    mip_level,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                &level,
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(level_width * 4),
                    rows_per_image: Some(level_height),
                },
                wgpu::Extent3d {
                    width: level_width,
                    height: level_height,
                    depth_or_array_layers: 1,
                },
            );
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let address_mode = image.address_mode();
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Cube Sampler"),
            address_mode_u: address_mode,
            address_mode_v: address_mode,
            address_mode_w: address_mode,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("texture_bind_group_layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("texture_bind_group"),
            layout: &bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
        });

        log::info!(
            "Uploaded texture '{}' ({width}x{height}, {mip_level_count} mip levels)",
            image.label
        );

        Self {
            texture,
            view,
            sampler,
            bind_group,
            bind_group_layout,
        }
    }
}
