// src/services/filter_engine.rs
use crate::errors::StudioError;
use image::{DynamicImage, ImageOutputFormat, RgbImage, imageops};
use log::{error, info, warn};
use std::io::Cursor;
use std::path::{Path, PathBuf};

pub const OUTPUT_JPEG_QUALITY: u8 = 90;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendMode {
    Overlay,
    SoftLight,
    HardLight,
    Multiply,
    ColorDodge,
}

impl BlendMode {
    /// Separable blend of one channel, both operands in 0..=1.
    fn mix(self, base: f32, top: f32) -> f32 {
        match self {
            BlendMode::Multiply => base * top,
            BlendMode::Overlay => BlendMode::HardLight.mix(top, base),
            BlendMode::HardLight => {
                if top <= 0.5 {
                    2.0 * base * top
                } else {
                    1.0 - 2.0 * (1.0 - base) * (1.0 - top)
                }
            }
            BlendMode::SoftLight => (1.0 - 2.0 * top) * base * base + 2.0 * top * base,
            BlendMode::ColorDodge => {
                if base == 0.0 {
                    0.0
                } else if top >= 1.0 {
                    1.0
                } else {
                    (base / (1.0 - top)).min(1.0)
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorStop {
    pub offset: f32,
    pub rgb: [u8; 3],
    pub alpha: f32,
}

const fn stop(offset: f32, r: u8, g: u8, b: u8, alpha: f32) -> ColorStop {
    ColorStop {
        offset,
        rgb: [r, g, b],
        alpha,
    }
}

/// Gradient geometry in coordinates relative to the image box (0..=1 on
/// both axes), so a radial gradient on a non-square image is an ellipse.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gradient {
    Linear { from: (f32, f32), to: (f32, f32) },
    Radial { center: (f32, f32), radius: f32 },
}

impl Gradient {
    fn position(&self, u: f32, v: f32) -> f32 {
        let t = match *self {
            Gradient::Linear { from, to } => {
                let (dx, dy) = (to.0 - from.0, to.1 - from.1);
                let len2 = dx * dx + dy * dy;
                if len2 == 0.0 {
                    0.0
                } else {
                    ((u - from.0) * dx + (v - from.1) * dy) / len2
                }
            }
            Gradient::Radial { center, radius } => {
                let (dx, dy) = (u - center.0, v - center.1);
                (dx * dx + dy * dy).sqrt() / radius.max(f32::EPSILON)
            }
        };
        t.clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Overlay {
    pub gradient: Gradient,
    pub stops: &'static [ColorStop],
    pub blend: BlendMode,
}

impl Overlay {
    fn sample(&self, t: f32) -> ([f32; 3], f32) {
        let stops = self.stops;
        let Some(first) = stops.first() else {
            return ([0.0; 3], 0.0);
        };
        let mut lo = *first;
        let mut hi = *first;
        for s in stops {
            if s.offset <= t {
                lo = *s;
                hi = *s;
            } else {
                hi = *s;
                break;
            }
        }
        let span = hi.offset - lo.offset;
        let k = if span > 0.0 { (t - lo.offset) / span } else { 0.0 };
        let lerp = |a: f32, b: f32| a + (b - a) * k;
        (
            [
                lerp(lo.rgb[0] as f32, hi.rgb[0] as f32) / 255.0,
                lerp(lo.rgb[1] as f32, hi.rgb[1] as f32) / 255.0,
                lerp(lo.rgb[2] as f32, hi.rgb[2] as f32) / 255.0,
            ],
            lerp(lo.alpha, hi.alpha),
        )
    }

    fn composite(&self, img: &mut RgbImage) {
        let (w, h) = img.dimensions();
        let (fw, fh) = (w.max(1) as f32, h.max(1) as f32);
        for (x, y, px) in img.enumerate_pixels_mut() {
            let t = self
                .gradient
                .position((x as f32 + 0.5) / fw, (y as f32 + 0.5) / fh);
            let (color, alpha) = self.sample(t);
            for c in 0..3 {
                let base = px.0[c] as f32 / 255.0;
                let blended = self.blend.mix(base, color[c]);
                let out = base + (blended - base) * alpha;
                px.0[c] = to_u8(out * 255.0);
            }
        }
    }
}

/// Fixed adjustment chain for one style, applied in field order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Recipe {
    pub brightness: f32,
    pub saturation: f32,
    pub hue: Option<i32>,
    pub blur: Option<f32>,
    pub sharpen: Option<f32>,
    pub tint: Option<[u8; 3]>,
    pub gamma: Option<f32>,
    /// Slope of a linear contrast stretch around mid-grey.
    pub contrast: Option<f32>,
    pub overlay: Option<Overlay>,
}

const DEFAULT_RECIPE: Recipe = Recipe {
    brightness: 1.08,
    saturation: 1.15,
    hue: None,
    blur: None,
    sharpen: None,
    tint: Some([255, 250, 248]),
    gamma: Some(1.05),
    contrast: None,
    overlay: None,
};

const GARDEN: [ColorStop; 2] = [stop(0.0, 245, 255, 240, 0.3), stop(1.0, 200, 230, 180, 0.6)];
const CHAPEL: [ColorStop; 3] = [
    stop(0.0, 255, 248, 235, 0.4),
    stop(0.5, 255, 240, 225, 0.2),
    stop(1.0, 240, 230, 210, 0.5),
];
const STUDIO: [ColorStop; 3] = [
    stop(0.0, 255, 255, 255, 0.3),
    stop(0.5, 230, 230, 240, 0.2),
    stop(1.0, 180, 180, 200, 0.7),
];
const BALLROOM: [ColorStop; 3] = [
    stop(0.0, 255, 245, 235, 0.2),
    stop(0.4, 230, 220, 245, 0.3),
    stop(1.0, 180, 160, 200, 0.8),
];
const OFFICE: [ColorStop; 2] = [stop(0.0, 250, 250, 255, 0.3), stop(1.0, 240, 245, 250, 0.4)];
const ATELIER: [ColorStop; 4] = [
    stop(0.0, 255, 200, 255, 0.4),
    stop(0.3, 200, 255, 230, 0.3),
    stop(0.7, 255, 230, 200, 0.3),
    stop(1.0, 180, 200, 255, 0.6),
];
const VIGNETTE_STOPS: [ColorStop; 3] = [
    stop(0.0, 255, 248, 245, 0.0),
    stop(0.7, 255, 248, 245, 0.1),
    stop(1.0, 255, 248, 245, 0.3),
];

/// Soft warm vignette composited onto every output after the style chain.
pub const VIGNETTE: Overlay = Overlay {
    gradient: Gradient::Radial {
        center: (0.5, 0.5),
        radius: 0.5,
    },
    stops: &VIGNETTE_STOPS,
    blend: BlendMode::Overlay,
};

pub fn recipe_for(style_id: &str) -> Recipe {
    match style_id {
        "natural" => Recipe {
            brightness: 1.1,
            saturation: 1.2,
            tint: Some([248, 255, 240]),
            gamma: Some(1.1),
            overlay: Some(Overlay {
                gradient: Gradient::Radial {
                    center: (0.5, 0.3),
                    radius: 0.7,
                },
                stops: &GARDEN,
                blend: BlendMode::Overlay,
            }),
            ..DEFAULT_RECIPE
        },
        "bridal" => Recipe {
            brightness: 1.25,
            saturation: 1.1,
            blur: Some(0.8),
            sharpen: Some(1.3),
            tint: Some([255, 250, 245]),
            gamma: Some(1.2),
            overlay: Some(Overlay {
                gradient: Gradient::Linear {
                    from: (0.0, 0.0),
                    to: (0.0, 1.0),
                },
                stops: &CHAPEL,
                blend: BlendMode::SoftLight,
            }),
            ..DEFAULT_RECIPE
        },
        "editorial" => Recipe {
            brightness: 1.05,
            saturation: 1.5,
            hue: Some(5),
            tint: None,
            gamma: Some(1.1),
            contrast: Some(1.4),
            overlay: Some(Overlay {
                gradient: Gradient::Radial {
                    center: (0.7, 0.2),
                    radius: 0.8,
                },
                stops: &STUDIO,
                blend: BlendMode::HardLight,
            }),
            ..DEFAULT_RECIPE
        },
        "evening" => Recipe {
            brightness: 0.95,
            saturation: 1.4,
            tint: Some([245, 235, 255]),
            gamma: Some(1.3),
            contrast: Some(1.2),
            overlay: Some(Overlay {
                gradient: Gradient::Radial {
                    center: (0.5, 0.1),
                    radius: 0.9,
                },
                stops: &BALLROOM,
                blend: BlendMode::Multiply,
            }),
            ..DEFAULT_RECIPE
        },
        "professional" => Recipe {
            brightness: 1.12,
            saturation: 1.05,
            sharpen: Some(1.3),
            tint: Some([250, 250, 255]),
            gamma: None,
            contrast: Some(1.1),
            overlay: Some(Overlay {
                gradient: Gradient::Linear {
                    from: (0.0, 0.0),
                    to: (1.0, 1.0),
                },
                stops: &OFFICE,
                blend: BlendMode::Overlay,
            }),
            ..DEFAULT_RECIPE
        },
        "creative" => Recipe {
            brightness: 1.15,
            saturation: 1.6,
            hue: Some(15),
            tint: Some([255, 230, 255]),
            gamma: None,
            contrast: Some(1.3),
            overlay: Some(Overlay {
                gradient: Gradient::Radial {
                    center: (0.3, 0.7),
                    radius: 1.0,
                },
                stops: &ATELIER,
                blend: BlendMode::ColorDodge,
            }),
            ..DEFAULT_RECIPE
        },
        _ => DEFAULT_RECIPE,
    }
}

fn to_u8(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

fn map_channels(img: &mut RgbImage, f: impl Fn(f32) -> f32) {
    for px in img.pixels_mut() {
        for c in px.0.iter_mut() {
            *c = to_u8(f(*c as f32));
        }
    }
}

fn modulate(img: &mut RgbImage, brightness: f32, saturation: f32) {
    for px in img.pixels_mut() {
        let [r, g, b] = px.0.map(|c| c as f32 * brightness);
        let luma = 0.299 * r + 0.587 * g + 0.114 * b;
        px.0 = [r, g, b].map(|c| to_u8(luma + (c - luma) * saturation));
    }
}

fn tint(img: &mut RgbImage, color: [u8; 3]) {
    let scale = color.map(|c| c as f32 / 255.0);
    for px in img.pixels_mut() {
        for (c, s) in px.0.iter_mut().zip(scale) {
            *c = to_u8(*c as f32 * s);
        }
    }
}

fn file_token(style_id: &str) -> String {
    let token: String = style_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if token.is_empty() { "default".to_string() } else { token }
}

pub struct FilterEngine;

impl FilterEngine {
    pub fn new() -> Self {
        Self
    }

    /// Runs the recipe of `style_id` plus the vignette over an encoded image
    /// and returns the JPEG bytes.
    pub fn render(&self, data: &[u8], style_id: &str) -> Result<Vec<u8>, StudioError> {
        let img = image::load_from_memory(data)
            .map_err(|e| StudioError::ImageProcessing(format!("Failed to load image: {}", e)))?;
        let recipe = recipe_for(style_id);

        let mut rgb = img.to_rgb8();
        modulate(&mut rgb, recipe.brightness, recipe.saturation);
        if let Some(degrees) = recipe.hue {
            rgb = imageops::huerotate(&rgb, degrees);
        }
        if let Some(sigma) = recipe.blur {
            rgb = imageops::blur(&rgb, sigma);
        }
        if let Some(sigma) = recipe.sharpen {
            rgb = imageops::unsharpen(&rgb, sigma, 1);
        }
        if let Some(color) = recipe.tint {
            tint(&mut rgb, color);
        }
        if let Some(gamma) = recipe.gamma {
            let exponent = 1.0 / gamma;
            map_channels(&mut rgb, |c| 255.0 * (c / 255.0).powf(exponent));
        }
        if let Some(slope) = recipe.contrast {
            let offset = 128.0 - 128.0 * slope;
            map_channels(&mut rgb, |c| slope * c + offset);
        }
        if let Some(overlay) = recipe.overlay {
            overlay.composite(&mut rgb);
        }
        VIGNETTE.composite(&mut rgb);

        let mut output = Vec::new();
        DynamicImage::ImageRgb8(rgb)
            .write_to(&mut Cursor::new(&mut output), ImageOutputFormat::Jpeg(OUTPUT_JPEG_QUALITY))
            .map_err(|e| StudioError::ImageProcessing(format!("Failed to encode image: {}", e)))?;

        Ok(output)
    }

    /// Filters `input` into `output`. Any failure degrades to copying the
    /// source bytes unchanged.
    pub fn apply_style(&self, input: &Path, output: &Path, style_id: &str) -> Result<(), StudioError> {
        let rendered = std::fs::read(input)
            .map_err(StudioError::from)
            .and_then(|data| self.render(&data, style_id))
            .and_then(|bytes| std::fs::write(output, bytes).map_err(StudioError::from));

        match rendered {
            Ok(()) => info!("Applied {} makeup filter to {}", style_id, input.display()),
            Err(e) => {
                warn!("Filter failed for {} ({}), copying original", input.display(), e);
                std::fs::copy(input, output)?;
            }
        }
        Ok(())
    }

    /// Writes `{stem}_{style}_enhanced.jpg` next to `original` and returns its
    /// path. Falls back to the original path only when not even a raw copy
    /// can be written.
    pub fn enhance(&self, original: &Path, style_id: &str) -> PathBuf {
        let stem = original
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        let enhanced = original.with_file_name(format!("{}_{}_enhanced.jpg", stem, file_token(style_id)));

        match self.apply_style(original, &enhanced, style_id) {
            Ok(()) => enhanced,
            Err(e) => {
                error!("Enhanced image creation failed for {}: {}", original.display(), e);
                original.to_path_buf()
            }
        }
    }
}

impl Default for FilterEngine {
    fn default() -> Self {
        Self::new()
    }
}
