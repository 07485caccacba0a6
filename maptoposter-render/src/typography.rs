//! Poster caption: spaced city name, country, coordinates and attribution.
//!
//! Glyphs are laid out and rasterised with ab_glyph and blended straight into
//! the tiny-skia pixmap. Sizes are in points, like the stroke widths in
//! [`crate::draw`].

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use ab_glyph::{point, Font, FontArc, Glyph, PxScale, ScaleFont};
use tiny_skia::{Pixmap, PremultipliedColorU8};
use tracing::{debug, info, warn};

use crate::draw::CanvasSize;
use crate::error::RenderError;
use crate::geocode::Coordinates;

pub const ATTRIBUTION: &str = "© OpenStreetMap contributors";

const CITY_PT: f32 = 60.0;
const COUNTRY_PT: f32 = 22.0;
const COORDS_PT: f32 = 14.0;
const ATTRIBUTION_PT: f32 = 8.0;

/// Widest share of the poster a caption line may take before it is shrunk.
const MAX_LINE_FRACTION: f32 = 0.9;

/// Fonts tried, in order, when none is configured.
const FONT_CANDIDATES: &[&str] = &[
    "fonts/Roboto-Bold.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/TTF/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/dejavu-sans-fonts/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Bold.ttf",
    "/System/Library/Fonts/Supplemental/Arial Bold.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arialbd.ttf",
];

/// A loaded font. Cloning shares the font data.
#[derive(Clone)]
pub struct Typeface {
    font: FontArc,
    source: PathBuf,
}

impl fmt::Debug for Typeface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Typeface")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

impl Typeface {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RenderError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|e| RenderError::Font {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let font = FontArc::try_from_vec(bytes).map_err(|e| RenderError::Font {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            font,
            source: path.to_path_buf(),
        })
    }

    /// Load `configured`, or the first usable system font when it is `None`.
    ///
    /// A configured font that fails to load is an error. Finding no system
    /// font is not: posters are then drawn without a caption.
    pub fn discover(configured: Option<&Path>) -> Result<Option<Self>, RenderError> {
        if let Some(path) = configured {
            let face = Self::load(path)?;
            info!(font = %path.display(), "caption font loaded");
            return Ok(Some(face));
        }

        for candidate in FONT_CANDIDATES {
            let path = Path::new(candidate);
            if !path.is_file() {
                continue;
            }
            match Self::load(path) {
                Ok(face) => {
                    info!(font = %path.display(), "caption font found");
                    return Ok(Some(face));
                }
                Err(e) => debug!(error = %e, "skipping font candidate"),
            }
        }
        warn!("no caption font found; posters will have no text");
        Ok(None)
    }

    pub fn source(&self) -> &Path {
        &self.source
    }
}

/// The text printed at the foot of a poster.
#[derive(Debug, Clone)]
pub struct Caption {
    pub city: String,
    pub country: String,
    pub typeface: Typeface,
}

impl Caption {
    pub fn new(city: &str, country: &str, typeface: Typeface) -> Self {
        Self {
            city: city.to_string(),
            country: country.to_string(),
            typeface,
        }
    }
}

/// Upper-case the city and put two spaces between its characters.
pub fn spaced_city(city: &str) -> String {
    let upper = city.to_uppercase();
    let mut out = String::with_capacity(upper.len() * 3);
    for (i, c) in upper.chars().enumerate() {
        if i > 0 {
            out.push_str("  ");
        }
        out.push(c);
    }
    out
}

/// `48.8566° N / 2.3522° E` style coordinates, four decimals.
pub fn format_coordinates(c: Coordinates) -> String {
    let ns = if c.lat >= 0.0 { 'N' } else { 'S' };
    let ew = if c.lon >= 0.0 { 'E' } else { 'W' };
    format!("{:.4}° {ns} / {:.4}° {ew}", c.lat.abs(), c.lon.abs())
}

#[derive(Debug, Clone, Copy)]
enum Align {
    Center,
    Right,
}

/// Draw the caption lines of `caption` for a place at `center`.
pub(crate) fn draw_caption(
    pixmap: &mut Pixmap,
    caption: &Caption,
    center: Coordinates,
    rgb: [u8; 3],
    size: CanvasSize,
) {
    let font = &caption.typeface.font;
    let w = size.width as f32;
    let h = size.height as f32;
    let pt = size.px_per_point;

    let lines = [
        (spaced_city(&caption.city), CITY_PT, h * 0.86, 1.0),
        (caption.country.to_uppercase(), COUNTRY_PT, h * 0.90, 1.0),
        (format_coordinates(center), COORDS_PT, h * 0.93, 0.7),
    ];
    for (text, points, baseline, alpha) in lines {
        draw_line(pixmap, font, &text, points * pt, (w * 0.5, baseline), Align::Center, rgb, alpha);
    }

    // bottom of the attribution sits 2% above the lower edge
    let px = ATTRIBUTION_PT * pt;
    let descent = font.as_scaled(PxScale::from(px)).descent();
    draw_line(
        pixmap,
        font,
        ATTRIBUTION,
        px,
        (w * 0.98, h * 0.98 + descent),
        Align::Right,
        rgb,
        0.5,
    );
}

/// Glyphs positioned on a baseline at y = 0, and the advance width.
fn layout(font: &FontArc, text: &str, px: f32) -> (Vec<Glyph>, f32) {
    let scaled = font.as_scaled(PxScale::from(px));
    let mut caret = 0.0;
    let mut prev = None;
    let mut glyphs = Vec::with_capacity(text.len());
    for c in text.chars() {
        let id = scaled.glyph_id(c);
        if let Some(prev) = prev {
            caret += scaled.kern(prev, id);
        }
        glyphs.push(id.with_scale_and_position(scaled.scale(), point(caret, 0.0)));
        caret += scaled.h_advance(id);
        prev = Some(id);
    }
    (glyphs, caret)
}

#[allow(clippy::too_many_arguments)]
fn draw_line(
    pixmap: &mut Pixmap,
    font: &FontArc,
    text: &str,
    px: f32,
    anchor: (f32, f32),
    align: Align,
    rgb: [u8; 3],
    alpha: f32,
) {
    if text.is_empty() || px <= 0.0 {
        return;
    }
    let max_width = pixmap.width() as f32 * MAX_LINE_FRACTION;
    let (mut glyphs, mut width) = layout(font, text, px);
    if width > max_width {
        (glyphs, width) = layout(font, text, px * max_width / width);
    }

    let left = match align {
        Align::Center => anchor.0 - width / 2.0,
        Align::Right => anchor.0 - width,
    };
    for mut glyph in glyphs {
        glyph.position = point(glyph.position.x + left, anchor.1);
        let Some(outline) = font.outline_glyph(glyph) else {
            continue;
        };
        let bounds = outline.px_bounds();
        let (x0, y0) = (bounds.min.x as i64, bounds.min.y as i64);
        outline.draw(|x, y, coverage| {
            blend(pixmap, x0 + i64::from(x), y0 + i64::from(y), rgb, coverage * alpha);
        });
    }
}

/// Source-over blend of an opaque colour at `alpha` into one pixel.
fn blend(pixmap: &mut Pixmap, x: i64, y: i64, rgb: [u8; 3], alpha: f32) {
    let (w, h) = (i64::from(pixmap.width()), i64::from(pixmap.height()));
    if x < 0 || y < 0 || x >= w || y >= h {
        return;
    }
    let a = alpha.clamp(0.0, 1.0);
    if a == 0.0 {
        return;
    }
    let idx = (y * w + x) as usize;
    let pixels = pixmap.pixels_mut();
    let dst = pixels[idx];
    let mix = |s: u8, d: u8| (f32::from(s) * a + f32::from(d) * (1.0 - a)).round() as u8;
    if let Some(out) = PremultipliedColorU8::from_rgba(
        mix(rgb[0], dst.red()),
        mix(rgb[1], dst.green()),
        mix(rgb[2], dst.blue()),
        mix(255, dst.alpha()),
    ) {
        pixels[idx] = out;
    }
}
