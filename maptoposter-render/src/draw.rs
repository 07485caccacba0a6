//! Raster poster drawing with tiny-skia.
//!
//! Features are projected with a local equirectangular projection centred on
//! the geocoded point. The mapped square is scaled so it covers the whole
//! canvas; the shorter side of the poster crops it.

use tiny_skia::{
    Color, FillRule, GradientStop, LineCap, LineJoin, LinearGradient, Paint, Path, PathBuilder,
    Pixmap, Point, Rect, SpreadMode, Stroke, Transform,
};

use crate::error::RenderError;
use crate::geocode::Coordinates;
use crate::osm::{Layer, MapFeature};
use crate::themes::Theme;
use crate::typography::{self, Caption};

const METERS_PER_DEGREE: f64 = 111_320.0;
const POINTS_PER_INCH: f64 = 72.0;

/// Share of the poster height covered by each edge fade.
const FADE_FRACTION: f32 = 0.25;

const RAILWAY_WIDTH_PT: f32 = 0.5;
const BUILDING_ALPHA: u8 = 128;

/// Pixel dimensions of the output image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasSize {
    pub width: u32,
    pub height: u32,
    /// Pixels per typographic point, used to scale line widths.
    pub px_per_point: f32,
}

impl CanvasSize {
    /// Size for a `width_in` x `height_in` inch print at `dpi`, shrunk
    /// proportionally so the image has at most `max_pixels` pixels.
    pub fn for_print(width_in: u32, height_in: u32, dpi: u32, max_pixels: u64) -> Self {
        let full_w = f64::from(width_in.max(1)) * f64::from(dpi.max(1));
        let full_h = f64::from(height_in.max(1)) * f64::from(dpi.max(1));
        let area = full_w * full_h;
        let factor = if area > max_pixels as f64 {
            (max_pixels as f64 / area).sqrt()
        } else {
            1.0
        };
        Self {
            width: ((full_w * factor).floor() as u32).max(1),
            height: ((full_h * factor).floor() as u32).max(1),
            px_per_point: (f64::from(dpi.max(1)) / POINTS_PER_INCH * factor) as f32,
        }
    }

    #[inline]
    pub fn pixels(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

/// Everything downloaded for one poster.
#[derive(Debug, Clone)]
pub struct Scene {
    pub center: Coordinates,
    /// Half the side of the mapped square, in meters.
    pub distance: f64,
    layers: Vec<(Layer, Vec<MapFeature>)>,
    caption: Option<Caption>,
}

impl Scene {
    pub fn new(center: Coordinates, distance: f64) -> Self {
        Self {
            center,
            distance,
            layers: Vec::new(),
            caption: None,
        }
    }

    /// Print `caption` at the foot of the poster.
    pub fn set_caption(&mut self, caption: Caption) {
        self.caption = Some(caption);
    }

    pub fn insert(&mut self, layer: Layer, features: Vec<MapFeature>) {
        self.layers.retain(|(l, _)| *l != layer);
        self.layers.push((layer, features));
    }

    pub fn features(&self, layer: Layer) -> &[MapFeature] {
        self.layers
            .iter()
            .find(|(l, _)| *l == layer)
            .map(|(_, f)| f.as_slice())
            .unwrap_or(&[])
    }
}

struct Projection {
    center: Coordinates,
    cos_lat: f64,
    px_per_meter: f64,
    half_w: f64,
    half_h: f64,
}

impl Projection {
    fn new(scene: &Scene, size: CanvasSize) -> Self {
        let longest = f64::from(size.width.max(size.height));
        Self {
            center: scene.center,
            cos_lat: scene.center.lat.to_radians().cos().max(0.01),
            px_per_meter: longest / (2.0 * scene.distance.max(1.0)),
            half_w: f64::from(size.width) / 2.0,
            half_h: f64::from(size.height) / 2.0,
        }
    }

    fn project(&self, c: Coordinates) -> (f32, f32) {
        let x = (c.lon - self.center.lon) * self.cos_lat * METERS_PER_DEGREE;
        let y = (c.lat - self.center.lat) * METERS_PER_DEGREE;
        (
            (self.half_w + x * self.px_per_meter) as f32,
            (self.half_h - y * self.px_per_meter) as f32,
        )
    }

    fn path(&self, points: &[Coordinates], close: bool) -> Option<Path> {
        let (first, rest) = points.split_first()?;
        let mut pb = PathBuilder::new();
        let (x, y) = self.project(*first);
        pb.move_to(x, y);
        for point in rest {
            let (x, y) = self.project(*point);
            pb.line_to(x, y);
        }
        if close {
            pb.close();
        }
        pb.finish()
    }
}

/// Road colour key, line width in points and stacking rank for a `highway`
/// class. Higher ranks are drawn on top.
fn road_style(class: Option<&str>) -> (&'static str, f32, u8) {
    match class.unwrap_or("") {
        "motorway" | "motorway_link" => ("road_motorway", 1.2, 5),
        "trunk" | "trunk_link" | "primary" | "primary_link" => ("road_primary", 1.0, 4),
        "secondary" | "secondary_link" => ("road_secondary", 0.8, 3),
        "tertiary" | "tertiary_link" => ("road_tertiary", 0.6, 2),
        "residential" | "living_street" | "unclassified" => ("road_residential", 0.4, 1),
        _ => ("road_default", 0.4, 0),
    }
}

fn solid(rgb: [u8; 3], alpha: u8) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color_rgba8(rgb[0], rgb[1], rgb[2], alpha);
    paint.anti_alias = true;
    paint
}

fn line(width: f32) -> Stroke {
    Stroke {
        width: width.max(0.1),
        line_cap: LineCap::Round,
        line_join: LineJoin::Round,
        ..Default::default()
    }
}

/// Fade from the gradient colour at `edge_y` to transparent at `inner_y`.
fn fade(pixmap: &mut Pixmap, rgb: [u8; 3], edge_y: f32, inner_y: f32) {
    let [r, g, b] = rgb;
    let Some(shader) = LinearGradient::new(
        Point::from_xy(0.0, edge_y),
        Point::from_xy(0.0, inner_y),
        vec![
            GradientStop::new(0.0, Color::from_rgba8(r, g, b, 255)),
            GradientStop::new(1.0, Color::from_rgba8(r, g, b, 0)),
        ],
        SpreadMode::Pad,
        Transform::identity(),
    ) else {
        return;
    };
    let top = edge_y.min(inner_y);
    let height = (edge_y - inner_y).abs();
    let Some(rect) = Rect::from_xywh(0.0, top, pixmap.width() as f32, height) else {
        return;
    };
    let paint = Paint {
        shader,
        anti_alias: false,
        ..Default::default()
    };
    pixmap.fill_rect(rect, &paint, Transform::identity(), None);
}

/// Draw the poster into a pixmap.
pub fn paint(scene: &Scene, theme: &Theme, size: CanvasSize) -> Result<Pixmap, RenderError> {
    let mut pixmap = Pixmap::new(size.width, size.height).ok_or_else(|| {
        RenderError::Canvas(format!("cannot allocate {}x{} canvas", size.width, size.height))
    })?;
    let [r, g, b] = theme.rgb("bg");
    pixmap.fill(Color::from_rgba8(r, g, b, 255));

    let proj = Projection::new(scene, size);
    let id = Transform::identity();

    for (layer, key, alpha) in [
        (Layer::Water, "water", 255),
        (Layer::Parks, "parks", 255),
        (Layer::Buildings, "building", BUILDING_ALPHA),
    ] {
        let paint = solid(theme.rgb(key), alpha);
        for feature in scene.features(layer) {
            if let Some(path) = proj.path(&feature.points, true) {
                pixmap.fill_path(&path, &paint, FillRule::Winding, id, None);
            }
        }
    }

    let rail_paint = solid(theme.rgb("railway"), 255);
    let rail_stroke = line(RAILWAY_WIDTH_PT * size.px_per_point);
    for feature in scene.features(Layer::Railways) {
        if let Some(path) = proj.path(&feature.points, false) {
            pixmap.stroke_path(&path, &rail_paint, &rail_stroke, id, None);
        }
    }

    let mut roads: Vec<_> = scene
        .features(Layer::Streets)
        .iter()
        .map(|f| (road_style(f.class.as_deref()), f))
        .collect();
    roads.sort_by_key(|((_, _, rank), _)| *rank);
    for ((key, width_pt, _), feature) in roads {
        if let Some(path) = proj.path(&feature.points, false) {
            let stroke = line(width_pt * size.px_per_point);
            pixmap.stroke_path(&path, &solid(theme.rgb(key), 255), &stroke, id, None);
        }
    }

    let h = size.height as f32;
    let w = size.width as f32;
    let gradient = theme.rgb("gradient_color");
    fade(&mut pixmap, gradient, h, h * (1.0 - FADE_FRACTION));
    fade(&mut pixmap, gradient, 0.0, h * FADE_FRACTION);

    // divider under the place name area
    let mut pb = PathBuilder::new();
    pb.move_to(w * 0.4, h * 0.875);
    pb.line_to(w * 0.6, h * 0.875);
    if let Some(path) = pb.finish() {
        pixmap.stroke_path(
            &path,
            &solid(theme.rgb("text"), 255),
            &line(size.px_per_point),
            id,
            None,
        );
    }

    if let Some(caption) = &scene.caption {
        typography::draw_caption(&mut pixmap, caption, scene.center, theme.rgb("text"), size);
    }

    Ok(pixmap)
}

/// Draw the poster and encode it as PNG.
pub fn render_png(scene: &Scene, theme: &Theme, size: CanvasSize) -> Result<Vec<u8>, RenderError> {
    paint(scene, theme, size)?
        .encode_png()
        .map_err(|e| RenderError::Encode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const CENTER: Coordinates = Coordinates::new(45.0, 7.0);

    fn theme() -> Theme {
        Theme::from_json(
            "test",
            br##"{"bg": "#FFFFFF", "water": "#0000FF", "road_motorway": "#FF0000", "gradient_color": "#00FF00", "text": "#000000"}"##,
        )
        .unwrap()
    }

    fn offset(dlat: f64, dlon: f64) -> Coordinates {
        Coordinates::new(CENTER.lat + dlat, CENTER.lon + dlon)
    }

    fn rgb_at(pixmap: &Pixmap, x: u32, y: u32) -> [u8; 3] {
        let c = pixmap.pixel(x, y).unwrap();
        [c.red(), c.green(), c.blue()]
    }

    #[test]
    fn print_size_without_scaling() {
        let size = CanvasSize::for_print(12, 16, 300, 120_000_000);
        assert_eq!((size.width, size.height), (3600, 4800));
        assert!((size.px_per_point - 300.0 / 72.0).abs() < 1e-4);
    }

    #[test]
    fn large_prints_are_capped() {
        let size = CanvasSize::for_print(24, 32, 600, 120_000_000);
        assert!(size.pixels() <= 120_000_000);
        let aspect = size.width as f64 / size.height as f64;
        assert!((aspect - 0.75).abs() < 1e-3);
        assert!(size.px_per_point < 600.0 / 72.0);
    }

    #[test]
    fn empty_scene_is_background_with_fades() {
        let size = CanvasSize::for_print(6, 8, 10, u64::MAX);
        let pixmap = paint(&Scene::new(CENTER, 1000.0), &theme(), size).unwrap();
        assert_eq!(rgb_at(&pixmap, 30, 40), [255, 255, 255]);
        // edges are (almost) the gradient colour
        for y in [0, 79] {
            let [r, g, b] = rgb_at(&pixmap, 30, y);
            assert_eq!(g, 255);
            assert!(r < 32 && b < 32, "edge pixel at row {y} is {r},{g},{b}");
        }
    }

    #[test]
    fn water_and_roads_are_drawn_in_theme_colours() {
        let size = CanvasSize::for_print(6, 8, 10, u64::MAX);
        let mut scene = Scene::new(CENTER, 1000.0);
        let d = 0.002;
        scene.insert(
            Layer::Water,
            vec![MapFeature {
                class: None,
                points: vec![offset(-d, -d), offset(-d, d), offset(d, d), offset(d, -d)],
            }],
        );
        let pixmap = paint(&scene, &theme(), size).unwrap();
        assert_eq!(rgb_at(&pixmap, 30, 40), [0, 0, 255]);

        let mut scene = Scene::new(CENTER, 1000.0);
        scene.insert(
            Layer::Streets,
            vec![MapFeature {
                class: Some("motorway".into()),
                points: vec![offset(0.0, -0.01), offset(0.0, 0.01)],
            }],
        );
        let wide = CanvasSize {
            px_per_point: 5.0,
            ..size
        };
        let pixmap = paint(&scene, &theme(), wide).unwrap();
        assert_eq!(rgb_at(&pixmap, 30, 40), [255, 0, 0]);
    }

    #[test]
    fn major_roads_stack_on_top() {
        let mut classes: Vec<_> = ["residential", "motorway", "primary", "service"]
            .iter()
            .map(|c| (road_style(Some(*c)).2, *c))
            .collect();
        classes.sort();
        assert_eq!(classes.last().unwrap().1, "motorway");
        assert_eq!(classes.first().unwrap().1, "service");
        assert_eq!(road_style(None).0, "road_default");
    }

    #[test]
    fn png_output_has_signature() {
        let size = CanvasSize::for_print(6, 6, 4, u64::MAX);
        let png = render_png(&Scene::new(CENTER, 500.0), &theme(), size).unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn scene_insert_replaces_layer() {
        let mut scene = Scene::new(CENTER, 500.0);
        scene.insert(Layer::Parks, vec![]);
        scene.insert(
            Layer::Parks,
            vec![MapFeature {
                class: None,
                points: vec![CENTER, CENTER],
            }],
        );
        assert_eq!(scene.features(Layer::Parks).len(), 1);
        assert!(scene.features(Layer::Water).is_empty());
    }
}
