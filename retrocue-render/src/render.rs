use ab_glyph::{Font, FontVec, Glyph, PxScale, ScaleFont, point};
use anyhow::{Context, Result};
use retrocue_core::{Display, Drawable, HueIndex, HueRing, MonitorGeometry, Position};
use std::collections::HashMap;
use std::sync::Arc;
use tiny_skia::{
    Color, FillRule, FilterQuality, Paint, PathBuilder, Pixmap, PixmapPaint, PremultipliedColorU8,
    Rect, Stroke, Transform,
};
use tracing::{debug, warn};

/// Stimulus layout in degrees of visual angle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Layout {
    pub fixation_radius: f64,
    pub item_radius: f64,
    pub item_eccentricity: f64,
    pub wheel_outer_radius: f64,
    pub wheel_inner_radius: f64,
    pub text_offset: f64,
    pub swatch_size: f64,
    /// Pixels, not degrees.
    pub marker_width: f32,
    pub text_px: f32,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            fixation_radius: 0.1,
            item_radius: 1.0,
            item_eccentricity: 6.5,
            wheel_outer_radius: 6.0,
            wheel_inner_radius: 4.5,
            text_offset: 0.3,
            swatch_size: 2.0,
            marker_width: 15.0,
            text_px: 22.0,
        }
    }
}

const BACKGROUND: [u8; 4] = [64, 64, 64, 255];
const FIXATION: [u8; 4] = [0xea, 0xea, 0xea, 255];
const WHITE: [u8; 4] = [255, 255, 255, 255];

fn paint(rgba: [u8; 4]) -> Paint<'static> {
    let mut p = Paint::default();
    p.set_color_rgba8(rgba[0], rgba[1], rgba[2], rgba[3]);
    p.anti_alias = true;
    p
}

/// Point on a circle of `radius` px at `angle_deg`, centre-origin with y up.
fn polar(radius: f32, angle_deg: f32) -> (f32, f32) {
    let a = angle_deg.to_radians();
    (radius * a.cos(), radius * a.sin())
}

/// Software display: `render` draws into the back buffer, `present` swaps it to the front.
pub struct SkiaDisplay {
    monitor: MonitorGeometry,
    layout: Layout,
    ring: HueRing,
    centre: (f32, f32),
    back: Pixmap,
    front: Pixmap,
    font: Option<FontVec>,
    warned_no_font: bool,
    text_cache: HashMap<String, Arc<Pixmap>>,
    /// Unrotated ring, rotated into place on every blit.
    wheel: Option<Pixmap>,
    presented: u64,
}

impl SkiaDisplay {
    pub fn new(monitor: MonitorGeometry, ring: HueRing) -> Result<Self> {
        let (width, height) = monitor.resolution;
        let mut back = Pixmap::new(width, height).context("allocating back buffer")?;
        back.fill(Color::from_rgba8(
            BACKGROUND[0],
            BACKGROUND[1],
            BACKGROUND[2],
            BACKGROUND[3],
        ));
        let front = back.clone();
        Ok(Self {
            monitor,
            layout: Layout::default(),
            ring,
            centre: (width as f32 / 2.0, height as f32 / 2.0),
            back,
            front,
            font: None,
            warned_no_font: false,
            text_cache: HashMap::new(),
            wheel: None,
            presented: 0,
        })
    }

    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self.wheel = None;
        self
    }

    /// Enables cue and feedback text. Without a font those drawables are skipped.
    pub fn with_font(mut self, bytes: Vec<u8>) -> Result<Self> {
        self.font = Some(FontVec::try_from_vec(bytes).context("parsing font")?);
        self.text_cache.clear();
        Ok(self)
    }

    /// What is currently on screen.
    pub fn front(&self) -> &Pixmap {
        &self.front
    }

    /// What the next `present` will show.
    pub fn back(&self) -> &Pixmap {
        &self.back
    }

    pub fn presented_frames(&self) -> u64 {
        self.presented
    }

    fn px(&self, degrees: f64) -> f32 {
        self.monitor.deg2pix(degrees)
    }

    /// Centre-origin, y-up coordinates to buffer coordinates.
    fn to_buffer(&self, (x, y): (f32, f32)) -> (f32, f32) {
        (self.centre.0 + x, self.centre.1 - y)
    }

    fn fill_circle(&mut self, centre: (f32, f32), radius: f32, rgba: [u8; 4]) {
        let (x, y) = self.to_buffer(centre);
        if let Some(path) = PathBuilder::from_circle(x, y, radius) {
            self.back.fill_path(
                &path,
                &paint(rgba),
                FillRule::Winding,
                Transform::identity(),
                None,
            );
        }
    }

    fn draw_stimulus(&mut self, hue: HueIndex, position: Position) {
        let dx = self.px(self.layout.item_eccentricity);
        let x = match position {
            Position::Left => -dx,
            Position::Right => dx,
        };
        let radius = self.px(self.layout.item_radius);
        self.fill_circle((x, 0.0), radius, self.ring.colour(hue));
    }

    fn draw_wheel(&mut self, offset: u16) {
        if self.wheel.is_none() {
            self.wheel = self.render_wheel();
        }
        let Some(pm) = &self.wheel else {
            return;
        };
        let x = (self.centre.0 - pm.width() as f32 / 2.0).round() as i32;
        let y = (self.centre.1 - pm.height() as f32 / 2.0).round() as i32;
        // Buffer y points down, so a counter-clockwise turn is negative.
        let rotation = Transform::from_rotate_at(-(offset as f32), self.centre.0, self.centre.1);
        self.back.draw_pixmap(
            x,
            y,
            pm.as_ref(),
            &PixmapPaint {
                quality: FilterQuality::Bilinear,
                ..PixmapPaint::default()
            },
            rotation,
            None,
        );
    }

    /// Ring with hue 0 starting on the positive x axis.
    fn render_wheel(&self) -> Option<Pixmap> {
        let outer = self.px(self.layout.wheel_outer_radius);
        let inner = self.px(self.layout.wheel_inner_radius);
        let size = (outer * 2.0).ceil() as u32 + 2;
        let mut pm = Pixmap::new(size, size)?;
        let c = size as f32 / 2.0;
        debug!(size, "rendering colour wheel");

        for (hue, rgba) in self.ring.table().into_iter().enumerate() {
            let start = hue as f32;
            let corners = [
                polar(inner, start),
                polar(outer, start),
                polar(outer, start + 1.0),
                polar(inner, start + 1.0),
            ];
            let mut pb = PathBuilder::new();
            pb.move_to(c + corners[0].0, c - corners[0].1);
            for (x, y) in &corners[1..] {
                pb.line_to(c + x, c - y);
            }
            pb.close();
            if let Some(path) = pb.finish() {
                pm.fill_path(
                    &path,
                    &paint(rgba),
                    FillRule::Winding,
                    Transform::identity(),
                    None,
                );
            }
        }
        Some(pm)
    }

    /// Rectangle spanning the ring's width at the pointer angle, filled with the hovered hue.
    fn draw_marker(&mut self, hue: HueIndex, angle_deg: f32) {
        let outer = self.px(self.layout.wheel_outer_radius);
        let inner = self.px(self.layout.wheel_inner_radius);
        let half_w = self.layout.marker_width / 2.0;
        let (rx, ry) = polar(1.0, angle_deg);
        let (tx, ty) = (-ry, rx);
        let corners = [
            (rx * inner - tx * half_w, ry * inner - ty * half_w),
            (rx * outer - tx * half_w, ry * outer - ty * half_w),
            (rx * outer + tx * half_w, ry * outer + ty * half_w),
            (rx * inner + tx * half_w, ry * inner + ty * half_w),
        ];
        let mut pb = PathBuilder::new();
        let (x0, y0) = self.to_buffer(corners[0]);
        pb.move_to(x0, y0);
        for &corner in &corners[1..] {
            let (x, y) = self.to_buffer(corner);
            pb.line_to(x, y);
        }
        pb.close();
        let Some(path) = pb.finish() else {
            return;
        };
        self.back.fill_path(
            &path,
            &paint(self.ring.colour(hue)),
            FillRule::Winding,
            Transform::identity(),
            None,
        );
        self.back.stroke_path(
            &path,
            &paint(WHITE),
            &Stroke::default(),
            Transform::identity(),
            None,
        );
    }

    fn draw_swatch(&mut self, hue: HueIndex) {
        let side = self.px(self.layout.swatch_size);
        let (x, y) = self.to_buffer((-side / 2.0, side / 2.0));
        if let Some(rect) = Rect::from_xywh(x, y, side, side) {
            self.back
                .fill_rect(rect, &paint(self.ring.colour(hue)), Transform::identity(), None);
        }
    }

    fn draw_text(&mut self, text: &str, centre: (f32, f32)) {
        let Some(font) = &self.font else {
            if !self.warned_no_font {
                warn!("no font loaded, text drawables are skipped");
                self.warned_no_font = true;
            }
            return;
        };
        let pm = match self.text_cache.get(text) {
            Some(pm) => Arc::clone(pm),
            None => {
                let Some(pm) = render_text_pixmap(text, self.layout.text_px, font, WHITE) else {
                    return;
                };
                let pm = Arc::new(pm);
                self.text_cache.insert(text.to_string(), Arc::clone(&pm));
                pm
            }
        };
        let (x, y) = self.to_buffer(centre);
        self.back.draw_pixmap(
            (x - pm.width() as f32 / 2.0).round() as i32,
            (y - pm.height() as f32 / 2.0).round() as i32,
            (*pm).as_ref(),
            &PixmapPaint::default(),
            Transform::identity(),
            None,
        );
    }
}

impl Display for SkiaDisplay {
    fn render(&mut self, drawable: &Drawable) {
        match *drawable {
            Drawable::Fixation => {
                let r = self.px(self.layout.fixation_radius).max(1.0);
                self.fill_circle((0.0, 0.0), r, FIXATION);
            }
            Drawable::Stimulus { hue, position } => self.draw_stimulus(hue, position),
            Drawable::Cue(cue) => {
                let y = self.px(self.layout.text_offset);
                self.draw_text(&cue.value().to_string(), (0.0, y));
            }
            Drawable::Wheel { offset } => self.draw_wheel(offset),
            Drawable::Marker { hue, angle_deg } => self.draw_marker(hue, angle_deg),
            Drawable::Feedback { performance } => {
                let y = self.px(self.layout.text_offset);
                self.draw_text(&performance.to_string(), (0.0, y));
            }
            Drawable::Swatch { hue } => self.draw_swatch(hue),
        }
    }

    fn present(&mut self) {
        std::mem::swap(&mut self.front, &mut self.back);
        self.back.fill(Color::from_rgba8(
            BACKGROUND[0],
            BACKGROUND[1],
            BACKGROUND[2],
            BACKGROUND[3],
        ));
        self.presented += 1;
    }
}

/// Rasterises a single line of text into a tight transparent pixmap. `None`
/// when nothing in `text` has an outline.
pub fn render_text_pixmap(
    text: &str,
    font_size: f32,
    font: &FontVec,
    rgba: [u8; 4],
) -> Option<Pixmap> {
    let scale = PxScale::from(font_size);
    let sf = font.as_scaled(scale);

    let mut pen_x = 0.0f32;
    let mut glyphs = Vec::<Glyph>::new();
    for ch in text.chars() {
        let id = font.glyph_id(ch);
        if let Some(prev) = glyphs.last() {
            pen_x += sf.kern(prev.id, id);
        }
        glyphs.push(Glyph {
            id,
            scale,
            position: point(pen_x, sf.ascent()),
        });
        pen_x += sf.h_advance(id);
    }

    let outlines: Vec<_> = glyphs
        .into_iter()
        .filter_map(|g| font.outline_glyph(g))
        .collect();
    let bounds = outlines
        .iter()
        .map(|o| o.px_bounds())
        .reduce(|a, b| ab_glyph::Rect {
            min: point(a.min.x.min(b.min.x), a.min.y.min(b.min.y)),
            max: point(a.max.x.max(b.max.x), a.max.y.max(b.max.y)),
        })?;

    let w = (bounds.max.x.ceil() - bounds.min.x.floor()).max(1.0) as u32;
    let h = (bounds.max.y.ceil() - bounds.min.y.floor()).max(1.0) as u32;
    let mut pm = Pixmap::new(w, h)?;
    let stride = w as usize;
    let dst = pm.pixels_mut();

    for out in &outlines {
        let b = out.px_bounds();
        out.draw(|x, y, cov| {
            if cov <= f32::EPSILON {
                return;
            }
            let ix = (x as f32 + b.min.x - bounds.min.x.floor()) as i32;
            let iy = (y as f32 + b.min.y - bounds.min.y.floor()) as i32;
            if ix < 0 || iy < 0 || ix >= w as i32 || iy >= h as i32 {
                return;
            }
            let i = iy as usize * stride + ix as usize;

            // Premultiplied source-over.
            let a = (cov * rgba[3] as f32 / 255.0).clamp(0.0, 1.0);
            let inv = 1.0 - a;
            let bg = dst[i];
            let blend = |s: u8, d: u8| ((s as f32 * a) + d as f32 * inv).round().min(255.0) as u8;
            let alpha = ((a * 255.0) + bg.alpha() as f32 * inv).round().min(255.0) as u8;
            let r = blend(rgba[0], bg.red()).min(alpha);
            let g = blend(rgba[1], bg.green()).min(alpha);
            let bl = blend(rgba[2], bg.blue()).min(alpha);
            if let Some(px) = PremultipliedColorU8::from_rgba(r, g, bl, alpha) {
                dst[i] = px;
            }
        });
    }

    Some(pm)
}
