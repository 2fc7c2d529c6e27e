use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use ab_glyph::{point, Font, FontArc, Glyph, PxScale, ScaleFont};
use anyhow::{Context, Result};
use tiny_skia::{Color, Paint, Pixmap, PixmapPaint, PremultipliedColorU8, Rect, Transform};

use hljt_core::{Hand, Sex, StimulusKey, TrialDescriptor};
use hljt_experiment::{Screen, TaskConfig};
use hljt_stimuli::{rotate_expand, scale_to_height, scale_to_width, to_pixmap, StimulusBank};

const HEADER_PX: f32 = 32.0;
const TEXT_PX: f32 = 26.0;

/// Fraction of the screen width spanned by the instruction demo hands.
const DEMO_BAND_FRAC: f32 = 0.6;

/// Reads a TTF/OTF font for message rendering. The font file is a runtime
/// asset like the hand images, so a missing or broken file fails setup.
pub fn load_font(path: &Path) -> Result<FontArc> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("failed to read font {}", path.display()))?;
    FontArc::try_from_vec(bytes)
        .with_context(|| format!("failed to parse font {}", path.display()))
}

/// Rasterizes a single line of text into a tightly sized premultiplied
/// pixmap, ready for `draw_pixmap` compositing.
pub fn render_text_pixmap(text: &str, font_size: f32, font: &FontArc, color: Color) -> Pixmap {
    let scale = PxScale::from(font_size);
    let scaled = font.as_scaled(scale);

    // Lay the glyphs out with the baseline at the ascent.
    let mut pen_x = 0.0f32;
    let mut glyphs = Vec::<Glyph>::new();
    for ch in text.chars() {
        let id = font.glyph_id(ch);
        if let Some(prev) = glyphs.last() {
            pen_x += scaled.kern(prev.id, id);
        }
        glyphs.push(Glyph {
            id,
            scale,
            position: point(pen_x, scaled.ascent()),
        });
        pen_x += scaled.h_advance(id);
    }

    // Union of the outlined pixel bounds.
    let mut min_x = f32::INFINITY;
    let mut min_y = f32::INFINITY;
    let mut max_x = f32::NEG_INFINITY;
    let mut max_y = f32::NEG_INFINITY;

    for glyph in &glyphs {
        if let Some(outline) = font.outline_glyph(glyph.clone()) {
            let b = outline.px_bounds();
            min_x = min_x.min(b.min.x);
            min_y = min_y.min(b.min.y);
            max_x = max_x.max(b.max.x);
            max_y = max_y.max(b.max.y);
        }
    }

    // Whitespace-only text outlines nothing.
    if min_x == f32::INFINITY {
        return Pixmap::new(1, 1).expect("pixmap");
    }

    let w = (max_x.ceil() - min_x.floor()).max(1.0) as u32;
    let h = (max_y.ceil() - min_y.floor()).max(1.0) as u32;
    let mut pm = Pixmap::new(w, h).expect("pixmap");

    let stride = pm.width() as usize;
    let dst = pm.pixels_mut();

    let straight = [
        (color.red() * 255.0) as u8,
        (color.green() * 255.0) as u8,
        (color.blue() * 255.0) as u8,
        (color.alpha() * 255.0) as u8,
    ];

    for glyph in &glyphs {
        if let Some(outline) = font.outline_glyph(glyph.clone()) {
            let b = outline.px_bounds();
            outline.draw(|x, y, coverage| {
                if coverage <= f32::EPSILON {
                    return;
                }
                let fx = x as f32 + b.min.x - min_x;
                let fy = y as f32 + b.min.y - min_y;

                let ix = fx.floor() as i32;
                let iy = fy.floor() as i32;
                if ix < 0 || iy < 0 || ix >= w as i32 || iy >= h as i32 {
                    return;
                }
                let i = iy as usize * stride + ix as usize;

                // Premultiply the source by coverage * alpha.
                let a_lin = (coverage * straight[3] as f32 / 255.0).clamp(0.0, 1.0);
                let sr = (straight[0] as f32 * a_lin) as u8;
                let sg = (straight[1] as f32 * a_lin) as u8;
                let sb = (straight[2] as f32 * a_lin) as u8;
                let sa = (a_lin * 255.0) as u8;

                let src = PremultipliedColorU8::from_rgba(sr, sg, sb, sa).unwrap();
                let bg = dst[i];

                // Porter-Duff over in premultiplied space.
                let inv = 1.0 - (sa as f32 / 255.0);
                let r = src.red().saturating_add((bg.red() as f32 * inv) as u8);
                let g = src.green().saturating_add((bg.green() as f32 * inv) as u8);
                let b = src.blue().saturating_add((bg.blue() as f32 * inv) as u8);
                let a = src.alpha().saturating_add((bg.alpha() as f32 * inv) as u8);

                dst[i] = PremultipliedColorU8::from_rgba(r, g, b, a).unwrap();
            });
        }
    }

    pm
}

/// Builds the fixation cross as two filled bars on a transparent square.
pub fn fixation_cross(size_px: u32, thickness_px: u32) -> Pixmap {
    let size = size_px.max(1);
    let thickness = thickness_px.clamp(1, size) as f32;
    let extent = size as f32;
    let mut pm = Pixmap::new(size, size).expect("pixmap");

    let mut paint = Paint::default();
    paint.anti_alias = false;
    paint.set_color(Color::from_rgba8(255, 255, 255, 255));

    let offset = (extent - thickness) * 0.5;
    let horizontal = Rect::from_xywh(0.0, offset, extent, thickness).unwrap();
    pm.fill_rect(horizontal, &paint, Transform::identity(), None);
    let vertical = Rect::from_xywh(offset, 0.0, thickness, extent).unwrap();
    pm.fill_rect(vertical, &paint, Transform::identity(), None);

    pm
}

/// Width of one instruction demo slot: the demo band is split across the
/// hands plus one slot of margin.
fn demo_hand_width(screen_width: u32, hands: usize) -> u32 {
    let band = (screen_width as f32 * DEMO_BAND_FRAC) as u32;
    (band / (hands as u32 + 1)).max(1)
}

fn blit_center(canvas: &mut Pixmap, pm: &Pixmap, pos: (f32, f32)) {
    let x = (pos.0 - pm.width() as f32 * 0.5).round() as i32;
    let y = (pos.1 - pm.height() as f32 * 0.5).round() as i32;
    canvas.draw_pixmap(
        x,
        y,
        pm.as_ref(),
        &PixmapPaint::default(),
        Transform::identity(),
        None,
    );
}

struct TextCache {
    font: FontArc,
    map: HashMap<(String, u32), Arc<Pixmap>>,
}

impl TextCache {
    fn new(font: FontArc) -> Self {
        Self {
            font,
            map: HashMap::new(),
        }
    }

    fn get_or_render(&mut self, text: &str, size_px: f32) -> Arc<Pixmap> {
        let key = (text.to_owned(), size_px as u32);
        if let Some(pm) = self.map.get(&key) {
            return Arc::clone(pm);
        }
        let pm = Arc::new(render_text_pixmap(
            text,
            size_px,
            &self.font,
            Color::from_rgba8(255, 255, 255, 255),
        ));
        self.map.insert(key, Arc::clone(&pm));
        pm
    }
}

/// Software renderer compositing each frame into an offscreen pixmap.
///
/// Every stimulus pixmap is prepared up front from the bank; rotated
/// variants are built on first use and kept for the rest of the session.
/// Screens redraw in full each frame, so a frame is always a complete
/// description of what is on the display.
pub struct SkiaRenderer {
    width: u32,
    height: u32,
    center: (f32, f32),

    config: TaskConfig,
    text_cache: TextCache,

    stimuli: HashMap<StimulusKey, Arc<Pixmap>>,
    rotated: HashMap<(StimulusKey, i32), Arc<Pixmap>>,
    fixation: Pixmap,
    demo_hands: Vec<Pixmap>,
    demo_spacing: f32,
    key_hands: (Pixmap, Pixmap),

    canvas: Pixmap,
}

impl SkiaRenderer {
    pub fn new(
        width: u32,
        height: u32,
        font: FontArc,
        bank: &StimulusBank,
        demo_hands: &[TrialDescriptor],
        config: &TaskConfig,
    ) -> Result<Self> {
        let mut canvas =
            Pixmap::new(width.max(1), height.max(1)).context("canvas allocation")?;
        canvas.fill(Color::from_rgba8(0, 0, 0, 255));

        let mut stimuli = HashMap::with_capacity(bank.len());
        for (key, img) in bank.iter() {
            stimuli.insert(*key, Arc::new(to_pixmap(img)?));
        }

        let geometry = &config.screen;
        let fixation = fixation_cross(
            geometry.deg_to_px(config.fixation_size_deg),
            geometry.deg_to_px(config.fixation_thickness_deg),
        );

        let hand_width = demo_hand_width(width, demo_hands.len().max(1));
        let demo_spacing = (hand_width + hand_width / 4) as f32;
        let mut demo = Vec::with_capacity(demo_hands.len());
        for descriptor in demo_hands {
            let img = bank.get(&descriptor.key).with_context(|| {
                format!("demo hand {} missing from the stimulus bank", descriptor.key)
            })?;
            let upright = to_pixmap(&scale_to_height(img, hand_width))?;
            demo.push(rotate_expand(&upright, descriptor.rotation as f32)?);
        }

        // The key-mapping screen shows one hand per response key; prefer
        // the palm-back 90-degree views when the configuration has them.
        let key_hand = |hand: Hand| {
            let preferred = StimulusKey::new(Sex::Female, hand, 90);
            bank.get(&preferred)
                .or_else(|| bank.keys().find(|k| k.hand == hand).and_then(|k| bank.get(k)))
        };
        let left_img = key_hand(Hand::Left).context("stimulus bank has no left hand")?;
        let right_img = key_hand(Hand::Right).context("stimulus bank has no right hand")?;
        let key_hands = (
            to_pixmap(&scale_to_width(left_img, hand_width))?,
            to_pixmap(&scale_to_width(right_img, hand_width))?,
        );

        Ok(Self {
            width,
            height,
            center: (width as f32 / 2.0, height as f32 / 2.0),
            config: config.clone(),
            text_cache: TextCache::new(font),
            stimuli,
            rotated: HashMap::new(),
            fixation,
            demo_hands: demo,
            demo_spacing,
            key_hands,
            canvas,
        })
    }

    pub fn resize(&mut self, new_width: u32, new_height: u32) {
        self.width = new_width;
        self.height = new_height;
        self.center = (new_width as f32 / 2.0, new_height as f32 / 2.0);
        self.canvas =
            Pixmap::new(new_width.max(1), new_height.max(1)).expect("canvas allocation");
        self.canvas.fill(Color::from_rgba8(0, 0, 0, 255));
    }

    /// Draws one complete frame into `frame_buffer` (RGBA, row-major).
    ///
    /// Exactly one of the scene inputs is drawn, in precedence order:
    /// an active message screen, the fixation cross, the trial stimulus.
    pub fn render_frame(
        &mut self,
        screen: Option<(Screen, bool)>,
        fixation: bool,
        stimulus: Option<TrialDescriptor>,
        frame_buffer: &mut [u8],
    ) -> Result<()> {
        self.canvas.fill(Color::from_rgba8(0, 0, 0, 255));

        if let Some((screen, armed)) = screen {
            self.render_screen(screen, armed);
        } else if fixation {
            blit_center(&mut self.canvas, &self.fixation, self.center);
        } else if let Some(descriptor) = stimulus {
            let pm = self.stimulus_pixmap(&descriptor)?;
            blit_center(&mut self.canvas, &pm, self.center);
        }

        frame_buffer.copy_from_slice(self.canvas.data());
        Ok(())
    }

    /// Stimulus pixmap for a trial, rotating the upright image on first use.
    fn stimulus_pixmap(&mut self, descriptor: &TrialDescriptor) -> Result<Arc<Pixmap>> {
        let rotation = descriptor.rotation.rem_euclid(360);
        let upright = self
            .stimuli
            .get(&descriptor.key)
            .with_context(|| format!("stimulus {} is not in the cache", descriptor.key))?;
        if rotation == 0 {
            return Ok(Arc::clone(upright));
        }
        if let Some(pm) = self.rotated.get(&(descriptor.key, rotation)) {
            return Ok(Arc::clone(pm));
        }

        let pm = Arc::new(rotate_expand(upright, rotation as f32)?);
        self.rotated
            .insert((descriptor.key, rotation), Arc::clone(&pm));
        Ok(pm)
    }

    fn render_screen(&mut self, screen: Screen, armed: bool) {
        let w = self.width as f32;
        let h = self.height as f32;
        let cx = self.center.0;
        let body = screen.body(&self.config);

        match screen {
            Screen::InstructionsIntro => {
                if let Some(title) = screen.title() {
                    let pm = self.text_cache.get_or_render(title, HEADER_PX);
                    blit_center(&mut self.canvas, &pm, (cx, h * 0.2));
                }
                self.blit_text_top(&body, TEXT_PX, cx, h * 0.3);
                for (offset, pm) in (-2i32..=2).zip(&self.demo_hands) {
                    let x = cx + offset as f32 * self.demo_spacing;
                    blit_center(&mut self.canvas, pm, (x, h * 0.65));
                }
                if armed {
                    let pm = self.text_cache.get_or_render(screen.prompt(), TEXT_PX);
                    blit_center(&mut self.canvas, &pm, (cx, h * 0.85));
                }
            }
            Screen::InstructionsKeys => {
                self.blit_text_top(&body, TEXT_PX, cx, h * 0.3);
                blit_center(&mut self.canvas, &self.key_hands.0, (w * 0.4, h * 0.6));
                blit_center(&mut self.canvas, &self.key_hands.1, (w * 0.6, h * 0.6));
                if armed {
                    let pm = self.text_cache.get_or_render(screen.prompt(), TEXT_PX);
                    blit_center(&mut self.canvas, &pm, (cx, h * 0.85));
                }
            }
            Screen::Break => {
                let block = text_block_height(&body, TEXT_PX);
                self.blit_text_top(&body, TEXT_PX, cx, self.center.1 - block * 0.5);
                if armed {
                    let pm = self.text_cache.get_or_render(screen.prompt(), TEXT_PX);
                    blit_center(&mut self.canvas, &pm, (cx, h * 0.6));
                }
            }
            Screen::PracticeIntro | Screen::PracticeComplete | Screen::ThanksDone => {
                let block = text_block_height(&body, TEXT_PX);
                let bottom = self.blit_text_top(&body, TEXT_PX, cx, h * 0.45 - block * 0.5);
                if armed {
                    let line = text_block_height(screen.prompt(), TEXT_PX);
                    self.blit_text_top(screen.prompt(), TEXT_PX, cx, bottom + line);
                }
            }
        }
    }

    /// Draws a text block line by line, horizontally centered on `center_x`
    /// with the first line's top at `top_y`. Returns the block's bottom.
    fn blit_text_top(&mut self, text: &str, size_px: f32, center_x: f32, top_y: f32) -> f32 {
        let line_h = (size_px * 1.5).round();
        let mut y = top_y;
        for line in text.lines() {
            if !line.is_empty() {
                let pm = self.text_cache.get_or_render(line, size_px);
                blit_center(&mut self.canvas, &pm, (center_x, y + line_h * 0.5));
            }
            y += line_h;
        }
        y
    }
}

fn text_block_height(text: &str, size_px: f32) -> f32 {
    (size_px * 1.5).round() * text.lines().count() as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixation_cross_fills_exactly_two_bars() {
        let pm = fixation_cross(21, 3);
        assert_eq!((pm.width(), pm.height()), (21, 21));

        let center = pm.pixels()[10 * 21 + 10];
        assert_eq!(center.alpha(), 255);
        assert_eq!(pm.pixels()[0].alpha(), 0);

        // Two 21x3 bars overlapping in a 3x3 square.
        let opaque = pm.pixels().iter().filter(|p| p.alpha() == 255).count();
        assert_eq!(opaque, 21 * 3 * 2 - 3 * 3);
    }

    #[test]
    fn fixation_cross_never_collapses() {
        let pm = fixation_cross(0, 0);
        assert_eq!((pm.width(), pm.height()), (1, 1));
    }

    #[test]
    fn demo_slots_split_the_band_with_a_margin() {
        assert_eq!(demo_hand_width(1920, 5), 192);
        assert_eq!(demo_hand_width(1280, 5), 128);
        assert!(demo_hand_width(3, 5) >= 1);
    }

    #[test]
    fn block_height_counts_lines() {
        assert_eq!(text_block_height("one", 26.0), 39.0);
        assert_eq!(text_block_height("one\ntwo", 26.0), 78.0);
    }
}
