use image::RgbaImage;
use tiny_skia::{ColorU8, FilterQuality, Pixmap, PixmapPaint, Transform};

use crate::error::StimulusError;

/// Converts straight-alpha RGBA into a premultiplied pixmap so it can be
/// composited with tiny-skia blend modes.
pub fn to_pixmap(img: &RgbaImage) -> Result<Pixmap, StimulusError> {
    let (w, h) = img.dimensions();
    let mut pm = Pixmap::new(w.max(1), h.max(1)).ok_or(StimulusError::PixmapAlloc {
        width: w,
        height: h,
    })?;

    let dst = pm.pixels_mut();
    for (i, px) in img.pixels().enumerate() {
        let [r, g, b, a] = px.0;
        dst[i] = ColorU8::from_rgba(r, g, b, a).premultiply();
    }

    Ok(pm)
}

/// Rotates counter-clockwise by `degrees` around the image centre, growing
/// the canvas so no corner is clipped.
pub fn rotate_expand(src: &Pixmap, degrees: f32) -> Result<Pixmap, StimulusError> {
    if degrees.rem_euclid(360.0) == 0.0 {
        return Ok(src.clone());
    }

    let w = src.width() as f32;
    let h = src.height() as f32;
    let theta = degrees.to_radians();
    let (sin, cos) = (theta.sin().abs(), theta.cos().abs());
    let out_w = ((w * cos + h * sin).round() as u32).max(1);
    let out_h = ((w * sin + h * cos).round() as u32).max(1);

    let mut out = Pixmap::new(out_w, out_h).ok_or(StimulusError::PixmapAlloc {
        width: out_w,
        height: out_h,
    })?;

    // tiny-skia rotates clockwise for positive angles, so negate.
    let ts = Transform::from_translate(-w * 0.5, -h * 0.5)
        .post_concat(Transform::from_rotate(-degrees))
        .post_concat(Transform::from_translate(out_w as f32 * 0.5, out_h as f32 * 0.5));

    let paint = PixmapPaint {
        quality: FilterQuality::Bilinear,
        ..PixmapPaint::default()
    };
    out.draw_pixmap(0, 0, src.as_ref(), &paint, ts, None);

    Ok(out)
}
