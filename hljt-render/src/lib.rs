pub mod render;

pub use render::{fixation_cross, load_font, render_text_pixmap, SkiaRenderer};
