pub mod bank;
pub mod error;
pub mod pixmap;

pub use bank::{prepare, scale_to_height, scale_to_width, trim, StimulusBank};
pub use error::StimulusError;
pub use pixmap::{rotate_expand, to_pixmap};
