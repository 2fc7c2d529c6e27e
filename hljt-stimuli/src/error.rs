use std::path::PathBuf;

use hljt_core::StimulusKey;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StimulusError {
    #[error("failed to read stimulus image {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode stimulus image {path}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("stimulus {key} has no visible pixels")]
    FullyTransparent { key: StimulusKey },

    #[error("pixmap allocation failed for {width}x{height}")]
    PixmapAlloc { width: u32, height: u32 },
}
