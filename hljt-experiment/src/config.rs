use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use hljt_core::Hand;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("no view angles configured")]
    NoAngles,

    #[error("no rotations configured")]
    NoRotations,

    #[error("at least one task block is required")]
    NoBlocks,

    #[error("trials_per_block must be at least 1")]
    NoTrials,

    #[error("break_interval must be at least 1")]
    ZeroBreakInterval,

    #[error("left and right response keys must differ")]
    DuplicateKeys,

    #[error("screen geometry must be positive")]
    BadGeometry,
}

/// Response key assignment. Keys are compared case-insensitively.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct KeyMap {
    pub left: char,
    pub right: char,
}

impl KeyMap {
    pub fn judge(&self, key: char) -> Option<Hand> {
        let key = key.to_ascii_lowercase();
        if key == self.left.to_ascii_lowercase() {
            Some(Hand::Left)
        } else if key == self.right.to_ascii_lowercase() {
            Some(Hand::Right)
        } else {
            None
        }
    }
}

impl Default for KeyMap {
    fn default() -> Self {
        Self {
            left: 'q',
            right: 'p',
        }
    }
}

/// Physical display description, used to convert visual degrees to pixels.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenGeometry {
    pub width_px: u32,
    pub height_px: u32,
    pub width_cm: f64,
    pub distance_cm: f64,
}

impl ScreenGeometry {
    pub fn pixels_per_degree(&self) -> f64 {
        let px_per_cm = self.width_px as f64 / self.width_cm;
        // arc subtended by one degree at the viewing distance
        let cm_per_deg = 2.0 * self.distance_cm * (0.5f64.to_radians()).tan();
        px_per_cm * cm_per_deg
    }

    pub fn deg_to_px(&self, deg: f64) -> u32 {
        (deg * self.pixels_per_degree()).round().max(1.0) as u32
    }
}

impl Default for ScreenGeometry {
    fn default() -> Self {
        Self {
            width_px: 1920,
            height_px: 1080,
            width_cm: 53.0,
            distance_cm: 57.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskConfig {
    pub image_dir: PathBuf,
    pub font_path: PathBuf,

    /// Height of the prepared hand images, in visual degrees.
    pub hand_size_deg: f64,
    pub fixation_size_deg: f64,
    pub fixation_thickness_deg: f64,

    pub run_practice: bool,
    pub practice_trials: usize,
    pub blocks: usize,
    pub trials_per_block: usize,
    /// Completed trials between breaks within a block.
    pub break_interval: usize,

    pub fixation_ms: u64,
    /// Minimum dwell before a message screen accepts its confirmation key.
    pub prompt_delay_ms: u64,
    pub inter_trial_ms: u64,
    /// `None` waits indefinitely for a response.
    pub response_timeout_ms: Option<u64>,

    pub rotations: Vec<i32>,
    pub angles: Vec<u32>,
    pub keymap: KeyMap,
    pub screen: ScreenGeometry,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            image_dir: PathBuf::from("assets/hands"),
            font_path: PathBuf::from("assets/DejaVuSans.ttf"),
            hand_size_deg: 6.0,
            fixation_size_deg: 0.5,
            fixation_thickness_deg: 0.1,
            run_practice: true,
            practice_trials: 12,
            blocks: 2,
            trials_per_block: 48,
            break_interval: 24,
            fixation_ms: 1000,
            prompt_delay_ms: 1500,
            inter_trial_ms: 500,
            response_timeout_ms: None,
            rotations: vec![0, 90, 180, 270],
            angles: vec![60, 90, 120, 240, 270, 300],
            keymap: KeyMap::default(),
            screen: ScreenGeometry::default(),
        }
    }
}

impl TaskConfig {
    /// Reads a JSON config file, filling omitted fields from the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let bytes = std::fs::read(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self =
            serde_json::from_slice(&bytes).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.angles.is_empty() {
            return Err(ConfigError::NoAngles);
        }
        if self.rotations.is_empty() {
            return Err(ConfigError::NoRotations);
        }
        if self.blocks == 0 {
            return Err(ConfigError::NoBlocks);
        }
        if self.trials_per_block == 0 {
            return Err(ConfigError::NoTrials);
        }
        if self.break_interval == 0 {
            return Err(ConfigError::ZeroBreakInterval);
        }
        if self.keymap.left.to_ascii_lowercase() == self.keymap.right.to_ascii_lowercase() {
            return Err(ConfigError::DuplicateKeys);
        }
        let s = &self.screen;
        if s.width_px == 0 || s.height_px == 0 || s.width_cm <= 0.0 || s.distance_cm <= 0.0 {
            return Err(ConfigError::BadGeometry);
        }
        Ok(())
    }

    pub fn practice_enabled(&self) -> bool {
        self.run_practice && self.practice_trials > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_pass_validation() {
        TaskConfig::default().validate().unwrap();
    }

    #[test]
    fn zero_break_interval_is_rejected() {
        let config = TaskConfig {
            break_interval: 0,
            ..TaskConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ZeroBreakInterval)
        ));
    }

    #[test]
    fn duplicate_response_keys_are_rejected() {
        let config = TaskConfig {
            keymap: KeyMap {
                left: 'q',
                right: 'Q',
            },
            ..TaskConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::DuplicateKeys)));
    }

    #[test]
    fn keymap_judges_case_insensitively() {
        let keymap = KeyMap::default();
        assert_eq!(keymap.judge('q'), Some(Hand::Left));
        assert_eq!(keymap.judge('Q'), Some(Hand::Left));
        assert_eq!(keymap.judge('p'), Some(Hand::Right));
        assert_eq!(keymap.judge('x'), None);
    }

    #[test]
    fn degrees_convert_through_physical_geometry() {
        let screen = ScreenGeometry {
            width_px: 1920,
            height_px: 1080,
            width_cm: 53.0,
            distance_cm: 57.0,
        };
        // at 57 cm one degree subtends just under 1 cm
        let ppd = screen.pixels_per_degree();
        assert!(ppd > 35.0 && ppd < 37.0, "ppd = {ppd}");
        assert_eq!(screen.deg_to_px(0.0), 1);
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let parsed: TaskConfig = serde_json::from_str(r#"{"fixation_ms": 750}"#).unwrap();
        assert_eq!(parsed.fixation_ms, 750);
        assert_eq!(parsed.trials_per_block, 48);
        assert_eq!(parsed.keymap.left, 'q');
    }
}
