pub mod config;
pub mod deck;
pub mod factory;
pub mod screens;
pub mod state;
pub mod trial;

pub use config::{ConfigError, KeyMap, ScreenGeometry, TaskConfig};
pub use deck::{shuffled_choices, Deck};
pub use factory::{stimulus_keys, TrialFactory};
pub use screens::{ConfirmKey, Screen, ScreenState};
pub use state::{SessionState, TaskEvent, TaskStateMachine, DEMO_HAND_COUNT};
pub use trial::ActiveTrial;
