pub mod phase;
pub mod stimulus;
pub mod trial;

pub use phase::{Phase, TaskPhase};
pub use stimulus::{Hand, Sex, StimulusKey, TrialDescriptor};
pub use trial::{Response, TrialResult, TrialState};
