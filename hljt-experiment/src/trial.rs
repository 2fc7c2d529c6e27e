use hljt_core::{Response, TrialDescriptor, TrialState};

/// The trial currently being run, from fixation onset to completion.
pub struct ActiveTrial<T> {
    pub descriptor: TrialDescriptor,
    pub fixation_start: T,
    /// Set when the shell reports the first presented stimulus frame;
    /// anchors the reaction time.
    pub stimulus_start: Option<T>,
    pub response: Response,
    pub state: TrialState,
}

impl<T> ActiveTrial<T> {
    pub fn new(descriptor: TrialDescriptor, fixation_start: T) -> Self {
        Self {
            descriptor,
            fixation_start,
            stimulus_start: None,
            response: Response::default(),
            state: TrialState::Fixation,
        }
    }
}
