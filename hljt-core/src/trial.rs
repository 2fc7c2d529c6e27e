use serde::{Deserialize, Serialize};

use crate::stimulus::{Hand, Sex};

/// Trial state machine states
#[derive(Debug, Clone, PartialEq)]
pub enum TrialState {
    Fixation,
    Stimulus,
    Response,
    Complete,
}

/// Classified response for one trial. `judgement` is `None` only when an
/// optional response window elapsed without a mapped key press.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Response {
    pub judgement: Option<Hand>,
    /// Milliseconds from stimulus onset to the qualifying key press.
    pub rt: Option<f64>,
}

/// Recorded result row per trial
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialResult {
    pub block_num: usize,
    pub trial_num: usize,
    pub hand: Hand,
    pub sex: Sex,
    pub angle: u32,
    pub rotation: i32,
    pub judgement: Option<Hand>,
    pub rt: Option<f64>,
    pub accuracy: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_row_keeps_flat_field_names() {
        let row = TrialResult {
            block_num: 2,
            trial_num: 7,
            hand: Hand::Left,
            sex: Sex::Female,
            angle: 90,
            rotation: 180,
            judgement: Some(Hand::Left),
            rt: Some(612.5),
            accuracy: true,
        };
        let json = serde_json::to_value(&row).unwrap();
        for field in [
            "block_num",
            "trial_num",
            "hand",
            "sex",
            "angle",
            "rotation",
            "judgement",
            "rt",
            "accuracy",
        ] {
            assert!(json.get(field).is_some(), "missing field {field}");
        }
        assert_eq!(json["hand"], "L");
        assert_eq!(json["judgement"], "L");
        assert_eq!(json["accuracy"], true);
    }

    #[test]
    fn non_response_serializes_as_null() {
        let row = TrialResult {
            block_num: 1,
            trial_num: 1,
            hand: Hand::Right,
            sex: Sex::Male,
            angle: 270,
            rotation: 0,
            judgement: None,
            rt: None,
            accuracy: false,
        };
        let json = serde_json::to_value(&row).unwrap();
        assert!(json["judgement"].is_null());
        assert!(json["rt"].is_null());
    }
}
