use serde::{Deserialize, Serialize};
use std::fmt;

/// Ground-truth hand label, doubling as the participant's judgement value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Hand {
    #[serde(rename = "L")]
    Left,
    #[serde(rename = "R")]
    Right,
}

/// Sex of the photographed hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sex {
    #[serde(rename = "F")]
    Female,
    #[serde(rename = "M")]
    Male,
}

impl fmt::Display for Hand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Hand::Left => "L",
            Hand::Right => "R",
        })
    }
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Sex::Female => "F",
            Sex::Male => "M",
        })
    }
}

/// Composite key into the stimulus cache, one per hand image asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StimulusKey {
    pub sex: Sex,
    pub hand: Hand,
    pub angle: u32,
}

impl StimulusKey {
    pub fn new(sex: Sex, hand: Hand, angle: u32) -> Self {
        Self { sex, hand, angle }
    }

    /// Stem of the asset file name, `{sex}_{hand}_{angle}`.
    pub fn file_stem(&self) -> String {
        format!("{}_{}_{}", self.sex, self.hand, self.angle)
    }
}

impl fmt::Display for StimulusKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}", self.sex, self.hand, self.angle)
    }
}

/// One planned trial: which image to show and how far to rotate it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TrialDescriptor {
    pub key: StimulusKey,
    pub rotation: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_stem_matches_asset_naming() {
        let key = StimulusKey::new(Sex::Female, Hand::Left, 60);
        assert_eq!(key.file_stem(), "F_L_60");
        let key = StimulusKey::new(Sex::Male, Hand::Right, 300);
        assert_eq!(key.file_stem(), "M_R_300");
    }

    #[test]
    fn hand_serializes_as_single_letter() {
        assert_eq!(serde_json::to_string(&Hand::Left).unwrap(), "\"L\"");
        assert_eq!(serde_json::to_string(&Sex::Male).unwrap(), "\"M\"");
        let parsed: Hand = serde_json::from_str("\"R\"").unwrap();
        assert_eq!(parsed, Hand::Right);
    }
}
