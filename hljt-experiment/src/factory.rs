use rand::Rng;

use hljt_core::{Hand, Sex, StimulusKey, TrialDescriptor};

use crate::config::TaskConfig;
use crate::deck::Deck;

/// The closed set of stimulus keys the configuration describes.
pub fn stimulus_keys(config: &TaskConfig) -> Vec<StimulusKey> {
    let mut keys = Vec::new();
    for sex in [Sex::Female, Sex::Male] {
        for hand in [Hand::Left, Hand::Right] {
            for &angle in &config.angles {
                keys.push(StimulusKey::new(sex, hand, angle));
            }
        }
    }
    keys
}

/// Deals trial descriptors from a deck over the full
/// sex x hand x angle x rotation crossing. The deck persists across blocks,
/// so no combination repeats anywhere in the session until the whole
/// crossing has been dealt.
#[derive(Debug, Clone)]
pub struct TrialFactory {
    deck: Deck<TrialDescriptor>,
}

impl TrialFactory {
    pub fn new(config: &TaskConfig) -> Self {
        let mut crossing = Vec::new();
        for key in stimulus_keys(config) {
            for &rotation in &config.rotations {
                crossing.push(TrialDescriptor { key, rotation });
            }
        }
        Self {
            deck: Deck::new(crossing),
        }
    }

    pub fn crossing_len(&self) -> usize {
        self.deck.set_len()
    }

    pub fn block_trials<R: Rng>(&mut self, rng: &mut R, n: usize) -> Vec<TrialDescriptor> {
        (0..n).filter_map(|_| self.deck.draw(rng)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn small_config() -> TaskConfig {
        TaskConfig {
            angles: vec![60, 90],
            rotations: vec![0, 180],
            ..TaskConfig::default()
        }
    }

    #[test]
    fn blocks_have_the_requested_length() {
        let config = small_config();
        let mut rng = StdRng::seed_from_u64(3);
        let mut factory = TrialFactory::new(&config);
        assert_eq!(factory.crossing_len(), 16);
        assert_eq!(factory.block_trials(&mut rng, 12).len(), 12);
        assert_eq!(factory.block_trials(&mut rng, 48).len(), 48);
    }

    #[test]
    fn trials_only_use_configured_factor_levels() {
        let config = small_config();
        let mut rng = StdRng::seed_from_u64(5);
        let mut factory = TrialFactory::new(&config);

        for trial in factory.block_trials(&mut rng, 40) {
            assert!(config.angles.contains(&trial.key.angle));
            assert!(config.rotations.contains(&trial.rotation));
        }
    }

    #[test]
    fn full_crossing_is_dealt_before_any_repeat() {
        let config = small_config();
        let mut rng = StdRng::seed_from_u64(9);
        let mut factory = TrialFactory::new(&config);

        let n = factory.crossing_len();
        let first_pass = factory.block_trials(&mut rng, n);
        let unique: HashSet<TrialDescriptor> = first_pass.into_iter().collect();
        assert_eq!(unique.len(), n);
    }
}
