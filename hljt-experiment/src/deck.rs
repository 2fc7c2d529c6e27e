use rand::seq::SliceRandom;
use rand::Rng;

/// Samples without replacement, reshuffling a fresh copy of the item set
/// whenever the current pass runs dry. Every element is dealt exactly once
/// per pass, so short factor sets still cover evenly.
#[derive(Debug, Clone)]
pub struct Deck<T> {
    items: Vec<T>,
    pool: Vec<T>,
}

impl<T: Clone> Deck<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items,
            pool: Vec::new(),
        }
    }

    pub fn draw<R: Rng>(&mut self, rng: &mut R) -> Option<T> {
        if self.items.is_empty() {
            return None;
        }
        if self.pool.is_empty() {
            let mut fresh = self.items.clone();
            fresh.shuffle(rng);
            self.pool = fresh;
        }
        self.pool.pop()
    }

    pub fn set_len(&self) -> usize {
        self.items.len()
    }
}

/// Deals `n` items deck-style. With `n >= items.len()` every element shows
/// up within each full pass.
pub fn shuffled_choices<T: Clone, R: Rng>(rng: &mut R, items: &[T], n: usize) -> Vec<T> {
    let mut deck = Deck::new(items.to_vec());
    (0..n).filter_map(|_| deck.draw(rng)).collect()
}
