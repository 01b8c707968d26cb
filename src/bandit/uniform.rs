use rand::Rng;

use super::{ArmState, BanditSnapshot, BanditStrategy};

/// Selects an arm uniformly at random, ignoring reward history entirely.
#[derive(Debug, Default)]
pub struct Uniform {
    arms: Vec<ArmState>,
}

impl BanditStrategy for Uniform {
    fn init(&mut self, n: usize) {
        self.arms = vec![ArmState::default(); n];
    }

    fn select(&mut self) -> usize {
        rand::thread_rng().gen_range(0..self.arms.len())
    }

    fn update(&mut self, arm: usize, reward: f64) {
        self.arms[arm].observe(reward);
    }

    fn serialize(&self) -> BanditSnapshot {
        BanditSnapshot { arms: self.arms.clone() }
    }
}
