//! `Bandit` — peer selection. A k-armed multi-armed bandit maps observed
//! rewards to arm pulls (arms are gossip peers). See `spec.md` §4.8.

pub mod annealing;
pub mod epsilon_greedy;
pub mod uniform;

use serde::{Deserialize, Serialize};

pub use annealing::AnnealingEpsilonGreedy;
pub use epsilon_greedy::EpsilonGreedy;
pub use uniform::Uniform;

/// Per-arm pull count and running mean reward.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ArmState {
    pub pulls: u64,
    pub mean_reward: f64,
}

impl ArmState {
    /// Incremental mean: `q += (r - q) / (c + 1); c += 1`.
    fn observe(&mut self, reward: f64) {
        self.mean_reward += (reward - self.mean_reward) / (self.pulls as f64 + 1.0);
        self.pulls += 1;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BanditSnapshot {
    pub arms: Vec<ArmState>,
}

/// Common interface every peer-selection strategy implements. Only ever
/// touched by the single anti-entropy task (see `spec.md` §5), so no
/// internal locking is needed — `&mut self` is enough.
pub trait BanditStrategy: Send {
    /// Prepare `n` arms (one per configured peer).
    fn init(&mut self, n: usize);

    /// Choose an arm index in `[0, n)`.
    fn select(&mut self) -> usize;

    /// Feed back the reward (unbounded, negative allowed) for the last
    /// pull of `arm`.
    fn update(&mut self, arm: usize, reward: f64);

    /// Snapshot of per-arm counts and mean rewards.
    fn serialize(&self) -> BanditSnapshot;
}

/// Shared argmax-with-lowest-index-tiebreak used by the greedy strategies.
fn argmax(arms: &[ArmState]) -> usize {
    let mut best = 0;
    for (i, arm) in arms.iter().enumerate().skip(1) {
        if arm.mean_reward > arms[best].mean_reward {
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argmax_breaks_ties_on_lowest_index() {
        let arms = vec![
            ArmState { pulls: 1, mean_reward: 0.5 },
            ArmState { pulls: 1, mean_reward: 0.5 },
            ArmState { pulls: 1, mean_reward: 0.2 },
        ];
        assert_eq!(argmax(&arms), 0);
    }

    #[test]
    fn arm_state_incremental_mean_matches_running_average() {
        let mut arm = ArmState::default();
        arm.observe(1.0);
        arm.observe(0.0);
        arm.observe(0.5);
        assert!((arm.mean_reward - 0.5).abs() < 1e-9);
        assert_eq!(arm.pulls, 3);
    }
}
