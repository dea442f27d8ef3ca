use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Offset subtracted from the unit sample before scaling; the walk drifts
/// by `(0.5 - WALK_OFFSET) * WALK_SCALE` per step on average.
const WALK_OFFSET: f64 = 0.45;
const WALK_SCALE: f64 = 0.5;

#[derive(Debug)]
pub struct RandomWalk {
    current: f64,
    rng: StdRng,
}

impl RandomWalk {
    pub fn new(base_temperature: f64) -> Self {
        Self {
            current: base_temperature,
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(base_temperature: f64, seed: u64) -> Self {
        Self {
            current: base_temperature,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn current(&self) -> f64 {
        self.current
    }

    pub fn step(&mut self) -> f64 {
        let sample: f64 = self.rng.gen();
        self.current += (sample - WALK_OFFSET) * WALK_SCALE;
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_step_moves_within_bounds() {
        let mut walk = RandomWalk::seeded(-20.0, 7);
        let mut previous = walk.current();
        for _ in 0..1_000 {
            let next = walk.step();
            let delta = next - previous;
            assert!(delta >= -WALK_OFFSET * WALK_SCALE);
            assert!(delta < (1.0 - WALK_OFFSET) * WALK_SCALE);
            previous = next;
        }
    }

    #[test]
    fn same_seed_gives_same_walk() {
        let mut a = RandomWalk::seeded(4.0, 42);
        let mut b = RandomWalk::seeded(4.0, 42);
        for _ in 0..50 {
            assert_eq!(a.step(), b.step());
        }
    }
}
