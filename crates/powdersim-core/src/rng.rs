//! Random number source for the tick pipeline
//!
//! The engine only needs a handful of draws: inclusive integer ranges,
//! `n in d` chances and unit floats. Any `rand::Rng` works, and tests can
//! script outcomes by implementing the trait directly.

/// Random number generator used by the simulation
pub trait SimRng {
    /// Raw 32 bit draw
    fn gen_u32(&mut self) -> u32;

    /// Uniform float in [0.0, 1.0)
    fn uniform01(&mut self) -> f32;

    /// Uniform integer in the inclusive range `lo..=hi`
    fn between(&mut self, lo: i32, hi: i32) -> i32 {
        if hi <= lo {
            return lo;
        }
        let span = (hi as i64 - lo as i64 + 1) as u64;
        lo + (self.gen_u32() as u64 % span) as i32
    }

    /// True with probability `numerator / denominator`
    fn chance(&mut self, numerator: i32, denominator: i32) -> bool {
        if numerator <= 0 || denominator <= 0 {
            return false;
        }
        self.between(0, denominator - 1) < numerator
    }
}

impl<T: ?Sized + rand::Rng> SimRng for T {
    fn gen_u32(&mut self) -> u32 {
        rand::Rng::r#gen(self)
    }

    fn uniform01(&mut self) -> f32 {
        rand::Rng::r#gen(self)
    }
}

#[cfg(test)]
pub(crate) mod test_rng {
    use super::SimRng;

    /// Replays a fixed sequence of raw draws, then repeats the last one
    pub struct TestRng {
        values: Vec<u32>,
        pos: usize,
    }

    impl TestRng {
        pub fn new(values: Vec<u32>) -> Self {
            Self { values, pos: 0 }
        }

        /// Always draws the same value
        pub fn constant(value: u32) -> Self {
            Self::new(vec![value])
        }
    }

    impl SimRng for TestRng {
        fn gen_u32(&mut self) -> u32 {
            let v = self.values[self.pos.min(self.values.len() - 1)];
            self.pos += 1;
            v
        }

        fn uniform01(&mut self) -> f32 {
            (self.gen_u32() % 1000) as f32 / 1000.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_rng::TestRng;
    use super::*;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256StarStar;

    #[test]
    fn test_between_is_inclusive() {
        let mut rng = Xoshiro256StarStar::seed_from_u64(12345);
        let mut seen_lo = false;
        let mut seen_hi = false;
        for _ in 0..1000 {
            let v = rng.between(-2, 2);
            assert!((-2..=2).contains(&v));
            seen_lo |= v == -2;
            seen_hi |= v == 2;
        }
        assert!(seen_lo);
        assert!(seen_hi);
    }

    #[test]
    fn test_between_degenerate_range() {
        let mut rng = Xoshiro256StarStar::seed_from_u64(12345);
        assert_eq!(rng.between(7, 7), 7);
        assert_eq!(rng.between(7, 3), 7);
    }

    #[test]
    fn test_chance_extremes() {
        let mut rng = Xoshiro256StarStar::seed_from_u64(12345);
        for _ in 0..100 {
            assert!(rng.chance(10, 10));
            assert!(!rng.chance(0, 10));
        }
    }

    #[test]
    fn test_uniform01_range() {
        let mut rng = Xoshiro256StarStar::seed_from_u64(12345);
        for _ in 0..100 {
            let v = rng.uniform01();
            assert!((0.0..1.0).contains(&v));
        }
    }

    #[test]
    fn test_scripted_rng() {
        let mut rng = TestRng::new(vec![0, 9]);
        assert!(rng.chance(1, 10));
        assert!(!rng.chance(1, 10));
        // Repeats the last value once exhausted
        assert_eq!(rng.between(0, 9), 9);
    }

    #[test]
    fn test_deterministic_sequence() {
        let mut a = Xoshiro256StarStar::seed_from_u64(42);
        let mut b = Xoshiro256StarStar::seed_from_u64(42);
        for _ in 0..100 {
            assert_eq!(a.between(0, 1599), b.between(0, 1599));
        }
    }
}
