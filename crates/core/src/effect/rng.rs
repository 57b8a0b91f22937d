//! Deterministic random stream for randomized magnitudes.
//!
//! PCG-XSH-RR: 64-bit LCG state permuted into 32-bit output. Same seed,
//! same sequence, which keeps simulation runs replayable.

/// A seeded PCG stream. One stream is owned per engine so randomized
/// magnitudes draw from a single deterministic sequence.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PcgStream {
    state: u64,
}

impl PcgStream {
    const MULTIPLIER: u64 = 6364136223846793005;
    const INCREMENT: u64 = 1442695040888963407;

    pub fn new(seed: u64) -> Self {
        // Standard PCG seeding: step once, mix the seed in, step again.
        let mut stream = Self { state: 0 };
        stream.step();
        stream.state = stream.state.wrapping_add(seed);
        stream.step();
        stream
    }

    #[inline]
    fn step(&mut self) {
        self.state = self
            .state
            .wrapping_mul(Self::MULTIPLIER)
            .wrapping_add(Self::INCREMENT);
    }

    /// XSH-RR output permutation over the pre-step state.
    pub fn next_u32(&mut self) -> u32 {
        let state = self.state;
        self.step();
        let xorshifted = (((state >> 18) ^ state) >> 27) as u32;
        let rot = (state >> 59) as u32;
        xorshifted.rotate_right(rot)
    }

    /// Uniform draw in `[0, 1)`.
    pub fn next_f32(&mut self) -> f32 {
        // 24 bits of mantissa, so divide a 24-bit draw by 2^24.
        (self.next_u32() >> 8) as f32 / (1u32 << 24) as f32
    }

    /// Uniform draw in `[min, max)`; returns `min` when the range is empty.
    pub fn range_f32(&mut self, min: f32, max: f32) -> f32 {
        if min >= max {
            return min;
        }
        min + self.next_f32() * (max - min)
    }
}

impl Default for PcgStream {
    fn default() -> Self {
        Self::new(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_sequence() {
        let mut a = PcgStream::new(42);
        let mut b = PcgStream::new(42);
        for _ in 0..16 {
            assert_eq!(a.next_u32(), b.next_u32());
        }
    }

    #[test]
    fn different_seeds_diverge() {
        let mut a = PcgStream::new(1);
        let mut b = PcgStream::new(2);
        let diverged = (0..8).any(|_| a.next_u32() != b.next_u32());
        assert!(diverged);
    }

    #[test]
    fn range_draws_stay_in_bounds() {
        let mut stream = PcgStream::new(7);
        for _ in 0..64 {
            let value = stream.range_f32(2.0, 5.0);
            assert!((2.0..5.0).contains(&value));
        }
        assert_eq!(stream.range_f32(3.0, 3.0), 3.0);
    }
}
