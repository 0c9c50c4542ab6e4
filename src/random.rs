// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Randomness used by the PROBE_BW cycle (`cycle_rand`) and the
//! PROBE_RTT scheduling jitter.

/// A generator of random data for the model's jittered timers.
///
/// Only "public" randomness is needed here: the values this crate randomizes
/// (which PROBE_BW phase to start a cycle in, how long to wait before the
/// next bandwidth probe) carry no confidentiality requirement, but the trait
/// keeps the same two-method shape used elsewhere in this codebase so a host
/// can share one RNG source across subsystems with different secrecy needs.
pub trait Generator: Send {
    /// Fills `dest` with unpredictable bits.
    fn fill(&mut self, dest: &mut [u8]);

    /// Returns a `u64` uniformly distributed over the full range.
    fn gen_u64(&mut self) -> u64 {
        let mut bytes = [0u8; 8];
        self.fill(&mut bytes);
        u64::from_le_bytes(bytes)
    }

    /// Returns a value uniformly distributed in `0..bound`, or `0` if `bound` is `0`.
    fn gen_range(&mut self, bound: u64) -> u64 {
        if bound == 0 {
            return 0;
        }
        self.gen_u64() % bound
    }
}

#[cfg(feature = "std")]
mod std_rng {
    use super::Generator;
    use rand::RngCore;

    /// A [`Generator`] backed by the host operating system's CSPRNG via `rand`.
    #[derive(Debug, Default)]
    pub struct StdGenerator(rand::rngs::StdRng);

    impl StdGenerator {
        pub fn new() -> Self {
            use rand::SeedableRng;
            Self(rand::rngs::StdRng::from_entropy())
        }
    }

    impl Generator for StdGenerator {
        fn fill(&mut self, dest: &mut [u8]) {
            self.0.fill_bytes(dest);
        }
    }
}

#[cfg(feature = "std")]
pub use std_rng::StdGenerator;

#[cfg(any(test, feature = "testing"))]
pub mod testing {
    /// A deterministic, seed-derived [`Generator`](super::Generator) for tests.
    #[derive(Debug)]
    pub struct Generator {
        pub seed: u8,
    }

    impl Default for Generator {
        fn default() -> Self {
            Self { seed: 123 }
        }
    }

    impl super::Generator for Generator {
        fn fill(&mut self, dest: &mut [u8]) {
            let seed = self.seed;

            for (i, elem) in dest.iter_mut().enumerate() {
                *elem = seed ^ i as u8;
            }

            self.seed = self.seed.wrapping_add(1)
        }
    }
}
