// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Time related datatypes used by the round-trip and windowing logic.

mod clock;
mod timestamp;

pub use clock::*;
pub use timestamp::*;

#[cfg(any(test, feature = "testing"))]
pub mod testing {
    pub use super::clock::testing::Clock;
}

/// The finest granularity of time the model reasons about.
///
/// `min_rtt` and round-trip samples below this resolution are treated as
/// equal; this avoids timer churn from chasing sub-millisecond jitter.
pub const K_GRANULARITY: core::time::Duration = core::time::Duration::from_millis(1);
