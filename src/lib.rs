// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! A standalone implementation of the BBR ("Bottleneck Bandwidth and
//! Round-trip propagation time") congestion control algorithm's core model
//! and state machine.
//!
//! This crate computes `pacing_rate` and `cwnd` from round-trip delivery
//! feedback. It does not own a socket, a timer wheel, or a scheduler: the
//! host integration supplies packet-sent/ack/loss events through the
//! [`Host`](host::Host) trait and reads the resulting control outputs back
//! out of [`Bbr`](bbr::Bbr).

#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![warn(clippy::all)]

#[macro_use]
mod number;
#[macro_use]
mod diag;

pub mod bandwidth;
pub mod bbr;
pub mod config;
pub mod counter;
pub mod full_pipe;
pub mod host;
pub mod lt_bw;
pub mod min_rtt;
pub mod pacing;
pub mod probe_bw;
pub mod probe_rtt;
pub mod random;
pub mod recovery_state;
pub mod round;
pub mod time;
pub mod windowed_filter;

mod drain;
mod startup;

pub use bbr::Bbr;
pub use config::{Config, ConfigError};

#[cfg(any(test, feature = "testing"))]
pub mod testing {
    pub use crate::random::testing::Generator;
    pub use crate::time::testing::Clock;
}
