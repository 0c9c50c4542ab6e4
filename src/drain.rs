// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! The DRAIN mode: pace at `drain_gain` (`1/high_gain`) to empty the queue
//! STARTUP built up, holding `cwnd_gain` at `high_gain` so cwnd doesn't
//! shrink out from under the still-large flight count.

use crate::bandwidth::Gain;

pub const PACING_GAIN: Gain = Gain::DRAIN_GAIN;
pub const CWND_GAIN: Gain = Gain::HIGH_GAIN;

/// DRAIN is done once `packets_in_flight` has fallen to the estimated BDP at
/// unity gain -- the caller computes that BDP itself (it needs the same
/// `bdp()` helper PROBE_BW and PROBE_RTT use) and calls this as a plain
/// comparison.
#[inline]
pub const fn is_done(packets_in_flight: u32, bdp_at_unity_gain: u32) -> bool {
    packets_in_flight <= bdp_at_unity_gain
}
