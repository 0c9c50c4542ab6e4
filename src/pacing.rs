// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Pacing rate control and the TSO segmentation hint.
//!
//! Scoped to just the rate computation and monotonicity rule: a fuller
//! pacer also owns the packet-departure-time scheduler (`capacity`,
//! `next_packet_departure_time`), which belongs to the host transport
//! rather than to this model.

use crate::bandwidth::{Bandwidth, Gain};

/// `pacing_rate` never decreases until the pipe is known to be full,
/// to avoid a premature bandwidth underestimate capping the send rate
/// during STARTUP's ramp.
///
/// Returns the rate to actually apply: `candidate` if it's larger than
/// `current`, or if `filled_pipe` permits a decrease.
#[inline]
pub fn next_pacing_rate_bps(current_bps: u64, candidate_bps: u64, filled_pipe: bool) -> u64 {
    if filled_pipe || candidate_bps > current_bps {
        candidate_bps
    } else {
        current_bps
    }
}

/// Computes the candidate pacing rate for `bw` at `gain`, in bytes/sec.
#[inline]
pub fn compute_pacing_rate_bps(bw: Bandwidth, mss: u32, gain: Gain) -> u64 {
    bw.to_pacing_rate_bps(mss, gain)
}

/// TSO hint: minimum segments per GSO/TSO burst is 1 below
/// 1.2Mbit/s (150kB/s) of pacing rate, else 2.
const MIN_SEGS_LOW_RATE_THRESHOLD_BPS: u64 = 150_000;

/// Derives the TSO segmentation hint from the current pacing rate and mss,
/// per `tso_segs_goal = clamp(pacing_rate / (shift_ns * mss), min_segs, gso_max)`.
///
/// `gso_max_segs` is the host's GSO/TSO burst ceiling (already accounting
/// for header overhead); `shift_ns` is the host's scheduling-interval
/// divisor (the reference uses roughly one jiffy).
#[inline]
pub fn tso_segs(pacing_rate_bps: u64, mss: u32, shift_ns: u64, gso_max_segs: u32) -> u32 {
    let min_segs = if pacing_rate_bps < MIN_SEGS_LOW_RATE_THRESHOLD_BPS {
        1
    } else {
        2
    };

    let bytes_per_shift = (pacing_rate_bps as u128 * shift_ns as u128) / 1_000_000_000u128;
    let segs = (bytes_per_shift / mss.max(1) as u128).min(u32::MAX as u128) as u32;

    segs.max(min_segs).min(gso_max_segs)
}
