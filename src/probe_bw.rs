// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! PROBE_BW mode: the steady-state 8-phase gain cycle that
//! alternates brief bandwidth probes with queue-draining pauses around a
//! baseline of unity gain.
//!
//! The original BBRv1 eight-phase schedule is used here rather than a
//! BBRv2-style four-phase Down/Cruise/Refill/Up cycle:
//! `[5/4, 3/4, 1, 1, 1, 1, 1, 1]`, entered at a uniformly random phase in
//! `0..7`. The reference implementation's entry range excludes only phase 7
//! despite the BBR paper's stated intent to avoid starting on the probe
//! phase (which would also exclude phase 1) -- this is carried forward
//! unchanged rather than silently corrected.

use crate::bandwidth::Gain;
use crate::random::Generator;
use crate::time::Timestamp;
use core::time::Duration;

pub const CWND_GAIN: Gain = Gain::CWND_GAIN;

/// `gain_cycle_rand` (`cycle_rand = 7`): the gain cycle's entry phase is
/// drawn uniformly from `0..CYCLE_RAND_BOUND`, i.e. `0..=6` -- every phase
/// except the final one (index 7).
pub const CYCLE_RAND_BOUND: u64 = 7;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct State {
    cycle_idx: u8,
    cycle_stamp: Timestamp,
    gain_cycle: [Gain; 8],
}

impl State {
    /// enters PROBE_BW with a uniformly random starting phase.
    ///
    /// `cycle_rand_bound` and `gain_cycle` are normally
    /// [`CYCLE_RAND_BOUND`]/[`Gain::PROBE_BW_CYCLE`]; taken as parameters so
    /// a [`crate::config::Config`] can override them (e.g. a simulator
    /// sweeping `cycle_rand`).
    pub fn enter(
        now: Timestamp,
        random: &mut dyn Generator,
        cycle_rand_bound: u64,
        gain_cycle: [Gain; 8],
    ) -> Self {
        let cycle_idx = random.gen_range(cycle_rand_bound) as u8;
        Self {
            cycle_idx,
            cycle_stamp: now,
            gain_cycle,
        }
    }

    pub fn pacing_gain(&self) -> Gain {
        self.gain_cycle[self.cycle_idx as usize % self.gain_cycle.len()]
    }

    pub fn cycle_idx(&self) -> u8 {
        self.cycle_idx
    }

    /// advances the gain cycle if the current phase's hold condition
    /// is satisfied. `min_rtt` gates the gain=1 phases' minimum dwell time;
    /// `bdp_packets`/`packets_in_flight` decide whether a gain=1 phase has
    /// waited long enough for a still-inflated queue to drain, and whether
    /// the gain=5/4 probe phase has pushed enough data to call the probe
    /// done.
    pub fn on_ack(
        &mut self,
        now: Timestamp,
        min_rtt: Duration,
        packets_in_flight: u32,
        bdp_packets: u32,
        has_losses: bool,
        random: &mut dyn Generator,
    ) {
        let elapsed = now.saturating_duration_since(self.cycle_stamp);
        let is_full_length = elapsed >= min_rtt;
        let gain = self.pacing_gain();

        let advance = if gain.is_above_unity() {
            // gain = 5/4: don't persist past one min_rtt, and don't persist
            // if packets were lost -- a path with small buffers may not
            // hold the inflated in-flight this phase is probing for.
            is_full_length
                && (has_losses || packets_in_flight as u64 * 4 >= bdp_packets as u64 * 5)
        } else if gain.is_below_unity() {
            // gain = 3/4: drain until either a full min_rtt has elapsed or
            // in-flight has fallen back to the unity-gain BDP, whichever
            // comes first.
            is_full_length || packets_in_flight <= bdp_packets
        } else {
            // gain = 1: cruise phases are held for one min_rtt each before
            // cycling back toward another probe.
            is_full_length
        };

        if advance {
            self.cycle_idx = (self.cycle_idx + 1) % self.gain_cycle.len() as u8;
            self.cycle_stamp = now;
            let _ = random; // reserved: a future revision may re-randomize phase 1's dwell
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Generator as TestGenerator;
    use crate::time::{Clock, NoopClock};

    #[test]
    fn entry_phase_is_within_bound() {
        let mut rng = TestGenerator::default();
        let now = NoopClock.get_time();
        let state = State::enter(now, &mut rng, CYCLE_RAND_BOUND, Gain::PROBE_BW_CYCLE);
        assert!((state.cycle_idx() as u64) < CYCLE_RAND_BOUND);
    }

    #[test]
    fn gain_one_phase_advances_after_one_min_rtt() {
        let mut rng = TestGenerator::default();
        let now = NoopClock.get_time();
        let mut state = State {
            cycle_idx: 2, // gain = 1
            cycle_stamp: now,
            gain_cycle: Gain::PROBE_BW_CYCLE,
        };

        let min_rtt = Duration::from_millis(50);
        state.on_ack(now + Duration::from_millis(10), min_rtt, 10, 10, false, &mut rng);
        assert_eq!(state.cycle_idx(), 2);

        state.on_ack(now + min_rtt, min_rtt, 10, 10, false, &mut rng);
        assert_eq!(state.cycle_idx(), 3);
    }

    #[test]
    fn probe_phase_holds_for_full_min_rtt_even_with_queue_growth() {
        let mut rng = TestGenerator::default();
        let now = NoopClock.get_time();
        let mut state = State {
            cycle_idx: 0, // gain = 5/4
            cycle_stamp: now,
            gain_cycle: Gain::PROBE_BW_CYCLE,
        };

        let min_rtt = Duration::from_millis(50);
        // in_flight/bdp = 1.3 > 1.25, but a full min_rtt hasn't elapsed yet
        state.on_ack(now + Duration::from_millis(1), min_rtt, 13, 10, false, &mut rng);
        assert_eq!(state.cycle_idx(), 0);

        // once a full min_rtt has elapsed, the same queue growth ends the probe
        state.on_ack(now + min_rtt, min_rtt, 13, 10, false, &mut rng);
        assert_eq!(state.cycle_idx(), 1);
    }

    #[test]
    fn probe_phase_holds_past_one_min_rtt_without_losses_or_queue_growth() {
        let mut rng = TestGenerator::default();
        let now = NoopClock.get_time();
        let mut state = State {
            cycle_idx: 0, // gain = 5/4
            cycle_stamp: now,
            gain_cycle: Gain::PROBE_BW_CYCLE,
        };

        let min_rtt = Duration::from_millis(50);
        // full min_rtt elapsed, but in_flight never grew past bdp and no losses
        state.on_ack(now + min_rtt, min_rtt, 10, 10, false, &mut rng);
        assert_eq!(state.cycle_idx(), 0);
    }

    #[test]
    fn cycle_wraps_at_eight_phases() {
        let mut rng = TestGenerator::default();
        let now = NoopClock.get_time();
        let mut state = State {
            cycle_idx: 7,
            cycle_stamp: now,
            gain_cycle: Gain::PROBE_BW_CYCLE,
        };
        let min_rtt = Duration::from_millis(50);
        state.on_ack(now + min_rtt, min_rtt, 10, 10, false, &mut rng);
        assert_eq!(state.cycle_idx(), 0);
    }
}
