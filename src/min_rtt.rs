// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! min_rtt tracking and PROBE_RTT scheduling, and the ack-aggregation
//! bonus estimator.
//!
//! Both live in the same model because PROBE_RTT's 10-second window and the
//! ack-aggregation epoch are both anchored to timestamps carried alongside
//! the windowed bandwidth estimate, and resetting one at a mode transition
//! commonly means resetting the other.

use crate::bandwidth::{Bandwidth, Gain, BW_UNIT};
use crate::time::Timestamp;
use core::time::Duration;

/// `min_rtt_win_sec`: the window after which `min_rtt_us` is considered
/// stale and a PROBE_RTT round is due.
pub const MIN_RTT_WIN: Duration = Duration::from_secs(10);

/// `extra_acked_win_rtts`: number of rounds each ack-aggregation slot covers
/// before the two-slot window rotates.
const EXTRA_ACKED_WIN_RTTS: u8 = 5;

/// `extra_acked_max_us`: the aggregation bonus is capped at the bandwidth
/// estimate times this many microseconds (100ms) of extra buffering.
const EXTRA_ACKED_MAX_US: u64 = 100_000;

/// `ack_epoch_acked_reset_thresh`: the epoch resets if accumulated acked
/// bytes would exceed this many packets (2^20).
const ACK_EPOCH_ACKED_RESET_THRESH: u32 = 1 << 20;

/// The cap applied to the 20-bit `ack_epoch_acked` counter itself.
const ACK_EPOCH_ACKED_CAP: u32 = (1 << 20) - 1;

/// `extra_acked_gain`: the ratio applied to the two-slot aggregation max to
/// produce the cwnd bonus, scaled by `BBR_UNIT` like any other gain (an
/// unscaled value of `1` means the bonus equals the aggregation max
/// outright).
const EXTRA_ACKED_GAIN: Gain = Gain::UNITY;

#[derive(Clone, Debug)]
pub struct Model {
    min_rtt_us: Option<u64>,
    min_rtt_stamp: Timestamp,
    min_rtt_win: Duration,

    extra_acked: [u32; 2],
    extra_acked_win_idx: usize,
    extra_acked_win_rtts: u8,
    ack_epoch_mstamp: Timestamp,
    ack_epoch_acked: u32,
}

impl Model {
    /// `min_rtt_win` is normally [`MIN_RTT_WIN`]; it is taken as a parameter
    /// rather than baked in so a [`crate::config::Config`] can shorten it
    /// for a simulator that wants to exercise PROBE_RTT more often.
    pub fn new(now: Timestamp, min_rtt_win: Duration) -> Self {
        Self {
            min_rtt_us: None,
            min_rtt_stamp: now,
            min_rtt_win,
            extra_acked: [0, 0],
            extra_acked_win_idx: 0,
            extra_acked_win_rtts: 0,
            ack_epoch_mstamp: now,
            ack_epoch_acked: 0,
        }
    }

    pub fn min_rtt_us(&self) -> Option<u64> {
        self.min_rtt_us
    }

    /// Whether the min_rtt window has expired and a fresh PROBE_RTT round
    /// is due.
    pub fn probe_rtt_expired(&self, now: Timestamp) -> bool {
        now.saturating_duration_since(self.min_rtt_stamp) >= self.min_rtt_win
    }

    /// refreshes `min_rtt_us` either because a new sample beats it
    /// outright, or because the window expired and this sample is eligible
    /// (not a delayed ack) to replace it.
    pub fn update_min_rtt(&mut self, rtt_us: Option<u64>, now: Timestamp, is_ack_delayed: bool) {
        let Some(rtt_us) = rtt_us else {
            return;
        };

        let expired = self.probe_rtt_expired(now);
        let beats_current = self.min_rtt_us.map_or(true, |min| rtt_us < min);

        if beats_current || (expired && !is_ack_delayed) {
            self.min_rtt_us = Some(rtt_us);
            self.min_rtt_stamp = now;
            trace_log!(min_rtt_us = rtt_us, "min_rtt refreshed");
        }
    }

    /// Called on PROBE_RTT exit to re-anchor the 10-second window.
    pub fn schedule_next_probe_rtt(&mut self, now: Timestamp) {
        self.min_rtt_stamp = now;
    }

    /// Resets the ack-aggregation epoch, e.g. after an idle-restart.
    pub fn reset_ack_aggregation_epoch(&mut self, now: Timestamp) {
        self.ack_epoch_mstamp = now;
        self.ack_epoch_acked = 0;
    }

    /// updates the ack-aggregation bonus estimator and returns the
    /// extra-acked bonus, in packets, to add to the target cwnd.
    #[allow(clippy::too_many_arguments)]
    pub fn update_ack_aggregation(
        &mut self,
        bw: Bandwidth,
        acked_sacked: u32,
        round_start: bool,
        now: Timestamp,
        snd_cwnd: u32,
    ) -> u32 {
        if acked_sacked == 0 {
            return self.extra_acked_bonus(bw);
        }

        if round_start {
            self.extra_acked_win_rtts = (self.extra_acked_win_rtts + 1).min(0x1F);
            if self.extra_acked_win_rtts >= EXTRA_ACKED_WIN_RTTS {
                self.extra_acked_win_rtts = 0;
                self.extra_acked_win_idx ^= 1;
                self.extra_acked[self.extra_acked_win_idx] = 0;
            }
        }

        let epoch_us = now.saturating_duration_since(self.ack_epoch_mstamp).as_micros() as u64;
        let mut expected_acked = ((bw.as_raw() as u128 * epoch_us as u128) / BW_UNIT as u128) as u32;

        if self.ack_epoch_acked <= expected_acked
            || self.ack_epoch_acked.saturating_add(acked_sacked) >= ACK_EPOCH_ACKED_RESET_THRESH
        {
            self.ack_epoch_acked = 0;
            self.ack_epoch_mstamp = now;
            expected_acked = 0;
        }

        self.ack_epoch_acked = (self.ack_epoch_acked + acked_sacked).min(ACK_EPOCH_ACKED_CAP);
        let extra_acked = self.ack_epoch_acked.saturating_sub(expected_acked).min(snd_cwnd);

        if extra_acked > self.extra_acked[self.extra_acked_win_idx] {
            self.extra_acked[self.extra_acked_win_idx] = extra_acked;
        }

        self.extra_acked_bonus(bw)
    }

    fn extra_acked_bonus(&self, bw: Bandwidth) -> u32 {
        let max_slot = self.extra_acked[0].max(self.extra_acked[1]);
        let bonus = ((max_slot as u64 * EXTRA_ACKED_GAIN.as_raw() as u64) >> crate::bandwidth::BBR_SCALE) as u32;
        let cap = ((bw.as_raw() as u128 * EXTRA_ACKED_MAX_US as u128) / BW_UNIT as u128) as u32;
        bonus.min(cap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::NoopClock;
    use crate::time::Clock;

    #[test]
    fn min_rtt_tightens_on_lower_sample() {
        let now = NoopClock.get_time();
        let mut model = Model::new(now, MIN_RTT_WIN);

        model.update_min_rtt(Some(50_000), now, false);
        assert_eq!(model.min_rtt_us(), Some(50_000));

        let later = now + Duration::from_millis(100);
        model.update_min_rtt(Some(40_000), later, false);
        assert_eq!(model.min_rtt_us(), Some(40_000));

        // a higher sample within the window doesn't move min_rtt
        let later2 = later + Duration::from_millis(100);
        model.update_min_rtt(Some(60_000), later2, false);
        assert_eq!(model.min_rtt_us(), Some(40_000));
    }

    #[test]
    fn window_expiry_forces_refresh_on_non_delayed_ack() {
        let now = NoopClock.get_time();
        let mut model = Model::new(now, MIN_RTT_WIN);
        model.update_min_rtt(Some(40_000), now, false);

        let expired = now + MIN_RTT_WIN + Duration::from_millis(1);
        assert!(model.probe_rtt_expired(expired));

        // a delayed ack's higher rtt doesn't get to refresh the window
        model.update_min_rtt(Some(60_000), expired, true);
        assert_eq!(model.min_rtt_us(), Some(40_000));

        model.update_min_rtt(Some(60_000), expired, false);
        assert_eq!(model.min_rtt_us(), Some(60_000));
    }

    #[test]
    fn ack_aggregation_bonus_is_bounded_by_cwnd_and_cap() {
        let now = NoopClock.get_time();
        let mut model = Model::new(now, MIN_RTT_WIN);
        let bw = Bandwidth::from_raw(1 << 24); // 1 pkt/us

        // deliver a burst far exceeding the expected rate
        let bonus = model.update_ack_aggregation(bw, 1000, true, now + Duration::from_millis(1), 50);
        // bonus is capped by snd_cwnd (50)
        assert!(bonus <= 50);
    }
}
