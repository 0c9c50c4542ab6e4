// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Long-term (policer) bandwidth estimator.
//!
//! A token-bucket policer upstream of the sender looks, over a short
//! window, just like a normal bottleneck: throughput is capped and losses
//! appear once the bucket empties. The windowed-max bandwidth filter reacts
//! to the policer's burst allowance rather than its sustained rate, so BBR
//! tracks a second, independent estimate here: two consecutive lossy
//! intervals with close-enough throughput are treated as evidence of a
//! steady policed rate, which then substitutes for the windowed-max
//! estimate in the control laws until it's given up on.
//!
//! This has no counterpart in BBRv2's inflight_hi/inflight_lo policer
//! response -- it is an independent interval-sampling procedure.

use crate::bandwidth::{Bandwidth, Gain};
use crate::time::Timestamp;

/// `lt_intvl_min_rtts`: an interval must span at least this many rounds
/// before it's eligible to end.
const LT_INTVL_MIN_RTTS: u8 = 4;
/// An interval open for more than this many rounds is abandoned as stale.
const LT_INTVL_MAX_RTTS: u8 = 16;
/// `lt_loss_thresh = 50/256`: an interval only qualifies if its loss ratio
/// meets or exceeds this.
const LT_LOSS_THRESH_NUM: u64 = 50;
const LT_LOSS_THRESH_DEN: u64 = 256;
/// `lt_bw_ratio = 1/8`: two intervals' throughputs are "close enough" if
/// they're within this ratio of each other...
const LT_BW_RATIO_NUM: u64 = 1;
const LT_BW_RATIO_DEN: u64 = 8;
/// ...or within this many bytes/sec, whichever is more permissive.
const LT_BW_DIFF_BPS: u64 = 500;
/// `lt_bw_max_rtts`: once engaged, `lt_use_bw` is held for this many rounds
/// of PROBE_BW before the sampler resets and gain cycling resumes.
const LT_BW_MAX_RTTS: u16 = 48;

#[derive(Clone, Debug, Default)]
pub struct Estimator {
    is_sampling: bool,
    rtt_count: u8,
    last_delivered: u64,
    last_lost: u64,
    last_stamp: Option<Timestamp>,
    candidate_bw: Option<Bandwidth>,

    use_bw: bool,
    bw: Bandwidth,
    rounds_engaged: u16,
}

impl Estimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the policer estimate should substitute for the windowed-max
    /// bandwidth in the control laws.
    pub fn use_bw(&self) -> bool {
        self.use_bw
    }

    /// The engaged policer bandwidth estimate. Only meaningful when
    /// [`Self::use_bw`] is true.
    pub fn bw(&self) -> Bandwidth {
        self.bw
    }

    /// Clears the interval sampler without disengaging an active estimate.
    /// Called on a congestion-window undo and whenever a sample falls
    /// outside the interval's preconditions.
    pub fn reset_sampling(&mut self) {
        self.is_sampling = false;
        self.rtt_count = 0;
        self.last_stamp = None;
        self.candidate_bw = None;
    }

    /// Fully disengages, clearing both the sampler and any active estimate.
    /// No longer reachable from `Bbr::set_state` -- an RTO feeds
    /// [`Self::on_rto`] instead -- but kept as the general-purpose hard
    /// reset for callers (and tests) that need to discard an engaged
    /// estimate outright.
    pub fn reset(&mut self) {
        self.use_bw = false;
        self.rounds_engaged = 0;
        self.reset_sampling();
    }

    /// Feeds a synthetic `losses=1` sample, as the reference's
    /// `bbr_set_state(BBR_LOSS)` does by calling `bbr_lt_bw_sampling`
    /// directly on an RTO. An RTO is evidence *for* an in-progress or
    /// already-engaged policer interval, never a reason to disengage one:
    /// unlike a full [`Self::reset`], this starts/advances interval
    /// sampling exactly like any other lossy sample and leaves an already
    /// engaged `use_bw` estimate untouched.
    pub fn on_rto(&mut self, delivered_total: u64, lost_total: u64, now: Timestamp, mss: u32) {
        self.on_sample(delivered_total, lost_total, 1, false, true, now, mss);
    }

    /// Call once per round start while in PROBE_BW. Returns `true` if the
    /// engagement just expired, signalling the caller to reset PROBE_BW's
    /// gain cycling.
    pub fn on_probe_bw_round_start(&mut self) -> bool {
        if !self.use_bw {
            return false;
        }

        self.rounds_engaged += 1;
        if self.rounds_engaged >= LT_BW_MAX_RTTS {
            self.reset();
            true
        } else {
            false
        }
    }

    /// Feeds one rate sample into the policer sampler.
    ///
    /// `mss` is needed to compare two candidate bandwidths in bytes/sec
    /// terms, matching `lt_bw_diff`'s units.
    #[allow(clippy::too_many_arguments)]
    pub fn on_sample(
        &mut self,
        delivered_total: u64,
        lost_total: u64,
        losses: u32,
        is_app_limited: bool,
        round_start: bool,
        now: Timestamp,
        mss: u32,
    ) {
        if self.use_bw {
            return;
        }

        if !self.is_sampling {
            // Wait for the first observed loss before sampling, to let a
            // policer's token bucket drain before measuring its
            // steady-state rate.
            if losses == 0 {
                return;
            }
            self.is_sampling = true;
            self.rtt_count = 0;
            self.last_delivered = delivered_total;
            self.last_lost = lost_total;
            self.last_stamp = Some(now);
            return;
        }

        if is_app_limited {
            self.reset_sampling();
            return;
        }

        if round_start {
            self.rtt_count = self.rtt_count.saturating_add(1);
        }

        if self.rtt_count < LT_INTVL_MIN_RTTS {
            return;
        }
        if self.rtt_count > LT_INTVL_MAX_RTTS {
            self.reset_sampling();
            return;
        }

        if losses == 0 {
            return;
        }

        let Some(last_stamp) = self.last_stamp else {
            return;
        };

        let delivered = delivered_total.saturating_sub(self.last_delivered);
        let lost = lost_total.saturating_sub(self.last_lost);
        if delivered == 0 {
            self.reset_sampling();
            return;
        }
        if lost * LT_LOSS_THRESH_DEN < delivered * LT_LOSS_THRESH_NUM {
            // not enough loss yet to trust this as a policer interval
            return;
        }

        let interval_us = now.saturating_duration_since(last_stamp).as_micros() as u64;
        let Some(bw) = Bandwidth::from_delivery(delivered, interval_us as i64) else {
            self.reset_sampling();
            return;
        };

        self.interval_done(bw, mss);
    }

    fn interval_done(&mut self, bw: Bandwidth, mss: u32) {
        if let Some(candidate) = self.candidate_bw {
            let diff = bw.as_raw().abs_diff(candidate.as_raw());
            let ratio_close = diff * LT_BW_RATIO_DEN <= LT_BW_RATIO_NUM * candidate.as_raw();
            let diff_bps = Bandwidth::from_raw(diff).to_pacing_rate_bps(mss, Gain::UNITY);
            let absolute_close = diff_bps <= LT_BW_DIFF_BPS;

            if ratio_close || absolute_close {
                self.bw = Bandwidth::from_raw((bw.as_raw() + candidate.as_raw()) / 2);
                self.use_bw = true;
                self.rounds_engaged = 0;
                self.reset_sampling();
                debug_log!(lt_bw = self.bw.as_raw(), "policer detected, engaging long-term bandwidth estimate");
                return;
            }
        }

        // Not (yet) a match: remember this interval's throughput and wait
        // for the next loss to start a fresh interval to compare it against.
        self.candidate_bw = Some(bw);
        self.is_sampling = false;
        self.rtt_count = 0;
        self.last_stamp = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::{Clock, NoopClock};
    use core::time::Duration;

    fn advance(now: Timestamp, by: Duration) -> Timestamp {
        now + by
    }

    #[test]
    fn two_consistent_lossy_intervals_engage() {
        let mut estimator = Estimator::new();
        let mut now = NoopClock.get_time();

        // First interval: 8 rounds, delivered=400, lost=120 (30% loss)
        estimator.on_sample(0, 0, 1, false, true, now, 1200); // opens sampling on first loss
        let mut delivered_total = 0u64;
        let mut lost_total = 0u64;
        for round in 0..8u8 {
            delivered_total += 50;
            lost_total += 15;
            now = advance(now, Duration::from_millis(125));
            let losses = if round == 7 { 15 } else { 0 };
            estimator.on_sample(delivered_total, lost_total, losses, false, true, now, 1200);
        }
        assert!(!estimator.use_bw());

        // Second interval: same shape, close throughput -> engages
        estimator.on_sample(delivered_total, lost_total, 1, false, true, now, 1200);
        for round in 0..8u8 {
            delivered_total += 50;
            lost_total += 15;
            now = advance(now, Duration::from_millis(123));
            let losses = if round == 7 { 15 } else { 0 };
            estimator.on_sample(delivered_total, lost_total, losses, false, true, now, 1200);
        }

        assert!(estimator.use_bw());
    }

    #[test]
    fn app_limited_sample_resets_sampling() {
        let mut estimator = Estimator::new();
        let now = NoopClock.get_time();

        estimator.on_sample(0, 0, 1, false, true, now, 1200);
        estimator.on_sample(10, 5, 0, true, true, now, 1200);
        assert!(!estimator.use_bw());
    }

    #[test]
    fn engagement_expires_after_max_rtts() {
        let mut estimator = Estimator::new();
        estimator.use_bw = true;
        estimator.rounds_engaged = LT_BW_MAX_RTTS - 1;

        assert!(estimator.on_probe_bw_round_start());
        assert!(!estimator.use_bw());
    }

    #[test]
    fn on_rto_leaves_an_engaged_estimate_untouched() {
        let mut estimator = Estimator::new();
        estimator.use_bw = true;
        estimator.bw = Bandwidth::from_raw(12345);
        estimator.rounds_engaged = 3;

        estimator.on_rto(1000, 200, NoopClock.get_time(), 1200);

        // an RTO is not a reason to disengage an already-confirmed estimate
        assert!(estimator.use_bw());
        assert_eq!(estimator.bw().as_raw(), 12345);
        assert_eq!(estimator.rounds_engaged, 3);
    }

    #[test]
    fn on_rto_starts_sampling_like_any_other_lossy_sample() {
        let mut estimator = Estimator::new();
        assert!(!estimator.is_sampling);

        estimator.on_rto(1000, 200, NoopClock.get_time(), 1200);

        assert!(estimator.is_sampling);
    }
}
