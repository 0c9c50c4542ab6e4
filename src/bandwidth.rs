// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Fixed-point rate and gain arithmetic, and the per-ACK rate sample
//! contract the host transport feeds into the model.
//!
//! All rates are stored as packets-per-microsecond scaled by [`BW_UNIT`]; all
//! gains are stored as a ratio scaled by [`BBR_UNIT`]. Multiplications that
//! mix the two preserve the evaluation order laid out below rather than
//! folding constants together, since the overflow analysis depends on it.

use crate::time::Timestamp;

/// `BW_SCALE`: bandwidth values are scaled by `1 << BW_SCALE`.
pub const BW_SCALE: u32 = 24;
/// Bandwidth unit: packets-per-microsecond scale factor.
pub const BW_UNIT: u64 = 1 << BW_SCALE;

/// `BBR_SCALE`: gain values are scaled by `1 << BBR_SCALE`.
pub const BBR_SCALE: u32 = 8;
/// Gain unit: rational scale factor for `pacing_gain`/`cwnd_gain`.
pub const BBR_UNIT: u32 = 1 << BBR_SCALE;

/// Pacing margin, in percent, subtracted from the computed pacing rate so
/// the average send rate stays slightly below the estimated bottleneck
/// bandwidth and the queue at the bottleneck stays small.
pub const PACING_MARGIN_PERCENT: u64 = 1;

/// A delivery rate, stored internally as packets-per-microsecond scaled by
/// [`BW_UNIT`].
///
/// `Bandwidth` intentionally has no public constructor from a plain `f64` or
/// floating-point ratio: every value in this model is derived from an
/// integer sample (`delivered / interval_us`) or from another `Bandwidth`
/// scaled by a [`Gain`], and those paths are the ones whose overflow
/// behavior has been analyzed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Bandwidth(u64);

impl Bandwidth {
    pub const ZERO: Bandwidth = Bandwidth(0);
    pub const MAX: Bandwidth = Bandwidth(u64::MAX);

    /// Constructs a `Bandwidth` from a raw packets-per-microsecond value
    /// already scaled by [`BW_UNIT`].
    #[inline]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw packets-per-microsecond value scaled by [`BW_UNIT`].
    #[inline]
    pub const fn as_raw(self) -> u64 {
        self.0
    }

    /// Computes a bandwidth sample from a delivery count and interval:
    /// `bw_sample = delivered * BW_UNIT / interval_us`.
    ///
    /// Returns `None` if `interval_us` is non-positive -- a sample that
    /// violates this precondition is dropped, not clamped.
    #[inline]
    pub fn from_delivery(delivered: u64, interval_us: i64) -> Option<Self> {
        if interval_us <= 0 {
            return None;
        }
        let raw = (delivered as u128 * BW_UNIT as u128) / interval_us as u128;
        Some(Self(raw.min(u64::MAX as u128) as u64))
    }

    /// Scales this bandwidth by `gain`, per the same wide-accumulator
    /// discipline as [`Self::to_pacing_rate_bps`].
    #[inline]
    pub fn scale_by(self, gain: Gain) -> Bandwidth {
        let raw = (self.0 as u128 * gain.as_raw() as u128) >> BBR_SCALE;
        Bandwidth(raw.min(u64::MAX as u128) as u64)
    }

    /// Converts this bandwidth into bytes-per-second pacing rate:
    ///
    /// `rate_bps = bw . mss . gain / 256 . 1_000_000 . (100 - margin) / 100 >> 24`
    ///
    /// evaluated left-to-right in exactly this grouping: multiply by `mss`,
    /// multiply by `gain`, shift right by `BBR_SCALE`, multiply by the
    /// precomputed `(USEC_PER_SEC / 100) * (100 - margin)` constant, then
    /// shift right by `BW_SCALE`. Do not refactor this into an algebraically
    /// equivalent grouping: the overflow bound (bw <= 3 Tbit/s, gain <=
    /// 2.89) is only guaranteed for this exact order. A
    /// `u128` accumulator is used so this holds even for bandwidths beyond
    /// that bound, without changing any intermediate truncation.
    #[inline]
    pub fn to_pacing_rate_bps(self, mss: u32, gain: Gain) -> u64 {
        let mut rate: u128 = self.0 as u128;
        rate *= mss as u128;
        rate *= gain.as_raw() as u128;
        rate >>= BBR_SCALE;
        let usec_margin = (1_000_000u128 / 100) * (100 - PACING_MARGIN_PERCENT as u128);
        rate *= usec_margin;
        rate >>= BW_SCALE;
        rate.min(u64::MAX as u128) as u64
    }

    /// Converts this bandwidth into a plain bytes-per-second figure at the
    /// given `mss`, with neither a pacing gain nor the pacing margin
    /// applied: `bw . mss . 1_000_000 >> BW_SCALE`. Diagnostics
    /// (`get_info`'s `bw_bytes_per_sec`) want the model's own estimate of
    /// the path's rate, not the shaved, gained figure the pacer actually
    /// schedules at -- that shaving is exactly what
    /// [`Self::to_pacing_rate_bps`] applies, so this is a separate
    /// conversion rather than a call to it at `Gain::UNITY`.
    #[inline]
    pub fn to_raw_bytes_per_sec(self, mss: u32) -> u64 {
        let mut rate: u128 = self.0 as u128;
        rate *= mss as u128;
        rate *= 1_000_000u128;
        rate >>= BW_SCALE;
        rate.min(u64::MAX as u128) as u64
    }
}

impl core::ops::Add for Bandwidth {
    type Output = Bandwidth;

    #[inline]
    fn add(self, rhs: Bandwidth) -> Bandwidth {
        Bandwidth(self.0.saturating_add(rhs.0))
    }
}

/// A gain: a scaled rational multiplier applied to a [`Bandwidth`] or BDP to
/// derive a control output, stored as a raw value scaled by [`BBR_UNIT`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Gain(u32);

impl Gain {
    /// `1.0`, scaled by `BBR_UNIT`.
    pub const UNITY: Gain = Gain(BBR_UNIT);

    /// `cwnd_gain` used throughout STARTUP, DRAIN, and PROBE_BW: `2`.
    pub const CWND_GAIN: Gain = Gain(2 * BBR_UNIT);

    /// `high_gain`, used as `pacing_gain` and `cwnd_gain` in STARTUP.
    ///
    /// The reference implementation computes this as
    /// `BBR_UNIT * 2885 / 1000 + 1`: a deliberate `+1` bias (not a rounding
    /// artifact) that keeps the ramp strictly monotone. Do not replace this
    /// with a more "precise" rational approximation of `2/ln(2)`.
    pub const HIGH_GAIN: Gain = Gain(BBR_UNIT * 2885 / 1000 + 1);

    /// `drain_gain`, used as `pacing_gain` in DRAIN: `1 / high_gain`,
    /// computed independently as `BBR_UNIT * 1000 / 2885` per the reference.
    pub const DRAIN_GAIN: Gain = Gain(BBR_UNIT * 1000 / 2885);

    /// The 8-phase PROBE_BW pacing-gain cycle: `[5/4, 3/4, 1, 1, 1, 1, 1, 1]`.
    pub const PROBE_BW_CYCLE: [Gain; 8] = [
        Gain(BBR_UNIT * 5 / 4),
        Gain(BBR_UNIT * 3 / 4),
        Gain(BBR_UNIT),
        Gain(BBR_UNIT),
        Gain(BBR_UNIT),
        Gain(BBR_UNIT),
        Gain(BBR_UNIT),
        Gain(BBR_UNIT),
    ];

    /// Constructs a `Gain` from a raw value already scaled by [`BBR_UNIT`].
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn as_raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn is_unity(self) -> bool {
        self.0 == BBR_UNIT
    }

    #[inline]
    pub const fn is_above_unity(self) -> bool {
        self.0 > BBR_UNIT
    }

    #[inline]
    pub const fn is_below_unity(self) -> bool {
        self.0 < BBR_UNIT
    }
}

/// The host's observed congestion-avoidance state, surfacing loss/recovery
/// transitions into the model.
///
/// Named after the Linux `tcp_ca_state` the reference core reads from; the
/// model only distinguishes `< Recovery` from `>= Recovery` and treats `Loss`
/// as an end-of-round/loss signal, but the full taxonomy is carried so a host
/// can report its state directly without a lossy translation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CaState {
    Open,
    Disorder,
    Cwr,
    Recovery,
    Loss,
}

impl CaState {
    #[inline]
    pub const fn is_recovery(self) -> bool {
        matches!(self, CaState::Recovery | CaState::Loss)
    }
}

/// The per-ACK rate sample contract the host transport supplies to
/// [`crate::bbr::Bbr::on_ack`].
#[derive(Clone, Copy, Debug)]
pub struct RateSample {
    /// Packets ACKed cumulatively on the connection.
    pub delivered: u64,
    /// Value of `delivered` when the oldest newly-ACKed packet was sent.
    pub prior_delivered: u64,
    /// Delivery interval for the sample, in microseconds.
    pub interval_us: i64,
    /// RTT of the sample in microseconds, or negative if unknown.
    pub rtt_us: i64,
    /// Packets reported lost in this sample.
    pub losses: u32,
    /// Packets ACKed or SACKed in this sample.
    pub acked_sacked: u32,
    /// `packets_in_flight` immediately prior to this sample.
    pub prior_in_flight: u32,
    /// Whether the sample was limited by application data availability
    /// rather than network capacity.
    pub is_app_limited: bool,
    /// Whether the ACK covering this sample was delayed by the receiver.
    pub is_ack_delayed: bool,
    /// Timestamp the sample's packets were marked delivered.
    pub delivered_mstamp: Timestamp,
    /// Timestamp this sample was processed.
    pub tcp_mstamp: Timestamp,
}
