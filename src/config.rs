// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! The tunable constants behind a BBR control loop, collected into one
//! struct with a `Default` that reproduces the reference implementation's
//! values bit-for-bit.
//!
//! Most of these constants affect on-the-wire observable behavior and must
//! stay bit-exact for interoperability with other BBR implementations;
//! `Config::default()` is the only sanctioned source of those values in
//! production use. The struct exists at all (rather than bare `const`s
//! scattered across modules, as the rest of this crate otherwise prefers)
//! because tests and alternative deployments -- a simulator sweeping
//! `cycle_rand`, a test that wants PROBE_RTT to fire every second instead
//! of every ten -- legitimately need to override a handful of these, and
//! threading a struct through `Bbr::new` is the shape the ancestor
//! codebase uses wherever it exposes a knob at all (see e.g. its
//! `RttEstimator` construction parameters).

use crate::bandwidth::Gain;
use core::time::Duration;

/// The tunables behind one [`crate::bbr::Bbr`] instance.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Config {
    /// `high_gain`: `pacing_gain`/`cwnd_gain` throughout STARTUP.
    pub high_gain: Gain,
    /// `drain_gain`: `pacing_gain` throughout DRAIN (`1/high_gain`).
    pub drain_gain: Gain,
    /// `cwnd_gain`: used throughout STARTUP, DRAIN, and PROBE_BW.
    pub cwnd_gain: Gain,
    /// The 8-phase PROBE_BW pacing-gain cycle.
    pub pacing_gain_cycle: [Gain; 8],
    /// `cycle_rand`: PROBE_BW's entry phase is drawn uniformly from
    /// `0..cycle_rand`.
    pub cycle_rand: u64,
    /// `min_tso_rate`: the pacing-rate threshold below which [`crate::pacing::tso_segs`]
    /// returns a `min_segs` of 1 instead of 2, in bytes/second.
    pub min_tso_rate_bps: u64,
    /// `pacing_margin_percent`: percent subtracted from the computed pacing
    /// rate so the average send rate stays slightly below the estimated
    /// bottleneck bandwidth.
    pub pacing_margin_percent: u64,
    /// `min_rtt_win_sec`: the window after which `min_rtt_us` is considered
    /// stale and a PROBE_RTT round is due.
    pub min_rtt_win: Duration,
    /// `probe_rtt_mode_ms`: the minimum duration inflight is held at
    /// `cwnd_min_target` once PROBE_RTT first reaches it.
    pub probe_rtt_duration: Duration,
    /// `bbr_cwnd_min_target`: the cwnd floor enforced in every mode, and
    /// PROBE_RTT's explicit target.
    pub cwnd_min_target: u32,
    /// `bw_rtts`: the windowed-max bandwidth filter's window length, in
    /// rounds (`CYCLE_LEN + 2`).
    pub bw_window_rounds: u64,
    /// The initial congestion window used before any RTT sample is
    /// available (`TCP_INIT_CWND`), in packets.
    pub initial_cwnd: u32,
}

impl Config {
    /// `high_gain`: a deliberate `BBR_UNIT * 2885 / 1000 + 1`, not a rounded
    /// rational approximation of `2/ln 2`.
    pub const DEFAULT_HIGH_GAIN: Gain = Gain::HIGH_GAIN;

    /// Validates this configuration, returning the same values back if they
    /// describe a usable control loop.
    ///
    /// This is the only fallible operation in the crate -- the control
    /// algorithm itself is infallible -- it exists purely to catch caller
    /// mistakes at construction time that would otherwise corrupt
    /// fixed-point math silently.
    pub fn validate(self) -> Result<Self, ConfigError> {
        if self.cwnd_min_target == 0 {
            return Err(ConfigError::InvalidCwndMinTarget);
        }
        if self.min_rtt_win.is_zero() {
            return Err(ConfigError::InvalidWindow {
                field: "min_rtt_win",
            });
        }
        if self.bw_window_rounds == 0 {
            return Err(ConfigError::InvalidWindow {
                field: "bw_window_rounds",
            });
        }
        if self.cycle_rand == 0 || self.cycle_rand as usize > self.pacing_gain_cycle.len() {
            return Err(ConfigError::InvalidGainCycle {
                len: self.pacing_gain_cycle.len(),
            });
        }
        if self.initial_cwnd == 0 {
            return Err(ConfigError::InvalidCwndMinTarget);
        }
        Ok(self)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            high_gain: Gain::HIGH_GAIN,
            drain_gain: Gain::DRAIN_GAIN,
            cwnd_gain: Gain::CWND_GAIN,
            pacing_gain_cycle: Gain::PROBE_BW_CYCLE,
            cycle_rand: crate::probe_bw::CYCLE_RAND_BOUND,
            min_tso_rate_bps: 150_000,
            pacing_margin_percent: crate::bandwidth::PACING_MARGIN_PERCENT,
            min_rtt_win: crate::min_rtt::MIN_RTT_WIN,
            probe_rtt_duration: crate::probe_rtt::PROBE_RTT_DURATION,
            cwnd_min_target: crate::probe_rtt::CWND_MIN_TARGET_PACKETS,
            bw_window_rounds: 10,
            initial_cwnd: 10,
        }
    }
}

/// A caller mistake in a [`Config`] that would otherwise corrupt the
/// control loop's fixed-point math silently rather than producing a
/// visibly wrong result.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// `mss` supplied to [`crate::bbr::Bbr::new`] was zero.
    MssZero,
    /// A duration-valued window was zero, which would make its windowed
    /// filter expire every sample.
    InvalidWindow { field: &'static str },
    /// `cycle_rand` was zero or exceeded the gain cycle's length.
    InvalidGainCycle { len: usize },
    /// `cwnd_min_target` or `initial_cwnd` was zero.
    InvalidCwndMinTarget,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ConfigError::MssZero => write!(f, "mss must be nonzero"),
            ConfigError::InvalidWindow { field } => {
                write!(f, "config field `{field}` must be a nonzero duration")
            }
            ConfigError::InvalidGainCycle { len } => {
                write!(f, "cycle_rand must be in 1..={len}")
            }
            ConfigError::InvalidCwndMinTarget => {
                write!(f, "cwnd_min_target and initial_cwnd must be nonzero")
            }
        }
    }
}

impl core::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn zero_window_is_rejected() {
        let mut config = Config::default();
        config.min_rtt_win = Duration::ZERO;
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidWindow {
                field: "min_rtt_win"
            })
        );
    }

    #[test]
    fn cycle_rand_out_of_range_is_rejected() {
        let mut config = Config::default();
        config.cycle_rand = 9;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidGainCycle { .. })
        ));
    }
}
