// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! The BBR control block and the fixed-order per-ACK pipeline that ties
//! every other module in this crate together.
//!
//! The control block holds every sub-model behind one `Mode` sum type
//! rather than a flat state enum plus a bag of phase fields: `cycle_idx`
//! and `cycle_stamp` live inside `Mode::ProbeBw`, `done_stamp`/
//! `round_done` inside `Mode::ProbeRtt`, so there is no field that is only
//! meaningful in one mode but readable in every mode.

use crate::bandwidth::{Bandwidth, CaState, Gain, RateSample, BBR_SCALE, BW_SCALE};
use crate::config::{Config, ConfigError};
use crate::full_pipe;
use crate::host::Host;
use crate::lt_bw;
use crate::min_rtt;
use crate::pacing;
use crate::probe_bw;
use crate::probe_rtt;
use crate::random::Generator;
use crate::recovery_state;
use crate::round;
use crate::time::Timestamp;
use crate::windowed_filter::WindowedMaxFilter;
use core::time::Duration;

/// The host's TSO/GSO scheduling granularity this crate assumes when it
/// cannot read one from the host: the reference implementation ties
/// `tso_segs_goal` to roughly one kernel jiffy.
const DEFAULT_PACING_SHIFT: Duration = Duration::from_millis(1);

/// The four-state mode machine, carrying each mode's private phase data so
/// illegal combinations (e.g. a `cycle_idx` while in STARTUP) cannot be
/// represented.
#[derive(Clone, Debug)]
pub enum Mode {
    Startup,
    Drain,
    ProbeBw(probe_bw::State),
    ProbeRtt(probe_rtt::State),
}

impl Mode {
    pub fn is_probe_rtt(&self) -> bool {
        matches!(self, Mode::ProbeRtt(_))
    }

    pub fn is_probe_bw(&self) -> bool {
        matches!(self, Mode::ProbeBw(_))
    }
}

/// A snapshot of the control block's externally-visible state, returned by
/// [`Bbr::get_info`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Info {
    pub bw_bytes_per_sec: u64,
    pub min_rtt_us: Option<u64>,
    pub pacing_gain: Gain,
    pub cwnd_gain: Gain,
}

/// The per-connection BBR control block.
///
/// Mutated only from [`Self::on_ack`], [`Self::on_transmit_start`], and
/// [`Self::set_state`]; never performs I/O or blocks.
#[derive(Clone, Debug)]
pub struct Bbr {
    config: Config,
    mode: Mode,

    round: round::Counter,
    bw_filter: WindowedMaxFilter<Bandwidth, u64, u64>,
    model: min_rtt::Model,
    full_pipe: full_pipe::Estimator,
    lt_bw: lt_bw::Estimator,
    recovery: recovery_state::State,

    cwnd: u32,
    pacing_rate_bps: u64,
    tso_segs_goal: u32,

    idle_restart: bool,
    has_seen_rtt: bool,
}

impl Bbr {
    /// Builds a fresh control block for a newly opened connection.
    ///
    /// `mss` must be nonzero; an initial pacing rate is derived from
    /// `cwnd * BW_UNIT / rtt` at `config.high_gain`, using the host's
    /// smoothed RTT if one is already available, or a nominal 1ms RTT
    /// otherwise.
    pub fn new(config: Config, host: &impl Host) -> Result<Self, ConfigError> {
        let config = config.validate()?;
        if host.mss() == 0 {
            return Err(ConfigError::MssZero);
        }

        let now = host.now();
        let has_seen_rtt = host.srtt_us().is_some();
        let initial_rtt_us = host.srtt_us().unwrap_or(1_000).max(1);

        let cwnd = config.initial_cwnd.max(config.cwnd_min_target);
        let init_bw = Bandwidth::from_delivery(cwnd as u64, initial_rtt_us as i64)
            .unwrap_or(Bandwidth::ZERO);
        let pacing_rate_bps = pacing::compute_pacing_rate_bps(init_bw, host.mss(), config.high_gain);

        debug_log!(cwnd, pacing_rate_bps, "bbr: connection initialized");

        Ok(Self {
            bw_filter: WindowedMaxFilter::new(config.bw_window_rounds),
            model: min_rtt::Model::new(now, config.min_rtt_win),
            config,
            mode: Mode::Startup,
            round: round::Counter::new(),
            full_pipe: full_pipe::Estimator::new(),
            lt_bw: lt_bw::Estimator::new(),
            recovery: recovery_state::State::new(),
            cwnd,
            pacing_rate_bps,
            tso_segs_goal: 1,
            idle_restart: false,
            has_seen_rtt,
        })
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    pub fn cwnd(&self) -> u32 {
        self.cwnd
    }

    pub fn pacing_rate_bps(&self) -> u64 {
        self.pacing_rate_bps
    }

    pub fn min_rtt_us(&self) -> Option<u64> {
        self.model.min_rtt_us()
    }

    /// `bw = lt_use_bw ? lt_bw : windowed_max(bw filter)`: the sole source
    /// of path-rate truth for the control laws.
    fn bw(&self) -> Bandwidth {
        if self.lt_bw.use_bw() {
            self.lt_bw.bw()
        } else {
            self.bw_filter.get().unwrap_or(Bandwidth::ZERO)
        }
    }

    fn pacing_gain(&self) -> Gain {
        match &self.mode {
            Mode::Startup => self.config.high_gain,
            Mode::Drain => self.config.drain_gain,
            Mode::ProbeBw(state) => {
                // While the policer estimate is engaged, pacing_gain is
                // held at unity during PROBE_BW to avoid provoking more
                // loss against a bucket we've already measured.
                if self.lt_bw.use_bw() {
                    Gain::UNITY
                } else {
                    state.pacing_gain()
                }
            }
            Mode::ProbeRtt(_) => probe_rtt::PACING_GAIN,
        }
    }

    fn cwnd_gain(&self) -> Gain {
        match &self.mode {
            // STARTUP and DRAIN both target the same inflated cwnd as
            // STARTUP's pacing gain, so that DRAIN paces down without
            // letting cwnd -- and therefore the window the sender is
            // still allowed to fill -- collapse to the unity-gain target
            // along with the pacing rate.
            Mode::Startup | Mode::Drain => self.config.high_gain,
            Mode::ProbeBw(_) => self.config.cwnd_gain,
            Mode::ProbeRtt(_) => probe_rtt::CWND_GAIN,
        }
    }

    /// BDP in packets at the given `gain`: `bdp =
    /// ceil(bw . min_rtt . gain / (BW_UNIT . BBR_UNIT))`, or
    /// `config.initial_cwnd` when no min_rtt sample has arrived yet.
    fn bdp_at_gain(&self, gain: Gain) -> u32 {
        let Some(min_rtt_us) = self.model.min_rtt_us() else {
            return self.config.initial_cwnd;
        };
        let bw = self.bw();
        let numerator = bw.as_raw() as u128 * min_rtt_us as u128 * gain.as_raw() as u128;
        let denominator = 1u128 << (BW_SCALE + BBR_SCALE);
        let packets = (numerator + denominator - 1) / denominator; // ceil
        packets.min(u32::MAX as u128) as u32
    }

    /// BDP at unity gain, used by DRAIN's exit check and PROBE_BW's phase
    /// hold conditions, both of which reason about the path's BDP
    /// independent of whichever gain is currently being applied.
    fn bdp_at_unity_gain(&self) -> u32 {
        self.bdp_at_gain(Gain::UNITY)
    }

    /// The cwnd floor enforced in every mode: never smaller than one full
    /// send quantum, so a host with a large TSO segmentation hint never gets
    /// clamped down to a cwnd it can't actually pace a single burst into.
    ///
    /// This is deliberately *not* used for PROBE_RTT's target or ceiling --
    /// those stay pinned to the bare `config.cwnd_min_target`, matching the
    /// reference's `bbr_cwnd_min_target` exactly, since PROBE_RTT's whole
    /// purpose is draining the path down to a known-small in-flight count.
    fn cwnd_min_target(&self) -> u32 {
        self.config.cwnd_min_target.max(self.tso_segs_goal)
    }

    /// Target cwnd: BDP at the current `cwnd_gain`, plus the
    /// ack-aggregation bonus, plus the quantization budget, rounded up to
    /// even, plus PROBE_BW phase-0's +2 headroom.
    fn target_cwnd(&self, ack_aggregation_bonus: u32) -> u32 {
        let mut target = self
            .bdp_at_gain(self.cwnd_gain())
            .saturating_add(ack_aggregation_bonus);

        target = target.saturating_add(3 * self.tso_segs_goal);
        if target % 2 != 0 {
            target += 1;
        }

        if let Mode::ProbeBw(state) = &self.mode {
            if state.cycle_idx() == 0 {
                target += 2;
            }
        }

        target
    }

    /// The per-ACK control loop.
    ///
    /// A sample that violates a precondition (`interval_us <= 0`) simply
    /// contributes no bandwidth observation: [`Bandwidth::from_delivery`]
    /// returns `None` and the filter update for that sample is skipped, but
    /// round accounting, min_rtt tracking, and the control outputs still
    /// run against whatever model state already exists -- mirroring the
    /// reference implementation's own `bbr_update_bw` early return, which
    /// is scoped to the bandwidth sample rather than the whole control loop.
    pub fn on_ack(&mut self, sample: RateSample, host: &mut impl Host, random: &mut dyn Generator) {
        let _span = tracing_span!(self.round.round_count());
        let now = sample.tcp_mstamp;
        let mss = host.mss();
        let ca_state = host.ca_state();

        // --- round accounting ---
        let round_start = self.round.on_ack(sample.prior_delivered, sample.delivered);
        self.recovery
            .end_round_if_due(round_start, sample.prior_delivered);

        // --- recovery entry/exit and loss subtraction ---
        let conserved_cwnd = self.recovery.recover_or_restore_cwnd(
            self.cwnd,
            sample.losses,
            sample.acked_sacked,
            sample.prior_in_flight,
            ca_state,
            sample.delivered,
        );

        // --- bandwidth sample ---
        //
        // `delivered`/`prior_delivered` are the connection's cumulative
        // counters; the packets this particular sample covers is their
        // difference, the same quantity `round::Counter` already uses to
        // detect round boundaries.
        let delivered_this_sample = sample.delivered.saturating_sub(sample.prior_delivered);
        if let Some(bw_sample) = Bandwidth::from_delivery(delivered_this_sample, sample.interval_us)
        {
            let below_current_max = self
                .bw_filter
                .get()
                .is_some_and(|max| bw_sample < max);
            if !(sample.is_app_limited && below_current_max) {
                self.bw_filter.update(bw_sample, self.round.round_count());
            }
        }

        // --- ack aggregation bonus ---
        let ack_aggregation_bonus = self.model.update_ack_aggregation(
            self.bw(),
            sample.acked_sacked,
            round_start,
            now,
            host.cwnd(),
        );

        // --- PROBE_BW cycle advance ---
        if let Mode::ProbeBw(state) = &mut self.mode {
            let min_rtt_duration = self
                .model
                .min_rtt_us()
                .map(Duration::from_micros)
                .unwrap_or(DEFAULT_PACING_SHIFT);
            let bdp = {
                // bdp_at_gain borrows self immutably; compute it before
                // taking `state` mutably again below.
                let bw = if self.lt_bw.use_bw() {
                    self.lt_bw.bw()
                } else {
                    self.bw_filter.get().unwrap_or(Bandwidth::ZERO)
                };
                let min_rtt_us = self.model.min_rtt_us().unwrap_or(0);
                probe_rtt::bdp_packets(bw, min_rtt_us)
            };
            state.on_ack(
                now,
                min_rtt_duration,
                sample.prior_in_flight,
                bdp,
                sample.losses > 0,
                random,
            );
        }

        // --- pipe-full detection, STARTUP only ---
        if matches!(self.mode, Mode::Startup) && round_start && !sample.is_app_limited {
            self.full_pipe
                .on_round_start(self.bw_filter.get().unwrap_or(Bandwidth::ZERO), sample.losses > 0);
        }

        // --- mode transitions: STARTUP -> DRAIN -> PROBE_BW ---
        if matches!(self.mode, Mode::Startup) && self.full_pipe.filled_pipe() {
            debug_log!("bbr: pipe full, entering DRAIN");
            self.mode = Mode::Drain;
        }

        if matches!(self.mode, Mode::Drain)
            && crate::drain::is_done(sample.prior_in_flight, self.bdp_at_unity_gain())
        {
            debug_log!("bbr: drain complete, entering PROBE_BW");
            self.enter_probe_bw(now, random);
        }

        // --- min_rtt tracking and PROBE_RTT lifecycle ---
        let rtt_us = (sample.rtt_us >= 0).then_some(sample.rtt_us as u64);
        self.model.update_min_rtt(rtt_us, now, sample.is_ack_delayed);

        if !self.mode.is_probe_rtt()
            && !self.idle_restart
            && self.model.probe_rtt_expired(now)
        {
            debug_log!("bbr: min_rtt window expired, entering PROBE_RTT");
            self.recovery.save_cwnd(self.cwnd, ca_state, false);
            let mut state = probe_rtt::State::new();
            state.enter();
            self.mode = Mode::ProbeRtt(state);
        }

        let probe_rtt_done = if let Mode::ProbeRtt(state) = &mut self.mode {
            state.on_ack(
                sample.prior_in_flight,
                self.config.cwnd_min_target,
                round_start,
                now,
                self.config.probe_rtt_duration,
            )
        } else {
            false
        };

        if probe_rtt_done {
            self.model.schedule_next_probe_rtt(now);
            self.cwnd = self.recovery.restore_cwnd(self.cwnd);
            if self.full_pipe.filled_pipe() {
                debug_log!("bbr: probe_rtt exit, re-entering PROBE_BW");
                self.enter_probe_bw(now, random);
            } else {
                debug_log!("bbr: probe_rtt exit, pipe not yet full, returning to STARTUP");
                self.mode = Mode::Startup;
            }
        }

        // --- long-term (policer) bandwidth estimator ---
        self.lt_bw.on_sample(
            host.delivered(),
            host.lost(),
            sample.losses,
            sample.is_app_limited,
            round_start,
            now,
            mss,
        );
        if self.mode.is_probe_bw() && round_start && self.lt_bw.on_probe_bw_round_start() {
            debug_log!("bbr: long-term estimate expired, resetting PROBE_BW gain cycling");
            self.enter_probe_bw(now, random);
        }

        // --- idle-restart bookkeeping ---
        if self.idle_restart && sample.delivered > 0 {
            self.idle_restart = false;
        }

        // --- control outputs: pacing rate ---
        let bw = self.bw();
        let candidate_rate = pacing::compute_pacing_rate_bps(bw, mss, self.pacing_gain());
        let candidate_rate = candidate_rate.min(host.max_pacing_rate_bps());
        self.pacing_rate_bps = pacing::next_pacing_rate_bps(
            self.pacing_rate_bps,
            candidate_rate,
            self.full_pipe.filled_pipe(),
        );

        self.tso_segs_goal = pacing::tso_segs(
            self.pacing_rate_bps,
            mss,
            DEFAULT_PACING_SHIFT.as_nanos() as u64,
            host.gso_max_segs(),
        );

        // --- control outputs: cwnd ---
        let mut cwnd = if let Some(conserved) = conserved_cwnd {
            conserved
        } else {
            let target = self.target_cwnd(ack_aggregation_bonus);
            recovery_state::State::target_cwnd_growth(
                self.cwnd,
                sample.acked_sacked,
                target,
                self.full_pipe.filled_pipe(),
                sample.delivered,
                self.config.initial_cwnd,
            )
        };

        if let Mode::ProbeRtt(_) = &self.mode {
            let bdp = self.bdp_at_unity_gain();
            cwnd = cwnd.min(probe_rtt::State::target_cwnd_packets(
                bdp,
                self.config.cwnd_min_target,
            ));
        }

        self.cwnd = recovery_state::State::clamp(
            cwnd,
            host.cwnd_clamp(),
            self.mode.is_probe_rtt(),
            self.cwnd_min_target(),
            self.config.cwnd_min_target,
        );

        host.set_cwnd(self.cwnd);
        host.set_pacing_rate(self.pacing_rate_bps);
    }

    /// Enters PROBE_BW with a fresh randomized starting phase.
    fn enter_probe_bw(&mut self, now: Timestamp, random: &mut dyn Generator) {
        self.mode = Mode::ProbeBw(probe_bw::State::enter(
            now,
            random,
            self.config.cycle_rand,
            self.config.pacing_gain_cycle,
        ));
    }

    /// Called by the host when a send follows an application-idle period
    /// (no packets in flight).
    pub fn on_transmit_start(&mut self, host: &mut impl Host) {
        if host.packets_in_flight() != 0 {
            return;
        }

        self.idle_restart = true;
        let now = host.now();
        self.model.reset_ack_aggregation_epoch(now);

        if self.mode.is_probe_bw() {
            // Re-emit pacing immediately at unity gain to avoid a bursty
            // overshoot from resuming at whatever gain the cycle was in.
            let rate = pacing::compute_pacing_rate_bps(self.bw(), host.mss(), Gain::UNITY);
            let rate = rate.min(host.max_pacing_rate_bps());
            host.set_pacing_rate(rate);
        }
    }

    /// Called by the host on congestion-avoidance-state transitions. On
    /// `Loss`, resets pipe-full partial counters, forces the current round
    /// to end, and feeds the long-term estimator a synthetic `losses=1`
    /// sample (an RTO is treated as end-of-round and as evidence toward an
    /// in-progress or already-engaged policer interval, never a reason to
    /// discard one).
    pub fn set_state(&mut self, new_state: CaState, host: &impl Host) {
        if new_state == CaState::Loss {
            self.full_pipe.reset_pipe_full_detection();
            self.round.set_round_end(host.delivered());
            self.lt_bw
                .on_rto(host.delivered(), host.lost(), host.now(), host.mss());
        }
    }

    /// Saves cwnd and returns the host's current ssthresh unchanged.
    pub fn ssthresh(&mut self, host: &impl Host) -> u32 {
        self.recovery
            .save_cwnd(self.cwnd, host.ca_state(), self.mode.is_probe_rtt());
        host.ssthresh()
    }

    /// Clears pipe-full partial counters and the LT interval sampler --
    /// not `full_bw_reached` itself -- and returns the host's current cwnd
    /// unchanged.
    pub fn undo_cwnd(&mut self, host: &impl Host) -> u32 {
        self.full_pipe.reset_pipe_full_detection();
        self.lt_bw.reset_sampling();
        host.cwnd()
    }

    /// BBR may slow-start even in recovery, so provision 3x cwnd of send
    /// buffer.
    pub fn sndbuf_expand(&self) -> u32 {
        3
    }

    /// The TSO segmentation hint for an explicit `mss`/`gso_max_segs`,
    /// independent of the cached [`Self::tso_segs_goal`].
    pub fn tso_segs(&self, mss: u32, gso_max_segs: u32) -> u32 {
        pacing::tso_segs(
            self.pacing_rate_bps,
            mss,
            DEFAULT_PACING_SHIFT.as_nanos() as u64,
            gso_max_segs,
        )
    }

    /// The cached TSO segmentation hint computed on the last
    /// control-loop pass.
    pub fn tso_segs_goal(&self) -> u32 {
        self.tso_segs_goal
    }

    /// A diagnostics snapshot of the control block's current gains and
    /// bandwidth/min_rtt estimates.
    pub fn get_info(&self, mss: u32) -> Info {
        Info {
            bw_bytes_per_sec: self.bw().to_raw_bytes_per_sec(mss),
            min_rtt_us: self.model.min_rtt_us(),
            pacing_gain: self.pacing_gain(),
            cwnd_gain: self.cwnd_gain(),
        }
    }

    pub fn has_seen_rtt(&self) -> bool {
        self.has_seen_rtt
    }

    pub fn filled_pipe(&self) -> bool {
        self.full_pipe.filled_pipe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Clock, Generator};
    use crate::time::Clock as _;

    #[derive(Clone)]
    struct TestHost {
        now: crate::time::Timestamp,
        mss: u32,
        packets_in_flight: u32,
        delivered: u64,
        lost: u64,
        srtt_us: Option<u64>,
        ca_state: CaState,
        max_pacing_rate_bps: u64,
        cwnd_clamp: u32,
        cwnd: u32,
        ssthresh: u32,
        is_app_limited: bool,
        gso_max_segs: u32,
        set_cwnd_calls: u32,
        set_pacing_rate_calls: u32,
    }

    impl TestHost {
        fn new(clock: &Clock) -> Self {
            Self {
                now: clock.get_time(),
                mss: 1200,
                packets_in_flight: 0,
                delivered: 0,
                lost: 0,
                srtt_us: None,
                ca_state: CaState::Open,
                max_pacing_rate_bps: u64::MAX,
                cwnd_clamp: 10_000,
                cwnd: 10,
                ssthresh: u32::MAX,
                is_app_limited: false,
                gso_max_segs: 64,
                set_cwnd_calls: 0,
                set_pacing_rate_calls: 0,
            }
        }
    }

    impl Host for TestHost {
        fn now(&self) -> crate::time::Timestamp {
            self.now
        }
        fn mss(&self) -> u32 {
            self.mss
        }
        fn packets_in_flight(&self) -> u32 {
            self.packets_in_flight
        }
        fn delivered(&self) -> u64 {
            self.delivered
        }
        fn lost(&self) -> u64 {
            self.lost
        }
        fn srtt_us(&self) -> Option<u64> {
            self.srtt_us
        }
        fn ca_state(&self) -> CaState {
            self.ca_state
        }
        fn max_pacing_rate_bps(&self) -> u64 {
            self.max_pacing_rate_bps
        }
        fn cwnd_clamp(&self) -> u32 {
            self.cwnd_clamp
        }
        fn cwnd(&self) -> u32 {
            self.cwnd
        }
        fn ssthresh(&self) -> u32 {
            self.ssthresh
        }
        fn is_app_limited(&self) -> bool {
            self.is_app_limited
        }
        fn gso_max_segs(&self) -> u32 {
            self.gso_max_segs
        }
        fn set_cwnd(&mut self, cwnd: u32) {
            self.cwnd = cwnd;
            self.set_cwnd_calls += 1;
        }
        fn set_pacing_rate(&mut self, pacing_rate_bps: u64) {
            self.set_pacing_rate_calls += 1;
            let _ = pacing_rate_bps;
        }
    }

    fn sample(
        delivered: u64,
        prior_delivered: u64,
        interval_us: i64,
        rtt_us: i64,
        now: crate::time::Timestamp,
    ) -> RateSample {
        RateSample {
            delivered,
            prior_delivered,
            interval_us,
            rtt_us,
            losses: 0,
            acked_sacked: (delivered - prior_delivered) as u32,
            prior_in_flight: 10,
            is_app_limited: false,
            is_ack_delayed: false,
            delivered_mstamp: now,
            tcp_mstamp: now,
        }
    }

    #[test]
    fn new_establishes_startup_with_cwnd_floor() {
        let clock = Clock::default();
        let host = TestHost::new(&clock);
        let bbr = Bbr::new(Config::default(), &host).unwrap();

        assert!(matches!(bbr.mode(), Mode::Startup));
        assert!(bbr.cwnd() >= Config::default().cwnd_min_target);
    }

    #[test]
    fn zero_mss_is_rejected() {
        let clock = Clock::default();
        let mut host = TestHost::new(&clock);
        host.mss = 0;
        assert_eq!(Bbr::new(Config::default(), &host).unwrap_err(), ConfigError::MssZero);
    }

    #[test]
    fn startup_ramps_cwnd_and_eventually_fills_pipe() {
        let mut clock = Clock::default();
        let mut host = TestHost::new(&clock);
        host.srtt_us = Some(50_000);
        let mut bbr = Bbr::new(Config::default(), &host).unwrap();
        let mut rng = Generator::default();

        let mut delivered = 0u64;
        for round in 0..12u64 {
            let prior = delivered;
            // bandwidth grows for the first few rounds, then plateaus,
            // simulating the pipe filling.
            let this_round_delivered = if round < 6 { 100 + round * 20 } else { 100 };
            delivered += this_round_delivered;
            clock.inc_by(Duration::from_micros(1000));
            let now = clock.get_time();
            let s = sample(delivered, prior, 1000, 50_000, now);
            host.delivered = delivered;
            host.now = now;
            bbr.on_ack(s, &mut host, &mut rng);
        }

        // after enough plateaued rounds, the pipe should be detected full
        // and the mode should have advanced out of STARTUP.
        assert!(bbr.filled_pipe());
        assert!(!matches!(bbr.mode(), Mode::Startup));
    }

    #[test]
    fn idle_restart_sets_flag_and_clears_on_next_delivery() {
        let clock = Clock::default();
        let mut host = TestHost::new(&clock);
        host.packets_in_flight = 0;
        let mut bbr = Bbr::new(Config::default(), &host).unwrap();

        bbr.on_transmit_start(&mut host);
        assert!(bbr.idle_restart);

        let mut rng = Generator::default();
        let now = host.now();
        let s = sample(10, 0, 1000, 50_000, now);
        host.delivered = 10;
        bbr.on_ack(s, &mut host, &mut rng);
        assert!(!bbr.idle_restart);
    }

    #[test]
    fn loss_state_resets_pipe_full_partial_counters() {
        let clock = Clock::default();
        let host = TestHost::new(&clock);
        let mut bbr = Bbr::new(Config::default(), &host).unwrap();

        bbr.full_pipe.on_round_start(Bandwidth::from_raw(1000), false);
        bbr.set_state(CaState::Loss, &host);
        // after a reset, the plateau counter needs a full fresh run to
        // declare the pipe full again.
        assert!(!bbr.full_pipe.filled_pipe());
    }

    #[test]
    fn undo_cwnd_does_not_reset_full_bw_reached() {
        let clock = Clock::default();
        let host = TestHost::new(&clock);
        let mut bbr = Bbr::new(Config::default(), &host).unwrap();

        // force the pipe-full flag on directly to test the invariant in isolation
        for _ in 0..4 {
            bbr.full_pipe.on_round_start(Bandwidth::from_raw(1000), false);
        }
        assert!(bbr.full_pipe.filled_pipe());

        bbr.undo_cwnd(&host);
        assert!(bbr.full_pipe.filled_pipe());
    }

    #[test]
    fn ssthresh_saves_cwnd_and_returns_host_value() {
        let clock = Clock::default();
        let mut host = TestHost::new(&clock);
        host.ssthresh = 42;
        let mut bbr = Bbr::new(Config::default(), &host).unwrap();

        assert_eq!(bbr.ssthresh(&host), 42);
    }

    #[test]
    fn sndbuf_expand_is_three() {
        let clock = Clock::default();
        let host = TestHost::new(&clock);
        let bbr = Bbr::new(Config::default(), &host).unwrap();
        assert_eq!(bbr.sndbuf_expand(), 3);
    }
}
