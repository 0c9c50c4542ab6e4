// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! cwnd control laws and the save/restore cwnd policy around loss
//! recovery.
//!
//! A small state struct advanced once per ACK, tracking entry/exit against
//! the host's reported congestion-avoidance state, built around this
//! model's full [`CaState`] enum rather than a flat recovered/recovering
//! flag -- the packet conservation rule below needs to distinguish "ACKing
//! a single packet after loss" (`Recovery`) from "an RTO just fired"
//! (`Loss`) the way the reference Linux `bbr_set_cwnd_to_recover_or_restore`
//! does.

use crate::bandwidth::CaState;

/// `bbr_cwnd_min_target`: the cwnd floor enforced in every mode.
pub const CWND_MIN_TARGET_PACKETS: u32 = 4;

#[derive(Clone, Debug, Default)]
pub struct State {
    prev_ca_state: Option<CaState>,
    packet_conservation: bool,
    prior_cwnd: Option<u32>,
    next_rtt_delivered: u64,
}

impl State {
    pub fn new() -> Self {
        Self::default()
    }

    /// Saves the current cwnd before PROBE_RTT or loss recovery clamps it
    /// down: a fresh save (`prev_ca_state < Recovery` and not already in
    /// PROBE_RTT) simply takes the current cwnd; a re-entrant save (e.g.
    /// PROBE_RTT entered while already in recovery) never regresses the
    /// value already saved.
    pub fn save_cwnd(&mut self, cwnd: u32, ca_state: CaState, in_probe_rtt: bool) {
        if !ca_state.is_recovery() && !in_probe_rtt {
            self.prior_cwnd = Some(cwnd);
        } else {
            self.prior_cwnd = Some(self.prior_cwnd.unwrap_or(cwnd).max(cwnd));
        }
    }

    /// restores the saved cwnd, consuming the guard so the next
    /// `save_cwnd` starts fresh.
    pub fn restore_cwnd(&mut self, current_cwnd: u32) -> u32 {
        let restored = self.prior_cwnd.take().unwrap_or(current_cwnd);
        restored.max(current_cwnd)
    }

    /// the recovery-entry/exit half of cwnd control, translated from
    /// the reference `bbr_set_cwnd_to_recover_or_restore`. Applied first,
    /// ahead of the steady-state target-cwnd growth rule.
    ///
    /// Returns `Some(cwnd)` when packet conservation fully determines the
    /// new cwnd (the caller should skip the steady-state growth step this
    /// round); `None` when the caller should proceed to
    /// [`target_cwnd_growth`].
    pub fn recover_or_restore_cwnd(
        &mut self,
        cwnd: u32,
        losses: u32,
        acked: u32,
        packets_in_flight: u32,
        ca_state: CaState,
        delivered: u64,
    ) -> Option<u32> {
        let mut cwnd = if losses > 0 {
            cwnd.saturating_sub(losses).max(1)
        } else {
            cwnd
        };

        let entering_recovery = !self.prev_ca_state.map_or(false, CaState::is_recovery) && ca_state.is_recovery();
        let exiting_recovery = self.prev_ca_state.map_or(false, CaState::is_recovery) && !ca_state.is_recovery();

        if entering_recovery {
            self.packet_conservation = true;
            self.next_rtt_delivered = delivered;
            cwnd = packets_in_flight.saturating_add(acked);
        } else if exiting_recovery {
            cwnd = cwnd.max(self.prior_cwnd.unwrap_or(cwnd));
            self.packet_conservation = false;
        }

        self.prev_ca_state = Some(ca_state);

        if self.packet_conservation {
            Some(cwnd.max(packets_in_flight.saturating_add(acked)))
        } else {
            None
        }
    }

    /// Clears packet conservation once a round has fully elapsed since
    /// recovery was entered, mirroring the reference's
    /// `next_rtt_delivered`-gated reset in `bbr_update_round`.
    pub fn end_round_if_due(&mut self, round_start: bool, prior_delivered: u64) {
        if round_start && self.packet_conservation && prior_delivered >= self.next_rtt_delivered {
            self.packet_conservation = false;
        }
    }

    /// Steady-state growth: once not governed by packet conservation,
    /// cwnd grows toward `target_cwnd` by at most `acked` per round. Before
    /// the pipe is full, it grows unconditionally by `acked` whenever it is
    /// still below target *or* the connection hasn't yet delivered a full
    /// initial window -- matching the reference `bbr_set_cwnd`'s
    /// `tcp_snd_cwnd(tp) < target_cwnd || tcp_data_seq_delivered(tp) < TCP_INIT_CWND`
    /// disjunction, so a connection that starts with `cwnd == target_cwnd`
    /// (no min_rtt sample yet) still keeps ramping through its first
    /// `initial_cwnd` packets.
    pub fn target_cwnd_growth(
        cwnd: u32,
        acked: u32,
        target_cwnd: u32,
        full_bw_reached: bool,
        delivered: u64,
        initial_cwnd: u32,
    ) -> u32 {
        if full_bw_reached {
            cwnd.saturating_add(acked).min(target_cwnd)
        } else if cwnd < target_cwnd || delivered < initial_cwnd as u64 {
            cwnd.saturating_add(acked)
        } else {
            cwnd
        }
    }

    /// Applies the cwnd floor and the host's `snd_cwnd_clamp` ceiling,
    /// plus PROBE_RTT's additional `cwnd_min_target` ceiling when active.
    ///
    /// `cwnd_floor` and `probe_rtt_target` are deliberately separate: the
    /// floor applied in every mode may be raised above the bare packet
    /// count (e.g. to a host's send-quantum-scaled minimum), but PROBE_RTT's
    /// ceiling must stay the bare [`CWND_MIN_TARGET_PACKETS`]-style value --
    /// the reference clamps PROBE_RTT to `bbr_cwnd_min_target` itself, never
    /// to a TSO-scaled variant of it.
    pub fn clamp(
        cwnd: u32,
        snd_cwnd_clamp: u32,
        in_probe_rtt: bool,
        cwnd_floor: u32,
        probe_rtt_target: u32,
    ) -> u32 {
        let mut cwnd = cwnd.max(cwnd_floor).min(snd_cwnd_clamp);
        if in_probe_rtt {
            cwnd = cwnd.min(probe_rtt_target);
        }
        cwnd
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn growth_continues_below_initial_cwnd_even_at_target() {
        // no min_rtt sample yet: target_cwnd == initial_cwnd == cwnd, so the
        // `cwnd < target` disjunct alone would freeze growth; the
        // `delivered < initial_cwnd` disjunct must still let it ramp.
        let grown = State::target_cwnd_growth(10, 3, 10, false, 4, 10);
        assert_eq!(grown, 13);
    }

    #[test]
    fn growth_stops_once_initial_cwnd_delivered_and_target_reached() {
        let grown = State::target_cwnd_growth(10, 3, 10, false, 10, 10);
        assert_eq!(grown, 10);
    }

    #[test]
    fn growth_capped_at_target_once_pipe_is_full() {
        let grown = State::target_cwnd_growth(10, 5, 12, true, 0, 10);
        assert_eq!(grown, 12);
    }

    #[test]
    fn entering_recovery_sets_cwnd_to_inflight_plus_acked() {
        let mut state = State::new();
        state.prev_ca_state = Some(CaState::Open);

        let result = state.recover_or_restore_cwnd(100, 0, 5, 20, CaState::Recovery, 1000);
        assert_eq!(result, Some(25));
        assert!(state.packet_conservation);
    }

    #[test]
    fn losses_subtract_with_a_floor_of_one() {
        let mut state = State::new();
        state.prev_ca_state = Some(CaState::Open);

        // losses exceed cwnd: floor at 1, not in recovery so no conservation
        let result = state.recover_or_restore_cwnd(3, 10, 0, 0, CaState::Open, 0);
        assert_eq!(result, None);
    }

    #[test]
    fn exiting_recovery_restores_prior_cwnd_floor() {
        let mut state = State::new();
        state.prev_ca_state = Some(CaState::Recovery);
        state.prior_cwnd = Some(50);

        let result = state.recover_or_restore_cwnd(10, 0, 5, 10, CaState::Open, 100);
        assert_eq!(result, None);
        assert!(!state.packet_conservation);
    }

    #[test]
    fn clamp_enforces_probe_rtt_ceiling() {
        assert_eq!(
            State::clamp(100, 1000, true, CWND_MIN_TARGET_PACKETS, CWND_MIN_TARGET_PACKETS),
            4
        );
        assert_eq!(
            State::clamp(2, 1000, false, CWND_MIN_TARGET_PACKETS, CWND_MIN_TARGET_PACKETS),
            4
        );
        assert_eq!(
            State::clamp(5000, 1000, false, CWND_MIN_TARGET_PACKETS, CWND_MIN_TARGET_PACKETS),
            1000
        );
    }

    #[test]
    fn clamp_uses_bare_probe_rtt_ceiling_even_with_a_larger_general_floor() {
        // A send-quantum-scaled floor (64) must not leak into the PROBE_RTT
        // ceiling: PROBE_RTT still clamps down to the bare target (4).
        assert_eq!(State::clamp(200, 1000, true, 64, CWND_MIN_TARGET_PACKETS), 4);
        // Outside PROBE_RTT the larger floor is honored as the general
        // minimum.
        assert_eq!(State::clamp(2, 1000, false, 64, CWND_MIN_TARGET_PACKETS), 64);
    }

    #[test]
    fn save_and_restore_round_trip() {
        let mut state = State::new();
        state.save_cwnd(42, CaState::Open, false);
        assert_eq!(state.restore_cwnd(10), 42);
        // guard consumed: a second restore just returns current
        assert_eq!(state.restore_cwnd(10), 10);
    }

    #[test]
    fn re_entrant_save_never_regresses_prior_cwnd() {
        let mut state = State::new();
        state.save_cwnd(100, CaState::Open, false);
        // a second save while already in PROBE_RTT must not overwrite
        // a larger already-saved value with a smaller one
        state.save_cwnd(10, CaState::Open, true);
        assert_eq!(state.restore_cwnd(0), 100);
    }
}
