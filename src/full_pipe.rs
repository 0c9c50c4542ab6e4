// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! STARTUP pipe-full detection: a windowed bandwidth-plateau check plus an
//! independent excessive-loss exit.

use crate::bandwidth::Bandwidth;
use crate::counter::{Counter, Saturating};

/// `full_bw_thresh`: the windowed-max bandwidth must grow by at least this
/// ratio round-over-round to count as still filling the pipe.
const FULL_BW_THRESH_NUM: u64 = 5;
const FULL_BW_THRESH_DEN: u64 = 4;

/// `full_bw_cnt`: rounds of sub-threshold growth before declaring the pipe
/// full.
const FULL_BW_CNT_THRESH: u8 = 3;

/// Consecutive loss-heavy rounds in STARTUP, independent of the bandwidth
/// plateau check, that also justify giving up on further ramp-up.
const STARTUP_FULL_LOSS_COUNT: u8 = 3;

/// Tracks whether STARTUP has filled the pipe: either the windowed-max
/// bandwidth has stopped growing meaningfully for three rounds, or
/// three consecutive rounds have seen excessive loss.
#[derive(Clone, Debug)]
pub struct Estimator {
    full_bw_reached: bool,
    full_bw: Bandwidth,
    full_bw_count: Counter<u8, Saturating>,
    loss_rounds: Counter<u8, Saturating>,
}

impl Default for Estimator {
    fn default() -> Self {
        Self {
            full_bw_reached: false,
            full_bw: Bandwidth::ZERO,
            full_bw_count: Counter::default(),
            loss_rounds: Counter::default(),
        }
    }
}

impl Estimator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filled_pipe(&self) -> bool {
        self.full_bw_reached
    }

    /// called at each round boundary that is not app-limited, with
    /// the current windowed-max bandwidth.
    pub fn on_round_start(&mut self, max_bw: Bandwidth, round_had_loss: bool) {
        if self.full_bw_reached {
            return;
        }

        let threshold = Bandwidth::from_raw(
            (self.full_bw.as_raw() as u128 * FULL_BW_THRESH_NUM as u128 / FULL_BW_THRESH_DEN as u128)
                as u64,
        );

        if max_bw >= threshold {
            self.full_bw = max_bw;
            self.full_bw_count.set(0);
        } else {
            self.full_bw_count += 1;
            if self.full_bw_count >= FULL_BW_CNT_THRESH {
                self.full_bw_reached = true;
                debug_log!(full_bw = self.full_bw.as_raw(), "startup pipe full: bandwidth plateaued");
            }
        }

        if round_had_loss {
            self.loss_rounds += 1;
            if self.loss_rounds >= STARTUP_FULL_LOSS_COUNT {
                self.full_bw_reached = true;
                debug_log!("startup pipe full: excessive loss");
            }
        } else {
            self.loss_rounds.set(0);
        }
    }

    /// Clears only the plateau/loss counters, not `full_bw_reached` itself:
    /// a congestion-window undo after a spurious loss restores cwnd, not the
    /// startup/pipe-full classification. Called from both `set_state(Loss)`
    /// and `Bbr::undo_cwnd` -- neither path should reclassify a pipe that was
    /// already judged full.
    pub fn reset_pipe_full_detection(&mut self) {
        self.full_bw = Bandwidth::ZERO;
        self.full_bw_count.set(0);
        self.loss_rounds.set(0);
    }
}
