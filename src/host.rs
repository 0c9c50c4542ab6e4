// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! The host transport's capability surface: a small, non-virtual set
//! of accessors `Bbr` reads from and writes to on each call. `Host` is
//! threaded through the control loop via a generic parameter rather than a
//! trait object, to keep everything monomorphized and allocation-free.
//!
//! `Bbr` never stores a `&dyn Host` or calls back asynchronously: every
//! method below is read during a single `on_ack`/`cwnd_event`/`set_state`
//! call and any writes (`set_cwnd`, `set_pacing_rate`) happen before that
//! call returns.

use crate::bandwidth::CaState;
use crate::time::Timestamp;

/// The per-connection state and clock sources `Bbr` needs from its host
/// transport, and the outputs it writes back.
pub trait Host {
    /// Returns the current time, at microsecond resolution.
    fn now(&self) -> Timestamp;

    /// The sender maximum segment size, in bytes. Must be nonzero.
    fn mss(&self) -> u32;

    /// Packets currently in flight (sent, not yet ACKed or declared lost).
    fn packets_in_flight(&self) -> u32;

    /// Cumulative packets delivered (ACKed) on this connection.
    fn delivered(&self) -> u64;

    /// Cumulative packets declared lost on this connection.
    fn lost(&self) -> u64;

    /// The host's smoothed RTT estimate, in microseconds, if one is
    /// available yet.
    fn srtt_us(&self) -> Option<u64>;

    /// The host's currently observed congestion-avoidance state.
    fn ca_state(&self) -> CaState;

    /// The host-imposed ceiling on `pacing_rate`, in bytes/second.
    fn max_pacing_rate_bps(&self) -> u64;

    /// The host-imposed ceiling on `cwnd`, in packets (`snd_cwnd_clamp`).
    fn cwnd_clamp(&self) -> u32;

    /// The host's current congestion window, in packets (`snd_cwnd`).
    fn cwnd(&self) -> u32;

    /// The host's current slow-start threshold, in packets.
    fn ssthresh(&self) -> u32;

    /// Whether the most recent rate sample was application-limited rather
    /// than network-limited.
    fn is_app_limited(&self) -> bool;

    /// The host's GSO/TSO burst-size ceiling, in segments, already
    /// accounting for header overhead.
    fn gso_max_segs(&self) -> u32;

    /// Writes the computed congestion window back to the host, in packets.
    fn set_cwnd(&mut self, cwnd: u32);

    /// Writes the computed pacing rate back to the host, in bytes/second,
    /// and requests that pacing be enabled if it is not already.
    fn set_pacing_rate(&mut self, pacing_rate_bps: u64);
}
