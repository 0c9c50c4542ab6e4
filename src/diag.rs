// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Ambient diagnostic logging, gated behind the `tracing` feature.
//!
//! The control loop itself never branches on whether logging is compiled
//! in -- these macros expand to nothing when the `tracing` feature is
//! disabled, so disabling it changes only observability, never behavior.

/// Emits a `tracing::debug!` event when the `tracing` feature is enabled.
macro_rules! debug_log {
    ($($arg:tt)*) => {
        #[cfg(feature = "tracing")]
        tracing::debug!($($arg)*);
    };
}

/// Emits a `tracing::trace!` event when the `tracing` feature is enabled.
macro_rules! trace_log {
    ($($arg:tt)*) => {
        #[cfg(feature = "tracing")]
        tracing::trace!($($arg)*);
    };
}

/// Enters a `tracing::trace_span!` keyed by round count for the duration of
/// one control-loop call, so a subscriber can correlate the events emitted
/// by a single `on_ack` invocation. Expands to a no-op guard when the
/// `tracing` feature is disabled.
macro_rules! tracing_span {
    ($round:expr) => {{
        #[cfg(feature = "tracing")]
        {
            tracing::trace_span!("bbr_main", round = $round).entered()
        }
        #[cfg(not(feature = "tracing"))]
        {
            ()
        }
    }};
}

pub(crate) use debug_log;
pub(crate) use tracing_span;
pub(crate) use trace_log;
