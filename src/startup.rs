// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! The STARTUP mode: exponential ramp-up at `high_gain` until the pipe
//! looks full, then hand off to DRAIN.

use crate::bandwidth::Gain;

/// `pacing_gain` and `cwnd_gain` are both `high_gain` throughout STARTUP, so
/// this mode carries no state of its own beyond the shared
/// [`crate::full_pipe::Estimator`] that decides when it's done.
pub const PACING_GAIN: Gain = Gain::HIGH_GAIN;
pub const CWND_GAIN: Gain = Gain::HIGH_GAIN;
