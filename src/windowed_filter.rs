// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! A windowed min/max filter over a monotonic timestamp dimension.
//!
//! State is three `(value, timestamp)` candidates rather than one: a single
//! running extremum forgets a sample the instant a more extreme one arrives,
//! so when that newer sample expires the filter has nothing left to fall
//! back on and reports a stale or absent value until fresh data arrives. The
//! three-candidate form keeps the second- and third-best samples in reserve
//! so the reported value only drops when the whole window has actually
//! rolled past every sample that justified it.
//!
//! Based on
//! <https://git.kernel.org/pub/scm/linux/kernel/git/torvalds/linux.git/commit/?id=f672258391b42a5c7cc2732c9c063e56a85c8dbe>

use core::marker::PhantomData;

#[derive(Clone, Copy, Debug)]
struct Sample<V, Time> {
    value: V,
    time: Time,
}

/// Decides whether `new` is at least as extreme as `current` under this
/// filter's ordering (max or min).
pub trait Policy<T> {
    fn dominates(new: T, current: T) -> bool;
}

#[derive(Clone, Copy, Debug)]
pub struct MaxPolicy;
#[derive(Clone, Copy, Debug)]
pub struct MinPolicy;

impl<T: PartialOrd> Policy<T> for MaxPolicy {
    #[inline]
    fn dominates(new: T, current: T) -> bool {
        new >= current
    }
}

impl<T: PartialOrd> Policy<T> for MinPolicy {
    #[inline]
    fn dominates(new: T, current: T) -> bool {
        new <= current
    }
}

/// Tracks the minimum or maximum value seen over a sliding window of length
/// `window`, in the units of the `Time`/`Duration` dimension supplied to
/// [`Self::update`].
#[derive(Clone, Copy, Debug)]
pub struct WindowedFilter<V, Time, Duration, P> {
    window: Duration,
    // `samples[0]` is always the current reported extremum.
    samples: [Option<Sample<V, Time>>; 3],
    policy: PhantomData<P>,
}

/// A filter that tracks the running maximum.
pub type WindowedMaxFilter<V, Time, Duration> = WindowedFilter<V, Time, Duration, MaxPolicy>;
/// A filter that tracks the running minimum.
pub type WindowedMinFilter<V, Time, Duration> = WindowedFilter<V, Time, Duration, MinPolicy>;

impl<V, Time, Duration, P> WindowedFilter<V, Time, Duration, P>
where
    V: Copy + PartialOrd,
    Time: Copy + PartialOrd + core::ops::Sub<Output = Duration>,
    Duration: Copy + PartialOrd,
    P: Policy<V>,
{
    /// Constructs a new, empty filter with the given window length.
    pub const fn new(window: Duration) -> Self {
        Self {
            window,
            samples: [None, None, None],
            policy: PhantomData,
        }
    }

    /// Returns the current extremum, or `None` if no sample has been
    /// recorded yet.
    #[inline]
    pub fn get(&self) -> Option<V> {
        self.samples[0].map(|s| s.value)
    }

    /// Returns the window length this filter was constructed with.
    #[inline]
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Updates the filter with a new `(value, now)` sample.
    ///
    /// `now` must be monotonically non-decreasing across calls.
    pub fn update(&mut self, value: V, now: Time) {
        let sample = Sample { value, time: now };

        let Some(s0) = self.samples[0] else {
            self.samples = [Some(sample); 3];
            return;
        };

        let window_expired = match self.samples[2] {
            Some(s2) => now - s2.time > self.window,
            None => true,
        };

        if P::dominates(value, s0.value) || window_expired {
            // This sample dominates everything recorded, or the whole window
            // has rolled past the oldest candidate: start over.
            self.samples = [Some(sample); 3];
            return;
        }

        let s1 = self.samples[1].expect("s1 present whenever s0 is present");
        if P::dominates(value, s1.value) {
            self.samples[1] = Some(sample);
            self.samples[2] = Some(sample);
            return;
        }

        let s2 = self.samples[2].expect("s2 present whenever s0 is present");
        if P::dominates(value, s2.value) {
            self.samples[2] = Some(sample);
            return;
        }

        self.subwindow_update(sample);
    }

    /// The new sample dominates none of the three candidates: age out
    /// expired candidates and insert it as the new third candidate.
    fn subwindow_update(&mut self, sample: Sample<V, Time>) {
        let s0 = self.samples[0].expect("checked by caller");

        if sample.time - s0.time > self.window {
            self.samples[0] = self.samples[1];
            self.samples[1] = self.samples[2];

            let s0 = self.samples[0].expect("s1 was present");
            if sample.time - s0.time > self.window {
                self.samples[0] = self.samples[1];
                self.samples[1] = Some(sample);
            }
        }

        self.samples[2] = Some(sample);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_filter_tracks_running_max() {
        let mut filter: WindowedMaxFilter<u32, u64, u64> = WindowedMaxFilter::new(10);

        assert_eq!(filter.get(), None);

        filter.update(5, 0);
        assert_eq!(filter.get(), Some(5));

        // A lower sample doesn't displace the max while it's in-window.
        filter.update(3, 1);
        assert_eq!(filter.get(), Some(5));

        // A higher sample always displaces.
        filter.update(7, 2);
        assert_eq!(filter.get(), Some(7));

        // After the window rolls past every candidate, the most recent
        // (even if lower) becomes the new max.
        filter.update(1, 20);
        assert_eq!(filter.get(), Some(1));
    }

    #[test]
    fn min_filter_tracks_running_min() {
        let mut filter: WindowedMinFilter<u32, u64, u64> = WindowedMinFilter::new(10);

        filter.update(10, 0);
        assert_eq!(filter.get(), Some(10));

        filter.update(4, 2);
        assert_eq!(filter.get(), Some(4));

        filter.update(6, 3);
        // 6 doesn't beat the recorded min of 4.
        assert_eq!(filter.get(), Some(4));

        // The newest candidate (t=3) is now 11 ticks behind `now`, so the
        // whole window is empty of in-range samples and the filter forgets
        // everything, reporting the new sample alone.
        filter.update(8, 14);
        assert_eq!(filter.get(), Some(8));

        // 9 doesn't beat 8 and the window hasn't fully expired, so 8 is
        // retained as the running min.
        filter.update(9, 20);
        assert_eq!(filter.get(), Some(8));
    }

    #[test]
    fn retains_middle_candidate_after_expiry() {
        // Regression check that the filter keeps more than one candidate in
        // reserve: a single-candidate filter would drop straight to the
        // newest sample once the max's timestamp ages out, rather than
        // promoting the next-best in-window sample.
        let mut filter: WindowedMaxFilter<u32, u64, u64> = WindowedMaxFilter::new(10);

        filter.update(9, 0);
        filter.update(5, 1);
        filter.update(4, 2);

        // t=0 sample (9) is now out of window; the second-place candidate
        // (4, recorded at t=2) is promoted to the reported max.
        filter.update(3, 11);
        assert_eq!(filter.get(), Some(4));
    }

    // P1: after every update, the reported max is at least as large as any
    // sample whose timestamp is still within the window of the latest one.
    #[test]
    fn max_never_understates_any_in_window_sample() {
        use bolero::check;

        const WINDOW: u64 = 10;

        check!()
            .with_type::<Vec<(u32, u16)>>()
            .for_each(|deltas| {
                let mut filter: WindowedMaxFilter<u32, u64, u64> = WindowedMaxFilter::new(WINDOW);
                let mut samples: Vec<(u32, u64)> = Vec::new();
                let mut now = 0u64;

                for (value, delta) in deltas {
                    now += *delta as u64;
                    filter.update(*value, now);
                    samples.push((*value, now));

                    let reported = filter.get().unwrap();
                    for (sample_value, sample_time) in &samples {
                        if now - sample_time <= WINDOW {
                            assert!(
                                reported >= *sample_value,
                                "filter reported {reported} but in-window sample {sample_value} at {sample_time} (now={now}) was larger"
                            );
                        }
                    }
                }
            });
    }
}
