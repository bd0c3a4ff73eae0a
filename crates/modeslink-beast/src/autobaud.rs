//! Baud rate discovery.
//!
//! The line speed of a Beast/Radarcape is not negotiable in-band, so the
//! engine has to find it by listening: try a rate, watch the deframer's
//! sync quality, and move on if frames don't materialize. This module is
//! the pure decision core of that loop; the session owns the actual timer
//! and port retuning.
//!
//! The controller also keeps the good/bad sync bookkeeping while the rate
//! is pinned, so a line that quietly degrades (receiver rebooted into a
//! different speed, cable noise) sends the engine back into the hunt.

use std::time::Duration;

/// The standard rates to try, in preference order.
pub const STANDARD_RATES: [u32; 5] = [3_000_000, 1_000_000, 921_600, 230_400, 115_200];

/// Initial wait at each rate for enough good frames before moving on.
pub const AUTOBAUD_BASE_INTERVAL: Duration = Duration::from_secs(1);

/// Ceiling for the per-rate wait as it doubles on every full pass.
pub const AUTOBAUD_MAX_INTERVAL: Duration = Duration::from_secs(16);

/// Consecutive good frames required before a rate is pinned.
pub const GOOD_SYNCS_NEEDED: u32 = 50;

/// Consecutive sync failures tolerated at a pinned rate before the hunt
/// restarts.
pub const RESTART_AFTER_BAD_SYNCS: u32 = 20;

/// A run of at least this many good frames means a following sync error is
/// a one-off blip, not evidence of a wrong rate.
const GOOD_SYNC_RUN_FORGIVES: u32 = 5;

/// Pure state machine for baud rate discovery.
///
/// The session reports frame dispatches and sync errors; the controller
/// answers with what to do about the rate and the hunt timer.
#[derive(Debug)]
pub struct AutobaudController {
    /// Rates to cycle through; a single entry when a fixed rate is set.
    rates: Vec<u32>,
    /// Index of the rate currently in use.
    index: usize,
    /// Current wait between rate changes; doubles each full pass.
    interval: Duration,
    /// True while hunting for the correct rate.
    autobauding: bool,
    /// Consecutive frames with good sync.
    good_sync: u32,
    /// Consecutive sync failures without a healthy run in between.
    bad_sync: u32,
}

impl AutobaudController {
    /// A controller hunting through the standard rates, or pinned to a
    /// fixed rate when one is given.
    pub fn new(fixed_rate: Option<u32>) -> AutobaudController {
        match fixed_rate {
            Some(rate) => AutobaudController::with_rates(vec![rate], false),
            None => AutobaudController::with_rates(STANDARD_RATES.to_vec(), true),
        }
    }

    fn with_rates(rates: Vec<u32>, autobauding: bool) -> AutobaudController {
        AutobaudController {
            rates,
            index: 0,
            interval: AUTOBAUD_BASE_INTERVAL,
            autobauding,
            good_sync: 0,
            bad_sync: 0,
        }
    }

    /// The rate the port should currently be set to.
    pub fn current_rate(&self) -> u32 {
        self.rates[self.index]
    }

    /// True while the rate is still being hunted; messages are not
    /// delivered downstream in this state.
    pub fn is_autobauding(&self) -> bool {
        self.autobauding
    }

    /// Whether the session should keep an advance timer armed: only while
    /// hunting, and only if there is more than one rate to try.
    pub fn timer_needed(&self) -> bool {
        self.autobauding && self.rates.len() > 1
    }

    /// The current wait before giving up on a rate.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Move to the next rate. Wrapping around to the head of the list
    /// doubles the per-rate interval, up to the ceiling.
    ///
    /// Returns the new rate for the session to apply.
    pub fn advance(&mut self) -> u32 {
        self.index += 1;
        if self.index == self.rates.len() {
            self.index = 0;
            self.interval = (self.interval * 2).min(AUTOBAUD_MAX_INTERVAL);
        }
        self.current_rate()
    }

    /// Record a successfully deframed message.
    ///
    /// Returns `true` when this frame pins the current rate: the hunt is
    /// over and the session should cancel the advance timer.
    pub fn on_good_sync(&mut self) -> bool {
        self.good_sync += 1;
        if self.good_sync >= GOOD_SYNCS_NEEDED {
            self.good_sync = GOOD_SYNCS_NEEDED;
            self.bad_sync = 0;
            if self.autobauding {
                self.autobauding = false;
                return true;
            }
        }
        false
    }

    /// Record a sync error.
    ///
    /// Returns `true` when accumulated failures at a pinned rate mean the
    /// hunt must restart; the session should advance to the next rate and
    /// rearm the timer.
    pub fn on_lost_sync(&mut self) -> bool {
        if self.good_sync >= GOOD_SYNC_RUN_FORGIVES {
            self.bad_sync = 0;
        } else {
            self.bad_sync += 1;
        }
        self.good_sync = 0;

        if !self.autobauding && self.rates.len() > 1 && self.bad_sync > RESTART_AFTER_BAD_SYNCS {
            self.autobauding = true;
            return true;
        }
        false
    }

    /// Reset for a fresh connection: head of the rate list, base interval,
    /// counters cleared, hunting again.
    ///
    /// Fixed-rate sessions also re-enter the hunt here: with a single rate
    /// there is nothing to cycle through, but delivery stays suppressed
    /// until the reopened line produces a healthy run of frames.
    pub fn reset(&mut self) {
        self.autobauding = true;
        self.index = 0;
        self.interval = AUTOBAUD_BASE_INTERVAL;
        self.good_sync = 0;
        self.bad_sync = 0;
    }
}
