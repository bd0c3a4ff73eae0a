//! Receiver family autodetection.
//!
//! Beast and Radarcape hardware share their framing, so the only in-band
//! tell is the periodic status frame that exists on the Radarcape alone.
//! When the user hasn't fixed the family, the session watches for a status
//! frame within a bounded window; seeing one means Radarcape, silence means
//! Beast. Either outcome re-sends the settings, because the shared `g`/`G`
//! switch changes meaning with the family.
//!
//! Status frames also carry whether the Radarcape currently stamps frames
//! with GPS time, which classifies the timestamps of everything that
//! follows.

use std::time::Duration;

use modeslink_core::settings::Settings;
use modeslink_core::types::{ReceiverType, TimestampKind};

/// How long to wait for a Radarcape status frame before concluding the
/// receiver is a Beast. Long enough to cover a full first autobaud pass
/// over the standard rates.
pub const RADARCAPE_DETECT_INTERVAL: Duration = Duration::from_secs(10);

/// GPS-timestamp bit in the first byte of a status frame payload.
const STATUS_GPS_TIMESTAMP_BIT: u8 = 0x10;

/// Tracks the receiver family and its timestamp mode.
#[derive(Debug)]
pub struct ReceiverDetector {
    /// The family fixed by configuration, or `Unknown` to autodetect.
    fixed: ReceiverType,
    /// The family currently in effect.
    current: ReceiverType,
    /// Whether status frames say timestamps are GPS-disciplined right now.
    receiving_gps_timestamps: bool,
}

impl ReceiverDetector {
    /// A detector honoring the `radarcape` knob of the fixed settings:
    /// set on or off skips detection entirely, unset autodetects.
    pub fn from_settings(fixed_settings: &Settings) -> ReceiverDetector {
        let fixed = match fixed_settings.radarcape {
            Some(true) => ReceiverType::Radarcape,
            Some(false) => ReceiverType::Beast,
            None => ReceiverType::Unknown,
        };
        ReceiverDetector {
            fixed,
            current: fixed,
            receiving_gps_timestamps: false,
        }
    }

    /// The family currently in effect. While this is
    /// [`ReceiverType::Unknown`], no messages are delivered downstream.
    pub fn receiver_type(&self) -> ReceiverType {
        self.current
    }

    /// Whether the session should keep a detection timeout armed.
    pub fn needs_detection(&self) -> bool {
        self.current == ReceiverType::Unknown
    }

    /// Record a status frame.
    ///
    /// Always refreshes the GPS timestamp mode from the payload. Returns
    /// `true` when this frame resolves an unknown family to Radarcape, in
    /// which case the session must cancel the detect timeout and re-send
    /// the settings.
    pub fn on_status_frame(&mut self, payload: &[u8]) -> bool {
        self.receiving_gps_timestamps = payload
            .first()
            .is_some_and(|&b| b & STATUS_GPS_TIMESTAMP_BIT != 0);

        if self.current == ReceiverType::Unknown {
            self.current = ReceiverType::Radarcape;
            true
        } else {
            false
        }
    }

    /// The detection window elapsed without a status frame.
    ///
    /// Returns `true` when this resolves an unknown family to Beast; the
    /// session then re-sends the settings.
    pub fn on_detect_timeout(&mut self) -> bool {
        if self.current == ReceiverType::Unknown {
            self.current = ReceiverType::Beast;
            true
        } else {
            false
        }
    }

    /// Back to the configured starting point, for a fresh connection.
    pub fn reset(&mut self) {
        self.current = self.fixed;
        self.receiving_gps_timestamps = false;
    }

    /// The timestamp classification for frames arriving now.
    pub fn timestamp_kind(&self) -> TimestampKind {
        if self.receiving_gps_timestamps {
            TimestampKind::Gps
        } else {
            TimestampKind::TwelveMeg
        }
    }

    /// Whether status frames currently report GPS-disciplined timestamps.
    pub fn receiving_gps_timestamps(&self) -> bool {
        self.receiving_gps_timestamps
    }
}
