//! SessionBuilder -- fluent builder for constructing [`SerialSession`]s.
//!
//! Separates configuration from construction: the device path, an optional
//! fixed baud rate, fixed settings, and the initial filter are collected
//! first, and no I/O happens until the built session is started.
//!
//! # Example
//!
//! ```no_run
//! use modeslink_beast::SessionBuilder;
//!
//! # fn example() -> modeslink_core::Result<()> {
//! let session = SessionBuilder::new("/dev/beast")
//!     .fixed_baud_rate(3_000_000)
//!     .build();
//! session.set_message_notifier(|message| println!("{message:?}"));
//! session.start()?;
//! # Ok(())
//! # }
//! ```

use std::sync::Mutex;

use modeslink_core::filter::Filter;
use modeslink_core::settings::Settings;
use modeslink_core::transport::Transport;

use crate::session::{SerialSession, TransportSource};

/// Fluent builder for [`SerialSession`].
///
/// Defaults: baud rate discovery over the standard rates, receiver family
/// autodetection, and a filter that accepts everything.
pub struct SessionBuilder {
    path: String,
    fixed_baud_rate: Option<u32>,
    fixed_settings: Settings,
    filter: Filter,
}

impl SessionBuilder {
    /// Create a builder for the given device path
    /// (e.g. `/dev/ttyUSB0` on Linux, `COM3` on Windows).
    pub fn new(path: &str) -> SessionBuilder {
        SessionBuilder {
            path: path.to_string(),
            fixed_baud_rate: None,
            fixed_settings: Settings::default(),
            filter: Filter::accept_all(),
        }
    }

    /// Pin the line speed instead of discovering it. Passing `0` keeps
    /// autobaud, matching the convention of the receiver's other hosts.
    pub fn fixed_baud_rate(mut self, baud_rate: u32) -> SessionBuilder {
        self.fixed_baud_rate = (baud_rate != 0).then_some(baud_rate);
        self
    }

    /// Fix individual settings knobs. Set knobs win over filter-derived
    /// defaults; unset knobs stay adaptive. Fixing the `radarcape` knob
    /// also skips receiver autodetection.
    pub fn fixed_settings(mut self, settings: Settings) -> SessionBuilder {
        self.fixed_settings = settings;
        self
    }

    /// The initial downstream filter; replaceable later via
    /// [`SerialSession::set_filter`].
    pub fn filter(mut self, filter: Filter) -> SessionBuilder {
        self.filter = filter;
        self
    }

    /// Build a session that opens the configured device path.
    pub fn build(self) -> SerialSession {
        SerialSession::new(
            self.path,
            self.fixed_baud_rate,
            self.fixed_settings,
            self.filter,
            TransportSource::Device,
        )
    }

    /// Build a session over a caller-provided transport.
    ///
    /// This is the entry point for testing (pass a `MockTransport` from
    /// `modeslink-test-harness`). The transport is consumed by the first
    /// start; such a session cannot be restarted after closing.
    pub fn build_with_transport(self, transport: Box<dyn Transport>) -> SerialSession {
        SerialSession::new(
            self.path,
            self.fixed_baud_rate,
            self.fixed_settings,
            self.filter,
            TransportSource::Provided(Mutex::new(Some(transport))),
        )
    }
}
