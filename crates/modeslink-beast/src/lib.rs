//! Beast/Radarcape serial input engine for modeslink.
//!
//! This crate turns the raw byte stream of a Mode-S Beast or Radarcape
//! receiver on a local serial device into typed, timestamped messages,
//! adapting itself to the hardware on the other end. It provides:
//!
//! - **Deframer** ([`frame`]) -- the escape-aware state machine that cuts
//!   the self-describing binary stream into frames and reports sync
//!   quality, tolerant of arbitrary read boundaries.
//! - **Autobaud** ([`autobaud`]) -- line speed discovery: cycle through the
//!   standard rates with exponential backoff until the deframer reports a
//!   sustained run of good frames, and restart the hunt if a pinned rate
//!   goes bad.
//! - **Receiver detection** ([`detect`]) -- Beast vs. Radarcape
//!   autodetection from the presence or absence of status frames, plus
//!   GPS-timestamp tracking.
//! - **SerialSession** ([`session`]) -- the background task tying it all
//!   together over a [`Transport`](modeslink_core::Transport): open,
//!   configure, read, dispatch, and reconnect after errors without
//!   operator intervention.
//! - **SessionBuilder** ([`builder`]) -- fluent construction of sessions.
//!
//! # Example
//!
//! ```no_run
//! use modeslink_beast::SessionBuilder;
//!
//! # fn example() -> modeslink_core::Result<()> {
//! let session = SessionBuilder::new("/dev/beast").build();
//! session.set_message_notifier(|message| {
//!     println!("{} @{}", message.message_type, message.timestamp);
//! });
//! session.start()?;
//! # Ok(())
//! # }
//! ```

pub mod autobaud;
pub mod builder;
pub mod detect;
pub mod frame;
pub mod session;

pub use builder::SessionBuilder;
pub use frame::{Deframer, ParseEvent, RawFrame};
pub use session::{MessageNotifier, SerialSession};
