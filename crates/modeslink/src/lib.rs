//! # modeslink -- Serial input engine for Mode-S Beast / Radarcape receivers
//!
//! `modeslink` reads the escape-framed binary stream of a Beast or
//! Radarcape ADS-B receiver from a local serial device and delivers typed,
//! timestamped messages -- while adapting itself to the hardware: it
//! discovers the line speed, autodetects the receiver family, pushes the
//! right configuration back over the wire, and recovers from corruption
//! and disconnects without operator help.
//!
//! ## Quick Start
//!
//! ```no_run
//! use modeslink::beast::SessionBuilder;
//!
//! #[tokio::main]
//! async fn main() -> modeslink::Result<()> {
//!     let session = SessionBuilder::new("/dev/beast").build();
//!     session.set_message_notifier(|message| {
//!         println!(
//!             "{} ts={} ({}) signal={}",
//!             message.message_type, message.timestamp, message.timestamp_kind, message.signal
//!         );
//!     });
//!     session.start()?;
//!
//!     // The session self-manages from here: autobaud, receiver
//!     // detection, settings pushes, reconnects.
//!     tokio::signal::ctrl_c().await.ok();
//!     session.close().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! The library is organized as a workspace of focused crates:
//!
//! | Crate                     | Purpose                                          |
//! |---------------------------|--------------------------------------------------|
//! | `modeslink-core`          | Types, settings model, [`Filter`], [`Transport`], errors |
//! | `modeslink-transport`     | Serial transport implementation                  |
//! | `modeslink-beast`         | Deframer, autobaud, receiver detection, session  |
//! | `modeslink-test-harness`  | Mock transport for deterministic tests           |
//! | **`modeslink`**           | This facade crate -- re-exports everything       |
//!
//! ## Delivery rules
//!
//! Messages reach the notifier only once the engine trusts the link: never
//! while the baud rate is still being hunted, and never while the receiver
//! family is unknown (the configuration dialect is ambiguous until then).
//! Each delivered message must also pass the active [`Filter`] -- the
//! hardware-side prefilters are coarser than a per-DF filter, so the
//! engine finishes the job. Prolonged silence on the notifier is the only
//! user-visible failure mode; everything else is handled internally.

pub use modeslink_core::*;

/// The Beast/Radarcape input engine: deframer, autobaud controller,
/// receiver autodetection, and the serial session that drives them.
pub mod beast {
    pub use modeslink_beast::*;
}

/// Transport implementations (the serial port behind the engine).
pub mod transport {
    pub use modeslink_transport::*;
}
