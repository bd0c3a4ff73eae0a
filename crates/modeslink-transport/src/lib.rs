//! Transport implementations for modeslink.
//!
//! This crate provides the concrete implementation of the
//! [`Transport`](modeslink_core::Transport) trait from `modeslink-core` for
//! the one physical link a Beast/Radarcape receiver has: a local serial
//! device.
//!
//! # Example
//!
//! ```no_run
//! use modeslink_transport::SerialTransport;
//! use modeslink_core::transport::Transport;
//!
//! # async fn example() -> modeslink_core::Result<()> {
//! let mut transport = SerialTransport::new("/dev/beast");
//! transport.open(3_000_000).await?;
//!
//! let mut buf = [0u8; 4096];
//! let n = transport.read(&mut buf).await?;
//! # let _ = n;
//! # Ok(())
//! # }
//! ```

pub mod serial;

pub use serial::SerialTransport;
