//! Transport trait for receiver communication.
//!
//! The [`Transport`] trait abstracts over the byte link to a
//! Beast/Radarcape receiver. The real implementation is a serial port
//! (`modeslink-transport`); the test harness provides a scripted mock so
//! the input engine can be exercised deterministically without hardware.
//!
//! A transport is owned exclusively by one session, which opens it, retunes
//! its baud rate during autobaud, closes it on error, and reopens it when
//! the reconnect timer fires. Reads are untimed: they complete when the OS
//! delivers bytes or when the session drops the in-flight read during
//! shutdown.

use async_trait::async_trait;

use crate::error::Result;

#[async_trait]
pub trait Transport: Send + Sync {
    /// Open (or reopen) the link at the given baud rate and apply the line
    /// options the receiver expects.
    async fn open(&mut self, baud_rate: u32) -> Result<()>;

    /// Read available bytes into `buf`, waiting until at least one byte
    /// arrives. Returns the number of bytes read; `Ok(0)` means the peer
    /// went away.
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Write all of `data` to the receiver.
    async fn write_all(&mut self, data: &[u8]) -> Result<()>;

    /// Change the baud rate of the open link in place.
    fn set_baud_rate(&mut self, baud_rate: u32) -> Result<()>;

    /// Close the link. Subsequent reads and writes fail with
    /// [`Error::NotConnected`](crate::error::Error::NotConnected) until the
    /// transport is opened again.
    async fn close(&mut self) -> Result<()>;

    /// Whether the link is currently open.
    fn is_open(&self) -> bool;
}
