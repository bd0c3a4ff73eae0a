//! Serial port transport for Beast/Radarcape receivers.
//!
//! This module provides [`SerialTransport`], which implements the
//! [`Transport`] trait for the USB virtual COM port a Beast or Radarcape
//! presents (or a real RS-232 line on older hardware).
//!
//! The line options are fixed by the receiver firmware: 8 data bits, 1 stop
//! bit, no parity, RTS/CTS hardware flow control. Only the baud rate
//! varies, and the input engine retunes it in place while hunting for the
//! line speed.

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_serial::{SerialPort, SerialPortBuilderExt, SerialStream};

use modeslink_core::error::{Error, Result};
use modeslink_core::transport::Transport;

/// Serial port transport for a Beast/Radarcape receiver.
///
/// Created unopened; the owning session opens it with the first baud rate
/// to try and reopens it after errors.
pub struct SerialTransport {
    /// The underlying serial port stream, present while open.
    port: Option<SerialStream>,
    /// Device path, kept for reopening and logging.
    path: String,
}

impl SerialTransport {
    /// Create an unopened transport for the given device path
    /// (e.g. `/dev/ttyUSB0` on Linux, `COM3` on Windows).
    pub fn new(path: &str) -> Self {
        SerialTransport {
            port: None,
            path: path.to_string(),
        }
    }

    /// The device path this transport talks to.
    pub fn path(&self) -> &str {
        &self.path
    }
}

fn map_io_error(e: std::io::Error) -> Error {
    if e.kind() == std::io::ErrorKind::BrokenPipe || e.kind() == std::io::ErrorKind::NotConnected {
        Error::ConnectionLost
    } else {
        Error::Io(e)
    }
}

#[async_trait]
impl Transport for SerialTransport {
    async fn open(&mut self, baud_rate: u32) -> Result<()> {
        if let Some(old) = self.port.take() {
            drop(old);
        }

        tracing::debug!(
            path = %self.path,
            baud_rate,
            "Opening serial port (8N1, hardware flow control)"
        );

        let stream = tokio_serial::new(&self.path, baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .stop_bits(tokio_serial::StopBits::One)
            .parity(tokio_serial::Parity::None)
            .flow_control(tokio_serial::FlowControl::Hardware)
            .open_native_async()
            .map_err(|e| {
                tracing::error!(path = %self.path, error = %e, "Failed to open serial port");
                Error::Transport(format!("failed to open serial port {}: {}", self.path, e))
            })?;

        tracing::info!(path = %self.path, baud_rate, "Serial port opened");
        self.port = Some(stream);
        Ok(())
    }

    async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let port = self.port.as_mut().ok_or(Error::NotConnected)?;

        let n = port.read(buf).await.map_err(|e| {
            tracing::error!(path = %self.path, error = %e, "Serial read failed");
            map_io_error(e)
        })?;

        tracing::trace!(path = %self.path, bytes = n, "Received data");
        Ok(n)
    }

    async fn write_all(&mut self, data: &[u8]) -> Result<()> {
        let port = self.port.as_mut().ok_or(Error::NotConnected)?;

        tracing::trace!(path = %self.path, bytes = data.len(), data = ?data, "Sending data");

        port.write_all(data).await.map_err(|e| {
            tracing::error!(path = %self.path, error = %e, "Serial write failed");
            map_io_error(e)
        })?;

        // Settings commands are tiny; push them out immediately.
        port.flush().await.map_err(|e| {
            tracing::error!(path = %self.path, error = %e, "Serial flush failed");
            map_io_error(e)
        })?;

        Ok(())
    }

    fn set_baud_rate(&mut self, baud_rate: u32) -> Result<()> {
        let port = self.port.as_mut().ok_or(Error::NotConnected)?;

        tracing::debug!(path = %self.path, baud_rate, "Set baud rate");
        port.set_baud_rate(baud_rate).map_err(|e| {
            tracing::error!(path = %self.path, baud_rate, error = %e, "Failed to set baud rate");
            Error::Transport(format!("failed to set baud rate {baud_rate}: {e}"))
        })
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(mut port) = self.port.take() {
            tracing::debug!(path = %self.path, "Closing serial port");

            if let Err(e) = port.flush().await {
                tracing::warn!(
                    path = %self.path,
                    error = %e,
                    "Failed to flush before closing (continuing anyway)"
                );
            }

            // The port closes when dropped here.
            tracing::info!(path = %self.path, "Serial port closed");
        }

        Ok(())
    }

    fn is_open(&self) -> bool {
        self.port.is_some()
    }
}
