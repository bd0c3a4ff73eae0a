//! modeslink-test-harness: Test utilities for the modeslink input engine.
//!
//! Provides [`MockTransport`], a scripted in-memory
//! [`Transport`](modeslink_core::Transport) for exercising the serial
//! input engine deterministically, without receiver hardware. The paired
//! [`MockHandle`] pushes read data, injects faults, and observes
//! everything the engine wrote and configured.

pub mod mock_serial;

pub use mock_serial::{MockHandle, MockTransport};
