//! modeslink-core: Core types, settings model, and transport trait for
//! modeslink.
//!
//! This crate defines the hardware-agnostic pieces shared by the serial
//! driver and by applications consuming decoded messages. Nothing here does
//! I/O.
//!
//! # Key types
//!
//! - [`Message`] / [`MessageType`] -- decoded receiver frames
//! - [`Settings`] / [`ResolvedSettings`] -- tri-valued configuration knobs
//!   and their dipswitch wire encoding
//! - [`Filter`] -- what a downstream consumer wants delivered
//! - [`Transport`] -- byte-level link to the receiver
//! - [`Error`] / [`Result`] -- error handling

pub mod error;
pub mod filter;
pub mod settings;
pub mod transport;
pub mod types;

// Re-export key types at crate root for ergonomic `use modeslink_core::*`.
pub use error::{Error, Result};
pub use filter::Filter;
pub use settings::{ResolvedSettings, Settings};
pub use transport::Transport;
pub use types::{Message, MessageType, ReceiverType, TimestampKind, ESCAPE};
