//! Core types for the Beast/Radarcape binary protocol.
//!
//! These types describe the receive side of the link: the frame classes the
//! receiver can emit, the timestamp flavors it can stamp them with, and the
//! decoded [`Message`] handed to downstream consumers.

use std::fmt;

/// The frame escape byte.
///
/// Introduces every frame on the wire; literal occurrences inside a frame
/// are doubled. Also introduces each outbound dipswitch command.
pub const ESCAPE: u8 = 0x1A;

/// Classification of a received frame by its single type byte.
///
/// The type byte follows the `0x1A` frame escape on the wire. Each known
/// class implies a fixed payload length; unknown type bytes map to
/// [`MessageType::Invalid`] so the deframer can resynchronize instead of
/// failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    /// Unknown type byte. Never carried by a dispatched frame.
    Invalid,
    /// Mode A/C reply (type byte `0x31`).
    ModeAc,
    /// 56-bit Mode S reply (type byte `0x32`).
    ModeSShort,
    /// 112-bit Mode S reply (type byte `0x33`).
    ModeSLong,
    /// Radarcape status report (type byte `0x34`).
    Status,
}

impl MessageType {
    /// Classify a raw type byte.
    pub fn from_byte(b: u8) -> MessageType {
        match b {
            0x31 => MessageType::ModeAc,
            0x32 => MessageType::ModeSShort,
            0x33 => MessageType::ModeSLong,
            0x34 => MessageType::Status,
            _ => MessageType::Invalid,
        }
    }

    /// The wire type byte for this class, or `None` for [`MessageType::Invalid`].
    pub fn to_byte(self) -> Option<u8> {
        match self {
            MessageType::ModeAc => Some(0x31),
            MessageType::ModeSShort => Some(0x32),
            MessageType::ModeSLong => Some(0x33),
            MessageType::Status => Some(0x34),
            MessageType::Invalid => None,
        }
    }

    /// The number of payload bytes carried by a frame of this type, after
    /// de-escaping and excluding the 7 metadata bytes.
    ///
    /// `None` for [`MessageType::Invalid`]: unknown types have no length and
    /// force the deframer to resynchronize.
    pub fn payload_length(self) -> Option<usize> {
        match self {
            MessageType::ModeAc => Some(2),
            MessageType::ModeSShort => Some(7),
            MessageType::ModeSLong => Some(14),
            MessageType::Status => Some(14),
            MessageType::Invalid => None,
        }
    }

    /// Returns `true` for every class except [`MessageType::Invalid`].
    pub fn is_known(self) -> bool {
        self != MessageType::Invalid
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageType::ModeAc => write!(f, "MODE_AC"),
            MessageType::ModeSShort => write!(f, "MODE_S_SHORT"),
            MessageType::ModeSLong => write!(f, "MODE_S_LONG"),
            MessageType::Status => write!(f, "STATUS"),
            MessageType::Invalid => write!(f, "INVALID"),
        }
    }
}

/// The clock a frame's 48-bit timestamp was taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimestampKind {
    /// Free-running 12 MHz counter (Beast, or Radarcape without GPS lock).
    TwelveMeg,
    /// GPS-disciplined time of day (Radarcape with GPS lock).
    Gps,
}

impl fmt::Display for TimestampKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimestampKind::TwelveMeg => write!(f, "12MHz"),
            TimestampKind::Gps => write!(f, "GPS"),
        }
    }
}

/// The family of receiver hardware on the other end of the serial line.
///
/// The two families share the same framing but differ in their
/// configuration dialect and timestamp source, and only the Radarcape emits
/// [`MessageType::Status`] frames. `Unknown` is a transient state while
/// autodetection is in progress; no messages are delivered to consumers
/// until it resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReceiverType {
    /// Not yet determined; autodetection in progress.
    Unknown,
    /// Classic Mode-S Beast.
    Beast,
    /// Radarcape.
    Radarcape,
}

impl fmt::Display for ReceiverType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReceiverType::Unknown => write!(f, "unknown"),
            ReceiverType::Beast => write!(f, "beast"),
            ReceiverType::Radarcape => write!(f, "radarcape"),
        }
    }
}

/// A single deframed receiver message, as delivered to the consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Frame class.
    pub message_type: MessageType,
    /// Which clock produced [`timestamp`](Self::timestamp).
    pub timestamp_kind: TimestampKind,
    /// 48-bit timestamp, assembled big-endian from the frame metadata.
    pub timestamp: u64,
    /// Logarithmic signal level indicator.
    pub signal: u8,
    /// De-escaped payload bytes; length is fixed per message type.
    pub payload: Vec<u8>,
}
