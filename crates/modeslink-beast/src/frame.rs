//! Beast/Radarcape frame deframer.
//!
//! The receiver emits an escape-delimited, self-describing binary stream.
//! This module handles the pure byte-level deframing; it does no I/O and
//! holds no opinion about baud rates or receiver families.
//!
//! # Wire format
//!
//! ```text
//! 0x1A <type> <6 timestamp bytes> <signal byte> <payload...>
//! ```
//!
//! - `0x1A` introduces every frame; any literal `0x1A` inside the frame is
//!   doubled on the wire and collapses to a single byte here.
//! - `type` selects the frame class and thereby the payload length
//!   ([`MessageType::payload_length`]).
//! - The 7 bytes after the type are frame metadata: a 48-bit big-endian
//!   timestamp followed by a signal level.
//!
//! The deframer is a finite state machine fed arbitrary byte slices. It
//! emits completed frames and sync-quality events in input order, and it
//! never holds a byte across a [`feed`](Deframer::feed) boundary except
//! through its state and in-progress buffers, so chunking the input
//! anywhere yields identical output.

use modeslink_core::types::{Message, MessageType, TimestampKind, ESCAPE};

/// Number of metadata bytes per frame: 6 timestamp bytes plus 1 signal byte.
pub const METADATA_LENGTH: usize = 7;

/// While hunting for sync, report a sync error after this many bytes
/// without finding a frame boundary.
pub const MAX_BYTES_WITHOUT_SYNC: u32 = 30;

/// Parser FSM state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Waiting for any non-escape byte, so the following escape is
    /// unambiguously a frame boundary.
    Resync,
    /// Scanning for the next escape byte.
    Find1a,
    /// Tentatively reading a type byte after an unconfirmed escape; an
    /// unknown type here just resumes the scan.
    TestType,
    /// Reading a type byte after a confirmed frame boundary; an unknown
    /// type here is a sync error.
    ReadType,
    /// Accumulating metadata and payload bytes.
    ReadData,
    /// An escape was the last byte of the previous input slice; the next
    /// byte must be its doubled partner.
    ReadEscaped1a,
    /// Expecting the escape that starts the next frame.
    Read1a,
}

/// A completed frame as it came off the wire, before timestamp
/// classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    /// Frame class; never [`MessageType::Invalid`].
    pub message_type: MessageType,
    /// 6 timestamp bytes followed by the signal byte, de-escaped.
    pub metadata: [u8; METADATA_LENGTH],
    /// De-escaped payload of length `message_type.payload_length()`.
    pub payload: Vec<u8>,
}

impl RawFrame {
    /// The 48-bit timestamp, assembled big-endian from the first six
    /// metadata bytes.
    pub fn timestamp(&self) -> u64 {
        ((self.metadata[0] as u64) << 40)
            | ((self.metadata[1] as u64) << 32)
            | ((self.metadata[2] as u64) << 24)
            | ((self.metadata[3] as u64) << 16)
            | ((self.metadata[4] as u64) << 8)
            | (self.metadata[5] as u64)
    }

    /// The signal level byte.
    pub fn signal(&self) -> u8 {
        self.metadata[6]
    }

    /// Convert into a consumer-facing [`Message`] with the given timestamp
    /// classification.
    pub fn into_message(self, timestamp_kind: TimestampKind) -> Message {
        Message {
            message_type: self.message_type,
            timestamp_kind,
            timestamp: self.timestamp(),
            signal: self.signal(),
            payload: self.payload,
        }
    }
}

/// An event produced by feeding bytes to the deframer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseEvent {
    /// A complete frame was deframed.
    Frame(RawFrame),
    /// A framing violation was detected; the deframer has reset itself and
    /// is hunting for a frame boundary again.
    LostSync,
}

/// The escape-aware deframing state machine.
#[derive(Debug)]
pub struct Deframer {
    state: State,
    /// Bytes consumed while hunting since we last had sync or reported a
    /// sync error.
    bytes_since_sync: u32,
    message_type: MessageType,
    metadata: Vec<u8>,
    payload: Vec<u8>,
}

impl Default for Deframer {
    fn default() -> Self {
        Self::new()
    }
}

impl Deframer {
    pub fn new() -> Deframer {
        Deframer {
            state: State::Resync,
            bytes_since_sync: 0,
            message_type: MessageType::Invalid,
            metadata: Vec::with_capacity(METADATA_LENGTH),
            payload: Vec::new(),
        }
    }

    /// Forget all progress and hunt for a frame boundary from scratch.
    ///
    /// Used when the underlying line is reopened or retuned; the bytes
    /// around such an event are garbage anyway.
    pub fn reset(&mut self) {
        self.state = State::Resync;
        self.bytes_since_sync = 0;
        self.message_type = MessageType::Invalid;
        self.metadata.clear();
        self.payload.clear();
    }

    /// Consume one input slice, returning the frames and sync events it
    /// produced, in order.
    ///
    /// Feeding a stream in chunks, at any boundaries, produces the same
    /// events as feeding it whole.
    pub fn feed(&mut self, input: &[u8]) -> Vec<ParseEvent> {
        let mut events = Vec::new();
        let mut pos = 0;

        while pos < input.len() {
            match self.state {
                State::Resync => {
                    // Consume escapes until an ordinary byte shows up; the
                    // escape after that byte is a real frame boundary.
                    while pos < input.len() {
                        if input[pos] != ESCAPE {
                            self.state = State::Find1a;
                            break;
                        }
                        pos += 1;
                        self.bytes_since_sync += 1;
                        if self.bytes_since_sync > MAX_BYTES_WITHOUT_SYNC {
                            self.lost_sync(&mut events);
                            break;
                        }
                    }
                }

                State::Find1a => {
                    while pos < input.len() {
                        if input[pos] == ESCAPE {
                            pos += 1;
                            self.state = State::TestType;
                            break;
                        }
                        pos += 1;
                        self.bytes_since_sync += 1;
                        if self.bytes_since_sync > MAX_BYTES_WITHOUT_SYNC {
                            self.lost_sync(&mut events);
                            break;
                        }
                    }
                }

                State::TestType => {
                    // Tentative: an unknown byte here means the escape we
                    // followed was mid-frame noise. Resume scanning without
                    // consuming, so a doubled escape is retried correctly.
                    let message_type = MessageType::from_byte(input[pos]);
                    if message_type == MessageType::Invalid {
                        self.state = State::Find1a;
                    } else {
                        pos += 1;
                        self.begin_frame(message_type);
                    }
                }

                State::ReadType => {
                    // Confirmed frame boundary: the type byte must be valid.
                    let message_type = MessageType::from_byte(input[pos]);
                    if message_type == MessageType::Invalid {
                        self.lost_sync(&mut events);
                    } else {
                        pos += 1;
                        self.begin_frame(message_type);
                    }
                }

                State::ReadData => {
                    let wanted = self.frame_length();
                    while pos < input.len() && self.data_length() < wanted {
                        let b = input[pos];
                        pos += 1;

                        if b == ESCAPE {
                            if pos == input.len() {
                                // The doubled partner is in the next read.
                                self.state = State::ReadEscaped1a;
                                break;
                            }
                            if input[pos] != ESCAPE {
                                self.lost_sync(&mut events);
                                break;
                            }
                            // Valid doubled escape; consume the partner.
                            pos += 1;
                        }

                        self.push_data(b);
                    }

                    if self.state == State::ReadData && self.data_length() >= wanted {
                        events.push(ParseEvent::Frame(self.take_frame()));
                        self.state = State::Read1a;
                    }
                }

                State::ReadEscaped1a => {
                    // The previous slice ended on an escape; only its
                    // doubled partner may follow.
                    if input[pos] != ESCAPE {
                        self.lost_sync(&mut events);
                    } else {
                        pos += 1;
                        self.push_data(ESCAPE);
                        if self.data_length() >= self.frame_length() {
                            events.push(ParseEvent::Frame(self.take_frame()));
                            self.state = State::Read1a;
                        } else {
                            self.state = State::ReadData;
                        }
                    }
                }

                State::Read1a => {
                    if input[pos] == ESCAPE {
                        pos += 1;
                        self.state = State::ReadType;
                    } else {
                        self.lost_sync(&mut events);
                    }
                }
            }
        }

        events
    }

    fn begin_frame(&mut self, message_type: MessageType) {
        self.message_type = message_type;
        self.metadata.clear();
        self.payload.clear();
        self.state = State::ReadData;
    }

    /// Total de-escaped bytes in the current frame: metadata plus the
    /// type-determined payload.
    fn frame_length(&self) -> usize {
        METADATA_LENGTH + self.message_type.payload_length().unwrap_or(0)
    }

    fn data_length(&self) -> usize {
        self.metadata.len() + self.payload.len()
    }

    fn push_data(&mut self, b: u8) {
        if self.metadata.len() < METADATA_LENGTH {
            self.metadata.push(b);
        } else {
            self.payload.push(b);
        }
    }

    fn take_frame(&mut self) -> RawFrame {
        let mut metadata = [0u8; METADATA_LENGTH];
        metadata.copy_from_slice(&self.metadata);
        self.metadata.clear();
        RawFrame {
            message_type: self.message_type,
            metadata,
            payload: std::mem::take(&mut self.payload),
        }
    }

    fn lost_sync(&mut self, events: &mut Vec<ParseEvent>) {
        events.push(ParseEvent::LostSync);
        self.state = State::Resync;
        self.bytes_since_sync = 0;
    }
}
