//! Downstream message filters.
//!
//! A [`Filter`] describes what a downstream consumer wants to receive:
//! which downlink formats, whether Mode A/C and status frames are of
//! interest, and whether bad-CRC or FEC-repaired messages are acceptable.
//! The input engine folds the active filter into the receiver settings it
//! pushes over the wire, so the hardware stops sending traffic nobody asked
//! for.

use std::fmt;

use crate::types::{Message, MessageType};

/// What a downstream consumer wants delivered.
///
/// Starts out accepting nothing; callers enable what they need. Two filters
/// compare equal when they accept exactly the same traffic, which is what
/// the input engine uses to decide whether a filter change requires a
/// settings re-send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    /// Per-DF acceptance for Mode S messages, indexed by downlink format.
    pub receive_df: [bool; 32],
    /// Accept Mode A/C replies.
    pub receive_modeac: bool,
    /// Accept Mode S messages that fail their CRC check.
    pub receive_bad_crc: bool,
    /// Accept messages repaired by forward error correction.
    pub receive_fec: bool,
    /// Accept Radarcape status reports.
    pub receive_status: bool,
    /// Prefer GPS timestamps where the hardware can supply them.
    pub receive_gps_timestamps: bool,
}

impl Default for Filter {
    fn default() -> Self {
        Filter {
            receive_df: [false; 32],
            receive_modeac: false,
            receive_bad_crc: false,
            receive_fec: false,
            receive_status: false,
            receive_gps_timestamps: false,
        }
    }
}

impl Filter {
    /// A filter that accepts everything the receiver can produce.
    pub fn accept_all() -> Filter {
        Filter {
            receive_df: [true; 32],
            receive_modeac: true,
            receive_bad_crc: true,
            receive_fec: true,
            receive_status: true,
            receive_gps_timestamps: true,
        }
    }

    /// Widen this filter to also accept everything `other` accepts.
    pub fn combine_with(&mut self, other: &Filter) {
        for (mine, theirs) in self.receive_df.iter_mut().zip(other.receive_df.iter()) {
            *mine = *mine || *theirs;
        }
        self.receive_modeac = self.receive_modeac || other.receive_modeac;
        self.receive_bad_crc = self.receive_bad_crc || other.receive_bad_crc;
        self.receive_fec = self.receive_fec || other.receive_fec;
        self.receive_status = self.receive_status || other.receive_status;
        self.receive_gps_timestamps = self.receive_gps_timestamps || other.receive_gps_timestamps;
    }

    /// The union of two filters.
    pub fn combine(one: &Filter, two: &Filter) -> Filter {
        let mut combined = one.clone();
        combined.combine_with(two);
        combined
    }

    /// Returns `true` when no downlink format outside DF11/DF17/DF18 is
    /// wanted, i.e. the hardware-side DF11/DF17-only prefilter can be
    /// enabled without losing anything.
    pub fn df11_df17_only(&self) -> bool {
        self.receive_df
            .iter()
            .enumerate()
            .all(|(df, &wanted)| !wanted || df == 11 || df == 17 || df == 18)
    }

    /// Returns `true` when none of DF0/DF4/DF5 is wanted, i.e. the
    /// hardware-side DF0/4/5 mask can be enabled.
    pub fn mask_df0_df4_df5(&self) -> bool {
        !self.receive_df[0] && !self.receive_df[4] && !self.receive_df[5]
    }

    /// Whether a decoded message passes this filter.
    ///
    /// Mode S messages are matched on downlink format, taken from the top
    /// five bits of the first payload byte.
    pub fn accepts(&self, message: &Message) -> bool {
        match message.message_type {
            MessageType::ModeAc => self.receive_modeac,
            MessageType::Status => self.receive_status,
            MessageType::ModeSShort | MessageType::ModeSLong => {
                let df = match message.payload.first() {
                    Some(&b) => ((b >> 3) & 31) as usize,
                    None => return false,
                };
                self.receive_df[df]
            }
            MessageType::Invalid => false,
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Filter[")?;
        if self.receive_modeac {
            write!(f, " modeac")?;
        }
        if self.receive_bad_crc {
            write!(f, " badcrc")?;
        }
        if self.receive_fec {
            write!(f, " fec")?;
        }
        if self.receive_status {
            write!(f, " status")?;
        }
        if self.receive_gps_timestamps {
            write!(f, " gps")?;
        }
        for (df, &wanted) in self.receive_df.iter().enumerate() {
            if wanted {
                write!(f, " {df}")?;
            }
        }
        write!(f, " ]")
    }
}
