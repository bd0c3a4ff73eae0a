//! Receiver configuration knobs and their wire encoding.
//!
//! Beast and Radarcape receivers are configured through a small dipswitch
//! dialect: each switch has a lower-case "off" letter and an upper-case
//! "on" letter, sent over the serial line as a `0x1A '1' <letter>` command.
//! [`Settings`] models those switches tri-valued (on / off / unset) so a
//! user's fixed choices can be merged with defaults derived from the active
//! [`Filter`]; [`ResolvedSettings`] is the fully-determined form that
//! actually gets encoded.
//!
//! One switch is shared between the two receiver families: `g`/`G` selects
//! GPS timestamps on a Radarcape but the DF0/4/5 mask on a Beast. The
//! resolved settings carry both meanings and pick the right one at encode
//! time based on the `radarcape` knob.

use std::fmt;
use std::ops::BitOr;
use std::str::FromStr;

use bytes::{BufMut, BytesMut};

use crate::error::Error;
use crate::filter::Filter;
use crate::types::ESCAPE;

/// Command byte for a dipswitch toggle, sent after the escape.
const DIPSWITCH_COMMAND: u8 = b'1';

/// Tri-valued receiver settings.
///
/// Each knob is `None` (unset), `Some(false)` (off), or `Some(true)` (on).
/// Merge partial settings with [`BitOr`]; the left side wins wherever it is
/// set. Turn the result into something encodable with
/// [`resolve`](Settings::resolve).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Settings {
    /// `c`/`C`: AVR output format vs. binary output format.
    pub binary_format: Option<bool>,
    /// `d`/`D`: deliver only DF11/DF17 (and DF18) messages.
    pub filter_df11_df17_only: Option<bool>,
    /// `e`/`E`: AVR-format MLAT timestamps. Unused in binary mode.
    pub avrmlat: Option<bool>,
    /// `f`/`F`: disable CRC checking.
    pub crc_disable: Option<bool>,
    /// `g`/`G` on a Radarcape: GPS timestamps instead of the 12 MHz clock.
    pub gps_timestamps: Option<bool>,
    /// `g`/`G` on a Beast: don't deliver DF0/DF4/DF5 messages.
    pub mask_df0_df4_df5: Option<bool>,
    /// `h`/`H`: RTS/CTS hardware handshake.
    pub rts_handshake: Option<bool>,
    /// `i`/`I`: disable forward error correction.
    pub fec_disable: Option<bool>,
    /// `j`/`J`: decode Mode A/C replies.
    pub modeac: Option<bool>,
    /// `r`/`R`: the receiver is a Radarcape. Software-only, no dipswitch;
    /// unset selects autodetection.
    pub radarcape: Option<bool>,
}

impl Settings {
    /// The settings a [`Filter`] implies: hardware-side prefiltering is
    /// enabled exactly when it cannot lose wanted traffic.
    ///
    /// Knobs the filter says nothing about are left unset.
    pub fn derived_from(filter: &Filter) -> Settings {
        Settings {
            filter_df11_df17_only: Some(filter.df11_df17_only()),
            crc_disable: Some(filter.receive_bad_crc),
            gps_timestamps: Some(filter.receive_gps_timestamps),
            mask_df0_df4_df5: Some(filter.mask_df0_df4_df5()),
            fec_disable: Some(!filter.receive_fec),
            modeac: Some(filter.receive_modeac),
            ..Settings::default()
        }
    }

    /// Decode a Radarcape status/dipswitch byte into fully-set settings.
    ///
    /// Only the Radarcape reports its switch state, so `radarcape` comes
    /// back on.
    pub fn from_status_byte(b: u8) -> Settings {
        Settings {
            binary_format: Some(b & 0x01 != 0),
            filter_df11_df17_only: Some(b & 0x02 != 0),
            avrmlat: Some(b & 0x04 != 0),
            crc_disable: Some(b & 0x08 != 0),
            gps_timestamps: Some(b & 0x10 != 0),
            rts_handshake: Some(b & 0x20 != 0),
            fec_disable: Some(b & 0x40 != 0),
            modeac: Some(b & 0x80 != 0),
            mask_df0_df4_df5: None,
            radarcape: Some(true),
        }
    }

    /// Fill every unset knob with its default.
    ///
    /// Everything defaults off except `binary_format` and `rts_handshake`:
    /// the engine only parses the binary framing, and the port is opened
    /// with hardware flow control.
    pub fn resolve(&self) -> ResolvedSettings {
        ResolvedSettings {
            binary_format: self.binary_format.unwrap_or(true),
            filter_df11_df17_only: self.filter_df11_df17_only.unwrap_or(false),
            avrmlat: self.avrmlat.unwrap_or(false),
            crc_disable: self.crc_disable.unwrap_or(false),
            gps_timestamps: self.gps_timestamps.unwrap_or(false),
            mask_df0_df4_df5: self.mask_df0_df4_df5.unwrap_or(false),
            rts_handshake: self.rts_handshake.unwrap_or(true),
            fec_disable: self.fec_disable.unwrap_or(false),
            modeac: self.modeac.unwrap_or(false),
            radarcape: self.radarcape.unwrap_or(false),
        }
    }
}

/// Merge: the left side wins wherever it is set.
impl BitOr for Settings {
    type Output = Settings;

    fn bitor(self, other: Settings) -> Settings {
        Settings {
            binary_format: self.binary_format.or(other.binary_format),
            filter_df11_df17_only: self.filter_df11_df17_only.or(other.filter_df11_df17_only),
            avrmlat: self.avrmlat.or(other.avrmlat),
            crc_disable: self.crc_disable.or(other.crc_disable),
            gps_timestamps: self.gps_timestamps.or(other.gps_timestamps),
            mask_df0_df4_df5: self.mask_df0_df4_df5.or(other.mask_df0_df4_df5),
            rts_handshake: self.rts_handshake.or(other.rts_handshake),
            fec_disable: self.fec_disable.or(other.fec_disable),
            modeac: self.modeac.or(other.modeac),
            radarcape: self.radarcape.or(other.radarcape),
        }
    }
}

/// Parse a dipswitch-letter string, e.g. `"CdFj"` or `"R"`.
///
/// Later letters override earlier ones; knobs whose letters are absent stay
/// unset. `b`/`B` addresses the Beast meaning of the shared `g` switch
/// (the DF0/4/5 mask) so both meanings remain independently settable.
impl FromStr for Settings {
    type Err = Error;

    fn from_str(s: &str) -> Result<Settings, Error> {
        let mut settings = Settings::default();
        for ch in s.chars() {
            let (knob, on) = match ch {
                'c' | 'C' => (&mut settings.binary_format, ch == 'C'),
                'd' | 'D' => (&mut settings.filter_df11_df17_only, ch == 'D'),
                'e' | 'E' => (&mut settings.avrmlat, ch == 'E'),
                'f' | 'F' => (&mut settings.crc_disable, ch == 'F'),
                'g' | 'G' => (&mut settings.gps_timestamps, ch == 'G'),
                'b' | 'B' => (&mut settings.mask_df0_df4_df5, ch == 'B'),
                'h' | 'H' => (&mut settings.rts_handshake, ch == 'H'),
                'i' | 'I' => (&mut settings.fec_disable, ch == 'I'),
                'j' | 'J' => (&mut settings.modeac, ch == 'J'),
                'r' | 'R' => (&mut settings.radarcape, ch == 'R'),
                _ => {
                    return Err(Error::InvalidParameter(format!(
                        "unrecognized settings letter {ch:?}"
                    )))
                }
            };
            *knob = Some(on);
        }
        Ok(settings)
    }
}

/// Fully-determined receiver settings, ready for encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedSettings {
    pub binary_format: bool,
    pub filter_df11_df17_only: bool,
    pub avrmlat: bool,
    pub crc_disable: bool,
    pub gps_timestamps: bool,
    pub mask_df0_df4_df5: bool,
    pub rts_handshake: bool,
    pub fec_disable: bool,
    pub modeac: bool,
    pub radarcape: bool,
}

impl ResolvedSettings {
    /// Encode the dipswitch command sequence that configures the receiver.
    ///
    /// One `0x1A '1' <letter>` triplet per switch, in the fixed order the
    /// firmware documents. The shared `g` switch takes its Radarcape or
    /// Beast meaning from the `radarcape` knob; `radarcape` itself is not a
    /// switch and is not encoded.
    pub fn to_message(&self) -> Vec<u8> {
        let mut msg = BytesMut::with_capacity(8 * 3);
        push_switch(&mut msg, self.binary_format, b'c', b'C');
        push_switch(&mut msg, self.filter_df11_df17_only, b'd', b'D');
        push_switch(&mut msg, self.avrmlat, b'e', b'E');
        push_switch(&mut msg, self.crc_disable, b'f', b'F');
        push_switch(
            &mut msg,
            if self.radarcape {
                self.gps_timestamps
            } else {
                self.mask_df0_df4_df5
            },
            b'g',
            b'G',
        );
        push_switch(&mut msg, self.rts_handshake, b'h', b'H');
        push_switch(&mut msg, self.fec_disable, b'i', b'I');
        push_switch(&mut msg, self.modeac, b'j', b'J');
        msg.to_vec()
    }

    /// The status/dipswitch byte a Radarcape in this configuration would
    /// report. Zero for non-Radarcape settings; only the Radarcape has
    /// status reporting.
    pub fn to_status_byte(&self) -> u8 {
        if !self.radarcape {
            return 0;
        }
        (self.binary_format as u8)
            | ((self.filter_df11_df17_only as u8) << 1)
            | ((self.avrmlat as u8) << 2)
            | ((self.crc_disable as u8) << 3)
            | ((self.gps_timestamps as u8) << 4)
            | ((self.rts_handshake as u8) << 5)
            | ((self.fec_disable as u8) << 6)
            | ((self.modeac as u8) << 7)
    }

    /// The widest [`Filter`] that this configuration can still satisfy,
    /// for announcing upstream capability.
    pub fn to_filter(&self) -> Filter {
        let mut filter = Filter::default();

        if self.filter_df11_df17_only {
            filter.receive_df[11] = true;
            filter.receive_df[17] = true;
            filter.receive_df[18] = true;
        } else {
            filter.receive_df = [true; 32];
            if self.mask_df0_df4_df5 && !self.radarcape {
                filter.receive_df[0] = false;
                filter.receive_df[4] = false;
                filter.receive_df[5] = false;
            }
        }

        filter.receive_modeac = self.modeac;
        filter.receive_bad_crc = self.crc_disable;
        filter.receive_fec = !self.fec_disable;
        filter.receive_status = self.radarcape;
        filter.receive_gps_timestamps = self.gps_timestamps;
        filter
    }
}

fn push_switch(msg: &mut BytesMut, on: bool, off_letter: u8, on_letter: u8) {
    msg.put_u8(ESCAPE);
    msg.put_u8(DIPSWITCH_COMMAND);
    msg.put_u8(if on { on_letter } else { off_letter });
}

/// Prints the dipswitch letters, e.g. `CdeFgHij` (plus `r`/`R`).
impl fmt::Display for ResolvedSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = |on: bool, off: char, on_ch: char| if on { on_ch } else { off };
        write!(
            f,
            "{}{}{}{}{}{}{}{}{}",
            letter(self.binary_format, 'c', 'C'),
            letter(self.filter_df11_df17_only, 'd', 'D'),
            letter(self.avrmlat, 'e', 'E'),
            letter(self.crc_disable, 'f', 'F'),
            letter(
                if self.radarcape {
                    self.gps_timestamps
                } else {
                    self.mask_df0_df4_df5
                },
                'g',
                'G'
            ),
            letter(self.rts_handshake, 'h', 'H'),
            letter(self.fec_disable, 'i', 'I'),
            letter(self.modeac, 'j', 'J'),
            letter(self.radarcape, 'r', 'R'),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_left_side_wins_when_set() {
        let fixed = Settings {
            crc_disable: Some(true),
            ..Settings::default()
        };
        let derived = Settings {
            crc_disable: Some(false),
            modeac: Some(true),
            ..Settings::default()
        };

        let merged = fixed | derived;
        assert_eq!(merged.crc_disable, Some(true));
        assert_eq!(merged.modeac, Some(true));
        assert_eq!(merged.binary_format, None);
    }

    #[test]
    fn merge_is_not_commutative() {
        let a = Settings {
            fec_disable: Some(true),
            ..Settings::default()
        };
        let b = Settings {
            fec_disable: Some(false),
            ..Settings::default()
        };
        assert_eq!((a | b).fec_disable, Some(true));
        assert_eq!((b | a).fec_disable, Some(false));
    }

    #[test]
    fn resolve_defaults() {
        let resolved = Settings::default().resolve();
        // The engine talks binary over a hardware-handshake line.
        assert!(resolved.binary_format);
        assert!(resolved.rts_handshake);
        // Everything else is off until asked for.
        assert!(!resolved.filter_df11_df17_only);
        assert!(!resolved.crc_disable);
        assert!(!resolved.gps_timestamps);
        assert!(!resolved.mask_df0_df4_df5);
        assert!(!resolved.fec_disable);
        assert!(!resolved.modeac);
        assert!(!resolved.radarcape);
    }

    #[test]
    fn resolve_keeps_explicit_choices() {
        let settings = Settings {
            binary_format: Some(false),
            modeac: Some(true),
            ..Settings::default()
        };
        let resolved = settings.resolve();
        assert!(!resolved.binary_format);
        assert!(resolved.modeac);
    }

    #[test]
    fn encode_default_settings() {
        let msg = Settings::default().resolve().to_message();
        assert_eq!(
            msg,
            vec![
                0x1A, b'1', b'C', // binary format on
                0x1A, b'1', b'd', // no DF11/17 prefilter
                0x1A, b'1', b'e', // no AVR MLAT
                0x1A, b'1', b'f', // CRC checks on
                0x1A, b'1', b'g', // beast meaning: no DF0/4/5 mask
                0x1A, b'1', b'H', // hardware handshake on
                0x1A, b'1', b'i', // FEC on
                0x1A, b'1', b'j', // no Mode A/C
            ]
        );
    }

    #[test]
    fn shared_switch_follows_receiver_family() {
        let base = Settings {
            gps_timestamps: Some(true),
            mask_df0_df4_df5: Some(false),
            ..Settings::default()
        };

        // Radarcape: g/G carries the GPS timestamp choice.
        let radarcape = Settings {
            radarcape: Some(true),
            ..base
        }
        .resolve();
        assert_eq!(radarcape.to_message()[14], b'G');

        // Beast: g/G carries the DF0/4/5 mask, GPS request is moot.
        let beast = Settings {
            radarcape: Some(false),
            ..base
        }
        .resolve();
        assert_eq!(beast.to_message()[14], b'g');
    }

    #[test]
    fn status_byte_round_trip() {
        let byte = 0b1101_0011u8;
        let settings = Settings::from_status_byte(byte);
        assert_eq!(settings.radarcape, Some(true));
        assert_eq!(settings.binary_format, Some(true));
        assert_eq!(settings.filter_df11_df17_only, Some(true));
        assert_eq!(settings.avrmlat, Some(false));
        assert_eq!(settings.gps_timestamps, Some(true));
        assert_eq!(settings.resolve().to_status_byte(), byte);
    }

    #[test]
    fn status_byte_zero_for_beast() {
        let settings = Settings {
            radarcape: Some(false),
            gps_timestamps: Some(true),
            modeac: Some(true),
            ..Settings::default()
        };
        assert_eq!(settings.resolve().to_status_byte(), 0);
    }

    #[test]
    fn derived_from_narrow_filter() {
        let mut filter = Filter::default();
        filter.receive_df[11] = true;
        filter.receive_df[17] = true;

        let derived = Settings::derived_from(&filter);
        assert_eq!(derived.filter_df11_df17_only, Some(true));
        assert_eq!(derived.mask_df0_df4_df5, Some(true));
        assert_eq!(derived.crc_disable, Some(false));
        assert_eq!(derived.fec_disable, Some(true));
        assert_eq!(derived.modeac, Some(false));
        // The filter says nothing about the output format.
        assert_eq!(derived.binary_format, None);
        assert_eq!(derived.radarcape, None);
    }

    #[test]
    fn derived_from_wide_filter() {
        let filter = Filter::accept_all();
        let derived = Settings::derived_from(&filter);
        assert_eq!(derived.filter_df11_df17_only, Some(false));
        assert_eq!(derived.mask_df0_df4_df5, Some(false));
        assert_eq!(derived.crc_disable, Some(true));
        assert_eq!(derived.fec_disable, Some(false));
        assert_eq!(derived.modeac, Some(true));
        assert_eq!(derived.gps_timestamps, Some(true));
    }

    #[test]
    fn filter_round_trip_through_settings() {
        let mut filter = Filter::default();
        filter.receive_df[11] = true;
        filter.receive_df[17] = true;
        filter.receive_df[18] = true;

        let resolved = Settings::derived_from(&filter).resolve();
        let back = resolved.to_filter();
        assert!(back.receive_df[11]);
        assert!(back.receive_df[17]);
        assert!(back.receive_df[18]);
        assert!(!back.receive_df[4]);
    }

    #[test]
    fn parse_letter_string() {
        let settings: Settings = "CdFjR".parse().unwrap();
        assert_eq!(settings.binary_format, Some(true));
        assert_eq!(settings.filter_df11_df17_only, Some(false));
        assert_eq!(settings.crc_disable, Some(true));
        assert_eq!(settings.modeac, Some(false));
        assert_eq!(settings.radarcape, Some(true));
        // Untouched knobs stay unset.
        assert_eq!(settings.fec_disable, None);
        assert_eq!(settings.gps_timestamps, None);
    }

    #[test]
    fn parse_later_letters_override() {
        let settings: Settings = "jJ".parse().unwrap();
        assert_eq!(settings.modeac, Some(true));
    }

    #[test]
    fn parse_rejects_unknown_letters() {
        assert!("Cx".parse::<Settings>().is_err());
    }

    #[test]
    fn display_shows_switch_letters() {
        let resolved = Settings {
            modeac: Some(true),
            radarcape: Some(true),
            gps_timestamps: Some(true),
            ..Settings::default()
        }
        .resolve();
        assert_eq!(resolved.to_string(), "CdefGHiJR");
    }
}
