//! STAT bitmask decoding.
//!
//! The device reports channel condition as a 16-bit status word. Each
//! condition is a single bit; the decode is a pure function of the word
//! and bits beyond the documented set are ignored.

/// Decoded STAT bitmask.
///
/// Bit assignments per the CAEN EN-series manual:
///
/// | bit | flag      | meaning                  |
/// |-----|-----------|--------------------------|
/// | 0   | `IS_ON`   | channel on               |
/// | 1   | `IS_UP`   | ramping up               |
/// | 2   | `IS_DOWN` | ramping down             |
/// | 3   | `IS_OVC`  | overcurrent              |
/// | 4   | `IS_OVV`  | overvoltage              |
/// | 5   | `IS_UNV`  | undervoltage             |
/// | 6   | `IS_MAXV` | max voltage reached      |
/// | 7   | `IS_TRIP` | tripped                  |
/// | 8   | `IS_MAXPW`| max power                |
/// | 9   | `IS_TWARN`| temp warning (> 80 C)    |
/// | 10  | `IS_OVT`  | over temp (> 125 C)      |
/// | 11  | `IS_KILL` | channel killed           |
/// | 12  | `IS_INTLCK`| interlock               |
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusFlags {
    pub is_on: bool,
    pub is_up: bool,
    pub is_down: bool,
    pub is_ovc: bool,
    pub is_ovv: bool,
    pub is_unv: bool,
    pub is_maxv: bool,
    pub is_trip: bool,
    pub is_maxpw: bool,
    pub is_twarn: bool,
    pub is_ovt: bool,
    pub is_kill: bool,
    pub is_intlck: bool,
}

impl StatusFlags {
    /// Decodes a STAT word into named flags.
    ///
    /// Total over the full integer domain: bits above 12 are ignored.
    #[must_use]
    pub const fn decode(stat: u32) -> Self {
        Self {
            is_on: stat & 0x0001 != 0,
            is_up: stat & 0x0002 != 0,
            is_down: stat & 0x0004 != 0,
            is_ovc: stat & 0x0008 != 0,
            is_ovv: stat & 0x0010 != 0,
            is_unv: stat & 0x0020 != 0,
            is_maxv: stat & 0x0040 != 0,
            is_trip: stat & 0x0080 != 0,
            is_maxpw: stat & 0x0100 != 0,
            is_twarn: stat & 0x0200 != 0,
            is_ovt: stat & 0x0400 != 0,
            is_kill: stat & 0x0800 != 0,
            is_intlck: stat & 0x1000 != 0,
        }
    }

    /// Returns `(name, value)` pairs in bit order, for field emission.
    #[must_use]
    pub const fn fields(&self) -> [(&'static str, bool); 13] {
        [
            ("IS_ON", self.is_on),
            ("IS_UP", self.is_up),
            ("IS_DOWN", self.is_down),
            ("IS_OVC", self.is_ovc),
            ("IS_OVV", self.is_ovv),
            ("IS_UNV", self.is_unv),
            ("IS_MAXV", self.is_maxv),
            ("IS_TRIP", self.is_trip),
            ("IS_MAXPW", self.is_maxpw),
            ("IS_TWARN", self.is_twarn),
            ("IS_OVT", self.is_ovt),
            ("IS_KILL", self.is_kill),
            ("IS_INTLCK", self.is_intlck),
        ]
    }

    /// Returns true if no flag is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields().iter().all(|(_, set)| !set)
    }
}
