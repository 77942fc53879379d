//! Register addresses, field layouts and bitfield structures for the DS1302 RTC.
//!
//! Every clock register has a write command byte and a read command byte that
//! differ only in bit 0. [`RegAddr`] holds the write form; the read form is
//! derived with [`RegAddr::read_address`].

use bitfield::bitfield;

use crate::datetime::{decode_bcd_field, encode_bcd, BitSpan, ValidationError};

/// Read/write select bit of the command byte.
pub const READ_BIT: u8 = 0x01;

/// Clock register command bytes (write form) for the DS1302 RTC.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RegAddr {
    /// Seconds register (0-59) with clock-halt flag
    Seconds = 0x80,
    /// Minutes register (0-59)
    Minutes = 0x82,
    /// Hours register (0-23) with 12/24-hour select
    Hours = 0x84,
    /// Day of month register (1-31)
    Day = 0x86,
    /// Month register (1-12)
    Month = 0x88,
    /// Day of week register (1-7)
    Weekday = 0x8A,
    /// Year register (0-99)
    Year = 0x8C,
    /// Write-protect register
    WriteProtect = 0x8E,
}

impl RegAddr {
    /// All clock registers in address order.
    pub const ALL: [RegAddr; 8] = [
        RegAddr::Seconds,
        RegAddr::Minutes,
        RegAddr::Hours,
        RegAddr::Day,
        RegAddr::Month,
        RegAddr::Weekday,
        RegAddr::Year,
        RegAddr::WriteProtect,
    ];

    /// Command byte that writes this register.
    pub const fn write_address(self) -> u8 {
        self as u8
    }

    /// Command byte that reads this register.
    pub const fn read_address(self) -> u8 {
        self as u8 | READ_BIT
    }
}

/// A logical time or calendar field stored as BCD in one register.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Field {
    /// Seconds, 0-59
    Seconds,
    /// Minutes, 0-59
    Minutes,
    /// Hours in 24-hour form, 0-23
    Hours,
    /// Day of month, 1-31
    Day,
    /// Month, 1-12
    Month,
    /// Day of week, 1 = Monday
    Weekday,
    /// Last two digits of the year, 0-99
    Year,
}

impl Field {
    /// The register holding this field.
    pub const fn register(self) -> RegAddr {
        match self {
            Field::Seconds => RegAddr::Seconds,
            Field::Minutes => RegAddr::Minutes,
            Field::Hours => RegAddr::Hours,
            Field::Day => RegAddr::Day,
            Field::Month => RegAddr::Month,
            Field::Weekday => RegAddr::Weekday,
            Field::Year => RegAddr::Year,
        }
    }

    /// Bits holding the tens digit, `None` for the single-digit weekday.
    pub const fn tens_bits(self) -> Option<BitSpan> {
        match self {
            Field::Seconds | Field::Minutes => Some(BitSpan::new(6, 4)),
            Field::Hours | Field::Day => Some(BitSpan::new(5, 4)),
            Field::Month => Some(BitSpan::new(4, 4)),
            Field::Weekday => None,
            Field::Year => Some(BitSpan::new(7, 4)),
        }
    }

    /// Bits holding the ones digit.
    pub const fn ones_bits(self) -> BitSpan {
        match self {
            Field::Weekday => BitSpan::new(2, 0),
            _ => BitSpan::new(3, 0),
        }
    }

    /// Smallest legal value.
    pub const fn min(self) -> u8 {
        match self {
            Field::Day | Field::Month | Field::Weekday => 1,
            _ => 0,
        }
    }

    /// Largest legal value.
    pub const fn max(self) -> u8 {
        match self {
            Field::Seconds | Field::Minutes => 59,
            Field::Hours => 23,
            Field::Day => 31,
            Field::Month => 12,
            Field::Weekday => 7,
            Field::Year => 99,
        }
    }

    /// Checks `value` against the legal range of this field.
    pub fn validate(self, value: u8) -> Result<u8, ValidationError> {
        if (self.min()..=self.max()).contains(&value) {
            Ok(value)
        } else {
            Err(ValidationError::OutOfRange { field: self, value })
        }
    }

    /// Validates `value` and packs it into the register's raw byte.
    ///
    /// Hours are always written in 24-hour mode and seconds always clear the
    /// clock-halt flag, which starts the oscillator.
    pub fn encode(self, value: u8) -> Result<u8, ValidationError> {
        let value = self.validate(value)?;
        Ok(encode_bcd(value))
    }

    /// Extracts the field value from a raw register byte.
    ///
    /// Bits outside the field are ignored. No range check is done; a chip
    /// holding an illegal pattern decodes to whatever the digits say.
    pub fn decode(self, raw: u8) -> u8 {
        decode_bcd_field(raw, self.tens_bits(), self.ones_bits())
    }
}

bitfield! {
    /// Seconds register with clock-halt flag and BCD encoding.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct Seconds(u8);
    impl Debug;
    /// Oscillator stopped when set
    pub clock_halt, set_clock_halt: 7;
    /// Tens place of seconds (0-5)
    pub ten_seconds, set_ten_seconds: 6, 4;
    /// Ones place of seconds (0-9)
    pub seconds, set_seconds: 3, 0;
}

bitfield! {
    /// Hours register with 12/24-hour select and BCD encoding.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct Hours(u8);
    impl Debug;
    /// 12-hour mode when set
    pub twelve_hour, set_twelve_hour: 7;
    /// Tens place of hours in 24-hour mode (0-2)
    pub ten_hours, set_ten_hours: 5, 4;
    /// Ones place of hours
    pub hours, set_hours: 3, 0;
}

bitfield! {
    /// Write-protect register.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct WriteProtect(u8);
    impl Debug;
    /// All register writes are ignored by the chip while set
    pub protected, set_protected: 7;
}

macro_rules! from_register_u8 {
    ($typ:ident) => {
        impl From<u8> for $typ {
            fn from(v: u8) -> Self {
                $typ(v)
            }
        }
        impl From<$typ> for u8 {
            fn from(v: $typ) -> Self {
                v.0
            }
        }
    };
}

from_register_u8!(Seconds);
from_register_u8!(Hours);
from_register_u8!(WriteProtect);

#[cfg(feature = "defmt")]
impl defmt::Format for Seconds {
    fn format(&self, f: defmt::Formatter) {
        let seconds = 10 * self.ten_seconds() + self.seconds();
        defmt::write!(f, "Seconds({}s", seconds);
        if self.clock_halt() {
            defmt::write!(f, ", halted");
        }
        defmt::write!(f, ")");
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Hours {
    fn format(&self, f: defmt::Formatter) {
        let hours = 10 * self.ten_hours() + self.hours();
        if self.twelve_hour() {
            defmt::write!(f, "Hours({}h 12h)", hours);
        } else {
            defmt::write!(f, "Hours({}h 24h)", hours);
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for WriteProtect {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "WriteProtect({})", self.protected());
    }
}
