//! BCD codec and time/calendar values for the DS1302 RTC.
//!
//! The DS1302 keeps each field as two BCD digits in one register, with the
//! significant bits of the tens digit depending on the register. This module
//! holds the raw codec, the weekday table, the [`Time`] and [`Date`] values
//! produced by the composite accessors and their chrono conversions.
//!
//! # Year convention
//!
//! Only the last two digits of the year are stored. They are always presented
//! with the fixed century [`CENTURY`]; there is no century rollover.
//!
//! # Error Handling
//!
//! The codec itself never fails. Range checks are done where values enter the
//! driver and are reported via [`ValidationError`].

use core::fmt;

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};

use crate::registers::Field;

/// Century added to the two-digit year register.
pub const CENTURY: u16 = 2000;

/// Weekday names, index 1 of the weekday register is the first entry.
pub const WEEKDAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// Errors reported when a value does not fit a DS1302 register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ValidationError {
    /// The value is outside the legal range of the field
    OutOfRange {
        /// Field being written
        field: Field,
        /// Rejected value
        value: u8,
    },
    /// The year cannot be stored with the fixed 20xx century
    YearOutOfRange(i32),
    /// The registers do not hold a valid calendar date and time
    InvalidDateTime,
    /// The name is not one of [`WEEKDAY_NAMES`]
    UnknownWeekday,
}

/// An inclusive range of bits inside a register byte, `high` down to `low`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BitSpan {
    high: u8,
    low: u8,
}

impl BitSpan {
    /// Creates a span covering bits `high..=low`.
    pub const fn new(high: u8, low: u8) -> Self {
        Self { high, low }
    }

    /// Extracts the span from `raw` as an unsigned value.
    pub const fn extract(self, raw: u8) -> u8 {
        let width = self.high - self.low + 1;
        let mask = ((1u16 << width) - 1) as u8;
        (raw >> self.low) & mask
    }
}

/// Packs a two-digit decimal value into one BCD byte.
///
/// No range check is done: values above 99 produce a meaningless pattern.
pub const fn encode_bcd(value: u8) -> u8 {
    let tens = value / 10;
    let ones = value % 10;
    (tens << 4) | ones
}

/// Decodes a BCD field from a raw register byte.
///
/// `tens` is `None` for single-digit fields, in which case the ones span is
/// returned as is.
pub const fn decode_bcd_field(raw: u8, tens: Option<BitSpan>, ones: BitSpan) -> u8 {
    let ones = ones.extract(raw);
    match tens {
        Some(tens) => tens.extract(raw) * 10 + ones,
        None => ones,
    }
}

/// Name of the weekday stored as `index` (1 = Monday).
pub fn weekday_name(index: u8) -> Option<&'static str> {
    let slot = usize::from(index).checked_sub(1)?;
    WEEKDAY_NAMES.get(slot).copied()
}

/// Weekday register index for `name`.
pub fn weekday_index(name: &str) -> Option<u8> {
    WEEKDAY_NAMES
        .iter()
        .position(|candidate| *candidate == name)
        .and_then(|slot| u8::try_from(slot + 1).ok())
}

/// Time of day in 24-hour form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Time {
    pub hours: u8,
    pub minutes: u8,
    pub seconds: u8,
}

impl Time {
    /// Creates a validated time of day.
    pub fn new(hours: u8, minutes: u8, seconds: u8) -> Result<Self, ValidationError> {
        Ok(Self {
            hours: Field::Hours.validate(hours)?,
            minutes: Field::Minutes.validate(minutes)?,
            seconds: Field::Seconds.validate(seconds)?,
        })
    }
}

/// Formats as `HH:MM:SS`.
impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02}",
            self.hours, self.minutes, self.seconds
        )
    }
}

/// Calendar date with a two-digit year.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Date {
    pub day: u8,
    pub month: u8,
    /// Last two digits of the year
    pub year: u8,
}

impl Date {
    /// Creates a validated date. `year` is the two-digit year register value.
    pub fn new(day: u8, month: u8, year: u8) -> Result<Self, ValidationError> {
        Ok(Self {
            day: Field::Day.validate(day)?,
            month: Field::Month.validate(month)?,
            year: Field::Year.validate(year)?,
        })
    }

    /// Year including the fixed century.
    pub fn full_year(&self) -> u16 {
        CENTURY + u16::from(self.year)
    }
}

/// Formats as `DD.MM.YYYY`.
impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}.{:02}.{:04}",
            self.day,
            self.month,
            self.full_year()
        )
    }
}

/// Register values of a full date and time, as written by
/// [`DS1302::set_datetime`](crate::DS1302::set_datetime).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DS1302DateTime {
    pub(crate) time: Time,
    pub(crate) date: Date,
    pub(crate) weekday: u8,
}

impl DS1302DateTime {
    pub(crate) fn from_datetime(datetime: &NaiveDateTime) -> Result<Self, ValidationError> {
        let year = datetime.year();
        let century = i32::from(CENTURY);
        if !(century..century + 100).contains(&year) {
            debug!("year {} cannot be stored", year);
            return Err(ValidationError::YearOutOfRange(year));
        }
        let year =
            u8::try_from(year - century).map_err(|_| ValidationError::YearOutOfRange(year))?;

        let time = Time::new(
            narrow(datetime.hour())?,
            narrow(datetime.minute())?,
            narrow(datetime.second())?,
        )?;
        let date = Date::new(narrow(datetime.day())?, narrow(datetime.month())?, year)?;
        let weekday = narrow(datetime.weekday().number_from_monday())?;

        Ok(Self {
            time,
            date,
            weekday,
        })
    }
}

/// Builds a chrono date/time from values read back from the chip.
pub(crate) fn into_datetime(date: &Date, time: &Time) -> Result<NaiveDateTime, ValidationError> {
    NaiveDate::from_ymd_opt(
        i32::from(date.full_year()),
        u32::from(date.month),
        u32::from(date.day),
    )
    .and_then(|d| {
        d.and_hms_opt(
            u32::from(time.hours),
            u32::from(time.minutes),
            u32::from(time.seconds),
        )
    })
    .ok_or(ValidationError::InvalidDateTime)
}

fn narrow(value: u32) -> Result<u8, ValidationError> {
    u8::try_from(value).map_err(|_| ValidationError::InvalidDateTime)
}
