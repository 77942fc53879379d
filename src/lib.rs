//! A platform-agnostic driver for the DS1302 trickle-charge timekeeping chip.
//!
//! The DS1302 talks over three wires: a clock line (CLK), a bidirectional data
//! line (I/O) and a chip-enable line (CE). This crate bit-bangs that protocol
//! on `embedded-hal` 1.0 pins and gives access to the time and calendar
//! registers.
//!
//! # Features
//!
//! - Read and set seconds, minutes, hours (24-hour), day, month, weekday and year
//! - Compound time and date accessors with a fixed register write order
//! - Formatted `HH:MM:SS` and `DD.MM.YYYY` strings without allocation
//! - Conversion to and from chrono's `NaiveDateTime`
//! - Write-protect and clock-halt control
//! - Optional logging through `log` or `defmt`
//!
//! # Example
//!
//! ```rust,ignore
//! use ds1302::{Config, DS1302, OpenDrain};
//!
//! // CLK and CE are push-pull outputs, I/O is an open-drain pin with pull-up
//! let mut rtc = DS1302::new(clk, OpenDrain(io), ce);
//! rtc.configure(&Config::default())?;
//!
//! rtc.write_date(3, 11, 24)?;
//! rtc.write_time(14, 5, 9)?;
//!
//! let time = rtc.read_time()?; // "14:05:09"
//! let date = rtc.read_date()?; // "03.11.2024"
//! ```
//!
//! # Register access
//!
//! Every accessor runs its own transaction and nothing is cached. Compound
//! reads such as [`DS1302::time`] are several transactions in a row, so a
//! rollover between them (for example 12:59:59 to 13:00:00) can yield a mixed
//! result.
//!
//! # Error Handling
//!
//! The chip never acknowledges anything, so the protocol itself cannot fail.
//! Errors come from the pins ([`DS1302Error::Pin`]) or from values that do not
//! fit a register ([`DS1302Error::Validation`]), which are rejected before any
//! line is touched.
#![no_std]

use core::fmt::Write;

#[cfg(all(feature = "log", feature = "defmt"))]
compile_error!("features `log` and `defmt` cannot be enabled at the same time");

#[cfg(feature = "log")]
macro_rules! debug {
    ($($arg:tt)*) => { log::debug!($($arg)*) };
}

#[cfg(feature = "defmt")]
macro_rules! debug {
    ($($arg:tt)*) => { defmt::debug!($($arg)*) };
}

#[cfg(not(any(feature = "log", feature = "defmt")))]
macro_rules! debug {
    ($($arg:tt)*) => {};
}

#[cfg(feature = "log")]
macro_rules! trace {
    ($($arg:tt)*) => { log::trace!($($arg)*) };
}

#[cfg(feature = "defmt")]
macro_rules! trace {
    ($($arg:tt)*) => { defmt::trace!($($arg)*) };
}

#[cfg(not(any(feature = "log", feature = "defmt")))]
macro_rules! trace {
    ($($arg:tt)*) => {};
}

pub mod datetime;
pub mod registers;
#[cfg(test)]
mod testing;
pub mod wire;

use chrono::NaiveDateTime;
use embedded_hal::digital::OutputPin;
use paste::paste;

pub use datetime::{
    weekday_index, weekday_name, Date, Time, ValidationError, CENTURY, WEEKDAY_NAMES,
};
pub use registers::{Field, Hours, RegAddr, Seconds, WriteProtect};
pub use wire::{reverse_bits, DataPin, Direction, OpenDrain, ThreeWire};

use datetime::DS1302DateTime;

/// Formatted time, `HH:MM:SS`.
pub type TimeString = heapless::String<8>;

/// Formatted date, `DD.MM.YYYY`.
pub type DateString = heapless::String<10>;

/// State of the oscillator, controlled by the clock-halt flag.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Oscillator {
    /// Clock is counting
    Running,
    /// Clock is halted
    Halted,
}

/// Device configuration applied by [`DS1302::configure`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// Leave the write-protect flag set after configuring
    pub write_protect: bool,
    /// Oscillator state to leave the clock in
    pub oscillator: Oscillator,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            write_protect: false,
            oscillator: Oscillator::Running,
        }
    }
}

/// Errors returned by the DS1302 driver.
#[derive(Debug)]
pub enum DS1302Error<PinE> {
    /// A line reported an error
    Pin(PinE),
    /// A value did not fit its register
    Validation(ValidationError),
    /// A formatted value did not fit its output string
    ///
    /// Every byte the time and date registers can hold decodes to at most two
    /// digits per field (year at most 2165), so [`DS1302::read_time`] and
    /// [`DS1302::read_date`] never report this.
    Format,
}

impl<PinE> From<PinE> for DS1302Error<PinE> {
    fn from(e: PinE) -> Self {
        DS1302Error::Pin(e)
    }
}

/// DS1302 Real-Time Clock driver.
///
/// Owns the three lines; `&mut self` on every operation keeps transactions
/// from interleaving.
pub struct DS1302<CLK, IO, CE> {
    wire: ThreeWire<CLK, IO, CE>,
}

impl<CLK, IO, CE> DS1302<CLK, IO, CE>
where
    IO: DataPin,
    CLK: OutputPin<Error = IO::Error>,
    CE: OutputPin<Error = IO::Error>,
{
    /// Creates a new DS1302 driver instance.
    ///
    /// # Arguments
    /// * `clk` - Serial clock line
    /// * `io` - Data line, in output mode
    /// * `ce` - Chip-enable (RST) line
    pub fn new(clk: CLK, io: IO, ce: CE) -> Self {
        Self {
            wire: ThreeWire::new(clk, io, ce),
        }
    }

    /// Releases the lines.
    pub fn release(self) -> (CLK, IO, CE) {
        self.wire.release()
    }

    /// Configures the device according to the provided configuration.
    ///
    /// Write protection is lifted first so the clock-halt flag can be
    /// updated, then set again if `config.write_protect` asks for it.
    ///
    /// # Arguments
    /// * `config` - The configuration to apply
    pub fn configure(&mut self, config: &Config) -> Result<(), DS1302Error<IO::Error>> {
        debug!("DS1302: configuring {:?}", config);
        self.set_write_protect(false)?;
        self.set_running(config.oscillator == Oscillator::Running)?;
        if config.write_protect {
            self.set_write_protect(true)?;
        }
        Ok(())
    }

    /// Reads the raw byte of a register.
    pub fn read_register(&mut self, register: RegAddr) -> Result<u8, DS1302Error<IO::Error>> {
        Ok(self.wire.read(register.read_address())?)
    }

    /// Writes the raw byte of a register.
    pub fn write_register(
        &mut self,
        register: RegAddr,
        value: u8,
    ) -> Result<(), DS1302Error<IO::Error>> {
        Ok(self.wire.write(register.write_address(), value)?)
    }

    fn read_field(&mut self, field: Field) -> Result<u8, DS1302Error<IO::Error>> {
        let raw = self.read_register(field.register())?;
        Ok(field.decode(raw))
    }

    fn write_field(&mut self, field: Field, value: u8) -> Result<(), DS1302Error<IO::Error>> {
        let raw = field.encode(value).map_err(DS1302Error::Validation)?;
        self.write_register(field.register(), raw)
    }

    /// Whether the write-protect flag is set.
    pub fn is_write_protected(&mut self) -> Result<bool, DS1302Error<IO::Error>> {
        Ok(self.write_protect_register()?.protected())
    }

    /// Sets or clears the write-protect flag. While set the chip ignores all
    /// other register writes.
    pub fn set_write_protect(&mut self, protect: bool) -> Result<(), DS1302Error<IO::Error>> {
        let mut value = WriteProtect::default();
        value.set_protected(protect);
        self.set_write_protect_register(value)
    }

    /// Whether the oscillator is running (clock-halt flag clear).
    pub fn is_running(&mut self) -> Result<bool, DS1302Error<IO::Error>> {
        Ok(!self.seconds_register()?.clock_halt())
    }

    /// Starts or halts the oscillator, keeping the current seconds.
    pub fn set_running(&mut self, running: bool) -> Result<(), DS1302Error<IO::Error>> {
        let mut seconds = self.seconds_register()?;
        seconds.set_clock_halt(!running);
        self.set_seconds_register(seconds)
    }

    /// Year including the fixed century.
    pub fn full_year(&mut self) -> Result<u16, DS1302Error<IO::Error>> {
        Ok(CENTURY + u16::from(self.year()?))
    }

    /// Name of the stored weekday.
    pub fn weekday_name(&mut self) -> Result<&'static str, DS1302Error<IO::Error>> {
        let index = self.weekday()?;
        weekday_name(index).ok_or(DS1302Error::Validation(ValidationError::OutOfRange {
            field: Field::Weekday,
            value: index,
        }))
    }

    /// Sets the weekday by name, e.g. `"Friday"`.
    ///
    /// Names outside [`WEEKDAY_NAMES`] are rejected with
    /// [`ValidationError::UnknownWeekday`] before any line moves.
    pub fn set_weekday_name(&mut self, name: &str) -> Result<(), DS1302Error<IO::Error>> {
        let index = weekday_index(name)
            .ok_or(DS1302Error::Validation(ValidationError::UnknownWeekday))?;
        self.set_weekday(index)
    }

    /// Sets hours, minutes and seconds.
    ///
    /// All values are checked first. The registers are then written in the
    /// order hours, minutes, seconds as separate transactions.
    pub fn write_time(
        &mut self,
        hours: u8,
        minutes: u8,
        seconds: u8,
    ) -> Result<(), DS1302Error<IO::Error>> {
        let time = Time::new(hours, minutes, seconds).map_err(DS1302Error::Validation)?;
        self.set_time(&time)
    }

    /// Sets the time of day. See [`DS1302::write_time`].
    pub fn set_time(&mut self, time: &Time) -> Result<(), DS1302Error<IO::Error>> {
        debug!("DS1302: set time {:?}", time);
        self.set_hours(time.hours)?;
        self.set_minutes(time.minutes)?;
        self.set_seconds(time.seconds)
    }

    /// Sets day of month, month and two-digit year.
    ///
    /// All values are checked first. The registers are then written in the
    /// order day, month, year as separate transactions.
    pub fn write_date(
        &mut self,
        day: u8,
        month: u8,
        year: u8,
    ) -> Result<(), DS1302Error<IO::Error>> {
        let date = Date::new(day, month, year).map_err(DS1302Error::Validation)?;
        self.set_date(&date)
    }

    /// Sets the calendar date. See [`DS1302::write_date`].
    pub fn set_date(&mut self, date: &Date) -> Result<(), DS1302Error<IO::Error>> {
        debug!("DS1302: set date {:?}", date);
        self.set_day(date.day)?;
        self.set_month(date.month)?;
        self.set_year(date.year)
    }

    /// Reads hours, minutes and seconds, in that order.
    pub fn time(&mut self) -> Result<Time, DS1302Error<IO::Error>> {
        Ok(Time {
            hours: self.hours()?,
            minutes: self.minutes()?,
            seconds: self.seconds()?,
        })
    }

    /// Reads day, month and year, in that order.
    pub fn date(&mut self) -> Result<Date, DS1302Error<IO::Error>> {
        Ok(Date {
            day: self.day()?,
            month: self.month()?,
            year: self.year()?,
        })
    }

    /// Reads the time formatted as `HH:MM:SS`.
    pub fn read_time(&mut self) -> Result<TimeString, DS1302Error<IO::Error>> {
        let time = self.time()?;
        let mut text = TimeString::new();
        write!(text, "{}", time).map_err(|_| DS1302Error::Format)?;
        Ok(text)
    }

    /// Reads the date formatted as `DD.MM.YYYY`.
    pub fn read_date(&mut self) -> Result<DateString, DS1302Error<IO::Error>> {
        let date = self.date()?;
        let mut text = DateString::new();
        write!(text, "{}", date).map_err(|_| DS1302Error::Format)?;
        Ok(text)
    }

    /// Gets the current date and time from the device.
    ///
    /// # Returns
    /// * `Ok(NaiveDateTime)` - The current date and time
    /// * `Err(DS1302Error)` on error, including registers that do not form a
    ///   valid date
    pub fn datetime(&mut self) -> Result<NaiveDateTime, DS1302Error<IO::Error>> {
        let date = self.date()?;
        let time = self.time()?;
        datetime::into_datetime(&date, &time).map_err(DS1302Error::Validation)
    }

    /// Sets the current date and time on the device.
    ///
    /// Only years 2000 to 2099 can be stored. The weekday register is derived
    /// from the date (Monday = 1).
    pub fn set_datetime(
        &mut self,
        datetime: &NaiveDateTime,
    ) -> Result<(), DS1302Error<IO::Error>> {
        let raw = DS1302DateTime::from_datetime(datetime).map_err(DS1302Error::Validation)?;
        self.set_date(&raw.date)?;
        self.set_weekday(raw.weekday)?;
        self.set_time(&raw.time)
    }
}

// Field accessors: decoded reads and validated writes of one register each
macro_rules! impl_field_access {
    ($(($name:ident, $field:expr)),+) => {
        impl<CLK, IO, CE> DS1302<CLK, IO, CE>
        where
            IO: DataPin,
            CLK: OutputPin<Error = IO::Error>,
            CE: OutputPin<Error = IO::Error>,
        {
            $(
                paste! {
                    #[doc = concat!("Reads the ", stringify!($name), " field.")]
                    pub fn $name(&mut self) -> Result<u8, DS1302Error<IO::Error>> {
                        self.read_field($field)
                    }

                    #[doc = concat!("Writes the ", stringify!($name), " field.")]
                    #[doc = "\n\nFails with `DS1302Error::Validation` without touching the lines if `value` is out of range."]
                    pub fn [<set_ $name>](&mut self, value: u8) -> Result<(), DS1302Error<IO::Error>> {
                        self.write_field($field, value)
                    }
                }
            )+
        }
    }
}

impl_field_access!(
    (seconds, Field::Seconds),
    (minutes, Field::Minutes),
    (hours, Field::Hours),
    (day, Field::Day),
    (month, Field::Month),
    (weekday, Field::Weekday),
    (year, Field::Year)
);

// Typed raw access to the registers that carry flags
macro_rules! impl_register_access {
    ($(($name:ident, $regaddr:expr, $typ:ty)),+) => {
        impl<CLK, IO, CE> DS1302<CLK, IO, CE>
        where
            IO: DataPin,
            CLK: OutputPin<Error = IO::Error>,
            CE: OutputPin<Error = IO::Error>,
        {
            $(
                paste! {
                    #[doc = concat!("Gets the raw ", stringify!($name), ".")]
                    pub fn $name(&mut self) -> Result<$typ, DS1302Error<IO::Error>> {
                        Ok(<$typ>::from(self.read_register($regaddr)?))
                    }

                    #[doc = concat!("Sets the raw ", stringify!($name), ".")]
                    pub fn [<set_ $name>](&mut self, value: $typ) -> Result<(), DS1302Error<IO::Error>> {
                        self.write_register($regaddr, value.into())
                    }
                }
            )+
        }
    }
}

impl_register_access!(
    (seconds_register, RegAddr::Seconds, Seconds),
    (hours_register, RegAddr::Hours, Hours),
    (write_protect_register, RegAddr::WriteProtect, WriteProtect)
);
