//! Three-wire serial transactions for the DS1302.
//!
//! The DS1302 has no real SPI port: a transaction is framed by the chip-enable
//! line, the command byte and the data byte are both shifted LSB-first on a
//! single bidirectional data line, and there is no acknowledgement. This module
//! bit-bangs that protocol over `embedded-hal` pins.
//!
//! Bytes are handled MSB-first inside the driver and turned around with
//! [`reverse_bits`] right before they go out and right after they come in.

use embedded_hal::digital::{InputPin, OutputPin, PinState};

/// Direction of the bidirectional data line.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// Host drives the line
    Output,
    /// Chip drives the line
    Input,
}

/// A pin that can be switched between driving and sampling.
///
/// `embedded-hal` has no trait for changing a pin's direction at runtime, so
/// the data line of the DS1302 needs this one. CLK and CE are plain
/// [`OutputPin`]s.
pub trait DataPin: InputPin + OutputPin {
    /// Switches the pin to `direction`.
    fn set_direction(&mut self, direction: Direction) -> Result<(), Self::Error>;
}

/// [`DataPin`] for an open-drain pin with a pull-up.
///
/// Switching to input releases the line by driving it high, after which the
/// chip is free to pull it low.
pub struct OpenDrain<P>(pub P);

impl<P: embedded_hal::digital::ErrorType> embedded_hal::digital::ErrorType for OpenDrain<P> {
    type Error = P::Error;
}

impl<P: OutputPin> OutputPin for OpenDrain<P> {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.0.set_low()
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.0.set_high()
    }
}

impl<P: InputPin> InputPin for OpenDrain<P> {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        self.0.is_high()
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.0.is_low()
    }
}

impl<P: InputPin + OutputPin> DataPin for OpenDrain<P> {
    fn set_direction(&mut self, direction: Direction) -> Result<(), Self::Error> {
        match direction {
            Direction::Input => self.0.set_high(),
            Direction::Output => Ok(()),
        }
    }
}

/// Mirrors the bit order of a byte: bit 0 becomes bit 7 and so on.
///
/// Applying it twice gives back the original byte.
pub const fn reverse_bits(byte: u8) -> u8 {
    let mut reversed = 0;
    let mut i = 0;
    while i < 8 {
        if byte & (1 << i) != 0 {
            reversed |= 1 << (7 - i);
        }
        i += 1;
    }
    reversed
}

/// Owner of the CLK, I/O and CE lines.
///
/// Every call runs one complete transaction. Nothing is cached between calls.
pub struct ThreeWire<CLK, IO, CE> {
    clk: CLK,
    io: IO,
    ce: CE,
}

impl<CLK, IO, CE> ThreeWire<CLK, IO, CE>
where
    IO: DataPin,
    CLK: OutputPin<Error = IO::Error>,
    CE: OutputPin<Error = IO::Error>,
{
    /// Takes ownership of the three lines. The data line must start in output
    /// mode.
    pub fn new(clk: CLK, io: IO, ce: CE) -> Self {
        Self { clk, io, ce }
    }

    /// Gives the lines back.
    pub fn release(self) -> (CLK, IO, CE) {
        (self.clk, self.io, self.ce)
    }

    /// Reads one register.
    ///
    /// `address` is the read command byte. The chip-enable line is released
    /// and the data line is back in output mode when this returns, whether or
    /// not a pin reported an error.
    pub fn read(&mut self, address: u8) -> Result<u8, IO::Error> {
        let sampled = self.read_frame(address);
        let ended = self.end();
        let restored = self.io.set_direction(Direction::Output);
        let value = reverse_bits(sampled?);
        ended?;
        restored?;
        trace!("read {} -> {}", address, value);
        Ok(value)
    }

    /// Writes one register.
    ///
    /// `address` is the write command byte.
    pub fn write(&mut self, address: u8, data: u8) -> Result<(), IO::Error> {
        trace!("write {} <- {}", address, data);
        let sent = self.write_frame(address, data);
        let ended = self.end();
        sent?;
        ended
    }

    fn read_frame(&mut self, address: u8) -> Result<u8, IO::Error> {
        self.begin()?;
        self.shift_out(reverse_bits(address))?;
        self.io.set_direction(Direction::Input)?;
        self.shift_in()
    }

    fn write_frame(&mut self, address: u8, data: u8) -> Result<(), IO::Error> {
        self.begin()?;
        self.shift_out(reverse_bits(address))?;
        self.shift_out(reverse_bits(data))
    }

    fn begin(&mut self) -> Result<(), IO::Error> {
        self.clk.set_low()?;
        self.ce.set_high()
    }

    /// Drops CE and CLK. Both lines are driven even if the first one fails.
    fn end(&mut self) -> Result<(), IO::Error> {
        let ce = self.ce.set_low();
        let clk = self.clk.set_low();
        ce.and(clk)
    }

    /// Sends an already reversed byte, its MSB first.
    fn shift_out(&mut self, bits: u8) -> Result<(), IO::Error> {
        for i in (0..8).rev() {
            let level = PinState::from(bits & (1 << i) != 0);
            self.io.set_state(level)?;
            self.clk.set_high()?;
            self.clk.set_low()?;
        }
        Ok(())
    }

    /// Collects 8 bits in arrival order, the first one ending up as the MSB.
    fn shift_in(&mut self) -> Result<u8, IO::Error> {
        let mut bits = 0u8;
        for _ in 0..8 {
            self.clk.set_low()?;
            let bit = self.io.is_high()?;
            self.clk.set_high()?;
            bits = (bits << 1) | u8::from(bit);
        }
        Ok(bits)
    }
}
