//! Driver for the Hynitron CST3240 capacitive touch controller.
//!
//! The CST3240 sits on an I²C bus at address `0x5A` and exposes its touch
//! data through 16-bit big-endian register addresses. This crate handles the
//! bring-up sequence (reset pulse, boot delay, identity probe), register
//! framing, and decoding of the 7-byte touch-data window into 12-bit panel
//! coordinates. Scaling and rotation are left to the display stack consuming
//! the points.
//!
//! Two front-ends share the same decoding core:
//! - [`sync::Cst3240`] for blocking `embedded-hal` buses, and
//! - [`asynch::Cst3240Async`] for `embedded-hal-async` buses, where the
//!   reset and boot waits suspend instead of blocking and the interrupt line
//!   can be awaited.
//!
//! The controller reports up to five touch slots per event, but the current
//! firmware maps only a single coordinate pair into the 7-byte window, so
//! every reported slot carries the same position.

#![no_std]

use core::fmt;

pub mod asynch;
mod common;
pub mod sync;

/// Default 7-bit bus address of the CST3240.
pub const DEFAULT_ADDRESS: u8 = 0x5A;

/// Maximum number of touch slots the controller can report in one event.
pub const MAX_TOUCHES: usize = 5;

/// A single decoded touch point in raw panel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TouchPoint {
    /// Touch slot index as reported by the controller.
    pub slot: u8,
    /// The x position of the touch. Recorded at 12 bits.
    pub x: u16,
    /// The y position of the touch. Recorded at 12 bits.
    pub y: u16,
}

/// A decoded touch event.
///
/// Produced by one poll of the touch-data register. A sample either carries
/// every touch slot the controller reported or is not produced at all; a
/// malformed status byte never yields a partial sample.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TouchSample {
    /// Decoded touch points, one entry per reported slot.
    pub points: heapless::Vec<TouchPoint, MAX_TOUCHES>,
}

impl TouchSample {
    /// Number of touch slots reported in this sample.
    pub fn count(&self) -> usize {
        self.points.len()
    }

    /// The first decoded touch point, if any.
    pub fn first(&self) -> Option<TouchPoint> {
        self.points.first().copied()
    }
}

/// Initialization state of the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum State {
    /// Setup has not run yet.
    Uninitialized,
    /// The reset line has been released; the chip is running its boot
    /// sequence.
    ResetPending,
    /// The identity probe is in flight.
    Probing,
    /// The controller answered the identity probe and may be polled.
    Ready,
    /// The controller did not answer the identity probe. Terminal.
    Failed,
}

/// Configured identity of the device, reported for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DriverConfig {
    /// 7-bit bus address.
    pub address: u8,
    /// Whether a reset line is wired up.
    pub has_reset_pin: bool,
    /// Whether an interrupt line is wired up.
    pub has_interrupt_pin: bool,
}

impl fmt::Display for DriverConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CST3240 at {:#04x}, interrupt pin: {}, reset pin: {}",
            self.address,
            if self.has_interrupt_pin { "yes" } else { "no" },
            if self.has_reset_pin { "yes" } else { "no" },
        )
    }
}

/// A driver error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DriverError<I2cError> {
    /// A generic bus communication error.
    I2c(I2cError),
    /// A register write whose frame would overflow the fixed frame buffer.
    ///
    /// Rejected before any bus activity is attempted.
    FrameTooLarge,
    /// The reset line could not be driven.
    ResetPin,
    /// The controller did not answer the identity probe during setup.
    ///
    /// Once returned from setup the driver is permanently unusable and every
    /// later setup attempt fails the same way.
    NotResponding,
    /// `wait_for_touch` was called without an interrupt pin configured.
    IrqPinNotSet,
    /// The interrupt pin failed while waiting for an event.
    IrqError,
}

impl<I2cError> From<I2cError> for DriverError<I2cError> {
    fn from(value: I2cError) -> Self {
        Self::I2c(value)
    }
}

/// Device lifecycle driven by the host's tick loop.
///
/// Hosts call [`setup`](TouchController::setup) once, gate dependent
/// functionality on [`is_ready`](TouchController::is_ready), and invoke
/// [`update_touches`](TouchController::update_touches) periodically.
pub trait TouchController {
    /// Error surfaced by the driver.
    type Error;

    /// Bring the controller out of reset and probe it.
    fn setup(&mut self) -> Result<(), Self::Error>;

    /// Poll the controller for new touch data.
    ///
    /// A no-op before setup completes. `Ok(None)` means no new touch data
    /// this cycle.
    fn update_touches(&mut self) -> Result<Option<TouchSample>, Self::Error>;

    /// Whether the controller answered the identity probe and may be polled.
    fn is_ready(&self) -> bool;

    /// Report the configured device identity.
    fn config(&self) -> DriverConfig;
}

/// A bus-addressable register device with 16-bit register addresses.
pub trait RegisterAccess {
    /// Error surfaced by the register transactions.
    type Error;

    /// Read `buf.len()` bytes starting at `register`.
    fn read_register(&mut self, register: u16, buf: &mut [u8]) -> Result<(), Self::Error>;

    /// Write `payload` to `register`.
    ///
    /// An empty payload addresses the register without transferring data.
    fn write_register(&mut self, register: u16, payload: &[u8]) -> Result<(), Self::Error>;
}
