use embedded_hal::{
    delay::DelayNs,
    digital::{InputPin, OutputPin},
    i2c::{I2c, SevenBitAddress},
};

use crate::{
    common::{
        touch_sample_from_buf, write_frame, BOOT_DELAY_MS, REG_CHIP_ID, REG_TOUCH_DATA,
        RESET_PULSE_MS, TOUCH_ACK, TOUCH_DATA_LEN,
    },
    DriverConfig, DriverError, RegisterAccess, State, TouchController, TouchSample,
    DEFAULT_ADDRESS,
};

/// A CST3240 device on a blocking bus.
///
/// The reset and interrupt lines are optional; without a reset line the
/// identity probe runs immediately, and the interrupt line is only carried
/// for diagnostics. The delay is used to wait out the reset pulse and the
/// chip's boot sequence, so `setup` blocks for roughly 52 ms when a reset
/// line is wired up.
pub struct Cst3240<I2C, D, RST, INT> {
    i2c: I2C,
    delay: D,
    address: u8,
    reset_pin: Option<RST>,
    interrupt_pin: Option<INT>,
    state: State,
    comm_warning: bool,
}

impl<I2C, D, RST, INT> Cst3240<I2C, D, RST, INT>
where
    I2C: I2c<SevenBitAddress>,
    D: DelayNs,
    RST: OutputPin,
    INT: InputPin,
{
    /// Create a driver on the default bus address.
    pub fn new(i2c: I2C, delay: D) -> Self {
        Self {
            i2c,
            delay,
            address: DEFAULT_ADDRESS,
            reset_pin: None,
            interrupt_pin: None,
            state: State::Uninitialized,
            comm_warning: false,
        }
    }

    /// Use a non-default bus address.
    pub fn with_address(mut self, address: u8) -> Self {
        self.address = address;
        self
    }

    /// Wire up the reset line. Setup will pulse it before probing.
    pub fn with_reset_pin(mut self, pin: RST) -> Self {
        self.reset_pin = Some(pin);
        self
    }

    /// Wire up the interrupt line.
    ///
    /// The blocking driver keeps it passive; it only shows up in the
    /// reported configuration.
    pub fn with_interrupt_pin(mut self, pin: INT) -> Self {
        self.interrupt_pin = Some(pin);
        self
    }

    /// Initialization state of the driver.
    pub fn state(&self) -> State {
        self.state
    }

    /// Whether the last poll cycle hit a bus error.
    ///
    /// Cleared again by the next successful touch-data read.
    pub fn has_comm_warning(&self) -> bool {
        self.comm_warning
    }

    /// Log the configured device identity via defmt.
    #[cfg(feature = "defmt")]
    pub fn log_config(&self) {
        defmt::info!("{}", self.config());
    }

    /// Safely clean up the device, returning any owned peripherals.
    pub fn destroy(self) -> (I2C, D, Option<RST>, Option<INT>) {
        (self.i2c, self.delay, self.reset_pin, self.interrupt_pin)
    }

    fn probe(&mut self) -> Result<(), DriverError<I2C::Error>> {
        self.state = State::Probing;
        if self.write_register(REG_CHIP_ID, &[]).is_err() {
            self.state = State::Failed;
            return Err(DriverError::NotResponding);
        }

        self.state = State::Ready;
        #[cfg(feature = "defmt")]
        defmt::info!("CST3240 ready at address {=u8:#x}", self.address);
        Ok(())
    }
}

impl<I2C, D, RST, INT> TouchController for Cst3240<I2C, D, RST, INT>
where
    I2C: I2c<SevenBitAddress>,
    D: DelayNs,
    RST: OutputPin,
    INT: InputPin,
{
    type Error = DriverError<I2C::Error>;

    fn setup(&mut self) -> Result<(), Self::Error> {
        match self.state {
            State::Ready => return Ok(()),
            State::Failed => return Err(DriverError::NotResponding),
            _ => {}
        }

        if let Some(pin) = self.reset_pin.as_mut() {
            pin.set_low().map_err(|_| DriverError::ResetPin)?;
            self.delay.delay_ms(RESET_PULSE_MS);
            pin.set_high().map_err(|_| DriverError::ResetPin)?;
            // The chip runs an internal boot sequence once reset is released.
            self.state = State::ResetPending;
            self.delay.delay_ms(BOOT_DELAY_MS);
        }

        self.probe()
    }

    fn update_touches(&mut self) -> Result<Option<TouchSample>, Self::Error> {
        if self.state != State::Ready {
            return Ok(None);
        }

        let mut buf = [0u8; TOUCH_DATA_LEN];
        if let Err(e) = self.read_register(REG_TOUCH_DATA, &mut buf) {
            // Transient: leave the state alone, the next cycle retries.
            self.comm_warning = true;
            #[cfg(feature = "defmt")]
            defmt::warn!("CST3240 touch-data read failed");
            return Err(e);
        }
        self.comm_warning = false;

        let Some(sample) = touch_sample_from_buf(&buf) else {
            return Ok(None);
        };

        // Acknowledge the event. Best-effort: a failed acknowledgement does
        // not fail the cycle.
        let _ = self.write_register(REG_TOUCH_DATA, &[TOUCH_ACK]);

        Ok(Some(sample))
    }

    fn is_ready(&self) -> bool {
        self.state == State::Ready
    }

    fn config(&self) -> DriverConfig {
        DriverConfig {
            address: self.address,
            has_reset_pin: self.reset_pin.is_some(),
            has_interrupt_pin: self.interrupt_pin.is_some(),
        }
    }
}

impl<I2C, D, RST, INT> RegisterAccess for Cst3240<I2C, D, RST, INT>
where
    I2C: I2c<SevenBitAddress>,
    D: DelayNs,
    RST: OutputPin,
    INT: InputPin,
{
    type Error = DriverError<I2C::Error>;

    fn read_register(&mut self, register: u16, buf: &mut [u8]) -> Result<(), Self::Error> {
        self.i2c.write(self.address, &register.to_be_bytes())?;
        self.i2c.read(self.address, buf)?;
        Ok(())
    }

    fn write_register(&mut self, register: u16, payload: &[u8]) -> Result<(), Self::Error> {
        let (frame, len) = write_frame(register, payload).ok_or(DriverError::FrameTooLarge)?;
        self.i2c.write(self.address, &frame[..len])?;
        Ok(())
    }
}
