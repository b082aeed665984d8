use embedded_hal::digital::OutputPin;
use embedded_hal_async::{
    delay::DelayNs,
    digital::Wait,
    i2c::{I2c, SevenBitAddress},
};

use crate::{
    common::{
        touch_sample_from_buf, write_frame, BOOT_DELAY_MS, REG_CHIP_ID, REG_TOUCH_DATA,
        RESET_PULSE_MS, TOUCH_ACK, TOUCH_DATA_LEN,
    },
    DriverConfig, DriverError, State, TouchSample, DEFAULT_ADDRESS,
};

/// A CST3240 device on an async bus.
///
/// Mirrors [`Cst3240`](crate::sync::Cst3240). Setup yields to the executor
/// while the chip boots instead of blocking, and the interrupt line can be
/// awaited with [`Cst3240Async::wait_for_touch`] rather than polling on a
/// timer.
pub struct Cst3240Async<I2C, D, RST, INT> {
    i2c: I2C,
    delay: D,
    address: u8,
    reset_pin: Option<RST>,
    irq_pin: Option<INT>,
    state: State,
    comm_warning: bool,
}

impl<I2C, D, RST, INT> Cst3240Async<I2C, D, RST, INT>
where
    I2C: I2c<SevenBitAddress>,
    D: DelayNs,
    RST: OutputPin,
    INT: Wait,
{
    /// Create a driver on the default bus address.
    pub fn new(i2c: I2C, delay: D) -> Self {
        Self {
            i2c,
            delay,
            address: DEFAULT_ADDRESS,
            reset_pin: None,
            irq_pin: None,
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

    /// Set the IRQ pin.
    ///
    /// Use before calling [`Cst3240Async::wait_for_touch`].
    pub fn with_irq_pin(mut self, pin: INT) -> Self {
        self.irq_pin = Some(pin);
        self
    }

    /// Initialization state of the driver.
    pub fn state(&self) -> State {
        self.state
    }

    /// Whether the controller answered the identity probe and may be polled.
    pub fn is_ready(&self) -> bool {
        self.state == State::Ready
    }

    /// Whether the last poll cycle hit a bus error.
    ///
    /// Cleared again by the next successful touch-data read.
    pub fn has_comm_warning(&self) -> bool {
        self.comm_warning
    }

    /// Report the configured device identity.
    pub fn config(&self) -> DriverConfig {
        DriverConfig {
            address: self.address,
            has_reset_pin: self.reset_pin.is_some(),
            has_interrupt_pin: self.irq_pin.is_some(),
        }
    }

    /// Log the configured device identity via defmt.
    #[cfg(feature = "defmt")]
    pub fn log_config(&self) {
        defmt::info!("{}", self.config());
    }

    /// Bring the controller out of reset and probe it.
    ///
    /// With a reset line wired up, control returns to the executor for the
    /// reset pulse and the chip's boot sequence before the probe resumes.
    pub async fn setup(&mut self) -> Result<(), DriverError<I2C::Error>> {
        match self.state {
            State::Ready => return Ok(()),
            State::Failed => return Err(DriverError::NotResponding),
            _ => {}
        }

        if let Some(pin) = self.reset_pin.as_mut() {
            pin.set_low().map_err(|_| DriverError::ResetPin)?;
            self.delay.delay_ms(RESET_PULSE_MS).await;
            pin.set_high().map_err(|_| DriverError::ResetPin)?;
            // The chip runs an internal boot sequence once reset is released.
            self.state = State::ResetPending;
            self.delay.delay_ms(BOOT_DELAY_MS).await;
        }

        self.probe().await
    }

    /// Poll the controller for new touch data.
    ///
    /// A no-op before setup completes. `Ok(None)` means no new touch data
    /// this cycle.
    pub async fn update_touches(
        &mut self,
    ) -> Result<Option<TouchSample>, DriverError<I2C::Error>> {
        if self.state != State::Ready {
            return Ok(None);
        }

        let mut buf = [0u8; TOUCH_DATA_LEN];
        if let Err(e) = self.read_register(REG_TOUCH_DATA, &mut buf).await {
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
        let _ = self.write_register(REG_TOUCH_DATA, &[TOUCH_ACK]).await;

        Ok(Some(sample))
    }

    /// Wait for the interrupt line to signal an event, then poll.
    ///
    /// If the IRQ pin isn't set, this will return
    /// [`DriverError::IrqPinNotSet`]. Set it with
    /// [`Cst3240Async::with_irq_pin`].
    pub async fn wait_for_touch(
        &mut self,
    ) -> Result<Option<TouchSample>, DriverError<I2C::Error>> {
        let Some(ref mut irq_pin) = self.irq_pin else {
            return Err(DriverError::IrqPinNotSet);
        };

        irq_pin
            .wait_for_falling_edge()
            .await
            .map_err(|_| DriverError::IrqError)?;
        self.update_touches().await
    }

    /// Read `buf.len()` bytes starting at `register`.
    pub async fn read_register(
        &mut self,
        register: u16,
        buf: &mut [u8],
    ) -> Result<(), DriverError<I2C::Error>> {
        self.i2c.write(self.address, &register.to_be_bytes()).await?;
        self.i2c.read(self.address, buf).await?;
        Ok(())
    }

    /// Write `payload` to `register`. An empty payload addresses the
    /// register without transferring data.
    pub async fn write_register(
        &mut self,
        register: u16,
        payload: &[u8],
    ) -> Result<(), DriverError<I2C::Error>> {
        let (frame, len) = write_frame(register, payload).ok_or(DriverError::FrameTooLarge)?;
        self.i2c.write(self.address, &frame[..len]).await?;
        Ok(())
    }

    /// Safely clean up the device, returning any owned peripherals.
    pub fn destroy(self) -> (I2C, D, Option<RST>, Option<INT>) {
        (self.i2c, self.delay, self.reset_pin, self.irq_pin)
    }

    async fn probe(&mut self) -> Result<(), DriverError<I2C::Error>> {
        self.state = State::Probing;
        if self.write_register(REG_CHIP_ID, &[]).await.is_err() {
            self.state = State::Failed;
            return Err(DriverError::NotResponding);
        }

        self.state = State::Ready;
        #[cfg(feature = "defmt")]
        defmt::info!("CST3240 ready at address {=u8:#x}", self.address);
        Ok(())
    }
}
