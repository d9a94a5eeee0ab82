use std::thread;
use std::time::Duration;

use tracing::debug;

use crate::bus::RegisterBus;
use crate::error::{BusError, ControllerError, Result};

/// Bounded retry for register mutations. Interference on the RS-485 line
/// shows up as sporadic single-transaction failures, so each write gets a
/// few attempts with a short pause in between.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_millis(100),
        }
    }
}

impl RetryPolicy {
    /// Same attempt bound without the sleeps.
    pub fn without_backoff() -> Self {
        Self {
            backoff: Duration::ZERO,
            ..Self::default()
        }
    }
}

pub struct RegisterClient<B: RegisterBus> {
    bus: B,
    retry: RetryPolicy,
}

impl<B: RegisterBus> RegisterClient<B> {
    pub fn new(bus: B, retry: RetryPolicy) -> Self {
        Self { bus, retry }
    }

    #[cfg(test)]
    pub fn bus(&self) -> &B {
        &self.bus
    }

    #[cfg(test)]
    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    /// Single read, no retry.
    pub fn read(&mut self, address: u16) -> Result<u16> {
        Ok(self.bus.read_register(address)?)
    }

    /// Read a signed fixed-point register scaled down by `10^decimals`.
    #[allow(clippy::cast_possible_wrap)]
    pub fn read_fixed(&mut self, address: u16, decimals: u8) -> Result<f64> {
        let raw = self.read(address)?;
        let scale = 10u16.pow(u32::from(decimals));
        Ok(f64::from(raw as i16) / f64::from(scale))
    }

    pub fn write(&mut self, address: u16, value: u16) -> Result<()> {
        self.with_retry(address, |bus| bus.write_register(address, value))
    }

    pub fn write_bit(&mut self, address: u16, on: bool) -> Result<()> {
        self.with_retry(address, |bus| bus.write_bit(address, on))
    }

    fn with_retry(
        &mut self,
        address: u16,
        mut op: impl FnMut(&mut B) -> std::result::Result<(), BusError>,
    ) -> Result<()> {
        let mut last = BusError::UnexpectedResponse("no write attempted".into());
        for attempt in 1..=self.retry.max_attempts {
            match op(&mut self.bus) {
                Ok(()) => return Ok(()),
                Err(err) => {
                    debug!(attempt, "write to 0x{address:04X} failed: {err}");
                    last = err;
                    if attempt < self.retry.max_attempts {
                        thread::sleep(self.retry.backoff);
                    }
                }
            }
        }
        Err(ControllerError::WriteFailed {
            address,
            attempts: self.retry.max_attempts,
            source: last,
        })
    }
}
