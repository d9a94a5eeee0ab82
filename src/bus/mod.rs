use std::time::Duration;

use color_eyre::eyre;

use crate::error::BusError;
use crate::interface::{InterfaceMode, ParityMode};

mod serial;

#[cfg(any(test, debug_assertions))]
mod sim;

#[cfg(any(test, debug_assertions))]
pub(crate) use sim::SimBus;
#[cfg(test)]
pub(crate) use sim::WriteOp;

/// One addressable register space behind a strictly serialized channel;
/// every call blocks until the device answers or the transaction times out.
pub trait RegisterBus {
    fn read_register(&mut self, address: u16) -> Result<u16, BusError>;
    fn write_register(&mut self, address: u16, value: u16) -> Result<(), BusError>;
    fn write_bit(&mut self, address: u16, on: bool) -> Result<(), BusError>;
}

impl RegisterBus for Box<dyn RegisterBus + Send> {
    fn read_register(&mut self, address: u16) -> Result<u16, BusError> {
        (**self).read_register(address)
    }

    fn write_register(&mut self, address: u16, value: u16) -> Result<(), BusError> {
        (**self).write_register(address, value)
    }

    fn write_bit(&mut self, address: u16, on: bool) -> Result<(), BusError> {
        (**self).write_bit(address, on)
    }
}

#[derive(Debug, Clone)]
pub(crate) struct BusConfig {
    pub port: Option<String>,
    pub baud: u32,
    pub address: u8,
    pub parity: ParityMode,
    pub timeout: Duration,
    pub interface: InterfaceMode,
}

pub(crate) fn build_bus(config: &BusConfig) -> eyre::Result<Box<dyn RegisterBus + Send>> {
    match config.interface {
        InterfaceMode::Serial => {
            let port = config
                .port
                .as_ref()
                .ok_or_else(|| eyre::eyre!("serial port required"))?;
            let bus = serial::SerialBus::open(port, config)?;
            Ok(Box::new(bus))
        }
        InterfaceMode::Simulation => {
            #[cfg(debug_assertions)]
            {
                Ok(Box::new(SimBus::new()))
            }
            #[cfg(not(debug_assertions))]
            {
                Err(eyre::eyre!("simulation is only available in debug builds"))
            }
        }
    }
}
