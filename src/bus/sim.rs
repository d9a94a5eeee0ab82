use std::collections::HashMap;

use crate::bus::RegisterBus;
use crate::constants::{REG_PROCESS_VALUE, REG_SETPOINT};
use crate::error::BusError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WriteOp {
    Register(u16, u16),
    Bit(u16, bool),
}

/// In-memory register file standing in for a CN7800 on the bench. Records
/// every accepted write so tests can assert ordering, and can fail a given
/// register's next writes the way serial interference would.
#[derive(Debug, Default)]
pub(crate) struct SimBus {
    registers: HashMap<u16, u16>,
    bits: HashMap<u16, bool>,
    journal: Vec<WriteOp>,
    write_faults: HashMap<u16, u32>,
}

// journal and fault accessors are only reached from tests
#[cfg_attr(not(test), allow(dead_code))]
impl SimBus {
    pub(crate) fn new() -> Self {
        let mut bus = Self::default();
        // bench ambient, 21.3 C
        bus.registers.insert(REG_PROCESS_VALUE, 213);
        bus.registers.insert(REG_SETPOINT, 250);
        bus
    }

    pub(crate) fn register(&self, address: u16) -> u16 {
        self.registers.get(&address).copied().unwrap_or(0)
    }

    pub(crate) fn set_register(&mut self, address: u16, value: u16) {
        self.registers.insert(address, value);
    }

    pub(crate) fn bit(&self, address: u16) -> bool {
        self.bits.get(&address).copied().unwrap_or(false)
    }

    pub(crate) fn set_bit(&mut self, address: u16, on: bool) {
        self.bits.insert(address, on);
    }

    pub(crate) fn journal(&self) -> &[WriteOp] {
        &self.journal
    }

    pub(crate) fn fail_next_writes(&mut self, address: u16, count: u32) {
        self.write_faults.insert(address, count);
    }

    fn take_fault(&mut self, address: u16) -> bool {
        match self.write_faults.get_mut(&address) {
            Some(left) if *left > 0 => {
                *left -= 1;
                true
            }
            _ => false,
        }
    }
}

impl RegisterBus for SimBus {
    fn read_register(&mut self, address: u16) -> Result<u16, BusError> {
        Ok(self.register(address))
    }

    fn write_register(&mut self, address: u16, value: u16) -> Result<(), BusError> {
        if self.take_fault(address) {
            return Err(BusError::UnexpectedResponse("injected write fault".into()));
        }
        self.registers.insert(address, value);
        self.journal.push(WriteOp::Register(address, value));
        Ok(())
    }

    fn write_bit(&mut self, address: u16, on: bool) -> Result<(), BusError> {
        if self.take_fault(address) {
            return Err(BusError::UnexpectedResponse("injected write fault".into()));
        }
        self.bits.insert(address, on);
        self.journal.push(WriteOp::Bit(address, on));
        Ok(())
    }
}
