use std::io::{Read, Write};
use std::time::{Duration, Instant};

use serialport::SerialPort;

use crate::bus::{BusConfig, RegisterBus};
use crate::error::BusError;
use crate::rtu::{
    FN_READ_HOLDING, FN_WRITE_COIL, FN_WRITE_REGISTER, parse_read_response, parse_write_echo,
    read_register_request, validate_crc, write_coil_request, write_register_request,
};

pub(crate) struct SerialBus {
    port: Box<dyn SerialPort>,
    slave: u8,
    timeout: Duration,
}

impl SerialBus {
    pub(crate) fn open(path: &str, config: &BusConfig) -> Result<Self, BusError> {
        let port = serialport::new(path, config.baud)
            .parity(config.parity.to_serial())
            .timeout(config.timeout)
            .open()?;
        Ok(Self {
            port,
            slave: config.address,
            timeout: config.timeout,
        })
    }

    fn transact(&mut self, request: &[u8], function: u8) -> Result<Vec<u8>, BusError> {
        self.port.clear(serialport::ClearBuffer::Input)?;
        self.port.write_all(request).map_err(BusError::Io)?;
        self.port.flush().map_err(BusError::Io)?;

        let mut frame = self.read_exact(2)?;
        if frame[1] == (function | 0x80) {
            let tail = self.read_exact(3)?;
            frame.extend_from_slice(&tail);
            validate_crc(&frame)?;
            return Err(BusError::Exception {
                function,
                code: frame[2],
            });
        }

        let remaining = if function == FN_READ_HOLDING {
            let count = self.read_exact(1)?;
            frame.push(count[0]);
            usize::from(count[0]) + 2
        } else {
            // write echoes are fixed eight-byte frames
            6
        };
        let tail = self.read_exact(remaining)?;
        frame.extend_from_slice(&tail);
        Ok(frame)
    }

    fn read_exact(&mut self, wanted: usize) -> Result<Vec<u8>, BusError> {
        let mut buf = vec![0u8; wanted];
        let mut filled = 0;
        let deadline = Instant::now() + self.timeout;
        while filled < wanted {
            match self.port.read(&mut buf[filled..]) {
                Ok(0) => {}
                Ok(read) => filled += read,
                Err(err) if err.kind() == std::io::ErrorKind::TimedOut => {}
                Err(err) => return Err(BusError::Io(err)),
            }
            if filled < wanted && Instant::now() >= deadline {
                return Err(BusError::Timeout(self.timeout));
            }
        }
        Ok(buf)
    }
}

impl RegisterBus for SerialBus {
    fn read_register(&mut self, address: u16) -> Result<u16, BusError> {
        let request = read_register_request(self.slave, address);
        let response = self.transact(&request, FN_READ_HOLDING)?;
        parse_read_response(&response, self.slave)
    }

    fn write_register(&mut self, address: u16, value: u16) -> Result<(), BusError> {
        let request = write_register_request(self.slave, address, value);
        let response = self.transact(&request, FN_WRITE_REGISTER)?;
        parse_write_echo(&response, self.slave, FN_WRITE_REGISTER)
    }

    fn write_bit(&mut self, address: u16, on: bool) -> Result<(), BusError> {
        let request = write_coil_request(self.slave, address, on);
        let response = self.transact(&request, FN_WRITE_COIL)?;
        parse_write_echo(&response, self.slave, FN_WRITE_COIL)
    }
}
