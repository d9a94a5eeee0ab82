use std::time::Duration;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ControllerError>;

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("total number of steps must be between 1 and 64, got {0}")]
    StepsOutOfRange(u16),

    /// Retry bound exhausted; the device may hold a partial program and the
    /// caller must clear and reprogram rather than resume.
    #[error("write to register 0x{address:04X} failed after {attempts} attempts")]
    WriteFailed {
        address: u16,
        attempts: u32,
        #[source]
        source: BusError,
    },

    #[error("no existing program found, upload a ramp first")]
    NoProgramFound,

    #[error("pattern memory full: 64 steps reached")]
    MemoryFull,

    #[error(transparent)]
    Bus(#[from] BusError),
}

#[derive(Debug, Error)]
pub enum BusError {
    #[error("serial port: {0}")]
    Serial(#[from] serialport::Error),

    #[error("serial i/o: {0}")]
    Io(#[from] std::io::Error),

    #[error("no response within {0:?}")]
    Timeout(Duration),

    #[error("invalid frame crc: expected 0x{expected:04X}, got 0x{got:04X}")]
    Crc { expected: u16, got: u16 },

    #[error("device exception 0x{code:02X} in reply to function 0x{function:02X}")]
    Exception { function: u8, code: u8 },

    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),
}
