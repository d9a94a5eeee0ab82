use crate::error::BusError;

pub const FN_READ_HOLDING: u8 = 0x03;
pub const FN_WRITE_COIL: u8 = 0x05;
pub const FN_WRITE_REGISTER: u8 = 0x06;

const COIL_ON: u16 = 0xFF00;
const COIL_OFF: u16 = 0x0000;

pub fn crc16_modbus(data: &[u8]) -> u16 {
    let mut crc: u16 = 0xFFFF;
    for byte in data {
        crc ^= u16::from(*byte);
        for _ in 0..8 {
            if crc & 1 == 1 {
                crc = (crc >> 1) ^ 0xA001;
            } else {
                crc >>= 1;
            }
        }
    }
    crc
}

pub fn append_crc(frame: &[u8]) -> Vec<u8> {
    let crc = crc16_modbus(frame);
    let mut out = Vec::with_capacity(frame.len() + 2);
    out.extend_from_slice(frame);
    out.push((crc & 0x00FF) as u8);
    out.push((crc >> 8) as u8);
    out
}

pub fn validate_crc(frame: &[u8]) -> Result<(), BusError> {
    if frame.len() < 4 {
        return Err(BusError::UnexpectedResponse("rtu frame too short".into()));
    }
    let body_len = frame.len() - 2;
    let expected = crc16_modbus(&frame[..body_len]);
    let got = u16::from(frame[body_len]) | (u16::from(frame[body_len + 1]) << 8);
    if expected != got {
        return Err(BusError::Crc { expected, got });
    }
    Ok(())
}

pub fn read_register_request(slave: u8, address: u16) -> Vec<u8> {
    request(slave, FN_READ_HOLDING, address, 1)
}

pub fn write_register_request(slave: u8, address: u16, value: u16) -> Vec<u8> {
    request(slave, FN_WRITE_REGISTER, address, value)
}

pub fn write_coil_request(slave: u8, address: u16, on: bool) -> Vec<u8> {
    request(slave, FN_WRITE_COIL, address, if on { COIL_ON } else { COIL_OFF })
}

fn request(slave: u8, function: u8, address: u16, payload: u16) -> Vec<u8> {
    let mut frame = Vec::with_capacity(8);
    frame.push(slave);
    frame.push(function);
    frame.extend_from_slice(&address.to_be_bytes());
    frame.extend_from_slice(&payload.to_be_bytes());
    append_crc(&frame)
}

/// Extract the single register value from a function 0x03 response.
pub fn parse_read_response(frame: &[u8], slave: u8) -> Result<u16, BusError> {
    validate_crc(frame)?;
    check_header(frame, slave, FN_READ_HOLDING)?;
    if frame.len() != 7 || frame[2] != 2 {
        return Err(BusError::UnexpectedResponse(format!(
            "unexpected read payload of {} bytes",
            frame[2]
        )));
    }
    Ok(u16::from_be_bytes([frame[3], frame[4]]))
}

/// Write responses echo the request; only the header and crc are checked.
pub fn parse_write_echo(frame: &[u8], slave: u8, function: u8) -> Result<(), BusError> {
    validate_crc(frame)?;
    check_header(frame, slave, function)
}

fn check_header(frame: &[u8], slave: u8, function: u8) -> Result<(), BusError> {
    if frame[0] != slave {
        return Err(BusError::UnexpectedResponse(format!(
            "expected slave 0x{slave:02X}, got 0x{:02X}",
            frame[0]
        )));
    }
    if frame[1] != function {
        return Err(BusError::UnexpectedResponse(format!(
            "expected function 0x{function:02X}, got 0x{:02X}",
            frame[1]
        )));
    }
    Ok(())
}
