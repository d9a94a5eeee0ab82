// Omega CN7800 register map, per the vendor manual (M4704).

pub const REG_PROCESS_VALUE: u16 = 0x1000;
pub const REG_SETPOINT: u16 = 0x1001;
pub const REG_CONTROL_MODE: u16 = 0x1005;
pub const REG_PROPORTIONAL: u16 = 0x1009;
pub const REG_INTEGRAL: u16 = 0x100A;
pub const REG_DERIVATIVE: u16 = 0x100B;
pub const REG_PID_GROUP: u16 = 0x101C;
pub const REG_EXEC_PATTERN: u16 = 0x1030;
pub const REG_EXEC_STEP: u16 = 0x1031;

pub const STEP_COUNT_BASE: u16 = 0x1040;
pub const CYCLE_COUNT_BASE: u16 = 0x1050;
pub const LINK_BASE: u16 = 0x1060;
pub const TEMPERATURE_BASE: u16 = 0x2000;
pub const DURATION_BASE: u16 = 0x2080;

pub const BIT_AUTOTUNE: u16 = 0x0813;
pub const BIT_RUN: u16 = 0x0814;

pub const MODE_PID: u16 = 0;
pub const MODE_PROGRAM: u16 = 3;

/// Link register value marking the end of the program.
pub const LINK_END_OF_PROGRAM: u16 = 0x08;

pub const MAX_PATTERNS: u8 = 8;
pub const MAX_STEPS_PER_PATTERN: u8 = 8;
pub const MAX_TOTAL_STEPS: u16 = 64;

pub const fn step_count_register(pattern: u8) -> u16 {
    STEP_COUNT_BASE + pattern as u16
}

pub const fn cycle_count_register(pattern: u8) -> u16 {
    CYCLE_COUNT_BASE + pattern as u16
}

pub const fn link_register(pattern: u8) -> u16 {
    LINK_BASE + pattern as u16
}

pub const fn temperature_register(pattern: u8, step: u8) -> u16 {
    TEMPERATURE_BASE + pattern as u16 * 8 + step as u16
}

pub const fn duration_register(pattern: u8, step: u8) -> u16 {
    DURATION_BASE + pattern as u16 * 8 + step as u16
}
