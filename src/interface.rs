use clap::ValueEnum;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum InterfaceMode {
    #[default]
    Serial,
    Simulation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum ParityMode {
    None,
    #[default]
    Even,
    Odd,
}

impl ParityMode {
    pub const fn to_serial(self) -> serialport::Parity {
        match self {
            Self::None => serialport::Parity::None,
            Self::Even => serialport::Parity::Even,
            Self::Odd => serialport::Parity::Odd,
        }
    }
}
