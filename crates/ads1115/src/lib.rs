//! ADS1115 Analog-to-Digital Converter Driver
//!
//! Single-shot conversion driver for the TI ADS1115 16-bit ADC, speaking
//! through a pluggable synchronous I2C bus. Ships a register-level
//! simulated device so the rest of the system runs without hardware.

mod bus;
mod driver;
mod error;
mod gain;
mod sim;

pub use bus::I2cBus;
pub use driver::Ads1115;
pub use error::AdsError;
pub use gain::{Channel, DataRate, Gain};
pub use sim::{SimBus, SimHandle};

/// ADS1115 register map and config-word fields
pub mod reg {
    /// Conversion result register
    pub const CONVERSION: u8 = 0x00;
    /// Configuration register
    pub const CONFIG: u8 = 0x01;
    /// Default I2C address (ADDR pin tied to GND)
    pub const DEFAULT_ADDRESS: u8 = 0x48;
    /// Operational-status bit: set to start a conversion, reads back set
    /// once the conversion has completed
    pub const OS: u16 = 0x8000;
    /// Single-shot (power-down) mode bit
    pub const MODE_SINGLE: u16 = 0x0100;
    /// Comparator disabled
    pub const COMP_DISABLE: u16 = 0x0003;
}

/// Build the config-register word that starts a single-shot conversion.
pub fn config_word(channel: Channel, gain: Gain, rate: DataRate) -> u16 {
    reg::OS
        | channel.mux_bits()
        | gain.pga_bits()
        | reg::MODE_SINGLE
        | rate.dr_bits()
        | reg::COMP_DISABLE
}
