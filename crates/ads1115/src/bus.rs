//! I2C Bus Abstraction
//!
//! The driver talks to the converter through this trait so the physical
//! transport stays a collaborator: production wires in a kernel or bridge
//! bus, tests and the default build wire in [`crate::SimBus`].

use crate::error::AdsError;

/// Synchronous I2C master interface.
pub trait I2cBus: Send {
    /// Write `bytes` to the device at `addr`.
    fn write(&mut self, addr: u8, bytes: &[u8]) -> Result<(), AdsError>;

    /// Write `bytes` to the device at `addr`, then read `buffer.len()`
    /// bytes back in the same transaction.
    fn write_read(&mut self, addr: u8, bytes: &[u8], buffer: &mut [u8]) -> Result<(), AdsError>;

    /// Tear down and reinitialize the bus after a wedged transaction.
    fn reset(&mut self) -> Result<(), AdsError>;
}
