//! ADS1115 Error Types

use thiserror::Error;

/// Errors that can occur while talking to the converter
#[derive(Debug, Error)]
pub enum AdsError {
    /// I2C transaction failed
    #[error("I2C bus error: {0}")]
    Bus(String),

    /// Conversion did not complete within the poll window
    #[error("Conversion not ready after {0}ms")]
    ConversionTimeout(u64),

    /// Device probe failed or has not run yet
    #[error("ADS1115 not initialized")]
    NotReady,
}

impl From<std::io::Error> for AdsError {
    fn from(err: std::io::Error) -> Self {
        AdsError::Bus(err.to_string())
    }
}
