//! Simulated ADS1115 Device
//!
//! Register-level model of the converter behind [`I2cBus`], so the full
//! acquisition stack runs without hardware. A [`SimHandle`] lets tests set
//! channel voltages, inject bus faults and adjust conversion latency.

use crate::bus::I2cBus;
use crate::error::AdsError;
use crate::gain::Gain;
use crate::reg;
use parking_lot::Mutex;
use std::sync::Arc;

struct SimState {
    config: u16,
    conversion: i16,
    inputs_mv: [f32; 4],
    /// OS-bit polls left before the running conversion reads as complete
    polls_remaining: u32,
    /// Conversion latency, in OS-bit polls
    conversion_polls: u32,
    /// Remaining transactions that fail before the device behaves again
    fail_budget: u32,
    transactions: u64,
    resets: u64,
}

impl SimState {
    fn begin_transaction(&mut self) -> Result<(), AdsError> {
        self.transactions += 1;
        if self.fail_budget > 0 {
            self.fail_budget -= 1;
            return Err(AdsError::Bus("injected bus fault".into()));
        }
        Ok(())
    }

    fn start_conversion(&mut self, word: u16) {
        let mux = (word >> 12) & 0x07;
        let channel = mux.saturating_sub(4).min(3) as usize;
        let gain = Gain::from_index(((word >> 9) & 0x07).min(5) as u8).unwrap_or_default();
        let raw = (self.inputs_mv[channel] / gain.lsb_mv()).round();
        self.conversion = raw.clamp(i16::MIN as f32, i16::MAX as f32) as i16;
        self.polls_remaining = self.conversion_polls;
    }
}

/// Simulated converter implementing the bus interface.
pub struct SimBus {
    state: Arc<Mutex<SimState>>,
}

impl SimBus {
    pub fn new() -> Self {
        Self::with_inputs_mv([0.0; 4])
    }

    /// Simulated device with fixed input voltages on AIN0..AIN3.
    pub fn with_inputs_mv(inputs_mv: [f32; 4]) -> Self {
        Self {
            state: Arc::new(Mutex::new(SimState {
                config: 0x8583, // power-on reset value
                conversion: 0,
                inputs_mv,
                polls_remaining: 0,
                conversion_polls: 1,
                fail_budget: 0,
                transactions: 0,
                resets: 0,
            })),
        }
    }

    /// Control handle usable while the bus itself is owned by a driver.
    pub fn handle(&self) -> SimHandle {
        SimHandle {
            state: Arc::clone(&self.state),
        }
    }
}

impl Default for SimBus {
    fn default() -> Self {
        Self::new()
    }
}

impl I2cBus for SimBus {
    fn write(&mut self, _addr: u8, bytes: &[u8]) -> Result<(), AdsError> {
        let mut st = self.state.lock();
        st.begin_transaction()?;
        if let [reg::CONFIG, hi, lo] = *bytes {
            let word = u16::from_be_bytes([hi, lo]);
            st.config = word & !reg::OS;
            if word & reg::OS != 0 {
                st.start_conversion(word);
            }
        }
        Ok(())
    }

    fn write_read(&mut self, _addr: u8, bytes: &[u8], buffer: &mut [u8]) -> Result<(), AdsError> {
        let mut st = self.state.lock();
        st.begin_transaction()?;
        let word = match bytes.first() {
            Some(&reg::CONFIG) => {
                if st.polls_remaining > 0 {
                    st.polls_remaining -= 1;
                    st.config
                } else {
                    st.config | reg::OS
                }
            }
            Some(&reg::CONVERSION) => st.conversion as u16,
            other => {
                return Err(AdsError::Bus(format!("unknown register {other:?}")));
            }
        };
        let out = word.to_be_bytes();
        let n = buffer.len().min(out.len());
        buffer[..n].copy_from_slice(&out[..n]);
        Ok(())
    }

    fn reset(&mut self) -> Result<(), AdsError> {
        self.state.lock().resets += 1;
        Ok(())
    }
}

/// Cloneable control surface for a [`SimBus`].
#[derive(Clone)]
pub struct SimHandle {
    state: Arc<Mutex<SimState>>,
}

impl SimHandle {
    /// Set the voltage present on one input channel.
    pub fn set_input_mv(&self, channel: crate::Channel, mv: f32) {
        self.state.lock().inputs_mv[channel.number() as usize] = mv;
    }

    /// Fail the next `n` bus transactions.
    pub fn fail_next(&self, n: u32) {
        self.state.lock().fail_budget = n;
    }

    /// Set how many OS-bit polls a conversion takes to complete.
    pub fn set_conversion_polls(&self, polls: u32) {
        self.state.lock().conversion_polls = polls;
    }

    /// Total bus transactions attempted (including failed ones).
    pub fn transactions(&self) -> u64 {
        self.state.lock().transactions
    }

    /// Number of bus resets performed.
    pub fn resets(&self) -> u64 {
        self.state.lock().resets
    }
}
