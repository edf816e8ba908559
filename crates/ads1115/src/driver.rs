//! ADS1115 Driver
//!
//! Single-shot conversion cycles with bounded ready-polling, bus-reset
//! recovery and a zero-on-fault read path for the acquisition loop.

use crate::bus::I2cBus;
use crate::error::AdsError;
use crate::gain::{Channel, DataRate, Gain};
use crate::{config_word, reg};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::thread;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Interval between ready-bit polls
const POLL_INTERVAL_MS: u64 = 1;
/// Total wait allowed for one conversion to complete
const CONVERSION_TIMEOUT_MS: u64 = 20;
/// Bound on waiting for the bus guard, just past one full conversion, so
/// two callers racing for the bus fail loudly instead of queueing up
const BUS_WAIT: Duration = Duration::from_millis(25);

/// Driver for one ADS1115 on a shared bus.
///
/// The bus sits behind a mutex so the acquisition loop and the command
/// dispatcher's forced reads can share one driver instance; gain and the
/// ready flag are atomics readable without the bus lock.
pub struct Ads1115<B> {
    bus: Mutex<B>,
    address: u8,
    gain: AtomicU8,
    data_rate: DataRate,
    ready: AtomicBool,
    fault_logged: AtomicBool,
}

impl<B: I2cBus> Ads1115<B> {
    pub fn new(bus: B, address: u8, gain: Gain, data_rate: DataRate) -> Self {
        Self {
            bus: Mutex::new(bus),
            address,
            gain: AtomicU8::new(gain.index()),
            data_rate,
            ready: AtomicBool::new(false),
            fault_logged: AtomicBool::new(false),
        }
    }

    /// Check that the device answers on the bus.
    ///
    /// Sets the ready flag and logs the configured acquisition parameters;
    /// called once at startup.
    pub fn probe(&self) -> bool {
        let ok = {
            let mut bus = self.bus.lock();
            read_conversion(&mut *bus, self.address).is_ok()
        };
        self.ready.store(ok, Ordering::Release);
        if ok {
            let gain = self.gain();
            info!("ADS1115 initialized at 0x{:02X}", self.address);
            info!(
                "ADS1115 gain index {} (range {})",
                gain.index(),
                gain.range_label()
            );
            info!("ADS1115 data rate {} SPS", self.data_rate.sps());
        } else {
            error!("Failed to initialize ADS1115 at 0x{:02X}", self.address);
        }
        ok
    }

    /// True once the startup probe has succeeded.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Currently configured gain.
    pub fn gain(&self) -> Gain {
        Gain::from_index(self.gain.load(Ordering::Acquire)).unwrap_or_default()
    }

    /// Swap the gain, returning the previous setting.
    ///
    /// Callers pause sampling around the swap so no conversion straddles
    /// two gain settings.
    pub fn set_gain(&self, gain: Gain) -> Gain {
        let prev = self.gain.swap(gain.index(), Ordering::AcqRel);
        Gain::from_index(prev).unwrap_or_default()
    }

    /// Configured data rate.
    pub fn data_rate(&self) -> DataRate {
        self.data_rate
    }

    /// Run one full conversion cycle on `channel`.
    ///
    /// A failed attempt resets the bus and retries once before surfacing
    /// the error.
    pub fn read_channel(&self, channel: Channel) -> Result<i16, AdsError> {
        if !self.is_ready() {
            return Err(AdsError::NotReady);
        }
        match self.read_cycle(channel) {
            Ok(raw) => Ok(raw),
            Err(first) => {
                debug!("ADS1115 read on AIN{} failed ({first}), resetting bus", channel.number());
                if let Err(err) = self.bus.lock().reset() {
                    debug!("I2C bus reset failed: {err}");
                }
                self.read_cycle(channel)
            }
        }
    }

    /// Read one channel in millivolts, substituting 0.0 on any fault.
    ///
    /// The first failure of a streak is logged at warn, recovery at info;
    /// everything in between stays quiet.
    pub fn read_channel_mv(&self, channel: Channel) -> f32 {
        if !self.is_ready() {
            return 0.0;
        }
        match self.read_channel(channel) {
            Ok(raw) => {
                if self.fault_logged.swap(false, Ordering::Relaxed) {
                    info!("ADS1115 reads recovered");
                }
                self.gain().to_millivolts(raw)
            }
            Err(err) => {
                if !self.fault_logged.swap(true, Ordering::Relaxed) {
                    warn!("ADS1115 read failed, substituting 0 mV: {err}");
                }
                0.0
            }
        }
    }

    /// One conversion attempt: start, poll the ready bit, read the result.
    /// Holds the bus guard for the whole cycle, with a bounded acquire.
    fn read_cycle(&self, channel: Channel) -> Result<i16, AdsError> {
        let word = config_word(channel, self.gain(), self.data_rate);
        let mut bus = self
            .bus
            .try_lock_for(BUS_WAIT)
            .ok_or_else(|| AdsError::Bus("bus guard held past the wait bound".into()))?;
        start_conversion(&mut *bus, self.address, word)?;
        if !poll_ready(&mut *bus, self.address, CONVERSION_TIMEOUT_MS)? {
            return Err(AdsError::ConversionTimeout(CONVERSION_TIMEOUT_MS));
        }
        read_conversion(&mut *bus, self.address)
    }
}

fn start_conversion<B: I2cBus>(bus: &mut B, address: u8, word: u16) -> Result<(), AdsError> {
    let [hi, lo] = word.to_be_bytes();
    bus.write(address, &[reg::CONFIG, hi, lo])
}

/// Poll the OS bit until the conversion completes or `timeout_ms` elapses.
/// `Ok(false)` means the bound expired with the conversion still running.
fn poll_ready<B: I2cBus>(bus: &mut B, address: u8, timeout_ms: u64) -> Result<bool, AdsError> {
    let mut waited = 0;
    loop {
        let mut buf = [0u8; 2];
        bus.write_read(address, &[reg::CONFIG], &mut buf)?;
        if u16::from_be_bytes(buf) & reg::OS != 0 {
            return Ok(true);
        }
        if waited >= timeout_ms {
            return Ok(false);
        }
        thread::sleep(Duration::from_millis(POLL_INTERVAL_MS));
        waited += POLL_INTERVAL_MS;
    }
}

fn read_conversion<B: I2cBus>(bus: &mut B, address: u8) -> Result<i16, AdsError> {
    let mut buf = [0u8; 2];
    bus.write_read(address, &[reg::CONVERSION], &mut buf)?;
    Ok(i16::from_be_bytes(buf))
}
