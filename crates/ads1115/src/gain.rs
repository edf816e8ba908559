//! Gain, Data Rate and Input Channel Definitions
//!
//! Register encodings and conversion tables for the ADS1115 programmable
//! gain amplifier, data-rate field and input multiplexer.

use serde::{Deserialize, Serialize};

/// Programmable gain setting (full-scale input range)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Gain {
    /// ±6.144 V full scale (2/3x)
    TwoThirds = 0,
    /// ±4.096 V full scale (1x)
    #[default]
    One = 1,
    /// ±2.048 V full scale (2x)
    Two = 2,
    /// ±1.024 V full scale (4x)
    Four = 3,
    /// ±0.512 V full scale (8x)
    Eight = 4,
    /// ±0.256 V full scale (16x)
    Sixteen = 5,
}

impl Gain {
    /// Protocol index of this gain (0..5)
    pub fn index(&self) -> u8 {
        *self as u8
    }

    /// Gain for a protocol index
    pub fn from_index(idx: u8) -> Option<Gain> {
        match idx {
            0 => Some(Gain::TwoThirds),
            1 => Some(Gain::One),
            2 => Some(Gain::Two),
            3 => Some(Gain::Four),
            4 => Some(Gain::Eight),
            5 => Some(Gain::Sixteen),
            _ => None,
        }
    }

    /// PGA field of the config word
    pub fn pga_bits(&self) -> u16 {
        (*self as u16) << 9
    }

    /// Full-scale input range in volts
    pub fn full_scale_v(&self) -> f32 {
        match self {
            Gain::TwoThirds => 6.144,
            Gain::One => 4.096,
            Gain::Two => 2.048,
            Gain::Four => 1.024,
            Gain::Eight => 0.512,
            Gain::Sixteen => 0.256,
        }
    }

    /// Millivolts per LSB at this gain
    pub fn lsb_mv(&self) -> f32 {
        self.full_scale_v() / 32768.0 * 1000.0
    }

    /// Convert a raw conversion result to millivolts
    pub fn to_millivolts(&self, raw: i16) -> f32 {
        raw as f32 * self.lsb_mv()
    }

    /// Range label used in logs
    pub fn range_label(&self) -> &'static str {
        match self {
            Gain::TwoThirds => "±6.144V",
            Gain::One => "±4.096V",
            Gain::Two => "±2.048V",
            Gain::Four => "±1.024V",
            Gain::Eight => "±0.512V",
            Gain::Sixteen => "±0.256V",
        }
    }

    /// Parse a gain argument.
    ///
    /// An all-digit value selects by protocol index (so `"4"` is index 4,
    /// the 8x gain); anything else is matched against the multiplier and
    /// full-scale aliases.
    pub fn parse(value: &str) -> Option<Gain> {
        let v = value.trim();
        if !v.is_empty() && v.bytes().all(|b| b.is_ascii_digit()) {
            return v.parse::<u8>().ok().and_then(Gain::from_index);
        }
        match v {
            "2/3" | "0.666" | "0.667" => Some(Gain::TwoThirds),
            "1" | "1x" | "4.096" => Some(Gain::One),
            "2" | "2x" | "2.048" => Some(Gain::Two),
            "4" | "4x" | "1.024" => Some(Gain::Four),
            "8" | "8x" | "0.512" => Some(Gain::Eight),
            "16" | "16x" | "0.256" => Some(Gain::Sixteen),
            _ => None,
        }
    }
}

/// Conversion data rate in samples per second
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum DataRate {
    Sps8 = 0,
    Sps16 = 1,
    Sps32 = 2,
    Sps64 = 3,
    Sps128 = 4,
    Sps250 = 5,
    Sps475 = 6,
    #[default]
    Sps860 = 7,
}

impl DataRate {
    /// DR field of the config word
    pub fn dr_bits(&self) -> u16 {
        (*self as u16) << 5
    }

    /// Nominal samples per second
    pub fn sps(&self) -> u32 {
        match self {
            DataRate::Sps8 => 8,
            DataRate::Sps16 => 16,
            DataRate::Sps32 => 32,
            DataRate::Sps64 => 64,
            DataRate::Sps128 => 128,
            DataRate::Sps250 => 250,
            DataRate::Sps475 => 475,
            DataRate::Sps860 => 860,
        }
    }
}

/// Single-ended input channel (AINx measured against GND)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Channel {
    A0 = 0,
    A1 = 1,
    A2 = 2,
    A3 = 3,
}

impl Channel {
    /// MUX field of the config word (single-ended AINx vs GND)
    pub fn mux_bits(&self) -> u16 {
        (0x04 + *self as u16) << 12
    }

    /// Channel number (0..3)
    pub fn number(&self) -> u8 {
        *self as u8
    }
}
