//! AS5600 12-bit magnetic rotary encoder.
//!
//! Register decoding is plain arithmetic and always compiled; the I2C-backed
//! `As5600Encoder` needs the `hardware` feature.

pub const I2C_ADDR: u16 = 0x36;
pub const RAW_ANGLE_MSB: u8 = 0x0C;
pub const RAW_ANGLE_LSB: u8 = 0x0D;
pub const STATUS: u8 = 0x0B;
pub const MAGNITUDE_MSB: u8 = 0x1B;
pub const MAGNITUDE_LSB: u8 = 0x1C;

/// Counts per revolution.
pub const COUNTS_PER_REV: u32 = 4096;

/// Convert a raw angle count `[0, 4096)` to whole degrees `[0, 360)`.
#[inline]
pub fn raw_to_degrees(raw: u16) -> u16 {
    let raw = u32::from(raw) % COUNTS_PER_REV;
    (raw * 360 / COUNTS_PER_REV) as u16
}

/// Combine the two angle registers; only the low 12 bits are meaningful.
#[inline]
pub fn combine_raw(msb: u8, lsb: u8) -> u16 {
    ((u16::from(msb) << 8) | u16::from(lsb)) & 0x0FFF
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MagnetStatus {
    pub too_strong: bool,
    pub too_weak: bool,
    pub detected: bool,
}

impl MagnetStatus {
    pub fn from_register(status: u8) -> Self {
        Self {
            too_strong: status & 0x08 != 0,
            too_weak: status & 0x10 != 0,
            detected: status & 0x20 != 0,
        }
    }
}

#[cfg(feature = "hardware")]
pub use hw::As5600Encoder;

#[cfg(feature = "hardware")]
mod hw {
    use super::*;
    use crate::error::{HwError, Result};
    use desk_traits::{BoxError, Encoder};
    use rppal::i2c::I2c;

    pub struct As5600Encoder {
        i2c: I2c,
    }

    impl As5600Encoder {
        pub fn new(bus: u8) -> Result<Self> {
            let mut i2c = I2c::with_bus(bus).map_err(|e| HwError::I2c(e.to_string()))?;
            i2c.set_slave_address(I2C_ADDR)
                .map_err(|e| HwError::I2c(e.to_string()))?;
            Ok(Self { i2c })
        }

        fn read_register(&self, reg: u8) -> Result<u8> {
            let mut buf = [0u8; 1];
            self.i2c
                .write_read(&[reg], &mut buf)
                .map_err(|e| HwError::I2c(e.to_string()))?;
            Ok(buf[0])
        }

        pub fn read_raw(&self) -> Result<u16> {
            let msb = self.read_register(RAW_ANGLE_MSB)?;
            let lsb = self.read_register(RAW_ANGLE_LSB)?;
            Ok(combine_raw(msb, lsb))
        }

        pub fn magnet_status(&self) -> Result<MagnetStatus> {
            Ok(MagnetStatus::from_register(self.read_register(STATUS)?))
        }

        pub fn magnitude(&self) -> Result<u16> {
            let msb = self.read_register(MAGNITUDE_MSB)?;
            let lsb = self.read_register(MAGNITUDE_LSB)?;
            Ok(combine_raw(msb, lsb))
        }
    }

    impl Encoder for As5600Encoder {
        fn read_angle(&mut self) -> std::result::Result<u16, BoxError> {
            let raw = self.read_raw().map_err(|e| {
                tracing::debug!(error = %e, "as5600 read failed");
                Box::new(e) as BoxError
            })?;
            tracing::trace!(raw, "as5600 sample");
            Ok(raw_to_degrees(raw))
        }
    }
}
