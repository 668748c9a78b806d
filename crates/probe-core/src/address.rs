//! 7-bit I2C device addresses

use crate::error::{Error, Result};

/// Highest address representable in 7 bits.
pub const MAX_ADDRESS: u8 = 0x7F;

/// 7-bit address of a peripheral on the shared bus.
///
/// The read/write bit is never part of the value; transports add it when
/// framing the transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceAddress(u8);

impl DeviceAddress {
    /// MCP9808 temperature sensor
    pub const TEMPERATURE_SENSOR: Self = Self(0x1B);
    /// PCA9535A IO extender
    pub const IO_EXTENDER: Self = Self(0x27);
    /// MAX44009 ambient light sensor
    pub const LIGHT_SENSOR: Self = Self(0x4A);
    /// LPS25H pressure sensor
    pub const PRESSURE_SENSOR: Self = Self(0x5C);
    /// MPU-6050 motion tracker
    pub const MOTION_TRACKER: Self = Self(0x68);
    /// LIS3DH accelerometer
    pub const ACCELEROMETER: Self = Self(0x18);

    /// Create an address, rejecting values wider than 7 bits.
    pub const fn new(raw: u8) -> Result<Self> {
        if raw > MAX_ADDRESS {
            Err(Error::InvalidAddress(raw))
        } else {
            Ok(Self(raw))
        }
    }

    /// The raw 7-bit value
    #[inline]
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for DeviceAddress {
    type Error = Error;

    fn try_from(raw: u8) -> Result<Self> {
        Self::new(raw)
    }
}

impl From<DeviceAddress> for u8 {
    fn from(address: DeviceAddress) -> Self {
        address.0
    }
}
