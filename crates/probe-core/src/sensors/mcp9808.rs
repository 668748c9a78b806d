//! MCP9808 digital temperature sensor

use embedded_hal::delay::DelayNs;
use embedded_io::Write;
use log::info;

use crate::address::DeviceAddress;
use crate::bus::BusTransport;
use crate::config::ProbeConfig;
use crate::engine::RegisterEngine;
use crate::error::Result;
use crate::fault::{Checked, ProbeResult};

/// Configuration register (16 bit)
pub const REG_CONFIG: u8 = 0x01;
/// Ambient temperature register (16 bit)
pub const REG_AMBIENT: u8 = 0x05;
/// Manufacturer ID register, reads `0x0054`
pub const REG_MANUFACTURER_ID: u8 = 0x06;

/// SHDN bit in the high byte of the configuration word
const CONFIG_SHUTDOWN: u8 = 0x01;

/// MCP9808 temperature sensor
pub struct Mcp9808 {
    address: DeviceAddress,
}

impl Mcp9808 {
    /// Driver for the temperature sensor at `address`.
    pub const fn new(address: DeviceAddress) -> Self {
        Self { address }
    }

    /// Enter (`true`) or leave (`false`) low-power shutdown.
    pub fn shutdown<B: BusTransport, W: Write>(
        &self,
        engine: &mut RegisterEngine<B, W>,
        shutdown: bool,
    ) -> Result<()> {
        let high = if shutdown { CONFIG_SHUTDOWN } else { 0x00 };
        engine.write_registers(self.address, REG_CONFIG, &[high, 0x00])
    }

    /// Ambient temperature in sixteenths of a degree Celsius.
    pub fn read_temperature<B: BusTransport, W: Write>(
        &self,
        engine: &mut RegisterEngine<B, W>,
    ) -> Result<i16> {
        let data = engine.read_registers(self.address, REG_AMBIENT, 2)?;
        Ok(ambient_to_sixteenths(data[0], data[1]))
    }
}

/// Convert the ambient register to a signed count of 1/16 °C.
///
/// The top three bits of the high byte are alarm flags; bit 4 is the sign of
/// a 13-bit two's-complement value.
pub fn ambient_to_sixteenths(high: u8, low: u8) -> i16 {
    let raw = u16::from_be_bytes([high & 0x1F, low]);
    ((raw << 3) as i16) >> 3
}

/// Wake the sensor, wait one conversion, read and print, then shut it down.
pub fn probe<B, W, D>(
    engine: &mut RegisterEngine<B, W>,
    delay: &mut D,
    config: &ProbeConfig,
) -> ProbeResult
where
    B: BusTransport,
    W: Write,
    D: DelayNs,
{
    let sensor = Mcp9808::new(DeviceAddress::TEMPERATURE_SENSOR);

    sensor.shutdown(engine, false).check()?;
    delay.delay_ms(config.conversion_delay_ms);
    let temperature = sensor.read_temperature(engine).check()?;
    sensor.shutdown(engine, true).check()?;

    info!("MCP9808: {} / 16 degrees C", temperature);

    let out = engine.printer();
    out.put_str("  Degrees C: 0x").check()?;
    out.put_hex_16(temperature as u16).check()?;
    out.put_str(" / 16.0\n").check()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positive_temperature() {
        // 25.0625 degrees C
        assert_eq!(ambient_to_sixteenths(0xC1, 0x91), 0x0191);
    }

    #[test]
    fn test_negative_temperature() {
        // Sign bit set: -1/16 degrees C, alarm flags ignored
        assert_eq!(ambient_to_sixteenths(0xFF, 0xFF), -1);
        assert_eq!(ambient_to_sixteenths(0x1F, 0xF0), -16);
    }
}
