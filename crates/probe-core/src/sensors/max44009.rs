//! MAX44009 ambient light sensor

use embedded_hal::delay::DelayNs;
use embedded_io::Write;
use log::info;

use crate::address::DeviceAddress;
use crate::bus::BusTransport;
use crate::config::ProbeConfig;
use crate::engine::RegisterEngine;
use crate::error::Result;
use crate::fault::{Checked, ProbeResult};

pub const REG_CONFIG: u8 = 0x02;
pub const REG_LUX_HIGH: u8 = 0x03;
pub const REG_LUX_LOW: u8 = 0x04;

/// Default mode: 800 ms automatic measurement cycle
const CONFIG_DEFAULT: u8 = 0x00;

/// Raw lux reading: `2^exponent * mantissa * 0.045`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LuxReading {
    pub exponent: u8,
    pub mantissa: u8,
}

impl LuxReading {
    /// Decode the lux high and low registers.
    pub const fn from_registers(high: u8, low: u8) -> Self {
        Self {
            exponent: high >> 4,
            mantissa: ((high & 0x0F) << 4) | (low & 0x0F),
        }
    }

    /// Illuminance in millilux.
    pub const fn millilux(self) -> u32 {
        ((self.mantissa as u32) << self.exponent) * 45
    }
}

/// MAX44009 ambient light sensor
pub struct Max44009 {
    address: DeviceAddress,
}

impl Max44009 {
    /// Driver for the light sensor at `address`.
    pub const fn new(address: DeviceAddress) -> Self {
        Self { address }
    }

    pub fn init<B: BusTransport, W: Write>(&self, engine: &mut RegisterEngine<B, W>) -> Result<()> {
        engine.write_register(self.address, REG_CONFIG, CONFIG_DEFAULT)
    }

    /// Read the lux registers.
    ///
    /// The part only guarantees a matching pair when both bytes come from one
    /// repeated-start transaction. The engine reads one register per
    /// transaction, so the pair may straddle a conversion update.
    pub fn lux<B: BusTransport, W: Write>(
        &self,
        engine: &mut RegisterEngine<B, W>,
    ) -> Result<LuxReading> {
        let high = engine.read_register(self.address, REG_LUX_HIGH)?;
        let low = engine.read_register(self.address, REG_LUX_LOW)?;
        Ok(LuxReading::from_registers(high, low))
    }
}

pub fn probe<B, W, D>(
    engine: &mut RegisterEngine<B, W>,
    _delay: &mut D,
    _config: &ProbeConfig,
) -> ProbeResult
where
    B: BusTransport,
    W: Write,
    D: DelayNs,
{
    let sensor = Max44009::new(DeviceAddress::LIGHT_SENSOR);
    sensor.init(engine).check()?;
    let reading = sensor.lux(engine).check()?;

    info!("MAX44009: {} mlx", reading.millilux());

    let out = engine.printer();
    out.put_str("  LUX: 2**0x").check()?;
    out.put_hex_byte(reading.exponent).check()?;
    out.put_str(" * 0x").check()?;
    out.put_hex_byte(reading.mantissa).check()?;
    out.put_str(" * 0.045\n").check()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{CaptureSink, NoDelay, SimBus, SimDevice};

    #[test]
    fn test_decode_lux() {
        let reading = LuxReading::from_registers(0x52, 0x07);
        assert_eq!(reading.exponent, 0x05);
        assert_eq!(reading.mantissa, 0x27);
        // 32 * 39 * 0.045 lx
        assert_eq!(reading.millilux(), 56_160);
    }

    #[test]
    fn test_probe_output() {
        let bus: SimBus = SimBus::new().with_device(
            SimDevice::new(DeviceAddress::LIGHT_SENSOR)
                .with_registers(REG_LUX_HIGH, &[0x52, 0xF7]),
        );
        let mut engine = RegisterEngine::new(bus, CaptureSink::<256>::new());

        probe(&mut engine, &mut NoDelay::new(), &ProbeConfig::new()).unwrap();

        assert_eq!(
            engine.printer().sink().as_str(),
            "  addr: 0x4A reg_addr: 0x03 data: 0x52\n\
             \x20 addr: 0x4A reg_addr: 0x04 data: 0xF7\n\
             \x20 LUX: 2**0x05 * 0x27 * 0.045\n"
        );
    }
}
