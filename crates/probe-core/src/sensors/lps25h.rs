//! LPS25H barometric pressure sensor

use embedded_hal::delay::DelayNs;
use embedded_io::Write;
use log::{info, warn};

use crate::address::DeviceAddress;
use crate::bus::BusTransport;
use crate::config::ProbeConfig;
use crate::engine::RegisterEngine;
use crate::error::Result;
use crate::fault::{Checked, ProbeResult};

pub const REG_WHO_AM_I: u8 = 0x0F;
pub const REG_CTRL_REG1: u8 = 0x20;
pub const REG_PRESS_OUT_XL: u8 = 0x28;
pub const REG_TEMP_OUT_L: u8 = 0x2B;

pub const WHO_AM_I: u8 = 0xBD;

/// Register address flag requesting auto-increment on multi-byte reads
const AUTO_INCREMENT: u8 = 0x80;
/// Power on, 1 Hz output data rate
const CTRL_REG1_ACTIVE_1HZ: u8 = 0x90;

/// LPS25H barometric pressure sensor
pub struct Lps25h {
    address: DeviceAddress,
}

impl Lps25h {
    /// Driver for the pressure sensor at `address`.
    pub const fn new(address: DeviceAddress) -> Self {
        Self { address }
    }

    /// Check the identity register and start continuous conversion.
    pub fn init<B: BusTransport, W: Write>(&self, engine: &mut RegisterEngine<B, W>) -> Result<()> {
        let id = engine.read_register(self.address, REG_WHO_AM_I)?;
        if id != WHO_AM_I {
            warn!("LPS25H: unexpected WHO_AM_I {:#04x}", id);
        }
        engine.write_register(self.address, REG_CTRL_REG1, CTRL_REG1_ACTIVE_1HZ)
    }

    /// Pressure in 1/4096 hPa, 24-bit two's complement.
    pub fn pressure<B: BusTransport, W: Write>(
        &self,
        engine: &mut RegisterEngine<B, W>,
    ) -> Result<i32> {
        let data = engine.read_registers(self.address, REG_PRESS_OUT_XL | AUTO_INCREMENT, 3)?;
        Ok(i32::from_le_bytes([0, data[0], data[1], data[2]]) >> 8)
    }

    /// Raw temperature: `42.5 + raw / 480` °C.
    pub fn temperature<B: BusTransport, W: Write>(
        &self,
        engine: &mut RegisterEngine<B, W>,
    ) -> Result<i16> {
        let data = engine.read_registers(self.address, REG_TEMP_OUT_L | AUTO_INCREMENT, 2)?;
        Ok(i16::from_le_bytes([data[0], data[1]]))
    }
}

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
    let sensor = Lps25h::new(DeviceAddress::PRESSURE_SENSOR);
    sensor.init(engine).check()?;
    delay.delay_ms(config.conversion_delay_ms);

    let pressure = sensor.pressure(engine).check()?;
    let temperature = sensor.temperature(engine).check()?;

    info!("LPS25H: {} / 4096 hPa, raw temperature {}", pressure, temperature);

    let [_, high, mid, low] = pressure.to_be_bytes();
    let out = engine.printer();
    out.put_str("  hPa: 0x").check()?;
    out.put_hex_byte(high).check()?;
    out.put_hex_byte(mid).check()?;
    out.put_hex_byte(low).check()?;
    out.put_str(" / 4096.0\n").check()?;

    out.put_str("  Degrees C: 42.5 + (0x").check()?;
    out.put_hex_16(temperature as u16).check()?;
    out.put_str(" / 480.0)\n").check()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{BusCall, CaptureSink, NoDelay, SimBus, SimDevice};
    use crate::bus::StopMode;

    fn sensor() -> SimDevice {
        SimDevice::new(DeviceAddress::PRESSURE_SENSOR)
            .with_register_mask(0x7F)
            .with_register(REG_WHO_AM_I, WHO_AM_I)
            .with_registers(REG_PRESS_OUT_XL, &[0x00, 0x80, 0x3F])
            .with_registers(REG_TEMP_OUT_L, &[0x60, 0xE0])
    }

    #[test]
    fn test_pressure_is_sign_extended() {
        let bus: SimBus = SimBus::new()
            .with_device(sensor().with_registers(REG_PRESS_OUT_XL, &[0x00, 0x00, 0xFF]));
        let mut engine = RegisterEngine::new(bus, CaptureSink::<256>::new());

        let pressure = Lps25h::new(DeviceAddress::PRESSURE_SENSOR)
            .pressure(&mut engine)
            .unwrap();

        assert_eq!(pressure, -0x1_0000);
    }

    #[test]
    fn test_multi_byte_reads_request_auto_increment() {
        let bus: SimBus = SimBus::new().with_device(sensor());
        let mut engine = RegisterEngine::new(bus, CaptureSink::<256>::new());

        Lps25h::new(DeviceAddress::PRESSURE_SENSOR)
            .temperature(&mut engine)
            .unwrap();

        assert_eq!(
            engine.bus().calls()[0],
            BusCall::Write {
                address: 0x5C,
                len: 1,
                stop: StopMode::StopOnReadEnd,
            }
        );
        assert!(
            engine
                .printer()
                .sink()
                .as_str()
                .starts_with("  addr: 0x5C reg_addr: 0xAB data: 0x60E0\n")
        );
    }

    #[test]
    fn test_probe_output() {
        let bus: SimBus = SimBus::new().with_device(sensor());
        let mut engine = RegisterEngine::new(bus, CaptureSink::<512>::new());
        let mut delay = NoDelay::new();

        probe(&mut engine, &mut delay, &ProbeConfig::new()).unwrap();

        let text = engine.printer().sink().as_str();
        assert!(text.starts_with("  addr: 0x5C reg_addr: 0x0F data: 0xBD\n"));
        assert!(text.contains("  hPa: 0x3F8000 / 4096.0\n"));
        assert!(text.ends_with("  Degrees C: 42.5 + (0xE060 / 480.0)\n"));
        assert_eq!(delay.requested_ns(), 250_000_000);

        let device = engine.bus().device(DeviceAddress::PRESSURE_SENSOR).unwrap();
        assert_eq!(device.register(REG_CTRL_REG1), 0x90);
    }
}
