//! LIS3DH three-axis accelerometer

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
pub const REG_OUT_X_L: u8 = 0x28;

pub const WHO_AM_I: u8 = 0x33;

const AUTO_INCREMENT: u8 = 0x80;
/// 100 Hz, normal mode, X/Y/Z enabled
const CTRL_REG1_100HZ_XYZ: u8 = 0x57;

/// LIS3DH three-axis accelerometer
pub struct Lis3dh {
    address: DeviceAddress,
}

impl Lis3dh {
    /// Driver for the accelerometer at `address`.
    pub const fn new(address: DeviceAddress) -> Self {
        Self { address }
    }

    pub fn init<B: BusTransport, W: Write>(&self, engine: &mut RegisterEngine<B, W>) -> Result<()> {
        engine.write_register(self.address, REG_CTRL_REG1, CTRL_REG1_100HZ_XYZ)
    }

    pub fn who_am_i<B: BusTransport, W: Write>(
        &self,
        engine: &mut RegisterEngine<B, W>,
    ) -> Result<u8> {
        engine.read_register(self.address, REG_WHO_AM_I)
    }

    /// Left-justified raw acceleration, X, Y, Z.
    pub fn acceleration<B: BusTransport, W: Write>(
        &self,
        engine: &mut RegisterEngine<B, W>,
    ) -> Result<[i16; 3]> {
        let data = engine.read_registers(self.address, REG_OUT_X_L | AUTO_INCREMENT, 6)?;
        Ok([
            i16::from_le_bytes([data[0], data[1]]),
            i16::from_le_bytes([data[2], data[3]]),
            i16::from_le_bytes([data[4], data[5]]),
        ])
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
    let accelerometer = Lis3dh::new(DeviceAddress::ACCELEROMETER);
    accelerometer.init(engine).check()?;

    let id = accelerometer.who_am_i(engine).check()?;
    if id != WHO_AM_I {
        warn!("LIS3DH: unexpected WHO_AM_I {:#04x}", id);
    }

    let [x, y, z] = accelerometer.acceleration(engine).check()?;
    info!("LIS3DH: x={} y={} z={}", x, y, z);

    let out = engine.printer();
    out.put_str("  Acceleration: 0x").check()?;
    out.put_hex_16(x as u16).check()?;
    out.put_str(",0x").check()?;
    out.put_hex_16(y as u16).check()?;
    out.put_str(",0x").check()?;
    out.put_hex_16(z as u16).check()?;
    out.put_str("\n").check()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{CaptureSink, NoDelay, SimBus, SimDevice};

    #[test]
    fn test_probe_output() {
        let bus: SimBus = SimBus::new().with_device(
            SimDevice::new(DeviceAddress::ACCELEROMETER)
                .with_register_mask(0x7F)
                .with_register(REG_WHO_AM_I, WHO_AM_I)
                .with_registers(REG_OUT_X_L, &[0x40, 0x00, 0xC0, 0xFF, 0x00, 0x40])
                .read_only(REG_WHO_AM_I),
        );
        let mut engine = RegisterEngine::new(bus, CaptureSink::<256>::new());

        probe(&mut engine, &mut NoDelay::new(), &ProbeConfig::new()).unwrap();

        assert_eq!(
            engine.printer().sink().as_str(),
            "  addr: 0x18 reg_addr: 0x0F data: 0x33\n\
             \x20 addr: 0x18 reg_addr: 0xA8 data: 0x4000C0FF0040\n\
             \x20 Acceleration: 0x0040,0xFFC0,0x4000\n"
        );
        let device = engine.bus().device(DeviceAddress::ACCELEROMETER).unwrap();
        assert_eq!(device.register(REG_CTRL_REG1), 0x57);
    }
}
