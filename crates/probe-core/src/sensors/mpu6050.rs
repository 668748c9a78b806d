//! MPU-6050 six-axis motion tracker
//!
//! The tracker is powered through the IO extender, so the probe switches the
//! supply on before touching the part.

use embedded_hal::delay::DelayNs;
use embedded_io::Write;
use log::{info, warn};

use super::pca9535a::Pca9535a;
use crate::address::DeviceAddress;
use crate::bus::BusTransport;
use crate::config::ProbeConfig;
use crate::engine::RegisterEngine;
use crate::error::Result;
use crate::fault::{Checked, ProbeResult};
use crate::printer::DiagnosticPrinter;

pub const REG_MOT_THR: u8 = 0x1F;
pub const REG_MOT_DUR: u8 = 0x20;
pub const REG_ZRMOT_THR: u8 = 0x21;
pub const REG_ZRMOT_DUR: u8 = 0x22;
pub const REG_INT_ENABLE: u8 = 0x38;
pub const REG_ACCEL_XOUT_H: u8 = 0x3B;
pub const REG_TEMP_OUT_H: u8 = 0x41;
pub const REG_PWR_MGMT_1: u8 = 0x6B;
pub const REG_WHO_AM_I: u8 = 0x75;

pub const WHO_AM_I: u8 = 0x68;

const MOTION_THRESHOLD: u8 = 5;
const MOTION_DURATION: u8 = 2;
const ZERO_MOTION_THRESHOLD: u8 = 120;
const ZERO_MOTION_DURATION: u8 = 120;
/// MOT_EN: raise INT on motion detection
const INT_MOTION: u8 = 0x40;

/// One burst read of the sensor data registers, raw counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MotionSample {
    pub accel: [i16; 3],
    pub temperature: i16,
    pub gyro: [i16; 3],
}

impl MotionSample {
    /// Decode the 14 big-endian bytes starting at ACCEL_XOUT_H.
    pub fn from_registers(data: &[u8; 14]) -> Self {
        let word = |i: usize| i16::from_be_bytes([data[2 * i], data[2 * i + 1]]);
        Self {
            accel: [word(0), word(1), word(2)],
            temperature: word(3),
            gyro: [word(4), word(5), word(6)],
        }
    }
}

/// MPU-6050 motion tracker
pub struct Mpu6050 {
    address: DeviceAddress,
}

impl Mpu6050 {
    /// Driver for the motion tracker at `address`.
    pub const fn new(address: DeviceAddress) -> Self {
        Self { address }
    }

    /// Wake the part and arm the motion interrupt.
    pub fn init<B: BusTransport, W: Write>(&self, engine: &mut RegisterEngine<B, W>) -> Result<()> {
        let id = engine.read_register(self.address, REG_WHO_AM_I)?;
        if id != WHO_AM_I {
            warn!("MPU-6050: unexpected WHO_AM_I {:#04x}", id);
        }

        engine.write_register(self.address, REG_PWR_MGMT_1, 0x00)?;
        engine.write_register(self.address, REG_MOT_THR, MOTION_THRESHOLD)?;
        engine.write_register(self.address, REG_MOT_DUR, MOTION_DURATION)?;
        engine.write_register(self.address, REG_ZRMOT_THR, ZERO_MOTION_THRESHOLD)?;
        engine.write_register(self.address, REG_ZRMOT_DUR, ZERO_MOTION_DURATION)?;
        engine.write_register(self.address, REG_INT_ENABLE, INT_MOTION)
    }

    /// Raw temperature: `35 + raw / 340` °C.
    pub fn temperature<B: BusTransport, W: Write>(
        &self,
        engine: &mut RegisterEngine<B, W>,
    ) -> Result<i16> {
        let data = engine.read_registers(self.address, REG_TEMP_OUT_H, 2)?;
        Ok(i16::from_be_bytes([data[0], data[1]]))
    }

    pub fn sample<B: BusTransport, W: Write>(
        &self,
        engine: &mut RegisterEngine<B, W>,
    ) -> Result<MotionSample> {
        let data = engine.read_registers(self.address, REG_ACCEL_XOUT_H, 14)?;
        let mut raw = [0u8; 14];
        raw.copy_from_slice(&data);
        Ok(MotionSample::from_registers(&raw))
    }
}

/// Print ` mpu6050: ax,ay,az; t; gx,gy,gz` without a line ending.
pub fn print_sample<W: Write>(out: &mut DiagnosticPrinter<W>, sample: &MotionSample) -> Result<()> {
    out.put_str(" mpu6050: ")?;
    print_axes(out, &sample.accel)?;
    out.put_str("; ")?;
    out.put_hex_16(sample.temperature as u16)?;
    out.put_str("; ")?;
    print_axes(out, &sample.gyro)
}

fn print_axes<W: Write>(out: &mut DiagnosticPrinter<W>, axes: &[i16; 3]) -> Result<()> {
    for (i, &axis) in axes.iter().enumerate() {
        if i > 0 {
            out.put(b',')?;
        }
        out.put_hex_16(axis as u16)?;
    }
    Ok(())
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
    Pca9535a::new(DeviceAddress::IO_EXTENDER)
        .power_motion_tracker(engine)
        .check()?;

    let tracker = Mpu6050::new(DeviceAddress::MOTION_TRACKER);
    tracker.init(engine).check()?;
    delay.delay_ms(config.motion_settle_ms);

    let temperature = tracker.temperature(engine).check()?;
    let out = engine.printer();
    out.put_str("  Degrees C: 35 + (0x").check()?;
    out.put_hex_16(temperature as u16).check()?;
    out.put_str(" / 340.0)\n").check()?;

    let sample = tracker.sample(engine).check()?;
    info!("MPU-6050: {:?}", sample);

    let out = engine.printer();
    out.put_str(" ").check()?;
    print_sample(out, &sample).check()?;
    out.put_str("\n").check()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{CaptureSink, NoDelay, SimBus, SimDevice};

    const SAMPLE: [u8; 14] = [
        0x01, 0x00, 0xFF, 0x00, 0x40, 0x00, // accel
        0xF2, 0x30, // temperature
        0x00, 0x10, 0xFF, 0xF0, 0x00, 0x00, // gyro
    ];

    fn board() -> SimBus {
        SimBus::new()
            .with_device(SimDevice::new(DeviceAddress::IO_EXTENDER))
            .with_device(
                SimDevice::new(DeviceAddress::MOTION_TRACKER)
                    .with_register(REG_WHO_AM_I, WHO_AM_I)
                    .with_register(REG_PWR_MGMT_1, 0x40)
                    .with_registers(REG_ACCEL_XOUT_H, &SAMPLE)
                    .read_only(REG_WHO_AM_I),
            )
    }

    #[test]
    fn test_decode_sample() {
        let sample = MotionSample::from_registers(&SAMPLE);
        assert_eq!(sample.accel, [0x0100, -0x0100, 0x4000]);
        assert_eq!(sample.temperature, -3536);
        assert_eq!(sample.gyro, [0x10, -0x10, 0]);
    }

    #[test]
    fn test_init_wakes_and_arms_motion_interrupt() {
        let mut engine = RegisterEngine::new(board(), CaptureSink::<256>::new());

        Mpu6050::new(DeviceAddress::MOTION_TRACKER)
            .init(&mut engine)
            .unwrap();

        let device = engine.bus().device(DeviceAddress::MOTION_TRACKER).unwrap();
        assert_eq!(device.register(REG_PWR_MGMT_1), 0x00);
        assert_eq!(device.register(REG_MOT_THR), 5);
        assert_eq!(device.register(REG_ZRMOT_DUR), 120);
        assert_eq!(device.register(REG_INT_ENABLE), 0x40);
    }

    #[test]
    fn test_probe_output() {
        let mut engine = RegisterEngine::new(board(), CaptureSink::<512>::new());

        probe(&mut engine, &mut NoDelay::new(), &ProbeConfig::new()).unwrap();

        let text = engine.printer().sink().as_str();
        assert!(text.contains("  Degrees C: 35 + (0xF230 / 340.0)\n"));
        assert!(text.ends_with("  mpu6050: 0100,FF00,4000; F230; 0010,FFF0,0000\n"));
    }
}
