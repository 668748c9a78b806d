//! Sensor drivers exercised by the probe
//!
//! Each driver exposes a small register-level API over [`RegisterEngine`]
//! and a `probe` step that brings the part up, reads it and prints what it
//! read. Failures are located with [`Checked::check`](crate::fault::Checked)
//! at the step that failed.

pub mod lis3dh;
pub mod lps25h;
pub mod max44009;
pub mod mcp9808;
pub mod mpu6050;
pub mod pca9535a;

use embedded_hal::delay::DelayNs;
use embedded_io::Write;

use crate::bus::BusTransport;
use crate::config::{ProbeConfig, SensorKind};
use crate::engine::RegisterEngine;
use crate::fault::ProbeResult;

/// Run the probe step for `sensor`.
pub fn probe<B, W, D>(
    sensor: SensorKind,
    engine: &mut RegisterEngine<B, W>,
    delay: &mut D,
    config: &ProbeConfig,
) -> ProbeResult
where
    B: BusTransport,
    W: Write,
    D: DelayNs,
{
    match sensor {
        SensorKind::Temperature => mcp9808::probe(engine, delay, config),
        SensorKind::IoExtender => pca9535a::probe(engine, delay, config),
        SensorKind::Light => max44009::probe(engine, delay, config),
        SensorKind::Pressure => lps25h::probe(engine, delay, config),
        SensorKind::MotionTracker => mpu6050::probe(engine, delay, config),
        SensorKind::Accelerometer => lis3dh::probe(engine, delay, config),
    }
}
