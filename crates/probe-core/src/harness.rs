//! Sensor test harness
//!
//! Prints the run banner, then walks the configured sensor sequence, printing
//! each sensor's title followed by its probe output. A failing step prints
//! the fatal diagnostic; the [`FailurePolicy`] decides whether the run stops
//! there or moves on to the next sensor.
//!
//! After the sequence the harness can serve the interrupt latch: IO-extender
//! edges dump the input ports (and a motion sample when the motion tracker
//! asserts its line), accelerometer edges print `Accel int`.

use embedded_hal::delay::DelayNs;
use embedded_io::Write;
use log::{error, info, warn};

use crate::address::DeviceAddress;
use crate::bus::BusTransport;
use crate::config::{FailurePolicy, ProbeConfig, SensorKind};
use crate::engine::RegisterEngine;
use crate::fault::{Checked, Fault, ProbeResult};
use crate::latch::{EdgeChannel, LatchTaker};
use crate::sensors::{self, mpu6050, pca9535a};

/// First line of every run
pub const BANNER: &str = "####################################\n";

/// Outcome of a run that did not halt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunSummary {
    /// Sensors whose probe completed
    pub passed: usize,
    /// Sensors abandoned under [`FailurePolicy::SkipSensor`]
    pub skipped: usize,
    /// First fault seen, if any
    pub first_fault: Option<Fault>,
}

/// Runs the sensor sequence and serves the interrupt latch over one engine.
pub struct Harness<B, W, D> {
    engine: RegisterEngine<B, W>,
    delay: D,
    config: ProbeConfig,
}

impl<B, W, D> Harness<B, W, D>
where
    B: BusTransport,
    W: Write,
    D: DelayNs,
{
    /// A harness driving `engine`, waiting through `delay`.
    pub fn new(engine: RegisterEngine<B, W>, delay: D, config: ProbeConfig) -> Self {
        Self {
            engine,
            delay,
            config,
        }
    }

    /// The active configuration
    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    /// The register engine
    pub fn engine(&self) -> &RegisterEngine<B, W> {
        &self.engine
    }

    /// The register engine, mutably.
    pub fn engine_mut(&mut self) -> &mut RegisterEngine<B, W> {
        &mut self.engine
    }

    /// Take the engine and delay back.
    pub fn into_parts(self) -> (RegisterEngine<B, W>, D) {
        (self.engine, self.delay)
    }

    /// Run the whole sensor sequence.
    ///
    /// # Errors
    ///
    /// Under [`FailurePolicy::Halt`], the first fault, after its diagnostic
    /// has been printed. Nothing touches the bus or the sink afterwards.
    pub fn run(&mut self) -> ProbeResult<RunSummary> {
        self.engine.printer().put_str(BANNER).check()?;

        let mut summary = RunSummary::default();
        for &sensor in self.config.sequence {
            match self.probe(sensor) {
                Ok(()) => {
                    info!("{}: ok", sensor.title());
                    summary.passed += 1;
                }
                Err(fault) => {
                    self.report(sensor.title(), &fault);
                    if self.config.failure_policy == FailurePolicy::Halt {
                        return Err(fault);
                    }
                    warn!("{}: skipped", sensor.title());
                    summary.skipped += 1;
                    summary.first_fault.get_or_insert(fault);
                }
            }
        }

        self.engine.printer().flush().check()?;
        Ok(summary)
    }

    /// Print the title of `sensor` and run its probe step.
    pub fn probe(&mut self, sensor: SensorKind) -> ProbeResult {
        let out = self.engine.printer();
        out.put_str(sensor.title()).check()?;
        out.put_str("\n").check()?;
        sensors::probe(sensor, &mut self.engine, &mut self.delay, &self.config)
    }

    /// Handle every event pending in the latch once.
    ///
    /// Returns how many events were handled.
    pub fn poll_interrupts(&mut self, taker: &mut LatchTaker<'_>) -> ProbeResult<usize> {
        let mut handled = 0;

        if taker.take(EdgeChannel::IoExtender) {
            handled += 1;
            let ports = pca9535a::Pca9535a::new(DeviceAddress::IO_EXTENDER)
                .input_state(&mut self.engine)
                .check()?;
            let sample = if ports.motion_interrupt() {
                let sample = mpu6050::Mpu6050::new(DeviceAddress::MOTION_TRACKER)
                    .sample(&mut self.engine)
                    .check()?;
                Some(sample)
            } else {
                None
            };

            let out = self.engine.printer();
            pca9535a::print_ports(out, "  Input port state:  0x", ports).check()?;
            if let Some(sample) = &sample {
                mpu6050::print_sample(out, sample).check()?;
            }
            pca9535a::print_buttons(out, ports).check()?;
            out.put_str("\n").check()?;
        }

        if taker.take(EdgeChannel::Accelerometer) {
            handled += 1;
            self.engine.printer().put_str("Accel int\n").check()?;
        }

        if handled > 0 {
            self.engine.printer().flush().check()?;
        }
        Ok(handled)
    }

    /// Serve the latch until a fault halts the loop.
    ///
    /// Under [`FailurePolicy::SkipSensor`] faults are reported and serving
    /// continues, so this only returns under [`FailurePolicy::Halt`].
    pub fn serve_interrupts(&mut self, taker: &mut LatchTaker<'_>) -> Fault {
        loop {
            if let Some(fault) = self.serve_once(taker) {
                return fault;
            }
        }
    }

    /// One pass of the serving loop; `Some` when the loop must stop.
    fn serve_once(&mut self, taker: &mut LatchTaker<'_>) -> Option<Fault> {
        match self.poll_interrupts(taker) {
            Ok(0) => {
                core::hint::spin_loop();
                None
            }
            Ok(_) => None,
            Err(fault) => {
                self.report("interrupt poll", &fault);
                (self.config.failure_policy == FailurePolicy::Halt).then_some(fault)
            }
        }
    }

    fn report(&mut self, step: &str, fault: &Fault) {
        error!(
            "{} failed: {} ({}:{})",
            step, fault.error, fault.file, fault.line
        );
        if let Err(e) = fault.print(self.engine.printer()) {
            error!("fatal diagnostic not written: {}", e);
        }
    }
}
