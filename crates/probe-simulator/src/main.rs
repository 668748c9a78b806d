//! Desktop simulator for twi-probe.
//!
//! Runs the full sensor sequence against simulated devices and prints the
//! diagnostic stream to stdout, exactly as the firmware prints it to UART.
//! Logs go to stderr through `env_logger` (`RUST_LOG=debug` for bus detail).
//!
//! # Environment
//!
//! | Variable               | Meaning                                        |
//! |------------------------|------------------------------------------------|
//! | `PROBE_FAILURE_POLICY` | `halt` (default) or `skip`                     |
//! | `PROBE_FAIL_AT`        | `<call>:<status>`, fail the n-th bus call      |
//!
//! After the sequence, two simulated edges (button 0 and the accelerometer
//! line) are pushed through the interrupt latch and served once.

use std::env;
use std::io::{self, Write as _};
use std::process::ExitCode;
use std::thread;
use std::time::Duration;

use embedded_hal::delay::DelayNs;
use log::{error, info, warn};

use probe_core::sensors::pca9535a;
use probe_core::sim::{ScriptedEdges, SimBus, probe_board};
use probe_core::{
    BusStatus, DeviceAddress, EdgeChannel, FailurePolicy, Harness, InterruptLatch, ProbeConfig,
    RegisterEngine,
};

static LATCH: InterruptLatch = InterruptLatch::new();

/// Diagnostic sink writing to stdout.
struct StdoutSink {
    stdout: io::Stdout,
}

impl embedded_io::ErrorType for StdoutSink {
    type Error = embedded_io::ErrorKind;
}

impl embedded_io::Write for StdoutSink {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.stdout
            .write(buf)
            .map_err(|_| embedded_io::ErrorKind::Other)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.stdout
            .flush()
            .map_err(|_| embedded_io::ErrorKind::Other)
    }
}

/// Delay backed by `thread::sleep`.
struct SleepDelay;

impl DelayNs for SleepDelay {
    fn delay_ns(&mut self, ns: u32) {
        thread::sleep(Duration::from_nanos(u64::from(ns)));
    }
}

/// Parse `<call>:<status>`; the status may be decimal or `0x` hex.
fn parse_fail_at(value: &str) -> Option<(usize, BusStatus)> {
    let (call, status) = value.split_once(':')?;
    let call = call.trim().parse().ok()?;
    let status = status.trim();
    let code = match status.strip_prefix("0x").or_else(|| status.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => status.parse().ok()?,
    };
    Some((call, BusStatus::new(code)?))
}

fn load_config() -> ProbeConfig {
    let policy = match env::var("PROBE_FAILURE_POLICY") {
        Ok(value) => value.parse::<FailurePolicy>().unwrap_or_else(|e| {
            warn!("PROBE_FAILURE_POLICY={value}: {e}, using halt");
            FailurePolicy::Halt
        }),
        Err(_) => FailurePolicy::default(),
    };
    ProbeConfig::new()
        .with_failure_policy(policy)
        .with_poll_interrupts(true)
}

fn build_bus() -> SimBus {
    let mut bus = probe_board();
    if let Ok(value) = env::var("PROBE_FAIL_AT") {
        match parse_fail_at(&value) {
            Some((call, status)) => {
                info!("Injecting status {:#x} on bus call {}", status.code(), call);
                bus.fail_on_call(call, status);
            }
            None => warn!("PROBE_FAIL_AT={value}: expected <call>:<status>, ignored"),
        }
    }
    bus
}

fn main() -> ExitCode {
    env_logger::init();
    info!("Starting twi-probe simulator");

    let config = load_config();
    info!("Failure policy: {:?}", config.failure_policy);

    let engine = RegisterEngine::new(
        build_bus(),
        StdoutSink {
            stdout: io::stdout(),
        },
    );
    let mut harness = Harness::new(engine, SleepDelay, config);

    let summary = match harness.run() {
        Ok(summary) => summary,
        Err(fault) => {
            // The firmware idles forever here; the host exits instead.
            error!("Run halted with code {:#010x}", fault.code());
            return ExitCode::FAILURE;
        }
    };
    info!(
        "Sequence done: {} passed, {} skipped",
        summary.passed, summary.skipped
    );

    if !harness.config().poll_interrupts {
        return ExitCode::SUCCESS;
    }

    let Some((setter, mut taker)) = LATCH.split() else {
        error!("Interrupt latch already split");
        return ExitCode::FAILURE;
    };

    // Press button 0 and let both interrupt lines fire.
    if let Some(extender) = harness
        .engine_mut()
        .bus_mut()
        .device_mut(DeviceAddress::IO_EXTENDER)
    {
        extender.set_register(pca9535a::REG_INPUT0, 0xFE);
    }
    let mut edges = ScriptedEdges::new();
    edges.raise(EdgeChannel::IoExtender);
    edges.raise(EdgeChannel::Accelerometer);
    let latched = setter.service(&mut edges);
    info!("Latched {} interrupt events", latched);

    match harness.poll_interrupts(&mut taker) {
        Ok(handled) => {
            info!("Handled {} interrupt events", handled);
            ExitCode::SUCCESS
        }
        Err(fault) => {
            error!("Interrupt poll failed with code {:#010x}", fault.code());
            if let Err(e) = fault.print(harness.engine_mut().printer()) {
                error!("fatal diagnostic not written: {e}");
            }
            ExitCode::FAILURE
        }
    }
}
