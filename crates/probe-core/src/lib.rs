//! Hardware-independent core of twi-probe
//!
//! twi-probe brings up the sensors on a small I2C board and prints what it
//! reads to a serial diagnostic stream. This crate holds everything that does
//! not touch a particular chip:
//!
//! - [`engine`]: register reads and writes over a [`bus::BusTransport`],
//!   with a diagnostic line per read
//! - [`printer`]: upper-case hex formatting onto any `embedded-io` sink
//! - [`fault`]: located failures and the fatal diagnostic line
//! - [`latch`]: edge-triggered interrupt flags shared with an interrupt handler
//! - [`sensors`] and [`harness`]: the per-sensor bring-up sequence
//!
//! It is `#![no_std]` and allocation-free so it runs on the firmware target
//! and on the host (simulator and tests) alike.

#![no_std]

pub mod address;
pub mod bus;
pub mod config;
pub mod engine;
pub mod error;
pub mod fault;
pub mod harness;
pub mod latch;
pub mod printer;
pub mod sensors;
#[cfg(any(test, feature = "sim"))]
pub mod sim;

pub use address::DeviceAddress;
pub use bus::{BusStatus, BusTransport, HalBus, StopMode};
pub use config::{FailurePolicy, ProbeConfig, SensorKind};
pub use engine::{RegisterEngine, TRANSFER_CAPACITY};
pub use error::{Error, Result};
pub use fault::{Checked, Fault, ProbeResult};
pub use harness::{Harness, RunSummary};
pub use latch::{EdgeChannel, EdgeEvents, InterruptLatch, LatchSetter, LatchTaker};
pub use printer::DiagnosticPrinter;
