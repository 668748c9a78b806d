//! Bus transport contract
//!
//! The register engine talks to the bus through [`BusTransport`], a byte-level
//! interface that mirrors how the probe frames its transactions: a write phase
//! whose stop condition is selectable, and a read phase that always ends with
//! a stop.
//!
//! [`HalBus`] maps the contract onto any blocking `embedded-hal` I2C master.
//! A write that must continue into a read is held back and issued together
//! with the read as a single `write_read`, which produces the repeated START
//! the register protocol needs.

use core::num::NonZeroU32;

use embedded_hal::i2c::{Error as _, ErrorKind, I2c, NoAcknowledgeSource};
use heapless::Vec;
use log::trace;

use crate::address::DeviceAddress;
use crate::engine::TRANSFER_CAPACITY;
use crate::error::{BusPhase, Error};

/// Non-zero status reported by a failed transport call.
///
/// Zero means success and is therefore not representable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BusStatus(NonZeroU32);

const fn status(code: u32) -> BusStatus {
    match NonZeroU32::new(code) {
        Some(code) => BusStatus(code),
        None => panic!("bus status zero means success"),
    }
}

impl BusStatus {
    /// Receiver overrun, or a transfer the transport could not hold
    pub const OVERRUN: Self = status(0x8000);
    /// Device did not acknowledge its address
    pub const ADDRESS_NACK: Self = status(0x8001);
    /// Device did not acknowledge a data byte
    pub const DATA_NACK: Self = status(0x8002);
    /// Misplaced START or STOP on the bus
    pub const BUS: Self = status(0x8003);
    /// Another master won arbitration
    pub const ARBITRATION_LOSS: Self = status(0x8004);
    /// Any other transport failure
    pub const OTHER: Self = status(0x8005);

    /// Wrap a raw status, returning `None` for the success value zero.
    pub const fn new(code: u32) -> Option<Self> {
        match NonZeroU32::new(code) {
            Some(code) => Some(Self(code)),
            None => None,
        }
    }

    /// Turn a raw C-style status into a result.
    pub const fn check(code: u32) -> Result<(), Self> {
        match Self::new(code) {
            Some(status) => Err(status),
            None => Ok(()),
        }
    }

    /// The raw status value
    #[inline]
    pub const fn code(self) -> u32 {
        self.0.get()
    }

    /// Status for an `embedded-hal` error kind.
    pub fn from_kind(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::Overrun => Self::OVERRUN,
            ErrorKind::NoAcknowledge(NoAcknowledgeSource::Data) => Self::DATA_NACK,
            ErrorKind::NoAcknowledge(_) => Self::ADDRESS_NACK,
            ErrorKind::Bus => Self::BUS,
            ErrorKind::ArbitrationLoss => Self::ARBITRATION_LOSS,
            _ => Self::OTHER,
        }
    }

    /// Attach the failing phase, producing an engine error.
    pub const fn in_phase(self, phase: BusPhase) -> Error {
        Error::Bus {
            code: self.code(),
            phase,
        }
    }
}

/// Where the transaction's stop condition is placed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopMode {
    /// The write phase ends the transaction
    StopOnWriteEnd,
    /// The write phase continues into a read, which ends the transaction
    StopOnReadEnd,
}

/// Byte-level bus transport
///
/// # Invariants
///
/// - Calls block until the transfer completes or fails
/// - A write with [`StopMode::StopOnReadEnd`] is always followed by a read
///   of the same device
/// - Only one owner drives the bus at a time
pub trait BusTransport {
    /// Send `bytes` to `address`, placing the stop condition per `stop`.
    fn write(
        &mut self,
        address: DeviceAddress,
        bytes: &[u8],
        stop: StopMode,
    ) -> Result<(), BusStatus>;

    /// Fill `buffer` from `address` and end the transaction with a stop.
    fn read(&mut self, address: DeviceAddress, buffer: &mut [u8]) -> Result<(), BusStatus>;
}

impl<T> BusTransport for &mut T
where
    T: BusTransport + ?Sized,
{
    #[inline]
    fn write(
        &mut self,
        address: DeviceAddress,
        bytes: &[u8],
        stop: StopMode,
    ) -> Result<(), BusStatus> {
        T::write(self, address, bytes, stop)
    }

    #[inline]
    fn read(&mut self, address: DeviceAddress, buffer: &mut [u8]) -> Result<(), BusStatus> {
        T::read(self, address, buffer)
    }
}

/// [`BusTransport`] over a blocking `embedded-hal` I2C master.
///
/// A failure in a held-back write surfaces from the following `read`, since
/// that is when the bytes actually reach the bus.
pub struct HalBus<I> {
    i2c: I,
    pending: Option<(DeviceAddress, Vec<u8, TRANSFER_CAPACITY>)>,
}

impl<I: I2c> HalBus<I> {
    /// Wrap an I2C master.
    #[inline]
    pub const fn new(i2c: I) -> Self {
        Self { i2c, pending: None }
    }

    /// Return the I2C master, sending any held-back write first.
    pub fn release(mut self) -> Result<I, BusStatus> {
        self.flush()?;
        Ok(self.i2c)
    }

    fn flush(&mut self) -> Result<(), BusStatus> {
        match self.pending.take() {
            Some((address, bytes)) => self
                .i2c
                .write(address.get(), &bytes)
                .map_err(|e| BusStatus::from_kind(e.kind())),
            None => Ok(()),
        }
    }
}

impl<I: I2c> BusTransport for HalBus<I> {
    fn write(
        &mut self,
        address: DeviceAddress,
        bytes: &[u8],
        stop: StopMode,
    ) -> Result<(), BusStatus> {
        self.flush()?;

        match stop {
            StopMode::StopOnWriteEnd => {
                trace!("i2c write {:#04x} {} bytes", address.get(), bytes.len());
                self.i2c
                    .write(address.get(), bytes)
                    .map_err(|e| BusStatus::from_kind(e.kind()))
            }
            StopMode::StopOnReadEnd => {
                let held = Vec::from_slice(bytes).map_err(|_| BusStatus::OVERRUN)?;
                self.pending = Some((address, held));
                Ok(())
            }
        }
    }

    fn read(&mut self, address: DeviceAddress, buffer: &mut [u8]) -> Result<(), BusStatus> {
        let result = match self.pending.take() {
            Some((held_address, bytes)) if held_address == address => {
                trace!(
                    "i2c write_read {:#04x} {} + {} bytes",
                    address.get(),
                    bytes.len(),
                    buffer.len()
                );
                self.i2c.write_read(address.get(), &bytes, buffer)
            }
            Some((held_address, bytes)) => {
                // Different device: the held write cannot share a transaction.
                match self.i2c.write(held_address.get(), &bytes) {
                    Ok(()) => self.i2c.read(address.get(), buffer),
                    Err(e) => Err(e),
                }
            }
            None => self.i2c.read(address.get(), buffer),
        };

        result.map_err(|e| BusStatus::from_kind(e.kind()))
    }
}
