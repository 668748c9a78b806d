//! Register transaction engine
//!
//! Builds register-addressed reads and writes on top of a [`BusTransport`].
//!
//! # Protocol
//!
//! ```text
//! read:  [addr|W] [reg]                (no stop)
//!        [addr|R] [data]* [stop]
//! write: [addr|W] [reg] [value]* [stop]
//! ```
//!
//! Every successful [`RegisterEngine::read_registers`] call also prints one
//! diagnostic line:
//!
//! ```text
//!   addr: 0x18 reg_addr: 0x0F data: 0x33
//! ```
//!
//! Writes print nothing.
//!
//! # Failure
//!
//! The first non-zero transport status aborts the operation and is returned
//! as [`Error::Bus`]. Nothing is retried and no partial data is returned.

use embedded_io::Write;
use heapless::Vec;
use log::{debug, error};

use crate::address::DeviceAddress;
use crate::bus::{BusTransport, StopMode};
use crate::error::{BusPhase, Error, Result};
use crate::printer::DiagnosticPrinter;

/// Capacity of the transfer buffer in bytes.
pub const TRANSFER_CAPACITY: usize = 32;

/// Bytes moved by one register operation.
pub type TransferBuffer = Vec<u8, TRANSFER_CAPACITY>;

/// Register-level access to the devices on one bus.
pub struct RegisterEngine<B, W> {
    bus: B,
    printer: DiagnosticPrinter<W>,
}

impl<B, W> RegisterEngine<B, W>
where
    B: BusTransport,
    W: Write,
{
    /// Create an engine owning `bus` and printing read diagnostics to `sink`.
    pub const fn new(bus: B, sink: W) -> Self {
        Self {
            bus,
            printer: DiagnosticPrinter::new(sink),
        }
    }

    /// The printer shared with the read diagnostics.
    #[inline]
    pub fn printer(&mut self) -> &mut DiagnosticPrinter<W> {
        &mut self.printer
    }

    /// Borrow the transport.
    #[inline]
    pub fn bus(&self) -> &B {
        &self.bus
    }

    /// Mutably borrow the transport.
    #[inline]
    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    /// Return the transport and sink.
    pub fn release(self) -> (B, W) {
        (self.bus, self.printer.into_inner())
    }

    /// Read `count` consecutive registers of `device` starting at
    /// `start_register`.
    ///
    /// # Errors
    ///
    /// - [`Error::LengthExceedsCapacity`] if `count` is above
    ///   [`TRANSFER_CAPACITY`]; the bus is not touched
    /// - [`Error::Bus`] with the phase that failed
    /// - [`Error::Output`] if the diagnostic line could not be written
    pub fn read_registers(
        &mut self,
        device: DeviceAddress,
        start_register: u8,
        count: usize,
    ) -> Result<TransferBuffer> {
        let mut data = TransferBuffer::new();
        data.resize(count, 0).map_err(|_| Error::LengthExceedsCapacity {
            requested: count,
            capacity: TRANSFER_CAPACITY,
        })?;

        self.bus
            .write(device, &[start_register], StopMode::StopOnReadEnd)
            .map_err(|status| {
                error!(
                    "register address write to {:#04x} failed: {:#x}",
                    device.get(),
                    status.code()
                );
                status.in_phase(BusPhase::Write)
            })?;

        self.bus.read(device, &mut data).map_err(|status| {
            error!(
                "read of {} bytes from {:#04x} failed: {:#x}",
                count,
                device.get(),
                status.code()
            );
            status.in_phase(BusPhase::Read)
        })?;

        debug!(
            "read {:#04x}[{:#04x}..+{}] = {:02x?}",
            device.get(),
            start_register,
            count,
            data.as_slice()
        );

        self.print_read(device, start_register, &data)?;
        Ok(data)
    }

    /// Read a single register.
    pub fn read_register(&mut self, device: DeviceAddress, register: u8) -> Result<u8> {
        let data = self.read_registers(device, register, 1)?;
        Ok(data[0])
    }

    /// Write `value` to one register of `device`.
    pub fn write_register(&mut self, device: DeviceAddress, register: u8, value: u8) -> Result<()> {
        self.write_registers(device, register, &[value])
    }

    /// Write `payload` to consecutive registers starting at `register`.
    ///
    /// # Errors
    ///
    /// [`Error::LengthExceedsCapacity`] if the register byte plus payload do
    /// not fit the transfer buffer.
    pub fn write_registers(
        &mut self,
        device: DeviceAddress,
        register: u8,
        payload: &[u8],
    ) -> Result<()> {
        let requested = payload.len() + 1;
        if requested > TRANSFER_CAPACITY {
            return Err(Error::LengthExceedsCapacity {
                requested,
                capacity: TRANSFER_CAPACITY,
            });
        }

        let mut frame = [0u8; TRANSFER_CAPACITY];
        frame[0] = register;
        frame[1..requested].copy_from_slice(payload);

        debug!(
            "write {:#04x}[{:#04x}] = {:02x?}",
            device.get(),
            register,
            payload
        );

        self.bus
            .write(device, &frame[..requested], StopMode::StopOnWriteEnd)
            .map_err(|status| {
                error!(
                    "register write to {:#04x} failed: {:#x}",
                    device.get(),
                    status.code()
                );
                status.in_phase(BusPhase::Write)
            })
    }

    fn print_read(&mut self, device: DeviceAddress, register: u8, data: &[u8]) -> Result<()> {
        let out = &mut self.printer;
        out.put_str("  addr: 0x")?;
        out.put_hex_byte(device.get())?;
        out.put_str(" reg_addr: 0x")?;
        out.put_hex_byte(register)?;
        out.put_str(" data: 0x")?;
        for &byte in data {
            out.put_hex_byte(byte)?;
        }
        out.put_str("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::BusStatus;
    use crate::sim::{BusCall, CaptureSink, SimBus, SimDevice};

    const ACCEL: DeviceAddress = DeviceAddress::ACCELEROMETER;

    fn engine_with(device: SimDevice) -> RegisterEngine<SimBus, CaptureSink> {
        let mut bus: SimBus = SimBus::new();
        bus.attach(device);
        RegisterEngine::new(bus, CaptureSink::new())
    }

    #[test]
    fn test_read_prints_diagnostic_line() {
        let mut engine = engine_with(SimDevice::new(ACCEL).with_register(0x0F, 0x33));

        let data = engine.read_registers(ACCEL, 0x0F, 1).unwrap();

        assert_eq!(data.as_slice(), &[0x33]);
        assert_eq!(
            engine.printer().sink().as_str(),
            "  addr: 0x18 reg_addr: 0x0F data: 0x33\n"
        );
    }

    #[test]
    fn test_multi_byte_read_concatenates_data() {
        let device = SimDevice::new(DeviceAddress::IO_EXTENDER).with_registers(0x06, &[0xEF, 0xFB]);
        let mut engine = engine_with(device);

        let data = engine
            .read_registers(DeviceAddress::IO_EXTENDER, 0x06, 2)
            .unwrap();

        assert_eq!(data.as_slice(), &[0xEF, 0xFB]);
        assert_eq!(
            engine.printer().sink().as_str(),
            "  addr: 0x27 reg_addr: 0x06 data: 0xEFFB\n"
        );
    }

    #[test]
    fn test_read_frames_repeated_start() {
        let mut engine = engine_with(SimDevice::new(ACCEL));
        engine.read_registers(ACCEL, 0x28, 6).unwrap();

        assert_eq!(
            engine.bus().calls(),
            &[
                BusCall::Write {
                    address: 0x18,
                    len: 1,
                    stop: StopMode::StopOnReadEnd
                },
                BusCall::Read {
                    address: 0x18,
                    len: 6
                },
            ]
        );
    }

    #[test]
    fn test_write_has_no_diagnostic() {
        let mut engine = engine_with(SimDevice::new(ACCEL));
        engine.write_register(ACCEL, 0x20, 0x57).unwrap();

        assert_eq!(engine.printer().sink().as_str(), "");
        assert_eq!(
            engine.bus().calls(),
            &[BusCall::Write {
                address: 0x18,
                len: 2,
                stop: StopMode::StopOnWriteEnd
            }]
        );
    }

    #[test]
    fn test_write_then_read_round_trip() {
        let mut engine = engine_with(SimDevice::new(ACCEL));

        for (register, value) in [(0x20, 0x57), (0x22, 0x40), (0x23, 0x88)] {
            engine.write_register(ACCEL, register, value).unwrap();
            let data = engine.read_registers(ACCEL, register, 1).unwrap();
            assert_eq!(data.as_slice(), &[value]);
        }
    }

    #[test]
    fn test_read_only_register_keeps_value() {
        let device = SimDevice::new(ACCEL)
            .with_register(0x0F, 0x33)
            .read_only(0x0F);
        let mut engine = engine_with(device);

        engine.write_register(ACCEL, 0x0F, 0x00).unwrap();
        assert_eq!(engine.read_register(ACCEL, 0x0F), Ok(0x33));
    }

    #[test]
    fn test_oversized_read_is_rejected_before_bus() {
        let mut engine = engine_with(SimDevice::new(ACCEL));

        let result = engine.read_registers(ACCEL, 0x00, TRANSFER_CAPACITY + 1);

        assert_eq!(
            result,
            Err(Error::LengthExceedsCapacity {
                requested: 33,
                capacity: 32
            })
        );
        assert!(engine.bus().calls().is_empty());
    }

    #[test]
    fn test_full_capacity_read_is_allowed() {
        let mut engine = engine_with(SimDevice::new(ACCEL));
        let data = engine
            .read_registers(ACCEL, 0x00, TRANSFER_CAPACITY)
            .unwrap();
        assert_eq!(data.len(), TRANSFER_CAPACITY);
    }

    #[test]
    fn test_oversized_write_is_rejected() {
        let mut engine = engine_with(SimDevice::new(ACCEL));
        let payload = [0u8; TRANSFER_CAPACITY];

        let result = engine.write_registers(ACCEL, 0x00, &payload);

        assert_eq!(
            result,
            Err(Error::LengthExceedsCapacity {
                requested: 33,
                capacity: 32
            })
        );
        assert!(engine.bus().calls().is_empty());
    }

    #[test]
    fn test_missing_device_fails_write_phase() {
        let mut engine = engine_with(SimDevice::new(ACCEL));

        let result = engine.read_registers(DeviceAddress::LIGHT_SENSOR, 0x03, 1);

        assert_eq!(
            result,
            Err(Error::Bus {
                code: BusStatus::ADDRESS_NACK.code(),
                phase: BusPhase::Write
            })
        );
        assert_eq!(engine.printer().sink().as_str(), "");
    }

    #[test]
    fn test_read_phase_failure_skips_diagnostic() {
        let mut engine = engine_with(SimDevice::new(ACCEL));
        engine.bus_mut().fail_on_call(2, BusStatus::DATA_NACK);

        let result = engine.read_registers(ACCEL, 0x0F, 1);

        assert_eq!(
            result,
            Err(Error::Bus {
                code: 0x8002,
                phase: BusPhase::Read
            })
        );
        assert_eq!(engine.printer().sink().as_str(), "");
    }

    #[test]
    fn test_zero_count_read_still_frames_transaction() {
        let mut engine = engine_with(SimDevice::new(ACCEL).with_register(0x0F, 0x33));

        let data = engine.read_registers(ACCEL, 0x0F, 0).unwrap();

        assert!(data.is_empty());
        assert_eq!(engine.bus().call_count(), 2);
        assert_eq!(
            engine.printer().sink().as_str(),
            "  addr: 0x18 reg_addr: 0x0F data: 0x\n"
        );
    }
}
