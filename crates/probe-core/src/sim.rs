//! Simulated hardware for host runs and tests
//!
//! - [`SimBus`]: register-file devices behind a [`BusTransport`], with a call
//!   log and one-shot fault injection
//! - [`CaptureSink`]: byte sink collecting diagnostic output
//! - [`NoDelay`]: delay that only accumulates the requested time
//! - [`ScriptedEdges`]: edge-detection unit driven by the test
//! - [`probe_board`]: every sensor of the board with plausible readings

use core::convert::Infallible;

use embedded_hal::delay::DelayNs;
use heapless::Vec;

use crate::address::DeviceAddress;
use crate::bus::{BusStatus, BusTransport, StopMode};
use crate::latch::{EdgeChannel, EdgeEvents};
use crate::sensors::{lis3dh, lps25h, max44009, mcp9808, mpu6050, pca9535a};

/// Calls kept in the [`SimBus`] log; later calls are only counted.
pub const CALL_LOG_CAPACITY: usize = 128;

/// One transport call seen by [`SimBus`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusCall {
    /// Write phase
    Write {
        /// Raw 7-bit address
        address: u8,
        /// Bytes sent, register address included
        len: usize,
        /// Requested stop placement
        stop: StopMode,
    },
    /// Read phase
    Read {
        /// Raw 7-bit address
        address: u8,
        /// Bytes requested
        len: usize,
    },
}

/// A device modelled as 256 byte-wide registers with an auto-incrementing
/// register pointer.
#[derive(Debug, Clone)]
pub struct SimDevice {
    address: DeviceAddress,
    registers: [u8; 256],
    read_only: [bool; 256],
    register_mask: u8,
    pointer: u8,
}

impl SimDevice {
    /// A device at `address` with every register zero.
    pub const fn new(address: DeviceAddress) -> Self {
        Self {
            address,
            registers: [0; 256],
            read_only: [false; 256],
            register_mask: 0xFF,
            pointer: 0,
        }
    }

    /// Preset one register.
    pub const fn with_register(mut self, register: u8, value: u8) -> Self {
        self.registers[register as usize] = value;
        self
    }

    /// Preset consecutive registers starting at `start`.
    pub fn with_registers(mut self, start: u8, values: &[u8]) -> Self {
        let mut register = start;
        for &value in values {
            self.registers[register as usize] = value;
            register = register.wrapping_add(1);
        }
        self
    }

    /// Ignore writes to `register`.
    pub const fn read_only(mut self, register: u8) -> Self {
        self.read_only[register as usize] = true;
        self
    }

    /// Mask applied to the register address byte.
    ///
    /// ST parts use bit 7 of the address as an auto-increment request, so
    /// they are modelled with a mask of `0x7F`.
    pub const fn with_register_mask(mut self, mask: u8) -> Self {
        self.register_mask = mask;
        self
    }

    /// The device address
    pub const fn address(&self) -> DeviceAddress {
        self.address
    }

    /// Current value of `register`.
    pub const fn register(&self, register: u8) -> u8 {
        self.registers[register as usize]
    }

    /// Overwrite `register`, bypassing the read-only marks.
    pub fn set_register(&mut self, register: u8, value: u8) {
        self.registers[register as usize] = value;
    }

    fn write(&mut self, bytes: &[u8]) {
        let Some((&register, payload)) = bytes.split_first() else {
            return;
        };
        self.pointer = register & self.register_mask;
        for &value in payload {
            if !self.read_only[self.pointer as usize] {
                self.registers[self.pointer as usize] = value;
            }
            self.pointer = self.pointer.wrapping_add(1);
        }
    }

    fn read(&mut self, buffer: &mut [u8]) {
        for byte in buffer {
            *byte = self.registers[self.pointer as usize];
            self.pointer = self.pointer.wrapping_add(1);
        }
    }
}

/// Simulated bus with up to `N` attached devices.
///
/// Addressing a device that is not attached fails with
/// [`BusStatus::ADDRESS_NACK`].
pub struct SimBus<const N: usize = 8> {
    devices: Vec<SimDevice, N>,
    log: Vec<BusCall, CALL_LOG_CAPACITY>,
    call_count: usize,
    fault: Option<(usize, BusStatus)>,
}

impl<const N: usize> SimBus<N> {
    /// A bus with nothing attached.
    pub const fn new() -> Self {
        Self {
            devices: Vec::new(),
            log: Vec::new(),
            call_count: 0,
            fault: None,
        }
    }

    /// Attach a device, replacing any device already at its address.
    ///
    /// Devices beyond capacity are dropped with a warning.
    pub fn attach(&mut self, device: SimDevice) {
        if let Some(existing) = self.device_mut(device.address()) {
            *existing = device;
        } else if self.devices.push(device).is_err() {
            log::warn!("SimBus full, device not attached");
        }
    }

    /// Builder form of [`SimBus::attach`].
    pub fn with_device(mut self, device: SimDevice) -> Self {
        self.attach(device);
        self
    }

    /// Fail the `call`-th transport call (1-based) with `status`.
    pub fn fail_on_call(&mut self, call: usize, status: BusStatus) {
        self.fault = Some((call, status));
    }

    /// Logged calls, oldest first.
    pub fn calls(&self) -> &[BusCall] {
        &self.log
    }

    /// Total calls made, including those past the log capacity.
    pub const fn call_count(&self) -> usize {
        self.call_count
    }

    /// Look up an attached device.
    pub fn device(&self, address: DeviceAddress) -> Option<&SimDevice> {
        self.devices.iter().find(|d| d.address == address)
    }

    /// Look up an attached device for modification.
    pub fn device_mut(&mut self, address: DeviceAddress) -> Option<&mut SimDevice> {
        self.devices.iter_mut().find(|d| d.address == address)
    }

    fn begin(&mut self, call: BusCall) -> Result<(), BusStatus> {
        self.call_count += 1;
        let _ = self.log.push(call);
        match self.fault {
            Some((at, status)) if at == self.call_count => Err(status),
            _ => Ok(()),
        }
    }
}

impl<const N: usize> Default for SimBus<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> BusTransport for SimBus<N> {
    fn write(
        &mut self,
        address: DeviceAddress,
        bytes: &[u8],
        stop: StopMode,
    ) -> Result<(), BusStatus> {
        self.begin(BusCall::Write {
            address: address.get(),
            len: bytes.len(),
            stop,
        })?;
        let device = self.device_mut(address).ok_or(BusStatus::ADDRESS_NACK)?;
        device.write(bytes);
        Ok(())
    }

    fn read(&mut self, address: DeviceAddress, buffer: &mut [u8]) -> Result<(), BusStatus> {
        self.begin(BusCall::Read {
            address: address.get(),
            len: buffer.len(),
        })?;
        let device = self.device_mut(address).ok_or(BusStatus::ADDRESS_NACK)?;
        device.read(buffer);
        Ok(())
    }
}

/// Byte sink that keeps everything written to it, up to `N` bytes.
#[derive(Debug, Default)]
pub struct CaptureSink<const N: usize = 4096> {
    buffer: Vec<u8, N>,
}

impl<const N: usize> CaptureSink<N> {
    /// An empty sink.
    pub const fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    /// Captured bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Captured output as text; empty if it is not valid UTF-8.
    pub fn as_str(&self) -> &str {
        core::str::from_utf8(&self.buffer).unwrap_or("")
    }

    /// Forget everything captured so far.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

impl<const N: usize> embedded_io::ErrorType for CaptureSink<N> {
    type Error = Infallible;
}

impl<const N: usize> embedded_io::Write for CaptureSink<N> {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        let room = N - self.buffer.len();
        let take = buf.len().min(room);
        // Cannot fail: `take` fits the remaining room.
        let _ = self.buffer.extend_from_slice(&buf[..take]);
        Ok(take)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Delay that returns immediately and records how long it was asked to wait.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoDelay {
    requested_ns: u64,
}

impl NoDelay {
    /// A delay with nothing requested yet.
    pub const fn new() -> Self {
        Self { requested_ns: 0 }
    }

    /// Total requested delay in nanoseconds
    pub const fn requested_ns(&self) -> u64 {
        self.requested_ns
    }
}

impl DelayNs for NoDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.requested_ns += u64::from(ns);
    }
}

/// Edge-detection unit whose events are raised by hand.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScriptedEdges {
    triggered: [bool; EdgeChannel::COUNT],
    acknowledged: [u32; EdgeChannel::COUNT],
}

impl ScriptedEdges {
    /// No events raised.
    pub const fn new() -> Self {
        Self {
            triggered: [false; EdgeChannel::COUNT],
            acknowledged: [0; EdgeChannel::COUNT],
        }
    }

    /// Signal an edge on `channel`.
    pub fn raise(&mut self, channel: EdgeChannel) {
        self.triggered[channel.index()] = true;
    }

    /// How many times the event on `channel` was acknowledged.
    pub const fn acknowledged(&self, channel: EdgeChannel) -> u32 {
        self.acknowledged[channel.index()]
    }
}

impl EdgeEvents for ScriptedEdges {
    fn is_triggered(&mut self, channel: EdgeChannel) -> bool {
        self.triggered[channel.index()]
    }

    fn acknowledge(&mut self, channel: EdgeChannel) {
        self.triggered[channel.index()] = false;
        self.acknowledged[channel.index()] += 1;
    }
}

/// A bus carrying all six sensors, idle buttons and a quiet motion line.
pub fn probe_board() -> SimBus {
    SimBus::new()
        .with_device(
            SimDevice::new(DeviceAddress::TEMPERATURE_SENSOR)
                .with_registers(mcp9808::REG_AMBIENT, &[0xC1, 0x91])
                .read_only(mcp9808::REG_AMBIENT)
                .read_only(mcp9808::REG_AMBIENT + 1),
        )
        .with_device(
            SimDevice::new(DeviceAddress::IO_EXTENDER)
                .with_registers(pca9535a::REG_INPUT0, &[0xFF, 0xFF])
                .with_registers(pca9535a::REG_OUTPUT0, &[0xFF, 0xFF])
                .with_registers(pca9535a::REG_CONFIG0, &[0xFF, 0xFF])
                .read_only(pca9535a::REG_INPUT0)
                .read_only(pca9535a::REG_INPUT1),
        )
        .with_device(
            SimDevice::new(DeviceAddress::LIGHT_SENSOR)
                .with_registers(max44009::REG_LUX_HIGH, &[0x52, 0x07])
                .read_only(max44009::REG_LUX_HIGH)
                .read_only(max44009::REG_LUX_LOW),
        )
        .with_device(
            SimDevice::new(DeviceAddress::PRESSURE_SENSOR)
                .with_register_mask(0x7F)
                .with_register(lps25h::REG_WHO_AM_I, lps25h::WHO_AM_I)
                .with_registers(lps25h::REG_PRESS_OUT_XL, &[0x00, 0x80, 0x3F])
                .with_registers(lps25h::REG_TEMP_OUT_L, &[0x60, 0xE0])
                .read_only(lps25h::REG_WHO_AM_I),
        )
        .with_device(
            SimDevice::new(DeviceAddress::MOTION_TRACKER)
                .with_register(mpu6050::REG_WHO_AM_I, mpu6050::WHO_AM_I)
                .with_register(mpu6050::REG_PWR_MGMT_1, 0x40)
                .with_registers(
                    mpu6050::REG_ACCEL_XOUT_H,
                    &[
                        0x00, 0x10, 0xFF, 0xE0, 0x40, 0x08, 0xF2, 0x30, 0x00, 0x03, 0xFF, 0xFE,
                        0x00, 0x01,
                    ],
                )
                .read_only(mpu6050::REG_WHO_AM_I),
        )
        .with_device(
            SimDevice::new(DeviceAddress::ACCELEROMETER)
                .with_register_mask(0x7F)
                .with_register(lis3dh::REG_WHO_AM_I, lis3dh::WHO_AM_I)
                .with_registers(lis3dh::REG_OUT_X_L, &[0x40, 0x00, 0xC0, 0xFF, 0x00, 0x40])
                .read_only(lis3dh::REG_WHO_AM_I),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_io::Write as _;

    #[test]
    fn test_probe_board_keeps_ambient_pair() {
        let bus = probe_board();
        let sensor = bus.device(DeviceAddress::TEMPERATURE_SENSOR).unwrap();

        assert_eq!(sensor.register(mcp9808::REG_AMBIENT), 0xC1);
        assert_eq!(sensor.register(mcp9808::REG_AMBIENT + 1), 0x91);
    }

    #[test]
    fn test_capture_sink_truncates_at_capacity() {
        let mut sink = CaptureSink::<4>::new();

        assert_eq!(sink.write(b"abcdef"), Ok(4));
        assert_eq!(sink.as_bytes(), b"abcd");
        assert_eq!(sink.write(b"g"), Ok(0));

        sink.clear();
        sink.write_all(b"xy").unwrap();
        assert_eq!(sink.as_bytes(), b"xy");
    }
}
