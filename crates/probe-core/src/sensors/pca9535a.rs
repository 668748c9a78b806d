//! PCA9535A 16-bit IO extender
//!
//! Board wiring:
//!
//! | Pin     | Function                          |
//! |---------|-----------------------------------|
//! | P0.0    | button 0, active low              |
//! | P0.1    | button 1, active low              |
//! | P0.4    | LED0, active low                  |
//! | P1.2    | motion tracker power enable       |
//! | P1.5    | motion tracker interrupt, active low |

use embedded_hal::delay::DelayNs;
use embedded_io::Write;
use log::{debug, info};

use crate::address::DeviceAddress;
use crate::bus::BusTransport;
use crate::config::ProbeConfig;
use crate::engine::RegisterEngine;
use crate::error::Result;
use crate::fault::{Checked, ProbeResult};
use crate::printer::DiagnosticPrinter;

pub const REG_INPUT0: u8 = 0x00;
pub const REG_INPUT1: u8 = 0x01;
pub const REG_OUTPUT0: u8 = 0x02;
pub const REG_OUTPUT1: u8 = 0x03;
pub const REG_POLARITY0: u8 = 0x04;
pub const REG_POLARITY1: u8 = 0x05;
pub const REG_CONFIG0: u8 = 0x06;
pub const REG_CONFIG1: u8 = 0x07;

pub const BUTTON0_MASK: u8 = 1 << 0;
pub const BUTTON1_MASK: u8 = 1 << 1;
pub const LED0_MASK: u8 = 1 << 4;
pub const MOTION_INT_MASK: u8 = 1 << 5;

/// Port 1 direction with only the motion tracker power pin as output
const MOTION_POWER_CONFIG1: u8 = 0xFB;
/// Port 1 output level with the motion tracker powered
const MOTION_POWER_OUTPUT1: u8 = 0xFF;

/// A register pair, one byte per port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ports {
    pub port0: u8,
    pub port1: u8,
}

impl Ports {
    /// Port 1 in the high byte, as printed.
    pub const fn word(self) -> u16 {
        u16::from_be_bytes([self.port1, self.port0])
    }

    pub const fn button0_pressed(self) -> bool {
        self.port0 & BUTTON0_MASK == 0
    }

    pub const fn button1_pressed(self) -> bool {
        self.port0 & BUTTON1_MASK == 0
    }

    /// The motion tracker pulls its interrupt line low.
    pub const fn motion_interrupt(self) -> bool {
        self.port1 & MOTION_INT_MASK == 0
    }
}

/// PCA9535A 16-bit IO extender
pub struct Pca9535a {
    address: DeviceAddress,
}

impl Pca9535a {
    /// Driver for the IO extender at `address`.
    pub const fn new(address: DeviceAddress) -> Self {
        Self { address }
    }

    fn read_pair<B: BusTransport, W: Write>(
        &self,
        engine: &mut RegisterEngine<B, W>,
        register: u8,
    ) -> Result<Ports> {
        let data = engine.read_registers(self.address, register, 2)?;
        Ok(Ports {
            port0: data[0],
            port1: data[1],
        })
    }

    /// Make LED0 an output, leaving every other pin's direction alone.
    pub fn init<B: BusTransport, W: Write>(&self, engine: &mut RegisterEngine<B, W>) -> Result<()> {
        let config0 = engine.read_register(self.address, REG_CONFIG0)?;
        engine.write_register(self.address, REG_CONFIG0, config0 & !LED0_MASK)
    }

    pub fn input_state<B: BusTransport, W: Write>(
        &self,
        engine: &mut RegisterEngine<B, W>,
    ) -> Result<Ports> {
        self.read_pair(engine, REG_INPUT0)
    }

    pub fn output_state<B: BusTransport, W: Write>(
        &self,
        engine: &mut RegisterEngine<B, W>,
    ) -> Result<Ports> {
        self.read_pair(engine, REG_OUTPUT0)
    }

    pub fn polarity_inversion<B: BusTransport, W: Write>(
        &self,
        engine: &mut RegisterEngine<B, W>,
    ) -> Result<Ports> {
        self.read_pair(engine, REG_POLARITY0)
    }

    pub fn port_config<B: BusTransport, W: Write>(
        &self,
        engine: &mut RegisterEngine<B, W>,
    ) -> Result<Ports> {
        self.read_pair(engine, REG_CONFIG0)
    }

    /// Drive LED0. The pin is active low.
    pub fn led0<B: BusTransport, W: Write>(
        &self,
        engine: &mut RegisterEngine<B, W>,
        on: bool,
    ) -> Result<()> {
        let output0 = engine.read_register(self.address, REG_OUTPUT0)?;
        let output0 = if on {
            output0 & !LED0_MASK
        } else {
            output0 | LED0_MASK
        };
        engine.write_register(self.address, REG_OUTPUT0, output0)
    }

    /// Switch on the motion tracker supply.
    pub fn power_motion_tracker<B: BusTransport, W: Write>(
        &self,
        engine: &mut RegisterEngine<B, W>,
    ) -> Result<()> {
        debug!("PCA9535A: powering motion tracker");
        engine.write_register(self.address, REG_CONFIG1, MOTION_POWER_CONFIG1)?;
        engine.write_register(self.address, REG_OUTPUT1, MOTION_POWER_OUTPUT1)
    }
}

/// Print `label` followed by the port word, without a line ending.
pub fn print_ports<W: Write>(out: &mut DiagnosticPrinter<W>, label: &str, ports: Ports) -> Result<()> {
    out.put_str(label)?;
    out.put_hex_16(ports.word())
}

/// Append ` button0` / ` button1` for each pressed button.
pub fn print_buttons<W: Write>(out: &mut DiagnosticPrinter<W>, ports: Ports) -> Result<()> {
    if ports.button0_pressed() {
        out.put_str(" button0")?;
    }
    if ports.button1_pressed() {
        out.put_str(" button1")?;
    }
    Ok(())
}

/// Dump the port registers, then blink LED0.
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
    let extender = Pca9535a::new(DeviceAddress::IO_EXTENDER);
    extender.init(engine).check()?;

    let input = extender.input_state(engine).check()?;
    let out = engine.printer();
    print_ports(out, "  Input port state:  0x", input).check()?;
    print_buttons(out, input).check()?;
    out.put_str("\n").check()?;

    let output = extender.output_state(engine).check()?;
    let out = engine.printer();
    print_ports(out, "  Output port state: 0x", output).check()?;
    out.put_str("\n").check()?;

    let polarity = extender.polarity_inversion(engine).check()?;
    let out = engine.printer();
    print_ports(out, "  Polarity inversion: 0x", polarity).check()?;
    out.put_str("\n").check()?;

    let port_config = extender.port_config(engine).check()?;
    let out = engine.printer();
    print_ports(out, "  Port config:       0x", port_config).check()?;
    out.put_str("\n").check()?;

    info!("PCA9535A: inputs {:#06x}", input.word());

    extender.led0(engine, true).check()?;
    delay.delay_ms(config.led_blink_ms);
    extender.led0(engine, false).check()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{CaptureSink, SimBus, SimDevice};

    fn extender() -> SimDevice {
        SimDevice::new(DeviceAddress::IO_EXTENDER)
            .with_registers(REG_INPUT0, &[0xFF, 0xFF])
            .with_registers(REG_OUTPUT0, &[0xFF, 0xFF])
            .with_registers(REG_CONFIG0, &[0xFF, 0xFF])
            .read_only(REG_INPUT0)
            .read_only(REG_INPUT1)
    }

    #[test]
    fn test_ports_word_puts_port1_high() {
        let ports = Ports {
            port0: 0x34,
            port1: 0x12,
        };
        assert_eq!(ports.word(), 0x1234);
    }

    #[test]
    fn test_buttons_are_active_low() {
        let ports = Ports {
            port0: 0xFE,
            port1: 0xFF,
        };
        assert!(ports.button0_pressed());
        assert!(!ports.button1_pressed());
        assert!(!ports.motion_interrupt());
    }

    #[test]
    fn test_input_state_reports_buttons() {
        let bus: SimBus = SimBus::new().with_device(extender().with_register(REG_INPUT0, 0xFC));
        let mut engine = RegisterEngine::new(bus, CaptureSink::<1024>::new());
        let mut delay = crate::sim::NoDelay::new();

        probe(&mut engine, &mut delay, &ProbeConfig::new()).unwrap();

        let text = engine.printer().sink().as_str();
        assert!(text.contains("  Input port state:  0xFFFC button0 button1\n"));
        assert!(text.contains("  Port config:       0xFFEF\n"));
    }

    #[test]
    fn test_led_blink_restores_output() {
        let bus: SimBus = SimBus::new().with_device(extender());
        let mut engine = RegisterEngine::new(bus, CaptureSink::<512>::new());
        let extender = Pca9535a::new(DeviceAddress::IO_EXTENDER);

        extender.led0(&mut engine, true).unwrap();
        let device = engine.bus().device(DeviceAddress::IO_EXTENDER).unwrap();
        assert_eq!(device.register(REG_OUTPUT0), 0xEF);

        extender.led0(&mut engine, false).unwrap();
        let device = engine.bus().device(DeviceAddress::IO_EXTENDER).unwrap();
        assert_eq!(device.register(REG_OUTPUT0), 0xFF);
    }

    #[test]
    fn test_power_motion_tracker() {
        let bus: SimBus = SimBus::new().with_device(extender());
        let mut engine = RegisterEngine::new(bus, CaptureSink::<512>::new());

        Pca9535a::new(DeviceAddress::IO_EXTENDER)
            .power_motion_tracker(&mut engine)
            .unwrap();

        let device = engine.bus().device(DeviceAddress::IO_EXTENDER).unwrap();
        assert_eq!(device.register(REG_CONFIG1), 0xFB);
        assert_eq!(device.register(REG_OUTPUT1), 0xFF);
        // Writes print nothing.
        assert_eq!(engine.printer().sink().as_str(), "");
    }
}
