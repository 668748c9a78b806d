#![no_std]
#![no_main]
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]

use core::cell::RefCell;

use critical_section::Mutex;
use esp_hal::clock::CpuClock;
use esp_hal::delay::Delay;
use esp_hal::gpio::{Event, Input, InputConfig, Io, Pull};
use esp_hal::i2c::master::{Config as I2cConfig, I2c};
use esp_hal::time::Rate;
use esp_hal::uart::{Config as UartConfig, Uart};
use esp_hal::{Blocking, handler, main};
use log::{error, info};
use rtt_target::rprintln;

use probe_core::fault::halt;
use probe_core::{
    EdgeChannel, EdgeEvents, FailurePolicy, Harness, HalBus, InterruptLatch, LatchSetter,
    ProbeConfig, RegisterEngine,
};

/// Diagnostic stream baud rate
const UART_BAUD: u32 = 1_000_000;

/// Failure policy baked in by build.rs from `.env`
const FAILURE_POLICY: &str = env!("PROBE_FAILURE_POLICY");

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    rprintln!("PANIC: {}", info);
    loop {}
}

// This creates a default app-descriptor required by the esp-idf bootloader.
esp_bootloader_esp_idf::esp_app_desc!();

static LATCH: InterruptLatch = InterruptLatch::new();

/// Interrupt pins and the latch setter, owned by the GPIO handler once set up
static EDGE_UNIT: Mutex<RefCell<Option<EdgeUnit>>> = Mutex::new(RefCell::new(None));

struct GpioEdges {
    accelerometer: Input<'static>,
    io_extender: Input<'static>,
}

impl GpioEdges {
    fn pin(&mut self, channel: EdgeChannel) -> &mut Input<'static> {
        match channel {
            EdgeChannel::Accelerometer => &mut self.accelerometer,
            EdgeChannel::IoExtender => &mut self.io_extender,
        }
    }
}

impl EdgeEvents for GpioEdges {
    fn is_triggered(&mut self, channel: EdgeChannel) -> bool {
        self.pin(channel).is_interrupt_set()
    }

    fn acknowledge(&mut self, channel: EdgeChannel) {
        self.pin(channel).clear_interrupt();
    }
}

struct EdgeUnit {
    pins: GpioEdges,
    setter: LatchSetter<'static>,
}

#[handler]
fn gpio_handler() {
    critical_section::with(|cs| {
        if let Some(unit) = EDGE_UNIT.borrow_ref_mut(cs).as_mut() {
            unit.setter.service(&mut unit.pins);
        }
    });
}

/// UART0 as the diagnostic byte sink
struct UartSink {
    uart: Uart<'static, Blocking>,
}

impl embedded_io::ErrorType for UartSink {
    type Error = embedded_io::ErrorKind;
}

impl embedded_io::Write for UartSink {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.uart
            .write(buf)
            .map_err(|_| embedded_io::ErrorKind::Other)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.uart.flush().map_err(|_| embedded_io::ErrorKind::Other)
    }
}

#[main]
fn main() -> ! {
    rtt_target::rtt_init_log!();

    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    let failure_policy = FAILURE_POLICY.parse::<FailurePolicy>().unwrap_or_else(|e| {
        error!("PROBE_FAILURE_POLICY={}: {}, using halt", FAILURE_POLICY, e);
        FailurePolicy::Halt
    });
    let probe_config = ProbeConfig::new()
        .with_failure_policy(failure_policy)
        .with_poll_interrupts(true);
    info!("twi-probe starting, failure policy {:?}", failure_policy);

    // 1. Diagnostic UART, TX only
    let uart = Uart::new(
        peripherals.UART0,
        UartConfig::default().with_baudrate(UART_BAUD),
    )
    .expect("Failed to initialize UART0")
    .with_tx(peripherals.GPIO43);

    // 2. Sensor bus
    let i2c = I2c::new(
        peripherals.I2C0,
        I2cConfig::default().with_frequency(Rate::from_khz(400)),
    )
    .expect("Failed to initialize I2C0")
    .with_sda(peripherals.GPIO8)
    .with_scl(peripherals.GPIO9);

    // 3. Interrupt lines, both edges
    let mut io = Io::new(peripherals.IO_MUX);
    io.set_interrupt_handler(gpio_handler);

    let pull_up = || InputConfig::default().with_pull(Pull::Up);
    let mut accelerometer = Input::new(peripherals.GPIO4, pull_up());
    let mut io_extender = Input::new(peripherals.GPIO5, pull_up());

    let (setter, mut taker) = LATCH.split().expect("Interrupt latch split twice");

    critical_section::with(|cs| {
        accelerometer.listen(Event::AnyEdge);
        io_extender.listen(Event::AnyEdge);
        EDGE_UNIT.borrow_ref_mut(cs).replace(EdgeUnit {
            pins: GpioEdges {
                accelerometer,
                io_extender,
            },
            setter,
        });
    });

    info!("Peripherals initialized");

    let engine = RegisterEngine::new(HalBus::new(i2c), UartSink { uart });
    let mut harness = Harness::new(engine, Delay::new(), probe_config);

    match harness.run() {
        Ok(summary) => info!(
            "Sequence done: {} passed, {} skipped",
            summary.passed, summary.skipped
        ),
        Err(fault) => {
            error!("Run halted with code {:#010x}", fault.code());
            halt();
        }
    }

    if !harness.config().poll_interrupts {
        halt();
    }

    let fault = harness.serve_interrupts(&mut taker);
    error!("Interrupt serving halted with code {:#010x}", fault.code());
    halt()
}
