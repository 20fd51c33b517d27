#![no_std]
#![no_main]
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]
#![deny(clippy::large_stack_frames)]

use co2dump_core::config::SENSOR_BAUD_RATE;
use co2dump_core::{Co2Dumper, LinkId, SerialLink};
use co2dump_firmware::board::{self, SENSOR1_CHANNEL, SENSOR2_CHANNEL};
use co2dump_firmware::clock::EspClock;
use co2dump_firmware::link::{attach, uart_config};
use esp_hal::clock::CpuClock;
use esp_hal::main;
use esp_hal::uart::Uart;
use log::{error, info};
use static_cell::StaticCell;

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    rtt_target::rprintln!("PANIC: {}", info);
    loop {}
}

// This creates a default app-descriptor required by the esp-idf bootloader.
// For more information see: <https://docs.espressif.com/projects/esp-idf/en/stable/esp32/api-reference/system/app_image_format.html#application-description>
esp_bootloader_esp_idf::esp_app_desc!();

static CONTROL_LINK: StaticCell<SerialLink> = StaticCell::new();
static SENSOR1_LINK: StaticCell<SerialLink> = StaticCell::new();
static SENSOR2_LINK: StaticCell<SerialLink> = StaticCell::new();

#[main]
fn main() -> ! {
    rtt_target::rtt_init_log!(log::LevelFilter::Info);

    let config = match board::load_config() {
        Ok(config) => config,
        Err(err) => {
            error!("{}, using board defaults", err);
            board::default_config()
        }
    };

    let hal_config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(hal_config);

    let control_uart = Uart::new(peripherals.UART0, uart_config(config.control_baud_rate))
        .expect("Failed to initialize control UART")
        .with_tx(peripherals.GPIO43)
        .with_rx(peripherals.GPIO44);
    let control = attach(
        &board::CONTROL,
        control_uart,
        board::control_isr,
        CONTROL_LINK.init(SerialLink::new()),
        LinkId::Control,
    );

    let sensor1 = config.link(SENSOR1_CHANNEL).map(|link| {
        let uart = Uart::new(peripherals.UART1, uart_config(link.baud_rate))
            .expect("Failed to initialize sensor UART1")
            .with_tx(peripherals.GPIO17)
            .with_rx(peripherals.GPIO18);
        attach(
            &board::SENSOR1,
            uart,
            board::sensor1_isr,
            SENSOR1_LINK.init(SerialLink::new()),
            LinkId::Sensor(SENSOR1_CHANNEL),
        )
    });

    let sensor2 = config.link(SENSOR2_CHANNEL).map(|link| {
        let uart = Uart::new(peripherals.UART2, uart_config(link.baud_rate))
            .expect("Failed to initialize sensor UART2")
            .with_tx(peripherals.GPIO15)
            .with_rx(peripherals.GPIO16);
        attach(
            &board::SENSOR2,
            uart,
            board::sensor2_isr,
            SENSOR2_LINK.init(SerialLink::new()),
            LinkId::Sensor(SENSOR2_CHANNEL),
        )
    });

    info!(
        "UARTs up: control at {} baud, sensors at {} baud",
        config.control_baud_rate, SENSOR_BAUD_RATE
    );

    let mut app = Co2Dumper::new(&config, control, sensor1.into_iter().chain(sensor2), EspClock)
        .unwrap_or_else(|err| panic!("{}", err));

    app.run()
}
