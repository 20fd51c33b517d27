//! Binds esp-hal UARTs to the core serial links
//!
//! Each UART lives together with the interrupt side of its [`SerialLink`] in
//! a [`LinkSlot`], a critical-section mutex shared by the interrupt handler
//! and the main loop's [`LinkArm`]. The receive FIFO threshold is one byte,
//! so every arriving byte raises an interrupt. The chip has no "transmit
//! register empty" interrupt that fits the link model, so transmit-ready is
//! emulated with `TxDone`: the handler refills the FIFO whenever it drains.
//!
//! [`SerialLink`]: co2dump_core::SerialLink

use core::cell::RefCell;

use co2dump_core::{LinkId, SerialIrq, SerialLink, SerialPort, TransmitArm, UartRegisters};
use critical_section::Mutex;
use esp_hal::Blocking;
use esp_hal::interrupt::InterruptHandler;
use esp_hal::uart::{Config as UartConfig, RxConfig, Uart, UartInterrupt};

pub type LinkSlot = Mutex<RefCell<Option<IrqLink>>>;

pub const fn empty_slot() -> LinkSlot {
    Mutex::new(RefCell::new(None))
}

/// 8N1 at `baud_rate`, interrupting on every received byte
pub fn uart_config(baud_rate: u32) -> UartConfig {
    UartConfig::default()
        .with_baudrate(baud_rate)
        .with_rx(RxConfig::default().with_fifo_full_threshold(1))
}

/// Interrupt-side state of one UART
pub struct IrqLink {
    uart: Uart<'static, Blocking>,
    irq: SerialIrq<'static>,
}

impl IrqLink {
    fn service(&mut self) {
        let pending = self.uart.interrupts();

        let mut buf = [0u8; 16];
        while let Ok(received) = self.uart.read_buffered(&mut buf) {
            if received == 0 {
                break;
            }
            for &byte in &buf[..received] {
                self.irq.on_byte_received(byte);
            }
        }

        if self.irq.is_transmit_armed() {
            let mut registers = Registers(&mut self.uart);
            while registers.0.write_ready() && self.irq.on_transmit_ready(&mut registers) {}
        }

        self.uart.clear_interrupts(pending);
    }
}

struct Registers<'u>(&'u mut Uart<'static, Blocking>);

impl UartRegisters for Registers<'_> {
    fn write_data(&mut self, byte: u8) {
        // only called after write_ready(), so the FIFO has room
        let _ = self.0.write(&[byte]);
    }

    fn set_transmitter_enabled(&mut self, enabled: bool) {
        if enabled {
            self.0.listen(UartInterrupt::TxDone);
        } else {
            self.0.unlisten(UartInterrupt::TxDone);
        }
    }
}

/// Starts a transmission from the main loop
#[derive(Clone, Copy)]
pub struct LinkArm {
    slot: &'static LinkSlot,
}

impl TransmitArm for LinkArm {
    fn arm(&mut self) {
        critical_section::with(|cs| {
            if let Some(link) = self.slot.borrow_ref_mut(cs).as_mut() {
                link.uart.clear_interrupts(UartInterrupt::TxDone.into());
                link.uart.listen(UartInterrupt::TxDone);
                // prime the FIFO; TxDone keeps it topped up afterwards
                link.service();
            }
        });
    }
}

/// Body of every UART interrupt handler
pub fn service(slot: &LinkSlot) {
    critical_section::with(|cs| {
        if let Some(link) = slot.borrow_ref_mut(cs).as_mut() {
            link.service();
        }
    });
}

/// Splits `link`, parks its interrupt side together with `uart` in `slot` and
/// enables the receive interrupt.
pub fn attach(
    slot: &'static LinkSlot,
    mut uart: Uart<'static, Blocking>,
    handler: InterruptHandler,
    link: &'static mut SerialLink,
    id: LinkId,
) -> SerialPort<'static, LinkArm> {
    let (port, irq) = link.split(id, LinkArm { slot });
    uart.set_interrupt_handler(handler);

    critical_section::with(|cs| {
        uart.listen(UartInterrupt::RxFifoFull);
        slot.replace(cs, Some(IrqLink { uart, irq }));
    });

    log::debug!("{} attached", id);
    port
}
