//! Interrupt-driven serial link
//!
//! A [`SerialLink`] bundles the receive and transmit rings of one UART plus
//! its "transmitter armed" flag. Splitting it yields two handles:
//!
//! - [`SerialPort`], used by the main loop: reads received bytes, queues bytes
//!   for transmission and arms the transmitter.
//! - [`SerialIrq`], used by the interrupt handlers: stores arrived bytes and
//!   feeds the transmit register until the queue runs dry, at which point it
//!   switches the transmitter off again.
//!
//! No locks are taken after the split. Each ring has exactly one writer and
//! one reader, which is all the synchronisation the SPSC rings need.

use core::sync::atomic::{AtomicBool, Ordering};

use crate::channel::LinkId;
use crate::ring_buffer::{BUFFER_CAPACITY, Consumer, Producer, RingBuffer};

/// Register-level access used from the transmit-ready interrupt
pub trait UartRegisters {
    /// Hands one byte to the transmit data register.
    fn write_data(&mut self, byte: u8);

    /// Enables or disables the transmitter and its transmit-ready interrupt.
    fn set_transmitter_enabled(&mut self, enabled: bool);
}

/// Starts transmission on a link from the main context.
///
/// Implementations must clear any pending "transmit complete" status and
/// enable the transmit-ready interrupt. Calling this while a transmission is
/// already running must not disturb it.
pub trait TransmitArm {
    fn arm(&mut self);
}

impl<T: TransmitArm + ?Sized> TransmitArm for &mut T {
    fn arm(&mut self) {
        (**self).arm();
    }
}

/// Storage for one serial link. Lives for the whole program, usually in a
/// `static`.
pub struct SerialLink<const N: usize = BUFFER_CAPACITY> {
    rx: RingBuffer<N>,
    tx: RingBuffer<N>,
    armed: AtomicBool,
}

impl<const N: usize> SerialLink<N> {
    pub const fn new() -> Self {
        Self {
            rx: RingBuffer::new(),
            tx: RingBuffer::new(),
            armed: AtomicBool::new(false),
        }
    }

    /// Resets the link and splits it into its main-loop and interrupt handles.
    ///
    /// This is the only place interrupts are masked.
    pub fn split<A: TransmitArm>(
        &mut self,
        id: LinkId,
        arm: A,
    ) -> (SerialPort<'_, A, N>, SerialIrq<'_, N>) {
        critical_section::with(|_| {
            self.rx.reset();
            self.tx.reset();
            *self.armed.get_mut() = false;
        });

        let (rx_producer, rx_consumer) = self.rx.split();
        let (tx_producer, tx_consumer) = self.tx.split();
        let armed = &self.armed;

        (
            SerialPort {
                id,
                rx: rx_consumer,
                tx: tx_producer,
                armed,
                arm,
            },
            SerialIrq {
                id,
                rx: rx_producer,
                tx: tx_consumer,
                armed,
            },
        )
    }
}

impl<const N: usize> Default for SerialLink<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Main-loop side of a serial link
pub struct SerialPort<'a, A, const N: usize = BUFFER_CAPACITY> {
    id: LinkId,
    rx: Consumer<'a, N>,
    tx: Producer<'a, N>,
    armed: &'a AtomicBool,
    arm: A,
}

impl<'a, A: TransmitArm, const N: usize> SerialPort<'a, A, N> {
    pub fn id(&self) -> LinkId {
        self.id
    }

    /// Received bytes not yet consumed
    pub fn rx(&mut self) -> &mut Consumer<'a, N> {
        &mut self.rx
    }

    /// Bytes waiting to be transmitted
    pub fn tx(&mut self) -> &mut Producer<'a, N> {
        &mut self.tx
    }

    /// Queues `bytes` for transmission without arming the transmitter.
    ///
    /// Returns how many bytes fit into the transmit ring.
    pub fn queue(&mut self, bytes: &[u8]) -> usize {
        self.tx.write_bytes(bytes)
    }

    /// Starts draining the transmit ring.
    pub fn arm_transmit(&mut self) {
        self.armed.store(true, Ordering::Release);
        self.arm.arm();
    }

    pub fn is_transmit_armed(&self) -> bool {
        self.armed.load(Ordering::Acquire)
    }
}

/// Interrupt side of a serial link
pub struct SerialIrq<'a, const N: usize = BUFFER_CAPACITY> {
    id: LinkId,
    rx: Producer<'a, N>,
    tx: Consumer<'a, N>,
    armed: &'a AtomicBool,
}

impl<const N: usize> SerialIrq<'_, N> {
    pub fn id(&self) -> LinkId {
        self.id
    }

    /// Byte-arrived interrupt. Drops the byte if the receive ring is full.
    #[inline]
    pub fn on_byte_received(&mut self, byte: u8) {
        self.rx.write_byte(byte);
    }

    /// Transmit-ready interrupt.
    ///
    /// Moves the next queued byte into the data register and returns `true`,
    /// or disables the transmitter and returns `false` once the queue is empty.
    #[inline]
    pub fn on_transmit_ready<R: UartRegisters + ?Sized>(&mut self, registers: &mut R) -> bool {
        match self.tx.read_byte() {
            Some(byte) => {
                registers.write_data(byte);
                true
            }
            None => {
                registers.set_transmitter_enabled(false);
                self.armed.store(false, Ordering::Release);
                false
            }
        }
    }

    pub fn is_transmit_armed(&self) -> bool {
        self.armed.load(Ordering::Acquire)
    }

    /// Bytes still queued for transmission
    pub fn pending_transmit(&self) -> usize {
        self.tx.available()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::Channel;

    #[derive(Default)]
    struct FakeUart {
        sent: Vec<u8>,
        enabled: bool,
    }

    impl UartRegisters for FakeUart {
        fn write_data(&mut self, byte: u8) {
            assert!(self.enabled, "write to a disabled transmitter");
            self.sent.push(byte);
        }

        fn set_transmitter_enabled(&mut self, enabled: bool) {
            self.enabled = enabled;
        }
    }

    #[derive(Default)]
    struct CountingArm(usize);

    impl TransmitArm for CountingArm {
        fn arm(&mut self) {
            self.0 += 1;
        }
    }

    #[test]
    fn test_received_bytes_reach_main_loop() {
        let mut link = SerialLink::<16>::new();
        let (mut port, mut irq) = link.split(LinkId::Control, CountingArm::default());

        for byte in b"hi" {
            irq.on_byte_received(*byte);
        }

        assert_eq!(port.rx().read_byte(), Some(b'h'));
        assert_eq!(port.rx().read_byte(), Some(b'i'));
        assert_eq!(port.rx().read_byte(), None);
    }

    #[test]
    fn test_transmitter_drains_then_quiesces() {
        let mut link = SerialLink::<16>::new();
        let mut arm = CountingArm::default();
        let channel = Channel::new(2).unwrap();
        let (mut port, mut irq) = link.split(LinkId::Sensor(channel), &mut arm);

        assert_eq!(port.queue(b"abc"), 3);
        port.arm_transmit();
        assert!(irq.is_transmit_armed());

        let mut uart = FakeUart { enabled: true, ..Default::default() };
        while irq.on_transmit_ready(&mut uart) {}

        assert_eq!(uart.sent, b"abc");
        assert!(!uart.enabled, "empty queue must switch the transmitter off");
        assert!(!port.is_transmit_armed());
        assert_eq!(irq.pending_transmit(), 0);
        drop(port);
        assert_eq!(arm.0, 1);
    }

    #[test]
    fn test_rearming_resumes_transmission() {
        let mut link = SerialLink::<16>::new();
        let (mut port, mut irq) = link.split(LinkId::Control, CountingArm::default());
        let mut uart = FakeUart { enabled: true, ..Default::default() };

        port.queue(b"1");
        port.arm_transmit();
        while irq.on_transmit_ready(&mut uart) {}

        port.queue(b"2");
        port.arm_transmit();
        uart.set_transmitter_enabled(true);
        while irq.on_transmit_ready(&mut uart) {}

        assert_eq!(uart.sent, b"12");
    }

    #[test]
    fn test_receive_overflow_drops_newest() {
        let mut link = SerialLink::<8>::new();
        let (mut port, mut irq) = link.split(LinkId::Control, CountingArm::default());

        for byte in 0..10u8 {
            irq.on_byte_received(byte);
        }

        let received: Vec<u8> = core::iter::from_fn(|| port.rx().read_byte()).collect();
        assert_eq!(received, [0, 1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_split_resets_previous_contents() {
        let mut link = SerialLink::<8>::new();
        {
            let (_port, mut irq) = link.split(LinkId::Control, CountingArm::default());
            irq.on_byte_received(1);
        }
        let (mut port, _irq) = link.split(LinkId::Control, CountingArm::default());
        assert!(port.rx().is_empty());
    }
}
