#![no_main]
#![no_std]

use gps_bridge as _;

use core::sync::atomic::{AtomicUsize, Ordering};
use cortex_m::peripheral::NVIC;
use defmt::{info, trace, warn};
use gps_bridge::{
    rb::{Consumer, Producer, Ringbuf},
    status::{Lamps, StatusLeds},
    tx::{TxDrain, TxSlot},
    Bridge,
};
use stm32l4xx_hal::{
    gpio::{Alternate, Output, PushPull, PA2, PA3, PB0, PB1, PB4, PB5},
    hal::serial::Read as _,
    pac::{Interrupt, LPUART1},
    prelude::*,
    serial::{self, Config, Serial},
};

type LpUart1 = Serial<LPUART1, (PA2<Alternate<PushPull, 8>>, PA3<Alternate<PushPull, 8>>)>;

type Leds = StatusLeds<
    PB0<Output<PushPull>>,
    PB1<Output<PushPull>>,
    PB4<Output<PushPull>>,
    PB5<Output<PushPull>>,
>;

struct UartStuff {
    uart: LpUart1,
    rx_send: Producer<u8, UART_RX_BUFSIZE>,
    tx_drain: TxDrain,
}

// Both the GPS and the radio talk 9600 8N1
const UART_BAUD: u32 = 9600;
// ~16 ms of input at 9600 baud, plenty to cover the longest field resize
const UART_RX_BUFSIZE: usize = 16;
// Log counters every this many forwarded sentences
const STATS_EVERY: u32 = 64;

static UART_RX_COUNTER: AtomicUsize = AtomicUsize::new(0);
static UART_RX_OVERRUN: AtomicUsize = AtomicUsize::new(0);

/// Runs the UART handler so it pushes the first byte of a freshly loaded
/// sentence; the transmitter-empty event takes it from there.
fn kick_uart() {
    NVIC::pend(Interrupt::LPUART1);
}

#[rtic::app(device = stm32l4xx_hal::pac)]
mod app {

    use super::*;

    // Shared resources go here
    #[shared]
    struct Shared {}

    // Local resources go here
    #[local]
    struct Local {
        uart: UartStuff,
        bridge: Bridge,
        rx_recv: Consumer<u8, UART_RX_BUFSIZE>,
        leds: Leds,
    }

    #[init]
    fn init(cx: init::Context) -> (Shared, Local) {
        trace!("init enter");

        let mut flash = cx.device.FLASH.constrain();
        let mut rcc = cx.device.RCC.constrain();
        let mut pwr = cx.device.PWR.constrain(&mut rcc.apb1r1);
        let clocks = rcc.cfgr.freeze(&mut flash.acr, &mut pwr);

        let mut gpioa = cx.device.GPIOA.split(&mut rcc.ahb2);
        let mut gpiob = cx.device.GPIOB.split(&mut rcc.ahb2);

        // Initialize UART shared by the GPS (RX) and the radio (TX)
        let tx = gpioa
            .pa2
            .into_alternate(&mut gpioa.moder, &mut gpioa.otyper, &mut gpioa.afrl);
        let rx = gpioa
            .pa3
            .into_alternate(&mut gpioa.moder, &mut gpioa.otyper, &mut gpioa.afrl);

        let mut uart = Serial::lpuart1(
            cx.device.LPUART1,
            (tx, rx),
            Config::default().baudrate(UART_BAUD.bps()),
            clocks,
            &mut rcc.apb1r2,
        );
        uart.listen(serial::Event::Rxne);

        // Status LEDs, all off until the first sentence arrives
        let mut leds = StatusLeds {
            gga_valid: gpiob
                .pb0
                .into_push_pull_output(&mut gpiob.moder, &mut gpiob.otyper),
            gga_invalid: gpiob
                .pb1
                .into_push_pull_output(&mut gpiob.moder, &mut gpiob.otyper),
            rmc_valid: gpiob
                .pb4
                .into_push_pull_output(&mut gpiob.moder, &mut gpiob.otyper),
            rmc_invalid: gpiob
                .pb5
                .into_push_pull_output(&mut gpiob.moder, &mut gpiob.otyper),
        };
        let _ = leds.show(Lamps::default());

        // Create the handoffs between the main loop and the UART interrupt
        static UART_RX: Ringbuf<u8, UART_RX_BUFSIZE> = Ringbuf::new();
        let (rx_send, rx_recv) = UART_RX.try_split().unwrap();
        static UART_TX: TxSlot = TxSlot::new(Some(kick_uart));
        let (tx_load, tx_drain) = UART_TX.try_split().unwrap();

        info!("done initializing!");
        trace!("init exit");
        (
            Shared {},
            Local {
                uart: UartStuff {
                    uart,
                    rx_send,
                    tx_drain,
                },
                bridge: Bridge::new(tx_load),
                rx_recv,
                leds,
            },
        )
    }

    // The main loop: never sleeps, takes at most one byte per iteration
    #[idle(local = [bridge, rx_recv, leds])]
    fn idle(cx: idle::Context) -> ! {
        trace!("idle enter");

        let bridge = cx.local.bridge;
        let mut lamps = Lamps::default();
        let mut reported = 0;

        loop {
            bridge.poll(cx.local.rx_recv.try_read());

            if bridge.lamps() != lamps {
                lamps = bridge.lamps();
                let _ = cx.local.leds.show(lamps);
            }

            let stats = bridge.stats();
            if stats.forwarded != reported && stats.forwarded % STATS_EVERY == 0 {
                reported = stats.forwarded;
                info!(
                    "{}, rx {} bytes, {} overruns",
                    stats,
                    UART_RX_COUNTER.load(Ordering::Relaxed),
                    UART_RX_OVERRUN.load(Ordering::Relaxed),
                );
            }
        }
    }

    ////////////////////////////////////////////////////////////////////////////
    // Hardware interrupt handlers /////////////////////////////////////////////
    ////////////////////////////////////////////////////////////////////////////

    // Move one byte each way between the UART and the handoffs
    #[task(binds = LPUART1, priority = 10, local = [uart])]
    fn on_uart(cx: on_uart::Context) {
        let UartStuff {
            uart,
            rx_send,
            tx_drain,
        } = cx.local.uart;

        // Rxne
        match uart.read() {
            Ok(b) => {
                UART_RX_COUNTER.fetch_add(1, Ordering::Relaxed);
                // If the main loop fell behind, drop the received value
                if rx_send.try_write(b).is_err() {
                    UART_RX_OVERRUN.fetch_add(1, Ordering::Relaxed);
                    warn!("rx mailbox full");
                }
            }
            Err(nb::Error::WouldBlock) => (),
            Err(nb::Error::Other(e)) => {
                UART_RX_OVERRUN.fetch_add(1, Ordering::Relaxed);
                warn!("uart rx error: {}", defmt::Debug2Format(&e));
            }
        }

        // Txe
        if tx_drain.service(uart) {
            uart.listen(serial::Event::Txe);
        } else {
            uart.unlisten(serial::Event::Txe);
        }
    }
}
