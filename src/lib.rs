//! Rewrites the NMEA output of a modern GPS receiver into the fixed-width
//! GGA/RMC/ZDA layout an older radio expects, one byte at a time and without
//! allocation.
//!
//! Everything except the firmware glue in `bin.rs` builds on the host, which is
//! where the tests run.

#![cfg_attr(not(test), no_std)]
#![cfg_attr(feature = "firmware", no_main)]

// This must go first so the macros are visible to the other modules
#[macro_use]
mod fmt;

pub mod bridge;
pub mod nmea;
pub mod rb;
pub mod status;
pub mod tx;

pub use bridge::{Bridge, Stats};

#[cfg(feature = "firmware")]
mod firmware {
    use core::sync::atomic::{AtomicUsize, Ordering};
    use defmt_brtt as _; // global logger

    use panic_probe as _;

    use stm32l4xx_hal as _; // memory layout

    // same panicking *behavior* as `panic-probe` but doesn't print a panic message
    // this prevents the panic message being printed *twice* when `defmt::panic` is invoked
    #[defmt::panic_handler]
    fn panic() -> ! {
        cortex_m::asm::udf()
    }

    static COUNT: AtomicUsize = AtomicUsize::new(0);
    defmt::timestamp!("{=usize}", {
        // NOTE(no-CAS) `timestamps` runs with interrupts disabled
        let n = COUNT.load(Ordering::Relaxed);
        COUNT.store(n + 1, Ordering::Relaxed);
        n
    });
}
