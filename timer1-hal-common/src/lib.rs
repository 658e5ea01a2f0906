#![no_std]

use embedded_hal as hal;

#[macro_use]
mod fmt;

pub mod pwm;
pub mod regs;

pub mod prelude {
    pub use crate::hal::pwm::SetDutyCycle as _;

    pub use crate::regs::Registers as _;
}

use cfg_if::cfg_if;

cfg_if! {
    if #[cfg(feature = "atmega32")] {
        /// Data-space addresses of the Timer1 registers.
        ///
        /// ATmega16/32 keep Timer1 in the I/O space, so these are the I/O
        /// addresses plus the 0x20 data-space offset.
        pub mod target_constants {
            pub const TCCR1A: usize = 0x4F;
            pub const TCCR1B: usize = 0x4E;
            pub const TCNT1: usize = 0x4C;
            pub const OCR1A: usize = 0x4A;
            pub const OCR1B: usize = 0x48;
            pub const ICR1: usize = 0x46;
        }

        pub use crate::regs::Volatile;
    }
}

pub use crate::pwm::Pwm;
pub use crate::regs::Recorder;
