#![no_std]

pub use embedded_hal as hal;
pub use timer1_hal_common::*;

pub mod prelude {
    pub use timer1_hal_common::prelude::*;
}

pub use crate::pwm::Pwm;

/// Timer1 PWM driver bound to the on-chip registers.
pub type Timer1Pwm = Pwm<Volatile>;

/// Takes the Timer1 registers and wraps them in a PWM driver.
///
/// # Safety
///
/// Must be called at most once; see [`Volatile::steal`].
pub unsafe fn timer1() -> Timer1Pwm {
    Pwm::new(Volatile::steal())
}
