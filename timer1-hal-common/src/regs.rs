//! Access to the Timer1 register file.
//!
//! The PWM driver never touches memory directly. It goes through the
//! [`Registers`] trait, which is implemented by [`Volatile`] for the real
//! peripheral and by [`Recorder`] for host-side testing.

use core::cell::RefCell;
#[cfg(any(feature = "atmega32", test))]
use core::ptr;

use heapless::Vec;

/// The 8-bit control registers.
#[derive(Debug, Eq, PartialEq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControlRegister {
    /// Compare output modes and WGM11:10.
    Tccr1a,
    /// Input capture setup, WGM13:12 and clock select.
    Tccr1b,
}

impl From<ControlRegister> for usize {
    fn from(variant: ControlRegister) -> Self {
        variant as _
    }
}

/// The 16-bit data registers.
#[derive(Debug, Eq, PartialEq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DataRegister {
    /// Counter.
    Tcnt1,
    /// Output compare A.
    Ocr1a,
    /// Output compare B.
    Ocr1b,
    /// Input capture, used as TOP by the ICR1 waveform modes.
    Icr1,
}

impl From<DataRegister> for usize {
    fn from(variant: DataRegister) -> Self {
        variant as _
    }
}

/// Register access capability for one Timer1 instance.
///
/// All methods take `&self`: the registers are memory-mapped state, not owned
/// Rust values.
pub trait Registers {
    fn read_control(&self, reg: ControlRegister) -> u8;

    fn write_control(&self, reg: ControlRegister, value: u8);

    fn read_data(&self, reg: DataRegister) -> u16;

    fn write_data(&self, reg: DataRegister, value: u16);

    /// Read-modify-write of a control register.
    #[inline(always)]
    fn modify_control<F>(&self, reg: ControlRegister, f: F)
    where
        F: FnOnce(u8) -> u8,
    {
        let value = f(self.read_control(reg));
        self.write_control(reg, value);
    }
}

impl<R: Registers> Registers for &R {
    #[inline(always)]
    fn read_control(&self, reg: ControlRegister) -> u8 {
        R::read_control(self, reg)
    }

    #[inline(always)]
    fn write_control(&self, reg: ControlRegister, value: u8) {
        R::write_control(self, reg, value)
    }

    #[inline(always)]
    fn read_data(&self, reg: DataRegister) -> u16 {
        R::read_data(self, reg)
    }

    #[inline(always)]
    fn write_data(&self, reg: DataRegister, value: u16) {
        R::write_data(self, reg, value)
    }
}

#[cfg(feature = "atmega32")]
pub use self::volatile::Volatile;

#[cfg(feature = "atmega32")]
mod volatile {
    use core::ptr;

    use super::{read_u16, write_u16, ControlRegister, DataRegister, Registers};
    use crate::target_constants::{ICR1, OCR1A, OCR1B, TCCR1A, TCCR1B, TCNT1};

    /// Direct volatile access to the Timer1 registers of the running chip.
    #[derive(Debug)]
    pub struct Volatile {
        _private: (),
    }

    impl Volatile {
        /// Creates a handle to the Timer1 register file.
        ///
        /// # Safety
        ///
        /// Only one handle may exist at a time, and nothing else (including
        /// interrupt handlers) may write the Timer1 registers while it is
        /// alive.
        pub unsafe fn steal() -> Self {
            Volatile { _private: () }
        }

        #[inline(always)]
        fn control_addr(reg: ControlRegister) -> *mut u8 {
            match reg {
                ControlRegister::Tccr1a => TCCR1A as *mut u8,
                ControlRegister::Tccr1b => TCCR1B as *mut u8,
            }
        }

        // Address of the low byte. The high byte sits at the next address.
        #[inline(always)]
        fn data_addr(reg: DataRegister) -> *mut u8 {
            match reg {
                DataRegister::Tcnt1 => TCNT1 as *mut u8,
                DataRegister::Ocr1a => OCR1A as *mut u8,
                DataRegister::Ocr1b => OCR1B as *mut u8,
                DataRegister::Icr1 => ICR1 as *mut u8,
            }
        }
    }

    impl Registers for Volatile {
        #[inline(always)]
        fn read_control(&self, reg: ControlRegister) -> u8 {
            unsafe { ptr::read_volatile(Self::control_addr(reg)) }
        }

        #[inline(always)]
        fn write_control(&self, reg: ControlRegister, value: u8) {
            unsafe { ptr::write_volatile(Self::control_addr(reg), value) }
        }

        #[inline(always)]
        fn read_data(&self, reg: DataRegister) -> u16 {
            unsafe { read_u16(Self::data_addr(reg)) }
        }

        #[inline(always)]
        fn write_data(&self, reg: DataRegister, value: u16) {
            unsafe { write_u16(Self::data_addr(reg), value) }
        }
    }
}

/// Reads a 16-bit register whose low byte is at `low` and high byte at
/// `low + 1`. Low byte first: reading it latches the high byte into TEMP.
///
/// # Safety
///
/// `low` and `low + 1` must be valid for volatile reads.
#[cfg(any(feature = "atmega32", test))]
#[inline(always)]
unsafe fn read_u16(low: *mut u8) -> u16 {
    let lo = ptr::read_volatile(low);
    let hi = ptr::read_volatile(low.add(1));
    u16::from_le_bytes([lo, hi])
}

/// Writes a 16-bit register laid out as for [`read_u16`]. High byte first:
/// it is parked in TEMP until the low byte write commits both.
///
/// # Safety
///
/// `low` and `low + 1` must be valid for volatile writes.
#[cfg(any(feature = "atmega32", test))]
#[inline(always)]
unsafe fn write_u16(low: *mut u8, value: u16) {
    let [lo, hi] = value.to_le_bytes();
    ptr::write_volatile(low.add(1), hi);
    ptr::write_volatile(low, lo);
}

/// Number of register writes a [`Recorder`] keeps before it stops logging.
pub const LOG_CAPACITY: usize = 64;

/// A single register write, as seen by a [`Recorder`].
#[derive(Debug, Eq, PartialEq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Access {
    Control(ControlRegister, u8),
    Data(DataRegister, u16),
}

#[derive(Debug, Default)]
struct RegisterFile {
    control: [u8; 2],
    data: [u16; 4],
    log: Vec<Access, LOG_CAPACITY>,
}

/// In-memory Timer1 register file that records every write.
///
/// Registers start out zeroed, like the peripheral after reset. Writes past
/// [`LOG_CAPACITY`] still update the register file but are no longer logged.
#[derive(Debug, Default)]
pub struct Recorder {
    file: RefCell<RegisterFile>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value of a control register.
    pub fn control(&self, reg: ControlRegister) -> u8 {
        self.file.borrow().control[usize::from(reg)]
    }

    /// Current value of a data register.
    pub fn data(&self, reg: DataRegister) -> u16 {
        self.file.borrow().data[usize::from(reg)]
    }

    /// Writes logged so far, oldest first.
    pub fn writes(&self) -> Vec<Access, LOG_CAPACITY> {
        self.file.borrow().log.clone()
    }

    /// Forgets the logged writes but keeps the register contents.
    pub fn clear_log(&self) {
        self.file.borrow_mut().log.clear();
    }

    /// Sets a control register without logging, e.g. to simulate leftover state.
    pub fn preset_control(&self, reg: ControlRegister, value: u8) {
        self.file.borrow_mut().control[usize::from(reg)] = value;
    }

    /// Sets a data register without logging.
    pub fn preset_data(&self, reg: DataRegister, value: u16) {
        self.file.borrow_mut().data[usize::from(reg)] = value;
    }
}

impl Registers for Recorder {
    fn read_control(&self, reg: ControlRegister) -> u8 {
        self.control(reg)
    }

    fn write_control(&self, reg: ControlRegister, value: u8) {
        let mut file = self.file.borrow_mut();
        file.control[usize::from(reg)] = value;
        // A full log only stops recording, the register file stays accurate.
        let _ = file.log.push(Access::Control(reg, value));
    }

    fn read_data(&self, reg: DataRegister) -> u16 {
        self.data(reg)
    }

    fn write_data(&self, reg: DataRegister, value: u16) {
        let mut file = self.file.borrow_mut();
        file.data[usize::from(reg)] = value;
        let _ = file.log.push(Access::Data(reg, value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recorder_starts_zeroed() {
        let regs = Recorder::new();
        assert_eq!(regs.read_control(ControlRegister::Tccr1a), 0);
        assert_eq!(regs.read_control(ControlRegister::Tccr1b), 0);
        assert_eq!(regs.read_data(DataRegister::Icr1), 0);
        assert!(regs.writes().is_empty());
    }

    #[test]
    fn modify_control_merges_bits() {
        let regs = Recorder::new();
        regs.write_control(ControlRegister::Tccr1a, 0b0000_0010);
        regs.modify_control(ControlRegister::Tccr1a, |r| r | 0b1000_0000);
        assert_eq!(regs.control(ControlRegister::Tccr1a), 0b1000_0010);
        assert_eq!(
            &regs.writes()[..],
            &[
                Access::Control(ControlRegister::Tccr1a, 0b0000_0010),
                Access::Control(ControlRegister::Tccr1a, 0b1000_0010),
            ]
        );
    }

    #[test]
    fn full_log_keeps_register_file_current() {
        let regs = Recorder::new();
        for i in 0..(LOG_CAPACITY as u16 + 4) {
            regs.write_data(DataRegister::Ocr1b, i);
        }
        assert_eq!(regs.writes().len(), LOG_CAPACITY);
        assert_eq!(regs.data(DataRegister::Ocr1b), LOG_CAPACITY as u16 + 3);
    }

    #[test]
    fn wide_registers_are_little_endian() {
        let mut buf = [0u8; 2];
        unsafe { write_u16(buf.as_mut_ptr(), 0xA55A) };
        assert_eq!(buf, [0x5A, 0xA5]);

        for value in [0x0000, 0x00FF, 0xFF00, 0x1234, 0xFFFF] {
            unsafe { write_u16(buf.as_mut_ptr(), value) };
            assert_eq!(buf, value.to_le_bytes());
            assert_eq!(unsafe { read_u16(buf.as_mut_ptr()) }, value);
        }
    }

    #[test]
    fn presets_are_not_logged() {
        let regs = Recorder::new();
        regs.preset_control(ControlRegister::Tccr1b, 0xFF);
        regs.preset_data(DataRegister::Tcnt1, 0x1234);
        assert_eq!(regs.control(ControlRegister::Tccr1b), 0xFF);
        assert_eq!(regs.data(DataRegister::Tcnt1), 0x1234);
        assert!(regs.writes().is_empty());
    }
}
