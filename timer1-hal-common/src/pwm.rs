//! HAL interface to the Timer1 PWM generator.
//!
//! Timer1 is a 16-bit timer/counter with two output compare units driving the
//! OC1A and OC1B pins. This module configures it for Fast PWM or
//! Phase-Correct PWM and loads the compare and TOP registers.
//!
//! The OC1A/OC1B pins must be configured as outputs separately before the
//! waveform shows up on the pins.

use core::cell::Cell;
use core::fmt;

use crate::regs::{ControlRegister, DataRegister, Registers};

/// TCCR1A / TCCR1B bit positions.
mod bits {
    // TCCR1A
    pub const COM1A_SHIFT: u8 = 6;
    pub const COM1B_SHIFT: u8 = 4;
    pub const WGM11: u8 = 1 << 1;
    pub const WGM10: u8 = 1 << 0;

    // TCCR1B
    pub const WGM13: u8 = 1 << 4;
    pub const WGM12: u8 = 1 << 3;
    pub const CS_MASK: u8 = 0b111;
}

/// Smallest TOP the hardware allows for the ICR1/OCR1A waveform modes.
pub const MIN_TOP: u16 = 0x0003;

/// A safe wrapper around the Timer1 registers.
///
/// Creating it does not touch the hardware; call
/// [`init_fast_pwm`](Pwm::init_fast_pwm) or
/// [`init_phase_correct_pwm`](Pwm::init_phase_correct_pwm) to start a
/// waveform. Either may be called again at any time to switch modes.
///
/// The driver provides no locking. If an interrupt handler also touches
/// Timer1, disable interrupts around initialization.
#[derive(Debug)]
pub struct Pwm<R: Registers> {
    regs: R,
    waveform: Cell<Option<Waveform>>,
}

impl<R> Pwm<R>
where
    R: Registers,
{
    /// Takes ownership of the register interface.
    pub fn new(regs: R) -> Pwm<R> {
        Self {
            regs,
            waveform: Cell::new(None),
        }
    }

    /// Starts Timer1 in Fast PWM mode.
    ///
    /// `top` is only written for [`FastMode::Top`] and is ignored otherwise.
    /// Nothing is validated, see [`try_init_fast_pwm`](Pwm::try_init_fast_pwm).
    pub fn init_fast_pwm(
        &self,
        prescaler: Prescaler,
        mode: FastMode,
        output_a: OutputMode,
        output_b: OutputMode,
        top: u16,
    ) -> &Self {
        self.init(prescaler, Waveform::Fast(mode), output_a, output_b, top)
    }

    /// Starts Timer1 in Phase-Correct (or Phase and Frequency Correct) PWM mode.
    ///
    /// `top` is only written for the ICR1/OCR1A sub-modes and is ignored otherwise.
    pub fn init_phase_correct_pwm(
        &self,
        prescaler: Prescaler,
        mode: PhaseMode,
        output_a: OutputMode,
        output_b: OutputMode,
        top: u16,
    ) -> &Self {
        self.init(
            prescaler,
            Waveform::PhaseCorrect(mode),
            output_a,
            output_b,
            top,
        )
    }

    /// Like [`init_fast_pwm`](Pwm::init_fast_pwm), but rejects combinations
    /// that would not produce the requested waveform. Registers are left
    /// untouched on error.
    pub fn try_init_fast_pwm(
        &self,
        prescaler: Prescaler,
        mode: FastMode,
        output_a: OutputMode,
        output_b: OutputMode,
        top: u16,
    ) -> Result<&Self, Error> {
        self.try_init(prescaler, Waveform::Fast(mode), output_a, output_b, top)
    }

    /// Checked counterpart of [`init_phase_correct_pwm`](Pwm::init_phase_correct_pwm).
    pub fn try_init_phase_correct_pwm(
        &self,
        prescaler: Prescaler,
        mode: PhaseMode,
        output_a: OutputMode,
        output_b: OutputMode,
        top: u16,
    ) -> Result<&Self, Error> {
        self.try_init(
            prescaler,
            Waveform::PhaseCorrect(mode),
            output_a,
            output_b,
            top,
        )
    }

    fn try_init(
        &self,
        prescaler: Prescaler,
        waveform: Waveform,
        output_a: OutputMode,
        output_b: OutputMode,
        top: u16,
    ) -> Result<&Self, Error> {
        waveform
            .validate(output_a, output_b, top)
            .inspect_err(|e| warn!("timer1: rejected {} ({})", waveform, e))?;
        Ok(self.init(prescaler, waveform, output_a, output_b, top))
    }

    // Counter reset, then mode bits (and TOP), then output bits, then the
    // clock. The prescaler write is what starts the counter.
    fn init(
        &self,
        prescaler: Prescaler,
        waveform: Waveform,
        output_a: OutputMode,
        output_b: OutputMode,
        top: u16,
    ) -> &Self {
        self.regs.write_data(DataRegister::Tcnt1, 0);

        let (tccr1a, tccr1b) = waveform.wgm_bits();
        self.regs.write_control(ControlRegister::Tccr1a, tccr1a);
        self.regs.write_control(ControlRegister::Tccr1b, tccr1b);
        if let Some(reg) = waveform.top_register() {
            self.regs.write_data(reg.into(), top);
        }

        let com = output_a.com1a() | output_b.com1b();
        let clock = prescaler.bits();
        self.regs.modify_control(ControlRegister::Tccr1a, |r| r | com);
        self.regs.modify_control(ControlRegister::Tccr1b, |r| r | clock);

        self.waveform.set(Some(waveform));
        debug!(
            "timer1: {} A={} B={} clk={}",
            waveform,
            output_a,
            output_b,
            prescaler
        );
        self
    }

    /// Loads the channel A compare register (OCR1A).
    #[inline(always)]
    pub fn set_compare_a(&self, value: u16) -> &Self {
        self.regs.write_data(DataRegister::Ocr1a, value);
        self
    }

    /// Loads the channel B compare register (OCR1B).
    #[inline(always)]
    pub fn set_compare_b(&self, value: u16) -> &Self {
        self.regs.write_data(DataRegister::Ocr1b, value);
        self
    }

    /// Loads ICR1, the TOP of the ICR1 waveform modes.
    #[inline(always)]
    pub fn set_top(&self, value: u16) -> &Self {
        self.regs.write_data(DataRegister::Icr1, value);
        self
    }

    /// Loads the compare register of a channel.
    #[inline(always)]
    pub fn set_compare(&self, channel: Channel, value: u16) -> &Self {
        self.regs.write_data(channel.compare_register(), value);
        self
    }

    /// Returns the compare register of a channel.
    #[inline(always)]
    pub fn compare(&self, channel: Channel) -> u16 {
        self.regs.read_data(channel.compare_register())
    }

    /// Changes only the clock select bits.
    ///
    /// Use [`Prescaler::NoClock`] (or [`stop`](Pwm::stop)) to freeze the
    /// counter and any other value to resume it without re-initializing.
    pub fn set_prescaler(&self, prescaler: Prescaler) -> &Self {
        self.regs.modify_control(ControlRegister::Tccr1b, |r| {
            (r & !bits::CS_MASK) | prescaler.bits()
        });
        trace!("timer1: clk={}", prescaler);
        self
    }

    /// Returns the current clock selection.
    #[inline(always)]
    pub fn prescaler(&self) -> Prescaler {
        Prescaler::from_bits(self.regs.read_control(ControlRegister::Tccr1b))
    }

    /// Stops the counter. Outputs hold their current level.
    #[inline(always)]
    pub fn stop(&self) -> &Self {
        self.set_prescaler(Prescaler::NoClock)
    }

    /// Returns the waveform set up by the last init call, if any.
    #[inline(always)]
    pub fn waveform(&self) -> Option<Waveform> {
        self.waveform.get()
    }

    /// Returns the current TOP, i.e. the largest useful compare value.
    ///
    /// Before any init call the counter runs as a plain 16-bit timer and
    /// this is `0xFFFF`.
    pub fn max_duty(&self) -> u16 {
        match self.waveform.get().map(Waveform::top) {
            None => 0xFFFF,
            Some(Top::Fixed(top)) => top,
            Some(Top::Register(reg)) => self.regs.read_data(reg.into()),
        }
    }

    /// Returns individual handles to the two PWM channels.
    #[inline(always)]
    pub fn split_channels(&self) -> (PwmChannel<'_, R>, PwmChannel<'_, R>) {
        (
            PwmChannel::new(self, Channel::A),
            PwmChannel::new(self, Channel::B),
        )
    }

    /// Consumes `self` and returns back the register interface.
    pub fn free(self) -> R {
        self.regs
    }
}

/// PWM channel
#[derive(Debug)]
pub struct PwmChannel<'a, R: Registers> {
    pwm: &'a Pwm<R>,
    channel: Channel,
}

impl<'a, R: Registers> PwmChannel<'a, R> {
    pub fn new(pwm: &'a Pwm<R>, channel: Channel) -> Self {
        Self { pwm, channel }
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    pub fn max_duty(&self) -> u16 {
        self.pwm.max_duty()
    }

    /// Writes the compare register. Values above [`max_duty`](Self::max_duty)
    /// keep the output at its match level for the whole period.
    pub fn set_duty(&self, duty: u16) {
        self.pwm.set_compare(self.channel, duty);
    }

    pub fn duty(&self) -> u16 {
        self.pwm.compare(self.channel)
    }

    // OCR1A doubles as TOP in the OCR1A waveform modes.
    fn holds_top(&self) -> bool {
        self.channel == Channel::A
            && self.pwm.waveform().and_then(Waveform::top_register) == Some(TopRegister::Ocr1a)
    }
}

impl<'a, R: Registers> embedded_hal::pwm::ErrorType for PwmChannel<'a, R> {
    type Error = Error;
}

impl<'a, R: Registers> embedded_hal::pwm::SetDutyCycle for PwmChannel<'a, R> {
    fn max_duty_cycle(&self) -> u16 {
        self.max_duty()
    }

    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Self::Error> {
        if self.holds_top() {
            return Err(Error::CompareHoldsTop);
        }
        self.set_duty(duty);
        Ok(())
    }
}

/// Output compare channel.
#[derive(Debug, Eq, PartialEq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Channel {
    /// OC1A, compared against OCR1A.
    A,
    /// OC1B, compared against OCR1B.
    B,
}

impl Channel {
    fn compare_register(self) -> DataRegister {
        match self {
            Channel::A => DataRegister::Ocr1a,
            Channel::B => DataRegister::Ocr1b,
        }
    }
}

/// Timer1 clock source (CS12:0).
#[derive(Debug, Eq, PartialEq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Prescaler {
    /// Timer stopped.
    NoClock,
    /// clk_io, no prescaling.
    Direct,
    Div8,
    Div64,
    Div256,
    Div1024,
    /// External clock on T1, falling edge.
    ExternalFalling,
    /// External clock on T1, rising edge.
    ExternalRising,
}

impl Prescaler {
    /// Clock select field value.
    pub const fn bits(self) -> u8 {
        match self {
            Prescaler::NoClock => 0b000,
            Prescaler::Direct => 0b001,
            Prescaler::Div8 => 0b010,
            Prescaler::Div64 => 0b011,
            Prescaler::Div256 => 0b100,
            Prescaler::Div1024 => 0b101,
            Prescaler::ExternalFalling => 0b110,
            Prescaler::ExternalRising => 0b111,
        }
    }

    /// Decodes the clock select field, ignoring the other TCCR1B bits.
    pub const fn from_bits(tccr1b: u8) -> Prescaler {
        match tccr1b & bits::CS_MASK {
            0b000 => Prescaler::NoClock,
            0b001 => Prescaler::Direct,
            0b010 => Prescaler::Div8,
            0b011 => Prescaler::Div64,
            0b100 => Prescaler::Div256,
            0b101 => Prescaler::Div1024,
            0b110 => Prescaler::ExternalFalling,
            _ => Prescaler::ExternalRising,
        }
    }
}

/// Compare output mode of a channel (COM1x1:0).
#[derive(Debug, Eq, PartialEq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OutputMode {
    /// Normal port operation, the pin is not driven by the timer.
    Disconnected,
    /// Toggle on compare match.
    Toggle,
    /// Clear on compare match, set at BOTTOM (Fast) or when down-counting
    /// (Phase-Correct).
    NonInverting,
    /// Set on compare match.
    Inverting,
}

impl OutputMode {
    /// COM1x field value.
    pub const fn bits(self) -> u8 {
        match self {
            OutputMode::Disconnected => 0b00,
            OutputMode::Toggle => 0b01,
            OutputMode::NonInverting => 0b10,
            OutputMode::Inverting => 0b11,
        }
    }

    const fn com1a(self) -> u8 {
        self.bits() << bits::COM1A_SHIFT
    }

    const fn com1b(self) -> u8 {
        self.bits() << bits::COM1B_SHIFT
    }
}

/// Register a software-defined TOP is loaded into.
#[derive(Debug, Eq, PartialEq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TopRegister {
    Icr1,
    /// Channel A's compare register. Channel A can then not produce a
    /// duty cycle of its own.
    Ocr1a,
}

impl From<TopRegister> for DataRegister {
    fn from(variant: TopRegister) -> Self {
        match variant {
            TopRegister::Icr1 => DataRegister::Icr1,
            TopRegister::Ocr1a => DataRegister::Ocr1a,
        }
    }
}

/// Fast PWM counting resolution.
#[derive(Debug, Eq, PartialEq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FastMode {
    /// TOP = 0x00FF
    Bits8,
    /// TOP = 0x01FF
    Bits9,
    /// TOP = 0x03FF
    Bits10,
    /// TOP loaded from software into the given register.
    Top(TopRegister),
}

impl FastMode {
    pub const ALL: [FastMode; 5] = [
        FastMode::Bits8,
        FastMode::Bits9,
        FastMode::Bits10,
        FastMode::Top(TopRegister::Icr1),
        FastMode::Top(TopRegister::Ocr1a),
    ];
}

/// Phase-Correct PWM counting resolution.
#[derive(Debug, Eq, PartialEq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PhaseMode {
    /// TOP = 0x00FF
    Bits8,
    /// TOP = 0x01FF
    Bits9,
    /// TOP = 0x03FF
    Bits10,
    /// TOP loaded from software into the given register.
    Top(TopRegister),
    /// Phase and Frequency Correct: TOP and compare values are updated at
    /// BOTTOM instead of TOP, keeping the period symmetric when it changes.
    FrequencyCorrect(TopRegister),
}

impl PhaseMode {
    pub const ALL: [PhaseMode; 7] = [
        PhaseMode::Bits8,
        PhaseMode::Bits9,
        PhaseMode::Bits10,
        PhaseMode::Top(TopRegister::Icr1),
        PhaseMode::Top(TopRegister::Ocr1a),
        PhaseMode::FrequencyCorrect(TopRegister::Ocr1a),
        PhaseMode::FrequencyCorrect(TopRegister::Icr1),
    ];
}

/// A complete waveform generation mode.
#[derive(Debug, Eq, PartialEq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Waveform {
    Fast(FastMode),
    PhaseCorrect(PhaseMode),
}

#[derive(Debug, Eq, PartialEq, Clone, Copy)]
enum Top {
    Fixed(u16),
    Register(TopRegister),
}

impl Waveform {
    /// WGM bits as `(TCCR1A, TCCR1B)`, all other bits clear.
    pub const fn wgm_bits(self) -> (u8, u8) {
        use self::bits::*;

        match self {
            Waveform::Fast(mode) => match mode {
                FastMode::Bits8 => (WGM10, WGM12),
                FastMode::Bits9 => (WGM11, WGM12),
                FastMode::Bits10 => (WGM11 | WGM10, WGM12),
                FastMode::Top(_) => (WGM11, WGM13 | WGM12),
            },
            Waveform::PhaseCorrect(mode) => match mode {
                PhaseMode::Bits8 => (WGM10, 0),
                PhaseMode::Bits9 => (WGM11, 0),
                PhaseMode::Bits10 => (WGM11 | WGM10, 0),
                PhaseMode::Top(_) => (WGM11, WGM13),
                PhaseMode::FrequencyCorrect(_) => (0, WGM13),
            },
        }
    }

    /// Register holding TOP, or `None` for the fixed resolutions.
    pub fn top_register(self) -> Option<TopRegister> {
        match self.top() {
            Top::Register(reg) => Some(reg),
            Top::Fixed(_) => None,
        }
    }

    fn top(self) -> Top {
        match self {
            Waveform::Fast(FastMode::Bits8) | Waveform::PhaseCorrect(PhaseMode::Bits8) => {
                Top::Fixed(0x00FF)
            }
            Waveform::Fast(FastMode::Bits9) | Waveform::PhaseCorrect(PhaseMode::Bits9) => {
                Top::Fixed(0x01FF)
            }
            Waveform::Fast(FastMode::Bits10) | Waveform::PhaseCorrect(PhaseMode::Bits10) => {
                Top::Fixed(0x03FF)
            }
            Waveform::Fast(FastMode::Top(reg))
            | Waveform::PhaseCorrect(PhaseMode::Top(reg))
            | Waveform::PhaseCorrect(PhaseMode::FrequencyCorrect(reg)) => Top::Register(reg),
        }
    }

    fn validate(self, output_a: OutputMode, output_b: OutputMode, top: u16) -> Result<(), Error> {
        let top_in_ocr1a = match self.top() {
            Top::Fixed(_) if top != 0 => return Err(Error::UnusedTop(top)),
            Top::Fixed(_) => false,
            Top::Register(_) if top < MIN_TOP => return Err(Error::TopTooSmall(top)),
            Top::Register(reg) => reg == TopRegister::Ocr1a,
        };

        if top_in_ocr1a && matches!(output_a, OutputMode::NonInverting | OutputMode::Inverting) {
            return Err(Error::CompareHoldsTop);
        }

        for (channel, mode, other) in [
            (Channel::A, output_a, output_b),
            (Channel::B, output_b, output_a),
        ] {
            if mode == OutputMode::Toggle && (top_in_ocr1a || other != OutputMode::Disconnected) {
                return Err(Error::ToggleUnsupported(channel));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Eq, PartialEq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// A TOP value was given for a fixed-resolution mode.
    UnusedTop(u16),
    /// TOP is below [`MIN_TOP`].
    TopTooSmall(u16),
    /// OCR1A holds TOP, so channel A cannot produce a PWM duty cycle.
    CompareHoldsTop,
    /// Toggle-on-match needs a single active channel and a TOP outside OCR1A.
    ToggleUnsupported(Channel),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnusedTop(top) => write!(f, "top {:#06x} given for a fixed-resolution mode", top),
            Self::TopTooSmall(top) => write!(f, "top {:#06x} below minimum {:#06x}", top, MIN_TOP),
            Self::CompareHoldsTop => write!(f, "OCR1A holds TOP, channel A has no duty cycle"),
            Self::ToggleUnsupported(channel) => {
                write!(f, "toggle output not supported on channel {:?}", channel)
            }
        }
    }
}

impl embedded_hal::pwm::Error for Error {
    fn kind(&self) -> embedded_hal::pwm::ErrorKind {
        embedded_hal::pwm::ErrorKind::Other
    }
}
