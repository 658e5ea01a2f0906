use timer1_hal_common::pwm::{
    Channel, Error, FastMode, OutputMode, PhaseMode, Prescaler, TopRegister, MIN_TOP,
};
use timer1_hal_common::regs::{ControlRegister, DataRegister};
use timer1_hal_common::{Pwm, Recorder};

#[test]
fn rejected_config_touches_nothing() {
    let regs = Recorder::new();
    regs.preset_control(ControlRegister::Tccr1b, 0b0000_1011);
    regs.preset_data(DataRegister::Tcnt1, 0x0123);
    let pwm = Pwm::new(&regs);

    let err = pwm
        .try_init_fast_pwm(
            Prescaler::Div64,
            FastMode::Bits8,
            OutputMode::NonInverting,
            OutputMode::Disconnected,
            500,
        )
        .unwrap_err();

    assert_eq!(err, Error::UnusedTop(500));
    assert!(regs.writes().is_empty());
    assert_eq!(regs.data(DataRegister::Tcnt1), 0x0123);
    assert_eq!(pwm.waveform(), None);
}

#[test]
fn accepted_config_matches_unchecked() {
    let checked = Recorder::new();
    let unchecked = Recorder::new();
    let args = (
        Prescaler::Div8,
        PhaseMode::FrequencyCorrect(TopRegister::Icr1),
        OutputMode::NonInverting,
        OutputMode::Inverting,
        20_000,
    );

    assert!(Pwm::new(&checked)
        .try_init_phase_correct_pwm(args.0, args.1, args.2, args.3, args.4)
        .is_ok());
    Pwm::new(&unchecked).init_phase_correct_pwm(args.0, args.1, args.2, args.3, args.4);

    assert_eq!(&checked.writes()[..], &unchecked.writes()[..]);
}

#[test]
fn top_below_minimum() {
    let pwm = Pwm::new(Recorder::new());
    assert_eq!(
        pwm.try_init_fast_pwm(
            Prescaler::Direct,
            FastMode::Top(TopRegister::Icr1),
            OutputMode::NonInverting,
            OutputMode::Disconnected,
            MIN_TOP - 1,
        )
        .err(),
        Some(Error::TopTooSmall(MIN_TOP - 1))
    );
    assert!(pwm
        .try_init_fast_pwm(
            Prescaler::Direct,
            FastMode::Top(TopRegister::Icr1),
            OutputMode::NonInverting,
            OutputMode::Disconnected,
            MIN_TOP,
        )
        .is_ok());
}

#[test]
fn channel_a_cannot_pwm_when_it_holds_top() {
    let pwm = Pwm::new(Recorder::new());
    for output in [OutputMode::NonInverting, OutputMode::Inverting] {
        assert_eq!(
            pwm.try_init_phase_correct_pwm(
                Prescaler::Div8,
                PhaseMode::Top(TopRegister::Ocr1a),
                output,
                OutputMode::NonInverting,
                1000,
            )
            .err(),
            Some(Error::CompareHoldsTop)
        );
    }
    assert!(pwm
        .try_init_phase_correct_pwm(
            Prescaler::Div8,
            PhaseMode::Top(TopRegister::Ocr1a),
            OutputMode::Disconnected,
            OutputMode::Inverting,
            1000,
        )
        .is_ok());
}

#[test]
fn toggle_needs_single_output_outside_ocr1a_top() {
    let pwm = Pwm::new(Recorder::new());

    assert!(pwm
        .try_init_fast_pwm(
            Prescaler::Div8,
            FastMode::Bits9,
            OutputMode::Toggle,
            OutputMode::Disconnected,
            0,
        )
        .is_ok());
    assert_eq!(
        pwm.try_init_fast_pwm(
            Prescaler::Div8,
            FastMode::Bits9,
            OutputMode::NonInverting,
            OutputMode::Toggle,
            0,
        )
        .err(),
        Some(Error::ToggleUnsupported(Channel::B))
    );
    assert_eq!(
        pwm.try_init_fast_pwm(
            Prescaler::Div8,
            FastMode::Top(TopRegister::Ocr1a),
            OutputMode::Disconnected,
            OutputMode::Toggle,
            1000,
        )
        .err(),
        Some(Error::ToggleUnsupported(Channel::B))
    );
}

#[test]
fn errors_display() {
    assert_eq!(
        Error::TopTooSmall(2).to_string(),
        "top 0x0002 below minimum 0x0003"
    );
    assert_eq!(
        Error::ToggleUnsupported(Channel::A).to_string(),
        "toggle output not supported on channel A"
    );
}
