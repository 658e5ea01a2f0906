use std::process::Command;

/// Chip crates and the AVR CPU each one is built for.
pub static HALS: &[(&str, &str)] = &[("atmega32-hal", "atmega32")];

/// Generic AVR target; the CPU is picked with `-C target-cpu`.
pub const AVR_TARGET: &str = "avr-none";

fn run(cmd: &mut Command) {
    let status = cmd
        .status()
        .map_err(|e| format!("could not execute {:?}: {}", cmd, e))
        .unwrap();
    assert!(status.success(), "command exited with error status: {:?}", cmd);
}

/// Runs the host-side test suite of the whole workspace.
pub fn test_host() {
    let mut cargo = Command::new("cargo");
    cargo.args(&["test", "--workspace"]);
    run(&mut cargo);

    let mut cargo = Command::new("cargo");
    cargo.args(&["check", "-p", "timer1-hal-common", "--features", "defmt"]);
    run(&mut cargo);
}

/// Cross-builds a chip crate. AVR is a tier 3 target, so this needs a
/// nightly toolchain with `rust-src`.
pub fn build_hal(hal: &str, cpu: &str) {
    println!("building `{}` for `{}`", hal, cpu);
    let toml_path = format!("{}/Cargo.toml", hal);
    let mut cargo = Command::new("cargo");
    cargo
        .args(&["+nightly", "build", "--release", "-Z", "build-std=core"])
        .args(&["--target", AVR_TARGET, "--manifest-path", &toml_path])
        .env("RUSTFLAGS", format!("-C target-cpu={}", cpu));
    run(&mut cargo);
}

pub fn ci() {
    test_host();
    for (hal, cpu) in HALS {
        build_hal(hal, cpu);
    }
}
