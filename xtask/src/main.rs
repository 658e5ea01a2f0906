use std::env;

fn main() {
    // Run from the workspace root no matter where `cargo xtask` was invoked.
    env::set_current_dir(concat!(env!("CARGO_MANIFEST_DIR"), "/..")).unwrap();

    let mut args = env::args().skip(1);
    match args.next().as_deref() {
        Some("ci") => xtask::ci(),
        Some("test") => xtask::test_host(),
        Some("build") => {
            for (hal, cpu) in xtask::HALS {
                xtask::build_hal(hal, cpu);
            }
        }
        _ => {
            eprintln!("usage: cargo xtask <subcommand>");
            eprintln!();
            eprintln!("subcommands:");
            eprintln!("    ci    - host tests, then AVR builds of every HAL");
            eprintln!("    test  - host tests only");
            eprintln!("    build - AVR builds only");
        }
    }
}
