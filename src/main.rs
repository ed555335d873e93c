// Main entry point - all the logic is in lib.rs

use std::process::ExitCode;

use trojan_alpha::run;

fn main() -> ExitCode {
    run()
}
