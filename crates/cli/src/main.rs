use std::process::ExitCode;

fn main() -> ExitCode {
    netscout_cli::run()
}
