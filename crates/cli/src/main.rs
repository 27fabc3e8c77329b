use std::process::ExitCode;

fn main() -> ExitCode {
    stairbooks_cli::run()
}
