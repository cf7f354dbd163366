use std::process::ExitCode;

fn main() -> ExitCode {
    tripdesk_cli::run()
}
