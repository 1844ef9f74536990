use std::process::ExitCode;

fn main() -> ExitCode {
    // Failures are already logged by the run loop and the status reporter.
    match keel_master::run_master() {
        Ok(()) => ExitCode::SUCCESS,
        Err(_) => ExitCode::FAILURE,
    }
}
