use std::process::ExitCode;

fn main() -> ExitCode {
    match staff_referral_lib::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Staff referral service failed");
            eprintln!("staff-referral: {e}");
            ExitCode::FAILURE
        }
    }
}
